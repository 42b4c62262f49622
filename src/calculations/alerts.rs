use crate::calculations::status::resolve_status;
use crate::item::{ScheduleItem, Status};
use crate::warning::DataQualityWarning;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Upcoming deadlines this close (in days) are raised as warnings instead of info.
    pub delay_threshold_days: i64,
    /// How far ahead (in days) deadlines are reported.
    pub upcoming_days: i64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            delay_threshold_days: 3,
            upcoming_days: 7,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    Overdue,
    Delayed,
    MilestoneApproaching,
    UpcomingDeadline,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::Overdue => "overdue",
            AlertKind::Delayed => "delayed",
            AlertKind::MilestoneApproaching => "milestone_approaching",
            AlertKind::UpcomingDeadline => "upcoming_deadline",
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Alert severity. Ordering follows urgency: `Critical < Warning < Info`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    Warning,
    Info,
}

impl Severity {
    pub fn rank(&self) -> u8 {
        match self {
            Severity::Critical => 0,
            Severity::Warning => 1,
            Severity::Info => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub item_id: String,
    pub item_name: String,
    pub kind: AlertKind,
    pub severity: Severity,
    pub days_remaining: i64,
    pub planned_end: NaiveDate,
    pub progress: u8,
    pub status: Status,
    pub milestone: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertReport {
    pub as_of: NaiveDate,
    pub alerts: Vec<Alert>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<DataQualityWarning>,
}

impl AlertReport {
    pub fn count_by_severity(&self, severity: Severity) -> usize {
        self.alerts
            .iter()
            .filter(|alert| alert.severity == severity)
            .count()
    }
}

/// Whole days from `as_of` until `planned_end`; negative once the date has passed.
pub fn days_remaining(planned_end: NaiveDate, as_of: NaiveDate) -> i64 {
    (planned_end - as_of).num_days()
}

pub fn generate_alerts(
    items: &[ScheduleItem],
    as_of: NaiveDate,
    config: &AlertConfig,
) -> AlertReport {
    let mut alerts = Vec::new();
    let mut warnings = Vec::new();

    for item in items {
        let resolution = resolve_status(item, as_of);
        if resolution.status == Status::Completed {
            continue;
        }
        warnings.extend(resolution.warnings);

        let Some(planned_end) = item.planned_end else {
            continue;
        };
        let remaining = days_remaining(planned_end, as_of);
        let alert = |kind: AlertKind, severity: Severity| Alert {
            item_id: item.id.clone(),
            item_name: item.name.clone(),
            kind,
            severity,
            days_remaining: remaining,
            planned_end,
            progress: item.progress,
            status: resolution.status,
            milestone: item.milestone,
        };

        let overdue = remaining < 0 && item.progress < 100;
        if overdue {
            alerts.push(alert(AlertKind::Overdue, Severity::Critical));
        } else if resolution.status == Status::Delayed {
            alerts.push(alert(AlertKind::Delayed, Severity::Warning));
        }

        if (0..=config.upcoming_days).contains(&remaining) {
            let kind = if item.milestone {
                AlertKind::MilestoneApproaching
            } else {
                AlertKind::UpcomingDeadline
            };
            let severity = if remaining <= config.delay_threshold_days {
                Severity::Warning
            } else {
                Severity::Info
            };
            alerts.push(alert(kind, severity));
        }
    }

    sort_alerts(&mut alerts);
    tracing::debug!(count = alerts.len(), %as_of, "alerts generated");
    AlertReport {
        as_of,
        alerts,
        warnings,
    }
}

/// Severity first, then soonest deadline, then item id.
pub fn sort_alerts(alerts: &mut [Alert]) {
    alerts.sort_by(|a, b| {
        a.severity
            .cmp(&b.severity)
            .then_with(|| a.days_remaining.cmp(&b.days_remaining))
            .then_with(|| a.item_id.cmp(&b.item_id))
    });
}
