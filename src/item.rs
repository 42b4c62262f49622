use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Lifecycle status of a schedule item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    NotStarted,
    InProgress,
    Delayed,
    Completed,
    OnHold,
}

impl Status {
    pub const ALL: [Status; 5] = [
        Status::NotStarted,
        Status::InProgress,
        Status::Delayed,
        Status::Completed,
        Status::OnHold,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::NotStarted => "not_started",
            Status::InProgress => "in_progress",
            Status::Delayed => "delayed",
            Status::Completed => "completed",
            Status::OnHold => "on_hold",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Status::Completed)
    }

    /// Whether the lifecycle allows moving from `self` to `next`.
    ///
    /// not_started → in_progress → {delayed ⇄ in_progress} → completed, with on_hold
    /// reachable from not_started or in_progress and returning to in_progress.
    /// Staying in the same status is always allowed.
    pub fn can_transition_to(&self, next: Status) -> bool {
        if *self == next {
            return true;
        }
        match self {
            Status::NotStarted => matches!(next, Status::InProgress | Status::OnHold),
            Status::InProgress => {
                matches!(next, Status::Delayed | Status::Completed | Status::OnHold)
            }
            Status::Delayed => matches!(next, Status::InProgress | Status::Completed),
            Status::OnHold => matches!(next, Status::InProgress),
            Status::Completed => false,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for Status {
    type Err = UnknownStatus;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "not_started" => Ok(Status::NotStarted),
            "in_progress" => Ok(Status::InProgress),
            "delayed" => Ok(Status::Delayed),
            "completed" => Ok(Status::Completed),
            "on_hold" => Ok(Status::OnHold),
            _ => Err(UnknownStatus(value.to_string())),
        }
    }
}

/// Work-breakdown nesting level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WbsTier {
    Large,
    Medium,
    Small,
}

impl WbsTier {
    /// Tier implied by depth below a root. Anything deeper than two levels is `Small`.
    pub fn from_depth(depth: usize) -> Self {
        match depth {
            0 => WbsTier::Large,
            1 => WbsTier::Medium,
            _ => WbsTier::Small,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WbsTier::Large => "large",
            WbsTier::Medium => "medium",
            WbsTier::Small => "small",
        }
    }
}

/// Marker left by an upstream process that put an item on hold.
///
/// The hold applies while the item's progress still equals `progress_at_hold`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoldMarker {
    pub progress_at_hold: u8,
}

/// One node of a work breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleItem {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub owner_contract_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<WbsTier>,
    #[serde(default)]
    pub planned_start: Option<NaiveDate>,
    #[serde(default)]
    pub planned_end: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_start: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_end: Option<NaiveDate>,
    #[serde(default)]
    pub progress: u8,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub assigned_person_ids: BTreeSet<String>,
    #[serde(default)]
    pub assigned_equipment_ids: BTreeSet<String>,
    #[serde(default)]
    pub assigned_subcontractor_ids: BTreeSet<String>,
    #[serde(default)]
    pub predecessor_ids: BTreeSet<String>,
    #[serde(default)]
    pub milestone: bool,
    #[serde(default)]
    pub critical_path: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hold: Option<HoldMarker>,
}

impl ScheduleItem {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        owner_contract_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            parent_id: None,
            owner_contract_id: owner_contract_id.into(),
            name: name.into(),
            tier: None,
            planned_start: None,
            planned_end: None,
            actual_start: None,
            actual_end: None,
            progress: 0,
            status: Status::NotStarted,
            assigned_person_ids: BTreeSet::new(),
            assigned_equipment_ids: BTreeSet::new(),
            assigned_subcontractor_ids: BTreeSet::new(),
            predecessor_ids: BTreeSet::new(),
            milestone: false,
            critical_path: false,
            hold: None,
        }
    }

    pub fn with_planned_period(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.planned_start = Some(start);
        self.planned_end = Some(end);
        self
    }

    pub fn with_progress(mut self, progress: u8) -> Self {
        self.progress = progress.min(100);
        self
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    /// Planned window when both dates are present and ordered.
    pub fn planned_window(&self) -> Option<(NaiveDate, NaiveDate)> {
        match (self.planned_start, self.planned_end) {
            (Some(start), Some(end)) if start <= end => Some((start, end)),
            _ => None,
        }
    }

    pub fn planned_duration_days(&self) -> Option<i64> {
        self.planned_window()
            .map(|(start, end)| (end - start).num_days())
    }

    pub fn is_assigned_to_person(&self, person_id: &str) -> bool {
        self.assigned_person_ids.contains(person_id)
    }

    pub fn is_assigned_to_equipment(&self, equipment_id: &str) -> bool {
        self.assigned_equipment_ids.contains(equipment_id)
    }

    pub fn is_assigned_to_subcontractor(&self, subcontractor_id: &str) -> bool {
        self.assigned_subcontractor_ids.contains(subcontractor_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn status_strings_roundtrip() {
        for status in Status::ALL {
            assert_eq!(status.as_str().parse::<Status>(), Ok(status));
        }
        assert_eq!(
            "paused".parse::<Status>(),
            Err(UnknownStatus("paused".into()))
        );
    }

    #[test]
    fn lifecycle_transitions_follow_state_machine() {
        assert!(Status::NotStarted.can_transition_to(Status::InProgress));
        assert!(Status::NotStarted.can_transition_to(Status::OnHold));
        assert!(!Status::NotStarted.can_transition_to(Status::Delayed));
        assert!(Status::InProgress.can_transition_to(Status::Delayed));
        assert!(Status::Delayed.can_transition_to(Status::InProgress));
        assert!(Status::Delayed.can_transition_to(Status::Completed));
        assert!(Status::OnHold.can_transition_to(Status::InProgress));
        assert!(!Status::OnHold.can_transition_to(Status::Completed));
        assert!(!Status::Completed.can_transition_to(Status::InProgress));
        assert!(Status::Completed.can_transition_to(Status::Completed));
    }

    #[test]
    fn planned_window_requires_ordered_dates() {
        let item = ScheduleItem::new("a", "A", "c1").with_planned_period(d(2024, 1, 1), d(2024, 1, 10));
        assert_eq!(item.planned_duration_days(), Some(9));

        let inverted =
            ScheduleItem::new("b", "B", "c1").with_planned_period(d(2024, 1, 10), d(2024, 1, 1));
        assert_eq!(inverted.planned_window(), None);

        let mut partial = ScheduleItem::new("c", "C", "c1");
        partial.planned_start = Some(d(2024, 1, 1));
        assert_eq!(partial.planned_duration_days(), None);
    }

    #[test]
    fn tier_from_depth_saturates_at_small() {
        assert_eq!(WbsTier::from_depth(0), WbsTier::Large);
        assert_eq!(WbsTier::from_depth(1), WbsTier::Medium);
        assert_eq!(WbsTier::from_depth(2), WbsTier::Small);
        assert_eq!(WbsTier::from_depth(5), WbsTier::Small);
    }

    #[test]
    fn item_deserializes_with_defaults() {
        let item: ScheduleItem = serde_json::from_str(
            r#"{"id":"t1","name":"Foundation","planned_start":"2024-01-01","planned_end":"2024-01-05"}"#,
        )
        .unwrap();
        assert_eq!(item.progress, 0);
        assert_eq!(item.status, Status::NotStarted);
        assert!(item.assigned_person_ids.is_empty());
        assert_eq!(item.planned_window(), Some((d(2024, 1, 1), d(2024, 1, 5))));
    }
}
