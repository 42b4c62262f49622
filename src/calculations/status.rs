use crate::item::{HoldMarker, ScheduleItem, Status};
use crate::warning::{DataQualityWarning, DateField};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Percentage points an item may trail its expected progress before it counts as delayed.
pub const DELAY_TOLERANCE_POINTS: f64 = 10.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusResolution {
    pub item_id: String,
    pub status: Status,
    /// Time-based expected progress; `None` when the rules never needed it.
    pub expected_progress: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<DataQualityWarning>,
}

impl StatusResolution {
    fn new(item: &ScheduleItem, status: Status) -> Self {
        Self {
            item_id: item.id.clone(),
            status,
            expected_progress: None,
            warnings: Vec::new(),
        }
    }
}

/// Derives the lifecycle status of `item` as of `as_of`.
///
/// Total: missing or inverted planned dates degrade to `NotStarted` with a warning.
/// The date warnings are attached on every branch except `Completed`.
pub fn resolve_status(item: &ScheduleItem, as_of: NaiveDate) -> StatusResolution {
    if item.progress >= 100 {
        return StatusResolution::new(item, Status::Completed);
    }

    let mut resolution = StatusResolution::new(item, Status::NotStarted);
    let window = planned_window(item, &mut resolution.warnings);
    if effective_hold(item).is_some_and(|hold| hold.progress_at_hold == item.progress) {
        resolution.status = Status::OnHold;
        return resolution;
    }
    if item.progress == 0 {
        return resolution;
    }
    let Some((start, end)) = window else {
        return resolution;
    };

    let expected = expected_progress(start, end, as_of);
    resolution.expected_progress = Some(expected);
    let past_due = as_of > end;
    resolution.status = if past_due || f64::from(item.progress) < expected - DELAY_TOLERANCE_POINTS
    {
        Status::Delayed
    } else {
        Status::InProgress
    };
    resolution
}

pub fn resolve_status_today(item: &ScheduleItem) -> StatusResolution {
    resolve_status(item, chrono::Local::now().date_naive())
}

/// A stored `OnHold` status without a marker holds at the item's current progress.
fn effective_hold(item: &ScheduleItem) -> Option<HoldMarker> {
    item.hold.or_else(|| {
        (item.status == Status::OnHold).then_some(HoldMarker {
            progress_at_hold: item.progress,
        })
    })
}

/// Linear share of the planned window elapsed at `as_of`, clamped to [0, 100].
pub fn expected_progress(start: NaiveDate, end: NaiveDate, as_of: NaiveDate) -> f64 {
    if start == end {
        return if as_of >= start { 100.0 } else { 0.0 };
    }
    let total = (end - start).num_days() as f64;
    let elapsed = (as_of - start).num_days() as f64;
    (elapsed / total * 100.0).clamp(0.0, 100.0)
}

fn planned_window(
    item: &ScheduleItem,
    warnings: &mut Vec<DataQualityWarning>,
) -> Option<(NaiveDate, NaiveDate)> {
    match (item.planned_start, item.planned_end) {
        (Some(start), Some(end)) if start <= end => Some((start, end)),
        (Some(start), Some(end)) => {
            warnings.push(DataQualityWarning::InvertedPlannedPeriod {
                item_id: item.id.clone(),
                start,
                end,
            });
            None
        }
        (start, end) => {
            if start.is_none() {
                warnings.push(DataQualityWarning::MissingDate {
                    item_id: item.id.clone(),
                    field: DateField::PlannedStart,
                });
            }
            if end.is_none() {
                warnings.push(DataQualityWarning::MissingDate {
                    item_id: item.id.clone(),
                    field: DateField::PlannedEnd,
                });
            }
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn item(progress: u8) -> ScheduleItem {
        ScheduleItem::new("t1", "Framing", "c1")
            .with_planned_period(d(2024, 1, 1), d(2024, 1, 11))
            .with_progress(progress)
    }

    #[test]
    fn zero_progress_is_not_started_even_when_late() {
        let resolution = resolve_status(&item(0), d(2024, 2, 1));
        assert_eq!(resolution.status, Status::NotStarted);
        assert!(resolution.warnings.is_empty());
    }

    #[test]
    fn full_progress_is_completed() {
        assert_eq!(resolve_status(&item(100), d(2023, 12, 1)).status, Status::Completed);
        assert_eq!(resolve_status_today(&item(100)).status, Status::Completed);
    }

    #[test]
    fn past_planned_end_is_delayed() {
        let resolution = resolve_status(&item(80), d(2024, 1, 15));
        assert_eq!(resolution.status, Status::Delayed);
        assert_eq!(resolution.expected_progress, Some(100.0));
    }

    #[test]
    fn tolerance_band_keeps_item_in_progress() {
        // Day 5 of 10: expected 50
        assert_eq!(resolve_status(&item(40), d(2024, 1, 6)).status, Status::InProgress);
        assert_eq!(resolve_status(&item(39), d(2024, 1, 6)).status, Status::Delayed);
    }

    #[test]
    fn zero_length_window_expects_full_progress_from_its_day() {
        assert_eq!(expected_progress(d(2024, 1, 5), d(2024, 1, 5), d(2024, 1, 4)), 0.0);
        assert_eq!(expected_progress(d(2024, 1, 5), d(2024, 1, 5), d(2024, 1, 5)), 100.0);
    }

    #[test]
    fn expected_progress_is_clamped() {
        assert_eq!(expected_progress(d(2024, 1, 5), d(2024, 1, 15), d(2024, 1, 1)), 0.0);
        assert_eq!(expected_progress(d(2024, 1, 5), d(2024, 1, 15), d(2024, 3, 1)), 100.0);
    }

    #[test]
    fn hold_overrides_until_progress_changes() {
        let mut held = item(30);
        held.hold = Some(HoldMarker {
            progress_at_hold: 30,
        });
        assert_eq!(resolve_status(&held, d(2024, 3, 1)).status, Status::OnHold);

        held.progress = 35;
        assert_eq!(resolve_status(&held, d(2024, 1, 4)).status, Status::InProgress);
    }

    #[test]
    fn hold_on_untouched_item_wins_over_not_started() {
        let mut held = item(0);
        held.hold = Some(HoldMarker {
            progress_at_hold: 0,
        });
        assert_eq!(resolve_status(&held, d(2024, 1, 4)).status, Status::OnHold);
    }

    #[test]
    fn missing_dates_degrade_with_warning() {
        let mut undated = item(50);
        undated.planned_end = None;
        let resolution = resolve_status(&undated, d(2024, 1, 4));
        assert_eq!(resolution.status, Status::NotStarted);
        assert_eq!(
            resolution.warnings,
            vec![DataQualityWarning::MissingDate {
                item_id: "t1".into(),
                field: DateField::PlannedEnd
            }]
        );
    }

    #[test]
    fn stored_on_hold_without_marker_holds_at_current_progress() {
        let mut held = item(30);
        held.status = Status::OnHold;
        assert_eq!(resolve_status(&held, d(2024, 1, 15)).status, Status::OnHold);
    }

    #[test]
    fn untouched_undated_item_still_carries_warnings() {
        let undated = ScheduleItem::new("t3", "Survey", "c1");
        let resolution = resolve_status(&undated, d(2024, 1, 15));
        assert_eq!(resolution.status, Status::NotStarted);
        assert_eq!(resolution.warnings.len(), 2);

        let mut held = ScheduleItem::new("t4", "Paused", "c1").with_progress(20);
        held.status = Status::OnHold;
        let resolution = resolve_status(&held, d(2024, 1, 15));
        assert_eq!(resolution.status, Status::OnHold);
        assert_eq!(resolution.warnings.len(), 2);
    }

    #[test]
    fn inverted_dates_degrade_with_warning() {
        let inverted = ScheduleItem::new("t2", "Roof", "c1")
            .with_planned_period(d(2024, 2, 1), d(2024, 1, 1))
            .with_progress(50);
        let resolution = resolve_status(&inverted, d(2024, 1, 15));
        assert_eq!(resolution.status, Status::NotStarted);
        assert!(matches!(
            resolution.warnings.as_slice(),
            [DataQualityWarning::InvertedPlannedPeriod { .. }]
        ));
    }
}
