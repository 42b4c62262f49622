use crate::item::{ScheduleItem, Status};
use crate::warning::{DataQualityWarning, DateField};
use std::collections::HashSet;

/// Soft invariant checks for a single item. Violations are reported, never rejected.
pub fn validate_item(item: &ScheduleItem) -> Vec<DataQualityWarning> {
    let mut warnings = Vec::new();

    if item.planned_start.is_none() {
        warnings.push(DataQualityWarning::MissingDate {
            item_id: item.id.clone(),
            field: DateField::PlannedStart,
        });
    }
    if item.planned_end.is_none() {
        warnings.push(DataQualityWarning::MissingDate {
            item_id: item.id.clone(),
            field: DateField::PlannedEnd,
        });
    }
    if let (Some(start), Some(end)) = (item.planned_start, item.planned_end) {
        if start > end {
            warnings.push(DataQualityWarning::InvertedPlannedPeriod {
                item_id: item.id.clone(),
                start,
                end,
            });
        }
    }
    if item.progress > 100 {
        warnings.push(DataQualityWarning::ProgressOutOfRange {
            item_id: item.id.clone(),
            raw: item.progress.to_string(),
        });
    }
    if item.actual_end.is_some() && item.progress < 100 {
        warnings.push(DataQualityWarning::PrematureActualEnd {
            item_id: item.id.clone(),
            progress: item.progress,
        });
    }

    warnings
}

pub fn validate_items(items: &[ScheduleItem]) -> Vec<DataQualityWarning> {
    let mut warnings = Vec::new();
    let mut seen_ids = HashSet::with_capacity(items.len());
    for item in items {
        if !seen_ids.insert(item.id.as_str()) {
            warnings.push(DataQualityWarning::DuplicateItemId {
                item_id: item.id.clone(),
            });
        }
        warnings.extend(validate_item(item));
    }
    warnings
}

/// Reports a status change the lifecycle does not allow.
pub fn check_transition(
    item_id: &str,
    previous: Status,
    next: Status,
) -> Option<DataQualityWarning> {
    if previous.can_transition_to(next) {
        None
    } else {
        Some(DataQualityWarning::InvalidStatusTransition {
            item_id: item_id.to_string(),
            from: previous,
            to: next,
        })
    }
}
