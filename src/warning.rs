use crate::item::Status;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateField {
    PlannedStart,
    PlannedEnd,
    ActualStart,
    ActualEnd,
    AllocationStart,
    AllocationEnd,
}

impl DateField {
    pub fn as_str(&self) -> &'static str {
        match self {
            DateField::PlannedStart => "planned_start",
            DateField::PlannedEnd => "planned_end",
            DateField::ActualStart => "actual_start",
            DateField::ActualEnd => "actual_end",
            DateField::AllocationStart => "allocation_start",
            DateField::AllocationEnd => "allocation_end",
        }
    }
}

/// A data-quality finding attached to a computed result.
///
/// Warnings never abort a computation; the affected value is still returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataQualityWarning {
    MissingDate {
        item_id: String,
        field: DateField,
    },
    MalformedDate {
        item_id: String,
        field: DateField,
        raw: String,
    },
    InvertedPlannedPeriod {
        item_id: String,
        start: NaiveDate,
        end: NaiveDate,
    },
    ProgressOutOfRange {
        item_id: String,
        raw: String,
    },
    PrematureActualEnd {
        item_id: String,
        progress: u8,
    },
    DuplicateItemId {
        item_id: String,
    },
    OrphanedParent {
        item_id: String,
        parent_id: String,
    },
    HierarchyCycle {
        item_id: String,
        parent_id: String,
    },
    DurationWeightFallback {
        item_id: String,
    },
    InvalidStatusTransition {
        item_id: String,
        from: Status,
        to: Status,
    },
    EmptyAllocationPeriod {
        schedule_item_id: String,
        resource_id: String,
    },
    ForeignAllocation {
        resource_id: String,
        schedule_item_id: String,
        allocation_resource_id: String,
    },
    InactiveResource {
        resource_id: String,
    },
    UndatedScope {
        scope: String,
    },
    InvalidRecord {
        entity: String,
        detail: String,
    },
}

impl DataQualityWarning {
    /// Schedule item the warning is about, when it concerns a single item.
    pub fn item_id(&self) -> Option<&str> {
        match self {
            DataQualityWarning::MissingDate { item_id, .. }
            | DataQualityWarning::MalformedDate { item_id, .. }
            | DataQualityWarning::InvertedPlannedPeriod { item_id, .. }
            | DataQualityWarning::ProgressOutOfRange { item_id, .. }
            | DataQualityWarning::PrematureActualEnd { item_id, .. }
            | DataQualityWarning::DuplicateItemId { item_id }
            | DataQualityWarning::OrphanedParent { item_id, .. }
            | DataQualityWarning::HierarchyCycle { item_id, .. }
            | DataQualityWarning::DurationWeightFallback { item_id }
            | DataQualityWarning::InvalidStatusTransition { item_id, .. } => Some(item_id),
            DataQualityWarning::EmptyAllocationPeriod {
                schedule_item_id, ..
            }
            | DataQualityWarning::ForeignAllocation {
                schedule_item_id, ..
            } => Some(schedule_item_id),
            DataQualityWarning::InactiveResource { .. }
            | DataQualityWarning::UndatedScope { .. }
            | DataQualityWarning::InvalidRecord { .. } => None,
        }
    }
}

impl fmt::Display for DataQualityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataQualityWarning::MissingDate { item_id, field } => {
                write!(f, "item {item_id} has no {}", field.as_str())
            }
            DataQualityWarning::MalformedDate {
                item_id,
                field,
                raw,
            } => write!(
                f,
                "item {item_id} has malformed {} '{raw}'",
                field.as_str()
            ),
            DataQualityWarning::InvertedPlannedPeriod {
                item_id,
                start,
                end,
            } => write!(
                f,
                "item {item_id} planned start {start} is after planned end {end}"
            ),
            DataQualityWarning::ProgressOutOfRange { item_id, raw } => {
                write!(f, "item {item_id} has progress '{raw}' outside 0-100")
            }
            DataQualityWarning::PrematureActualEnd { item_id, progress } => write!(
                f,
                "item {item_id} has an actual end date at {progress}% progress"
            ),
            DataQualityWarning::DuplicateItemId { item_id } => {
                write!(f, "duplicate item id {item_id}")
            }
            DataQualityWarning::OrphanedParent { item_id, parent_id } => write!(
                f,
                "item {item_id} references missing parent {parent_id}; treated as a root"
            ),
            DataQualityWarning::HierarchyCycle { item_id, parent_id } => write!(
                f,
                "parent link {item_id} -> {parent_id} closes a cycle; treated as a root"
            ),
            DataQualityWarning::DurationWeightFallback { item_id } => write!(
                f,
                "item {item_id} has no planned duration; weighted as 1 day"
            ),
            DataQualityWarning::InvalidStatusTransition { item_id, from, to } => {
                write!(f, "item {item_id} moved from {from} to {to}")
            }
            DataQualityWarning::EmptyAllocationPeriod {
                schedule_item_id,
                resource_id,
            } => write!(
                f,
                "allocation of {resource_id} to item {schedule_item_id} has an empty period"
            ),
            DataQualityWarning::ForeignAllocation {
                resource_id,
                schedule_item_id,
                allocation_resource_id,
            } => write!(
                f,
                "allocation for {allocation_resource_id} on item {schedule_item_id} ignored while evaluating {resource_id}"
            ),
            DataQualityWarning::InactiveResource { resource_id } => {
                write!(f, "resource {resource_id} is inactive")
            }
            DataQualityWarning::UndatedScope { scope } => {
                write!(f, "scope {scope} has no planned dates")
            }
            DataQualityWarning::InvalidRecord { entity, detail } => {
                write!(f, "invalid {entity} record: {detail}")
            }
        }
    }
}
