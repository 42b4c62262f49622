use crate::resource::{Allocation, Resource, ResourceKind};
use crate::warning::DataQualityWarning;
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AvailabilityStatus {
    /// Below 70% utilization.
    Available,
    /// 70-99%.
    Limited,
    /// Exactly 100%.
    Full,
    /// Above 100%.
    Over,
    /// Zero-capacity resource; no rate can be computed.
    NotApplicable,
}

impl AvailabilityStatus {
    pub fn classify(utilization_rate: u32) -> Self {
        match utilization_rate {
            0..=69 => AvailabilityStatus::Available,
            70..=99 => AvailabilityStatus::Limited,
            100 => AvailabilityStatus::Full,
            _ => AvailabilityStatus::Over,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AvailabilityStatus::Available => "available",
            AvailabilityStatus::Limited => "limited",
            AvailabilityStatus::Full => "full",
            AvailabilityStatus::Over => "over",
            AvailabilityStatus::NotApplicable => "not_applicable",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailabilitySummary {
    pub resource_id: String,
    pub kind: ResourceKind,
    pub as_of: NaiveDate,
    pub capacity: u32,
    pub in_use: u32,
    /// `capacity - in_use`; negative under over-allocation.
    pub available: i64,
    /// Uncapped percentage; `None` for a zero-capacity resource.
    pub utilization_rate: Option<u32>,
    pub status: AvailabilityStatus,
    pub active: bool,
    /// Schedule items holding the resource on `as_of`.
    pub active_item_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<DataQualityWarning>,
}

pub fn calculate_availability(
    resource: &Resource,
    allocations: &[Allocation],
    as_of: NaiveDate,
) -> AvailabilitySummary {
    let mut warnings = Vec::new();
    if !resource.active {
        warnings.push(DataQualityWarning::InactiveResource {
            resource_id: resource.id.clone(),
        });
    }

    let mut in_use: u32 = 0;
    let mut active_item_ids = Vec::new();
    for allocation in allocations {
        if allocation.resource_id != resource.id {
            warnings.push(DataQualityWarning::ForeignAllocation {
                resource_id: resource.id.clone(),
                schedule_item_id: allocation.schedule_item_id.clone(),
                allocation_resource_id: allocation.resource_id.clone(),
            });
            continue;
        }
        if allocation.period.is_empty() {
            warnings.push(DataQualityWarning::EmptyAllocationPeriod {
                schedule_item_id: allocation.schedule_item_id.clone(),
                resource_id: allocation.resource_id.clone(),
            });
            continue;
        }
        if allocation.is_active_on(as_of) {
            in_use = in_use.saturating_add(allocation.quantity);
            active_item_ids.push(allocation.schedule_item_id.clone());
        }
    }

    let utilization_rate = utilization_rate(in_use, resource.capacity);
    let status = utilization_rate
        .map(AvailabilityStatus::classify)
        .unwrap_or(AvailabilityStatus::NotApplicable);

    AvailabilitySummary {
        resource_id: resource.id.clone(),
        kind: resource.kind,
        as_of,
        capacity: resource.capacity,
        in_use,
        available: i64::from(resource.capacity) - i64::from(in_use),
        utilization_rate,
        status,
        active: resource.active,
        active_item_ids,
        warnings,
    }
}

/// `round(in_use / capacity * 100)`, or `None` when capacity is zero.
pub fn utilization_rate(in_use: u32, capacity: u32) -> Option<u32> {
    if capacity == 0 {
        return None;
    }
    Some((f64::from(in_use) / f64::from(capacity) * 100.0).round() as u32)
}

/// One availability summary per day in `[from, to]`.
pub fn utilization_timeline(
    resource: &Resource,
    allocations: &[Allocation],
    from: NaiveDate,
    to: NaiveDate,
) -> Vec<AvailabilitySummary> {
    let mut timeline = Vec::new();
    let mut day = from;
    while day <= to {
        timeline.push(calculate_availability(resource, allocations, day));
        match day.checked_add_days(Days::new(1)) {
            Some(next) => day = next,
            None => break,
        }
    }
    timeline
}
