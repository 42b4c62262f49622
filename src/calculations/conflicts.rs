use crate::resource::{Allocation, Resource};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An interval during which concurrent allocations exceed a resource's capacity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conflict {
    pub resource_id: String,
    pub period_start: NaiveDate,
    /// Exclusive, like allocation periods.
    pub period_end: NaiveDate,
    /// Peak concurrent quantity minus capacity.
    pub over_allocated_by: u32,
    pub peak_in_use: u32,
    pub capacity: u32,
}

/// Sweep-line over-allocation detection.
///
/// Allocations are grouped by resource id and each group is swept against `capacity`.
/// Every event sharing a date is applied before the capacity check, so periods that only
/// touch never conflict.
pub fn detect_conflicts(allocations: &[Allocation], capacity: u32) -> Vec<Conflict> {
    let mut by_resource: BTreeMap<&str, Vec<&Allocation>> = BTreeMap::new();
    for allocation in allocations {
        by_resource
            .entry(allocation.resource_id.as_str())
            .or_default()
            .push(allocation);
    }

    let mut conflicts = Vec::new();
    for (resource_id, group) in by_resource {
        conflicts.extend(sweep(resource_id, &group, capacity));
    }
    conflicts
}

/// Conflicts for one resource, ignoring allocations made against other resources.
pub fn detect_resource_conflicts(resource: &Resource, allocations: &[Allocation]) -> Vec<Conflict> {
    let own: Vec<&Allocation> = allocations
        .iter()
        .filter(|allocation| allocation.resource_id == resource.id)
        .collect();
    sweep(&resource.id, &own, resource.capacity)
}

fn sweep(resource_id: &str, allocations: &[&Allocation], capacity: u32) -> Vec<Conflict> {
    // Net quantity change per date, in chronological order
    let mut deltas: BTreeMap<NaiveDate, i64> = BTreeMap::new();
    for allocation in allocations {
        if allocation.period.is_empty() {
            tracing::debug!(
                resource_id,
                item_id = %allocation.schedule_item_id,
                "skipping allocation with empty period"
            );
            continue;
        }
        let quantity = i64::from(allocation.quantity);
        *deltas.entry(allocation.period.start).or_default() += quantity;
        *deltas.entry(allocation.period.end).or_default() -= quantity;
    }

    let capacity_units = i64::from(capacity);
    let mut conflicts = Vec::new();
    let mut running: i64 = 0;
    let mut open: Option<(NaiveDate, i64)> = None;

    for (date, delta) in deltas {
        running += delta;
        if running > capacity_units {
            open = Some(match open {
                Some((start, peak)) => (start, peak.max(running)),
                None => (date, running),
            });
        } else if let Some((start, peak)) = open.take() {
            conflicts.push(Conflict {
                resource_id: resource_id.to_string(),
                period_start: start,
                period_end: date,
                over_allocated_by: u32::try_from(peak - capacity_units).unwrap_or(u32::MAX),
                peak_in_use: u32::try_from(peak).unwrap_or(u32::MAX),
                capacity,
            });
        }
    }

    if !conflicts.is_empty() {
        tracing::debug!(resource_id, count = conflicts.len(), "over-allocation detected");
    }
    conflicts
}
