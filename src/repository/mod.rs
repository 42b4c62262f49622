//! Read-only boundary to the external schedule service.
//!
//! [`ScheduleRepository`] is the narrow interface the engine consumes. The adapters in this
//! module turn untyped source records (JSON objects, CSV rows, DataFrame rows) into typed
//! value objects through a fixed [`FieldMap`], so nothing past this boundary sees raw
//! field names.

use crate::gantt::GanttScope;
use crate::item::ScheduleItem;
use crate::resource::{Allocation, Resource};
use polars::prelude::PolarsError;
use serde::{Deserialize, Serialize};
use std::io;
use thiserror::Error;

pub mod field_map;
pub mod file;
pub mod memory;
pub mod table;

pub use field_map::{FieldMap, RecordSource};
pub use file::{CsvSnapshotRepository, JsonSnapshotRepository};
pub use memory::{InMemoryRepository, ScheduleSnapshot};
pub use table::TableRepository;

/// Failures fetching snapshots. Distinct from computation, which never fails.
///
/// Nothing here is retried; retry policy belongs to the caller.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("dataframe conversion error: {0}")]
    DataFrame(#[from] PolarsError),

    #[error("invalid record: {0}")]
    InvalidRecord(String),

    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Selection passed to [`ScheduleRepository::list_schedule_items`]. Empty means everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemFilter {
    pub contract_id: Option<String>,
    pub person_id: Option<String>,
    pub equipment_id: Option<String>,
    pub subcontractor_id: Option<String>,
}

impl ItemFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn contract(contract_id: impl Into<String>) -> Self {
        Self {
            contract_id: Some(contract_id.into()),
            ..Self::default()
        }
    }

    pub fn for_scope(scope: &GanttScope) -> Self {
        let id = Some(scope.entity_id().to_string());
        match scope {
            GanttScope::Contract(_) => Self {
                contract_id: id,
                ..Self::default()
            },
            GanttScope::Person(_) => Self {
                person_id: id,
                ..Self::default()
            },
            GanttScope::Equipment(_) => Self {
                equipment_id: id,
                ..Self::default()
            },
            GanttScope::Subcontractor(_) => Self {
                subcontractor_id: id,
                ..Self::default()
            },
        }
    }

    pub fn matches(&self, item: &ScheduleItem) -> bool {
        self.contract_id
            .as_deref()
            .is_none_or(|id| item.owner_contract_id == id)
            && self
                .person_id
                .as_deref()
                .is_none_or(|id| item.is_assigned_to_person(id))
            && self
                .equipment_id
                .as_deref()
                .is_none_or(|id| item.is_assigned_to_equipment(id))
            && self
                .subcontractor_id
                .as_deref()
                .is_none_or(|id| item.is_assigned_to_subcontractor(id))
    }
}

/// Read-only access to a schedule snapshot. Implementations are shared across rayon workers.
pub trait ScheduleRepository: Send + Sync {
    fn list_schedule_items(&self, filter: &ItemFilter) -> RepositoryResult<Vec<ScheduleItem>>;
    fn get_resource(&self, id: &str) -> RepositoryResult<Resource>;
    fn list_allocations(&self, resource_id: &str) -> RepositoryResult<Vec<Allocation>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shareable<R: ScheduleRepository>() {}

    #[test]
    fn adapters_can_be_shared_across_threads() {
        shareable::<InMemoryRepository>();
        shareable::<JsonSnapshotRepository>();
        shareable::<CsvSnapshotRepository>();
        shareable::<TableRepository>();
    }

    #[test]
    fn empty_filter_matches_everything() {
        let item = ScheduleItem::new("t1", "Any", "c9");
        assert!(ItemFilter::all().matches(&item));
    }

    #[test]
    fn filter_fields_combine_with_and() {
        let mut item = ScheduleItem::new("t1", "Any", "c1");
        item.assigned_person_ids.insert("p1".into());

        let mut filter = ItemFilter::contract("c1");
        assert!(filter.matches(&item));
        filter.person_id = Some("p2".into());
        assert!(!filter.matches(&item));
        filter.person_id = Some("p1".into());
        assert!(filter.matches(&item));
    }

    #[test]
    fn scope_filter_uses_matching_field() {
        let filter = ItemFilter::for_scope(&GanttScope::Equipment("lift".into()));
        assert_eq!(filter.equipment_id.as_deref(), Some("lift"));
        assert!(filter.contract_id.is_none());
    }
}
