use super::field_map::{FieldMap, RecordSource};
use super::{ItemFilter, RepositoryError, RepositoryResult, ScheduleRepository};
use crate::item::ScheduleItem;
use crate::resource::{Allocation, Resource};
use crate::warning::DataQualityWarning;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Read;

/// Typed snapshot of everything the engine reads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleSnapshot {
    pub items: Vec<ScheduleItem>,
    pub resources: Vec<Resource>,
    pub allocations: Vec<Allocation>,
}

/// Repository over a snapshot held in memory. Also the backing store for the file and
/// table adapters once their records are converted.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRepository {
    items: Vec<ScheduleItem>,
    resources: BTreeMap<String, Resource>,
    allocations: Vec<Allocation>,
    warnings: Vec<DataQualityWarning>,
}

impl InMemoryRepository {
    pub fn new(snapshot: ScheduleSnapshot) -> Self {
        let mut resources = BTreeMap::new();
        for resource in snapshot.resources {
            if resources.contains_key(&resource.id) {
                tracing::warn!(resource_id = %resource.id, "duplicate resource id, keeping first");
                continue;
            }
            resources.insert(resource.id.clone(), resource);
        }
        Self {
            items: snapshot.items,
            resources,
            allocations: snapshot.allocations,
            warnings: Vec::new(),
        }
    }

    /// Reads a typed snapshot serialized with serde.
    pub fn from_json_reader<R: Read>(reader: R) -> RepositoryResult<Self> {
        let snapshot: ScheduleSnapshot = serde_json::from_reader(reader)?;
        Ok(Self::new(snapshot))
    }

    /// Converts raw records through `fields`. Unconvertible records are dropped and their
    /// warnings kept on the repository.
    pub fn from_records<I, R, A>(items: I, resources: R, allocations: A, fields: &FieldMap) -> Self
    where
        I: IntoIterator,
        I::Item: RecordSource,
        R: IntoIterator,
        R::Item: RecordSource,
        A: IntoIterator,
        A::Item: RecordSource,
    {
        let mut warnings = Vec::new();
        let mut snapshot = ScheduleSnapshot::default();
        for record in items {
            snapshot
                .items
                .extend(fields.item_from_record(&record, &mut warnings));
        }
        for record in resources {
            snapshot
                .resources
                .extend(fields.resource_from_record(&record, &mut warnings));
        }
        for record in allocations {
            snapshot
                .allocations
                .extend(fields.allocation_from_record(&record, &mut warnings));
        }

        tracing::debug!(
            items = snapshot.items.len(),
            resources = snapshot.resources.len(),
            allocations = snapshot.allocations.len(),
            warnings = warnings.len(),
            "converted raw records"
        );
        for warning in &warnings {
            tracing::warn!(%warning, "record conversion");
        }

        let mut repository = Self::new(snapshot);
        repository.warnings = warnings;
        repository
    }

    pub fn items(&self) -> &[ScheduleItem] {
        &self.items
    }

    pub fn resources(&self) -> impl Iterator<Item = &Resource> {
        self.resources.values()
    }

    pub fn allocations(&self) -> &[Allocation] {
        &self.allocations
    }

    /// Findings raised while converting source records.
    pub fn warnings(&self) -> &[DataQualityWarning] {
        &self.warnings
    }

    pub fn snapshot(&self) -> ScheduleSnapshot {
        ScheduleSnapshot {
            items: self.items.clone(),
            resources: self.resources.values().cloned().collect(),
            allocations: self.allocations.clone(),
        }
    }
}

impl ScheduleRepository for InMemoryRepository {
    fn list_schedule_items(&self, filter: &ItemFilter) -> RepositoryResult<Vec<ScheduleItem>> {
        Ok(self
            .items
            .iter()
            .filter(|item| filter.matches(item))
            .cloned()
            .collect())
    }

    fn get_resource(&self, id: &str) -> RepositoryResult<Resource> {
        self.resources
            .get(id)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound {
                entity: "resource",
                id: id.to_string(),
            })
    }

    fn list_allocations(&self, resource_id: &str) -> RepositoryResult<Vec<Allocation>> {
        Ok(self
            .allocations
            .iter()
            .filter(|allocation| allocation.resource_id == resource_id)
            .cloned()
            .collect())
    }
}
