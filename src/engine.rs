use crate::calculations::alerts::{generate_alerts, AlertReport};
use crate::calculations::availability::{calculate_availability, AvailabilitySummary};
use crate::calculations::conflicts::{detect_resource_conflicts, Conflict};
use crate::calculations::progress::{aggregate_progress, AggregatedTree};
use crate::calculations::status::{resolve_status, StatusResolution};
use crate::config::EngineConfig;
use crate::gantt::{build_gantt_view, build_gantt_views, GanttRoot, GanttView};
use crate::repository::{ItemFilter, RepositoryError, RepositoryResult, ScheduleRepository};
use crate::resource::Resource;
use crate::validation::{check_transition, validate_items};
use crate::warning::DataQualityWarning;
use chrono::NaiveDate;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashSet;

/// Availability and over-allocation for one resource.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceReport {
    pub resource: Resource,
    pub availability: AvailabilitySummary,
    pub conflicts: Vec<Conflict>,
}

/// Fetches snapshots from a repository and runs the calculators over them.
///
/// The engine holds no state besides its repository and configuration; every call reads a
/// fresh snapshot.
#[derive(Debug, Clone)]
pub struct ScheduleEngine<R> {
    repository: R,
    config: EngineConfig,
}

impl<R: ScheduleRepository> ScheduleEngine<R> {
    pub fn new(repository: R, config: EngineConfig) -> Self {
        Self { repository, config }
    }

    pub fn with_default_config(repository: R) -> Self {
        Self::new(repository, EngineConfig::default())
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub fn status_of(&self, item_id: &str, as_of: NaiveDate) -> RepositoryResult<StatusResolution> {
        let items = self.repository.list_schedule_items(&ItemFilter::all())?;
        let item = items
            .iter()
            .find(|item| item.id == item_id)
            .ok_or_else(|| RepositoryError::NotFound {
                entity: "schedule item",
                id: item_id.to_string(),
            })?;
        Ok(resolve_status(item, as_of))
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub fn progress(&self, filter: &ItemFilter) -> RepositoryResult<AggregatedTree> {
        // Ancestors outside the filter still feed the rollup
        let items = self.repository.list_schedule_items(&ItemFilter::all())?;
        let selected: HashSet<&str> = items
            .iter()
            .filter(|item| filter.matches(item))
            .map(|item| item.id.as_str())
            .collect();
        let tree = aggregate_progress(&items, self.config.weighting);
        Ok(tree.restrict_to(|item_id| selected.contains(item_id)))
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub fn alerts(&self, filter: &ItemFilter, as_of: NaiveDate) -> RepositoryResult<AlertReport> {
        let items = self.repository.list_schedule_items(filter)?;
        Ok(generate_alerts(&items, as_of, &self.config.alerts))
    }

    /// Soft invariant violations across the selected items.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn validate(&self, filter: &ItemFilter) -> RepositoryResult<Vec<DataQualityWarning>> {
        let items = self.repository.list_schedule_items(filter)?;
        Ok(validate_items(&items))
    }

    /// Items whose stored status cannot move to the status resolved for `as_of`.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn check_status_transitions(
        &self,
        filter: &ItemFilter,
        as_of: NaiveDate,
    ) -> RepositoryResult<Vec<DataQualityWarning>> {
        let items = self.repository.list_schedule_items(filter)?;
        Ok(items
            .iter()
            .filter_map(|item| {
                check_transition(&item.id, item.status, resolve_status(item, as_of).status)
            })
            .collect())
    }

    #[tracing::instrument(level = "debug", skip(self), fields(scope = %root.scope))]
    pub fn gantt_view(&self, root: &GanttRoot, as_of: NaiveDate) -> RepositoryResult<GanttView> {
        // Ancestors outside the scope still feed the rollup
        let items = self.repository.list_schedule_items(&ItemFilter::all())?;
        let view = build_gantt_view(root, &items, as_of, self.config.weighting);
        if !view.warnings.is_empty() {
            tracing::warn!(count = view.warnings.len(), "gantt view has data-quality warnings");
        }
        Ok(view)
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub fn resource_report(
        &self,
        resource_id: &str,
        as_of: NaiveDate,
    ) -> RepositoryResult<ResourceReport> {
        let resource = self.repository.get_resource(resource_id)?;
        let allocations = self.repository.list_allocations(resource_id)?;
        let availability = calculate_availability(&resource, &allocations, as_of);
        let conflicts = detect_resource_conflicts(&resource, &allocations);
        if !conflicts.is_empty() {
            tracing::warn!(resource_id, count = conflicts.len(), "resource over-allocated");
        }
        Ok(ResourceReport {
            resource,
            availability,
            conflicts,
        })
    }

    /// One report per resource id, computed in parallel. Fails on the first repository error.
    pub fn resource_reports(
        &self,
        resource_ids: &[String],
        as_of: NaiveDate,
    ) -> RepositoryResult<Vec<ResourceReport>> {
        resource_ids
            .par_iter()
            .map(|id| self.resource_report(id, as_of))
            .collect()
    }

    /// Views for several roots over a single snapshot.
    pub fn gantt_views(
        &self,
        roots: &[GanttRoot],
        as_of: NaiveDate,
    ) -> RepositoryResult<Vec<GanttView>> {
        let items = self.repository.list_schedule_items(&ItemFilter::all())?;
        Ok(build_gantt_views(roots, &items, as_of, self.config.weighting))
    }
}
