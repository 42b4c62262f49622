pub mod calculations;
pub mod config;
pub mod engine;
pub mod gantt;
pub mod graph;
pub mod item;
pub mod repository;
pub mod resource;
pub mod validation;
pub mod warning;

pub use calculations::alerts::{generate_alerts, Alert, AlertConfig, AlertKind, AlertReport, Severity};
pub use calculations::availability::{
    calculate_availability, utilization_timeline, AvailabilityStatus, AvailabilitySummary,
};
pub use calculations::conflicts::{detect_conflicts, detect_resource_conflicts, Conflict};
pub use calculations::progress::{
    aggregate_progress, AggregatedNode, AggregatedTree, ProgressRollup, WeightingStrategy,
};
pub use calculations::status::{resolve_status, resolve_status_today, StatusResolution};
pub use crate::config::{ConfigError, EngineConfig};
pub use engine::{ResourceReport, ScheduleEngine};
pub use gantt::{
    build_gantt_view, build_gantt_views, GanttRoot, GanttRow, GanttScope, GanttSummary,
    GanttView, MilestoneState,
};
pub use graph::WbsTree;
pub use item::{HoldMarker, ScheduleItem, Status, UnknownStatus, WbsTier};
pub use repository::{
    CsvSnapshotRepository, FieldMap, InMemoryRepository, ItemFilter, JsonSnapshotRepository,
    RepositoryError, RepositoryResult, ScheduleRepository, ScheduleSnapshot, TableRepository,
};
pub use resource::{Allocation, Period, Resource, ResourceKind};
pub use validation::{check_transition, validate_item, validate_items};
pub use warning::{DataQualityWarning, DateField};
