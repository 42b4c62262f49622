use crate::calculations::progress::{
    AggregatedTree, WeightingStrategy, aggregate_progress, weighted_progress,
};
use crate::calculations::status::resolve_status;
use crate::item::{ScheduleItem, Status, WbsTier};
use crate::warning::DataQualityWarning;
use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;

/// Entity a gantt view is rooted at.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum GanttScope {
    Contract(String),
    Person(String),
    Equipment(String),
    Subcontractor(String),
}

impl GanttScope {
    pub fn entity_id(&self) -> &str {
        match self {
            GanttScope::Contract(id)
            | GanttScope::Person(id)
            | GanttScope::Equipment(id)
            | GanttScope::Subcontractor(id) => id,
        }
    }

    pub fn kind_str(&self) -> &'static str {
        match self {
            GanttScope::Contract(_) => "contract",
            GanttScope::Person(_) => "person",
            GanttScope::Equipment(_) => "equipment",
            GanttScope::Subcontractor(_) => "subcontractor",
        }
    }

    /// Contract scope follows the owner link; resource scopes follow assignments.
    pub fn includes(&self, item: &ScheduleItem) -> bool {
        match self {
            GanttScope::Contract(id) => item.owner_contract_id == *id,
            GanttScope::Person(id) => item.is_assigned_to_person(id),
            GanttScope::Equipment(id) => item.is_assigned_to_equipment(id),
            GanttScope::Subcontractor(id) => item.is_assigned_to_subcontractor(id),
        }
    }
}

impl fmt::Display for GanttScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind_str(), self.entity_id())
    }
}

/// Root entity of a view. Without explicit dates the span is derived from the selected items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GanttRoot {
    pub scope: GanttScope,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub planned_start: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub planned_end: Option<NaiveDate>,
}

impl GanttRoot {
    pub fn new(scope: GanttScope) -> Self {
        Self {
            scope,
            name: None,
            planned_start: None,
            planned_end: None,
        }
    }

    pub fn with_planned_period(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.planned_start = Some(start);
        self.planned_end = Some(end);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GanttRow {
    pub item_id: String,
    pub name: String,
    /// Nearest ancestor that is also part of the view.
    pub parent_id: Option<String>,
    /// Nesting level within the view.
    pub depth: usize,
    pub tier: WbsTier,
    pub planned_start: Option<NaiveDate>,
    pub planned_end: Option<NaiveDate>,
    pub actual_start: Option<NaiveDate>,
    pub actual_end: Option<NaiveDate>,
    pub status: Status,
    pub reported_progress: u8,
    pub aggregated_progress: u8,
    pub milestone: bool,
    pub critical_path: bool,
    pub predecessor_ids: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<DataQualityWarning>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MilestoneState {
    Achieved,
    Missed,
    Pending,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MilestoneView {
    pub item_id: String,
    pub name: String,
    pub planned_end: Option<NaiveDate>,
    pub state: MilestoneState,
}

/// Completed → achieved; planned end before `as_of` → missed; otherwise pending.
pub fn classify_milestone(
    status: Status,
    planned_end: Option<NaiveDate>,
    as_of: NaiveDate,
) -> MilestoneState {
    if status == Status::Completed {
        MilestoneState::Achieved
    } else if planned_end.is_some_and(|end| end < as_of) {
        MilestoneState::Missed
    } else {
        MilestoneState::Pending
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GanttSummary {
    pub planned_start: Option<NaiveDate>,
    pub planned_end: Option<NaiveDate>,
    pub total_duration_days: i64,
    pub elapsed_days: i64,
    pub remaining_days: i64,
    pub overall_progress: u8,
    pub item_count: usize,
    pub delayed_count: usize,
    pub critical_path_count: usize,
    pub achieved_milestones: usize,
    pub missed_milestones: usize,
    pub pending_milestones: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GanttView {
    pub root: GanttRoot,
    pub as_of: NaiveDate,
    pub strategy: WeightingStrategy,
    /// Depth-first by hierarchy; siblings by planned start, then id.
    pub rows: Vec<GanttRow>,
    pub milestones: Vec<MilestoneView>,
    pub summary: GanttSummary,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<DataQualityWarning>,
}

impl GanttView {
    pub fn row(&self, item_id: &str) -> Option<&GanttRow> {
        self.rows.iter().find(|row| row.item_id == item_id)
    }
}

pub fn build_gantt_view(
    root: &GanttRoot,
    items: &[ScheduleItem],
    as_of: NaiveDate,
    strategy: WeightingStrategy,
) -> GanttView {
    let tree = aggregate_progress(items, strategy);
    assemble(root, items, &tree, as_of, strategy)
}

/// Builds one view per root in parallel, sharing a single progress rollup.
pub fn build_gantt_views(
    roots: &[GanttRoot],
    items: &[ScheduleItem],
    as_of: NaiveDate,
    strategy: WeightingStrategy,
) -> Vec<GanttView> {
    let tree = aggregate_progress(items, strategy);
    roots
        .par_iter()
        .map(|root| assemble(root, items, &tree, as_of, strategy))
        .collect()
}

fn assemble(
    root: &GanttRoot,
    items: &[ScheduleItem],
    tree: &AggregatedTree,
    as_of: NaiveDate,
    strategy: WeightingStrategy,
) -> GanttView {
    // Selection keeps the first occurrence of each id, in input order
    let mut seen = HashSet::new();
    let selected: Vec<&ScheduleItem> = items
        .iter()
        .filter(|item| root.scope.includes(item) && seen.insert(item.id.as_str()))
        .collect();
    let selected_ids: HashSet<&str> = selected.iter().map(|item| item.id.as_str()).collect();

    let view_parent: HashMap<&str, Option<&str>> = selected
        .iter()
        .map(|item| {
            (
                item.id.as_str(),
                nearest_selected_ancestor(tree, &item.id, &selected_ids),
            )
        })
        .collect();

    let mut children: HashMap<Option<&str>, Vec<&ScheduleItem>> = HashMap::new();
    for item in &selected {
        children
            .entry(view_parent.get(item.id.as_str()).copied().flatten())
            .or_default()
            .push(*item);
    }
    for siblings in children.values_mut() {
        siblings.sort_by(|a, b| {
            a.planned_start
                .is_none()
                .cmp(&b.planned_start.is_none())
                .then_with(|| a.planned_start.cmp(&b.planned_start))
                .then_with(|| a.id.cmp(&b.id))
        });
    }

    let mut rows = Vec::with_capacity(selected.len());
    let mut milestones = Vec::new();
    let mut summary = GanttSummary {
        item_count: selected.len(),
        ..GanttSummary::default()
    };

    let mut stack: Vec<(&ScheduleItem, usize)> = children
        .get(&None)
        .map(|top| top.iter().rev().map(|item| (*item, 0)).collect())
        .unwrap_or_default();
    while let Some((item, depth)) = stack.pop() {
        let resolution = resolve_status(item, as_of);
        let node = tree.get(&item.id);

        if resolution.status == Status::Delayed {
            summary.delayed_count += 1;
        }
        if item.critical_path {
            summary.critical_path_count += 1;
        }
        if item.milestone {
            let state = classify_milestone(resolution.status, item.planned_end, as_of);
            match state {
                MilestoneState::Achieved => summary.achieved_milestones += 1,
                MilestoneState::Missed => summary.missed_milestones += 1,
                MilestoneState::Pending => summary.pending_milestones += 1,
            }
            milestones.push(MilestoneView {
                item_id: item.id.clone(),
                name: item.name.clone(),
                planned_end: item.planned_end,
                state,
            });
        }

        rows.push(GanttRow {
            item_id: item.id.clone(),
            name: item.name.clone(),
            parent_id: view_parent
                .get(item.id.as_str())
                .copied()
                .flatten()
                .map(ToOwned::to_owned),
            depth,
            tier: node
                .map(|node| node.tier)
                .unwrap_or_else(|| WbsTier::from_depth(depth)),
            planned_start: item.planned_start,
            planned_end: item.planned_end,
            actual_start: item.actual_start,
            actual_end: item.actual_end,
            status: resolution.status,
            reported_progress: item.progress,
            aggregated_progress: node
                .map(|node| node.aggregated_progress)
                .unwrap_or(item.progress),
            milestone: item.milestone,
            critical_path: item.critical_path,
            predecessor_ids: item.predecessor_ids.clone(),
            warnings: resolution.warnings,
        });

        if let Some(kids) = children.get(&Some(item.id.as_str())) {
            stack.extend(kids.iter().rev().map(|kid| (*kid, depth + 1)));
        }
    }

    let top_level = children.get(&None).map(Vec::as_slice).unwrap_or_default();
    let mut warnings: Vec<DataQualityWarning> = tree
        .warnings
        .iter()
        .filter(|warning| {
            warning
                .item_id()
                .is_some_and(|item_id| selected_ids.contains(item_id))
        })
        .cloned()
        .collect();
    let parts = top_level.iter().map(|item| {
        let (weight, _) = strategy.weight_of(item);
        (weight, tree.progress_of(&item.id).unwrap_or(item.progress))
    });
    summary.overall_progress = weighted_progress(parts).unwrap_or(0);

    let span_start = root
        .planned_start
        .or_else(|| selected.iter().filter_map(|item| item.planned_start).min());
    let span_end = root
        .planned_end
        .or_else(|| selected.iter().filter_map(|item| item.planned_end).max());
    summary.planned_start = span_start;
    summary.planned_end = span_end;
    match (span_start, span_end) {
        (Some(start), Some(end)) => {
            let total = (end - start).num_days().max(0);
            summary.total_duration_days = total;
            summary.elapsed_days = (as_of - start).num_days().clamp(0, total);
            summary.remaining_days = (end - as_of).num_days().clamp(0, total);
        }
        _ => warnings.push(DataQualityWarning::UndatedScope {
            scope: root.scope.to_string(),
        }),
    }

    tracing::debug!(
        scope = %root.scope,
        rows = rows.len(),
        delayed = summary.delayed_count,
        "gantt view assembled"
    );

    GanttView {
        root: root.clone(),
        as_of,
        strategy,
        rows,
        milestones,
        summary,
        warnings,
    }
}

fn nearest_selected_ancestor<'t>(
    tree: &'t AggregatedTree,
    item_id: &str,
    selected: &HashSet<&str>,
) -> Option<&'t str> {
    let mut cursor = tree.get(item_id)?.parent_id.as_deref();
    while let Some(ancestor) = cursor {
        if selected.contains(ancestor) {
            return Some(ancestor);
        }
        cursor = tree.get(ancestor)?.parent_id.as_deref();
    }
    None
}
