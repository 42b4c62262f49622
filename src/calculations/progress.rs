use crate::graph::WbsTree;
use crate::item::{ScheduleItem, WbsTier};
use crate::warning::DataQualityWarning;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// How children are weighted when rolling progress up to their parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightingStrategy {
    /// Every child counts once.
    #[default]
    EqualWeight,
    /// Children count by planned duration in days (at least 1).
    DurationWeighted,
}

impl WeightingStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            WeightingStrategy::EqualWeight => "equal_weight",
            WeightingStrategy::DurationWeighted => "duration_weighted",
        }
    }

    /// Weight of `item`, with a warning when duration weighting has no usable dates.
    pub fn weight_of(&self, item: &ScheduleItem) -> (f64, Option<DataQualityWarning>) {
        match self {
            WeightingStrategy::EqualWeight => (1.0, None),
            WeightingStrategy::DurationWeighted => match item.planned_duration_days() {
                Some(days) => (days.max(1) as f64, None),
                None => (
                    1.0,
                    Some(DataQualityWarning::DurationWeightFallback {
                        item_id: item.id.clone(),
                    }),
                ),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedNode {
    pub item_id: String,
    pub parent_id: Option<String>,
    pub children: Vec<String>,
    pub depth: usize,
    pub tier: WbsTier,
    pub reported_progress: u8,
    pub aggregated_progress: u8,
}

impl AggregatedNode {
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedTree {
    pub strategy: WeightingStrategy,
    /// Nodes in input order.
    pub nodes: Vec<AggregatedNode>,
    pub roots: Vec<String>,
    pub warnings: Vec<DataQualityWarning>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl AggregatedTree {
    pub fn get(&self, item_id: &str) -> Option<&AggregatedNode> {
        self.index
            .get(item_id)
            .and_then(|&position| self.nodes.get(position))
    }

    pub fn progress_of(&self, item_id: &str) -> Option<u8> {
        self.get(item_id).map(|node| node.aggregated_progress)
    }

    /// The nodes accepted by `keep`, with values computed over the whole tree.
    ///
    /// Roots are the kept nodes whose parent was not kept. Warnings are limited to kept items.
    pub fn restrict_to(&self, keep: impl Fn(&str) -> bool) -> AggregatedTree {
        let kept: HashSet<&str> = self
            .nodes
            .iter()
            .map(|node| node.item_id.as_str())
            .filter(|item_id| keep(item_id))
            .collect();

        let mut nodes = Vec::with_capacity(kept.len());
        let mut index = HashMap::with_capacity(kept.len());
        let mut roots = Vec::new();
        for node in self.nodes.iter().filter(|node| kept.contains(node.item_id.as_str())) {
            let mut node = node.clone();
            node.children.retain(|child| kept.contains(child.as_str()));
            if node
                .parent_id
                .as_deref()
                .is_none_or(|parent| !kept.contains(parent))
            {
                roots.push(node.item_id.clone());
            }
            index.insert(node.item_id.clone(), nodes.len());
            nodes.push(node);
        }

        AggregatedTree {
            strategy: self.strategy,
            nodes,
            roots,
            warnings: self
                .warnings
                .iter()
                .filter(|warning| warning.item_id().is_some_and(|id| kept.contains(id)))
                .cloned()
                .collect(),
            index,
        }
    }

    /// Copies of `items` with progress replaced by the aggregated value.
    pub fn apply_to(&self, items: &[ScheduleItem]) -> Vec<ScheduleItem> {
        items
            .iter()
            .map(|item| {
                let mut updated = item.clone();
                if let Some(progress) = self.progress_of(&item.id) {
                    updated.progress = progress;
                }
                updated
            })
            .collect()
    }
}

/// Rounded weighted mean of `(weight, progress)` pairs; `None` when the total weight is zero.
pub fn weighted_progress(parts: impl IntoIterator<Item = (f64, u8)>) -> Option<u8> {
    let (weighted_sum, weight_total) = parts
        .into_iter()
        .fold((0.0_f64, 0.0_f64), |(sum, total), (weight, progress)| {
            (sum + weight * f64::from(progress), total + weight)
        });
    if weight_total <= 0.0 {
        return None;
    }
    Some((weighted_sum / weight_total).round().clamp(0.0, 100.0) as u8)
}

/// Bottom-up progress rollup over a work breakdown.
pub struct ProgressRollup<'a> {
    items: &'a [ScheduleItem],
    strategy: WeightingStrategy,
}

impl<'a> ProgressRollup<'a> {
    pub fn new(items: &'a [ScheduleItem], strategy: WeightingStrategy) -> Self {
        Self { items, strategy }
    }

    pub fn execute(&self) -> AggregatedTree {
        let tree = WbsTree::build(self.items);
        let mut warnings = tree.warnings.clone();

        let mut by_id: HashMap<&str, &ScheduleItem> = HashMap::with_capacity(self.items.len());
        for item in self.items {
            by_id.entry(item.id.as_str()).or_insert(item);
        }

        // Children are always resolved before their parent
        let mut resolved: HashMap<&str, u8> = HashMap::with_capacity(by_id.len());
        for item_id in tree.bottom_up_order() {
            let Some(item) = by_id.get(item_id) else {
                continue;
            };
            let children = tree.children_of(item_id);
            let progress = if children.is_empty() {
                item.progress.min(100)
            } else {
                let mut parts = Vec::with_capacity(children.len());
                for child_id in &children {
                    let (Some(child), Some(&child_progress)) =
                        (by_id.get(child_id), resolved.get(child_id))
                    else {
                        continue;
                    };
                    let (weight, warning) = self.strategy.weight_of(child);
                    warnings.extend(warning);
                    parts.push((weight, child_progress));
                }
                weighted_progress(parts).unwrap_or(item.progress.min(100))
            };
            resolved.insert(item_id, progress);
        }

        let mut nodes = Vec::with_capacity(by_id.len());
        let mut index = HashMap::with_capacity(by_id.len());
        for item in self.items {
            if index.contains_key(&item.id) {
                continue;
            }
            let depth = tree.depth_of(&item.id);
            index.insert(item.id.clone(), nodes.len());
            nodes.push(AggregatedNode {
                item_id: item.id.clone(),
                parent_id: tree.parent_of(&item.id).map(ToOwned::to_owned),
                children: tree
                    .children_of(&item.id)
                    .into_iter()
                    .map(ToOwned::to_owned)
                    .collect(),
                depth,
                tier: item.tier.unwrap_or_else(|| WbsTier::from_depth(depth)),
                reported_progress: item.progress,
                aggregated_progress: resolved
                    .get(item.id.as_str())
                    .copied()
                    .unwrap_or(item.progress.min(100)),
            });
        }

        AggregatedTree {
            strategy: self.strategy,
            nodes,
            roots: tree.roots().into_iter().map(ToOwned::to_owned).collect(),
            warnings,
            index,
        }
    }
}

pub fn aggregate_progress(items: &[ScheduleItem], strategy: WeightingStrategy) -> AggregatedTree {
    ProgressRollup::new(items, strategy).execute()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn d(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn leaf(id: &str, parent: &str, progress: u8) -> ScheduleItem {
        ScheduleItem::new(id, id, "c1")
            .with_parent(parent)
            .with_progress(progress)
    }

    #[test]
    fn weighted_progress_rounds_half_away_from_zero() {
        assert_eq!(weighted_progress([(1.0, 50), (1.0, 51)]), Some(51));
        assert_eq!(weighted_progress([(1.0, 0), (2.0, 100)]), Some(67));
        assert_eq!(weighted_progress(Vec::new()), None);
    }

    #[test]
    fn parent_takes_mean_of_children() {
        let items = vec![
            ScheduleItem::new("p", "Parent", "c1").with_progress(10),
            leaf("a", "p", 100),
            leaf("b", "p", 50),
            leaf("c", "p", 0),
        ];
        let tree = aggregate_progress(&items, WeightingStrategy::EqualWeight);
        assert_eq!(tree.progress_of("p"), Some(50));
        assert_eq!(tree.progress_of("a"), Some(100));
        assert_eq!(tree.roots, vec!["p".to_string()]);
        assert_eq!(tree.get("p").unwrap().children, vec!["a", "b", "c"]);
    }

    #[test]
    fn three_tiers_roll_up_from_the_bottom() {
        let items = vec![
            ScheduleItem::new("large", "Building", "c1"),
            ScheduleItem::new("m1", "Structure", "c1").with_parent("large"),
            ScheduleItem::new("m2", "Finishing", "c1")
                .with_parent("large")
                .with_progress(20),
            leaf("s1", "m1", 100),
            leaf("s2", "m1", 60),
        ];
        let tree = aggregate_progress(&items, WeightingStrategy::EqualWeight);
        assert_eq!(tree.progress_of("m1"), Some(80));
        assert_eq!(tree.progress_of("m2"), Some(20));
        assert_eq!(tree.progress_of("large"), Some(50));
        assert_eq!(tree.get("large").unwrap().tier, WbsTier::Large);
        assert_eq!(tree.get("m1").unwrap().tier, WbsTier::Medium);
        assert_eq!(tree.get("s1").unwrap().tier, WbsTier::Small);
    }

    #[test]
    fn duration_weighting_favours_longer_children() {
        let items = vec![
            ScheduleItem::new("p", "Parent", "c1"),
            leaf("short", "p", 100).with_planned_period(d(2024, 1, 1), d(2024, 1, 2)),
            leaf("long", "p", 0).with_planned_period(d(2024, 1, 1), d(2024, 1, 10)),
        ];
        let tree = aggregate_progress(&items, WeightingStrategy::DurationWeighted);
        assert_eq!(tree.progress_of("p"), Some(10));
        assert!(tree.warnings.is_empty());
    }

    #[test]
    fn duration_weighting_falls_back_for_undated_children() {
        let items = vec![
            ScheduleItem::new("p", "Parent", "c1"),
            leaf("a", "p", 100),
            leaf("b", "p", 0),
        ];
        let tree = aggregate_progress(&items, WeightingStrategy::DurationWeighted);
        assert_eq!(tree.progress_of("p"), Some(50));
        assert_eq!(tree.warnings.len(), 2);
    }

    #[test]
    fn orphan_becomes_its_own_root() {
        let items = vec![leaf("a", "missing", 40)];
        let tree = aggregate_progress(&items, WeightingStrategy::EqualWeight);
        assert_eq!(tree.progress_of("a"), Some(40));
        assert_eq!(tree.roots, vec!["a".to_string()]);
        assert!(matches!(
            tree.warnings.as_slice(),
            [DataQualityWarning::OrphanedParent { .. }]
        ));
    }

    #[test]
    fn restriction_keeps_values_from_the_full_tree() {
        let items = vec![
            ScheduleItem::new("p", "Parent", "c1"),
            leaf("a", "p", 80),
            leaf("b", "p", 20),
            leaf("x", "missing", 10),
        ];
        let tree = aggregate_progress(&items, WeightingStrategy::EqualWeight);
        let restricted = tree.restrict_to(|item_id| item_id == "a" || item_id == "p");

        assert_eq!(restricted.nodes.len(), 2);
        assert_eq!(restricted.progress_of("p"), Some(50));
        assert_eq!(restricted.get("p").unwrap().children, vec!["a"]);
        assert_eq!(restricted.roots, vec!["p".to_string()]);
        assert!(restricted.warnings.is_empty());
        assert_eq!(restricted.progress_of("b"), None);
    }

    #[test]
    fn cyclic_links_are_broken_without_failing() {
        let items = vec![leaf("a", "b", 30), leaf("b", "a", 70)];
        let tree = aggregate_progress(&items, WeightingStrategy::EqualWeight);
        assert_eq!(tree.nodes.len(), 2);
        assert_eq!(tree.roots, vec!["b".to_string()]);
        assert_eq!(tree.progress_of("b"), Some(30));
        assert!(
            tree.warnings
                .iter()
                .any(|w| matches!(w, DataQualityWarning::HierarchyCycle { .. }))
        );
    }

    #[test]
    fn reaggregating_is_idempotent() {
        let items = vec![
            ScheduleItem::new("root", "Root", "c1"),
            ScheduleItem::new("m", "Mid", "c1").with_parent("root"),
            leaf("s1", "m", 33),
            leaf("s2", "m", 34),
            leaf("s3", "root", 90),
        ];
        let first = aggregate_progress(&items, WeightingStrategy::EqualWeight);
        let second = aggregate_progress(&first.apply_to(&items), WeightingStrategy::EqualWeight);
        for node in &first.nodes {
            assert_eq!(
                second.progress_of(&node.item_id),
                Some(node.aggregated_progress)
            );
        }
    }
}
