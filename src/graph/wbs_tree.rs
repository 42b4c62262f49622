use crate::item::ScheduleItem;
use crate::warning::DataQualityWarning;
use petgraph::Direction;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;

/// Parent → child forest built from explicit `parent_id` links.
///
/// Orphaned links and links that would close a cycle are dropped, so every item ends up
/// either under an existing parent or as a root.
pub struct WbsTree {
    pub graph: DiGraph<String, ()>,
    pub id_to_index: HashMap<String, NodeIndex>,
    /// Position of each node in the input slice.
    pub item_positions: HashMap<NodeIndex, usize>,
    pub warnings: Vec<DataQualityWarning>,
}

impl WbsTree {
    pub fn build(items: &[ScheduleItem]) -> Self {
        let mut graph: DiGraph<String, ()> = DiGraph::new();
        let mut id_to_index: HashMap<String, NodeIndex> = HashMap::new();
        let mut item_positions: HashMap<NodeIndex, usize> = HashMap::new();
        let mut warnings = Vec::new();

        // Add nodes first; the first occurrence of an id wins
        for (position, item) in items.iter().enumerate() {
            if id_to_index.contains_key(&item.id) {
                warnings.push(DataQualityWarning::DuplicateItemId {
                    item_id: item.id.clone(),
                });
                continue;
            }
            let node_ix = graph.add_node(item.id.clone());
            id_to_index.insert(item.id.clone(), node_ix);
            item_positions.insert(node_ix, position);
        }

        // Accepted links only, so walking it always terminates
        let mut accepted_parent: HashMap<NodeIndex, NodeIndex> = HashMap::new();

        for (position, item) in items.iter().enumerate() {
            let Some(&child_ix) = id_to_index.get(&item.id) else {
                continue;
            };
            if item_positions.get(&child_ix) != Some(&position) {
                continue;
            }
            let Some(parent_id) = item.parent_id.as_deref() else {
                continue;
            };
            let Some(&parent_ix) = id_to_index.get(parent_id) else {
                tracing::debug!(item_id = %item.id, parent_id, "orphaned parent link");
                warnings.push(DataQualityWarning::OrphanedParent {
                    item_id: item.id.clone(),
                    parent_id: parent_id.to_string(),
                });
                continue;
            };

            let mut cursor = Some(parent_ix);
            let mut closes_cycle = false;
            while let Some(ancestor) = cursor {
                if ancestor == child_ix {
                    closes_cycle = true;
                    break;
                }
                cursor = accepted_parent.get(&ancestor).copied();
            }
            if closes_cycle {
                tracing::warn!(item_id = %item.id, parent_id, "parent link closes a cycle");
                warnings.push(DataQualityWarning::HierarchyCycle {
                    item_id: item.id.clone(),
                    parent_id: parent_id.to_string(),
                });
                continue;
            }

            graph.add_edge(parent_ix, child_ix, ());
            accepted_parent.insert(child_ix, parent_ix);
        }

        Self {
            graph,
            id_to_index,
            item_positions,
            warnings,
        }
    }

    pub fn contains(&self, item_id: &str) -> bool {
        self.id_to_index.contains_key(item_id)
    }

    pub fn parent_of(&self, item_id: &str) -> Option<&str> {
        let node_ix = *self.id_to_index.get(item_id)?;
        self.graph
            .neighbors_directed(node_ix, Direction::Incoming)
            .next()
            .map(|parent_ix| self.graph[parent_ix].as_str())
    }

    /// Direct children in input order.
    pub fn children_of(&self, item_id: &str) -> Vec<&str> {
        let Some(&node_ix) = self.id_to_index.get(item_id) else {
            return Vec::new();
        };
        self.ordered(
            self.graph
                .neighbors_directed(node_ix, Direction::Outgoing)
                .collect(),
        )
        .into_iter()
        .map(|child_ix| self.graph[child_ix].as_str())
        .collect()
    }

    /// Roots in input order.
    pub fn roots(&self) -> Vec<&str> {
        self.ordered(
            self.graph
                .node_indices()
                .filter(|&ix| {
                    self.graph
                        .neighbors_directed(ix, Direction::Incoming)
                        .next()
                        .is_none()
                })
                .collect(),
        )
        .into_iter()
        .map(|ix| self.graph[ix].as_str())
        .collect()
    }

    pub fn depth_of(&self, item_id: &str) -> usize {
        let mut depth = 0;
        let mut cursor = self.parent_of(item_id);
        while let Some(parent) = cursor {
            depth += 1;
            cursor = self.parent_of(parent);
        }
        depth
    }

    /// Node ids ordered so that every child precedes its parent.
    pub fn bottom_up_order(&self) -> Vec<&str> {
        let order = match toposort(&self.graph, None) {
            Ok(mut order) => {
                order.reverse();
                order
            }
            Err(cycle) => {
                // Unreachable for a forest; fall back to deepest-first
                tracing::warn!(node = ?cycle.node_id(), "cycle in work breakdown graph");
                let mut nodes: Vec<NodeIndex> = self.graph.node_indices().collect();
                nodes.sort_by_key(|&ix| std::cmp::Reverse(self.depth_of(&self.graph[ix])));
                nodes
            }
        };
        order.into_iter().map(|ix| self.graph[ix].as_str()).collect()
    }

    fn ordered(&self, mut nodes: Vec<NodeIndex>) -> Vec<NodeIndex> {
        nodes.sort_by_key(|ix| self.item_positions.get(ix).copied().unwrap_or(usize::MAX));
        nodes
    }
}
