//! Layered graph layout for visualizing the node tree.
//!
//! The layout is breadth-first: every root sits on level 0, children one level
//! below the first parent that reached them, and each level is spread evenly
//! around a fixed horizontal center.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use serde::Serialize;
use treewatch_types::{GraphViewEdge, GraphViewNode, Position, TreeSnapshot};

use crate::propagation::compute_propagation_depth;

/// Geometry used by [`GraphLayoutEngine`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutConfig {
    /// Horizontal center of every level.
    pub origin_x: f64,
    /// Vertical position of level 0.
    pub origin_y: f64,
    /// Horizontal distance between neighbours on a level.
    pub node_spacing: f64,
    /// Vertical distance between levels.
    pub level_height: f64,
    /// Where the lone node goes when the input has no root.
    pub fallback: Position,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            origin_x: 500.0,
            origin_y: 100.0,
            node_spacing: 180.0,
            level_height: 150.0,
            fallback: Position::new(300.0, 50.0),
        }
    }
}

/// Positioned nodes and the edges between them, ready for a renderer.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GraphView {
    pub nodes: Vec<GraphViewNode>,
    pub edges: Vec<GraphViewEdge>,
}

/// Computes deterministic 2D positions for graph nodes.
#[derive(Debug, Clone, Default)]
pub struct GraphLayoutEngine {
    config: LayoutConfig,
}

impl GraphLayoutEngine {
    pub fn new(config: LayoutConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Position `nodes` using `edges` for structure.
    ///
    /// Roots are the nodes no edge points to. When there are none, only the
    /// first node is placed, at the fallback coordinate. Nodes that can't be
    /// reached from a root, and edge endpoints missing from `nodes`, get no
    /// position.
    ///
    /// # Example
    ///
    /// ```
    /// use treewatch::GraphLayoutEngine;
    /// use treewatch_types::{GraphViewEdge, GraphViewNode};
    ///
    /// let nodes = vec![GraphViewNode::new("a"), GraphViewNode::new("b")];
    /// let edges = vec![GraphViewEdge::new("a", "b")];
    ///
    /// let positions = GraphLayoutEngine::default().layout(&nodes, &edges);
    /// assert_eq!(positions["a"].y, 100.0);
    /// assert_eq!(positions["b"].y, 250.0);
    /// ```
    pub fn layout(
        &self,
        nodes: &[GraphViewNode],
        edges: &[GraphViewEdge],
    ) -> BTreeMap<String, Position> {
        let mut positions = BTreeMap::new();
        let known: HashSet<&str> = nodes.iter().map(|n| n.id.as_str()).collect();

        let mut children: HashMap<&str, Vec<&str>> = HashMap::new();
        let mut has_parent: HashSet<&str> = HashSet::new();
        for edge in edges {
            let (source, target) = (edge.source_id.as_str(), edge.target_id.as_str());
            if !known.contains(source) || !known.contains(target) {
                continue;
            }
            children.entry(source).or_default().push(target);
            has_parent.insert(target);
        }

        let roots: Vec<&str> = nodes
            .iter()
            .map(|n| n.id.as_str())
            .filter(|id| !has_parent.contains(id))
            .collect();

        if roots.is_empty() {
            if let Some(first) = nodes.first() {
                positions.insert(first.id.clone(), self.config.fallback);
            }
            return positions;
        }

        let mut levels: Vec<Vec<&str>> = Vec::new();
        let mut visited: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<(&str, usize)> = roots.into_iter().map(|id| (id, 0)).collect();

        while let Some((id, level)) = queue.pop_front() {
            if !visited.insert(id) {
                continue;
            }
            if levels.len() <= level {
                levels.resize_with(level + 1, Vec::new);
            }
            levels[level].push(id);

            for &child in children.get(id).into_iter().flatten() {
                if !visited.contains(child) {
                    queue.push_back((child, level + 1));
                }
            }
        }

        let LayoutConfig {
            origin_x,
            origin_y,
            node_spacing,
            level_height,
            ..
        } = self.config;

        for (level, ids) in levels.iter().enumerate() {
            let y = origin_y + level as f64 * level_height;
            let total_width = (ids.len() - 1) as f64 * node_spacing;
            let start_x = origin_x - total_width / 2.0;

            for (index, id) in ids.iter().enumerate() {
                let x = start_x + index as f64 * node_spacing;
                positions.insert(id.to_string(), Position::new(x, y));
            }
        }

        positions
    }

    /// Build a positioned graph from a tree snapshot.
    ///
    /// Edges run parent to child. An edge is a propagation path when the child
    /// was propagated from that parent. Propagation depths come from
    /// [`compute_propagation_depth`].
    pub fn graph_view(&self, snapshot: &TreeSnapshot) -> GraphView {
        let depths = compute_propagation_depth(&snapshot.nodes);

        let mut nodes: Vec<GraphViewNode> = snapshot
            .nodes
            .iter()
            .map(|node| GraphViewNode {
                is_trigger_source: node.is_propagation_origin(),
                propagation_depth: depths.get(&node.id).copied().unwrap_or(0),
                ..GraphViewNode::new(node.id.clone())
            })
            .collect();

        let edges: Vec<GraphViewEdge> = snapshot
            .nodes
            .iter()
            .flat_map(|parent| {
                parent.children.iter().filter_map(move |child_id| {
                    let child = snapshot.get(child_id)?;
                    Some(GraphViewEdge {
                        is_propagation_path: child.propagated_from.as_deref()
                            == Some(parent.id.as_str()),
                        ..GraphViewEdge::new(parent.id.clone(), child_id.clone())
                    })
                })
            })
            .collect();

        let positions = self.layout(&nodes, &edges);
        nodes.retain_mut(|node| match positions.get(&node.id) {
            Some(position) => {
                node.x = position.x;
                node.y = position.y;
                true
            }
            None => false,
        });

        GraphView { nodes, edges }
    }
}
