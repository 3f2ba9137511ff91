//! WireGraph - cross-reference graph between diagram nodes.
//!
//! Wires are not tree edges: any node may point at any other node, cycles and
//! self-wires included. The graph is stored in petgraph's StableGraph with a
//! map from stable NodeId to petgraph NodeIndex, so lookups by identifier stay
//! O(1) and wires come back in declaration order.

use std::collections::HashMap;

use petgraph::stable_graph::{NodeIndex, StableGraph};
use petgraph::visit::{EdgeRef, IntoEdgeReferences};
use petgraph::{Directed, Direction};

use super::node::NodeId;
use super::tree::WeightedTree;

/// Directed graph of declared wires.
pub struct WireGraph {
    /// Nodes store their stable NodeId; edges carry their declaration slot.
    graph: StableGraph<NodeId, usize, Directed>,

    /// Map from stable NodeId to petgraph NodeIndex
    node_id_to_index: HashMap<NodeId, NodeIndex>,
}

impl WireGraph {
    /// Create an empty wire graph.
    pub fn new() -> Self {
        Self {
            graph: StableGraph::new(),
            node_id_to_index: HashMap::new(),
        }
    }

    /// Load every node of a validated tree and all of its declared wires.
    ///
    /// Nodes are added in pre-order, wires in pre-order then per-node
    /// declaration order.
    pub fn from_tree(tree: &WeightedTree) -> Self {
        let order = tree.pre_order();
        let mut wires = Self {
            graph: StableGraph::with_capacity(tree.len(), tree.wire_count()),
            node_id_to_index: HashMap::with_capacity(tree.len()),
        };

        for &idx in &order {
            wires.add_node(tree.node(idx).id);
        }
        for &idx in &order {
            let node = tree.node(idx);
            for &dest in &node.dest_node_ids {
                wires.add_wire(node.id, dest);
            }
        }
        wires
    }

    /// Add a node, returning false if it was already present.
    pub fn add_node(&mut self, id: NodeId) -> bool {
        if self.node_id_to_index.contains_key(&id) {
            return false;
        }
        let index = self.graph.add_node(id);
        self.node_id_to_index.insert(id, index);
        true
    }

    /// Add a wire between two known nodes.
    ///
    /// Returns false if either endpoint is unknown.
    pub fn add_wire(&mut self, source: NodeId, dest: NodeId) -> bool {
        let (Some(&s), Some(&d)) = (
            self.node_id_to_index.get(&source),
            self.node_id_to_index.get(&dest),
        ) else {
            return false;
        };
        let slot = self.graph.edge_count();
        self.graph.add_edge(s, d, slot);
        true
    }

    /// Get the number of nodes.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Get the number of wires.
    pub fn wire_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// All wires as (source, destination) in declaration order.
    pub fn wires(&self) -> Vec<(NodeId, NodeId)> {
        let mut wires: Vec<_> = self
            .graph
            .edge_references()
            .map(|e| (*e.weight(), self.graph[e.source()], self.graph[e.target()]))
            .collect();
        wires.sort_by_key(|&(slot, _, _)| slot);
        wires.into_iter().map(|(_, s, d)| (s, d)).collect()
    }

    /// Destinations of wires leaving `id`, in declaration order.
    pub fn destinations(&self, id: NodeId) -> Vec<NodeId> {
        self.neighbors(id, Direction::Outgoing)
    }

    /// Sources of wires arriving at `id`, in declaration order.
    pub fn sources(&self, id: NodeId) -> Vec<NodeId> {
        self.neighbors(id, Direction::Incoming)
    }

    fn neighbors(&self, id: NodeId, direction: Direction) -> Vec<NodeId> {
        let Some(&index) = self.node_id_to_index.get(&id) else {
            return Vec::new();
        };
        let mut found: Vec<(usize, NodeId)> = self
            .graph
            .edges_directed(index, direction)
            .map(|e| {
                let other = if e.source() == index { e.target() } else { e.source() };
                (*e.weight(), self.graph[other])
            })
            .collect();
        found.sort_by_key(|&(slot, _)| slot);
        found.into_iter().map(|(_, id)| id).collect()
    }
}

impl Default for WireGraph {
    fn default() -> Self {
        Self::new()
    }
}
