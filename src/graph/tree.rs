//! Hierarchy builder: raw records → weighted tree.
//!
//! The builder validates the whole input before anything is laid out, then
//! flattens it into an arena with aggregated weights. Siblings are ordered by
//! descending aggregate weight (stable on input order) because the packer's
//! front-chain placement depends on presentation order.

use std::collections::{HashMap, HashSet, VecDeque};

use log::debug;

use super::node::{Node, NodeId, NodeKind};
use crate::error::InvalidTreeError;

/// A node of the weighted tree.
#[derive(Debug, Clone)]
pub struct WeightedNode {
    /// Stable identifier from the input.
    pub id: NodeId,
    /// Display name.
    pub name: String,
    /// Aggregate weight: own value for leaves, sum of children otherwise.
    pub value: f64,
    /// Distance from the root (root = 0).
    pub depth: u32,
    /// Longest distance to a descendant leaf (leaf = 0).
    pub height: u32,
    /// Parent arena index (None for root).
    pub parent: Option<usize>,
    /// Children arena indices, heaviest first.
    pub children: Vec<usize>,
    /// Wire destinations in declaration order.
    pub dest_node_ids: Vec<NodeId>,
}

impl WeightedNode {
    /// Leaf or container.
    pub fn kind(&self) -> NodeKind {
        if self.children.is_empty() {
            NodeKind::Leaf
        } else {
            NodeKind::Container
        }
    }

    /// True if the node has no children.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Validated tree with aggregated weights. The root is at arena index 0.
#[derive(Debug, Clone)]
pub struct WeightedTree {
    nodes: Vec<WeightedNode>,
    id_to_index: HashMap<NodeId, usize>,
}

impl WeightedTree {
    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True if the tree has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The root node.
    pub fn root(&self) -> &WeightedNode {
        &self.nodes[0]
    }

    /// Node at an arena index.
    pub fn node(&self, index: usize) -> &WeightedNode {
        &self.nodes[index]
    }

    /// All nodes in arena (input pre-order) order.
    pub fn nodes(&self) -> &[WeightedNode] {
        &self.nodes
    }

    /// Arena index for a stable identifier.
    pub fn index_of(&self, id: NodeId) -> Option<usize> {
        self.id_to_index.get(&id).copied()
    }

    /// Node by stable identifier.
    pub fn get(&self, id: NodeId) -> Option<&WeightedNode> {
        self.index_of(id).map(|i| &self.nodes[i])
    }

    /// Arena indices level by level, siblings heaviest first. Parents always
    /// precede their children.
    pub fn breadth_first(&self) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut queue = VecDeque::new();
        queue.push_back(0_usize);
        while let Some(idx) = queue.pop_front() {
            order.push(idx);
            queue.extend(self.nodes[idx].children.iter().copied());
        }
        order
    }

    /// Arena indices in pre-order following the sorted children.
    pub fn pre_order(&self) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![0_usize];
        while let Some(idx) = stack.pop() {
            order.push(idx);
            stack.extend(self.nodes[idx].children.iter().rev().copied());
        }
        order
    }

    /// Arena indices with every child before its parent.
    pub fn post_order(&self) -> Vec<usize> {
        let mut order = self.pre_order();
        order.reverse();
        order
    }

    /// Number of declared wires across the tree.
    pub fn wire_count(&self) -> usize {
        self.nodes.iter().map(|n| n.dest_node_ids.len()).sum()
    }
}

/// Validate a raw tree and compute aggregate weights.
pub fn build(root: &Node) -> Result<WeightedTree, InvalidTreeError> {
    let mut ids = HashSet::new();
    collect_ids(root, &mut ids)?;

    let mut nodes = Vec::new();
    build_node(root, None, 0, &mut nodes)?;

    for node in &nodes {
        if let Some(&dest) = node.dest_node_ids.iter().find(|d| !ids.contains(d)) {
            return Err(InvalidTreeError::DanglingWire {
                from: node.id,
                to: dest,
            });
        }
    }

    let id_to_index = nodes.iter().enumerate().map(|(i, n)| (n.id, i)).collect();
    let tree = WeightedTree { nodes, id_to_index };

    debug!(
        "built hierarchy: {} nodes, {} wires, total weight {}",
        tree.len(),
        tree.wire_count(),
        tree.root().value
    );

    Ok(tree)
}

fn collect_ids(node: &Node, ids: &mut HashSet<NodeId>) -> Result<(), InvalidTreeError> {
    if !ids.insert(node.node_id) {
        return Err(InvalidTreeError::DuplicateId(node.node_id));
    }
    for child in node.children() {
        collect_ids(child, ids)?;
    }
    Ok(())
}

/// Append `node` and its subtree to the arena, returning its index.
fn build_node(
    node: &Node,
    parent: Option<usize>,
    depth: u32,
    nodes: &mut Vec<WeightedNode>,
) -> Result<usize, InvalidTreeError> {
    let idx = nodes.len();
    nodes.push(WeightedNode {
        id: node.node_id,
        name: node.name.clone(),
        value: 0.0,
        depth,
        height: 0,
        parent,
        children: Vec::new(),
        dest_node_ids: node.destinations().to_vec(),
    });

    if node.kind() == NodeKind::Leaf {
        let value = node.value.ok_or(InvalidTreeError::MissingWeight(node.node_id))?;
        if !value.is_finite() || value <= 0.0 {
            return Err(InvalidTreeError::NonPositiveWeight {
                id: node.node_id,
                value,
            });
        }
        nodes[idx].value = value;
        return Ok(idx);
    }

    if node.value.is_some() {
        return Err(InvalidTreeError::WeightOnContainer(node.node_id));
    }

    let mut children = Vec::with_capacity(node.children().len());
    for child in node.children() {
        children.push(build_node(child, Some(idx), depth + 1, nodes)?);
    }

    let value: f64 = children.iter().map(|&c| nodes[c].value).sum();
    let height = 1 + children.iter().map(|&c| nodes[c].height).max().unwrap_or(0);

    // sort_by is stable, so equal weights keep input order
    children.sort_by(|&a, &b| nodes[b].value.total_cmp(&nodes[a].value));

    let entry = &mut nodes[idx];
    entry.value = value;
    entry.height = height;
    entry.children = children;
    Ok(idx)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Node {
        Node::container(
            0,
            "root",
            vec![
                Node::container(1, "a", vec![Node::leaf(2, "a1", 3.0).with_wires([4])]),
                Node::container(
                    3,
                    "b",
                    vec![Node::leaf(4, "b1", 1.0), Node::leaf(5, "b2", 2.0)],
                ),
            ],
        )
    }

    fn assert_sums(tree: &WeightedTree, idx: usize) {
        let node = tree.node(idx);
        if node.is_leaf() {
            return;
        }
        let sum: f64 = node.children.iter().map(|&c| tree.node(c).value).sum();
        assert!((node.value - sum).abs() < 1e-9, "{} != {}", node.value, sum);
        for &c in &node.children {
            assert_sums(tree, c);
        }
    }

    #[test]
    fn test_aggregate_weights() {
        let tree = build(&sample()).unwrap();
        assert_eq!(tree.len(), 6);
        assert_eq!(tree.root().value, 6.0);
        assert_eq!(tree.get(NodeId(1)).unwrap().value, 3.0);
        assert_eq!(tree.get(NodeId(3)).unwrap().value, 3.0);
        assert_sums(&tree, 0);
    }

    #[test]
    fn test_depth_and_height() {
        let tree = build(&sample()).unwrap();
        assert_eq!(tree.root().depth, 0);
        assert_eq!(tree.root().height, 2);
        assert_eq!(tree.get(NodeId(3)).unwrap().depth, 1);
        assert_eq!(tree.get(NodeId(3)).unwrap().height, 1);
        assert_eq!(tree.get(NodeId(5)).unwrap().depth, 2);
        assert_eq!(tree.get(NodeId(5)).unwrap().height, 0);
    }

    #[test]
    fn test_siblings_sorted_by_weight_stable() {
        let tree = build(&sample()).unwrap();
        // 1 and 3 tie at 3.0 and keep input order
        let root_children: Vec<NodeId> =
            tree.root().children.iter().map(|&c| tree.node(c).id).collect();
        assert_eq!(root_children, vec![NodeId(1), NodeId(3)]);

        let b = tree.get(NodeId(3)).unwrap();
        let b_children: Vec<NodeId> = b.children.iter().map(|&c| tree.node(c).id).collect();
        assert_eq!(b_children, vec![NodeId(5), NodeId(4)]);
    }

    #[test]
    fn test_breadth_first_parents_first() {
        let tree = build(&sample()).unwrap();
        let ids: Vec<u32> = tree
            .breadth_first()
            .into_iter()
            .map(|i| tree.node(i).id.0)
            .collect();
        assert_eq!(ids, vec![0, 1, 3, 2, 5, 4]);

        let pre: Vec<u32> = tree.pre_order().into_iter().map(|i| tree.node(i).id.0).collect();
        assert_eq!(pre, vec![0, 1, 2, 3, 5, 4]);
    }

    #[test]
    fn test_single_leaf_root() {
        let tree = build(&Node::leaf(7, "only", 2.5)).unwrap();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.root().value, 2.5);
        assert_eq!(tree.root().height, 0);
        assert_eq!(tree.root().kind(), NodeKind::Leaf);
    }

    #[test]
    fn test_rejects_weight_on_container() {
        let mut root = sample();
        root.value = Some(1.0);
        assert_eq!(
            build(&root).unwrap_err(),
            InvalidTreeError::WeightOnContainer(NodeId(0))
        );
    }

    #[test]
    fn test_rejects_missing_weight() {
        let mut leaf = Node::leaf(1, "a", 1.0);
        leaf.value = None;
        let root = Node::container(0, "root", vec![leaf]);
        assert_eq!(
            build(&root).unwrap_err(),
            InvalidTreeError::MissingWeight(NodeId(1))
        );
    }

    #[test]
    fn test_rejects_non_positive_weight() {
        for value in [0.0, -2.0, f64::NAN] {
            let root = Node::container(0, "root", vec![Node::leaf(1, "a", value)]);
            assert!(matches!(
                build(&root).unwrap_err(),
                InvalidTreeError::NonPositiveWeight { id: NodeId(1), .. }
            ));
        }
    }

    #[test]
    fn test_rejects_duplicate_id() {
        let root = Node::container(0, "root", vec![Node::leaf(1, "a", 1.0), Node::leaf(1, "b", 1.0)]);
        assert_eq!(build(&root).unwrap_err(), InvalidTreeError::DuplicateId(NodeId(1)));
    }

    #[test]
    fn test_rejects_dangling_wire() {
        let root = Node::container(0, "root", vec![Node::leaf(1, "a", 1.0).with_wires([0, 9])]);
        assert_eq!(
            build(&root).unwrap_err(),
            InvalidTreeError::DanglingWire {
                from: NodeId(1),
                to: NodeId(9)
            }
        );
    }

    #[test]
    fn test_wire_cycles_allowed() {
        let root = Node::container(
            0,
            "root",
            vec![
                Node::leaf(1, "a", 1.0).with_wires([2]),
                Node::leaf(2, "b", 1.0).with_wires([1, 2]),
            ],
        );
        let tree = build(&root).unwrap();
        assert_eq!(tree.wire_count(), 3);
    }
}
