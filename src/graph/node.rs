//! Node identifiers and the raw input record.
//!
//! A diagram arrives as one nested record per node:
//! - A stable unique identifier (`node_id`), referenced by wires
//! - A display name
//! - Either children or a leaf value, never both
//! - Optional destination identifiers, one wire per entry

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable node identifier.
///
/// Unique across the whole tree. Wires refer to their destination by this ID,
/// so it must survive every stage of the pipeline unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Create a new NodeId from a raw u32.
    #[inline]
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw u32 value.
    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node({})", self.0)
    }
}

impl From<u32> for NodeId {
    #[inline]
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl From<NodeId> for u32 {
    #[inline]
    fn from(id: NodeId) -> Self {
        id.0
    }
}

/// Whether a node is drawn as a leaf or as a container of other circles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Leaf,
    Container,
}

impl NodeKind {
    /// CSS class used on the node's circle.
    pub fn css_class(self) -> &'static str {
        match self {
            NodeKind::Leaf => "leaf",
            NodeKind::Container => "parent",
        }
    }
}

/// One record of the input tree, as delivered by the data source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    pub node_id: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<Node>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dest_node_ids: Option<Vec<NodeId>>,
}

impl Node {
    /// Create a leaf record.
    pub fn leaf(id: u32, name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            node_id: NodeId(id),
            children: None,
            value: Some(value),
            dest_node_ids: None,
        }
    }

    /// Create a container record.
    pub fn container(id: u32, name: impl Into<String>, children: Vec<Node>) -> Self {
        Self {
            name: name.into(),
            node_id: NodeId(id),
            children: Some(children),
            value: None,
            dest_node_ids: None,
        }
    }

    /// Declare wires from this node to the given destinations.
    pub fn with_wires(mut self, dests: impl IntoIterator<Item = u32>) -> Self {
        self.dest_node_ids = Some(dests.into_iter().map(NodeId).collect());
        self
    }

    /// Children in input order; an empty list counts as no children.
    pub fn children(&self) -> &[Node] {
        self.children.as_deref().unwrap_or(&[])
    }

    /// Destinations in declaration order.
    pub fn destinations(&self) -> &[NodeId] {
        self.dest_node_ids.as_deref().unwrap_or(&[])
    }

    /// Leaf when the record has no children.
    pub fn kind(&self) -> NodeKind {
        if self.children().is_empty() {
            NodeKind::Leaf
        } else {
            NodeKind::Container
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id() {
        let id = NodeId::new(42);
        assert_eq!(id.raw(), 42);
        assert_eq!(id.0, 42);
        assert_eq!(format!("{}", id), "Node(42)");
    }

    #[test]
    fn test_node_id_conversion() {
        let id: NodeId = 123.into();
        let raw: u32 = id.into();
        assert_eq!(raw, 123);
    }

    #[test]
    fn test_deserialize_record() {
        let node: Node = serde_json::from_str(
            r#"{"name":"states","node_id":2,"dest_node_ids":[4,6],"value":3}"#,
        )
        .unwrap();
        assert_eq!(node.node_id, NodeId(2));
        assert_eq!(node.value, Some(3.0));
        assert_eq!(node.destinations(), &[NodeId(4), NodeId(6)]);
        assert_eq!(node.kind(), NodeKind::Leaf);
    }

    #[test]
    fn test_empty_children_is_leaf() {
        let node: Node =
            serde_json::from_str(r#"{"name":"x","node_id":1,"children":[],"value":1}"#).unwrap();
        assert!(node.children().is_empty());
        assert_eq!(node.kind(), NodeKind::Leaf);
        assert!(node.destinations().is_empty());
    }

    #[test]
    fn test_builders() {
        let root = Node::container(0, "root", vec![Node::leaf(1, "a", 2.0).with_wires([0])]);
        assert_eq!(root.kind(), NodeKind::Container);
        assert_eq!(root.children()[0].destinations(), &[NodeId(0)]);
        assert_eq!(NodeKind::Container.css_class(), "parent");
    }
}
