//! Diagram input and hierarchy.
//!
//! Raw records are validated and flattened into a [`WeightedTree`] arena with
//! aggregated weights; declared cross-references are loaded into a petgraph
//! backed [`WireGraph`].

mod node;
mod tree;
mod wires;

pub use node::{Node, NodeId, NodeKind};
pub use tree::{WeightedNode, WeightedTree, build};
pub use wires::WireGraph;
