//! Error taxonomy for the layout pipeline.
//!
//! - [`InvalidTreeError`]: malformed input, raised by the hierarchy builder
//!   before anything is laid out.
//! - [`PackingError`]: geometric infeasibility, or an identifier that cannot be
//!   resolved against the packed circles once layout has finished.

use thiserror::Error;

use crate::graph::NodeId;

/// The input tree cannot be turned into a weighted hierarchy.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidTreeError {
    #[error("{0} has children and an own value; container weight is derived")]
    WeightOnContainer(NodeId),

    #[error("{0} is a leaf without a value")]
    MissingWeight(NodeId),

    #[error("{id} has non-positive weight {value}")]
    NonPositiveWeight { id: NodeId, value: f64 },

    #[error("{0} appears more than once in the tree")]
    DuplicateId(NodeId),

    #[error("{from} declares a wire to unknown {to}")]
    DanglingWire { from: NodeId, to: NodeId },
}

/// The layout could not be computed, or a wire endpoint could not be resolved.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PackingError {
    #[error("canvas {width}x{height} leaves no room for the diagram")]
    CanvasTooSmall { width: f64, height: f64 },

    #[error("{id} packs to radius {radius}, below the floor of {min_radius}")]
    BelowMinimumRadius {
        id: NodeId,
        radius: f64,
        min_radius: f64,
    },

    #[error("padding {padding} cannot be honoured within the canvas")]
    PaddingInfeasible { padding: f64 },

    #[error("enclosing circle could not be computed for the children of {0}")]
    Degenerate(NodeId),

    #[error("no packed circle for {0}")]
    UnknownNode(NodeId),
}

/// Crate-level error.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid tree: {0}")]
    InvalidTree(#[from] InvalidTreeError),

    #[error("packing failed: {0}")]
    Packing(#[from] PackingError),

    #[error("malformed diagram data: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_node() {
        let err = InvalidTreeError::DanglingWire {
            from: NodeId(2),
            to: NodeId(9),
        };
        assert_eq!(err.to_string(), "Node(2) declares a wire to unknown Node(9)");

        let err = PackingError::UnknownNode(NodeId(4));
        assert_eq!(err.to_string(), "no packed circle for Node(4)");
    }

    #[test]
    fn test_wrapping() {
        let err: Error = PackingError::PaddingInfeasible { padding: 50.0 }.into();
        assert!(matches!(err, Error::Packing(_)));
        assert!(err.to_string().starts_with("packing failed"));
    }
}
