//! Spatial indexing for hit testing.
//!
//! An R-tree over packed circles answers "which node is under this point"
//! without scanning the whole tree.

mod rtree;

pub use rtree::{CircleEntry, SpatialIndex};
