//! R-tree of packed circles using the rstar crate.
//!
//! Circles are stored by their bounding boxes; point and rectangle queries
//! are narrowed to the exact disc afterwards. Because packed circles nest,
//! a point usually lies in several of them; [`SpatialIndex::node_at`] picks
//! the deepest.

use rstar::{AABB, PointDistance, RTree, RTreeObject};

use crate::graph::NodeId;
use crate::layout::{PackedCircle, PackedTree};

/// A packed circle as stored in the index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircleEntry {
    pub id: NodeId,
    pub x: f64,
    pub y: f64,
    pub r: f64,
    pub depth: u32,
}

impl From<&PackedCircle> for CircleEntry {
    fn from(c: &PackedCircle) -> Self {
        Self {
            id: c.id,
            x: c.x,
            y: c.y,
            r: c.r,
            depth: c.depth,
        }
    }
}

impl CircleEntry {
    /// True if the disc touches the axis-aligned rectangle.
    fn touches_rect(&self, min: [f64; 2], max: [f64; 2]) -> bool {
        let nx = self.x.clamp(min[0], max[0]);
        let ny = self.y.clamp(min[1], max[1]);
        let dx = self.x - nx;
        let dy = self.y - ny;
        dx * dx + dy * dy <= self.r * self.r
    }
}

impl RTreeObject for CircleEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners([self.x - self.r, self.y - self.r], [self.x + self.r, self.y + self.r])
    }
}

impl PointDistance for CircleEntry {
    /// Squared distance to the disc; zero inside it.
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = point[0] - self.x;
        let dy = point[1] - self.y;
        let outside = ((dx * dx + dy * dy).sqrt() - self.r).max(0.0);
        outside * outside
    }

    fn contains_point(&self, point: &[f64; 2]) -> bool {
        let dx = point[0] - self.x;
        let dy = point[1] - self.y;
        dx * dx + dy * dy <= self.r * self.r
    }
}

/// Hit-test index over the circles of one layout pass.
pub struct SpatialIndex {
    tree: RTree<CircleEntry>,
}

impl SpatialIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self { tree: RTree::new() }
    }

    /// Bulk load every circle of a packed tree.
    pub fn from_packed(packed: &PackedTree) -> Self {
        let mut index = Self::new();
        index.rebuild(packed.circles());
        index
    }

    /// Replace the contents with `circles`.
    pub fn rebuild(&mut self, circles: &[PackedCircle]) {
        let entries: Vec<CircleEntry> = circles.iter().map(CircleEntry::from).collect();
        self.tree = RTree::bulk_load(entries);
    }

    /// Deepest circle containing the point (container frame).
    ///
    /// Among equally deep circles the smaller one wins.
    pub fn node_at(&self, x: f64, y: f64) -> Option<NodeId> {
        self.tree
            .locate_all_at_point(&[x, y])
            .max_by(|a, b| a.depth.cmp(&b.depth).then(b.r.total_cmp(&a.r)))
            .map(|entry| entry.id)
    }

    /// Every circle touching the rectangle, in no particular order.
    pub fn nodes_in_rect(&self, min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Vec<NodeId> {
        let (min, max) = ([min_x.min(max_x), min_y.min(max_y)], [min_x.max(max_x), min_y.max(max_y)]);
        let envelope = AABB::from_corners(min, max);
        self.tree
            .locate_in_envelope_intersecting(&envelope)
            .filter(|entry| entry.touches_rect(min, max))
            .map(|entry| entry.id)
            .collect()
    }

    /// Circle whose boundary is closest to the point.
    pub fn nearest(&self, x: f64, y: f64) -> Option<NodeId> {
        self.tree.nearest_neighbor(&[x, y]).map(|entry| entry.id)
    }

    /// Get the number of circles in the index.
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    /// True if the index holds no circles.
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}

impl Default for SpatialIndex {
    fn default() -> Self {
        Self::new()
    }
}
