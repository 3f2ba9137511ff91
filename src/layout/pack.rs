//! Nested circle packing of a weighted tree.
//!
//! # Algorithm
//!
//! 1. **Leaf radii**: every leaf gets `sqrt(value)`, so circle area is
//!    proportional to weight.
//! 2. **Bottom-up enclosure**: for each container, its children (heaviest
//!    first) are inflated by a padding allowance, packed with the front-chain
//!    algorithm, and enclosed. The container radius is the enclosure plus the
//!    allowance. Child centers are kept relative to the parent center.
//! 3. **Padding fixed point**: the allowance lives in unscaled units but must
//!    come out as `padding / 2` once the root is scaled to the canvas. The
//!    bottom-up pass is repeated, with the allowance derived from a root
//!    radius estimate, until the estimate reproduces itself.
//! 4. **Top-down placement**: the root is centred in the canvas and every
//!    radius and relative offset is scaled by `min(w, h) / (2 * root.r)`.
//!
//! There is no randomness anywhere, so identical input gives bit-identical
//! output.

use std::collections::HashMap;

use log::debug;

use super::enclose::Circle;
use super::siblings::pack_siblings;
use crate::error::PackingError;
use crate::graph::{NodeId, NodeKind, WeightedTree};

/// Bottom-up passes allowed for the padding fixed point before giving up.
const MAX_PADDING_PASSES: usize = 100;

/// Relative change in root radius considered converged.
const PADDING_TOLERANCE: f64 = 1e-9;

/// Configuration for the circle packer.
#[derive(Debug, Clone, PartialEq)]
pub struct PackOptions {
    /// Canvas width.
    pub width: f64,
    /// Canvas height, including the reserved band.
    pub height: f64,
    /// Band at the bottom of the canvas kept free (axis decorations etc).
    pub reserved_band: f64,
    /// Minimum gap between siblings and between a child and its parent's edge.
    pub padding: f64,
    /// Smallest radius any circle may end up with.
    pub min_radius: f64,
}

impl Default for PackOptions {
    fn default() -> Self {
        Self {
            width: 1500.0,
            height: 750.0,
            reserved_band: 0.0,
            padding: 0.0,
            min_radius: 1.0,
        }
    }
}

/// Final circle of one node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PackedCircle {
    pub id: NodeId,
    pub parent: Option<NodeId>,
    /// Center in the diagram container frame.
    pub x: f64,
    pub y: f64,
    /// Center relative to the parent's center (root: same as `x`, `y`).
    pub local_x: f64,
    pub local_y: f64,
    pub r: f64,
    pub depth: u32,
    pub height: u32,
    /// Aggregate weight of the node.
    pub value: f64,
}

impl PackedCircle {
    /// Leaf or container.
    pub fn kind(&self) -> NodeKind {
        if self.height == 0 {
            NodeKind::Leaf
        } else {
            NodeKind::Container
        }
    }

    /// Distance between centers.
    pub fn distance_to(&self, other: &PackedCircle) -> f64 {
        ((other.x - self.x).powi(2) + (other.y - self.y).powi(2)).sqrt()
    }
}

/// Packed circles of a whole tree, looked up by stable identifier.
#[derive(Debug, Clone)]
pub struct PackedTree {
    /// Circles level by level, parents before children.
    circles: Vec<PackedCircle>,
    /// Map from stable NodeId to position in `circles`.
    index: HashMap<NodeId, usize>,
}

impl PackedTree {
    /// All circles, parents before children.
    pub fn circles(&self) -> &[PackedCircle] {
        &self.circles
    }

    /// Get the number of packed circles.
    pub fn len(&self) -> usize {
        self.circles.len()
    }

    /// True if nothing was packed.
    pub fn is_empty(&self) -> bool {
        self.circles.is_empty()
    }

    /// Circle of the root node.
    pub fn root(&self) -> &PackedCircle {
        &self.circles[0]
    }

    /// Circle of a node, by identifier.
    pub fn get(&self, id: NodeId) -> Option<&PackedCircle> {
        self.index.get(&id).map(|&i| &self.circles[i])
    }

    /// Like [`get`](Self::get), but a miss is a [`PackingError`].
    pub fn lookup(&self, id: NodeId) -> Result<&PackedCircle, PackingError> {
        self.get(id).ok_or(PackingError::UnknownNode(id))
    }

    /// Direct children of a node, heaviest first.
    pub fn children_of(&self, id: NodeId) -> impl Iterator<Item = &PackedCircle> {
        self.circles.iter().filter(move |c| c.parent == Some(id))
    }
}

/// Pack `tree` into a `canvas_width` x `canvas_height` canvas.
pub fn pack(
    tree: &WeightedTree,
    canvas_width: f64,
    canvas_height: f64,
    padding: f64,
) -> Result<PackedTree, PackingError> {
    pack_with(
        tree,
        &PackOptions {
            width: canvas_width,
            height: canvas_height,
            padding,
            ..PackOptions::default()
        },
    )
}

/// Pack `tree` with the full option set.
pub fn pack_with(tree: &WeightedTree, options: &PackOptions) -> Result<PackedTree, PackingError> {
    let dx = options.width;
    let dy = options.height - options.reserved_band;
    if !(dx > 0.0 && dy > 0.0) || tree.is_empty() {
        return Err(PackingError::CanvasTooSmall {
            width: options.width,
            height: options.height,
        });
    }
    let extent = dx.min(dy);

    let post_order = tree.post_order();
    let mut circles: Vec<Circle> = tree
        .nodes()
        .iter()
        .map(|n| Circle::new(0.0, 0.0, if n.is_leaf() { n.value.sqrt() } else { 0.0 }))
        .collect();

    let mut root_r = enclose_children(tree, &post_order, &mut circles, options.padding * 0.5)?;

    if options.padding > 0.0 && !tree.root().is_leaf() {
        root_r = settle_padding(tree, &post_order, &mut circles, options.padding, extent, root_r)?;
    }

    let k = extent / (2.0 * root_r);
    let mut packed: Vec<PackedCircle> = Vec::with_capacity(tree.len());
    let mut index = HashMap::with_capacity(tree.len());
    // absolute centers by arena index, filled parents-first
    let mut centers = vec![(0.0_f64, 0.0_f64); tree.len()];

    for idx in tree.breadth_first() {
        let node = tree.node(idx);
        let (local_x, local_y, x, y) = match node.parent {
            None => (dx / 2.0, dy / 2.0, dx / 2.0, dy / 2.0),
            Some(p) => {
                let lx = circles[idx].x * k;
                let ly = circles[idx].y * k;
                (lx, ly, centers[p].0 + lx, centers[p].1 + ly)
            }
        };
        centers[idx] = (x, y);

        let r = circles[idx].r * k;
        if !(r >= options.min_radius) {
            return Err(PackingError::BelowMinimumRadius {
                id: node.id,
                radius: r,
                min_radius: options.min_radius,
            });
        }

        index.insert(node.id, packed.len());
        packed.push(PackedCircle {
            id: node.id,
            parent: node.parent.map(|p| tree.node(p).id),
            x,
            y,
            local_x,
            local_y,
            r,
            depth: node.depth,
            height: node.height,
            value: node.value,
        });
    }

    debug!(
        "packed {} circles, root r = {:.2} at ({:.1}, {:.1})",
        packed.len(),
        packed[0].r,
        packed[0].x,
        packed[0].y
    );

    Ok(PackedTree {
        circles: packed,
        index,
    })
}

/// Find the root radius R for which packing with allowance
/// `padding * R / extent` reproduces R, i.e. the allowance scales to exactly
/// `padding / 2` on the canvas.
///
/// Secant iteration on `g(R) - R`, where `g` is one bottom-up pass. `g` is
/// piecewise linear in R, so this usually lands in two or three passes. A
/// non-positive estimate means the padding outgrows the canvas.
fn settle_padding(
    tree: &WeightedTree,
    post_order: &[usize],
    circles: &mut [Circle],
    padding: f64,
    extent: f64,
    initial: f64,
) -> Result<f64, PackingError> {
    let infeasible = PackingError::PaddingInfeasible { padding };
    let allowance = |r: f64| padding * r / extent;
    let converged = |guess: f64, result: f64| (result - guess).abs() <= PADDING_TOLERANCE * result;

    let mut x0 = initial;
    let mut g0 = enclose_children(tree, post_order, circles, allowance(x0))?;
    if converged(x0, g0) {
        return Ok(g0);
    }
    let mut x1 = g0;

    for pass in 2..=MAX_PADDING_PASSES {
        let g1 = enclose_children(tree, post_order, circles, allowance(x1))?;
        if converged(x1, g1) {
            debug!("padding settled after {} passes", pass);
            return Ok(g1);
        }

        let h0 = g0 - x0;
        let h1 = g1 - x1;
        let x2 = if (h1 - h0).abs() > f64::EPSILON * x1.abs() {
            x1 - h1 * (x1 - x0) / (h1 - h0)
        } else {
            g1
        };
        if !(x2 > 0.0 && x2.is_finite()) {
            return Err(infeasible);
        }

        x0 = x1;
        g0 = g1;
        x1 = x2;
    }

    Err(infeasible)
}

/// Bottom-up pass: pack every container's children with the given allowance.
///
/// Leaf radii are left untouched; container radii and all relative centers
/// are rewritten. Returns the root radius.
fn enclose_children(
    tree: &WeightedTree,
    post_order: &[usize],
    circles: &mut [Circle],
    allowance: f64,
) -> Result<f64, PackingError> {
    let mut siblings: Vec<Circle> = Vec::new();

    for &idx in post_order {
        let node = tree.node(idx);
        if node.is_leaf() {
            continue;
        }

        siblings.clear();
        siblings.extend(node.children.iter().map(|&c| Circle {
            r: circles[c].r + allowance,
            ..circles[c]
        }));

        let enclosing = pack_siblings(&mut siblings).ok_or(PackingError::Degenerate(node.id))?;

        for (&c, placed) in node.children.iter().zip(&siblings) {
            circles[c].x = placed.x;
            circles[c].y = placed.y;
        }
        circles[idx].r = enclosing + allowance;
    }

    Ok(circles[0].r)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Node, build};

    fn sample_tree() -> WeightedTree {
        build(&Node::container(
            0,
            "root",
            vec![
                Node::container(1, "a", vec![Node::leaf(2, "a1", 3.0)]),
                Node::container(
                    3,
                    "b",
                    vec![
                        Node::container(4, "b1", vec![Node::leaf(5, "x", 1.0)]),
                        Node::container(6, "b2", vec![Node::leaf(7, "y", 1.0)]),
                    ],
                ),
                Node::leaf(8, "c", 0.5),
            ],
        ))
        .unwrap()
    }

    fn assert_nested(packed: &PackedTree, padding: f64) {
        for circle in packed.circles() {
            let Some(parent_id) = circle.parent else {
                continue;
            };
            let parent = packed.get(parent_id).unwrap();
            let reach = circle.distance_to(parent) + circle.r;
            assert!(
                reach <= parent.r - padding + 1e-3,
                "{} reaches {} inside {} (r = {}, padding {})",
                circle.id,
                reach,
                parent.id,
                parent.r,
                padding
            );
        }
    }

    fn assert_siblings_apart(packed: &PackedTree, padding: f64) {
        let circles = packed.circles();
        for (i, a) in circles.iter().enumerate() {
            for b in &circles[i + 1..] {
                if a.parent.is_some() && a.parent == b.parent {
                    let gap = a.distance_to(b) - a.r - b.r;
                    assert!(gap >= padding - 1e-3, "{} and {} gap {}", a.id, b.id, gap);
                }
            }
        }
    }

    #[test]
    fn test_single_leaf_root() {
        let tree = build(&Node::leaf(0, "only", 4.0)).unwrap();
        let packed = pack(&tree, 800.0, 600.0, 20.0).unwrap();
        assert_eq!(packed.len(), 1);
        let root = packed.root();
        assert_eq!((root.x, root.y), (400.0, 300.0));
        assert!((root.r - 300.0).abs() < 1e-9);
    }

    #[test]
    fn test_root_centered_above_reserved_band() {
        let options = PackOptions {
            width: 1500.0,
            height: 750.0,
            reserved_band: 50.0,
            padding: 50.0,
            min_radius: 1.0,
        };
        let packed = pack_with(&sample_tree(), &options).unwrap();
        let root = packed.root();
        assert_eq!((root.x, root.y), (750.0, 350.0));
        assert!((root.r - 350.0).abs() < 1e-9);
        assert_eq!(root.depth, 0);
        assert_eq!(root.kind(), NodeKind::Container);
    }

    #[test]
    fn test_children_nested_without_padding() {
        let packed = pack(&sample_tree(), 1000.0, 1000.0, 0.0).unwrap();
        assert_nested(&packed, 0.0);
        assert_siblings_apart(&packed, 0.0);
    }

    #[test]
    fn test_children_respect_padding() {
        for padding in [5.0, 20.0, 50.0] {
            let packed = pack(&sample_tree(), 1500.0, 700.0, padding).unwrap();
            assert_nested(&packed, padding);
            assert_siblings_apart(&packed, padding);
        }
    }

    #[test]
    fn test_local_offsets_match_absolute() {
        let packed = pack(&sample_tree(), 1000.0, 800.0, 10.0).unwrap();
        for circle in packed.circles() {
            if let Some(p) = circle.parent {
                let parent = packed.get(p).unwrap();
                assert!((parent.x + circle.local_x - circle.x).abs() < 1e-9);
                assert!((parent.y + circle.local_y - circle.y).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_radius_grows_with_weight() {
        let tree = build(&Node::container(
            0,
            "root",
            vec![Node::leaf(1, "big", 9.0), Node::leaf(2, "small", 1.0)],
        ))
        .unwrap();
        let packed = pack(&tree, 500.0, 500.0, 0.0).unwrap();
        let big = packed.get(NodeId(1)).unwrap().r;
        let small = packed.get(NodeId(2)).unwrap().r;
        assert!((big / small - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_deterministic() {
        let tree = sample_tree();
        let first = pack(&tree, 1500.0, 700.0, 50.0).unwrap();
        let second = pack(&tree, 1500.0, 700.0, 50.0).unwrap();
        assert_eq!(first.circles(), second.circles());
    }

    #[test]
    fn test_lookup_by_id() {
        let packed = pack(&sample_tree(), 1000.0, 1000.0, 0.0).unwrap();
        assert_eq!(packed.get(NodeId(5)).unwrap().depth, 3);
        assert_eq!(packed.get(NodeId(5)).unwrap().kind(), NodeKind::Leaf);
        assert_eq!(packed.lookup(NodeId(42)).unwrap_err(), PackingError::UnknownNode(NodeId(42)));
        let children: Vec<NodeId> = packed.children_of(NodeId(3)).map(|c| c.id).collect();
        assert_eq!(children, vec![NodeId(4), NodeId(6)]);
    }

    #[test]
    fn test_canvas_too_small() {
        let options = PackOptions {
            width: 100.0,
            height: 40.0,
            reserved_band: 50.0,
            ..PackOptions::default()
        };
        assert!(matches!(
            pack_with(&sample_tree(), &options),
            Err(PackingError::CanvasTooSmall { .. })
        ));
    }

    #[test]
    fn test_below_minimum_radius() {
        let options = PackOptions {
            width: 10.0,
            height: 10.0,
            min_radius: 2.0,
            ..PackOptions::default()
        };
        assert!(matches!(
            pack_with(&sample_tree(), &options),
            Err(PackingError::BelowMinimumRadius { .. })
        ));
    }

    #[test]
    fn test_padding_infeasible() {
        // Five nesting levels with padding close to the canvas size.
        let mut node = Node::leaf(10, "leaf", 1.0);
        for id in (0..5).rev() {
            node = Node::container(id, "level", vec![node]);
        }
        let tree = build(&node).unwrap();
        let options = PackOptions {
            width: 100.0,
            height: 100.0,
            padding: 40.0,
            min_radius: 0.0,
            ..PackOptions::default()
        };
        assert_eq!(
            pack_with(&tree, &options).unwrap_err(),
            PackingError::PaddingInfeasible { padding: 40.0 }
        );
    }
}
