//! Wire routing between packed circles.
//!
//! A wire leaves the bottom of its source circle and bends, through a single
//! quadratic control point, onto the boundary of the destination circle.
//! Curves are expressed in the source node's local frame (origin at the
//! source center), so they move with the source group and any camera
//! transform is applied on top rather than baked in.
//!
//! Routing runs only after every circle has been packed, since destinations
//! are looked up by identifier across the whole tree.

use std::fmt::Write as _;

use log::{debug, warn};

use super::pack::{PackedCircle, PackedTree};
use crate::error::PackingError;
use crate::graph::{NodeId, WireGraph};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    /// Create a point.
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Quadratic Bézier curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Curve {
    pub start: Point,
    pub control: Point,
    pub end: Point,
}

impl Curve {
    /// SVG path data, `M{x},{y}Q{cx},{cy},{x},{y}`.
    pub fn to_path_data(&self) -> String {
        let mut d = String::with_capacity(48);
        let _ = write!(
            d,
            "M{},{}Q{},{},{},{}",
            fmt_coord(self.start.x),
            fmt_coord(self.start.y),
            fmt_coord(self.control.x),
            fmt_coord(self.control.y),
            fmt_coord(self.end.x),
            fmt_coord(self.end.y)
        );
        d
    }

    /// Point at parameter `t` in `[0, 1]`.
    pub fn point_at(&self, t: f64) -> Point {
        let u = 1.0 - t;
        Point {
            x: u * u * self.start.x + 2.0 * u * t * self.control.x + t * t * self.end.x,
            y: u * u * self.start.y + 2.0 * u * t * self.control.y + t * t * self.end.y,
        }
    }
}

/// Round to three decimals and drop trailing zeros.
pub(crate) fn fmt_coord(v: f64) -> String {
    let rounded = (v * 1000.0).round() / 1000.0;
    // avoid "-0"
    let rounded = if rounded == 0.0 { 0.0 } else { rounded };
    format!("{}", rounded)
}

/// One routed wire.
#[derive(Debug, Clone, PartialEq)]
pub struct WireSpec {
    pub source: NodeId,
    pub dest: NodeId,
    /// Curve in the source node's local frame.
    pub curve: Curve,
}

/// Result of routing every declared wire.
#[derive(Debug, Clone, Default)]
pub struct WireRouting {
    pub wires: Vec<WireSpec>,
    /// Wires skipped because an endpoint had no packed circle.
    pub failures: Vec<PackingError>,
}

impl WireRouting {
    /// True if no wire failed to route.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Routed wires leaving `source`, in declaration order.
    pub fn from_source(&self, source: NodeId) -> impl Iterator<Item = &WireSpec> {
        self.wires.iter().filter(move |w| w.source == source)
    }
}

/// Curve from the bottom of `source` to the boundary of `dest`.
pub fn route(source: &PackedCircle, dest: &PackedCircle) -> Curve {
    let dx = dest.x - source.x;
    let dy = dest.y - source.y;
    let len = (dx * dx + dy * dy).sqrt();

    // self-wire: no direction to follow, drop straight down
    let (ux, uy) = if len > 0.0 { (dx / len, dy / len) } else { (0.0, 1.0) };

    Curve {
        start: Point::new(0.0, source.r),
        control: Point::new(dx / 2.0, dx),
        end: Point::new(dx + dest.r * ux, dy + dest.r * uy),
    }
}

/// Route every wire in `wires` against `packed`.
///
/// An endpoint without a circle skips only that wire; the miss is logged and
/// kept in [`WireRouting::failures`].
pub fn route_all(packed: &PackedTree, wires: &WireGraph) -> WireRouting {
    let mut routing = WireRouting::default();

    for (source, dest) in wires.wires() {
        let endpoints = packed
            .lookup(source)
            .and_then(|s| packed.lookup(dest).map(|d| (s, d)));
        match endpoints {
            Ok((s, d)) => routing.wires.push(WireSpec {
                source,
                dest,
                curve: route(s, d),
            }),
            Err(err) => {
                warn!("skipping wire {} -> {}: {}", source, dest, err);
                routing.failures.push(err);
            }
        }
    }

    debug!(
        "routed {} wires ({} skipped)",
        routing.wires.len(),
        routing.failures.len()
    );
    routing
}
