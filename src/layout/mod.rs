//! Layout of a weighted tree into nested circles, labels and wires.
//!
//! The stages run in a fixed order over one tree:
//!
//! 1. [`pack`] places every node as a circle inside its parent
//!    ([`siblings`] packs one level, [`enclose`] computes the enclosure).
//! 2. [`label`] fits each node's text inside its circle.
//! 3. [`wire`] routes the declared wires once every circle is known.

pub mod enclose;
pub mod label;
pub mod pack;
pub mod siblings;
pub mod wire;

pub use enclose::{Circle, enclose};
pub use label::{
    LabelConfig, LabelFitter, LabelPlacement, MonospaceMeasurer, Plate, TextMeasurer, TextMetrics,
    fit, scale_factor,
};
pub use pack::{PackOptions, PackedCircle, PackedTree, pack, pack_with};
pub use siblings::pack_siblings;
pub use wire::{Curve, Point, WireRouting, WireSpec, route, route_all};
