//! Scene assembly.
//!
//! Turns a packed tree, its routed wires and fitted labels into a small
//! retained scene graph (groups, circles, rects, text, paths with class and
//! `data-*` attributes) that serializes to a standalone SVG document.
//!
//! Node groups are flat children of the diagram container, each translated to
//! its circle center, in breadth-first order so parents paint first.

use std::fmt::{self, Write as _};

use log::debug;

use crate::camera::Transform;
use crate::error::PackingError;
use crate::graph::{NodeKind, WeightedTree};
use crate::layout::wire::fmt_coord;
use crate::layout::{LabelFitter, PackedTree, TextMeasurer, WireRouting};
use crate::theme::Theme;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    Svg,
    G,
    Circle,
    Rect,
    Text,
    Path,
}

impl Tag {
    /// Element name as written in SVG.
    pub fn name(self) -> &'static str {
        match self {
            Tag::Svg => "svg",
            Tag::G => "g",
            Tag::Circle => "circle",
            Tag::Rect => "rect",
            Tag::Text => "text",
            Tag::Path => "path",
        }
    }
}

/// One element of the scene graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub tag: Tag,
    /// Attributes in insertion order.
    pub attrs: Vec<(String, String)>,
    pub text: Option<String>,
    pub children: Vec<Element>,
}

impl Element {
    /// Create an empty element.
    pub fn new(tag: Tag) -> Self {
        Self {
            tag,
            attrs: Vec::new(),
            text: None,
            children: Vec::new(),
        }
    }

    /// Builder: set an attribute, replacing any previous value.
    pub fn attr(mut self, name: &str, value: impl fmt::Display) -> Self {
        self.set_attr(name, value);
        self
    }

    /// Set or replace an attribute.
    pub fn set_attr(&mut self, name: &str, value: impl fmt::Display) {
        let value = value.to_string();
        match self.attrs.iter_mut().find(|(k, _)| k == name) {
            Some(slot) => slot.1 = value,
            None => self.attrs.push((name.to_string(), value)),
        }
    }

    /// Set the text content.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Append a child element.
    pub fn child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    /// Value of an attribute, if set.
    pub fn get_attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// True if the `class` attribute lists `class`.
    pub fn has_class(&self, class: &str) -> bool {
        self.get_attr("class")
            .is_some_and(|c| c.split_whitespace().any(|c| c == class))
    }

    /// First direct child with the given tag.
    pub fn first(&self, tag: Tag) -> Option<&Element> {
        self.children.iter().find(|c| c.tag == tag)
    }

    /// Every element in the subtree matching `pred`, depth first.
    pub fn find_all<'a>(&'a self, pred: &dyn Fn(&Element) -> bool, out: &mut Vec<&'a Element>) {
        if pred(self) {
            out.push(self);
        }
        for c in &self.children {
            c.find_all(pred, out);
        }
    }

    fn write_svg(&self, out: &mut String, indent: usize) {
        let pad = "  ".repeat(indent);
        let _ = write!(out, "{}<{}", pad, self.tag.name());
        for (k, v) in &self.attrs {
            let _ = write!(out, " {}=\"{}\"", k, escape(v));
        }

        match (&self.text, self.children.is_empty()) {
            (None, true) => out.push_str("/>\n"),
            (Some(text), true) => {
                let _ = writeln!(out, ">{}</{}>", escape(text), self.tag.name());
            }
            (text, false) => {
                out.push_str(">\n");
                if let Some(text) = text {
                    let _ = writeln!(out, "{}  {}", pad, escape(text));
                }
                for c in &self.children {
                    c.write_svg(out, indent + 1);
                }
                let _ = writeln!(out, "{}</{}>", pad, self.tag.name());
            }
        }
    }
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

fn translate(x: f64, y: f64) -> String {
    format!("translate({},{})", fmt_coord(x), fmt_coord(y))
}

/// An assembled diagram.
#[derive(Debug, Clone)]
pub struct Scene {
    pub width: f64,
    pub height: f64,
    /// Background rect, transformed by the camera alone.
    pub view: Element,
    /// The `wiring_diagram` container group.
    pub container: Element,
    /// Wires that could not be drawn.
    pub wire_failures: Vec<PackingError>,
    y_offset: f64,
}

impl Scene {
    /// Node group with the given `data-id`.
    pub fn find(&self, data_id: u32) -> Option<&Element> {
        let id = data_id.to_string();
        self.container
            .children
            .iter()
            .find(|g| g.has_class("node") && g.get_attr("data-id") == Some(id.as_str()))
    }

    /// Node groups in paint order.
    pub fn nodes(&self) -> impl Iterator<Item = &Element> {
        self.container.children.iter().filter(|g| g.has_class("node"))
    }

    /// Every wire path in the scene.
    pub fn wire_paths(&self) -> Vec<&Element> {
        let mut out = Vec::new();
        self.container.find_all(
            &|e: &Element| e.tag == Tag::Path && e.get_attr("dest_node_id").is_some(),
            &mut out,
        );
        out
    }

    /// True if every wire was routed.
    pub fn is_clean(&self) -> bool {
        self.wire_failures.is_empty()
    }

    /// SVG document with the camera at rest.
    pub fn to_svg(&self) -> String {
        self.to_svg_with(Transform::IDENTITY)
    }

    /// SVG document under the given camera transform.
    pub fn to_svg_with(&self, camera: Transform) -> String {
        let mut view = self.view.clone();
        view.set_attr("transform", camera.to_svg());
        let mut container = self.container.clone();
        container.set_attr("transform", camera.offset(0.0, self.y_offset).to_svg());

        let root = Element::new(Tag::Svg)
            .attr("xmlns", "http://www.w3.org/2000/svg")
            .attr(
                "viewBox",
                format!("0 0 {} {}", fmt_coord(self.width), fmt_coord(self.height)),
            )
            .child(view)
            .child(container);

        let mut out = String::new();
        root.write_svg(&mut out, 0);
        out
    }
}

/// Build the scene for one layout pass.
pub fn assemble(
    tree: &WeightedTree,
    packed: &PackedTree,
    routing: &WireRouting,
    measurer: &dyn TextMeasurer,
    theme: &Theme,
) -> Scene {
    let fitter = LabelFitter::new(measurer, theme.label_config());

    let view = Element::new(Tag::Rect)
        .attr("class", "view")
        .attr("x", 0.5)
        .attr("y", 0.5)
        .attr("width", fmt_coord(theme.width - 1.0))
        .attr("height", fmt_coord(theme.height - 1.0))
        .attr("fill", theme.bg_col())
        .attr("style", format!("opacity: {}", if theme.dark_mode { 1 } else { 0 }));

    let mut container = Element::new(Tag::G)
        .attr("class", "wiring_diagram")
        .attr("transform", translate(0.0, theme.y_offset));

    for circle in packed.circles() {
        let Some(node) = tree.get(circle.id) else {
            continue;
        };
        let kind = circle.kind();

        let shape = Element::new(Tag::Circle)
            .attr("r", fmt_coord(circle.r))
            .attr("class", kind.css_class())
            .attr("data-depth", circle.depth)
            .attr("data-height", circle.height)
            .attr("data-value", fmt_coord(circle.value))
            .attr(
                "fill",
                match kind {
                    NodeKind::Container => theme.bg_col(),
                    NodeKind::Leaf => theme.leaf_col(),
                },
            )
            .attr("opacity", theme.circle_opacity)
            .attr("stroke", theme.fg_edge_col())
            .attr("stroke-width", theme.stroke_width);

        let placement = fitter.place(&node.name, circle);
        let plate = Element::new(Tag::Rect)
            .attr(
                "fill",
                if placement.plate.shaded { theme.bg_col() } else { "none" },
            )
            .attr("fill-opacity", theme.label_holder_opacity)
            .attr("width", fmt_coord(placement.plate.width))
            .attr("height", fmt_coord(placement.plate.height))
            .attr("transform", translate(placement.plate.x, placement.plate.y));
        let label = Element::new(Tag::Text)
            .attr("class", "label")
            .attr("data-scale_factor", fmt_coord(placement.scale))
            .attr("style", format!("font-size: {}rem", fmt_coord(placement.scale)))
            .attr("fill", theme.fg_text_col())
            .attr("data-width", fmt_coord(placement.width))
            .attr("data-height", fmt_coord(placement.height))
            .attr("transform", translate(placement.offset_x, placement.offset_y))
            .with_text(node.name.clone());
        let holder = Element::new(Tag::G)
            .attr(
                "class",
                match kind {
                    NodeKind::Container => "label-box parental",
                    NodeKind::Leaf => "label-box leafy",
                },
            )
            .child(plate)
            .child(label);

        let dests: Vec<String> = node.dest_node_ids.iter().map(|d| d.raw().to_string()).collect();
        let mut wires = Element::new(Tag::G)
            .attr("class", "wire")
            .attr("start_node_id", circle.id.raw())
            .attr("dest_node_ids", dests.join(","));
        for wire in routing.from_source(circle.id) {
            wires = wires.child(
                Element::new(Tag::Path)
                    .attr("dest_node_id", wire.dest.raw())
                    .attr("d", wire.curve.to_path_data())
                    .attr("stroke", theme.fg_col())
                    .attr("fill", "none"),
            );
        }

        container = container.child(
            Element::new(Tag::G)
                .attr("class", "node")
                .attr("data-id", circle.id.raw())
                .attr("transform", translate(circle.x, circle.y))
                .child(shape)
                .child(holder)
                .child(wires),
        );
    }

    debug!(
        "assembled scene: {} nodes, {} wires",
        packed.len(),
        routing.wires.len()
    );

    Scene {
        width: theme.width,
        height: theme.height,
        view,
        container,
        wire_failures: routing.failures.clone(),
        y_offset: theme.y_offset,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Node, NodeId, WireGraph, build};
    use crate::layout::{MonospaceMeasurer, pack_with, route_all};

    fn scene_for(root: &Node, theme: &Theme) -> Scene {
        let tree = build(root).unwrap();
        let packed = pack_with(&tree, &theme.pack_options()).unwrap();
        let routing = route_all(&packed, &WireGraph::from_tree(&tree));
        assemble(&tree, &packed, &routing, &MonospaceMeasurer::default(), theme)
    }

    fn sample() -> Node {
        Node::container(
            0,
            "root & co",
            vec![
                Node::leaf(1, "a", 2.0).with_wires([2]),
                Node::container(2, "b", vec![Node::leaf(3, "c", 1.0)]),
            ],
        )
    }

    #[test]
    fn test_node_groups_in_breadth_first_order() {
        let scene = scene_for(&sample(), &Theme::default());
        let ids: Vec<&str> = scene.nodes().filter_map(|g| g.get_attr("data-id")).collect();
        assert_eq!(ids, vec!["0", "1", "2", "3"]);
    }

    #[test]
    fn test_circle_attributes() {
        let theme = Theme::default();
        let scene = scene_for(&sample(), &theme);

        let root = scene.find(0).unwrap().first(Tag::Circle).unwrap();
        assert!(root.has_class("parent"));
        assert_eq!(root.get_attr("data-depth"), Some("0"));
        assert_eq!(root.get_attr("data-height"), Some("2"));
        assert_eq!(root.get_attr("data-value"), Some("3"));
        assert_eq!(root.get_attr("fill"), Some(theme.bg_col()));

        let leaf = scene.find(1).unwrap().first(Tag::Circle).unwrap();
        assert!(leaf.has_class("leaf"));
        assert_eq!(leaf.get_attr("fill"), Some(theme.leaf_col()));
        assert_eq!(leaf.get_attr("opacity"), Some("0.25"));
        assert_eq!(leaf.get_attr("stroke-width"), Some("2"));
    }

    #[test]
    fn test_label_holders() {
        let scene = scene_for(&sample(), &Theme::default());

        let parental = &scene.find(2).unwrap().children[1];
        assert!(parental.has_class("label-box") && parental.has_class("parental"));
        let plate = parental.first(Tag::Rect).unwrap();
        assert_eq!(plate.get_attr("fill"), Some("white"));
        assert_eq!(plate.get_attr("fill-opacity"), Some("0.3"));

        let leafy = &scene.find(3).unwrap().children[1];
        assert!(leafy.has_class("leafy"));
        assert_eq!(leafy.first(Tag::Rect).unwrap().get_attr("fill"), Some("none"));

        let text = leafy.first(Tag::Text).unwrap();
        assert_eq!(text.text.as_deref(), Some("c"));
        assert_eq!(text.get_attr("style"), Some("font-size: 1rem"));
        assert_eq!(text.get_attr("data-scale_factor"), Some("1"));
    }

    #[test]
    fn test_wire_groups() {
        let scene = scene_for(&sample(), &Theme::default());

        let wired = wire_group(scene.find(1).unwrap());
        assert_eq!(wired.get_attr("start_node_id"), Some("1"));
        assert_eq!(wired.get_attr("dest_node_ids"), Some("2"));
        assert_eq!(wired.children.len(), 1);
        let path = &wired.children[0];
        assert_eq!(path.get_attr("dest_node_id"), Some("2"));
        assert!(path.get_attr("d").is_some_and(|d| d.starts_with("M0,")));
        assert_eq!(path.get_attr("fill"), Some("none"));

        let bare = wire_group(scene.find(2).unwrap());
        assert!(bare.children.is_empty());
        assert_eq!(scene.wire_paths().len(), 1);
    }

    #[test]
    fn test_svg_document() {
        let scene = scene_for(&sample(), &Theme::dark());
        assert!(scene.is_clean());

        let svg = scene.to_svg();
        assert!(svg.starts_with("<svg xmlns=\"http://www.w3.org/2000/svg\" viewBox=\"0 0 1500 750\">"));
        assert!(svg.contains("class=\"wiring_diagram\" transform=\"translate(0,20) scale(1)\""));
        assert!(svg.contains("root &amp; co"));
        assert!(svg.contains("style=\"opacity: 1\""));
        assert!(svg.trim_end().ends_with("</svg>"));

        let zoomed = scene.to_svg_with(Transform::new(2.0, -10.0, -5.0));
        assert!(zoomed.contains("translate(-10,15) scale(2)"));
    }

    #[test]
    fn test_find_missing() {
        let scene = scene_for(&sample(), &Theme::default());
        assert!(scene.find(99).is_none());
        assert!(scene.find(NodeId(3).raw()).is_some());
    }

    fn wire_group(node: &Element) -> &Element {
        node.children.iter().find(|c| c.has_class("wire")).unwrap()
    }
}
