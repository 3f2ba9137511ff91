//! Wiring Diagram - WASM Module
//!
//! Lays out a hierarchy of modules/states as nested circles, fits each label
//! inside its circle and routes curved wires between cross-referenced nodes.
//! It is compiled to WebAssembly and exposes a JavaScript-friendly API via
//! wasm-bindgen; the host fetches data, measures text and drives the camera.
//!
//! # Architecture
//!
//! - `graph`: input records, hierarchy builder, petgraph-backed wire graph
//! - `layout`: circle packing, label fitting, wire routing
//! - `scene`: scene graph assembly and SVG serialization
//! - `camera`: constrained zoom/pan transform and gesture filter
//! - `spatial`: R-tree hit testing over packed circles
//! - `context`: per-diagram render state tying the stages together
//! - `data`, `theme`, `error`: payload parsing, constants, error types

use js_sys::{Array, Float64Array, Function};
use log::{Level, warn};
use serde::Serialize;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;

pub mod camera;
pub mod context;
pub mod data;
pub mod error;
pub mod graph;
pub mod layout;
pub mod scene;
pub mod spatial;
pub mod theme;

pub use context::{Diagram, RenderContext};
pub use error::Error;
pub use graph::{Node, NodeId};
pub use theme::Theme;

use camera::{Gesture, GestureKind, filter};
use layout::{MonospaceMeasurer, TextMeasurer, TextMetrics};

/// Initialize the WASM module.
#[wasm_bindgen(start)]
pub fn init() {
    let _ = console_log::init_with_level(Level::Debug);
    console_error_panic_hook::set_once();
}

/// Text measurer backed by a JS callback returning `{width, height}` or
/// `[width, height]`.
///
/// A callback that throws or returns anything else falls back to the
/// monospace estimate for that label.
struct JsMeasurer {
    callback: Function,
    fallback: MonospaceMeasurer,
}

impl JsMeasurer {
    fn decode(value: &JsValue) -> Option<TextMetrics> {
        if Array::is_array(value) {
            let pair: &Array = value.unchecked_ref();
            return TextMetrics::checked(pair.get(0).as_f64(), pair.get(1).as_f64());
        }
        if !value.is_object() {
            return None;
        }
        let metrics: TextMetrics = serde_wasm_bindgen::from_value(value.clone()).ok()?;
        TextMetrics::checked(Some(metrics.width), Some(metrics.height))
    }
}

impl TextMeasurer for JsMeasurer {
    fn measure(&self, text: &str, font_size: f64) -> TextMetrics {
        let result = self
            .callback
            .call2(&JsValue::NULL, &JsValue::from_str(text), &JsValue::from_f64(font_size));
        match result.ok().as_ref().and_then(Self::decode) {
            Some(metrics) => metrics,
            None => {
                warn!("text measurer failed for {:?}, using monospace estimate", text);
                self.fallback.measure(text, font_size)
            }
        }
    }
}

#[derive(Serialize)]
struct WireRecord {
    source: u32,
    dest: u32,
    d: String,
}

/// One wiring diagram instance exposed to JavaScript.
#[wasm_bindgen]
pub struct WiringDiagramWasm {
    root: Node,
    ctx: RenderContext,
}

#[wasm_bindgen]
impl WiringDiagramWasm {
    /// Create a diagram over the embedded sample data.
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self::with_root(data::fallback())
    }

    /// Create a diagram from fetched JSON text.
    ///
    /// Missing or malformed text falls back to the embedded sample.
    #[wasm_bindgen(js_name = fromJson)]
    pub fn from_json(text: Option<String>) -> Self {
        Self::with_root(data::load(text.as_deref()))
    }

    /// Create a diagram from an already-parsed JS object.
    #[wasm_bindgen(js_name = fromValue)]
    pub fn from_value(value: JsValue) -> Result<WiringDiagramWasm, JsError> {
        let root: Node =
            serde_wasm_bindgen::from_value(value).map_err(|e| JsError::new(&e.to_string()))?;
        Ok(Self::with_root(root))
    }

    // =========================================================================
    // Layout
    // =========================================================================

    /// Lay out the diagram.
    ///
    /// # Arguments
    ///
    /// * `config` - Optional partial theme (`{dark_mode: true, padding: 20}`);
    ///   omitted fields keep their defaults
    /// * `measure` - Optional `(text, fontSize) => {width, height}` callback
    ///   (a `[width, height]` pair also works); a monospace estimate is used
    ///   without it
    ///
    /// On error the previous diagram, theme and camera are kept.
    pub fn layout(&mut self, config: JsValue, measure: Option<Function>) -> Result<(), JsError> {
        let theme: Option<Theme> = if config.is_undefined() || config.is_null() {
            None
        } else {
            Some(serde_wasm_bindgen::from_value(config).map_err(|e| JsError::new(&e.to_string()))?)
        };

        let monospace = MonospaceMeasurer::default();
        let js_measurer;
        let measurer: &dyn TextMeasurer = match measure {
            Some(callback) => {
                js_measurer = JsMeasurer {
                    callback,
                    fallback: monospace,
                };
                &js_measurer
            }
            None => &monospace,
        };

        match theme {
            Some(theme) => self.ctx.render_themed(theme, &self.root, measurer)?,
            None => self.ctx.render(&self.root, measurer)?,
        };
        Ok(())
    }

    /// SVG document under the current camera, or None before `layout`.
    pub fn svg(&self) -> Option<String> {
        self.ctx.svg()
    }

    /// Packed circles as [id0, x0, y0, r0, id1, ...] in breadth-first order.
    pub fn circles(&self) -> Float64Array {
        let mut flat = Vec::new();
        if let Some(diagram) = self.ctx.diagram() {
            flat.reserve(diagram.packed.len() * 4);
            for c in diagram.packed.circles() {
                flat.extend_from_slice(&[c.id.raw() as f64, c.x, c.y, c.r]);
            }
        }
        Float64Array::from(&flat[..])
    }

    /// Routed wires as `[{source, dest, d}]`.
    pub fn wires(&self) -> Result<JsValue, JsError> {
        let records: Vec<WireRecord> = self
            .ctx
            .diagram()
            .map(|d| {
                d.routing
                    .wires
                    .iter()
                    .map(|w| WireRecord {
                        source: w.source.raw(),
                        dest: w.dest.raw(),
                        d: w.curve.to_path_data(),
                    })
                    .collect()
            })
            .unwrap_or_default();
        serde_wasm_bindgen::to_value(&records).map_err(|e| JsError::new(&e.to_string()))
    }

    /// Messages for wires that could not be drawn.
    #[wasm_bindgen(js_name = wireFailures)]
    pub fn wire_failures(&self) -> Vec<String> {
        self.ctx
            .scene()
            .map(|s| s.wire_failures.iter().map(|e| e.to_string()).collect())
            .unwrap_or_default()
    }

    // =========================================================================
    // Hit Testing
    // =========================================================================

    /// Deepest node under a point in SVG viewport coordinates.
    #[wasm_bindgen(js_name = nodeAt)]
    pub fn node_at(&self, x: f64, y: f64) -> Option<u32> {
        self.ctx.node_at_screen(x, y).map(NodeId::raw)
    }

    // =========================================================================
    // Camera
    // =========================================================================

    /// Zoom by `factor` around the viewport point (px, py).
    #[wasm_bindgen(js_name = zoomBy)]
    pub fn zoom_by(&mut self, factor: f64, px: f64, py: f64) {
        self.ctx.camera_mut().zoom_by(factor, [px, py]);
    }

    /// Apply a wheel event at (px, py).
    pub fn wheel(&mut self, delta_y: f64, delta_mode: u32, ctrl_key: bool, px: f64, py: f64) {
        self.ctx
            .camera_mut()
            .wheel(delta_y, delta_mode, ctrl_key, [px, py]);
    }

    /// Pan by a viewport-space delta.
    #[wasm_bindgen(js_name = panBy)]
    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.ctx.camera_mut().pan_by(dx, dy);
    }

    /// Start the animated reset to identity.
    pub fn reset(&mut self) {
        self.ctx.camera_mut().reset();
    }

    /// Advance the reset animation. Returns true while it is still running.
    pub fn tick(&mut self, elapsed_ms: f64) -> bool {
        self.ctx.camera_mut().tick(elapsed_ms)
    }

    /// Camera transform as [k, x, y].
    pub fn transform(&self) -> Vec<f64> {
        let t = self.ctx.camera().transform();
        vec![t.k, t.x, t.y]
    }

    /// SVG transform attribute for the diagram container.
    #[wasm_bindgen(js_name = containerTransform)]
    pub fn container_transform(&self) -> String {
        self.ctx.container_transform().to_svg()
    }

    /// Whether the camera should act on an input event.
    ///
    /// The host must call `preventDefault()` on every event it offers here,
    /// accepted or not. Unknown event types are rejected.
    #[wasm_bindgen(js_name = filterGesture)]
    pub fn filter_gesture(&self, kind: &str, ctrl_key: bool, button: i16) -> bool {
        GestureKind::from_event_type(kind)
            .map(|kind| {
                filter(&Gesture {
                    kind,
                    ctrl_key,
                    button,
                })
                .accept
            })
            .unwrap_or(false)
    }
}

impl WiringDiagramWasm {
    fn with_root(root: Node) -> Self {
        Self {
            root,
            ctx: RenderContext::default(),
        }
    }
}

impl Default for WiringDiagramWasm {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod integration_tests {
    use super::*;
    use crate::error::{InvalidTreeError, PackingError};
    use crate::layout::wire::Point;

    fn render_fallback(theme: Theme) -> RenderContext {
        let mut ctx = RenderContext::new(theme);
        ctx.render(&data::load(None), &MonospaceMeasurer::default())
            .unwrap();
        ctx
    }

    /// The embedded sample end to end: parse, build, pack, route, assemble.
    #[test]
    fn test_fallback_pipeline() {
        let ctx = render_fallback(Theme::default());
        let diagram = ctx.diagram().unwrap();

        let root = diagram.tree.root();
        assert_eq!(root.name, "Step Function");
        assert_eq!(root.value, 5.0);
        let children: Vec<NodeId> = root.children.iter().map(|&i| diagram.tree.node(i).id).collect();
        assert_eq!(children, vec![NodeId(1), NodeId(3)]);
        assert_eq!(diagram.tree.get(NodeId(2)).unwrap().value, 3.0);

        // exactly two wires, both from node 2
        assert_eq!(diagram.routing.wires.len(), 2);
        assert!(diagram.routing.is_clean());
        let source = diagram.packed.get(NodeId(2)).unwrap();
        let dests: Vec<NodeId> = diagram.routing.wires.iter().map(|w| w.dest).collect();
        assert_eq!(dests, vec![NodeId(4), NodeId(6)]);

        for wire in &diagram.routing.wires {
            assert_eq!(wire.source, NodeId(2));
            let dest = diagram.packed.get(wire.dest).unwrap();
            let center = Point::new(dest.x - source.x, dest.y - source.y);
            let gap = ((wire.curve.end.x - center.x).powi(2) + (wire.curve.end.y - center.y).powi(2))
                .sqrt();
            assert!((gap - dest.r).abs() < 1e-9, "wire to {} ends off the boundary", wire.dest);
            assert_eq!(wire.curve.start, Point::new(0.0, source.r));
        }

        let scene = &diagram.scene;
        assert_eq!(scene.wire_paths().len(), 2);
        assert_eq!(scene.nodes().count(), 8);
        let wire_group = scene
            .find(2)
            .unwrap()
            .children
            .iter()
            .find(|c| c.has_class("wire"))
            .unwrap();
        assert_eq!(wire_group.get_attr("dest_node_ids"), Some("4,6"));
    }

    #[test]
    fn test_fallback_layout_fits_canvas() {
        let theme = Theme::default();
        let ctx = render_fallback(theme.clone());
        let packed = &ctx.diagram().unwrap().packed;

        let root = packed.root();
        assert_eq!((root.x, root.y), (750.0, 350.0));
        for c in packed.circles() {
            assert!(c.x - c.r >= -1e-9 && c.x + c.r <= theme.width + 1e-9);
            assert!(c.y - c.r >= -1e-9 && c.y + c.r <= theme.height - theme.canvas_space + 1e-9);
        }
    }

    #[test]
    fn test_reset_after_gestures() {
        let mut ctx = render_fallback(Theme::dark());
        let camera = ctx.camera_mut();
        camera.zoom_by(6.0, [300.0, 200.0]);
        camera.pan_by(120.0, -80.0);
        camera.wheel(250.0, 0, false, [900.0, 100.0]);

        camera.reset();
        while camera.tick(10.0) {}
        assert!(camera.transform().is_identity());
        assert!(
            ctx.svg()
                .unwrap()
                .contains("class=\"wiring_diagram\" transform=\"translate(0,20) scale(1)\"")
        );
    }

    #[test]
    fn test_invalid_payloads() {
        let measurer = MonospaceMeasurer::default();
        let mut ctx = RenderContext::default();

        let dangling = data::parse(r#"{"name":"r","node_id":0,"children":[{"name":"a","node_id":1,"value":1,"dest_node_ids":[9]}]}"#)
            .unwrap();
        assert!(matches!(
            ctx.render(&dangling, &measurer).err(),
            Some(Error::InvalidTree(InvalidTreeError::DanglingWire { .. }))
        ));

        let weighted_container = data::parse(
            r#"{"name":"r","node_id":0,"value":2,"children":[{"name":"a","node_id":1,"value":1}]}"#,
        )
        .unwrap();
        assert!(matches!(
            ctx.render(&weighted_container, &measurer).err(),
            Some(Error::InvalidTree(InvalidTreeError::WeightOnContainer(NodeId(0))))
        ));

        assert!(ctx.diagram().is_none());
    }

    #[test]
    fn test_tiny_canvas_is_a_packing_error() {
        let theme = Theme {
            width: 40.0,
            height: 40.0,
            canvas_space: 10.0,
            padding: 0.0,
            min_radius: 5.0,
            ..Theme::default()
        };
        let mut ctx = RenderContext::new(theme);
        let err = ctx.render(&data::fallback(), &MonospaceMeasurer::default()).err();
        assert!(matches!(
            err,
            Some(Error::Packing(PackingError::BelowMinimumRadius { .. }))
        ));
    }

    #[test]
    fn test_facade_without_js_types() {
        let mut diagram = WiringDiagramWasm::from_json(Some("not json".into()));
        assert_eq!(diagram.root.name, "Step Function");
        assert!(diagram.svg().is_none());
        assert_eq!(diagram.node_at(10.0, 10.0), None);

        diagram.ctx.render(&diagram.root, &MonospaceMeasurer::default()).unwrap();
        assert!(diagram.svg().is_some());
        assert!(diagram.wire_failures().is_empty());

        diagram.zoom_by(2.0, 750.0, 375.0);
        assert_eq!(diagram.transform()[0], 2.0);
        diagram.reset();
        while diagram.tick(50.0) {}
        assert_eq!(diagram.transform(), vec![1.0, 0.0, 0.0]);

        assert!(diagram.filter_gesture("wheel", true, 0));
        assert!(!diagram.filter_gesture("mousedown", true, 0));
        assert!(!diagram.filter_gesture("keydown", false, 0));
    }
}
