//! Per-diagram render state.
//!
//! A [`RenderContext`] is built once per diagram instance. It owns the theme,
//! the camera and the result of the last layout pass; camera changes never
//! trigger a re-layout.

use log::info;

use crate::camera::{Camera, Transform};
use crate::error::Result;
use crate::graph::{Node, NodeId, WeightedTree, WireGraph, build};
use crate::layout::{PackedTree, TextMeasurer, WireRouting, pack_with, route_all};
use crate::scene::{Scene, assemble};
use crate::spatial::SpatialIndex;
use crate::theme::Theme;

/// Everything produced by one layout pass.
pub struct Diagram {
    pub tree: WeightedTree,
    pub wires: WireGraph,
    pub packed: PackedTree,
    pub routing: WireRouting,
    pub scene: Scene,
    pub index: SpatialIndex,
}

impl Diagram {
    /// Run the full pipeline: build, pack, route, assemble.
    ///
    /// Invalid input and packing failures abort; unroutable wires are only
    /// reported through [`Scene::wire_failures`].
    pub fn layout(root: &Node, theme: &Theme, measurer: &dyn TextMeasurer) -> Result<Self> {
        let tree = build(root)?;
        let wires = WireGraph::from_tree(&tree);
        let packed = pack_with(&tree, &theme.pack_options())?;
        let routing = route_all(&packed, &wires);
        let scene = assemble(&tree, &packed, &routing, measurer, theme);
        let index = SpatialIndex::from_packed(&packed);

        info!(
            "laid out {} nodes and {} wires",
            tree.len(),
            routing.wires.len()
        );

        Ok(Self {
            tree,
            wires,
            packed,
            routing,
            scene,
            index,
        })
    }
}

/// Theme, camera and current diagram of one rendered instance.
pub struct RenderContext {
    theme: Theme,
    camera: Camera,
    diagram: Option<Diagram>,
}

impl RenderContext {
    /// Create an empty context for `theme`.
    pub fn new(theme: Theme) -> Self {
        let camera = Camera::new(theme.camera_config());
        Self {
            theme,
            camera,
            diagram: None,
        }
    }

    /// Get the theme.
    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    /// Get the camera.
    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Get the camera for gestures.
    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    /// Lay out `root` and keep the result. The camera is left untouched.
    pub fn render(&mut self, root: &Node, measurer: &dyn TextMeasurer) -> Result<&Diagram> {
        let diagram = Diagram::layout(root, &self.theme, measurer)?;
        Ok(&*self.diagram.insert(diagram))
    }

    /// Lay out `root` under a new theme.
    ///
    /// On success the theme is swapped in and the camera starts over with the
    /// theme's limits. On failure nothing changes.
    pub fn render_themed(
        &mut self,
        theme: Theme,
        root: &Node,
        measurer: &dyn TextMeasurer,
    ) -> Result<&Diagram> {
        let diagram = Diagram::layout(root, &theme, measurer)?;
        self.camera = Camera::new(theme.camera_config());
        self.theme = theme;
        Ok(&*self.diagram.insert(diagram))
    }

    /// Result of the last successful layout.
    pub fn diagram(&self) -> Option<&Diagram> {
        self.diagram.as_ref()
    }

    /// Scene of the last successful layout.
    pub fn scene(&self) -> Option<&Scene> {
        self.diagram.as_ref().map(|d| &d.scene)
    }

    /// Transform of the diagram container: the camera shifted down by `y_offset`.
    pub fn container_transform(&self) -> Transform {
        self.camera.transform().offset(0.0, self.theme.y_offset)
    }

    /// Node under a point in SVG viewport coordinates.
    pub fn node_at_screen(&self, x: f64, y: f64) -> Option<NodeId> {
        let diagram = self.diagram.as_ref()?;
        let [cx, cy] = self.container_transform().invert([x, y]);
        diagram.index.node_at(cx, cy)
    }

    /// Current SVG document, under the current camera.
    pub fn svg(&self) -> Option<String> {
        self.scene().map(|s| s.to_svg_with(self.camera.transform()))
    }
}

impl Default for RenderContext {
    fn default() -> Self {
        Self::new(Theme::default())
    }
}
