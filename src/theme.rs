//! Visual and behavioral constants.
//!
//! One immutable [`Theme`] per diagram. Colors are derived from the light/dark
//! flag; the layout, label and camera configs are projected from it so every
//! stage reads the same numbers.

use serde::{Deserialize, Serialize};

use crate::camera::CameraConfig;
use crate::layout::{LabelConfig, PackOptions};

// --- Colors ---
const WHITE: &str = "white";
const BLACK: &str = "black";
const EDGE_DARK: &str = "#ACE4F5"; // blue grey
const EDGE_LIGHT: &str = "#ADADAD"; // red grey
const LEAF_DARK: &str = "#48ff76"; // green
const LEAF_LIGHT: &str = "#0085fa"; // blue

/// Diagram constants, overridable field by field from the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Theme {
    /// Canvas width (viewBox units).
    pub width: f64,
    /// Canvas height (viewBox units).
    pub height: f64,
    /// Band at the bottom of the canvas kept free of circles.
    pub canvas_space: f64,
    /// Vertical shift of the whole diagram container.
    pub y_offset: f64,
    /// Gap between sibling circles and between a child and its parent's edge.
    pub padding: f64,
    /// Label shrinks smaller than this fraction are snapped back to 1.0.
    pub scaling_threshold: f64,
    /// Smallest label scale ever applied.
    pub min_label_scale: f64,
    /// Fill opacity of the plate behind container labels.
    pub label_holder_opacity: f64,
    /// Pixel size of 1rem, the unscaled label font size.
    pub base_font_size: f64,
    /// Smallest radius any packed circle may have.
    pub min_radius: f64,
    pub circle_opacity: f64,
    pub stroke_width: f64,
    /// Camera zoom limits.
    pub scale_extent: [f64; 2],
    /// Duration of the camera reset transition.
    pub reset_duration_ms: f64,
    pub dark_mode: bool,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            width: 1500.0,
            height: 750.0,
            canvas_space: 50.0,
            y_offset: 20.0,
            padding: 50.0,
            scaling_threshold: 0.1,
            min_label_scale: 0.2,
            label_holder_opacity: 0.3,
            base_font_size: 16.0,
            min_radius: 1.0,
            circle_opacity: 0.25,
            stroke_width: 2.0,
            scale_extent: [1.0, 50.0],
            reset_duration_ms: 750.0,
            dark_mode: false,
        }
    }
}

impl Theme {
    /// Light color scheme with default geometry.
    pub fn light() -> Self {
        Self::default()
    }

    /// Dark color scheme with default geometry.
    pub fn dark() -> Self {
        Self {
            dark_mode: true,
            ..Self::default()
        }
    }

    /// Extra lift applied to label plates above the text baseline.
    pub fn label_y_offset(&self) -> f64 {
        // tuned by eye against the default font
        self.canvas_space / 2.0 - self.y_offset
    }

    /// Foreground color.
    pub fn fg_col(&self) -> &'static str {
        if self.dark_mode { WHITE } else { BLACK }
    }

    /// Background color.
    pub fn bg_col(&self) -> &'static str {
        if self.dark_mode { BLACK } else { WHITE }
    }

    /// Wire and outline color.
    pub fn fg_edge_col(&self) -> &'static str {
        if self.dark_mode { EDGE_DARK } else { EDGE_LIGHT }
    }

    /// Label text color.
    pub fn fg_text_col(&self) -> &'static str {
        self.fg_col()
    }

    /// Leaf fill color.
    pub fn leaf_col(&self) -> &'static str {
        if self.dark_mode { LEAF_DARK } else { LEAF_LIGHT }
    }

    /// Packing options for this theme.
    pub fn pack_options(&self) -> PackOptions {
        PackOptions {
            width: self.width,
            height: self.height,
            reserved_band: self.canvas_space,
            padding: self.padding,
            min_radius: self.min_radius,
        }
    }

    /// Label fitting options for this theme.
    pub fn label_config(&self) -> LabelConfig {
        LabelConfig {
            scaling_threshold: self.scaling_threshold,
            min_scale: self.min_label_scale,
            base_font_size: self.base_font_size,
            plate_lift: self.y_offset + self.label_y_offset(),
        }
    }

    /// Camera limits for this theme.
    pub fn camera_config(&self) -> CameraConfig {
        CameraConfig {
            width: self.width,
            height: self.height,
            scale_extent: self.scale_extent,
            reset_duration_ms: self.reset_duration_ms,
        }
    }
}
