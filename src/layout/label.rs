//! Label fitting.
//!
//! Labels start at the base font size (1rem) and are shrunk only when their
//! measured width exceeds the circle's diameter. Shrinks no larger than
//! `scaling_threshold` are snapped back to 1.0 so labels sitting right at the
//! packing boundary don't flicker between sizes.
//!
//! Text metrics come from a [`TextMeasurer`], since only the rendering surface
//! knows real glyph widths.

use serde::Deserialize;

use super::pack::PackedCircle;
use crate::graph::NodeKind;

/// Measured extent of a run of text.
///
/// Deserializes from `{width, height}` as well as a `[width, height]` pair.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
pub struct TextMetrics {
    pub width: f64,
    pub height: f64,
}

impl TextMetrics {
    /// Metrics from raw host values; None unless both are finite and non-negative.
    pub fn checked(width: Option<f64>, height: Option<f64>) -> Option<Self> {
        let (width, height) = (width?, height?);
        let usable = |v: f64| v.is_finite() && v >= 0.0;
        (usable(width) && usable(height)).then_some(Self { width, height })
    }
}

/// Something that can measure text at a given font size.
pub trait TextMeasurer {
    fn measure(&self, text: &str, font_size: f64) -> TextMetrics;
}

/// Fixed-advance approximation for headless layout.
#[derive(Debug, Clone, Copy)]
pub struct MonospaceMeasurer {
    /// Horizontal advance per character, in ems.
    pub advance: f64,
    /// Line height, in ems.
    pub line_height: f64,
}

impl Default for MonospaceMeasurer {
    fn default() -> Self {
        Self {
            advance: 0.6,
            line_height: 1.2,
        }
    }
}

impl TextMeasurer for MonospaceMeasurer {
    fn measure(&self, text: &str, font_size: f64) -> TextMetrics {
        TextMetrics {
            width: text.chars().count() as f64 * self.advance * font_size,
            height: self.line_height * font_size,
        }
    }
}

/// Configuration for label fitting.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelConfig {
    /// Shrinks smaller than this fraction are snapped back to 1.0.
    pub scaling_threshold: f64,
    /// Floor for the scale factor; must be positive.
    pub min_scale: f64,
    /// Font size of an unscaled label.
    pub base_font_size: f64,
    /// How far the background plate sits above the text offset.
    pub plate_lift: f64,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            scaling_threshold: 0.1,
            min_scale: 0.2,
            base_font_size: 16.0,
            plate_lift: 25.0,
        }
    }
}

/// Background rect drawn behind a label.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plate {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Only container labels get a filled plate.
    pub shaded: bool,
}

/// Where and how large a node's label is drawn, relative to its circle center.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelPlacement {
    pub scale: f64,
    pub offset_x: f64,
    pub offset_y: f64,
    /// Text box at the applied scale.
    pub width: f64,
    pub height: f64,
    pub plate: Plate,
}

/// Scale factor for a label of `natural_width` inside a circle of `radius`.
pub fn scale_factor(radius: f64, natural_width: f64, config: &LabelConfig) -> f64 {
    let diameter = 2.0 * radius;
    if natural_width <= diameter {
        return 1.0;
    }
    let scale = diameter / natural_width;
    if 1.0 - scale <= config.scaling_threshold {
        return 1.0;
    }
    scale.max(config.min_scale)
}

/// Fit a label whose unscaled box is `natural_width` x `natural_height`.
///
/// The scaled box is assumed to shrink linearly with the font size; use
/// [`LabelFitter`] when re-measuring at the final size is possible.
pub fn fit(
    radius: f64,
    natural_width: f64,
    natural_height: f64,
    kind: NodeKind,
    depth: u32,
    config: &LabelConfig,
) -> LabelPlacement {
    let scale = scale_factor(radius, natural_width, config);
    let metrics = TextMetrics {
        width: natural_width * scale,
        height: natural_height * scale,
    };
    arrange(metrics, scale, radius, kind, depth, config)
}

/// Position a text box of known size around its circle center.
fn arrange(
    metrics: TextMetrics,
    scale: f64,
    radius: f64,
    kind: NodeKind,
    depth: u32,
    config: &LabelConfig,
) -> LabelPlacement {
    let offset_x = -metrics.width / 2.0;
    let offset_y = match kind {
        // root label above, nested container labels below
        NodeKind::Container if depth == 0 => -radius,
        NodeKind::Container => radius,
        // nudge down to center on cap height
        NodeKind::Leaf => metrics.height / 4.0,
    };

    LabelPlacement {
        scale,
        offset_x,
        offset_y,
        width: metrics.width,
        height: metrics.height,
        plate: Plate {
            x: offset_x,
            y: offset_y - config.plate_lift,
            width: metrics.width,
            height: metrics.height,
            shaded: kind == NodeKind::Container,
        },
    }
}

/// Fits labels against a real measurer.
pub struct LabelFitter<'a, M: TextMeasurer + ?Sized> {
    measurer: &'a M,
    config: LabelConfig,
}

impl<'a, M: TextMeasurer + ?Sized> LabelFitter<'a, M> {
    /// Create a fitter over `measurer`.
    pub fn new(measurer: &'a M, config: LabelConfig) -> Self {
        Self { measurer, config }
    }

    /// Get the label configuration.
    pub fn config(&self) -> &LabelConfig {
        &self.config
    }

    /// Measure `text` at the base size, fit it to `circle`, then re-measure at
    /// the chosen size so the offsets and plate match what gets rendered.
    pub fn place(&self, text: &str, circle: &PackedCircle) -> LabelPlacement {
        let base = self.config.base_font_size;
        let natural = self.measurer.measure(text, base);
        let scale = scale_factor(circle.r, natural.width, &self.config);
        let rendered = if scale == 1.0 {
            natural
        } else {
            self.measurer.measure(text, base * scale)
        };
        arrange(rendered, scale, circle.r, circle.kind(), circle.depth, &self.config)
    }
}
