//! Zoom and pan camera.
//!
//! The camera is a pure transform state machine. Gestures replace the
//! transform, constrained so the viewport never leaves the canvas; nothing
//! here touches layout geometry.
//!
//! # Constraint
//!
//! After every change the scale is clamped to `scale_extent` and the
//! translation is adjusted so the visible region stays inside
//! `[[0, 0], [width, height]]`, the same rule d3-zoom applies.
//!
//! # Reset transition
//!
//! [`Camera::reset`] animates back to identity along the smooth zoom path of
//! van Wijk and Nuij ("Smooth and efficient zooming and panning", 2003), eased
//! with cubic in-out. The host drives it with [`Camera::tick`].

use log::trace;

use crate::layout::wire::fmt_coord;

/// Curvature of the smooth zoom path.
const RHO: f64 = std::f64::consts::SQRT_2;

/// Below this squared distance the zoom path degenerates to a pure scale.
const EPSILON_2: f64 = 1e-12;

/// Camera limits.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraConfig {
    /// Viewport (and translate extent) width.
    pub width: f64,
    /// Viewport (and translate extent) height.
    pub height: f64,
    /// Allowed zoom range `[min, max]`.
    pub scale_extent: [f64; 2],
    pub reset_duration_ms: f64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            width: 1500.0,
            height: 750.0,
            scale_extent: [1.0, 50.0],
            reset_duration_ms: 750.0,
        }
    }
}

/// Uniform scale followed by translation: `p' = p * k + (x, y)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub k: f64,
    pub x: f64,
    pub y: f64,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Transform = Transform { k: 1.0, x: 0.0, y: 0.0 };

    /// Create a transform.
    pub fn new(k: f64, x: f64, y: f64) -> Self {
        Self { k, x, y }
    }

    /// Map a container point to the screen.
    pub fn apply(&self, point: [f64; 2]) -> [f64; 2] {
        [point[0] * self.k + self.x, point[1] * self.k + self.y]
    }

    /// Map a screen point to the container frame.
    pub fn invert(&self, point: [f64; 2]) -> [f64; 2] {
        [(point[0] - self.x) / self.k, (point[1] - self.y) / self.k]
    }

    /// Translate by `(tx, ty)` in the transform's own (scaled) units.
    pub fn translate(&self, tx: f64, ty: f64) -> Self {
        Self::new(self.k, self.x + self.k * tx, self.y + self.k * ty)
    }

    /// Shift by `(dx, dy)` in screen units.
    pub fn offset(&self, dx: f64, dy: f64) -> Self {
        Self::new(self.k, self.x + dx, self.y + dy)
    }

    /// True for scale 1 with no translation.
    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// SVG transform attribute, `translate(x,y) scale(k)`.
    pub fn to_svg(&self) -> String {
        format!(
            "translate({},{}) scale({})",
            fmt_coord(self.x),
            fmt_coord(self.y),
            fmt_coord(self.k)
        )
    }
}

/// Kind of input event offered to the gesture filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureKind {
    Wheel,
    MouseDown,
    DblClick,
    TouchStart,
}

impl GestureKind {
    /// Map a DOM event type name.
    pub fn from_event_type(name: &str) -> Option<Self> {
        match name {
            "wheel" => Some(Self::Wheel),
            "mousedown" => Some(Self::MouseDown),
            "dblclick" => Some(Self::DblClick),
            "touchstart" => Some(Self::TouchStart),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gesture {
    pub kind: GestureKind,
    pub ctrl_key: bool,
    /// Mouse button; 0 is the primary button (and touch).
    pub button: i16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterDecision {
    /// Always set: page scrolling is suppressed over the diagram.
    pub prevent_default: bool,
    /// Whether the camera should act on the gesture.
    pub accept: bool,
}

/// Decide whether a gesture drives the camera.
///
/// Ctrl-modified gestures are ignored except for the wheel (pinch zoom on
/// trackpads), and only the primary button pans.
pub fn filter(gesture: &Gesture) -> FilterDecision {
    FilterDecision {
        prevent_default: true,
        accept: (!gesture.ctrl_key || gesture.kind == GestureKind::Wheel) && gesture.button == 0,
    }
}

/// Zoom exponent for a wheel event, as d3-zoom computes it.
///
/// `delta_mode` follows the DOM: 0 pixels, 1 lines, 2 pages.
pub fn wheel_delta(delta_y: f64, delta_mode: u32, ctrl_key: bool) -> f64 {
    let unit = match delta_mode {
        0 => 0.002,
        1 => 0.05,
        _ => 1.0,
    };
    -delta_y * unit * if ctrl_key { 10.0 } else { 1.0 }
}

/// Cubic in-out easing.
pub fn ease_cubic_in_out(t: f64) -> f64 {
    let t = t * 2.0;
    if t <= 1.0 {
        t * t * t / 2.0
    } else {
        let t = t - 2.0;
        (t * t * t + 2.0) / 2.0
    }
}

/// Smooth zoom path between two views, each `[center_x, center_y, width]`.
#[derive(Debug, Clone, Copy)]
struct ZoomPath {
    from: [f64; 3],
    dx: f64,
    dy: f64,
    shape: PathShape,
}

#[derive(Debug, Clone, Copy)]
enum PathShape {
    /// Centers coincide: exponential scale only.
    Scale { s: f64 },
    /// Zoom out, pan, zoom in.
    Arc { s: f64, r0: f64, d1: f64 },
}

impl ZoomPath {
    fn new(from: [f64; 3], to: [f64; 3]) -> Self {
        let [ux0, uy0, w0] = from;
        let [ux1, uy1, w1] = to;
        let dx = ux1 - ux0;
        let dy = uy1 - uy0;
        let d2 = dx * dx + dy * dy;
        let rho2 = RHO * RHO;
        let rho4 = rho2 * rho2;

        let shape = if d2 < EPSILON_2 {
            PathShape::Scale {
                s: (w1 / w0).ln() / RHO,
            }
        } else {
            let d1 = d2.sqrt();
            let b0 = (w1 * w1 - w0 * w0 + rho4 * d2) / (2.0 * w0 * rho2 * d1);
            let b1 = (w1 * w1 - w0 * w0 - rho4 * d2) / (2.0 * w1 * rho2 * d1);
            let r0 = ((b0 * b0 + 1.0).sqrt() - b0).ln();
            let r1 = ((b1 * b1 + 1.0).sqrt() - b1).ln();
            PathShape::Arc {
                s: (r1 - r0) / RHO,
                r0,
                d1,
            }
        };

        Self { from, dx, dy, shape }
    }

    fn at(&self, t: f64) -> [f64; 3] {
        let [ux0, uy0, w0] = self.from;
        match self.shape {
            PathShape::Scale { s } => [ux0 + t * self.dx, uy0 + t * self.dy, w0 * (RHO * t * s).exp()],
            PathShape::Arc { s, r0, d1 } => {
                let s = t * s;
                let cosh_r0 = r0.cosh();
                let u = w0 / (RHO * RHO * d1) * (cosh_r0 * (RHO * s + r0).tanh() - r0.sinh());
                [
                    ux0 + u * self.dx,
                    uy0 + u * self.dy,
                    w0 * cosh_r0 / (RHO * s + r0).cosh(),
                ]
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Transition {
    target: Transform,
    path: ZoomPath,
    /// Viewport center the path is expressed around.
    pivot: [f64; 2],
    /// Viewport size the path widths are relative to.
    span: f64,
    elapsed_ms: f64,
    duration_ms: f64,
}

impl Transition {
    fn new(from: Transform, target: Transform, config: &CameraConfig) -> Self {
        let pivot = [config.width / 2.0, config.height / 2.0];
        let span = config.width.max(config.height);
        let a = from.invert(pivot);
        let b = target.invert(pivot);
        Self {
            target,
            path: ZoomPath::new([a[0], a[1], span / from.k], [b[0], b[1], span / target.k]),
            pivot,
            span,
            elapsed_ms: 0.0,
            duration_ms: config.reset_duration_ms,
        }
    }

    fn transform_at(&self, eased: f64) -> Transform {
        let [cx, cy, w] = self.path.at(eased);
        let k = self.span / w;
        Transform::new(k, self.pivot[0] - cx * k, self.pivot[1] - cy * k)
    }
}

/// Constrained zoom/pan state for one diagram.
#[derive(Debug, Clone)]
pub struct Camera {
    config: CameraConfig,
    transform: Transform,
    transition: Option<Transition>,
}

impl Camera {
    /// Create a camera at the identity transform.
    pub fn new(config: CameraConfig) -> Self {
        Self {
            config,
            transform: Transform::IDENTITY,
            transition: None,
        }
    }

    /// Get the camera configuration.
    pub fn config(&self) -> &CameraConfig {
        &self.config
    }

    /// Get the current transform.
    pub fn transform(&self) -> Transform {
        self.transform
    }

    /// True while a reset animation is running.
    pub fn is_animating(&self) -> bool {
        self.transition.is_some()
    }

    /// Zoom by `factor` keeping the screen point `pivot` fixed.
    pub fn zoom_by(&mut self, factor: f64, pivot: [f64; 2]) {
        let t = self.transform;
        let k = self.clamp_scale(t.k * factor);
        let anchor = t.invert(pivot);
        let scaled = Transform::new(k, pivot[0] - anchor[0] * k, pivot[1] - anchor[1] * k);
        self.replace(scaled);
    }

    /// Apply a wheel event at `pivot`.
    pub fn wheel(&mut self, delta_y: f64, delta_mode: u32, ctrl_key: bool, pivot: [f64; 2]) {
        self.zoom_by(2f64.powf(wheel_delta(delta_y, delta_mode, ctrl_key)), pivot);
    }

    /// Pan by a screen-space delta.
    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        let moved = self.transform.offset(dx, dy);
        self.replace(moved);
    }

    /// Jump to `transform`, subject to the usual constraints.
    pub fn set_transform(&mut self, transform: Transform) {
        let k = self.clamp_scale(transform.k);
        self.replace(Transform { k, ..transform });
    }

    /// Start animating back to identity.
    pub fn reset(&mut self) {
        if self.config.reset_duration_ms <= 0.0 || self.transform.is_identity() {
            self.transition = None;
            self.transform = Transform::IDENTITY;
            return;
        }
        self.transition = Some(Transition::new(
            self.transform,
            Transform::IDENTITY,
            &self.config,
        ));
    }

    /// Advance a running transition by `elapsed_ms`.
    ///
    /// Returns true while the transition is still running.
    pub fn tick(&mut self, elapsed_ms: f64) -> bool {
        let Some(transition) = self.transition.as_mut() else {
            return false;
        };
        transition.elapsed_ms += elapsed_ms.max(0.0);
        let t = (transition.elapsed_ms / transition.duration_ms).min(1.0);

        if t >= 1.0 {
            self.transform = transition.target;
            self.transition = None;
            trace!("camera transition finished");
            return false;
        }

        self.transform = transition.transform_at(ease_cubic_in_out(t));
        true
    }

    fn clamp_scale(&self, k: f64) -> f64 {
        let [lo, hi] = self.config.scale_extent;
        k.clamp(lo, hi)
    }

    /// Interrupt any transition and install the constrained transform.
    fn replace(&mut self, transform: Transform) {
        self.transition = None;
        self.transform = self.constrain(transform);
    }

    fn constrain(&self, t: Transform) -> Transform {
        let (w, h) = (self.config.width, self.config.height);
        let dx0 = t.invert([0.0, 0.0])[0];
        let dx1 = t.invert([w, h])[0] - w;
        let dy0 = t.invert([0.0, 0.0])[1];
        let dy1 = t.invert([w, h])[1] - h;
        t.translate(settle(dx0, dx1), settle(dy0, dy1))
    }
}

/// Shift along one axis that brings the visible span back inside the extent.
fn settle(d0: f64, d1: f64) -> f64 {
    if d1 > d0 {
        (d0 + d1) / 2.0
    } else if d0 < 0.0 {
        d0
    } else {
        d1.max(0.0)
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(CameraConfig::default())
    }
}
