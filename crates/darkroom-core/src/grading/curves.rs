//! Diagonal curve evaluation and 16-bit LUT baking.
//!
//! A curve is stored the way the editor stores it: a flat list whose first
//! entry is a type tag, followed either by `x, y` control point pairs or, for
//! parametric curves, by three zone splits and four zone amounts.
//!
//! ```text
//! [tag, x0, y0, x1, y1, ...]                         point curves
//! [2, split1, split2, split3, hl, lights, darks, sh] parametric
//! ```
//!
//! Tag `0` is the identity sentinel: such a curve never allocates a table.
//!
//! # Curve kinds
//! - **Linear**: polyline through the points.
//! - **Spline**: natural cubic spline (zero second derivative at both ends).
//! - **Catmull-Rom**: uniform Catmull-Rom with mirrored virtual end points,
//!   giving C1 continuity through every control point.
//! - **NURBS**: quadratic Bézier pieces joining the midpoints of the control
//!   polygon, flattened to a polyline. The point budget is the quality knob.
//! - **Parametric**: four tonal zones bent by half-sine bumps.
//!
//! # Complexity
//! - Evaluate: O(log N) binary search + O(1) interpolation
//! - Bake to LUT: O(65536 × log N)

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::color_management::GammaTables;
use crate::image::MAX_SAMPLE;
use crate::transform::lut1d::{LUT_SIZE, Lut1D};

/// Polyline vertex budget for NURBS curves at full quality. Preview passes
/// divide it by their downscale factor.
pub const MIN_POLY_POINTS: usize = 1000;

/// Parametric bump amplitude relative to the widest monotone bump.
const PARAMETRIC_BEND: f64 = 0.9;

/// Default parametric zone splits.
const DEFAULT_SPLITS: [f64; 3] = [0.25, 0.5, 0.75];

/// Tolerance for "point lies on the diagonal".
const IDENTITY_EPSILON: f64 = 1e-6;

/// Curve type, stored as the leading tag of a [`CurveSpec`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CurveKind {
    Identity,
    Spline,
    Parametric,
    Nurbs,
    CatmullRom,
    Linear,
}

impl CurveKind {
    /// Numeric tag used in the flat representation.
    pub const fn tag(self) -> f64 {
        match self {
            Self::Identity => 0.0,
            Self::Spline => 1.0,
            Self::Parametric => 2.0,
            Self::Nurbs => 3.0,
            Self::CatmullRom => 4.0,
            Self::Linear => 5.0,
        }
    }

    /// Kind for a tag. Non-integral or unknown tags have no kind.
    pub fn from_tag(tag: f64) -> Option<Self> {
        if tag.fract() != 0.0 {
            return None;
        }
        match tag as i64 {
            0 => Some(Self::Identity),
            1 => Some(Self::Spline),
            2 => Some(Self::Parametric),
            3 => Some(Self::Nurbs),
            4 => Some(Self::CatmullRom),
            5 => Some(Self::Linear),
            _ => None,
        }
    }
}

/// User-editable curve description: type tag followed by its data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CurveSpec(Vec<f64>);

impl Default for CurveSpec {
    fn default() -> Self {
        Self::identity()
    }
}

impl CurveSpec {
    /// The identity sentinel `[0]`.
    pub fn identity() -> Self {
        Self(vec![CurveKind::Identity.tag()])
    }

    /// Point curve of the given kind.
    pub fn from_points(kind: CurveKind, points: &[[f64; 2]]) -> Self {
        let mut raw = Vec::with_capacity(1 + points.len() * 2);
        raw.push(kind.tag());
        for p in points {
            raw.extend_from_slice(p);
        }
        Self(raw)
    }

    /// Parametric curve. `zones` are `[highlights, lights, darks, shadows]`
    /// in `[-100, 100]`.
    pub fn parametric(splits: [f64; 3], zones: [f64; 4]) -> Self {
        let mut raw = vec![CurveKind::Parametric.tag()];
        raw.extend_from_slice(&splits);
        raw.extend_from_slice(&zones);
        Self(raw)
    }

    /// Wrap a raw flat list as produced by the editor.
    pub fn from_raw(raw: Vec<f64>) -> Self {
        Self(raw)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Curve kind, or `None` when the list is empty or the tag is unknown.
    pub fn kind(&self) -> Option<CurveKind> {
        self.0.first().copied().and_then(CurveKind::from_tag)
    }

    /// Whether the spec is the identity sentinel (or cannot be a curve at all).
    pub fn is_identity_tag(&self) -> bool {
        matches!(self.kind(), None | Some(CurveKind::Identity))
    }

    /// Control points after the tag. Meaningless for parametric curves.
    pub fn points(&self) -> Vec<[f64; 2]> {
        self.0
            .get(1..)
            .unwrap_or_default()
            .chunks_exact(2)
            .map(|p| [p[0], p[1]])
            .collect()
    }
}

/// Normalise a malformed curve spec in place. Returns `true` if it changed.
///
/// A spec is valid when it is exactly the identity tag, a point curve with
/// an odd number (at least 5) of entries, or a parametric curve with at
/// least 8 entries and strictly ascending splits.
pub fn sanitize_curve(spec: &mut CurveSpec) -> bool {
    let raw = &mut spec.0;
    let Some(kind) = raw.first().copied().and_then(CurveKind::from_tag) else {
        *raw = vec![CurveKind::Identity.tag()];
        return true;
    };

    match kind {
        CurveKind::Identity => {
            if raw.len() == 1 {
                return false;
            }
            raw.truncate(1);
            true
        }
        CurveKind::Parametric => {
            if raw.len() < 8 {
                *raw = vec![CurveKind::Identity.tag()];
                return true;
            }
            if !splits_ascending([raw[1], raw[2], raw[3]]) {
                raw[1..4].copy_from_slice(&DEFAULT_SPLITS);
                return true;
            }
            false
        }
        _ => {
            if raw.len() % 2 == 0 || raw.len() < 5 {
                *raw = vec![CurveKind::Identity.tag()];
                return true;
            }
            false
        }
    }
}

fn splits_ascending(s: [f64; 3]) -> bool {
    0.0 < s[0] && s[0] < s[1] && s[1] < s[2] && s[2] < 1.0
}

/// A continuous curve mapping `[0, 1]` onto `[0, 1]`.
#[derive(Debug, Clone)]
pub struct DiagonalCurve {
    shape: Shape,
    identity: bool,
}

#[derive(Debug, Clone)]
enum Shape {
    Polyline { xs: Vec<f64>, ys: Vec<f64> },
    Spline { xs: Vec<f64>, ys: Vec<f64>, ypp: Vec<f64> },
    CatmullRom { points: Vec<[f64; 2]> },
    Parametric { edges: [f64; 5], amounts: [f64; 4] },
}

impl DiagonalCurve {
    /// Build the curve described by `spec`. `poly_points` is the vertex
    /// budget for NURBS flattening.
    ///
    /// Returns `None` for the identity sentinel and for specs that do not
    /// describe a curve (unknown tag, fewer than two usable points).
    pub fn new(spec: &CurveSpec, poly_points: usize) -> Option<Self> {
        let kind = spec.kind()?;
        if kind == CurveKind::Identity {
            return None;
        }

        if kind == CurveKind::Parametric {
            let raw = spec.as_slice();
            if raw.len() < 8 {
                return None;
            }
            let mut splits = [raw[1], raw[2], raw[3]];
            if !splits_ascending(splits) {
                splits = DEFAULT_SPLITS;
            }
            let zone = |v: f64| if v.is_finite() { v.clamp(-100.0, 100.0) / 100.0 } else { 0.0 };
            // Stored order is highlights, lights, darks, shadows.
            let amounts = [zone(raw[7]), zone(raw[6]), zone(raw[5]), zone(raw[4])];
            return Some(Self {
                identity: amounts.iter().all(|a| *a == 0.0),
                shape: Shape::Parametric {
                    edges: [0.0, splits[0], splits[1], splits[2], 1.0],
                    amounts,
                },
            });
        }

        let points = normalized_points(spec.points());
        if points.len() < 2 {
            return None;
        }
        let identity = is_diagonal(&points);

        let shape = match kind {
            CurveKind::Linear => {
                let (xs, ys) = points.iter().map(|p| (p[0], p[1])).unzip();
                Shape::Polyline { xs, ys }
            }
            CurveKind::Spline => {
                let (xs, ys): (Vec<f64>, Vec<f64>) = points.iter().map(|p| (p[0], p[1])).unzip();
                let ypp = natural_spline_second_derivatives(&xs, &ys);
                Shape::Spline { xs, ys, ypp }
            }
            CurveKind::CatmullRom => Shape::CatmullRom { points },
            CurveKind::Nurbs => {
                let (xs, ys) = flatten_quadratic_pieces(&points, poly_points.max(2));
                Shape::Polyline { xs, ys }
            }
            CurveKind::Identity | CurveKind::Parametric => return None,
        };

        Some(Self { shape, identity })
    }

    /// Whether the curve leaves every input unchanged.
    pub fn is_identity(&self) -> bool {
        self.identity
    }

    /// Evaluate at `t`. Input is clamped to `[0, 1]` (NaN → 0); so is output.
    pub fn value(&self, t: f64) -> f64 {
        let t = if t > 0.0 { t.min(1.0) } else { 0.0 };
        let y = match &self.shape {
            Shape::Polyline { xs, ys } => polyline_value(xs, ys, t),
            Shape::Spline { xs, ys, ypp } => spline_value(xs, ys, ypp, t),
            Shape::CatmullRom { points } => catmull_rom_value(points, t),
            Shape::Parametric { edges, amounts } => parametric_value(edges, amounts, t),
        };
        y.clamp(0.0, 1.0)
    }
}

/// Clamp to the unit square, drop non-finite points, sort by x and keep the
/// last point for each x.
fn normalized_points(points: Vec<[f64; 2]>) -> Vec<[f64; 2]> {
    let mut pts: Vec<[f64; 2]> = points
        .into_iter()
        .filter(|p| p[0].is_finite() && p[1].is_finite())
        .map(|p| [p[0].clamp(0.0, 1.0), p[1].clamp(0.0, 1.0)])
        .collect();
    pts.sort_by(|a, b| a[0].total_cmp(&b[0]));

    let mut out: Vec<[f64; 2]> = Vec::with_capacity(pts.len());
    for p in pts {
        match out.last_mut() {
            Some(last) if last[0] == p[0] => *last = p,
            _ => out.push(p),
        }
    }
    out
}

fn is_diagonal(points: &[[f64; 2]]) -> bool {
    let (Some(first), Some(last)) = (points.first(), points.last()) else {
        return true;
    };
    first[0] == 0.0
        && first[1] == 0.0
        && last[0] == 1.0
        && last[1] == 1.0
        && points.iter().all(|p| (p[0] - p[1]).abs() < IDENTITY_EPSILON)
}

/// Index of the segment `[xs[k], xs[k + 1]]` containing `t`, for
/// `xs[0] < t < xs[last]`.
fn segment(xs: &[f64], t: f64) -> usize {
    let hi = xs.partition_point(|&x| x <= t);
    hi.saturating_sub(1).min(xs.len() - 2)
}

fn polyline_value(xs: &[f64], ys: &[f64], t: f64) -> f64 {
    let last = xs.len() - 1;
    if t <= xs[0] {
        return ys[0];
    }
    if t >= xs[last] {
        return ys[last];
    }
    let k = segment(xs, t);
    let h = xs[k + 1] - xs[k];
    if h <= 0.0 {
        return ys[k + 1];
    }
    ys[k] + (ys[k + 1] - ys[k]) * (t - xs[k]) / h
}

/// Second derivatives of the natural cubic spline through `(xs, ys)`.
fn natural_spline_second_derivatives(xs: &[f64], ys: &[f64]) -> Vec<f64> {
    let n = xs.len();
    let mut ypp = vec![0.0; n];
    let mut u = vec![0.0; n];

    for i in 1..n - 1 {
        let sig = (xs[i] - xs[i - 1]) / (xs[i + 1] - xs[i - 1]);
        let p = sig * ypp[i - 1] + 2.0;
        ypp[i] = (sig - 1.0) / p;
        let slope_diff =
            (ys[i + 1] - ys[i]) / (xs[i + 1] - xs[i]) - (ys[i] - ys[i - 1]) / (xs[i] - xs[i - 1]);
        u[i] = (6.0 * slope_diff / (xs[i + 1] - xs[i - 1]) - sig * u[i - 1]) / p;
    }

    ypp[n - 1] = 0.0;
    for k in (0..n - 1).rev() {
        ypp[k] = ypp[k] * ypp[k + 1] + u[k];
    }
    ypp
}

fn spline_value(xs: &[f64], ys: &[f64], ypp: &[f64], t: f64) -> f64 {
    let last = xs.len() - 1;
    if t <= xs[0] {
        return ys[0];
    }
    if t >= xs[last] {
        return ys[last];
    }
    let k = segment(xs, t);
    let h = xs[k + 1] - xs[k];
    let a = (xs[k + 1] - t) / h;
    let b = (t - xs[k]) / h;
    a * ys[k]
        + b * ys[k + 1]
        + ((a * a * a - a) * ypp[k] + (b * b * b - b) * ypp[k + 1]) * (h * h) / 6.0
}

fn catmull_rom_value(pts: &[[f64; 2]], t: f64) -> f64 {
    let last = pts.len() - 1;
    if t <= pts[0][0] {
        return pts[0][1];
    }
    if t >= pts[last][0] {
        return pts[last][1];
    }

    let lo = pts.partition_point(|p| p[0] <= t).saturating_sub(1).min(last - 1);
    let hi = lo + 1;
    let p1 = pts[lo];
    let p2 = pts[hi];

    // Virtual endpoints: mirror at boundaries
    let p0 = if lo > 0 {
        pts[lo - 1]
    } else {
        [2.0 * p1[0] - p2[0], 2.0 * p1[1] - p2[1]]
    };
    let p3 = if hi < last {
        pts[hi + 1]
    } else {
        [2.0 * p2[0] - p1[0], 2.0 * p2[1] - p1[1]]
    };

    let segment_t = (t - p1[0]) / (p2[0] - p1[0]);
    catmull_rom(p0[1], p1[1], p2[1], p3[1], segment_t)
}

/// Catmull-Rom cubic interpolation between P1 and P2.
///
/// ```text
/// q(t) = 0.5 × ((2×P1) + (-P0 + P2)×t + (2×P0 - 5×P1 + 4×P2 - P3)×t² + (-P0 + 3×P1 - 3×P2 + P3)×t³)
/// ```
fn catmull_rom(p0: f64, p1: f64, p2: f64, p3: f64, t: f64) -> f64 {
    let t2 = t * t;
    let t3 = t2 * t;
    0.5 * ((2.0 * p1)
        + (-p0 + p2) * t
        + (2.0 * p0 - 5.0 * p1 + 4.0 * p2 - p3) * t2
        + (-p0 + 3.0 * p1 - 3.0 * p2 + p3) * t3)
}

/// Flatten the quadratic B-spline of a control polygon into a polyline.
///
/// Each interior control point drives one quadratic Bézier piece running
/// from the midpoint of the previous edge to the midpoint of the next (the
/// first and last pieces start/end on the polygon's end points). Vertices
/// are distributed over pieces in proportion to their control length.
fn flatten_quadratic_pieces(pts: &[[f64; 2]], budget: usize) -> (Vec<f64>, Vec<f64>) {
    let n = pts.len();
    if n == 2 {
        return (vec![pts[0][0], pts[1][0]], vec![pts[0][1], pts[1][1]]);
    }

    let mid = |a: [f64; 2], b: [f64; 2]| [(a[0] + b[0]) * 0.5, (a[1] + b[1]) * 0.5];
    let dist = |a: [f64; 2], b: [f64; 2]| (b[0] - a[0]).hypot(b[1] - a[1]);
    let total: f64 = pts.windows(2).map(|w| dist(w[0], w[1])).sum();

    let mut xs = vec![pts[0][0]];
    let mut ys = vec![pts[0][1]];

    for k in 1..n - 1 {
        let start = if k == 1 { pts[0] } else { mid(pts[k - 1], pts[k]) };
        let end = if k == n - 2 { pts[n - 1] } else { mid(pts[k], pts[k + 1]) };
        let ctrl = pts[k];

        let length = dist(start, ctrl) + dist(ctrl, end);
        let steps = ((budget as f64 * length / total).ceil() as usize).max(2);

        for s in 1..=steps {
            let t = s as f64 / steps as f64;
            let tr = 1.0 - t;
            let (a, b, c) = (tr * tr, 2.0 * tr * t, t * t);
            xs.push(a * start[0] + b * ctrl[0] + c * end[0]);
            ys.push(a * start[1] + b * ctrl[1] + c * end[1]);
        }
    }
    (xs, ys)
}

/// Zone `z` spans `[edges[z], edges[z + 1]]`; a positive amount lifts it,
/// a negative amount lowers it. Each bump vanishes at its zone edges and its
/// slope never exceeds `PARAMETRIC_BEND`, so the curve stays monotone.
fn parametric_value(edges: &[f64; 5], amounts: &[f64; 4], t: f64) -> f64 {
    let mut y = t;
    for z in 0..4 {
        let (a, b) = (edges[z], edges[z + 1]);
        if amounts[z] != 0.0 && t > a && t < b {
            let w = b - a;
            y += amounts[z] * PARAMETRIC_BEND * w / PI * (PI * (t - a) / w).sin();
        }
    }
    y
}

/// Bake a channel curve into a 16-bit LUT over linear samples.
///
/// Curves are shaped in sRGB-encoded space but pixel data is linear, so
/// each table entry is `decode(curve(encode(i)))`. `skip` is the preview
/// downscale factor; it reduces the NURBS vertex budget.
///
/// Identity specs and identity curves yield [`Lut1D::Identity`] without
/// allocating or evaluating anything.
pub fn build_curve_lut(spec: &CurveSpec, gamma: &GammaTables, skip: usize) -> Lut1D {
    if spec.is_identity_tag() {
        return Lut1D::Identity;
    }
    let Some(curve) = DiagonalCurve::new(spec, MIN_POLY_POINTS / skip.max(1)) else {
        return Lut1D::Identity;
    };
    if curve.is_identity() {
        return Lut1D::Identity;
    }

    tracing::debug!(kind = ?spec.kind(), skip, "baking curve LUT");
    Lut1D::build(LUT_SIZE, |i| {
        let encoded = gamma.forward_at(i) / MAX_SAMPLE;
        let y = curve.value(f64::from(encoded)) as f32;
        gamma.decode(y * MAX_SAMPLE)
    })
}
