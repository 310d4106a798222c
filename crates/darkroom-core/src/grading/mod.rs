//! Curve tools: curve evaluation, per-channel RGB curves and the tone curve.

pub mod curves;
pub mod rgb_curves;
pub mod tone_curve;

pub use curves::{CurveKind, CurveSpec, DiagonalCurve, build_curve_lut, sanitize_curve};
pub use rgb_curves::{Pipette, RgbCurveLuts, apply_rgb_curves};
pub use tone_curve::apply_tone_curve;
