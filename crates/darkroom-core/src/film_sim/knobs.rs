//! Adjustments a CLUT can expose as named parameters.
//!
//! A CLUT opts into a knob by declaring it (`# PARAM exposure -2 2 0`).
//! Undeclared knobs stay neutral whatever the parameter block says.

use std::collections::BTreeMap;

use crate::film_sim::clut::Clut;

/// Rec. 709 luminance weights.
const LUMA_REC709: [f32; 3] = [0.2126, 0.7152, 0.0722];

pub const EXPOSURE: &str = "exposure";
pub const SATURATION: &str = "saturation";

/// Resolved knob values for one application.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Knobs {
    /// Exposure in EV, applied to linear input before the lookup.
    pub exposure: f32,
    /// Saturation multiplier, applied to the encoded lookup result.
    pub saturation: f32,
}

impl Default for Knobs {
    fn default() -> Self {
        Self {
            exposure: 0.0,
            saturation: 1.0,
        }
    }
}

impl Knobs {
    /// Values for the knobs `clut` declares: user value clamped to the
    /// declared range, or the declared default when absent.
    pub fn resolve(clut: &Clut, values: &BTreeMap<String, f32>) -> Self {
        let mut knobs = Self::default();
        for desc in clut.params() {
            let value = desc.resolve(values.get(&desc.name).copied());
            match desc.name.as_str() {
                EXPOSURE => knobs.exposure = value,
                SATURATION => knobs.saturation = value,
                other => tracing::debug!(param = other, "CLUT parameter has no effect"),
            }
        }
        knobs
    }
}

/// Scale linear RGB by `2^ev`.
///
/// `ev = 0.0` produces no change.
pub fn apply_exposure(rgb: [f32; 3], ev: f32) -> [f32; 3] {
    if ev == 0.0 {
        return rgb;
    }
    let gain = ev.exp2();
    [rgb[0] * gain, rgb[1] * gain, rgb[2] * gain]
}

/// Scale chroma relative to Rec. 709 luminance.
///
/// ```text
/// luma = dot(rgb, rec709_weights)
/// out = luma + (rgb − luma) × saturation
/// ```
///
/// `saturation = 1.0` produces no change.
pub fn apply_saturation(rgb: [f32; 3], saturation: f32) -> [f32; 3] {
    if (saturation - 1.0).abs() < 1e-7 {
        return rgb;
    }
    let luma = rgb[0] * LUMA_REC709[0] + rgb[1] * LUMA_REC709[1] + rgb[2] * LUMA_REC709[2];
    [
        luma + (rgb[0] - luma) * saturation,
        luma + (rgb[1] - luma) * saturation,
        luma + (rgb[2] - luma) * saturation,
    ]
}
