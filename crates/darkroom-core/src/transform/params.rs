//! Processing parameters consumed by the pipeline.
//!
//! `ProcParams` is the read-only contract between the editor and the
//! engine. Every field has a default, so a partial JSON document (or `{}`)
//! describes a valid, no-op development.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ParamsError;
use crate::grading::curves::{CurveSpec, sanitize_curve};
use crate::image::Channel;

/// Per-channel RGB curves.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RgbCurvesParams {
    pub enabled: bool,
    pub r_curve: CurveSpec,
    pub g_curve: CurveSpec,
    pub b_curve: CurveSpec,
}

impl RgbCurvesParams {
    /// Curve for one channel.
    pub fn curve(&self, channel: Channel) -> &CurveSpec {
        match channel {
            Channel::Red => &self.r_curve,
            Channel::Green => &self.g_curve,
            Channel::Blue => &self.b_curve,
        }
    }
}

/// A single curve applied to all three channels.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToneCurveParams {
    pub enabled: bool,
    pub curve: CurveSpec,
}

/// Film simulation through a 3D CLUT.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilmSimulationParams {
    pub enabled: bool,
    /// CLUT file, absolute or relative to the configured CLUT directory.
    pub clut_filename: String,
    /// Blend weight of the CLUT result. Default: `1.0`.
    pub strength: f32,
    /// Run after the tone curve instead of before it.
    pub after_tone_curve: bool,
    /// Values for the knobs the CLUT declares. Unknown names are ignored.
    pub clut_params: BTreeMap<String, f32>,
}

impl FilmSimulationParams {
    /// Strength clamped to `[0, 1]`; NaN counts as zero.
    pub fn clamped_strength(&self) -> f32 {
        if self.strength > 0.0 {
            self.strength.min(1.0)
        } else {
            0.0
        }
    }

    /// Whether the stage would touch any pixel.
    pub fn is_active(&self) -> bool {
        self.enabled && !self.clut_filename.is_empty() && self.clamped_strength() > 0.0
    }
}

impl Default for FilmSimulationParams {
    fn default() -> Self {
        Self {
            enabled: false,
            clut_filename: String::new(),
            strength: 1.0,
            after_tone_curve: false,
            clut_params: BTreeMap::new(),
        }
    }
}

/// Complete parameter block for one development.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcParams {
    pub rgb_curves: RgbCurvesParams,
    pub tone_curve: ToneCurveParams,
    pub film_simulation: FilmSimulationParams,
}

impl ProcParams {
    /// Parse a JSON document and sanitise its curves.
    pub fn from_json(json: &str) -> Result<Self, ParamsError> {
        let mut params: Self = serde_json::from_str(json)?;
        if params.sanitize() {
            tracing::debug!("malformed curves in parameters reset to identity");
        }
        Ok(params)
    }

    /// Read parameters from a JSON file.
    pub fn load(path: &Path) -> Result<Self, ParamsError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn to_json(&self) -> Result<String, ParamsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Normalise every curve. Returns whether anything changed.
    pub fn sanitize(&mut self) -> bool {
        let mut changed = false;
        for curve in [
            &mut self.rgb_curves.r_curve,
            &mut self.rgb_curves.g_curve,
            &mut self.rgb_curves.b_curve,
            &mut self.tone_curve.curve,
        ] {
            changed |= sanitize_curve(curve);
        }
        changed
    }
}
