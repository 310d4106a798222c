//! Precomputed gamma tables shared by every curve evaluation.
//!
//! Curves are drawn by the user in a perceptual (sRGB-encoded) space while
//! pixel data stays linear. `GammaTables` holds both directions of that
//! conversion over the 16-bit sample domain. It is built once at start-up,
//! never mutated afterwards, and handed to consumers as `Arc<GammaTables>`.

use crate::color_management::transfer::{SrgbTransfer, TransferFunction};
use crate::image::MAX_SAMPLE;
use crate::transform::lut1d::{LUT_SIZE, Lut1D};

/// Forward (linear → encoded) and inverse (encoded → linear) tables.
#[derive(Debug, Clone)]
pub struct GammaTables {
    forward: Lut1D,
    inverse: Lut1D,
}

impl GammaTables {
    /// Tables for the sRGB transfer function.
    pub fn srgb() -> Self {
        Self::new(&SrgbTransfer)
    }

    /// Tables for an arbitrary transfer function.
    pub fn new(transfer: &dyn TransferFunction) -> Self {
        let max = f64::from(MAX_SAMPLE);
        let forward = Lut1D::build(LUT_SIZE, |i| {
            (transfer.to_encoded(i as f64 / max).clamp(0.0, 1.0) * max) as f32
        });
        let inverse = Lut1D::build(LUT_SIZE, |i| {
            (transfer.to_linear(i as f64 / max).clamp(0.0, 1.0) * max) as f32
        });
        tracing::debug!(entries = LUT_SIZE, "gamma tables built");
        Self { forward, inverse }
    }

    /// Linear sample → encoded sample, both in `[0, MAX_SAMPLE]`.
    #[inline]
    pub fn encode(&self, linear: f32) -> f32 {
        self.forward.apply(linear)
    }

    /// Encoded sample → linear sample, both in `[0, MAX_SAMPLE]`.
    #[inline]
    pub fn decode(&self, encoded: f32) -> f32 {
        self.inverse.apply(encoded)
    }

    /// [`encode`](Self::encode) on normalised `[0, 1]` values.
    #[inline]
    pub fn encode_normalized(&self, linear: f32) -> f32 {
        self.forward.apply(linear * MAX_SAMPLE) / MAX_SAMPLE
    }

    /// [`decode`](Self::decode) on normalised `[0, 1]` values.
    #[inline]
    pub fn decode_normalized(&self, encoded: f32) -> f32 {
        self.inverse.apply(encoded * MAX_SAMPLE) / MAX_SAMPLE
    }

    /// Entry `index` of the forward table.
    #[inline]
    pub fn forward_at(&self, index: usize) -> f32 {
        self.forward.at(index)
    }

    pub fn forward(&self) -> &Lut1D {
        &self.forward
    }

    pub fn inverse(&self) -> &Lut1D {
        &self.inverse
    }
}

impl Default for GammaTables {
    fn default() -> Self {
        Self::srgb()
    }
}
