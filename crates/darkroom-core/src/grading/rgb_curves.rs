//! Per-channel RGB curves.

use rayon::prelude::*;

use crate::color_management::GammaTables;
use crate::grading::curves::build_curve_lut;
use crate::image::{Channel, MAX_SAMPLE, PipetteBuffer, PlanarImage};
use crate::transform::kernel::Execution;
use crate::transform::lut1d::Lut1D;
use crate::transform::params::RgbCurvesParams;

/// Pipette attachment: which channel to sample and where to write it.
#[derive(Debug)]
pub struct Pipette<'a> {
    pub channel: Channel,
    pub buffer: &'a mut PipetteBuffer,
}

/// The three baked channel tables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RgbCurveLuts {
    luts: [Lut1D; 3],
}

impl RgbCurveLuts {
    pub fn build(params: &RgbCurvesParams, gamma: &GammaTables, skip: usize) -> Self {
        Self {
            luts: Channel::ALL.map(|c| build_curve_lut(params.curve(c), gamma, skip)),
        }
    }

    pub fn lut(&self, channel: Channel) -> &Lut1D {
        &self.luts[channel.index()]
    }

    /// True when no channel has a table.
    pub fn is_identity(&self) -> bool {
        self.luts.iter().all(Lut1D::is_identity)
    }

    /// Replace each sample of every table channel with its lookup.
    pub fn apply(&self, image: &mut PlanarImage, exec: &Execution) {
        if self.is_identity() {
            return;
        }
        let kernel = exec.kernel;
        image.for_each_row_mut(exec.multithread, |_, planes| {
            for (lut, samples) in self.luts.iter().zip(planes) {
                kernel.apply_lut(lut, samples);
            }
        });
    }
}

/// Apply the RGB curves stage in place.
///
/// When disabled, an attached pipette is filled with `0.0` and the image is
/// left alone. When enabled, the pipette receives the encoded, clamped
/// pre-transform value of its channel before any sample changes.
///
/// # Panics
///
/// If the pipette buffer's dimensions differ from the image's.
pub fn apply_rgb_curves(
    image: &mut PlanarImage,
    params: &RgbCurvesParams,
    gamma: &GammaTables,
    skip: usize,
    pipette: Option<Pipette<'_>>,
    exec: &Execution,
) {
    if let Some(p) = &pipette {
        assert!(
            p.buffer.matches(image),
            "pipette {}x{} does not match image {}x{}",
            p.buffer.width(),
            p.buffer.height(),
            image.width(),
            image.height()
        );
    }

    if !params.enabled {
        if let Some(p) = pipette {
            p.buffer.fill(0.0);
        }
        return;
    }

    let luts = RgbCurveLuts::build(params, gamma, skip);

    if let Some(p) = pipette {
        write_encoded_plane(image.channel(p.channel), image.width(), gamma, p.buffer.data_mut(), exec);
    }

    luts.apply(image, exec);
}

/// `dst[i] = clamp01(encode(src[i]) / MAX_SAMPLE)`, row-parallel.
pub(crate) fn write_encoded_plane(
    src: &[f32],
    width: usize,
    gamma: &GammaTables,
    dst: &mut [f32],
    exec: &Execution,
) {
    if width == 0 {
        return;
    }
    let encode_row = |(out, row): (&mut [f32], &[f32])| {
        for (o, v) in out.iter_mut().zip(row) {
            *o = (gamma.encode(*v) / MAX_SAMPLE).clamp(0.0, 1.0);
        }
    };
    if exec.multithread {
        dst.par_chunks_mut(width)
            .zip(src.par_chunks(width))
            .for_each(encode_row);
    } else {
        dst.chunks_mut(width).zip(src.chunks(width)).for_each(encode_row);
    }
}
