//! Master tone curve: one curve applied identically to R, G and B.

use crate::color_management::GammaTables;
use crate::grading::curves::build_curve_lut;
use crate::grading::rgb_curves::write_encoded_plane;
use crate::image::{Channel, PlanarImage};
use crate::transform::kernel::Execution;
use crate::transform::params::ToneCurveParams;

/// Apply the tone curve in place.
///
/// `pipette`, if attached, is a three-plane map receiving the encoded,
/// clamped pre-transform value of each channel (all zero when disabled).
///
/// # Panics
///
/// If the pipette's dimensions differ from the image's.
pub fn apply_tone_curve(
    image: &mut PlanarImage,
    params: &ToneCurveParams,
    gamma: &GammaTables,
    skip: usize,
    pipette: Option<&mut PlanarImage>,
    exec: &Execution,
) {
    if let Some(p) = &pipette {
        assert!(
            p.width() == image.width() && p.height() == image.height(),
            "tone pipette {}x{} does not match image {}x{}",
            p.width(),
            p.height(),
            image.width(),
            image.height()
        );
    }

    if !params.enabled {
        if let Some(p) = pipette {
            for c in Channel::ALL {
                p.channel_mut(c).fill(0.0);
            }
        }
        return;
    }

    let lut = build_curve_lut(&params.curve, gamma, skip);

    if let Some(p) = pipette {
        for c in Channel::ALL {
            write_encoded_plane(image.channel(c), image.width(), gamma, p.channel_mut(c), exec);
        }
    }

    if lut.is_identity() {
        return;
    }
    let kernel = exec.kernel;
    image.for_each_row_mut(exec.multithread, |_, planes| {
        for samples in planes {
            kernel.apply_lut(&lut, samples);
        }
    });
}
