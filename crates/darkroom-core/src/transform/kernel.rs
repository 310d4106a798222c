//! Execution strategy for the per-pixel inner loops.
//!
//! Two kernels exist for LUT application:
//! - `Wide`: 4 samples per step through [`Lut1D::apply4`], scalar remainder
//! - `Scalar`: one sample per step
//!
//! Both produce bit-identical output. `Kernel::detect` picks `Wide` when the
//! target has 128-bit vector registers (SSE2 on x86_64, NEON on aarch64).
//!
//! [`Lut1D::apply4`]: crate::transform::lut1d::Lut1D::apply4

use serde::{Deserialize, Serialize};

use crate::transform::lut1d::Lut1D;

/// Inner-loop strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Kernel {
    Wide,
    Scalar,
}

impl Kernel {
    /// Best kernel for the running CPU.
    pub fn detect() -> Self {
        #[cfg(target_arch = "x86_64")]
        {
            if std::arch::is_x86_feature_detected!("sse2") {
                return Self::Wide;
            }
        }

        #[cfg(target_arch = "aarch64")]
        {
            if std::arch::is_aarch64_feature_detected!("neon") {
                return Self::Wide;
            }
        }

        Self::Scalar
    }

    /// Replace every sample in `samples` with `lut.apply(sample)`.
    #[inline]
    pub fn apply_lut(self, lut: &Lut1D, samples: &mut [f32]) {
        if lut.is_identity() {
            return;
        }
        match self {
            Self::Wide => {
                let mut chunks = samples.chunks_exact_mut(4);
                for c in &mut chunks {
                    let out = lut.apply4([c[0], c[1], c[2], c[3]]);
                    c.copy_from_slice(&out);
                }
                for v in chunks.into_remainder() {
                    *v = lut.apply(*v);
                }
            }
            Self::Scalar => {
                for v in samples {
                    *v = lut.apply(*v);
                }
            }
        }
    }
}

impl Default for Kernel {
    fn default() -> Self {
        Self::detect()
    }
}

/// How a stage distributes its work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Execution {
    /// Split rows across the rayon pool.
    pub multithread: bool,
    pub kernel: Kernel,
}

impl Execution {
    /// Single thread, scalar kernel. Reference behaviour for tests.
    pub const fn serial() -> Self {
        Self {
            multithread: false,
            kernel: Kernel::Scalar,
        }
    }
}

impl Default for Execution {
    fn default() -> Self {
        Self {
            multithread: true,
            kernel: Kernel::detect(),
        }
    }
}
