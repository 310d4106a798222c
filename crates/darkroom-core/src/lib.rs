//! Darkroom Core — pixel-transform engine for raw development.
//!
//! This crate contains the colour stages of the development pipeline:
//! curve evaluation and 16-bit LUT baking, per-channel and tone curves,
//! film simulation through 3D CLUTs, and geometric helpers for preview
//! buffers. No GUI or file-format glue.

pub mod color_management;
pub mod config;
pub mod error;
pub mod film_sim;
pub mod geometry;
pub mod grading;
pub mod image;
pub mod pipeline;
pub mod transform;

// Re-exports for convenience.
pub use color_management::GammaTables;
pub use config::EngineConfig;
pub use error::{BufferError, ClutError, FilmSimError, ParamsError};
pub use film_sim::{ClutState, ClutStore};
pub use geometry::{Rgb8Buffer, Rotation};
pub use grading::{CurveKind, CurveSpec, Pipette};
pub use image::{Channel, MAX_SAMPLE, PipetteBuffer, PlanarImage};
pub use pipeline::{Pipeline, PipetteTarget, ProcessReport, Stage};
pub use transform::kernel::{Execution, Kernel};
pub use transform::lut1d::Lut1D;
pub use transform::lut3d::Lut3D;
pub use transform::params::ProcParams;
