//! Lookup tables, execution kernels and processing parameters.

pub mod kernel;
pub mod lut1d;
pub mod lut3d;
pub mod params;
