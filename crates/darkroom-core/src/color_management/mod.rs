//! Colour management — transfer functions and the shared gamma tables.

pub mod gamma;
pub mod transfer;

pub use gamma::GammaTables;
