//! Film simulation through 3D colour lookup tables.

pub mod apply;
pub mod clut;
pub mod discover;
pub mod knobs;
pub mod store;

pub use apply::apply_film_simulation;
pub use clut::{Clut, ClutFormat, ClutParamDescriptor};
pub use discover::{ClutEntry, clut_display_name, discover_cluts, resolve_clut_path};
pub use store::{CacheStats, ClutState, ClutStore, ParamDescriptors};
