//! Occupancy-grid map aggregate and algorithms.
//!
//! - [`GridMap`]: dual-raster map storage with geometry metadata and
//!   grid/world coordinate conversion
//! - [`classify`]: pixel and threshold classification conventions
//! - obstacle enlargement (`GridMap::enlarge_obstacles`)

pub mod classify;
mod enlarge;
mod map;

pub use map::{FlagCounts, GridMap, MapOrigin};
