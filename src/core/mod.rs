//! Core types for the naksha-map occupancy grid library.
//!
//! This module provides the fundamental types used throughout the library:
//! - [`MapFlag`] and [`CellState`]: semantic cell classification
//! - [`GridCoord`] and [`WorldPoint`]: coordinate types
//! - [`Raster`]: owned, bounds-checked 2D cell buffer

mod cell;
mod point;
mod raster;

pub use cell::{effective_state, CellState, MapFlag, UNKNOWN_OCCUPANCY};
pub use point::{GridCoord, WorldPoint};
pub use raster::{Raster, Rgb};
