//! Cell classification conventions.
//!
//! All magic pixel values and threshold rules live here, so the rest of
//! the crate never touches color constants directly. Two mappings are
//! provided:
//!
//! - a fixed, total bijection between [`MapFlag`] and the RGB pixels used
//!   in the visualization exchange raster
//! - the thresholding rule that derives a flag from a raw occupancy value
//!   (used by the interop loader and when clearing enlarged obstacles)

use crate::core::{MapFlag, Rgb, UNKNOWN_OCCUPANCY};

/// Pixel for a free cell
const PIXEL_FREE: Rgb = Rgb::new(255, 255, 255);
/// Pixel for a keep-out cell
const PIXEL_KEEP_OUT: Rgb = Rgb::new(255, 0, 0);
/// Pixel for a temporary obstacle
const PIXEL_TEMPORARY: Rgb = Rgb::new(255, 255, 0);
/// Pixel for an enlarged obstacle
const PIXEL_ENLARGED: Rgb = Rgb::new(255, 128, 0);
/// Pixel for a wall
const PIXEL_WALL: Rgb = Rgb::new(0, 0, 0);
/// Pixel for an unknown cell
const PIXEL_UNKNOWN: Rgb = Rgb::new(128, 128, 128);

/// Encode a flag as its visualization pixel.
#[inline]
pub fn flag_to_pixel(flag: MapFlag) -> Rgb {
    match flag {
        MapFlag::Free => PIXEL_FREE,
        MapFlag::KeepOut => PIXEL_KEEP_OUT,
        MapFlag::TemporaryObstacle => PIXEL_TEMPORARY,
        MapFlag::EnlargedObstacle => PIXEL_ENLARGED,
        MapFlag::Wall => PIXEL_WALL,
        MapFlag::Unknown => PIXEL_UNKNOWN,
    }
}

/// Decode a visualization pixel back to a flag.
///
/// Any pixel outside the six assigned colors decodes as `Unknown`.
#[inline]
pub fn pixel_to_flag(pixel: Rgb) -> MapFlag {
    match pixel {
        PIXEL_FREE => MapFlag::Free,
        PIXEL_KEEP_OUT => MapFlag::KeepOut,
        PIXEL_TEMPORARY => MapFlag::TemporaryObstacle,
        PIXEL_ENLARGED => MapFlag::EnlargedObstacle,
        PIXEL_WALL => MapFlag::Wall,
        _ => MapFlag::Unknown,
    }
}

/// Derive a flag from a raw occupancy value alone.
///
/// At or above `occupied_thresh` the cell is a `Wall`, at or below
/// `free_thresh` it is `Free`; anything in between, or the
/// never-observed sentinel, is `Unknown`. Thresholds are fractions in
/// [0, 1] applied to the 0-100 raw domain.
#[inline]
pub fn flag_from_occupancy(occupancy_raw: u8, occupied_thresh: f32, free_thresh: f32) -> MapFlag {
    if occupancy_raw == UNKNOWN_OCCUPANCY {
        MapFlag::Unknown
    } else if occupancy_raw as f32 >= occupied_thresh * 100.0 {
        MapFlag::Wall
    } else if occupancy_raw as f32 <= free_thresh * 100.0 {
        MapFlag::Free
    } else {
        MapFlag::Unknown
    }
}
