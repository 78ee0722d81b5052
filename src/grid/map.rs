//! The occupancy-grid map aggregate.
//!
//! [`GridMap`] owns two rasters of identical size: an occupancy layer
//! (probability 0-100 per cell, 255 = never observed) and a flag layer
//! (encoded [`MapFlag`] per cell), plus the geometry metadata that ties
//! the raster to the world: resolution, origin pose and classification
//! thresholds. All mutators preserve the equal-size invariant; per-cell
//! access is bounds-checked.
//!
//! ## Coordinate frames
//!
//! Raster rows grow downward while the world frame's y grows upward, so
//! the grid/world transform flips the vertical axis: the bottom-left
//! raster cell `(0, height-1)` sits at the world origin when the map
//! origin pose is identity. On top of the flip the transform applies the
//! origin rotation (`theta`, radians) and translation (`x`, `y`, meters).

use crate::core::{
    effective_state, CellState, GridCoord, MapFlag, Raster, Rgb, WorldPoint, UNKNOWN_OCCUPANCY,
};
use crate::error::{Error, Result};
use crate::grid::classify::{flag_to_pixel, pixel_to_flag};
use serde::{Deserialize, Serialize};

/// Pose of the map's world frame relative to the raster's bottom-left
/// corner, pointing outward from the map.
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct MapOrigin {
    /// X translation in meters
    pub x: f32,
    /// Y translation in meters
    pub y: f32,
    /// Rotation in radians
    pub theta: f32,
}

impl MapOrigin {
    /// Create an origin pose
    #[inline]
    pub fn new(x: f32, y: f32, theta: f32) -> Self {
        Self { x, y, theta }
    }
}

/// 2D occupancy-grid map: dual rasters plus geometry metadata.
#[derive(Clone, Debug)]
pub struct GridMap {
    /// Occupancy probabilities, 0-100, 255 = never observed
    occupancy: Raster<u8>,
    /// Encoded `MapFlag` per cell, always the same size as `occupancy`
    flags: Raster<u8>,
    /// Meters per cell edge, always > 0
    resolution: f32,
    /// Occupancy fraction at or above which a cell counts as occupied
    occupied_thresh: f32,
    /// Occupancy fraction at or below which a cell counts as free
    free_thresh: f32,
    /// Pose of the world frame
    origin: MapOrigin,
    /// Non-empty map identifier
    name: String,
    /// Cumulative obstacle enlargement radius in meters
    enlargement_radius: f32,
}

impl GridMap {
    /// Default resolution: 5cm cells
    pub const DEFAULT_RESOLUTION: f32 = 0.05;
    /// Default occupied threshold (map_server convention)
    pub const DEFAULT_OCCUPIED_THRESH: f32 = 0.80;
    /// Default free threshold (map_server convention)
    pub const DEFAULT_FREE_THRESH: f32 = 0.196;

    /// Create an empty 0x0 map. Fails if `name` is empty.
    pub fn new(name: &str) -> Result<Self> {
        if name.is_empty() {
            return Err(Error::InvalidParameter("map name must not be empty".into()));
        }
        Ok(Self {
            occupancy: Raster::empty(),
            flags: Raster::empty(),
            resolution: Self::DEFAULT_RESOLUTION,
            occupied_thresh: Self::DEFAULT_OCCUPIED_THRESH,
            free_thresh: Self::DEFAULT_FREE_THRESH,
            origin: MapOrigin::default(),
            name: name.to_string(),
            enlargement_radius: 0.0,
        })
    }

    /// Create a sized map with every cell free.
    pub fn with_size(name: &str, width: usize, height: usize, resolution: f32) -> Result<Self> {
        let mut map = Self::new(name)?;
        map.set_resolution(resolution)?;
        map.set_size_in_cells(width, height)?;
        Ok(map)
    }

    /// Assemble a map from decoded parts, enforcing every invariant.
    ///
    /// Codecs use this as their single construction path: occupancy
    /// values outside the 0-100 domain (other than the 255 sentinel) are
    /// clamped and out-of-range flag bytes become `Unknown`, so a
    /// hand-edited or foreign file can never produce an invalid map.
    pub(crate) fn from_parts(
        name: String,
        mut occupancy: Raster<u8>,
        mut flags: Raster<u8>,
        resolution: f32,
        origin: MapOrigin,
        occupied_thresh: f32,
        free_thresh: f32,
    ) -> Result<Self> {
        if name.is_empty() {
            return Err(Error::InvalidParameter("map name must not be empty".into()));
        }
        if occupancy.width() != flags.width() || occupancy.height() != flags.height() {
            return Err(Error::DimensionMismatch {
                expected: (occupancy.width(), occupancy.height()),
                found: (flags.width(), flags.height()),
            });
        }
        validate_resolution(resolution)?;
        validate_thresholds(occupied_thresh, free_thresh)?;

        let mut clamped = 0usize;
        for v in occupancy.data_mut() {
            if *v > 100 && *v != UNKNOWN_OCCUPANCY {
                *v = 100;
                clamped += 1;
            }
        }
        let mut unknown_flags = 0usize;
        for f in flags.data_mut() {
            if *f > MapFlag::Unknown as u8 {
                *f = MapFlag::Unknown as u8;
                unknown_flags += 1;
            }
        }
        if clamped > 0 || unknown_flags > 0 {
            log::warn!(
                "map '{}': normalized {} occupancy values and {} flag bytes",
                name,
                clamped,
                unknown_flags
            );
        }

        Ok(Self {
            occupancy,
            flags,
            resolution,
            occupied_thresh,
            free_thresh,
            origin,
            name,
            enlargement_radius: 0.0,
        })
    }

    // === Sizing ===

    /// Reallocate both rasters to `width` x `height` cells.
    ///
    /// Every cell resets to free with occupancy 0 and any accumulated
    /// enlargement is forgotten. Fails on a zero dimension, leaving the
    /// map unchanged.
    pub fn set_size_in_cells(&mut self, width: usize, height: usize) -> Result<()> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidParameter(format!(
                "map size must be non-zero, got {}x{}",
                width, height
            )));
        }
        self.occupancy = Raster::new(width, height, 0);
        self.flags = Raster::new(width, height, MapFlag::Free as u8);
        self.enlargement_radius = 0.0;
        Ok(())
    }

    /// Reallocate both rasters to cover `x` x `y` meters at the current
    /// resolution (dimensions rounded to the nearest cell).
    pub fn set_size_in_meters(&mut self, x: f32, y: f32) -> Result<()> {
        if !(x > 0.0) || !(y > 0.0) {
            return Err(Error::InvalidParameter(format!(
                "map size must be positive, got {}x{} m",
                x, y
            )));
        }
        let width = (x / self.resolution).round() as usize;
        let height = (y / self.resolution).round() as usize;
        self.set_size_in_cells(width, height)
    }

    /// Reset every cell to free with occupancy 0, forgetting any
    /// accumulated enlargement. Geometry metadata is untouched.
    pub fn clear(&mut self) {
        self.occupancy.fill(0);
        self.flags.fill(MapFlag::Free as u8);
        self.enlargement_radius = 0.0;
    }

    // === Per-cell access ===

    /// Occupancy probability of a cell in [0, 100], or `-1.0` if the
    /// cell was never observed. `None` if out of bounds.
    #[inline]
    pub fn occupancy(&self, cell: GridCoord) -> Option<f32> {
        self.occupancy.get(cell).map(|raw| {
            if raw == UNKNOWN_OCCUPANCY {
                -1.0
            } else {
                raw as f32
            }
        })
    }

    /// Set a cell's occupancy probability.
    ///
    /// Values are clamped to [0, 100]; a negative value marks the cell
    /// as never observed. Returns false (no mutation) if out of bounds.
    #[inline]
    pub fn set_occupancy(&mut self, cell: GridCoord, value: f32) -> bool {
        if !self.occupancy.contains(cell) {
            return false;
        }
        let raw = if value < 0.0 {
            UNKNOWN_OCCUPANCY
        } else {
            value.clamp(0.0, 100.0).round() as u8
        };
        self.occupancy.set(cell, raw)
    }

    /// Semantic flag of a cell, or `None` if out of bounds.
    #[inline]
    pub fn flag(&self, cell: GridCoord) -> Option<MapFlag> {
        self.flags.get(cell).map(MapFlag::from_u8)
    }

    /// Set a cell's semantic flag. Returns false if out of bounds.
    #[inline]
    pub fn set_flag(&mut self, cell: GridCoord, flag: MapFlag) -> bool {
        self.flags.set(cell, flag as u8)
    }

    /// Effective classification of a cell (flag reconciled with
    /// occupancy), or `None` if out of bounds.
    #[inline]
    pub fn state(&self, cell: GridCoord) -> Option<CellState> {
        let flag = self.flag(cell)?;
        let raw = self.occupancy.get(cell)?;
        Some(effective_state(
            raw,
            flag,
            self.occupied_thresh,
            self.free_thresh,
        ))
    }

    /// Is the cell traversable? False for out-of-bounds cells.
    #[inline]
    pub fn is_free(&self, cell: GridCoord) -> bool {
        self.state(cell) == Some(CellState::Free)
    }

    /// Is the cell occupied, unknown or otherwise not traversable?
    /// The exact negation of [`is_free`](Self::is_free) for valid cells;
    /// false for out-of-bounds cells.
    #[inline]
    pub fn is_not_free(&self, cell: GridCoord) -> bool {
        matches!(
            self.state(cell),
            Some(CellState::Occupied) | Some(CellState::Unknown)
        )
    }

    /// Does the cell contain a wall? False for out-of-bounds cells.
    #[inline]
    pub fn is_wall(&self, cell: GridCoord) -> bool {
        self.flag(cell) == Some(MapFlag::Wall)
    }

    /// Is the cell inside a keep-out zone? False for out-of-bounds cells.
    #[inline]
    pub fn is_keep_out(&self, cell: GridCoord) -> bool {
        self.flag(cell) == Some(MapFlag::KeepOut)
    }

    // === Bulk raster exchange ===

    /// Replace the flag layer from a visualization image, decoding each
    /// pixel through the classifier.
    ///
    /// An empty map adopts the image's dimensions (occupancy resets to
    /// 0); a sized map requires matching dimensions and keeps its
    /// occupancy layer.
    pub fn set_map_image(&mut self, image: &Raster<Rgb>) -> Result<()> {
        self.check_bulk_dimensions(image.width(), image.height())?;
        for (i, &pixel) in image.data().iter().enumerate() {
            self.flags.data_mut()[i] = pixel_to_flag(pixel) as u8;
        }
        Ok(())
    }

    /// Render the flag layer as a visualization image.
    pub fn map_image(&self) -> Raster<Rgb> {
        let mut image = Raster::new(self.width(), self.height(), Rgb::default());
        for (i, &raw) in self.flags.data().iter().enumerate() {
            image.data_mut()[i] = flag_to_pixel(MapFlag::from_u8(raw));
        }
        image
    }

    /// Replace the occupancy layer from a raw raster.
    ///
    /// Same dimension rule as [`set_map_image`](Self::set_map_image).
    /// Values above 100 (other than the never-observed sentinel 255) are
    /// clamped.
    pub fn set_occupancy_grid(&mut self, grid: &Raster<u8>) -> Result<()> {
        self.check_bulk_dimensions(grid.width(), grid.height())?;
        for (i, &v) in grid.data().iter().enumerate() {
            self.occupancy.data_mut()[i] = if v > 100 && v != UNKNOWN_OCCUPANCY {
                100
            } else {
                v
            };
        }
        Ok(())
    }

    /// Copy of the raw occupancy layer.
    pub fn occupancy_grid(&self) -> Raster<u8> {
        self.occupancy.clone()
    }

    /// Shared dimension rule for bulk assignments: an empty map adopts
    /// the incoming size, a sized map requires an exact match.
    fn check_bulk_dimensions(&mut self, width: usize, height: usize) -> Result<()> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidParameter(
                "bulk raster must be non-empty".into(),
            ));
        }
        if self.occupancy.is_empty() {
            self.set_size_in_cells(width, height)
        } else if self.width() != width || self.height() != height {
            Err(Error::DimensionMismatch {
                expected: (self.width(), self.height()),
                found: (width, height),
            })
        } else {
            Ok(())
        }
    }

    // === Geometry metadata ===

    /// Map width in cells
    #[inline]
    pub fn width(&self) -> usize {
        self.occupancy.width()
    }

    /// Map height in cells
    #[inline]
    pub fn height(&self) -> usize {
        self.occupancy.height()
    }

    /// Map size in cells as (width, height)
    #[inline]
    pub fn size_in_cells(&self) -> (usize, usize) {
        (self.width(), self.height())
    }

    /// Map size in meters as (x, y) at the current resolution
    #[inline]
    pub fn size_in_meters(&self) -> (f32, f32) {
        (
            self.width() as f32 * self.resolution,
            self.height() as f32 * self.resolution,
        )
    }

    /// Meters per cell edge
    #[inline]
    pub fn resolution(&self) -> f32 {
        self.resolution
    }

    /// Set the resolution. Rejects non-positive or non-finite values,
    /// leaving the previous resolution in place.
    pub fn set_resolution(&mut self, resolution: f32) -> Result<()> {
        validate_resolution(resolution)?;
        self.resolution = resolution;
        Ok(())
    }

    /// Origin pose of the world frame
    #[inline]
    pub fn origin(&self) -> MapOrigin {
        self.origin
    }

    /// Set the origin pose. Rejects non-finite components.
    pub fn set_origin(&mut self, origin: MapOrigin) -> Result<()> {
        if !origin.x.is_finite() || !origin.y.is_finite() || !origin.theta.is_finite() {
            return Err(Error::InvalidParameter(
                "origin components must be finite".into(),
            ));
        }
        self.origin = origin;
        Ok(())
    }

    /// Occupied classification threshold (fraction in [0, 1])
    #[inline]
    pub fn occupied_thresh(&self) -> f32 {
        self.occupied_thresh
    }

    /// Free classification threshold (fraction in [0, 1])
    #[inline]
    pub fn free_thresh(&self) -> f32 {
        self.free_thresh
    }

    /// Set both classification thresholds. Each must lie in [0, 1] and
    /// the free threshold must not exceed the occupied one.
    pub fn set_thresholds(&mut self, occupied: f32, free: f32) -> Result<()> {
        validate_thresholds(occupied, free)?;
        self.occupied_thresh = occupied;
        self.free_thresh = free;
        Ok(())
    }

    /// Map name
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename the map. An empty name is rejected and the previous name
    /// kept.
    pub fn set_name(&mut self, name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(Error::InvalidParameter("map name must not be empty".into()));
        }
        self.name = name.to_string();
        Ok(())
    }

    // === Grid/world transform ===

    /// Convert a cell to world coordinates.
    ///
    /// Flips the vertical axis (bottom-left cell maps to the frame
    /// origin under an identity pose), scales by the resolution, rotates
    /// by `origin.theta` and translates by `(origin.x, origin.y)`.
    #[inline]
    pub fn cell_to_world(&self, cell: GridCoord) -> WorldPoint {
        let gx = cell.x as f32 * self.resolution;
        let gy = (self.height() as i32 - 1 - cell.y) as f32 * self.resolution;
        let (sin, cos) = self.origin.theta.sin_cos();
        WorldPoint::new(
            gx * cos - gy * sin + self.origin.x,
            gx * sin + gy * cos + self.origin.y,
        )
    }

    /// Convert a world point to the nearest cell (exact inverse of
    /// [`cell_to_world`](Self::cell_to_world) up to rounding).
    #[inline]
    pub fn world_to_cell(&self, point: WorldPoint) -> GridCoord {
        let dx = point.x - self.origin.x;
        let dy = point.y - self.origin.y;
        let (sin, cos) = self.origin.theta.sin_cos();
        let gx = dx * cos + dy * sin;
        let gy = -dx * sin + dy * cos;
        GridCoord::new(
            (gx / self.resolution).round() as i32,
            self.height() as i32 - 1 - (gy / self.resolution).round() as i32,
        )
    }

    /// Is the cell inside the map?
    #[inline]
    pub fn is_inside(&self, cell: GridCoord) -> bool {
        self.occupancy.contains(cell)
    }

    /// Does the world point fall inside the map?
    #[inline]
    pub fn is_inside_world(&self, point: WorldPoint) -> bool {
        self.is_inside(self.world_to_cell(point))
    }

    // === Comparison and diagnostics ===

    /// Cell-for-cell equality of both rasters plus equality of
    /// resolution, origin, thresholds and name.
    pub fn is_identical_to(&self, other: &GridMap) -> bool {
        self.occupancy == other.occupancy
            && self.flags == other.flags
            && self.resolution == other.resolution
            && self.origin == other.origin
            && self.occupied_thresh == other.occupied_thresh
            && self.free_thresh == other.free_thresh
            && self.name == other.name
    }

    /// Count cells by flag.
    pub fn count_flags(&self) -> FlagCounts {
        let mut counts = FlagCounts::default();
        for &raw in self.flags.data() {
            match MapFlag::from_u8(raw) {
                MapFlag::Free => counts.free += 1,
                MapFlag::KeepOut => counts.keep_out += 1,
                MapFlag::TemporaryObstacle => counts.temporary += 1,
                MapFlag::EnlargedObstacle => counts.enlarged += 1,
                MapFlag::Wall => counts.wall += 1,
                MapFlag::Unknown => counts.unknown += 1,
            }
        }
        counts
    }

    /// Cumulative obstacle enlargement radius in meters.
    #[inline]
    pub fn enlargement_radius(&self) -> f32 {
        self.enlargement_radius
    }

    // Raw layer access for codecs and the enlargement pass.

    /// Raw occupancy bytes, row-major
    #[inline]
    pub fn occupancy_data(&self) -> &[u8] {
        self.occupancy.data()
    }

    /// Raw flag bytes, row-major
    #[inline]
    pub fn flags_data(&self) -> &[u8] {
        self.flags.data()
    }

    /// Raw occupancy byte of a cell (255 = never observed)
    #[inline]
    pub(crate) fn occupancy_raw(&self, cell: GridCoord) -> Option<u8> {
        self.occupancy.get(cell)
    }

    #[inline]
    pub(crate) fn flags_data_mut(&mut self) -> &mut [u8] {
        self.flags.data_mut()
    }

    #[inline]
    pub(crate) fn set_enlargement_radius(&mut self, radius: f32) {
        self.enlargement_radius = radius;
    }
}

/// Cell counts by flag
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FlagCounts {
    /// Free cells
    pub free: usize,
    /// Keep-out cells
    pub keep_out: usize,
    /// Temporary obstacle cells
    pub temporary: usize,
    /// Enlarged obstacle cells
    pub enlarged: usize,
    /// Wall cells
    pub wall: usize,
    /// Unknown cells
    pub unknown: usize,
}

impl FlagCounts {
    /// Total number of cells
    pub fn total(&self) -> usize {
        self.free + self.keep_out + self.temporary + self.enlarged + self.wall + self.unknown
    }
}

fn validate_resolution(resolution: f32) -> Result<()> {
    if !resolution.is_finite() || resolution <= 0.0 {
        return Err(Error::InvalidParameter(format!(
            "resolution must be positive, got {}",
            resolution
        )));
    }
    Ok(())
}

fn validate_thresholds(occupied: f32, free: f32) -> Result<()> {
    let in_range = |v: f32| v.is_finite() && (0.0..=1.0).contains(&v);
    if !in_range(occupied) || !in_range(free) || free > occupied {
        return Err(Error::InvalidParameter(format!(
            "invalid thresholds: occupied={}, free={}",
            occupied, free
        )));
    }
    Ok(())
}
