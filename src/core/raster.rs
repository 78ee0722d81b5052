//! Owned 2D raster buffer.
//!
//! [`Raster`] is the flat, row-major cell container used for both map
//! layers (occupancy and flags) and for the RGB visualization exchange.
//! All access is bounds-checked; the raw slice accessors expose the
//! row-major layout for codecs and bulk algorithms.

use crate::core::GridCoord;

/// Owned 2D buffer of scalar cells, row-major, bounds-checked.
#[derive(Clone, Debug, PartialEq)]
pub struct Raster<T: Copy> {
    data: Vec<T>,
    width: usize,
    height: usize,
}

impl<T: Copy> Raster<T> {
    /// Create a raster of the given size with every cell set to `fill`
    pub fn new(width: usize, height: usize, fill: T) -> Self {
        Self {
            data: vec![fill; width * height],
            width,
            height,
        }
    }

    /// Create an empty 0x0 raster
    pub fn empty() -> Self {
        Self {
            data: Vec::new(),
            width: 0,
            height: 0,
        }
    }

    /// Wrap an existing row-major buffer. Fails if the buffer length
    /// does not equal `width * height`.
    pub fn from_raw(width: usize, height: usize, data: Vec<T>) -> Option<Self> {
        if data.len() != width * height {
            return None;
        }
        Some(Self {
            data,
            width,
            height,
        })
    }

    /// Raster width in cells
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Raster height in cells
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// True if the raster holds no cells
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Check if a coordinate is within bounds
    #[inline]
    pub fn contains(&self, coord: GridCoord) -> bool {
        coord.x >= 0
            && coord.y >= 0
            && (coord.x as usize) < self.width
            && (coord.y as usize) < self.height
    }

    /// Convert a coordinate to a flat index, if in bounds
    #[inline]
    pub fn index(&self, coord: GridCoord) -> Option<usize> {
        if self.contains(coord) {
            Some(coord.y as usize * self.width + coord.x as usize)
        } else {
            None
        }
    }

    /// Get the cell at `coord`, or `None` if out of bounds
    #[inline]
    pub fn get(&self, coord: GridCoord) -> Option<T> {
        self.index(coord).map(|i| self.data[i])
    }

    /// Set the cell at `coord`. Returns false (and leaves the raster
    /// unchanged) if the coordinate is out of bounds.
    #[inline]
    pub fn set(&mut self, coord: GridCoord, value: T) -> bool {
        if let Some(i) = self.index(coord) {
            self.data[i] = value;
            true
        } else {
            false
        }
    }

    /// Set every cell to `value`
    pub fn fill(&mut self, value: T) {
        self.data.fill(value);
    }

    /// Raw row-major cell slice
    #[inline]
    pub fn data(&self) -> &[T] {
        &self.data
    }

    /// Mutable raw row-major cell slice
    #[inline]
    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Iterate over all cells with their coordinates
    pub fn iter(&self) -> impl Iterator<Item = (GridCoord, T)> + '_ {
        let width = self.width;
        self.data.iter().enumerate().map(move |(i, &v)| {
            (
                GridCoord::new((i % width) as i32, (i / width) as i32),
                v,
            )
        })
    }
}

/// RGB pixel used for the visualization exchange raster.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct Rgb {
    /// Red channel
    pub r: u8,
    /// Green channel
    pub g: u8,
    /// Blue channel
    pub b: u8,
}

impl Rgb {
    /// Create a pixel from channel values
    #[inline]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}
