//! Semantic cell flags for the occupancy map.
//!
//! Every cell carries two independent readings: a probability-like
//! occupancy value (0-100, with 255 meaning "never observed") and a
//! semantic [`MapFlag`]. The two axes are reconciled at query time by
//! [`effective_state`]: a non-free flag always wins over the
//! probability-derived classification.

use serde::{Deserialize, Serialize};

/// Occupancy raster value meaning "never observed".
pub const UNKNOWN_OCCUPANCY: u8 = 255;

/// Semantic per-cell classification.
///
/// The flag hierarchy, strongest first:
/// - `Wall` - solid structure, never removed by obstacle enlargement
/// - `KeepOut` - user-defined forbidden zone, never removed either
/// - `TemporaryObstacle` - transient obstacle reported by sensors
/// - `EnlargedObstacle` - synthetic safety margin around occupied cells
/// - `Free` - traversable
/// - `Unknown` - never classified
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum MapFlag {
    /// Traversable cell
    Free = 0,
    /// User-defined keep-out zone (robot must not enter, even if physically free)
    KeepOut = 1,
    /// Transient obstacle (e.g. a person or a moved chair)
    TemporaryObstacle = 2,
    /// Safety margin added around occupied cells by obstacle enlargement
    EnlargedObstacle = 3,
    /// Solid wall detected by mapping
    Wall = 4,
    /// Cell has never been classified
    #[default]
    Unknown = 5,
}

impl MapFlag {
    /// Decode a raw flag byte. Out-of-range values decode as `Unknown`.
    #[inline]
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => MapFlag::Free,
            1 => MapFlag::KeepOut,
            2 => MapFlag::TemporaryObstacle,
            3 => MapFlag::EnlargedObstacle,
            4 => MapFlag::Wall,
            _ => MapFlag::Unknown,
        }
    }

    /// Does this flag mark the cell as not traversable?
    #[inline]
    pub fn is_obstacle(self) -> bool {
        matches!(
            self,
            MapFlag::KeepOut
                | MapFlag::TemporaryObstacle
                | MapFlag::EnlargedObstacle
                | MapFlag::Wall
        )
    }

    /// Flags that obstacle enlargement must never overwrite or clear.
    #[inline]
    pub fn is_protected(self) -> bool {
        matches!(self, MapFlag::Wall | MapFlag::KeepOut)
    }
}

/// Effective classification of a cell once flag and occupancy are reconciled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CellState {
    /// Traversable
    Free,
    /// Blocked by a wall, obstacle or keep-out zone
    Occupied,
    /// Not enough information
    Unknown,
}

/// Reconcile an occupancy reading with a semantic flag.
///
/// A non-`Free` flag overrides the occupancy value. A `Free` flag defers
/// to the probability: at or above `occupied_thresh` the cell is
/// `Occupied`, at or below `free_thresh` it is `Free`, anything in
/// between (or the [`UNKNOWN_OCCUPANCY`] sentinel) is `Unknown`.
/// Thresholds are fractions in [0, 1] applied to the 0-100 raw domain.
#[inline]
pub fn effective_state(
    occupancy_raw: u8,
    flag: MapFlag,
    occupied_thresh: f32,
    free_thresh: f32,
) -> CellState {
    match flag {
        MapFlag::Free => {
            if occupancy_raw == UNKNOWN_OCCUPANCY {
                CellState::Unknown
            } else if occupancy_raw as f32 >= occupied_thresh * 100.0 {
                CellState::Occupied
            } else if occupancy_raw as f32 <= free_thresh * 100.0 {
                CellState::Free
            } else {
                CellState::Unknown
            }
        }
        MapFlag::Unknown => CellState::Unknown,
        _ => CellState::Occupied,
    }
}
