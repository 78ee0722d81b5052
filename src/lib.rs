//! # Naksha-Map: 2D Occupancy-Grid Map Representation
//!
//! A map representation library for mobile robots: record, query,
//! persist and exchange a 2D model of the environment. Each cell holds
//! two independent readings - an occupancy probability and a semantic
//! flag (free, keep-out, temporary obstacle, enlarged obstacle, wall,
//! unknown) - reconciled at query time.
//!
//! ## Quick Start
//!
//! ```rust
//! use naksha_map::{GridMap, MapFlag};
//! use naksha_map::core::GridCoord;
//!
//! let mut map = GridMap::with_size("apartment", 100, 100, 0.05)?;
//! map.set_flag(GridCoord::new(50, 50), MapFlag::Wall);
//!
//! // Grow obstacles by the robot radius so center-point checks are safe.
//! map.enlarge_obstacles(0.18);
//! assert!(map.is_not_free(GridCoord::new(52, 50)));
//! # Ok::<(), naksha_map::Error>(())
//! ```
//!
//! ## Coordinate Frames
//!
//! - **Cells**: integer indices from the raster's top-left corner,
//!   x rightward, y downward.
//! - **World**: meters in the map frame, y upward; the frame's pose
//!   relative to the raster's bottom-left corner is the map origin.
//!
//! [`GridMap::cell_to_world`] and [`GridMap::world_to_cell`] convert
//! between the two, applying the vertical flip, resolution scaling and
//! the origin pose.
//!
//! ## Persistence and Transport
//!
//! - Native `.nmap` files embed both rasters and all metadata in one
//!   self-describing document ([`io::native`]); round-trips are
//!   lossless.
//! - The ROS map_server interop format (YAML sidecar + greyscale
//!   raster) is supported for exchange with other tooling
//!   ([`io::ros_yaml`]); it carries no flag layer.
//! - A length-prefixed wire codec moves a full map across any byte
//!   stream ([`io::wire`], [`GridMap::write_to`],
//!   [`GridMap::read_from`]).
//!
//! All operations are synchronous; a `GridMap` is a plain value with no
//! interior locking. Share instances across threads only with external
//! synchronization.

pub mod core;
pub mod error;
pub mod grid;
pub mod io;

pub use crate::core::{CellState, GridCoord, MapFlag, Raster, Rgb, WorldPoint};
pub use error::{Error, Result};
pub use grid::{FlagCounts, GridMap, MapOrigin};
