//! Map persistence and transport.
//!
//! - [`native`]: self-describing `.nmap` binary format (lossless)
//! - [`ros_yaml`]: YAML sidecar + greyscale raster interop format, plus
//!   the combined native+sidecar load strategy
//! - [`wire`]: length-prefixed binary codec over opaque byte streams

pub mod native;
pub mod ros_yaml;
pub mod wire;

pub use native::{load_native, read_native, save_native, write_native};
pub use ros_yaml::{load_native_with_sidecar, load_ros, save_ros, MapMetadata};
pub use wire::{read_map, write_map};
