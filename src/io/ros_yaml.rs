//! ROS map_server interop format (YAML sidecar + greyscale raster).
//!
//! The sidecar names a greyscale image (conventionally PGM) and carries
//! the geometry: resolution, origin and classification thresholds.
//! Occupancy is derived from pixel intensity (darker = more occupied,
//! inverted when `negate` is set) and the flag layer purely from
//! thresholding - this format has no native flag data, so round-trips
//! through it are lossy by design.
//!
//! Three load strategies are provided, mirroring which inputs exist on
//! disk: sidecar only ([`load_ros`]), native only
//! ([`load_native`](super::native::load_native)), or both
//! ([`load_native_with_sidecar`]), where conflicting shared fields are
//! rejected rather than silently resolved.

use crate::core::{Raster, UNKNOWN_OCCUPANCY};
use crate::error::{Error, Result};
use crate::grid::classify::flag_from_occupancy;
use crate::grid::{GridMap, MapOrigin};
use crate::io::native::load_native;
use image::GrayImage;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Greyscale value written for never-observed cells (map_server's
/// unknown grey)
const UNKNOWN_PIXEL: u8 = 205;

/// Tolerance when comparing shared fields of combined-load sources
const FIELD_EPS: f32 = 1e-6;

/// Map metadata sidecar (ROS map_server convention)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapMetadata {
    /// Raster image filename, relative to the sidecar
    pub image: String,

    /// Map resolution in meters per pixel
    pub resolution: f32,

    /// Origin of the map frame [x, y, theta] at the bottom-left pixel
    pub origin: [f32; 3],

    /// Occupancy fraction at or above which a pixel counts as occupied
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occupied_thresh: Option<f32>,

    /// Occupancy fraction at or below which a pixel counts as free
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub free_thresh: Option<f32>,

    /// Non-zero inverts the intensity mapping (white = occupied)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub negate: Option<i32>,
}

/// Load a map from a YAML sidecar plus the greyscale raster it names.
///
/// The map takes its name from the sidecar's file stem. The load is
/// atomic: any parse or I/O failure yields an error and no map.
pub fn load_ros(yaml_path: &Path) -> Result<GridMap> {
    let (meta, dir) = read_metadata(yaml_path)?;

    let image_path = dir.join(&meta.image);
    let img = image::open(&image_path)
        .map_err(|e| Error::Image(format!("{}: {}", image_path.display(), e)))?
        .into_luma8();
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return Err(Error::InvalidFormat(format!(
            "empty raster image {}",
            image_path.display()
        )));
    }

    let occupied = meta.occupied_thresh.unwrap_or(GridMap::DEFAULT_OCCUPIED_THRESH);
    let free = meta.free_thresh.unwrap_or(GridMap::DEFAULT_FREE_THRESH);
    let negate = meta.negate.unwrap_or(0) != 0;

    // Pixel rows run top-down, exactly like the raster layout.
    let mut occupancy = Vec::with_capacity((width * height) as usize);
    let mut flags = Vec::with_capacity((width * height) as usize);
    for pixel in img.pixels() {
        let lum = pixel.0[0] as f32;
        let fraction = if negate { lum / 255.0 } else { (255.0 - lum) / 255.0 };
        let raw = (fraction * 100.0).round() as u8;
        occupancy.push(raw);
        flags.push(flag_from_occupancy(raw, occupied, free) as u8);
    }

    let name = yaml_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            Error::InvalidParameter(format!("cannot derive map name from {}", yaml_path.display()))
        })?;

    let (width, height) = (width as usize, height as usize);
    let occupancy = Raster::from_raw(width, height, occupancy)
        .ok_or_else(|| Error::InvalidFormat("occupancy raster size mismatch".to_string()))?;
    let flags = Raster::from_raw(width, height, flags)
        .ok_or_else(|| Error::InvalidFormat("flag raster size mismatch".to_string()))?;

    let map = GridMap::from_parts(
        name,
        occupancy,
        flags,
        meta.resolution,
        MapOrigin::new(meta.origin[0], meta.origin[1], meta.origin[2]),
        occupied,
        free,
    )?;
    log::debug!(
        "loaded interop map '{}' ({}x{}) from {}",
        map.name(),
        map.width(),
        map.height(),
        yaml_path.display()
    );
    Ok(map)
}

/// Save a map in the interop format: a YAML sidecar at `yaml_path` and
/// a PGM raster next to it (same stem, `.pgm` extension).
///
/// Flags are not representable in this format - only the occupancy
/// layer is written, with never-observed cells as the unknown grey.
pub fn save_ros(map: &GridMap, yaml_path: &Path) -> Result<()> {
    if map.width() == 0 || map.height() == 0 {
        return Err(Error::InvalidParameter("cannot save an empty map".into()));
    }

    let stem = yaml_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            Error::InvalidParameter(format!("invalid sidecar path {}", yaml_path.display()))
        })?;
    let image_name = format!("{}.pgm", stem);
    let dir = yaml_path.parent().unwrap_or_else(|| Path::new("."));

    let pixels: Vec<u8> = map
        .occupancy_data()
        .iter()
        .map(|&raw| {
            if raw == UNKNOWN_OCCUPANCY {
                UNKNOWN_PIXEL
            } else {
                255 - (raw as f32 * 2.55).round() as u8
            }
        })
        .collect();
    let img = GrayImage::from_raw(map.width() as u32, map.height() as u32, pixels)
        .ok_or_else(|| Error::Image("raster buffer size mismatch".to_string()))?;
    let image_path = dir.join(&image_name);
    img.save(&image_path)
        .map_err(|e| Error::Image(format!("{}: {}", image_path.display(), e)))?;

    let origin = map.origin();
    let meta = MapMetadata {
        image: image_name,
        resolution: map.resolution(),
        origin: [origin.x, origin.y, origin.theta],
        occupied_thresh: Some(map.occupied_thresh()),
        free_thresh: Some(map.free_thresh()),
        negate: Some(0),
    };
    std::fs::write(yaml_path, serde_yaml::to_string(&meta)?)?;
    log::debug!(
        "saved interop map '{}' ({}x{}) to {}",
        map.name(),
        map.width(),
        map.height(),
        yaml_path.display()
    );
    Ok(())
}

/// Combined load: rasters, name and thresholds from a native document,
/// geometry from a YAML sidecar.
///
/// When both sources carry the same field (resolution, origin,
/// thresholds) the values must agree within a small tolerance;
/// disagreement fails with [`Error::MetadataConflict`] rather than
/// silently preferring one source.
pub fn load_native_with_sidecar(native_path: &Path, yaml_path: &Path) -> Result<GridMap> {
    let mut map = load_native(native_path)?;
    let (meta, _) = read_metadata(yaml_path)?;

    if (map.resolution() - meta.resolution).abs() > FIELD_EPS {
        return Err(Error::MetadataConflict(format!(
            "resolution: native {} vs sidecar {}",
            map.resolution(),
            meta.resolution
        )));
    }
    let origin = map.origin();
    let native_origin = [origin.x, origin.y, origin.theta];
    if native_origin
        .iter()
        .zip(&meta.origin)
        .any(|(a, b)| (a - b).abs() > FIELD_EPS)
    {
        return Err(Error::MetadataConflict(format!(
            "origin: native {:?} vs sidecar {:?}",
            native_origin, meta.origin
        )));
    }
    if let Some(occupied) = meta.occupied_thresh {
        if (map.occupied_thresh() - occupied).abs() > FIELD_EPS {
            return Err(Error::MetadataConflict(format!(
                "occupied threshold: native {} vs sidecar {}",
                map.occupied_thresh(),
                occupied
            )));
        }
    }
    if let Some(free) = meta.free_thresh {
        if (map.free_thresh() - free).abs() > FIELD_EPS {
            return Err(Error::MetadataConflict(format!(
                "free threshold: native {} vs sidecar {}",
                map.free_thresh(),
                free
            )));
        }
    }

    // Agreement established; the sidecar is authoritative for geometry.
    map.set_resolution(meta.resolution)?;
    map.set_origin(MapOrigin::new(meta.origin[0], meta.origin[1], meta.origin[2]))?;
    Ok(map)
}

fn read_metadata(yaml_path: &Path) -> Result<(MapMetadata, PathBuf)> {
    let contents = std::fs::read_to_string(yaml_path)?;
    let meta: MapMetadata = serde_yaml::from_str(&contents)?;
    let dir = yaml_path.parent().unwrap_or_else(|| Path::new(".")).to_path_buf();
    Ok((meta, dir))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{GridCoord, MapFlag};

    #[test]
    fn test_metadata_optional_fields() {
        let yaml = "image: floor.pgm\nresolution: 0.05\norigin: [-1.0, -2.0, 0.0]\n";
        let meta: MapMetadata = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(meta.image, "floor.pgm");
        assert_eq!(meta.origin, [-1.0, -2.0, 0.0]);
        assert!(meta.occupied_thresh.is_none());
        assert!(meta.free_thresh.is_none());
        assert!(meta.negate.is_none());
    }

    #[test]
    fn test_load_hand_written_pgm() {
        let dir = tempfile::tempdir().unwrap();
        let yaml_path = dir.path().join("floor.yaml");
        std::fs::write(
            &yaml_path,
            "image: floor.pgm\nresolution: 0.1\norigin: [1.0, 2.0, 0.0]\n",
        )
        .unwrap();
        // 2x2 binary PGM: one black pixel (occupied), three white (free).
        let mut pgm = b"P5\n2 2\n255\n".to_vec();
        pgm.extend([0u8, 255, 255, 255]);
        std::fs::write(dir.path().join("floor.pgm"), pgm).unwrap();

        let map = load_ros(&yaml_path).unwrap();
        assert_eq!(map.name(), "floor");
        assert_eq!(map.size_in_cells(), (2, 2));
        assert_eq!(map.resolution(), 0.1);
        assert_eq!(map.origin(), MapOrigin::new(1.0, 2.0, 0.0));
        assert_eq!(map.flag(GridCoord::new(0, 0)), Some(MapFlag::Wall));
        assert_eq!(map.occupancy(GridCoord::new(0, 0)), Some(100.0));
        assert_eq!(map.flag(GridCoord::new(1, 0)), Some(MapFlag::Free));
        assert_eq!(map.occupancy(GridCoord::new(1, 1)), Some(0.0));
    }

    #[test]
    fn test_negate_inverts_intensity() {
        let dir = tempfile::tempdir().unwrap();
        let yaml_path = dir.path().join("inv.yaml");
        std::fs::write(
            &yaml_path,
            "image: inv.pgm\nresolution: 0.1\norigin: [0.0, 0.0, 0.0]\nnegate: 1\n",
        )
        .unwrap();
        let mut pgm = b"P5\n1 1\n255\n".to_vec();
        pgm.push(255);
        std::fs::write(dir.path().join("inv.pgm"), pgm).unwrap();

        let map = load_ros(&yaml_path).unwrap();
        // White is occupied when negated.
        assert_eq!(map.flag(GridCoord::new(0, 0)), Some(MapFlag::Wall));
    }

    #[test]
    fn test_save_load_round_trip_geometry() {
        let dir = tempfile::tempdir().unwrap();
        let yaml_path = dir.path().join("site.yaml");

        let mut map = GridMap::with_size("site", 6, 4, 0.05).unwrap();
        map.set_origin(MapOrigin::new(-0.5, 1.0, 0.0)).unwrap();
        map.set_occupancy(GridCoord::new(2, 1), 100.0);
        map.set_occupancy(GridCoord::new(3, 1), -1.0);

        save_ros(&map, &yaml_path).unwrap();
        let loaded = load_ros(&yaml_path).unwrap();

        assert_eq!(loaded.name(), "site");
        assert_eq!(loaded.size_in_cells(), (6, 4));
        assert_eq!(loaded.resolution(), map.resolution());
        assert_eq!(loaded.origin(), map.origin());
        assert_eq!(loaded.occupancy(GridCoord::new(2, 1)), Some(100.0));
        assert_eq!(loaded.flag(GridCoord::new(2, 1)), Some(MapFlag::Wall));
        assert_eq!(loaded.flag(GridCoord::new(0, 0)), Some(MapFlag::Free));
        // The never-observed cell comes back as the unknown grey band.
        assert_eq!(loaded.flag(GridCoord::new(3, 1)), Some(MapFlag::Unknown));
    }

    #[test]
    fn test_missing_image_fails() {
        let dir = tempfile::tempdir().unwrap();
        let yaml_path = dir.path().join("missing.yaml");
        std::fs::write(
            &yaml_path,
            "image: nowhere.pgm\nresolution: 0.1\norigin: [0.0, 0.0, 0.0]\n",
        )
        .unwrap();
        assert!(matches!(load_ros(&yaml_path), Err(Error::Image(_))));
    }
}
