//! Native .nmap binary format for map persistence.
//!
//! Single self-describing file embedding both rasters and all metadata:
//! - Header (40 bytes):
//!   - Magic: "NAKSH" (5 bytes)
//!   - Version: u8 (1 byte)
//!   - Width: u32 (4 bytes, little-endian)
//!   - Height: u32 (4 bytes, little-endian)
//!   - Resolution: f32 (4 bytes, little-endian)
//!   - Origin X: f32 (4 bytes, little-endian)
//!   - Origin Y: f32 (4 bytes, little-endian)
//!   - Origin theta: f32 (4 bytes, little-endian)
//!   - Occupied threshold: f32 (4 bytes, little-endian)
//!   - Free threshold: f32 (4 bytes, little-endian)
//!   - Reserved: 2 bytes
//! - Name: u16 length (little-endian) + UTF-8 bytes
//! - Occupancy raster: width * height bytes, row-major
//! - Flag raster: width * height bytes, row-major
//!
//! Loads are atomic: decoding builds a fresh [`GridMap`] and fails
//! without producing one on any short read or malformed field.

use crate::core::Raster;
use crate::error::{Error, Result};
use crate::grid::{GridMap, MapOrigin};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Magic bytes for the .nmap format
const MAGIC: &[u8; 5] = b"NAKSH";

/// Current format version
const VERSION: u8 = 1;

/// Header size in bytes
const HEADER_SIZE: usize = 40;

/// Required file extension
const EXTENSION: &str = "nmap";

/// Upper bound on cells accepted from a document header
const MAX_CELLS: u64 = 64_000_000;

/// Upper bound on the encoded name length
const MAX_NAME_LEN: usize = 1024;

/// Save a map to a .nmap file. The path must carry the `.nmap`
/// extension; the write fails if the target is not writable.
pub fn save_native(map: &GridMap, path: &Path) -> Result<()> {
    check_extension(path)?;
    let file = std::fs::File::create(path)?;
    let mut writer = BufWriter::new(file);
    write_native(map, &mut writer)?;
    writer.flush()?;
    log::debug!(
        "saved map '{}' ({}x{}) to {}",
        map.name(),
        map.width(),
        map.height(),
        path.display()
    );
    Ok(())
}

/// Load a map from a .nmap file.
pub fn load_native(path: &Path) -> Result<GridMap> {
    check_extension(path)?;
    let file = std::fs::File::open(path)?;
    let mut reader = BufReader::new(file);
    let map = read_native(&mut reader)?;
    log::debug!(
        "loaded map '{}' ({}x{}) from {}",
        map.name(),
        map.width(),
        map.height(),
        path.display()
    );
    Ok(map)
}

/// Write a map to a writer in .nmap format
pub fn write_native<W: Write>(map: &GridMap, writer: &mut W) -> Result<()> {
    let mut header = [0u8; HEADER_SIZE];

    header[0..5].copy_from_slice(MAGIC);
    header[5] = VERSION;
    header[6..10].copy_from_slice(&(map.width() as u32).to_le_bytes());
    header[10..14].copy_from_slice(&(map.height() as u32).to_le_bytes());
    header[14..18].copy_from_slice(&map.resolution().to_le_bytes());

    let origin = map.origin();
    header[18..22].copy_from_slice(&origin.x.to_le_bytes());
    header[22..26].copy_from_slice(&origin.y.to_le_bytes());
    header[26..30].copy_from_slice(&origin.theta.to_le_bytes());
    header[30..34].copy_from_slice(&map.occupied_thresh().to_le_bytes());
    header[34..38].copy_from_slice(&map.free_thresh().to_le_bytes());
    // Remaining 2 bytes reserved, already zero.

    writer.write_all(&header)?;

    let name = map.name().as_bytes();
    if name.len() > MAX_NAME_LEN {
        return Err(Error::InvalidParameter(format!(
            "map name too long: {} bytes",
            name.len()
        )));
    }
    writer.write_all(&(name.len() as u16).to_le_bytes())?;
    writer.write_all(name)?;

    writer.write_all(map.occupancy_data())?;
    writer.write_all(map.flags_data())?;

    Ok(())
}

/// Read a map from a reader in .nmap format
pub fn read_native<R: Read>(reader: &mut R) -> Result<GridMap> {
    let mut header = [0u8; HEADER_SIZE];
    reader.read_exact(&mut header)?;

    if &header[0..5] != MAGIC {
        return Err(Error::InvalidFormat("invalid magic bytes".to_string()));
    }
    let version = header[5];
    if version != VERSION {
        return Err(Error::VersionMismatch {
            expected: VERSION,
            found: version,
        });
    }

    let width = u32_at(&header, 6) as usize;
    let height = u32_at(&header, 10) as usize;
    if width == 0 || height == 0 || (width as u64) * (height as u64) > MAX_CELLS {
        return Err(Error::InvalidFormat(format!(
            "implausible map dimensions {}x{}",
            width, height
        )));
    }

    let resolution = f32_at(&header, 14);
    let origin = MapOrigin::new(f32_at(&header, 18), f32_at(&header, 22), f32_at(&header, 26));
    let occupied_thresh = f32_at(&header, 30);
    let free_thresh = f32_at(&header, 34);

    let mut name_len = [0u8; 2];
    reader.read_exact(&mut name_len)?;
    let name_len = u16::from_le_bytes(name_len) as usize;
    if name_len == 0 || name_len > MAX_NAME_LEN {
        return Err(Error::InvalidFormat(format!(
            "implausible name length {}",
            name_len
        )));
    }
    let mut name = vec![0u8; name_len];
    reader.read_exact(&mut name)?;
    let name = String::from_utf8(name)
        .map_err(|_| Error::InvalidFormat("map name is not valid UTF-8".to_string()))?;

    let cells = width * height;
    let mut occupancy = vec![0u8; cells];
    reader.read_exact(&mut occupancy)?;
    let mut flags = vec![0u8; cells];
    reader.read_exact(&mut flags)?;

    let occupancy = Raster::from_raw(width, height, occupancy)
        .ok_or_else(|| Error::InvalidFormat("occupancy raster size mismatch".to_string()))?;
    let flags = Raster::from_raw(width, height, flags)
        .ok_or_else(|| Error::InvalidFormat("flag raster size mismatch".to_string()))?;

    GridMap::from_parts(
        name,
        occupancy,
        flags,
        resolution,
        origin,
        occupied_thresh,
        free_thresh,
    )
}

#[inline]
fn u32_at(buf: &[u8], i: usize) -> u32 {
    u32::from_le_bytes([buf[i], buf[i + 1], buf[i + 2], buf[i + 3]])
}

#[inline]
fn f32_at(buf: &[u8], i: usize) -> f32 {
    f32::from_le_bytes([buf[i], buf[i + 1], buf[i + 2], buf[i + 3]])
}

fn check_extension(path: &Path) -> Result<()> {
    match path.extension() {
        Some(ext) if ext == EXTENSION => Ok(()),
        _ => Err(Error::InvalidParameter(format!(
            "map file must have the .{} extension: {}",
            EXTENSION,
            path.display()
        ))),
    }
}
