//! Length-prefixed wire codec for transporting a full map between
//! processes.
//!
//! The codec writes to / reads from opaque byte streams (`std::io::Write`
//! / `std::io::Read`); the surrounding system supplies the actual
//! connection. Field order is fixed:
//!
//! ```text
//! width: u32 | height: u32
//! occupancy: u32 length + bytes | flags: u32 length + bytes
//! resolution: f32 | origin x, y, theta: f32 | occupied, free: f32
//! name: u32 length + UTF-8 bytes
//! ```
//!
//! All integers and floats are little-endian. Decoding validates every
//! length prefix before allocating and assembles a fresh [`GridMap`];
//! a short read or impossible prefix fails without touching the
//! receiving map.

use crate::core::Raster;
use crate::error::{Error, Result};
use crate::grid::{GridMap, MapOrigin};
use std::io::{Read, Write};

/// Upper bound on cells accepted from a wire header
const MAX_WIRE_CELLS: u64 = 64_000_000;

/// Upper bound on the encoded name length
const MAX_NAME_LEN: u32 = 1024;

/// Encode a map to a byte sink.
pub fn write_map<W: Write>(map: &GridMap, sink: &mut W) -> Result<()> {
    sink.write_all(&(map.width() as u32).to_le_bytes())?;
    sink.write_all(&(map.height() as u32).to_le_bytes())?;

    sink.write_all(&(map.occupancy_data().len() as u32).to_le_bytes())?;
    sink.write_all(map.occupancy_data())?;
    sink.write_all(&(map.flags_data().len() as u32).to_le_bytes())?;
    sink.write_all(map.flags_data())?;

    sink.write_all(&map.resolution().to_le_bytes())?;
    let origin = map.origin();
    sink.write_all(&origin.x.to_le_bytes())?;
    sink.write_all(&origin.y.to_le_bytes())?;
    sink.write_all(&origin.theta.to_le_bytes())?;
    sink.write_all(&map.occupied_thresh().to_le_bytes())?;
    sink.write_all(&map.free_thresh().to_le_bytes())?;

    let name = map.name().as_bytes();
    if name.len() as u32 > MAX_NAME_LEN {
        return Err(Error::InvalidParameter(format!(
            "map name too long: {} bytes",
            name.len()
        )));
    }
    sink.write_all(&(name.len() as u32).to_le_bytes())?;
    sink.write_all(name)?;
    Ok(())
}

/// Decode a map from a byte source.
pub fn read_map<R: Read>(source: &mut R) -> Result<GridMap> {
    let width = read_u32(source)? as usize;
    let height = read_u32(source)? as usize;
    let cells = (width as u64) * (height as u64);
    if width == 0 || height == 0 || cells > MAX_WIRE_CELLS {
        return Err(Error::InvalidFormat(format!(
            "implausible map dimensions {}x{}",
            width, height
        )));
    }

    let occupancy = read_raster(source, width, height, cells)?;
    let flags = read_raster(source, width, height, cells)?;

    let resolution = read_f32(source)?;
    let origin = MapOrigin::new(read_f32(source)?, read_f32(source)?, read_f32(source)?);
    let occupied_thresh = read_f32(source)?;
    let free_thresh = read_f32(source)?;

    let name_len = read_u32(source)?;
    if name_len == 0 || name_len > MAX_NAME_LEN {
        return Err(Error::InvalidFormat(format!(
            "implausible name length {}",
            name_len
        )));
    }
    let mut name = vec![0u8; name_len as usize];
    source.read_exact(&mut name)?;
    let name = String::from_utf8(name)
        .map_err(|_| Error::InvalidFormat("map name is not valid UTF-8".to_string()))?;

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

fn read_raster<R: Read>(
    source: &mut R,
    width: usize,
    height: usize,
    cells: u64,
) -> Result<Raster<u8>> {
    let len = read_u32(source)?;
    if len as u64 != cells {
        return Err(Error::InvalidFormat(format!(
            "raster length prefix {} does not match {}x{} cells",
            len, width, height
        )));
    }
    let mut data = vec![0u8; len as usize];
    source.read_exact(&mut data)?;
    Raster::from_raw(width, height, data)
        .ok_or_else(|| Error::InvalidFormat("raster size mismatch".to_string()))
}

fn read_u32<R: Read>(source: &mut R) -> Result<u32> {
    let mut buf = [0u8; 4];
    source.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_f32<R: Read>(source: &mut R) -> Result<f32> {
    let mut buf = [0u8; 4];
    source.read_exact(&mut buf)?;
    Ok(f32::from_le_bytes(buf))
}

impl GridMap {
    /// Encode this map onto a byte sink (wire transport).
    pub fn write_to<W: Write>(&self, sink: &mut W) -> Result<()> {
        write_map(self, sink)
    }

    /// Replace this map with one decoded from a byte source.
    ///
    /// The incoming map is fully decoded into a temporary before the
    /// swap, so a failed read leaves this map exactly as it was.
    pub fn read_from<R: Read>(&mut self, source: &mut R) -> Result<()> {
        *self = read_map(source)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{GridCoord, MapFlag};
    use std::io::Cursor;

    fn sample_map() -> GridMap {
        let mut map = GridMap::with_size("hallway", 7, 5, 0.1).unwrap();
        map.set_origin(MapOrigin::new(0.5, -0.5, 1.2)).unwrap();
        map.set_flag(GridCoord::new(2, 2), MapFlag::Wall);
        map.set_occupancy(GridCoord::new(2, 2), 88.0);
        map.set_occupancy(GridCoord::new(6, 4), -1.0);
        map
    }

    #[test]
    fn test_round_trip() {
        let map = sample_map();
        let mut buffer = Vec::new();
        map.write_to(&mut buffer).unwrap();

        let mut received = GridMap::new("placeholder").unwrap();
        received.read_from(&mut Cursor::new(buffer)).unwrap();
        assert!(received.is_identical_to(&map));
    }

    #[test]
    fn test_short_read_leaves_target_untouched() {
        let map = sample_map();
        let mut buffer = Vec::new();
        map.write_to(&mut buffer).unwrap();
        buffer.truncate(buffer.len() / 2);

        let mut received = GridMap::with_size("before", 3, 3, 0.2).unwrap();
        let pristine = received.clone();
        assert!(received.read_from(&mut Cursor::new(buffer)).is_err());
        assert!(received.is_identical_to(&pristine));
    }

    #[test]
    fn test_bad_length_prefix() {
        let map = sample_map();
        let mut buffer = Vec::new();
        map.write_to(&mut buffer).unwrap();
        // Corrupt the occupancy length prefix (bytes 8..12).
        buffer[8..12].copy_from_slice(&u32::MAX.to_le_bytes());

        assert!(matches!(
            read_map(&mut Cursor::new(buffer)),
            Err(Error::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_implausible_dimensions_rejected_before_allocation() {
        let mut buffer = Vec::new();
        buffer.extend(u32::MAX.to_le_bytes());
        buffer.extend(u32::MAX.to_le_bytes());

        assert!(matches!(
            read_map(&mut Cursor::new(buffer)),
            Err(Error::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_empty_stream() {
        assert!(matches!(
            read_map(&mut Cursor::new(Vec::new())),
            Err(Error::Io(_))
        ));
    }
}
