//! End-to-end persistence and transport tests: on-disk round-trips for
//! both file formats, the combined load strategy, wire transport and
//! the obstacle-enlargement contract.

use naksha_map::core::GridCoord;
use naksha_map::io::{load_native, load_native_with_sidecar, load_ros, save_native, save_ros};
use naksha_map::{Error, GridMap, MapFlag, MapOrigin};
use std::io::Cursor;

fn furnished_map() -> GridMap {
    let mut map = GridMap::with_size("office", 20, 15, 0.05).unwrap();
    map.set_origin(MapOrigin::new(-0.5, 0.25, 0.1)).unwrap();
    map.set_thresholds(0.75, 0.2).unwrap();
    for x in 0..20 {
        map.set_flag(GridCoord::new(x, 0), MapFlag::Wall);
        map.set_occupancy(GridCoord::new(x, 0), 100.0);
    }
    map.set_flag(GridCoord::new(10, 7), MapFlag::KeepOut);
    map.set_flag(GridCoord::new(5, 5), MapFlag::TemporaryObstacle);
    map.set_occupancy(GridCoord::new(19, 14), -1.0);
    map
}

#[test]
fn native_save_load_reproduces_everything() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("office.nmap");

    let map = furnished_map();
    save_native(&map, &path).unwrap();
    let loaded = load_native(&path).unwrap();

    assert!(loaded.is_identical_to(&map));
    assert_eq!(loaded.name(), "office");
    assert_eq!(loaded.resolution(), map.resolution());
    assert_eq!(loaded.origin(), map.origin());
    assert_eq!(loaded.occupied_thresh(), map.occupied_thresh());
    assert_eq!(loaded.free_thresh(), map.free_thresh());
}

#[test]
fn native_save_load_save_is_stable() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("first.nmap");
    let second = dir.path().join("second.nmap");

    let map = furnished_map();
    save_native(&map, &first).unwrap();
    let loaded = load_native(&first).unwrap();
    save_native(&loaded, &second).unwrap();
    let reloaded = load_native(&second).unwrap();

    assert!(map.is_identical_to(&reloaded));
}

#[test]
fn failed_native_load_reports_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.nmap");
    assert!(matches!(load_native(&path), Err(Error::Io(_))));

    let garbage = dir.path().join("garbage.nmap");
    std::fs::write(&garbage, b"not a map at all").unwrap();
    assert!(load_native(&garbage).is_err());
}

#[test]
fn ros_round_trip_preserves_geometry_and_occupancy() {
    let dir = tempfile::tempdir().unwrap();
    let yaml = dir.path().join("office.yaml");

    let map = furnished_map();
    save_ros(&map, &yaml).unwrap();
    let loaded = load_ros(&yaml).unwrap();

    assert_eq!(loaded.size_in_cells(), map.size_in_cells());
    assert_eq!(loaded.resolution(), map.resolution());
    assert_eq!(loaded.origin(), map.origin());
    // The wall row survives through the intensity mapping.
    assert_eq!(loaded.flag(GridCoord::new(4, 0)), Some(MapFlag::Wall));
    assert_eq!(loaded.occupancy(GridCoord::new(4, 0)), Some(100.0));
    // Flag-only information does not: this format has no flag layer.
    assert_eq!(loaded.flag(GridCoord::new(10, 7)), Some(MapFlag::Free));
}

#[test]
fn combined_load_rejects_conflicting_geometry() {
    let dir = tempfile::tempdir().unwrap();
    let native = dir.path().join("combined.nmap");
    let sidecar = dir.path().join("combined.yaml");

    let map = furnished_map();
    save_native(&map, &native).unwrap();

    // Sidecar disagrees on resolution.
    std::fs::write(
        &sidecar,
        "image: combined.pgm\nresolution: 0.1\norigin: [-0.5, 0.25, 0.1]\n",
    )
    .unwrap();
    assert!(matches!(
        load_native_with_sidecar(&native, &sidecar),
        Err(Error::MetadataConflict(_))
    ));

    // Sidecar agrees: the combined load succeeds and matches the native map.
    std::fs::write(
        &sidecar,
        "image: combined.pgm\nresolution: 0.05\norigin: [-0.5, 0.25, 0.1]\n",
    )
    .unwrap();
    let combined = load_native_with_sidecar(&native, &sidecar).unwrap();
    assert!(combined.is_identical_to(&map));
}

#[test]
fn wire_transport_round_trip() {
    let map = furnished_map();

    let mut buffer = Vec::new();
    map.write_to(&mut buffer).unwrap();

    let mut received = GridMap::new("incoming").unwrap();
    received.read_from(&mut Cursor::new(buffer)).unwrap();
    assert!(received.is_identical_to(&map));
}

#[test]
fn wire_transport_survives_save_load_cycle() {
    // Map -> file -> map -> wire -> map stays identical throughout.
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cycle.nmap");

    let map = furnished_map();
    save_native(&map, &path).unwrap();
    let from_disk = load_native(&path).unwrap();

    let mut buffer = Vec::new();
    from_disk.write_to(&mut buffer).unwrap();
    let mut over_wire = GridMap::new("incoming").unwrap();
    over_wire.read_from(&mut Cursor::new(buffer)).unwrap();

    assert!(over_wire.is_identical_to(&map));
}

#[test]
fn enlargement_round_trip_through_persistence() {
    // Enlargement state is derived data: the flag layer persists, and
    // clearing it after a reload still restores the base classification.
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("grown.nmap");

    let mut map = GridMap::with_size("grown", 10, 10, 0.1).unwrap();
    map.set_flag(GridCoord::new(5, 5), MapFlag::Wall);
    map.enlarge_obstacles(0.15);
    save_native(&map, &path).unwrap();

    let mut loaded = load_native(&path).unwrap();
    assert_eq!(
        loaded.flag(GridCoord::new(3, 3)),
        Some(MapFlag::EnlargedObstacle)
    );
    loaded.enlarge_obstacles(0.0);
    assert_eq!(loaded.flag(GridCoord::new(3, 3)), Some(MapFlag::Free));
    assert_eq!(loaded.flag(GridCoord::new(5, 5)), Some(MapFlag::Wall));
}
