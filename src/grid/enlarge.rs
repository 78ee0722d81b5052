//! Obstacle enlargement.
//!
//! Navigation stacks compare the robot's center point against cell
//! classifications, so obstacles must be grown by at least the robot's
//! bounding radius before such point checks are collision-safe. The
//! enlargement layer is derived data: it is recomputed from scratch from
//! a single cumulative radius on every call, which makes the result
//! independent of call history (two calls of 0.1 m produce exactly the
//! same layer as one call of 0.2 m).

use crate::core::{GridCoord, MapFlag, UNKNOWN_OCCUPANCY};
use crate::grid::classify::flag_from_occupancy;
use crate::grid::map::GridMap;

impl GridMap {
    /// Grow occupied cells by `radius_m` meters.
    ///
    /// A positive radius accumulates with previously requested radii and
    /// rebuilds the `EnlargedObstacle` layer: every cell within
    /// Chebyshev distance `ceil(radius / resolution)` of an occupied
    /// cell (flag `Wall`, or occupancy at or above the occupied
    /// threshold) is marked, except cells flagged `Wall` or `KeepOut`,
    /// which are never downgraded.
    ///
    /// A non-positive radius resets the accumulated radius and clears
    /// the layer: each `EnlargedObstacle` cell reverts to the flag its
    /// own occupancy value implies. A zero-size map is a no-op.
    pub fn enlarge_obstacles(&mut self, radius_m: f32) {
        if radius_m <= 0.0 {
            self.set_enlargement_radius(0.0);
            self.clear_enlargement();
            return;
        }

        let radius = self.enlargement_radius() + radius_m;
        self.set_enlargement_radius(radius);

        // Rebuild from scratch so the layer depends only on the
        // cumulative radius, not on the sequence of calls.
        self.clear_enlargement();

        let cell_radius = (radius / self.resolution()).ceil() as i32;
        let occupied_cut = self.occupied_thresh() * 100.0;

        let width = self.width();
        let seeds: Vec<GridCoord> = self
            .flags_data()
            .iter()
            .zip(self.occupancy_data())
            .enumerate()
            .filter(|&(_, (&flag, &occ))| {
                flag == MapFlag::Wall as u8
                    || (occ != UNKNOWN_OCCUPANCY && occ as f32 >= occupied_cut)
            })
            .map(|(i, _)| GridCoord::new((i % width) as i32, (i / width) as i32))
            .collect();

        for seed in &seeds {
            for dy in -cell_radius..=cell_radius {
                for dx in -cell_radius..=cell_radius {
                    let cell = GridCoord::new(seed.x + dx, seed.y + dy);
                    let (flag, occ) = match (self.flag(cell), self.occupancy_raw(cell)) {
                        (Some(f), Some(o)) => (f, o),
                        _ => continue,
                    };
                    // Never downgrade protected flags, and leave occupied
                    // cells (seeds) untouched so the rebuild is
                    // independent of call history.
                    if flag.is_protected()
                        || (occ != UNKNOWN_OCCUPANCY && occ as f32 >= occupied_cut)
                    {
                        continue;
                    }
                    self.set_flag(cell, MapFlag::EnlargedObstacle);
                }
            }
        }
    }

    /// Revert every `EnlargedObstacle` cell to the flag implied by its
    /// occupancy value. Other flags are untouched.
    fn clear_enlargement(&mut self) {
        let occupied = self.occupied_thresh();
        let free = self.free_thresh();
        let occupancy: Vec<u8> = self.occupancy_data().to_vec();
        for (i, flag) in self.flags_data_mut().iter_mut().enumerate() {
            if *flag == MapFlag::EnlargedObstacle as u8 {
                *flag = flag_from_occupancy(occupancy[i], occupied, free) as u8;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wall_map() -> GridMap {
        // 10x10 at 0.1 m with a single wall at (5,5).
        let mut map = GridMap::with_size("enlarge", 10, 10, 0.1).unwrap();
        map.set_flag(GridCoord::new(5, 5), MapFlag::Wall);
        map
    }

    #[test]
    fn test_two_cell_chebyshev_ring() {
        let mut map = wall_map();
        // 0.15 m at 0.1 m resolution rounds up to a 2-cell radius.
        map.enlarge_obstacles(0.15);

        let wall = GridCoord::new(5, 5);
        for y in 0..10 {
            for x in 0..10 {
                let cell = GridCoord::new(x, y);
                let expected = if cell == wall {
                    MapFlag::Wall
                } else if cell.chebyshev_distance(&wall) <= 2 {
                    MapFlag::EnlargedObstacle
                } else {
                    MapFlag::Free
                };
                assert_eq!(map.flag(cell), Some(expected), "cell {:?}", cell);
            }
        }
    }

    #[test]
    fn test_zero_radius_restores_free() {
        let mut map = wall_map();
        map.enlarge_obstacles(0.15);
        map.enlarge_obstacles(0.0);

        let wall = GridCoord::new(5, 5);
        for y in 0..10 {
            for x in 0..10 {
                let cell = GridCoord::new(x, y);
                let expected = if cell == wall {
                    MapFlag::Wall
                } else {
                    MapFlag::Free
                };
                assert_eq!(map.flag(cell), Some(expected), "cell {:?}", cell);
            }
        }
        assert_eq!(map.enlargement_radius(), 0.0);
    }

    #[test]
    fn test_radius_accumulates() {
        let mut split = wall_map();
        split.enlarge_obstacles(0.1);
        split.enlarge_obstacles(0.1);

        let mut single = wall_map();
        single.enlarge_obstacles(0.2);

        assert!(split.is_identical_to(&single));
        assert!((split.enlargement_radius() - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_repeated_calls_never_shrink() {
        let mut map = wall_map();
        map.enlarge_obstacles(0.2);
        let enlarged_before = map.count_flags().enlarged;
        map.enlarge_obstacles(0.1);
        assert!(map.count_flags().enlarged >= enlarged_before);
    }

    #[test]
    fn test_protected_flags_survive() {
        let mut map = wall_map();
        map.set_flag(GridCoord::new(5, 6), MapFlag::KeepOut);
        map.set_flag(GridCoord::new(5, 4), MapFlag::TemporaryObstacle);
        map.enlarge_obstacles(0.15);

        // KeepOut and Wall are never downgraded, temporary obstacles are.
        assert_eq!(map.flag(GridCoord::new(5, 6)), Some(MapFlag::KeepOut));
        assert_eq!(map.flag(GridCoord::new(5, 5)), Some(MapFlag::Wall));
        assert_eq!(
            map.flag(GridCoord::new(5, 4)),
            Some(MapFlag::EnlargedObstacle)
        );

        map.enlarge_obstacles(-1.0);
        assert_eq!(map.flag(GridCoord::new(5, 6)), Some(MapFlag::KeepOut));
        assert_eq!(map.flag(GridCoord::new(5, 5)), Some(MapFlag::Wall));
        // The temporary obstacle was overwritten by the enlargement and
        // reverts to what its occupancy (0) implies.
        assert_eq!(map.flag(GridCoord::new(5, 4)), Some(MapFlag::Free));
    }

    #[test]
    fn test_occupancy_seeds_enlargement() {
        let mut map = GridMap::with_size("occ", 10, 10, 0.1).unwrap();
        // No wall flag, but occupancy above the occupied threshold.
        map.set_occupancy(GridCoord::new(3, 3), 95.0);
        map.enlarge_obstacles(0.1);
        assert_eq!(
            map.flag(GridCoord::new(4, 3)),
            Some(MapFlag::EnlargedObstacle)
        );
        // The seed keeps its own flag; its occupancy already marks it occupied.
        assert_eq!(map.flag(GridCoord::new(3, 3)), Some(MapFlag::Free));
        // Unobserved cells must not act as seeds.
        let mut unknown = GridMap::with_size("unk", 10, 10, 0.1).unwrap();
        unknown.set_occupancy(GridCoord::new(3, 3), -1.0);
        unknown.enlarge_obstacles(0.1);
        assert_eq!(unknown.count_flags().enlarged, 0);
    }

    #[test]
    fn test_zero_size_map_is_noop() {
        let mut map = GridMap::new("empty").unwrap();
        map.enlarge_obstacles(0.5);
        map.enlarge_obstacles(0.0);
        assert_eq!(map.size_in_cells(), (0, 0));
    }
}
