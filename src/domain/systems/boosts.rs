// Boost power-ups: spawn placement, pickup and the active set.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::domain::state::PowerUp;
use crate::domain::track::TrackGeometry;
use crate::domain::tuning::BoostTuning;

#[derive(Debug, Clone, Copy)]
pub struct SpawnPoint {
    pub x: f32,
    pub y: f32,
    pub label: &'static str,
}

/// Candidate boost locations: just inside the bottom-left and top-right corners of the oval.
pub fn spawn_points(track: &TrackGeometry) -> [SpawnPoint; 2] {
    [
        SpawnPoint {
            x: track.left_curve_center_x - 25.0,
            y: track.bottom_straight_y - 20.0,
            label: "bottom-left",
        },
        SpawnPoint {
            x: track.right_curve_center_x + 25.0,
            y: track.top_straight_y + 20.0,
            label: "top-right",
        },
    ]
}

/// The boosts currently lying on the track.
pub struct BoostField {
    points: [SpawnPoint; 2],
    active: Vec<PowerUp>,
    next_id: u64,
    tuning: BoostTuning,
}

impl BoostField {
    pub fn new(track: &TrackGeometry, tuning: BoostTuning) -> Self {
        Self {
            points: spawn_points(track),
            active: Vec::new(),
            next_id: 1,
            tuning,
        }
    }

    pub fn active(&self) -> &[PowerUp] {
        &self.active
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Places a boost on a free location, if there are racers and any location is free.
    pub fn try_spawn<R: Rng + ?Sized>(&mut self, car_count: usize, now: u64, rng: &mut R) -> Option<&PowerUp> {
        if car_count == 0 || self.active.len() >= self.points.len() {
            return None;
        }

        let min_sq = self.tuning.min_separation * self.tuning.min_separation;
        let free: Vec<&SpawnPoint> = self
            .points
            .iter()
            .filter(|p| {
                !self.active.iter().any(|b| {
                    let dx = b.x - p.x;
                    let dy = b.y - p.y;
                    dx * dx + dy * dy < min_sq
                })
            })
            .collect();

        let point = **free.choose(rng)?;
        let id = self.next_id;
        self.next_id += 1;

        self.active.push(PowerUp {
            id,
            x: point.x,
            y: point.y,
            spawn_time: now,
            location: point.label,
        });
        self.active.last()
    }

    /// Removes and returns every boost within pickup range of `(x, y)`.
    pub fn collect_near(&mut self, x: f32, y: f32) -> Vec<PowerUp> {
        let radius = self.tuning.pickup_radius;
        let mut picked = Vec::new();
        self.active.retain(|b| {
            let dx = x - b.x;
            let dy = y - b.y;
            if (dx * dx + dy * dy).sqrt() < radius {
                picked.push(b.clone());
                false
            } else {
                true
            }
        });
        picked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn field() -> (BoostField, TrackGeometry) {
        let track = TrackGeometry::default();
        (BoostField::new(&track, BoostTuning::default()), track)
    }

    #[test]
    fn when_no_cars_then_nothing_spawns() {
        let (mut boosts, _) = field();
        let mut rng = StdRng::seed_from_u64(7);

        assert!(boosts.try_spawn(0, 1_000, &mut rng).is_none());
        assert!(boosts.is_empty());
    }

    #[test]
    fn when_both_locations_taken_then_spawn_is_noop() {
        let (mut boosts, _) = field();
        let mut rng = StdRng::seed_from_u64(7);

        let first = boosts.try_spawn(1, 1_000, &mut rng).map(|b| b.location);
        let second = boosts.try_spawn(1, 2_000, &mut rng).map(|b| b.location);

        assert!(first.is_some() && second.is_some());
        assert_ne!(first, second);
        assert!(boosts.try_spawn(1, 3_000, &mut rng).is_none());
        assert_eq!(boosts.len(), 2);
    }

    #[test]
    fn spawned_boosts_keep_minimum_separation() {
        let (mut boosts, _) = field();
        let mut rng = StdRng::seed_from_u64(42);
        for t in 0..10 {
            boosts.try_spawn(3, t, &mut rng);
        }

        let active = boosts.active();
        for (i, a) in active.iter().enumerate() {
            for b in &active[i + 1..] {
                let d = ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt();
                assert!(d >= 50.0);
            }
        }
        let ids: Vec<u64> = active.iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn spawn_points_sit_inside_the_corners() {
        let (_, track) = field();
        let [bottom_left, top_right] = spawn_points(&track);

        assert!((bottom_left.x - 260.5).abs() < 1e-3);
        assert!((bottom_left.y - 556.0).abs() < 1e-3);
        assert!((top_right.x - 1019.5).abs() < 1e-3);
        assert!((top_right.y - 164.0).abs() < 1e-3);
    }

    #[test]
    fn when_collected_then_boost_is_removed_once() {
        let (mut boosts, _) = field();
        let mut rng = StdRng::seed_from_u64(1);
        let (x, y) = {
            let b = boosts.try_spawn(1, 0, &mut rng).expect("spawned");
            (b.x, b.y)
        };

        assert_eq!(boosts.collect_near(x + 5.0, y).len(), 1);
        assert!(boosts.collect_near(x, y).is_empty());
        assert!(boosts.is_empty());
    }

    #[test]
    fn pickup_radius_is_strict() {
        let (mut boosts, _) = field();
        let mut rng = StdRng::seed_from_u64(1);
        let (x, y) = {
            let b = boosts.try_spawn(1, 0, &mut rng).expect("spawned");
            (b.x, b.y)
        };

        assert!(boosts.collect_near(x + 20.0, y).is_empty());
        assert_eq!(boosts.len(), 1);
    }
}
