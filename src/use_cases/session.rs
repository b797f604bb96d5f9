use super::types::{JoinError, WorldUpdate};
use crate::domain::systems::{advance, BoostField, LapEvent};
use crate::domain::tuning::{RaceTuning, SPAWN_SLOTS};
use crate::domain::{BoostSnapshot, Car, CarSnapshot, Controls, TrackGeometry};

use rand::Rng;
use std::collections::BTreeMap;
use tracing::{debug, info};

pub const DEFAULT_CAR_ID: &str = "Race_car_01";
const MAX_NAME_CHARS: usize = 32;

/// The single race: every car, the boosts on the track and the grid cursor.
pub struct RaceSession {
    track: TrackGeometry,
    tuning: RaceTuning,
    // Ordered by connection id so tick order (and boost claim ties) is stable.
    cars: BTreeMap<u64, Car>,
    boosts: BoostField,
    next_slot: usize,
    max_players: usize,
}

impl RaceSession {
    pub fn new(track: TrackGeometry, tuning: RaceTuning, max_players: usize) -> Self {
        Self {
            boosts: BoostField::new(&track, tuning.boost),
            track,
            tuning,
            cars: BTreeMap::new(),
            next_slot: 0,
            max_players,
        }
    }

    pub fn track(&self) -> &TrackGeometry {
        &self.track
    }

    pub fn car_count(&self) -> usize {
        self.cars.len()
    }

    pub fn car(&self, id: u64) -> Option<&Car> {
        self.cars.get(&id)
    }

    /// Puts a new car on the grid for connection `id`.
    pub fn join(
        &mut self,
        id: u64,
        name: Option<String>,
        car_id: Option<String>,
    ) -> Result<CarSnapshot, JoinError> {
        if self.cars.contains_key(&id) {
            return Err(JoinError::AlreadyJoined);
        }
        if self.cars.len() >= self.max_players {
            return Err(JoinError::GameFull {
                max: self.max_players,
            });
        }

        let slot = SPAWN_SLOTS[self.next_slot % SPAWN_SLOTS.len()];
        self.next_slot = (self.next_slot + 1) % SPAWN_SLOTS.len();

        let name = clean_name(name).unwrap_or_else(|| format!("Player{id}"));
        let car_id = car_id
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| DEFAULT_CAR_ID.to_string());

        let car = Car::spawn(id, name, car_id, slot, &self.track, &self.tuning.car);
        let snapshot = CarSnapshot::from(&car);
        self.cars.insert(id, car);
        Ok(snapshot)
    }

    /// Removes the car owned by `id`. Returns it only the first time.
    pub fn leave(&mut self, id: u64) -> Option<Car> {
        self.cars.remove(&id)
    }

    /// Replaces the held controls of a car. Returns false when `id` has no car.
    pub fn apply_controls(&mut self, id: u64, controls: Controls) -> bool {
        match self.cars.get_mut(&id) {
            Some(car) => {
                car.controls = controls;
                true
            }
            None => false,
        }
    }

    /// Advances every car by one tick. Returns nothing when the track is empty.
    pub fn tick(&mut self, now: u64) -> Option<WorldUpdate> {
        if self.cars.is_empty() {
            return None;
        }

        for car in self.cars.values_mut() {
            let report = advance(car, &self.track, &mut self.boosts, &self.tuning, now);

            for boost in &report.pickups {
                info!(player_id = car.id, boost_id = boost.id, location = boost.location, "boost picked up");
            }
            match report.lap {
                Some(LapEvent::Started) => {
                    info!(player_id = car.id, name = %car.name, lap = car.lap.lap_count + 1, "lap started");
                }
                Some(LapEvent::Completed {
                    lap,
                    duration_ms,
                    new_best,
                }) => {
                    info!(
                        player_id = car.id,
                        name = %car.name,
                        lap,
                        duration_ms,
                        best_ms = car.lap.best_lap_time,
                        new_best,
                        "lap completed"
                    );
                }
                None => {}
            }
        }

        Some(WorldUpdate {
            players: self.cars_snapshot(),
            boosts: self.boosts.active().iter().map(BoostSnapshot::from).collect(),
        })
    }

    /// Attempts to place a boost on a free spawn location.
    pub fn try_spawn_boost<R: Rng + ?Sized>(&mut self, now: u64, rng: &mut R) -> Option<BoostSnapshot> {
        let spawned = self
            .boosts
            .try_spawn(self.cars.len(), now, rng)
            .map(BoostSnapshot::from);
        match &spawned {
            Some(boost) => info!(boost_id = boost.id, location = boost.location, "boost spawned"),
            None => debug!(cars = self.cars.len(), boosts = self.boosts.len(), "boost spawn skipped"),
        }
        spawned
    }

    pub fn cars_snapshot(&self) -> Vec<CarSnapshot> {
        self.cars.values().map(CarSnapshot::from).collect()
    }
}

fn clean_name(name: Option<String>) -> Option<String> {
    let name = name?;
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.chars().take(MAX_NAME_CHARS).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn session() -> RaceSession {
        RaceSession::new(TrackGeometry::default(), RaceTuning::default(), 8)
    }

    #[test]
    fn when_joining_then_car_is_placed_on_the_grid_with_defaults() {
        let mut s = session();

        let car = s.join(3, None, None).expect("room on the grid");
        let finish = s.track().finish;

        assert_eq!(car.name, "Player3");
        assert_eq!(car.car_id, DEFAULT_CAR_ID);
        assert_eq!(car.x, finish.x - 30.0);
        assert_eq!(car.y, s.track().bottom_straight_y);
        assert_eq!(car.angle, std::f32::consts::FRAC_PI_2);
        assert_eq!(car.velocity_angle, car.angle);
        assert_eq!(car.speed, 0.0);
        assert_eq!((car.width, car.height), (18.0, 32.0));
    }

    #[test]
    fn when_name_is_blank_then_default_is_used() {
        let mut s = session();

        let blank = s.join(1, Some("   ".into()), Some("".into())).expect("joined");
        let named = s.join(2, Some("  Ayrton ".into()), Some("Race_car_04".into())).expect("joined");

        assert_eq!(blank.name, "Player1");
        assert_eq!(blank.car_id, DEFAULT_CAR_ID);
        assert_eq!(named.name, "Ayrton");
        assert_eq!(named.car_id, "Race_car_04");
    }

    #[test]
    fn when_eight_cars_joined_then_ninth_is_rejected() {
        let mut s = session();
        for id in 1..=8 {
            s.join(id, None, None).expect("room on the grid");
        }

        let rejected = s.join(9, None, None);

        assert_eq!(rejected, Err(JoinError::GameFull { max: 8 }));
        assert_eq!(s.car_count(), 8);
        assert_eq!(
            JoinError::GameFull { max: 8 }.to_string(),
            "Game is full! Maximum 8 players allowed."
        );
    }

    #[test]
    fn when_connection_already_has_car_then_setup_is_rejected() {
        let mut s = session();
        s.join(1, None, None).expect("joined");

        assert_eq!(s.join(1, None, None), Err(JoinError::AlreadyJoined));
        assert_eq!(s.car_count(), 1);
    }

    #[test]
    fn spawn_slots_cycle_round_robin() {
        let mut s = session();
        let first = s.join(1, None, None).expect("joined");
        s.leave(1);
        for id in 2..=8 {
            s.join(id, None, None).expect("joined");
            s.leave(id);
        }

        let ninth = s.join(9, None, None).expect("joined");

        assert_eq!((ninth.x, ninth.y), (first.x, first.y));
    }

    #[test]
    fn when_car_leaves_then_it_is_reported_once() {
        let mut s = session();
        s.join(1, None, None).expect("joined");

        assert!(s.leave(1).is_some());
        assert!(s.leave(1).is_none());
        assert_eq!(s.car_count(), 0);
    }

    #[test]
    fn when_controls_sent_without_car_then_ignored() {
        let mut s = session();
        let controls = Controls {
            throttle: true,
            ..Controls::default()
        };

        assert!(!s.apply_controls(5, controls));

        s.join(5, None, None).expect("joined");
        assert!(s.apply_controls(5, controls));
        assert_eq!(s.car(5).map(|c| c.controls), Some(controls));
    }

    #[test]
    fn when_no_cars_then_tick_produces_nothing() {
        let mut s = session();
        assert!(s.tick(1_000).is_none());
    }

    #[test]
    fn when_disconnected_then_car_is_missing_from_next_update() {
        let mut s = session();
        s.join(1, None, None).expect("joined");
        s.join(2, None, None).expect("joined");
        s.leave(1);

        let update = s.tick(1_000).expect("cars present");

        let ids: Vec<u64> = update.players.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![2]);
    }

    #[test]
    fn tick_moves_cars_in_id_order_and_reports_boosts() {
        let mut s = session();
        let mut rng = StdRng::seed_from_u64(11);
        s.join(7, None, None).expect("joined");
        s.join(2, None, None).expect("joined");
        s.apply_controls(
            7,
            Controls {
                throttle: true,
                ..Controls::default()
            },
        );
        assert!(s.try_spawn_boost(0, &mut rng).is_some());

        let update = s.tick(16).expect("cars present");

        let ids: Vec<u64> = update.players.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![2, 7]);
        assert!(update.players[1].speed > 0.0);
        assert_eq!(update.boosts.len(), 1);
    }

    #[test]
    fn when_no_cars_then_no_boost_spawns() {
        let mut s = session();
        let mut rng = StdRng::seed_from_u64(11);

        assert!(s.try_spawn_boost(0, &mut rng).is_none());
    }
}
