// Finish-line crossing and lap timing.

use crate::domain::state::LapState;
use crate::domain::track::FinishLine;
use crate::domain::tuning::LapTuning;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LapEvent {
    /// First valid crossing; lap timing begins.
    Started,
    Completed {
        lap: u32,
        duration_ms: u64,
        new_best: bool,
    },
}

fn crossed(finish: &FinishLine, prev_x: f32, x: f32) -> bool {
    if finish.direction >= 0.0 {
        prev_x < finish.x && x >= finish.x
    } else {
        prev_x > finish.x && x <= finish.x
    }
}

/// Updates lap state from a car's movement this tick.
pub fn track_lap(
    lap: &mut LapState,
    finish: &FinishLine,
    prev_x: f32,
    x: f32,
    y: f32,
    tuning: &LapTuning,
    now: u64,
) -> Option<LapEvent> {
    let forward_dx = (x - prev_x) * finish.direction.signum();
    let crossing = crossed(finish, prev_x, x) && finish.spans(y) && forward_dx > tuning.min_crossing_dx;

    if !crossing {
        if lap.just_completed_lap && (x - finish.x).abs() > tuning.rearm_distance {
            lap.just_completed_lap = false;
        }
        return None;
    }

    if !lap.on_lap {
        lap.on_lap = true;
        lap.lap_start_time = now;
        lap.just_completed_lap = false;
        return Some(LapEvent::Started);
    }

    if lap.just_completed_lap {
        return None;
    }

    let duration_ms = now.saturating_sub(lap.lap_start_time);
    if duration_ms <= tuning.min_lap_ms {
        return None;
    }

    lap.lap_count += 1;
    lap.last_lap_time = duration_ms;
    let new_best = lap.best_lap_time == 0 || duration_ms < lap.best_lap_time;
    if new_best {
        lap.best_lap_time = duration_ms;
    }
    lap.lap_start_time = now;
    lap.just_completed_lap = true;

    Some(LapEvent::Completed {
        lap: lap.lap_count,
        duration_ms,
        new_best,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::track::TrackGeometry;

    struct Fixture {
        finish: FinishLine,
        tuning: LapTuning,
        lap: LapState,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                finish: TrackGeometry::default().finish,
                tuning: LapTuning::default(),
                lap: LapState::default(),
            }
        }

        fn cross(&mut self, now: u64) -> Option<LapEvent> {
            let fx = self.finish.x;
            let y = (self.finish.y_min + self.finish.y_max) / 2.0;
            track_lap(&mut self.lap, &self.finish, fx - 1.0, fx + 1.0, y, &self.tuning, now)
        }

        fn drive_to(&mut self, x: f32, now: u64) -> Option<LapEvent> {
            let y = (self.finish.y_min + self.finish.y_max) / 2.0;
            track_lap(&mut self.lap, &self.finish, x - 1.0, x, y, &self.tuning, now)
        }
    }

    #[test]
    fn when_first_crossing_then_lap_starts_without_counting() {
        let mut f = Fixture::new();

        assert_eq!(f.cross(1_000), Some(LapEvent::Started));
        assert!(f.lap.on_lap);
        assert_eq!(f.lap.lap_start_time, 1_000);
        assert_eq!(f.lap.lap_count, 0);
    }

    #[test]
    fn when_lap_round_trip_then_count_and_times_update() {
        let mut f = Fixture::new();
        f.cross(1_000);
        f.drive_to(f.finish.x + 200.0, 3_000);

        let event = f.cross(6_000);

        assert_eq!(
            event,
            Some(LapEvent::Completed {
                lap: 1,
                duration_ms: 5_000,
                new_best: true
            })
        );
        assert_eq!(f.lap.last_lap_time, 5_000);
        assert_eq!(f.lap.best_lap_time, 5_000);
        assert_eq!(f.lap.lap_start_time, 6_000);
        assert!(f.lap.just_completed_lap);
    }

    #[test]
    fn when_recrossing_before_rearm_then_nothing_counts() {
        let mut f = Fixture::new();
        f.cross(1_000);
        f.drive_to(f.finish.x + 200.0, 3_000);
        f.cross(6_000);

        // Still within the re-arm distance of the line.
        f.drive_to(f.finish.x - 10.0, 7_500);
        assert!(f.lap.just_completed_lap);
        assert_eq!(f.cross(9_000), None);
        assert_eq!(f.lap.lap_count, 1);
    }

    #[test]
    fn when_lap_is_too_short_then_it_is_ignored() {
        let mut f = Fixture::new();
        f.cross(1_000);

        assert_eq!(f.cross(2_000), None);
        assert_eq!(f.lap.lap_count, 0);
        assert_eq!(f.lap.lap_start_time, 1_000);
    }

    #[test]
    fn when_slower_lap_then_best_is_kept() {
        let mut f = Fixture::new();
        f.cross(0);
        f.drive_to(f.finish.x + 200.0, 1_000);
        f.cross(4_000);
        f.drive_to(f.finish.x + 200.0, 5_000);

        let event = f.cross(10_000);

        assert_eq!(
            event,
            Some(LapEvent::Completed {
                lap: 2,
                duration_ms: 6_000,
                new_best: false
            })
        );
        assert_eq!(f.lap.best_lap_time, 4_000);
        assert_eq!(f.lap.last_lap_time, 6_000);
    }

    #[test]
    fn when_crossing_backwards_or_outside_span_then_ignored() {
        let mut f = Fixture::new();
        let fx = f.finish.x;
        let mid_y = (f.finish.y_min + f.finish.y_max) / 2.0;

        let backwards = track_lap(&mut f.lap, &f.finish, fx + 1.0, fx - 1.0, mid_y, &f.tuning, 1_000);
        let outside = track_lap(&mut f.lap, &f.finish, fx - 1.0, fx + 1.0, f.finish.y_min - 5.0, &f.tuning, 1_000);
        let creeping = track_lap(&mut f.lap, &f.finish, fx - 0.01, fx + 0.01, mid_y, &f.tuning, 1_000);

        assert_eq!(backwards, None);
        assert_eq!(outside, None);
        assert_eq!(creeping, None);
        assert!(!f.lap.on_lap);
    }
}
