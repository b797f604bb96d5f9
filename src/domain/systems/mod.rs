// Per-tick simulation systems.

pub mod boosts;
pub mod car_physics;
pub mod collision;
pub mod laps;

use std::f32::consts::{PI, TAU};

pub use boosts::BoostField;
pub use car_physics::{advance, TickReport};
pub use laps::LapEvent;

/// Wraps an angle into (-π, π].
pub fn normalize_angle(mut angle: f32) -> f32 {
    if !angle.is_finite() {
        return 0.0;
    }
    while angle > PI {
        angle -= TAU;
    }
    while angle <= -PI {
        angle += TAU;
    }
    angle
}
