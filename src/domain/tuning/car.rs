use std::f32::consts::FRAC_PI_2;
use std::time::Duration;

/// Gameplay tuning for cars.
///
/// Speeds are in pixels per tick and turn rates in radians per tick; the simulation is
/// tick-synchronous, so these values only make sense together with the tick interval.
/// Several constants were tuned by feel.
#[derive(Debug, Clone, Copy)]
pub struct CarTuning {
    pub max_speed: f32,
    /// Negative: the most the car can go backwards.
    pub max_reverse_speed: f32,
    pub acceleration: f32,
    pub reverse_acceleration: f32,
    /// Coasting speed loss per tick when neither throttle nor reverse is held.
    pub deceleration: f32,
    pub turn_rate: f32,
    /// Below this |speed| steering input has no effect.
    pub min_turn_speed: f32,
    /// Steering authority multiplier when reversing.
    pub reverse_turn_scale: f32,
    pub min_turn_factor: f32,

    /// How quickly travel direction catches up with heading at full speed.
    pub drift_factor: f32,
    /// Extra drift damping while reversing.
    pub reverse_drift_scale: f32,

    /// Fraction of speed kept when sliding along a wall.
    pub wall_slide_retention: f32,
    /// Speed floor while still driving into a wall.
    pub min_slide_speed: f32,
    /// Residual speeds below this are zeroed after a wall hit when not accelerating.
    pub wall_stop_speed: f32,
    pub straight_damping: f32,
    pub curve_damping: f32,
    pub reverse_straight_damping: f32,
    pub reverse_curve_damping: f32,
    /// Blend toward the pre-hit direction when sliding in reverse.
    pub reverse_slide_smoothing: f32,
    pub wall_nudge: f32,
    pub curve_nudge_multiplier: f32,
    pub reverse_nudge_scale: f32,
    /// Blend of the slide direction toward the wall normal on straights.
    pub straight_outward_blend: f32,
    /// Blend of the slide direction toward the curve centerline.
    pub curve_center_blend: f32,
    /// Heading correction toward the curve centerline after a curve hit.
    pub curve_heading_nudge: f32,

    pub bounce_recovery_blend: f32,
    pub bounce_ticks: u32,

    /// Below this |speed| the outer curve wall gets a little more give.
    pub curve_escape_speed: f32,
    pub curve_escape_slow: f32,
    pub curve_escape_fast: f32,

    /// Constant pull toward the curve centerline at low speed.
    pub center_magnetism: f32,
    pub center_assist_speed: f32,
    /// No pull when already this close to the centerline.
    pub center_assist_min_distance: f32,
    pub center_steer_speed: f32,
    pub center_steering_assist: f32,

    pub headlight_speed: f32,
    pub reverse_light_speed: f32,

    /// Car footprint, forwarded to clients for drawing.
    pub width: f32,
    pub height: f32,
}

/// Wall-bounce recovery time before it is converted into ticks.
pub const BOUNCE_DURATION: Duration = Duration::from_millis(400);

impl CarTuning {
    /// Tuning with the bounce recovery converted for the given tick interval.
    pub fn for_tick_interval(tick_interval: Duration) -> Self {
        Self {
            bounce_ticks: bounce_ticks(tick_interval),
            ..Self::default()
        }
    }
}

fn bounce_ticks(tick_interval: Duration) -> u32 {
    let tick_ms = tick_interval.as_secs_f32() * 1000.0;
    if tick_ms <= 0.0 {
        return 0;
    }
    (BOUNCE_DURATION.as_secs_f32() * 1000.0 / tick_ms).round() as u32
}

impl Default for CarTuning {
    fn default() -> Self {
        Self {
            max_speed: 4.0,
            max_reverse_speed: -1.8,
            acceleration: 0.08,
            reverse_acceleration: 0.08,
            deceleration: 0.07,
            turn_rate: 0.05,
            min_turn_speed: 0.1,
            reverse_turn_scale: 0.7,
            min_turn_factor: 0.3,

            drift_factor: 0.15,
            reverse_drift_scale: 0.2,

            wall_slide_retention: 0.8,
            min_slide_speed: 0.5,
            wall_stop_speed: 0.1,
            straight_damping: 0.94,
            curve_damping: 0.88,
            reverse_straight_damping: 0.85,
            reverse_curve_damping: 0.75,
            reverse_slide_smoothing: 0.7,
            wall_nudge: 0.003,
            curve_nudge_multiplier: 1.0,
            reverse_nudge_scale: 0.1,
            straight_outward_blend: 0.05,
            curve_center_blend: 0.15,
            curve_heading_nudge: 0.02,

            bounce_recovery_blend: 0.12,
            bounce_ticks: bounce_ticks(Duration::from_millis(16)),

            curve_escape_speed: 0.3,
            curve_escape_slow: 1.02,
            curve_escape_fast: 1.01,

            center_magnetism: 0.008,
            center_assist_speed: 1.2,
            center_assist_min_distance: 5.0,
            center_steer_speed: 0.2,
            center_steering_assist: 0.25,

            headlight_speed: 0.5,
            reverse_light_speed: -0.1,

            width: 18.0,
            height: 32.0,
        }
    }
}

/// Grid slot offset from the finish line where a new car is placed.
#[derive(Debug, Clone, Copy)]
pub struct SpawnSlot {
    pub x_offset: f32,
    pub y_offset: f32,
    pub angle: f32,
}

const fn slot(x_offset: f32, y_offset: f32) -> SpawnSlot {
    SpawnSlot {
        x_offset,
        y_offset,
        angle: FRAC_PI_2,
    }
}

/// Starting grid behind the finish line, handed out round-robin.
pub const SPAWN_SLOTS: [SpawnSlot; 8] = [
    slot(-30.0, 0.0),
    slot(-30.0, -25.0),
    slot(-30.0, 25.0),
    slot(-60.0, 0.0),
    slot(-60.0, -25.0),
    slot(-60.0, 25.0),
    slot(-90.0, 0.0),
    slot(-90.0, -25.0),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounce_recovery_is_25_ticks_at_default_rate() {
        assert_eq!(CarTuning::default().bounce_ticks, 25);
    }

    #[test]
    fn bounce_recovery_scales_with_tick_interval() {
        let tuning = CarTuning::for_tick_interval(Duration::from_millis(50));
        assert_eq!(tuning.bounce_ticks, 8);
    }
}
