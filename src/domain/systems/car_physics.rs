// One physics step for one car: boosts, steering, speed, drift, walls and laps.

use std::f32::consts::FRAC_PI_2;

use crate::domain::state::{Car, PowerUp};
use crate::domain::systems::boosts::BoostField;
use crate::domain::systems::collision::{self, Probe, WallHit};
use crate::domain::systems::laps::{self, LapEvent};
use crate::domain::systems::normalize_angle;
use crate::domain::track::{TrackGeometry, TrackRegion};
use crate::domain::tuning::{BoostTuning, CarTuning, RaceTuning};

/// What happened to a car during one tick, for logging.
#[derive(Debug, Default)]
pub struct TickReport {
    pub pickups: Vec<PowerUp>,
    pub lap: Option<LapEvent>,
}

/// Advances `car` by one tick. `now` is wall-clock epoch milliseconds.
pub fn advance(
    car: &mut Car,
    track: &TrackGeometry,
    boosts: &mut BoostField,
    tuning: &RaceTuning,
    now: u64,
) -> TickReport {
    let cfg = &tuning.car;
    let prev_x = car.x;
    let mut report = TickReport::default();

    if car.boost_end_time.is_some_and(|end| now > end) {
        car.boost_end_time = None;
        car.has_boost = false;
    }

    report.pickups = boosts.collect_near(car.x, car.y);
    if !report.pickups.is_empty() {
        car.has_boost = true;
        car.boost_end_time = Some(now + tuning.boost.duration_ms);
    }

    car.show_headlights = (car.controls.left || car.controls.right) && car.speed > cfg.headlight_speed;
    car.show_reverse_lights = car.controls.reverse && car.speed < cfg.reverse_light_speed;

    steer(car, cfg);

    let speed = if car.is_bouncing {
        car.speed
    } else {
        let speed = target_speed(car, cfg, &tuning.boost);
        drift(car, speed, cfg);
        speed
    };

    let heading = car.velocity_angle - FRAC_PI_2;
    let probe = collision::probe(
        track,
        car.x + heading.cos() * speed,
        car.y + heading.sin() * speed,
        car.speed,
        cfg,
    );

    match probe.hit {
        Some(hit) => respond_to_wall(car, track, &probe, hit, speed, cfg),
        None => {
            car.x = probe.x;
            car.y = probe.y;
            car.speed = speed;
            if car.bounce_recovery_frames == 0 {
                car.is_bouncing = false;
            }
        }
    }

    if probe.in_curve() {
        center_assist(car, track, cfg);
    }

    report.lap = laps::track_lap(&mut car.lap, &track.finish, prev_x, car.x, car.y, &tuning.lap, now);
    report
}

fn steer(car: &mut Car, cfg: &CarTuning) {
    if car.is_bouncing && car.bounce_recovery_frames > 0 {
        let diff = normalize_angle(car.velocity_angle - car.angle);
        car.angle += diff * cfg.bounce_recovery_blend;
        car.bounce_recovery_frames -= 1;
        if car.bounce_recovery_frames == 0 {
            car.is_bouncing = false;
        }
    } else {
        car.is_bouncing = false;
        if car.speed.abs() > cfg.min_turn_speed {
            let factor = if car.speed > 0.0 {
                car.speed / cfg.max_speed
            } else {
                car.speed.abs() / cfg.max_reverse_speed.abs() * cfg.reverse_turn_scale
            }
            .clamp(cfg.min_turn_factor, 1.0);
            let dir = if car.speed >= 0.0 { 1.0 } else { -1.0 };
            let step = cfg.turn_rate * factor * dir;
            if car.controls.left {
                car.angle -= step;
            }
            if car.controls.right {
                car.angle += step;
            }
        }
    }
    car.angle = normalize_angle(car.angle);
}

/// Speed the car wants this tick from its controls. Throttle wins over reverse when both are held.
fn target_speed(car: &Car, cfg: &CarTuning, boost: &BoostTuning) -> f32 {
    let mut speed = car.speed;
    if car.controls.throttle {
        speed += cfg.acceleration;
    } else if car.controls.reverse {
        speed -= cfg.reverse_acceleration;
    } else if speed > 0.0 {
        speed = (speed - cfg.deceleration).max(0.0);
    } else if speed < 0.0 {
        speed = (speed + cfg.deceleration).min(0.0);
    }
    speed = speed.clamp(cfg.max_reverse_speed, cfg.max_speed);

    if car.has_boost {
        let boosted_max = cfg.max_speed * boost.speed_multiplier;
        if speed > 0.0 {
            speed = speed.max(cfg.max_speed * boost.speed_floor_multiplier).min(boosted_max);
        }
        speed = speed.clamp(cfg.max_reverse_speed, boosted_max);
    }
    speed
}

fn drift(car: &mut Car, speed: f32, cfg: &CarTuning) {
    let diff = normalize_angle(car.angle - car.velocity_angle);
    let mut factor = cfg.drift_factor * (speed.abs() / cfg.max_speed);
    if speed < 0.0 {
        factor *= cfg.reverse_drift_scale;
    }
    car.velocity_angle = normalize_angle(car.velocity_angle + diff * factor);
}

fn respond_to_wall(car: &mut Car, track: &TrackGeometry, probe: &Probe, hit: WallHit, speed: f32, cfg: &CarTuning) {
    let in_curve = probe.in_curve();
    car.x = probe.x;
    car.y = probe.y;

    car.speed = speed * cfg.wall_slide_retention;
    let pushing = (car.controls.throttle && car.speed >= 0.0) || (car.controls.reverse && car.speed <= 0.0);
    if pushing {
        if car.speed.abs() < cfg.min_slide_speed {
            let sign = if car.speed > 0.0 {
                1.0
            } else if car.speed < 0.0 {
                -1.0
            } else if car.controls.throttle {
                1.0
            } else {
                -1.0
            };
            car.speed = sign * cfg.min_slide_speed;
        }
    } else if car.speed.abs() < cfg.wall_stop_speed {
        car.speed = 0.0;
    }
    car.speed *= if in_curve { cfg.curve_damping } else { cfg.straight_damping };

    let travel = car.velocity_angle - FRAC_PI_2;
    let (dir_x, dir_y) = (travel.cos(), travel.sin());
    let (tangent_x, tangent_y) = (-hit.normal_y, hit.normal_x);
    let along = if dir_x * tangent_x + dir_y * tangent_y >= 0.0 { 1.0 } else { -1.0 };
    let mut slide_x = tangent_x * along;
    let mut slide_y = tangent_y * along;

    if car.speed >= 0.0 {
        if in_curve {
            if let Some((tx, ty)) = centerline_target(car, track) {
                let cdx = tx - car.x;
                let cdy = ty - car.y;
                let mag = (cdx * cdx + cdy * cdy).sqrt();
                if mag > 0.01 {
                    let blend = cfg.curve_center_blend;
                    slide_x = slide_x * (1.0 - blend) + cdx / mag * blend;
                    slide_y = slide_y * (1.0 - blend) + cdy / mag * blend;

                    let facing = cdy.atan2(cdx) + FRAC_PI_2;
                    let diff = normalize_angle(facing - car.angle);
                    car.angle = normalize_angle(car.angle + diff * cfg.curve_heading_nudge);
                }
            }
        } else {
            let blend = cfg.straight_outward_blend;
            slide_x = slide_x * (1.0 - blend) + hit.normal_x * blend;
            slide_y = slide_y * (1.0 - blend) + hit.normal_y * blend;
        }

        let mag = (slide_x * slide_x + slide_y * slide_y).sqrt();
        if mag > 0.01 {
            slide_x /= mag;
            slide_y /= mag;
        }
        car.velocity_angle = normalize_angle(slide_y.atan2(slide_x) + FRAC_PI_2);
        car.is_bouncing = true;
        car.bounce_recovery_frames = cfg.bounce_ticks;

        let nudge = if in_curve {
            cfg.wall_nudge * cfg.curve_nudge_multiplier
        } else {
            cfg.wall_nudge
        };
        car.x += hit.normal_x * nudge;
        car.y += hit.normal_y * nudge;
    } else {
        car.is_bouncing = false;
        car.bounce_recovery_frames = 0;
        car.speed *= if in_curve {
            cfg.reverse_curve_damping
        } else {
            cfg.reverse_straight_damping
        };

        let smoothing = cfg.reverse_slide_smoothing;
        slide_x = slide_x * (1.0 - smoothing) + dir_x * smoothing;
        slide_y = slide_y * (1.0 - smoothing) + dir_y * smoothing;
        car.velocity_angle = normalize_angle(slide_y.atan2(slide_x) + FRAC_PI_2);

        let nudge = cfg.wall_nudge * cfg.reverse_nudge_scale;
        car.x += hit.normal_x * nudge;
        car.y += hit.normal_y * nudge;
    }
}

/// Nearest centerline point of whichever curve the car's current X is closest to.
fn centerline_target(car: &Car, track: &TrackGeometry) -> Option<(f32, f32)> {
    let region = if car.x < track.left_curve_center_x {
        TrackRegion::LeftCurve
    } else {
        TrackRegion::RightCurve
    };
    track.nearest_centerline_point(region, car.x, car.y)
}

/// Slow forward cars inside a curve drift gently back toward the centerline.
fn center_assist(car: &mut Car, track: &TrackGeometry, cfg: &CarTuning) {
    if car.speed < 0.0 || car.speed.abs() >= cfg.center_assist_speed {
        return;
    }
    let Some((tx, ty)) = centerline_target(car, track) else {
        return;
    };

    let dx = tx - car.x;
    let dy = ty - car.y;
    let dist = (dx * dx + dy * dy).sqrt();
    if dist <= cfg.center_assist_min_distance {
        return;
    }

    car.x += dx / dist * cfg.center_magnetism;
    car.y += dy / dist * cfg.center_magnetism;

    if car.speed.abs() < cfg.center_steer_speed {
        let facing = dy.atan2(dx) + FRAC_PI_2;
        let diff = normalize_angle(facing - car.velocity_angle);
        car.velocity_angle = normalize_angle(car.velocity_angle + diff * cfg.center_steering_assist);
    }
}
