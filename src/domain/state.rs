// Domain-level simulation entities and snapshot types.

use crate::domain::track::TrackGeometry;
use crate::domain::tuning::{CarTuning, SpawnSlot};

/// Held-key state sent by a client. Replaced wholesale on every control message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Controls {
    pub left: bool,
    pub right: bool,
    pub throttle: bool,
    pub reverse: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LapState {
    pub lap_count: u32,
    /// Epoch ms of the crossing that started the current lap; 0 before the first crossing.
    pub lap_start_time: u64,
    pub last_lap_time: u64,
    /// 0 until a lap has been completed.
    pub best_lap_time: u64,
    pub on_lap: bool,
    pub just_completed_lap: bool,
}

pub struct Car {
    pub id: u64,
    pub name: String,
    pub car_id: String,

    pub x: f32,
    pub y: f32,
    /// Heading in radians; 0 points up the screen, π/2 to the right.
    pub angle: f32,
    /// Direction of travel. Lags behind `angle` while drifting.
    pub velocity_angle: f32,
    /// Signed; negative while reversing.
    pub speed: f32,

    pub controls: Controls,

    pub is_bouncing: bool,
    pub bounce_recovery_frames: u32,

    pub lap: LapState,

    pub has_boost: bool,
    pub boost_end_time: Option<u64>,

    // Display-only flags, derived every tick.
    pub show_headlights: bool,
    pub show_reverse_lights: bool,

    pub width: f32,
    pub height: f32,
}

impl Car {
    /// New car parked in a grid slot behind the finish line.
    pub fn spawn(
        id: u64,
        name: String,
        car_id: String,
        slot: SpawnSlot,
        track: &TrackGeometry,
        tuning: &CarTuning,
    ) -> Self {
        Self {
            id,
            name,
            car_id,
            x: track.finish.x + slot.x_offset,
            y: track.bottom_straight_y + slot.y_offset,
            angle: slot.angle,
            velocity_angle: slot.angle,
            speed: 0.0,
            controls: Controls::default(),
            is_bouncing: false,
            bounce_recovery_frames: 0,
            lap: LapState::default(),
            has_boost: false,
            boost_end_time: None,
            show_headlights: false,
            show_reverse_lights: false,
            width: tuning.width,
            height: tuning.height,
        }
    }
}

/// A boost sitting on the track waiting to be collected.
#[derive(Debug, Clone)]
pub struct PowerUp {
    pub id: u64,
    pub x: f32,
    pub y: f32,
    pub spawn_time: u64,
    pub location: &'static str,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CarSnapshot {
    pub id: u64,
    pub name: String,
    pub car_id: String,
    pub x: f32,
    pub y: f32,
    pub angle: f32,
    pub velocity_angle: f32,
    pub speed: f32,
    pub width: f32,
    pub height: f32,
    pub controls: Controls,
    pub lap: LapState,
    pub show_headlights: bool,
    pub show_reverse_lights: bool,
    pub is_bouncing: bool,
    pub bounce_recovery_frames: u32,
    pub has_boost: bool,
    pub boost_end_time: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoostSnapshot {
    pub id: u64,
    pub x: f32,
    pub y: f32,
    pub spawn_time: u64,
    pub location: &'static str,
}

impl From<&Car> for CarSnapshot {
    fn from(c: &Car) -> Self {
        Self {
            id: c.id,
            name: c.name.clone(),
            car_id: c.car_id.clone(),
            x: c.x,
            y: c.y,
            angle: c.angle,
            velocity_angle: c.velocity_angle,
            speed: c.speed,
            width: c.width,
            height: c.height,
            controls: c.controls,
            lap: c.lap,
            show_headlights: c.show_headlights,
            show_reverse_lights: c.show_reverse_lights,
            is_bouncing: c.is_bouncing,
            bounce_recovery_frames: c.bounce_recovery_frames,
            has_boost: c.has_boost,
            boost_end_time: c.boost_end_time,
        }
    }
}

impl From<&PowerUp> for BoostSnapshot {
    fn from(p: &PowerUp) -> Self {
        Self {
            id: p.id,
            x: p.x,
            y: p.y,
            spawn_time: p.spawn_time,
            location: p.location,
        }
    }
}
