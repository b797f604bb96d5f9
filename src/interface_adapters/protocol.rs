// Wire protocol DTOs and conversions for messages exchanged with race clients.

use crate::domain::{BoostSnapshot, CarSnapshot, Controls};
use crate::use_cases::{RaceBroadcast, WorldUpdate};
use serde::{Deserialize, Serialize};

pub const WELCOME_MESSAGE: &str = "Welcome! Announce if host.";

/// Messages the server sends to connected clients over the WebSocket.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    // Sent once per connection with the id the server assigned.
    #[serde(rename_all = "camelCase")]
    Welcome { client_id: u64, message: String },
    // Cars already racing, for a connection that just arrived.
    ExistingPlayers { players: Vec<PlayerDto> },
    NewPlayer { player: PlayerDto },
    PlayerLeft { id: u64 },
    Error { message: String },
    // Full world snapshot for one tick.
    GameStateUpdate { players: Vec<PlayerDto>, boosts: Vec<BoostDto> },
}

/// Messages clients send to the server over the WebSocket.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    // The display screen identifying itself. Nothing is sent back.
    HostAnnounce,
    #[serde(rename_all = "camelCase")]
    PlayerSetup {
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        car_id: Option<String>,
    },
    ControlInput { controls: ControlsDto },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Invalid JSON format.")]
    InvalidJson(#[source] serde_json::Error),
    #[error("Invalid message format.")]
    InvalidMessage(#[source] serde_json::Error),
    #[error("Binary messages are not supported.")]
    BinaryFrame,
}

/// Parses a text frame. Malformed JSON and well-formed JSON that is not a known message shape
/// are reported separately.
pub fn decode_client_message(text: &str) -> Result<ClientMessage, ProtocolError> {
    let value: serde_json::Value = serde_json::from_str(text).map_err(ProtocolError::InvalidJson)?;
    ClientMessage::deserialize(value).map_err(ProtocolError::InvalidMessage)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ControlsDto {
    #[serde(default)]
    pub left: bool,
    #[serde(default)]
    pub right: bool,
    #[serde(default)]
    pub throttle: bool,
    #[serde(default)]
    pub reverse: bool,
}

impl From<ControlsDto> for Controls {
    fn from(c: ControlsDto) -> Self {
        Self {
            left: c.left,
            right: c.right,
            throttle: c.throttle,
            reverse: c.reverse,
        }
    }
}

impl From<Controls> for ControlsDto {
    fn from(c: Controls) -> Self {
        Self {
            left: c.left,
            right: c.right,
            throttle: c.throttle,
            reverse: c.reverse,
        }
    }
}

/// Everything a renderer needs to draw one car without further computation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerDto {
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
    pub controls: ControlsDto,
    pub lap_count: u32,
    pub lap_start_time: u64,
    pub last_lap_time: u64,
    pub best_lap_time: u64,
    pub on_lap: bool,
    pub just_completed_lap: bool,
    pub show_headlights: bool,
    pub show_reverse_lights: bool,
    pub is_bouncing: bool,
    pub bounce_recovery_frames: u32,
    pub has_boost: bool,
    pub boost_end_time: Option<u64>,
}

impl From<&CarSnapshot> for PlayerDto {
    fn from(car: &CarSnapshot) -> Self {
        Self {
            id: car.id,
            name: car.name.clone(),
            car_id: car.car_id.clone(),
            x: car.x,
            y: car.y,
            angle: car.angle,
            velocity_angle: car.velocity_angle,
            speed: car.speed,
            width: car.width,
            height: car.height,
            controls: car.controls.into(),
            lap_count: car.lap.lap_count,
            lap_start_time: car.lap.lap_start_time,
            last_lap_time: car.lap.last_lap_time,
            best_lap_time: car.lap.best_lap_time,
            on_lap: car.lap.on_lap,
            just_completed_lap: car.lap.just_completed_lap,
            show_headlights: car.show_headlights,
            show_reverse_lights: car.show_reverse_lights,
            is_bouncing: car.is_bouncing,
            bounce_recovery_frames: car.bounce_recovery_frames,
            has_boost: car.has_boost,
            boost_end_time: car.boost_end_time,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoostDto {
    pub id: u64,
    pub x: f32,
    pub y: f32,
    pub spawn_time: u64,
    pub location: &'static str,
}

impl From<&BoostSnapshot> for BoostDto {
    fn from(b: &BoostSnapshot) -> Self {
        Self {
            id: b.id,
            x: b.x,
            y: b.y,
            spawn_time: b.spawn_time,
            location: b.location,
        }
    }
}

impl From<&WorldUpdate> for ServerMessage {
    fn from(update: &WorldUpdate) -> Self {
        ServerMessage::GameStateUpdate {
            players: update.players.iter().map(PlayerDto::from).collect(),
            boosts: update.boosts.iter().map(BoostDto::from).collect(),
        }
    }
}

impl From<&RaceBroadcast> for ServerMessage {
    fn from(msg: &RaceBroadcast) -> Self {
        match msg {
            RaceBroadcast::State(update) => update.into(),
            RaceBroadcast::PlayerJoined(car) => ServerMessage::NewPlayer { player: car.into() },
            RaceBroadcast::PlayerLeft { id } => ServerMessage::PlayerLeft { id: *id },
        }
    }
}
