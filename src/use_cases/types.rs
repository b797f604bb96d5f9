// Use-case level inputs/outputs for the race loop.

use crate::domain::{BoostSnapshot, CarSnapshot, Controls};
use tokio::sync::oneshot;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JoinError {
    #[error("Game is full! Maximum {max} players allowed.")]
    GameFull { max: usize },
    #[error("Player already set up on this connection.")]
    AlreadyJoined,
}

#[derive(Debug)]
pub enum GameEvent {
    /// Create a car for a connection. The reply carries the new car or the rejection reason.
    Setup {
        client_id: u64,
        name: Option<String>,
        car_id: Option<String>,
        reply: oneshot::Sender<Result<CarSnapshot, JoinError>>,
    },
    Leave {
        client_id: u64,
    },
    Input {
        client_id: u64,
        controls: Controls,
    },
    /// Current cars, for a connection that just arrived.
    ExistingPlayers {
        reply: oneshot::Sender<Vec<CarSnapshot>>,
    },
}

#[derive(Debug, Clone)]
pub struct WorldUpdate {
    pub players: Vec<CarSnapshot>,
    pub boosts: Vec<BoostSnapshot>,
}

/// Everything the race loop fans out to connections.
#[derive(Debug, Clone)]
pub enum RaceBroadcast {
    State(WorldUpdate),
    /// Sent to every connection except the one that owns the car.
    PlayerJoined(CarSnapshot),
    PlayerLeft { id: u64 },
}
