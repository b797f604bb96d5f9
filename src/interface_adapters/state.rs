use crate::use_cases::GameEvent;
use axum::extract::ws::Utf8Bytes;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch};

/// One serialized server message shared by every connection.
#[derive(Debug, Clone)]
pub struct OutboundFrame {
    // Connection that must not receive this frame (the origin of a `newPlayer`).
    pub exclude: Option<u64>,
    pub bytes: Utf8Bytes,
}

#[derive(Clone)]
pub struct AppState {
    // Events flowing from the network into the race loop.
    pub input_tx: mpsc::Sender<GameEvent>,
    // Serialized broadcasts, shared across all connections.
    pub frames_tx: broadcast::Sender<OutboundFrame>,
    // Latest serialized world snapshot for lag recovery.
    pub latest_state_tx: watch::Sender<Utf8Bytes>,
    // Artificial latency applied to control input.
    pub input_delay: Duration,
}
