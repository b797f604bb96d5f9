// Use cases layer: the race session and the loop that drives it.

pub mod game;
pub mod session;
pub mod types;

pub use session::RaceSession;
pub use types::{GameEvent, JoinError, RaceBroadcast, WorldUpdate};
