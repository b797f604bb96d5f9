// Domain layer: track geometry, car simulation and power-up rules.

pub mod state;
pub mod systems;
pub mod track;
pub mod tuning;

pub use state::{BoostSnapshot, Car, CarSnapshot, Controls, LapState, PowerUp};
pub use track::{TrackGeometry, TrackRegion};
