// Gameplay tuning, kept apart from runtime/server configuration.

pub mod boost;
pub mod car;
pub mod lap;
pub mod track;

pub use boost::BoostTuning;
pub use car::{CarTuning, SpawnSlot, SPAWN_SLOTS};
pub use lap::LapTuning;
pub use track::TrackParams;

/// Everything the per-car physics step reads besides the track itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct RaceTuning {
    pub car: CarTuning,
    pub boost: BoostTuning,
    pub lap: LapTuning,
}
