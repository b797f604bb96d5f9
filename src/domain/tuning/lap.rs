/// Finish-line detection thresholds.

#[derive(Debug, Clone, Copy)]
pub struct LapTuning {
    /// Laps at or below this duration (ms) are treated as double crossings and ignored.
    pub min_lap_ms: u64,

    /// Minimum forward X movement in one tick for a crossing to count.
    pub min_crossing_dx: f32,

    /// Distance from the line a car must reach before the next lap can be detected.
    pub rearm_distance: f32,
}

impl Default for LapTuning {
    fn default() -> Self {
        Self {
            min_lap_ms: 1000,
            min_crossing_dx: 0.05,
            rearm_distance: 20.0,
        }
    }
}
