/// Gameplay tuning for boost power-ups.

#[derive(Debug, Clone, Copy)]
pub struct BoostTuning {
    /// Top speed multiplier while a boost is active.
    pub speed_multiplier: f32,

    /// Forward speed floor while boosted, as a multiple of the normal max speed.
    pub speed_floor_multiplier: f32,

    /// How long a collected boost lasts, in milliseconds.
    pub duration_ms: u64,

    /// Pickup distance in pixels.
    pub pickup_radius: f32,

    /// A spawn location is blocked while any boost sits within this distance of it.
    pub min_separation: f32,
}

impl Default for BoostTuning {
    fn default() -> Self {
        Self {
            speed_multiplier: 3.2,
            speed_floor_multiplier: 1.5,
            duration_ms: 2000,
            pickup_radius: 20.0,
            min_separation: 50.0,
        }
    }
}
