/// Canvas and road parameters the track geometry is derived from.
///
/// These must match the values the display client uses to draw the track, otherwise the
/// collision walls will not line up with the rendered road.
#[derive(Debug, Clone, Copy)]
pub struct TrackParams {
    /// Canvas width in pixels. Height is always `width * 9 / 16`.
    pub canvas_width: f32,

    /// Full road width in pixels.
    pub road_thickness: f32,

    /// Lower bound for the straight length, as a fraction of canvas width.
    pub min_straight_fraction: f32,

    /// Curve centerline radius, as a fraction of canvas height.
    pub curve_radius_fraction: f32,

    /// Horizontal breathing room left around the track, as a fraction of canvas width.
    pub margin_fraction: f32,
}

impl Default for TrackParams {
    fn default() -> Self {
        Self {
            canvas_width: 1280.0,
            road_thickness: 75.0,
            min_straight_fraction: 0.2,
            curve_radius_fraction: 0.30,
            margin_fraction: 0.05,
        }
    }
}
