// Oval track geometry: two straights joined by two half-circle curves.

use crate::domain::tuning::TrackParams;

/// Which part of the track a point's X coordinate falls in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackRegion {
    Straight,
    LeftCurve,
    RightCurve,
}

/// Finish line on the bottom straight, crossed left to right.
#[derive(Debug, Clone, Copy)]
pub struct FinishLine {
    pub x: f32,
    pub y_min: f32,
    pub y_max: f32,
    /// +1 when laps are driven toward increasing X.
    pub direction: f32,
}

impl FinishLine {
    pub fn spans(&self, y: f32) -> bool {
        y >= self.y_min && y <= self.y_max
    }
}

/// Collision boundaries derived once at startup and shared read-only afterwards.
#[derive(Debug, Clone, Copy)]
pub struct TrackGeometry {
    pub canvas_width: f32,
    pub canvas_height: f32,
    pub road_half_width: f32,
    pub straight_length: f32,

    pub left_curve_center_x: f32,
    pub right_curve_center_x: f32,
    pub curve_center_y: f32,
    pub centerline_radius: f32,
    pub outer_radius: f32,
    pub inner_radius: f32,

    // Straight centerlines.
    pub top_straight_y: f32,
    pub bottom_straight_y: f32,

    // Road edges along the straights.
    pub top_outer_y: f32,
    pub top_inner_y: f32,
    pub bottom_outer_y: f32,
    pub bottom_inner_y: f32,

    pub finish: FinishLine,
}

impl TrackGeometry {
    pub fn resolve(params: &TrackParams) -> Self {
        let width = params.canvas_width;
        let height = width * 9.0 / 16.0;
        let half_width = params.road_thickness / 2.0;
        let center_y = height / 2.0;

        let centerline_radius = height * params.curve_radius_fraction;
        // Shrinking canvases clamp to the minimum straight, which can push the track off-center.
        let min_straight = width * params.min_straight_fraction;
        let straight_length = min_straight.max(
            width - 2.0 * centerline_radius - 2.0 * half_width - width * params.margin_fraction,
        );

        let full_width = straight_length + 2.0 * centerline_radius;
        let offset_x = (width - full_width) / 2.0;
        let left_curve_center_x = offset_x + centerline_radius;
        let right_curve_center_x = left_curve_center_x + straight_length;
        let top_straight_y = center_y - centerline_radius;
        let bottom_straight_y = center_y + centerline_radius;

        Self {
            canvas_width: width,
            canvas_height: height,
            road_half_width: half_width,
            straight_length,
            left_curve_center_x,
            right_curve_center_x,
            curve_center_y: center_y,
            centerline_radius,
            outer_radius: centerline_radius + half_width,
            inner_radius: (centerline_radius - half_width).max(0.0),
            top_straight_y,
            bottom_straight_y,
            top_outer_y: top_straight_y - half_width,
            top_inner_y: top_straight_y + half_width,
            bottom_outer_y: bottom_straight_y + half_width,
            bottom_inner_y: bottom_straight_y - half_width,
            finish: FinishLine {
                x: left_curve_center_x + straight_length / 4.0,
                y_min: bottom_straight_y - half_width,
                y_max: bottom_straight_y + half_width,
                direction: 1.0,
            },
        }
    }

    pub fn region_of(&self, x: f32) -> TrackRegion {
        if x < self.left_curve_center_x {
            TrackRegion::LeftCurve
        } else if x > self.right_curve_center_x {
            TrackRegion::RightCurve
        } else {
            TrackRegion::Straight
        }
    }

    /// Center of the curve for a curve region; `None` on the straights.
    pub fn curve_center(&self, region: TrackRegion) -> Option<(f32, f32)> {
        match region {
            TrackRegion::LeftCurve => Some((self.left_curve_center_x, self.curve_center_y)),
            TrackRegion::RightCurve => Some((self.right_curve_center_x, self.curve_center_y)),
            TrackRegion::Straight => None,
        }
    }

    /// Point on the curve centerline at the same angle (around the curve center) as `(x, y)`.
    pub fn nearest_centerline_point(&self, region: TrackRegion, x: f32, y: f32) -> Option<(f32, f32)> {
        let (cx, cy) = self.curve_center(region)?;
        let angle = (y - cy).atan2(x - cx);
        Some((
            cx + angle.cos() * self.centerline_radius,
            cy + angle.sin() * self.centerline_radius,
        ))
    }
}

impl Default for TrackGeometry {
    fn default() -> Self {
        Self::resolve(&TrackParams::default())
    }
}
