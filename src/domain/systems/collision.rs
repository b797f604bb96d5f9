// Wall detection against the oval's straights and curves.

use crate::domain::track::{TrackGeometry, TrackRegion};
use crate::domain::tuning::CarTuning;

/// Unit normal of the wall that was breached, pointing back onto the road.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WallHit {
    pub normal_x: f32,
    pub normal_y: f32,
}

/// Result of checking a prospective position against the track walls.
#[derive(Debug, Clone, Copy)]
pub struct Probe {
    /// Position after clamping onto the breached boundary (unchanged when no wall was hit).
    pub x: f32,
    pub y: f32,
    pub region: TrackRegion,
    pub hit: Option<WallHit>,
}

impl Probe {
    pub fn in_curve(&self) -> bool {
        self.region != TrackRegion::Straight
    }
}

/// Checks `(x, y)` against the walls of the region its X falls in. `speed` loosens the outer
/// curve wall slightly for slow cars so they can crawl back onto the road.
pub fn probe(track: &TrackGeometry, x: f32, y: f32, speed: f32, tuning: &CarTuning) -> Probe {
    let region = track.region_of(x);
    let mut out = Probe {
        x,
        y,
        region,
        hit: None,
    };

    match track.curve_center(region) {
        None => {
            let (clamped_y, normal_y) = if y < track.top_outer_y {
                (track.top_outer_y, 1.0)
            } else if y > track.top_inner_y && y < track.curve_center_y {
                (track.top_inner_y, -1.0)
            } else if y > track.bottom_outer_y {
                (track.bottom_outer_y, -1.0)
            } else if y < track.bottom_inner_y && y > track.curve_center_y {
                (track.bottom_inner_y, 1.0)
            } else {
                return out;
            };
            out.y = clamped_y;
            out.hit = Some(WallHit {
                normal_x: 0.0,
                normal_y,
            });
        }
        Some((cx, cy)) => {
            let dx = x - cx;
            let dy = y - cy;
            let dist_sq = dx * dx + dy * dy;

            let escape = if speed.abs() < tuning.curve_escape_speed {
                tuning.curve_escape_slow
            } else {
                tuning.curve_escape_fast
            };
            let effective_outer = track.outer_radius * escape;

            let (radius, outward) = if dist_sq > effective_outer * effective_outer {
                (track.outer_radius, false)
            } else if track.inner_radius > 0.0 && dist_sq < track.inner_radius * track.inner_radius {
                (track.inner_radius, true)
            } else {
                return out;
            };

            let dist = dist_sq.sqrt();
            let (ux, uy) = if dist > f32::EPSILON {
                (dx / dist, dy / dist)
            } else {
                // Dead center of a curve: push out sideways, away from the straights.
                match region {
                    TrackRegion::LeftCurve => (-1.0, 0.0),
                    _ => (1.0, 0.0),
                }
            };

            out.x = cx + ux * radius;
            out.y = cy + uy * radius;
            out.hit = Some(if outward {
                WallHit {
                    normal_x: ux,
                    normal_y: uy,
                }
            } else {
                WallHit {
                    normal_x: -ux,
                    normal_y: -uy,
                }
            });
        }
    }

    out
}
