//! # Piecewise linear path provider
//!
//! Generates a path from a list of axis-aligned segments, with every interior
//! corner replaced by a circular quarter-turn arc so the dog never has to stop
//! and pivot. The arc-length parameterisation is exact: a fixed speed along
//! the rounded path gives a fixed speed through the corners too.
//!
//! Segments must be axis-aligned unit directions and consecutive segments must
//! be perpendicular, with every interior segment at least twice the rounding
//! radius long. [`SegmentSource`] implementations are expected to uphold this,
//! [`PiecewiseLinearPath::init`] checks it in debug builds.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::Vector2;
use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

use walk_if::geom::{Frame, TimedPose};

use super::{PathParams, PathProvider};

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Produces the segment list for a piecewise linear path shape.
pub trait SegmentSource: Send {
    fn segments(&self) -> Vec<Segment>;
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A straight leg of the path, a unit direction and a length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    /// Unit direction of travel, axis aligned
    pub direction: Vector2<f64>,

    /// Length of the leg
    pub length_m: f64,
}

/// Piecewise linear path with rounded corners.
pub struct PiecewiseLinearPath<S> {
    source: S,
    velocity_ms: f64,
    rounding_m: f64,
    origin_offset: Vector2<f64>,
    segments: Vec<Segment>,
    total_length_m: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Segment {
    pub fn pos_x(length_m: f64) -> Self {
        Self {
            direction: Vector2::new(1.0, 0.0),
            length_m,
        }
    }

    pub fn neg_x(length_m: f64) -> Self {
        Self {
            direction: Vector2::new(-1.0, 0.0),
            length_m,
        }
    }

    pub fn pos_y(length_m: f64) -> Self {
        Self {
            direction: Vector2::new(0.0, 1.0),
            length_m,
        }
    }

    pub fn neg_y(length_m: f64) -> Self {
        Self {
            direction: Vector2::new(0.0, -1.0),
            length_m,
        }
    }
}

impl<S: SegmentSource> PiecewiseLinearPath<S> {
    pub fn new(source: S, params: &PathParams) -> Self {
        Self {
            source,
            velocity_ms: params.velocity_ms,
            rounding_m: params.rounding_distance_m,
            origin_offset: Vector2::new(params.origin_offset_x_m, 0.0),
            segments: Vec::new(),
            total_length_m: 0.0,
        }
    }

    /// Walk the segment list to the given arc distance from the start.
    ///
    /// Distances at or beyond the total length resolve to the final vertex, so
    /// late queries hold the dog at the end of the walk.
    fn position_at_distance(&self, distance_m: f64) -> Vector2<f64> {
        let r = self.rounding_m;
        let mut distance = distance_m;
        let mut result = Vector2::zeros();

        if distance >= self.total_length_m {
            for seg in &self.segments {
                result += seg.direction * seg.length_m;
            }
            return result;
        }

        let last = self.segments.len() - 1;

        // (segment index, true if in the first half of the rounding zone)
        let mut rounding: Option<(usize, bool)> = None;

        for (i, seg) in self.segments.iter().enumerate() {
            if distance > seg.length_m {
                result += seg.direction * seg.length_m;
                distance -= seg.length_m;
            } else {
                if seg.length_m - distance < r && i != last {
                    // Approaching the corner, stop where the arc begins
                    result += seg.direction * (seg.length_m - r);
                    rounding = Some((i, true));
                } else if distance < r && i != 0 {
                    // Leaving the previous corner, stop where the arc ends
                    result += seg.direction * r;
                    rounding = Some((i, false));
                } else {
                    result += seg.direction * distance;
                }
                break;
            }
        }

        if let Some((i, first_half)) = rounding {
            let (center, ratio, dir_in, dir_out) = if first_half {
                (
                    result + self.segments[i + 1].direction * r,
                    1.0 - (self.segments[i].length_m - distance) / r,
                    self.segments[i].direction,
                    self.segments[i + 1].direction,
                )
            } else {
                (
                    result - self.segments[i - 1].direction * r,
                    distance / r,
                    self.segments[i - 1].direction,
                    self.segments[i].direction,
                )
            };

            // Each half of the rounding zone sweeps a pi/4 slice of the arc
            let mut a = ratio * FRAC_PI_4;
            if !first_half {
                a += FRAC_PI_4;
            }

            let (quadrant, clockwise) = corner_quadrant(&dir_in, &dir_out);
            if !clockwise {
                a = -a;
            }
            a += FRAC_PI_2 * quadrant as f64;

            result = Vector2::new(center.x + r * a.cos(), center.y - r * a.sin());
        }

        result
    }
}

impl<S: SegmentSource> PathProvider for PiecewiseLinearPath<S> {
    fn init(&mut self) {
        self.segments = self.source.segments();
        self.total_length_m = self.segments.iter().map(|s| s.length_m).sum();

        debug_assert!(self.segments.len() >= 2);
        debug_assert!(self.segments.windows(2).all(|w| {
            w[0].direction.dot(&w[1].direction).abs() < 1e-9
        }));
    }

    fn pose_at_time(&self, t_s: f64) -> TimedPose {
        let distance = self.velocity_ms * t_s.max(0.0);
        let point = self.position_at_distance(distance) + self.origin_offset;
        TimedPose::new_ground(point.x, point.y, 0.0, Frame::Map, t_s)
    }

    fn maximum_time_s(&self) -> f64 {
        self.total_length_m / self.velocity_ms
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Select the arc quadrant and handedness for a corner.
///
/// The quadrant fixes which quarter of the rounding circle the arc lives on,
/// the handedness is clockwise for right turns and counter-clockwise for left
/// turns, so the swept angle always advances with arc distance.
fn corner_quadrant(dir_in: &Vector2<f64>, dir_out: &Vector2<f64>) -> (u32, bool) {
    if dir_in.y > 0.0 {
        if dir_out.x > 0.0 {
            (2, true)
        } else {
            (0, false)
        }
    } else if dir_in.y < 0.0 {
        if dir_out.x > 0.0 {
            (2, false)
        } else {
            (0, true)
        }
    } else if dir_in.x > 0.0 {
        if dir_out.y > 0.0 {
            (1, false)
        } else {
            (3, true)
        }
    } else {
        if dir_out.y > 0.0 {
            (1, true)
        } else {
            (3, false)
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::path_provider::PathParams;

    struct SquareSource;

    impl SegmentSource for SquareSource {
        fn segments(&self) -> Vec<Segment> {
            vec![
                Segment::pos_x(5.0),
                Segment::pos_y(5.0),
                Segment::neg_x(5.0),
                Segment::neg_y(5.0),
            ]
        }
    }

    fn square_path() -> PiecewiseLinearPath<SquareSource> {
        let mut path = PiecewiseLinearPath::new(SquareSource, &PathParams::default());
        path.init();
        path
    }

    #[test]
    fn test_duration_is_length_over_velocity() {
        let path = square_path();
        assert!((path.maximum_time_s() - 20.0 / 0.125).abs() < 1e-9);
    }

    #[test]
    fn test_start_point_is_offset_origin() {
        let path = square_path();
        let pose = path.pose_at_time(0.0);
        assert!((pose.position_m.x - 1.0).abs() < 1e-9);
        assert!(pose.position_m.y.abs() < 1e-9);
    }

    #[test]
    fn test_negative_time_clamps_to_start() {
        let path = square_path();
        assert_eq!(
            path.pose_at_time(-3.0).position_m,
            path.pose_at_time(0.0).position_m
        );
    }

    #[test]
    fn test_late_query_holds_final_vertex() {
        let path = square_path();
        let end = path.pose_at_time(path.maximum_time_s() + 100.0);
        // The square closes on itself, so the final vertex is the start
        assert!((end.position_m.x - 1.0).abs() < 1e-9);
        assert!(end.position_m.y.abs() < 1e-9);
    }

    #[test]
    fn test_deterministic() {
        let path = square_path();
        let a = path.pose_at_time(12.3);
        let b = path.pose_at_time(12.3);
        assert_eq!(a.position_m, b.position_m);
    }

    #[test]
    fn test_fixed_speed_on_straight_leg() {
        let path = square_path();
        // Both samples are in the middle of the first leg, clear of rounding
        let p1 = path.pose_at_time(10.0).position_m;
        let p2 = path.pose_at_time(20.0).position_m;
        let dist = ((p2.x - p1.x).powi(2) + (p2.y - p1.y).powi(2)).sqrt();
        assert!((dist - 0.125 * 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_corner_midpoint() {
        let path = square_path();
        // Arc distance 5.0 is the apex of the first corner. With a rounding
        // radius of 1 the apex sits sqrt(2)/2 inside the corner vertex.
        let t = 5.0 / 0.125;
        let p = path.pose_at_time(t).position_m;
        let s = std::f64::consts::SQRT_2 / 2.0;
        assert!((p.x - (1.0 + 4.0 + s)).abs() < 1e-9);
        assert!((p.y - (1.0 - s)).abs() < 1e-9);
    }

    #[test]
    fn test_position_continuous_everywhere() {
        // Covers all four corner types of the closed square, including both
        // rounding zone boundaries of each
        let path = square_path();
        let dt = 0.05;
        let step_limit = 0.125 * dt * 1.5;

        let mut t = 0.0;
        let mut prev = path.pose_at_time(0.0).position_m;
        while t < path.maximum_time_s() {
            t += dt;
            let next = path.pose_at_time(t).position_m;
            let step = ((next.x - prev.x).powi(2) + (next.y - prev.y).powi(2)).sqrt();
            assert!(
                step <= step_limit,
                "discontinuity at t = {}: step = {}",
                t,
                step
            );
            prev = next;
        }
    }

    #[test]
    fn test_left_and_right_turn_corners_continuous() {
        // An S-shaped path exercises a left turn followed by a right turn
        struct SSource;
        impl SegmentSource for SSource {
            fn segments(&self) -> Vec<Segment> {
                vec![Segment::pos_x(4.0), Segment::pos_y(4.0), Segment::pos_x(4.0)]
            }
        }

        let mut path = PiecewiseLinearPath::new(SSource, &PathParams::default());
        path.init();

        let dt = 0.05;
        let step_limit = 0.125 * dt * 1.5;
        let mut t = 0.0;
        let mut prev = path.pose_at_time(0.0).position_m;
        while t < path.maximum_time_s() {
            t += dt;
            let next = path.pose_at_time(t).position_m;
            let step = ((next.x - prev.x).powi(2) + (next.y - prev.y).powi(2)).sqrt();
            assert!(step <= step_limit, "discontinuity at t = {}", t);
            prev = next;
        }
    }

    #[test]
    fn test_last_segment_end_not_rounded() {
        struct LSource;
        impl SegmentSource for LSource {
            fn segments(&self) -> Vec<Segment> {
                vec![Segment::pos_x(4.0), Segment::pos_y(4.0)]
            }
        }

        let mut path = PiecewiseLinearPath::new(LSource, &PathParams::default());
        path.init();

        // Just short of the end the path must run straight to the vertex
        let p = path.position_at_distance(7.9);
        assert!((p.x - 4.0).abs() < 1e-9);
        assert!((p.y - 3.9).abs() < 1e-9);
    }
}
