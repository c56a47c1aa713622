//! Rectangle path shape.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use super::{Segment, SegmentSource};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A closed rectangle, walked counter-clockwise from its lower-left corner.
pub struct RectangleSource {
    width_m: f64,
    height_m: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl RectangleSource {
    pub fn new() -> Self {
        Self {
            width_m: 6.0,
            height_m: 4.0,
        }
    }
}

impl Default for RectangleSource {
    fn default() -> Self {
        Self::new()
    }
}

impl SegmentSource for RectangleSource {
    fn segments(&self) -> Vec<Segment> {
        vec![
            Segment::pos_x(self.width_m),
            Segment::pos_y(self.height_m),
            Segment::neg_x(self.width_m),
            Segment::neg_y(self.height_m),
        ]
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_closed_loop() {
        let segments = RectangleSource::new().segments();
        let end: nalgebra::Vector2<f64> = segments
            .iter()
            .map(|s| s.direction * s.length_m)
            .sum();
        assert!(end.norm() < 1e-9);
    }
}
