//! Block walk path shape.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use super::{Segment, SegmentSource};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// An irregular closed circuit, like walking the dog around the block.
///
/// A fixed shape with both left and right turns, useful for exercising the
/// corner rounding in both directions.
pub struct BlockWalkSource;

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl BlockWalkSource {
    pub fn new() -> Self {
        Self
    }
}

impl Default for BlockWalkSource {
    fn default() -> Self {
        Self::new()
    }
}

impl SegmentSource for BlockWalkSource {
    fn segments(&self) -> Vec<Segment> {
        vec![
            Segment::pos_x(6.0),
            Segment::pos_y(4.0),
            Segment::neg_x(2.0),
            Segment::pos_y(3.0),
            Segment::neg_x(4.0),
            Segment::neg_y(7.0),
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
    fn test_closed_loop_of_perpendicular_legs() {
        let segments = BlockWalkSource::new().segments();

        let end: nalgebra::Vector2<f64> = segments
            .iter()
            .map(|s| s.direction * s.length_m)
            .sum();
        assert!(end.norm() < 1e-9);

        for pair in segments.windows(2) {
            assert!(pair[0].direction.dot(&pair[1].direction).abs() < 1e-9);
        }
    }
}
