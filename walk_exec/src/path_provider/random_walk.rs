//! Random walk path shape.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::{Segment, SegmentSource};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters for the random walk shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RandomWalkParams {
    /// Seed for the leg generator. Walks with equal seeds are identical.
    pub seed: u64,

    /// Number of legs to generate
    pub num_legs: usize,

    /// Minimum leg length. Must be at least twice the rounding radius.
    pub min_leg_m: f64,

    /// Maximum leg length
    pub max_leg_m: f64,
}

/// A seeded random circuit of alternating X and Y legs.
///
/// Alternating the axes keeps consecutive legs perpendicular, so the rounding
/// geometry always holds regardless of the seed.
pub struct RandomWalkSource {
    params: RandomWalkParams,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for RandomWalkParams {
    fn default() -> Self {
        Self {
            seed: 17,
            num_legs: 12,
            min_leg_m: 2.5,
            max_leg_m: 6.0,
        }
    }
}

impl RandomWalkSource {
    pub fn new(params: RandomWalkParams) -> Self {
        Self { params }
    }
}

impl SegmentSource for RandomWalkSource {
    fn segments(&self) -> Vec<Segment> {
        let mut rng = StdRng::seed_from_u64(self.params.seed);
        let mut segments = Vec::with_capacity(self.params.num_legs);

        for leg in 0..self.params.num_legs {
            let length_m = rng.gen_range(self.params.min_leg_m..self.params.max_leg_m);
            let positive = rng.gen_bool(0.5);

            let segment = match (leg % 2 == 0, positive) {
                (true, true) => Segment::pos_x(length_m),
                (true, false) => Segment::neg_x(length_m),
                (false, true) => Segment::pos_y(length_m),
                (false, false) => Segment::neg_y(length_m),
            };
            segments.push(segment);
        }

        segments
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_same_seed_same_walk() {
        let params = RandomWalkParams::default();
        let a = RandomWalkSource::new(params.clone()).segments();
        let b = RandomWalkSource::new(params).segments();
        assert_eq!(a, b);
    }

    #[test]
    fn test_different_seed_different_walk() {
        let a = RandomWalkSource::new(RandomWalkParams::default()).segments();
        let b = RandomWalkSource::new(RandomWalkParams {
            seed: 18,
            ..Default::default()
        })
        .segments();
        assert_ne!(a, b);
    }

    #[test]
    fn test_legs_alternate_axes_within_bounds() {
        let params = RandomWalkParams::default();
        let segments = RandomWalkSource::new(params.clone()).segments();

        assert_eq!(segments.len(), params.num_legs);

        for pair in segments.windows(2) {
            assert!(pair[0].direction.dot(&pair[1].direction).abs() < 1e-9);
        }
        for seg in &segments {
            assert!(seg.length_m >= params.min_leg_m);
            assert!(seg.length_m < params.max_leg_m);
        }
    }
}
