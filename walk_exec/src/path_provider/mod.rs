//! # Path providers
//!
//! A path provider is a deterministic map from elapsed walk time to the dog's
//! planned position. The piecewise linear family traverses its geometry at a
//! fixed speed, so the shape alone determines the walk's duration, while the
//! lissajous curve is parameterised directly in time.
//!
//! Providers are selected by name through [`make_provider`], which is how the
//! executable turns its `path_type` parameter into a concrete generator.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod block_walk;
mod lissajous;
mod piecewise_linear;
mod random_walk;
mod rectangle;

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub use block_walk::BlockWalkSource;
pub use lissajous::LissajousPath;
pub use piecewise_linear::{PiecewiseLinearPath, Segment, SegmentSource};
pub use random_walk::RandomWalkSource;
pub use rectangle::RectangleSource;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use walk_if::geom::TimedPose;

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// A time-parameterised generator of the dog's planned path.
pub trait PathProvider: Send {
    /// Perform any one-off setup (segment generation, length integration).
    ///
    /// Must be called once before the first call to [`PathProvider::pose_at_time`].
    fn init(&mut self);

    /// Get the planned pose at `t_s` seconds into the walk.
    ///
    /// Total function: negative times map to the start of the path and times
    /// past [`PathProvider::maximum_time_s`] hold the final point.
    fn pose_at_time(&self, t_s: f64) -> TimedPose;

    /// The duration of the walk in seconds.
    fn maximum_time_s(&self) -> f64;
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// The available path shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathType {
    Lissajous,
    Rectangle,
    BlockWalk,
    RandomWalk,
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters shared by all path providers, plus the per-shape sections.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathParams {
    /// Which path shape to generate
    pub path_type: PathType,

    /// The dog's constant speed along the path
    pub velocity_ms: f64,

    /// Corner rounding radius for piecewise linear paths
    pub rounding_distance_m: f64,

    /// Offset applied to every generated point, moves the path away from the
    /// robot's start position
    pub origin_offset_x_m: f64,

    /// Lissajous shape parameters
    pub lissajous: lissajous::LissajousParams,

    /// Random walk shape parameters
    pub random_walk: random_walk::RandomWalkParams,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for PathParams {
    fn default() -> Self {
        Self {
            path_type: PathType::Lissajous,
            velocity_ms: 0.125,
            rounding_distance_m: 1.0,
            origin_offset_x_m: 1.0,
            lissajous: Default::default(),
            random_walk: Default::default(),
        }
    }
}

impl FromStr for PathType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lissajous" => Ok(PathType::Lissajous),
            "rectangle" => Ok(PathType::Rectangle),
            "block_walk" | "blockwalk" => Ok(PathType::BlockWalk),
            "random_walk" | "randomwalk" => Ok(PathType::RandomWalk),
            other => Err(format!("Unknown path type \"{}\"", other)),
        }
    }
}

impl std::fmt::Display for PathType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathType::Lissajous => write!(f, "lissajous"),
            PathType::Rectangle => write!(f, "rectangle"),
            PathType::BlockWalk => write!(f, "block_walk"),
            PathType::RandomWalk => write!(f, "random_walk"),
        }
    }
}

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Build the provider selected by `params.path_type`.
///
/// The returned provider has not been initialised, the caller must call
/// [`PathProvider::init`] before querying it.
pub fn make_provider(params: &PathParams) -> Box<dyn PathProvider> {
    match params.path_type {
        PathType::Lissajous => Box::new(LissajousPath::new(params)),
        PathType::Rectangle => Box::new(PiecewiseLinearPath::new(RectangleSource::new(), params)),
        PathType::BlockWalk => Box::new(PiecewiseLinearPath::new(BlockWalkSource::new(), params)),
        PathType::RandomWalk => Box::new(PiecewiseLinearPath::new(
            RandomWalkSource::new(params.random_walk.clone()),
            params,
        )),
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
