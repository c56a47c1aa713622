//! Executable-level parameters.
//!
//! All module parameter sections live in a single `walk_exec.toml` file, any
//! section or key left out of the file falls back to its default.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::coord_action::CoordActionParams;
use crate::leash_ctrl::LeashCtrlParams;
use crate::path_provider::PathParams;
use crate::path_scorer::PathScorerParams;
use crate::path_server::PathServerParams;
use crate::sim::SimWorldParams;
use crate::walk_driver::WalkDriverParams;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters for the walk executable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkExecParams {
    /// Sample spacing used when saving the planned path to the session
    pub planned_path_increment_s: PlannedPathIncrement,

    pub path: PathParams,
    pub path_server: PathServerParams,
    pub leash_ctrl: LeashCtrlParams,
    pub coord_action: CoordActionParams,
    pub walk_driver: WalkDriverParams,
    pub path_scorer: PathScorerParams,
    pub sim: SimWorldParams,
}

/// Newtype so the increment has a sensible default.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlannedPathIncrement(pub f64);

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for PlannedPathIncrement {
    fn default() -> Self {
        Self(1.0)
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_empty_file_gives_defaults() {
        let params: WalkExecParams = toml::from_str("").unwrap();
        assert!((params.leash_ctrl.leash_length_m - 2.0).abs() < 1e-12);
        assert!((params.walk_driver.cycle_period_s - 0.25).abs() < 1e-12);
        assert!(!params.walk_driver.solo_mode);
    }

    #[test]
    fn test_partial_file_overrides() {
        let params: WalkExecParams = toml::from_str(
            r#"
            [path]
            path_type = "block_walk"
            velocity_ms = 0.25

            [leash_ctrl]
            leash_length_m = 3.0
            "#,
        )
        .unwrap();

        assert_eq!(
            params.path.path_type,
            crate::path_provider::PathType::BlockWalk
        );
        assert!((params.path.velocity_ms - 0.25).abs() < 1e-12);
        assert!((params.leash_ctrl.leash_length_m - 3.0).abs() < 1e-12);
        // Untouched sections keep their defaults
        assert!((params.path_server.shift_distance_m - 0.6).abs() < 1e-12);
    }
}
