//! Host environment functions

use std::path::PathBuf;

/// Get the root directory of the software from the `DOG_WALK_SW_ROOT`
/// environment variable.
pub fn get_walk_sw_root() -> Result<PathBuf, std::env::VarError> {
    Ok(PathBuf::from(std::env::var("DOG_WALK_SW_ROOT")?))
}
