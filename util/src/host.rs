//! Host platform utility functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::env;
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Name of the environment variable giving the software root directory.
pub const SW_ROOT_ENV_VAR: &str = "BUGGY_SW_ROOT";

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Get the root directory of the buggy software.
///
/// The root is taken from the `BUGGY_SW_ROOT` environment variable if it is
/// set, otherwise the current working directory is used. Parameter files and
/// session directories are resolved relative to this root.
pub fn get_sw_root() -> std::io::Result<PathBuf> {
    match env::var(SW_ROOT_ENV_VAR) {
        Ok(root) => Ok(PathBuf::from(root)),
        Err(_) => env::current_dir(),
    }
}
