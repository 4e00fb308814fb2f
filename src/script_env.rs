//! Environment setup for the embedded scripting runtime.
//!
//! The scripting engine reads its search paths from `LUA_PATH` and
//! `LUA_CPATH` rather than from our configuration, so the bootstrap writes
//! them into the process environment before the runtime starts.
//! Precedence: an explicit option wins, then a pre-existing environment
//! value, then a default derived from the base directory.
//!
//! Every write is verified by reading the variable back. A mismatch means
//! the runtime would observe a different value than the one configured; it
//! is logged but does not abort startup, the sole non-fatal inconsistency
//! in the bootstrap.

use std::env;
use std::path::Path;

use tracing::{error, info};

use crate::paths;

/// Environment variable naming the script search path.
pub const SCRIPT_PATH_VAR: &str = "LUA_PATH";

/// Environment variable naming the native-extension search path.
pub const NATIVE_PATH_VAR: &str = "LUA_CPATH";

/// Initialize the script search path.
pub fn init_script_path(set_path: Option<&str>, base_dir: &Path, prog: &str) {
    init_search_var(SCRIPT_PATH_VAR, set_path, || {
        paths::default_script_path(base_dir, prog)
            .display()
            .to_string()
    });
}

/// Initialize the native-extension search path.
pub fn init_native_path(set_path: Option<&str>, base_dir: &Path, prog: &str) {
    init_search_var(NATIVE_PATH_VAR, set_path, || {
        paths::default_module_path(base_dir, prog)
            .display()
            .to_string()
    });
}

fn init_search_var(key: &str, set_path: Option<&str>, default: impl FnOnce() -> String) {
    if let Some(value) = set_path {
        set_env_checked(key, value);
    } else if env::var_os(key).is_none() {
        let value = default();
        info!(key, value = %value, "Derived default search path");
        set_env_checked(key, &value);
    }
}

/// Set `key` and verify the write by reading it back.
fn set_env_checked(key: &str, value: &str) {
    env::set_var(key, value);

    match env::var(key) {
        Ok(read_back) if read_back == value => {}
        Ok(read_back) => error!(
            key,
            wrote = value,
            read = %read_back,
            "Environment write verification failed"
        ),
        Err(e) => error!(
            key,
            wrote = value,
            "Environment write verification failed: {}",
            e
        ),
    }
}
