//! Installation path resolution.
//!
//! Computes the process's base directory and derives the default search
//! paths for scripts, native extension modules, and plugin binaries from
//! it. Everything here is pure string/path construction except
//! [`resolve_base_dir`], which may consult the running executable's
//! location.

use std::env;
use std::path::{Path, PathBuf};

use crate::error::{ChassisError, Result};

/// Platform-specific naming conventions for loadable modules.
///
/// Selected once at startup so the rest of the subsystem stays
/// platform-agnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformConvention {
    /// Filename prefix for plugin binaries. `lib` on unix-like systems;
    /// `plugin-` on windows, where plugins share `bin/` with everything
    /// else and need the prefix to avoid name clashes.
    pub module_prefix: &'static str,

    /// Shared-library filename extension, without the dot.
    pub module_suffix: &'static str,
}

/// The naming convention for the current platform.
pub const fn platform_convention() -> PlatformConvention {
    if cfg!(target_os = "windows") {
        PlatformConvention {
            module_prefix: "plugin-",
            module_suffix: "dll",
        }
    } else if cfg!(target_os = "macos") {
        PlatformConvention {
            module_prefix: "lib",
            module_suffix: "dylib",
        }
    } else {
        PlatformConvention {
            module_prefix: "lib",
            module_suffix: "so",
        }
    }
}

/// Resolve the installation base directory.
///
/// An explicitly supplied directory must be absolute; a relative value is a
/// fatal configuration error. Without an explicit value the directory is
/// derived from the running executable's location: the parent of its
/// containing `bin` directory. Deriving it up front is necessary for
/// finding files later, when daemonizing has changed the working
/// directory.
pub fn resolve_base_dir(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(dir) = explicit {
        if !dir.is_absolute() {
            return Err(ChassisError::InvalidConfig(format!(
                "--basedir must be an absolute path, but was {}",
                dir.display()
            )));
        }
        return Ok(dir.to_path_buf());
    }

    let exe = env::current_exe().map_err(|e| {
        ChassisError::Environment(format!("cannot locate the running executable: {}", e))
    })?;
    let exe_dir = exe.parent().ok_or_else(|| {
        ChassisError::Environment(format!(
            "executable path {} has no parent directory",
            exe.display()
        ))
    })?;

    // Installed layout is <base>/bin/<prog>; anything else (cargo target
    // dirs, bare checkouts) uses the executable's own directory.
    let base = if exe_dir.file_name().map(|n| n == "bin").unwrap_or(false) {
        exe_dir.parent().unwrap_or(exe_dir)
    } else {
        exe_dir
    };

    if !base.is_absolute() {
        return Err(ChassisError::Environment(format!(
            "derived base directory {} is not absolute",
            base.display()
        )));
    }

    Ok(base.to_path_buf())
}

/// Default search path for the embedded scripting runtime (`LUA_PATH`).
pub fn default_script_path(base_dir: &Path, prog: &str) -> PathBuf {
    base_dir.join("lib").join(prog).join("lua").join("?.lua")
}

/// Default search path for the runtime's native extensions (`LUA_CPATH`).
pub fn default_module_path(base_dir: &Path, prog: &str) -> PathBuf {
    let suffix = platform_convention().module_suffix;
    if cfg!(target_os = "windows") {
        base_dir.join("bin").join(format!("lua-?.{}", suffix))
    } else {
        base_dir
            .join("lib")
            .join(prog)
            .join("lua")
            .join(format!("?.{}", suffix))
    }
}

/// Default directory holding plugin binaries.
pub fn default_plugin_dir(base_dir: &Path, prog: &str) -> PathBuf {
    if cfg!(target_os = "windows") {
        base_dir.join("bin")
    } else {
        base_dir.join("lib").join(prog).join("plugins")
    }
}

/// Expected filename of the plugin `name` inside `plugin_dir`, per the
/// platform naming convention.
pub fn plugin_filename(plugin_dir: &Path, name: &str) -> PathBuf {
    let convention = platform_convention();
    plugin_dir.join(format!(
        "{}{}.{}",
        convention.module_prefix, name, convention.module_suffix
    ))
}
