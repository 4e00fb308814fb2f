//! Configuration file permission checks.

use std::path::Path;

use crate::error::{ChassisError, Result};

/// Reject configuration files that other users can modify.
///
/// A group- or world-writable defaults file lets another local user inject
/// options into the host, so loading fails closed. On platforms without
/// unix mode bits the check is a no-op.
pub fn check_permissions(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        let metadata = std::fs::metadata(path).map_err(|e| {
            ChassisError::ConfigFile(format!("cannot stat {}: {}", path.display(), e))
        })?;

        let mode = metadata.permissions().mode();
        if mode & 0o022 != 0 {
            return Err(ChassisError::ConfigFile(format!(
                "{} is group- or world-writable (mode 0{:o}); refusing to load",
                path.display(),
                mode & 0o777
            )));
        }
    }

    #[cfg(not(unix))]
    let _ = path;

    Ok(())
}
