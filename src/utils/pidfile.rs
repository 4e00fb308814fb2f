//! PID file management for single-instance enforcement.
//!
//! When `--pid-file` is configured the bootstrap writes the process ID to
//! the named file and removes it again at shutdown. This is an advisory
//! mechanism: it catches the common case of accidentally starting a second
//! host instance, not every scenario (a crashed process leaves a stale
//! file behind, which is detected and cleaned up on the next start).

use std::fs;
use std::path::PathBuf;

use tracing::warn;

use crate::error::{ChassisError, Result};

/// PID file guard that cleans up on drop.
#[derive(Debug)]
pub struct PidFileGuard {
    path: PathBuf,
}

impl PidFileGuard {
    /// Write the current PID to `path`, guarding against a second live
    /// instance.
    ///
    /// Fails if the file names a process that is still running. A stale
    /// file left by a dead process is removed and replaced.
    pub fn acquire(path: PathBuf) -> Result<Self> {
        if path.exists() {
            match fs::read_to_string(&path) {
                Ok(content) => {
                    if let Ok(pid) = content.trim().parse::<u32>() {
                        if is_process_running(pid) {
                            return Err(ChassisError::Environment(format!(
                                "already running with PID {}; remove {} if this is wrong",
                                pid,
                                path.display()
                            )));
                        }
                        warn!(pid, path = %path.display(), "Removing stale PID file");
                        let _ = fs::remove_file(&path);
                    }
                }
                Err(e) => {
                    warn!(path = %path.display(), "Unreadable PID file ({}); assuming stale", e);
                    let _ = fs::remove_file(&path);
                }
            }
        }

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        fs::write(&path, std::process::id().to_string())?;

        Ok(Self { path })
    }

    /// The guarded file's path.
    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl Drop for PidFileGuard {
    fn drop(&mut self) {
        // Best effort; nothing to do about a failure at shutdown.
        if let Err(e) = fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), "Failed to remove PID file: {}", e);
        }
    }
}

/// Best-effort liveness check via the /proc filesystem.
///
/// On platforms without /proc the check reports not-running, which lets a
/// stale file be replaced; the trade-off is accepted to avoid
/// platform-specific process APIs.
fn is_process_running(pid: u32) -> bool {
    std::path::Path::new(&format!("/proc/{}", pid)).exists()
}
