//! Shared-library module loading.

use std::path::Path;

use libloading::Library;
use tracing::info;

use crate::error::{ChassisError, Result};

use super::types::{PluginEntryFn, ServicePlugin, PLUGIN_ENTRY_SYMBOL};

/// Opaque handle to a loaded module.
///
/// Field order matters: the capability object must drop before the library
/// that provides its code is unmapped.
pub struct PluginHandle {
    pub(crate) instance: Box<dyn ServicePlugin>,
    _library: Option<Library>,
}

impl PluginHandle {
    /// Handle over an in-process plugin instance with no library to keep
    /// alive. Used by statically linked plugins and by tests.
    pub fn from_instance(instance: Box<dyn ServicePlugin>) -> Self {
        Self {
            instance,
            _library: None,
        }
    }
}

/// Loads a single module from a filesystem path.
///
/// The registry drives this through the trait so tests can substitute an
/// in-process implementation and exercise ordering and failure paths
/// without real shared objects on disk.
pub trait ModuleLoader {
    fn load(&mut self, path: &Path) -> Result<PluginHandle>;
}

/// Loader for real shared-library plugins.
#[derive(Debug, Default)]
pub struct DynamicModuleLoader;

impl ModuleLoader for DynamicModuleLoader {
    /// Load the shared object at `path` and resolve its entry point.
    ///
    /// The module's static initializers run during the load, so a
    /// misbehaving plugin can take the host down with it. Plugins are
    /// first-party and vetted at install time; no sandboxing is attempted
    /// and this is not a security boundary.
    fn load(&mut self, path: &Path) -> Result<PluginHandle> {
        if !path.exists() {
            return Err(load_error(
                path,
                "file not found (setting --plugin-dir=<dir> might help)",
            ));
        }

        // SAFETY: loading foreign code is inherently unsafe. The entry
        // symbol must match `PluginEntryFn` and the module must be built
        // against the same ABI as the host.
        unsafe {
            let library = Library::new(path)
                .map_err(|e| load_error(path, &format!("not a loadable module: {}", e)))?;

            let entry: libloading::Symbol<PluginEntryFn> =
                library.get(PLUGIN_ENTRY_SYMBOL.as_bytes()).map_err(|e| {
                    load_error(
                        path,
                        &format!("missing entry point '{}': {}", PLUGIN_ENTRY_SYMBOL, e),
                    )
                })?;

            let raw = entry();
            if raw.is_null() {
                return Err(load_error(path, "entry point returned null"));
            }
            let instance: Box<dyn ServicePlugin> = Box::from_raw(raw);
            if instance.name().is_empty() {
                return Err(load_error(path, "plugin reported an empty name"));
            }

            info!(plugin = %instance.name(), path = %path.display(), "Loaded plugin module");

            Ok(PluginHandle {
                instance,
                _library: Some(library),
            })
        }
    }
}

fn load_error(path: &Path, reason: &str) -> ChassisError {
    ChassisError::PluginLoad {
        name: path.display().to_string(),
        reason: reason.to_string(),
    }
}
