//! Plugin registry: ordered loading and process-lifetime ownership.

use std::path::Path;

use tracing::info;

use crate::error::{ChassisError, Result};
use crate::options::OptionSpace;
use crate::paths;

use super::loader::{DynamicModuleLoader, ModuleLoader};
use super::types::Plugin;

/// Owns every loaded plugin for the life of the process.
///
/// Plugins are loaded strictly in the order named and never unloaded
/// individually; the registry is the sole release point, at process
/// shutdown. The load order doubles as the option-merge order, so the same
/// plugin list always produces the same configuration surface.
pub struct PluginRegistry {
    plugins: Vec<Plugin>,
    loader: Box<dyn ModuleLoader>,
}

impl PluginRegistry {
    /// Registry over the real shared-library loader.
    pub fn new() -> Self {
        Self::with_loader(Box::new(DynamicModuleLoader))
    }

    /// Registry over a caller-supplied loader. Tests inject in-process
    /// stubs here.
    pub fn with_loader(loader: Box<dyn ModuleLoader>) -> Self {
        Self {
            plugins: Vec::new(),
            loader,
        }
    }

    /// Load every named plugin from `plugin_dir`, in order.
    ///
    /// Empty names are skipped: a user-supplied `--plugins=admin,` yields a
    /// trailing empty element that will never load. Loading is sequential
    /// because plugin initializers may depend on plugins listed earlier.
    ///
    /// The first failure aborts the whole operation with the failing
    /// plugin's name. Already-loaded plugins stay resident; this path is
    /// process-fatal and the host exits rather than continue with a
    /// partial set, so nothing is rolled back.
    pub fn load_all(&mut self, names: &[String], plugin_dir: &Path) -> Result<()> {
        for name in names {
            if name.is_empty() {
                continue;
            }

            let filename = paths::plugin_filename(plugin_dir, name);
            let handle = self.loader.load(&filename).map_err(|e| {
                let reason = match e {
                    ChassisError::PluginLoad { reason, .. } => {
                        format!("{}: {}", filename.display(), reason)
                    }
                    other => other.to_string(),
                };
                ChassisError::PluginLoad {
                    name: name.clone(),
                    reason,
                }
            })?;

            let plugin = Plugin::new(handle);
            if self.plugins.iter().any(|p| p.name() == plugin.name()) {
                return Err(ChassisError::PluginLoad {
                    name: name.clone(),
                    reason: format!("a plugin named '{}' is already loaded", plugin.name()),
                });
            }
            self.plugins.push(plugin);
        }

        info!(count = self.plugins.len(), "Plugin loading complete");
        Ok(())
    }

    /// The loaded plugins, in load order.
    pub fn plugins(&self) -> &[Plugin] {
        &self.plugins
    }

    /// Number of loaded plugins.
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// Whether no plugin is loaded.
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Plugin names, in load order.
    pub fn names(&self) -> Vec<&str> {
        self.plugins.iter().map(|p| p.name()).collect()
    }

    /// Run every plugin's init hook against the finalized option space, in
    /// load order.
    pub fn init_all(&mut self, space: &OptionSpace) -> Result<()> {
        for plugin in &mut self.plugins {
            let name = plugin.name().to_string();
            plugin.init(space).map_err(|e| ChassisError::PluginLoad {
                name,
                reason: format!("init failed: {}", e),
            })?;
        }
        Ok(())
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for PluginRegistry {
    /// Teardown in reverse load order. The module code itself stays mapped
    /// until the handles drop with the registry, at process exit.
    fn drop(&mut self) {
        for plugin in self.plugins.iter_mut().rev() {
            plugin.teardown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::loader::PluginHandle;
    use crate::plugins::types::ServicePlugin;
    use std::cell::RefCell;
    use std::path::PathBuf;
    use std::rc::Rc;

    struct StubPlugin {
        name: String,
    }

    impl ServicePlugin for StubPlugin {
        fn name(&self) -> &str {
            &self.name
        }

        fn init(&mut self, _space: &OptionSpace) -> Result<()> {
            Ok(())
        }
    }

    /// Loader that fabricates plugins from the requested filename and
    /// records every load attempt.
    struct StubLoader {
        attempts: Rc<RefCell<Vec<PathBuf>>>,
        fail_on: Option<String>,
    }

    impl StubLoader {
        fn new(fail_on: Option<&str>) -> (Self, Rc<RefCell<Vec<PathBuf>>>) {
            let attempts = Rc::new(RefCell::new(Vec::new()));
            (
                Self {
                    attempts: Rc::clone(&attempts),
                    fail_on: fail_on.map(str::to_string),
                },
                attempts,
            )
        }

        fn plugin_name(path: &Path) -> String {
            let convention = paths::platform_convention();
            path.file_stem()
                .and_then(|stem| stem.to_str())
                .and_then(|stem| stem.strip_prefix(convention.module_prefix))
                .unwrap_or("unknown")
                .to_string()
        }
    }

    impl ModuleLoader for StubLoader {
        fn load(&mut self, path: &Path) -> Result<PluginHandle> {
            self.attempts.borrow_mut().push(path.to_path_buf());

            let name = Self::plugin_name(path);
            if self.fail_on.as_deref() == Some(name.as_str()) {
                return Err(ChassisError::PluginLoad {
                    name: path.display().to_string(),
                    reason: "stub failure".to_string(),
                });
            }

            Ok(PluginHandle::from_instance(Box::new(StubPlugin { name })))
        }
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_load_order_is_input_order() {
        let (loader, _) = StubLoader::new(None);
        let mut registry = PluginRegistry::with_loader(Box::new(loader));

        registry
            .load_all(&names(&["admin", "proxy", "debug"]), Path::new("/opt/plugins"))
            .unwrap();

        assert_eq!(registry.names(), ["admin", "proxy", "debug"]);
    }

    #[test]
    fn test_empty_names_are_skipped() {
        let (loader, attempts) = StubLoader::new(None);
        let mut registry = PluginRegistry::with_loader(Box::new(loader));

        registry
            .load_all(&names(&["admin", ""]), Path::new("/opt/plugins"))
            .unwrap();

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.names(), ["admin"]);
        // Exactly one load attempt, for the conventional filename.
        let attempts = attempts.borrow();
        assert_eq!(attempts.len(), 1);
        assert_eq!(
            attempts[0],
            paths::plugin_filename(Path::new("/opt/plugins"), "admin")
        );
    }

    #[test]
    fn test_first_failure_aborts_without_rollback() {
        let (loader, attempts) = StubLoader::new(Some("proxy"));
        let mut registry = PluginRegistry::with_loader(Box::new(loader));

        let result = registry.load_all(
            &names(&["admin", "proxy", "debug"]),
            Path::new("/opt/plugins"),
        );

        let err = result.unwrap_err();
        assert!(matches!(&err, ChassisError::PluginLoad { name, .. } if name == "proxy"));

        // The later-listed plugin was never attempted, and the plugin
        // loaded before the failure stays resident.
        assert_eq!(attempts.borrow().len(), 2);
        assert_eq!(registry.names(), ["admin"]);
    }

    #[test]
    fn test_duplicate_plugin_name_rejected() {
        let (loader, _) = StubLoader::new(None);
        let mut registry = PluginRegistry::with_loader(Box::new(loader));

        let result = registry.load_all(&names(&["admin", "admin"]), Path::new("/opt/plugins"));
        assert!(matches!(result, Err(ChassisError::PluginLoad { .. })));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_load_error_names_the_plugin_and_path() {
        let mut registry = PluginRegistry::new();
        let result = registry.load_all(&names(&["admin"]), Path::new("/nonexistent"));

        let err = result.unwrap_err();
        let message = err.to_string();
        assert!(message.contains("admin"));
        assert!(message.contains("nonexistent"));
    }
}
