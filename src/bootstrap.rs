//! Startup orchestration.
//!
//! Drives the full bootstrap sequence, strictly single-threaded, before
//! any service loop begins:
//!
//! 1. parse the base (pre-plugin) options leniently,
//! 2. handle `--version`,
//! 3. open and overlay the optional defaults file,
//! 4. resolve the base directory and the scripting-runtime environment,
//! 5. load the requested plugins in order,
//! 6. merge each plugin's option group (re-parse, overlay, normalize
//!    paths) in load order,
//! 7. reject anything the final option space does not recognize,
//! 8. run plugin init hooks and acquire the PID file.
//!
//! Every failure is startup-fatal; the caller terminates with a non-zero
//! status. The finalized [`Chassis`] is handed to the service loop
//! read-only.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::ConfigFile;
use crate::error::Result;
use crate::options::{
    resolve_paths, OptionDescriptor, OptionGroup, OptionSpace, ParseMode,
};
use crate::paths;
use crate::plugins::{DynamicModuleLoader, ModuleLoader, PluginRegistry};
use crate::script_env;
use crate::utils::pidfile::PidFileGuard;

/// Name of the base option group. Doubles as the config-file section every
/// option is overlaid from.
pub const BASE_GROUP: &str = "chassis";

/// A fully bootstrapped host, ready for the service loop.
pub struct Chassis {
    /// The resolved, always-absolute installation root.
    pub base_dir: PathBuf,
    /// The finalized option space; read-only from here on.
    pub space: OptionSpace,
    /// The loaded plugins, owned for the process lifetime.
    pub registry: PluginRegistry,
    /// PID file guard, held until shutdown when `--pid-file` was given.
    pub pidfile: Option<PidFileGuard>,
}

/// Outcome of the bootstrap: a running configuration, or an early
/// successful exit.
pub enum Bootstrap {
    Ready(Chassis),
    VersionPrinted,
}

/// Run the bootstrap over the given argument vector.
///
/// `args` includes the program name in position zero, as handed to `main`.
pub fn run(args: &[String]) -> Result<Bootstrap> {
    run_with_loader(args, Box::new(DynamicModuleLoader))
}

/// Bootstrap with a caller-supplied module loader. Tests inject in-process
/// stubs to exercise the merge sequence without shared objects on disk.
pub fn run_with_loader(args: &[String], loader: Box<dyn ModuleLoader>) -> Result<Bootstrap> {
    let prog = program_name(args);

    let mut space = OptionSpace::new(
        &prog,
        OptionGroup::new(BASE_GROUP, "Base chassis options", base_options()),
    )?;
    space.parse(args, ParseMode::Lenient)?;

    if space.get_flag("version") {
        print_version(&prog);
        return Ok(Bootstrap::VersionPrinted);
    }

    let config = match space.get_str("defaults-file") {
        Some(file) => Some(ConfigFile::open(Path::new(file))?),
        None => None,
    };

    // Overlay the base group before its values are consumed below; the
    // command line still wins.
    if let Some(cfg) = &config {
        space.overlay_config(cfg, BASE_GROUP, BASE_GROUP)?;
    }

    let base_dir = paths::resolve_base_dir(space.get_str("basedir").map(Path::new))?;
    info!(base_dir = %base_dir.display(), "Resolved base directory");

    resolve_paths(&mut space, BASE_GROUP, &base_dir)?;

    script_env::init_script_path(space.get_str("lua-path"), &base_dir, &prog);
    script_env::init_native_path(space.get_str("lua-cpath"), &base_dir, &prog);

    let plugin_dir = match space.get_path("plugin-dir") {
        Some(dir) => dir.to_path_buf(),
        None => paths::default_plugin_dir(&base_dir, &prog),
    };

    let names: Vec<String> = space.get_list("plugins").to_vec();
    let mut registry = PluginRegistry::with_loader(loader);
    registry.load_all(&names, &plugin_dir)?;

    merge_plugin_options(&mut space, &registry, args, config.as_ref(), &base_dir)?;

    // Unrecognized or malformed content only becomes an error once every
    // group is registered; until then an unknown flag may belong to a
    // plugin still to come.
    space.parse(args, ParseMode::Strict)?;

    registry.init_all(&space)?;

    let pidfile = match space.get_path("pid-file") {
        Some(path) => Some(PidFileGuard::acquire(path.to_path_buf())?),
        None => None,
    };

    info!(plugins = registry.len(), "Bootstrap complete");
    Ok(Bootstrap::Ready(Chassis {
        base_dir,
        space,
        registry,
        pidfile,
    }))
}

/// Merge each plugin's declared options into the space, in load order.
///
/// For every plugin: append its group, re-parse the full argument vector so
/// the new flags are recognized without disturbing earlier assignments,
/// overlay config-file values where the command line stayed silent, then
/// normalize the group's path options. Normalization is total before the
/// next plugin is processed, so plugin *k+1* never observes plugin *k*'s
/// raw relative values.
fn merge_plugin_options(
    space: &mut OptionSpace,
    registry: &PluginRegistry,
    args: &[String],
    config: Option<&ConfigFile>,
    base_dir: &Path,
) -> Result<()> {
    for plugin in registry.plugins() {
        let entries = plugin.options();
        if entries.is_empty() {
            // No configurable surface.
            continue;
        }

        space.add_group(OptionGroup::for_plugin(plugin.name(), entries))?;
        space.parse(args, ParseMode::Lenient)?;

        if let Some(cfg) = config {
            space.overlay_config(cfg, BASE_GROUP, plugin.name())?;
        }

        resolve_paths(space, plugin.name(), base_dir)?;
    }

    Ok(())
}

/// Descriptors for the options that exist before any plugin is loaded.
fn base_options() -> Vec<OptionDescriptor> {
    vec![
        OptionDescriptor::flag("version", "Show version").with_short('V'),
        OptionDescriptor::string("defaults-file", "Read default options from this file"),
        // String-kind on purpose: a relative basedir is a fatal error, not
        // something path resolution may quietly fix up.
        OptionDescriptor::string("basedir", "Base directory of the installation (absolute)"),
        OptionDescriptor::path("plugin-dir", "Directory holding the plugin binaries"),
        OptionDescriptor::list("plugins", "Comma-separated list of plugins to load"),
        OptionDescriptor::path("pid-file", "Write the process ID to this file"),
        OptionDescriptor::string("lua-path", "Script search path (sets LUA_PATH)"),
        OptionDescriptor::string("lua-cpath", "Native-extension search path (sets LUA_CPATH)"),
    ]
}

fn program_name(args: &[String]) -> String {
    args.first()
        .and_then(|arg| Path::new(arg).file_stem())
        .and_then(|stem| stem.to_str())
        .unwrap_or("chassis")
        .to_string()
}

/// Print build identification for `--version`.
fn print_version(prog: &str) {
    println!("{} {}", prog, env!("CARGO_PKG_VERSION"));
    println!(
        "  platform: {}-{}",
        std::env::consts::ARCH,
        std::env::consts::OS
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChassisError;
    use crate::options::{OptionValue, ValueOrigin};
    use crate::plugins::{PluginHandle, ServicePlugin};
    use std::fs;
    use tempfile::TempDir;

    struct AdminPlugin;

    impl ServicePlugin for AdminPlugin {
        fn name(&self) -> &str {
            "admin"
        }

        fn options(&self) -> Vec<OptionDescriptor> {
            vec![
                OptionDescriptor::string("admin-port", "Admin port")
                    .with_default(OptionValue::Str("4041".into())),
                OptionDescriptor::path("admin-lua-script", "Admin script"),
            ]
        }

        fn init(&mut self, _space: &OptionSpace) -> Result<()> {
            Ok(())
        }
    }

    struct QuietPlugin;

    impl ServicePlugin for QuietPlugin {
        fn name(&self) -> &str {
            "quiet"
        }

        fn init(&mut self, _space: &OptionSpace) -> Result<()> {
            Ok(())
        }
    }

    /// Loader that hands out stub plugins keyed off the requested filename.
    struct StubLoader;

    impl ModuleLoader for StubLoader {
        fn load(&mut self, path: &Path) -> Result<PluginHandle> {
            let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("");
            if stem.contains("admin") {
                Ok(PluginHandle::from_instance(Box::new(AdminPlugin)))
            } else if stem.contains("quiet") {
                Ok(PluginHandle::from_instance(Box::new(QuietPlugin)))
            } else {
                Err(ChassisError::PluginLoad {
                    name: path.display().to_string(),
                    reason: "unknown stub".to_string(),
                })
            }
        }
    }

    fn argv(parts: &[&str]) -> Vec<String> {
        std::iter::once("chassis")
            .chain(parts.iter().copied())
            .map(str::to_string)
            .collect()
    }

    fn write_config(dir: &TempDir, content: &str) -> String {
        let path = dir.path().join("chassis.conf");
        fs::write(&path, content).unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, fs::Permissions::from_mode(0o600)).unwrap();
        }
        path.display().to_string()
    }

    fn basedir(dir: &TempDir) -> String {
        dir.path().display().to_string()
    }

    #[test]
    fn test_version_exits_early() {
        let result = run(&argv(&["--version"])).unwrap();
        assert!(matches!(result, Bootstrap::VersionPrinted));
    }

    #[test]
    fn test_empty_plugin_list_bootstraps() {
        let tmp = TempDir::new().unwrap();
        let result = run(&argv(&["--basedir", &basedir(&tmp)])).unwrap();

        let Bootstrap::Ready(chassis) = result else {
            panic!("expected a ready chassis");
        };
        assert!(chassis.registry.is_empty());
        assert_eq!(chassis.base_dir, tmp.path());
    }

    #[test]
    fn test_relative_basedir_is_fatal() {
        let result = run(&argv(&["--basedir", "relative/path"]));
        assert!(matches!(result, Err(ChassisError::InvalidConfig(_))));
    }

    #[test]
    fn test_unknown_flag_is_fatal_after_merge() {
        let tmp = TempDir::new().unwrap();
        let result = run(&argv(&["--basedir", &basedir(&tmp), "--bogus"]));
        assert!(matches!(result, Err(ChassisError::ArgParse(_))));
    }

    #[test]
    fn test_plugin_options_merge_with_config_precedence() {
        let tmp = TempDir::new().unwrap();
        let config = write_config(&tmp, "[chassis]\nadmin-port = 9000\n");

        // Config file value lands when the command line is silent.
        let result = run_with_loader(
            &argv(&[
                "--basedir",
                &basedir(&tmp),
                "--plugins",
                "admin",
                "--defaults-file",
                &config,
            ]),
            Box::new(StubLoader),
        )
        .unwrap();
        let Bootstrap::Ready(chassis) = result else {
            panic!("expected a ready chassis");
        };
        assert_eq!(chassis.space.get_str("admin-port"), Some("9000"));
        assert_eq!(
            chassis.space.origin("admin-port"),
            Some(ValueOrigin::ConfigFile)
        );

        // The command line wins when both are present.
        let result = run_with_loader(
            &argv(&[
                "--basedir",
                &basedir(&tmp),
                "--plugins",
                "admin",
                "--defaults-file",
                &config,
                "--admin-port=9001",
            ]),
            Box::new(StubLoader),
        )
        .unwrap();
        let Bootstrap::Ready(chassis) = result else {
            panic!("expected a ready chassis");
        };
        assert_eq!(chassis.space.get_str("admin-port"), Some("9001"));
    }

    #[test]
    fn test_plugin_flag_before_base_options() {
        let tmp = TempDir::new().unwrap();
        let config = write_config(&tmp, "[chassis]\nadmin-port = 9000\n");

        // The plugin's own flag leads the line, before the base options
        // that tell the bootstrap which plugins to load.
        let result = run_with_loader(
            &argv(&[
                "--admin-port=9001",
                "--basedir",
                &basedir(&tmp),
                "--plugins",
                "admin",
                "--defaults-file",
                &config,
            ]),
            Box::new(StubLoader),
        )
        .unwrap();

        let Bootstrap::Ready(chassis) = result else {
            panic!("expected a ready chassis");
        };
        assert_eq!(chassis.registry.names(), ["admin"]);
        assert_eq!(chassis.space.get_str("admin-port"), Some("9001"));
        assert_eq!(
            chassis.space.origin("admin-port"),
            Some(ValueOrigin::CommandLine)
        );
    }

    #[test]
    fn test_plugin_path_option_resolved_against_basedir() {
        let tmp = TempDir::new().unwrap();
        let result = run_with_loader(
            &argv(&[
                "--basedir",
                &basedir(&tmp),
                "--plugins",
                "admin",
                "--admin-lua-script",
                "scripts/admin.lua",
            ]),
            Box::new(StubLoader),
        )
        .unwrap();

        let Bootstrap::Ready(chassis) = result else {
            panic!("expected a ready chassis");
        };
        assert_eq!(
            chassis.space.get_path("admin-lua-script"),
            Some(tmp.path().join("scripts/admin.lua").as_path())
        );
    }

    #[test]
    fn test_trailing_empty_plugin_name_skipped() {
        let tmp = TempDir::new().unwrap();
        let result = run_with_loader(
            &argv(&["--basedir", &basedir(&tmp), "--plugins", "admin,"]),
            Box::new(StubLoader),
        )
        .unwrap();

        let Bootstrap::Ready(chassis) = result else {
            panic!("expected a ready chassis");
        };
        assert_eq!(chassis.registry.names(), ["admin"]);
    }

    #[test]
    fn test_plugin_without_options_contributes_no_group() {
        let tmp = TempDir::new().unwrap();
        let result = run_with_loader(
            &argv(&["--basedir", &basedir(&tmp), "--plugins", "quiet,admin"]),
            Box::new(StubLoader),
        )
        .unwrap();

        let Bootstrap::Ready(chassis) = result else {
            panic!("expected a ready chassis");
        };
        assert_eq!(chassis.registry.len(), 2);
        let groups: Vec<&str> = chassis
            .space
            .groups()
            .iter()
            .map(|g| g.name.as_str())
            .collect();
        assert_eq!(groups, ["admin"]);
    }

    #[test]
    fn test_missing_plugin_aborts_bootstrap() {
        let tmp = TempDir::new().unwrap();
        let result = run(&argv(&["--basedir", &basedir(&tmp), "--plugins", "admin"]));
        assert!(matches!(
            result,
            Err(ChassisError::PluginLoad { name, .. }) if name == "admin"
        ));
    }

    #[test]
    fn test_pid_file_acquired_and_released() {
        let tmp = TempDir::new().unwrap();
        let pid_path = tmp.path().join("chassis.pid");

        {
            let result = run(&argv(&[
                "--basedir",
                &basedir(&tmp),
                "--pid-file",
                &pid_path.display().to_string(),
            ]))
            .unwrap();
            let Bootstrap::Ready(chassis) = result else {
                panic!("expected a ready chassis");
            };
            assert!(pid_path.exists());
            drop(chassis);
        }
        assert!(!pid_path.exists());
    }
}
