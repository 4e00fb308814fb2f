//! Plugin system for the chassis.
//!
//! Plugins are shared libraries that contribute capabilities and
//! configuration options to the host process. Each binary exports one
//! entry symbol returning a [`ServicePlugin`] capability object; the
//! loader validates the surface, the registry owns the loaded modules for
//! the process lifetime, and the bootstrap merges their declared options
//! into the global option space.
//!
//! # Architecture
//!
//! - **types**: the [`ServicePlugin`] capability trait, the entry-point
//!   ABI, and the [`Plugin`] runtime representation
//! - **loader**: [`ModuleLoader`] and its [`DynamicModuleLoader`]
//!   implementation over `libloading`
//! - **registry**: ordered loading by naming convention and
//!   process-lifetime ownership
//!
//! # Binary naming
//!
//! A plugin named `admin` lives in the plugin directory as
//! `libadmin.so` (`libadmin.dylib` on macOS, `plugin-admin.dll` on
//! Windows).

mod loader;
mod registry;
mod types;

pub use loader::{DynamicModuleLoader, ModuleLoader, PluginHandle};
pub use registry::PluginRegistry;
pub use types::{Plugin, PluginEntryFn, ServicePlugin, PLUGIN_ENTRY_SYMBOL};
