//! Chassis: the bootstrap layer of a pluggable network-service host.
//!
//! The chassis turns a bare process start into a fully configured host:
//! it resolves the installation layout from the executable's location,
//! reads the optional defaults file, loads the requested plugins from
//! shared libraries, merges every plugin's declared options into one
//! global option space with strict command-line > config-file > default
//! precedence, and prepares the scripting-runtime environment.
//!
//! # Architecture
//!
//! - **bootstrap**: the startup sequence, from argv to a ready [`Chassis`]
//! - **options**: dynamic option descriptors, groups, and the layered
//!   [`options::OptionSpace`]
//! - **config**: key/value defaults file with permission checking
//! - **plugins**: shared-library loading and process-lifetime ownership
//! - **paths**: installation-layout and plugin-filename conventions
//! - **script_env**: `LUA_PATH`/`LUA_CPATH` setup with write verification
//! - **utils**: PID file guard and other shared pieces

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod options;
pub mod paths;
pub mod plugins;
pub mod script_env;
pub mod utils;

pub use bootstrap::{Bootstrap, Chassis};
pub use error::{ChassisError, Result};
