//! Error types for the chassis bootstrap.
//!
//! This module defines all error types used by the startup subsystem.
//! Uses `thiserror` for ergonomic error handling with automatic `Display`
//! and `Error` trait implementations.

use thiserror::Error;

/// The primary error type for chassis startup operations.
///
/// Every variant is startup-fatal: the host must not enter its service loop
/// with a partially configured plugin or option set. The caller terminates
/// with a non-zero status; there is no retry and no partial-success
/// continuation.
#[derive(Error, Debug)]
pub enum ChassisError {
    /// Malformed caller-supplied startup arguments (e.g. a relative base
    /// directory).
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The installation location cannot be determined, or the process
    /// environment cannot be set up.
    #[error("Environment error: {0}")]
    Environment(String),

    /// A plugin binary is missing, not a loadable module, or missing its
    /// required entry point.
    #[error("Failed to load plugin '{name}': {reason}")]
    PluginLoad { name: String, reason: String },

    /// An option group with the same name was already registered.
    #[error("Duplicate option group '{0}'")]
    DuplicateGroup(String),

    /// Malformed or unrecognized command-line content once all option
    /// groups are registered.
    #[error("Argument parse error: {0}")]
    ArgParse(String),

    /// Unreadable, unsafe, or malformed configuration file.
    #[error("Configuration file error: {0}")]
    ConfigFile(String),

    /// Standard I/O errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized `Result` type for chassis startup operations.
pub type Result<T> = std::result::Result<T, ChassisError>;
