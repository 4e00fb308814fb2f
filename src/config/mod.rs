//! Configuration file support.
//!
//! - **file**: the sectioned key=value store behind `--defaults-file`
//! - **filemode**: permission safety checks applied before loading

mod file;
pub mod filemode;

pub use file::{ConfigFile, DEFAULT_LIST_SEPARATOR};
