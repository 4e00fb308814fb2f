//! Layered option configuration.
//!
//! Each loaded plugin contributes one named option group to a single
//! cumulative option space; the full argument vector is re-parsed as groups
//! arrive, config-file values are overlaid where the command line stayed
//! silent, and relative path values are normalized against the base
//! directory.
//!
//! - **descriptor**: schema types ([`OptionDescriptor`], [`OptionGroup`])
//! - **space**: the incremental parser and value store ([`OptionSpace`])
//! - **resolve**: relative-to-absolute path rewriting

mod descriptor;
pub mod resolve;
mod space;

pub use descriptor::{OptionDescriptor, OptionGroup, OptionKind, OptionValue, ValueOrigin};
pub use resolve::resolve_paths;
pub use space::{OptionSpace, ParseMode};
