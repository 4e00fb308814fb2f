//! Path-option resolution.
//!
//! After a group's options are merged, every path-valued option still
//! holding a relative path is rewritten against the base directory. Users
//! and plugins can write short relative paths in config files while the
//! running process always operates on absolute paths, regardless of the
//! current working directory.

use std::path::Path;

use tracing::debug;

use crate::error::Result;

use super::descriptor::{OptionKind, OptionValue};
use super::space::OptionSpace;

/// Rewrite the group's relative path options to `base_dir.join(value)`.
///
/// Absolute values are left untouched, so resolution is idempotent:
/// re-running it over an already resolved group is a no-op.
pub fn resolve_paths(space: &mut OptionSpace, group: &str, base_dir: &Path) -> Result<()> {
    let names: Vec<String> = space
        .group_entries(group)?
        .iter()
        .filter(|descriptor| descriptor.kind == OptionKind::Path)
        .map(|descriptor| descriptor.name.clone())
        .collect();

    for name in names {
        let Some(OptionValue::Path(current)) = space.get(&name) else {
            continue;
        };
        if current.is_absolute() {
            continue;
        }

        let resolved = base_dir.join(current);
        debug!(option = %name, path = %resolved.display(), "Resolved relative path option");
        space.replace_path(&name, resolved);
    }

    Ok(())
}
