//! Option schema types.
//!
//! Plugins declare their configurable surface as a list of
//! [`OptionDescriptor`]s, collected into one [`OptionGroup`] per plugin.
//! Descriptors are immutable once registered with the option space.

use std::path::PathBuf;

/// The value shape of a configurable option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    /// Boolean switch; true when the flag is present.
    Flag,
    /// Free-form string value.
    Str,
    /// Filesystem path; relative values are rewritten against the base
    /// directory after the merge.
    Path,
    /// List of strings, comma-separated on the command line and split on
    /// the configured delimiter in config files.
    List,
}

/// A concrete option value.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    Flag(bool),
    Str(String),
    Path(PathBuf),
    List(Vec<String>),
}

impl OptionValue {
    /// The kind this value satisfies.
    pub fn kind(&self) -> OptionKind {
        match self {
            OptionValue::Flag(_) => OptionKind::Flag,
            OptionValue::Str(_) => OptionKind::Str,
            OptionValue::Path(_) => OptionKind::Path,
            OptionValue::List(_) => OptionKind::List,
        }
    }
}

/// Where an option's current value came from.
///
/// Ordered by precedence: the command line beats the config file, which
/// beats the descriptor's compiled-in default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ValueOrigin {
    /// Compiled-in default declared by the descriptor.
    Default,
    /// Overlaid from the configuration file.
    ConfigFile,
    /// Supplied on the command line.
    CommandLine,
}

/// A single configurable setting, declared by a plugin or by the base host.
#[derive(Debug, Clone)]
pub struct OptionDescriptor {
    /// Long option name (`admin-port`); unique across the whole merged
    /// space. Plugin authors prefix their options with the plugin name by
    /// convention.
    pub name: String,

    /// Optional short flag, unique across the whole merged space.
    pub short: Option<char>,

    /// Value shape.
    pub kind: OptionKind,

    /// Compiled-in default, the lowest precedence tier.
    pub default: Option<OptionValue>,

    /// Help text, shown under the owning group's heading.
    pub help: String,
}

impl OptionDescriptor {
    fn new(name: &str, kind: OptionKind, help: &str) -> Self {
        Self {
            name: name.to_string(),
            short: None,
            kind,
            default: None,
            help: help.to_string(),
        }
    }

    /// Declare a boolean flag.
    pub fn flag(name: &str, help: &str) -> Self {
        Self::new(name, OptionKind::Flag, help)
    }

    /// Declare a string-valued option.
    pub fn string(name: &str, help: &str) -> Self {
        Self::new(name, OptionKind::Str, help)
    }

    /// Declare a path-valued option, subject to base-directory resolution.
    pub fn path(name: &str, help: &str) -> Self {
        Self::new(name, OptionKind::Path, help)
    }

    /// Declare a list-valued option.
    pub fn list(name: &str, help: &str) -> Self {
        Self::new(name, OptionKind::List, help)
    }

    /// Attach a short flag.
    pub fn with_short(mut self, short: char) -> Self {
        self.short = Some(short);
        self
    }

    /// Attach a compiled-in default value.
    pub fn with_default(mut self, default: OptionValue) -> Self {
        self.default = Some(default);
        self
    }
}

/// A named, described collection of descriptors contributed by exactly one
/// plugin (or by the base host).
#[derive(Debug, Clone)]
pub struct OptionGroup {
    /// Group name; equals the contributing plugin's name, so group names
    /// are unique whenever plugin names are.
    pub name: String,

    /// One-line description shown in help output.
    pub description: String,

    /// The descriptors, in declaration order.
    pub entries: Vec<OptionDescriptor>,
}

impl OptionGroup {
    /// Create a group with an explicit description.
    pub fn new(name: &str, description: &str, entries: Vec<OptionDescriptor>) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            entries,
        }
    }

    /// The group synthesized for a plugin's declared options.
    pub fn for_plugin(plugin_name: &str, entries: Vec<OptionDescriptor>) -> Self {
        Self::new(
            plugin_name,
            &format!("Options for the {}-module", plugin_name),
            entries,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_methods() {
        let d = OptionDescriptor::string("admin-port", "Port for the admin interface")
            .with_short('p')
            .with_default(OptionValue::Str("4041".into()));
        assert_eq!(d.name, "admin-port");
        assert_eq!(d.short, Some('p'));
        assert_eq!(d.kind, OptionKind::Str);
        assert_eq!(d.default, Some(OptionValue::Str("4041".into())));
    }

    #[test]
    fn test_value_kind_matches_variant() {
        assert_eq!(OptionValue::Flag(true).kind(), OptionKind::Flag);
        assert_eq!(OptionValue::Path(PathBuf::from("x")).kind(), OptionKind::Path);
        assert_eq!(OptionValue::List(vec![]).kind(), OptionKind::List);
    }

    #[test]
    fn test_origin_precedence_order() {
        assert!(ValueOrigin::CommandLine > ValueOrigin::ConfigFile);
        assert!(ValueOrigin::ConfigFile > ValueOrigin::Default);
    }

    #[test]
    fn test_group_for_plugin_uses_plugin_name() {
        let group = OptionGroup::for_plugin("admin", vec![]);
        assert_eq!(group.name, "admin");
        assert!(group.description.contains("admin-module"));
    }
}
