//! The global option space.
//!
//! A single cumulative parser state holding the base host options plus one
//! option group per loaded plugin, in plugin load order. The space is an
//! explicit accumulator: groups are appended during startup, the full
//! argument vector is re-parsed after each append so the new flags are
//! recognized, and config-file values are overlaid where the command line
//! stayed silent. Append-only during startup, read-only afterwards.
//!
//! Precedence for every option kind: command line > config file >
//! compiled-in default.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use clap::parser::ValueSource;
use clap::{Arg, ArgAction, Command};
use tracing::debug;

use crate::config::ConfigFile;
use crate::error::{ChassisError, Result};

use super::descriptor::{OptionDescriptor, OptionGroup, OptionKind, OptionValue, ValueOrigin};

/// Parse strictness.
///
/// While groups are still being appended, options that no registered group
/// declares yet must be tolerated (a later plugin may own them). The strict
/// parse, run once after the last group is registered, rejects them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    Lenient,
    Strict,
}

#[derive(Debug, Clone)]
struct StoredValue {
    value: OptionValue,
    origin: ValueOrigin,
}

/// The merged command-line/config-file option space.
pub struct OptionSpace {
    program: String,
    base: OptionGroup,
    groups: Vec<OptionGroup>,
    values: HashMap<String, StoredValue>,
    resolved: HashSet<String>,
}

impl OptionSpace {
    /// Create a space over the base (pre-plugin) option group.
    pub fn new(program: &str, base: OptionGroup) -> Result<Self> {
        let mut space = Self {
            program: program.to_string(),
            base: OptionGroup::new(&base.name, &base.description, Vec::new()),
            groups: Vec::new(),
            values: HashMap::new(),
            resolved: HashSet::new(),
        };
        space.check_conflicts(&base.entries)?;
        space.seed_defaults(&base.entries);
        space.base.entries = base.entries;
        Ok(space)
    }

    /// Append a plugin's option group.
    ///
    /// Group names must be unique; under the registry's plugin-name
    /// uniqueness invariant a collision cannot happen, but it is checked
    /// anyway. Option names and short flags must be unique across the
    /// whole merged space.
    pub fn add_group(&mut self, group: OptionGroup) -> Result<()> {
        if group.name == self.base.name || self.groups.iter().any(|g| g.name == group.name) {
            return Err(ChassisError::DuplicateGroup(group.name));
        }
        self.check_conflicts(&group.entries)?;
        self.seed_defaults(&group.entries);

        debug!(group = %group.name, options = group.entries.len(), "Registered option group");
        self.groups.push(group);
        Ok(())
    }

    /// Re-parse the full argument vector against the currently registered
    /// groups. `args` includes the program name in position zero.
    ///
    /// In lenient mode tokens no registered descriptor recognizes are
    /// stripped before parsing; they may belong to a plugin that has not
    /// contributed its group yet, wherever they sit on the line.
    ///
    /// Only values the command line actually supplied update the store, so
    /// repeated parses of the same vector are stable: a value assigned for
    /// an earlier group is never clobbered when a later group triggers a
    /// re-parse, and a path option already rewritten against the base
    /// directory keeps its normalized value.
    pub fn parse(&mut self, args: &[String], mode: ParseMode) -> Result<()> {
        let filtered;
        let effective = match mode {
            ParseMode::Lenient => {
                filtered = self.strip_unknown(args);
                filtered.as_slice()
            }
            ParseMode::Strict => args,
        };

        let matches = self
            .build_command(mode)
            .try_get_matches_from(effective.iter().map(|a| a.as_str()))
            .map_err(|e| ChassisError::ArgParse(e.to_string()))?;

        let descriptors: Vec<OptionDescriptor> = self.all_descriptors().cloned().collect();
        for descriptor in &descriptors {
            if self.resolved.contains(&descriptor.name) {
                continue;
            }
            if matches.value_source(&descriptor.name) != Some(ValueSource::CommandLine) {
                continue;
            }

            let value = match descriptor.kind {
                OptionKind::Flag => OptionValue::Flag(matches.get_flag(&descriptor.name)),
                OptionKind::Str => match matches.get_one::<String>(&descriptor.name) {
                    Some(v) => OptionValue::Str(v.clone()),
                    None => continue,
                },
                OptionKind::Path => match matches.get_one::<String>(&descriptor.name) {
                    Some(v) => OptionValue::Path(PathBuf::from(v)),
                    None => continue,
                },
                OptionKind::List => OptionValue::List(
                    matches
                        .get_many::<String>(&descriptor.name)
                        .map(|items| items.cloned().collect())
                        .unwrap_or_default(),
                ),
            };

            self.values.insert(
                descriptor.name.clone(),
                StoredValue {
                    value,
                    origin: ValueOrigin::CommandLine,
                },
            );
        }

        Ok(())
    }

    /// Overlay config-file values for one group's descriptors.
    ///
    /// A key named after the descriptor is looked up in `section`; its
    /// value is written into the store only when the command line did not
    /// already supply one. Overlaying can never downgrade a command-line
    /// assignment.
    pub fn overlay_config(&mut self, file: &ConfigFile, section: &str, group: &str) -> Result<()> {
        let entries: Vec<OptionDescriptor> = self.group_entries(group)?.to_vec();

        for descriptor in &entries {
            if self.origin(&descriptor.name) == Some(ValueOrigin::CommandLine) {
                continue;
            }
            let Some(raw) = file.get(section, &descriptor.name) else {
                continue;
            };

            let value = config_value(descriptor, raw, file, section)?;
            self.values.insert(
                descriptor.name.clone(),
                StoredValue {
                    value,
                    origin: ValueOrigin::ConfigFile,
                },
            );
        }

        Ok(())
    }

    /// The descriptors of a registered group.
    pub fn group_entries(&self, group: &str) -> Result<&[OptionDescriptor]> {
        if group == self.base.name {
            return Ok(&self.base.entries);
        }
        self.groups
            .iter()
            .find(|g| g.name == group)
            .map(|g| g.entries.as_slice())
            .ok_or_else(|| {
                ChassisError::InvalidConfig(format!("unknown option group '{}'", group))
            })
    }

    /// The plugin groups, in registration (= plugin load) order.
    pub fn groups(&self) -> &[OptionGroup] {
        &self.groups
    }

    /// Provenance of the option's current value, if any value is set.
    pub fn origin(&self, name: &str) -> Option<ValueOrigin> {
        self.values.get(name).map(|stored| stored.origin)
    }

    /// The option's current value, if any.
    pub fn get(&self, name: &str) -> Option<&OptionValue> {
        self.values.get(name).map(|stored| &stored.value)
    }

    /// A flag option's value; false when unset.
    pub fn get_flag(&self, name: &str) -> bool {
        matches!(self.get(name), Some(OptionValue::Flag(true)))
    }

    /// A string option's value.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        match self.get(name) {
            Some(OptionValue::Str(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    /// A path option's value.
    pub fn get_path(&self, name: &str) -> Option<&Path> {
        match self.get(name) {
            Some(OptionValue::Path(p)) => Some(p.as_path()),
            _ => None,
        }
    }

    /// A list option's value; empty when unset.
    pub fn get_list(&self, name: &str) -> &[String] {
        match self.get(name) {
            Some(OptionValue::List(items)) => items,
            _ => &[],
        }
    }

    /// Rewrite a path option's stored value in place, preserving its
    /// provenance. No-op for anything that is not currently a path value.
    ///
    /// The option is marked resolved: later re-parses of the raw argument
    /// vector would restore the relative spelling, so they skip it.
    pub(crate) fn replace_path(&mut self, name: &str, path: PathBuf) {
        if let Some(stored) = self.values.get_mut(name) {
            if matches!(stored.value, OptionValue::Path(_)) {
                stored.value = OptionValue::Path(path);
                self.resolved.insert(name.to_string());
            }
        }
    }

    /// Remove argument tokens no registered descriptor recognizes.
    ///
    /// clap stops consuming at the first unknown token even with errors
    /// ignored, which would discard every assignment after a flag owned by
    /// a not-yet-registered plugin. An unknown option's separated value is
    /// stripped with it; values attached with `=` travel inside the token.
    fn strip_unknown(&self, args: &[String]) -> Vec<String> {
        let mut long_kinds: HashMap<&str, OptionKind> = HashMap::new();
        let mut short_kinds: HashMap<char, OptionKind> = HashMap::new();
        for descriptor in self.all_descriptors() {
            long_kinds.insert(descriptor.name.as_str(), descriptor.kind);
            if let Some(short) = descriptor.short {
                short_kinds.insert(short, descriptor.kind);
            }
        }

        let mut kept: Vec<String> = Vec::with_capacity(args.len());
        let mut iter = args.iter().peekable();
        if let Some(program) = iter.next() {
            kept.push(program.clone());
        }

        while let Some(token) = iter.next() {
            if token == "--" {
                // No positional arguments exist, so nothing after the
                // separator can mean anything.
                break;
            }

            // Some(true) when the option is known and expects its value in
            // the following token; None when the token is unknown.
            let known = if let Some(rest) = token.strip_prefix("--") {
                let (name, has_value) = match rest.split_once('=') {
                    Some((name, _)) => (name, true),
                    None => (rest, false),
                };
                long_kinds
                    .get(name)
                    .map(|kind| !has_value && *kind != OptionKind::Flag)
            } else if let Some(rest) = token.strip_prefix('-') {
                let mut chars = rest.chars();
                chars.next().and_then(|short| {
                    let attached_value = chars.next().is_some();
                    short_kinds
                        .get(&short)
                        .map(|kind| !attached_value && *kind != OptionKind::Flag)
                })
            } else {
                None
            };

            match known {
                Some(separate_value) => {
                    kept.push(token.clone());
                    if separate_value {
                        if let Some(value) = iter.next() {
                            kept.push(value.clone());
                        }
                    }
                }
                None => {
                    if token.starts_with('-')
                        && matches!(iter.peek(), Some(next) if !next.starts_with('-'))
                    {
                        iter.next();
                    }
                }
            }
        }

        kept
    }

    fn all_descriptors(&self) -> impl Iterator<Item = &OptionDescriptor> {
        self.base
            .entries
            .iter()
            .chain(self.groups.iter().flat_map(|g| g.entries.iter()))
    }

    fn check_conflicts(&self, incoming: &[OptionDescriptor]) -> Result<()> {
        for (index, descriptor) in incoming.iter().enumerate() {
            let earlier = self.all_descriptors().chain(incoming[..index].iter());
            for existing in earlier {
                if existing.name == descriptor.name {
                    return Err(ChassisError::InvalidConfig(format!(
                        "option '--{}' is declared more than once",
                        descriptor.name
                    )));
                }
                if let (Some(a), Some(b)) = (existing.short, descriptor.short) {
                    if a == b {
                        return Err(ChassisError::InvalidConfig(format!(
                            "short flag '-{}' of '--{}' collides with '--{}'",
                            b, descriptor.name, existing.name
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    fn seed_defaults(&mut self, entries: &[OptionDescriptor]) {
        for descriptor in entries {
            let default = match (&descriptor.default, descriptor.kind) {
                (Some(value), _) => value.clone(),
                (None, OptionKind::Flag) => OptionValue::Flag(false),
                (None, OptionKind::List) => OptionValue::List(Vec::new()),
                (None, _) => continue,
            };
            self.values
                .entry(descriptor.name.clone())
                .or_insert(StoredValue {
                    value: default,
                    origin: ValueOrigin::Default,
                });
        }
    }

    fn build_command(&self, mode: ParseMode) -> Command {
        let mut command = Command::new(self.program.clone())
            .disable_help_flag(true)
            .disable_version_flag(true)
            .ignore_errors(mode == ParseMode::Lenient);

        for descriptor in &self.base.entries {
            command = command.arg(to_arg(descriptor, None));
        }
        for group in &self.groups {
            for descriptor in &group.entries {
                command = command.arg(to_arg(descriptor, Some(&group.name)));
            }
        }
        command
    }
}

fn to_arg(descriptor: &OptionDescriptor, heading: Option<&str>) -> Arg {
    let mut arg = Arg::new(descriptor.name.clone())
        .long(descriptor.name.clone())
        .help(descriptor.help.clone());

    if let Some(short) = descriptor.short {
        arg = arg.short(short);
    }
    if let Some(heading) = heading {
        arg = arg.help_heading(heading.to_string());
    }

    match descriptor.kind {
        OptionKind::Flag => arg.action(ArgAction::SetTrue),
        OptionKind::Str => arg.action(ArgAction::Set).value_name("VALUE"),
        OptionKind::Path => arg.action(ArgAction::Set).value_name("PATH"),
        OptionKind::List => arg
            .action(ArgAction::Append)
            .value_delimiter(',')
            .value_name("LIST"),
    }
}

fn config_value(
    descriptor: &OptionDescriptor,
    raw: &str,
    file: &ConfigFile,
    section: &str,
) -> Result<OptionValue> {
    match descriptor.kind {
        OptionKind::Flag => match raw.trim() {
            "true" | "1" | "yes" => Ok(OptionValue::Flag(true)),
            "false" | "0" | "no" => Ok(OptionValue::Flag(false)),
            other => Err(ChassisError::ConfigFile(format!(
                "key '{}' expects a boolean, got '{}'",
                descriptor.name, other
            ))),
        },
        OptionKind::Str => Ok(OptionValue::Str(raw.to_string())),
        OptionKind::Path => Ok(OptionValue::Path(PathBuf::from(raw))),
        OptionKind::List => Ok(OptionValue::List(
            file.get_list(section, &descriptor.name).unwrap_or_default(),
        )),
    }
}
