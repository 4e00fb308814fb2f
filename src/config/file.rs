//! Sectioned key=value configuration file.
//!
//! The defaults file is a plain text format: `[section]` headers, `key =
//! value` entries, `#` or `;` comments. List-valued entries are split on a
//! single delimiter character (default `,`). The store is read-only once
//! loaded; its only consumer is the option-overlay step of the bootstrap.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::filemode;
use crate::error::{ChassisError, Result};

/// Default delimiter for list-valued entries.
pub const DEFAULT_LIST_SEPARATOR: char = ',';

/// A loaded, immutable configuration file.
#[derive(Debug)]
pub struct ConfigFile {
    path: PathBuf,
    sections: HashMap<String, HashMap<String, String>>,
    list_separator: char,
}

impl ConfigFile {
    /// Load a configuration file, validating its permissions first.
    ///
    /// Fails closed: a group- or world-writable file is rejected before a
    /// single byte is parsed.
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_separator(path, DEFAULT_LIST_SEPARATOR)
    }

    /// Load with a non-default list delimiter.
    pub fn open_with_separator(path: &Path, list_separator: char) -> Result<Self> {
        filemode::check_permissions(path)?;

        let content = fs::read_to_string(path).map_err(|e| {
            ChassisError::ConfigFile(format!(
                "loading configuration from {} failed: {}",
                path.display(),
                e
            ))
        })?;

        let sections = parse(&content, path)?;
        info!(path = %path.display(), sections = sections.len(), "Loaded configuration file");

        Ok(Self {
            path: path.to_path_buf(),
            sections,
            list_separator,
        })
    }

    /// The file this store was loaded from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Look up a raw value.
    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections
            .get(section)
            .and_then(|entries| entries.get(key))
            .map(|v| v.as_str())
    }

    /// Look up a list value, split on the list delimiter.
    ///
    /// Empty elements (a trailing delimiter, doubled delimiters) are
    /// dropped.
    pub fn get_list(&self, section: &str, key: &str) -> Option<Vec<String>> {
        self.get(section, key).map(|raw| {
            raw.split(self.list_separator)
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(str::to_string)
                .collect()
        })
    }

    /// Whether the key exists at all.
    pub fn has(&self, section: &str, key: &str) -> bool {
        self.get(section, key).is_some()
    }
}

fn parse(content: &str, path: &Path) -> Result<HashMap<String, HashMap<String, String>>> {
    let mut sections: HashMap<String, HashMap<String, String>> = HashMap::new();
    // Keys before the first header land in the unnamed section.
    let mut current = String::new();

    for (lineno, raw_line) in content.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        if let Some(header) = line.strip_prefix('[').and_then(|rest| rest.strip_suffix(']')) {
            current = header.trim().to_string();
            sections.entry(current.clone()).or_default();
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            return Err(ChassisError::ConfigFile(format!(
                "{}:{}: expected key=value, got '{}'",
                path.display(),
                lineno + 1,
                line
            )));
        };

        // Last assignment wins on duplicate keys.
        sections
            .entry(current.clone())
            .or_default()
            .insert(key.trim().to_string(), value.trim().to_string());
    }

    Ok(sections)
}
