//! `build.prop` style property store

use super::{HalError, Result};
use madrigal_core::domain::PropertyStore;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

/// Properties parsed from `key=value` lines
///
/// Blank lines and lines starting with `#` are skipped. Later definitions of a
/// key override earlier ones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildPropStore {
    values: HashMap<String, String>,
}

impl BuildPropStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let mut store = Self::new();
        for (index, raw) in contents.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (key, value) = line
                .split_once('=')
                .filter(|(key, _)| !key.trim().is_empty())
                .ok_or_else(|| HalError::MalformedProperty {
                    line: index + 1,
                    content: raw.to_string(),
                })?;
            store.set(key.trim(), value.trim());
        }
        debug!(count = store.len(), "Parsed properties");
        Ok(store)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading properties");
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    pub fn set(&mut self, key: &str, value: &str) {
        self.values.insert(key.to_string(), value.to_string());
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl PropertyStore for BuildPropStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for BuildPropStore {
    fn from_iter<I: IntoIterator<Item = (&'a str, &'a str)>>(iter: I) -> Self {
        let mut store = Self::new();
        for (key, value) in iter {
            store.set(key, value);
        }
        store
    }
}
