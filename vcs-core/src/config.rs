// Copyright 2026 The vcs-core Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! User configuration: the typed `user.name`/`user.email` identity plus a
//! free-form TOML document for everything else.
//!
//! A single `toml_edit::DocumentMut` backs a dotted-path `get_str`/`set`
//! accessor, without the multi-source layering a config stack would need
//! when several config files can override each other.

use toml_edit::DocumentMut;
use toml_edit::Item;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid TOML: {0}")]
    Parse(#[from] toml_edit::TomlError),
    #[error("missing required key: {0}")]
    MissingKey(String),
    #[error("key {0} is not a string")]
    NotAString(String),
}

/// The user identity plus arbitrary nested configuration.
#[derive(Debug, Clone)]
pub struct UserConfig {
    document: DocumentMut,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self { document: DocumentMut::new() }
    }
}

impl UserConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(toml: &str) -> Result<Self, ConfigError> {
        Ok(Self { document: toml.parse::<DocumentMut>()? })
    }

    pub fn to_toml_string(&self) -> String {
        self.document.to_string()
    }

    /// `user.name` (`user_email` reads `user.email` the same way).
    pub fn user_name(&self) -> Result<&str, ConfigError> {
        self.get_str("user.name")
    }

    pub fn user_email(&self) -> Result<&str, ConfigError> {
        self.get_str("user.email")
    }

    pub fn set_user(&mut self, name: &str, email: &str) {
        self.set_str("user.name", name);
        self.set_str("user.email", email);
    }

    /// Looks up a dotted path (e.g. `"user.name"`, `"ui.pager"`) as a
    /// string.
    pub fn get_str(&self, path: &str) -> Result<&str, ConfigError> {
        let mut item: &Item = self.document.as_item();
        for key in path.split('.') {
            item = item
                .get(key)
                .ok_or_else(|| ConfigError::MissingKey(path.to_string()))?;
        }
        item.as_str().ok_or_else(|| ConfigError::NotAString(path.to_string()))
    }

    /// Sets a dotted path to a string value, creating intermediate tables
    /// as needed.
    pub fn set_str(&mut self, path: &str, value: &str) {
        let segments: Vec<&str> = path.split('.').collect();
        let mut table: &mut toml_edit::Table = self.document.as_table_mut();
        for segment in &segments[..segments.len() - 1] {
            table = table
                .entry(segment)
                .or_insert_with(|| Item::Table(toml_edit::Table::new()))
                .as_table_mut()
                .expect("intermediate config path segment is a table");
        }
        table[segments[segments.len() - 1]] = toml_edit::value(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_read_user_identity() {
        let mut config = UserConfig::new();
        config.set_user("Ada Lovelace", "ada@example.com");
        assert_eq!(config.user_name().unwrap(), "Ada Lovelace");
        assert_eq!(config.user_email().unwrap(), "ada@example.com");
    }

    #[test]
    fn parses_existing_toml_and_reads_nested_keys() {
        let config = UserConfig::parse("[ui]\npager = \"less\"\n").unwrap();
        assert_eq!(config.get_str("ui.pager").unwrap(), "less");
    }

    #[test]
    fn missing_key_is_an_error() {
        let config = UserConfig::new();
        assert!(matches!(config.get_str("user.name"), Err(ConfigError::MissingKey(_))));
    }

    #[test]
    fn round_trips_through_toml_string() {
        let mut config = UserConfig::new();
        config.set_user("Ada", "ada@example.com");
        let reparsed = UserConfig::parse(&config.to_toml_string()).unwrap();
        assert_eq!(reparsed.user_name().unwrap(), "Ada");
    }
}
