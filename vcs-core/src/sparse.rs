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

//! Sparse checkout patterns: bookkeeping only, no materialization. Actually
//! filtering the working copy down to these patterns on disk is out of
//! scope for this crate.

use crate::storage::Storage;
use crate::storage::StorageResult;

const SPARSE_DOC_PATH: &str = "sparse.json";

/// Ordered list of glob patterns narrowing which paths the working copy
/// tracks. Order matters: later patterns can re-include a path excluded by
/// an earlier one, matching the usual sparse-profile convention.
#[derive(Debug, Default, Clone, serde::Serialize, serde::Deserialize)]
pub struct SparseConfig {
    patterns: Vec<String>,
}

impl SparseConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(storage: &Storage) -> StorageResult<Self> {
        Ok(storage.read(SPARSE_DOC_PATH)?.unwrap_or_default())
    }

    pub fn save(&self, storage: &Storage) -> StorageResult<()> {
        storage.write(SPARSE_DOC_PATH, self)
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn set(&mut self, patterns: Vec<String>) {
        self.patterns = patterns;
    }

    pub fn add(&mut self, pattern: impl Into<String>) {
        self.patterns.push(pattern.into());
    }

    /// Whether `path` would be checked out under the current patterns. An
    /// empty pattern list means everything is included.
    pub fn includes(&self, path: &str) -> bool {
        if self.patterns.is_empty() {
            return true;
        }
        self.patterns
            .iter()
            .filter_map(|p| glob::Pattern::new(p).ok())
            .any(|pattern| pattern.matches(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_patterns_include_everything() {
        let sparse = SparseConfig::new();
        assert!(sparse.includes("anything.rs"));
    }

    #[test]
    fn patterns_restrict_to_matches() {
        let mut sparse = SparseConfig::new();
        sparse.add("src/**");
        assert!(sparse.includes("src/main.rs"));
        assert!(!sparse.includes("docs/readme.md"));
    }
}
