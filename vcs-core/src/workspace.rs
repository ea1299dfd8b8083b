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

//! Multiple working-copy directories sharing one change graph and object
//! store: adding a workspace attaches an additional working-copy root to
//! an already-open repo rather than creating a new object store.
//!
//! Each workspace has its own [`crate::working_copy::WorkingCopy`] (its own
//! current-change pointer and tracked-file state), keyed by workspace name.

use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;

use crate::error::ErrorCode;
use crate::error::RepoError;
use crate::object_id::ChangeId;
use crate::storage::Storage;
use crate::storage::StorageResult;
use crate::working_copy::WorkingCopy;

const WORKSPACES_DOC_PATH: &str = "workspaces.json";
const DEFAULT_WORKSPACE: &str = "default";

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct WorkspaceEntry {
    root: PathBuf,
}

#[derive(Debug, Default, serde::Serialize, serde::Deserialize)]
struct WorkspacesDocument {
    workspaces: BTreeMap<String, WorkspaceEntry>,
}

/// Registry of named workspace roots, each with its own working copy, all
/// sharing the repository's [`crate::change_graph::ChangeGraph`] and
/// [`crate::backend::GitBackend`].
#[derive(Debug, Default)]
pub struct WorkspaceRegistry {
    roots: BTreeMap<String, PathBuf>,
}

impl WorkspaceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(storage: &Storage) -> StorageResult<Self> {
        let doc: WorkspacesDocument = storage.read(WORKSPACES_DOC_PATH)?.unwrap_or_default();
        Ok(Self { roots: doc.workspaces.into_iter().map(|(name, entry)| (name, entry.root)).collect() })
    }

    pub fn save(&self, storage: &Storage) -> StorageResult<()> {
        let doc = WorkspacesDocument {
            workspaces: self.roots.iter().map(|(name, root)| (name.clone(), WorkspaceEntry { root: root.clone() })).collect(),
        };
        storage.write(WORKSPACES_DOC_PATH, &doc)
    }

    /// Registers the implicit workspace created at repo init time.
    pub fn init_default(&mut self, root: impl Into<PathBuf>) {
        self.roots.insert(DEFAULT_WORKSPACE.to_string(), root.into());
    }

    /// Adds a new workspace at `root`, with its own fresh working copy
    /// pointed at `initial_change`.
    pub fn add(&mut self, name: impl Into<String>, root: impl Into<PathBuf>, initial_change: ChangeId) -> Result<WorkingCopy, RepoError> {
        let name = name.into();
        if self.roots.contains_key(&name) {
            return Err(RepoError::new(ErrorCode::InvalidArgument, format!("workspace already exists: {name}")));
        }
        self.roots.insert(name, root.into());
        Ok(WorkingCopy::init(initial_change))
    }

    pub fn remove(&mut self, name: &str) -> Result<(), RepoError> {
        if name == DEFAULT_WORKSPACE {
            return Err(RepoError::new(ErrorCode::InvalidArgument, "cannot remove the default workspace"));
        }
        self.roots
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| RepoError::new(ErrorCode::NotFound, format!("workspace not found: {name}")))
    }

    pub fn root(&self, name: &str) -> Option<&Path> {
        self.roots.get(name).map(PathBuf::as_path)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.roots.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_default_registers_the_implicit_workspace() {
        let mut registry = WorkspaceRegistry::new();
        registry.init_default("/repo");
        assert_eq!(registry.root(DEFAULT_WORKSPACE), Some(Path::new("/repo")));
    }

    #[test]
    fn add_rejects_duplicate_names() {
        let mut registry = WorkspaceRegistry::new();
        registry.add("ws2", "/repo/ws2", ChangeId::from_hex("aa")).unwrap();
        let err = registry.add("ws2", "/repo/ws2b", ChangeId::from_hex("bb")).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidArgument);
    }

    #[test]
    fn remove_rejects_default_workspace() {
        let mut registry = WorkspaceRegistry::new();
        registry.init_default("/repo");
        let err = registry.remove(DEFAULT_WORKSPACE).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidArgument);
    }

    #[test]
    fn remove_unknown_workspace_fails() {
        let mut registry = WorkspaceRegistry::new();
        let err = registry.remove("missing").unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }
}
