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

//! [`Change`]: the durable unit of work.

use std::collections::BTreeMap;

use crate::backend::Signature;
use crate::object_id::ChangeId;
use crate::object_id::CommitId;
use crate::object_id::ObjectId as _;

/// Git tree hash, or the sentinel meaning "empty tree".
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct TreeRef(String);

impl TreeRef {
    /// `0` repeated 40 times.
    pub fn empty() -> Self {
        Self("0".repeat(40))
    }

    pub fn new(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    pub fn is_empty(&self) -> bool {
        self.0.chars().all(|c| c == '0')
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A unit of work with a [`ChangeId`] that survives rewrites.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Change {
    pub change_id: ChangeId,
    /// All-zero means not yet backed by a Git commit.
    pub commit_id: CommitId,
    pub parents: Vec<ChangeId>,
    pub tree: TreeRef,
    pub author: Signature,
    pub committer: Signature,
    pub description: String,
    pub timestamp: crate::backend::Timestamp,
    #[serde(default)]
    pub predecessors: Vec<CommitId>,
    #[serde(default)]
    pub abandoned: bool,
    /// Snapshot of file contents used only by operations that restore
    /// working-copy state (`absorb`, `undo`, `backout`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_snapshot: Option<BTreeMap<String, String>>,
}

impl Change {
    /// Whether this change has not yet been backed by a Git commit.
    pub fn is_uncommitted(&self) -> bool {
        self.commit_id == crate::object_id::zero_commit_id()
    }

    /// True when the tree equals the empty-tree sentinel.
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    pub fn short_change_id(&self) -> String {
        self.change_id.hex().chars().take(8).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tree_ref_empty_is_all_zero() {
        assert!(TreeRef::empty().is_empty());
        assert!(!TreeRef::new("a".repeat(40)).is_empty());
    }
}
