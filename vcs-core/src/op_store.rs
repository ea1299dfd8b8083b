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

//! [`View`] and [`Operation`]: the content-addressed records that back the
//! operation log. Each bookmark and tag has exactly one active target, so
//! `View` stores them directly rather than through a conflict-aware merge
//! abstraction.

use std::collections::BTreeMap;
use std::collections::HashSet;

use crate::backend::Timestamp;
use crate::content_hash::ContentHash as _;
use crate::object_id::ChangeId;
use crate::object_id::CommitId;
use crate::object_id::OperationId;
use crate::object_id::ViewId;

/// Snapshot of repo-wide mutable state as of one operation.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct View {
    pub bookmarks: BTreeMap<String, ChangeId>,
    pub remote_bookmarks: BTreeMap<String, ChangeId>,
    pub tags: BTreeMap<String, ChangeId>,
    pub heads: HashSet<ChangeId>,
    pub working_copy: ChangeId,
}

impl View {
    pub fn make_root(root_change_id: ChangeId) -> Self {
        Self {
            bookmarks: BTreeMap::new(),
            remote_bookmarks: BTreeMap::new(),
            tags: BTreeMap::new(),
            heads: HashSet::from([root_change_id.clone()]),
            working_copy: root_change_id,
        }
    }

    pub fn id(&self) -> ViewId {
        ViewId::from_hex(&self.content_hash())
    }
}

/// Who performed an operation: name, email, and the host it ran on.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct OperationUser {
    pub name: String,
    pub email: String,
    pub hostname: String,
}

impl OperationUser {
    pub fn current(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self { name: name.into(), email: email.into(), hostname: whoami::fallible::hostname().unwrap_or_default() }
    }
}

/// A recorded mutation of the repo's `View`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Operation {
    pub operation_id: OperationId,
    pub timestamp: Timestamp,
    pub user: OperationUser,
    pub description: String,
    pub parents: Vec<OperationId>,
    pub view: View,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_snapshot: Option<BTreeMap<String, String>>,
    /// Set only on operations created by `undo`: the id of the operation
    /// this one reverted. Lets a subsequent `undo` walk further back through
    /// the original history instead of re-undoing the same point.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub undoes: Option<OperationId>,
}

impl Operation {
    pub fn make_root(root_change_id: ChangeId, timestamp: Timestamp) -> Self {
        let view = View::make_root(root_change_id);
        let mut op = Self {
            operation_id: OperationId::from_bytes(&[]),
            timestamp,
            user: OperationUser { name: String::new(), email: String::new(), hostname: String::new() },
            description: "initialize".to_string(),
            parents: vec![],
            view,
            file_snapshot: None,
            undoes: None,
        };
        op.operation_id = op.content_id();
        op
    }

    /// Content-addressed id derived from everything but `operation_id`
    /// itself.
    pub fn content_id(&self) -> OperationId {
        #[derive(serde::Serialize)]
        struct Keyed<'a> {
            timestamp: &'a Timestamp,
            user: &'a OperationUser,
            description: &'a str,
            parents: &'a [OperationId],
            view: &'a View,
            undoes: &'a Option<OperationId>,
        }
        let keyed = Keyed {
            timestamp: &self.timestamp,
            user: &self.user,
            description: &self.description,
            parents: &self.parents,
            view: &self.view,
            undoes: &self.undoes,
        };
        OperationId::from_hex(&keyed.content_hash())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OpStoreError {
    #[error("operation {0} not found")]
    NotFound(OperationId),
    #[error(transparent)]
    Storage(#[from] crate::storage::StorageError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_views_share_a_view_id() {
        let a = View::make_root(ChangeId::from_hex("aa"));
        let b = View::make_root(ChangeId::from_hex("aa"));
        assert_eq!(a.id(), b.id());
    }

    #[test]
    fn different_views_hash_differently() {
        let a = View::make_root(ChangeId::from_hex("aa"));
        let b = View::make_root(ChangeId::from_hex("bb"));
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn content_id_changes_with_description() {
        let view = View::make_root(ChangeId::from_hex("aa"));
        let timestamp = Timestamp::now();
        let mut op = Operation::make_root(ChangeId::from_hex("aa"), timestamp.clone());
        op.view = view;
        let first = op.content_id();
        op.description = "different".to_string();
        let second = op.content_id();
        assert_ne!(first, second);
    }
}
