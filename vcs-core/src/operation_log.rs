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

//! The append-only operation log: every mutation records one [`Operation`],
//! and `undo`/time-travel read back through it.
//!
//! Concurrent writers would normally need a content-addressed store plus a
//! separate heads-tracking structure to reconcile divergent operation heads.
//! This crate assumes a single-threaded cooperative model instead, so it
//! collapses both into one `OperationLog` with a single current-head
//! pointer and flags a write race as [`OperationLogError::Conflict`] rather
//! than reconciling divergent heads.

use crate::object_id::OperationId;
use crate::op_store::Operation;
use crate::op_store::OperationUser;
use crate::op_store::View;
use crate::storage::Storage;
use crate::storage::StorageError;
use crate::storage::check_version;

const OPERATIONS_DOC_PATH: &str = "operations.json";
const OPERATIONS_DOC_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum OperationLogError {
    #[error("operation {0} not found")]
    NotFound(OperationId),
    #[error("operation log has no head; repository was never initialized")]
    Empty,
    #[error("concurrent write: expected head {expected}, found {found}")]
    Conflict { expected: OperationId, found: OperationId },
    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub type OperationLogResult<T> = Result<T, OperationLogError>;

#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct OperationLogDocument {
    version: u32,
    /// Append order; `operations.last()` is the current head.
    operations: Vec<Operation>,
}

/// The full append-only sequence of operations plus a cursor at the current
/// head.
#[derive(Debug, Default)]
pub struct OperationLog {
    operations: Vec<Operation>,
}

impl OperationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(storage: &Storage) -> OperationLogResult<Self> {
        let Some(doc): Option<OperationLogDocument> = storage.read(OPERATIONS_DOC_PATH)? else {
            return Ok(Self::new());
        };
        check_version(OPERATIONS_DOC_PATH, doc.version, OPERATIONS_DOC_VERSION)?;
        Ok(Self { operations: doc.operations })
    }

    pub fn save(&self, storage: &Storage) -> OperationLogResult<()> {
        let doc = OperationLogDocument { version: OPERATIONS_DOC_VERSION, operations: self.operations.clone() };
        storage.write(OPERATIONS_DOC_PATH, &doc)?;
        Ok(())
    }

    pub fn head(&self) -> Option<&Operation> {
        self.operations.last()
    }

    pub fn head_id(&self) -> Option<OperationId> {
        self.head().map(|op| op.operation_id.clone())
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Records `root_view` as the very first operation, with no parents.
    pub fn init_root(&mut self, root_view: View, user: OperationUser, timestamp: crate::backend::Timestamp) {
        let mut op = Operation {
            operation_id: OperationId::from_bytes(&[]),
            timestamp,
            user,
            description: "initialize repo".to_string(),
            parents: vec![],
            view: root_view,
            file_snapshot: None,
            undoes: None,
        };
        op.operation_id = op.content_id();
        self.operations.push(op);
    }

    /// Appends a new operation whose parent is the current head.
    /// `expected_head` must match the log's current head id, or this fails
    /// with [`OperationLogError::Conflict`].
    pub fn record_operation(
        &mut self,
        expected_head: &OperationId,
        description: impl Into<String>,
        user: OperationUser,
        timestamp: crate::backend::Timestamp,
        view: View,
        file_snapshot: Option<std::collections::BTreeMap<String, String>>,
    ) -> OperationLogResult<OperationId> {
        self.record_operation_inner(expected_head, description, user, timestamp, view, file_snapshot, None)
    }

    fn record_operation_inner(
        &mut self,
        expected_head: &OperationId,
        description: impl Into<String>,
        user: OperationUser,
        timestamp: crate::backend::Timestamp,
        view: View,
        file_snapshot: Option<std::collections::BTreeMap<String, String>>,
        undoes: Option<OperationId>,
    ) -> OperationLogResult<OperationId> {
        let current_head = self.head_id().ok_or(OperationLogError::Empty)?;
        if &current_head != expected_head {
            return Err(OperationLogError::Conflict { expected: expected_head.clone(), found: current_head });
        }
        let mut op = Operation {
            operation_id: OperationId::from_bytes(&[]),
            timestamp,
            user,
            description: description.into(),
            parents: vec![current_head],
            view,
            file_snapshot,
            undoes,
        };
        op.operation_id = op.content_id();
        let new_id = op.operation_id.clone();
        self.operations.push(op);
        Ok(new_id)
    }

    /// Looks up an operation by id for time-travel reads.
    pub fn at(&self, id: &OperationId) -> OperationLogResult<&Operation> {
        self.operations
            .iter()
            .find(|op| &op.operation_id == id)
            .ok_or_else(|| OperationLogError::NotFound(id.clone()))
    }

    /// Lists operations oldest-first.
    pub fn log(&self) -> &[Operation] {
        &self.operations
    }

    /// Restores the view to the state just before the next not-yet-undone
    /// operation, recording the restoration itself as a new operation.
    ///
    /// Calling this repeatedly walks back through the original history one
    /// step at a time rather than replaying the same restore: if the
    /// current head is itself the result of a previous `undo` (i.e. it
    /// carries `undoes: Some(x)`), the operation being undone this time is
    /// `x`'s parent, not `x` itself again. Returns the restored view and the
    /// new head id.
    pub fn undo(
        &mut self,
        user: OperationUser,
        timestamp: crate::backend::Timestamp,
    ) -> OperationLogResult<(View, OperationId)> {
        let head = self.head().ok_or(OperationLogError::Empty)?;
        let head_id = head.operation_id.clone();
        let op_to_undo = match &head.undoes {
            None => head_id.clone(),
            Some(previously_undone) => {
                self.at(previously_undone)?.parents.first().cloned().ok_or(OperationLogError::Empty)?
            }
        };
        let restore_point = self.at(&op_to_undo)?.parents.first().cloned().ok_or(OperationLogError::Empty)?;
        let restored_view = self.at(&restore_point)?.view.clone();
        let new_id = self.record_operation_inner(
            &head_id,
            format!("undo operation {op_to_undo}"),
            user,
            timestamp,
            restored_view.clone(),
            None,
            Some(op_to_undo),
        )?;
        Ok((restored_view, new_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object_id::ChangeId;

    fn user() -> OperationUser {
        OperationUser { name: "t".into(), email: "t@x".into(), hostname: "h".into() }
    }

    fn ts() -> crate::backend::Timestamp {
        crate::backend::Timestamp::now()
    }

    #[test]
    fn record_operation_chains_parents() {
        let mut log = OperationLog::new();
        log.init_root(View::make_root(ChangeId::from_hex("aa")), user(), ts());
        let root_id = log.head_id().unwrap();

        let mut view = log.head().unwrap().view.clone();
        view.bookmarks.insert("main".into(), ChangeId::from_hex("aa"));
        let new_id = log.record_operation(&root_id, "set bookmark", user(), ts(), view, None).unwrap();

        assert_eq!(log.head().unwrap().parents, vec![root_id]);
        assert_eq!(log.head_id().unwrap(), new_id);
    }

    #[test]
    fn conflicting_expected_head_is_rejected() {
        let mut log = OperationLog::new();
        log.init_root(View::make_root(ChangeId::from_hex("aa")), user(), ts());
        let stale_id = OperationId::from_hex("00");
        let view = log.head().unwrap().view.clone();
        let err = log.record_operation(&stale_id, "desc", user(), ts(), view, None).unwrap_err();
        assert!(matches!(err, OperationLogError::Conflict { .. }));
    }

    #[test]
    fn undo_restores_parent_view() {
        let mut log = OperationLog::new();
        log.init_root(View::make_root(ChangeId::from_hex("aa")), user(), ts());
        let root_id = log.head_id().unwrap();
        let root_view = log.head().unwrap().view.clone();

        let mut view = root_view.clone();
        view.bookmarks.insert("main".into(), ChangeId::from_hex("bb"));
        log.record_operation(&root_id, "set bookmark", user(), ts(), view, None).unwrap();

        let (restored, _new_id) = log.undo(user(), ts()).unwrap();
        assert_eq!(restored, root_view);
        assert!(restored.bookmarks.is_empty());
    }

    #[test]
    fn at_finds_a_past_operation() {
        let mut log = OperationLog::new();
        log.init_root(View::make_root(ChangeId::from_hex("aa")), user(), ts());
        let root_id = log.head_id().unwrap();
        assert!(log.at(&root_id).is_ok());
        assert!(log.at(&OperationId::from_hex("ff")).is_err());
    }
}
