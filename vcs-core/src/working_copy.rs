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

//! The working copy: tracked-file state and the current-change pointer.

use std::collections::BTreeMap;

use crate::object_id::ChangeId;
use crate::object_id::OperationId;
use crate::repo_path::RepoPathBuf;
use crate::storage::Storage;
use crate::storage::StorageResult;
use crate::storage::check_version;

const WORKING_COPY_DOC_PATH: &str = "working-copy.json";
const WORKING_COPY_DOC_VERSION: u32 = 1;

/// Recorded state of one tracked file, as of the last snapshot/checkout.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FileState {
    pub mtime_millis: i64,
    pub size: u64,
    pub mode: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum WorkingCopyError {
    #[error(transparent)]
    InvalidPath(#[from] crate::repo_path::InvalidRepoPathError),
    #[error("file not tracked: {0}")]
    NotTracked(String),
    #[error(transparent)]
    Storage(#[from] crate::storage::StorageError),
}

pub type WorkingCopyResult<T> = Result<T, WorkingCopyError>;

#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct WorkingCopyDocument {
    version: u32,
    change_id: ChangeId,
    operation: Option<OperationId>,
    file_states: BTreeMap<String, FileState>,
}

/// Tracks file states for the working copy and the pointer to the change it
/// currently represents. Materialization of files on disk is the caller's
/// responsibility — this type is bookkeeping only, separate from the actual
/// checkout step.
#[derive(Debug)]
pub struct WorkingCopy {
    change_id: ChangeId,
    operation_id: Option<OperationId>,
    file_states: BTreeMap<String, FileState>,
}

impl WorkingCopy {
    /// Initializes a fresh working copy pointed at `root_change_id`.
    pub fn init(root_change_id: ChangeId) -> Self {
        Self { change_id: root_change_id, operation_id: None, file_states: BTreeMap::new() }
    }

    pub fn load(storage: &Storage) -> WorkingCopyResult<Option<Self>> {
        let Some(doc): Option<WorkingCopyDocument> = storage.read(WORKING_COPY_DOC_PATH)? else {
            return Ok(None);
        };
        check_version(WORKING_COPY_DOC_PATH, doc.version, WORKING_COPY_DOC_VERSION)?;
        Ok(Some(Self {
            change_id: doc.change_id,
            operation_id: doc.operation,
            file_states: doc.file_states,
        }))
    }

    pub fn save(&self, storage: &Storage) -> WorkingCopyResult<()> {
        let doc = WorkingCopyDocument {
            version: WORKING_COPY_DOC_VERSION,
            change_id: self.change_id.clone(),
            operation: self.operation_id.clone(),
            file_states: self.file_states.clone(),
        };
        storage.write(WORKING_COPY_DOC_PATH, &doc)?;
        Ok(())
    }

    pub fn current_change(&self) -> &ChangeId {
        &self.change_id
    }

    pub fn last_operation(&self) -> Option<&OperationId> {
        self.operation_id.as_ref()
    }

    /// Sets the current-change pointer. Does *not* materialize files;
    /// the caller must separately check out the change's tree.
    pub fn set_current_change(&mut self, id: ChangeId, operation_id: OperationId) {
        self.change_id = id;
        self.operation_id = Some(operation_id);
    }

    pub fn track_file(&mut self, path: &str, state: FileState) -> WorkingCopyResult<()> {
        let path = RepoPathBuf::new(path)?;
        self.file_states.insert(path.into_string(), state);
        Ok(())
    }

    pub fn untrack_file(&mut self, path: &str) -> WorkingCopyResult<()> {
        let path = RepoPathBuf::new(path)?;
        self.file_states.remove(path.as_str());
        Ok(())
    }

    pub fn list_files(&self) -> Vec<&str> {
        self.file_states.keys().map(String::as_str).collect()
    }

    pub fn file_state(&self, path: &str) -> Option<&FileState> {
        self.file_states.get(path)
    }

    /// Detects modification by mtime/size without content hashing: a file
    /// is modified if it is missing on disk, its size differs, or its mtime
    /// differs from the recorded state. `disk_states` is supplied by the
    /// caller, which owns the actual filesystem probing.
    pub fn modified_files(&self, disk_states: &BTreeMap<String, Option<FileState>>) -> Vec<String> {
        self.file_states
            .iter()
            .filter(|(path, recorded)| match disk_states.get(path.as_str()) {
                None | Some(None) => true,
                Some(Some(on_disk)) => on_disk.size != recorded.size || on_disk.mtime_millis != recorded.mtime_millis,
            })
            .map(|(path, _)| path.clone())
            .collect()
    }

    /// Eager snapshot of file contents, used by operations (`absorb`,
    /// `undo`) that must later restore state. The content lookup is
    /// injected so this type stays filesystem-agnostic; callers read the
    /// bytes themselves.
    pub fn snapshot_files<E>(
        &self,
        mut read_content: impl FnMut(&str) -> Result<String, E>,
    ) -> Result<BTreeMap<String, String>, E> {
        self.file_states
            .keys()
            .map(|path| read_content(path).map(|content| (path.clone(), content)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(size: u64, mtime: i64) -> FileState {
        FileState { mtime_millis: mtime, size, mode: 0o644, hash: None }
    }

    #[test]
    fn track_and_list_round_trips() {
        let mut wc = WorkingCopy::init(ChangeId::from_hex("aa"));
        wc.track_file("a.txt", state(10, 1)).unwrap();
        assert_eq!(wc.list_files(), vec!["a.txt"]);
    }

    #[test]
    fn untrack_removes_the_entry() {
        let mut wc = WorkingCopy::init(ChangeId::from_hex("aa"));
        wc.track_file("a.txt", state(10, 1)).unwrap();
        wc.untrack_file("a.txt").unwrap();
        assert!(wc.list_files().is_empty());
    }

    #[test]
    fn modified_files_flags_size_mtime_and_missing() {
        let mut wc = WorkingCopy::init(ChangeId::from_hex("aa"));
        wc.track_file("a.txt", state(10, 1)).unwrap();
        wc.track_file("b.txt", state(20, 1)).unwrap();
        wc.track_file("c.txt", state(30, 1)).unwrap();

        let mut disk = BTreeMap::new();
        disk.insert("a.txt".to_string(), Some(state(10, 1))); // unchanged
        disk.insert("b.txt".to_string(), Some(state(99, 1))); // size changed
        disk.insert("c.txt".to_string(), None); // missing

        let modified = wc.modified_files(&disk);
        assert_eq!(modified, vec!["b.txt".to_string(), "c.txt".to_string()]);
    }

    #[test]
    fn set_current_change_does_not_touch_file_states() {
        let mut wc = WorkingCopy::init(ChangeId::from_hex("aa"));
        wc.track_file("a.txt", state(10, 1)).unwrap();
        wc.set_current_change(ChangeId::from_hex("bb"), OperationId::from_hex("1234"));
        assert_eq!(wc.current_change(), &ChangeId::from_hex("bb"));
        assert_eq!(wc.list_files(), vec!["a.txt"]);
    }

    #[test]
    fn rejects_invalid_paths() {
        let mut wc = WorkingCopy::init(ChangeId::from_hex("aa"));
        assert!(wc.track_file("../escape", state(1, 1)).is_err());
    }
}
