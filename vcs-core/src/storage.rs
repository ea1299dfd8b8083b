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

//! A narrow document store over the local filesystem.
//!
//! The filesystem is an external collaborator this core talks to through a
//! narrow interface rather than owning outright. In a native Rust crate
//! that interface is `std::fs` itself; [`Storage`] is the narrow surface
//! everything else in this crate is required to go through.

use std::collections::HashMap;
use std::path::Path;
use std::path::PathBuf;
use std::sync::RwLock;

use serde::Serialize;
use serde::de::DeserializeOwned;

/// Error raised by [`Storage`].
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("failed to read {path}")]
    Read { path: PathBuf, #[source] source: std::io::Error },
    #[error("failed to write {path}")]
    Write { path: PathBuf, #[source] source: std::io::Error },
    #[error("document at {path} is corrupt: {reason}")]
    CorruptStore { path: PathBuf, reason: String },
    #[error("document at {path} has version {found}, expected {expected}")]
    VersionMismatch { path: PathBuf, found: u32, expected: u32 },
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Atomic read/write of structured documents and append-only logs, backed by
/// a directory on disk. Reads are cached; [`Storage::invalidate`] drops the
/// cache.
#[derive(Debug)]
pub struct Storage {
    root: PathBuf,
    cache: RwLock<HashMap<PathBuf, serde_json::Value>>,
}

impl Storage {
    pub fn open(root: impl Into<PathBuf>) -> StorageResult<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|source| StorageError::Write { path: root.clone(), source })?;
        Ok(Self { root, cache: RwLock::new(HashMap::new()) })
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }

    /// Parses a structured document, or returns `Ok(None)` if it does not
    /// exist. Results are cached by resolved path.
    pub fn read<T: DeserializeOwned>(&self, path: &str) -> StorageResult<Option<T>> {
        let full_path = self.resolve(path);
        if let Some(cached) = self.cache.read().unwrap().get(&full_path) {
            return serde_json::from_value(cached.clone())
                .map(Some)
                .map_err(|err| StorageError::CorruptStore { path: full_path.clone(), reason: err.to_string() });
        }
        match std::fs::read(&full_path) {
            Ok(bytes) => {
                let value: serde_json::Value = serde_json::from_slice(&bytes).map_err(|err| {
                    StorageError::CorruptStore { path: full_path.clone(), reason: err.to_string() }
                })?;
                self.cache.write().unwrap().insert(full_path.clone(), value.clone());
                serde_json::from_value(value)
                    .map(Some)
                    .map_err(|err| StorageError::CorruptStore { path: full_path, reason: err.to_string() })
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Read { path: full_path, source }),
        }
    }

    /// Writes `doc` atomically: temp sibling file, flush, rename. On
    /// failure, the prior file is unchanged.
    pub fn write<T: Serialize>(&self, path: &str, doc: &T) -> StorageResult<()> {
        let full_path = self.resolve(path);
        if let Some(parent) = full_path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| StorageError::Write { path: full_path.clone(), source })?;
        }
        let value = serde_json::to_value(doc).expect("document is JSON-representable");
        let bytes = serde_json::to_vec_pretty(&value).expect("json value always serializes");
        self.atomic_write_bytes(&full_path, &bytes)?;
        self.cache.write().unwrap().insert(full_path, value);
        Ok(())
    }

    fn atomic_write_bytes(&self, full_path: &Path, bytes: &[u8]) -> StorageResult<()> {
        let dir = full_path.parent().unwrap_or(&self.root);
        let mut temp_file = tempfile::NamedTempFile::new_in(dir)
            .map_err(|source| StorageError::Write { path: full_path.to_path_buf(), source })?;
        use std::io::Write as _;
        temp_file
            .write_all(bytes)
            .and_then(|()| temp_file.as_file().sync_data())
            .map_err(|source| StorageError::Write { path: full_path.to_path_buf(), source })?;
        temp_file
            .persist(full_path)
            .map_err(|err| StorageError::Write { path: full_path.to_path_buf(), source: err.error })?;
        Ok(())
    }

    /// Appends one self-delimiting textual record to `path`.
    pub fn append_line<T: Serialize>(&self, path: &str, line: &T) -> StorageResult<()> {
        let full_path = self.resolve(path);
        if let Some(parent) = full_path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| StorageError::Write { path: full_path.clone(), source })?;
        }
        let mut text = serde_json::to_string(line).expect("line is JSON-representable");
        text.push('\n');
        use std::fs::OpenOptions;
        use std::io::Write as _;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&full_path)
            .map_err(|source| StorageError::Write { path: full_path.clone(), source })?;
        file.write_all(text.as_bytes()).map_err(|source| StorageError::Write { path: full_path, source })
    }

    /// Reads every non-empty line of `path` as a document.
    pub fn read_lines<T: DeserializeOwned>(&self, path: &str) -> StorageResult<Vec<T>> {
        let full_path = self.resolve(path);
        let text = match std::fs::read_to_string(&full_path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(StorageError::Read { path: full_path, source }),
        };
        text.lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                serde_json::from_str(line)
                    .map_err(|err| StorageError::CorruptStore { path: full_path.clone(), reason: err.to_string() })
            })
            .collect()
    }

    pub fn exists(&self, path: &str) -> bool {
        self.resolve(path).exists()
    }

    /// Drops the read cache. `None` invalidates everything.
    pub fn invalidate(&self, path: Option<&str>) {
        let mut cache = self.cache.write().unwrap();
        match path {
            Some(path) => {
                cache.remove(&self.resolve(path));
            }
            None => cache.clear(),
        }
    }
}

/// Checks a document's `version` field against `expected`; every persisted
/// document carries a version so schema drift is caught explicitly instead
/// of silently misparsing.
pub fn check_version(path: &str, found: u32, expected: u32) -> StorageResult<()> {
    if found != expected {
        return Err(StorageError::VersionMismatch { path: PathBuf::from(path), found, expected });
    }
    Ok(())
}
