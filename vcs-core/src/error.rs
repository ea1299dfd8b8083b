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

//! The stable error taxonomy shared by every subsystem.
//!
//! Individual modules define their own narrower `#[derive(thiserror::Error)]`
//! enums (see [`crate::storage::StorageError`], [`crate::op_store::OpStoreError`],
//! [`crate::revset::RevsetParseError`]) and convert into [`RepoError`] at the
//! point where they cross into [`crate::repo::RepositoryCore`]'s public API.

use std::fmt;

/// One of the stable error-code strings from the external-interface contract.
///
/// Callers are expected to match on this rather than parse `message`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorCode {
    InvalidArgument,
    InvalidConfig,
    InvalidChangeId,
    InvalidPath,
    InvalidTagName,
    ChangeNotFound,
    ChangeExists,
    BookmarkNotFound,
    BookmarkExists,
    TagNotFound,
    TagExists,
    FileNotFound,
    FileMoveFailed,
    AmbiguousOperation,
    MergeError,
    NotFound,
    NetworkNotAvailable,
    NetworkError,
    AuthFailed,
    PushRejected,
    PushFailed,
    FetchFailed,
    StorageReadFailed,
    StorageWriteFailed,
    StorageCorrupt,
    StorageVersionMismatch,
    UnsupportedOperation,
    BackendNotAvailable,
    BisectAlreadyActive,
    BisectNotActive,
    FileNotInSparse,
    /// Not one of the §6 stable codes; covers §8's `INVALID_OPERATION` used
    /// for cycle/self-parent rejection in `rebase`/`move`.
    InvalidOperation,
    OperationConflict,
}

impl ErrorCode {
    /// The stable string used on the wire / in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::InvalidConfig => "INVALID_CONFIG",
            Self::InvalidChangeId => "INVALID_CHANGE_ID",
            Self::InvalidPath => "INVALID_PATH",
            Self::InvalidTagName => "INVALID_TAG_NAME",
            Self::ChangeNotFound => "CHANGE_NOT_FOUND",
            Self::ChangeExists => "CHANGE_EXISTS",
            Self::BookmarkNotFound => "BOOKMARK_NOT_FOUND",
            Self::BookmarkExists => "BOOKMARK_EXISTS",
            Self::TagNotFound => "TAG_NOT_FOUND",
            Self::TagExists => "TAG_EXISTS",
            Self::FileNotFound => "FILE_NOT_FOUND",
            Self::FileMoveFailed => "FILE_MOVE_FAILED",
            Self::AmbiguousOperation => "AMBIGUOUS_OPERATION",
            Self::MergeError => "MERGE_ERROR",
            Self::NotFound => "NOT_FOUND",
            Self::NetworkNotAvailable => "NETWORK_NOT_AVAILABLE",
            Self::NetworkError => "NETWORK_ERROR",
            Self::AuthFailed => "AUTH_FAILED",
            Self::PushRejected => "PUSH_REJECTED",
            Self::PushFailed => "PUSH_FAILED",
            Self::FetchFailed => "FETCH_FAILED",
            Self::StorageReadFailed => "STORAGE_READ_FAILED",
            Self::StorageWriteFailed => "STORAGE_WRITE_FAILED",
            Self::StorageCorrupt => "STORAGE_CORRUPT",
            Self::StorageVersionMismatch => "STORAGE_VERSION_MISMATCH",
            Self::UnsupportedOperation => "UNSUPPORTED_OPERATION",
            Self::BackendNotAvailable => "BACKEND_NOT_AVAILABLE",
            Self::BisectAlreadyActive => "BISECT_ALREADY_ACTIVE",
            Self::BisectNotActive => "BISECT_NOT_ACTIVE",
            Self::FileNotInSparse => "FILE_NOT_IN_SPARSE",
            Self::InvalidOperation => "INVALID_OPERATION",
            Self::OperationConflict => "OPERATION_CONFLICT",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The error type returned by every [`crate::repo::RepositoryCore`] method.
#[derive(Debug, thiserror::Error)]
#[error("{code}: {message}")]
pub struct RepoError {
    pub code: ErrorCode,
    pub message: String,
    pub suggestion: Option<String>,
    pub details: Option<serde_json::Value>,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl RepoError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            suggestion: None,
            details: None,
            source: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }
}

pub type RepoResult<T> = Result<T, RepoError>;
