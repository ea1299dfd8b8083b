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

//! A change-centric version-control engine layered on top of a Git object
//! store.
//!
//! This crate implements the data model and operations of a Jujutsu-style
//! VCS: stable change identifiers that survive rewrites, a working copy that
//! *is* a change, an append-only operation log that can undo arbitrary
//! mutations, first-class conflicts, bookmarks and tags, and a revset query
//! language over the change graph.
//!
//! The CLI surface, the filesystem, the Git object store implementation, and
//! network transport are external collaborators; this crate talks to them
//! through the narrow interfaces in [`backend`] and [`storage`].

pub mod backend;
pub mod bisect;
pub mod bookmark;
pub mod change;
pub mod change_graph;
pub mod config;
pub mod conflicts;
pub mod content_hash;
pub mod error;
pub mod evolution;
#[cfg(feature = "git")]
pub mod git_backend;
pub mod hex_util;
pub mod hooks;
pub mod merge_driver;
pub mod object_id;
pub mod op_store;
pub mod operation_log;
pub mod repo;
pub mod repo_path;
pub mod revset;
pub mod revset_parser;
pub mod rewrite;
pub mod sparse;
pub mod storage;
pub mod tag;
pub mod working_copy;
pub mod workspace;

pub use error::ErrorCode;
pub use error::RepoError;
pub use repo::RepositoryCore;
