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

//! A [`GitBackend`] implementation backed by a real `.git` directory via
//! `git2` (libgit2 bindings) — the `"git"` backend a repository can be
//! created with.
//!
//! `git2`'s synchronous `Odb`/`Reference` API maps directly onto
//! [`GitBackend`]'s synchronous, object-safe methods without needing an
//! async runtime in the dependency graph (see DESIGN.md).

#![cfg(feature = "git")]

use std::path::Path;
use std::path::PathBuf;

use crate::backend::BackendError;
use crate::backend::BackendResult;
use crate::backend::CreateCommitRequest;
use crate::backend::FetchRequest;
use crate::backend::FetchResult;
use crate::backend::GitBackend;
use crate::backend::GitObject;
use crate::backend::GitObjectId;
use crate::backend::GitObjectType;
use crate::backend::PushRequest;
use crate::backend::PushResult;
use crate::object_id::ObjectId as _;

fn map_git2_err(context: &'static str, err: git2::Error) -> BackendError {
    BackendError::Other(Box::new(std::io::Error::other(format!("{context}: {err}"))))
}

fn object_type_to_git2(object_type: GitObjectType) -> git2::ObjectType {
    match object_type {
        GitObjectType::Blob => git2::ObjectType::Blob,
        GitObjectType::Tree => git2::ObjectType::Tree,
        GitObjectType::Commit => git2::ObjectType::Commit,
    }
}

fn object_type_from_git2(object_type: git2::ObjectType) -> GitObjectType {
    match object_type {
        git2::ObjectType::Tree => GitObjectType::Tree,
        git2::ObjectType::Commit => GitObjectType::Commit,
        _ => GitObjectType::Blob,
    }
}

fn oid_to_git2(oid: &GitObjectId) -> BackendResult<git2::Oid> {
    git2::Oid::from_str(&oid.hex()).map_err(|err| map_git2_err("invalid oid", err))
}

fn oid_from_git2(oid: git2::Oid) -> GitObjectId {
    GitObjectId::from_hex(&oid.to_string())
}

/// A [`GitBackend`] over a colocated (or bare) `.git` directory.
pub struct Git2Backend {
    repo: std::sync::Mutex<git2::Repository>,
    path: PathBuf,
}

impl std::fmt::Debug for Git2Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Git2Backend").field("path", &self.path).finish_non_exhaustive()
    }
}

impl Git2Backend {
    /// Opens an existing Git directory.
    pub fn open(path: impl AsRef<Path>) -> BackendResult<Self> {
        let repo = git2::Repository::open(path.as_ref())
            .map_err(|err| map_git2_err("open git repository", err))?;
        Ok(Self { repo: std::sync::Mutex::new(repo), path: path.as_ref().to_path_buf() })
    }

    /// Initializes a new Git directory at `path` (bare, since this backend
    /// is driven entirely through the object database and refs, never
    /// through a Git working tree of its own).
    pub fn init(path: impl AsRef<Path>) -> BackendResult<Self> {
        let repo = git2::Repository::init_bare(path.as_ref())
            .map_err(|err| map_git2_err("init git repository", err))?;
        Ok(Self { repo: std::sync::Mutex::new(repo), path: path.as_ref().to_path_buf() })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl GitBackend for Git2Backend {
    fn name(&self) -> &str {
        "git"
    }

    fn get_object(&self, oid: &GitObjectId) -> BackendResult<GitObject> {
        let repo = self.repo.lock().unwrap();
        let git_oid = oid_to_git2(oid)?;
        let odb = repo.odb().map_err(|err| map_git2_err("open odb", err))?;
        let object = odb.read(git_oid).map_err(|err| {
            tracing::debug!(%err, oid = %oid.hex(), "git2 object read failed");
            BackendError::ObjectNotFound { object_type: GitObjectType::Blob, hash: oid.hex() }
        })?;
        Ok(GitObject {
            object_type: object_type_from_git2(object.kind()),
            data: object.data().to_vec(),
        })
    }

    fn put_object(&self, object_type: GitObjectType, data: &[u8]) -> BackendResult<GitObjectId> {
        let repo = self.repo.lock().unwrap();
        let odb = repo.odb().map_err(|err| map_git2_err("open odb", err))?;
        let oid = odb
            .write(object_type_to_git2(object_type), data)
            .map_err(|err| BackendError::WriteObject { object_type, source: Box::new(err) })?;
        Ok(oid_from_git2(oid))
    }

    fn read_ref(&self, name: &str) -> BackendResult<Option<GitObjectId>> {
        let repo = self.repo.lock().unwrap();
        match repo.find_reference(name) {
            Ok(reference) => Ok(reference.target().map(oid_from_git2)),
            Err(err) if err.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(err) => Err(map_git2_err("read ref", err)),
        }
    }

    fn update_ref(&self, name: &str, oid: Option<GitObjectId>) -> BackendResult<()> {
        let repo = self.repo.lock().unwrap();
        match oid {
            Some(oid) => {
                let git_oid = oid_to_git2(&oid)?;
                repo.reference(name, git_oid, true, "vcs-core: update ref")
                    .map_err(|err| map_git2_err("update ref", err))?;
            }
            None => {
                if let Ok(mut reference) = repo.find_reference(name) {
                    reference.delete().map_err(|err| map_git2_err("delete ref", err))?;
                }
            }
        }
        Ok(())
    }

    fn list_refs(&self, prefix: &str) -> BackendResult<Vec<(String, GitObjectId)>> {
        let repo = self.repo.lock().unwrap();
        let mut out = Vec::new();
        let references = repo.references().map_err(|err| map_git2_err("list refs", err))?;
        for reference in references {
            let reference = reference.map_err(|err| map_git2_err("iterate refs", err))?;
            let Some(name) = reference.name() else { continue };
            if !name.starts_with(prefix) {
                continue;
            }
            if let Some(target) = reference.target() {
                out.push((name.to_string(), oid_from_git2(target)));
            }
        }
        Ok(out)
    }

    fn create_commit(&self, request: CreateCommitRequest) -> BackendResult<GitObjectId> {
        let repo = self.repo.lock().unwrap();
        let tree_oid = match &request.tree {
            Some(oid) => oid_to_git2(oid)?,
            None => {
                return Err(BackendError::Unsupported(
                    "create_commit requires an explicit tree for this backend",
                ));
            }
        };
        let tree = repo.find_tree(tree_oid).map_err(|err| map_git2_err("find tree", err))?;
        let parent_oids = request
            .parents
            .iter()
            .map(oid_to_git2)
            .collect::<BackendResult<Vec<_>>>()?;
        let parent_commits = parent_oids
            .iter()
            .map(|oid| repo.find_commit(*oid))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| map_git2_err("find parent commit", err))?;
        let parent_refs: Vec<&git2::Commit> = parent_commits.iter().collect();
        let author = git2::Signature::new(
            &request.author.name,
            &request.author.email,
            &git2::Time::new(request.author.timestamp.timestamp.0 / 1000, request.author.timestamp.tz_offset),
        )
        .map_err(|err| map_git2_err("build author signature", err))?;
        let committer = git2::Signature::new(
            &request.committer.name,
            &request.committer.email,
            &git2::Time::new(
                request.committer.timestamp.timestamp.0 / 1000,
                request.committer.timestamp.tz_offset,
            ),
        )
        .map_err(|err| map_git2_err("build committer signature", err))?;
        let oid = repo
            .commit(None, &author, &committer, &request.message, &tree, &parent_refs)
            .map_err(|err| map_git2_err("create commit", err))?;
        Ok(oid_from_git2(oid))
    }

    fn fetch(&self, request: FetchRequest) -> BackendResult<FetchResult> {
        let repo = self.repo.lock().unwrap();
        let mut remote = repo
            .find_remote(&request.remote)
            .map_err(|err| map_git2_err("find remote", err))?;
        let refspecs: Vec<&str> = request.refs.iter().map(String::as_str).collect();
        remote
            .fetch(&refspecs, None, None)
            .map_err(|err| BackendError::Network(err.to_string()))?;
        Ok(FetchResult { fetched: request.refs.clone(), updated: request.refs })
    }

    fn push(&self, request: PushRequest) -> BackendResult<PushResult> {
        let repo = self.repo.lock().unwrap();
        let mut remote = repo
            .find_remote(&request.remote)
            .map_err(|err| map_git2_err("find remote", err))?;
        let refspecs: Vec<String> = request
            .refs
            .iter()
            .map(|r| if request.force { format!("+{r}") } else { r.clone() })
            .collect();
        let refspec_refs: Vec<&str> = refspecs.iter().map(String::as_str).collect();
        match remote.push(&refspec_refs, None) {
            Ok(()) => Ok(PushResult { pushed: request.refs, rejected: vec![] }),
            Err(err) => Err(BackendError::PushRejected(err.to_string())),
        }
    }
}
