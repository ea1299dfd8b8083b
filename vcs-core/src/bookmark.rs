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

//! Bookmarks: movable named pointers at a [`ChangeId`]. Names are plain
//! owned `String` keys — there is no borrowed-vs-owned name distinction to
//! preserve here.

use std::collections::BTreeMap;

use crate::error::ErrorCode;
use crate::error::RepoError;
use crate::object_id::ChangeId;

/// A single bookmark's state: a local target and, optionally, remote
/// tracking state.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Bookmark {
    pub name: String,
    pub target: ChangeId,
    /// Remote name this bookmark is tracking, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote: Option<String>,
    #[serde(default)]
    pub tracked: bool,
}

/// Local and remote bookmark state, keyed by bookmark name.
#[derive(Debug, Default, Clone, serde::Serialize, serde::Deserialize)]
pub struct BookmarkStore {
    local: BTreeMap<String, Bookmark>,
}

impl BookmarkStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reconstructs local bookmark targets from a [`crate::op_store::View`]
    /// snapshot — the view embeds bookmarks directly rather than through a
    /// separate persisted document (see DESIGN.md), so `RepositoryCore`
    /// rebuilds this store from the operation log's head view on `open`.
    pub(crate) fn from_view(map: &BTreeMap<String, ChangeId>) -> Self {
        let local = map
            .iter()
            .map(|(name, target)| (name.clone(), Bookmark { name: name.clone(), target: target.clone(), remote: None, tracked: false }))
            .collect();
        Self { local }
    }

    /// Projects local targets back into the `View` shape for persistence.
    pub(crate) fn to_view_map(&self) -> BTreeMap<String, ChangeId> {
        self.local.iter().map(|(name, bookmark)| (name.clone(), bookmark.target.clone())).collect()
    }

    /// Creates a new bookmark pointing at `target`. Fails with
    /// `BOOKMARK_EXISTS` if the name is already taken.
    pub fn create(&mut self, name: impl Into<String>, target: ChangeId) -> Result<(), RepoError> {
        let name = name.into();
        if self.local.contains_key(&name) {
            return Err(RepoError::new(ErrorCode::BookmarkExists, format!("bookmark already exists: {name}")));
        }
        self.local.insert(name.clone(), Bookmark { name, target, remote: None, tracked: false });
        Ok(())
    }

    /// Moves an existing bookmark to `target`. Fails with
    /// `BOOKMARK_NOT_FOUND` if it does not exist.
    pub fn set(&mut self, name: &str, target: ChangeId) -> Result<(), RepoError> {
        let bookmark = self
            .local
            .get_mut(name)
            .ok_or_else(|| RepoError::new(ErrorCode::BookmarkNotFound, format!("bookmark not found: {name}")))?;
        bookmark.target = target;
        Ok(())
    }

    /// Creates the bookmark if absent, otherwise moves it. Used by the
    /// `bookmark set --allow-backwards`-style call sites that do not care
    /// which happened.
    pub fn upsert(&mut self, name: impl Into<String>, target: ChangeId) {
        let name = name.into();
        self.local
            .entry(name.clone())
            .and_modify(|bookmark| bookmark.target = target.clone())
            .or_insert(Bookmark { name, target, remote: None, tracked: false });
    }

    pub fn delete(&mut self, name: &str) -> Result<(), RepoError> {
        self.local
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| RepoError::new(ErrorCode::BookmarkNotFound, format!("bookmark not found: {name}")))
    }

    pub fn get(&self, name: &str) -> Option<&Bookmark> {
        self.local.get(name)
    }

    pub fn list(&self) -> impl Iterator<Item = &Bookmark> {
        self.local.values()
    }

    /// Bookmarks currently pointing at `change_id`.
    pub fn pointing_at<'a>(&'a self, change_id: &'a ChangeId) -> impl Iterator<Item = &'a Bookmark> {
        self.local.values().filter(move |bookmark| &bookmark.target == change_id)
    }

    pub fn set_tracked(&mut self, name: &str, remote: impl Into<String>) -> Result<(), RepoError> {
        let bookmark = self
            .local
            .get_mut(name)
            .ok_or_else(|| RepoError::new(ErrorCode::BookmarkNotFound, format!("bookmark not found: {name}")))?;
        bookmark.remote = Some(remote.into());
        bookmark.tracked = true;
        Ok(())
    }
}
