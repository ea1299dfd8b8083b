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

//! Tags: immutable named pointers at a [`ChangeId`].
//! Unlike [`crate::bookmark::BookmarkStore`], a tag can never be moved —
//! re-creating one under the same name is always `TAG_EXISTS`, even when the
//! target would be unchanged.

use std::collections::BTreeMap;

use crate::error::ErrorCode;
use crate::error::RepoError;
use crate::object_id::ChangeId;

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Tag {
    pub name: String,
    pub change_id: ChangeId,
}

#[derive(Debug, Default, Clone, serde::Serialize, serde::Deserialize)]
pub struct TagStore {
    tags: BTreeMap<String, Tag>,
}

impl TagStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reconstructs tags from a [`crate::op_store::View`] snapshot (see
    /// DESIGN.md: tags are embedded in the view, not a separate document).
    pub(crate) fn from_view(map: &BTreeMap<String, ChangeId>) -> Self {
        let tags = map
            .iter()
            .map(|(name, change_id)| (name.clone(), Tag { name: name.clone(), change_id: change_id.clone() }))
            .collect();
        Self { tags }
    }

    /// Projects tags back into the `View` shape for persistence.
    pub(crate) fn to_view_map(&self) -> BTreeMap<String, ChangeId> {
        self.tags.iter().map(|(name, tag)| (name.clone(), tag.change_id.clone())).collect()
    }

    /// Creates `name` pointing at `change_id`. Always `TAG_EXISTS` if the
    /// name is already taken, regardless of whether the target matches —
    /// tags are immutable.
    pub fn create(&mut self, name: impl Into<String>, change_id: ChangeId) -> Result<(), RepoError> {
        let name = name.into();
        if self.tags.contains_key(&name) {
            return Err(RepoError::new(ErrorCode::TagExists, format!("tag already exists: {name}")));
        }
        self.tags.insert(name.clone(), Tag { name, change_id });
        Ok(())
    }

    /// The only mutation a tag supports: removing it entirely.
    pub fn delete(&mut self, name: &str) -> Result<(), RepoError> {
        self.tags
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| RepoError::new(ErrorCode::TagNotFound, format!("tag not found: {name}")))
    }

    pub fn get(&self, name: &str) -> Option<&Tag> {
        self.tags.get(name)
    }

    pub fn list(&self) -> impl Iterator<Item = &Tag> {
        self.tags.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_then_recreate_with_same_target_still_fails() {
        let mut store = TagStore::new();
        store.create("v1", ChangeId::from_hex("aa")).unwrap();
        let err = store.create("v1", ChangeId::from_hex("aa")).unwrap_err();
        assert_eq!(err.code, ErrorCode::TagExists);
    }

    #[test]
    fn delete_then_recreate_succeeds() {
        let mut store = TagStore::new();
        store.create("v1", ChangeId::from_hex("aa")).unwrap();
        store.delete("v1").unwrap();
        store.create("v1", ChangeId::from_hex("bb")).unwrap();
        assert_eq!(store.get("v1").unwrap().change_id, ChangeId::from_hex("bb"));
    }

    #[test]
    fn delete_unknown_tag_fails() {
        let mut store = TagStore::new();
        let err = store.delete("missing").unwrap_err();
        assert_eq!(err.code, ErrorCode::TagNotFound);
    }
}
