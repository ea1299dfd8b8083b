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

//! Structured first-class conflicts: detection, storage, resolution, and
//! marker rendering/parsing.
//!
//! Conflicts here are a three-way, whole-file-content model rather than
//! n-way diff3 hunks over tree values with copy tracking and line-level
//! diffing; the marker format (`<<<<<<<`/`|||||||`/`=======`/`>>>>>>>`) and
//! the "render, then parse back" contract match the conventional Git
//! conflict-marker style.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::object_id::ObjectId as _;
use crate::object_id::id_type;
use crate::repo_path::RepoPathBuf;
use crate::storage::Storage;
use crate::storage::StorageResult;
use crate::storage::check_version;

const CONFLICTS_DOC_PATH: &str = "conflicts.json";
const CONFLICTS_DOC_VERSION: u32 = 1;

id_type!(
    /// Identifier for a [`Conflict`].
    pub ConflictId
);

/// One side of a three-way comparison: either file content or a subtree
/// reference.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum ConflictSide {
    Content(String),
    Tree(String),
    Absent,
}

impl ConflictSide {
    pub fn as_content(&self) -> Option<&str> {
        match self {
            Self::Content(text) => Some(text),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ConflictSides {
    pub base: ConflictSide,
    pub left: ConflictSide,
    pub right: ConflictSide,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ConflictType {
    Content,
    AddAdd,
    DeleteModify,
    ModifyDelete,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind")]
pub enum Resolution {
    Manual { content: String },
    Side { side: ResolveSide },
    Content { content: String },
    Driver { driver_name: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ResolveSide {
    Ours,
    Theirs,
    Base,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Conflict {
    pub conflict_id: ConflictId,
    pub path: RepoPathBuf,
    pub conflict_type: ConflictType,
    pub sides: ConflictSides,
    pub resolved: bool,
    pub resolution: Option<Resolution>,
    pub timestamp: crate::backend::Timestamp,
}

/// The outcome of comparing base/left/right for one path.
pub enum DetectionOutcome {
    NoConflict { content: ConflictSide },
    Conflict(ConflictType),
}

/// Three-way compares `base`, `left`, `right` for a single path.
pub fn detect(base: &ConflictSide, left: &ConflictSide, right: &ConflictSide) -> DetectionOutcome {
    if left == right {
        return DetectionOutcome::NoConflict { content: left.clone() };
    }
    if base == left {
        return DetectionOutcome::NoConflict { content: right.clone() };
    }
    if base == right {
        return DetectionOutcome::NoConflict { content: left.clone() };
    }
    // Both sides changed, and changed differently.
    match (base, left, right) {
        (ConflictSide::Absent, _, _) => DetectionOutcome::Conflict(ConflictType::AddAdd),
        (_, ConflictSide::Absent, _) => DetectionOutcome::Conflict(ConflictType::DeleteModify),
        (_, _, ConflictSide::Absent) => DetectionOutcome::Conflict(ConflictType::ModifyDelete),
        _ => DetectionOutcome::Conflict(ConflictType::Content),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConflictError {
    #[error("conflict {0} not found")]
    NotFound(ConflictId),
    #[error("no driver registered matches the conflict content needed for resolution")]
    NoResolution,
}

/// `conflictId -> Conflict` plus the `path -> conflictId` index.
#[derive(Debug, Default)]
pub struct ConflictModel {
    conflicts: BTreeMap<ConflictId, Conflict>,
    by_path: BTreeMap<String, ConflictId>,
}

/// Strategy for [`ConflictModel::resolve_all`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveStrategy {
    Ours,
    Theirs,
    Union,
    Driver,
}

/// Filter for [`ConflictModel::resolve_all`].
#[derive(Debug, Clone, Default)]
pub struct ResolveFilter {
    pub path_glob: Option<String>,
}

#[derive(serde::Serialize, serde::Deserialize)]
struct ConflictsDocument {
    version: u32,
    conflicts: BTreeMap<ConflictId, Conflict>,
    by_path: BTreeMap<String, ConflictId>,
}

impl ConflictModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the `conflicts` document, or starts empty if it doesn't exist
    /// yet.
    pub fn load(storage: &Storage) -> StorageResult<Self> {
        let Some(doc): Option<ConflictsDocument> = storage.read(CONFLICTS_DOC_PATH)? else {
            return Ok(Self::new());
        };
        check_version(CONFLICTS_DOC_PATH, doc.version, CONFLICTS_DOC_VERSION)?;
        Ok(Self { conflicts: doc.conflicts, by_path: doc.by_path })
    }

    pub fn save(&self, storage: &Storage) -> StorageResult<()> {
        let doc = ConflictsDocument {
            version: CONFLICTS_DOC_VERSION,
            conflicts: self.conflicts.clone(),
            by_path: self.by_path.clone(),
        };
        storage.write(CONFLICTS_DOC_PATH, &doc)
    }

    /// Records a new unresolved conflict at `path`. At most one active
    /// conflict per path: replaces any prior entry for the same path.
    pub fn record(&mut self, conflict: Conflict) {
        self.by_path.insert(conflict.path.as_str().to_string(), conflict.conflict_id.clone());
        self.conflicts.insert(conflict.conflict_id.clone(), conflict);
    }

    pub fn get(&self, id: &ConflictId) -> Option<&Conflict> {
        self.conflicts.get(id)
    }

    pub fn for_path(&self, path: &str) -> Option<&Conflict> {
        self.by_path.get(path).and_then(|id| self.conflicts.get(id))
    }

    pub fn unresolved(&self) -> impl Iterator<Item = &Conflict> {
        self.conflicts.values().filter(|c| !c.resolved)
    }

    /// Resolves one conflict with an explicit resolution, clearing the
    /// `path -> id` binding.
    pub fn resolve(&mut self, id: &ConflictId, resolution: Resolution) -> Result<ConflictSide, ConflictError> {
        let conflict = self.conflicts.get_mut(id).ok_or_else(|| ConflictError::NotFound(id.clone()))?;
        let resolved_content = resolve_content(conflict, &resolution)?;
        conflict.resolved = true;
        conflict.resolution = Some(resolution);
        self.by_path.remove(conflict.path.as_str());
        Ok(resolved_content)
    }

    /// Applies `strategy` to every unresolved conflict matched by `filter`.
    /// Returns the paths that were resolved.
    pub fn resolve_all(
        &mut self,
        strategy: ResolveStrategy,
        filter: &ResolveFilter,
        mut invoke_driver: impl FnMut(&Conflict) -> Option<String>,
    ) -> Vec<String> {
        let candidates: Vec<ConflictId> = self
            .unresolved()
            .filter(|c| match &filter.path_glob {
                Some(glob) => c.path.matches_glob(glob),
                None => true,
            })
            .map(|c| c.conflict_id.clone())
            .collect();
        let mut resolved_paths = Vec::new();
        for id in candidates {
            let resolution = match strategy {
                ResolveStrategy::Ours => Resolution::Side { side: ResolveSide::Ours },
                ResolveStrategy::Theirs => Resolution::Side { side: ResolveSide::Theirs },
                ResolveStrategy::Union => {
                    let conflict = &self.conflicts[&id];
                    Resolution::Content { content: union_merge(&conflict.sides) }
                }
                ResolveStrategy::Driver => {
                    let conflict = &self.conflicts[&id];
                    match invoke_driver(conflict) {
                        Some(content) => Resolution::Driver { driver_name: content },
                        None => continue,
                    }
                }
            };
            let path = self.conflicts[&id].path.as_str().to_string();
            if self.resolve(&id, resolution).is_ok() {
                resolved_paths.push(path);
            }
        }
        resolved_paths
    }
}

fn resolve_content(conflict: &Conflict, resolution: &Resolution) -> Result<ConflictSide, ConflictError> {
    match resolution {
        Resolution::Manual { content } | Resolution::Content { content } => {
            Ok(ConflictSide::Content(content.clone()))
        }
        Resolution::Side { side } => Ok(match side {
            ResolveSide::Ours => conflict.sides.left.clone(),
            ResolveSide::Theirs => conflict.sides.right.clone(),
            ResolveSide::Base => conflict.sides.base.clone(),
        }),
        Resolution::Driver { driver_name } => Ok(ConflictSide::Content(driver_name.clone())),
    }
}

/// `union` strategy: left lines in order, then right lines not already
/// present.
fn union_merge(sides: &ConflictSides) -> String {
    let left_text = sides.left.as_content().unwrap_or_default();
    let right_text = sides.right.as_content().unwrap_or_default();
    let mut seen: Vec<&str> = left_text.lines().collect();
    let mut out = seen.join("\n");
    for line in right_text.lines() {
        if !seen.contains(&line) {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(line);
            seen.push(line);
        }
    }
    if left_text.ends_with('\n') || right_text.ends_with('\n') {
        out.push('\n');
    }
    out
}

/// Minimum conflict marker length (`<<<<<<<` is 7 characters).
pub const MIN_CONFLICT_MARKER_LEN: usize = 7;

/// Renders standard three-way conflict markers.
pub fn write_markers(sides: &ConflictSides) -> String {
    let marker = "<".repeat(MIN_CONFLICT_MARKER_LEN);
    let base_marker = "|".repeat(MIN_CONFLICT_MARKER_LEN);
    let sep = "=".repeat(MIN_CONFLICT_MARKER_LEN);
    let end_marker = ">".repeat(MIN_CONFLICT_MARKER_LEN);
    let mut out = String::new();
    writeln!(out, "{marker} ours").unwrap();
    write_side_body(&mut out, &sides.left);
    writeln!(out, "{base_marker} base").unwrap();
    write_side_body(&mut out, &sides.base);
    writeln!(out, "{sep}").unwrap();
    write_side_body(&mut out, &sides.right);
    writeln!(out, "{end_marker} theirs").unwrap();
    out
}

fn write_side_body(out: &mut String, side: &ConflictSide) {
    match side.as_content() {
        Some(content) => {
            out.push_str(content);
            if !content.ends_with('\n') {
                out.push('\n');
            }
        }
        None => {}
    }
}

/// Parses standard three-way conflict markers back out. Returns `None` when
/// no markers are found.
pub fn parse_markers(text: &str) -> Option<ConflictSides> {
    let marker = "<".repeat(MIN_CONFLICT_MARKER_LEN);
    let base_marker = "|".repeat(MIN_CONFLICT_MARKER_LEN);
    let sep = "=".repeat(MIN_CONFLICT_MARKER_LEN);
    let end_marker = ">".repeat(MIN_CONFLICT_MARKER_LEN);

    let lines: Vec<&str> = text.lines().collect();
    let start = lines.iter().position(|l| l.starts_with(&marker))?;
    let base_start = lines[start..].iter().position(|l| l.starts_with(&base_marker))? + start;
    let sep_pos = lines[base_start..].iter().position(|l| l.starts_with(&sep))? + base_start;
    let end = lines[sep_pos..].iter().position(|l| l.starts_with(&end_marker))? + sep_pos;

    let left = lines[start + 1..base_start].join("\n");
    let base = lines[base_start + 1..sep_pos].join("\n");
    let right = lines[sep_pos + 1..end].join("\n");

    Some(ConflictSides {
        base: to_side(base),
        left: to_side(left),
        right: to_side(right),
    })
}

fn to_side(mut text: String) -> ConflictSide {
    if text.is_empty() {
        return ConflictSide::Absent;
    }
    text.push('\n');
    ConflictSide::Content(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content(text: &str) -> ConflictSide {
        ConflictSide::Content(text.to_string())
    }

    #[test]
    fn detect_no_conflict_when_only_one_side_changed() {
        let outcome = detect(&content("base"), &content("left"), &content("base"));
        assert!(matches!(outcome, DetectionOutcome::NoConflict { .. }));
    }

    #[test]
    fn detect_no_conflict_when_sides_agree() {
        let outcome = detect(&content("base"), &content("same"), &content("same"));
        assert!(matches!(outcome, DetectionOutcome::NoConflict { .. }));
    }

    #[test]
    fn detect_content_conflict_when_sides_diverge() {
        let outcome = detect(&content("base"), &content("A"), &content("B"));
        assert!(matches!(outcome, DetectionOutcome::Conflict(ConflictType::Content)));
    }

    #[test]
    fn detect_add_add_when_absent_in_base() {
        let outcome = detect(&ConflictSide::Absent, &content("A"), &content("B"));
        assert!(matches!(outcome, DetectionOutcome::Conflict(ConflictType::AddAdd)));
    }

    #[test]
    fn detect_delete_modify_and_modify_delete() {
        let dm = detect(&content("base"), &ConflictSide::Absent, &content("B"));
        assert!(matches!(dm, DetectionOutcome::Conflict(ConflictType::DeleteModify)));
        let md = detect(&content("base"), &content("A"), &ConflictSide::Absent);
        assert!(matches!(md, DetectionOutcome::Conflict(ConflictType::ModifyDelete)));
    }

    #[test]
    fn markers_round_trip() {
        let sides = ConflictSides { base: content("base\n"), left: content("A\n"), right: content("B\n") };
        let rendered = write_markers(&sides);
        let parsed = parse_markers(&rendered).unwrap();
        assert_eq!(parsed, sides);
    }

    #[test]
    fn parse_returns_none_without_markers() {
        assert!(parse_markers("plain text\nno markers here\n").is_none());
    }

    #[test]
    fn union_merge_is_left_then_new_right_lines() {
        let sides = ConflictSides { base: ConflictSide::Absent, left: content("a\nb"), right: content("b\nc") };
        assert_eq!(union_merge(&sides), "a\nb\nc");
    }

    #[test]
    fn load_save_round_trips_through_storage() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::open(dir.path()).unwrap();
        let mut model = ConflictModel::new();
        model.record(Conflict {
            conflict_id: ConflictId::from_hex("aa"),
            path: RepoPathBuf::new("file.txt").unwrap(),
            conflict_type: ConflictType::Content,
            sides: ConflictSides { base: content("base"), left: content("A"), right: content("B") },
            resolved: false,
            resolution: None,
            timestamp: crate::backend::Timestamp::now(),
        });
        model.save(&storage).unwrap();

        let reloaded = ConflictModel::load(&storage).unwrap();
        assert!(reloaded.for_path("file.txt").is_some());
    }
}
