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

//! Shared rebase/merge helpers used by `RepositoryCore`'s `merge`,
//! `move`/`rebase`, and `absorb` operations.
//!
//! Common-ancestor search proceeds via bidirectional graph expansion, and
//! merging follows a driver-then-registry-then-fallback order, operating on
//! this crate's path -> content map model rather than Git tree objects
//! since there is no tree-materialization layer in this crate.

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::collections::VecDeque;

use crate::backend::Timestamp;
use crate::change_graph::ChangeGraph;
use crate::content_hash::ContentHash as _;
use crate::conflicts::Conflict;
use crate::conflicts::ConflictId;
use crate::conflicts::ConflictModel;
use crate::conflicts::ConflictSide;
use crate::conflicts::ConflictSides;
use crate::conflicts::ConflictType;
use crate::conflicts::DetectionOutcome;
use crate::conflicts::detect;
use crate::merge_driver::DriverInput;
use crate::merge_driver::MergeDriverRegistry;
use crate::object_id::ChangeId;
use crate::repo_path::RepoPathBuf;

/// Finds a common ancestor of `a` and `b` by expanding both ancestor
/// frontiers breadth-first in lockstep, stopping at the first change visited
/// from both sides. This crate has no generation-number index to prune
/// with, so ties among multiple merge bases are broken by whichever
/// frontier reaches one first.
pub fn nearest_common_ancestor(graph: &ChangeGraph, a: &ChangeId, b: &ChangeId) -> Option<ChangeId> {
    if a == b {
        return Some(a.clone());
    }
    let mut seen_from_a: BTreeSet<ChangeId> = BTreeSet::from([a.clone()]);
    let mut seen_from_b: BTreeSet<ChangeId> = BTreeSet::from([b.clone()]);
    let mut frontier_a: VecDeque<ChangeId> = VecDeque::from([a.clone()]);
    let mut frontier_b: VecDeque<ChangeId> = VecDeque::from([b.clone()]);

    while !frontier_a.is_empty() || !frontier_b.is_empty() {
        if let Some(found) = advance(graph, &mut frontier_a, &mut seen_from_a, &seen_from_b) {
            return Some(found);
        }
        if let Some(found) = advance(graph, &mut frontier_b, &mut seen_from_b, &seen_from_a) {
            return Some(found);
        }
    }
    None
}

fn advance(
    graph: &ChangeGraph,
    frontier: &mut VecDeque<ChangeId>,
    seen: &mut BTreeSet<ChangeId>,
    other_seen: &BTreeSet<ChangeId>,
) -> Option<ChangeId> {
    let current = frontier.pop_front()?;
    for parent in graph.parents(&current) {
        if other_seen.contains(&parent) {
            return Some(parent);
        }
        if seen.insert(parent.clone()) {
            frontier.push_back(parent);
        }
    }
    None
}

/// Whether `candidate` would close a cycle if reparented under `new_parent`:
/// every new parent's ancestor set must not contain the change being
/// reparented, and self-parenting is always rejected.
pub fn would_cycle(graph: &ChangeGraph, candidate: &ChangeId, new_parent: &ChangeId) -> bool {
    candidate == new_parent || graph.ancestors(new_parent).contains(candidate)
}

fn side_for(files: &BTreeMap<String, String>, path: &str) -> ConflictSide {
    match files.get(path) {
        Some(content) => ConflictSide::Content(content.clone()),
        None => ConflictSide::Absent,
    }
}

/// Outcome of a three-way merge of whole file trees.
#[derive(Debug, Default)]
pub struct MergeOutcome {
    /// The merged content for every path that resolved without a conflict.
    pub merged_files: BTreeMap<String, String>,
    /// Paths for which deletion was the resolved outcome (absent from
    /// `merged_files` on purpose, not by omission).
    pub deleted_paths: BTreeSet<String>,
    /// Newly recorded conflicts, registered into the `ConflictModel` passed
    /// in.
    pub conflicts: Vec<ConflictId>,
}

/// Performs a per-path three-way merge of `base`/`left`/`right` file trees,
/// consulting per-merge drivers first, then the driver registry, before
/// falling back to a default merge. Unresolved paths are recorded
/// into `conflict_model` and returned as fresh [`ConflictId`]s; the caller
/// decides whether to keep or discard them (e.g. a `dryRun` merge discards).
pub fn merge_file_trees(
    base: &BTreeMap<String, String>,
    left: &BTreeMap<String, String>,
    right: &BTreeMap<String, String>,
    drivers: &MergeDriverRegistry,
    conflict_model: &mut ConflictModel,
    timestamp: Timestamp,
) -> MergeOutcome {
    let mut paths: BTreeSet<&String> = BTreeSet::new();
    paths.extend(base.keys());
    paths.extend(left.keys());
    paths.extend(right.keys());

    let mut outcome = MergeOutcome::default();
    for path in paths {
        let sides = ConflictSides {
            base: side_for(base, path),
            left: side_for(left, path),
            right: side_for(right, path),
        };
        match detect(&sides.base, &sides.left, &sides.right) {
            DetectionOutcome::NoConflict { content } => match content.as_content() {
                Some(text) => {
                    outcome.merged_files.insert(path.clone(), text.to_string());
                }
                None => {
                    outcome.deleted_paths.insert(path.clone());
                }
            },
            DetectionOutcome::Conflict(conflict_type) => {
                let driver_input = DriverInput { path, sides: &sides, ancestors: &[] };
                if let Some(Ok(output)) = drivers.run(&driver_input) {
                    if !output.has_conflict {
                        outcome.merged_files.insert(path.clone(), output.content);
                        continue;
                    }
                }
                // Driver absent or itself reported a conflict: fall back to a
                // recorded content conflict. If a driver errors, the system
                // falls back to the default three-way merge.
                let Ok(repo_path) = RepoPathBuf::new(path.clone()) else { continue };
                let conflict_id = conflict_id_for(path, &sides, timestamp);
                let conflict = Conflict {
                    conflict_id: conflict_id.clone(),
                    path: repo_path,
                    conflict_type,
                    sides,
                    resolved: false,
                    resolution: None,
                    timestamp,
                };
                conflict_model.record(conflict);
                outcome.conflicts.push(conflict_id);
            }
        }
    }
    outcome
}

/// Derives a [`ConflictId`] by content-hashing the path, sides, and
/// timestamp, the same way [`crate::op_store`] derives `OperationId`/`ViewId`
/// — content-addressed, so recording the same conflict twice is idempotent
/// under the same id.
fn conflict_id_for(path: &str, sides: &ConflictSides, timestamp: Timestamp) -> ConflictId {
    #[derive(serde::Serialize)]
    struct Keyed<'a> {
        path: &'a str,
        sides: &'a ConflictSides,
        timestamp: Timestamp,
    }
    let keyed = Keyed { path, sides, timestamp };
    ConflictId::from_hex(&keyed.content_hash())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Signature;
    use crate::change::Change;
    use crate::change::TreeRef;
    use crate::object_id::zero_commit_id;

    fn change(id: &str, parents: Vec<&str>) -> Change {
        Change {
            change_id: ChangeId::from_hex(id),
            commit_id: zero_commit_id(),
            parents: parents.into_iter().map(ChangeId::from_hex).collect(),
            tree: TreeRef::empty(),
            author: Signature { name: "a".into(), email: "a@x".into(), timestamp: Timestamp::now() },
            committer: Signature { name: "a".into(), email: "a@x".into(), timestamp: Timestamp::now() },
            description: String::new(),
            timestamp: Timestamp::now(),
            predecessors: vec![],
            abandoned: false,
            file_snapshot: None,
        }
    }

    fn diamond_graph() -> ChangeGraph {
        let mut graph = ChangeGraph::new();
        graph.add(change("base", vec![])).unwrap();
        graph.add(change("left", vec!["base"])).unwrap();
        graph.add(change("right", vec!["base"])).unwrap();
        graph
    }

    #[test]
    fn finds_the_shared_base_of_a_diamond() {
        let graph = diamond_graph();
        let found = nearest_common_ancestor(&graph, &ChangeId::from_hex("left"), &ChangeId::from_hex("right"));
        assert_eq!(found, Some(ChangeId::from_hex("base")));
    }

    #[test]
    fn identical_changes_are_their_own_ancestor() {
        let graph = diamond_graph();
        let found = nearest_common_ancestor(&graph, &ChangeId::from_hex("left"), &ChangeId::from_hex("left"));
        assert_eq!(found, Some(ChangeId::from_hex("left")));
    }

    #[test]
    fn unrelated_roots_have_no_common_ancestor() {
        let mut graph = ChangeGraph::new();
        graph.add(change("a", vec![])).unwrap();
        graph.add(change("b", vec![])).unwrap();
        assert_eq!(nearest_common_ancestor(&graph, &ChangeId::from_hex("a"), &ChangeId::from_hex("b")), None);
    }

    #[test]
    fn would_cycle_rejects_self_and_descendant_reparenting() {
        let graph = diamond_graph();
        assert!(would_cycle(&graph, &ChangeId::from_hex("base"), &ChangeId::from_hex("base")));
        assert!(would_cycle(&graph, &ChangeId::from_hex("base"), &ChangeId::from_hex("left")));
        assert!(!would_cycle(&graph, &ChangeId::from_hex("left"), &ChangeId::from_hex("right")));
    }

    #[test]
    fn diverging_edit_becomes_a_content_conflict() {
        let mut base = BTreeMap::new();
        base.insert("file.txt".to_string(), "base\n".to_string());
        let mut left = base.clone();
        left.insert("file.txt".to_string(), "A\n".to_string());
        let mut right = base.clone();
        right.insert("file.txt".to_string(), "B\n".to_string());

        let drivers = MergeDriverRegistry::new();
        let mut conflicts = ConflictModel::new();
        let outcome = merge_file_trees(&base, &left, &right, &drivers, &mut conflicts, Timestamp::now());

        assert_eq!(outcome.conflicts.len(), 1);
        let conflict = conflicts.get(&outcome.conflicts[0]).unwrap();
        assert_eq!(conflict.path.as_str(), "file.txt");
        assert_eq!(conflict.conflict_type, ConflictType::Content);
    }

    #[test]
    fn only_one_side_changing_merges_cleanly() {
        let mut base = BTreeMap::new();
        base.insert("file.txt".to_string(), "base\n".to_string());
        let left = base.clone();
        let mut right = base.clone();
        right.insert("file.txt".to_string(), "B\n".to_string());

        let drivers = MergeDriverRegistry::new();
        let mut conflicts = ConflictModel::new();
        let outcome = merge_file_trees(&base, &left, &right, &drivers, &mut conflicts, Timestamp::now());

        assert!(outcome.conflicts.is_empty());
        assert_eq!(outcome.merged_files.get("file.txt"), Some(&"B\n".to_string()));
    }

    #[test]
    fn a_non_conflicting_driver_resolves_without_recording_a_conflict() {
        let mut base = BTreeMap::new();
        base.insert("file.txt".to_string(), "base\n".to_string());
        let mut left = base.clone();
        left.insert("file.txt".to_string(), "A\n".to_string());
        let mut right = base.clone();
        right.insert("file.txt".to_string(), "B\n".to_string());

        let mut drivers = MergeDriverRegistry::new();
        drivers.register(
            "file.txt",
            Box::new(|_| Ok(crate::merge_driver::DriverOutput { content: "merged\n".into(), has_conflict: false })),
        );
        let mut conflicts = ConflictModel::new();
        let outcome = merge_file_trees(&base, &left, &right, &drivers, &mut conflicts, Timestamp::now());

        assert!(outcome.conflicts.is_empty());
        assert_eq!(outcome.merged_files.get("file.txt"), Some(&"merged\n".to_string()));
    }
}
