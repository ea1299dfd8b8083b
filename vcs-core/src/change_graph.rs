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

//! [`ChangeGraph`]: the in-memory index over the persisted change graph
//! document.

use std::collections::HashMap;
use std::collections::HashSet;
use std::collections::VecDeque;

use indexmap::IndexMap;

use crate::change::Change;
use crate::object_id::ChangeId;
use crate::object_id::CommitId;
use crate::object_id::HexPrefix;
use crate::object_id::ObjectId as _;
use crate::object_id::PrefixResolution;
use crate::storage::Storage;
use crate::storage::StorageResult;
use crate::storage::check_version;

const GRAPH_DOC_PATH: &str = "graph.json";
const GRAPH_DOC_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum ChangeGraphError {
    #[error("change {0} not found")]
    NotFound(ChangeId),
    #[error("change {0} already exists")]
    AlreadyExists(ChangeId),
    #[error("change {child} cannot have itself as a parent")]
    SelfParent { child: ChangeId },
    #[error("parent {parent} of change {child} does not exist")]
    DanglingParent { child: ChangeId, parent: ChangeId },
    #[error("adding this edge would create a cycle through {0}")]
    CycleDetected(ChangeId),
    #[error(transparent)]
    Storage(#[from] crate::storage::StorageError),
}

pub type ChangeGraphResult<T> = Result<T, ChangeGraphError>;

#[derive(serde::Serialize, serde::Deserialize)]
struct GraphDocument {
    version: u32,
    changes: IndexMap<ChangeId, Change>,
}

/// In-memory index over the graph document: nodes, a commit-id index, and
/// the traversal operations built on top of them.
#[derive(Debug, Default)]
pub struct ChangeGraph {
    nodes: IndexMap<ChangeId, Change>,
    by_commit: HashMap<CommitId, ChangeId>,
}

impl ChangeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the graph document, or starts empty if it doesn't exist yet.
    pub fn load(storage: &Storage) -> ChangeGraphResult<Self> {
        let Some(doc): Option<GraphDocument> = storage.read(GRAPH_DOC_PATH)? else {
            return Ok(Self::default());
        };
        check_version(GRAPH_DOC_PATH, doc.version, GRAPH_DOC_VERSION)?;
        let by_commit = doc
            .changes
            .values()
            .filter(|change| !change.is_uncommitted())
            .map(|change| (change.commit_id.clone(), change.change_id.clone()))
            .collect();
        Ok(Self { nodes: doc.changes, by_commit })
    }

    /// Persists the graph document atomically.
    pub fn save(&self, storage: &Storage) -> ChangeGraphResult<()> {
        let doc = GraphDocument { version: GRAPH_DOC_VERSION, changes: self.nodes.clone() };
        storage.write(GRAPH_DOC_PATH, &doc)?;
        Ok(())
    }

    /// Adds a new node. Validates no self-edge and that every parent
    /// already exists.
    pub fn add(&mut self, change: Change) -> ChangeGraphResult<()> {
        if self.nodes.contains_key(&change.change_id) {
            return Err(ChangeGraphError::AlreadyExists(change.change_id.clone()));
        }
        self.validate_parents(&change.change_id, &change.parents)?;
        if !change.is_uncommitted() {
            self.by_commit.insert(change.commit_id.clone(), change.change_id.clone());
        }
        self.nodes.insert(change.change_id.clone(), change);
        Ok(())
    }

    /// Replaces an existing node's data, atomically swapping the commit-id
    /// index entry. `predecessors` must have been extended, never
    /// shortened, by the caller.
    pub fn update(&mut self, change: Change) -> ChangeGraphResult<()> {
        let Some(previous) = self.nodes.get(&change.change_id) else {
            return Err(ChangeGraphError::NotFound(change.change_id.clone()));
        };
        if change.parents.contains(&change.change_id) {
            return Err(ChangeGraphError::SelfParent { child: change.change_id.clone() });
        }
        self.validate_parents(&change.change_id, &change.parents)?;
        self.check_acyclic(&change.change_id, &change.parents)?;
        if !previous.is_uncommitted() {
            self.by_commit.remove(&previous.commit_id);
        }
        if !change.is_uncommitted() {
            self.by_commit.insert(change.commit_id.clone(), change.change_id.clone());
        }
        self.nodes.insert(change.change_id.clone(), change);
        Ok(())
    }

    fn validate_parents(&self, child: &ChangeId, parents: &[ChangeId]) -> ChangeGraphResult<()> {
        for parent in parents {
            if parent == child {
                return Err(ChangeGraphError::SelfParent { child: child.clone() });
            }
            if !self.nodes.contains_key(parent) {
                return Err(ChangeGraphError::DanglingParent { child: child.clone(), parent: parent.clone() });
            }
        }
        Ok(())
    }

    /// Rejects `parents` if any of them has `child` as an ancestor, which
    /// would close a cycle.
    fn check_acyclic(&self, child: &ChangeId, parents: &[ChangeId]) -> ChangeGraphResult<()> {
        for parent in parents {
            if self.ancestors(parent).contains(child) {
                return Err(ChangeGraphError::CycleDetected(child.clone()));
            }
        }
        Ok(())
    }

    pub fn get(&self, id: &ChangeId) -> Option<&Change> {
        self.nodes.get(id)
    }

    pub fn get_mut(&mut self, id: &ChangeId) -> Option<&mut Change> {
        self.nodes.get_mut(id)
    }

    pub fn contains(&self, id: &ChangeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn find_by_commit(&self, commit_id: &CommitId) -> Option<&Change> {
        self.by_commit.get(commit_id).and_then(|id| self.nodes.get(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Change> {
        self.nodes.values()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn parents(&self, id: &ChangeId) -> Vec<ChangeId> {
        self.nodes.get(id).map(|c| c.parents.clone()).unwrap_or_default()
    }

    /// Linear scan for every node listing `id` as a parent.
    pub fn children(&self, id: &ChangeId) -> Vec<ChangeId> {
        self.nodes
            .values()
            .filter(|change| change.parents.contains(id))
            .map(|change| change.change_id.clone())
            .collect()
    }

    /// Breadth-first set of all ancestors of `id`, not including `id`
    /// itself.
    pub fn ancestors(&self, id: &ChangeId) -> HashSet<ChangeId> {
        let mut visited = HashSet::new();
        let mut queue: VecDeque<ChangeId> = self.parents(id).into();
        while let Some(next) = queue.pop_front() {
            if visited.insert(next.clone()) {
                queue.extend(self.parents(&next));
            }
        }
        visited
    }

    /// Breadth-first set of all descendants of `id`, not including `id`
    /// itself.
    pub fn descendants(&self, id: &ChangeId) -> HashSet<ChangeId> {
        let mut visited = HashSet::new();
        let mut queue: VecDeque<ChangeId> = self.children(id).into();
        while let Some(next) = queue.pop_front() {
            if visited.insert(next.clone()) {
                queue.extend(self.children(&next));
            }
        }
        visited
    }

    /// The changes with no children among the non-abandoned nodes —
    /// candidates for `visible_heads()`.
    pub fn visible_heads(&self) -> Vec<ChangeId> {
        self.nodes
            .values()
            .filter(|change| !change.abandoned)
            .filter(|change| self.children(&change.change_id).iter().all(|child_id| {
                self.nodes.get(child_id).is_none_or(|child| child.abandoned)
            }))
            .map(|change| change.change_id.clone())
            .collect()
    }

    /// Resolves a (possibly short) hex prefix against every `ChangeId` in
    /// the graph.
    pub fn resolve_prefix(&self, prefix: &HexPrefix) -> PrefixResolution<ChangeId> {
        let mut matches = self.nodes.keys().filter(|id| prefix.matches(*id));
        match (matches.next(), matches.next()) {
            (None, _) => PrefixResolution::NoMatch,
            (Some(id), None) => PrefixResolution::SingleMatch(id.clone()),
            (Some(_), Some(_)) => PrefixResolution::AmbiguousMatch,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Signature;
    use crate::backend::Timestamp;
    use crate::change::TreeRef;
    use crate::object_id::zero_commit_id;

    fn make_change(id: &str, parents: Vec<&str>) -> Change {
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

    #[test]
    fn add_rejects_dangling_parent() {
        let mut graph = ChangeGraph::new();
        let err = graph.add(make_change("aa", vec!["bb"])).unwrap_err();
        assert!(matches!(err, ChangeGraphError::DanglingParent { .. }));
    }

    #[test]
    fn add_rejects_self_parent() {
        let mut graph = ChangeGraph::new();
        let err = graph.add(make_change("aa", vec!["aa"])).unwrap_err();
        assert!(matches!(err, ChangeGraphError::SelfParent { .. }));
    }

    #[test]
    fn ancestors_and_descendants_walk_the_chain() {
        let mut graph = ChangeGraph::new();
        graph.add(make_change("aa", vec![])).unwrap();
        graph.add(make_change("bb", vec!["aa"])).unwrap();
        graph.add(make_change("cc", vec!["bb"])).unwrap();

        let ancestors = graph.ancestors(&ChangeId::from_hex("cc"));
        assert!(ancestors.contains(&ChangeId::from_hex("aa")));
        assert!(ancestors.contains(&ChangeId::from_hex("bb")));

        let descendants = graph.descendants(&ChangeId::from_hex("aa"));
        assert!(descendants.contains(&ChangeId::from_hex("bb")));
        assert!(descendants.contains(&ChangeId::from_hex("cc")));
    }

    #[test]
    fn update_rejects_cycle() {
        let mut graph = ChangeGraph::new();
        graph.add(make_change("aa", vec![])).unwrap();
        graph.add(make_change("bb", vec!["aa"])).unwrap();
        let mut rewritten = graph.get(&ChangeId::from_hex("aa")).unwrap().clone();
        rewritten.parents = vec![ChangeId::from_hex("bb")];
        let err = graph.update(rewritten).unwrap_err();
        assert!(matches!(err, ChangeGraphError::CycleDetected(_)));
    }

    #[test]
    fn visible_heads_excludes_abandoned_leaves() {
        let mut graph = ChangeGraph::new();
        graph.add(make_change("aa", vec![])).unwrap();
        graph.add(make_change("bb", vec!["aa"])).unwrap();
        let mut abandoned = graph.get(&ChangeId::from_hex("bb")).unwrap().clone();
        abandoned.abandoned = true;
        graph.update(abandoned).unwrap();
        let heads = graph.visible_heads();
        assert_eq!(heads, vec![ChangeId::from_hex("aa")]);
    }

    #[test]
    fn prefix_resolution_distinguishes_unique_and_ambiguous() {
        let mut graph = ChangeGraph::new();
        graph.add(make_change("aabb", vec![])).unwrap();
        graph.add(make_change("aacc", vec![])).unwrap();
        let unique = HexPrefix::try_from_hex("aab").unwrap();
        assert_eq!(graph.resolve_prefix(&unique), PrefixResolution::SingleMatch(ChangeId::from_hex("aabb")));
        let ambiguous = HexPrefix::try_from_hex("aa").unwrap();
        assert_eq!(graph.resolve_prefix(&ambiguous), PrefixResolution::AmbiguousMatch);
        let none = HexPrefix::try_from_hex("zz").unwrap();
        assert_eq!(graph.resolve_prefix(&none), PrefixResolution::NoMatch);
    }
}
