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

//! Evolution (predecessor) history for a change.
//!
//! Predecessors are stored directly as `predecessors: Vec<CommitId>` on
//! [`crate::change::Change`] rather than derived from the operation log.
//! This module reads that chain back to the first commit id a change ever
//! had, in reverse-chronological order — an `obslog`-style view.

use crate::change::Change;
use crate::change_graph::ChangeGraph;
use crate::object_id::ChangeId;
use crate::object_id::CommitId;

/// One entry of a change's evolution log: the commit id it had at that
/// point, paired with the change's current metadata (the change id never
/// changes across rewrites, so only the commit id and description vary
/// meaningfully entry to entry).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvolutionEntry {
    pub commit_id: CommitId,
    /// `true` for the change's current state; `false` for a prior,
    /// superseded commit id.
    pub is_current: bool,
}

/// Returns the evolution log for `change_id`, newest first: the current
/// commit id followed by each predecessor, oldest last.
pub fn evolution_log(graph: &ChangeGraph, change_id: &ChangeId) -> Option<Vec<EvolutionEntry>> {
    let change: &Change = graph.get(change_id)?;
    let mut entries = vec![EvolutionEntry { commit_id: change.commit_id.clone(), is_current: true }];
    entries.extend(
        change
            .predecessors
            .iter()
            .rev()
            .map(|commit_id| EvolutionEntry { commit_id: commit_id.clone(), is_current: false }),
    );
    Some(entries)
}

/// Appends `new_predecessor` to a change's predecessor list in place; the
/// list only ever grows. Call this before swapping in a rewritten commit
/// id.
pub fn record_predecessor(change: &mut Change, superseded_commit_id: CommitId) {
    change.predecessors.push(superseded_commit_id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Signature;
    use crate::backend::Timestamp;
    use crate::change::TreeRef;
    use crate::object_id::zero_commit_id;

    fn base_change() -> Change {
        Change {
            change_id: ChangeId::from_hex("aa"),
            commit_id: zero_commit_id(),
            parents: vec![],
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
    fn evolution_log_lists_current_commit_first() {
        let mut graph = ChangeGraph::new();
        let mut change = base_change();
        change.commit_id = CommitId::from_hex("cc");
        record_predecessor(&mut change, CommitId::from_hex("bb"));
        graph.add(change).unwrap();

        let log = evolution_log(&graph, &ChangeId::from_hex("aa")).unwrap();
        assert_eq!(log[0].commit_id, CommitId::from_hex("cc"));
        assert!(log[0].is_current);
        assert_eq!(log[1].commit_id, CommitId::from_hex("bb"));
        assert!(!log[1].is_current);
    }

    #[test]
    fn unknown_change_returns_none() {
        let graph = ChangeGraph::new();
        assert!(evolution_log(&graph, &ChangeId::from_hex("ff")).is_none());
    }
}
