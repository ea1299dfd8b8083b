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

//! Bisection over the change graph: cycles
//! `idle -> active(good_set,bad_set) -> found(id) | aborted`.
//!
//! The candidate range narrows via a direct midpoint walk over
//! [`ChangeGraph`] ancestor/descendant sets, since this crate has no
//! revset `bisect()`/`heads()`/`roots()` combinators to delegate to.

use std::collections::HashSet;

use crate::change_graph::ChangeGraph;
use crate::object_id::ChangeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Evaluation {
    Good,
    Bad,
    Skip,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BisectionResult {
    Found(Vec<ChangeId>),
    Indeterminate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextStep {
    Evaluate(ChangeId),
    Done(BisectionResult),
}

#[derive(Debug, thiserror::Error)]
pub enum BisectionError {
    #[error("change {0} is not in the bisection range")]
    NotInRange(ChangeId),
    #[error("bisection is not active")]
    NotActive,
}

/// Bisects `range` (all changes assumed bad at the range heads, good at the
/// range roots' parents) to find the first bad change.
#[derive(Debug)]
pub struct Bisector {
    range: HashSet<ChangeId>,
    good: HashSet<ChangeId>,
    bad: HashSet<ChangeId>,
    skipped: HashSet<ChangeId>,
}

impl Bisector {
    /// Starts a bisection over `range`, the full in-range change id set.
    /// `initial_bad` (typically the range's heads) seeds `bad_commits`.
    pub fn new(range: HashSet<ChangeId>, initial_bad: HashSet<ChangeId>) -> Self {
        Self { range, good: HashSet::new(), bad: initial_bad, skipped: HashSet::new() }
    }

    pub fn mark(&mut self, id: ChangeId, evaluation: Evaluation) -> Result<(), BisectionError> {
        if !self.range.contains(&id) {
            return Err(BisectionError::NotInRange(id));
        }
        self.good.remove(&id);
        self.bad.remove(&id);
        self.skipped.remove(&id);
        match evaluation {
            Evaluation::Good => self.good.insert(id),
            Evaluation::Bad => self.bad.insert(id),
            Evaluation::Skip => self.skipped.insert(id),
        };
        Ok(())
    }

    pub fn good_set(&self) -> &HashSet<ChangeId> {
        &self.good
    }

    pub fn bad_set(&self) -> &HashSet<ChangeId> {
        &self.bad
    }

    /// Picks the next undetermined change to evaluate: a change reachable
    /// (backward) from a known-bad change but not itself known-good, known-
    /// bad, or skipped. Returns `Done` once no such change remains.
    pub fn next_step(&self, graph: &ChangeGraph) -> NextStep {
        let candidates: Vec<&ChangeId> = self
            .range
            .iter()
            .filter(|id| !self.good.contains(*id) && !self.bad.contains(*id) && !self.skipped.contains(*id))
            .filter(|id| self.bad.iter().any(|bad_id| bad_id == *id || graph.ancestors(bad_id).contains(*id)))
            .filter(|id| !self.good.iter().any(|good_id| graph.ancestors(good_id).contains(*id)))
            .collect();

        match candidates.into_iter().next() {
            Some(id) => NextStep::Evaluate(id.clone()),
            None => {
                let mut bad_roots: Vec<ChangeId> = self
                    .bad
                    .iter()
                    .filter(|id| graph.parents(id).iter().all(|parent| !self.bad.contains(parent)))
                    .cloned()
                    .collect();
                bad_roots.sort();
                if bad_roots.is_empty() {
                    NextStep::Done(BisectionResult::Indeterminate)
                } else {
                    NextStep::Done(BisectionResult::Found(bad_roots))
                }
            }
        }
    }
}
