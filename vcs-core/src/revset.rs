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

//! Revset AST and evaluator.
//!
//! This crate's grammar is a small, fixed function set with no aliases or
//! keyword arguments, so plain owned `Box<Expr>` nodes are enough — there's
//! no need for a resolution-state marker or `Rc<Self>` tree sharing that an
//! alias-expanding resolver would require.

use std::collections::HashSet;

use crate::bookmark::BookmarkStore;
use crate::change_graph::ChangeGraph;
use crate::conflicts::ConflictModel;
use crate::object_id::ChangeId;
use crate::object_id::HexPrefix;
use crate::object_id::PrefixResolution;
use crate::tag::TagStore;

/// Parsed revset expression tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    All,
    None,
    Root,
    VisibleHeads,
    WorkingCopy,
    /// A bare identifier: resolved against bookmarks/tags, then hex, at
    /// evaluation time. Unknown identifiers are an error rather than an
    /// empty set.
    Symbol(String),
    Parents(Box<Expr>),
    Ancestors(Box<Expr>),
    Descendants(Box<Expr>),
    Children(Box<Expr>),
    Bookmark(String),
    Tags(Option<String>),
    GitRefs,
    GitHead,
    Author(String),
    Committer(String),
    Description(String),
    Mine,
    Empty,
    Paths(String),
    Conflicted,
    Connected(Box<Expr>, Box<Expr>),
    Reachable(Box<Expr>),
    Union(Box<Expr>, Box<Expr>),
    Intersection(Box<Expr>, Box<Expr>),
    Difference(Box<Expr>, Box<Expr>),
    Range(Box<Expr>, Box<Expr>),
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RevsetEvalError {
    #[error("unknown symbol: {0}")]
    UnknownSymbol(String),
    #[error("ambiguous prefix: {0}")]
    AmbiguousPrefix(String),
}

pub type RevsetEvalResult<T> = Result<T, RevsetEvalError>;

/// Everything the evaluator needs besides the expression itself.
pub struct EvalContext<'a> {
    pub graph: &'a ChangeGraph,
    pub bookmarks: &'a BookmarkStore,
    pub tags: &'a TagStore,
    pub conflicts: &'a ConflictModel,
    pub working_copy: &'a ChangeId,
    pub user_email: &'a str,
}

/// Evaluates `expr`, returning matching changes newest-first by timestamp.
pub fn evaluate(expr: &Expr, ctx: &EvalContext<'_>) -> RevsetEvalResult<Vec<ChangeId>> {
    let set = eval_set(expr, ctx)?;
    let mut ids: Vec<ChangeId> = set.into_iter().collect();
    ids.sort_by(|a, b| {
        let ta = ctx.graph.get(a).map(|c| c.timestamp.timestamp.0);
        let tb = ctx.graph.get(b).map(|c| c.timestamp.timestamp.0);
        tb.cmp(&ta).then_with(|| a.cmp(b))
    });
    Ok(ids)
}

fn eval_set(expr: &Expr, ctx: &EvalContext<'_>) -> RevsetEvalResult<HashSet<ChangeId>> {
    Ok(match expr {
        Expr::All => ctx.graph.iter().filter(|c| !c.abandoned).map(|c| c.change_id.clone()).collect(),
        Expr::None => HashSet::new(),
        Expr::Root => ctx.graph.iter().filter(|c| c.parents.is_empty()).map(|c| c.change_id.clone()).collect(),
        Expr::VisibleHeads => ctx.graph.visible_heads().into_iter().collect(),
        Expr::WorkingCopy => HashSet::from([ctx.working_copy.clone()]),
        Expr::Symbol(name) => HashSet::from([resolve_symbol(name, ctx)?]),
        Expr::Parents(inner) => {
            flat_map_ids(eval_set(inner, ctx)?, |id| ctx.graph.parents(id))
        }
        Expr::Children(inner) => {
            flat_map_ids(eval_set(inner, ctx)?, |id| ctx.graph.children(id))
        }
        Expr::Ancestors(inner) => {
            flat_map_ids(eval_set(inner, ctx)?, |id| ctx.graph.ancestors(id).into_iter().collect())
        }
        Expr::Descendants(inner) => {
            flat_map_ids(eval_set(inner, ctx)?, |id| ctx.graph.descendants(id).into_iter().collect())
        }
        Expr::Bookmark(name) => ctx.bookmarks.get(name).map(|b| b.target.clone()).into_iter().collect(),
        Expr::Tags(pattern) => ctx
            .tags
            .list()
            .filter(|tag| pattern.as_deref().is_none_or(|p| tag.name.contains(p)))
            .map(|tag| tag.change_id.clone())
            .collect(),
        Expr::GitRefs | Expr::GitHead => HashSet::new(),
        Expr::Author(pattern) => {
            ctx.graph.iter().filter(|c| c.author.name.contains(pattern.as_str())).map(|c| c.change_id.clone()).collect()
        }
        Expr::Committer(pattern) => {
            ctx.graph.iter().filter(|c| c.committer.name.contains(pattern.as_str())).map(|c| c.change_id.clone()).collect()
        }
        Expr::Description(pattern) => {
            ctx.graph.iter().filter(|c| c.description.contains(pattern.as_str())).map(|c| c.change_id.clone()).collect()
        }
        Expr::Mine => ctx
            .graph
            .iter()
            .filter(|c| c.author.email == ctx.user_email)
            .map(|c| c.change_id.clone())
            .collect(),
        Expr::Empty => ctx.graph.iter().filter(|c| c.is_empty()).map(|c| c.change_id.clone()).collect(),
        Expr::Paths(glob) => ctx
            .graph
            .iter()
            .filter(|c| {
                c.file_snapshot.as_ref().is_some_and(|files| {
                    files.keys().any(|path| glob::Pattern::new(glob).is_ok_and(|p| p.matches(path)))
                })
            })
            .map(|c| c.change_id.clone())
            .collect(),
        // Conflicts in this crate are tracked per path, as a single
        // repo-wide document, so `conflicted()` can only say "the working
        // copy currently hosts unresolved conflicts", not attribute them
        // to arbitrary changes.
        Expr::Conflicted => {
            if ctx.conflicts.unresolved().next().is_some() {
                HashSet::from([ctx.working_copy.clone()])
            } else {
                HashSet::new()
            }
        }
        Expr::Connected(from, to) => {
            let from_set = eval_set(from, ctx)?;
            let to_set = eval_set(to, ctx)?;
            let mut result = HashSet::new();
            for from_id in &from_set {
                let descendants = ctx.graph.descendants(from_id);
                for to_id in &to_set {
                    if descendants.contains(to_id) || from_id == to_id {
                        result.insert(from_id.clone());
                        result.insert(to_id.clone());
                        result.extend(ctx.graph.ancestors(to_id).intersection(&descendants).cloned());
                    }
                }
            }
            result
        }
        // "Everything reachable walking parent edges from `heads`",
        // i.e. the heads themselves plus their full ancestry.
        Expr::Reachable(heads) => {
            let heads_set = eval_set(heads, ctx)?;
            let mut result = heads_set.clone();
            for id in &heads_set {
                result.extend(ctx.graph.ancestors(id));
            }
            result
        }
        Expr::Union(a, b) => eval_set(a, ctx)?.union(&eval_set(b, ctx)?).cloned().collect(),
        Expr::Intersection(a, b) => eval_set(a, ctx)?.intersection(&eval_set(b, ctx)?).cloned().collect(),
        Expr::Difference(a, b) => eval_set(a, ctx)?.difference(&eval_set(b, ctx)?).cloned().collect(),
        Expr::Range(a, b) => {
            let a_set = eval_set(a, ctx)?;
            let b_set = eval_set(b, ctx)?;
            let mut descendants_of_a = HashSet::new();
            for id in &a_set {
                descendants_of_a.extend(ctx.graph.descendants(id));
            }
            let mut ancestors_of_b = HashSet::new();
            for id in &b_set {
                ancestors_of_b.extend(ctx.graph.ancestors(id));
                ancestors_of_b.insert(id.clone());
            }
            descendants_of_a.intersection(&ancestors_of_b).filter(|id| !a_set.contains(*id)).cloned().collect()
        }
    })
}

fn flat_map_ids(ids: HashSet<ChangeId>, f: impl Fn(&ChangeId) -> Vec<ChangeId>) -> HashSet<ChangeId> {
    ids.iter().flat_map(f).collect()
}

/// Resolves a bare symbol the same way [`Expr::Symbol`] does during
/// evaluation: bookmark name, then tag name, then hex prefix. Exposed for
/// callers (e.g. [`crate::repo::RepositoryCore`]) that need to turn a
/// user-supplied revision string into a [`ChangeId`] outside of a full
/// revset expression.
pub fn resolve_symbol(name: &str, ctx: &EvalContext<'_>) -> RevsetEvalResult<ChangeId> {
    if let Some(bookmark) = ctx.bookmarks.get(name) {
        return Ok(bookmark.target.clone());
    }
    if let Some(tag) = ctx.tags.get(name) {
        return Ok(tag.change_id.clone());
    }
    if let Some(prefix) = HexPrefix::try_from_hex(name) {
        return match ctx.graph.resolve_prefix(&prefix) {
            PrefixResolution::SingleMatch(id) => Ok(id),
            PrefixResolution::AmbiguousMatch => Err(RevsetEvalError::AmbiguousPrefix(name.to_string())),
            PrefixResolution::NoMatch => Err(RevsetEvalError::UnknownSymbol(name.to_string())),
        };
    }
    Err(RevsetEvalError::UnknownSymbol(name.to_string()))
}
