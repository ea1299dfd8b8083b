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

//! `RepositoryCore`: the orchestrator that owns every domain subsystem and
//! exposes the full command surface. Every mutating method here follows the
//! same shape: validate, mutate domain state, append exactly one
//! [`Operation`] with a fresh [`View`], return the affected entities.
//!
//! One struct holds the index, view, and op-store handle, with mutations
//! recorded through a single transaction-shaped path. This crate has no
//! Git-tree materialization layer, so "view" here is the in-memory
//! projection of bookmarks/tags/heads/working-copy rebuilt from the
//! operation log's head on every `open` (see `DESIGN.md`).

use std::collections::BTreeMap;
use std::collections::HashSet;
use std::path::Path;
use std::path::PathBuf;

use rand::RngCore;

use crate::backend::BackendError;
use crate::backend::CreateCommitRequest;
use crate::backend::GitBackend;
use crate::backend::GitObjectId;
use crate::backend::Signature;
use crate::backend::Timestamp;
use crate::bisect::Bisector;
use crate::bisect::BisectionError;
use crate::bisect::Evaluation;
use crate::bisect::NextStep;
use crate::bookmark::BookmarkStore;
use crate::change::Change;
use crate::change::TreeRef;
use crate::change_graph::ChangeGraph;
use crate::change_graph::ChangeGraphError;
use crate::config::ConfigError;
use crate::config::UserConfig;
use crate::conflicts::ConflictError;
use crate::conflicts::ConflictId;
use crate::conflicts::ConflictModel;
use crate::conflicts::Resolution;
use crate::content_hash::ContentHash as _;
use crate::error::ErrorCode;
use crate::error::RepoError;
use crate::error::RepoResult;
use crate::evolution;
use crate::evolution::EvolutionEntry;
use crate::hooks::HookContext;
use crate::hooks::Hooks;
use crate::hooks::PostCommitHook;
use crate::hooks::PreCommitHook;
use crate::merge_driver;
use crate::merge_driver::MergeDriverRegistry;
use crate::object_id::ChangeId;
use crate::object_id::CommitId;
use crate::object_id::ObjectId as _;
use crate::object_id::OperationId;
use crate::object_id::zero_commit_id;
use crate::op_store::Operation;
use crate::op_store::OperationUser;
use crate::op_store::View;
use crate::operation_log::OperationLog;
use crate::operation_log::OperationLogError;
use crate::repo_path;
use crate::repo_path::InvalidRepoPathError;
use crate::revset;
use crate::revset::EvalContext;
use crate::revset_parser;
use crate::rewrite;
use crate::sparse::SparseConfig;
use crate::storage::Storage;
use crate::storage::StorageError;
use crate::tag::TagStore;
use crate::working_copy::WorkingCopy;
use crate::working_copy::WorkingCopyError;
use crate::workspace::WorkspaceRegistry;

const CONFIG_FILE_NAME: &str = "user-config.toml";

/// Owns every domain subsystem of one repository: the change graph, working
/// copy, operation log, bookmarks, tags, conflicts, merge drivers, and
/// workspaces, sharing one storage handle and Git backend. Generic over
/// `'h` so hook closures can borrow caller-owned state for the repository's
/// lifetime.
#[derive(Debug)]
pub struct RepositoryCore<'h> {
    root: PathBuf,
    storage: Storage,
    backend: Box<dyn GitBackend>,
    config: UserConfig,
    graph: ChangeGraph,
    operations: OperationLog,
    working_copy: WorkingCopy,
    bookmarks: BookmarkStore,
    tags: TagStore,
    conflicts: ConflictModel,
    drivers: MergeDriverRegistry,
    workspaces: WorkspaceRegistry,
    sparse: SparseConfig,
    hooks: Hooks<'h>,
    bisector: Option<Bisector>,
}

/// Result of [`RepositoryCore::absorb`].
#[derive(Debug, Clone, Default)]
pub struct AbsorbOutcome {
    pub affected_changes: Vec<ChangeId>,
    pub absorbed_paths: Vec<String>,
}

/// Result of [`RepositoryCore::merge`].
#[derive(Debug, Clone)]
pub struct MergeReport {
    pub conflicts: Vec<ConflictId>,
    pub result_change_id: Option<ChangeId>,
}

/// Result of [`RepositoryCore::next`] / [`RepositoryCore::prev`].
#[derive(Debug, Clone)]
pub struct NavigationResult {
    pub change_id: ChangeId,
    pub from: ChangeId,
    pub to: ChangeId,
}

/// Result of [`RepositoryCore::status`].
#[derive(Debug, Clone)]
pub struct StatusReport {
    pub working_copy: ChangeId,
    pub description: String,
    pub modified_files: Vec<String>,
    pub unresolved_conflicts: Vec<ConflictId>,
}

struct AbsorbPlan {
    updates_by_owner: BTreeMap<ChangeId, BTreeMap<String, String>>,
    remaining_working_files: BTreeMap<String, String>,
    absorbed_paths: Vec<String>,
}

impl<'h> RepositoryCore<'h> {
    /// Initializes a brand-new repository at `root` with a single,
    /// uncommitted, empty-tree root change.
    pub fn new(
        root: impl Into<PathBuf>,
        backend: Box<dyn GitBackend>,
        user_name: impl Into<String>,
        user_email: impl Into<String>,
    ) -> RepoResult<Self> {
        let root = root.into();
        let storage = Storage::open(&root).map_err(storage_err)?;

        let user_name = user_name.into();
        let user_email = user_email.into();
        let mut config = UserConfig::new();
        config.set_user(&user_name, &user_email);
        write_config(&root, &config)?;

        let root_change_id = fresh_change_id();
        let timestamp = Timestamp::now();
        let signature = Signature { name: user_name, email: user_email, timestamp };
        let root_change = Change {
            change_id: root_change_id.clone(),
            commit_id: zero_commit_id(),
            parents: vec![],
            tree: TreeRef::empty(),
            author: signature.clone(),
            committer: signature,
            description: String::new(),
            timestamp,
            predecessors: vec![],
            abandoned: false,
            file_snapshot: None,
        };

        let mut graph = ChangeGraph::new();
        graph.add(root_change).map_err(graph_err)?;
        graph.save(&storage).map_err(graph_err)?;

        let mut operations = OperationLog::new();
        let user = operation_user(&config)?;
        operations.init_root(View::make_root(root_change_id.clone()), user, timestamp);
        operations.save(&storage).map_err(op_log_err)?;

        let head_id = operations.head_id().expect("init_root just populated the log");
        let mut working_copy = WorkingCopy::init(root_change_id.clone());
        working_copy.set_current_change(root_change_id, head_id);
        working_copy.save(&storage).map_err(wc_err)?;

        let conflicts = ConflictModel::new();
        conflicts.save(&storage).map_err(storage_err)?;

        let mut workspaces = WorkspaceRegistry::new();
        workspaces.init_default(&root);
        workspaces.save(&storage).map_err(storage_err)?;

        let sparse = SparseConfig::new();
        sparse.save(&storage).map_err(storage_err)?;

        Ok(Self {
            root,
            storage,
            backend,
            config,
            graph,
            operations,
            working_copy,
            bookmarks: BookmarkStore::new(),
            tags: TagStore::new(),
            conflicts,
            drivers: MergeDriverRegistry::new(),
            workspaces,
            sparse,
            hooks: Hooks::default(),
            bisector: None,
        })
    }

    /// Reopens a repository previously created with [`Self::new`], rebuilding
    /// `bookmarks`/`tags` from the operation log's head view (see
    /// `DESIGN.md`: those stores are not independently persisted).
    pub fn open(root: impl Into<PathBuf>, backend: Box<dyn GitBackend>) -> RepoResult<Self> {
        let root = root.into();
        let storage = Storage::open(&root).map_err(storage_err)?;
        let config = read_config(&root)?;

        let graph = ChangeGraph::load(&storage).map_err(graph_err)?;
        let operations = OperationLog::load(&storage).map_err(op_log_err)?;
        if operations.is_empty() {
            return Err(RepoError::new(ErrorCode::NotFound, "repository has not been initialized")
                .with_suggestion("call RepositoryCore::new to initialize a new repository"));
        }
        let working_copy = WorkingCopy::load(&storage)
            .map_err(wc_err)?
            .ok_or_else(|| RepoError::new(ErrorCode::NotFound, "working copy state is missing"))?;

        let head_view = &operations.head().expect("checked non-empty above").view;
        let bookmarks = BookmarkStore::from_view(&head_view.bookmarks);
        let tags = TagStore::from_view(&head_view.tags);

        let conflicts = ConflictModel::load(&storage).map_err(storage_err)?;
        let workspaces = WorkspaceRegistry::load(&storage).map_err(storage_err)?;
        let sparse = SparseConfig::load(&storage).map_err(storage_err)?;

        Ok(Self {
            root,
            storage,
            backend,
            config,
            graph,
            operations,
            working_copy,
            bookmarks,
            tags,
            conflicts,
            drivers: MergeDriverRegistry::new(),
            workspaces,
            sparse,
            hooks: Hooks::default(),
            bisector: None,
        })
    }

    pub fn set_pre_commit_hook(&mut self, hook: Box<PreCommitHook<'h>>) {
        self.hooks.set_pre_commit(hook);
    }

    pub fn set_post_commit_hook(&mut self, hook: Box<PostCommitHook<'h>>) {
        self.hooks.set_post_commit(hook);
    }

    pub fn register_merge_driver(&mut self, pattern: impl Into<String>, driver: Box<merge_driver::DriverFn>) {
        self.drivers.register(pattern.into(), driver);
    }

    pub fn working_copy_change(&self) -> &ChangeId {
        self.working_copy.current_change()
    }

    pub fn graph(&self) -> &ChangeGraph {
        &self.graph
    }

    pub fn bookmarks(&self) -> &BookmarkStore {
        &self.bookmarks
    }

    pub fn tags(&self) -> &TagStore {
        &self.tags
    }

    pub fn conflicts(&self) -> &ConflictModel {
        &self.conflicts
    }

    pub fn operations(&self) -> &OperationLog {
        &self.operations
    }

    pub fn sparse(&self) -> &SparseConfig {
        &self.sparse
    }

    pub fn config(&self) -> &UserConfig {
        &self.config
    }

    /// Creates a new change. Named `create_change` to avoid colliding with
    /// the inherent constructor [`Self::new`].
    #[tracing::instrument(skip(self))]
    pub fn create_change(&mut self, message: Option<String>, parents: Option<Vec<ChangeId>>) -> RepoResult<ChangeId> {
        self.run_hooked("new", move |repo| {
            let parents = parents.unwrap_or_else(|| vec![repo.working_copy.current_change().clone()]);
            for parent in &parents {
                if !repo.graph.contains(parent) {
                    return Err(RepoError::new(ErrorCode::ChangeNotFound, format!("parent not found: {parent}")));
                }
            }
            let change_id = fresh_change_id();
            let timestamp = Timestamp::now();
            let user = operation_user(&repo.config)?;
            let signature = Signature { name: user.name, email: user.email, timestamp };
            let change = Change {
                change_id: change_id.clone(),
                commit_id: zero_commit_id(),
                parents,
                tree: TreeRef::empty(),
                author: signature.clone(),
                committer: signature,
                description: message.unwrap_or_default(),
                timestamp,
                predecessors: vec![],
                abandoned: false,
                file_snapshot: None,
            };
            repo.graph.add(change).map_err(graph_err)?;
            repo.set_working_copy(change_id.clone());
            let new_op_id = repo.record_operation("new", None)?;
            repo.finalize_working_copy_operation(&new_op_id)?;
            Ok(change_id)
        })
    }

    /// Updates a change's description only, preserving its ChangeId.
    #[tracing::instrument(skip(self))]
    pub fn describe(&mut self, revision: Option<ChangeId>, message: String) -> RepoResult<ChangeId> {
        self.run_hooked("describe", move |repo| {
            let target = revision.unwrap_or_else(|| repo.working_copy.current_change().clone());
            let mut change = repo.get_change(&target)?;
            change.description = message;
            repo.maybe_commit(&mut change)?;
            repo.graph.update(change).map_err(graph_err)?;
            repo.record_operation("describe", None)?;
            Ok(target)
        })
    }

    /// Like `describe`, but may also replace the change's file content,
    /// synthesizing a new Git commit when content is present.
    #[tracing::instrument(skip(self))]
    pub fn amend(
        &mut self,
        revision: Option<ChangeId>,
        message: Option<String>,
        files: Option<BTreeMap<String, String>>,
    ) -> RepoResult<ChangeId> {
        self.run_hooked("amend", move |repo| {
            let target = revision.unwrap_or_else(|| repo.working_copy.current_change().clone());
            let mut change = repo.get_change(&target)?;
            if let Some(message) = message {
                change.description = message;
            }
            if let Some(files) = files {
                change.tree = tree_ref_for_files(&files);
                change.file_snapshot = Some(files);
            }
            repo.maybe_commit(&mut change)?;
            repo.graph.update(change).map_err(graph_err)?;
            repo.record_operation("amend", None)?;
            Ok(target)
        })
    }

    /// Moves the working copy onto `change_id`. Materializing the tree onto
    /// disk is the caller's responsibility (this crate has no filesystem
    /// checkout layer).
    #[tracing::instrument(skip(self))]
    pub fn edit(&mut self, change_id: ChangeId) -> RepoResult<()> {
        self.run_hooked("edit", move |repo| {
            let change = repo.graph.get(&change_id).ok_or_else(|| not_found(&change_id))?;
            if change.abandoned {
                return Err(RepoError::new(ErrorCode::InvalidOperation, format!("change {change_id} is abandoned"))
                    .with_suggestion("call restore() before editing an abandoned change"));
            }
            repo.set_working_copy(change_id.clone());
            let new_op_id = repo.record_operation("edit", None)?;
            repo.finalize_working_copy_operation(&new_op_id)?;
            Ok(())
        })
    }

    pub fn abandon(&mut self, change_id: ChangeId) -> RepoResult<()> {
        self.set_abandoned(change_id, true, "abandon")
    }

    pub fn restore(&mut self, change_id: ChangeId) -> RepoResult<()> {
        self.set_abandoned(change_id, false, "restore")
    }

    fn set_abandoned(&mut self, change_id: ChangeId, abandoned: bool, description: &'static str) -> RepoResult<()> {
        self.run_hooked(description, move |repo| {
            let mut change = repo.get_change(&change_id)?;
            change.abandoned = abandoned;
            repo.graph.update(change).map_err(graph_err)?;
            repo.record_operation(description, None)?;
            Ok(())
        })
    }

    /// Folds `source`'s files into `dest` and abandons `source`.
    #[tracing::instrument(skip(self))]
    pub fn squash(&mut self, source: ChangeId, dest: ChangeId) -> RepoResult<ChangeId> {
        self.run_hooked("squash", move |repo| {
            let source_change = repo.get_change(&source)?;
            let mut dest_change = repo.get_change(&dest)?;

            let mut merged_files = dest_change.file_snapshot.clone().unwrap_or_default();
            if let Some(source_files) = &source_change.file_snapshot {
                merged_files.extend(source_files.clone());
            }
            dest_change.tree = tree_ref_for_files(&merged_files);
            dest_change.file_snapshot = Some(merged_files);
            dest_change.description = format!("{}\n\n(squashed from {})", dest_change.description, &source.hex()[..8]);
            repo.maybe_commit(&mut dest_change)?;
            repo.graph.update(dest_change).map_err(graph_err)?;

            let mut abandoned_source = source_change;
            abandoned_source.abandoned = true;
            repo.graph.update(abandoned_source).map_err(graph_err)?;

            repo.record_operation("squash", None)?;
            Ok(dest)
        })
    }

    /// Splits a change in two: `change_id` keeps its identity for part 1;
    /// `files_for_part2` names the paths that move into a freshly created
    /// part 2, parented on part 1.
    #[tracing::instrument(skip(self))]
    pub fn split(
        &mut self,
        change_id: ChangeId,
        description1: String,
        description2: String,
        files_for_part2: BTreeMap<String, String>,
    ) -> RepoResult<(ChangeId, ChangeId)> {
        self.run_hooked("split", move |repo| {
            let mut original = repo.get_change(&change_id)?;
            original.description = description1;

            let mut part1_files = original.file_snapshot.clone().unwrap_or_default();
            for path in files_for_part2.keys() {
                part1_files.remove(path);
            }
            original.tree = tree_ref_for_files(&part1_files);
            original.file_snapshot = Some(part1_files);
            repo.maybe_commit(&mut original)?;
            repo.graph.update(original).map_err(graph_err)?;

            let part2_id = fresh_change_id();
            let timestamp = Timestamp::now();
            let user = operation_user(&repo.config)?;
            let signature = Signature { name: user.name, email: user.email, timestamp };
            let mut part2 = Change {
                change_id: part2_id.clone(),
                commit_id: zero_commit_id(),
                parents: vec![change_id.clone()],
                tree: tree_ref_for_files(&files_for_part2),
                author: signature.clone(),
                committer: signature,
                description: description2,
                timestamp,
                predecessors: vec![],
                abandoned: false,
                file_snapshot: Some(files_for_part2),
            };
            repo.maybe_commit(&mut part2)?;
            repo.graph.add(part2).map_err(graph_err)?;

            repo.record_operation("split", None)?;
            Ok((change_id, part2_id))
        })
    }

    /// Reparents a change onto a new parent. Rejects self-parenting and
    /// cycles.
    #[tracing::instrument(skip(self))]
    pub fn rebase(&mut self, change_id: ChangeId, new_parent: ChangeId) -> RepoResult<()> {
        self.run_hooked("rebase", move |repo| {
            if !repo.graph.contains(&change_id) {
                return Err(not_found(&change_id));
            }
            if !repo.graph.contains(&new_parent) {
                return Err(not_found(&new_parent));
            }
            if rewrite::would_cycle(&repo.graph, &change_id, &new_parent) {
                return Err(RepoError::new(
                    ErrorCode::InvalidOperation,
                    format!("rebasing {change_id} onto {new_parent} would create a cycle or self-parent"),
                ));
            }
            let mut change = repo.get_change(&change_id)?;
            change.parents = vec![new_parent];
            repo.graph.update(change).map_err(graph_err)?;
            repo.record_operation("rebase", None)?;
            Ok(())
        })
    }

    /// File-rename form of `move(from, to)`: renames a path within the
    /// working copy's file content.
    #[tracing::instrument(skip(self))]
    pub fn move_file(&mut self, from: &str, to: &str) -> RepoResult<()> {
        let (src, dst) = repo_path::validate_move(from, to).map_err(path_err)?;
        self.run_hooked("move", move |repo| {
            let working_change_id = repo.working_copy.current_change().clone();
            let mut change = repo.get_change(&working_change_id)?;
            let mut files = change.file_snapshot.clone().unwrap_or_default();
            let content = files
                .remove(src.as_str())
                .ok_or_else(|| RepoError::new(ErrorCode::FileNotFound, format!("file not found: {src}")))?;
            files.insert(dst.into_string(), content);
            change.tree = tree_ref_for_files(&files);
            change.file_snapshot = Some(files);
            repo.graph.update(change).map_err(graph_err)?;
            repo.record_operation("move", None)?;
            Ok(())
        })
    }

    /// The legacy two-string `move(from, to)` entry point: the presence of
    /// `changeId`, `newParent`, or `paths` forces history semantics,
    /// otherwise `from`/`to` is file semantics. If both `from` and `to`
    /// match the ChangeId shape, the call is ambiguous and must fail.
    /// Callers that already know their intent should call [`Self::rebase`]
    /// or [`Self::move_file`] directly instead.
    pub fn move_legacy(&mut self, from: &str, to: &str) -> RepoResult<()> {
        if looks_like_change_id(from) && looks_like_change_id(to) {
            return Err(RepoError::new(
                ErrorCode::AmbiguousOperation,
                "move(from, to) is ambiguous when both arguments look like ChangeIds",
            )
            .with_suggestion("use rebase(changeId, newParent) or move_file(from, to) explicitly"));
        }
        self.move_file(from, to)
    }

    /// Creates fresh ChangeIds carrying the same tree/description/parents
    /// as each input.
    #[tracing::instrument(skip(self))]
    pub fn duplicate(&mut self, change_ids: Vec<ChangeId>) -> RepoResult<Vec<(ChangeId, ChangeId)>> {
        self.run_hooked("duplicate", move |repo| {
            let mut pairs = Vec::with_capacity(change_ids.len());
            for original_id in change_ids {
                let original = repo.get_change(&original_id)?;
                let duplicate_id = fresh_change_id();
                let duplicate = Change {
                    change_id: duplicate_id.clone(),
                    commit_id: original.commit_id.clone(),
                    parents: original.parents.clone(),
                    tree: original.tree.clone(),
                    author: original.author.clone(),
                    committer: original.committer.clone(),
                    description: original.description.clone(),
                    timestamp: original.timestamp,
                    predecessors: vec![],
                    abandoned: false,
                    file_snapshot: original.file_snapshot.clone(),
                };
                repo.graph.add(duplicate).map_err(graph_err)?;
                pairs.push((original_id, duplicate_id));
            }
            repo.record_operation("duplicate", None)?;
            Ok(pairs)
        })
    }

    /// Creates a new change whose file content reverses the delta
    /// `revision` introduced relative to its first parent.
    #[tracing::instrument(skip(self))]
    pub fn backout(&mut self, revision: ChangeId, message: Option<String>) -> RepoResult<ChangeId> {
        self.run_hooked("backout", move |repo| {
            let target = repo.get_change(&revision)?;
            let parent_files =
                target.parents.first().and_then(|p| repo.graph.get(p)).and_then(|c| c.file_snapshot.clone()).unwrap_or_default();
            let target_files = target.file_snapshot.clone().unwrap_or_default();

            let mut reverted = parent_files.clone();
            for path in target_files.keys() {
                if !parent_files.contains_key(path) {
                    reverted.remove(path);
                }
            }

            let new_id = fresh_change_id();
            let timestamp = Timestamp::now();
            let user = operation_user(&repo.config)?;
            let signature = Signature { name: user.name, email: user.email, timestamp };
            let mut backout_change = Change {
                change_id: new_id.clone(),
                commit_id: zero_commit_id(),
                parents: vec![repo.working_copy.current_change().clone()],
                tree: tree_ref_for_files(&reverted),
                author: signature.clone(),
                committer: signature,
                description: message.unwrap_or_else(|| format!("backout of {}", &revision.hex()[..8])),
                timestamp,
                predecessors: vec![],
                abandoned: false,
                file_snapshot: Some(reverted),
            };
            repo.maybe_commit(&mut backout_change)?;
            repo.graph.add(backout_change).map_err(graph_err)?;
            repo.set_working_copy(new_id.clone());
            let new_op_id = repo.record_operation("backout", None)?;
            repo.finalize_working_copy_operation(&new_op_id)?;
            Ok(new_id)
        })
    }

    /// Updates attribution without touching content or identity.
    #[tracing::instrument(skip(self))]
    pub fn metaedit(
        &mut self,
        revision: Option<ChangeId>,
        author: Option<Signature>,
        committer: Option<Signature>,
    ) -> RepoResult<ChangeId> {
        self.run_hooked("metaedit", move |repo| {
            let target = revision.unwrap_or_else(|| repo.working_copy.current_change().clone());
            let mut change = repo.get_change(&target)?;
            if let Some(author) = author {
                change.author = author;
            }
            if let Some(committer) = committer {
                change.committer = committer;
            }
            repo.graph.update(change).map_err(graph_err)?;
            repo.record_operation("metaedit", None)?;
            Ok(target)
        })
    }

    fn plan_absorb(&self, paths: Option<&[String]>) -> AbsorbPlan {
        let working_change_id = self.working_copy.current_change().clone();
        let working_files =
            self.graph.get(&working_change_id).and_then(|c| c.file_snapshot.clone()).unwrap_or_default();
        let filter: Option<HashSet<&str>> = paths.map(|p| p.iter().map(String::as_str).collect());

        let mut ancestors: Vec<&Change> =
            self.graph.ancestors(&working_change_id).iter().filter_map(|id| self.graph.get(id)).collect();
        ancestors.sort_by(|a, b| b.timestamp.timestamp.0.cmp(&a.timestamp.timestamp.0));

        let mut updates_by_owner: BTreeMap<ChangeId, BTreeMap<String, String>> = BTreeMap::new();
        let mut remaining_working_files = working_files.clone();
        let mut absorbed_paths = Vec::new();

        for (path, content) in &working_files {
            if let Some(filter) = &filter {
                if !filter.contains(path.as_str()) {
                    continue;
                }
            }
            let owner = ancestors
                .iter()
                .find(|change| change.file_snapshot.as_ref().is_some_and(|files| files.contains_key(path)));
            if let Some(owner) = owner {
                updates_by_owner.entry(owner.change_id.clone()).or_default().insert(path.clone(), content.clone());
                remaining_working_files.remove(path);
                absorbed_paths.push(path.clone());
            }
        }

        AbsorbPlan { updates_by_owner, remaining_working_files, absorbed_paths }
    }

    /// For each modified working-copy file that an ancestor last touched,
    /// folds the new content into the most recent such ancestor. Genuinely
    /// new files stay in the working copy untouched.
    #[tracing::instrument(skip(self))]
    pub fn absorb(&mut self, paths: Option<Vec<String>>, dry_run: bool) -> RepoResult<AbsorbOutcome> {
        let plan = self.plan_absorb(paths.as_deref());
        if dry_run {
            return Ok(AbsorbOutcome {
                affected_changes: plan.updates_by_owner.keys().cloned().collect(),
                absorbed_paths: plan.absorbed_paths,
            });
        }
        self.run_hooked("absorb", move |repo| {
            let affected_changes: Vec<ChangeId> = plan.updates_by_owner.keys().cloned().collect();
            for (change_id, updates) in plan.updates_by_owner {
                let mut change = repo.get_change(&change_id)?;
                let mut files = change.file_snapshot.clone().unwrap_or_default();
                files.extend(updates);
                change.tree = tree_ref_for_files(&files);
                change.file_snapshot = Some(files);
                repo.maybe_commit(&mut change)?;
                repo.graph.update(change).map_err(graph_err)?;
            }

            let working_change_id = repo.working_copy.current_change().clone();
            let mut working_change = repo.get_change(&working_change_id)?;
            working_change.tree = tree_ref_for_files(&plan.remaining_working_files);
            working_change.file_snapshot = Some(plan.remaining_working_files);
            repo.graph.update(working_change).map_err(graph_err)?;

            repo.record_operation("absorb", None)?;
            Ok(AbsorbOutcome { affected_changes, absorbed_paths: plan.absorbed_paths })
        })
    }

    /// Three-way merges `source` into the working copy via the nearest
    /// common ancestor. `dry_run` reports conflicts without mutating
    /// anything.
    #[tracing::instrument(skip(self))]
    pub fn merge(&mut self, source: ChangeId, dry_run: bool) -> RepoResult<MergeReport> {
        let dest = self.working_copy.current_change().clone();
        let base_id = rewrite::nearest_common_ancestor(&self.graph, &dest, &source);
        let base_files =
            base_id.as_ref().and_then(|id| self.graph.get(id)).and_then(|c| c.file_snapshot.clone()).unwrap_or_default();
        let left_files = self.graph.get(&dest).and_then(|c| c.file_snapshot.clone()).unwrap_or_default();
        let right_files = self.get_change(&source)?.file_snapshot.clone().unwrap_or_default();
        let timestamp = Timestamp::now();

        if dry_run {
            let mut scratch_conflicts = ConflictModel::new();
            let outcome = rewrite::merge_file_trees(&base_files, &left_files, &right_files, &self.drivers, &mut scratch_conflicts, timestamp);
            return Ok(MergeReport { conflicts: outcome.conflicts, result_change_id: None });
        }

        self.run_hooked("merge", move |repo| {
            let outcome =
                rewrite::merge_file_trees(&base_files, &left_files, &right_files, &repo.drivers, &mut repo.conflicts, timestamp);
            let merge_change_id = fresh_change_id();
            let user = operation_user(&repo.config)?;
            let signature = Signature { name: user.name, email: user.email, timestamp };
            let mut merge_change = Change {
                change_id: merge_change_id.clone(),
                commit_id: zero_commit_id(),
                parents: vec![dest.clone(), source.clone()],
                tree: tree_ref_for_files(&outcome.merged_files),
                author: signature.clone(),
                committer: signature,
                description: format!("merge of {} into {}", &source.hex()[..8], &dest.hex()[..8]),
                timestamp,
                predecessors: vec![],
                abandoned: false,
                file_snapshot: Some(outcome.merged_files),
            };
            repo.maybe_commit(&mut merge_change)?;
            repo.graph.add(merge_change).map_err(graph_err)?;
            repo.set_working_copy(merge_change_id.clone());
            let new_op_id = repo.record_operation("merge", None)?;
            repo.finalize_working_copy_operation(&new_op_id)?;
            Ok(MergeReport { conflicts: outcome.conflicts, result_change_id: Some(merge_change_id) })
        })
    }

    /// Restores the view (bookmarks/tags/heads/working-copy) to the state
    /// before the next not-yet-undone operation, recording the restoration
    /// itself as a new operation so repeated calls walk further back rather
    /// than flip-flopping between the same two states. Only `View` state is
    /// restored — the change graph itself is not versioned per-operation in
    /// this model (see `DESIGN.md`), so `undo` cannot reverse graph
    /// mutations like `describe`/`amend`/`rebase`.
    #[tracing::instrument(skip(self))]
    pub fn undo(&mut self) -> RepoResult<OperationId> {
        self.run_hooked("undo", |repo| {
            let user = operation_user(&repo.config)?;
            let timestamp = Timestamp::now();
            let (restored_view, new_head_id) = repo.operations.undo(user, timestamp).map_err(op_log_err)?;
            repo.bookmarks = BookmarkStore::from_view(&restored_view.bookmarks);
            repo.tags = TagStore::from_view(&restored_view.tags);
            repo.working_copy.set_current_change(restored_view.working_copy, new_head_id.clone());
            repo.persist_all()?;
            Ok(new_head_id)
        })
    }

    pub fn next(&mut self) -> RepoResult<NavigationResult> {
        self.navigate(true)
    }

    pub fn prev(&mut self) -> RepoResult<NavigationResult> {
        self.navigate(false)
    }

    /// Steps the working copy to a child or parent change.
    fn navigate(&mut self, forward: bool) -> RepoResult<NavigationResult> {
        let description = if forward { "next" } else { "prev" };
        self.run_hooked(description, move |repo| {
            let from = repo.working_copy.current_change().clone();
            let to = if forward {
                repo.graph
                    .children(&from)
                    .into_iter()
                    .next()
                    .ok_or_else(|| RepoError::new(ErrorCode::NotFound, format!("change {from} has no children")))?
            } else {
                repo.graph
                    .parents(&from)
                    .into_iter()
                    .next()
                    .ok_or_else(|| RepoError::new(ErrorCode::NotFound, format!("change {from} has no parents")))?
            };
            repo.set_working_copy(to.clone());
            let new_op_id = repo.record_operation(description, None)?;
            repo.finalize_working_copy_operation(&new_op_id)?;
            Ok(NavigationResult { change_id: to.clone(), from, to })
        })
    }

    pub fn tag_create(&mut self, name: impl Into<String>, change_id: ChangeId) -> RepoResult<()> {
        let name = name.into();
        self.run_hooked("tag create", move |repo| {
            repo.tags.create(name.as_str(), change_id)?;
            repo.record_operation(format!("tag create {name}"), None)?;
            Ok(())
        })
    }

    pub fn tag_delete(&mut self, name: &str) -> RepoResult<()> {
        let name = name.to_string();
        self.run_hooked("tag delete", move |repo| {
            repo.tags.delete(&name)?;
            repo.record_operation(format!("tag delete {name}"), None)?;
            Ok(())
        })
    }

    pub fn bookmark_create(&mut self, name: impl Into<String>, target: ChangeId) -> RepoResult<()> {
        let name = name.into();
        self.run_hooked("bookmark create", move |repo| {
            repo.bookmarks.create(name.as_str(), target)?;
            repo.record_operation(format!("bookmark create {name}"), None)?;
            Ok(())
        })
    }

    pub fn bookmark_set(&mut self, name: &str, target: ChangeId) -> RepoResult<()> {
        let name = name.to_string();
        self.run_hooked("bookmark set", move |repo| {
            repo.bookmarks.set(&name, target)?;
            repo.record_operation(format!("bookmark set {name}"), None)?;
            Ok(())
        })
    }

    pub fn bookmark_delete(&mut self, name: &str) -> RepoResult<()> {
        let name = name.to_string();
        self.run_hooked("bookmark delete", move |repo| {
            repo.bookmarks.delete(&name)?;
            repo.record_operation(format!("bookmark delete {name}"), None)?;
            Ok(())
        })
    }

    pub fn sparse_patterns(&self) -> &[String] {
        self.sparse.patterns()
    }

    pub fn sparse_set(&mut self, patterns: Vec<String>) -> RepoResult<()> {
        self.sparse.set(patterns);
        self.sparse.save(&self.storage).map_err(storage_err)?;
        self.record_operation("sparse set", None)?;
        Ok(())
    }

    /// Parses and evaluates a revset expression against the current
    /// graph/bookmark/tag/conflict state.
    pub fn log(&self, revset_expr: &str) -> RepoResult<Vec<ChangeId>> {
        let expr = revset_parser::parse(revset_expr)
            .map_err(|e| RepoError::new(ErrorCode::InvalidArgument, e.to_string()))?;
        let user_email = self.config.user_email().map_err(config_err)?;
        let ctx = EvalContext {
            graph: &self.graph,
            bookmarks: &self.bookmarks,
            tags: &self.tags,
            conflicts: &self.conflicts,
            working_copy: self.working_copy.current_change(),
            user_email,
        };
        revset::evaluate(&expr, &ctx).map_err(|e| RepoError::new(ErrorCode::InvalidArgument, e.to_string()))
    }

    /// A snapshot of the working copy change and any unresolved conflicts.
    pub fn status(&self) -> RepoResult<StatusReport> {
        let change_id = self.working_copy.current_change().clone();
        let change = self.get_change(&change_id)?;
        Ok(StatusReport {
            working_copy: change_id,
            description: change.description,
            modified_files: change.file_snapshot.map(|files| files.into_keys().collect()).unwrap_or_default(),
            unresolved_conflicts: self.conflicts.unresolved().map(|c| c.conflict_id.clone()).collect(),
        })
    }

    /// The full recorded state of one change.
    pub fn show(&self, change_id: &ChangeId) -> RepoResult<Change> {
        self.get_change(change_id)
    }

    pub fn evolution_log(&self, change_id: &ChangeId) -> Option<Vec<EvolutionEntry>> {
        evolution::evolution_log(&self.graph, change_id)
    }

    pub fn operations_log(&self) -> &[Operation] {
        self.operations.log()
    }

    pub fn resolve_conflict(&mut self, conflict_id: &ConflictId, resolution: Resolution) -> RepoResult<()> {
        self.run_hooked("resolve conflict", move |repo| {
            repo.conflicts.resolve(conflict_id, resolution).map_err(conflict_err)?;
            repo.record_operation("resolve conflict", None)?;
            Ok(())
        })
    }

    pub fn add_workspace(&mut self, name: impl Into<String>, root: impl Into<PathBuf>) -> RepoResult<WorkingCopy> {
        let name = name.into();
        let root = root.into();
        let initial_change = self.working_copy.current_change().clone();
        let working_copy = self.workspaces.add(name, root, initial_change)?;
        self.workspaces.save(&self.storage).map_err(storage_err)?;
        Ok(working_copy)
    }

    pub fn remove_workspace(&mut self, name: &str) -> RepoResult<()> {
        self.workspaces.remove(name)?;
        self.workspaces.save(&self.storage).map_err(storage_err)
    }

    /// Starts a bisection: `idle -> active(good_set,bad_set)`. The in-range
    /// candidate set is every ancestor of `bad` that is not also an
    /// ancestor of (or equal to) `good`.
    pub fn bisect_start(&mut self, bad: ChangeId, good: ChangeId) -> RepoResult<()> {
        if self.bisector.is_some() {
            return Err(RepoError::new(ErrorCode::BisectAlreadyActive, "a bisection is already active"));
        }
        let good_ancestors = self.graph.ancestors(&good);
        let mut range = self.graph.ancestors(&bad);
        range.insert(bad.clone());
        range.retain(|id| *id != good && !good_ancestors.contains(id));

        let mut bisector = Bisector::new(range, HashSet::from([bad]));
        bisector.mark(good, Evaluation::Good).map_err(bisect_err)?;
        self.bisector = Some(bisector);
        Ok(())
    }

    pub fn bisect_mark(&mut self, change_id: ChangeId, evaluation: Evaluation) -> RepoResult<()> {
        let bisector =
            self.bisector.as_mut().ok_or_else(|| RepoError::new(ErrorCode::BisectNotActive, "no bisection is active"))?;
        bisector.mark(change_id, evaluation).map_err(bisect_err)
    }

    pub fn bisect_next(&mut self) -> RepoResult<NextStep> {
        let step = {
            let bisector = self
                .bisector
                .as_ref()
                .ok_or_else(|| RepoError::new(ErrorCode::BisectNotActive, "no bisection is active"))?;
            bisector.next_step(&self.graph)
        };
        if matches!(step, NextStep::Done(_)) {
            self.bisector = None;
        }
        Ok(step)
    }

    fn get_change(&self, change_id: &ChangeId) -> RepoResult<Change> {
        self.graph.get(change_id).cloned().ok_or_else(|| not_found(change_id))
    }

    fn set_working_copy(&mut self, change_id: ChangeId) {
        let placeholder = self.operations.head_id().unwrap_or_else(|| OperationId::from_bytes(&[]));
        self.working_copy.set_current_change(change_id, placeholder);
    }

    fn finalize_working_copy_operation(&mut self, new_op_id: &OperationId) -> RepoResult<()> {
        let change_id = self.working_copy.current_change().clone();
        self.working_copy.set_current_change(change_id, new_op_id.clone());
        self.working_copy.save(&self.storage).map_err(wc_err)
    }

    /// Synthesizes a Git commit for `change` when a Git backend is present
    /// and it carries file content, updating `commit_id`. Records the
    /// superseded commit id as a predecessor when one already existed, so
    /// [`Self::evolution_log`] can show the rewrite history.
    fn maybe_commit(&self, change: &mut Change) -> RepoResult<()> {
        if change.tree.is_empty() {
            return Ok(());
        }
        let parent_oids = change
            .parents
            .iter()
            .filter_map(|id| self.graph.get(id))
            .filter(|c| !c.is_uncommitted())
            .map(|c| commit_id_to_git_object_id(&c.commit_id))
            .collect();
        let request = CreateCommitRequest {
            message: change.description.clone(),
            author: change.author.clone(),
            committer: change.committer.clone(),
            parents: parent_oids,
            tree: None,
        };
        let oid = self.backend.create_commit(request).map_err(backend_err)?;
        let new_commit_id = commit_id_from_git_object_id(&oid);
        if !change.is_uncommitted() && new_commit_id != change.commit_id {
            evolution::record_predecessor(change, change.commit_id.clone());
        }
        change.commit_id = new_commit_id;
        Ok(())
    }

    fn current_view(&self) -> View {
        View {
            bookmarks: self.bookmarks.to_view_map(),
            remote_bookmarks: BTreeMap::new(),
            tags: self.tags.to_view_map(),
            heads: self.graph.visible_heads().into_iter().collect(),
            working_copy: self.working_copy.current_change().clone(),
        }
    }

    fn record_operation(&mut self, description: impl Into<String>, file_snapshot: Option<BTreeMap<String, String>>) -> RepoResult<OperationId> {
        let expected_head =
            self.operations.head_id().ok_or_else(|| RepoError::new(ErrorCode::NotFound, "operation log is empty"))?;
        let user = operation_user(&self.config)?;
        let timestamp = Timestamp::now();
        let view = self.current_view();
        let new_id = self
            .operations
            .record_operation(&expected_head, description, user, timestamp, view, file_snapshot)
            .map_err(op_log_err)?;
        self.persist_all()?;
        Ok(new_id)
    }

    fn persist_all(&self) -> RepoResult<()> {
        self.graph.save(&self.storage).map_err(graph_err)?;
        self.operations.save(&self.storage).map_err(op_log_err)?;
        self.working_copy.save(&self.storage).map_err(wc_err)?;
        self.conflicts.save(&self.storage).map_err(storage_err)?;
        self.workspaces.save(&self.storage).map_err(storage_err)?;
        self.sparse.save(&self.storage).map_err(storage_err)?;
        write_config(&self.root, &self.config)
    }

    /// Runs `mutate` bracketed by the pre-/post-commit hooks: `preCommit`
    /// runs before any mutation and an error aborts with no visible change;
    /// `postCommit` runs after the View is appended and an error is only
    /// logged, with no rollback. `Hooks` is temporarily taken out of `self`
    /// so its `&mut self` hook-running methods don't conflict with the
    /// `&mut Self` the mutate closure needs.
    fn run_hooked<T>(&mut self, description: &str, mutate: impl FnOnce(&mut Self) -> RepoResult<T>) -> RepoResult<T> {
        let ctx = HookContext { operation_description: description.to_string() };

        let mut hooks = std::mem::take(&mut self.hooks);
        let pre_result = hooks.run_pre_commit(&ctx);
        self.hooks = hooks;
        pre_result?;

        let result = mutate(self)?;

        let mut hooks = std::mem::take(&mut self.hooks);
        hooks.run_post_commit(&ctx);
        self.hooks = hooks;

        Ok(result)
    }
}

fn looks_like_change_id(value: &str) -> bool {
    value.len() == 32 && value.chars().all(|c| c.is_ascii_hexdigit())
}

fn not_found(change_id: &ChangeId) -> RepoError {
    RepoError::new(ErrorCode::ChangeNotFound, format!("change not found: {change_id}"))
}

fn fresh_change_id() -> ChangeId {
    let mut bytes = [0u8; 16];
    rand::rng().fill_bytes(&mut bytes);
    ChangeId::from_bytes(&bytes)
}

/// Derives a pseudo tree-ref identity from a path -> content map: a content
/// hash truncated to the 40-hex-char width a `TreeRef` uses.
/// This crate has no Git tree-object builder, so `file_snapshot` (not
/// `tree`) is the authoritative record of content; `tree` exists only to
/// distinguish "empty" from "has content" and to detect identical trees.
fn tree_ref_for_files(files: &BTreeMap<String, String>) -> TreeRef {
    if files.is_empty() {
        return TreeRef::empty();
    }
    let hash = files.content_hash();
    TreeRef::new(hash.chars().take(40).collect::<String>())
}

fn commit_id_to_git_object_id(id: &CommitId) -> GitObjectId {
    GitObjectId::from_bytes(id.as_bytes())
}

fn commit_id_from_git_object_id(id: &GitObjectId) -> CommitId {
    CommitId::from_bytes(id.as_bytes())
}

fn operation_user(config: &UserConfig) -> RepoResult<OperationUser> {
    let name = config.user_name().map_err(config_err)?.to_string();
    let email = config.user_email().map_err(config_err)?.to_string();
    Ok(OperationUser::current(name, email))
}

fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE_NAME)
}

fn write_config(root: &Path, config: &UserConfig) -> RepoResult<()> {
    std::fs::write(config_path(root), config.to_toml_string()).map_err(|e| {
        RepoError::new(ErrorCode::StorageWriteFailed, format!("failed to write {CONFIG_FILE_NAME}: {e}")).with_source(e)
    })
}

fn read_config(root: &Path) -> RepoResult<UserConfig> {
    let text = std::fs::read_to_string(config_path(root)).map_err(|e| {
        RepoError::new(ErrorCode::StorageReadFailed, format!("failed to read {CONFIG_FILE_NAME}: {e}")).with_source(e)
    })?;
    UserConfig::parse(&text).map_err(config_err)
}

fn storage_err(e: StorageError) -> RepoError {
    let message = e.to_string();
    RepoError::new(ErrorCode::StorageReadFailed, message).with_source(e)
}

fn graph_err(e: ChangeGraphError) -> RepoError {
    let code = match &e {
        ChangeGraphError::NotFound(_) => ErrorCode::ChangeNotFound,
        ChangeGraphError::AlreadyExists(_) => ErrorCode::ChangeExists,
        ChangeGraphError::SelfParent { .. } => ErrorCode::InvalidOperation,
        ChangeGraphError::DanglingParent { .. } => ErrorCode::InvalidArgument,
        ChangeGraphError::CycleDetected(_) => ErrorCode::InvalidOperation,
        ChangeGraphError::Storage(_) => ErrorCode::StorageReadFailed,
    };
    let message = e.to_string();
    RepoError::new(code, message).with_source(e)
}

fn op_log_err(e: OperationLogError) -> RepoError {
    let code = match &e {
        OperationLogError::NotFound(_) => ErrorCode::NotFound,
        OperationLogError::Empty => ErrorCode::NotFound,
        OperationLogError::Conflict { .. } => ErrorCode::OperationConflict,
        OperationLogError::Storage(_) => ErrorCode::StorageReadFailed,
    };
    let message = e.to_string();
    RepoError::new(code, message).with_source(e)
}

fn wc_err(e: WorkingCopyError) -> RepoError {
    let code = match &e {
        WorkingCopyError::InvalidPath(_) => ErrorCode::InvalidPath,
        WorkingCopyError::NotTracked(_) => ErrorCode::FileNotFound,
        WorkingCopyError::Storage(_) => ErrorCode::StorageReadFailed,
    };
    let message = e.to_string();
    RepoError::new(code, message).with_source(e)
}

fn backend_err(e: BackendError) -> RepoError {
    let code = match &e {
        BackendError::ObjectNotFound { .. } => ErrorCode::NotFound,
        BackendError::ReadObject { .. } | BackendError::WriteObject { .. } => ErrorCode::StorageReadFailed,
        BackendError::NetworkNotAvailable => ErrorCode::NetworkNotAvailable,
        BackendError::Network(_) => ErrorCode::NetworkError,
        BackendError::AuthFailed(_) => ErrorCode::AuthFailed,
        BackendError::PushRejected(_) => ErrorCode::PushRejected,
        BackendError::Unsupported(_) => ErrorCode::UnsupportedOperation,
        BackendError::Other(_) => ErrorCode::StorageReadFailed,
    };
    let message = e.to_string();
    RepoError::new(code, message).with_source(e)
}

fn config_err(e: ConfigError) -> RepoError {
    let message = e.to_string();
    RepoError::new(ErrorCode::InvalidConfig, message).with_source(e)
}

fn conflict_err(e: ConflictError) -> RepoError {
    let code = match &e {
        ConflictError::NotFound(_) => ErrorCode::NotFound,
        ConflictError::NoResolution => ErrorCode::MergeError,
    };
    let message = e.to_string();
    RepoError::new(code, message).with_source(e)
}

fn bisect_err(e: BisectionError) -> RepoError {
    let code = match &e {
        BisectionError::NotInRange(_) => ErrorCode::InvalidArgument,
        BisectionError::NotActive => ErrorCode::BisectNotActive,
    };
    let message = e.to_string();
    RepoError::new(code, message).with_source(e)
}

fn path_err(e: InvalidRepoPathError) -> RepoError {
    let message = e.to_string();
    RepoError::new(ErrorCode::InvalidPath, message).with_source(e)
}
