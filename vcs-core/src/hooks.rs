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

//! `preCommit`/`postCommit` hook dispatch: a boxed `FnMut` closure type
//! rather than a trait object hierarchy, since a hook is a single
//! callback, not a pluggable implementation with multiple methods.

use crate::error::RepoError;

/// Context handed to `preCommit`/`postCommit` for one mutating operation.
#[derive(Debug, Clone)]
pub struct HookContext {
    pub operation_description: String,
}

pub type PreCommitHook<'a> = dyn FnMut(&HookContext) -> Result<(), RepoError> + Send + 'a;
pub type PostCommitHook<'a> = dyn FnMut(&HookContext) + Send + 'a;

/// Registered hooks for a repository handle: an optional `preCommit` and
/// an optional `postCommit`.
#[derive(Default)]
pub struct Hooks<'a> {
    pre_commit: Option<Box<PreCommitHook<'a>>>,
    post_commit: Option<Box<PostCommitHook<'a>>>,
}

impl<'a> Hooks<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_pre_commit(&mut self, hook: Box<PreCommitHook<'a>>) {
        self.pre_commit = Some(hook);
    }

    pub fn set_post_commit(&mut self, hook: Box<PostCommitHook<'a>>) {
        self.post_commit = Some(hook);
    }

    /// Runs `preCommit`. Its failure aborts the operation before any state
    /// mutation.
    pub fn run_pre_commit(&mut self, ctx: &HookContext) -> Result<(), RepoError> {
        match &mut self.pre_commit {
            Some(hook) => hook(ctx),
            None => Ok(()),
        }
    }

    /// Runs `postCommit` after the operation's View has been appended to
    /// the log. Its failure is logged but never rolls back the mutation.
    pub fn run_post_commit(&mut self, ctx: &HookContext) {
        if let Some(hook) = &mut self.post_commit {
            hook(ctx);
        }
    }
}

impl std::fmt::Debug for Hooks<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hooks")
            .field("pre_commit", &self.pre_commit.is_some())
            .field("post_commit", &self.post_commit.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn pre_commit_failure_is_propagated() {
        let mut hooks = Hooks::new();
        hooks.set_pre_commit(Box::new(|_ctx| Err(RepoError::new(ErrorCode::InvalidArgument, "nope"))));
        let ctx = HookContext { operation_description: "new".into() };
        assert!(hooks.run_pre_commit(&ctx).is_err());
    }

    #[test]
    fn missing_hooks_are_no_ops() {
        let mut hooks = Hooks::new();
        let ctx = HookContext { operation_description: "new".into() };
        assert!(hooks.run_pre_commit(&ctx).is_ok());
        hooks.run_post_commit(&ctx);
    }

    #[test]
    fn post_commit_runs_and_can_observe_context() {
        let mut seen = Vec::new();
        let mut hooks = Hooks::new();
        let (tx, rx) = std::sync::mpsc::channel();
        hooks.set_post_commit(Box::new(move |ctx| {
            tx.send(ctx.operation_description.clone()).unwrap();
        }));
        let ctx = HookContext { operation_description: "describe".into() };
        hooks.run_post_commit(&ctx);
        seen.push(rx.recv().unwrap());
        assert_eq!(seen, vec!["describe".to_string()]);
    }
}
