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

//! Pluggable merge drivers, keyed by path pattern. Each driver is any
//! closure registered by the caller, looked up by glob rather than by a
//! fixed set of named implementations.

use crate::conflicts::ConflictSides;

/// Input handed to a merge driver for one conflicted path.
#[derive(Debug, Clone)]
pub struct DriverInput<'a> {
    pub path: &'a str,
    pub sides: &'a ConflictSides,
    /// Additional common-ancestor content, for drivers that support n-way
    /// merges. Empty for a plain three-way merge.
    pub ancestors: &'a [String],
}

/// Result of running a driver against one conflict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverOutput {
    pub content: String,
    pub has_conflict: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum MergeDriverError {
    #[error("merge driver panicked for path {0}")]
    Panicked(String),
    #[error("merge driver failed for path {0}: {1}")]
    Failed(String, String),
}

pub type DriverFn = dyn Fn(&DriverInput<'_>) -> Result<DriverOutput, String> + Send + Sync;

struct RegisteredDriver {
    pattern: String,
    driver: Box<DriverFn>,
}

/// Registry of path-pattern -> merge-driver bindings. Exact-path bindings
/// always win over glob bindings; among globs, the first one registered
/// that matches wins.
#[derive(Default)]
pub struct MergeDriverRegistry {
    exact: Vec<RegisteredDriver>,
    globs: Vec<RegisteredDriver>,
}

impl std::fmt::Debug for MergeDriverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MergeDriverRegistry")
            .field("exact", &self.exact.iter().map(|d| &d.pattern).collect::<Vec<_>>())
            .field("globs", &self.globs.iter().map(|d| &d.pattern).collect::<Vec<_>>())
            .finish()
    }
}

fn is_glob_pattern(pattern: &str) -> bool {
    pattern.contains(['*', '?', '[', ']'])
}

impl MergeDriverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `driver` for `pattern`, which may be an exact path or a
    /// glob. Re-registering the same pattern replaces the prior binding.
    pub fn register(&mut self, pattern: impl Into<String>, driver: Box<DriverFn>) {
        let pattern = pattern.into();
        self.unregister(&pattern);
        let entry = RegisteredDriver { pattern: pattern.clone(), driver };
        if is_glob_pattern(&pattern) {
            self.globs.push(entry);
        } else {
            self.exact.push(entry);
        }
    }

    pub fn unregister(&mut self, pattern: &str) {
        self.exact.retain(|d| d.pattern != pattern);
        self.globs.retain(|d| d.pattern != pattern);
    }

    /// Looks up the driver that should run for `path`: exact match first,
    /// then the earliest-registered matching glob.
    pub fn get(&self, path: &str) -> Option<&DriverFn> {
        if let Some(found) = self.exact.iter().find(|d| d.pattern == path) {
            return Some(&*found.driver);
        }
        self.globs
            .iter()
            .find(|d| glob::Pattern::new(&d.pattern).is_ok_and(|p| p.matches(path)))
            .map(|d| &*d.driver)
    }

    /// Runs the driver bound to `input.path`, if any, catching panics and
    /// converting them into [`MergeDriverError::Panicked`] so one broken
    /// driver cannot abort a whole `resolveAll`.
    pub fn run(&self, input: &DriverInput<'_>) -> Option<Result<DriverOutput, MergeDriverError>> {
        let driver = self.get(input.path)?;
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| driver(input)));
        Some(match result {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(message)) => Err(MergeDriverError::Failed(input.path.to_string(), message)),
            Err(_) => Err(MergeDriverError::Panicked(input.path.to_string())),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conflicts::ConflictSide;

    fn sides() -> ConflictSides {
        ConflictSides {
            base: ConflictSide::Content("base".into()),
            left: ConflictSide::Content("left".into()),
            right: ConflictSide::Content("right".into()),
        }
    }

    #[test]
    fn exact_path_wins_over_glob() {
        let mut registry = MergeDriverRegistry::new();
        registry.register("*.txt", Box::new(|_| Ok(DriverOutput { content: "glob".into(), has_conflict: false })));
        registry.register("a.txt", Box::new(|_| Ok(DriverOutput { content: "exact".into(), has_conflict: false })));
        let sides = sides();
        let input = DriverInput { path: "a.txt", sides: &sides, ancestors: &[] };
        let output = registry.run(&input).unwrap().unwrap();
        assert_eq!(output.content, "exact");
    }

    #[test]
    fn first_registered_glob_wins() {
        let mut registry = MergeDriverRegistry::new();
        registry.register("*.txt", Box::new(|_| Ok(DriverOutput { content: "first".into(), has_conflict: false })));
        registry.register("a.*", Box::new(|_| Ok(DriverOutput { content: "second".into(), has_conflict: false })));
        let sides = sides();
        let input = DriverInput { path: "a.txt", sides: &sides, ancestors: &[] };
        let output = registry.run(&input).unwrap().unwrap();
        assert_eq!(output.content, "first");
    }

    #[test]
    fn unmatched_path_returns_none() {
        let registry = MergeDriverRegistry::new();
        let sides = sides();
        let input = DriverInput { path: "a.txt", sides: &sides, ancestors: &[] };
        assert!(registry.run(&input).is_none());
    }

    #[test]
    fn panicking_driver_is_caught() {
        let mut registry = MergeDriverRegistry::new();
        registry.register("a.txt", Box::new(|_| panic!("boom")));
        let sides = sides();
        let input = DriverInput { path: "a.txt", sides: &sides, ancestors: &[] };
        assert!(matches!(registry.run(&input), Some(Err(MergeDriverError::Panicked(_)))));
    }

    #[test]
    fn unregister_removes_binding() {
        let mut registry = MergeDriverRegistry::new();
        registry.register("a.txt", Box::new(|_| Ok(DriverOutput { content: "x".into(), has_conflict: false })));
        registry.unregister("a.txt");
        assert!(registry.get("a.txt").is_none());
    }
}
