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

//! Repository-relative file paths and the validation rules shared by
//! `write`/`move`/`remove`.

use std::fmt;

/// A validated, repository-relative, forward-slash path: no leading slash,
/// no `..` segment, non-empty.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct RepoPathBuf(String);

#[derive(Debug, thiserror::Error)]
#[error("invalid path {value:?}: {reason}")]
pub struct InvalidRepoPathError {
    pub value: String,
    pub reason: &'static str,
}

impl RepoPathBuf {
    /// Validates and wraps `value` per the §4.4 path rules.
    pub fn new(value: impl Into<String>) -> Result<Self, InvalidRepoPathError> {
        let value = value.into();
        if value.is_empty() {
            return Err(InvalidRepoPathError { value, reason: "path is empty" });
        }
        if value.starts_with('/') {
            return Err(InvalidRepoPathError { value, reason: "path has a leading slash" });
        }
        if value.starts_with("./") || value == "." {
            return Err(InvalidRepoPathError { value, reason: "path is not normalized" });
        }
        for component in value.split('/') {
            if component.is_empty() {
                return Err(InvalidRepoPathError { value, reason: "path has an empty segment" });
            }
            if component == ".." {
                return Err(InvalidRepoPathError { value, reason: "path contains a `..` segment" });
            }
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Whether this path matches a glob pattern (used by conflict-resolution
    /// filters and the `paths()` revset predicate).
    pub fn matches_glob(&self, pattern: &str) -> bool {
        glob::Pattern::new(pattern)
            .map(|p| p.matches(&self.0))
            .unwrap_or(false)
    }
}

impl fmt::Display for RepoPathBuf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for RepoPathBuf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RepoPathBuf({:?})", self.0)
    }
}

impl AsRef<str> for RepoPathBuf {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Validates that `src != dst` and both pass [`RepoPathBuf::new`], as
/// required for `move` (§4.4: "move forbids src==dst").
pub fn validate_move(src: &str, dst: &str) -> Result<(RepoPathBuf, RepoPathBuf), InvalidRepoPathError> {
    let src = RepoPathBuf::new(src)?;
    let dst = RepoPathBuf::new(dst)?;
    if src == dst {
        return Err(InvalidRepoPathError {
            value: src.into_string(),
            reason: "move source and destination are the same path",
        });
    }
    Ok((src, dst))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_relative_paths() {
        assert!(RepoPathBuf::new("src/main.rs").is_ok());
        assert!(RepoPathBuf::new("README.md").is_ok());
    }

    #[test]
    fn rejects_leading_slash() {
        assert!(RepoPathBuf::new("/etc/passwd").is_err());
    }

    #[test]
    fn rejects_dot_dot_segments() {
        assert!(RepoPathBuf::new("../escape").is_err());
        assert!(RepoPathBuf::new("a/../b").is_err());
    }

    #[test]
    fn rejects_empty_and_empty_segments() {
        assert!(RepoPathBuf::new("").is_err());
        assert!(RepoPathBuf::new("a//b").is_err());
    }

    #[test]
    fn move_rejects_identical_src_and_dst() {
        assert!(validate_move("a.txt", "a.txt").is_err());
        assert!(validate_move("a.txt", "b.txt").is_ok());
    }
}
