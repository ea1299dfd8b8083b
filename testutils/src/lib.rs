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

//! Shared fixtures for `vcs-core`'s integration tests.
//!
//! One helper wires up a throwaway repository so tests don't each
//! re-derive the `Storage` + `MemoryBackend` + `RepositoryCore::new`
//! boilerplate.

use std::path::Path;
use std::path::PathBuf;

use rand::Rng as _;
use rand::SeedableRng as _;
use tempfile::TempDir;
use vcs_core::backend::GitBackend;
use vcs_core::backend::MemoryBackend;
use vcs_core::RepositoryCore;

pub const TEST_USER_NAME: &str = "Test User";
pub const TEST_USER_EMAIL: &str = "test.user@example.com";

/// A repository rooted in a scratch directory that is removed when the
/// `TestRepo` (and its `TempDir`) drops.
pub struct TestRepo<'h> {
    dir: TempDir,
    pub repo: RepositoryCore<'h>,
}

impl TestRepo<'_> {
    /// Initializes a fresh repository with the in-memory backend under a new
    /// temp directory, and a fixed test user so assertions are deterministic.
    pub fn init() -> Self {
        let dir = tempfile::Builder::new().prefix("vcs-core-test-").tempdir().expect("failed to create temp dir");
        let backend: Box<dyn GitBackend> = Box::new(MemoryBackend::new());
        let repo = RepositoryCore::new(dir.path(), backend, TEST_USER_NAME, TEST_USER_EMAIL)
            .expect("failed to initialize test repository");
        Self { dir, repo }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn root_buf(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    /// Reopens the same on-disk repository as a second, independent handle
    /// — useful for exercising `RepositoryCore::open` and cross-process
    /// operation-conflict scenarios.
    pub fn reopen(&self) -> RepositoryCore<'static> {
        let backend: Box<dyn GitBackend> = Box::new(MemoryBackend::new());
        RepositoryCore::open(self.dir.path(), backend).expect("failed to reopen test repository")
    }
}

/// A seeded, reproducible byte source for tests that need deterministic
/// "random" content without pulling in the OS RNG. `ChangeId` freshness
/// only needs uniqueness, not unpredictability, so tests are free to fix
/// the seed.
pub fn seeded_rng(seed: u64) -> rand_chacha::ChaCha8Rng {
    rand_chacha::ChaCha8Rng::seed_from_u64(seed)
}

/// A short, human-distinguishable string derived from a seeded RNG, handy
/// for building up distinct file contents across a test's changes.
pub fn fake_content(rng: &mut rand_chacha::ChaCha8Rng, label: &str) -> String {
    let suffix: u32 = rng.random();
    format!("{label}-{suffix:08x}\n")
}
