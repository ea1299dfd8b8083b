//! Working-copy navigation, sparse patterns, status, and workspaces,
//! exercised through [`vcs_core::RepositoryCore`].

use std::collections::BTreeMap;

use vcs_core::error::ErrorCode;
use vcs_core_testutils::TestRepo;

#[test]
fn edit_moves_the_working_copy_pointer() {
    let mut env = TestRepo::init();
    let repo = &mut env.repo;
    let c1 = repo.create_change(Some("c1".to_string()), None).unwrap();
    repo.create_change(Some("c2".to_string()), None).unwrap();

    repo.edit(c1.clone()).unwrap();
    assert_eq!(repo.working_copy_change(), &c1);
}

#[test]
fn edit_rejects_abandoned_change() {
    let mut env = TestRepo::init();
    let repo = &mut env.repo;
    let c1 = repo.create_change(None, None).unwrap();
    repo.abandon(c1.clone()).unwrap();

    let err = repo.edit(c1).unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidOperation);
}

#[test]
fn next_and_prev_walk_the_chain() {
    let mut env = TestRepo::init();
    let repo = &mut env.repo;
    let root = repo.working_copy_change().clone();
    let c1 = repo.create_change(Some("c1".to_string()), None).unwrap();

    repo.edit(root.clone()).unwrap();
    let forward = repo.next().unwrap();
    assert_eq!(forward.to, c1);

    let backward = repo.prev().unwrap();
    assert_eq!(backward.to, root);
}

#[test]
fn next_at_a_leaf_reports_not_found() {
    let mut env = TestRepo::init();
    let repo = &mut env.repo;
    let err = repo.next().unwrap_err();
    assert_eq!(err.code, ErrorCode::NotFound);
}

#[test]
fn sparse_set_and_patterns_round_trip() {
    let mut env = TestRepo::init();
    let repo = &mut env.repo;
    assert!(repo.sparse_patterns().is_empty());

    repo.sparse_set(vec!["src/**".to_string()]).unwrap();
    assert_eq!(repo.sparse_patterns(), &["src/**".to_string()]);
}

#[test]
fn status_reports_working_copy_and_files() {
    let mut env = TestRepo::init();
    let repo = &mut env.repo;
    let mut files = BTreeMap::new();
    files.insert("a.txt".to_string(), "hello\n".to_string());
    repo.amend(None, None, Some(files)).unwrap();

    let status = repo.status().unwrap();
    assert_eq!(status.working_copy, *repo.working_copy_change());
    assert_eq!(status.modified_files, vec!["a.txt".to_string()]);
    assert!(status.unresolved_conflicts.is_empty());
}

#[test]
fn add_and_remove_workspace() {
    let mut env = TestRepo::init();
    let repo = &mut env.repo;
    let extra_dir = tempfile::tempdir().unwrap();

    let workspace_wc = repo.add_workspace("secondary", extra_dir.path()).unwrap();
    assert_eq!(workspace_wc.current_change(), repo.working_copy_change());

    repo.remove_workspace("secondary").unwrap();
    assert!(repo.remove_workspace("secondary").is_err());
}

#[cfg(feature = "git")]
#[test]
fn repository_core_runs_against_a_real_git2_backend() {
    use vcs_core::backend::GitBackend;
    use vcs_core::git_backend::Git2Backend;

    let repo_dir = tempfile::tempdir().unwrap();
    let git_dir = tempfile::tempdir().unwrap();
    let backend: Box<dyn GitBackend> = Box::new(Git2Backend::init(git_dir.path()).unwrap());
    let mut repo =
        vcs_core::RepositoryCore::new(repo_dir.path(), backend, "Test User", "test.user@example.com").unwrap();

    let root = repo.working_copy_change().clone();
    let child = repo.create_change(Some("no content yet".to_string()), Some(vec![root])).unwrap();
    repo.edit(child.clone()).unwrap();

    let change = repo.show(&child).unwrap();
    assert_eq!(change.description, "no content yet");
    assert_eq!(repo.working_copy_change(), &child);
}

#[test]
fn reopen_restores_working_copy_and_graph() {
    let env = TestRepo::init();
    let first_change = env.repo.working_copy_change().clone();

    let reopened = env.reopen();
    assert_eq!(reopened.working_copy_change(), &first_change);
    assert!(reopened.graph().contains(&first_change));
}
