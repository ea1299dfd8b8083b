//! Append-only operation log behavior exercised through
//! [`vcs_core::RepositoryCore`].

use vcs_core::error::ErrorCode;
use vcs_core_testutils::TestRepo;

#[test]
fn every_mutation_appends_exactly_one_operation() {
    let mut env = TestRepo::init();
    let repo = &mut env.repo;
    let before = repo.operations_log().len();

    repo.create_change(Some("hello".to_string()), None).unwrap();

    assert_eq!(repo.operations_log().len(), before + 1);
}

#[test]
fn undo_itself_is_recorded_as_an_operation() {
    let mut env = TestRepo::init();
    let repo = &mut env.repo;
    repo.create_change(None, None).unwrap();
    let before = repo.operations_log().len();

    repo.undo().unwrap();

    assert_eq!(repo.operations_log().len(), before + 1);
}

#[test]
fn undo_on_the_root_operation_fails_cleanly() {
    let mut env = TestRepo::init();
    let repo = &mut env.repo;
    let err = repo.undo().unwrap_err();
    assert_eq!(err.code, ErrorCode::NotFound);
    assert_eq!(repo.operations_log().len(), 1);
}

#[test]
fn repeated_undo_walks_operations_back_to_the_root() {
    let mut env = TestRepo::init();
    let repo = &mut env.repo;
    let root = repo.working_copy_change().clone();
    repo.create_change(Some("a".to_string()), None).unwrap();
    repo.create_change(Some("b".to_string()), None).unwrap();

    repo.undo().unwrap();
    repo.undo().unwrap();

    assert_eq!(repo.working_copy_change(), &root);
}
