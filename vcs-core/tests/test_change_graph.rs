//! Change-graph mutations exercised through
//! [`vcs_core::RepositoryCore`].

use vcs_core::error::ErrorCode;
use vcs_core_testutils::TestRepo;

#[test]
fn rebase_changes_the_parent_pointer() {
    let mut env = TestRepo::init();
    let repo = &mut env.repo;
    let root = repo.working_copy_change().clone();
    let a = repo.create_change(Some("a".to_string()), Some(vec![root.clone()])).unwrap();
    let b = repo.create_change(Some("b".to_string()), Some(vec![root.clone()])).unwrap();

    repo.rebase(b.clone(), a.clone()).unwrap();

    let b_change = repo.show(&b).unwrap();
    assert_eq!(b_change.parents, vec![a]);
}

#[test]
fn rebase_onto_a_descendant_is_rejected_as_a_cycle() {
    let mut env = TestRepo::init();
    let repo = &mut env.repo;
    let a = repo.create_change(None, None).unwrap();
    let b = repo.create_change(Some("b".to_string()), Some(vec![a.clone()])).unwrap();

    let err = repo.rebase(a, b).unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidOperation);
}

#[test]
fn rebase_unknown_change_is_not_found() {
    let mut env = TestRepo::init();
    let repo = &mut env.repo;
    let a = repo.create_change(None, None).unwrap();
    let unknown = vcs_core::object_id::ChangeId::from_hex("deadbeefdeadbeefdeadbeefdeadbeef");

    let err = repo.rebase(unknown, a).unwrap_err();
    assert_eq!(err.code, ErrorCode::NotFound);
}

#[test]
fn duplicate_mints_fresh_ids_with_same_content() {
    let mut env = TestRepo::init();
    let repo = &mut env.repo;
    let a = repo.create_change(Some("original".to_string()), None).unwrap();

    let pairs = repo.duplicate(vec![a.clone()]).unwrap();
    assert_eq!(pairs.len(), 1);
    let (original, copy) = pairs[0].clone();
    assert_eq!(original, a);
    assert_ne!(copy, a);

    let copy_change = repo.show(&copy).unwrap();
    assert_eq!(copy_change.description, "original");
    assert!(!copy_change.abandoned);
}

#[test]
fn abandoned_changes_are_excluded_from_visible_heads() {
    let mut env = TestRepo::init();
    let repo = &mut env.repo;
    let a = repo.create_change(None, None).unwrap();
    assert!(repo.graph().visible_heads().contains(&a));

    repo.abandon(a.clone()).unwrap();
    assert!(!repo.graph().visible_heads().contains(&a));
}
