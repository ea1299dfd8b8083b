//! End-to-end scenarios against [`vcs_core::RepositoryCore`].

use std::collections::BTreeMap;

use vcs_core::conflicts::Resolution;
use vcs_core::conflicts::ResolveSide;
use vcs_core::error::ErrorCode;
use vcs_core::object_id::ObjectId as _;
use vcs_core_testutils::TestRepo;

fn files(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs.iter().map(|(path, content)| (path.to_string(), content.to_string())).collect()
}

/// Scenario 1: "Amend preserves ChangeId."
#[test]
fn amend_preserves_change_id() {
    let mut env = TestRepo::init();
    let repo = &mut env.repo;

    let x = repo.working_copy_change().clone();
    repo.describe(Some(x.clone()), "A".to_string()).unwrap();
    repo.amend(Some(x.clone()), Some("A'".to_string()), None).unwrap();

    let shown = repo.show(&x).unwrap();
    assert_eq!(shown.change_id, x);
    assert_eq!(shown.description, "A'");
}

/// Scenario 2: "Undo restores working-copy pointer."
#[test]
fn undo_restores_working_copy_pointer() {
    let mut env = TestRepo::init();
    let repo = &mut env.repo;

    let root = repo.working_copy_change().clone();
    let y = repo.create_change(Some("f1".to_string()), None).unwrap();
    assert_eq!(repo.working_copy_change(), &y);

    repo.create_change(Some("f2".to_string()), None).unwrap();
    repo.undo().unwrap();
    assert_eq!(repo.working_copy_change(), &y);

    repo.undo().unwrap();
    assert_eq!(repo.working_copy_change(), &root);
}

/// Scenario 3: "Merge detects content conflict."
#[test]
fn merge_detects_content_conflict_and_resolves_ours() {
    let mut env = TestRepo::init();
    let repo = &mut env.repo;

    repo.amend(None, None, Some(files(&[("file.txt", "base\n")]))).unwrap();
    let base = repo.working_copy_change().clone();

    let branch_a = repo.create_change(Some("branch A".to_string()), Some(vec![base.clone()])).unwrap();
    repo.amend(Some(branch_a.clone()), None, Some(files(&[("file.txt", "A\n")]))).unwrap();

    let branch_b = repo.create_change(Some("branch B".to_string()), Some(vec![base])).unwrap();
    repo.edit(branch_b).unwrap();
    repo.amend(None, None, Some(files(&[("file.txt", "B\n")]))).unwrap();

    let report = repo.merge(branch_a, false).unwrap();
    assert!(!report.conflicts.is_empty());
    let conflict = repo.conflicts().get(&report.conflicts[0]).unwrap();
    assert_eq!(conflict.path.as_str(), "file.txt");

    let merge_change_id = report.result_change_id.unwrap();
    repo.edit(merge_change_id).unwrap();

    let conflict_id = report.conflicts[0].clone();
    repo.resolve_conflict(&conflict_id, Resolution::Side { side: ResolveSide::Ours }).unwrap();
    assert!(repo.conflicts().get(&conflict_id).unwrap().resolved);
}

/// Scenario 4: "Bookmark uniqueness + move."
#[test]
fn bookmark_uniqueness_and_move() {
    let mut env = TestRepo::init();
    let repo = &mut env.repo;

    let c1 = repo.create_change(Some("c1".to_string()), None).unwrap();
    repo.bookmark_create("feature", c1.clone()).unwrap();

    let err = repo.bookmark_create("feature", c1.clone()).unwrap_err();
    assert_eq!(err.code, ErrorCode::BookmarkExists);

    let c2 = repo.create_change(Some("c2".to_string()), None).unwrap();
    repo.bookmark_set("feature", c2.clone()).unwrap();

    let names: Vec<_> = repo.bookmarks().list().map(|b| (b.name.clone(), b.target.clone())).collect();
    assert_eq!(names, vec![("feature".to_string(), c2)]);
}

/// Scenario 5: "Revset range semantics."
#[test]
fn revset_range_excludes_the_left_endpoint() {
    let mut env = TestRepo::init();
    let repo = &mut env.repo;

    let c1 = repo.working_copy_change().clone();
    let c2 = repo.create_change(Some("c2".to_string()), None).unwrap();
    let c3 = repo.create_change(Some("c3".to_string()), None).unwrap();

    let mut result = repo.log(&format!("{c1}..{c3}")).unwrap();
    result.sort();
    let mut expected = vec![c2, c3];
    expected.sort();
    assert_eq!(result, expected);
}

/// Scenario 6: "Ambiguous move."
#[test]
fn ambiguous_move_with_two_change_ids_fails() {
    let mut env = TestRepo::init();
    let repo = &mut env.repo;

    let a = repo.create_change(None, None).unwrap();
    let b = repo.create_change(None, None).unwrap();

    let err = repo.move_legacy(&a.hex(), &b.hex()).unwrap_err();
    assert_eq!(err.code, ErrorCode::AmbiguousOperation);
    assert!(err.suggestion.unwrap().contains("newParent"));
}

#[test]
fn rebase_rejects_self_parenting() {
    let mut env = TestRepo::init();
    let repo = &mut env.repo;
    let a = repo.create_change(None, None).unwrap();
    let err = repo.rebase(a.clone(), a).unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidOperation);
}

#[test]
fn split_keeps_part1_identity_and_mints_part2() {
    let mut env = TestRepo::init();
    let repo = &mut env.repo;
    let original = repo.working_copy_change().clone();
    repo.amend(None, None, Some(files(&[("a.txt", "a\n"), ("b.txt", "b\n")]))).unwrap();

    let (part1, part2) =
        repo.split(original.clone(), "part one".to_string(), "part two".to_string(), files(&[("b.txt", "b\n")])).unwrap();

    assert_eq!(part1, original);
    assert_ne!(part2, original);
    let part1_change = repo.show(&part1).unwrap();
    assert_eq!(part1_change.description, "part one");
    let part2_change = repo.show(&part2).unwrap();
    assert_eq!(part2_change.parents, vec![part1]);
}

#[test]
fn abandon_then_restore_round_trips() {
    let mut env = TestRepo::init();
    let repo = &mut env.repo;
    let a = repo.create_change(None, None).unwrap();
    repo.abandon(a.clone()).unwrap();
    assert!(repo.show(&a).unwrap().abandoned);
    repo.restore(a.clone()).unwrap();
    assert!(!repo.show(&a).unwrap().abandoned);
}
