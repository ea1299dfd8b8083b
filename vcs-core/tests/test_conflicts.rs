//! First-class conflict detection and resolution exercised through
//! [`vcs_core::RepositoryCore`].

use std::collections::BTreeMap;

use vcs_core::conflicts::Resolution;
use vcs_core::conflicts::ResolveSide;
use vcs_core_testutils::TestRepo;

fn files(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs.iter().map(|(path, content)| (path.to_string(), content.to_string())).collect()
}

fn setup_conflicting_merge(env: &mut TestRepo<'_>) -> (vcs_core::object_id::ChangeId, vcs_core::repo::MergeReport) {
    let repo = &mut env.repo;
    repo.amend(None, None, Some(files(&[("f.txt", "base\n")]))).unwrap();
    let base = repo.working_copy_change().clone();

    let left = repo.create_change(Some("left".to_string()), Some(vec![base.clone()])).unwrap();
    repo.amend(Some(left.clone()), None, Some(files(&[("f.txt", "left\n")]))).unwrap();

    let right = repo.create_change(Some("right".to_string()), Some(vec![base])).unwrap();
    repo.edit(right).unwrap();
    repo.amend(None, None, Some(files(&[("f.txt", "right\n")]))).unwrap();

    let report = repo.merge(left, false).unwrap();
    (report.result_change_id.clone().unwrap(), report)
}

#[test]
fn merge_with_no_divergence_produces_no_conflicts() {
    let mut env = TestRepo::init();
    let repo = &mut env.repo;
    repo.amend(None, None, Some(files(&[("f.txt", "base\n")]))).unwrap();
    let base = repo.working_copy_change().clone();
    let other = repo.create_change(Some("other".to_string()), Some(vec![base])).unwrap();

    let report = repo.merge(other, false).unwrap();
    assert!(report.conflicts.is_empty());
}

#[test]
fn diverging_edits_produce_exactly_one_conflict() {
    let mut env = TestRepo::init();
    let (_merge_change, report) = setup_conflicting_merge(&mut env);
    assert_eq!(report.conflicts.len(), 1);
}

#[test]
fn dry_run_merge_detects_conflicts_without_mutating_state() {
    let mut env = TestRepo::init();
    let repo = &mut env.repo;
    repo.amend(None, None, Some(files(&[("f.txt", "base\n")]))).unwrap();
    let base = repo.working_copy_change().clone();
    let left = repo.create_change(Some("left".to_string()), Some(vec![base.clone()])).unwrap();
    repo.amend(Some(left.clone()), None, Some(files(&[("f.txt", "left\n")]))).unwrap();
    let right = repo.create_change(Some("right".to_string()), Some(vec![base])).unwrap();
    repo.edit(right).unwrap();
    repo.amend(None, None, Some(files(&[("f.txt", "right\n")]))).unwrap();
    let before = repo.operations_log().len();

    let dry = repo.merge(left, true).unwrap();

    assert!(!dry.conflicts.is_empty());
    assert!(dry.result_change_id.is_none());
    assert_eq!(repo.operations_log().len(), before);
    assert!(repo.conflicts().unresolved().next().is_none());
}

#[test]
fn resolve_conflict_with_ours_clears_it() {
    let mut env = TestRepo::init();
    let (_merge_change, report) = setup_conflicting_merge(&mut env);
    let conflict_id = report.conflicts[0].clone();

    repo_resolve(&mut env, &conflict_id);

    assert!(env.repo.conflicts().get(&conflict_id).unwrap().resolved);
    assert!(env.repo.conflicts().unresolved().next().is_none());
}

fn repo_resolve(env: &mut TestRepo<'_>, conflict_id: &vcs_core::conflicts::ConflictId) {
    env.repo.resolve_conflict(conflict_id, Resolution::Side { side: ResolveSide::Ours }).unwrap();
}
