//! End-to-end conversion tests through the library API.
//!
//! Each test builds real local git repositories (a meta-repo plus
//! submodules), runs the full pipeline, and checks the produced monorepo
//! with git itself: branch sets, tree object ids under each target path,
//! nested submodule gitlinks, and the migration report's records.

mod common;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use common::{branch_names, git_out, show_blob, tree_oid, GitFixture};
use monomaker::error::Error;
use monomaker::git::GitDriver;
use monomaker::phases::orchestrator::{execute_convert, ConvertOptions, RunSummary};
use monomaker::phases::Cancellation;
use monomaker::report::{MigrationReport, Outcome};
use monomaker::workspace::Workspace;

struct Converted {
    monorepo: PathBuf,
    report: MigrationReport,
    summary: RunSummary,
}

fn convert_with(
    fixture: &GitFixture,
    meta: &Path,
    whitelist: Option<BTreeSet<String>>,
    flatten_merges: bool,
) -> Result<Converted, Error> {
    let workspace = Workspace::prepare(&fixture.workspace_dir(), None)?;
    let driver = GitDriver::new();
    let mut report = MigrationReport::new();
    let options = ConvertOptions {
        meta_path: meta.to_path_buf(),
        workers: 2,
        whitelist,
        flatten_merges,
    };
    let summary = execute_convert(
        &driver,
        &workspace,
        &options,
        &mut report,
        &Cancellation::new(),
        &mut |_, _, _| {},
    )?;
    Ok(Converted {
        monorepo: workspace.monorepo_dir(),
        report,
        summary,
    })
}

fn convert(fixture: &GitFixture, meta: &Path) -> Converted {
    convert_with(fixture, meta, None, false).expect("conversion succeeds")
}

/// Meta-repo with submodules `a` (default main) and `b` (default dev).
fn basic_fixture() -> (GitFixture, PathBuf, PathBuf, PathBuf) {
    let fixture = GitFixture::new();

    let a = fixture.init_repo("a", "main");
    fixture.commit_file(&a, "a.txt", "content of a\n", "Add a.txt");

    let b = fixture.init_repo("b", "dev");
    fixture.commit_file(&b, "b.txt", "content of b\n", "Add b.txt");

    let meta = fixture.init_repo("meta", "main");
    fixture.commit_file(&meta, "README.md", "meta readme\n", "Add README");
    fixture.add_submodule(&meta, &a, "a");
    fixture.add_submodule(&meta, &b, "b");

    (fixture, meta, a, b)
}

fn whitelist(names: &[&str]) -> Option<BTreeSet<String>> {
    Some(names.iter().map(|s| s.to_string()).collect())
}

#[test]
fn test_only_defaults_materializes_both_default_branches() {
    let (fixture, meta, a, b) = basic_fixture();
    let converted = convert(&fixture, &meta);

    assert_eq!(branch_names(&converted.monorepo), vec!["dev", "main"]);
    assert_eq!(converted.summary.synthesized, 2);
    assert_eq!(converted.summary.failed, 0);

    for branch in ["main", "dev"] {
        assert_eq!(
            tree_oid(&converted.monorepo, &format!("{branch}:a")),
            tree_oid(&a, "main^{tree}"),
            "a/ tree on {branch} must equal a@main"
        );
        assert_eq!(
            tree_oid(&converted.monorepo, &format!("{branch}:b")),
            tree_oid(&b, "dev^{tree}"),
            "b/ tree on {branch} must equal b@dev"
        );
        assert_eq!(
            show_blob(&converted.monorepo, &format!("{branch}:README.md")),
            "meta readme\n"
        );
    }

    // Exactly one resolution per effective branch, in synthesis order.
    let resolved: Vec<&str> = converted
        .report
        .resolutions()
        .iter()
        .map(|resolved| resolved.branch.as_str())
        .collect();
    assert_eq!(resolved, vec!["main", "dev"]);

    // No failed-branch scratch refs on a clean run.
    let failed = git_out(
        &converted.monorepo,
        &["for-each-ref", "--format=%(refname)", "refs/monomaker/failed"],
    );
    assert!(failed.trim().is_empty());
}

#[test]
fn test_partial_feature_branch_falls_back_elsewhere() {
    let (fixture, meta, a, b) = basic_fixture();
    fixture.checkout_new(&a, "feat-x");
    fixture.commit_file(&a, "feature.txt", "feature work\n", "Add feature.txt");
    fixture.checkout(&a, "main");

    let converted = convert(&fixture, &meta);

    assert_eq!(branch_names(&converted.monorepo), vec!["dev", "feat-x", "main"]);
    assert_eq!(
        tree_oid(&converted.monorepo, "feat-x:a"),
        tree_oid(&a, "feat-x^{tree}")
    );
    assert_eq!(
        tree_oid(&converted.monorepo, "feat-x:b"),
        tree_oid(&b, "dev^{tree}")
    );
    assert_eq!(
        show_blob(&converted.monorepo, "feat-x:README.md"),
        "meta readme\n"
    );

    let resolution = converted
        .report
        .resolutions()
        .iter()
        .find(|resolved| resolved.branch == "feat-x")
        .expect("feat-x resolved");
    let entry = |repo: &str| {
        resolution
            .plan
            .iter()
            .find(|entry| entry.repo == repo)
            .unwrap_or_else(|| panic!("entry for {repo}"))
    };
    assert!(entry("meta").fell_back);
    assert!(!entry("a").fell_back);
    assert_eq!(entry("a").branch_used, "feat-x");
    assert!(entry("b").fell_back);
    assert_eq!(entry("b").branch_used, "dev");
}

#[test]
fn test_whitelist_filters_other_features_without_skip_records() {
    let (fixture, meta, a, b) = basic_fixture();
    fixture.checkout_new(&a, "feat-x");
    fixture.commit_file(&a, "x.txt", "x\n", "Add x");
    fixture.checkout(&a, "main");
    fixture.checkout_new(&b, "feat-y");
    fixture.commit_file(&b, "y.txt", "y\n", "Add y");
    fixture.checkout(&b, "dev");

    let converted =
        convert_with(&fixture, &meta, whitelist(&["feat-x"]), false).expect("conversion succeeds");

    assert_eq!(branch_names(&converted.monorepo), vec!["dev", "feat-x", "main"]);
    // feat-y simply is not in the effective set: no skip record for it.
    assert!(converted
        .report
        .outcomes()
        .iter()
        .all(|outcome| !matches!(outcome, Outcome::Skip { branch, .. } if branch == "feat-y")));

    let applied = converted.report.whitelist().expect("whitelist recorded");
    assert_eq!(applied.requested, vec!["feat-x"]);
    assert_eq!(applied.effective, vec!["main", "dev", "feat-x"]);
}

#[test]
fn test_whitelist_unknown_branch_is_skipped_not_dropped() {
    let (fixture, meta, _a, _b) = basic_fixture();

    let converted =
        convert_with(&fixture, &meta, whitelist(&["ghost"]), false).expect("conversion succeeds");

    assert_eq!(branch_names(&converted.monorepo), vec!["dev", "main"]);
    assert_eq!(converted.summary.skipped, 1);
    assert!(converted.report.outcomes().iter().any(|outcome| matches!(
        outcome,
        Outcome::Skip { branch, reason }
            if branch == "ghost" && reason == "unknown-branch"
    )));
}

#[test]
fn test_nested_submodule_preserved_verbatim() {
    let fixture = GitFixture::new();

    let lib = fixture.init_repo("lib", "main");
    fixture.commit_file(&lib, "lib.txt", "library\n", "Add lib.txt");
    let pinned = fixture.current_sha(&lib);

    let a = fixture.init_repo("a", "main");
    fixture.commit_file(&a, "a.txt", "a\n", "Add a.txt");
    fixture.add_submodule(&a, &lib, "vendor/lib");

    let meta = fixture.init_repo("meta", "main");
    fixture.commit_file(&meta, "README.md", "meta readme\n", "Add README");
    fixture.add_submodule(&meta, &a, "a");

    let converted = convert(&fixture, &meta);

    let entry = git_out(&converted.monorepo, &["ls-tree", "main", "a/vendor/lib"]);
    assert!(
        entry.starts_with(&format!("160000 commit {pinned}")),
        "expected gitlink pinned to {pinned}, got: {entry}"
    );

    let gitmodules = show_blob(&converted.monorepo, "main:.gitmodules");
    assert!(gitmodules.contains("a/vendor/lib"));

    // The discovery record carries the nested submodule verbatim.
    let repo_a = converted
        .report
        .repos()
        .iter()
        .find(|repo| repo.name == "a")
        .expect("repo a discovered");
    assert_eq!(repo_a.nested_submodules.len(), 1);
    assert_eq!(repo_a.nested_submodules[0].path, "vendor/lib");
    assert_eq!(repo_a.nested_submodules[0].sha, pinned);
}

#[test]
fn test_shared_readme_lives_at_both_paths() {
    let (fixture, meta, a, _b) = basic_fixture();
    fixture.commit_file(&a, "README.md", "a readme\n", "Add a README");

    let converted = convert(&fixture, &meta);

    assert_eq!(
        show_blob(&converted.monorepo, "main:README.md"),
        "meta readme\n"
    );
    assert_eq!(
        show_blob(&converted.monorepo, "main:a/README.md"),
        "a readme\n"
    );
    assert_eq!(converted.summary.failed, 0);
}

#[test]
fn test_meta_blob_under_submodule_root_is_overridden() {
    let fixture = GitFixture::new();

    let a = fixture.init_repo("a", "main");
    fixture.commit_file(&a, "a.txt", "content of a\n", "Add a.txt");

    // The meta-repo tracks a stale blob at the path where submodule `a`
    // is mounted. `git submodule add` refuses such a layout, so the
    // submodule is declared by writing .gitmodules directly — which is
    // exactly the stale-meta shape discovery has to tolerate.
    let meta = fixture.init_repo("meta", "main");
    fixture.commit_file(&meta, "README.md", "meta readme\n", "Add README");
    fixture.commit_file(&meta, "a/leftover.txt", "stale\n", "Track a/leftover.txt");
    let gitmodules = format!("[submodule \"a\"]\n\tpath = a\n\turl = {}\n", a.display());
    fixture.commit_file(&meta, ".gitmodules", &gitmodules, "Declare submodule a");

    let converted = convert(&fixture, &meta);
    assert_eq!(converted.summary.failed, 0);

    // The submodule content wins the mount path wholesale.
    assert_eq!(
        tree_oid(&converted.monorepo, "main:a"),
        tree_oid(&a, "main^{tree}")
    );
    let files = git_out(&converted.monorepo, &["ls-tree", "-r", "--name-only", "main"]);
    assert!(!files.lines().any(|line| line == "a/leftover.txt"));
    assert_eq!(
        show_blob(&converted.monorepo, "main:README.md"),
        "meta readme\n"
    );

    // The dropped blob is reported as an override, not a failure.
    assert!(converted.report.outcomes().iter().any(|outcome| matches!(
        outcome,
        Outcome::PathOverride { branch, path }
            if branch == "main" && path == "a/leftover.txt"
    )));
}

#[test]
fn test_meta_feature_branch_wins_the_root() {
    let (fixture, meta, _a, _b) = basic_fixture();
    fixture.checkout_new(&meta, "feat-meta");
    fixture.commit_file(&meta, "NOTES.md", "feature notes\n", "Add NOTES");
    fixture.checkout(&meta, "main");

    let converted = convert(&fixture, &meta);

    assert!(branch_names(&converted.monorepo).contains(&"feat-meta".to_string()));
    assert_eq!(
        show_blob(&converted.monorepo, "feat-meta:NOTES.md"),
        "feature notes\n"
    );
    // main has no NOTES.md.
    let listing = git_out(&converted.monorepo, &["ls-tree", "--name-only", "main"]);
    assert!(!listing.lines().any(|line| line == "NOTES.md"));
}

#[test]
fn test_meta_merge_topology_is_reproduced() {
    let (fixture, meta, _a, _b) = basic_fixture();

    fixture.checkout_new(&meta, "feat-m");
    fixture.commit_file(&meta, "feat.txt", "feature\n", "Add feat.txt");
    fixture.checkout(&meta, "main");
    fixture.checkout_new(&meta, "topic");
    fixture.commit_file(&meta, "topic.txt", "topic\n", "Add topic.txt");
    let topic_sha = fixture.current_sha(&meta);
    fixture.checkout(&meta, "feat-m");
    fixture.merge_no_ff(&meta, "topic", "Merge topic into feat-m");
    let meta_tip = fixture.current_sha(&meta);
    fixture.checkout(&meta, "main");

    let converted = convert(&fixture, &meta);

    // Tip content is exact.
    assert_eq!(show_blob(&converted.monorepo, "feat-m:feat.txt"), "feature\n");
    assert_eq!(show_blob(&converted.monorepo, "feat-m:topic.txt"), "topic\n");

    // The meta branch history is embedded.
    let history = git_out(&converted.monorepo, &["rev-list", "feat-m"]);
    assert!(history.lines().any(|sha| sha == meta_tip));
    assert!(history.lines().any(|sha| sha == topic_sha));

    // Besides the meta-repo's own merge commit, a replica merge carries
    // the topic head as second parent.
    let with_topic_parent = commits_with_second_parent(&converted.monorepo, "feat-m", &topic_sha);
    assert_eq!(
        with_topic_parent, 2,
        "expected the original merge plus one replica"
    );
}

#[test]
fn test_repeated_topic_merge_is_recorded_without_content() {
    let (fixture, meta, _a, _b) = basic_fixture();

    // The same topic head is merged into two divergent lines which are
    // then joined, so during replay the second merge's side parent is
    // already reachable from HEAD and must be recorded with a
    // content-free merge commit rather than another graft.
    fixture.checkout_new(&meta, "topic");
    fixture.commit_file(&meta, "topic.txt", "topic\n", "Add topic.txt");
    let topic_sha = fixture.current_sha(&meta);
    fixture.checkout(&meta, "main");
    fixture.checkout_new(&meta, "line-p");
    fixture.commit_file(&meta, "p.txt", "p\n", "Add p.txt");
    fixture.merge_no_ff(&meta, "topic", "Merge topic into line-p");
    fixture.checkout(&meta, "main");
    fixture.checkout_new(&meta, "line-q");
    fixture.commit_file(&meta, "q.txt", "q\n", "Add q.txt");
    fixture.merge_no_ff(&meta, "topic", "Merge topic into line-q");
    fixture.checkout(&meta, "line-p");
    fixture.checkout_new(&meta, "feat-m");
    fixture.merge_no_ff(&meta, "line-q", "Merge line-q into feat-m");
    fixture.checkout(&meta, "main");

    let converted = convert(&fixture, &meta);
    assert_eq!(converted.summary.failed, 0);

    // Tip content is exact.
    assert_eq!(show_blob(&converted.monorepo, "feat-m:topic.txt"), "topic\n");
    assert_eq!(show_blob(&converted.monorepo, "feat-m:p.txt"), "p\n");
    assert_eq!(show_blob(&converted.monorepo, "feat-m:q.txt"), "q\n");

    // Four commits carry the topic head as second parent: the meta-repo's
    // own two merges (embedded history), the replay graft for whichever
    // merge is processed first, and the content-free record for the
    // second.
    assert_eq!(
        commits_with_second_parent(&converted.monorepo, "feat-m", &topic_sha),
        4
    );

    // Exactly one of them keeps its first parent's tree: the replayed
    // merge record, with parents (HEAD, topic).
    assert_eq!(
        content_free_merges_with_second_parent(&converted.monorepo, "feat-m", &topic_sha),
        1
    );
}

#[test]
fn test_flatten_merges_skips_topology_replicas() {
    let (fixture, meta, _a, _b) = basic_fixture();

    fixture.checkout_new(&meta, "feat-m");
    fixture.commit_file(&meta, "feat.txt", "feature\n", "Add feat.txt");
    fixture.checkout(&meta, "main");
    fixture.checkout_new(&meta, "topic");
    fixture.commit_file(&meta, "topic.txt", "topic\n", "Add topic.txt");
    let topic_sha = fixture.current_sha(&meta);
    fixture.checkout(&meta, "feat-m");
    fixture.merge_no_ff(&meta, "topic", "Merge topic into feat-m");
    fixture.checkout(&meta, "main");

    let converted =
        convert_with(&fixture, &meta, None, true).expect("conversion succeeds");

    assert_eq!(show_blob(&converted.monorepo, "feat-m:topic.txt"), "topic\n");
    // Only the meta-repo's own merge commit references the topic head.
    let with_topic_parent = commits_with_second_parent(&converted.monorepo, "feat-m", &topic_sha);
    assert_eq!(with_topic_parent, 1);
}

#[test]
fn test_missing_default_branch_is_fatal_before_synthesis() {
    let fixture = GitFixture::new();

    let a = fixture.init_repo("a", "main");
    fixture.commit_file(&a, "a.txt", "a\n", "Add a.txt");

    let meta = fixture.init_repo("meta", "main");
    fixture.commit_file(&meta, "README.md", "meta readme\n", "Add README");
    fixture.add_submodule(&meta, &a, "a");

    // Point a's HEAD at an unborn branch so its remote designates no
    // default.
    common::git(&a, &["symbolic-ref", "HEAD", "refs/heads/unborn"]);

    let result = convert_with(&fixture, &meta, None, false);
    assert!(matches!(result, Err(Error::NoDefaultBranch { .. })));

    // The report was still written.
    assert!(fixture.workspace_dir().join("report.json").exists());
}

#[test]
fn test_cancellation_before_work_exits_cleanly() {
    let (fixture, meta, _a, _b) = basic_fixture();

    let workspace = Workspace::prepare(&fixture.workspace_dir(), None).unwrap();
    let driver = GitDriver::new();
    let mut report = MigrationReport::new();
    let cancel = Cancellation::new();
    cancel.cancel();

    let result = execute_convert(
        &driver,
        &workspace,
        &ConvertOptions {
            meta_path: meta.clone(),
            workers: 2,
            whitelist: None,
            flatten_merges: false,
        },
        &mut report,
        &cancel,
        &mut |_, _, _| {},
    );
    assert!(matches!(result, Err(Error::Cancelled)));
    assert!(workspace.report_path().exists());
}

/// Count commits in `branch` whose second parent is `parent_sha`.
fn commits_with_second_parent(repo: &Path, branch: &str, parent_sha: &str) -> usize {
    git_out(repo, &["rev-list", "--parents", branch])
        .lines()
        .filter(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            fields.len() >= 3 && fields[2] == parent_sha
        })
        .count()
}

/// Count commits in `branch` whose second parent is `parent_sha` and whose
/// tree equals the first parent's tree (a merge recorded without content).
fn content_free_merges_with_second_parent(repo: &Path, branch: &str, parent_sha: &str) -> usize {
    git_out(repo, &["rev-list", "--parents", branch])
        .lines()
        .filter(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 3 || fields[2] != parent_sha {
                return false;
            }
            tree_oid(repo, &format!("{}^{{tree}}", fields[0]))
                == tree_oid(repo, &format!("{}^{{tree}}", fields[1]))
        })
        .count()
}
