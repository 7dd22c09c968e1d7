//! Integration tests for `CommitWalker` driven by an in-memory history.
//!
//! The fake version control writes each commit's files into a temporary
//! working tree on checkout and serves canned diffs.

use std::fs;
use std::path::{Path, PathBuf};

use git2::ErrorCode;
use histograph::{
    CommitInfo, CommitWalker, Error, FsSnapshotLocator, JavaParser, MethodKey, Result,
    VersionControl, WalkConfig, WalkerState,
};
use tempfile::TempDir;

struct FakeCommit {
    info: CommitInfo,
    files: Vec<(&'static str, &'static str)>,
    diff: &'static str,
}

struct FakeHistory {
    root: PathBuf,
    commits: Vec<FakeCommit>,
    fail_checkout_of: Option<usize>,
    checkouts: Vec<String>,
}

impl FakeHistory {
    fn new(root: &Path, commits: Vec<FakeCommit>) -> Self {
        Self {
            root: root.to_path_buf(),
            commits,
            fail_checkout_of: None,
            checkouts: Vec::new(),
        }
    }

    fn clear_tree(&self) {
        for entry in fs::read_dir(&self.root).expect("should read root") {
            let path = entry.expect("should read entry").path();
            if path.is_dir() {
                fs::remove_dir_all(&path).expect("should remove dir");
            } else {
                fs::remove_file(&path).expect("should remove file");
            }
        }
    }
}

impl VersionControl for FakeHistory {
    fn repository_root(&self) -> &Path {
        &self.root
    }

    fn list_commits(&self) -> Result<Vec<CommitInfo>> {
        Ok(self.commits.iter().map(|c| c.info.clone()).collect())
    }

    fn checkout(&mut self, commit: &CommitInfo) -> Result<()> {
        let index = self
            .commits
            .iter()
            .position(|c| c.info.id == commit.id)
            .expect("walker only checks out listed commits");
        if self.fail_checkout_of == Some(index) {
            return Err(Error::CheckoutFailed {
                commit: commit.id.clone(),
                source: git2::Error::new(
                    ErrorCode::Conflict,
                    git2::ErrorClass::Checkout,
                    "simulated conflict",
                ),
            });
        }

        self.clear_tree();
        for (path, content) in &self.commits[index].files {
            let full = self.root.join(path);
            if let Some(parent) = full.parent() {
                fs::create_dir_all(parent).expect("should create parent dirs");
            }
            fs::write(full, content).expect("should write file");
        }
        self.checkouts.push(commit.id.clone());
        Ok(())
    }

    fn diff_hunk_headers(&self, commit: &CommitInfo) -> Result<String> {
        Ok(self
            .commits
            .iter()
            .find(|c| c.info.id == commit.id)
            .map(|c| c.diff.to_string())
            .unwrap_or_default())
    }
}

const V1: &str = "package app;\n\
class App {\n\
    void run() {\n\
        start();\n\
    }\n\
    void start() {}\n\
}\n";

const V2: &str = "package app;\n\
class App {\n\
    void run() {\n\
        start();\n\
        stop();\n\
    }\n\
    void start() {}\n\
    void stop() {}\n\
}\n";

fn three_commits() -> Vec<FakeCommit> {
    vec![
        FakeCommit {
            info: CommitInfo::bare("a1"),
            files: vec![("src/app/App.java", V1)],
            diff: "diff --git a/src/app/App.java b/src/app/App.java\n\
                   new file mode 100644\n\
                   --- /dev/null\n\
                   +++ b/src/app/App.java\n\
                   @@ -0,0 +1,7 @@\n",
        },
        FakeCommit {
            info: CommitInfo::bare("b2"),
            files: vec![("src/app/App.java", V2), ("README.md", "# app")],
            diff: "diff --git a/src/app/App.java b/src/app/App.java\n\
                   --- a/src/app/App.java\n\
                   +++ b/src/app/App.java\n\
                   @@ -4,0 +5 @@\n\
                   @@ -6,0 +8 @@\n\
                   diff --git a/README.md b/README.md\n\
                   new file mode 100644\n\
                   --- /dev/null\n\
                   +++ b/README.md\n\
                   @@ -0,0 +1 @@\n",
        },
        FakeCommit {
            info: CommitInfo::bare("c3"),
            files: vec![("README.md", "# app, rewritten in another language")],
            diff: "diff --git a/src/app/App.java b/src/app/App.java\n\
                   deleted file mode 100644\n\
                   --- a/src/app/App.java\n\
                   +++ /dev/null\n\
                   @@ -1,9 +0,0 @@\n",
        },
    ]
}

fn walker(
    dir: &TempDir,
    history: FakeHistory,
) -> CommitWalker<FakeHistory, FsSnapshotLocator, JavaParser> {
    CommitWalker::new(
        history,
        FsSnapshotLocator::new(),
        JavaParser::new(dir.path()),
        &WalkConfig::default(),
    )
    .expect("walker should be created")
}

fn app(signature: &str) -> MethodKey {
    MethodKey::new("src/app/App.java", signature)
}

#[test]
fn walks_every_commit_in_order_then_exhausts() {
    let dir = TempDir::new().expect("failed to create temp dir");
    let mut walker = walker(&dir, FakeHistory::new(dir.path(), three_commits()));

    assert_eq!(walker.position(), WalkerState::NotStarted);
    assert!(walker.has_next());

    let first = walker.next_graph().expect("first step should succeed");
    assert_eq!(first.commit.id, "a1");
    assert_eq!(walker.position(), WalkerState::Positioned(0));
    assert_eq!(first.graph().commit().map(|c| c.id.as_str()), Some("a1"));
    assert_eq!(first.graph().node_count(), 2);
    assert_eq!(first.graph().edge_count(), 1);
    // A new file touches every method
    assert_eq!(
        first.graph().changed_methods(),
        vec![app("app.App.run()"), app("app.App.start()")]
    );

    let second = walker.next_graph().expect("second step should succeed");
    assert_eq!(second.commit.id, "b2");
    assert_eq!(walker.position(), WalkerState::Positioned(1));
    assert_eq!(second.graph().node_count(), 3);
    assert_eq!(second.graph().edge_count(), 2);
    assert_eq!(
        second.graph().changed_methods(),
        vec![app("app.App.run()"), app("app.App.stop()")]
    );
    assert_eq!(second.correlation.files_skipped, 1);

    let third = walker.next_graph().expect("third step should succeed");
    assert_eq!(third.commit.id, "c3");
    assert!(third.graph().is_empty());
    assert!(third.tree.snapshot.is_empty());
    assert_eq!(third.correlation.methods_marked, 0);

    assert_eq!(walker.position(), WalkerState::Exhausted);
    assert!(!walker.has_next());
    assert!(matches!(walker.next_graph(), Err(Error::ExhaustedHistory)));
}

#[test]
fn graphs_share_nothing_between_commits() {
    let dir = TempDir::new().expect("failed to create temp dir");
    let walker = walker(&dir, FakeHistory::new(dir.path(), three_commits()));

    let steps: Vec<_> = walker
        .collect::<Result<Vec<_>>>()
        .expect("every step should succeed");

    assert_eq!(steps.len(), 3);
    // The first graph is untouched by what later commits flagged
    assert!(!steps[0].graph().contains(&app("app.App.stop()")));
    assert_eq!(steps[0].graph().changed_methods().len(), 2);
    assert_eq!(steps[1].graph().commit().map(|c| c.id.as_str()), Some("b2"));
}

#[test]
fn failed_checkout_ends_the_walk() {
    let dir = TempDir::new().expect("failed to create temp dir");
    let mut history = FakeHistory::new(dir.path(), three_commits());
    history.fail_checkout_of = Some(1);
    let mut walker = walker(&dir, history);

    let results: Vec<_> = walker.by_ref().collect();

    assert_eq!(results.len(), 2);
    assert!(results[0].is_ok());
    assert!(matches!(results[1], Err(Error::CheckoutFailed { .. })));
    assert_eq!(walker.position(), WalkerState::Exhausted);
    assert!(walker.next().is_none());
    assert_eq!(walker.vcs_mut().checkouts, vec!["a1"]);
}

#[test]
fn max_commits_keeps_the_oldest() {
    let dir = TempDir::new().expect("failed to create temp dir");
    let config = WalkConfig {
        max_commits: Some(2),
        ..WalkConfig::default()
    };
    let walker = CommitWalker::new(
        FakeHistory::new(dir.path(), three_commits()),
        FsSnapshotLocator::new(),
        JavaParser::new(dir.path()),
        &config,
    )
    .expect("walker should be created");

    let ids: Vec<&str> = walker.commits().iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["a1", "b2"]);
    assert_eq!(walker.count(), 2);
}

#[test]
fn ignored_directories_are_not_analyzed() {
    let dir = TempDir::new().expect("failed to create temp dir");
    let commits = vec![FakeCommit {
        info: CommitInfo::bare("d4"),
        files: vec![
            ("src/app/App.java", V1),
            ("build/gen/Gen.java", "class Gen { void g() {} }"),
        ],
        diff: "",
    }];
    let config = WalkConfig {
        ignore_names: vec![".git".to_string(), "build".to_string()],
        ..WalkConfig::default()
    };
    let mut walker = CommitWalker::new(
        FakeHistory::new(dir.path(), commits),
        FsSnapshotLocator::new(),
        JavaParser::new(dir.path()),
        &config,
    )
    .expect("walker should be created");

    let step = walker.next_graph().expect("step should succeed");

    assert_eq!(step.tree.snapshot.source_files.len(), 1);
    assert_eq!(step.graph().node_count(), 2);
    assert!(step.graph().changed_methods().is_empty());
}
