//! End-to-end walks over real Git repositories.

use std::fs;
use std::path::Path;

use git2::{Repository, Signature};
use histograph::{CommitWalker, GitRepository, MethodKey, VersionControl, WalkConfig};
use tempfile::TempDir;

const CART_V1: &str = "\
package shop;

public class Cart {
    private int items;

    public void add(int count) {
        items += count;
    }

    public int total() {
        return items;
    }
}
";

const CART_V2: &str = "\
package shop;

public class Cart {
    private int items;

    public void add(int count) {
        items += count;
    }

    public int total() {
        return items * 2;
    }
}
";

const CHECKOUT: &str = "\
package shop;

public class Checkout {
    public int pay(Cart cart) {
        return cart.total();
    }
}
";

/// Write `files` into the working tree and commit them on HEAD.
fn commit(repo: &Repository, files: &[(&str, &str)], message: &str) {
    let root = repo.workdir().expect("repository has a working tree");
    let mut index = repo.index().expect("should open index");
    for (path, content) in files {
        let full = root.join(path);
        fs::create_dir_all(full.parent().expect("file has a parent")).expect("should create dirs");
        fs::write(&full, content).expect("should write file");
        index.add_path(Path::new(path)).expect("should stage file");
    }
    index.write().expect("should write index");
    let tree = repo
        .find_tree(index.write_tree().expect("should write tree"))
        .expect("tree exists");

    let sig = Signature::now("Test User", "test@example.com").expect("valid signature");
    let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
    let parents: Vec<_> = parent.iter().collect();
    repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
        .expect("should commit");
}

fn shop_repo() -> (TempDir, Repository) {
    let dir = TempDir::new().expect("failed to create temp dir");
    let repo = Repository::init(dir.path()).expect("failed to init repository");
    commit(&repo, &[("src/main/java/shop/Cart.java", CART_V1)], "Add cart");
    commit(&repo, &[("src/main/java/shop/Cart.java", CART_V2)], "Double totals");
    commit(&repo, &[("src/main/java/shop/Checkout.java", CHECKOUT)], "Add checkout");
    (dir, repo)
}

fn cart(signature: &str) -> MethodKey {
    MethodKey::new("src/main/java/shop/Cart.java", signature)
}

fn checkout(signature: &str) -> MethodKey {
    MethodKey::new("src/main/java/shop/Checkout.java", signature)
}

#[test]
fn lists_history_oldest_first() {
    let (dir, _repo) = shop_repo();

    let repository = GitRepository::open(dir.path()).expect("open should succeed");
    let commits = repository.list_commits().expect("listing should succeed");

    let summaries: Vec<&str> = commits.iter().map(|c| c.summary.as_str()).collect();
    assert_eq!(summaries, vec!["Add cart", "Double totals", "Add checkout"]);
    assert!(commits.iter().all(|c| c.author == "Test User" && c.short_id.len() == 12));
}

#[test]
fn walk_flags_the_methods_each_commit_touched() {
    let (dir, _repo) = shop_repo();
    let mut walker =
        CommitWalker::open(dir.path(), &WalkConfig::default()).expect("walker should open");

    let first = walker.next_graph().expect("first step should succeed");
    assert_eq!(first.commit.summary, "Add cart");
    assert_eq!(
        first.graph().changed_methods(),
        vec![cart("shop.Cart.add(int)"), cart("shop.Cart.total()")]
    );
    assert_eq!(first.tree.snapshot.source_roots.len(), 1);

    let second = walker.next_graph().expect("second step should succeed");
    assert_eq!(second.graph().changed_methods(), vec![cart("shop.Cart.total()")]);
    assert_eq!(second.correlation.ranges_applied, 1);

    let third = walker.next_graph().expect("third step should succeed");
    assert_eq!(third.graph().node_count(), 3);
    assert_eq!(third.graph().changed_methods(), vec![checkout("shop.Checkout.pay(Cart)")]);
    assert!(third.graph().edges().iter().any(|e| {
        e.caller == checkout("shop.Checkout.pay(Cart)") && e.callee == cart("shop.Cart.total()")
    }));

    assert!(!walker.has_next());
}

#[test]
fn checkouts_rewind_the_working_tree_and_restore_puts_it_back() {
    let (dir, repo) = shop_repo();
    let checkout_file = dir.path().join("src/main/java/shop/Checkout.java");
    let mut walker =
        CommitWalker::open(dir.path(), &WalkConfig::default()).expect("walker should open");

    let first = walker.next_graph().expect("first step should succeed");
    assert_eq!(first.tree.snapshot.source_files.len(), 1);
    assert!(!checkout_file.exists());
    assert!(repo.head_detached().expect("head is readable"));

    walker.vcs_mut().restore_head().expect("restore should succeed");

    assert!(checkout_file.exists());
    assert!(!repo.head_detached().expect("head is readable"));
}

#[test]
fn commit_limit_stops_early() {
    let (dir, _repo) = shop_repo();
    let config = WalkConfig {
        max_commits: Some(1),
        ..WalkConfig::default()
    };

    let steps: Vec<_> = CommitWalker::open(dir.path(), &config)
        .expect("walker should open")
        .collect();

    assert_eq!(steps.len(), 1);
    assert!(steps[0].is_ok());
}

#[test]
fn non_ascii_file_names_are_correlated_under_their_real_path() {
    let dir = TempDir::new().expect("failed to create temp dir");
    let repo = Repository::init(dir.path()).expect("failed to init repository");
    commit(
        &repo,
        &[(
            "Café.java",
            "class Cafe {\n    void a() {\n        int x = 1;\n        x++;\n    }\n\n    void b() {}\n}\n",
        )],
        "Open the cafe",
    );
    commit(
        &repo,
        &[(
            "Café.java",
            "class Cafe {\n    void a() {\n        int x = 1;\n        x++;\n        x--;\n    }\n\n    void b() {}\n}\n",
        )],
        "Serve one less",
    );
    let mut walker =
        CommitWalker::open(dir.path(), &WalkConfig::default()).expect("walker should open");

    walker.next_graph().expect("first step should succeed");
    let second = walker.next_graph().expect("second step should succeed");

    assert_eq!(second.correlation.files_considered, 1);
    assert_eq!(second.correlation.files_skipped, 0);
    assert_eq!(
        second.graph().changed_methods(),
        vec![MethodKey::new("Café.java", "Cafe.a()")]
    );
}
