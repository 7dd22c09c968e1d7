//! Version control access.
//!
//! The walker only needs four things from a repository: where its working
//! tree is, the ordered commit list, a way to check a commit out, and the
//! hunk headers of each commit's diff. `VersionControl` captures exactly that
//! so tests can drive the walker with an in-memory history.
//!
//! `GitRepository` implements it on top of libgit2.

use std::path::{Path, PathBuf};

use chrono::{TimeZone, Utc};
use git2::build::CheckoutBuilder;
use git2::{DiffFindOptions, DiffFormat, DiffOptions, ErrorCode, ObjectType, Oid, Repository, Sort};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::types::CommitInfo;

/// Access to a repository's history and working tree.
pub trait VersionControl {
    /// Root of the working tree that checkouts write to.
    fn repository_root(&self) -> &Path;

    /// All commits reachable from HEAD, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the history can't be read.
    fn list_commits(&self) -> Result<Vec<CommitInfo>>;

    /// Make the working tree match `commit`.
    ///
    /// # Errors
    ///
    /// Returns `Error::CheckoutFailed` if the working tree could not be updated.
    fn checkout(&mut self, commit: &CommitInfo) -> Result<()>;

    /// File and hunk headers of `commit`'s diff against its first parent.
    ///
    /// # Errors
    ///
    /// Returns an error if the commit or its trees can't be read.
    fn diff_hunk_headers(&self, commit: &CommitInfo) -> Result<String>;
}

/// Where HEAD pointed when the repository was opened.
#[derive(Debug, Clone)]
enum OriginalHead {
    Branch(String),
    Detached(Oid),
}

/// A Git repository with a working tree.
pub struct GitRepository {
    repo: Repository,
    root: PathBuf,
    original_head: Option<OriginalHead>,
}

impl std::fmt::Debug for GitRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitRepository")
            .field("root", &self.root)
            .field("original_head", &self.original_head)
            .finish_non_exhaustive()
    }
}

impl GitRepository {
    /// Open the repository containing `path`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Git` if no repository is found and `Error::Config` if
    /// the repository is bare.
    pub fn open(path: &Path) -> Result<Self> {
        let repo = Repository::discover(path)?;
        let root = repo
            .workdir()
            .map(Path::to_path_buf)
            .ok_or_else(|| Error::Config("repository has no working tree".to_string()))?;

        let original_head = match repo.head() {
            Ok(head) if head.is_branch() => head.name().map(|n| OriginalHead::Branch(n.to_string())),
            Ok(head) => head.target().map(OriginalHead::Detached),
            Err(_) => None,
        };

        debug!(root = %root.display(), head = ?original_head, "Opened repository");
        Ok(Self {
            repo,
            root,
            original_head,
        })
    }

    /// Put HEAD and the working tree back where they were when opened.
    ///
    /// # Errors
    ///
    /// Returns `Error::Git` if the original reference is gone or the
    /// checkout fails.
    pub fn restore_head(&mut self) -> Result<()> {
        let Some(head) = self.original_head.clone() else {
            return Ok(());
        };

        match &head {
            OriginalHead::Branch(name) => {
                let target = self
                    .repo
                    .find_reference(name)?
                    .peel(ObjectType::Commit)?;
                self.repo
                    .checkout_tree(&target, Some(CheckoutBuilder::new().force()))?;
                self.repo.set_head(name)?;
            }
            OriginalHead::Detached(oid) => {
                let target = self.repo.find_object(*oid, Some(ObjectType::Commit))?;
                self.repo
                    .checkout_tree(&target, Some(CheckoutBuilder::new().force()))?;
                self.repo.set_head_detached(*oid)?;
            }
        }

        info!(head = ?head, "Restored original HEAD");
        Ok(())
    }

    fn find_commit(&self, commit: &CommitInfo) -> Result<git2::Commit<'_>> {
        let oid = Oid::from_str(&commit.id)?;
        Ok(self.repo.find_commit(oid)?)
    }
}

impl VersionControl for GitRepository {
    fn repository_root(&self) -> &Path {
        &self.root
    }

    fn list_commits(&self) -> Result<Vec<CommitInfo>> {
        if let Err(e) = self.repo.head() {
            if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) {
                debug!("HEAD is unborn, history is empty");
                return Ok(Vec::new());
            }
            return Err(e.into());
        }

        let mut revwalk = self.repo.revwalk()?;
        revwalk.set_sorting(Sort::TOPOLOGICAL | Sort::REVERSE)?;
        revwalk.push_head()?;

        let mut commits = Vec::new();
        for oid in revwalk {
            let commit = self.repo.find_commit(oid?)?;
            commits.push(commit_info(&commit));
        }

        debug!(commits = commits.len(), "Listed history");
        Ok(commits)
    }

    fn checkout(&mut self, commit: &CommitInfo) -> Result<()> {
        let checkout = || -> std::result::Result<(), git2::Error> {
            let oid = Oid::from_str(&commit.id)?;
            let target = self.repo.find_object(oid, Some(ObjectType::Commit))?;
            self.repo
                .checkout_tree(&target, Some(CheckoutBuilder::new().force()))?;
            self.repo.set_head_detached(oid)
        };

        checkout().map_err(|source| Error::CheckoutFailed {
            commit: commit.id.clone(),
            source,
        })?;

        debug!(commit = %commit.short_id, "Checked out");
        Ok(())
    }

    fn diff_hunk_headers(&self, commit: &CommitInfo) -> Result<String> {
        let commit = self.find_commit(commit)?;
        let tree = commit.tree()?;
        // Root commits diff against the empty tree
        let parent_tree = commit.parent(0).ok().map(|p| p.tree()).transpose()?;

        let mut options = DiffOptions::new();
        options.context_lines(0);
        let mut diff =
            self.repo
                .diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), Some(&mut options))?;
        diff.find_similar(Some(DiffFindOptions::new().renames(true)))?;

        let mut headers = String::new();
        diff.print(DiffFormat::Patch, |_, _, line| {
            // F: file header, H: hunk header
            if matches!(line.origin(), 'F' | 'H') {
                headers.push_str(&String::from_utf8_lossy(line.content()));
            }
            true
        })?;

        Ok(headers)
    }
}

fn commit_info(commit: &git2::Commit<'_>) -> CommitInfo {
    let id = commit.id().to_string();
    let author = commit.author();
    let timestamp = Utc
        .timestamp_opt(commit.time().seconds(), 0)
        .single()
        .unwrap_or_default();

    CommitInfo {
        short_id: id.chars().take(12).collect(),
        id,
        author: String::from_utf8_lossy(author.name_bytes()).into_owned(),
        email: String::from_utf8_lossy(author.email_bytes()).into_owned(),
        summary: commit.summary().unwrap_or_default().to_string(),
        timestamp,
    }
}
