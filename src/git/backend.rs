//! The narrow set of version-control operations the fixup engine relies on.
//!
//! `Repository` implements both traits by shelling out to git. Tests substitute
//! an in-memory implementation to exercise attribution and planning without a
//! real repository.

use crate::error::GitAutofixupError;

/// Attribution of one physical line by `git blame`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlameLine {
    /// 1-indexed line number in the blamed revision
    pub line: u32,
    pub commit_sha: String,
    /// Set for root commits and commits outside the blamed range
    pub is_boundary: bool,
}

/// One path with staged changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedEntry {
    pub path: String,
    /// `A` for added, `M` for modified
    pub status: char,
}

impl StagedEntry {
    pub fn is_modified(&self) -> bool {
        self.status == 'M'
    }
}

/// Reset mode for git reset command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetMode {
    Hard,
    Soft,
    Mixed,
}

impl ResetMode {
    pub fn as_flag(&self) -> &'static str {
        match self {
            ResetMode::Hard => "--hard",
            ResetMode::Soft => "--soft",
            ResetMode::Mixed => "--mixed",
        }
    }
}

/// Outcome of starting or resuming the autosquash rebase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RebaseStatus {
    Completed,
    /// The rebase stopped with unmerged paths while replaying `current_step`
    Conflict {
        unmerged_paths: Vec<String>,
        current_step: Option<String>,
    },
    /// The rebase stopped with a clean index, e.g. a fold that would leave its target empty
    Stopped {
        current_step: Option<String>,
        reason: String,
    },
}

/// Classified result of a git invocation that may legitimately "find nothing".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitOutcome {
    Success(Vec<u8>),
    /// Exit status 1 with diagnostics on stderr
    NoMatch(String),
}

/// Read-only history queries used to attribute hunks.
pub trait HistoryBackend {
    /// Per-line attribution of `path` over the 1-indexed inclusive range `start..=end` at `rev`.
    fn blame(
        &self,
        path: &str,
        start: u32,
        end: u32,
        rev: &str,
    ) -> Result<Vec<BlameLine>, GitAutofixupError>;

    fn merge_base(&self, one: &str, two: &str) -> Result<String, GitAutofixupError>;

    /// Number of commits reachable from `rev`, including itself.
    fn rev_list_count(&self, rev: &str) -> Result<u64, GitAutofixupError>;

    /// Committer timestamp in seconds since the epoch.
    fn committer_time(&self, rev: &str) -> Result<i64, GitAutofixupError>;
}

/// The mutating operations the orchestrator drives, plus the reads it needs.
pub trait FixupBackend: HistoryBackend {
    fn rev_parse(&self, rev: &str) -> Result<String, GitAutofixupError>;

    /// Dangling commit of the working tree and index, or `None` when there is nothing to stash.
    fn stash_create(&self) -> Result<Option<String>, GitAutofixupError>;

    /// Added and modified paths in the index relative to HEAD.
    fn staged_entries(&self) -> Result<Vec<StagedEntry>, GitAutofixupError>;

    /// Paths whose working tree content differs from the index (modified or deleted).
    fn unstaged_paths(&self) -> Result<Vec<String>, GitAutofixupError>;

    /// Zero-context diff of the staged changes for `path`.
    fn diff_staged(&self, path: &str) -> Result<String, GitAutofixupError>;

    fn show_file(&self, rev: &str, path: &str) -> Result<Vec<u8>, GitAutofixupError>;

    fn show_staged(&self, path: &str) -> Result<Vec<u8>, GitAutofixupError>;

    /// File mode of `path` as recorded in the index, e.g. `100644`.
    fn staged_mode(&self, path: &str) -> Result<String, GitAutofixupError>;

    /// Working tree bytes of `path`, or `None` when the file is missing.
    fn read_worktree_file(&self, path: &str) -> Result<Option<Vec<u8>>, GitAutofixupError>;

    /// Write `path` back to the working tree, removing it when `content` is `None`.
    fn restore_worktree_file(
        &self,
        path: &str,
        content: Option<&[u8]>,
    ) -> Result<(), GitAutofixupError>;

    /// Write `content` to the object store and return its id.
    fn hash_object(&self, content: &[u8]) -> Result<String, GitAutofixupError>;

    /// Point the index entry for `path` at `oid` without touching the working tree.
    fn update_index(&self, path: &str, mode: &str, oid: &str) -> Result<(), GitAutofixupError>;

    /// Commit the whole index with `message`, returning the new commit id.
    fn commit(&self, message: &str) -> Result<String, GitAutofixupError>;

    /// Commit the index as `fixup! <target>`, returning the new commit id.
    fn commit_fixup(&self, target: &str) -> Result<String, GitAutofixupError>;

    fn reset(&self, rev: &str, mode: ResetMode) -> Result<(), GitAutofixupError>;

    /// Interactive autosquash, autostash rebase of everything after `onto`.
    fn rebase_autosquash(&self, onto: &str) -> Result<RebaseStatus, GitAutofixupError>;

    /// Skip the conflicted step and continue the rebase in progress.
    fn rebase_skip(&self) -> Result<RebaseStatus, GitAutofixupError>;

    /// Continue a rebase stopped on a step whose commit would end up empty, keeping it.
    fn rebase_continue_allow_empty(&self) -> Result<RebaseStatus, GitAutofixupError>;

    /// Apply the change of `rev` to the index and working tree without committing.
    /// Returns `false` when the change did not apply cleanly.
    fn cherry_pick_no_commit(&self, rev: &str) -> Result<bool, GitAutofixupError>;
}
