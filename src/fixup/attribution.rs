use std::fmt;

use crate::config::InsertCheck;
use crate::error::GitAutofixupError;
use crate::fixup::transformation::Transformation;
use crate::git::backend::HistoryBackend;
use crate::utils::{debug_log, short_sha};

/// Why a hunk stays staged instead of becoming a fixup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unattributable {
    /// Insertion at the top of the file with nothing above it to ask about
    NoLineAbove,
    /// The blamed range lies past the end of the last committed file
    NoLinesInRange,
    /// A touched line comes from a root commit, which is never rewritten
    RootCommit(String),
    /// The touched lines come from more than one commit
    Ambiguous(Vec<String>),
    /// The only candidate is at or before the rebase limit
    NotPastRebaseLimit(String),
}

impl fmt::Display for Unattributable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unattributable::NoLineAbove => write!(f, "no line above the insertion"),
            Unattributable::NoLinesInRange => write!(f, "no committed lines around the change"),
            Unattributable::RootCommit(sha) => {
                write!(f, "touches root commit {}", short_sha(sha))
            }
            Unattributable::Ambiguous(shas) => write!(
                f,
                "spans {} commits ({})",
                shas.len(),
                shas.iter().map(|s| short_sha(s)).collect::<Vec<_>>().join(", ")
            ),
            Unattributable::NotPastRebaseLimit(sha) => {
                write!(f, "commit {} is not past the rebase limit", short_sha(sha))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attribution {
    Commit(String),
    Unattributable(Unattributable),
}

/// Finds the single commit a transformation should be folded into.
pub struct AttributionResolver<'a, B: HistoryBackend + ?Sized> {
    backend: &'a B,
    /// Revision whose content the transformations were computed against
    blame_rev: &'a str,
    /// Merge-base of the configured limit and HEAD; it and its ancestors are off limits
    rebase_limit_ref: &'a str,
    insert_checks: InsertCheck,
}

impl<'a, B: HistoryBackend + ?Sized> AttributionResolver<'a, B> {
    pub fn new(
        backend: &'a B,
        blame_rev: &'a str,
        rebase_limit_ref: &'a str,
        insert_checks: InsertCheck,
    ) -> Self {
        AttributionResolver {
            backend,
            blame_rev,
            rebase_limit_ref,
            insert_checks,
        }
    }

    /// Resolve `transformation` against a committed file of `committed_line_count` lines.
    pub fn resolve(
        &self,
        transformation: &Transformation,
        committed_line_count: usize,
    ) -> Result<Attribution, GitAutofixupError> {
        let attribution = self.resolve_inner(transformation, committed_line_count)?;
        match &attribution {
            Attribution::Commit(sha) => debug_log(&format!(
                "{}:{} (+{}) -> fixup {}",
                transformation.path,
                transformation.from_first_line,
                transformation.from_line_count,
                short_sha(sha)
            )),
            Attribution::Unattributable(reason) => debug_log(&format!(
                "{}:{} (+{}) left staged: {}",
                transformation.path,
                transformation.from_first_line,
                transformation.from_line_count,
                reason
            )),
        }
        Ok(attribution)
    }

    fn resolve_inner(
        &self,
        transformation: &Transformation,
        committed_line_count: usize,
    ) -> Result<Attribution, GitAutofixupError> {
        let Some((start, end)) = transformation.lines_for_attribution(self.insert_checks) else {
            return Ok(Attribution::Unattributable(Unattributable::NoLineAbove));
        };

        // Blame cannot look past the end of the committed file
        let end = end.min(committed_line_count as u32);
        if start > end {
            return Ok(Attribution::Unattributable(Unattributable::NoLinesInRange));
        }

        let blame = self
            .backend
            .blame(&transformation.path, start, end, self.blame_rev)?;

        if let Some(root) = blame.iter().find(|line| line.is_boundary) {
            return Ok(Attribution::Unattributable(Unattributable::RootCommit(
                root.commit_sha.clone(),
            )));
        }

        let mut commits: Vec<String> = Vec::new();
        for line in &blame {
            if !commits.contains(&line.commit_sha) {
                commits.push(line.commit_sha.clone());
            }
        }

        let candidate = if self.insert_checks == InsertCheck::Recent {
            match self.most_recent(&commits)? {
                Some(sha) => sha,
                None => return Ok(Attribution::Unattributable(Unattributable::NoLinesInRange)),
            }
        } else {
            match commits.len() {
                0 => return Ok(Attribution::Unattributable(Unattributable::NoLinesInRange)),
                1 => commits.remove(0),
                _ => return Ok(Attribution::Unattributable(Unattributable::Ambiguous(commits))),
            }
        };

        if !self.is_past_rebase_limit(&candidate)? {
            return Ok(Attribution::Unattributable(
                Unattributable::NotPastRebaseLimit(candidate),
            ));
        }

        Ok(Attribution::Commit(candidate))
    }

    /// Most recent commit approximated by ancestor count, then committer time,
    /// then commit id so the choice never depends on blame order.
    fn most_recent(&self, commits: &[String]) -> Result<Option<String>, GitAutofixupError> {
        let mut best: Option<(u64, i64, &String)> = None;
        for sha in commits {
            let key = (
                self.backend.rev_list_count(sha)?,
                self.backend.committer_time(sha)?,
                sha,
            );
            if best.as_ref().is_none_or(|current| key > *current) {
                best = Some(key);
            }
        }
        Ok(best.map(|(_, _, sha)| sha.clone()))
    }

    /// True when `sha` is a strict descendant of the rebase limit.
    fn is_past_rebase_limit(&self, sha: &str) -> Result<bool, GitAutofixupError> {
        if sha == self.rebase_limit_ref {
            return Ok(false);
        }
        let base = self.backend.merge_base(sha, self.rebase_limit_ref)?;
        Ok(base == self.rebase_limit_ref)
    }
}
