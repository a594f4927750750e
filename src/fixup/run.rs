use std::io::Write;

use crate::config::AutofixupOptions;
use crate::error::GitAutofixupError;
use crate::fixup::attribution::AttributionResolver;
use crate::fixup::planner::{FixupPlanner, StagedFile};
use crate::git::backend::{FixupBackend, RebaseStatus, ResetMode};
use crate::utils::{debug_log, short_sha};

const SNAPSHOT_COMMIT_MESSAGE: &str = "git-autofixup: staged snapshot";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    Captured,
    StagedSnapshotted,
    Reset,
    FixupsGenerated,
    Rewriting,
    ConflictLoop,
    Recovered,
    Done,
}

/// Everything one run needs to remember between steps.
#[derive(Debug)]
pub struct RunState {
    pub phase: RunPhase,
    pub initial_head: String,
    /// merge-base of the configured limit and HEAD
    pub rebase_limit_ref: String,
    /// Dangling commit of the index and working tree, for the undo line
    pub stash_ref: Option<String>,
    pub staged_files: Vec<StagedFile>,
    /// Working tree bytes of files with unstaged edits, `None` for deleted files
    pub worktree_copies: Vec<(String, Option<Vec<u8>>)>,
    pub snapshot_commit: Option<String>,
    pub fixup_commits: Vec<String>,
    pub failed_fixups: Vec<String>,
    pub unattributed_hunks: usize,
}

impl RunState {
    fn new() -> Self {
        RunState {
            phase: RunPhase::Idle,
            initial_head: String::new(),
            rebase_limit_ref: String::new(),
            stash_ref: None,
            staged_files: Vec::new(),
            worktree_copies: Vec::new(),
            snapshot_commit: None,
            fixup_commits: Vec::new(),
            failed_fixups: Vec::new(),
            unattributed_hunks: 0,
        }
    }

    fn advance(&mut self, phase: RunPhase) {
        debug_log(&format!("{:?} -> {:?}", self.phase, phase));
        self.phase = phase;
    }

    /// Manual way back to the state before the run.
    pub fn undo_instructions(&self) -> String {
        match &self.stash_ref {
            Some(stash) => format!(
                "To undo: git reset --hard {}; git stash apply --index {}",
                self.initial_head, stash
            ),
            None => format!("To undo: git reset --hard {}", self.initial_head),
        }
    }
}

/// Outcome of a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub initial_head: String,
    pub final_head: String,
    pub stash_ref: Option<String>,
    pub fixups_folded: usize,
    pub failed_fixups: usize,
    pub unattributed_hunks: usize,
}

impl RunReport {
    pub fn summary(&self) -> String {
        format!(
            "{} fixup(s) folded, {} failed to fold, {} hunk(s) left staged",
            self.fixups_folded, self.failed_fixups, self.unattributed_hunks
        )
    }
}

/// Folds staged hunks into the commits that introduced the lines they touch.
pub struct AutoFixup<'a, B: FixupBackend + ?Sized> {
    backend: &'a B,
    options: AutofixupOptions,
}

impl<'a, B: FixupBackend + ?Sized> AutoFixup<'a, B> {
    pub fn new(backend: &'a B, options: AutofixupOptions) -> Self {
        AutoFixup { backend, options }
    }

    /// Run once over the current index. The undo line is written to `out`
    /// before anything is mutated and again at the end, whatever happens.
    pub fn run<W: Write>(&self, out: &mut W) -> Result<RunReport, GitAutofixupError> {
        let mut state = RunState::new();
        self.capture(&mut state)?;
        writeln!(out, "{}", state.undo_instructions())?;

        let result = self.rewrite(&mut state);

        writeln!(out, "{}", state.undo_instructions())?;
        let report = result?;
        writeln!(out, "{}", report.summary())?;
        Ok(report)
    }

    fn capture(&self, state: &mut RunState) -> Result<(), GitAutofixupError> {
        state.initial_head = self.backend.rev_parse("HEAD")?;
        state.rebase_limit_ref = self
            .backend
            .merge_base(&self.options.rebase_limit, &state.initial_head)?;
        state.stash_ref = self.backend.stash_create()?;

        for entry in self.backend.staged_entries()? {
            let diff = if entry.is_modified() {
                self.backend.diff_staged(&entry.path)?
            } else {
                String::new()
            };
            state.staged_files.push(StagedFile {
                mode: self.backend.staged_mode(&entry.path)?,
                content: self.backend.show_staged(&entry.path)?,
                diff,
                status: entry.status,
                path: entry.path,
            });
        }

        for path in self.backend.unstaged_paths()? {
            let content = self.backend.read_worktree_file(&path)?;
            state.worktree_copies.push((path, content));
        }

        debug_log(&format!(
            "Captured HEAD {} (limit {}, insert checks {}), {} staged file(s), {} with unstaged edits",
            short_sha(&state.initial_head),
            short_sha(&state.rebase_limit_ref),
            self.options.insert_checks.as_str(),
            state.staged_files.len(),
            state.worktree_copies.len()
        ));
        state.advance(RunPhase::Captured);
        Ok(())
    }

    fn rewrite(&self, state: &mut RunState) -> Result<RunReport, GitAutofixupError> {
        if state.staged_files.is_empty() {
            debug_log("Nothing staged");
            state.advance(RunPhase::Done);
            return Ok(self.report(state, state.initial_head.clone()));
        }

        let snapshot = self.backend.commit(SNAPSHOT_COMMIT_MESSAGE)?;
        debug_log(&format!("Staged snapshot is {}", short_sha(&snapshot)));
        state.snapshot_commit = Some(snapshot.clone());
        state.advance(RunPhase::StagedSnapshotted);

        self.backend.reset(&state.initial_head, ResetMode::Hard)?;
        state.advance(RunPhase::Reset);

        self.generate_fixups(state)?;
        state.advance(RunPhase::FixupsGenerated);

        if !state.fixup_commits.is_empty() {
            // Nothing may be left for the autostash to carry
            self.backend.reset("HEAD", ResetMode::Hard)?;
            state.advance(RunPhase::Rewriting);
            let status = self.backend.rebase_autosquash(&state.rebase_limit_ref)?;
            self.resolve_conflicts(state, status)?;
            self.recover_failed_fixups(state)?;
        }
        state.advance(RunPhase::Recovered);

        let final_head = self.backend.rev_parse("HEAD")?;
        self.backend.reset(&snapshot, ResetMode::Hard)?;
        self.backend.reset(&final_head, ResetMode::Soft)?;
        for (path, content) in &state.worktree_copies {
            self.backend.restore_worktree_file(path, content.as_deref())?;
        }
        state.advance(RunPhase::Done);

        Ok(self.report(state, final_head))
    }

    fn generate_fixups(&self, state: &mut RunState) -> Result<(), GitAutofixupError> {
        let resolver = AttributionResolver::new(
            self.backend,
            &state.initial_head,
            &state.rebase_limit_ref,
            self.options.insert_checks,
        );
        let planner = FixupPlanner::new(self.backend, resolver, &state.initial_head);

        let mut fixup_commits = Vec::new();
        let mut unattributed = 0;
        for file in state.staged_files.iter().filter(|f| f.has_committed_version()) {
            let outcome = planner.generate_fixups_for_file(file)?;
            fixup_commits.extend(outcome.fixup_commits);
            unattributed += outcome.unattributed;
        }

        state.fixup_commits = fixup_commits;
        state.unattributed_hunks = unattributed;
        Ok(())
    }

    /// Skip our own fixups when they conflict and keep folds that empty their target;
    /// anything else needs a human.
    fn resolve_conflicts(
        &self,
        state: &mut RunState,
        mut status: RebaseStatus,
    ) -> Result<(), GitAutofixupError> {
        loop {
            match status {
                RebaseStatus::Completed => return Ok(()),
                RebaseStatus::Conflict {
                    unmerged_paths,
                    current_step,
                } => {
                    state.advance(RunPhase::ConflictLoop);
                    let ours = current_step
                        .as_ref()
                        .filter(|step| state.fixup_commits.contains(step));
                    let Some(step) = ours else {
                        return Err(GitAutofixupError::UnrecoverableRewriteConflict {
                            step: current_step,
                            unmerged_paths,
                        });
                    };
                    debug_log(&format!(
                        "Fixup {} conflicts in {:?}, skipping it",
                        short_sha(step),
                        unmerged_paths
                    ));
                    state.failed_fixups.push(step.clone());
                    status = self.backend.rebase_skip()?;
                }
                RebaseStatus::Stopped {
                    current_step,
                    reason,
                } => {
                    let ours = current_step
                        .as_ref()
                        .filter(|step| state.fixup_commits.contains(step));
                    let Some(step) = ours else {
                        debug_log(&format!("Rebase stopped outside our fixups: {}", reason));
                        return Err(GitAutofixupError::UnrecoverableRewriteConflict {
                            step: current_step,
                            unmerged_paths: Vec::new(),
                        });
                    };
                    debug_log(&format!(
                        "Fixup {} empties its target, keeping the empty commit",
                        short_sha(step)
                    ));
                    status = self.backend.rebase_continue_allow_empty()?;
                }
            }
        }
    }

    /// Put skipped fixups back as uncommitted changes.
    fn recover_failed_fixups(&self, state: &RunState) -> Result<(), GitAutofixupError> {
        for sha in &state.failed_fixups {
            if !self.backend.cherry_pick_no_commit(sha)? {
                debug_log(&format!(
                    "Fixup {} did not reapply cleanly; the staged snapshot still holds it",
                    short_sha(sha)
                ));
            }
        }
        Ok(())
    }

    fn report(&self, state: &RunState, final_head: String) -> RunReport {
        RunReport {
            initial_head: state.initial_head.clone(),
            final_head,
            stash_ref: state.stash_ref.clone(),
            fixups_folded: state.fixup_commits.len() - state.failed_fixups.len(),
            failed_fixups: state.failed_fixups.len(),
            unattributed_hunks: state.unattributed_hunks,
        }
    }
}
