use crate::config;
use crate::error::GitAutofixupError;
use crate::git::backend::{
    BlameLine, FixupBackend, GitOutcome, HistoryBackend, RebaseStatus, ResetMode, StagedEntry,
};
use crate::utils::debug_log;

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Environment that keeps the interactive rebase from ever waiting on an editor
const NON_INTERACTIVE_EDITOR_ENV: [(&str, &str); 2] =
    [("GIT_SEQUENCE_EDITOR", "true"), ("GIT_EDITOR", "true")];

pub struct Repository {
    global_args: Vec<String>,
    git_dir: PathBuf,
    workdir: PathBuf,
}

impl Repository {
    // Util for preparing global args for execution
    pub fn global_args_for_exec(&self) -> Vec<String> {
        let mut args = self.global_args.clone();
        if !args.iter().any(|arg| arg == "--no-pager") {
            args.push("--no-pager".to_string());
        }
        args
    }

    fn args_with(&self, args: &[&str]) -> Vec<String> {
        let mut full_args = self.global_args_for_exec();
        full_args.extend(args.iter().map(|s| s.to_string()));
        full_args
    }

    /// Execute an arbitrary git command and return stdout as string
    pub fn git(&self, args: &[&str]) -> Result<String, GitAutofixupError> {
        let output = exec_git(&self.args_with(args))?;
        Ok(String::from_utf8(output.stdout)?)
    }

    fn git_trimmed(&self, args: &[&str]) -> Result<String, GitAutofixupError> {
        Ok(self.git(args)?.trim().to_string())
    }

    // Get the path of the working directory for this repository.
    pub fn workdir(&self) -> &Path {
        self.workdir.as_path()
    }

    fn unmerged_paths(&self) -> Result<Vec<String>, GitAutofixupError> {
        let output = self.git(&["diff", "--name-only", "--diff-filter=U", "-z"])?;
        Ok(split_nul(&output))
    }

    /// Commit currently being replayed by a stopped rebase.
    fn rebase_current_step(&self) -> Option<String> {
        ["REBASE_HEAD", "rebase-merge/stopped-sha"]
            .iter()
            .filter_map(|name| fs::read_to_string(self.git_dir.join(name)).ok())
            .map(|content| content.trim().to_string())
            .find(|sha| !sha.is_empty())
    }

    fn rebase_status_after(&self, outcome: GitOutcome) -> Result<RebaseStatus, GitAutofixupError> {
        match outcome {
            GitOutcome::Success(_) => Ok(RebaseStatus::Completed),
            GitOutcome::NoMatch(stderr) => {
                let unmerged_paths = self.unmerged_paths()?;
                let current_step = self.rebase_current_step();
                if unmerged_paths.is_empty() {
                    debug_log(&format!(
                        "Rebase stopped at {:?} without conflicts: {}",
                        current_step,
                        stderr.trim()
                    ));
                    return Ok(RebaseStatus::Stopped {
                        current_step,
                        reason: stderr.trim().to_string(),
                    });
                }
                debug_log(&format!(
                    "Rebase conflict at {:?} in {:?}",
                    current_step, unmerged_paths
                ));
                Ok(RebaseStatus::Conflict {
                    unmerged_paths,
                    current_step,
                })
            }
        }
    }
}

impl HistoryBackend for Repository {
    fn blame(
        &self,
        path: &str,
        start: u32,
        end: u32,
        rev: &str,
    ) -> Result<Vec<BlameLine>, GitAutofixupError> {
        // Root commits must always be reported as boundaries, whatever the user config says
        let range = format!("{},{}", start, end);
        let output = exec_git(&self.args_with(&[
            "-c",
            "blame.showRoot=false",
            "blame",
            "--line-porcelain",
            "-L",
            &range,
            rev,
            "--",
            path,
        ]))?;
        // Blamed content may be in any encoding; only the headers matter
        Ok(parse_line_porcelain(&String::from_utf8_lossy(&output.stdout)))
    }

    // Find a merge base between two commits
    fn merge_base(&self, one: &str, two: &str) -> Result<String, GitAutofixupError> {
        self.git_trimmed(&["merge-base", one, two])
    }

    fn rev_list_count(&self, rev: &str) -> Result<u64, GitAutofixupError> {
        let count = self.git_trimmed(&["rev-list", "--count", rev])?;
        count.parse::<u64>().map_err(|e| {
            GitAutofixupError::Generic(format!("unexpected rev-list count '{}': {}", count, e))
        })
    }

    fn committer_time(&self, rev: &str) -> Result<i64, GitAutofixupError> {
        let time = self.git_trimmed(&["show", "-s", "--format=%ct", rev])?;
        time.parse::<i64>().map_err(|e| {
            GitAutofixupError::Generic(format!("unexpected committer time '{}': {}", time, e))
        })
    }
}

impl FixupBackend for Repository {
    fn rev_parse(&self, rev: &str) -> Result<String, GitAutofixupError> {
        self.git_trimmed(&["rev-parse", "--verify", rev])
    }

    fn stash_create(&self) -> Result<Option<String>, GitAutofixupError> {
        let sha = self.git_trimmed(&["stash", "create"])?;
        Ok(if sha.is_empty() { None } else { Some(sha) })
    }

    fn staged_entries(&self) -> Result<Vec<StagedEntry>, GitAutofixupError> {
        let output = self.git(&[
            "diff",
            "--cached",
            "--name-status",
            "--no-renames",
            "--diff-filter=AM",
            "-z",
        ])?;
        parse_name_status_z(&output)
    }

    fn unstaged_paths(&self) -> Result<Vec<String>, GitAutofixupError> {
        let output = self.git(&["diff", "--name-only", "--diff-filter=MD", "-z"])?;
        Ok(split_nul(&output))
    }

    fn diff_staged(&self, path: &str) -> Result<String, GitAutofixupError> {
        let output = exec_git(&self.args_with(&[
            "diff",
            "--cached",
            "-U0",
            "--no-color",
            "--no-ext-diff",
            "--no-renames",
            "--",
            path,
        ]))?;
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    fn show_file(&self, rev: &str, path: &str) -> Result<Vec<u8>, GitAutofixupError> {
        let output = exec_git(&self.args_with(&["cat-file", "blob", &format!("{}:{}", rev, path)]))?;
        Ok(output.stdout)
    }

    fn show_staged(&self, path: &str) -> Result<Vec<u8>, GitAutofixupError> {
        let output = exec_git(&self.args_with(&["cat-file", "blob", &format!(":{}", path)]))?;
        Ok(output.stdout)
    }

    fn staged_mode(&self, path: &str) -> Result<String, GitAutofixupError> {
        let output = self.git(&["ls-files", "--stage", "--", path])?;
        output
            .split_whitespace()
            .next()
            .map(|mode| mode.to_string())
            .ok_or_else(|| GitAutofixupError::Generic(format!("{} is not in the index", path)))
    }

    fn read_worktree_file(&self, path: &str) -> Result<Option<Vec<u8>>, GitAutofixupError> {
        let file = self.workdir.join(path);
        if !file.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read(file)?))
    }

    fn restore_worktree_file(
        &self,
        path: &str,
        content: Option<&[u8]>,
    ) -> Result<(), GitAutofixupError> {
        let file = self.workdir.join(path);
        match content {
            Some(bytes) => {
                if let Some(parent) = file.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::write(file, bytes)?;
            }
            None => {
                if file.exists() {
                    fs::remove_file(file)?;
                }
            }
        }
        Ok(())
    }

    fn hash_object(&self, content: &[u8]) -> Result<String, GitAutofixupError> {
        let output = exec_git_stdin(&self.args_with(&["hash-object", "-w", "--stdin"]), content)?;
        Ok(String::from_utf8(output.stdout)?.trim().to_string())
    }

    fn update_index(&self, path: &str, mode: &str, oid: &str) -> Result<(), GitAutofixupError> {
        let cacheinfo = format!("{},{},{}", mode, oid, path);
        self.git(&["update-index", "--cacheinfo", &cacheinfo])?;
        Ok(())
    }

    fn commit(&self, message: &str) -> Result<String, GitAutofixupError> {
        self.git(&["commit", "-q", "--no-verify", "-m", message])?;
        self.rev_parse("HEAD")
    }

    fn commit_fixup(&self, target: &str) -> Result<String, GitAutofixupError> {
        // Autosquash matches on subject before id, so name the target by its full id
        let message = format!("fixup! {}", target);
        self.git(&["commit", "-q", "--no-verify", "-m", &message])?;
        self.rev_parse("HEAD")
    }

    fn reset(&self, rev: &str, mode: ResetMode) -> Result<(), GitAutofixupError> {
        self.git(&["reset", "-q", mode.as_flag(), rev])?;
        Ok(())
    }

    fn rebase_autosquash(&self, onto: &str) -> Result<RebaseStatus, GitAutofixupError> {
        let args = self.args_with(&["rebase", "-i", "--autosquash", "--autostash", onto]);
        let outcome = exec_git_detect_with_env(&args, &NON_INTERACTIVE_EDITOR_ENV)?;
        self.rebase_status_after(outcome)
    }

    fn rebase_skip(&self) -> Result<RebaseStatus, GitAutofixupError> {
        let args = self.args_with(&["rebase", "--skip"]);
        let outcome = exec_git_detect_with_env(&args, &NON_INTERACTIVE_EDITOR_ENV)?;
        self.rebase_status_after(outcome)
    }

    fn rebase_continue_allow_empty(&self) -> Result<RebaseStatus, GitAutofixupError> {
        // HEAD must stay on the commit being amended; git commits the staged fold itself
        let args = self.args_with(&["rebase", "--continue"]);
        let outcome = exec_git_detect_with_env(&args, &NON_INTERACTIVE_EDITOR_ENV)?;
        self.rebase_status_after(outcome)
    }

    fn cherry_pick_no_commit(&self, rev: &str) -> Result<bool, GitAutofixupError> {
        match exec_git_detect_with_env(&self.args_with(&["cherry-pick", "--no-commit", rev]), &[])? {
            GitOutcome::Success(_) => Ok(true),
            GitOutcome::NoMatch(stderr) => {
                debug_log(&format!(
                    "cherry-pick --no-commit {} did not apply cleanly: {}",
                    rev,
                    stderr.trim()
                ));
                Ok(false)
            }
        }
    }
}

pub fn find_repository(global_args: &[String]) -> Result<Repository, GitAutofixupError> {
    let mut rev_parse_args = global_args.to_owned();
    rev_parse_args.push("rev-parse".to_string());
    rev_parse_args.push("--is-bare-repository".to_string());
    rev_parse_args.push("--git-dir".to_string());

    let rev_parse_output = exec_git(&rev_parse_args)?;
    let rev_parse_stdout = String::from_utf8(rev_parse_output.stdout)?;
    let mut lines = rev_parse_stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty());

    match lines.next() {
        Some("false") => {}
        Some("true") => {
            return Err(GitAutofixupError::Generic(
                "Cannot auto-fixup in a bare repository".to_string(),
            ));
        }
        Some(other) => {
            return Err(GitAutofixupError::Generic(format!(
                "Unexpected --is-bare-repository output: {}",
                other
            )));
        }
        None => {
            return Err(GitAutofixupError::Generic(
                "Missing --is-bare-repository output from git rev-parse".to_string(),
            ));
        }
    }

    let git_dir_str = lines.next().ok_or_else(|| {
        GitAutofixupError::Generic("Missing --git-dir output from git rev-parse".to_string())
    })?;
    let command_base_dir = resolve_command_base_dir(global_args)?;
    let git_dir = if Path::new(git_dir_str).is_relative() {
        command_base_dir.join(git_dir_str)
    } else {
        PathBuf::from(git_dir_str)
    };

    if !git_dir.is_dir() {
        return Err(GitAutofixupError::Generic(format!(
            "Git directory does not exist: {}",
            git_dir.display()
        )));
    }

    let mut top_level_args = global_args.to_owned();
    top_level_args.push("rev-parse".to_string());
    top_level_args.push("--show-toplevel".to_string());
    let output = exec_git(&top_level_args)?;
    let workdir = PathBuf::from(String::from_utf8(output.stdout)?.trim());

    if !workdir.is_dir() {
        return Err(GitAutofixupError::Generic(format!(
            "Work directory does not exist: {}",
            workdir.display()
        )));
    }

    // All internal git commands run from the repository root so that
    // index paths can be passed through unchanged.
    Ok(Repository {
        global_args: vec!["-C".to_string(), workdir.display().to_string()],
        git_dir,
        workdir,
    })
}

fn resolve_command_base_dir(global_args: &[String]) -> Result<PathBuf, GitAutofixupError> {
    let mut base = std::env::current_dir().map_err(GitAutofixupError::IoError)?;
    let mut idx = 0usize;

    while idx < global_args.len() {
        if global_args[idx] == "-C" {
            let path_arg = global_args.get(idx + 1).ok_or_else(|| {
                GitAutofixupError::Generic("Missing path after -C in global git args".to_string())
            })?;

            let next_base = PathBuf::from(path_arg);
            base = if next_base.is_absolute() {
                next_base
            } else {
                base.join(next_base)
            };
            idx += 2;
            continue;
        }
        idx += 1;
    }

    Ok(base)
}

pub fn find_repository_in_path(path: &str) -> Result<Repository, GitAutofixupError> {
    let global_args = vec!["-C".to_string(), path.to_string()];
    find_repository(&global_args)
}

fn cli_error(args: &[String], output: &Output) -> GitAutofixupError {
    GitAutofixupError::GitCliError {
        code: output.status.code(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        args: args.to_vec(),
    }
}

/// Helper to execute a git command
pub fn exec_git(args: &[String]) -> Result<Output, GitAutofixupError> {
    debug_log(&format!("git {}", args.join(" ")));
    let mut cmd = Command::new(config::Config::get().git_cmd());
    cmd.args(args);

    let output = cmd.output().map_err(GitAutofixupError::IoError)?;

    if !output.status.success() {
        return Err(cli_error(args, &output));
    }

    Ok(output)
}

/// Helper to execute a git command with data provided on stdin
pub fn exec_git_stdin(args: &[String], stdin_data: &[u8]) -> Result<Output, GitAutofixupError> {
    debug_log(&format!("git {} (stdin: {} bytes)", args.join(" "), stdin_data.len()));
    let mut cmd = Command::new(config::Config::get().git_cmd());
    cmd.args(args)
        .stdin(std::process::Stdio::piped())
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped());

    let mut child = cmd.spawn().map_err(GitAutofixupError::IoError)?;

    if let Some(mut stdin) = child.stdin.take() {
        use std::io::Write;
        if let Err(e) = stdin.write_all(stdin_data) {
            return Err(GitAutofixupError::IoError(e));
        }
    }

    let output = child.wait_with_output().map_err(GitAutofixupError::IoError)?;

    if !output.status.success() {
        return Err(cli_error(args, &output));
    }

    Ok(output)
}

/// Helper to execute a git command where exit status 1 with diagnostics means
/// "nothing matched" (or a stop the caller inspects) rather than a failure.
pub fn exec_git_detect_with_env(
    args: &[String],
    env: &[(&str, &str)],
) -> Result<GitOutcome, GitAutofixupError> {
    debug_log(&format!("git {}", args.join(" ")));
    let mut cmd = Command::new(config::Config::get().git_cmd());
    cmd.args(args);
    for (k, v) in env.iter() {
        cmd.env(k, v);
    }

    let output = cmd.output().map_err(GitAutofixupError::IoError)?;
    classify_output(args, output)
}

fn classify_output(args: &[String], output: Output) -> Result<GitOutcome, GitAutofixupError> {
    if output.status.success() {
        return Ok(GitOutcome::Success(output.stdout));
    }
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    if output.status.code() == Some(1) && !stderr.trim().is_empty() {
        return Ok(GitOutcome::NoMatch(stderr));
    }
    Err(cli_error(args, &output))
}

fn split_nul(output: &str) -> Vec<String> {
    output
        .split('\0')
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

/// Parse `git diff --name-status -z` output: status and path alternate, NUL separated.
fn parse_name_status_z(output: &str) -> Result<Vec<StagedEntry>, GitAutofixupError> {
    let fields = split_nul(output);
    let mut entries = Vec::with_capacity(fields.len() / 2);
    let mut iter = fields.into_iter();
    while let Some(status) = iter.next() {
        let path = iter.next().ok_or_else(|| {
            GitAutofixupError::Generic(format!("Missing path after status '{}'", status))
        })?;
        let status = status.chars().next().ok_or_else(|| {
            GitAutofixupError::Generic("Empty status in name-status output".to_string())
        })?;
        entries.push(StagedEntry { path, status });
    }
    Ok(entries)
}

/// Parse `git blame --line-porcelain` output into one entry per blamed line.
///
/// Each line starts with a header `<sha> <orig_lineno> <final_lineno> [<group_size>]`,
/// followed by metadata (`boundary` among them) and the tab-prefixed content.
fn parse_line_porcelain(stdout: &str) -> Vec<BlameLine> {
    let mut lines: Vec<BlameLine> = Vec::new();

    for line in stdout.lines() {
        if line.is_empty() || line.starts_with('\t') {
            continue;
        }

        if line == "boundary" {
            if let Some(current) = lines.last_mut() {
                current.is_boundary = true;
            }
            continue;
        }

        let mut parts = line.split_whitespace();
        let sha = parts.next().unwrap_or("");
        let _orig = parts.next().unwrap_or("");
        let final_lineno = parts.next().unwrap_or("");

        let is_header = sha.len() >= 40
            && sha.chars().all(|c| c.is_ascii_hexdigit())
            && !final_lineno.is_empty();
        if !is_header {
            continue;
        }

        if let Ok(final_lineno) = final_lineno.parse::<u32>() {
            lines.push(BlameLine {
                line: final_lineno,
                commit_sha: sha.to_string(),
                is_boundary: false,
            });
        }
    }

    lines
}
