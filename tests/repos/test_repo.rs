#![allow(dead_code)]

use git_autofixup::config::{AutofixupOptions, InsertCheck};
use git_autofixup::error::GitAutofixupError;
use git_autofixup::fixup::{AutoFixup, RunReport};
use git_autofixup::git::repository::{self as AutofixupRepository, exec_git};
use git2::Repository;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// Turns `"a b c"` into `"a\nb\nc\n"`.
pub fn short_form(words: &str) -> String {
    words
        .split_whitespace()
        .map(|word| format!("{}\n", word))
        .collect()
}

/// A throwaway repository whose root is an empty "Initial commit".
pub struct TestRepo {
    dir: TempDir,
    /// HOME for the binary, so a user config file never leaks into tests
    home: TempDir,
    root: String,
}

impl TestRepo {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        let home = TempDir::new().expect("failed to create temp home");

        let repo = Repository::init(dir.path()).expect("failed to initialize git2 repository");
        let mut config = repo.config().expect("failed to open git2 config");
        config
            .set_str("user.name", "Test User")
            .expect("failed to set user.name");
        config
            .set_str("user.email", "test@example.com")
            .expect("failed to set user.email");
        config
            .set_bool("commit.gpgsign", false)
            .expect("failed to set commit.gpgsign");

        let mut test_repo = TestRepo {
            dir,
            home,
            root: String::new(),
        };
        test_repo
            .git(&["commit", "-q", "--allow-empty", "-m", "Initial commit"])
            .expect("initial commit should succeed");
        test_repo.root = test_repo.rev_parse("HEAD");
        test_repo
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// The empty root commit; used as the rebase limit so every later commit is fair game.
    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn git(&self, args: &[&str]) -> Result<String, String> {
        let mut full_args: Vec<String> =
            vec!["-C".to_string(), self.path().to_str().unwrap().to_string()];
        full_args.extend(args.iter().map(|s| s.to_string()));

        exec_git(&full_args)
            .map(|output| String::from_utf8_lossy(&output.stdout).to_string())
            .map_err(|e| e.to_string())
    }

    pub fn rev_parse(&self, rev: &str) -> String {
        self.git(&["rev-parse", rev])
            .expect("rev-parse should succeed")
            .trim()
            .to_string()
    }

    pub fn write_file(&self, filename: &str, contents: &str) {
        let file_path = self.path().join(filename);
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).expect("failed to create parent dirs");
        }
        fs::write(file_path, contents).expect("failed to write file");
    }

    pub fn read_file(&self, filename: &str) -> Option<String> {
        fs::read_to_string(self.path().join(filename)).ok()
    }

    /// Commit `filename` with the short-form `words` as its whole content.
    pub fn commit_short_form(&self, filename: &str, words: &str, message: &str) -> String {
        self.stage_short_form(filename, words);
        self.git(&["commit", "-q", "-m", message])
            .expect("commit should succeed");
        self.rev_parse("HEAD")
    }

    pub fn stage_short_form(&self, filename: &str, words: &str) {
        self.write_file(filename, &short_form(words));
        self.git(&["add", filename]).expect("add should succeed");
    }

    /// Content of `filename` at `rev`, or in the index when `rev` is empty.
    pub fn show(&self, rev: &str, filename: &str) -> String {
        self.git(&["show", &format!("{}:{}", rev, filename)])
            .unwrap_or_else(|e| panic!("show {}:{} failed: {}", rev, filename, e))
    }

    pub fn staged_diff(&self) -> String {
        self.git(&["diff", "--cached"]).expect("diff --cached should succeed")
    }

    pub fn unstaged_diff(&self) -> String {
        self.git(&["diff"]).expect("diff should succeed")
    }

    pub fn commit_count(&self) -> usize {
        self.git(&["rev-list", "--count", "HEAD"])
            .expect("rev-list should succeed")
            .trim()
            .parse()
            .expect("rev-list --count prints a number")
    }

    pub fn rebase_in_progress(&self) -> bool {
        let git_dir = PathBuf::from(
            self.git(&["rev-parse", "--absolute-git-dir"])
                .expect("rev-parse should succeed")
                .trim(),
        );
        git_dir.join("rebase-merge").exists() || git_dir.join("rebase-apply").exists()
    }

    /// Run the engine in process against this repository.
    pub fn autofixup(&self, insert_checks: InsertCheck) -> Result<(RunReport, String), GitAutofixupError> {
        self.autofixup_with_limit(self.root(), insert_checks)
    }

    pub fn autofixup_with_limit(
        &self,
        rebase_limit: &str,
        insert_checks: InsertCheck,
    ) -> Result<(RunReport, String), GitAutofixupError> {
        let repo = AutofixupRepository::find_repository_in_path(self.path().to_str().unwrap())?;
        let mut out = Vec::new();
        let report =
            AutoFixup::new(&repo, AutofixupOptions::new(rebase_limit, insert_checks)).run(&mut out)?;
        Ok((report, String::from_utf8_lossy(&out).to_string()))
    }

    /// Run the `git-autofixup` binary with `-C <repo>` and `args`.
    pub fn autofixup_bin(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_git-autofixup"))
            .arg("-C")
            .arg(self.path())
            .args(args)
            .env("HOME", self.home.path())
            .output()
            .expect("failed to run git-autofixup")
    }
}

impl Default for TestRepo {
    fn default() -> Self {
        Self::new()
    }
}
