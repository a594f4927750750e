//! In-memory backend over a linear history, for attribution and planning tests.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use crate::error::GitAutofixupError;
use crate::git::backend::{
    BlameLine, FixupBackend, HistoryBackend, RebaseStatus, ResetMode, StagedEntry,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeFixup {
    pub sha: String,
    pub target: String,
    pub path: String,
    pub content: Vec<u8>,
}

/// Commits form a straight line, oldest first; the first one is the root.
/// Files at HEAD have lines `line 1`, `line 2`, ... each blamed to a named commit.
pub struct FakeRepo {
    commits: Vec<String>,
    files: HashMap<String, Vec<String>>,
    rev_list_counts: HashMap<String, u64>,
    committer_times: HashMap<String, i64>,
    objects: RefCell<HashMap<String, Vec<u8>>>,
    index: RefCell<HashMap<String, String>>,
    fixups: RefCell<Vec<FakeFixup>>,
    fixup_count: Cell<usize>,
}

impl FakeRepo {
    pub fn linear(names: &[&str]) -> Self {
        FakeRepo {
            commits: names.iter().map(|n| n.to_string()).collect(),
            files: HashMap::new(),
            rev_list_counts: HashMap::new(),
            committer_times: HashMap::new(),
            objects: RefCell::new(HashMap::new()),
            index: RefCell::new(HashMap::new()),
            fixups: RefCell::new(Vec::new()),
            fixup_count: Cell::new(0),
        }
    }

    pub fn sha(&self, name: &str) -> String {
        let position = self
            .commits
            .iter()
            .position(|c| c == name)
            .unwrap_or_else(|| panic!("unknown commit {}", name));
        format!("{:040x}", position + 1)
    }

    fn position_of_sha(&self, sha: &str) -> Result<usize, GitAutofixupError> {
        (0..self.commits.len())
            .find(|i| format!("{:040x}", i + 1) == sha)
            .ok_or_else(|| GitAutofixupError::Generic(format!("unknown revision {}", sha)))
    }

    fn resolve_rev(&self, rev: &str) -> Result<usize, GitAutofixupError> {
        if rev == "HEAD" {
            return Ok(self.commits.len() - 1);
        }
        self.position_of_sha(rev)
    }

    pub fn set_file(&mut self, path: &str, blamed_commits: &[&str]) {
        self.files.insert(
            path.to_string(),
            blamed_commits.iter().map(|c| c.to_string()).collect(),
        );
    }

    pub fn line_count(&self, path: &str) -> usize {
        self.files.get(path).map(|lines| lines.len()).unwrap_or(0)
    }

    pub fn head_content(&self, path: &str) -> Vec<u8> {
        (1..=self.line_count(path))
            .map(|n| format!("line {}\n", n))
            .collect::<String>()
            .into_bytes()
    }

    pub fn set_rev_list_count(&mut self, name: &str, count: u64) {
        let sha = self.sha(name);
        self.rev_list_counts.insert(sha, count);
    }

    pub fn set_committer_time(&mut self, name: &str, time: i64) {
        let sha = self.sha(name);
        self.committer_times.insert(sha, time);
    }

    pub fn fixups(&self) -> Vec<FakeFixup> {
        self.fixups.borrow().clone()
    }
}

impl HistoryBackend for FakeRepo {
    fn blame(
        &self,
        path: &str,
        start: u32,
        end: u32,
        _rev: &str,
    ) -> Result<Vec<BlameLine>, GitAutofixupError> {
        let lines = self
            .files
            .get(path)
            .ok_or_else(|| GitAutofixupError::Generic(format!("no such path {}", path)))?;
        if start == 0 || end as usize > lines.len() || start > end {
            return Err(GitAutofixupError::Generic(format!(
                "invalid blame range {},{} for {} lines",
                start,
                end,
                lines.len()
            )));
        }
        Ok((start..=end)
            .map(|line| {
                let name = &lines[line as usize - 1];
                BlameLine {
                    line,
                    commit_sha: self.sha(name),
                    is_boundary: *name == self.commits[0],
                }
            })
            .collect())
    }

    fn merge_base(&self, one: &str, two: &str) -> Result<String, GitAutofixupError> {
        let oldest = self.resolve_rev(one)?.min(self.resolve_rev(two)?);
        Ok(format!("{:040x}", oldest + 1))
    }

    fn rev_list_count(&self, rev: &str) -> Result<u64, GitAutofixupError> {
        let position = self.resolve_rev(rev)?;
        let sha = format!("{:040x}", position + 1);
        Ok(self
            .rev_list_counts
            .get(&sha)
            .copied()
            .unwrap_or(position as u64 + 1))
    }

    fn committer_time(&self, rev: &str) -> Result<i64, GitAutofixupError> {
        let position = self.resolve_rev(rev)?;
        let sha = format!("{:040x}", position + 1);
        Ok(self
            .committer_times
            .get(&sha)
            .copied()
            .unwrap_or(1_700_000_000 + position as i64))
    }
}

impl FixupBackend for FakeRepo {
    fn rev_parse(&self, rev: &str) -> Result<String, GitAutofixupError> {
        let position = self.resolve_rev(rev)?;
        Ok(format!("{:040x}", position + 1))
    }

    fn stash_create(&self) -> Result<Option<String>, GitAutofixupError> {
        Ok(None)
    }

    fn staged_entries(&self) -> Result<Vec<StagedEntry>, GitAutofixupError> {
        unimplemented!("staged_entries is not modelled by FakeRepo")
    }

    fn unstaged_paths(&self) -> Result<Vec<String>, GitAutofixupError> {
        unimplemented!("unstaged_paths is not modelled by FakeRepo")
    }

    fn diff_staged(&self, _path: &str) -> Result<String, GitAutofixupError> {
        unimplemented!("diff_staged is not modelled by FakeRepo")
    }

    fn show_file(&self, _rev: &str, path: &str) -> Result<Vec<u8>, GitAutofixupError> {
        if !self.files.contains_key(path) {
            return Err(GitAutofixupError::Generic(format!("no such path {}", path)));
        }
        Ok(self.head_content(path))
    }

    fn show_staged(&self, _path: &str) -> Result<Vec<u8>, GitAutofixupError> {
        unimplemented!("show_staged is not modelled by FakeRepo")
    }

    fn staged_mode(&self, _path: &str) -> Result<String, GitAutofixupError> {
        Ok("100644".to_string())
    }

    fn read_worktree_file(&self, _path: &str) -> Result<Option<Vec<u8>>, GitAutofixupError> {
        unimplemented!("the working tree is not modelled by FakeRepo")
    }

    fn restore_worktree_file(
        &self,
        _path: &str,
        _content: Option<&[u8]>,
    ) -> Result<(), GitAutofixupError> {
        unimplemented!("the working tree is not modelled by FakeRepo")
    }

    fn hash_object(&self, content: &[u8]) -> Result<String, GitAutofixupError> {
        let mut objects = self.objects.borrow_mut();
        let oid = format!("b{:039x}", objects.len() + 1);
        objects.insert(oid.clone(), content.to_vec());
        Ok(oid)
    }

    fn update_index(&self, path: &str, mode: &str, oid: &str) -> Result<(), GitAutofixupError> {
        assert_eq!(mode, "100644");
        self.index.borrow_mut().insert(path.to_string(), oid.to_string());
        Ok(())
    }

    fn commit(&self, _message: &str) -> Result<String, GitAutofixupError> {
        unimplemented!("plain commits are not modelled by FakeRepo")
    }

    fn commit_fixup(&self, target: &str) -> Result<String, GitAutofixupError> {
        let index = self.index.borrow();
        let objects = self.objects.borrow();
        let mut fixups = self.fixups.borrow_mut();
        self.fixup_count.set(self.fixup_count.get() + 1);
        let sha = format!("f{:039x}", self.fixup_count.get());
        for (path, oid) in index.iter() {
            fixups.push(FakeFixup {
                sha: sha.clone(),
                target: target.to_string(),
                path: path.clone(),
                content: objects.get(oid).cloned().unwrap_or_default(),
            });
        }
        Ok(sha)
    }

    fn reset(&self, _rev: &str, _mode: ResetMode) -> Result<(), GitAutofixupError> {
        unimplemented!("reset is not modelled by FakeRepo")
    }

    fn rebase_autosquash(&self, _onto: &str) -> Result<RebaseStatus, GitAutofixupError> {
        unimplemented!("rebase is not modelled by FakeRepo")
    }

    fn rebase_skip(&self) -> Result<RebaseStatus, GitAutofixupError> {
        unimplemented!("rebase is not modelled by FakeRepo")
    }

    fn rebase_continue_allow_empty(&self) -> Result<RebaseStatus, GitAutofixupError> {
        unimplemented!("rebase is not modelled by FakeRepo")
    }

    fn cherry_pick_no_commit(&self, _rev: &str) -> Result<bool, GitAutofixupError> {
        unimplemented!("cherry-pick is not modelled by FakeRepo")
    }
}
