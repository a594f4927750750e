use crate::error::GitAutofixupError;
use crate::fixup::attribution::{Attribution, AttributionResolver};
use crate::fixup::hunk_parser::parse_transformations;
use crate::fixup::transformation::Transformation;
use crate::git::backend::FixupBackend;
use crate::utils::{debug_log, short_sha, split_lines};

/// A staged path as captured before the run touches anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFile {
    pub path: String,
    /// `A` or `M`, as reported by `git diff --cached --name-status`
    pub status: char,
    pub mode: String,
    pub content: Vec<u8>,
    /// Zero-context diff of the staged content against HEAD
    pub diff: String,
}

impl StagedFile {
    /// Only files with a committed version can be folded into history
    pub fn has_committed_version(&self) -> bool {
        self.status == 'M'
    }
}

/// A transformation paired with the commit it will be folded into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedFixup {
    pub transformation: Transformation,
    pub target: String,
}

/// What happened to one staged file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileFixups {
    /// Fixup commits created, bottom of the file first
    pub fixup_commits: Vec<String>,
    /// Hunks left staged because no single commit could take them
    pub unattributed: usize,
}

pub struct FixupPlanner<'a, B: FixupBackend + ?Sized> {
    backend: &'a B,
    resolver: AttributionResolver<'a, B>,
    /// HEAD before the run; the base every transformation applies to
    base_rev: &'a str,
}

impl<'a, B: FixupBackend + ?Sized> FixupPlanner<'a, B> {
    pub fn new(backend: &'a B, resolver: AttributionResolver<'a, B>, base_rev: &'a str) -> Self {
        FixupPlanner {
            backend,
            resolver,
            base_rev,
        }
    }

    /// Resolve every hunk of `file`, keeping source order among the attributable ones.
    pub fn plan(
        &self,
        file: &StagedFile,
        base_lines: &[Vec<u8>],
    ) -> Result<(Vec<PlannedFixup>, usize), GitAutofixupError> {
        let transformations = parse_transformations(&file.path, &file.diff, Some(&file.content))?;
        let total = transformations.len();

        let mut planned = Vec::with_capacity(total);
        for transformation in transformations {
            if let Attribution::Commit(target) =
                self.resolver.resolve(&transformation, base_lines.len())?
            {
                planned.push(PlannedFixup {
                    transformation,
                    target,
                });
            }
        }

        let unattributed = total - planned.len();
        Ok((planned, unattributed))
    }

    /// Create one fixup commit per attributable hunk of `file`.
    ///
    /// Hunks are replayed bottom to top on the committed content, so an edit
    /// never shifts the line numbers of the edits still to come. Each revision
    /// goes straight into the index; the working tree is left alone.
    pub fn generate_fixups_for_file(
        &self,
        file: &StagedFile,
    ) -> Result<FileFixups, GitAutofixupError> {
        if !file.has_committed_version() {
            debug_log(&format!("{} is a new file, leaving it staged", file.path));
            return Ok(FileFixups::default());
        }

        let base_content = self.backend.show_file(self.base_rev, &file.path)?;
        let mut current_lines = split_lines(&base_content);

        let (planned, unattributed) = self.plan(file, &current_lines)?;
        if planned.is_empty() {
            return Ok(FileFixups {
                fixup_commits: Vec::new(),
                unattributed,
            });
        }

        let mut fixup_commits = Vec::with_capacity(planned.len());
        for fixup in planned.iter().rev() {
            let range = fixup.transformation.range_to_apply_edit();
            if range.end > current_lines.len() {
                return Err(GitAutofixupError::Generic(format!(
                    "Hunk {:?} is out of bounds for committed {} ({} lines)",
                    range,
                    file.path,
                    current_lines.len()
                )));
            }
            let into_lines = fixup.transformation.into_lines.clone().unwrap_or_default();
            current_lines.splice(range, into_lines);

            let oid = self.backend.hash_object(&current_lines.concat())?;
            self.backend.update_index(&file.path, &file.mode, &oid)?;
            let sha = self.backend.commit_fixup(&fixup.target)?;
            debug_log(&format!(
                "Created fixup {} for {} in {}",
                short_sha(&sha),
                short_sha(&fixup.target),
                file.path
            ));
            fixup_commits.push(sha);
        }

        Ok(FileFixups {
            fixup_commits,
            unattributed,
        })
    }
}
