use std::io;

use crate::config::AutofixupOptions;
use crate::error::GitAutofixupError;
use crate::fixup::{AutoFixup, RunReport};
use crate::git::find_repository;

/// Exit status for a run that finished, even if some hunks stayed staged
pub const EXIT_OK: i32 = 0;
/// Backend fault or bad configuration
pub const EXIT_FAILURE: i32 = 1;
/// The rewrite stopped on a conflict that needs a human
pub const EXIT_CONFLICT: i32 = 2;

/// Arguments accepted by the `git-autofixup` binary.
#[derive(Debug, Clone, Default)]
pub struct AutofixupArgs {
    pub rebase_limit: Option<String>,
    pub insert_checks: Option<String>,
    /// `-C <path>` values, applied in order like git does
    pub directories: Vec<String>,
}

impl AutofixupArgs {
    fn global_args(&self) -> Vec<String> {
        self.directories
            .iter()
            .flat_map(|dir| ["-C".to_string(), dir.clone()])
            .collect()
    }
}

pub fn handle_autofixup(args: &AutofixupArgs) -> i32 {
    match run_autofixup(args) {
        Ok(_) => EXIT_OK,
        Err(e) => {
            eprintln!("Error: {}", e);
            let code = exit_code_for(&e);
            if code == EXIT_CONFLICT {
                eprintln!(
                    "Resolve the conflict and run `git rebase --continue`, or run `git rebase --abort` and use the undo line above."
                );
            }
            code
        }
    }
}

pub fn run_autofixup(args: &AutofixupArgs) -> Result<RunReport, GitAutofixupError> {
    let options = AutofixupOptions::resolve(args.rebase_limit.clone(), args.insert_checks.as_deref())?;
    let repo = find_repository(&args.global_args())?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    AutoFixup::new(&repo, options).run(&mut out)
}

pub fn exit_code_for(error: &GitAutofixupError) -> i32 {
    match error {
        GitAutofixupError::UnrecoverableRewriteConflict { .. } => EXIT_CONFLICT,
        _ => EXIT_FAILURE,
    }
}
