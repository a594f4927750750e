use std::fmt;

#[derive(Debug)]
pub enum GitAutofixupError {
    IoError(std::io::Error),
    /// Errors from invoking the git CLI that exited with a non-zero status
    GitCliError {
        code: Option<i32>,
        stderr: String,
        args: Vec<String>,
    },
    JsonError(serde_json::Error),
    FromUtf8Error(std::string::FromUtf8Error),
    /// An `insert_checks` value that is not one of above/below/around/recent
    InvalidInsertCheck(String),
    /// The history rewrite stopped on a conflict that none of our fixups caused.
    /// The repository is left mid-rebase.
    UnrecoverableRewriteConflict {
        step: Option<String>,
        unmerged_paths: Vec<String>,
    },
    Generic(String),
}

impl fmt::Display for GitAutofixupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GitAutofixupError::IoError(e) => write!(f, "IO error: {}", e),
            GitAutofixupError::GitCliError { code, stderr, args } => match code {
                Some(c) => write!(
                    f,
                    "Git CLI ({}) failed with exit code {}: {}",
                    args.join(" "),
                    c,
                    stderr
                ),
                None => write!(f, "Git CLI ({}) failed: {}", args.join(" "), stderr),
            },
            GitAutofixupError::JsonError(e) => write!(f, "JSON error: {}", e),
            GitAutofixupError::FromUtf8Error(e) => write!(f, "From UTF-8 error: {}", e),
            GitAutofixupError::InvalidInsertCheck(value) => write!(
                f,
                "Invalid insert_checks value '{}' (expected one of: above, below, around, recent)",
                value
            ),
            GitAutofixupError::UnrecoverableRewriteConflict {
                step,
                unmerged_paths,
            } => write!(
                f,
                "Rebase stopped on a conflict not caused by an auto-fixup commit (step: {}, unmerged: {})",
                step.as_deref().unwrap_or("unknown"),
                unmerged_paths.join(", ")
            ),
            GitAutofixupError::Generic(e) => write!(f, "Generic error: {}", e),
        }
    }
}

impl std::error::Error for GitAutofixupError {}

impl From<std::io::Error> for GitAutofixupError {
    fn from(err: std::io::Error) -> Self {
        GitAutofixupError::IoError(err)
    }
}

impl From<serde_json::Error> for GitAutofixupError {
    fn from(err: serde_json::Error) -> Self {
        GitAutofixupError::JsonError(err)
    }
}

impl From<std::string::FromUtf8Error> for GitAutofixupError {
    fn from(err: std::string::FromUtf8Error) -> Self {
        GitAutofixupError::FromUtf8Error(err)
    }
}
