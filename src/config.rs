use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::OnceLock;

use serde::Deserialize;

use crate::error::GitAutofixupError;

/// Default branch the rewrite may never reach past
pub const DEFAULT_REBASE_LIMIT: &str = "origin/master";

/// How a pure insertion (a hunk that removes nothing) picks the commit to amend.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum InsertCheck {
    /// Take the commit of the line above the insertion
    Above,
    /// Take the commit of the line below the insertion
    Below,
    /// Take the commit only if the lines above and below agree
    #[default]
    Around,
    /// Take the most recent commit among the lines above and below
    Recent,
}

impl InsertCheck {
    pub fn as_str(&self) -> &'static str {
        match self {
            InsertCheck::Above => "above",
            InsertCheck::Below => "below",
            InsertCheck::Around => "around",
            InsertCheck::Recent => "recent",
        }
    }
}

impl FromStr for InsertCheck {
    type Err = GitAutofixupError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.trim().to_lowercase().as_str() {
            "above" => Ok(InsertCheck::Above),
            "below" => Ok(InsertCheck::Below),
            "around" => Ok(InsertCheck::Around),
            "recent" => Ok(InsertCheck::Recent),
            _ => Err(GitAutofixupError::InvalidInsertCheck(input.to_string())),
        }
    }
}

/// The closed set of options a single run is configured with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AutofixupOptions {
    /// Ref whose merge-base with HEAD is the oldest commit the run may not alter
    pub rebase_limit: String,
    pub insert_checks: InsertCheck,
}

impl AutofixupOptions {
    pub fn new(rebase_limit: impl Into<String>, insert_checks: InsertCheck) -> Self {
        AutofixupOptions {
            rebase_limit: rebase_limit.into(),
            insert_checks,
        }
    }

    /// Build options from CLI values, falling back to the process configuration.
    /// Unknown policy names are rejected here rather than mid-run.
    pub fn resolve(
        rebase_limit: Option<String>,
        insert_checks: Option<&str>,
    ) -> Result<Self, GitAutofixupError> {
        let config = Config::get();
        let insert_checks = match insert_checks {
            Some(value) => InsertCheck::from_str(value)?,
            None => config.insert_checks(),
        };
        Ok(AutofixupOptions {
            rebase_limit: rebase_limit.unwrap_or_else(|| config.rebase_limit().to_string()),
            insert_checks,
        })
    }
}

impl Default for AutofixupOptions {
    fn default() -> Self {
        AutofixupOptions::new(DEFAULT_REBASE_LIMIT, InsertCheck::default())
    }
}

pub struct Config {
    git_path: String,
    rebase_limit: String,
    insert_checks: InsertCheck,
}

#[derive(Deserialize, Default)]
pub struct FileConfig {
    #[serde(default)]
    pub git_path: Option<String>,
    #[serde(default)]
    pub rebase_limit: Option<String>,
    #[serde(default)]
    pub insert_checks: Option<String>,
}

static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    /// Access the global configuration. Lazily initializes if not already initialized.
    pub fn get() -> &'static Config {
        CONFIG.get_or_init(|| build_config(load_file_config()))
    }

    /// Returns the command to invoke git.
    pub fn git_cmd(&self) -> &str {
        &self.git_path
    }

    pub fn rebase_limit(&self) -> &str {
        &self.rebase_limit
    }

    pub fn insert_checks(&self) -> InsertCheck {
        self.insert_checks
    }
}

fn build_config(file_cfg: Option<FileConfig>) -> Config {
    let git_path = resolve_git_path(&file_cfg);

    // Env var takes precedence over the config file
    let rebase_limit = env::var("GIT_AUTOFIXUP_REBASE_LIMIT")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .or_else(|| {
            file_cfg
                .as_ref()
                .and_then(|c| c.rebase_limit.clone())
                .filter(|s| !s.trim().is_empty())
        })
        .unwrap_or_else(|| DEFAULT_REBASE_LIMIT.to_string());

    let insert_checks = env::var("GIT_AUTOFIXUP_INSERT_CHECKS")
        .ok()
        .or_else(|| file_cfg.as_ref().and_then(|c| c.insert_checks.clone()))
        .map(|value| match InsertCheck::from_str(&value) {
            Ok(check) => check,
            Err(e) => {
                eprintln!("Warning: {}, using 'around'", e);
                InsertCheck::default()
            }
        })
        .unwrap_or_default();

    Config {
        git_path,
        rebase_limit,
        insert_checks,
    }
}

fn resolve_git_path(file_cfg: &Option<FileConfig>) -> String {
    // 1) From config file
    if let Some(path) = file_cfg.as_ref().and_then(|c| c.git_path.as_ref()) {
        let trimmed = path.trim();
        if !trimmed.is_empty() && is_executable(Path::new(trimmed)) {
            return trimmed.to_string();
        }
    }

    // 2) Probe common locations across platforms
    let candidates: &[&str] = &[
        "/opt/homebrew/bin/git",
        "/usr/local/bin/git",
        "/usr/bin/git",
        "/bin/git",
        r"C:\\Program Files\\Git\\bin\\git.exe",
        r"C:\\Program Files (x86)\\Git\\bin\\git.exe",
    ];

    if let Some(found) = candidates.iter().map(Path::new).find(|p| is_executable(p)) {
        return found.to_string_lossy().to_string();
    }

    // 3) Let the OS resolve it from PATH
    "git".to_string()
}

fn is_executable(path: &Path) -> bool {
    if !path.exists() || !path.is_file() {
        return false;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Ok(meta) = fs::metadata(path) {
            return meta.permissions().mode() & 0o111 != 0;
        }
        false
    }
    #[cfg(not(unix))]
    {
        true
    }
}

fn load_file_config() -> Option<FileConfig> {
    let path = config_file_path()?;
    match read_file_config(&path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Warning: ignoring config {}: {}", path.display(), e);
            None
        }
    }
}

/// `Ok(None)` when the file does not exist.
fn read_file_config(path: &Path) -> Result<Option<FileConfig>, GitAutofixupError> {
    let data = match fs::read(path) {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    Ok(Some(serde_json::from_slice::<FileConfig>(&data)?))
}

pub fn config_file_path() -> Option<PathBuf> {
    let home = dirs::home_dir()?;
    Some(home.join(".git-autofixup").join("config.json"))
}
