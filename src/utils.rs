/// Check if debug logging is enabled via environment variable
///
/// This is checked once to avoid repeated environment variable lookups.
static DEBUG_ENABLED: std::sync::OnceLock<bool> = std::sync::OnceLock::new();

fn is_debug_enabled() -> bool {
    *DEBUG_ENABLED.get_or_init(|| {
        (cfg!(debug_assertions) || std::env::var("GIT_AUTOFIXUP_DEBUG").unwrap_or_default() == "1")
            && std::env::var("GIT_AUTOFIXUP_DEBUG").unwrap_or_default() != "0"
    })
}

/// Debug logging utility function
///
/// Prints debug messages with a colored prefix when debug assertions are enabled or when
/// the `GIT_AUTOFIXUP_DEBUG` environment variable is set to "1".
pub fn debug_log(msg: &str) {
    if is_debug_enabled() {
        eprintln!("\x1b[1;33m[git-autofixup]\x1b[0m {}", msg);
    }
}

/// Split file content into lines, keeping each line's terminator.
///
/// A trailing line without a newline is kept as-is, so joining the result
/// reproduces the input byte for byte.
pub fn split_lines(content: &[u8]) -> Vec<Vec<u8>> {
    content
        .split_inclusive(|b| *b == b'\n')
        .map(|line| line.to_vec())
        .collect()
}

pub fn short_sha(sha: &str) -> &str {
    if sha.len() > 7 { &sha[..7] } else { sha }
}
