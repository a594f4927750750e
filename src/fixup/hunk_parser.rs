use std::sync::OnceLock;

use regex::Regex;

use crate::error::GitAutofixupError;
use crate::fixup::transformation::Transformation;
use crate::utils::split_lines;

static HUNK_HEADER: OnceLock<Regex> = OnceLock::new();

fn hunk_header_regex() -> &'static Regex {
    HUNK_HEADER.get_or_init(|| {
        Regex::new(r"^@@ -(\d+)(?:,(\d+))? \+(\d+)(?:,(\d+))? @@").expect("valid hunk header regex")
    })
}

fn parse_count(
    captures: &regex::Captures<'_>,
    group: usize,
    header: &str,
) -> Result<usize, GitAutofixupError> {
    match captures.get(group) {
        Some(m) => m.as_str().parse::<usize>().map_err(|e| {
            GitAutofixupError::Generic(format!("Bad number in hunk header '{}': {}", header, e))
        }),
        // A missing count means a single line
        None => Ok(1),
    }
}

/// Parse the zero-context diff of one staged file into one transformation per hunk,
/// in source order.
///
/// Hunk headers look like `@@ -A[,B] +C[,D] @@`:
/// - `@@ -15 +15 @@`: line 15 became line 15
/// - `@@ -15,2 +15,3 @@`: lines 15-16 became lines 15-17
/// - `@@ -15,0 +16,2 @@`: two lines were inserted after line 15
///
/// Insertions are normalized to sit before line A+1, so every transformation
/// describes its position the same way. `staged_content` provides the
/// replacement lines; without it `into_lines` stays unset.
pub fn parse_transformations(
    path: &str,
    diff: &str,
    staged_content: Option<&[u8]>,
) -> Result<Vec<Transformation>, GitAutofixupError> {
    let staged_lines = staged_content.map(split_lines);
    let mut transformations = Vec::new();

    for line in diff.lines() {
        let Some(captures) = hunk_header_regex().captures(line) else {
            continue;
        };

        let from_start = parse_count(&captures, 1, line)?;
        let from_count = parse_count(&captures, 2, line)?;
        let into_start = parse_count(&captures, 3, line)?;
        let into_count = parse_count(&captures, 4, line)?;

        // "after line A" becomes "before line A+1", i.e. 0-indexed A
        let from_first_line = if from_count == 0 {
            from_start
        } else {
            from_start.saturating_sub(1)
        };

        let into_lines = match &staged_lines {
            Some(lines) => {
                let into_first = into_start.saturating_sub(1);
                let into_range = if into_count == 0 {
                    into_first..into_first
                } else {
                    into_first..into_first + into_count
                };
                let slice = lines.get(into_range).ok_or_else(|| {
                    GitAutofixupError::Generic(format!(
                        "Hunk '{}' is out of bounds for staged {} ({} lines)",
                        line,
                        path,
                        lines.len()
                    ))
                })?;
                Some(slice.to_vec())
            }
            None => None,
        };

        transformations.push(Transformation {
            path: path.to_string(),
            from_first_line,
            from_line_count: from_count,
            into_lines,
        });
    }

    Ok(transformations)
}
