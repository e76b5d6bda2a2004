//! Line reading for hand-edited text files (keyword rules, sent log).

use std::path::Path;

use tracing::warn;

use crate::error::Result;

/// Read `path` line by line. A line that is not valid UTF-8 is skipped with a
/// warning instead of failing the whole read.
pub(crate) fn read_lines(path: &Path) -> Result<Vec<String>> {
    let bytes = std::fs::read(path)?;
    let mut lines = Vec::new();

    for (index, raw) in bytes.split(|&b| b == b'\n').enumerate() {
        let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
        match std::str::from_utf8(raw) {
            Ok(line) => lines.push(line.to_string()),
            Err(err) => warn!(
                path = %path.display(),
                line = index + 1,
                error = %err,
                "skipping line that is not valid UTF-8"
            ),
        }
    }

    Ok(lines)
}
