//! Append-only log of delivered papers; doubles as the cross-run dedup store.
//!
//! Block format, one block per delivering run:
//!
//! ```text
//! 2024-03-05T01:00:00.123456+00:00 matched_papers=2
//! - <title> | <authors> | <source> | <YYYY-MM-DD> | <url>
//! - <title> | <authors> | <source> | <YYYY-MM-DD> | <url>
//! ```
//!
//! The reader takes the url from the last ` | ` field, so [`format_entry`]
//! and [`parse_entry_url`] must change together.

use std::collections::HashSet;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::Result;
use crate::normalize::collapse_whitespace;
use crate::paper::Paper;
use crate::text_file::read_lines;

const ENTRY_PREFIX: &str = "- ";
const FIELD_SEPARATOR: &str = " | ";
const MIN_FIELDS: usize = 5;

#[derive(Debug, Clone)]
pub struct SentLog {
    path: PathBuf,
}

impl SentLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// An empty path disables the log.
    pub fn is_disabled(&self) -> bool {
        self.path.as_os_str().is_empty()
    }

    /// URLs of every paper recorded so far. Malformed lines are skipped.
    pub fn load_urls(&self) -> Result<HashSet<String>> {
        if self.is_disabled() || !self.path.exists() {
            return Ok(HashSet::new());
        }

        let lines = read_lines(&self.path)?;
        Ok(lines.iter().filter_map(|line| parse_entry_url(line)).collect())
    }

    /// Append one block for `papers`. Parent directories are created as needed;
    /// the block is written with a single call.
    pub fn append(&self, papers: &[Paper], at: DateTime<Utc>) -> Result<()> {
        if self.is_disabled() {
            return Ok(());
        }

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let block = format_block(papers, at);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(block.as_bytes())?;
        Ok(())
    }
}

/// Header line plus one entry per paper, newline-terminated.
pub fn format_block(papers: &[Paper], at: DateTime<Utc>) -> String {
    let mut lines = Vec::with_capacity(papers.len() + 1);
    lines.push(format!(
        "{} matched_papers={}",
        at.to_rfc3339_opts(SecondsFormat::Micros, false),
        papers.len()
    ));
    lines.extend(papers.iter().map(format_entry));

    let mut block = lines.join("\n");
    block.push('\n');
    block
}

pub fn format_entry(paper: &Paper) -> String {
    let fields = [
        collapse_whitespace(&paper.title),
        collapse_whitespace(&paper.display_authors()),
        collapse_whitespace(&paper.source),
        paper.published_date(),
        paper.url.trim().to_string(),
    ];
    format!("{ENTRY_PREFIX}{}", fields.join(FIELD_SEPARATOR))
}

/// The url of a well-formed entry line, `None` for headers and malformed lines.
pub fn parse_entry_url(line: &str) -> Option<String> {
    let line = line.trim();
    if !line.starts_with(ENTRY_PREFIX) {
        return None;
    }
    let fields: Vec<&str> = line.split(FIELD_SEPARATOR).collect();
    if fields.len() < MIN_FIELDS {
        return None;
    }
    let url = fields.last()?.trim();
    if url.is_empty() {
        return None;
    }
    Some(url.to_string())
}

/// Papers whose url has not been delivered before.
pub fn filter_unsent(papers: Vec<Paper>, sent: &HashSet<String>) -> Vec<Paper> {
    if sent.is_empty() {
        return papers;
    }
    papers
        .into_iter()
        .filter(|p| !sent.contains(&p.url))
        .collect()
}
