//! Sectioned keyword rules (`AUTHOR` / `TITLE` / `ABSTRACT`).
//!
//! ```text
//! # comment
//! TITLE
//! quantum*
//! surface code
//! AUTHOR
//! Preskill
//! ```
//!
//! A paper is admitted when any non-empty section has a matching pattern.

use std::path::Path;

use regex::{Regex, RegexBuilder};

use crate::error::Result;
use crate::paper::Paper;
use crate::text_file::read_lines;

// ─── Matcher ────────────────────────────────────────────────

/// One keyword pattern, compiled as a case-insensitive regex when possible,
/// otherwise matched literally with `*` standing for any run of characters.
#[derive(Debug, Clone)]
pub enum Matcher {
    Pattern(Regex),
    Wildcard(WildcardPattern),
}

impl Matcher {
    pub fn compile(raw: &str) -> Self {
        match RegexBuilder::new(raw).case_insensitive(true).build() {
            Ok(re) => Self::Pattern(re),
            Err(_) => Self::Wildcard(WildcardPattern::new(raw)),
        }
    }

    pub fn matches(&self, text: &str) -> bool {
        match self {
            Self::Pattern(re) => re.is_match(text),
            Self::Wildcard(pattern) => pattern.matches(text),
        }
    }
}

/// Literal text split on `*`; the pieces must occur in order anywhere in the haystack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WildcardPattern {
    pieces: Vec<String>,
}

impl WildcardPattern {
    pub fn new(raw: &str) -> Self {
        let pieces = raw
            .split('*')
            .filter(|piece| !piece.is_empty())
            .map(str::to_lowercase)
            .collect();
        Self { pieces }
    }

    pub fn matches(&self, text: &str) -> bool {
        let haystack = text.to_lowercase();
        let mut cursor = 0;
        for piece in &self.pieces {
            match haystack[cursor..].find(piece.as_str()) {
                Some(offset) => cursor += offset + piece.len(),
                None => return false,
            }
        }
        true
    }
}

// ─── Rules ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Author,
    Title,
    Abstract,
}

impl Section {
    fn from_header(line: &str) -> Option<Self> {
        match line.to_uppercase().as_str() {
            "AUTHOR" => Some(Self::Author),
            "TITLE" => Some(Self::Title),
            "ABSTRACT" => Some(Self::Abstract),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct KeywordRules {
    pub author: Vec<Matcher>,
    pub title: Vec<Matcher>,
    pub abstract_text: Vec<Matcher>,
}

impl KeywordRules {
    /// Load rules from `path`. A missing file yields empty rules (admit everything).
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let lines = read_lines(path)?;
        Ok(Self::parse(&lines.join("\n")))
    }

    pub fn parse(contents: &str) -> Self {
        let mut rules = Self::default();
        let mut active: Option<Section> = None;

        for raw_line in contents.lines() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some(section) = Section::from_header(line) {
                active = Some(section);
                continue;
            }

            let matcher = Matcher::compile(line);
            match active {
                Some(Section::Author) => rules.author.push(matcher),
                Some(Section::Title) => rules.title.push(matcher),
                Some(Section::Abstract) => rules.abstract_text.push(matcher),
                None => {}
            }
        }

        rules
    }

    pub fn keyword_count(&self) -> usize {
        self.author.len() + self.title.len() + self.abstract_text.len()
    }

    pub fn has_rules(&self) -> bool {
        self.keyword_count() > 0
    }

    /// OR across non-empty sections; empty rules admit everything.
    pub fn matches(&self, paper: &Paper) -> bool {
        if !self.has_rules() {
            return true;
        }

        let author_hit = self
            .author
            .iter()
            .any(|m| paper.authors.iter().any(|a| m.matches(a)));
        let title_hit = self.title.iter().any(|m| m.matches(&paper.title));
        let abstract_hit = self
            .abstract_text
            .iter()
            .any(|m| m.matches(&paper.abstract_text));

        author_hit || title_hit || abstract_hit
    }

    pub fn filter(&self, papers: Vec<Paper>) -> Vec<Paper> {
        if !self.has_rules() {
            return papers;
        }
        papers.into_iter().filter(|p| self.matches(p)).collect()
    }
}
