use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Placeholder used when a source reports no authors.
pub const UNKNOWN_AUTHOR: &str = "Unknown";

/// Number of authors shown before the list is cut with ", et al.".
pub const DISPLAY_AUTHOR_LIMIT: usize = 5;

// ─── Paper ──────────────────────────────────────────────────

/// A paper as reported by one source. `url` is the identity used to
/// recognise papers that were already delivered in an earlier run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paper {
    pub title: String,
    pub authors: Vec<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    /// Empty until enrichment; either two canonical lines or one heuristic sentence.
    #[serde(default)]
    pub impact: String,
    pub url: String,
    pub source: String,
    pub published: DateTime<Utc>,
}

impl Paper {
    /// Build a freshly fetched paper. Blank author names are dropped and an
    /// empty list becomes `["Unknown"]`.
    pub fn new(
        title: impl Into<String>,
        authors: Vec<String>,
        abstract_text: impl Into<String>,
        url: impl Into<String>,
        source: impl Into<String>,
        published: DateTime<Utc>,
    ) -> Self {
        let mut authors: Vec<String> = authors
            .into_iter()
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .collect();
        if authors.is_empty() {
            authors.push(UNKNOWN_AUTHOR.to_string());
        }

        Self {
            title: title.into(),
            authors,
            abstract_text: abstract_text.into(),
            impact: String::new(),
            url: url.into(),
            source: source.into(),
            published,
        }
    }

    pub fn has_impact(&self) -> bool {
        !self.impact.trim().is_empty()
    }

    /// Up to five authors joined by ", ", with ", et al." appended when cut.
    pub fn display_authors(&self) -> String {
        let mut out = self
            .authors
            .iter()
            .take(DISPLAY_AUTHOR_LIMIT)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        if self.authors.len() > DISPLAY_AUTHOR_LIMIT {
            out.push_str(", et al.");
        }
        out
    }

    /// Publication date without time, `YYYY-MM-DD`.
    pub fn published_date(&self) -> String {
        self.published.date_naive().to_string()
    }

    /// Non-empty lines of the impact field.
    pub fn impact_lines(&self) -> impl Iterator<Item = &str> {
        self.impact
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
    }
}
