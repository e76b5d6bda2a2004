use chrono::{DateTime, Utc};
use paper_notifier_core::Paper;
use quick_xml::de::from_str;
use serde::Deserialize;
use tracing::warn;

use crate::error::{NetError, Result};

pub const SOURCE_NAME: &str = "arXiv";

#[derive(Debug, Deserialize)]
struct AtomFeed {
    #[serde(rename = "entry", default)]
    entries: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    #[serde(default)]
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    published: String,
    #[serde(rename = "author", default)]
    authors: Vec<AtomAuthor>,
    #[serde(rename = "link", default)]
    links: Vec<AtomLink>,
}

#[derive(Debug, Deserialize)]
struct AtomAuthor {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href")]
    href: Option<String>,
    #[serde(rename = "@rel")]
    rel: Option<String>,
}

/// Parse an arXiv API Atom response. Entries without a valid `published`
/// timestamp are skipped.
pub fn parse_atom_response(xml: &str) -> Result<Vec<Paper>> {
    let feed: AtomFeed =
        from_str(xml).map_err(|e| NetError::Parse(format!("invalid atom xml: {e}")))?;

    Ok(feed.entries.into_iter().filter_map(parse_entry).collect())
}

fn parse_entry(entry: AtomEntry) -> Option<Paper> {
    let published = match parse_rfc3339(&entry.published) {
        Some(published) => published,
        None => {
            warn!(id = %entry.id, published = %entry.published, "skipping arXiv entry with bad date");
            return None;
        }
    };

    let url = entry
        .links
        .iter()
        .find(|link| link.rel.as_deref().is_none_or(|rel| rel == "alternate"))
        .and_then(|link| link.href.as_deref())
        .unwrap_or(entry.id.as_str());

    let authors = entry
        .authors
        .into_iter()
        .map(|author| clean_text(&author.name))
        .collect();

    Some(Paper::new(
        clean_text(&entry.title),
        authors,
        entry.summary.trim(),
        normalize_arxiv_url(url.trim()),
        SOURCE_NAME,
        published,
    ))
}

fn parse_rfc3339(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn clean_text(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn normalize_arxiv_url(url: &str) -> String {
    if let Some(rest) = url.strip_prefix("http://arxiv.org/") {
        return format!("https://arxiv.org/{rest}");
    }
    url.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUBIT_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom"
      xmlns:opensearch="http://a9.com/-/spec/opensearch/1.1/"
      xmlns:arxiv="http://arxiv.org/schemas/atom">
  <id>http://arxiv.org/api/query?search_query=all:qubit</id>
  <title>ArXiv Query</title>
  <updated>2024-03-05T00:00:00Z</updated>
  <entry>
    <id>http://arxiv.org/abs/2403.01234v1</id>
    <updated>2024-03-04T17:00:00Z</updated>
    <published>2024-03-04T17:00:00Z</published>
    <title>
      Fast Qubit
      Readout
    </title>
    <summary>
      We demonstrate   fast readout.
    </summary>
    <author>
      <name>Ada Lovelace</name>
      <arxiv:affiliation>Analytical Engines</arxiv:affiliation>
    </author>
    <author>
      <name>Alan Turing</name>
    </author>
    <link href="http://arxiv.org/abs/2403.01234v1" rel="alternate" type="text/html"/>
    <link title="pdf" href="http://arxiv.org/pdf/2403.01234v1" rel="related" type="application/pdf"/>
    <arxiv:primary_category term="quant-ph" scheme="http://arxiv.org/schemas/atom"/>
    <category term="quant-ph" scheme="http://arxiv.org/schemas/atom"/>
  </entry>
  <entry>
    <id>http://arxiv.org/abs/2403.09999v1</id>
    <published>not a date</published>
    <title>Broken</title>
    <summary>Nothing</summary>
  </entry>
</feed>
"#;

    #[test]
    fn parses_entry_fields() {
        let papers = parse_atom_response(QUBIT_XML).unwrap();
        assert_eq!(papers.len(), 1);

        let paper = &papers[0];
        assert_eq!(paper.title, "Fast Qubit Readout");
        assert_eq!(paper.authors, vec!["Ada Lovelace", "Alan Turing"]);
        assert_eq!(paper.abstract_text, "We demonstrate   fast readout.");
        assert_eq!(paper.url, "https://arxiv.org/abs/2403.01234v1");
        assert_eq!(paper.source, "arXiv");
        assert_eq!(paper.published.to_rfc3339(), "2024-03-04T17:00:00+00:00");
    }

    #[test]
    fn entry_without_authors_is_unknown() {
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom"><entry>
            <id>http://arxiv.org/abs/1</id>
            <published>2024-03-04T17:00:00Z</published>
            <title>T</title><summary>S</summary>
        </entry></feed>"#;
        let papers = parse_atom_response(xml).unwrap();
        assert_eq!(papers[0].authors, vec!["Unknown"]);
        assert_eq!(papers[0].url, "https://arxiv.org/abs/1");
    }

    #[test]
    fn empty_feed_has_no_papers() {
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom"><title>ArXiv Query</title></feed>"#;
        assert!(parse_atom_response(xml).unwrap().is_empty());
    }
}
