use std::collections::HashSet;

use serde_json::{Map, Value, json};

use crate::config::{DeliveryConfig, WebhookMode};
use crate::paper::Paper;

const SUMMARY_AUTHOR_LIMIT: usize = 10;
const SUMMARY_TITLE: &str = "Daily paper summary";

/// Human-readable multi-paper digest.
pub fn format_digest(papers: &[Paper]) -> String {
    let mut lines = vec![format!("**Daily paper digest ({})**", papers.len())];

    for (idx, paper) in papers.iter().enumerate() {
        let n = idx + 1;
        lines.push(String::new());
        if n > 1 {
            lines.push("---".to_string());
        }
        lines.push(format!("**{n}) {}**", paper.title));
        lines.push(format!("**Authors:** {}", paper.display_authors()));
        lines.push(format!(
            "**Source:** {} | **Date:** {}",
            paper.source,
            paper.published_date()
        ));
        lines.push(format!("**Abstract:** {}", paper.abstract_text));
        if paper.has_impact() {
            lines.push("**Impact:**".to_string());
            lines.extend(paper.impact_lines().map(|line| format!("- {line}")));
        }
        lines.push(format!("**URL:** {}", paper.url));
    }

    lines.join("\n")
}

/// First-seen unique authors across all papers, capped at ten.
pub fn summarize_authors(papers: &[Paper]) -> String {
    let mut seen = HashSet::new();
    let mut names: Vec<&str> = Vec::new();

    for author in papers.iter().flat_map(|p| p.authors.iter()) {
        if !seen.insert(author.as_str()) {
            continue;
        }
        if names.len() == SUMMARY_AUTHOR_LIMIT {
            return format!("{}, et al.", names.join(", "));
        }
        names.push(author);
    }

    if names.is_empty() {
        "Multiple authors".to_string()
    } else {
        names.join(", ")
    }
}

/// Per-paper description: cleaned abstract, then the impact block if any.
pub fn paper_description(paper: &Paper) -> String {
    if !paper.has_impact() {
        return paper.abstract_text.clone();
    }
    let impact = paper
        .impact_lines()
        .map(|line| format!("- {line}"))
        .collect::<Vec<_>>()
        .join("\n");
    format!("{}\n\nImpact:\n{impact}", paper.abstract_text)
}

/// JSON bodies to post, in order.
///
/// Bot mode sends one text message; flow mode sends either one summary
/// payload or one payload per paper, keyed by the configured field names.
pub fn build_payloads(papers: &[Paper], delivery: &DeliveryConfig) -> Vec<Value> {
    match delivery.mode {
        WebhookMode::Bot => vec![json!({
            "msg_type": "text",
            "content": { "text": format_digest(papers) },
        })],
        WebhookMode::Flow if delivery.flow_single_summary => vec![flow_payload(
            delivery,
            SUMMARY_TITLE.to_string(),
            summarize_authors(papers),
            format_digest(papers),
        )],
        WebhookMode::Flow => papers
            .iter()
            .map(|paper| {
                flow_payload(
                    delivery,
                    paper.title.clone(),
                    paper.authors.join(", "),
                    paper_description(paper),
                )
            })
            .collect(),
    }
}

fn flow_payload(
    delivery: &DeliveryConfig,
    title: String,
    authors: String,
    description: String,
) -> Value {
    let fields = &delivery.flow_fields;
    let mut body = Map::new();
    body.insert(fields.title.clone(), Value::String(title));
    body.insert(fields.authors.clone(), Value::String(authors));
    body.insert(fields.description.clone(), Value::String(description));
    Value::Object(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn paper(title: &str, authors: &[&str], impact: &str) -> Paper {
        let mut p = Paper::new(
            title,
            authors.iter().map(|a| a.to_string()).collect(),
            "Clean abstract.",
            format!("https://x/{title}"),
            "arXiv",
            Utc.with_ymd_and_hms(2024, 3, 4, 8, 0, 0).unwrap(),
        );
        p.impact = impact.to_string();
        p
    }

    #[test]
    fn digest_without_impact_omits_block() {
        let text = format_digest(&[paper("One", &["Ada"], "")]);
        assert!(!text.contains("Impact"));
        assert_eq!(
            text,
            "**Daily paper digest (1)**\n\n**1) One**\n**Authors:** Ada\n**Source:** arXiv | **Date:** 2024-03-04\n**Abstract:** Clean abstract.\n**URL:** https://x/One"
        );
    }

    #[test]
    fn digest_renders_two_impact_bullets() {
        let impact = "Scientific impact: A.\nSocial or industry impact: B.";
        let text = format_digest(&[paper("One", &["Ada"], impact)]);
        let bullets: Vec<&str> = text.lines().filter(|l| l.starts_with("- ")).collect();
        assert_eq!(
            bullets,
            vec!["- Scientific impact: A.", "- Social or industry impact: B."]
        );
        let impact_pos = text.find("**Impact:**").unwrap();
        assert!(impact_pos < text.find("**URL:**").unwrap());
    }

    #[test]
    fn digest_separates_papers() {
        let text = format_digest(&[paper("One", &["A"], ""), paper("Two", &["B"], "")]);
        assert!(text.starts_with("**Daily paper digest (2)**"));
        assert!(text.contains("\n\n---\n**2) Two**"));
    }

    #[test]
    fn summarize_authors_first_seen_order() {
        let papers = vec![paper("1", &["Bo", "Ada"], ""), paper("2", &["Ada", "Cy"], "")];
        assert_eq!(summarize_authors(&papers), "Bo, Ada, Cy");
    }

    #[test]
    fn summarize_authors_caps_at_ten() {
        let many: Vec<String> = (1..=12).map(|i| format!("N{i}")).collect();
        let refs: Vec<&str> = many.iter().map(String::as_str).collect();
        let out = summarize_authors(&[paper("1", &refs, "")]);
        assert!(out.ends_with("N10, et al."));
        assert!(!out.contains("N11"));
    }

    #[test]
    fn summarize_authors_exactly_ten_is_not_truncated() {
        let ten: Vec<String> = (1..=10).map(|i| format!("N{i}")).collect();
        let refs: Vec<&str> = ten.iter().map(String::as_str).collect();
        let out = summarize_authors(&[paper("1", &refs, ""), paper("2", &["N3"], "")]);
        assert!(out.ends_with("N9, N10"));
        assert!(!out.contains("et al."));
    }

    #[test]
    fn summarize_authors_empty() {
        assert_eq!(summarize_authors(&[]), "Multiple authors");
    }

    #[test]
    fn bot_payload_shape() {
        let payloads = build_payloads(&[paper("One", &["Ada"], "")], &DeliveryConfig::default());
        assert_eq!(payloads.len(), 1);
        assert_eq!(payloads[0]["msg_type"], "text");
        assert!(payloads[0]["content"]["text"].as_str().unwrap().contains("**1) One**"));
    }

    #[test]
    fn flow_single_summary_payload() {
        let delivery = DeliveryConfig {
            mode: WebhookMode::Flow,
            ..DeliveryConfig::default()
        };
        let payloads = build_payloads(&[paper("One", &["Ada"], ""), paper("Two", &["Bo"], "")], &delivery);
        assert_eq!(payloads.len(), 1);
        assert_eq!(payloads[0]["paper_title"], "Daily paper summary");
        assert_eq!(payloads[0]["authors"], "Ada, Bo");
        assert!(payloads[0]["description"].as_str().unwrap().contains("**2) Two**"));
    }

    #[test]
    fn flow_per_paper_payloads_use_custom_fields() {
        let mut delivery = DeliveryConfig {
            mode: WebhookMode::Flow,
            flow_single_summary: false,
            ..DeliveryConfig::default()
        };
        delivery.flow_fields.title = "t".to_string();
        let impact = "Scientific impact: A.\nSocial or industry impact: B.";
        let payloads = build_payloads(
            &[paper("One", &["Ada", "Bo"], impact), paper("Two", &["Cy"], "")],
            &delivery,
        );
        assert_eq!(payloads.len(), 2);
        assert_eq!(payloads[0]["t"], "One");
        assert_eq!(payloads[0]["authors"], "Ada, Bo");
        assert_eq!(
            payloads[0]["description"],
            "Clean abstract.\n\nImpact:\n- Scientific impact: A.\n- Social or industry impact: B."
        );
        assert_eq!(payloads[1]["description"], "Clean abstract.");
    }
}
