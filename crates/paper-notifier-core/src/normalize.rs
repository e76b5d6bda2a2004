//! Cleaning of noisy abstracts and canonicalisation of impact statements.
//!
//! Source feeds wrap abstracts in markup, entity escapes, arXiv announcement
//! headers, DOI citations and "published online" clauses. Generated impact
//! text arrives as labelled sections, bullet lists, or bare lines. Both are
//! reduced here to one stable plain-text form.

use once_cell::sync::Lazy;
use regex::Regex;

/// Default character budget for a cleaned abstract.
pub const ABSTRACT_LIMIT: usize = 380;

pub const SCIENTIFIC_PREFIX: &str = "Scientific impact: ";
pub const SOCIAL_PREFIX: &str = "Social or industry impact: ";

pub const SCIENTIFIC_FALLBACK: &str =
    "Provides a potentially useful technical contribution that merits further validation.";
pub const SOCIAL_FALLBACK: &str =
    "May have downstream practical relevance if the findings are validated and adopted.";

/// Preamble before an "abstract:" marker is dropped only when shorter than this.
const MARKER_PREAMBLE_MAX: usize = 160;

/// Upper bound on strip passes; every effective pass shortens the text.
const MAX_STRIP_PASSES: usize = 8;

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));
static ABSTRACT_MARKER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\babstract\s*:\s*").expect("valid regex"));
static ARXIV_PREFIX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*arxiv\s*:\s*\S+\s*(?:announce\s*type\s*:\s*[^:]+)?\s*")
        .expect("valid regex")
});
static SUMMARY_LABEL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*summary\s*:\s*").expect("valid regex"));
static ABSTRACT_LABEL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*abstract\s*:\s*").expect("valid regex"));
static PUBLISHED_ONLINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*[^.]{0,120}?\bpublished\s+online\b[^.;]*(?:;|\.(?:\s|$))\s*")
        .expect("valid regex")
});
static DOI_LEADING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*doi\s*[:\s]\s*10\.\S+\s*").expect("valid regex"));
static DOI_CITATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*[^.]{0,140}?\bdoi\s*[:\s]\s*10\.\S+\s*").expect("valid regex")
});
static BARE_DOI_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(?:doi\s*[:\s]*)?(?:10\.)?\d{3,9}/\S+\s*").expect("valid regex")
});
static LEADING_PUNCT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*[,;:\-]+\s*").expect("valid regex"));

static BOLD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*+").expect("valid regex"));
static WORD_COUNT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\(\s*(?:~|about\s+|approx\.?\s*)?\d+\s*(?:[-–]\s*\d+\s*)?words?\s*\)")
        .expect("valid regex")
});
static METADATA_PREAMBLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^\s*based\s+on\s+the\s+paper\s+metadata\s*:\s*").expect("valid regex")
});
static IMPACT_LABEL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:(scientific)|(social\s+or\s+industry|social\s+and\s+industry|social\s*/\s*industry|societal|social|industry))\s+impact\s*:",
    )
    .expect("valid regex")
});
static BULLET_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(?:[-*•·]+\s*|\d+[.)]\s+)").expect("valid regex"));

// ─── Abstract ───────────────────────────────────────────────

/// Clean a raw abstract and cut it to `limit` characters (ellipsis included).
///
/// Decodes entities, drops tags, collapses whitespace, discards a short
/// preamble before an "abstract:" marker and strips leading boilerplate.
/// The whole clean-and-truncate pass repeats until its output is stable, so
/// `extract_abstract(&extract_abstract(x, n), n) == extract_abstract(x, n)`.
pub fn extract_abstract(raw: &str, limit: usize) -> String {
    let mut current = clean_pass(raw, limit);
    for _ in 0..MAX_STRIP_PASSES {
        let next = clean_pass(&current, limit);
        if next == current {
            break;
        }
        current = next;
    }
    current
}

fn clean_pass(raw: &str, limit: usize) -> String {
    let decoded = html_escape::decode_html_entities(raw);
    let mut cleaned = collapse_whitespace(&TAG_RE.replace_all(&decoded, " "));

    for _ in 0..MAX_STRIP_PASSES {
        let next = strip_boilerplate(&drop_marker_preamble(&cleaned));
        if next == cleaned {
            break;
        }
        cleaned = next;
    }

    truncate_chars(&cleaned, limit)
}

fn drop_marker_preamble(text: &str) -> String {
    let Some(first) = ABSTRACT_MARKER_RE.find(text) else {
        return text.to_string();
    };
    if text[..first.start()].chars().count() >= MARKER_PREAMBLE_MAX {
        return text.to_string();
    }
    // Keep what follows the last marker.
    ABSTRACT_MARKER_RE
        .split(text)
        .last()
        .unwrap_or_default()
        .trim()
        .to_string()
}

fn strip_boilerplate(text: &str) -> String {
    let steps: [&Regex; 8] = [
        &ARXIV_PREFIX_RE,
        &SUMMARY_LABEL_RE,
        &ABSTRACT_LABEL_RE,
        &PUBLISHED_ONLINE_RE,
        &DOI_LEADING_RE,
        &DOI_CITATION_RE,
        &BARE_DOI_RE,
        &LEADING_PUNCT_RE,
    ];

    let mut out = text.to_string();
    for re in steps {
        out = re.replace(&out, "").into_owned();
    }
    collapse_whitespace(&out)
}

fn truncate_chars(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let keep = limit.saturating_sub(3);
    let head: String = text.chars().take(keep).collect();
    format!("{}...", head.trim_end())
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ─── Impact ─────────────────────────────────────────────────

/// Reduce free-form impact text to exactly two canonical lines:
///
/// ```text
/// Scientific impact: ...
/// Social or industry impact: ...
/// ```
///
/// Returns an empty string when nothing usable remains.
pub fn normalize_impact_text(raw: &str) -> String {
    let text = raw.replace("\r\n", "\n").replace('\r', "\n");
    let text = BOLD_RE.replace_all(&text, "");
    let text = WORD_COUNT_RE.replace_all(&text, "");
    let text = METADATA_PREAMBLE_RE.replace_all(&text, "");

    if text.trim().is_empty() {
        return String::new();
    }

    let (scientific, social) = match labelled_sections(&text) {
        Some(sections) => sections,
        None => {
            let mut lines = text
                .lines()
                .map(|line| BULLET_RE.replace(line, "").trim().to_string())
                .filter(|line| !line.is_empty());
            let Some(first) = lines.next() else {
                return String::new();
            };
            (Some(first), lines.next())
        }
    };

    let scientific = scientific.unwrap_or_else(|| SCIENTIFIC_FALLBACK.to_string());
    let social = social.unwrap_or_else(|| SOCIAL_FALLBACK.to_string());

    format!(
        "{}\n{}",
        with_prefix(SCIENTIFIC_PREFIX, &scientific),
        with_prefix(SOCIAL_PREFIX, &social)
    )
}

/// Text under explicit "scientific impact:" / "social impact:" style labels.
/// Each section runs until the next label. `None` when no label is present.
fn labelled_sections(text: &str) -> Option<(Option<String>, Option<String>)> {
    let labels: Vec<(usize, usize, bool)> = IMPACT_LABEL_RE
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            Some((whole.start(), whole.end(), caps.get(1).is_some()))
        })
        .collect();

    if labels.is_empty() {
        return None;
    }

    let mut scientific = None;
    let mut social = None;
    for (idx, (_, body_start, is_scientific)) in labels.iter().copied().enumerate() {
        let body_end = labels.get(idx + 1).map_or(text.len(), |next| next.0);
        let body = clean_section(&text[body_start..body_end]);
        if body.is_empty() {
            continue;
        }
        let slot = if is_scientific {
            &mut scientific
        } else {
            &mut social
        };
        if slot.is_none() {
            *slot = Some(body);
        }
    }

    Some((scientific, social))
}

fn clean_section(body: &str) -> String {
    let collapsed = collapse_whitespace(body);
    collapsed
        .trim_end_matches(|c: char| c.is_whitespace() || matches!(c, '-' | '*' | '•' | '·'))
        .trim()
        .to_string()
}

fn with_prefix(prefix: &str, body: &str) -> String {
    let label = prefix.trim_end();
    let trimmed = body.trim();
    let rest = match trimmed.get(..label.len()) {
        Some(head) if head.eq_ignore_ascii_case(label) => trimmed[label.len()..].trim_start(),
        _ => trimmed,
    };
    format!("{prefix}{rest}")
}

/// One-sentence impact used when no generated text is available.
pub fn heuristic_impact(title: &str, venue: &str) -> String {
    let title = title.to_lowercase();
    let venue = venue.to_lowercase();
    let sentence = if ["nature", "science", "cell", "prl", "physical review letters"]
        .iter()
        .any(|key| venue.contains(key))
    {
        "If validated, this work could influence a broad range of follow-up research due to its high-visibility venue."
    } else if title.contains("quantum") || title.contains("qubit") {
        "If results hold, this paper could guide near-term progress in quantum computing methods and benchmarks."
    } else {
        "If validated and reproducible, this work could provide a practical foundation for future research and applications."
    };
    sentence.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_idempotent(input: &str) {
        let once = extract_abstract(input, ABSTRACT_LIMIT);
        let twice = extract_abstract(&once, ABSTRACT_LIMIT);
        assert_eq!(once, twice, "not idempotent for {input:?}");
    }

    #[test]
    fn decodes_entities_and_strips_tags() {
        let raw = "<p>Spin &amp; charge   <i>transport</i>\n in graphene&#39;s lattice</p>";
        assert_eq!(
            extract_abstract(raw, ABSTRACT_LIMIT),
            "Spin & charge transport in graphene's lattice"
        );
    }

    #[test]
    fn drops_short_preamble_before_marker() {
        let raw = "arXiv:2401.01234v1 Announce Type: new \nAbstract: We study qubits.";
        assert_eq!(extract_abstract(raw, ABSTRACT_LIMIT), "We study qubits.");
    }

    #[test]
    fn keeps_long_preamble_before_marker() {
        let preamble = "x".repeat(170);
        let raw = format!("{preamble} abstract: tail");
        assert_eq!(extract_abstract(&raw, 1000), raw);
    }

    #[test]
    fn strips_arxiv_identifier_annotation() {
        let raw = "arXiv:2401.01234v2 We present a new decoder.";
        assert_eq!(
            extract_abstract(raw, ABSTRACT_LIMIT),
            "We present a new decoder."
        );
    }

    #[test]
    fn strips_summary_label() {
        assert_eq!(
            extract_abstract("Summary: A compact result.", ABSTRACT_LIMIT),
            "A compact result."
        );
    }

    #[test]
    fn strips_published_online_clause() {
        let raw = "Nature Physics, Published online: 12 March 2024; We report entanglement.";
        assert_eq!(
            extract_abstract(raw, ABSTRACT_LIMIT),
            "We report entanglement."
        );
    }

    #[test]
    fn strips_doi_citation_prefix() {
        let raw = "doi:10.1103/PhysRevA.109.012345 Noise models matter.";
        assert_eq!(extract_abstract(raw, ABSTRACT_LIMIT), "Noise models matter.");

        let cited = "Quantum Reports 4, doi: 10.3390/qr4010001 Hybrid algorithms scale.";
        assert_eq!(extract_abstract(cited, ABSTRACT_LIMIT), "Hybrid algorithms scale.");
    }

    #[test]
    fn strips_leading_punctuation() {
        assert_eq!(
            extract_abstract(" ;: - Results follow.", ABSTRACT_LIMIT),
            "Results follow."
        );
    }

    #[test]
    fn truncates_with_ellipsis() {
        let raw = "word ".repeat(200);
        let out = extract_abstract(&raw, 50);
        assert!(out.chars().count() <= 50);
        assert!(out.ends_with("..."));
        assert_idempotent(&raw);
    }

    #[test]
    fn truncated_published_online_clause_is_stable() {
        let raw = "Published online in a journal with no terminating punctuation at all";
        let once = extract_abstract(raw, 30);
        assert_eq!(once, "Published online in a journ...");
        assert_eq!(extract_abstract(&once, 30), once);

        let long = format!(
            "Nature Photonics published online ahead of print {}",
            "word ".repeat(100)
        );
        let once = extract_abstract(&long, ABSTRACT_LIMIT);
        assert!(once.starts_with("Nature Photonics published online"));
        assert!(once.ends_with("..."));
        assert_idempotent(&long);
    }

    #[test]
    fn stripping_does_not_depend_on_truncation() {
        let raw = format!(
            "Physical Review, published online 2 May 2024; {}",
            "qubit ".repeat(120)
        );
        let out = extract_abstract(&raw, 60);
        assert!(out.starts_with("qubit qubit"));
        assert!(out.chars().count() <= 60);
        assert_idempotent(&raw);
    }

    #[test]
    fn short_text_is_unchanged() {
        assert_eq!(extract_abstract("Plain text.", 50), "Plain text.");
    }

    #[test]
    fn never_exceeds_limit_with_multibyte_text() {
        let raw = "量子计算 ".repeat(200);
        for limit in [10, 50, 380] {
            assert!(extract_abstract(&raw, limit).chars().count() <= limit);
        }
    }

    #[test]
    fn idempotent_on_mixed_inputs() {
        for raw in [
            "",
            "Abstract: Summary: doi:10.1/abc Published online 2024; text here",
            "summary: abstract: arXiv:1234.5678 body",
            "<b>DOI: 10.1000/xyz123</b> - Body text.",
            "Journal of Things, published online 3 May; , body",
            "Quantum error correction with surface codes &amp; more.",
        ] {
            assert_idempotent(raw);
        }
    }

    #[test]
    fn impact_labelled_inline() {
        assert_eq!(
            normalize_impact_text("Scientific impact: A. Social impact: B."),
            "Scientific impact: A.\nSocial or industry impact: B."
        );
    }

    #[test]
    fn impact_empty_input() {
        assert_eq!(normalize_impact_text(""), "");
        assert_eq!(normalize_impact_text("  \n\r\n "), "");
    }

    #[test]
    fn impact_single_line_gets_social_fallback() {
        assert_eq!(
            normalize_impact_text("just one line of text"),
            format!("Scientific impact: just one line of text\nSocial or industry impact: {SOCIAL_FALLBACK}")
        );
    }

    #[test]
    fn impact_bulleted_bold_markdown() {
        let raw = "Based on the paper metadata:\n\n- **Scientific impact:** Improves decoders.\n- **Industry impact:** Cheaper hardware. (45 words)";
        assert_eq!(
            normalize_impact_text(raw),
            "Scientific impact: Improves decoders.\nSocial or industry impact: Cheaper hardware."
        );
    }

    #[test]
    fn impact_missing_scientific_side_uses_fallback() {
        assert_eq!(
            normalize_impact_text("Societal impact: Better batteries."),
            format!("Scientific impact: {SCIENTIFIC_FALLBACK}\nSocial or industry impact: Better batteries.")
        );
    }

    #[test]
    fn impact_unlabelled_lines() {
        let raw = "1. Advances benchmarking.\n2) Helps vendors compare devices.\n3. Extra line.";
        assert_eq!(
            normalize_impact_text(raw),
            "Scientific impact: Advances benchmarking.\nSocial or industry impact: Helps vendors compare devices."
        );
    }

    #[test]
    fn impact_is_stable_on_canonical_form() {
        let canonical = "Scientific impact: A.\nSocial or industry impact: B.";
        assert_eq!(normalize_impact_text(canonical), canonical);
    }

    #[test]
    fn prefix_is_not_doubled() {
        assert_eq!(
            with_prefix(SCIENTIFIC_PREFIX, "scientific impact: X"),
            "Scientific impact: X"
        );
        assert_eq!(with_prefix(SOCIAL_PREFIX, "Y"), "Social or industry impact: Y");
    }

    #[test]
    fn heuristic_prefers_venue_then_title() {
        assert!(heuristic_impact("Anything", "Nature Physics").contains("high-visibility venue"));
        assert!(heuristic_impact("Qubit readout", "arXiv").contains("quantum computing"));
        assert!(heuristic_impact("Soil moisture", "arXiv").contains("practical foundation"));
    }
}
