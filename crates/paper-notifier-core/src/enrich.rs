use crate::normalize::{ABSTRACT_LIMIT, extract_abstract, heuristic_impact, normalize_impact_text};
use crate::paper::Paper;

/// Replace the raw abstract with its cleaned form.
pub fn clean_abstract(paper: Paper) -> Paper {
    let abstract_text = extract_abstract(&paper.abstract_text, ABSTRACT_LIMIT);
    Paper {
        abstract_text,
        ..paper
    }
}

/// Fill `impact` unless it is already set: normalized generated text when it
/// yields anything, otherwise the heuristic sentence.
pub fn assign_impact(paper: Paper, generated: Option<&str>) -> Paper {
    if paper.has_impact() {
        return paper;
    }

    let impact = generated
        .map(normalize_impact_text)
        .filter(|text| !text.is_empty())
        .unwrap_or_else(|| heuristic_impact(&paper.title, &paper.source));
    Paper { impact, ..paper }
}
