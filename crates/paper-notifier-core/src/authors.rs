use crate::paper::Paper;

/// True when some configured key author is a case-insensitive substring of
/// some paper author.
pub fn matches_key_authors(authors: &[String], key_authors: &[String]) -> bool {
    let authors: Vec<String> = authors.iter().map(|a| a.to_lowercase()).collect();
    key_authors.iter().any(|key| {
        let key = key.to_lowercase();
        authors.iter().any(|author| author.contains(&key))
    })
}

/// Keep papers by key authors. An empty key-author list keeps everything.
pub fn filter_by_key_authors(papers: Vec<Paper>, key_authors: &[String]) -> Vec<Paper> {
    if key_authors.is_empty() {
        return papers;
    }
    papers
        .into_iter()
        .filter(|p| matches_key_authors(&p.authors, key_authors))
        .collect()
}
