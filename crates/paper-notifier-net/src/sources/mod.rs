pub mod crossref;
pub mod rss;
pub mod semantic_scholar;

pub use crossref::CrossRefSource;
pub use rss::RssSource;
pub use semantic_scholar::SemanticScholarSource;
