//! paper-notifier core — paper model, filters, abstract cleaning, digest
//! formatting and the run pipeline.

pub mod authors;
pub mod config;
pub mod digest;
pub mod enrich;
pub mod error;
pub mod keywords;
pub mod normalize;
pub mod paper;
pub mod pipeline;
pub mod sent_log;
mod text_file;

pub use config::{NotifierConfig, WebhookMode};
pub use error::{NotifierError, Result};
pub use keywords::KeywordRules;
pub use paper::Paper;
pub use pipeline::{
    DigestSink, FetchRequest, ImpactGenerator, PaperSource, Pipeline, RunOptions, RunReport,
};
pub use sent_log::SentLog;
