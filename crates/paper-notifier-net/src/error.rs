use paper_notifier_core::NotifierError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NetError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error from {url}: HTTP {status}: {body}")]
    Api {
        url: String,
        status: u16,
        body: String,
    },

    #[error("rate limit from {0}")]
    RateLimited(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("feed error: {0}")]
    Feed(String),
}

impl NetError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited(_))
    }

    pub fn into_source_error(self, source_name: &str) -> NotifierError {
        NotifierError::source_failed(source_name, self.to_string())
    }

    pub fn into_generator_error(self) -> NotifierError {
        NotifierError::Generator(self.to_string())
    }

    pub fn into_delivery_error(self) -> NotifierError {
        NotifierError::Delivery(self.to_string())
    }
}

pub type Result<T> = std::result::Result<T, NetError>;
