use thiserror::Error;

/// All errors that can occur in paper-notifier-core.
#[derive(Debug, Error)]
pub enum NotifierError {
    #[error("FEISHU_WEBHOOK_URL is required")]
    MissingWebhook,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("source {source_name} failed: {message}")]
    Source { source_name: String, message: String },

    #[error("impact generation failed: {0}")]
    Generator(String),

    #[error("delivery failed: {0}")]
    Delivery(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

impl NotifierError {
    pub fn source_failed(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Source {
            source_name: name.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, NotifierError>;
