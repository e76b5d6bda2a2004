use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{NotifierError, Result};

/// Root configuration, built once at process start and handed to each component.
///
/// Layering: defaults, then `config.toml`, then environment variables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifierConfig {
    pub delivery: DeliveryConfig,
    pub search: SearchConfig,
    pub filters: FilterConfig,
    pub enrichment: EnrichmentConfig,
    pub schedule: ScheduleConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WebhookMode {
    #[default]
    Bot,
    Flow,
}

impl WebhookMode {
    /// `flow` selects flow mode; every other value means bot.
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("flow") {
            Self::Flow
        } else {
            Self::Bot
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bot => "bot",
            Self::Flow => "flow",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowFields {
    pub title: String,
    pub authors: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliveryConfig {
    pub webhook_url: String,
    pub mode: WebhookMode,
    pub flow_fields: FlowFields,
    pub flow_single_summary: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub query: String,
    pub days_back: u32,
    pub arxiv_max_results: u32,
    pub crossref_rows: u32,
    pub crossref_mailto: String,
    pub semantic_scholar_limit: u32,
    pub semantic_scholar_api_key: String,
    pub rss_feeds: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub keywords_file: PathBuf,
    /// Empty path disables both reading and writing the sent-paper log.
    pub log_file: PathBuf,
    pub key_authors: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    /// Empty key disables the generator; the heuristic sentence is used instead.
    pub api_key: String,
    pub model: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub timezone: String,
    pub run_time: String,
}

// ─── Defaults ──────────────────────────────────────────────

impl Default for FlowFields {
    fn default() -> Self {
        Self {
            title: "paper_title".to_string(),
            authors: "authors".to_string(),
            description: "description".to_string(),
        }
    }
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            webhook_url: String::new(),
            mode: WebhookMode::Bot,
            flow_fields: FlowFields::default(),
            flow_single_summary: true,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            query: "quantum computing".to_string(),
            days_back: 1,
            arxiv_max_results: 8,
            crossref_rows: 5,
            crossref_mailto: String::new(),
            semantic_scholar_limit: 20,
            semantic_scholar_api_key: String::new(),
            rss_feeds: Vec::new(),
        }
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            keywords_file: PathBuf::from("keywords.txt"),
            log_file: PathBuf::from("logs").join("matched_papers.log"),
            key_authors: Vec::new(),
        }
    }
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: "openrouter/auto".to_string(),
            timeout_secs: 60,
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            timezone: "Asia/Shanghai".to_string(),
            run_time: "09:00".to_string(),
        }
    }
}

// ─── Load ──────────────────────────────────────────────────

impl NotifierConfig {
    /// Standard config file path: `~/.config/paper-notifier/config.toml`
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("PAPER_NOTIFIER_CONFIG") {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("paper-notifier")
            .join("config.toml")
    }

    /// Load config from a specific path, falling back to defaults if the file doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Full layering: file at `path` (or the standard path), then the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::load_from(p)?,
            None => Self::load_from(&Self::config_path())?,
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Override fields from environment-style variables. Unparseable numbers
    /// and booleans keep their current value.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let text = |key: &str| lookup(key).map(|v| v.trim().to_string());

        if let Some(v) = text("FEISHU_WEBHOOK_URL") {
            self.delivery.webhook_url = v;
        }
        if let Some(v) = text("FEISHU_WEBHOOK_TYPE") {
            self.delivery.mode = WebhookMode::parse(&v);
        }
        if let Some(v) = text("FLOW_FIELD_TITLE").filter(|v| !v.is_empty()) {
            self.delivery.flow_fields.title = v;
        }
        if let Some(v) = text("FLOW_FIELD_AUTHORS").filter(|v| !v.is_empty()) {
            self.delivery.flow_fields.authors = v;
        }
        if let Some(v) = text("FLOW_FIELD_DESCRIPTION").filter(|v| !v.is_empty()) {
            self.delivery.flow_fields.description = v;
        }
        if let Some(v) = text("FLOW_SINGLE_SUMMARY") {
            self.delivery.flow_single_summary =
                parse_bool(&v).unwrap_or(self.delivery.flow_single_summary);
        }

        if let Some(v) = text("QUERY") {
            self.search.query = v;
        }
        override_number(&mut self.search.days_back, text("DAYS_BACK"));
        override_number(&mut self.search.arxiv_max_results, text("MAX_PAPERS"));
        override_number(&mut self.search.crossref_rows, text("CROSSREF_ROWS"));
        if let Some(v) = text("CROSSREF_MAILTO") {
            self.search.crossref_mailto = v;
        }
        override_number(
            &mut self.search.semantic_scholar_limit,
            text("SEMANTIC_SCHOLAR_LIMIT"),
        );
        if let Some(v) = text("SEMANTIC_SCHOLAR_API_KEY") {
            self.search.semantic_scholar_api_key = v;
        }
        if let Some(v) = text("RSS_FEEDS") {
            self.search.rss_feeds = split_list(&v);
        }

        if let Some(v) = text("KEY_AUTHORS") {
            self.filters.key_authors = split_list(&v);
        }
        if let Some(v) = text("KEYWORDS_FILE") {
            self.filters.keywords_file = PathBuf::from(v);
        }
        if let Some(v) = text("LOG_FILE") {
            self.filters.log_file = PathBuf::from(v);
        }

        if let Some(v) = text("OPENROUTER_API_KEY") {
            self.enrichment.api_key = v;
        }
        if let Some(v) = text("OPENROUTER_MODEL").filter(|v| !v.is_empty()) {
            self.enrichment.model = v;
        }
        override_number(
            &mut self.enrichment.timeout_secs,
            text("OPENROUTER_TIMEOUT_SECONDS"),
        );

        if let Some(v) = text("TIMEZONE").filter(|v| !v.is_empty()) {
            self.schedule.timezone = v;
        }
        if let Some(v) = text("RUN_TIME").filter(|v| !v.is_empty()) {
            self.schedule.run_time = v;
        }
    }

    /// The webhook URL, or the fatal error raised before anything is fetched.
    pub fn require_webhook(&self) -> Result<&str> {
        let url = self.delivery.webhook_url.trim();
        if url.is_empty() {
            return Err(NotifierError::MissingWebhook);
        }
        Ok(url)
    }

    pub fn generator_enabled(&self) -> bool {
        !self.enrichment.api_key.trim().is_empty()
    }
}

/// `1/true/yes/y` and `0/false/no/n`, case-insensitive.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" => Some(true),
        "0" | "false" | "no" | "n" => Some(false),
        _ => None,
    }
}

/// Comma-separated list with blank entries dropped.
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

fn override_number<T: std::str::FromStr>(slot: &mut T, value: Option<String>) {
    if let Some(parsed) = value.and_then(|v| v.parse::<T>().ok()) {
        *slot = parsed;
    }
}
