mod schedule;

use std::path::PathBuf;

use anyhow::{Result, bail};
use chrono::Utc;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use paper_notifier_core::{
    DigestSink, FetchRequest, ImpactGenerator, KeywordRules, NotifierConfig, Paper, Pipeline,
    RunOptions, RunReport, SentLog, WebhookMode,
};
use paper_notifier_net::{
    ArxivSource, CrossRefSource, FeishuWebhook, OpenRouterGenerator, RssSource,
    SemanticScholarSource,
};

use crate::schedule::DailySchedule;

// ─── CLI Definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "paper-notifier",
    about = "Daily research paper digest delivered to a Feishu webhook",
    version,
    long_about = None
)]
struct Cli {
    /// Run the pipeline once and exit (default).
    #[arg(long, conflicts_with_all = ["schedule", "test_flow"])]
    once: bool,

    /// Run every day at RUN_TIME in TIMEZONE.
    #[arg(long, conflicts_with = "test_flow")]
    schedule: bool,

    /// Post one minimal test paper to a flow webhook and exit.
    #[arg(long)]
    test_flow: bool,

    /// Deliver papers even if they appear in the sent-paper log.
    #[arg(long)]
    include_sent_papers: bool,

    /// Config file (default: $PAPER_NOTIFIER_CONFIG or the user config dir).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

enum Mode {
    Once,
    Schedule,
    TestFlow,
}

impl Cli {
    fn mode(&self) -> Mode {
        if self.test_flow {
            Mode::TestFlow
        } else if self.once || !self.schedule {
            Mode::Once
        } else {
            Mode::Schedule
        }
    }
}

// ─── Main ───────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();
    init_tracing();

    let config = NotifierConfig::load(cli.config.as_deref())?;
    config.require_webhook()?;

    let options = RunOptions {
        include_sent: cli.include_sent_papers,
    };

    match cli.mode() {
        Mode::TestFlow => run_test_flow(&config).await,
        Mode::Schedule => {
            let daily = DailySchedule::from_config(&config.schedule)?;
            let config = &config;
            schedule::run_daily(daily, move || async move {
                run_once(config, options).await.map(|_| ())
            })
            .await
        }
        Mode::Once => run_once(&config, options).await.map(|_| ()),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

// ─── Run modes ──────────────────────────────────────────────────────────────

async fn run_once(config: &NotifierConfig, options: RunOptions) -> Result<RunReport> {
    let pipeline = build_pipeline(config)?;
    let request = FetchRequest::new(config.search.query.clone(), config.search.days_back);
    let report = pipeline.run(&request, options).await?;

    if report.is_noop() {
        info!(fetched = report.fetched, "run finished without delivery");
    } else {
        info!(
            fetched = report.fetched,
            delivered = report.delivered,
            mode = config.delivery.mode.as_str(),
            "run finished"
        );
    }
    Ok(report)
}

async fn run_test_flow(config: &NotifierConfig) -> Result<()> {
    info!(started_at = %Utc::now().to_rfc3339(), "flow test started");
    if config.delivery.mode != WebhookMode::Flow {
        bail!("--test-flow requires FEISHU_WEBHOOK_TYPE=flow");
    }

    let paper = Paper::new(
        "paper test",
        vec!["paper-notifier".to_string()],
        "abstract test",
        "https://example.com/paper-test",
        "paper-notifier",
        Utc::now(),
    );
    let sink = FeishuWebhook::new(config.delivery.clone())?;
    sink.deliver(&[paper]).await?;
    info!("flow test post completed");
    Ok(())
}

fn build_pipeline(config: &NotifierConfig) -> Result<Pipeline> {
    let search = &config.search;
    let filters = &config.filters;

    let rules = KeywordRules::load(&filters.keywords_file)?;
    if rules.has_rules() {
        info!(
            path = %filters.keywords_file.display(),
            keywords = rules.keyword_count(),
            "keyword rules loaded"
        );
    }

    if !config.generator_enabled() {
        info!("no OpenRouter key configured; impact text falls back to the heuristic");
    }
    let generator = OpenRouterGenerator::from_config(&config.enrichment)?
        .map(|g| Box::new(g) as Box<dyn ImpactGenerator>);
    let sink = FeishuWebhook::new(config.delivery.clone())?;

    let mut pipeline = Pipeline::new(Box::new(sink))
        .with_source(Box::new(ArxivSource::new(search.arxiv_max_results)?))
        .with_source(Box::new(CrossRefSource::new(
            search.crossref_rows,
            non_empty(&search.crossref_mailto),
        )?))
        .with_source(Box::new(SemanticScholarSource::new(
            search.semantic_scholar_limit,
            non_empty(&search.semantic_scholar_api_key),
        )?));

    let rss = RssSource::new(search.rss_feeds.clone())?;
    if !rss.is_empty() {
        pipeline = pipeline.with_source(Box::new(rss));
    }

    Ok(pipeline
        .with_rules(rules)
        .with_sent_log(SentLog::new(&filters.log_file))
        .with_key_authors(filters.key_authors.clone())
        .with_generator(generator))
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}
