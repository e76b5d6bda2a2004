//! Run orchestration: fetch → keyword filter → sent-log filter → key-author
//! filter → enrich → log append → deliver.
//!
//! Each stage sees only the output of the previous one. A failing source
//! contributes nothing; a failing generator falls back to the heuristic
//! impact; log and delivery failures end the run with an error.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use crate::authors::filter_by_key_authors;
use crate::enrich::{assign_impact, clean_abstract};
use crate::error::Result;
use crate::keywords::KeywordRules;
use crate::paper::Paper;
use crate::sent_log::{SentLog, filter_unsent};

// ─── Collaborators ──────────────────────────────────────────

/// What every source adapter is asked for.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub query: String,
    pub days_back: u32,
    pub now: DateTime<Utc>,
}

impl FetchRequest {
    pub fn new(query: impl Into<String>, days_back: u32) -> Self {
        Self {
            query: query.into(),
            days_back,
            now: Utc::now(),
        }
    }

    /// Papers published before this instant are dropped by the adapters.
    pub fn cutoff(&self) -> DateTime<Utc> {
        self.now - Duration::days(i64::from(self.days_back))
    }

    pub fn is_recent(&self, published: DateTime<Utc>) -> bool {
        published >= self.cutoff()
    }
}

#[async_trait]
pub trait PaperSource: Send + Sync {
    fn name(&self) -> &str;

    /// Papers published on or after `request.cutoff()`.
    async fn fetch(&self, request: &FetchRequest) -> Result<Vec<Paper>>;
}

#[async_trait]
pub trait ImpactGenerator: Send + Sync {
    /// Free-form impact text for one paper.
    async fn generate(&self, paper: &Paper) -> Result<String>;
}

#[async_trait]
pub trait DigestSink: Send + Sync {
    async fn deliver(&self, papers: &[Paper]) -> Result<()>;
}

// ─── Report ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Keywords,
    SentLog,
    KeyAuthors,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Keywords => "keywords",
            Self::SentLog => "sent_log",
            Self::KeyAuthors => "key_authors",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageCount {
    pub stage: Stage,
    pub before: usize,
    pub after: usize,
    /// False when the stage had nothing to filter with.
    pub applied: bool,
}

#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub fetched: usize,
    pub stages: Vec<StageCount>,
    pub delivered: usize,
    /// `(source name, error message)` for every source that failed.
    pub source_failures: Vec<(String, String)>,
}

impl RunReport {
    pub fn stage(&self, stage: Stage) -> Option<&StageCount> {
        self.stages.iter().find(|s| s.stage == stage)
    }

    pub fn is_noop(&self) -> bool {
        self.delivered == 0
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Skip the sent-log filter and deliver papers seen in earlier runs.
    pub include_sent: bool,
}

// ─── Pipeline ───────────────────────────────────────────────

pub struct Pipeline {
    sources: Vec<Box<dyn PaperSource>>,
    rules: KeywordRules,
    sent_log: Option<SentLog>,
    key_authors: Vec<String>,
    generator: Option<Box<dyn ImpactGenerator>>,
    sink: Box<dyn DigestSink>,
}

impl Pipeline {
    pub fn new(sink: Box<dyn DigestSink>) -> Self {
        Self {
            sources: Vec::new(),
            rules: KeywordRules::default(),
            sent_log: None,
            key_authors: Vec::new(),
            generator: None,
            sink,
        }
    }

    /// Sources are queried in the order they are added.
    pub fn with_source(mut self, source: Box<dyn PaperSource>) -> Self {
        self.sources.push(source);
        self
    }

    pub fn with_rules(mut self, rules: KeywordRules) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_sent_log(mut self, log: SentLog) -> Self {
        self.sent_log = Some(log).filter(|l| !l.is_disabled());
        self
    }

    pub fn with_key_authors(mut self, key_authors: Vec<String>) -> Self {
        self.key_authors = key_authors;
        self
    }

    pub fn with_generator(mut self, generator: Option<Box<dyn ImpactGenerator>>) -> Self {
        self.generator = generator;
        self
    }

    pub async fn run(&self, request: &FetchRequest, options: RunOptions) -> Result<RunReport> {
        info!(started_at = %Utc::now().to_rfc3339(), query = %request.query, "run started");
        let mut report = RunReport::default();

        let papers = self.fetch_all(request, &mut report).await;
        report.fetched = papers.len();
        info!(count = papers.len(), "fetched papers");

        let papers = self.keyword_stage(papers, &mut report);
        let papers = self.sent_log_stage(papers, options, &mut report)?;
        let papers = self.key_author_stage(papers, &mut report);

        if papers.is_empty() {
            info!("no papers matched; skipping delivery");
            return Ok(report);
        }

        let papers = self.enrich_all(papers).await;

        if let Some(log) = &self.sent_log {
            log.append(&papers, Utc::now())?;
            debug!(path = %log.path().display(), count = papers.len(), "appended sent log");
        }

        info!(count = papers.len(), "delivering papers");
        self.sink.deliver(&papers).await?;
        report.delivered = papers.len();
        info!(count = report.delivered, "delivery completed");

        Ok(report)
    }

    async fn fetch_all(&self, request: &FetchRequest, report: &mut RunReport) -> Vec<Paper> {
        let mut papers = Vec::new();
        for source in &self.sources {
            match source.fetch(request).await {
                Ok(batch) => {
                    info!(source = source.name(), count = batch.len(), "source fetched");
                    papers.extend(batch);
                }
                Err(err) => {
                    warn!(source = source.name(), error = %err, "source failed; continuing without it");
                    report
                        .source_failures
                        .push((source.name().to_string(), err.to_string()));
                }
            }
        }
        papers
    }

    fn keyword_stage(&self, papers: Vec<Paper>, report: &mut RunReport) -> Vec<Paper> {
        let before = papers.len();
        let applied = self.rules.has_rules();
        let kept = self.rules.filter(papers);
        if applied {
            info!(
                keywords = self.rules.keyword_count(),
                before,
                after = kept.len(),
                "papers after keyword filter"
            );
        }
        record(report, Stage::Keywords, before, kept.len(), applied);
        kept
    }

    fn sent_log_stage(
        &self,
        papers: Vec<Paper>,
        options: RunOptions,
        report: &mut RunReport,
    ) -> Result<Vec<Paper>> {
        let before = papers.len();

        if options.include_sent {
            info!("sent-paper filter bypassed");
            record(report, Stage::SentLog, before, before, false);
            return Ok(papers);
        }

        let Some(log) = &self.sent_log else {
            record(report, Stage::SentLog, before, before, false);
            return Ok(papers);
        };

        let sent = log.load_urls()?;
        let kept = filter_unsent(papers, &sent);
        info!(
            path = %log.path().display(),
            logged = sent.len(),
            before,
            after = kept.len(),
            "papers after sent-log filter"
        );
        record(report, Stage::SentLog, before, kept.len(), !sent.is_empty());
        Ok(kept)
    }

    fn key_author_stage(&self, papers: Vec<Paper>, report: &mut RunReport) -> Vec<Paper> {
        let before = papers.len();
        let applied = !self.key_authors.is_empty();
        let kept = filter_by_key_authors(papers, &self.key_authors);
        if applied {
            info!(before, after = kept.len(), "papers after key-author filter");
        }
        record(report, Stage::KeyAuthors, before, kept.len(), applied);
        kept
    }

    async fn enrich_all(&self, papers: Vec<Paper>) -> Vec<Paper> {
        let mut enriched = Vec::with_capacity(papers.len());
        for paper in papers {
            let paper = clean_abstract(paper);
            let generated = match &self.generator {
                Some(generator) if !paper.has_impact() => match generator.generate(&paper).await {
                    Ok(text) => Some(text),
                    Err(err) => {
                        warn!(url = %paper.url, error = %err, "impact generation failed; using heuristic");
                        None
                    }
                },
                _ => None,
            };
            enriched.push(assign_impact(paper, generated.as_deref()));
        }
        enriched
    }
}

fn record(report: &mut RunReport, stage: Stage, before: usize, after: usize, applied: bool) {
    debug!(stage = stage.as_str(), before, after, applied, "stage counted");
    report.stages.push(StageCount {
        stage,
        before,
        after,
        applied,
    });
}
