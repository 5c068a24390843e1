//! End-to-end pipeline scenarios against a scripted completion service.
//!
//! The scripted service recognises which stage is calling from the system
//! instruction and answers according to a per-stage behaviour.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::error::Error;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use precis_chunker::{ChunkerConfig, Document, PreprocessOptions};
use precis_completion::{
    Completion, CompletionOutcome, CompletionService, FinishReason, HealthMonitor, HealthStatus,
    Message, Role, SamplingParams,
};
use precis_pipeline::{MergeStrategy, PipelineConfig, Stage, Summarizer};

type TestResult = Result<(), Box<dyn Error>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Summarize,
    Merge,
    Continuation,
    Polish,
}

#[derive(Debug, Clone)]
enum Reply {
    /// "Summary of section N." for summarize calls.
    SectionSummary,
    /// Return the user content unchanged.
    Echo,
    Text(&'static str),
    /// Text reported as cut off by the token budget.
    Truncated(&'static str),
    Fail,
    Malformed,
}

struct Scripted {
    summarize: Reply,
    merge: Reply,
    continuation: Vec<Reply>,
    polish: Reply,
    multiplier: f64,
    /// How long each summarize call stays in flight.
    latency: Duration,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    calls: Mutex<Vec<Kind>>,
}

impl Scripted {
    fn new() -> Self {
        Self {
            summarize: Reply::SectionSummary,
            merge: Reply::Echo,
            continuation: Vec::new(),
            polish: Reply::Echo,
            multiplier: 1.0,
            latency: Duration::ZERO,
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn summarize(mut self, reply: Reply) -> Self {
        self.summarize = reply;
        self
    }

    fn merge(mut self, reply: Reply) -> Self {
        self.merge = reply;
        self
    }

    fn continuation(mut self, replies: Vec<Reply>) -> Self {
        self.continuation = replies;
        self
    }

    fn polish(mut self, reply: Reply) -> Self {
        self.polish = reply;
        self
    }

    fn multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    fn latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    fn peak(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn count(&self, kind: Kind) -> usize {
        self.calls.lock().unwrap().iter().filter(|k| **k == kind).count()
    }
}

fn classify(messages: &[Message]) -> Kind {
    let system = messages
        .iter()
        .find(|m| m.role == Role::System)
        .map(|m| m.content.as_str())
        .unwrap_or_default();
    if system.starts_with("You summarize one section") {
        Kind::Summarize
    } else if system.starts_with("You combine partial summaries") {
        Kind::Merge
    } else if system.starts_with("The text below was cut off") {
        Kind::Continuation
    } else {
        Kind::Polish
    }
}

fn section_number(messages: &[Message]) -> String {
    messages
        .iter()
        .find(|m| m.role == Role::System)
        .and_then(|m| m.content.split("This is section ").nth(1))
        .and_then(|rest| rest.split(' ').next())
        .unwrap_or("?")
        .to_string()
}

fn user_content(messages: &[Message]) -> String {
    messages
        .iter()
        .rev()
        .find(|m| m.role == Role::User)
        .map(|m| m.content.clone())
        .unwrap_or_default()
}

#[async_trait]
impl CompletionService for Scripted {
    async fn complete(
        &self,
        messages: &[Message],
        _params: &SamplingParams,
    ) -> precis_completion::Result<CompletionOutcome> {
        let kind = classify(messages);
        let reply = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(kind);
            match kind {
                Kind::Summarize => self.summarize.clone(),
                Kind::Merge => self.merge.clone(),
                Kind::Polish => self.polish.clone(),
                Kind::Continuation => {
                    let seen = calls.iter().filter(|k| **k == Kind::Continuation).count();
                    self.continuation
                        .get(seen - 1)
                        .cloned()
                        .unwrap_or(Reply::Fail)
                }
            }
        };

        if kind == Kind::Summarize && !self.latency.is_zero() {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.latency).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
        }

        let text = match reply {
            Reply::SectionSummary => format!("Summary of section {}.", section_number(messages)),
            Reply::Echo => user_content(messages),
            Reply::Text(text) => text.to_string(),
            Reply::Truncated(text) => {
                return Ok(CompletionOutcome::Completed(
                    Completion::new(text).with_finish_reason(Some(FinishReason::Length)),
                ));
            }
            Reply::Fail => {
                return Err(precis_completion::Error::retries_exhausted(
                    3,
                    precis_completion::Error::status(503, "unavailable"),
                ));
            }
            Reply::Malformed => return Ok(CompletionOutcome::malformed("no choices")),
        };
        Ok(CompletionOutcome::Completed(Completion::new(text)))
    }

    async fn probe(&self) -> HealthStatus {
        HealthStatus {
            multiplier: self.multiplier,
            ..HealthStatus::default()
        }
    }
}

/// `count` one-sentence paragraphs of exactly `len` characters.
fn paragraphs(count: usize, len: usize) -> String {
    (0..count)
        .map(|i| {
            let head = format!("Clause {i:03} ");
            format!("{head}{}.", "x".repeat(len - head.len() - 1))
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Sizing that puts every 300-character paragraph in its own chunk.
fn one_paragraph_per_chunk() -> ChunkerConfig {
    ChunkerConfig::with_bounds(100, 400).base_size(100).overlap(0)
}

fn summarizer(
    service: &Arc<Scripted>,
    chunker: ChunkerConfig,
    config: PipelineConfig,
) -> Result<Summarizer, precis_pipeline::Error> {
    let service: Arc<dyn CompletionService> = service.clone();
    Summarizer::new(service, chunker, config)
}

/// GIVEN a completion service that fails every call
/// WHEN a 12-chunk document is summarized
/// THEN there is exactly one degraded summary per chunk, in index order,
/// AND the run still completes with punctuated text
#[tokio::test]
async fn test_total_service_failure_keeps_one_summary_per_chunk() -> TestResult {
    let service = Arc::new(
        Scripted::new()
            .summarize(Reply::Fail)
            .merge(Reply::Fail)
            .polish(Reply::Fail),
    );
    let pipeline = summarizer(&service, one_paragraph_per_chunk(), PipelineConfig::default())?;

    let report = pipeline
        .run(&Document::new("failing.txt", paragraphs(12, 300)))
        .await?;

    assert_eq!(report.chunk_count(), 12);
    let indices: Vec<usize> = report.chunk_summaries.iter().map(|s| s.index).collect();
    assert_eq!(indices, (0..12).collect::<Vec<_>>());
    assert!(report.chunk_summaries.iter().all(|s| s.degraded));
    assert!(report.chunk_summaries[3].text.starts_with("Clause 003"));
    assert!(report.is_degraded());
    assert!(report.summary.ends_with('.'));
    assert!(report.trace.contains(Stage::Done));
    Ok(())
}

/// GIVEN a service whose summarize calls take a while
/// WHEN a 12-chunk document is summarized with a concurrency limit of 3
/// THEN several calls overlap but never more than 3 at once
/// AND summaries stay in chunk order
#[tokio::test]
async fn test_chunk_calls_respect_concurrency_limit() -> TestResult {
    let service = Arc::new(Scripted::new().latency(Duration::from_millis(20)));
    let pipeline = summarizer(
        &service,
        one_paragraph_per_chunk(),
        PipelineConfig::default().with_concurrency(3),
    )?;

    let report = pipeline
        .run(&Document::new("busy.txt", paragraphs(12, 300)))
        .await?;

    assert_eq!(service.count(Kind::Summarize), 12);
    assert!(service.peak() <= 3, "peak in flight {}", service.peak());
    assert!(service.peak() > 1, "calls never overlapped");
    let texts: Vec<&str> = report.chunk_summaries.iter().map(|s| s.text.as_str()).collect();
    let expected: Vec<String> = (1..=12).map(|n| format!("Summary of section {n}.")).collect();
    assert_eq!(texts, expected);
    Ok(())
}

/// GIVEN a concurrency limit of 1
/// WHEN a document is summarized on a spawned task
/// THEN chunk calls run one at a time
#[tokio::test]
async fn test_single_worker_runs_chunks_sequentially() -> TestResult {
    let service = Arc::new(Scripted::new().latency(Duration::from_millis(5)));
    let pipeline = summarizer(
        &service,
        one_paragraph_per_chunk(),
        PipelineConfig::default().with_concurrency(1),
    )?;

    let document = Document::new("serial.txt", paragraphs(4, 300));
    let report = tokio::spawn(async move { pipeline.run(&document).await }).await??;

    assert_eq!(report.chunk_count(), 4);
    assert_eq!(service.peak(), 1);
    Ok(())
}

/// GIVEN a deterministic service
/// WHEN the same document is summarized twice
/// THEN both runs produce byte-identical summaries
#[tokio::test]
async fn test_identical_input_gives_identical_summary() -> TestResult {
    let service = Arc::new(Scripted::new());
    let pipeline = summarizer(&service, one_paragraph_per_chunk(), PipelineConfig::default())?;
    let document = Document::new("same.txt", paragraphs(5, 300));

    let first = pipeline.run(&document).await?;
    let second = pipeline.run(&document).await?;

    assert_eq!(first.summary, second.summary);
    assert_ne!(first.run_id, second.run_id);
    Ok(())
}

/// GIVEN a merge response cut off mid-sentence
/// AND a continuation that completes it
/// WHEN the document is summarized
/// THEN the final text holds both parts and ends in terminal punctuation
#[tokio::test]
async fn test_truncated_merge_is_continued() -> TestResult {
    let service = Arc::new(
        Scripted::new()
            .merge(Reply::Truncated("The circular sets reporting duties for"))
            .continuation(vec![Reply::Text("all licensed banks.")]),
    );
    let pipeline = summarizer(&service, one_paragraph_per_chunk(), PipelineConfig::default())?;

    let report = pipeline
        .run(&Document::new("cut.txt", paragraphs(4, 300)))
        .await?;

    assert_eq!(
        report.summary,
        "The circular sets reporting duties for all licensed banks."
    );
    assert_eq!(report.continuation_calls, 1);
    assert_eq!(service.count(Kind::Continuation), 1);
    Ok(())
}

/// GIVEN a merge response cut off in the middle of a word
/// AND a continuation that restates the whole word
/// WHEN the document is summarized
/// THEN the word is rejoined without a stray space
#[tokio::test]
async fn test_word_cut_mid_way_is_rejoined() -> TestResult {
    let service = Arc::new(
        Scripted::new()
            .merge(Reply::Truncated("The board shall appro"))
            .continuation(vec![Reply::Text("approve the lending policy.")]),
    );
    let pipeline = summarizer(&service, one_paragraph_per_chunk(), PipelineConfig::default())?;

    let report = pipeline
        .run(&Document::new("cut-word.txt", paragraphs(4, 300)))
        .await?;

    assert_eq!(report.summary, "The board shall approve the lending policy.");
    assert_eq!(report.continuation_calls, 1);
    Ok(())
}

/// GIVEN continuations that never finish the sentence
/// WHEN the merge result is truncated
/// THEN at most three continuation calls are made and finalize adds the period
#[tokio::test]
async fn test_continuation_budget_is_bounded() -> TestResult {
    let service = Arc::new(
        Scripted::new()
            .merge(Reply::Text("Obligations include"))
            .continuation(vec![
                Reply::Text("reporting"),
                Reply::Text("and auditing"),
                Reply::Text("and more"),
                Reply::Text("never called."),
            ]),
    );
    let pipeline = summarizer(&service, one_paragraph_per_chunk(), PipelineConfig::default())?;

    let report = pipeline
        .run(&Document::new("endless.txt", paragraphs(4, 300)))
        .await?;

    assert_eq!(service.count(Kind::Continuation), 3);
    assert_eq!(
        report.summary,
        "Obligations include reporting and auditing and more."
    );
    Ok(())
}

/// GIVEN a service that always fails the merge stage
/// WHEN the document is summarized
/// THEN the summary is the ordered concatenation of chunk summaries, punctuated
#[tokio::test]
async fn test_failed_merge_degrades_to_concatenation() -> TestResult {
    let service = Arc::new(Scripted::new().merge(Reply::Fail));
    let pipeline = summarizer(&service, one_paragraph_per_chunk(), PipelineConfig::default())?;

    let report = pipeline
        .run(&Document::new("merge-fails.txt", paragraphs(4, 300)))
        .await?;

    let expected = (1..=4)
        .map(|n| format!("Summary of section {n}."))
        .collect::<Vec<_>>()
        .join("\n\n");
    assert_eq!(report.summary, expected);
    assert_eq!(service.count(Kind::Continuation), 0);
    assert!(report.degradations.iter().any(|d| d.stage == Stage::Merge));
    Ok(())
}

/// GIVEN a 25,000-character document, max 8,000, min 2,000, cap 4
/// AND fixed-length chunk summaries, a punctuated merge and a no-op polish
/// WHEN the document is summarized
/// THEN there are exactly 4 chunk summaries, one flat merge, no continuation,
/// AND the final summary equals the merge output
#[tokio::test]
async fn test_end_to_end_capped_document() -> TestResult {
    const MERGED: &str = "The document defines four groups of clauses and their obligations.";

    let service = Arc::new(Scripted::new().merge(Reply::Text(MERGED)));
    let chunker = ChunkerConfig::with_bounds(2_000, 8_000)
        .base_size(8_000)
        .max_chunks(4);
    let pipeline = summarizer(&service, chunker, PipelineConfig::default())?;

    let text = paragraphs(100, 248);
    assert_eq!(text.chars().count(), 24_998);

    let report = pipeline.run(&Document::new("long.txt", text)).await?;

    assert_eq!(report.chunk_count(), 4);
    assert_eq!(service.count(Kind::Summarize), 4);
    assert_eq!(service.count(Kind::Merge), 1);
    assert_eq!(service.count(Kind::Continuation), 0);
    assert_eq!(service.count(Kind::Polish), 1);
    assert_eq!(report.summary, MERGED);
    assert_eq!(report.source_length, 24_998);
    assert!(!report.is_degraded());
    Ok(())
}

/// GIVEN more chunks than the hierarchical threshold
/// WHEN summaries are merged
/// THEN batches are merged first, then once more, keeping chunk order
#[tokio::test]
async fn test_hierarchical_merge_preserves_order() -> TestResult {
    let service = Arc::new(Scripted::new());
    let pipeline = summarizer(&service, one_paragraph_per_chunk(), PipelineConfig::default())?;

    let report = pipeline
        .run(&Document::new("many.txt", paragraphs(12, 300)))
        .await?;

    assert_eq!(report.chunk_count(), 12);
    // 3 batches of 4, then the final pass.
    assert_eq!(service.count(Kind::Merge), 4);

    let positions: Vec<usize> = (1..=12)
        .map(|n| report.summary.find(&format!("Summary of section {n}.")).unwrap())
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]));
    Ok(())
}

/// GIVEN the flat strategy and few chunks
/// WHEN the document is summarized
/// THEN two or fewer chunks skip the merge call entirely
#[tokio::test]
async fn test_two_chunks_skip_merge() -> TestResult {
    let service = Arc::new(Scripted::new());
    let config = PipelineConfig::default().with_merge_strategy(MergeStrategy::Flat);
    let pipeline = summarizer(&service, one_paragraph_per_chunk(), config)?;

    let report = pipeline
        .run(&Document::new("pair.txt", paragraphs(2, 300)))
        .await?;

    assert_eq!(report.chunk_count(), 2);
    assert_eq!(service.count(Kind::Merge), 0);
    assert!(report.trace.contains(Stage::SkipMerge));
    assert_eq!(report.summary, "Summary of section 1.\n\nSummary of section 2.");
    Ok(())
}

/// GIVEN mock mode
/// WHEN a many-chunk document is summarized
/// THEN no merge or polish call is made
#[tokio::test]
async fn test_mock_mode_concatenates() -> TestResult {
    let service = Arc::new(Scripted::new());
    let config = PipelineConfig::default().with_mock(true);
    let pipeline = summarizer(&service, one_paragraph_per_chunk(), config)?;

    let report = pipeline
        .run(&Document::new("mock.txt", paragraphs(6, 300)))
        .await?;

    assert_eq!(service.count(Kind::Merge), 0);
    assert_eq!(service.count(Kind::Polish), 0);
    assert!(report.summary.starts_with("Summary of section 1."));
    assert!(report.summary.ends_with("Summary of section 6."));
    Ok(())
}

/// GIVEN malformed responses for chunk summaries
/// WHEN the document is summarized
/// THEN each chunk falls back to an excerpt of its own content
#[tokio::test]
async fn test_malformed_chunk_response_degrades_chunk() -> TestResult {
    let service = Arc::new(Scripted::new().summarize(Reply::Malformed));
    let pipeline = summarizer(&service, one_paragraph_per_chunk(), PipelineConfig::default())?;

    let report = pipeline
        .run(&Document::new("malformed.txt", paragraphs(3, 300)))
        .await?;

    assert!(report.chunk_summaries.iter().all(|s| s.degraded));
    assert_eq!(
        report.degradations.iter().filter(|d| d.stage == Stage::PerChunkSummarize).count(),
        3
    );
    Ok(())
}

/// GIVEN a polish stage that fails
/// WHEN the document is summarized
/// THEN the merge output is kept unchanged
#[tokio::test]
async fn test_failed_polish_keeps_text() -> TestResult {
    let service = Arc::new(
        Scripted::new()
            .merge(Reply::Text("Merged overview."))
            .polish(Reply::Fail),
    );
    let pipeline = summarizer(&service, one_paragraph_per_chunk(), PipelineConfig::default())?;

    let report = pipeline
        .run(&Document::new("polish.txt", paragraphs(3, 300)))
        .await?;

    assert_eq!(report.summary, "Merged overview.");
    assert!(report.degradations.iter().any(|d| d.stage == Stage::Polish));
    Ok(())
}

/// GIVEN a degraded service reporting a 0.5 multiplier
/// WHEN the same document is chunked
/// THEN the effective chunk size shrinks
#[tokio::test]
async fn test_health_multiplier_shrinks_chunks() -> TestResult {
    let chunker = ChunkerConfig::with_bounds(2_000, 8_000)
        .base_size(2_000)
        .max_chunks(4);
    let document = Document::new("health.txt", paragraphs(100, 248));

    let healthy = Arc::new(Scripted::new());
    let degraded = Arc::new(Scripted::new().multiplier(0.5));

    let fast = summarizer(&healthy, chunker.clone(), PipelineConfig::default())?
        .run(&document)
        .await?;
    let slow = summarizer(&degraded, chunker, PipelineConfig::default())?
        .run(&document)
        .await?;

    assert!(slow.plan.effective_size < fast.plan.effective_size);
    assert!((slow.health.multiplier - 0.5).abs() < f64::EPSILON);
    Ok(())
}

/// GIVEN probes measuring 500ms, 3000ms, 3000ms
/// WHEN they are folded into the shared health monitor
/// THEN the multiplier drops after the second probe and stays at or above 0.5
#[tokio::test]
async fn test_health_adaptation_sequence() {
    let monitor = HealthMonitor::new(Duration::ZERO);
    let mut multipliers = Vec::new();

    for latency_ms in [500, 3_000, 3_000] {
        let status = monitor
            .probe_with(|| async move { Ok(Duration::from_millis(latency_ms)) })
            .await;
        multipliers.push(status.multiplier);
    }

    assert!(multipliers[1] < multipliers[0]);
    assert!(multipliers.iter().all(|m| *m >= 0.5));
}

/// GIVEN a document whose text is only whitespace
/// WHEN it is summarized
/// THEN the run fails without calling the service
#[tokio::test]
async fn test_blank_document_is_rejected() -> TestResult {
    let service = Arc::new(Scripted::new());
    let pipeline = summarizer(&service, one_paragraph_per_chunk(), PipelineConfig::default())?;

    let result = pipeline.run(&Document::new("blank.txt", " \n\n ")).await;

    assert!(matches!(result, Err(precis_pipeline::Error::Chunking(_))));
    assert_eq!(service.count(Kind::Summarize), 0);
    Ok(())
}

/// GIVEN a short letterhead line before the body
/// WHEN preprocessing is enabled
/// THEN the letterhead is reported as removed and never reaches a chunk
#[tokio::test]
async fn test_letterhead_is_dropped_before_chunking() -> TestResult {
    let service = Arc::new(Scripted::new().summarize(Reply::Echo));
    let chunker = one_paragraph_per_chunk().preprocess(PreprocessOptions::default());
    let pipeline = summarizer(&service, chunker, PipelineConfig::default().with_polish(false))?;

    let text = format!("ACME Bank Ltd.\n\n{}", paragraphs(2, 300));
    let report = pipeline.run(&Document::new("letter.txt", text)).await?;

    assert_eq!(report.removed_artifacts, vec!["ACME Bank Ltd.".to_string()]);
    assert!(!report.summary.contains("ACME"));
    Ok(())
}
