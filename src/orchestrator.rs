//! # Research Orchestrator
//!
//! Drives the bounded research loop:
//!
//! ```text
//!   ┌──────────────────────────────────────────────────────────┐
//!   │  Searching ─▶ Extracting ─▶ Analyzing ─▶ Replanning ──┐  │
//!   │      ▲                                                │  │
//!   │      └────────────────────────────────────────────────┘  │
//!   └───────────────┬──────────────────────────────────────────┘
//!                   ▼  time budget / depth / failures / analysis says stop
//!              Synthesizing
//! ```
//!
//! Each iteration takes the [`ResearchState`] by value and hands it back with a
//! [`LoopControl`] decision, so the loop body owns the state outright between
//! external calls. Only extraction fans out, and it is joined before the
//! findings are appended.

use std::sync::Arc;
use tokio::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::analysis::{parse_analysis, AnalysisResult};
use crate::config::ResearchConfig;
use crate::error::{ResearchError, Result};
use crate::extraction::{candidate_urls, extract_all};
use crate::llm::{GenerationRequest, TextGenerator};
use crate::prompts;
use crate::state::{LoopControl, ResearchPhase, ResearchReport, ResearchState, StopReason};
use crate::tools::{ContentExtractor, WebSearch};

/// Default number of research iterations per question
pub const DEFAULT_MAX_DEPTH: usize = 1;

pub struct ResearchOrchestrator {
    search: Arc<dyn WebSearch>,
    extractor: Arc<dyn ContentExtractor>,
    generator: Arc<dyn TextGenerator>,
    config: ResearchConfig,
}

impl ResearchOrchestrator {
    pub fn new(
        search: Arc<dyn WebSearch>,
        extractor: Arc<dyn ContentExtractor>,
        generator: Arc<dyn TextGenerator>,
    ) -> Self {
        Self {
            search,
            extractor,
            generator,
            config: ResearchConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ResearchConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ResearchConfig {
        &self.config
    }

    /// Research `topic` for at most `max_depth` iterations and return the
    /// synthesized answer.
    pub async fn run_deep_research(&self, topic: &str, max_depth: usize) -> Result<String> {
        self.run(topic, max_depth).await.map(|report| report.answer)
    }

    /// Like [`run_deep_research`](Self::run_deep_research), returning the full report.
    pub async fn run(&self, topic: &str, max_depth: usize) -> Result<ResearchReport> {
        if topic.trim().is_empty() {
            return Err(ResearchError::EmptyTopic);
        }

        info!(topic = %topic, max_depth, "Starting deep research");

        let started = Instant::now();
        let mut state = ResearchState::new(topic, max_depth, &self.config);

        let stop_reason = loop {
            if !state.has_depth_remaining() {
                break StopReason::DepthExhausted;
            }

            let elapsed = started.elapsed();
            if elapsed >= self.config.time_limit {
                info!(elapsed_ms = elapsed.as_millis() as u64, "Time budget exhausted");
                break StopReason::TimeBudgetExhausted;
            }

            let (next, control) = match self.iterate(state, started).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(error = %e, "Deep research failed");
                    return Err(e);
                }
            };
            state = next;

            if let LoopControl::Stop(reason) = control {
                break reason;
            }
        };

        info!(
            ?stop_reason,
            depth = state.current_depth(),
            findings = state.findings().len(),
            summaries = state.summaries().len(),
            failed_attempts = state.failed_attempts(),
            "Research loop finished"
        );
        log_collected(&state);

        let answer = self.synthesize(&mut state).await.map_err(|e| {
            error!(error = %e, "Deep research failed");
            e
        })?;

        Ok(state.into_report(answer, stop_reason))
    }

    /// One search → extract → analyze → replan pass.
    async fn iterate(
        &self,
        mut state: ResearchState,
        started: Instant,
    ) -> Result<(ResearchState, LoopControl)> {
        let depth = state.begin_iteration();
        let query = state.search_query().to_string();
        info!(depth, topic = %state.topic(), query = %query, "Research step");

        let hits = match self.search.search(&query).await {
            Ok(hits) => hits,
            Err(e) if e.is_recoverable() => {
                warn!(depth, error = %e, "Search failed");
                let control = state.record_failure();
                return Ok((state, control));
            }
            Err(e) => return Err(e.into()),
        };
        debug!(depth, count = hits.len(), "Search results received");
        state.complete_step();

        let urls = candidate_urls(state.url_to_search(), &hits, self.config.top_urls);
        state.complete_step();

        state.enter(ResearchPhase::Extracting);
        let findings = extract_all(self.extractor.as_ref(), &urls, state.topic()).await;
        info!(depth, new_findings = findings.len(), "Extraction phase completed");
        state.add_findings(findings);
        state.complete_step();

        state.enter(ResearchPhase::Analyzing);
        let remaining = self.config.time_limit.saturating_sub(started.elapsed());
        let analysis = self.analyze_and_plan(&state, remaining).await;
        state.apply_analysis(analysis.as_ref());
        state.complete_step();
        debug!(depth, analysis = ?analysis, "Analysis phase completed");

        let Some(analysis) = analysis else {
            let control = state.record_failure();
            return Ok((state, control));
        };

        let control = state.replan(analysis);
        state.complete_step();
        info!(depth, next_topic = %state.topic(), ?control, "Replanned");

        Ok((state, control))
    }

    /// Ask the model to analyze all findings so far; `None` when the call fails
    /// or its reply cannot be parsed.
    async fn analyze_and_plan(
        &self,
        state: &ResearchState,
        remaining: Duration,
    ) -> Option<AnalysisResult> {
        let mut request =
            GenerationRequest::new(prompts::analysis(state.topic(), state.findings(), remaining));
        if let Some(tokens) = self.config.analysis_max_tokens {
            request = request.with_max_output_tokens(tokens);
        }

        match self.generator.generate(request).await {
            Ok(text) => parse_analysis(&text),
            Err(e) => {
                error!(error = %e, "Analysis failed");
                None
            }
        }
    }

    async fn synthesize(&self, state: &mut ResearchState) -> Result<String> {
        state.enter(ResearchPhase::Synthesizing);
        info!(topic = %state.topic(), "Synthesizing final analysis");

        let request = GenerationRequest::new(prompts::synthesis(
            state.topic(),
            state.findings(),
            state.summaries(),
        ))
        .with_max_output_tokens(self.config.synthesis_max_tokens);

        self.generator
            .generate(request)
            .await
            .map_err(ResearchError::Synthesis)
    }
}

fn log_collected(state: &ResearchState) {
    if state.findings().is_empty() {
        debug!("No findings collected");
    }
    for (index, finding) in state.findings().iter().enumerate() {
        debug!(index = index + 1, source = %finding.source, text = %finding.text, "Finding");
    }
    for (index, summary) in state.summaries().iter().enumerate() {
        debug!(index = index + 1, text = %summary, "Summary");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::GenerationError;
    use crate::tools::{ExtractError, ExtractPayload, SearchError, SearchHit};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FixedSearch;

    #[async_trait]
    impl WebSearch for FixedSearch {
        async fn search(&self, _query: &str) -> std::result::Result<Vec<SearchHit>, SearchError> {
            Ok(vec![SearchHit::new("https://example.org/a")])
        }
    }

    struct TwoHits;

    #[async_trait]
    impl WebSearch for TwoHits {
        async fn search(&self, _query: &str) -> std::result::Result<Vec<SearchHit>, SearchError> {
            Ok(vec![
                SearchHit::new("https://example.org/a"),
                SearchHit::new("https://example.org/b"),
            ])
        }
    }

    struct UnauthorizedSearch;

    #[async_trait]
    impl WebSearch for UnauthorizedSearch {
        async fn search(&self, _query: &str) -> std::result::Result<Vec<SearchHit>, SearchError> {
            Err(SearchError::Unauthorized)
        }
    }

    struct EchoExtractor;

    #[async_trait]
    impl ContentExtractor for EchoExtractor {
        async fn extract(
            &self,
            url: &str,
            _prompt: &str,
        ) -> std::result::Result<ExtractPayload, ExtractError> {
            Ok(ExtractPayload::Single(format!("content of {}", url)))
        }
    }

    /// Replies with the queued texts in order, then fails.
    struct QueuedGenerator {
        replies: Mutex<Vec<String>>,
        requests: Mutex<Vec<GenerationRequest>>,
    }

    impl QueuedGenerator {
        fn new(replies: &[&str]) -> Self {
            Self {
                replies: Mutex::new(replies.iter().rev().map(|r| r.to_string()).collect()),
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl TextGenerator for QueuedGenerator {
        async fn generate(
            &self,
            request: GenerationRequest,
        ) -> std::result::Result<String, GenerationError> {
            self.requests.lock().unwrap().push(request);
            self.replies
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| GenerationError::Completion("no reply queued".to_string()))
        }
    }

    fn orchestrator(search: Arc<dyn WebSearch>, generator: Arc<QueuedGenerator>) -> ResearchOrchestrator {
        ResearchOrchestrator::new(search, Arc::new(EchoExtractor), generator)
    }

    #[tokio::test]
    async fn test_empty_topic_is_rejected() {
        let generator = Arc::new(QueuedGenerator::new(&[]));
        let err = orchestrator(Arc::new(FixedSearch), generator)
            .run("   ", 1)
            .await
            .unwrap_err();

        assert!(matches!(err, ResearchError::EmptyTopic));
    }

    #[tokio::test]
    async fn test_unrecoverable_search_error_propagates() {
        let generator = Arc::new(QueuedGenerator::new(&["unused"]));
        let err = orchestrator(Arc::new(UnauthorizedSearch), generator.clone())
            .run("insomnia", 3)
            .await
            .unwrap_err();

        assert!(matches!(err, ResearchError::Search(SearchError::Unauthorized)));
        assert!(generator.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_synthesis_failure_propagates() {
        let analysis = r#"{"analysis": {"summary": "s", "shouldContinue": false}}"#;
        let generator = Arc::new(QueuedGenerator::new(&[analysis]));

        let err = orchestrator(Arc::new(FixedSearch), generator)
            .run("insomnia", 1)
            .await
            .unwrap_err();

        assert!(matches!(err, ResearchError::Synthesis(_)));
    }

    #[tokio::test]
    async fn test_progress_accounting() {
        let analysis = r#"{"analysis": {"summary": "s", "gaps": ["more"], "shouldContinue": true}}"#;
        let generator = Arc::new(QueuedGenerator::new(&[analysis, analysis, "final"]));

        let report = orchestrator(Arc::new(FixedSearch), generator.clone())
            .run("insomnia", 2)
            .await
            .unwrap();

        assert_eq!(report.answer, "final");
        assert_eq!(report.depth_reached, 2);
        assert_eq!(report.completed_steps, 10);
        assert_eq!(report.total_expected_steps, 10);
        assert_eq!(report.stop_reason, StopReason::DepthExhausted);

        let requests = generator.requests.lock().unwrap();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[0].max_output_tokens, None);
        assert_eq!(requests[2].max_output_tokens, Some(8192));
    }

    #[tokio::test]
    async fn test_top_urls_limits_extraction() {
        let analysis = r#"{"analysis": {"summary": "s", "shouldContinue": false}}"#;
        let generator = Arc::new(QueuedGenerator::new(&[analysis, "final"]));
        let orchestrator = orchestrator(Arc::new(TwoHits), generator)
            .with_config(ResearchConfig::default().with_top_urls(1));
        assert_eq!(orchestrator.config().top_urls, 1);

        let report = orchestrator.run("insomnia", 1).await.unwrap();

        assert_eq!(report.findings.len(), 1);
        assert_eq!(report.findings[0].source, "https://example.org/a");
    }
}
