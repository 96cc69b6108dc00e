//! # Research State
//!
//! The mutable state of one research run and the report produced from it.
//!
//! A [`ResearchState`] is created per run, moved through every iteration of
//! the loop and consumed into a [`ResearchReport`] once synthesis returns.
//! Fields are private: findings and summaries can only be appended, the depth
//! only grows up to its bound, and the failure counter never resets.

use serde::Serialize;
use std::fmt;
use tracing::debug;

use crate::analysis::AnalysisResult;
use crate::config::ResearchConfig;

/// Text extracted from one source URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub text: String,
    pub source: String,
}

impl Finding {
    pub fn new(text: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source: source.into(),
        }
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[From {}]: {}", self.source, self.text)
    }
}

/// Phases of the research state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResearchPhase {
    #[default]
    Searching,
    Extracting,
    Analyzing,
    Replanning,
    Synthesizing,
}

/// Why the research loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    TimeBudgetExhausted,
    DepthExhausted,
    TooManyFailures,
    AnalysisComplete,
}

/// Decision taken at the end of an iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopControl {
    Continue,
    Stop(StopReason),
}

#[derive(Debug, Clone)]
pub struct ResearchState {
    question: String,
    topic: String,
    findings: Vec<Finding>,
    summaries: Vec<String>,
    next_search_topic: Option<String>,
    url_to_search: Option<String>,
    current_depth: usize,
    max_depth: usize,
    failed_attempts: u32,
    max_failed_attempts: u32,
    completed_steps: usize,
    total_expected_steps: usize,
    phase: ResearchPhase,
}

impl ResearchState {
    pub fn new(question: impl Into<String>, max_depth: usize, config: &ResearchConfig) -> Self {
        let question = question.into();
        Self {
            topic: question.clone(),
            question,
            findings: Vec::new(),
            summaries: Vec::new(),
            next_search_topic: None,
            url_to_search: None,
            current_depth: 0,
            max_depth,
            failed_attempts: 0,
            max_failed_attempts: config.max_failed_attempts,
            completed_steps: 0,
            total_expected_steps: max_depth * config.steps_per_depth,
            phase: ResearchPhase::default(),
        }
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    /// The working topic: the question, or the gap chosen at the last replan.
    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    pub fn summaries(&self) -> &[String] {
        &self.summaries
    }

    pub fn url_to_search(&self) -> Option<&str> {
        self.url_to_search.as_deref()
    }

    pub fn current_depth(&self) -> usize {
        self.current_depth
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn failed_attempts(&self) -> u32 {
        self.failed_attempts
    }

    pub fn completed_steps(&self) -> usize {
        self.completed_steps
    }

    pub fn total_expected_steps(&self) -> usize {
        self.total_expected_steps
    }

    pub fn phase(&self) -> ResearchPhase {
        self.phase
    }

    pub fn has_depth_remaining(&self) -> bool {
        self.current_depth < self.max_depth
    }

    /// Query for the next search: the analysis override if any, else the topic.
    pub fn search_query(&self) -> &str {
        self.next_search_topic.as_deref().unwrap_or(&self.topic)
    }

    /// Start an iteration in the searching phase; returns the new depth.
    pub fn begin_iteration(&mut self) -> usize {
        debug_assert!(self.has_depth_remaining());
        self.current_depth += 1;
        self.enter(ResearchPhase::Searching);
        self.current_depth
    }

    pub fn enter(&mut self, phase: ResearchPhase) {
        debug!(
            from = ?self.phase,
            to = ?phase,
            depth = self.current_depth,
            "Research phase transition"
        );
        self.phase = phase;
    }

    pub fn complete_step(&mut self) {
        self.completed_steps += 1;
        debug!(
            completed = self.completed_steps,
            total = self.total_expected_steps,
            "Research progress"
        );
    }

    pub fn add_findings(&mut self, findings: Vec<Finding>) {
        self.findings.extend(findings);
    }

    /// Count a failed search or analysis and decide whether to go on.
    pub fn record_failure(&mut self) -> LoopControl {
        self.failed_attempts += 1;
        if self.failed_attempts >= self.max_failed_attempts {
            LoopControl::Stop(StopReason::TooManyFailures)
        } else {
            LoopControl::Continue
        }
    }

    /// Take the search override, extra URL and summary from an analysis.
    ///
    /// A missing analysis clears both overrides and records an empty summary,
    /// so every executed analyze phase leaves exactly one summary behind.
    pub fn apply_analysis(&mut self, analysis: Option<&AnalysisResult>) {
        self.next_search_topic = analysis
            .and_then(|a| a.next_search_topic.clone())
            .filter(|topic| !topic.trim().is_empty());
        self.url_to_search = analysis
            .and_then(|a| a.url_to_search.clone())
            .filter(|url| !url.trim().is_empty());
        self.summaries
            .push(analysis.map(|a| a.summary.clone()).unwrap_or_default());
    }

    /// Decide the next step from a successful analysis.
    ///
    /// Only the first gap becomes the new topic; the rest are dropped.
    pub fn replan(&mut self, analysis: AnalysisResult) -> LoopControl {
        self.enter(ResearchPhase::Replanning);

        if !analysis.should_continue {
            return LoopControl::Stop(StopReason::AnalysisComplete);
        }

        match analysis.gaps.into_iter().next() {
            None => LoopControl::Stop(StopReason::AnalysisComplete),
            Some(gap) => {
                if !gap.trim().is_empty() {
                    self.topic = gap;
                }
                LoopControl::Continue
            }
        }
    }

    pub fn into_report(self, answer: String, stop_reason: StopReason) -> ResearchReport {
        ResearchReport {
            question: self.question,
            topic: self.topic,
            answer,
            findings: self.findings,
            summaries: self.summaries,
            depth_reached: self.current_depth,
            failed_attempts: self.failed_attempts,
            completed_steps: self.completed_steps,
            total_expected_steps: self.total_expected_steps,
            stop_reason,
        }
    }
}

/// Everything a finished research run produced.
#[derive(Debug, Clone, Serialize)]
pub struct ResearchReport {
    pub question: String,
    /// Working topic at the time of synthesis
    pub topic: String,
    pub answer: String,
    pub findings: Vec<Finding>,
    pub summaries: Vec<String>,
    pub depth_reached: usize,
    pub failed_attempts: u32,
    pub completed_steps: usize,
    pub total_expected_steps: usize,
    pub stop_reason: StopReason,
}
