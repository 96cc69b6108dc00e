//! # Agent Module
//!
//! Exposes deep research as a Rig tool and wires the outer agent that calls it.
//!
//! The outer agent is a single Ollama completion instructed to call the
//! `deep_research` tool exactly once with the user's question; the tool runs
//! the full [`ResearchOrchestrator`] loop and hands back the synthesized answer.

use anyhow::Result;
use rig::client::CompletionClient;
use rig::completion::{Prompt, ToolDefinition};
use rig::tool::Tool;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::ResearchError;
use crate::llm::{ollama_client, OllamaGenerator};
use crate::orchestrator::ResearchOrchestrator;
use crate::state::ResearchReport;
use crate::tools::FirecrawlClient;

// =============================================================================
// SYSTEM PROMPT
// =============================================================================
const RESEARCH_SYSTEM_PROMPT: &str = r#"
You are a research coordinator. Every user message is a question to research.

IMPORTANT INSTRUCTIONS:
1. Call the deep_research tool EXACTLY ONCE, passing the user's question as the topic
2. Do not answer from your own knowledge and do not call the tool again
3. After the tool returns, reply with its analysis as your answer
"#;

/// Turns allowed for the outer agent: one tool call, one final reply
const AGENT_TURNS: usize = 2;

// =============================================================================
// DEEP RESEARCH TOOL
// =============================================================================
/// Input arguments for the deep research tool.
#[derive(Debug, Deserialize, Serialize)]
pub struct DeepResearchArgs {
    /// The topic or question to research
    pub topic: String,

    /// Research iterations for this call; the configured depth when absent
    #[serde(default)]
    pub max_depth: Option<usize>,
}

/// Rig tool running one deep research pass per call.
#[derive(Clone)]
pub struct DeepResearchTool {
    orchestrator: Arc<ResearchOrchestrator>,
    max_depth: usize,
}

impl DeepResearchTool {
    pub fn new(orchestrator: Arc<ResearchOrchestrator>, max_depth: usize) -> Self {
        Self {
            orchestrator,
            max_depth,
        }
    }
}

impl Tool for DeepResearchTool {
    const NAME: &'static str = "deep_research";

    type Args = DeepResearchArgs;
    type Output = String;
    type Error = ResearchError;

    async fn definition(&self, _prompt: String) -> ToolDefinition {
        ToolDefinition {
            name: Self::NAME.to_string(),
            description: "Perform deep research on a topic using an AI agent that coordinates \
                          search, extract, and analysis tools with reasoning steps."
                .to_string(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "topic": {
                        "type": "string",
                        "description": "The topic or question to research"
                    },
                    "max_depth": {
                        "type": "integer",
                        "minimum": 1,
                        "description": "Maximum research iterations (default: configured depth)"
                    }
                },
                "required": ["topic"]
            }),
        }
    }

    async fn call(&self, args: Self::Args) -> Result<Self::Output, Self::Error> {
        let max_depth = args.max_depth.unwrap_or(self.max_depth);
        info!(topic = %args.topic, max_depth, "deep_research tool invoked");
        self.orchestrator
            .run_deep_research(&args.topic, max_depth)
            .await
    }
}

// =============================================================================
// RESEARCH AGENT
// =============================================================================
/// Entry point used by the CLI: owns the configuration and the orchestrator.
pub struct ResearchAgent {
    config: Config,
    orchestrator: Arc<ResearchOrchestrator>,
}

impl ResearchAgent {
    /// Build the agent with Firecrawl search/extraction and Ollama generation.
    pub fn new(config: Config) -> Self {
        let firecrawl = Arc::new(FirecrawlClient::new(
            config.firecrawl_api_key.clone().unwrap_or_default(),
            config.firecrawl_api_url.clone(),
        ));
        let generator = Arc::new(OllamaGenerator::new(&config));
        let orchestrator = ResearchOrchestrator::new(firecrawl.clone(), firecrawl, generator);

        Self::with_orchestrator(config, orchestrator)
    }

    pub fn with_orchestrator(config: Config, orchestrator: ResearchOrchestrator) -> Self {
        Self {
            config,
            orchestrator: Arc::new(orchestrator),
        }
    }

    /// Research through the outer tool-calling agent.
    pub async fn research(&self, query: &str) -> Result<String> {
        info!(query = %query, "Starting research task");

        let client = ollama_client(&self.config.ollama_host);
        debug!(
            host = %self.config.ollama_host,
            model = %self.config.model,
            "Connected to Ollama"
        );

        let agent = client
            .agent(&self.config.model)
            .preamble(RESEARCH_SYSTEM_PROMPT)
            .tool(DeepResearchTool::new(
                self.orchestrator.clone(),
                self.config.max_depth,
            ))
            .build();

        let instruction = format!(
            "The user has asked a question. Your task is to perform deep research on their \
             question. You must call the deep_research tool and use the user's question as the \
             topic parameter. The user's question is: \"{}\"",
            query
        );

        let response = agent
            .prompt(&instruction)
            .multi_turn(AGENT_TURNS)
            .await
            .map_err(|e| anyhow::anyhow!("Agent execution failed: {}", e))?;

        info!("Research completed successfully");

        Ok(response)
    }

    /// Run the research loop directly, without the outer agent.
    pub async fn research_direct(&self, query: &str) -> Result<ResearchReport> {
        info!(query = %query, "Running research loop directly");

        let report = self.orchestrator.run(query, self.config.max_depth).await?;
        Ok(report)
    }
}
