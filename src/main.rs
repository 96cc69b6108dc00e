//! # Deep Research CLI
//!
//! Researches a question with a bounded search → extract → analyze → replan
//! loop and prints the synthesized answer.
//!
//! ## Quick Start
//! ```bash
//! FIRECRAWL_API_KEY=fc-... cargo run -- "what is the cause of insomnia"
//! ```

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use deep_research::{Config, ResearchAgent};

// =============================================================================
// CLI ARGUMENTS
// =============================================================================
#[derive(Parser, Debug)]
#[command(
    name = "deep-research",
    version,
    about = "Iterative deep research: searches, extracts, analyzes and synthesizes",
    long_about = r#"
Deep Research - bounded iterative research on any question.

Each iteration:
  1. Searches the web (Firecrawl) for the current topic
  2. Extracts key information from the top results
  3. Asks the model what was learned and what gaps remain
  4. Follows up on the first gap, until done or out of budget
A final long-form analysis is synthesized from everything collected.

PREREQUISITES:
  1. A Firecrawl API key in FIRECRAWL_API_KEY
  2. Ollama running locally with a pulled model (ollama pull llama3.2)

EXAMPLES:
  deep-research "what is the cause of insomnia"
  deep-research --depth 3 --direct "state of Rust async runtimes"
  deep-research --direct --json "sleep and memory consolidation"
"#
)]
struct Args {
    /// The research topic or question to investigate
    #[arg(help = "The topic to research", value_name = "QUERY")]
    query: String,

    /// The Ollama model to use (overrides OLLAMA_MODEL env var)
    #[arg(short = 'm', long = "model", help = "Ollama model to use", env = "OLLAMA_MODEL")]
    model: Option<String>,

    /// Research iterations (overrides RESEARCH_MAX_DEPTH env var)
    #[arg(short = 'd', long = "depth", help = "Maximum research iterations")]
    depth: Option<usize>,

    /// Run the research loop directly instead of through the tool-calling agent
    #[arg(long = "direct", help = "Skip the outer agent", default_value = "false")]
    direct: bool,

    /// Print the full research report as JSON
    #[arg(long = "json", requires = "direct")]
    json: bool,

    /// Verbose output (debug logging)
    #[arg(
        short = 'v',
        long = "verbose",
        help = "Enable verbose/debug logging",
        default_value = "false"
    )]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration from environment/.env file
    let mut config = Config::from_env()?;

    init_logging(args.verbose, &config.log_level)?;

    info!("Deep research agent starting up...");

    if let Some(model) = args.model {
        info!(model = %model, "Using model from command line");
        config.model = model;
    }
    if let Some(depth) = args.depth {
        config.max_depth = depth;
    }

    config.validate()?;

    info!(
        model = %config.model,
        host = %config.ollama_host,
        max_depth = config.max_depth,
        "Configuration loaded"
    );

    let agent = ResearchAgent::new(config);

    let result = if args.direct {
        agent.research_direct(&args.query).await.and_then(|report| {
            if args.json {
                Ok(serde_json::to_string_pretty(&report)?)
            } else {
                Ok(report.answer)
            }
        })
    } else {
        agent.research(&args.query).await
    };

    match result {
        Ok(response) => {
            if args.json {
                println!("{}", response);
            } else {
                println!("\n{}", "=".repeat(60));
                println!("RESEARCH RESULTS");
                println!("{}\n", "=".repeat(60));
                println!("{}", response);
                println!("\n{}", "=".repeat(60));
            }
        }
        Err(e) => {
            error!(error = %e, "Research failed");
            eprintln!("\nResearch failed: {}", e);

            let message = e.to_string();
            if message.contains("connection refused") || message.contains("Completion failed") {
                eprintln!("\nTip: Make sure Ollama is running and the model is pulled:");
                eprintln!("   ollama serve && ollama pull llama3.2");
            } else if message.contains("FIRECRAWL_API_KEY") {
                eprintln!("\nTip: Export a valid Firecrawl key:");
                eprintln!("   export FIRECRAWL_API_KEY=fc-...");
            }

            return Err(e);
        }
    }

    info!("Research completed successfully");
    Ok(())
}

// =============================================================================
// LOGGING INITIALIZATION
// =============================================================================
/// Initialize the tracing subscriber. `--verbose` forces debug level,
/// otherwise `RUST_LOG` (default `info`) decides.
fn init_logging(verbose: bool, log_level: &str) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to set logging subscriber: {}", e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_parsing() {
        let args = Args::parse_from(["test", "What is Rust?"]);
        assert_eq!(args.query, "What is Rust?");
        assert!(!args.direct);
        assert!(!args.json);
        assert!(!args.verbose);
        assert_eq!(args.depth, None);
    }

    #[test]
    fn test_args_with_flags() {
        let args = Args::parse_from([
            "test",
            "--direct",
            "--json",
            "--verbose",
            "--depth",
            "3",
            "--model",
            "llama3.2",
            "Test query",
        ]);

        assert_eq!(args.query, "Test query");
        assert!(args.direct);
        assert!(args.json);
        assert!(args.verbose);
        assert_eq!(args.depth, Some(3));
        assert_eq!(args.model, Some("llama3.2".to_string()));
    }

    #[test]
    fn test_json_requires_direct() {
        assert!(Args::try_parse_from(["test", "--json", "q"]).is_err());
    }
}
