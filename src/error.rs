//! Errors that end a research run.
//!
//! Expected degradations (failed searches, bad URLs, unusable analyses) are
//! absorbed inside the loop and never show up here.

use thiserror::Error;

use crate::llm::GenerationError;
use crate::tools::SearchError;

#[derive(Error, Debug)]
pub enum ResearchError {
    #[error("Research topic cannot be empty")]
    EmptyTopic,

    #[error("Search failed: {0}")]
    Search(#[from] SearchError),

    #[error("Final synthesis failed: {0}")]
    Synthesis(#[source] GenerationError),
}

pub type Result<T> = std::result::Result<T, ResearchError>;
