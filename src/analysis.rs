//! # Analysis Module
//!
//! Parses the model's analyze-and-plan reply into an [`AnalysisResult`].
//!
//! The reply is expected to hold a JSON document shaped as
//! `{"analysis": {...}}`, possibly wrapped in decorations. Accepted
//! decorations, stripped in this order:
//!
//! 1. every backtick character (code fences)
//! 2. a leading `json` language tag, any letter case, plus following whitespace
//! 3. surrounding whitespace
//!
//! Anything else that keeps the text from parsing yields `None`.

use serde::{Deserialize, Deserializer, Serialize};
use tracing::error;

/// The model's assessment of the findings so far and its plan for the next step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalysisResult {
    #[serde(deserialize_with = "null_as_default")]
    pub summary: String,

    /// Topics that still need research; only the first is followed up
    #[serde(deserialize_with = "null_as_default")]
    pub gaps: Vec<String>,

    #[serde(deserialize_with = "null_as_default")]
    pub next_steps: Vec<String>,

    #[serde(deserialize_with = "null_as_default")]
    pub should_continue: bool,

    pub next_search_topic: Option<String>,

    pub url_to_search: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnalysisEnvelope {
    #[serde(default)]
    analysis: Option<AnalysisResult>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Parse a raw model reply into an analysis.
///
/// Returns `None` when nothing is left after stripping decorations, when the
/// remainder is not valid JSON, or when it has no `analysis` member.
pub fn parse_analysis(raw: &str) -> Option<AnalysisResult> {
    let cleaned = strip_decorations(raw);

    if cleaned.is_empty() {
        error!("Analysis response was empty");
        return None;
    }

    match serde_json::from_str::<AnalysisEnvelope>(&cleaned) {
        Ok(AnalysisEnvelope {
            analysis: Some(analysis),
        }) => Some(analysis),
        Ok(AnalysisEnvelope { analysis: None }) => {
            error!("Analysis response had no analysis member");
            None
        }
        Err(e) => {
            error!(error = %e, "Failed to parse analysis response");
            None
        }
    }
}

fn strip_decorations(raw: &str) -> String {
    let unfenced = raw.replace('`', "");
    strip_language_tag(&unfenced).trim().to_string()
}

fn strip_language_tag(text: &str) -> &str {
    match text.get(..4) {
        Some(tag) if tag.eq_ignore_ascii_case("json") => text[4..].trim_start(),
        _ => text,
    }
}
