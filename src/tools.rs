//! # Tools Module
//!
//! Web search and content extraction capabilities used by the research loop.
//!
//! The orchestrator only sees the two traits defined here, [`WebSearch`] and
//! [`ContentExtractor`]. [`FirecrawlClient`] implements both against the
//! Firecrawl HTTP API:
//! - `POST /v1/search` for ranked result URLs
//! - `POST /v1/extract` followed by `GET /v1/extract/{id}` polling for
//!   prompt-guided structured extraction

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Default timeout for a single Firecrawl HTTP request
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// How long to wait between extract job status checks
const DEFAULT_POLL_INTERVAL_MS: u64 = 2_000;

/// Status checks before an extract job is abandoned
const DEFAULT_MAX_POLLS: u32 = 30;

/// Results requested per search
const SEARCH_LIMIT: usize = 5;

// =============================================================================
// CUSTOM ERROR TYPES
// =============================================================================
/// Errors raised by a [`WebSearch`] implementation.
///
/// The research loop absorbs the provider-reported variants through its
/// failure counter (see [`SearchError::is_recoverable`]); the rest abort the
/// whole research run.
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Search provider reported failure: {0}")]
    Unsuccessful(String),

    #[error("Rate limited by search provider, please wait")]
    RateLimited,

    #[error("Search provider returned HTTP {0}: {1}")]
    Http(u16, String),

    #[error("Unauthorized - check FIRECRAWL_API_KEY")]
    Unauthorized,

    #[error("Failed to parse search response: {0}")]
    Parse(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl SearchError {
    /// Whether the provider answered but reported a failed search.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SearchError::Unsuccessful(_) | SearchError::RateLimited | SearchError::Http(_, _)
        )
    }
}

/// Errors raised by a [`ContentExtractor`]. Never fatal to a research run.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Extraction provider reported failure: {0}")]
    Unsuccessful(String),

    #[error("Extraction provider returned HTTP {0}: {1}")]
    Http(u16, String),

    #[error("Extract job {id} ended with status {status}")]
    JobFailed { id: String, status: String },

    #[error("Extract job {id} still pending after {polls} status checks")]
    PollLimit { id: String, polls: u32 },

    #[error("Extraction response carried no data")]
    MissingData,

    #[error("Failed to parse extraction response: {0}")]
    Parse(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

// =============================================================================
// CAPABILITY TYPES
// =============================================================================
/// One ranked search result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    /// The URL of the result
    pub url: String,

    /// Page title, when the provider returns one
    #[serde(default)]
    pub title: Option<String>,

    /// Snippet/description of the content
    #[serde(default)]
    pub description: Option<String>,
}

impl SearchHit {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: None,
            description: None,
        }
    }
}

/// Extracted content for one URL.
///
/// A provider may answer with a list of items or with a single document; each
/// item (or the single document) becomes one finding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractPayload {
    Single(String),
    Many(Vec<String>),
}

impl ExtractPayload {
    /// Build a payload from a raw JSON `data` value.
    ///
    /// Arrays yield one text per element, using the element's own `data` member
    /// when present. Strings are taken as-is; any other JSON is serialized.
    pub fn from_json(data: Value) -> Self {
        match data {
            Value::Array(items) => ExtractPayload::Many(
                items
                    .into_iter()
                    .map(|item| match item {
                        Value::Object(mut fields) => match fields.remove("data") {
                            Some(inner) => json_text(inner),
                            None => json_text(Value::Object(fields)),
                        },
                        other => json_text(other),
                    })
                    .collect(),
            ),
            other => ExtractPayload::Single(json_text(other)),
        }
    }

    /// Flatten into the ordered list of texts.
    pub fn into_texts(self) -> Vec<String> {
        match self {
            ExtractPayload::Single(text) => vec![text],
            ExtractPayload::Many(texts) => texts,
        }
    }
}

fn json_text(value: Value) -> String {
    match value {
        Value::String(text) => text,
        other => other.to_string(),
    }
}

/// Web search capability.
#[async_trait]
pub trait WebSearch: Send + Sync {
    /// Search for `query`, returning hits in provider ranking order.
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, SearchError>;
}

/// Prompt-guided content extraction capability.
#[async_trait]
pub trait ContentExtractor: Send + Sync {
    /// Extract information from a single `url`, guided by `prompt`.
    async fn extract(&self, url: &str, prompt: &str) -> Result<ExtractPayload, ExtractError>;
}

// =============================================================================
// FIRECRAWL CLIENT
// =============================================================================
/// Firecrawl API client providing both search and extraction.
///
/// # Example
/// ```ignore
/// let firecrawl = FirecrawlClient::new("fc-key", "https://api.firecrawl.dev");
/// let hits = firecrawl.search("causes of insomnia").await?;
/// ```
#[derive(Debug, Clone)]
pub struct FirecrawlClient {
    api_key: String,
    base_url: String,
    client: Client,
    timeout: Duration,
    poll_interval: Duration,
    max_polls: u32,
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    limit: usize,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Vec<SearchHit>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct ExtractRequest<'a> {
    urls: [&'a str; 1],
    prompt: &'a str,
}

/// Shared shape of the extract submission and the job status responses.
#[derive(Debug, Deserialize)]
struct ExtractResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

impl FirecrawlClient {
    /// Create a client for the Firecrawl API rooted at `base_url`.
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: Client::new(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            max_polls: DEFAULT_MAX_POLLS,
        }
    }

    /// Set custom per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set how often a pending extract job is checked and how many checks are made
    pub fn with_polling(mut self, interval: Duration, max_polls: u32) -> Self {
        self.poll_interval = interval;
        self.max_polls = max_polls;
        self
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn submit_extract(&self, url: &str, prompt: &str) -> Result<ExtractResponse, ExtractError> {
        let response = self
            .client
            .post(self.endpoint("/v1/extract"))
            .bearer_auth(&self.api_key)
            .timeout(self.timeout)
            .json(&ExtractRequest { urls: [url], prompt })
            .send()
            .await?;

        read_extract_response(response).await
    }

    async fn extract_status(&self, id: &str) -> Result<ExtractResponse, ExtractError> {
        let response = self
            .client
            .get(self.endpoint(&format!("/v1/extract/{}", id)))
            .bearer_auth(&self.api_key)
            .timeout(self.timeout)
            .send()
            .await?;

        read_extract_response(response).await
    }

    /// Wait for a submitted extract job to leave the pending states.
    async fn await_extract_job(&self, id: &str) -> Result<Value, ExtractError> {
        for poll in 1..=self.max_polls {
            tokio::time::sleep(self.poll_interval).await;

            let status = self.extract_status(id).await?;
            match status.status.as_deref() {
                Some("completed") => return status.data.ok_or(ExtractError::MissingData),
                Some("processing") | Some("pending") | None => {
                    debug!(job = %id, poll, "Extract job still pending");
                }
                Some(other) => {
                    return Err(ExtractError::JobFailed {
                        id: id.to_string(),
                        status: other.to_string(),
                    })
                }
            }
        }

        Err(ExtractError::PollLimit {
            id: id.to_string(),
            polls: self.max_polls,
        })
    }
}

async fn read_extract_response(response: reqwest::Response) -> Result<ExtractResponse, ExtractError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ExtractError::Http(status.as_u16(), body));
    }

    let body: ExtractResponse = response
        .json()
        .await
        .map_err(|e| ExtractError::Parse(e.to_string()))?;

    if !body.success {
        return Err(ExtractError::Unsuccessful(
            body.error.unwrap_or_else(|| "success=false".to_string()),
        ));
    }

    Ok(body)
}

#[async_trait]
impl WebSearch for FirecrawlClient {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, SearchError> {
        info!(query = %query, "Performing web search");

        let response = self
            .client
            .post(self.endpoint("/v1/search"))
            .bearer_auth(&self.api_key)
            .timeout(self.timeout)
            .json(&SearchRequest {
                query,
                limit: SEARCH_LIMIT,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match status {
                StatusCode::UNAUTHORIZED => SearchError::Unauthorized,
                StatusCode::TOO_MANY_REQUESTS => SearchError::RateLimited,
                _ => SearchError::Http(status.as_u16(), body),
            });
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| SearchError::Parse(e.to_string()))?;

        if !body.success {
            return Err(SearchError::Unsuccessful(
                body.error.unwrap_or_else(|| "success=false".to_string()),
            ));
        }

        if body.data.is_empty() {
            warn!(query = %query, "No search results found");
        } else {
            info!(query = %query, count = body.data.len(), "Search completed");
        }

        Ok(body.data)
    }
}

#[async_trait]
impl ContentExtractor for FirecrawlClient {
    async fn extract(&self, url: &str, prompt: &str) -> Result<ExtractPayload, ExtractError> {
        debug!(url = %url, "Submitting extract job");

        let submitted = self.submit_extract(url, prompt).await?;

        // Small pages may complete synchronously.
        let data = match (submitted.data, submitted.id) {
            (Some(data), _) => data,
            (None, Some(id)) => self.await_extract_job(&id).await?,
            (None, None) => return Err(ExtractError::MissingData),
        };

        if data.is_null() {
            return Err(ExtractError::MissingData);
        }

        Ok(ExtractPayload::from_json(data))
    }
}
