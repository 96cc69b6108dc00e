//! Concurrent extraction over the candidate URLs of one iteration.
//!
//! Every URL is extracted independently: an invalid URL or a failed
//! extraction contributes nothing and never affects its siblings. Results are
//! joined in input order, not completion order, before the caller touches the
//! research state.

use futures::future::join_all;
use reqwest::Url;
use tracing::{debug, info, warn};

use crate::prompts;
use crate::state::Finding;
use crate::tools::{ContentExtractor, SearchHit};

/// Candidate URLs for this iteration: the analysis-supplied URL first, then the
/// first `limit` search hits in ranking order. Exact duplicates are dropped.
pub fn candidate_urls(extra: Option<&str>, hits: &[SearchHit], limit: usize) -> Vec<String> {
    let mut urls: Vec<String> = Vec::with_capacity(limit + 1);

    let top = hits.iter().take(limit).map(|hit| hit.url.as_str());
    for url in extra.into_iter().chain(top) {
        if !urls.iter().any(|seen| seen == url) {
            urls.push(url.to_string());
        }
    }

    urls
}

/// Extract findings from all `urls` concurrently.
pub async fn extract_all(
    extractor: &dyn ContentExtractor,
    urls: &[String],
    topic: &str,
) -> Vec<Finding> {
    let prompt = prompts::extraction(topic);
    debug!(urls = ?urls, "Extracting from URLs");

    let per_url = join_all(urls.iter().map(|url| extract_one(extractor, url, &prompt))).await;

    per_url.into_iter().flatten().collect()
}

async fn extract_one(extractor: &dyn ContentExtractor, url: &str, prompt: &str) -> Vec<Finding> {
    if !is_valid_url(url) {
        warn!(url = %url, "Invalid URL, skipping extraction");
        return Vec::new();
    }

    match extractor.extract(url, prompt).await {
        Ok(payload) => {
            let findings: Vec<Finding> = payload
                .into_texts()
                .into_iter()
                .map(|text| Finding::new(text, url))
                .collect();
            info!(url = %url, count = findings.len(), "Extraction completed");
            findings
        }
        Err(e) => {
            warn!(url = %url, error = %e, "Extraction failed");
            Vec::new()
        }
    }
}

fn is_valid_url(url: &str) -> bool {
    Url::parse(url)
        .map(|parsed| matches!(parsed.scheme(), "http" | "https"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{ExtractError, ExtractPayload};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Answers from a fixed table; unknown URLs fail. Slower URLs sleep longer.
    struct TableExtractor {
        answers: HashMap<&'static str, (u64, ExtractPayload)>,
        calls: Mutex<Vec<String>>,
    }

    impl TableExtractor {
        fn new(answers: Vec<(&'static str, u64, ExtractPayload)>) -> Self {
            Self {
                answers: answers
                    .into_iter()
                    .map(|(url, delay, payload)| (url, (delay, payload)))
                    .collect(),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ContentExtractor for TableExtractor {
        async fn extract(&self, url: &str, _prompt: &str) -> Result<ExtractPayload, ExtractError> {
            self.calls.lock().unwrap().push(url.to_string());
            match self.answers.get(url) {
                Some((delay, payload)) => {
                    tokio::time::sleep(Duration::from_millis(*delay)).await;
                    Ok(payload.clone())
                }
                None => Err(ExtractError::Unsuccessful("not found".to_string())),
            }
        }
    }

    fn hits(urls: &[&str]) -> Vec<SearchHit> {
        urls.iter().map(|url| SearchHit::new(*url)).collect()
    }

    #[test]
    fn test_candidates_take_top_three_after_extra() {
        let urls = candidate_urls(
            Some("https://extra.example"),
            &hits(&["https://a.example", "https://b.example", "https://c.example", "https://d.example"]),
            3,
        );

        assert_eq!(
            urls,
            vec![
                "https://extra.example",
                "https://a.example",
                "https://b.example",
                "https://c.example"
            ]
        );
    }

    #[test]
    fn test_candidates_drop_duplicates() {
        let urls = candidate_urls(
            Some("https://a.example"),
            &hits(&["https://a.example", "https://b.example"]),
            3,
        );

        assert_eq!(urls, vec!["https://a.example", "https://b.example"]);
    }

    #[test]
    fn test_url_validation() {
        assert!(is_valid_url("https://example.com/page"));
        assert!(is_valid_url("http://example.com"));
        assert!(!is_valid_url(""));
        assert!(!is_valid_url("not a url"));
        assert!(!is_valid_url("ftp://example.com/file"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_results_follow_input_order() {
        let extractor = TableExtractor::new(vec![
            (
                "https://slow.example",
                300,
                ExtractPayload::Many(vec!["slow-1".into(), "slow-2".into()]),
            ),
            ("https://fast.example", 10, ExtractPayload::Single("fast".into())),
        ]);
        let urls = vec![
            "https://slow.example".to_string(),
            "https://fast.example".to_string(),
        ];

        let findings = extract_all(&extractor, &urls, "insomnia").await;

        assert_eq!(
            findings,
            vec![
                Finding::new("slow-1", "https://slow.example"),
                Finding::new("slow-2", "https://slow.example"),
                Finding::new("fast", "https://fast.example"),
            ]
        );
    }

    #[tokio::test]
    async fn test_failures_and_bad_urls_are_isolated() {
        let extractor = TableExtractor::new(vec![(
            "https://ok.example",
            0,
            ExtractPayload::Single("ok".into()),
        )]);
        let urls = vec![
            String::new(),
            "https://missing.example".to_string(),
            "::bad::".to_string(),
            "https://ok.example".to_string(),
        ];

        let findings = extract_all(&extractor, &urls, "insomnia").await;

        assert_eq!(findings, vec![Finding::new("ok", "https://ok.example")]);
        // Invalid URLs never reach the extractor.
        assert_eq!(
            *extractor.calls.lock().unwrap(),
            vec!["https://missing.example".to_string(), "https://ok.example".to_string()]
        );
    }
}
