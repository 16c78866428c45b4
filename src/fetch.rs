// src/fetch.rs
//! Thin web-fetch collaborator: GET a job posting page and strip it down to
//! the visible description text.

use reqwest::Client;
use scraper::{Html, Selector};
use serde::Serialize;
use tracing::{info, warn};

const FETCH_TIMEOUT_SECS: u64 = 20;
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Wire shape of a fetch outcome: `{status:"success", url, html}` or
/// `{status:"error", error_message}`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FetchResult {
    Success { url: String, html: String },
    Error { error_message: String },
}

pub struct WebFetcher {
    client: Client,
}

impl Default for WebFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl WebFetcher {
    pub fn new() -> Self {
        let client = Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .timeout(std::time::Duration::from_secs(FETCH_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();

        Self { client }
    }

    /// Fetch raw HTML. Failures come back as the error variant, never as a
    /// crash; the caller decides whether a missing page is fatal.
    pub async fn fetch_html(&self, url: &str) -> FetchResult {
        info!("Fetching job post: {}", url);

        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                return FetchResult::Error {
                    error_message: e.to_string(),
                }
            }
        };

        if !response.status().is_success() {
            return FetchResult::Error {
                error_message: format!("HTTP error: {}", response.status()),
            };
        }

        match response.text().await {
            Ok(html) => FetchResult::Success {
                url: url.to_string(),
                html,
            },
            Err(e) => FetchResult::Error {
                error_message: e.to_string(),
            },
        }
    }

    /// Extract the job description text from a posting page, trying
    /// description-like containers before falling back to the page body.
    pub fn extract_job_text(html: &str) -> String {
        let document = Html::parse_document(html);

        let description_selectors = [
            "[class*='description']",
            "[class*='job-details']",
            "[data-test-id='job-description']",
            "main",
            "article",
        ];

        for selector_str in &description_selectors {
            if let Ok(selector) = Selector::parse(selector_str) {
                if let Some(element) = document.select(&selector).next() {
                    let text = clean_text(&element.text().collect::<Vec<_>>().join(" "));
                    if text.len() > 40 {
                        return text;
                    }
                }
            }
        }

        warn!("Falling back to whole-page text extraction");
        match Selector::parse("body") {
            Ok(selector) => document
                .select(&selector)
                .next()
                .map(|body| clean_text(&body.text().collect::<Vec<_>>().join(" ")))
                .unwrap_or_default(),
            Err(_) => String::new(),
        }
    }
}

fn clean_text(text: &str) -> String {
    text.lines()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_prefers_description_container() {
        let html = r#"
            <html><body>
              <nav>Home Jobs About</nav>
              <div class="job-description">
                We are hiring a Senior Backend Engineer.
                Must have: Rust, Kubernetes, PostgreSQL experience.
              </div>
            </body></html>
        "#;
        let text = WebFetcher::extract_job_text(html);
        assert!(text.contains("Senior Backend Engineer"));
        assert!(text.contains("Rust, Kubernetes, PostgreSQL"));
        assert!(!text.contains("Home Jobs About"));
    }

    #[test]
    fn test_extract_falls_back_to_body() {
        let html = "<html><body><p>Short plain posting with enough words to pass the length gate.</p></body></html>";
        let text = WebFetcher::extract_job_text(html);
        assert!(text.contains("Short plain posting"));
    }

    #[test]
    fn test_clean_text_collapses_whitespace() {
        assert_eq!(clean_text("  a\n\n   b\t c  "), "a b c");
    }

    #[test]
    fn test_fetch_result_serialization() {
        let err = FetchResult::Error {
            error_message: "HTTP error: 404".to_string(),
        };
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["error_message"], "HTTP error: 404");
    }
}
