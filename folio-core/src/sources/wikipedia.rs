//! Encyclopedic page summaries

use crate::net::HttpClient;
use crate::text::{collapse_whitespace, html_to_text};
use crate::types::SourceResult;
use serde_json::Value;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct WikipediaClient {
    client: HttpClient,
    base: String,
}

impl WikipediaClient {
    pub fn new(client: HttpClient, base: impl Into<String>) -> Self {
        Self {
            client,
            base: base.into().trim_end_matches('/').to_string(),
        }
    }

    /// REST summary URL for a page title
    pub fn summary_url(&self, title: &str) -> String {
        format!(
            "{}/api/rest_v1/page/summary/{}",
            self.base,
            urlencoding::encode(title.trim())
        )
    }

    /// Summary of the page named exactly `title`. A missing page is a normal
    /// empty result.
    pub fn summary(&self, title: &str) -> SourceResult {
        if title.trim().is_empty() {
            return SourceResult::default();
        }
        let url = self.summary_url(title);
        let body = match self.client.get_json(&url, &[]) {
            Ok(body) => body,
            Err(e) if e.is_not_found() => {
                debug!(title, "no encyclopedia page");
                return SourceResult::default();
            }
            Err(e) => {
                warn!(title, error = %e, "encyclopedia request failed");
                return SourceResult::default();
            }
        };

        let summary = body
            .get("extract_html")
            .and_then(Value::as_str)
            .map(html_to_text)
            .filter(|s| !s.is_empty())
            .or_else(|| {
                body.get("extract")
                    .and_then(Value::as_str)
                    .map(collapse_whitespace)
                    .filter(|s| !s.is_empty())
            });

        let result = SourceResult {
            title: body.get("title").and_then(Value::as_str).map(str::to_string),
            summary,
            ..Default::default()
        };
        super::log_result("wikipedia", &result);
        result
    }
}
