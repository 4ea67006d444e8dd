//! Secondary catalog: first volume matching an ISBN or a title

use super::json;
use crate::net::HttpClient;
use crate::text::{clean_text, html_to_text};
use crate::types::{Isbn, SourceResult};
use serde_json::Value;
use tracing::{debug, info, warn};

/// Category tokens longer than this are sentences, not tags
const MAX_TAG_CHARS: usize = 64;

#[derive(Clone)]
pub struct GoogleBooksClient {
    client: HttpClient,
    url: String,
    lang_restrict: Option<String>,
}

impl GoogleBooksClient {
    pub fn new(client: HttpClient, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
            lang_restrict: None,
        }
    }

    /// Restrict results to one language (ISO 639-1)
    pub fn with_lang_restrict(mut self, lang: impl Into<String>) -> Self {
        self.lang_restrict = Some(lang.into());
        self
    }

    /// Query by `isbn:` when an identifier is known, else by `intitle:`
    pub fn lookup(&self, title: Option<&str>, isbn: Option<&Isbn>) -> SourceResult {
        let q = match (isbn, title) {
            (Some(isbn), _) => format!("isbn:{}", isbn),
            (None, Some(title)) if !title.trim().is_empty() => format!("intitle:{}", title.trim()),
            _ => return SourceResult::default(),
        };

        let mut query = vec![("q", q.as_str()), ("maxResults", "1")];
        if let Some(lang) = &self.lang_restrict {
            query.push(("langRestrict", lang.as_str()));
        }
        let body = match self.client.get_json(&self.url, &query) {
            Ok(body) => body,
            Err(e) if e.is_not_found() => {
                debug!(query = %q, "secondary catalog has no match");
                return SourceResult::default();
            }
            Err(e) => {
                warn!(query = %q, error = %e, "secondary catalog request failed");
                return SourceResult::default();
            }
        };

        let Some(item) = body
            .get("items")
            .and_then(Value::as_array)
            .and_then(|items| items.first())
        else {
            info!(query = %q, "secondary catalog returned no items");
            return SourceResult::default();
        };
        let result = volume(item.get("volumeInfo").unwrap_or(&Value::Null));
        super::log_result("google_books", &result);
        result
    }
}

/// Normalize one `volumeInfo` object
fn volume(info: &Value) -> SourceResult {
    let summary = json::field(info, "description")
        .map(|d| html_to_text(&d))
        .filter(|d| !d.is_empty());

    let raw_tags = match json::list(info, "categories") {
        tags if tags.is_empty() => json::list(info, "subjects"),
        tags => tags,
    };
    let tags = raw_tags
        .iter()
        .map(|t| clean_text(t))
        .filter(|t| !t.is_empty() && t.chars().count() <= MAX_TAG_CHARS)
        .collect();

    let identifier = info
        .get("industryIdentifiers")
        .and_then(Value::as_array)
        .and_then(|ids| {
            ["ISBN_13", "ISBN_10"].iter().find_map(|kind| {
                ids.iter()
                    .filter(|id| id.get("type").and_then(Value::as_str) == Some(*kind))
                    .find_map(|id| json::field(id, "identifier").and_then(|raw| Isbn::parse(&raw)))
            })
        });

    SourceResult {
        title: json::field(info, "title"),
        authors: json::list(info, "authors"),
        identifier,
        language: json::field(info, "language"),
        publisher: json::field(info, "publisher"),
        date: json::field(info, "publishedDate"),
        tags,
        summary,
        cover_ref: None,
    }
}
