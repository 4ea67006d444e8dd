//! Bibliographic source adapters
//!
//! Each adapter turns one catalog's responses into [`SourceResult`]s.
//! Adapters hold no shared state and never return errors: a failed request
//! is logged and yields whatever partial data was gathered.

pub mod google_books;
pub mod json;
pub mod openlibrary;
pub mod wikipedia;

pub use google_books::GoogleBooksClient;
pub use openlibrary::{CatalogResult, OpenLibraryClient};
pub use wikipedia::WikipediaClient;

use crate::types::SourceResult;
use serde::{Deserialize, Serialize};

/// Base URLs of every remote source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceEndpoints {
    /// Primary catalog (`/api/books`, `/search.json`, `/works`, `/books`)
    pub openlibrary: String,

    /// Cover image host for numeric cover ids
    pub covers: String,

    /// Secondary catalog volumes endpoint
    pub google_books: String,

    /// Encyclopedia site; summaries live under `/api/rest_v1/page/summary`
    pub wikipedia: String,
}

impl Default for SourceEndpoints {
    fn default() -> Self {
        Self {
            openlibrary: "https://openlibrary.org".to_string(),
            covers: crate::cover::DEFAULT_COVERS_BASE.to_string(),
            google_books: "https://www.googleapis.com/books/v1/volumes".to_string(),
            wikipedia: wikipedia_for_language("fr"),
        }
    }
}

/// Encyclopedia base URL for a language edition
pub fn wikipedia_for_language(lang: &str) -> String {
    format!("https://{}.wikipedia.org", lang.trim().to_lowercase())
}

/// Log a one-line summary of what a source returned
pub(crate) fn log_result(source: &str, result: &SourceResult) {
    tracing::info!(
        source,
        title = ?result.title,
        summary = result.summary.is_some(),
        tags = result.tags.len(),
        "source result"
    );
}
