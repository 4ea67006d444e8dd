//! Primary catalog: lookup by ISBN, search, and work/edition details

use super::json;
use crate::error::NetworkError;
use crate::net::HttpClient;
use crate::types::{CandidateEdition, CoverRef, EditionDetails, Isbn, SourceResult, WorkDetails};
use serde_json::Value;
use tracing::{debug, info, warn};

/// Search hits requested from the catalog
const SEARCH_LIMIT: &str = "20";

/// Candidates whose work and edition records are fetched by default
pub const DEFAULT_DETAIL_LIMIT: usize = 5;

/// Everything the primary catalog returned for one item
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogResult {
    /// Hit from the ISBN lookup
    pub by_identifier: SourceResult,

    /// Search hits in catalog order, the first few with details attached
    pub candidates: Vec<CandidateEdition>,
}

impl CatalogResult {
    pub fn is_empty(&self) -> bool {
        self.by_identifier.is_empty() && self.candidates.is_empty()
    }

    /// Collapse into one result: the ISBN hit wins, then the first
    /// candidate, then the first non-empty detail fields, then the remaining
    /// search-level fields of the first candidate.
    pub fn merged(&self) -> SourceResult {
        let mut merged = self.by_identifier.clone();
        if let Some(first) = self.candidates.first() {
            merged.fill_missing(candidate_core(first));
        }
        for candidate in &self.candidates {
            merged.fill_missing(candidate_details(candidate));
        }
        if let Some(first) = self.candidates.first() {
            merged.fill_missing(candidate_search_fields(first));
        }
        merged
    }
}

/// Client for the primary catalog
#[derive(Clone)]
pub struct OpenLibraryClient {
    client: HttpClient,
    base: String,
    detail_limit: usize,
}

impl OpenLibraryClient {
    pub fn new(client: HttpClient, base: impl Into<String>) -> Self {
        Self {
            client,
            base: base.into().trim_end_matches('/').to_string(),
            detail_limit: DEFAULT_DETAIL_LIMIT,
        }
    }

    pub fn with_detail_limit(mut self, limit: usize) -> Self {
        self.detail_limit = limit;
        self
    }

    /// ISBN lookup plus title/author search, details attached to the top
    /// candidates. The search runs on the title when there is one, else on
    /// the identifier.
    pub fn fetch(&self, title: Option<&str>, authors: &[String], isbn: Option<&Isbn>) -> CatalogResult {
        let by_identifier = isbn.map(|i| self.lookup_isbn(i)).unwrap_or_default();

        let mut candidates = match (title, isbn) {
            (Some(title), _) => self.search(title, authors.first().map(String::as_str)),
            (None, Some(isbn)) => self.search_query(isbn.as_str(), None),
            (None, None) => Vec::new(),
        };
        for candidate in candidates.iter_mut().take(self.detail_limit) {
            self.attach_details(candidate);
        }

        let result = CatalogResult {
            by_identifier,
            candidates,
        };
        super::log_result("openlibrary", &result.merged());
        result
    }

    /// `GET /api/books?bibkeys=ISBN:<isbn>`; a missing key means not found
    pub fn lookup_isbn(&self, isbn: &Isbn) -> SourceResult {
        let url = format!("{}/api/books", self.base);
        let bibkey = format!("ISBN:{}", isbn);
        let body = match self.client.get_json(
            &url,
            &[("bibkeys", bibkey.as_str()), ("format", "json"), ("jscmd", "data")],
        ) {
            Ok(body) => body,
            Err(e) => {
                log_failure("isbn lookup", &url, &e);
                return SourceResult::default();
            }
        };

        let Some(data) = body.get(&bibkey) else {
            info!(isbn = %isbn, "no catalog record for ISBN");
            return SourceResult::default();
        };
        info!(isbn = %isbn, "catalog record found for ISBN");
        book_data(data, isbn)
    }

    /// Search by title, narrowed by an author when given
    pub fn search(&self, title: &str, author: Option<&str>) -> Vec<CandidateEdition> {
        let q = match author {
            Some(author) if !author.trim().is_empty() => format!("{} {}", title, author.trim()),
            _ => title.to_string(),
        };
        self.search_query(&q, Some(title))
    }

    fn search_query(&self, q: &str, title: Option<&str>) -> Vec<CandidateEdition> {
        let url = format!("{}/search.json", self.base);
        let mut query = vec![("q", q), ("limit", SEARCH_LIMIT)];
        if let Some(title) = title {
            query.push(("title", title));
        }

        let body = match self.client.get_json(&url, &query) {
            Ok(body) => body,
            Err(e) => {
                log_failure("search", &url, &e);
                return Vec::new();
            }
        };
        let candidates: Vec<CandidateEdition> = body
            .get("docs")
            .and_then(Value::as_array)
            .map(|docs| docs.iter().map(candidate_from_doc).collect())
            .unwrap_or_default();
        info!(query = q, hits = candidates.len(), "catalog search");
        candidates
    }

    /// `GET /works/<id>.json`
    pub fn work_details(&self, key: &str) -> Option<WorkDetails> {
        let key = key.trim();
        let path = if key.starts_with('/') {
            key.to_string()
        } else {
            format!("/works/{}", key)
        };
        let url = format!("{}{}.json", self.base, path);
        match self.client.get_json(&url, &[]) {
            Ok(body) => Some(WorkDetails {
                description: json::field(&body, "description"),
                subjects: json::list(&body, "subjects"),
            }),
            Err(e) => {
                log_failure("work details", &url, &e);
                None
            }
        }
    }

    /// `GET /books/<edition>.json`; the key may carry a `/books/` prefix
    pub fn edition_details(&self, edition_key: &str) -> Option<EditionDetails> {
        let key = edition_key.trim().trim_start_matches("/books/");
        let url = format!("{}/books/{}.json", self.base, key);
        match self.client.get_json(&url, &[]) {
            Ok(body) => {
                let mut isbns = json::list(&body, "isbn_13");
                isbns.extend(json::list(&body, "isbn_10"));
                Some(EditionDetails {
                    publishers: json::list(&body, "publishers"),
                    publish_date: json::field(&body, "publish_date"),
                    languages: json::language_keys(&body, "languages"),
                    isbns,
                    description: json::field(&body, "description"),
                })
            }
            Err(e) => {
                log_failure("edition details", &url, &e);
                None
            }
        }
    }

    fn attach_details(&self, candidate: &mut CandidateEdition) {
        if let Some(key) = candidate.key.clone() {
            candidate.work_details = self.work_details(&key);
        }
        if let Some(edition) = candidate.cover_edition_key.clone() {
            candidate.edition_details = self.edition_details(&edition);
        }
        debug!(
            key = ?candidate.key,
            work = candidate.work_details.is_some(),
            edition = candidate.edition_details.is_some(),
            "candidate details"
        );
    }
}

fn log_failure(operation: &str, url: &str, error: &NetworkError) {
    if error.is_not_found() {
        debug!(operation, url, "catalog returned not found");
    } else {
        warn!(operation, url, error = %error, "catalog request failed");
    }
}

/// Normalize one `jscmd=data` book record
fn book_data(data: &Value, isbn: &Isbn) -> SourceResult {
    let cover_ref = data.get("cover").and_then(|cover| {
        ["large", "medium", "small"]
            .iter()
            .find_map(|size| json::field(cover, size))
            .map(CoverRef::Url)
    });
    let identifier = data
        .get("identifiers")
        .and_then(|ids| {
            json::list(ids, "isbn_13")
                .into_iter()
                .chain(json::list(ids, "isbn_10"))
                .find_map(|raw| Isbn::parse(&raw))
        })
        .unwrap_or_else(|| isbn.clone());

    SourceResult {
        title: json::field(data, "title"),
        authors: json::list(data, "authors"),
        identifier: Some(identifier),
        language: json::language_keys(data, "languages")
            .first()
            .map(|code| json::marc_language(code)),
        publisher: json::first(data, "publishers"),
        date: json::field(data, "publish_date"),
        tags: json::list(data, "subjects"),
        summary: json::field(data, "notes").or_else(|| json::field(data, "description")),
        cover_ref,
    }
}

/// Normalize one search hit, keeping the raw document
pub fn candidate_from_doc(doc: &Value) -> CandidateEdition {
    CandidateEdition {
        key: json::field(doc, "key"),
        title: json::field(doc, "title"),
        authors: json::list(doc, "author_name"),
        languages: json::list(doc, "language"),
        isbns: json::list(doc, "isbn"),
        publishers: json::list(doc, "publisher"),
        first_publish_year: json::unsigned(doc, "first_publish_year")
            .and_then(|y| i32::try_from(y).ok()),
        cover_id: json::unsigned(doc, "cover_i").filter(|id| *id > 0),
        cover_edition_key: json::field(doc, "cover_edition_key"),
        subjects: json::list(doc, "subject"),
        work_details: None,
        edition_details: None,
        raw: doc.clone(),
    }
}

/// Title, authors, language, identifier and cover of a search hit
fn candidate_core(candidate: &CandidateEdition) -> SourceResult {
    SourceResult {
        title: candidate.title.clone(),
        authors: candidate.authors.clone(),
        identifier: candidate.first_valid_isbn(),
        language: candidate
            .edition_details
            .iter()
            .flat_map(|d| d.languages.iter())
            .chain(candidate.languages.iter())
            .next()
            .map(|code| json::marc_language(code)),
        cover_ref: candidate.cover_id.map(CoverRef::Id),
        ..Default::default()
    }
}

/// Fields backfilled from the work and edition records
fn candidate_details(candidate: &CandidateEdition) -> SourceResult {
    let work = candidate.work_details.as_ref();
    let edition = candidate.edition_details.as_ref();
    SourceResult {
        summary: work
            .and_then(|w| w.description.clone())
            .or_else(|| edition.and_then(|e| e.description.clone())),
        tags: work.map(|w| w.subjects.clone()).unwrap_or_default(),
        publisher: edition.and_then(|e| e.publishers.first().cloned()),
        date: edition.and_then(|e| e.publish_date.clone()),
        ..Default::default()
    }
}

fn candidate_search_fields(candidate: &CandidateEdition) -> SourceResult {
    SourceResult {
        publisher: candidate.publishers.first().cloned(),
        date: candidate.first_publish_year.map(|y| y.to_string()),
        tags: candidate.subjects.clone(),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::{CannedTransport, RetryPolicy};
    use serde_json::json;
    use std::sync::Arc;

    const BASE: &str = "http://catalog.test";

    fn client(transport: CannedTransport) -> (OpenLibraryClient, Arc<CannedTransport>) {
        let transport = Arc::new(transport);
        let http = HttpClient::new(transport.clone(), RetryPolicy::no_retry());
        (OpenLibraryClient::new(http, BASE), transport)
    }

    fn isbn() -> Isbn {
        Isbn::parse("9780306406157").unwrap()
    }

    #[test]
    fn test_lookup_isbn_normalizes_record() {
        let body = json!({
            "ISBN:9780306406157": {
                "title": "Le Petit Prince",
                "authors": [{"name": "Antoine de Saint-Exupéry"}],
                "publishers": [{"name": "Gallimard"}],
                "publish_date": "1946",
                "subjects": [{"name": "Fables"}, "Aviation"],
                "cover": {"medium": "http://covers.test/m.jpg", "small": "http://covers.test/s.jpg"}
            }
        });
        let (client, _) = client(
            CannedTransport::new().route(format!("{BASE}/api/books"), body.to_string()),
        );

        let result = client.lookup_isbn(&isbn());
        assert_eq!(result.title.as_deref(), Some("Le Petit Prince"));
        assert_eq!(result.authors, vec!["Antoine de Saint-Exupéry"]);
        assert_eq!(result.publisher.as_deref(), Some("Gallimard"));
        assert_eq!(result.tags, vec!["Fables", "Aviation"]);
        assert_eq!(result.identifier, Some(isbn()));
        assert_eq!(
            result.cover_ref,
            Some(CoverRef::Url("http://covers.test/m.jpg".into()))
        );
    }

    #[test]
    fn test_lookup_isbn_missing_key_is_empty() {
        let (client, _) =
            client(CannedTransport::new().route(format!("{BASE}/api/books"), "{}"));
        assert!(client.lookup_isbn(&isbn()).is_empty());
    }

    #[test]
    fn test_fetch_merges_candidates_and_details() {
        let search = json!({
            "docs": [
                {
                    "key": "/works/OL1W",
                    "title": "Dune",
                    "author_name": ["Frank Herbert"],
                    "language": ["eng"],
                    "isbn": ["bogus", "9780306406157"],
                    "publisher": ["Chilton"],
                    "first_publish_year": 1965,
                    "cover_i": 42,
                    "cover_edition_key": "OL2M"
                },
                {"key": "/works/OL9W", "title": "Dune Messiah"}
            ]
        });
        let work = json!({"description": {"value": "Desert planet."}, "subjects": ["Science Fiction"]});
        let edition = json!({"publishers": ["Ace"], "publish_date": "1990", "isbn_10": ["0306406152"]});
        let (client, transport) = client(
            CannedTransport::new()
                .route(format!("{BASE}/search.json"), search.to_string())
                .route(format!("{BASE}/works/OL1W.json"), work.to_string())
                .route(format!("{BASE}/books/OL2M.json"), edition.to_string())
                .route_status(format!("{BASE}/works/OL9W.json"), 404),
        );

        let result = client.fetch(Some("Dune"), &["Frank Herbert".to_string()], None);
        assert_eq!(result.candidates.len(), 2);
        assert_eq!(transport.call_count(), 4);

        let merged = result.merged();
        assert_eq!(merged.title.as_deref(), Some("Dune"));
        assert_eq!(merged.language.as_deref(), Some("en"));
        assert_eq!(merged.summary.as_deref(), Some("Desert planet."));
        assert_eq!(merged.tags, vec!["Science Fiction"]);
        assert_eq!(merged.publisher.as_deref(), Some("Ace"));
        assert_eq!(merged.date.as_deref(), Some("1990"));
        assert_eq!(merged.cover_ref, Some(CoverRef::Id(42)));
        // edition ISBNs come before search ISBNs
        assert_eq!(merged.identifier.map(|i| i.to_string()), Some("0306406152".into()));
    }

    #[test]
    fn test_search_failure_yields_no_candidates() {
        let (client, _) = client(
            CannedTransport::new().route_status(format!("{BASE}/search.json"), 500),
        );
        assert!(client.search("Dune", None).is_empty());
    }
}
