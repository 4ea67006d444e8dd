//! Normalized shapes returned by source adapters

use super::Isbn;
use serde::{Deserialize, Serialize};

/// Reference to a remote cover image
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum CoverRef {
    /// Catalog-provided numeric cover id
    Id(u64),

    /// Direct image URL
    Url(String),
}

/// Partial fields from one source. Missing data is simply unset.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SourceResult {
    pub title: Option<String>,
    pub authors: Vec<String>,
    pub identifier: Option<Isbn>,
    pub language: Option<String>,
    pub publisher: Option<String>,
    pub date: Option<String>,
    pub tags: Vec<String>,
    pub summary: Option<String>,
    pub cover_ref: Option<CoverRef>,
}

impl SourceResult {
    pub fn is_empty(&self) -> bool {
        *self == SourceResult::default()
    }

    /// Fill every unset field of `self` from `other`
    pub fn fill_missing(&mut self, other: SourceResult) {
        fn fill<T>(slot: &mut Option<T>, value: Option<T>) {
            if slot.is_none() {
                *slot = value;
            }
        }
        fill(&mut self.title, other.title);
        fill(&mut self.identifier, other.identifier);
        fill(&mut self.language, other.language);
        fill(&mut self.publisher, other.publisher);
        fill(&mut self.date, other.date);
        fill(&mut self.summary, other.summary);
        fill(&mut self.cover_ref, other.cover_ref);
        if self.authors.is_empty() {
            self.authors = other.authors;
        }
        if self.tags.is_empty() {
            self.tags = other.tags;
        }
    }
}

/// Details of a logical work (`/works/<id>.json`)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WorkDetails {
    pub description: Option<String>,
    pub subjects: Vec<String>,
}

/// Details of one published edition (`/books/<id>.json`)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EditionDetails {
    pub publishers: Vec<String>,
    pub publish_date: Option<String>,
    pub languages: Vec<String>,
    pub isbns: Vec<String>,
    pub description: Option<String>,
}

/// One search hit, kept for manual disambiguation
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CandidateEdition {
    /// Work key, e.g. `/works/OL45804W`
    pub key: Option<String>,
    pub title: Option<String>,
    pub authors: Vec<String>,
    pub languages: Vec<String>,
    pub isbns: Vec<String>,
    pub publishers: Vec<String>,
    pub first_publish_year: Option<i32>,
    pub cover_id: Option<u64>,
    pub cover_edition_key: Option<String>,
    pub subjects: Vec<String>,
    pub work_details: Option<WorkDetails>,
    pub edition_details: Option<EditionDetails>,

    /// The candidate exactly as the catalog returned it
    pub raw: serde_json::Value,
}

impl CandidateEdition {
    /// First checksum-valid ISBN, preferring edition details over the search hit
    pub fn first_valid_isbn(&self) -> Option<Isbn> {
        self.edition_details
            .iter()
            .flat_map(|d| d.isbns.iter())
            .chain(self.isbns.iter())
            .find_map(|raw| Isbn::parse(raw))
    }

    /// Number of populated fields. Not used for ordering; candidates stay in
    /// catalog order and callers may rank with this.
    pub fn completeness(&self) -> usize {
        [
            self.title.is_some(),
            !self.authors.is_empty(),
            !self.languages.is_empty(),
            !self.isbns.is_empty(),
            !self.publishers.is_empty(),
            self.first_publish_year.is_some(),
            self.cover_id.is_some(),
            !self.subjects.is_empty(),
            self.work_details
                .as_ref()
                .is_some_and(|w| w.description.is_some()),
            self.edition_details.is_some(),
        ]
        .into_iter()
        .filter(|present| *present)
        .count()
    }
}
