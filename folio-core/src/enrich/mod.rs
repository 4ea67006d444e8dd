//! Multi-source aggregation
//!
//! The [`Aggregator`] queries every source for one item and merges their
//! answers field by field in a fixed priority order.

pub mod genre;

pub use genre::{aggregate_genre, map_subject_to_genre, map_tags_to_genre, GENRE_BUCKETS};

use crate::cover::RemoteCovers;
use crate::sources::{GoogleBooksClient, OpenLibraryClient, WikipediaClient};
use crate::types::{CandidateEdition, CoverRef, Isbn, SourceResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{info, warn};

/// Merged result of every source for one item
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnrichedMetadata {
    pub title: Option<String>,
    pub authors: Vec<String>,
    pub language: Option<String>,
    pub identifier: Option<Isbn>,
    pub publisher: Option<String>,
    pub publication_date: Option<String>,
    pub summary: Option<String>,
    pub genre: Option<String>,

    /// Union of every source's tags, sorted
    pub tags: Vec<String>,

    pub cover_ref: Option<CoverRef>,

    #[serde(skip)]
    pub cover: Option<Vec<u8>>,

    /// Search candidates in catalog order
    pub candidates: Vec<CandidateEdition>,
}

impl EnrichedMetadata {
    pub fn is_empty(&self) -> bool {
        *self == EnrichedMetadata::default()
    }
}

/// Fans one item out to the sources and merges the answers
#[derive(Clone)]
pub struct Aggregator {
    openlibrary: OpenLibraryClient,
    google_books: GoogleBooksClient,
    wikipedia: WikipediaClient,
    covers: RemoteCovers,
}

impl Aggregator {
    pub fn new(
        openlibrary: OpenLibraryClient,
        google_books: GoogleBooksClient,
        wikipedia: WikipediaClient,
        covers: RemoteCovers,
    ) -> Self {
        Self {
            openlibrary,
            google_books,
            wikipedia,
            covers,
        }
    }

    /// Query every source and merge.
    ///
    /// With neither a title nor an identifier nothing is queried and the
    /// result is empty.
    pub fn enrich(
        &self,
        title: Option<&str>,
        authors: &[String],
        identifier: Option<&Isbn>,
    ) -> EnrichedMetadata {
        let title = title.map(str::trim).filter(|t| !t.is_empty());
        if title.is_none() && identifier.is_none() {
            warn!("cannot enrich without a title or an identifier");
            return EnrichedMetadata::default();
        }

        let catalog = self.openlibrary.fetch(title, authors, identifier);
        let primary = catalog.merged();
        let secondary = self.google_books.lookup(title, identifier);
        let encyclopedic = title
            .map(|t| self.wikipedia.summary(t))
            .unwrap_or_default();

        let enriched = merge(primary, secondary, encyclopedic, catalog.candidates, |cover| {
            self.covers.fetch(cover)
        });
        info!(
            genre = ?enriched.genre,
            summary = enriched.summary.is_some(),
            tags = enriched.tags.len(),
            cover = enriched.cover.is_some(),
            candidates = enriched.candidates.len(),
            "enrichment complete"
        );
        enriched
    }
}

/// Field-by-field merge of the three sources. Only the primary catalog's
/// cover reference is ever downloaded.
pub fn merge(
    primary: SourceResult,
    secondary: SourceResult,
    encyclopedic: SourceResult,
    candidates: Vec<CandidateEdition>,
    fetch_cover: impl FnOnce(&CoverRef) -> Option<Vec<u8>>,
) -> EnrichedMetadata {
    let summary = [&primary.summary, &secondary.summary, &encyclopedic.summary]
        .into_iter()
        .flatten()
        .map(|s| s.trim())
        .find(|s| !s.is_empty())
        .map(str::to_string);

    let genre = aggregate_genre(
        &primary.tags,
        &secondary.tags,
        summary.as_deref().unwrap_or_default(),
    );

    let tags: Vec<String> = primary
        .tags
        .iter()
        .chain(secondary.tags.iter())
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let cover = primary.cover_ref.as_ref().and_then(fetch_cover);

    EnrichedMetadata {
        title: primary.title,
        authors: primary.authors,
        language: primary.language,
        identifier: primary.identifier,
        publisher: primary.publisher,
        publication_date: primary.date,
        summary,
        genre,
        tags,
        cover_ref: primary.cover_ref,
        cover,
        candidates,
    }
}
