//! Folio Core Library
//!
//! Metadata enrichment for EPUB containers. A container is read into a
//! [`BibliographicRecord`], its fields are completed from remote
//! bibliographic catalogs, and accepted suggestions are written back by
//! rebuilding the container and atomically replacing the original.

pub mod cache;
pub mod config;
pub mod container;
pub mod cover;
pub mod enrich;
pub mod error;
pub mod extract;
pub mod net;
pub mod rebuild;
pub mod service;
pub mod sources;
pub mod text;
pub mod types;

pub use cache::{CoverCache, DiskCache, MemoryCache};
pub use config::FolioConfig;
pub use container::Container;
pub use enrich::{Aggregator, EnrichedMetadata};
pub use error::{CacheError, FolioError, NetworkError, ParseError, RebuildError, Result};
pub use extract::extract;
pub use rebuild::Rebuilder;
pub use service::EnricherService;
pub use types::{
    BibliographicRecord, CandidateEdition, ContentInsights, CoverRef, Isbn, MetadataFields,
    SourceResult, TocEntry,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_creation() {
        let record = BibliographicRecord::new("/library/book.epub");
        assert_eq!(record.filename, "book.epub");
        assert!(record.suggested.is_none());
        assert!(!record.processed);
    }
}
