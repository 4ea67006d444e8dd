//! Core types shared across the enrichment pipeline

mod identifier;
mod record;
mod source;
mod toc;

pub use identifier::{is_valid_isbn10, is_valid_isbn13, Isbn};
pub use record::{
    BibliographicRecord, ContentAnalysis, ContentInsights, ContentType, EditionInfo,
    MetadataFields, UNDETERMINED_LANGUAGE,
};
pub use source::{CandidateEdition, CoverRef, EditionDetails, SourceResult, WorkDetails};
pub use toc::TocEntry;
