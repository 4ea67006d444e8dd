//! The per-container bibliographic record

use super::{CandidateEdition, Isbn};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Undetermined language code written when nothing better is known
pub const UNDETERMINED_LANGUAGE: &str = "und";

/// One set of bibliographic fields (used for both original and suggested values)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MetadataFields {
    /// Book title
    pub title: Option<String>,

    /// Authors, in document order
    pub authors: Vec<String>,

    /// Canonical ISBN-10/13
    pub identifier: Option<Isbn>,

    /// Language code (ISO 639-1 where known)
    pub language: Option<String>,

    /// Publisher name
    pub publisher: Option<String>,

    /// Publication date, free-form
    pub publication_date: Option<String>,

    /// Subject tags (order not significant)
    pub tags: Vec<String>,

    /// Description/summary
    pub summary: Option<String>,

    /// Genre bucket (only ever suggested, never read from a container)
    pub genre: Option<String>,

    /// Cover image bytes
    #[serde(skip)]
    pub cover: Option<Vec<u8>>,
}

impl MetadataFields {
    /// True when no field carries a value
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.authors.is_empty()
            && self.identifier.is_none()
            && self.language.is_none()
            && self.publisher.is_none()
            && self.publication_date.is_none()
            && self.tags.is_empty()
            && self.summary.is_none()
            && self.genre.is_none()
            && self.cover.is_none()
    }

    pub fn has_cover(&self) -> bool {
        self.cover.as_ref().is_some_and(|c| !c.is_empty())
    }
}

/// Edition details found in the front matter
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EditionInfo {
    pub edition_number: Option<String>,
    pub version: Option<String>,
    pub printing: Option<String>,
}

impl EditionInfo {
    pub fn is_empty(&self) -> bool {
        self.edition_number.is_none() && self.version.is_none() && self.printing.is_none()
    }

    /// Later values fill gaps, earlier values win
    pub fn merge(&mut self, other: EditionInfo) {
        if self.edition_number.is_none() {
            self.edition_number = other.edition_number;
        }
        if self.version.is_none() {
            self.version = other.version;
        }
        if self.printing.is_none() {
            self.printing = other.printing;
        }
    }
}

/// Coarse content-type bucket derived from the document count
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Book,
    Novella,
    #[default]
    ShortStory,
}

impl ContentType {
    pub fn from_document_count(count: usize) -> Self {
        if count > 10 {
            ContentType::Book
        } else if count > 3 {
            ContentType::Novella
        } else {
            ContentType::ShortStory
        }
    }
}

/// Structural statistics of a container's content documents
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContentAnalysis {
    pub total_documents: usize,
    pub estimated_pages: usize,
    pub content_type: ContentType,
}

/// Metadata recovered by scanning document text instead of the package
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ContentInsights {
    pub identifier: Option<Isbn>,
    pub summary: Option<String>,
    pub genre: Option<String>,
    pub publisher: Option<String>,
    pub publication_date: Option<String>,
    pub edition_info: Option<EditionInfo>,
    pub analysis: Option<ContentAnalysis>,
}

/// Everything known about one container during a scan session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BibliographicRecord {
    /// Filesystem location of the container
    pub path: PathBuf,

    /// File name component of `path`
    pub filename: String,

    /// Values read from the container
    pub original: MetadataFields,

    /// Values proposed by enrichment; absent until enrichment runs
    pub suggested: Option<MetadataFields>,

    /// Values recovered from the document text
    pub content: ContentInsights,

    /// Raw search candidates, in the order the catalog returned them
    pub found_editions: Vec<CandidateEdition>,

    /// Last status or error message
    pub note: String,

    /// Enrichment has run for this record
    pub processed: bool,

    /// Suggestions have been written to the container
    pub accepted: bool,
}

impl BibliographicRecord {
    /// Create an empty record for a container path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let filename = file_name_of(&path);
        Self {
            path,
            filename,
            original: MetadataFields::default(),
            suggested: None,
            content: ContentInsights::default(),
            found_editions: Vec::new(),
            note: String::new(),
            processed: false,
            accepted: false,
        }
    }

    /// Point the record at a new location (after a rename)
    pub fn relocate(&mut self, path: impl Into<PathBuf>) {
        self.path = path.into();
        self.filename = file_name_of(&self.path);
    }

    /// Replace the suggestion set wholesale
    pub fn set_suggestions(&mut self, suggested: MetadataFields) {
        self.suggested = Some(suggested);
    }

    /// Drop pending suggestions without touching the originals
    pub fn reset_suggestions(&mut self) {
        self.suggested = None;
        self.processed = false;
    }

    /// Make the originals reflect what a successful rebuild wrote.
    ///
    /// Language falls back to the previous original and then to `und`; the
    /// cover falls back to the previous original because the writer re-links
    /// the existing cover when no new one is supplied.
    pub fn promote_suggestions(&mut self) {
        let Some(suggested) = self.suggested.take() else {
            return;
        };
        let previous = std::mem::take(&mut self.original);

        let language = suggested
            .language
            .filter(|l| !l.trim().is_empty())
            .or(previous.language)
            .or_else(|| Some(UNDETERMINED_LANGUAGE.to_string()));
        let cover = suggested
            .cover
            .filter(|c| !c.is_empty())
            .or(previous.cover);

        self.original = MetadataFields {
            language,
            cover,
            ..suggested
        };
        self.accepted = true;
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record() {
        let record = BibliographicRecord::new("/books/sample.epub");
        assert_eq!(record.filename, "sample.epub");
        assert!(record.original.is_empty());
        assert!(record.suggested.is_none());
    }

    #[test]
    fn test_promote_keeps_language_and_cover() {
        let mut record = BibliographicRecord::new("a.epub");
        record.original.language = Some("fr".into());
        record.original.cover = Some(vec![1, 2, 3]);
        record.original.title = Some("Old".into());
        record.set_suggestions(MetadataFields {
            title: Some("New".into()),
            ..Default::default()
        });

        record.promote_suggestions();

        assert!(record.suggested.is_none());
        assert!(record.accepted);
        assert_eq!(record.original.title.as_deref(), Some("New"));
        assert_eq!(record.original.language.as_deref(), Some("fr"));
        assert_eq!(record.original.cover, Some(vec![1, 2, 3]));
    }

    #[test]
    fn test_promote_without_suggestions_is_noop() {
        let mut record = BibliographicRecord::new("a.epub");
        record.original.title = Some("Same".into());
        record.promote_suggestions();
        assert_eq!(record.original.title.as_deref(), Some("Same"));
        assert!(!record.accepted);
    }

    #[test]
    fn test_content_type_buckets() {
        assert_eq!(ContentType::from_document_count(11), ContentType::Book);
        assert_eq!(ContentType::from_document_count(4), ContentType::Novella);
        assert_eq!(ContentType::from_document_count(3), ContentType::ShortStory);
    }
}
