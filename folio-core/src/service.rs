//! Per-item pipeline: extract, enrich, fill suggestions, apply

use crate::cache::{CoverCache, DiskCache};
use crate::config::FolioConfig;
use crate::cover::RemoteCovers;
use crate::enrich::{Aggregator, EnrichedMetadata};
use crate::error::RebuildError;
use crate::extract::extract;
use crate::net::{HttpClient, HttpTransport, UreqTransport};
use crate::rebuild::Rebuilder;
use crate::sources::{GoogleBooksClient, OpenLibraryClient, WikipediaClient};
use crate::types::{BibliographicRecord, MetadataFields};
use regex::Regex;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};
use tracing::{error, info, warn};

/// Note set on a record once suggestions have been filled
pub const SUGGESTIONS_NOTE: &str = "Suggestions fetched";

/// Copies a container somewhere safe before it is rewritten and returns the
/// copy's path
pub type BackupHook = dyn Fn(&Path) -> io::Result<PathBuf> + Send + Sync;

static FORBIDDEN_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[\\/*?:"<>|]"#).expect("valid filename regex"));
static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));
static YEAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d{4}").expect("valid year regex"));

/// Extract → enrich → suggest, and apply → rebuild → promote.
///
/// Cheap to clone; clones share the HTTP client, the cover cache and the
/// rebuild lock registry.
#[derive(Clone)]
pub struct EnricherService {
    aggregator: Aggregator,
    rebuilder: Rebuilder,
    backup: Option<Arc<BackupHook>>,
}

impl EnricherService {
    pub fn new(aggregator: Aggregator, rebuilder: Rebuilder) -> Self {
        Self {
            aggregator,
            rebuilder,
            backup: None,
        }
    }

    /// Production wiring: blocking HTTP and an on-disk cover cache
    pub fn from_config(config: &FolioConfig) -> Self {
        let transport = Arc::new(UreqTransport::new(
            config.http_timeout(),
            config.user_agent.clone(),
        ));
        let cache = Arc::new(DiskCache::new(&config.cover_cache_dir));
        Self::with_transport(config, transport, cache)
    }

    /// Wire every source to one transport and cover cache
    pub fn with_transport(
        config: &FolioConfig,
        transport: Arc<dyn HttpTransport>,
        cache: Arc<dyn CoverCache>,
    ) -> Self {
        let client = HttpClient::new(transport, config.retry.clone());
        let endpoints = &config.endpoints;

        let aggregator = Aggregator::new(
            OpenLibraryClient::new(client.clone(), &endpoints.openlibrary)
                .with_detail_limit(config.search_detail_limit),
            GoogleBooksClient::new(client.clone(), &endpoints.google_books),
            WikipediaClient::new(client.clone(), &endpoints.wikipedia),
            RemoteCovers::new(client, cache).with_covers_base(&endpoints.covers),
        );
        Self::new(aggregator, Rebuilder::new())
    }

    /// Run `hook` on every container before it is rebuilt. A failing hook
    /// aborts that rebuild.
    pub fn with_backup<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Path) -> io::Result<PathBuf> + Send + Sync + 'static,
    {
        self.backup = Some(Arc::new(hook));
        self
    }

    pub fn with_rebuilder(mut self, rebuilder: Rebuilder) -> Self {
        self.rebuilder = rebuilder;
        self
    }

    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    /// Extract a container and fill its suggestions. An unreadable container
    /// comes back with only its note set.
    pub fn process(&self, path: impl AsRef<Path>) -> BibliographicRecord {
        let mut record = extract(path.as_ref());
        if !record.note.is_empty() {
            return record;
        }

        let enriched = self.aggregator.enrich(
            record.original.title.as_deref(),
            &record.original.authors,
            record.original.identifier.as_ref(),
        );
        fill_suggestions(&mut record, enriched);
        info!(file = %record.filename, "processed");
        record
    }

    /// Write the record's suggestions into its container, then promote them.
    /// With `rename` the file is moved to a name built from the new metadata;
    /// a failed rename is logged and leaves the rebuilt file in place.
    pub fn apply(&self, record: &mut BibliographicRecord, rename: bool) -> Result<(), RebuildError> {
        let path = record.path.clone();

        if let Some(backup) = &self.backup {
            match backup(&path) {
                Ok(copy) => info!(from = %path.display(), to = %copy.display(), "backed up"),
                Err(e) => {
                    let err = RebuildError::Backup(e.to_string());
                    error!(path = %path.display(), error = %err, "backup failed, not rebuilding");
                    record.note = format!("Rebuild failed: {}", err);
                    return Err(err);
                }
            }
        }

        if let Err(e) = self.rebuilder.rebuild(&path, record) {
            error!(path = %path.display(), error = %e, "rebuild failed");
            return Err(e);
        }
        record.promote_suggestions();
        info!(path = %path.display(), "applied suggestions");

        if rename {
            if let Err(e) = rename_to_metadata(record) {
                warn!(path = %path.display(), error = %e, "rename failed");
            }
        }
        Ok(())
    }
}

/// Turn aggregated metadata into the record's suggestion set. Every field
/// the sources left blank keeps the original value.
pub fn fill_suggestions(record: &mut BibliographicRecord, enriched: EnrichedMetadata) {
    let original = &record.original;

    let authors = if enriched.authors.is_empty() {
        original.authors.clone()
    } else {
        enriched.authors
    };
    let tags = if enriched.tags.is_empty() {
        original.tags.clone()
    } else {
        enriched.tags
    };

    let suggested = MetadataFields {
        title: non_blank(enriched.title).or_else(|| original.title.clone()),
        authors,
        identifier: enriched.identifier.or_else(|| original.identifier.clone()),
        language: non_blank(enriched.language).or_else(|| original.language.clone()),
        publisher: non_blank(enriched.publisher).or_else(|| original.publisher.clone()),
        publication_date: non_blank(enriched.publication_date)
            .or_else(|| original.publication_date.clone()),
        tags,
        summary: non_blank(enriched.summary).or_else(|| original.summary.clone()),
        genre: non_blank(enriched.genre).or_else(|| record.content.genre.clone()),
        cover: enriched
            .cover
            .filter(|c| !c.is_empty())
            .or_else(|| original.cover.clone()),
    };

    record.found_editions = enriched.candidates;
    record.set_suggestions(suggested);
    record.processed = true;
    record.note = SUGGESTIONS_NOTE.to_string();
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Strip characters that are invalid in file names and collapse whitespace
pub fn sanitize_filename(value: &str) -> String {
    let stripped = FORBIDDEN_CHARS.replace_all(value, "");
    WHITESPACE.replace_all(&stripped, " ").trim().to_string()
}

/// `"<year> - <authors> - <title>"` without extension. The year part is
/// omitted when no date is known; at most two authors are named.
pub fn metadata_file_stem(record: &BibliographicRecord) -> String {
    let fields = record.suggested.as_ref().unwrap_or(&record.original);

    let year = fields
        .publication_date
        .as_deref()
        .or(record.original.publication_date.as_deref())
        .and_then(|d| YEAR.find(d))
        .map(|m| m.as_str().to_string());

    let authors = if fields.authors.is_empty() {
        &record.original.authors
    } else {
        &fields.authors
    };
    let authors = match authors.iter().take(2).cloned().collect::<Vec<_>>().join(", ") {
        a if a.trim().is_empty() => "Unknown".to_string(),
        a => a,
    };

    let title = fields
        .title
        .as_deref()
        .or(record.original.title.as_deref())
        .filter(|t| !t.trim().is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| {
            record
                .path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default()
        });

    let authors = sanitize_filename(&authors);
    let title = sanitize_filename(&title);
    match year {
        Some(year) => format!("{} - {} - {}", year, authors, title),
        None => format!("{} - {}", authors, title),
    }
}

/// Rename the container after its metadata, appending ` (n)` on collision.
/// Returns the new path; a file already carrying its target name is left
/// alone.
pub fn rename_to_metadata(record: &mut BibliographicRecord) -> io::Result<PathBuf> {
    let folder = record
        .path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    let stem = metadata_file_stem(record);

    let mut target = folder.join(format!("{}.epub", stem));
    let mut counter = 1;
    while target != record.path && target.exists() {
        target = folder.join(format!("{} ({}).epub", stem, counter));
        counter += 1;
    }
    if target == record.path {
        return Ok(target);
    }

    std::fs::rename(&record.path, &target)?;
    info!(from = %record.filename, to = %target.display(), "renamed");
    record.relocate(&target);
    Ok(target)
}
