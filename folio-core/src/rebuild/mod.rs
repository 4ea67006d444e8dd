//! Container rebuild
//!
//! A rebuild writes a new container from the original's content and the
//! record's suggested metadata, then atomically replaces the original. It
//! runs as a sequence of traced stages; any failure rolls back by removing
//! the temporary file, leaving the original untouched.

mod lock;
pub mod nav;
pub mod opf;
mod sink;

pub use lock::{LockRegistry, PathGuard};
pub use opf::{PackageFields, PackagePlan, IDENTIFIER_ID};
pub use sink::{ContainerImage, ContainerSink, OutputEntry, ZipSink, EPUB_MIMETYPE};

use crate::container::{Container, ManifestItem};
use crate::cover::{find_cover, find_cover_item, sniff_image};
use crate::error::RebuildError;
use crate::types::{BibliographicRecord, MetadataFields, UNDETERMINED_LANGUAGE};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// File names always regenerated, whatever the manifest says
const NAVIGATION_FILE_NAMES: &[&str] = &["toc.ncx", "nav.xhtml"];

/// Stages of a rebuild, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebuildStage {
    ReadOriginal,
    BuildMetadata,
    CopyContent,
    ResolveCover,
    CopyNavigation,
    AtomicWrite,
    Success,
    Rollback,
}

impl fmt::Display for RebuildStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RebuildStage::ReadOriginal => "read_original",
            RebuildStage::BuildMetadata => "build_metadata",
            RebuildStage::CopyContent => "copy_content",
            RebuildStage::ResolveCover => "resolve_cover",
            RebuildStage::CopyNavigation => "copy_navigation",
            RebuildStage::AtomicWrite => "atomic_write",
            RebuildStage::Success => "success",
            RebuildStage::Rollback => "rollback",
        };
        f.write_str(name)
    }
}

/// Temporary file written beside `path` before the final rename
pub fn temp_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!("{}.tmp", name))
}

/// Rebuilds containers through a [`ContainerSink`], one rebuild per path at
/// a time
#[derive(Clone)]
pub struct Rebuilder {
    sink: Arc<dyn ContainerSink>,
    locks: Arc<LockRegistry>,
}

impl Default for Rebuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Rebuilder {
    pub fn new() -> Self {
        Self::with_sink(Arc::new(ZipSink))
    }

    pub fn with_sink(sink: Arc<dyn ContainerSink>) -> Self {
        Self {
            sink,
            locks: Arc::new(LockRegistry::new()),
        }
    }

    pub fn locks(&self) -> &LockRegistry {
        &self.locks
    }

    /// Rewrite the container at `path` with the record's suggested metadata
    /// (its originals when nothing was suggested). On failure the error is
    /// also recorded in `record.note`.
    pub fn rebuild(&self, path: &Path, record: &mut BibliographicRecord) -> Result<(), RebuildError> {
        let result = self.locks.acquire(path).and_then(|_guard| {
            let fields = record
                .suggested
                .clone()
                .unwrap_or_else(|| record.original.clone());
            RebuildJob::new(path, fields, record.original.language.clone()).run(self.sink.as_ref())
        });
        if let Err(e) = &result {
            record.note = format!("Rebuild failed: {}", e);
        }
        result
    }
}

/// State carried between stages
struct RebuildJob<'a> {
    path: &'a Path,
    temp_path: PathBuf,
    fields: MetadataFields,
    original_language: Option<String>,
    container: Option<Container>,
    plan: PackagePlan,
    image: ContainerImage,
    /// Archive paths left out of the new container
    dropped: HashSet<String>,
    /// Archive paths already taken in the new container
    taken: HashSet<String>,
    new_cover: Option<Vec<u8>>,
}

impl<'a> RebuildJob<'a> {
    fn new(path: &'a Path, fields: MetadataFields, original_language: Option<String>) -> Self {
        Self {
            path,
            temp_path: temp_path_for(path),
            fields,
            original_language,
            container: None,
            plan: PackagePlan::default(),
            image: ContainerImage::new(),
            dropped: HashSet::new(),
            taken: HashSet::new(),
            new_cover: None,
        }
    }

    fn run(mut self, sink: &dyn ContainerSink) -> Result<(), RebuildError> {
        let mut stage = RebuildStage::ReadOriginal;
        loop {
            debug!(path = %self.path.display(), stage = %stage, "rebuild stage");
            match self.step(stage, sink) {
                Ok(RebuildStage::Success) => {
                    info!(
                        path = %self.path.display(),
                        entries = self.image.len(),
                        "container rebuilt"
                    );
                    return Ok(());
                }
                Ok(next) => stage = next,
                Err(e) => {
                    error!(path = %self.path.display(), stage = %stage, error = %e, "rebuild failed");
                    self.rollback();
                    return Err(e);
                }
            }
        }
    }

    fn step(
        &mut self,
        stage: RebuildStage,
        sink: &dyn ContainerSink,
    ) -> Result<RebuildStage, RebuildError> {
        match stage {
            RebuildStage::ReadOriginal => {
                self.container =
                    Some(Container::open(self.path).map_err(RebuildError::ReadOriginal)?);
                Ok(RebuildStage::BuildMetadata)
            }
            RebuildStage::BuildMetadata => {
                self.build_metadata();
                Ok(RebuildStage::CopyContent)
            }
            RebuildStage::CopyContent => {
                self.copy_content()?;
                Ok(RebuildStage::ResolveCover)
            }
            RebuildStage::ResolveCover => {
                self.resolve_cover()?;
                Ok(RebuildStage::CopyNavigation)
            }
            RebuildStage::CopyNavigation => {
                self.copy_navigation()?;
                Ok(RebuildStage::AtomicWrite)
            }
            RebuildStage::AtomicWrite => {
                self.atomic_write(sink)?;
                Ok(RebuildStage::Success)
            }
            RebuildStage::Success | RebuildStage::Rollback => Ok(stage),
        }
    }

    fn container(&self) -> Result<&Container, RebuildError> {
        self.container
            .as_ref()
            .ok_or_else(|| RebuildError::Serialize("container not loaded".to_string()))
    }

    fn build_metadata(&mut self) {
        let fields = &self.fields;
        let identifier = fields
            .identifier
            .as_ref()
            .map(|isbn| isbn.to_string())
            .unwrap_or_else(|| format!("urn:uuid:{}", uuid::Uuid::new_v4()));
        let language = non_empty(&fields.language)
            .or_else(|| non_empty(&self.original_language))
            .or_else(|| {
                self.container
                    .as_ref()
                    .and_then(|c| c.first_meta("language"))
            })
            .unwrap_or_else(|| UNDETERMINED_LANGUAGE.to_string());

        let mut tags: Vec<String> = Vec::new();
        for tag in fields.tags.iter().map(|t| t.trim()).filter(|t| !t.is_empty()) {
            if !tags.iter().any(|t| t == tag) {
                tags.push(tag.to_string());
            }
        }

        self.plan.fields = PackageFields {
            title: non_empty(&fields.title),
            authors: fields
                .authors
                .iter()
                .map(|a| a.trim())
                .filter(|a| !a.is_empty())
                .map(str::to_string)
                .collect(),
            identifier,
            language,
            publisher: non_empty(&fields.publisher),
            date: non_empty(&fields.publication_date),
            tags,
            summary: non_empty(&fields.summary),
            modified: chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        };
    }

    fn copy_content(&mut self) -> Result<(), RebuildError> {
        let container = self.container()?;

        // only a cover that differs from the current one replaces it
        let current_cover = find_cover(container);
        let new_cover = self
            .fields
            .cover
            .clone()
            .filter(|c| !c.is_empty())
            .filter(|c| Some(c) != current_cover.as_ref())
            .filter(|c| {
                let recognized = sniff_image(c).is_some();
                if !recognized {
                    warn!(path = %self.path.display(), "suggested cover is not a known image type, keeping the current one");
                }
                recognized
            });

        let mut dropped = HashSet::new();
        let mut manifest = Vec::new();
        for item in &container.package().manifest {
            let archive_path = container.resolve(&item.href);
            if is_navigation(item) || (new_cover.is_some() && is_cover_image(item)) {
                debug!(href = %item.href, "dropping item");
                dropped.insert(archive_path);
                continue;
            }
            let mut item = item.clone();
            if new_cover.is_some() {
                item.properties = without_property(item.properties.as_deref(), "cover-image");
            }
            manifest.push(item);
        }

        let mut image = ContainerImage::new();
        let mut taken = HashSet::new();
        for entry in container.entries() {
            if entry.name == "mimetype"
                || entry.name == container.opf_path()
                || entry.name.ends_with('/')
                || dropped.contains(&entry.name)
            {
                continue;
            }
            taken.insert(entry.name.clone());
            image.push(entry.name.clone(), entry.data.clone());
        }
        taken.insert(container.opf_path().to_string());

        debug!(kept = image.len(), dropped = dropped.len(), "content copied");
        self.plan.manifest = manifest;
        self.dropped = dropped;
        self.taken = taken;
        self.image = image;
        self.new_cover = new_cover;
        Ok(())
    }

    fn resolve_cover(&mut self) -> Result<(), RebuildError> {
        if let Some(data) = self.new_cover.take() {
            let (ext, media_type) = sniff_image(&data)
                .ok_or_else(|| RebuildError::Serialize("unrecognized cover image".to_string()))?;
            let opf_dir = self.container()?.opf_dir().to_string();
            let href = self.unique_href(&opf_dir, "cover", ext);
            let id = unique_id("cover-image", &self.plan.manifest);

            self.image.push(join_path(&opf_dir, &href), data);
            self.plan.manifest.push(ManifestItem {
                id: id.clone(),
                href,
                media_type: media_type.to_string(),
                properties: Some("cover-image".to_string()),
            });
            info!(id = %id, "new cover written");
            self.plan.cover_id = Some(id);
            return Ok(());
        }

        // re-link the existing cover if it survived the copy
        let container = self.container()?;
        let kept = |id: &str| self.plan.manifest.iter().any(|i| i.id == id);
        let existing = container
            .meta_content("cover")
            .filter(|&id| kept(id))
            .map(str::to_string)
            .or_else(|| {
                find_cover_item(container)
                    .filter(|item| kept(item.id.as_str()))
                    .map(|item| item.id.clone())
            });
        debug!(cover = ?existing, "existing cover");
        self.plan.cover_id = existing;
        Ok(())
    }

    fn copy_navigation(&mut self) -> Result<(), RebuildError> {
        let container = self.container()?;
        let opf_dir = container.opf_dir().to_string();
        let opf_path = container.opf_path().to_string();
        let kept_ids: HashSet<&str> = self.plan.manifest.iter().map(|i| i.id.as_str()).collect();
        let spine = container
            .package()
            .spine
            .items
            .iter()
            .filter(|s| kept_ids.contains(s.idref.as_str()))
            .cloned()
            .collect();
        let guide = container
            .package()
            .guide
            .iter()
            .filter(|r| !self.dropped.contains(&container.resolve(&r.href)))
            .cloned()
            .collect();
        let toc = nav::prune_toc(container.toc(), &self.dropped);

        let title = self
            .plan
            .fields
            .title
            .clone()
            .unwrap_or_else(|| "Contents".to_string());
        let ncx = nav::render_ncx(&self.plan.fields.identifier, &title, &toc, &opf_dir)
            .map_err(|e| RebuildError::Serialize(format!("NCX: {}", e)))?;
        let nav_document = nav::render_nav_document(&title, &toc, &opf_dir)
            .map_err(|e| RebuildError::Serialize(format!("navigation document: {}", e)))?;

        let ncx_href = self.unique_href(&opf_dir, "toc", "ncx");
        let nav_href = self.unique_href(&opf_dir, "nav", "xhtml");
        let ncx_id = unique_id("ncx", &self.plan.manifest);
        self.image.push(join_path(&opf_dir, &ncx_href), ncx);
        self.plan.manifest.push(ManifestItem {
            id: ncx_id.clone(),
            href: ncx_href,
            media_type: crate::container::NCX_MEDIA_TYPE.to_string(),
            properties: None,
        });
        let nav_id = unique_id("nav", &self.plan.manifest);
        self.image.push(join_path(&opf_dir, &nav_href), nav_document);
        self.plan.manifest.push(ManifestItem {
            id: nav_id,
            href: nav_href,
            media_type: "application/xhtml+xml".to_string(),
            properties: Some("nav".to_string()),
        });

        self.plan.spine = spine;
        self.plan.guide = guide;
        self.plan.ncx_id = Some(ncx_id);

        let package = opf::render_package(&self.plan)
            .map_err(|e| RebuildError::Serialize(format!("package document: {}", e)))?;
        self.image.push(opf_path, package);
        debug!(toc_entries = toc.len(), "navigation regenerated");
        Ok(())
    }

    fn atomic_write(&mut self, sink: &dyn ContainerSink) -> Result<(), RebuildError> {
        sink.write(&self.temp_path, &self.image)?;
        std::fs::rename(&self.temp_path, self.path).map_err(RebuildError::Replace)?;
        Ok(())
    }

    fn rollback(&mut self) {
        debug!(path = %self.path.display(), stage = %RebuildStage::Rollback, "rebuild stage");
        match std::fs::remove_file(&self.temp_path) {
            Ok(()) => debug!(temp = %self.temp_path.display(), "temporary file removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(temp = %self.temp_path.display(), error = %e, "cannot remove temporary file"),
        }
    }

    /// `<stem>.<ext>` in `dir`, numbered when the name is taken. Returned
    /// relative to `dir`; the archive path is reserved.
    fn unique_href(&mut self, dir: &str, stem: &str, ext: &str) -> String {
        let mut name = format!("{}.{}", stem, ext);
        let mut counter = 1;
        while self.taken.contains(&join_path(dir, &name)) {
            name = format!("{}-{}.{}", stem, counter, ext);
            counter += 1;
        }
        self.taken.insert(join_path(dir, &name));
        name
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn is_navigation(item: &ManifestItem) -> bool {
    item.is_nav()
        || NAVIGATION_FILE_NAMES
            .iter()
            .any(|n| item.file_name().eq_ignore_ascii_case(n))
}

fn is_cover_image(item: &ManifestItem) -> bool {
    item.is_image()
        && (item.id.to_lowercase().contains("cover") || item.href.to_lowercase().contains("cover"))
}

fn without_property(properties: Option<&str>, property: &str) -> Option<String> {
    let rest: Vec<&str> = properties?
        .split_whitespace()
        .filter(|p| *p != property)
        .collect();
    (!rest.is_empty()).then(|| rest.join(" "))
}

fn unique_id(base: &str, manifest: &[ManifestItem]) -> String {
    let mut id = base.to_string();
    let mut counter = 1;
    while manifest.iter().any(|i| i.id == id) {
        id = format!("{}-{}", base, counter);
        counter += 1;
    }
    id
}

fn join_path(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", dir, name)
    }
}
