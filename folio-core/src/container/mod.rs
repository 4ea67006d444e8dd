//! EPUB container model
//!
//! Reads the zip archive fully into memory and parses the package document
//! (OPF) with quick-xml. Everything the pipeline needs from a container goes
//! through [`Container`]: metadata entries, manifest, spine, guide, TOC and
//! raw item bytes.

pub mod nav;
mod package;
mod xml;

pub use package::{GuideReference, ManifestItem, MetaEntry, Package, Spine, SpineItem};

use crate::error::ParseError;
use crate::types::TocEntry;
use std::io::{Cursor, Read};
use std::path::Path;
use zip::ZipArchive;

/// Location of the container descriptor inside every EPUB
pub const CONTAINER_XML: &str = "META-INF/container.xml";

/// Media type of NCX navigation documents
pub const NCX_MEDIA_TYPE: &str = "application/x-dtbncx+xml";

/// One raw zip entry, in archive order
#[derive(Debug, Clone)]
pub struct ZipEntry {
    pub name: String,
    pub data: Vec<u8>,
}

/// A parsed EPUB container
#[derive(Debug, Clone)]
pub struct Container {
    entries: Vec<ZipEntry>,
    opf_path: String,
    package: Package,
}

impl Container {
    /// Open and parse a container from disk
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ParseError> {
        let data = std::fs::read(path.as_ref()).map_err(|e| {
            ParseError::InvalidEpub(format!("{}: {}", path.as_ref().display(), e))
        })?;
        Self::from_bytes(data)
    }

    /// Parse a container held in memory
    pub fn from_bytes(data: Vec<u8>) -> Result<Self, ParseError> {
        let mut archive = ZipArchive::new(Cursor::new(data))
            .map_err(|e| ParseError::InvalidEpub(format!("Invalid zip archive: {}", e)))?;

        let mut entries = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let mut file = archive
                .by_index(i)
                .map_err(|e| ParseError::InvalidEpub(e.to_string()))?;
            if file.is_dir() {
                continue;
            }
            let name = file.name().to_string();
            let mut data = Vec::new();
            file.read_to_end(&mut data)
                .map_err(|e| ParseError::InvalidEpub(format!("{}: {}", name, e)))?;
            entries.push(ZipEntry { name, data });
        }

        let descriptor = entries
            .iter()
            .find(|e| e.name == CONTAINER_XML)
            .ok_or_else(|| ParseError::MissingEntry(CONTAINER_XML.to_string()))?;
        let opf_path = package::rootfile_path(&xml::decode_utf8(&descriptor.data))?;

        let opf = entries
            .iter()
            .find(|e| e.name == opf_path)
            .ok_or_else(|| ParseError::MissingEntry(opf_path.clone()))?;
        let package = Package::parse(&xml::decode_utf8(&opf.data))?;

        Ok(Self {
            entries,
            opf_path,
            package,
        })
    }

    pub fn package(&self) -> &Package {
        &self.package
    }

    /// Archive path of the package document
    pub fn opf_path(&self) -> &str {
        &self.opf_path
    }

    /// Directory of the package document ("" at archive root)
    pub fn opf_dir(&self) -> &str {
        match self.opf_path.rfind('/') {
            Some(idx) => &self.opf_path[..idx],
            None => "",
        }
    }

    /// All zip entries, in archive order
    pub fn entries(&self) -> &[ZipEntry] {
        &self.entries
    }

    /// Raw bytes of an archive entry
    pub fn entry(&self, name: &str) -> Option<&[u8]> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.data.as_slice())
    }

    /// Archive path a manifest href points at
    pub fn resolve(&self, href: &str) -> String {
        resolve_href(self.opf_dir(), href)
    }

    /// Bytes of a manifest item
    pub fn read_item(&self, item: &ManifestItem) -> Option<&[u8]> {
        self.entry(&self.resolve(&item.href))
    }

    /// Decoded text of a manifest item
    pub fn item_text(&self, item: &ManifestItem) -> Option<String> {
        self.read_item(item).map(xml::decode_utf8)
    }

    pub fn item_by_id(&self, id: &str) -> Option<&ManifestItem> {
        self.package.manifest.iter().find(|i| i.id == id)
    }

    /// Manifest item whose resolved path equals `archive_path`
    pub fn item_by_path(&self, archive_path: &str) -> Option<&ManifestItem> {
        self.package
            .manifest
            .iter()
            .find(|i| self.resolve(&i.href) == archive_path)
    }

    /// Text values of every metadata element with the given local name,
    /// in document order
    pub fn meta_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.package
            .metadata
            .iter()
            .filter(move |m| m.name == name)
            .map(|m| m.text.as_str())
    }

    /// First non-empty trimmed text value of a metadata element
    pub fn first_meta(&self, name: &str) -> Option<String> {
        self.meta_values(name)
            .map(str::trim)
            .find(|v| !v.is_empty())
            .map(str::to_string)
    }

    /// `content` of the EPUB 2 `<meta name="..." content="..."/>` element
    pub fn meta_content(&self, meta_name: &str) -> Option<&str> {
        self.package
            .metadata
            .iter()
            .filter(|m| m.name == "meta")
            .find(|m| m.attr("name") == Some(meta_name))
            .and_then(|m| m.attr("content"))
    }

    /// Content documents: spine order first, then any remaining XHTML
    /// manifest items. Navigation documents are excluded.
    pub fn documents(&self) -> Vec<&ManifestItem> {
        let mut docs: Vec<&ManifestItem> = self
            .package
            .spine
            .items
            .iter()
            .filter_map(|s| self.item_by_id(&s.idref))
            .filter(|i| i.is_document() && !i.is_nav())
            .collect();

        for item in &self.package.manifest {
            if item.is_document() && !item.is_nav() && !docs.iter().any(|d| d.id == item.id) {
                docs.push(item);
            }
        }
        docs
    }

    /// Image items, in manifest order
    pub fn images(&self) -> Vec<&ManifestItem> {
        self.package
            .manifest
            .iter()
            .filter(|i| i.is_image())
            .collect()
    }

    /// The NCX document, if any
    pub fn ncx_item(&self) -> Option<&ManifestItem> {
        self.package
            .spine
            .toc
            .as_deref()
            .and_then(|id| self.item_by_id(id))
            .or_else(|| {
                self.package
                    .manifest
                    .iter()
                    .find(|i| i.media_type == NCX_MEDIA_TYPE)
            })
    }

    /// The EPUB 3 navigation document, if any
    pub fn nav_item(&self) -> Option<&ManifestItem> {
        self.package.manifest.iter().find(|i| i.has_property("nav"))
    }

    /// Table of contents with hrefs as full archive paths.
    ///
    /// Tries the NCX, then the navigation document, then falls back to one
    /// entry per spine document.
    pub fn toc(&self) -> Vec<TocEntry> {
        let from_ncx = self.ncx_item().and_then(|item| {
            let base = parent_dir(&self.resolve(&item.href)).to_string();
            self.item_text(item)
                .map(|text| nav::parse_ncx(&text, &base))
        });
        if let Some(entries) = from_ncx.filter(|e| !e.is_empty()) {
            return entries;
        }

        let from_nav = self.nav_item().and_then(|item| {
            let base = parent_dir(&self.resolve(&item.href)).to_string();
            self.item_text(item)
                .map(|text| nav::parse_nav_document(&text, &base))
        });
        if let Some(entries) = from_nav.filter(|e| !e.is_empty()) {
            return entries;
        }

        self.documents()
            .into_iter()
            .map(|item| {
                let path = self.resolve(&item.href);
                let title = Path::new(&path)
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| item.id.clone());
                TocEntry::new(title, path)
            })
            .collect()
    }
}

/// Directory part of an archive path
pub fn parent_dir(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[..idx],
        None => "",
    }
}

/// Resolve a (possibly percent-encoded) href against a base directory into a
/// normalized archive path. The fragment is dropped.
pub fn resolve_href(base_dir: &str, href: &str) -> String {
    let href = href.split('#').next().unwrap_or(href);
    let decoded = urlencoding::decode(href)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| href.to_string());

    let mut parts: Vec<&str> = if decoded.starts_with('/') {
        Vec::new()
    } else {
        base_dir.split('/').filter(|s| !s.is_empty()).collect()
    };
    for segment in decoded.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    parts.join("/")
}

/// Express an archive path relative to `base_dir`, keeping any fragment
pub fn relative_href(base_dir: &str, archive_path: &str) -> String {
    let (path, fragment) = match archive_path.split_once('#') {
        Some((p, f)) => (p, Some(f)),
        None => (archive_path, None),
    };

    let base: Vec<&str> = base_dir.split('/').filter(|s| !s.is_empty()).collect();
    let target: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let common = base
        .iter()
        .zip(target.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<&str> = std::iter::repeat("..").take(base.len() - common).collect();
    parts.extend(&target[common..]);
    let mut out = parts.join("/");
    if let Some(fragment) = fragment {
        out.push('#');
        out.push_str(fragment);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_href() {
        assert_eq!(resolve_href("OEBPS", "text/ch1.xhtml"), "OEBPS/text/ch1.xhtml");
        assert_eq!(resolve_href("OEBPS/text", "../images/a.jpg"), "OEBPS/images/a.jpg");
        assert_eq!(resolve_href("", "ch%201.xhtml#p3"), "ch 1.xhtml");
    }

    #[test]
    fn test_relative_href() {
        assert_eq!(relative_href("OEBPS", "OEBPS/text/ch1.xhtml#a"), "text/ch1.xhtml#a");
        assert_eq!(relative_href("OEBPS/nav", "OEBPS/ch1.xhtml"), "../ch1.xhtml");
        assert_eq!(relative_href("", "ch1.xhtml"), "ch1.xhtml");
    }

    #[test]
    fn test_parent_dir() {
        assert_eq!(parent_dir("OEBPS/content.opf"), "OEBPS");
        assert_eq!(parent_dir("content.opf"), "");
    }

    #[test]
    fn test_rejects_non_zip() {
        let result = Container::from_bytes(b"not a zip".to_vec());
        assert!(matches!(result, Err(ParseError::InvalidEpub(_))));
    }
}
