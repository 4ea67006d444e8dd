//! Package document (OPF) parsing

use super::xml;
use crate::error::ParseError;
use quick_xml::events::{BytesStart, Event};

/// One element inside `<metadata>` (Dublin Core or `meta`)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetaEntry {
    /// Local element name, e.g. `title`, `creator`, `meta`
    pub name: String,
    /// Attributes by local name
    pub attributes: Vec<(String, String)>,
    pub text: String,
}

impl MetaEntry {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// A manifest `<item>`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ManifestItem {
    pub id: String,
    /// Href exactly as written, relative to the package document
    pub href: String,
    pub media_type: String,
    pub properties: Option<String>,
}

impl ManifestItem {
    pub fn has_property(&self, property: &str) -> bool {
        self.properties
            .as_deref()
            .is_some_and(|p| p.split_whitespace().any(|x| x == property))
    }

    pub fn is_document(&self) -> bool {
        matches!(
            self.media_type.as_str(),
            "application/xhtml+xml" | "text/html"
        )
    }

    pub fn is_image(&self) -> bool {
        self.media_type.starts_with("image/")
    }

    /// NCX or EPUB 3 navigation document
    pub fn is_nav(&self) -> bool {
        self.media_type == super::NCX_MEDIA_TYPE || self.has_property("nav")
    }

    /// File name component of the href
    pub fn file_name(&self) -> &str {
        let path = self.href.split('#').next().unwrap_or(&self.href);
        path.rsplit('/').next().unwrap_or(path)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpineItem {
    pub idref: String,
    pub linear: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Spine {
    /// Manifest id of the NCX (`toc` attribute)
    pub toc: Option<String>,
    pub items: Vec<SpineItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GuideReference {
    pub kind: String,
    pub title: Option<String>,
    pub href: String,
}

/// Parsed package document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Package {
    pub version: String,
    pub unique_identifier: Option<String>,
    pub metadata: Vec<MetaEntry>,
    pub manifest: Vec<ManifestItem>,
    pub spine: Spine,
    pub guide: Vec<GuideReference>,
}

#[derive(Clone, Copy, PartialEq, Default)]
enum Section {
    #[default]
    None,
    Metadata,
    Manifest,
    Spine,
    Guide,
}

impl Package {
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let mut reader = xml::reader(text);
        let mut state = ParseState::default();

        loop {
            let event = reader
                .read_event()
                .map_err(|e| ParseError::InvalidPackage(e.to_string()))?;
            match event {
                Event::Start(e) if state.current.is_none() => state.open(&e, false),
                Event::Empty(e) if state.current.is_none() => state.open(&e, true),
                Event::Text(t) => {
                    if let Some(entry) = state.current.as_mut() {
                        entry.text.push_str(&xml::text(&t));
                    }
                }
                Event::CData(c) => {
                    if let Some(entry) = state.current.as_mut() {
                        entry.text.push_str(&String::from_utf8_lossy(&c));
                    }
                }
                Event::End(e) => {
                    let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                    state.close(&name);
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !state.seen_root {
            return Err(ParseError::InvalidPackage(
                "missing <package> root element".to_string(),
            ));
        }
        Ok(state.package)
    }
}

#[derive(Default)]
struct ParseState {
    package: Package,
    section: Section,
    seen_root: bool,
    current: Option<MetaEntry>,
}

impl ParseState {
    fn open(&mut self, e: &BytesStart<'_>, empty: bool) {
        let name = xml::local_name(e);
        match (self.section, name.as_str()) {
            (_, "package") => {
                self.seen_root = true;
                self.package.version = xml::attribute(e, "version").unwrap_or_default();
                self.package.unique_identifier = xml::attribute(e, "unique-identifier");
            }
            (Section::None, "metadata") if !empty => self.section = Section::Metadata,
            (Section::None, "manifest") if !empty => self.section = Section::Manifest,
            (Section::None, "spine") => {
                self.package.spine.toc = xml::attribute(e, "toc");
                if !empty {
                    self.section = Section::Spine;
                }
            }
            (Section::None, "guide") if !empty => self.section = Section::Guide,
            (Section::Metadata, "dc-metadata" | "x-metadata") => {}
            (Section::Metadata, _) => {
                let entry = MetaEntry {
                    name,
                    attributes: xml::attributes(e),
                    text: String::new(),
                };
                if empty {
                    self.package.metadata.push(entry);
                } else {
                    self.current = Some(entry);
                }
            }
            (Section::Manifest, "item") => {
                let attrs = xml::attributes(e);
                let get = |k: &str| attrs.iter().find(|(n, _)| n == k).map(|(_, v)| v.clone());
                self.package.manifest.push(ManifestItem {
                    id: get("id").unwrap_or_default(),
                    href: get("href").unwrap_or_default(),
                    media_type: get("media-type").unwrap_or_default(),
                    properties: get("properties"),
                });
            }
            (Section::Spine, "itemref") => {
                if let Some(idref) = xml::attribute(e, "idref") {
                    let linear = xml::attribute(e, "linear").map_or(true, |v| v != "no");
                    self.package.spine.items.push(SpineItem { idref, linear });
                }
            }
            (Section::Guide, "reference") => {
                self.package.guide.push(GuideReference {
                    kind: xml::attribute(e, "type").unwrap_or_default(),
                    title: xml::attribute(e, "title"),
                    href: xml::attribute(e, "href").unwrap_or_default(),
                });
            }
            _ => {}
        }
    }

    fn close(&mut self, name: &str) {
        if let Some(entry) = self.current.take() {
            if entry.name == name {
                self.package.metadata.push(trim_entry(entry));
            } else {
                // nested markup inside a metadata element
                self.current = Some(entry);
            }
            return;
        }
        if matches!(name, "metadata" | "manifest" | "spine" | "guide") {
            self.section = Section::None;
        }
    }
}

fn trim_entry(mut entry: MetaEntry) -> MetaEntry {
    entry.text = entry.text.trim().to_string();
    entry
}

/// Read `full-path` of the first rootfile from `META-INF/container.xml`
pub fn rootfile_path(text: &str) -> Result<String, ParseError> {
    let mut reader = xml::reader(text);
    loop {
        match reader
            .read_event()
            .map_err(|e| ParseError::InvalidEpub(e.to_string()))?
        {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"rootfile" => {
                if let Some(path) = xml::attribute(&e, "full-path") {
                    return Ok(path);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Err(ParseError::InvalidEpub(
        "container.xml has no rootfile".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const OPF: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="2.0" unique-identifier="BookId">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:opf="http://www.idpf.org/2007/opf">
    <dc:title>Le Petit Prince</dc:title>
    <dc:creator opf:role="aut">Antoine de Saint-Exupéry</dc:creator>
    <dc:identifier id="BookId">urn:isbn:9782070612758</dc:identifier>
    <dc:subject></dc:subject>
    <meta name="cover" content="cover-img"/>
  </metadata>
  <manifest>
    <item id="ncx" href="toc.ncx" media-type="application/x-dtbncx+xml"/>
    <item id="ch1" href="text/ch1.xhtml" media-type="application/xhtml+xml"/>
    <item id="cover-img" href="images/cover.jpg" media-type="image/jpeg" properties="cover-image"/>
  </manifest>
  <spine toc="ncx">
    <itemref idref="ch1"/>
    <itemref idref="cover-img" linear="no"/>
  </spine>
  <guide>
    <reference type="cover" title="Cover" href="images/cover.jpg"/>
  </guide>
</package>"#;

    #[test]
    fn test_parse_package() {
        let package = Package::parse(OPF).unwrap();
        assert_eq!(package.version, "2.0");
        assert_eq!(package.unique_identifier.as_deref(), Some("BookId"));

        let title = package.metadata.iter().find(|m| m.name == "title").unwrap();
        assert_eq!(title.text, "Le Petit Prince");
        let creator = package.metadata.iter().find(|m| m.name == "creator").unwrap();
        assert_eq!(creator.attr("role"), Some("aut"));
        let meta = package.metadata.iter().find(|m| m.name == "meta").unwrap();
        assert_eq!(meta.attr("content"), Some("cover-img"));
        assert_eq!(package.metadata.len(), 5);

        assert_eq!(package.manifest.len(), 3);
        assert!(package.manifest[0].is_nav());
        assert!(package.manifest[2].has_property("cover-image"));
        assert_eq!(package.manifest[2].file_name(), "cover.jpg");

        assert_eq!(package.spine.toc.as_deref(), Some("ncx"));
        assert_eq!(package.spine.items.len(), 2);
        assert!(!package.spine.items[1].linear);
        assert_eq!(package.guide[0].kind, "cover");
    }

    #[test]
    fn test_missing_root() {
        assert!(Package::parse("<other/>").is_err());
    }

    #[test]
    fn test_rootfile_path() {
        let xml = r#"<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles><rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/></rootfiles>
</container>"#;
        assert_eq!(rootfile_path(xml).unwrap(), "OEBPS/content.opf");
        assert!(rootfile_path("<container/>").is_err());
    }
}
