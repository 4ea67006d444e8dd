//! Package document (OPF) generation

use crate::container::{GuideReference, ManifestItem, SpineItem};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Cursor;

const NS_OPF: &str = "http://www.idpf.org/2007/opf";
const NS_DC: &str = "http://purl.org/dc/elements/1.1/";

/// Id of the identifier element referenced by `unique-identifier`
pub const IDENTIFIER_ID: &str = "BookId";

/// Resolved metadata written into the package
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PackageFields {
    pub title: Option<String>,
    pub authors: Vec<String>,
    /// ISBN digits or a `urn:uuid:` value
    pub identifier: String,
    pub language: String,
    pub publisher: Option<String>,
    pub date: Option<String>,
    pub tags: Vec<String>,
    pub summary: Option<String>,
    /// `dcterms:modified` timestamp
    pub modified: String,
}

/// Everything needed to render a package document
#[derive(Debug, Clone, Default)]
pub struct PackagePlan {
    pub fields: PackageFields,
    pub manifest: Vec<ManifestItem>,
    pub spine: Vec<SpineItem>,
    pub ncx_id: Option<String>,
    pub cover_id: Option<String>,
    pub guide: Vec<GuideReference>,
}

/// Render an EPUB 3 package document
pub fn render_package(plan: &PackagePlan) -> Result<Vec<u8>, quick_xml::Error> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut package = BytesStart::new("package");
    package.push_attribute(("xmlns", NS_OPF));
    package.push_attribute(("version", "3.0"));
    package.push_attribute(("unique-identifier", IDENTIFIER_ID));
    writer.write_event(Event::Start(package))?;

    write_metadata(&mut writer, plan)?;
    write_manifest(&mut writer, &plan.manifest)?;
    write_spine(&mut writer, plan)?;
    if !plan.guide.is_empty() {
        write_guide(&mut writer, &plan.guide)?;
    }

    writer.write_event(Event::End(BytesEnd::new("package")))?;
    Ok(writer.into_inner().into_inner())
}

fn write_metadata<W: std::io::Write>(
    writer: &mut Writer<W>,
    plan: &PackagePlan,
) -> Result<(), quick_xml::Error> {
    let fields = &plan.fields;
    let mut metadata = BytesStart::new("metadata");
    metadata.push_attribute(("xmlns:dc", NS_DC));
    metadata.push_attribute(("xmlns:opf", NS_OPF));
    writer.write_event(Event::Start(metadata))?;

    let mut identifier = BytesStart::new("dc:identifier");
    identifier.push_attribute(("id", IDENTIFIER_ID));
    write_element(writer, identifier, &fields.identifier)?;

    if let Some(title) = &fields.title {
        write_text_element(writer, "dc:title", title)?;
    }
    for author in &fields.authors {
        write_text_element(writer, "dc:creator", author)?;
    }
    write_text_element(writer, "dc:language", &fields.language)?;
    if let Some(publisher) = &fields.publisher {
        write_text_element(writer, "dc:publisher", publisher)?;
    }
    if let Some(date) = &fields.date {
        write_text_element(writer, "dc:date", date)?;
    }
    for tag in &fields.tags {
        write_text_element(writer, "dc:subject", tag)?;
    }
    if let Some(summary) = &fields.summary {
        write_text_element(writer, "dc:description", summary)?;
    }

    let mut modified = BytesStart::new("meta");
    modified.push_attribute(("property", "dcterms:modified"));
    write_element(writer, modified, &fields.modified)?;

    if let Some(cover_id) = &plan.cover_id {
        let mut cover = BytesStart::new("meta");
        cover.push_attribute(("name", "cover"));
        cover.push_attribute(("content", cover_id.as_str()));
        writer.write_event(Event::Empty(cover))?;
    }

    writer.write_event(Event::End(BytesEnd::new("metadata")))?;
    Ok(())
}

fn write_manifest<W: std::io::Write>(
    writer: &mut Writer<W>,
    items: &[ManifestItem],
) -> Result<(), quick_xml::Error> {
    writer.write_event(Event::Start(BytesStart::new("manifest")))?;
    for item in items {
        let mut elem = BytesStart::new("item");
        elem.push_attribute(("id", item.id.as_str()));
        elem.push_attribute(("href", item.href.as_str()));
        elem.push_attribute(("media-type", item.media_type.as_str()));
        if let Some(properties) = item.properties.as_deref().filter(|p| !p.trim().is_empty()) {
            elem.push_attribute(("properties", properties));
        }
        writer.write_event(Event::Empty(elem))?;
    }
    writer.write_event(Event::End(BytesEnd::new("manifest")))?;
    Ok(())
}

fn write_spine<W: std::io::Write>(
    writer: &mut Writer<W>,
    plan: &PackagePlan,
) -> Result<(), quick_xml::Error> {
    let mut spine = BytesStart::new("spine");
    if let Some(ncx_id) = &plan.ncx_id {
        spine.push_attribute(("toc", ncx_id.as_str()));
    }
    writer.write_event(Event::Start(spine))?;
    for item in &plan.spine {
        let mut itemref = BytesStart::new("itemref");
        itemref.push_attribute(("idref", item.idref.as_str()));
        if !item.linear {
            itemref.push_attribute(("linear", "no"));
        }
        writer.write_event(Event::Empty(itemref))?;
    }
    writer.write_event(Event::End(BytesEnd::new("spine")))?;
    Ok(())
}

fn write_guide<W: std::io::Write>(
    writer: &mut Writer<W>,
    references: &[GuideReference],
) -> Result<(), quick_xml::Error> {
    writer.write_event(Event::Start(BytesStart::new("guide")))?;
    for reference in references {
        let mut elem = BytesStart::new("reference");
        elem.push_attribute(("type", reference.kind.as_str()));
        if let Some(title) = &reference.title {
            elem.push_attribute(("title", title.as_str()));
        }
        elem.push_attribute(("href", reference.href.as_str()));
        writer.write_event(Event::Empty(elem))?;
    }
    writer.write_event(Event::End(BytesEnd::new("guide")))?;
    Ok(())
}

/// Write a simple text element
pub(crate) fn write_text_element<W: std::io::Write>(
    writer: &mut Writer<W>,
    name: &str,
    content: &str,
) -> Result<(), quick_xml::Error> {
    write_element(writer, BytesStart::new(name), content)
}

/// Write a start tag (with its attributes), text and the matching end tag
pub(crate) fn write_element<W: std::io::Write>(
    writer: &mut Writer<W>,
    start: BytesStart<'_>,
    content: &str,
) -> Result<(), quick_xml::Error> {
    let end = start.to_end().into_owned();
    writer.write_event(Event::Start(start))?;
    writer.write_event(Event::Text(BytesText::new(content)))?;
    writer.write_event(Event::End(end))?;
    Ok(())
}
