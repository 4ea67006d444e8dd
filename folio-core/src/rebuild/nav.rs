//! Navigation documents (NCX and XHTML nav) regenerated from a TOC

use super::opf::{write_element, write_text_element};
use crate::container::relative_href;
use crate::types::TocEntry;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::collections::HashSet;
use std::io::Cursor;

const NS_NCX: &str = "http://www.daisy.org/z3986/2005/ncx/";
const NS_XHTML: &str = "http://www.w3.org/1999/xhtml";
const NS_OPS: &str = "http://www.idpf.org/2007/ops";

/// Remove entries pointing into `dropped` archive paths. Entries without a
/// target (headings) and entries whose target was dropped give way to their
/// children.
pub fn prune_toc(entries: Vec<TocEntry>, dropped: &HashSet<String>) -> Vec<TocEntry> {
    let mut kept = Vec::new();
    for mut entry in entries {
        let children = prune_toc(std::mem::take(&mut entry.children), dropped);
        let target = entry.target_path();
        if target.is_empty() || dropped.contains(target) {
            kept.extend(children);
        } else {
            entry.children = children;
            kept.push(entry);
        }
    }
    kept
}

/// Render an NCX document. `base_dir` is the NCX's own directory; hrefs are
/// written relative to it.
pub fn render_ncx(
    uid: &str,
    title: &str,
    entries: &[TocEntry],
    base_dir: &str,
) -> Result<Vec<u8>, quick_xml::Error> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut ncx = BytesStart::new("ncx");
    ncx.push_attribute(("xmlns", NS_NCX));
    ncx.push_attribute(("version", "2005-1"));
    writer.write_event(Event::Start(ncx))?;

    let depth = entries.iter().map(TocEntry::depth).max().unwrap_or(1);
    writer.write_event(Event::Start(BytesStart::new("head")))?;
    for (name, content) in [
        ("dtb:uid", uid.to_string()),
        ("dtb:depth", depth.to_string()),
        ("dtb:totalPageCount", "0".to_string()),
        ("dtb:maxPageNumber", "0".to_string()),
    ] {
        let mut meta = BytesStart::new("meta");
        meta.push_attribute(("name", name));
        meta.push_attribute(("content", content.as_str()));
        writer.write_event(Event::Empty(meta))?;
    }
    writer.write_event(Event::End(BytesEnd::new("head")))?;

    writer.write_event(Event::Start(BytesStart::new("docTitle")))?;
    write_text_element(&mut writer, "text", title)?;
    writer.write_event(Event::End(BytesEnd::new("docTitle")))?;

    writer.write_event(Event::Start(BytesStart::new("navMap")))?;
    let mut play_order = 0;
    for entry in entries {
        write_nav_point(&mut writer, entry, base_dir, &mut play_order)?;
    }
    writer.write_event(Event::End(BytesEnd::new("navMap")))?;

    writer.write_event(Event::End(BytesEnd::new("ncx")))?;
    Ok(writer.into_inner().into_inner())
}

fn write_nav_point<W: std::io::Write>(
    writer: &mut Writer<W>,
    entry: &TocEntry,
    base_dir: &str,
    play_order: &mut usize,
) -> Result<(), quick_xml::Error> {
    *play_order += 1;
    let id = format!("navPoint-{}", play_order);
    let order = play_order.to_string();

    let mut point = BytesStart::new("navPoint");
    point.push_attribute(("id", id.as_str()));
    point.push_attribute(("playOrder", order.as_str()));
    writer.write_event(Event::Start(point))?;

    writer.write_event(Event::Start(BytesStart::new("navLabel")))?;
    write_text_element(writer, "text", &entry.title)?;
    writer.write_event(Event::End(BytesEnd::new("navLabel")))?;

    let src = relative_href(base_dir, &entry.href);
    let mut content = BytesStart::new("content");
    content.push_attribute(("src", src.as_str()));
    writer.write_event(Event::Empty(content))?;

    for child in &entry.children {
        write_nav_point(writer, child, base_dir, play_order)?;
    }
    writer.write_event(Event::End(BytesEnd::new("navPoint")))?;
    Ok(())
}

/// Render an EPUB 3 navigation document with a single `toc` nav
pub fn render_nav_document(
    title: &str,
    entries: &[TocEntry],
    base_dir: &str,
) -> Result<Vec<u8>, quick_xml::Error> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    writer.write_event(Event::DocType(BytesText::from_escaped("html")))?;

    let mut html = BytesStart::new("html");
    html.push_attribute(("xmlns", NS_XHTML));
    html.push_attribute(("xmlns:epub", NS_OPS));
    writer.write_event(Event::Start(html))?;

    writer.write_event(Event::Start(BytesStart::new("head")))?;
    write_text_element(&mut writer, "title", title)?;
    writer.write_event(Event::End(BytesEnd::new("head")))?;

    writer.write_event(Event::Start(BytesStart::new("body")))?;
    let mut nav = BytesStart::new("nav");
    nav.push_attribute(("epub:type", "toc"));
    nav.push_attribute(("id", "toc"));
    writer.write_event(Event::Start(nav))?;
    write_text_element(&mut writer, "h1", title)?;
    write_list(&mut writer, entries, base_dir)?;
    writer.write_event(Event::End(BytesEnd::new("nav")))?;
    writer.write_event(Event::End(BytesEnd::new("body")))?;

    writer.write_event(Event::End(BytesEnd::new("html")))?;
    Ok(writer.into_inner().into_inner())
}

fn write_list<W: std::io::Write>(
    writer: &mut Writer<W>,
    entries: &[TocEntry],
    base_dir: &str,
) -> Result<(), quick_xml::Error> {
    writer.write_event(Event::Start(BytesStart::new("ol")))?;
    for entry in entries {
        writer.write_event(Event::Start(BytesStart::new("li")))?;
        let href = relative_href(base_dir, &entry.href);
        let mut link = BytesStart::new("a");
        link.push_attribute(("href", href.as_str()));
        write_element(writer, link, &entry.title)?;
        if !entry.children.is_empty() {
            write_list(writer, &entry.children, base_dir)?;
        }
        writer.write_event(Event::End(BytesEnd::new("li")))?;
    }
    writer.write_event(Event::End(BytesEnd::new("ol")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::nav::{parse_nav_document, parse_ncx};

    fn toc() -> Vec<TocEntry> {
        vec![
            TocEntry::new("Cover", "OEBPS/nav.xhtml"),
            TocEntry::new("Part One", "").with_children(vec![
                TocEntry::new("Chapter 1", "OEBPS/text/ch1.xhtml#start"),
                TocEntry::new("Chapter 2", "OEBPS/text/ch2.xhtml"),
            ]),
        ]
    }

    #[test]
    fn test_prune_lifts_children() {
        let dropped: HashSet<String> = ["OEBPS/nav.xhtml".to_string()].into();
        let pruned = prune_toc(toc(), &dropped);
        assert_eq!(pruned.len(), 2);
        assert_eq!(pruned[0].title, "Chapter 1");
        assert_eq!(pruned[1].href, "OEBPS/text/ch2.xhtml");
    }

    #[test]
    fn test_ncx_round_trip() {
        let entries = prune_toc(toc(), &HashSet::new());
        let bytes = render_ncx("urn:uuid:x", "Book", &entries, "OEBPS").unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains(r#"src="text/ch1.xhtml#start""#));

        let parsed = parse_ncx(&text, "OEBPS");
        assert_eq!(parsed.len(), 3);
        assert_eq!(parsed[1].href, "OEBPS/text/ch1.xhtml#start");
    }

    #[test]
    fn test_nav_document_round_trip() {
        let entries = vec![TocEntry::new("One", "OEBPS/one.xhtml")
            .with_children(vec![TocEntry::new("One.a", "OEBPS/one.xhtml#a")])];
        let bytes = render_nav_document("Book", &entries, "OEBPS").unwrap();
        let parsed = parse_nav_document(std::str::from_utf8(&bytes).unwrap(), "OEBPS");
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].children[0].href, "OEBPS/one.xhtml#a");
    }
}
