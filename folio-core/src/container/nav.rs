//! Table of contents parsing (NCX and EPUB 3 navigation documents)

use super::{resolve_href, xml};
use crate::types::TocEntry;
use quick_xml::events::Event;

/// Join a resolved path with the fragment of the original href
fn resolve_with_fragment(base_dir: &str, href: &str) -> String {
    let mut path = resolve_href(base_dir, href);
    if let Some((_, fragment)) = href.split_once('#') {
        path.push('#');
        path.push_str(fragment);
    }
    path
}

/// Parse an NCX `navMap` into TOC entries. Hrefs are resolved against
/// `base_dir` (the directory holding the NCX). Malformed XML yields whatever
/// was read before the error.
pub fn parse_ncx(text: &str, base_dir: &str) -> Vec<TocEntry> {
    let mut reader = xml::reader(text);
    let mut roots = Vec::new();
    let mut stack: Vec<TocEntry> = Vec::new();
    let mut in_label = false;
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"navPoint" => stack.push(TocEntry::new("", "")),
                b"navLabel" => in_label = true,
                b"text" if in_label => in_text = true,
                b"content" => set_ncx_src(&mut stack, &e, base_dir),
                _ => {}
            },
            Ok(Event::Empty(e)) if e.local_name().as_ref() == b"content" => {
                set_ncx_src(&mut stack, &e, base_dir);
            }
            Ok(Event::Text(t)) if in_text => {
                if let Some(top) = stack.last_mut() {
                    top.title.push_str(xml::text(&t).trim());
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"navPoint" => {
                    if let Some(done) = stack.pop() {
                        attach(&mut stack, &mut roots, done);
                    }
                }
                b"navLabel" => in_label = false,
                b"text" => in_text = false,
                _ => {}
            },
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
    }

    while let Some(done) = stack.pop() {
        attach(&mut stack, &mut roots, done);
    }
    roots
}

fn set_ncx_src(stack: &mut [TocEntry], e: &quick_xml::events::BytesStart<'_>, base_dir: &str) {
    if let (Some(top), Some(src)) = (stack.last_mut(), xml::attribute(e, "src")) {
        top.href = resolve_with_fragment(base_dir, &src);
    }
}

fn attach(stack: &mut [TocEntry], roots: &mut Vec<TocEntry>, entry: TocEntry) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(entry),
        None => roots.push(entry),
    }
}

/// Parse the `toc` nav of an EPUB 3 navigation document
pub fn parse_nav_document(text: &str, base_dir: &str) -> Vec<TocEntry> {
    let mut reader = xml::reader(text);
    let mut roots = Vec::new();
    let mut stack: Vec<TocEntry> = Vec::new();
    let mut in_toc = false;
    let mut in_label = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"nav" => {
                    in_toc = xml::attribute(&e, "type")
                        .is_some_and(|t| t.split_whitespace().any(|x| x == "toc"));
                }
                b"li" if in_toc => stack.push(TocEntry::new("", "")),
                b"a" | b"span" if in_toc => {
                    in_label = true;
                    if let (Some(top), Some(href)) = (stack.last_mut(), xml::attribute(&e, "href"))
                    {
                        top.href = resolve_with_fragment(base_dir, &href);
                    }
                }
                _ => {}
            },
            Ok(Event::Text(t)) if in_label => {
                if let Some(top) = stack.last_mut() {
                    if !top.title.is_empty() {
                        top.title.push(' ');
                    }
                    top.title.push_str(xml::text(&t).trim());
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"nav" => {
                    if in_toc {
                        break;
                    }
                }
                b"a" | b"span" => in_label = false,
                b"li" if in_toc => {
                    if let Some(done) = stack.pop() {
                        attach(&mut stack, &mut roots, done);
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
    }

    while let Some(done) = stack.pop() {
        attach(&mut stack, &mut roots, done);
    }
    roots
}
