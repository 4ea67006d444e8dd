//! Small EPUB fixtures written with the zip writer

#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::Path;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Smallest byte strings the image sniffer recognizes
pub const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F'];
pub const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\x00\x00\x00\x0dIHDR";

pub const CHAPTER_TEXT: &str = "The morning light fell across the quiet harbour while the \
    fishermen prepared their nets and talked about the weather and the long winter ahead.";

pub struct FixtureImage {
    pub id: &'static str,
    pub href: &'static str,
    pub media_type: &'static str,
    pub data: Vec<u8>,
    pub cover_property: bool,
}

impl FixtureImage {
    pub fn new(id: &'static str, href: &'static str, data: &[u8]) -> Self {
        let media_type = if href.ends_with(".png") {
            "image/png"
        } else {
            "image/jpeg"
        };
        Self {
            id,
            href,
            media_type,
            data: data.to_vec(),
            cover_property: false,
        }
    }

    pub fn flagged(mut self) -> Self {
        self.cover_property = true;
        self
    }
}

/// An EPUB 2 book with one chapter under `OEBPS/` and an NCX
#[derive(Default)]
pub struct EpubFixture {
    pub title: Option<&'static str>,
    pub authors: Vec<&'static str>,
    pub identifier: Option<&'static str>,
    /// Further `dc:identifier` values, written after the primary one
    pub extra_identifiers: Vec<&'static str>,
    pub language: Option<&'static str>,
    pub publisher: Option<&'static str>,
    pub date: Option<&'static str>,
    pub subjects: Vec<&'static str>,
    pub cover_meta: Option<&'static str>,
    pub images: Vec<FixtureImage>,
    /// Replaces the whole chapter body markup
    pub chapter: Option<String>,
}

impl EpubFixture {
    pub fn book(title: &'static str, author: &'static str) -> Self {
        Self {
            title: Some(title),
            authors: vec![author],
            language: Some("en"),
            ..Default::default()
        }
    }

    pub fn chapter_xhtml(&self) -> String {
        let body = self
            .chapter
            .clone()
            .unwrap_or_else(|| format!("<h1>Chapter One</h1><p>{}</p>", CHAPTER_TEXT));
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <html xmlns=\"http://www.w3.org/1999/xhtml\"><head><title>One</title></head>\
             <body>{}</body></html>",
            body
        )
    }

    pub fn opf(&self) -> String {
        let mut metadata = String::new();
        let identifier = self.identifier.unwrap_or("urn:uuid:fixture-book");
        metadata.push_str(&format!("<dc:identifier id=\"uid\">{}</dc:identifier>\n", identifier));
        for extra in &self.extra_identifiers {
            metadata.push_str(&format!("<dc:identifier>{}</dc:identifier>\n", extra));
        }
        if let Some(title) = self.title {
            metadata.push_str(&format!("<dc:title>{}</dc:title>\n", title));
        }
        for author in &self.authors {
            metadata.push_str(&format!("<dc:creator>{}</dc:creator>\n", author));
        }
        if let Some(language) = self.language {
            metadata.push_str(&format!("<dc:language>{}</dc:language>\n", language));
        }
        if let Some(publisher) = self.publisher {
            metadata.push_str(&format!("<dc:publisher>{}</dc:publisher>\n", publisher));
        }
        if let Some(date) = self.date {
            metadata.push_str(&format!("<dc:date>{}</dc:date>\n", date));
        }
        for subject in &self.subjects {
            metadata.push_str(&format!("<dc:subject>{}</dc:subject>\n", subject));
        }
        if let Some(cover) = self.cover_meta {
            metadata.push_str(&format!("<meta name=\"cover\" content=\"{}\"/>\n", cover));
        }

        let mut manifest = String::from(
            "<item id=\"ncx\" href=\"toc.ncx\" media-type=\"application/x-dtbncx+xml\"/>\n\
             <item id=\"ch1\" href=\"text/ch1.xhtml\" media-type=\"application/xhtml+xml\"/>\n",
        );
        for image in &self.images {
            let properties = if image.cover_property {
                " properties=\"cover-image\""
            } else {
                ""
            };
            manifest.push_str(&format!(
                "<item id=\"{}\" href=\"{}\" media-type=\"{}\"{}/>\n",
                image.id, image.href, image.media_type, properties
            ));
        }

        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <package xmlns=\"http://www.idpf.org/2007/opf\" version=\"2.0\" unique-identifier=\"uid\">\n\
             <metadata xmlns:dc=\"http://purl.org/dc/elements/1.1/\" xmlns:opf=\"http://www.idpf.org/2007/opf\">\n\
             {}</metadata>\n\
             <manifest>\n{}</manifest>\n\
             <spine toc=\"ncx\"><itemref idref=\"ch1\"/></spine>\n\
             </package>\n",
            metadata, manifest
        )
    }

    pub fn ncx(&self) -> String {
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <ncx xmlns=\"http://www.daisy.org/z3986/2005/ncx/\" version=\"2005-1\">\n\
             <head><meta name=\"dtb:uid\" content=\"fixture\"/></head>\n\
             <docTitle><text>{}</text></docTitle>\n\
             <navMap><navPoint id=\"np1\" playOrder=\"1\"><navLabel><text>Chapter One</text></navLabel>\
             <content src=\"text/ch1.xhtml\"/></navPoint></navMap>\n\
             </ncx>\n",
            self.title.unwrap_or("Untitled")
        )
    }

    /// Write the container to `path`
    pub fn write(&self, path: &Path) {
        let file = File::create(path).unwrap();
        let mut zip = ZipWriter::new(file);
        let stored = FileOptions::default().compression_method(CompressionMethod::Stored);
        let deflated = FileOptions::default().compression_method(CompressionMethod::Deflated);

        zip.start_file("mimetype", stored).unwrap();
        zip.write_all(b"application/epub+zip").unwrap();

        zip.start_file("META-INF/container.xml", deflated).unwrap();
        zip.write_all(
            b"<?xml version=\"1.0\"?>\n\
              <container version=\"1.0\" xmlns=\"urn:oasis:names:tc:opendocument:xmlns:container\">\
              <rootfiles><rootfile full-path=\"OEBPS/content.opf\" \
              media-type=\"application/oebps-package+xml\"/></rootfiles></container>",
        )
        .unwrap();

        zip.start_file("OEBPS/content.opf", deflated).unwrap();
        zip.write_all(self.opf().as_bytes()).unwrap();

        zip.start_file("OEBPS/toc.ncx", deflated).unwrap();
        zip.write_all(self.ncx().as_bytes()).unwrap();

        zip.start_file("OEBPS/text/ch1.xhtml", deflated).unwrap();
        zip.write_all(self.chapter_xhtml().as_bytes()).unwrap();

        for image in &self.images {
            zip.start_file(format!("OEBPS/{}", image.href), stored).unwrap();
            zip.write_all(&image.data).unwrap();
        }
        zip.finish().unwrap();
    }

    /// The container bytes, for in-memory parsing
    pub fn to_bytes(&self) -> Vec<u8> {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fixture.epub");
        self.write(&path);
        std::fs::read(path).unwrap()
    }
}

/// A JPEG-looking byte string distinguishable by its last byte
pub fn jpeg(tag: u8) -> Vec<u8> {
    let mut data = JPEG.to_vec();
    data.push(tag);
    data
}
