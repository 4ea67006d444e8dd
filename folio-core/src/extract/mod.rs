//! Metadata extraction with cascading fallbacks
//!
//! Structured package metadata is read first; language and identifier fall
//! back to scanning the document text when the package has nothing usable.

pub mod content;

use crate::container::Container;
use crate::cover;
use crate::text::{html_to_text, truncate_chars};
use crate::types::{BibliographicRecord, Isbn, MetadataFields};
use std::path::Path;
use tracing::{debug, info, warn};

/// Characters of the first document fed to language detection
const LANGUAGE_SAMPLE_CHARS: usize = 3000;

/// Minimum detector confidence for a language guess to be kept
const MIN_LANGUAGE_CONFIDENCE: f64 = 0.5;

/// One strategy in a fallback chain
pub type Strategy<T> = fn(&Container) -> Option<T>;

/// Language: package metadata, then detection on the first document
pub const LANGUAGE_CHAIN: &[Strategy<String>] = &[language_from_metadata, language_from_text];

/// Identifier: `dc:identifier` values, then every content document
pub const IDENTIFIER_CHAIN: &[Strategy<Isbn>] =
    &[identifier_from_metadata, identifier_from_documents];

/// Evaluate strategies in order, stopping at the first that yields a value
pub fn first_some<T>(container: &Container, chain: &[Strategy<T>]) -> Option<T> {
    chain.iter().find_map(|strategy| strategy(container))
}

/// Extract a record from a container on disk. Never fails: an unreadable
/// container yields an empty record with the reason in `note`.
pub fn extract(path: impl AsRef<Path>) -> BibliographicRecord {
    let path = path.as_ref();
    let mut record = BibliographicRecord::new(path);

    match Container::open(path) {
        Ok(container) => {
            record.original = read_fields(&container);
            record.content = content::analyze(&container);
            info!(
                path = %path.display(),
                title = ?record.original.title,
                identifier = ?record.original.identifier.as_ref().map(Isbn::as_str),
                "extracted metadata"
            );
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "cannot read container");
            record.note = format!("Cannot read container: {}", e);
        }
    }
    record
}

/// Read every structured field, running the fallback chains
pub fn read_fields(container: &Container) -> MetadataFields {
    MetadataFields {
        title: container.first_meta("title"),
        authors: non_empty_values(container, "creator"),
        identifier: first_some(container, IDENTIFIER_CHAIN),
        language: first_some(container, LANGUAGE_CHAIN),
        publisher: container.first_meta("publisher"),
        publication_date: container.first_meta("date"),
        tags: non_empty_values(container, "subject"),
        summary: container.first_meta("description"),
        genre: None,
        cover: cover::find_cover(container),
    }
}

fn non_empty_values(container: &Container, name: &str) -> Vec<String> {
    container
        .meta_values(name)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn language_from_metadata(container: &Container) -> Option<String> {
    container.first_meta("language")
}

/// Statistical detection over the first document's text
pub fn language_from_text(container: &Container) -> Option<String> {
    let first = container.documents().into_iter().next()?;
    let text = html_to_text(&container.item_text(first)?);
    let sample = truncate_chars(&text, LANGUAGE_SAMPLE_CHARS);
    if sample.trim().is_empty() {
        return None;
    }

    let info = whatlang::detect(sample)?;
    if info.confidence() < MIN_LANGUAGE_CONFIDENCE {
        debug!(
            lang = info.lang().code(),
            confidence = info.confidence(),
            "language guess too weak"
        );
        return None;
    }
    let code = iso_639_1(info.lang().code());
    info!(language = code, "language detected from text");
    Some(code.to_string())
}

/// First checksum-valid ISBN among the `dc:identifier` values, in order
pub fn identifier_from_metadata(container: &Container) -> Option<Isbn> {
    container.meta_values("identifier").find_map(Isbn::find_in_text)
}

/// First checksum-valid ISBN in the document text (spine order, then the
/// remaining manifest documents)
pub fn identifier_from_documents(container: &Container) -> Option<Isbn> {
    container.documents().into_iter().find_map(|item| {
        let isbn = Isbn::find_in_text(&html_to_text(&container.item_text(item)?))?;
        info!(isbn = %isbn, document = %item.href, "identifier found in text");
        Some(isbn)
    })
}

/// Map an ISO 639-3 code to ISO 639-1 where one exists
pub fn iso_639_1(code: &str) -> &str {
    match code {
        "afr" => "af",
        "aka" => "ak",
        "amh" => "am",
        "arb" | "ara" => "ar",
        "aze" => "az",
        "bel" => "be",
        "ben" => "bn",
        "bul" => "bg",
        "cat" => "ca",
        "ces" => "cs",
        "cmn" | "zho" => "zh",
        "dan" => "da",
        "deu" => "de",
        "ell" => "el",
        "eng" => "en",
        "epo" => "eo",
        "est" => "et",
        "fin" => "fi",
        "fra" => "fr",
        "guj" => "gu",
        "heb" => "he",
        "hin" => "hi",
        "hrv" => "hr",
        "hun" => "hu",
        "hye" => "hy",
        "ind" => "id",
        "ita" => "it",
        "jav" => "jv",
        "jpn" => "ja",
        "kan" => "kn",
        "kat" => "ka",
        "khm" => "km",
        "kor" => "ko",
        "lat" => "la",
        "lav" => "lv",
        "lit" => "lt",
        "mal" => "ml",
        "mar" => "mr",
        "mkd" => "mk",
        "mya" => "my",
        "nep" => "ne",
        "nld" => "nl",
        "nob" => "nb",
        "ori" => "or",
        "pan" => "pa",
        "pes" => "fa",
        "pol" => "pl",
        "por" => "pt",
        "ron" => "ro",
        "rus" => "ru",
        "sin" => "si",
        "slk" => "sk",
        "slv" => "sl",
        "sna" => "sn",
        "spa" => "es",
        "srp" => "sr",
        "swe" => "sv",
        "tam" => "ta",
        "tel" => "te",
        "tgl" => "tl",
        "tha" => "th",
        "tuk" => "tk",
        "tur" => "tr",
        "ukr" => "uk",
        "urd" => "ur",
        "uzb" => "uz",
        "vie" => "vi",
        "yid" => "yi",
        "zul" => "zu",
        other => other,
    }
}
