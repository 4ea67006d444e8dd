//! Metadata recovered from the text of the opening documents
//!
//! Front matter often carries what the package metadata lacks: a copyright
//! line with the publisher and year, an ISBN, a back-cover summary.

use crate::container::Container;
use crate::text::{classify_by_keywords, html_to_text, truncate_chars, CONTENT_GENRE_KEYWORDS};
use crate::types::{ContentAnalysis, ContentInsights, ContentType, EditionInfo, Isbn};
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

/// Documents searched for a summary
const SUMMARY_DOCUMENTS: usize = 3;
/// Documents searched for publisher, date, edition and genre
const FRONT_MATTER_DOCUMENTS: usize = 2;
/// Documents whose length feeds the page estimate
const PAGE_SAMPLE_DOCUMENTS: usize = 5;
const CHARS_PER_PAGE: usize = 2000;
const GENRE_SAMPLE_CHARS: usize = 5000;
const MAX_SUMMARY_CHARS: usize = 500;

static SUMMARY_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?is)(?:résumé|summary|abstract)[:\s]*(.{50,500})",
        r"(?is)synopsis[:\s]*(.{50,500})",
        r"(?is)description[:\s]*(.{50,500})",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid summary regex"))
    .collect()
});

static PUBLISHER_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)(?:éditeur|publisher|publié par)[:\s]*([A-Z][^,\.]{3,50})",
        r"(?i)(?:©|copyright)[^,]*([A-Z][^,\.]{3,50})",
        r"(?i)([A-Z][a-z]+ (?:Press|Éditions|Publishing|Books))",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid publisher regex"))
    .collect()
});

static DATE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)(?:publié|published|édition)[:\s]*(\d{4})",
        r"(?i)(?:©|copyright)[^,]*?(\d{4})",
        r"(?i)(\d{4})[^,]*édition",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid date regex"))
    .collect()
});

static EDITION_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:édition|edition)[:\s]*(\d+)").expect("valid regex"));
static VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:version|v)[:\s]*(\d[\d.]*)").expect("valid regex"));
static PRINTING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:impression|printing)[:\s]*(\d+)").expect("valid regex"));

/// Analyze the text of a container's content documents
pub fn analyze(container: &Container) -> ContentInsights {
    let texts: Vec<String> = container
        .documents()
        .into_iter()
        .map(|item| {
            container
                .item_text(item)
                .map(|t| html_to_text(&t))
                .unwrap_or_default()
        })
        .collect();
    analyze_texts(&texts)
}

/// Analyze already-extracted document texts, in reading order
pub fn analyze_texts(texts: &[String]) -> ContentInsights {
    let front = &texts[..texts.len().min(FRONT_MATTER_DOCUMENTS)];

    let insights = ContentInsights {
        identifier: texts.iter().find_map(|t| Isbn::find_in_text(t)),
        summary: texts
            .iter()
            .take(SUMMARY_DOCUMENTS)
            .find_map(|t| find_summary(t)),
        genre: detect_genre(front),
        publisher: front.iter().find_map(|t| find_publisher(t)),
        publication_date: front.iter().find_map(|t| find_year(t)),
        edition_info: edition_info(front),
        analysis: Some(structure(texts)),
    };
    debug!(
        identifier = insights.identifier.is_some(),
        summary = insights.summary.is_some(),
        genre = ?insights.genre,
        publisher = ?insights.publisher,
        "content analysis"
    );
    insights
}

pub fn find_summary(text: &str) -> Option<String> {
    SUMMARY_PATTERNS.iter().find_map(|re| {
        let summary = re.captures(text)?.get(1)?.as_str().trim();
        (summary.chars().count() > 50)
            .then(|| truncate_chars(summary, MAX_SUMMARY_CHARS).to_string())
    })
}

pub fn find_publisher(text: &str) -> Option<String> {
    PUBLISHER_PATTERNS.iter().find_map(|re| {
        let publisher = re.captures(text)?.get(1)?.as_str().trim();
        (publisher.chars().count() > 3).then(|| publisher.to_string())
    })
}

/// A publication year between 1800 and 2030 near a publishing keyword
pub fn find_year(text: &str) -> Option<String> {
    DATE_PATTERNS.iter().find_map(|re| {
        re.captures_iter(text)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str())
            .find(|year| year.parse::<u32>().is_ok_and(|y| (1800..=2030).contains(&y)))
            .map(str::to_string)
    })
}

/// Edition, version and printing numbers. The first document that mentions
/// a value wins.
pub fn edition_info(texts: &[String]) -> Option<EditionInfo> {
    let mut info = EditionInfo::default();
    for text in texts {
        let capture = |re: &Regex| {
            re.captures(text)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().to_string())
        };
        info.merge(EditionInfo {
            edition_number: capture(&EDITION_NUMBER),
            version: capture(&VERSION),
            printing: capture(&PRINTING),
        });
    }
    (!info.is_empty()).then_some(info)
}

fn detect_genre(texts: &[String]) -> Option<String> {
    let joined = texts.join(" ");
    let sample = truncate_chars(&joined, GENRE_SAMPLE_CHARS);
    classify_by_keywords(sample, CONTENT_GENRE_KEYWORDS, 2).map(str::to_string)
}

fn structure(texts: &[String]) -> ContentAnalysis {
    let chars: usize = texts
        .iter()
        .take(PAGE_SAMPLE_DOCUMENTS)
        .map(|t| t.chars().count())
        .sum();
    ContentAnalysis {
        total_documents: texts.len(),
        estimated_pages: (chars / CHARS_PER_PAGE).max(1),
        content_type: ContentType::from_document_count(texts.len()),
    }
}
