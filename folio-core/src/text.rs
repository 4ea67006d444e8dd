//! Text cleanup and keyword classification helpers

use regex::Regex;
use scraper::{Html, Selector};
use std::sync::LazyLock;

static BODY: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("body").expect("valid body selector"));

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

static SPECIAL_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s.,!?;:-]").expect("valid regex"));

/// Keyword table used to classify free text (summaries). French and English
/// keywords, since summaries come from both language editions.
pub const SUMMARY_GENRE_KEYWORDS: &[(&str, &[&str])] = &[
    ("Fiction", &["roman", "histoire", "personnage", "intrigue", "fiction"]),
    (
        "Science-Fiction",
        &["espace", "futur", "robot", "alien", "planète", "science fiction"],
    ),
    (
        "Fantasy",
        &["magie", "sorcier", "dragon", "fantaisie", "enchanteur", "fantasy"],
    ),
    (
        "Mystery",
        &["détective", "crime", "mystère", "enquête", "policier", "mystery"],
    ),
    ("Romance", &["amour", "romance", "cœur", "passion", "couple", "love"]),
    (
        "Thriller",
        &["suspense", "tension", "danger", "poursuite", "menace", "thriller"],
    ),
    (
        "Biography",
        &["vie", "biographie", "autobiographie", "mémoires", "biography"],
    ),
    (
        "History",
        &["historique", "guerre", "époque", "siècle", "batailles", "history"],
    ),
    ("Philosophy", &["philosophie", "philosophique", "philosophy"]),
    ("Science", &["science", "scientifique"]),
    ("Art", &["art", "artistique"]),
    ("Poetry", &["poésie", "poème", "poetry"]),
];

/// Keyword table used on the opening chapters of a book
pub const CONTENT_GENRE_KEYWORDS: &[(&str, &[&str])] = &[
    ("Fiction", &["roman", "histoire", "personnage", "intrigue"]),
    (
        "Science-Fiction",
        &["espace", "futur", "robot", "alien", "planète"],
    ),
    (
        "Fantasy",
        &["magie", "sorcier", "dragon", "fantaisie", "enchanteur"],
    ),
    (
        "Mystery",
        &["détective", "crime", "mystère", "enquête", "policier"],
    ),
    ("Romance", &["amour", "romance", "cœur", "passion", "couple"]),
    (
        "Thriller",
        &["suspense", "tension", "danger", "poursuite", "menace"],
    ),
    (
        "Biography",
        &["vie", "biographie", "autobiographie", "mémoires"],
    ),
    (
        "History",
        &["historique", "guerre", "époque", "siècle", "batailles"],
    ),
];

/// Collapse runs of whitespace into single spaces and trim
pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE.replace_all(text, " ").trim().to_string()
}

/// Plain text of an HTML/XHTML document or fragment. Uses the `<body>` when
/// there is one so the `<title>` does not leak into the text.
pub fn html_to_text(html: &str) -> String {
    if html.trim().is_empty() {
        return String::new();
    }
    let document = Html::parse_document(html);
    let pieces: Vec<&str> = match document.select(&BODY).next() {
        Some(body) => body.text().collect(),
        None => document.root_element().text().collect(),
    };
    collapse_whitespace(&pieces.join(" "))
}

/// Replace everything but word characters, whitespace and basic punctuation
/// with spaces, then collapse whitespace
pub fn clean_text(text: &str) -> String {
    collapse_whitespace(&SPECIAL_CHARS.replace_all(text, " "))
}

/// Score each genre by the number of keyword occurrences in `text`
/// (case-insensitive) and return the best one if it reaches `threshold`.
/// Ties go to the genre listed first.
pub fn classify_by_keywords(
    text: &str,
    table: &[(&'static str, &[&str])],
    threshold: usize,
) -> Option<&'static str> {
    if text.trim().is_empty() {
        return None;
    }
    let lowered = text.to_lowercase();

    let mut best: Option<(&'static str, usize)> = None;
    for (genre, keywords) in table {
        let score: usize = keywords.iter().map(|k| lowered.matches(k).count()).sum();
        if score > best.map_or(0, |(_, s)| s) {
            best = Some((*genre, score));
        }
    }

    best.filter(|(_, score)| *score >= threshold.max(1))
        .map(|(genre, _)| genre)
}

/// Genre of a summary text, threshold 1
pub fn classify_genre_from_text(text: &str) -> Option<&'static str> {
    classify_by_keywords(text, SUMMARY_GENRE_KEYWORDS, 1)
}

/// First `max_chars` characters of `text` (char-boundary safe)
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
