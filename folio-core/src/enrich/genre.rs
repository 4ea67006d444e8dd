//! Genre buckets for catalog tags

use crate::text::classify_genre_from_text;
use tracing::info;

/// Genre buckets and the tag keywords that select them. Order matters: the
/// first bucket with a match wins.
pub const GENRE_BUCKETS: &[(&str, &[&str])] = &[
    ("Fiction", &["Fiction", "Literature", "Novel"]),
    (
        "Science-Fiction",
        &["Science Fiction", "Sci-Fi", "Fantasy", "Speculative Fiction"],
    ),
    ("Fantasy", &["Fantasy", "Magic", "Fantasy Fiction"]),
    ("Mystery", &["Mystery", "Crime", "Detective", "Thriller"]),
    ("Romance", &["Romance", "Love", "Romantic Fiction"]),
    ("Thriller", &["Thriller", "Suspense", "Crime Fiction"]),
    ("Biography", &["Biography", "Autobiography", "Memoir"]),
    ("History", &["History", "Historical", "Non-fiction"]),
    ("Philosophy", &["Philosophy", "Philosophical"]),
    ("Religion", &["Religion", "Spirituality", "Religious"]),
    ("Science", &["Science", "Scientific", "Non-fiction"]),
    ("Art", &["Art", "Artistic", "Visual Arts"]),
    ("Poetry", &["Poetry", "Poems", "Verse"]),
    ("Drama", &["Drama", "Theatre", "Play"]),
    ("Children", &["Children's", "Kids", "Young Adult"]),
];

/// Bucket for a list of tags.
///
/// A tag equal to a keyword (ignoring case) is tried across all buckets
/// first; only then does a tag containing a keyword count. Without the exact
/// pass a tag like "Science Fiction" would land in "Fiction".
pub fn map_tags_to_genre(tags: &[String]) -> Option<&'static str> {
    let tags: Vec<String> = tags
        .iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect();
    if tags.is_empty() {
        return None;
    }

    let exact = GENRE_BUCKETS.iter().find(|(_, keywords)| {
        keywords
            .iter()
            .any(|k| tags.iter().any(|t| *t == k.to_lowercase()))
    });
    exact
        .or_else(|| {
            GENRE_BUCKETS.iter().find(|(_, keywords)| {
                keywords
                    .iter()
                    .any(|k| tags.iter().any(|t| t.contains(&k.to_lowercase())))
            })
        })
        .map(|(genre, _)| *genre)
}

/// Bucket for a single free-form subject, by keyword containment
pub fn map_subject_to_genre(subject: &str) -> Option<&'static str> {
    let subject = subject.to_lowercase();
    GENRE_BUCKETS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| subject.contains(&k.to_lowercase())))
        .map(|(genre, _)| *genre)
}

/// Primary tags, then secondary tags, then the summary text
pub fn aggregate_genre(
    primary_tags: &[String],
    secondary_tags: &[String],
    summary: &str,
) -> Option<String> {
    let candidates = [
        ("primary tags", map_tags_to_genre(primary_tags)),
        ("secondary tags", map_tags_to_genre(secondary_tags)),
        ("summary text", classify_genre_from_text(summary)),
    ];
    let (source, genre) = candidates
        .into_iter()
        .find_map(|(source, genre)| genre.map(|g| (source, g)))?;
    info!(genre, source, "genre chosen");
    Some(genre.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_exact_match_beats_containment() {
        assert_eq!(
            map_tags_to_genre(&tags(&["Science Fiction"])),
            Some("Science-Fiction")
        );
        assert_eq!(map_tags_to_genre(&tags(&["fantasy"])), Some("Science-Fiction"));
        assert_eq!(map_tags_to_genre(&tags(&["Magic"])), Some("Fantasy"));
    }

    #[test]
    fn test_containment_fallback() {
        assert_eq!(
            map_tags_to_genre(&tags(&["French poetry, 20th century"])),
            Some("Poetry")
        );
        assert_eq!(map_tags_to_genre(&tags(&["Cooking"])), None);
        assert_eq!(map_tags_to_genre(&[]), None);
    }

    #[test]
    fn test_subject_mapping() {
        assert_eq!(map_subject_to_genre("Detective and mystery stories"), Some("Mystery"));
        assert_eq!(map_subject_to_genre("Gardening"), None);
    }

    #[test]
    fn test_priority_order() {
        let primary = tags(&["Biography"]);
        let secondary = tags(&["Poetry"]);
        assert_eq!(
            aggregate_genre(&primary, &secondary, "").as_deref(),
            Some("Biography")
        );
        assert_eq!(
            aggregate_genre(&[], &secondary, "").as_deref(),
            Some("Poetry")
        );
        assert_eq!(aggregate_genre(&[], &[], "").as_deref(), None);
    }
}
