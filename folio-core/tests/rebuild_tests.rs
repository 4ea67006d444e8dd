//! Container rebuild tests
//!
//! Fixtures are written to a temporary directory, rebuilt with suggested
//! metadata and read back through the extraction engine.

mod common;

use common::{jpeg, EpubFixture, FixtureImage, PNG};
use folio_core::container::Container;
use folio_core::cover::find_cover;
use folio_core::extract::extract;
use folio_core::rebuild::{temp_path_for, ContainerImage, ContainerSink, Rebuilder};
use folio_core::types::{Isbn, MetadataFields};
use folio_core::RebuildError;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

fn suggestions() -> MetadataFields {
    MetadataFields {
        title: Some("The New Title".into()),
        authors: vec!["Ann Writer".into(), "Bob Writer".into()],
        identifier: Isbn::parse("ISBN 978-3-16-148410-0"),
        language: Some("fr".into()),
        publisher: Some("Maison".into()),
        publication_date: Some("2001-02-03".into()),
        tags: vec!["Fantasy".into(), "Magic".into(), "Fantasy".into()],
        summary: Some("A short summary.".into()),
        genre: Some("Fantasy".into()),
        cover: Some(PNG.to_vec()),
    }
}

fn fixture_with_cover() -> EpubFixture {
    let mut fixture = EpubFixture::book("Old Title", "Ann Writer");
    fixture.images = vec![FixtureImage::new("cover", "images/cover.jpg", &jpeg(1)).flagged()];
    fixture
}

// =============================================================================
// Round trip
// =============================================================================

#[test]
fn test_extract_rebuild_extract_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("book.epub");
    let fixture = fixture_with_cover();
    fixture.write(&path);

    let mut record = extract(&path);
    assert_eq!(record.original.title.as_deref(), Some("Old Title"));
    assert_eq!(record.original.cover.as_deref(), Some(&jpeg(1)[..]));

    record.set_suggestions(suggestions());
    Rebuilder::new().rebuild(&path, &mut record).unwrap();

    let rebuilt = extract(&path);
    assert!(rebuilt.note.is_empty(), "note: {}", rebuilt.note);
    let fields = &rebuilt.original;
    assert_eq!(fields.title.as_deref(), Some("The New Title"));
    assert_eq!(fields.authors, vec!["Ann Writer", "Bob Writer"]);
    assert_eq!(
        fields.identifier.as_ref().map(Isbn::as_str),
        Some("9783161484100")
    );
    assert_eq!(fields.language.as_deref(), Some("fr"));
    assert_eq!(fields.publisher.as_deref(), Some("Maison"));
    assert_eq!(fields.publication_date.as_deref(), Some("2001-02-03"));
    assert_eq!(fields.tags, vec!["Fantasy", "Magic"]);
    assert_eq!(fields.summary.as_deref(), Some("A short summary."));
    assert_eq!(fields.cover.as_deref(), Some(PNG));

    assert!(!temp_path_for(&path).exists());
}

#[test]
fn test_rebuild_preserves_content_and_navigation() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("book.epub");
    let fixture = fixture_with_cover();
    fixture.write(&path);

    let mut record = extract(&path);
    record.set_suggestions(suggestions());
    Rebuilder::new().rebuild(&path, &mut record).unwrap();

    let container = Container::open(&path).unwrap();
    assert_eq!(
        container.entry("OEBPS/text/ch1.xhtml"),
        Some(fixture.chapter_xhtml().as_bytes())
    );
    // the replaced cover is gone
    assert!(container.entry("OEBPS/images/cover.jpg").is_none());

    let toc = container.toc();
    assert_eq!(toc.len(), 1);
    assert_eq!(toc[0].title, "Chapter One");
    assert_eq!(toc[0].href, "OEBPS/text/ch1.xhtml");

    let file = std::fs::File::open(&path).unwrap();
    let mut archive = zip::ZipArchive::new(file).unwrap();
    let first = archive.by_index(0).unwrap();
    assert_eq!(first.name(), "mimetype");
    assert_eq!(first.compression(), zip::CompressionMethod::Stored);
}

#[test]
fn test_rebuild_twice_is_stable() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("book.epub");
    fixture_with_cover().write(&path);
    let rebuilder = Rebuilder::new();

    let mut record = extract(&path);
    record.set_suggestions(suggestions());
    rebuilder.rebuild(&path, &mut record).unwrap();
    let first = extract(&path).original;

    record.set_suggestions(suggestions());
    rebuilder.rebuild(&path, &mut record).unwrap();
    let second = extract(&path).original;

    assert_eq!(first, second);
}

#[test]
fn test_rebuild_without_suggestions_keeps_originals() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("book.epub");
    let mut fixture = fixture_with_cover();
    fixture.publisher = Some("Old House");
    fixture.subjects = vec!["Poetry"];
    fixture.write(&path);

    let mut record = extract(&path);
    let before = record.original.clone();
    Rebuilder::new().rebuild(&path, &mut record).unwrap();

    let after = extract(&path).original;
    assert_eq!(after.title, before.title);
    assert_eq!(after.authors, before.authors);
    assert_eq!(after.publisher.as_deref(), Some("Old House"));
    assert_eq!(after.tags, vec!["Poetry"]);
    assert_eq!(after.cover, before.cover);
}

#[test]
fn test_unrecognized_cover_keeps_current() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("book.epub");
    fixture_with_cover().write(&path);

    let mut record = extract(&path);
    record.set_suggestions(MetadataFields {
        cover: Some(b"<html>not an image</html>".to_vec()),
        ..suggestions()
    });
    Rebuilder::new().rebuild(&path, &mut record).unwrap();

    assert_eq!(extract(&path).original.cover.as_deref(), Some(&jpeg(1)[..]));
}

// =============================================================================
// Atomicity
// =============================================================================

/// Writes half a file, then fails
struct FailingSink;

impl ContainerSink for FailingSink {
    fn write(&self, path: &Path, _image: &ContainerImage) -> Result<(), RebuildError> {
        let mut file = std::fs::File::create(path).map_err(RebuildError::Write)?;
        file.write_all(b"PK\x03\x04partial").map_err(RebuildError::Write)?;
        Err(RebuildError::Serialize("injected fault".to_string()))
    }
}

#[test]
fn test_serialization_fault_leaves_original_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("book.epub");
    fixture_with_cover().write(&path);
    let original_bytes = std::fs::read(&path).unwrap();

    let rebuilder = Rebuilder::with_sink(Arc::new(FailingSink));
    let mut record = extract(&path);
    record.set_suggestions(suggestions());

    let result = rebuilder.rebuild(&path, &mut record);
    assert!(matches!(result, Err(RebuildError::Serialize(_))));
    assert_eq!(std::fs::read(&path).unwrap(), original_bytes);
    assert!(!temp_path_for(&path).exists());
    assert!(record.note.starts_with("Rebuild failed"));
    assert!(!rebuilder.locks().is_locked(&path));
    assert!(record.suggested.is_some());
}

#[test]
fn test_unreadable_original_fails_read_stage() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.epub");
    std::fs::write(&path, b"not a zip").unwrap();

    let mut record = folio_core::BibliographicRecord::new(&path);
    record.set_suggestions(suggestions());
    let result = Rebuilder::new().rebuild(&path, &mut record);

    assert!(matches!(result, Err(RebuildError::ReadOriginal(_))));
    assert_eq!(std::fs::read(&path).unwrap(), b"not a zip");
}

#[test]
fn test_concurrent_rebuild_of_same_path_is_busy() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("book.epub");
    fixture_with_cover().write(&path);
    let original_bytes = std::fs::read(&path).unwrap();

    let rebuilder = Rebuilder::new();
    let _guard = rebuilder.locks().acquire(&path).unwrap();

    let mut record = extract(&path);
    record.set_suggestions(suggestions());
    let result = rebuilder.rebuild(&path, &mut record);

    assert!(matches!(result, Err(RebuildError::Busy(_))));
    assert_eq!(std::fs::read(&path).unwrap(), original_bytes);
}

// =============================================================================
// Cover cascade
// =============================================================================

fn cover_of(fixture: &EpubFixture) -> Option<Vec<u8>> {
    find_cover(&Container::from_bytes(fixture.to_bytes()).unwrap())
}

#[test]
fn test_typed_cover_wins_over_meta() {
    let mut fixture = EpubFixture::book("T", "A");
    fixture.cover_meta = Some("pic");
    fixture.images = vec![
        FixtureImage::new("pic", "images/pic.jpg", &jpeg(2)),
        FixtureImage::new("front", "images/front.jpg", &jpeg(1)).flagged(),
    ];
    assert_eq!(cover_of(&fixture), Some(jpeg(1)));
}

#[test]
fn test_meta_cover_wins_over_file_name() {
    let mut fixture = EpubFixture::book("T", "A");
    fixture.cover_meta = Some("b");
    fixture.images = vec![
        FixtureImage::new("a", "images/cover-old.jpg", &jpeg(3)),
        FixtureImage::new("b", "images/b.jpg", &jpeg(4)),
    ];
    assert_eq!(cover_of(&fixture), Some(jpeg(4)));
}

#[test]
fn test_brute_force_prefers_cover_then_couv_then_first() {
    let mut fixture = EpubFixture::book("T", "A");
    fixture.images = vec![
        FixtureImage::new("map", "images/map.png", PNG),
        FixtureImage::new("couv", "images/couverture.jpg", &jpeg(5)),
        FixtureImage::new("front", "images/my-cover.jpg", &jpeg(6)),
    ];
    assert_eq!(cover_of(&fixture), Some(jpeg(6)));

    fixture.images.pop();
    assert_eq!(cover_of(&fixture), Some(jpeg(5)));

    fixture.images.pop();
    assert_eq!(cover_of(&fixture), Some(PNG.to_vec()));
}

#[test]
fn test_no_images_no_cover() {
    assert_eq!(cover_of(&EpubFixture::book("T", "A")), None);
}
