//! Cover resolution
//!
//! In-container covers are found by an ordered cascade of strategies.
//! Remote covers go through [`RemoteCovers`], which caches downloads.

mod remote;

pub use remote::{cache_key, RemoteCovers, DEFAULT_COVERS_BASE};

use crate::container::{Container, ManifestItem};
use tracing::{debug, info};

/// One way of locating the cover item
pub type CoverStrategy = for<'a> fn(&'a Container) -> Option<&'a ManifestItem>;

/// Strategies in the order they are tried
pub const COVER_CASCADE: &[(&str, CoverStrategy)] = &[
    ("typed item", cover_by_type),
    ("opf meta", cover_by_meta),
    ("brute force", cover_by_brute_force),
];

/// Cover bytes of a container, if any strategy finds one
pub fn find_cover(container: &Container) -> Option<Vec<u8>> {
    let item = find_cover_item(container)?;
    let data = container.read_item(item)?;
    (!data.is_empty()).then(|| data.to_vec())
}

/// The manifest item holding the cover image
pub fn find_cover_item(container: &Container) -> Option<&ManifestItem> {
    for (name, strategy) in COVER_CASCADE {
        if let Some(item) = strategy(container) {
            info!(strategy = name, href = %item.href, "cover found");
            return Some(item);
        }
    }
    debug!("no cover found");
    None
}

/// Manifest item flagged `cover-image`, or a guide `cover` reference that
/// points directly at an image
pub fn cover_by_type(container: &Container) -> Option<&ManifestItem> {
    container
        .package()
        .manifest
        .iter()
        .find(|i| i.is_image() && i.has_property("cover-image"))
        .or_else(|| {
            container
                .package()
                .guide
                .iter()
                .filter(|r| r.kind.eq_ignore_ascii_case("cover"))
                .filter_map(|r| container.item_by_path(&container.resolve(&r.href)))
                .find(|i| i.is_image())
        })
}

/// `<meta name="cover" content="...">`; the content is normally a manifest
/// id but some producers put the href there
pub fn cover_by_meta(container: &Container) -> Option<&ManifestItem> {
    let reference = container.meta_content("cover")?;
    container
        .item_by_id(reference)
        .or_else(|| container.item_by_path(&container.resolve(reference)))
        .filter(|i| i.is_image())
}

/// Images whose name contains "cover", then "couv", then the first image
pub fn cover_by_brute_force(container: &Container) -> Option<&ManifestItem> {
    let mut images = container.images();
    // stable sort keeps manifest order within each rank
    images.sort_by_key(|item| {
        let name = item.href.to_lowercase();
        if name.contains("cover") {
            0
        } else if name.contains("couv") {
            1
        } else {
            2
        }
    });
    images.into_iter().next()
}

/// File extension and media type for image bytes, from their magic number
pub fn sniff_image(data: &[u8]) -> Option<(&'static str, &'static str)> {
    if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some(("jpg", "image/jpeg"))
    } else if data.starts_with(b"\x89PNG\r\n\x1a\n") {
        Some(("png", "image/png"))
    } else if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
        Some(("gif", "image/gif"))
    } else if data.len() >= 12 && &data[..4] == b"RIFF" && &data[8..12] == b"WEBP" {
        Some(("webp", "image/webp"))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sniff_image() {
        assert_eq!(sniff_image(&[0xFF, 0xD8, 0xFF, 0xE0]), Some(("jpg", "image/jpeg")));
        assert_eq!(
            sniff_image(b"\x89PNG\r\n\x1a\n0000"),
            Some(("png", "image/png"))
        );
        assert_eq!(sniff_image(b"RIFF0000WEBPVP8 "), Some(("webp", "image/webp")));
        assert_eq!(sniff_image(b"<html>"), None);
    }
}
