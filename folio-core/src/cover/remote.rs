//! Remote cover download with a read-through cache

use super::sniff_image;
use crate::cache::CoverCache;
use crate::net::HttpClient;
use crate::types::CoverRef;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Default image host for numeric cover ids
pub const DEFAULT_COVERS_BASE: &str = "https://covers.openlibrary.org";

/// Cache key for a cover reference: `ol-<id>` for catalog ids, the hex
/// SHA-256 of the URL otherwise
pub fn cache_key(cover: &CoverRef) -> String {
    match cover {
        CoverRef::Id(id) => format!("ol-{}", id),
        CoverRef::Url(url) => hex::encode(Sha256::digest(url.as_bytes())),
    }
}

/// Downloads covers, serving repeats from the cache
#[derive(Clone)]
pub struct RemoteCovers {
    client: HttpClient,
    cache: Arc<dyn CoverCache>,
    covers_base: String,
}

impl RemoteCovers {
    pub fn new(client: HttpClient, cache: Arc<dyn CoverCache>) -> Self {
        Self {
            client,
            cache,
            covers_base: DEFAULT_COVERS_BASE.to_string(),
        }
    }

    pub fn with_covers_base(mut self, base: impl Into<String>) -> Self {
        self.covers_base = base.into().trim_end_matches('/').to_string();
        self
    }

    /// Download URL for a reference (large size for catalog ids)
    pub fn url_for(&self, cover: &CoverRef) -> String {
        match cover {
            CoverRef::Id(id) => format!("{}/b/id/{}-L.jpg", self.covers_base, id),
            CoverRef::Url(url) => url.clone(),
        }
    }

    /// Cover bytes for a reference. A cache hit makes no network call; a
    /// miss downloads and stores best-effort. Failures yield `None`.
    pub fn fetch(&self, cover: &CoverRef) -> Option<Vec<u8>> {
        let key = cache_key(cover);
        match self.cache.get(&key) {
            Ok(Some(data)) => {
                debug!(key = %key, "cover cache hit");
                return Some(data);
            }
            Ok(None) => {}
            Err(e) => warn!(key = %key, error = %e, "cover cache read failed"),
        }

        let url = self.url_for(cover);
        let data = match self.client.get_bytes(&url) {
            Ok(data) => data,
            Err(e) => {
                warn!(url = %url, error = %e, "cover download failed");
                return None;
            }
        };
        if sniff_image(&data).is_none() {
            warn!(url = %url, bytes = data.len(), "downloaded cover is not an image");
            return None;
        }

        if let Err(e) = self.cache.put(&key, &data) {
            warn!(key = %key, error = %e, "cover cache write failed");
        }
        info!(url = %url, bytes = data.len(), "cover downloaded");
        Some(data)
    }
}
