//! CLI command implementations

mod batch;
mod enrich;
mod info;

pub use batch::batch;
pub use enrich::enrich;
pub use info::info;

use crate::backup::backup_file;
use folio_core::cache::MemoryCache;
use folio_core::net::CannedTransport;
use folio_core::{EnricherService, FolioConfig};
use std::path::PathBuf;
use std::sync::Arc;

/// Flags shared by every command
pub struct Options {
    pub offline: bool,
    pub backup_dir: Option<PathBuf>,
}

impl Options {
    /// Environment configuration with command-line overrides applied
    pub fn config(&self) -> FolioConfig {
        let mut config = FolioConfig::from_env();
        if let Some(dir) = &self.backup_dir {
            config.backup_dir = dir.clone();
        }
        config
    }

    /// Service wired for this run. Offline runs answer every request with
    /// "not found" and keep covers in memory.
    pub fn service(&self) -> EnricherService {
        let config = self.config();
        let service = if self.offline {
            EnricherService::with_transport(
                &config,
                Arc::new(CannedTransport::new()),
                Arc::new(MemoryCache::new()),
            )
        } else {
            EnricherService::from_config(&config)
        };

        let backup_dir = config.backup_dir;
        service.with_backup(move |path| backup_file(path, &backup_dir))
    }
}
