//! Serialization of a rebuilt container

use crate::error::RebuildError;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Media type stored in the leading `mimetype` entry
pub const EPUB_MIMETYPE: &str = "application/epub+zip";

/// One archive entry of the rebuilt container
#[derive(Debug, Clone, PartialEq)]
pub struct OutputEntry {
    pub name: String,
    pub data: Vec<u8>,
    /// Written without compression
    pub stored: bool,
}

/// The full content of a rebuilt container, in archive order. The
/// `mimetype` entry is always first and stored.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerImage {
    entries: Vec<OutputEntry>,
}

impl Default for ContainerImage {
    fn default() -> Self {
        Self::new()
    }
}

impl ContainerImage {
    pub fn new() -> Self {
        Self {
            entries: vec![OutputEntry {
                name: "mimetype".to_string(),
                data: EPUB_MIMETYPE.as_bytes().to_vec(),
                stored: true,
            }],
        }
    }

    /// Append a compressed entry, replacing any earlier entry of that name.
    /// The `mimetype` entry is fixed and cannot be replaced.
    pub fn push(&mut self, name: impl Into<String>, data: Vec<u8>) {
        let name = name.into();
        if name == "mimetype" {
            return;
        }
        self.entries.retain(|e| e.name != name);
        self.entries.push(OutputEntry {
            name,
            data,
            stored: false,
        });
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.name == name)
    }

    pub fn entries(&self) -> &[OutputEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Writes a container image to a file. Tests substitute failing sinks.
pub trait ContainerSink: Send + Sync {
    fn write(&self, path: &Path, image: &ContainerImage) -> Result<(), RebuildError>;
}

/// Production sink: a zip archive on disk
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipSink;

impl ContainerSink for ZipSink {
    fn write(&self, path: &Path, image: &ContainerImage) -> Result<(), RebuildError> {
        let file = File::create(path).map_err(RebuildError::Write)?;
        let mut writer = ZipWriter::new(BufWriter::new(file));

        for entry in image.entries() {
            let method = if entry.stored {
                CompressionMethod::Stored
            } else {
                CompressionMethod::Deflated
            };
            let options = FileOptions::default().compression_method(method);
            writer
                .start_file(entry.name.as_str(), options)
                .map_err(|e| RebuildError::Serialize(format!("{}: {}", entry.name, e)))?;
            writer.write_all(&entry.data).map_err(RebuildError::Write)?;
        }

        let mut out = writer
            .finish()
            .map_err(|e| RebuildError::Serialize(e.to_string()))?;
        out.flush().map_err(RebuildError::Write)?;
        out.get_ref().sync_all().map_err(RebuildError::Write)?;
        Ok(())
    }
}
