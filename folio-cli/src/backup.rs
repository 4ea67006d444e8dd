//! Timestamped copies of files about to be rewritten

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use tracing::info;

/// Copy `path` into `backup_dir` as `YYYYMMDD-HHMMSS-<name>`, creating the
/// directory if needed. A second backup within the same second gets a
/// ` (n)` suffix before the extension.
pub fn backup_file(path: &Path, backup_dir: &Path) -> io::Result<PathBuf> {
    let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S").to_string();
    backup_with_stamp(path, backup_dir, &stamp)
}

fn backup_with_stamp(path: &Path, backup_dir: &Path, stamp: &str) -> io::Result<PathBuf> {
    if path.file_name().is_none() {
        return Err(io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"));
    }
    let stem = path.file_stem().unwrap_or_default().to_string_lossy();
    let extension = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let mut source = File::open(path)?;
    fs::create_dir_all(backup_dir)?;

    let mut counter = 0;
    loop {
        let name = match counter {
            0 => format!("{}-{}{}", stamp, stem, extension),
            n => format!("{}-{} ({}){}", stamp, stem, n, extension),
        };
        let target = backup_dir.join(name);
        // create_new so concurrent workers never share a target
        match File::options().write(true).create_new(true).open(&target) {
            Ok(mut copy) => {
                io::copy(&mut source, &mut copy)?;
                info!(from = %path.display(), to = %target.display(), "backed up");
                return Ok(target);
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => counter += 1,
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backup_copies_with_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("book.epub");
        fs::write(&source, b"content").unwrap();

        let backups = dir.path().join("nested/backups");
        let copy = backup_file(&source, &backups).unwrap();

        let name = copy.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.ends_with("-book.epub"));
        // YYYYMMDD-HHMMSS-
        assert_eq!(name.len(), "20240101-120000-book.epub".len());
        assert_eq!(fs::read(&copy).unwrap(), b"content");
        assert!(source.exists());
    }

    #[test]
    fn test_backups_in_the_same_second_do_not_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("book.epub");
        let backups = dir.path().join("backups");

        fs::write(&source, b"first").unwrap();
        let first = backup_with_stamp(&source, &backups, "20240101-120000").unwrap();
        fs::write(&source, b"second").unwrap();
        let second = backup_with_stamp(&source, &backups, "20240101-120000").unwrap();
        let third = backup_with_stamp(&source, &backups, "20240101-120000").unwrap();

        assert_eq!(first, backups.join("20240101-120000-book.epub"));
        assert_eq!(second, backups.join("20240101-120000-book (1).epub"));
        assert_eq!(third, backups.join("20240101-120000-book (2).epub"));
        assert_eq!(fs::read(&first).unwrap(), b"first");
        assert_eq!(fs::read(&second).unwrap(), b"second");
    }

    #[test]
    fn test_backup_missing_source_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = backup_file(&dir.path().join("missing.epub"), dir.path());
        assert!(result.is_err());
    }
}
