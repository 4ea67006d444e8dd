//! Recursive discovery of EPUB files

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Every `.epub` file (any case) under `dir`, sorted. Unreadable
/// subdirectories are skipped with a warning.
pub fn find_epubs(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    let mut root = true;

    while let Some(current) = pending.pop() {
        let entries = match fs::read_dir(&current) {
            Ok(entries) => entries,
            Err(e) if root => return Err(e),
            Err(e) => {
                warn!(dir = %current.display(), error = %e, "skipping unreadable directory");
                continue;
            }
        };
        root = false;

        for entry in entries.filter_map(|e| e.ok()) {
            let path = entry.path();
            if path.is_dir() {
                pending.push(path);
            } else if is_epub(&path) {
                files.push(path);
            }
        }
    }

    files.sort();
    info!(dir = %dir.display(), count = files.len(), "found epubs");
    Ok(files)
}

fn is_epub(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("epub"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finds_nested_epubs_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("b/c");
        fs::create_dir_all(&nested).unwrap();
        fs::write(dir.path().join("z.epub"), b"").unwrap();
        fs::write(dir.path().join("a.EPUB"), b"").unwrap();
        fs::write(dir.path().join("notes.txt"), b"").unwrap();
        fs::write(nested.join("m.epub"), b"").unwrap();

        let found = find_epubs(dir.path()).unwrap();
        assert_eq!(
            found,
            vec![
                dir.path().join("a.EPUB"),
                nested.join("m.epub"),
                dir.path().join("z.epub"),
            ]
        );
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(find_epubs(&dir.path().join("missing")).is_err());
    }
}
