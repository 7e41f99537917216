use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Extensions picked up by batch discovery when no filter is given
pub const DEFAULT_EXTENSIONS: &[&str] = &[
    "mp4", "avi", "mkv", "mov", "wmv", "flv", "m4v", "webm", "mp3", "wav", "flac", "ogg", "m4a",
    "aac", "opus",
];

/// Recursively collect files under `dir` whose extension matches (case-insensitive).
///
/// The result is sorted and free of duplicates so batch input order is stable.
pub fn find_media_files(dir: &Path, extensions: Option<&[String]>) -> Result<Vec<PathBuf>> {
    let wanted: Vec<String> = match extensions {
        Some(list) => list
            .iter()
            .map(|e| e.trim().trim_start_matches('.').to_lowercase())
            .filter(|e| !e.is_empty())
            .collect(),
        None => DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
    };

    let mut found = BTreeSet::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        for entry in std::fs::read_dir(&current)? {
            let path = entry?.path();
            if path.is_dir() {
                pending.push(path);
            } else if wanted.contains(&super::extension_of(&path)) {
                found.insert(path);
            }
        }
    }

    Ok(found.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"x").unwrap();
    }

    #[test]
    fn test_recursive_sorted_discovery() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("b.mp3"));
        touch(&dir.path().join("a.WAV"));
        touch(&dir.path().join("nested/c.mp4"));
        touch(&dir.path().join("notes.txt"));

        let files = find_media_files(dir.path(), None).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            names,
            vec![
                PathBuf::from("a.WAV"),
                PathBuf::from("b.mp3"),
                PathBuf::from("nested/c.mp4"),
            ]
        );
    }

    #[test]
    fn test_extension_filter() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("a.wav"));
        touch(&dir.path().join("b.mp3"));

        let filter = vec![".MP3".to_string()];
        let files = find_media_files(dir.path(), Some(&filter)).unwrap();
        assert_eq!(files, vec![dir.path().join("b.mp3")]);
    }
}
