//! Discovery of input files on the local file system.
use crate::prelude::*;
use std::path::{Path, PathBuf};

/// Recursively collects the files under `root` whose extension matches one of
/// `extensions` (case-insensitive). The result is sorted by path.
///
/// Entries that can't be read are skipped with a warning. A missing `root`
/// yields an empty list.
pub fn discover_files(root: &Path, extensions: &[&str]) -> Vec<PathBuf> {
    if !root.is_dir() {
        warn!(root = %root.display(), "Input directory doesn't exist");
        return vec![];
    }

    walkdir::WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| {
            entry
                .map_err(|err| {
                    warn!(err = tracing_err(&err), "Skipping unreadable directory entry");
                })
                .ok()
        })
        .filter(|entry| entry.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
        .filter(|path| has_extension(path, extensions))
        .collect()
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            extensions
                .iter()
                .any(|expected| ext.eq_ignore_ascii_case(expected))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_bat::FixtureDir;

    #[test]
    fn discovers_nested_files_sorted_by_path() {
        let dir = FixtureDir::new();
        dir.write("2024-01-02/b.json", "[]");
        dir.write("2024-01-01/z.JSON", "[]");
        dir.write("2024-01-01/a.json", "[]");
        dir.write("2024-01-01/notes.txt", "");

        let files: Vec<_> = discover_files(dir.path(), &["json"])
            .into_iter()
            .map(|path| path.strip_prefix(dir.path()).unwrap().to_owned())
            .collect();

        let expected: Vec<PathBuf> = ["2024-01-01/a.json", "2024-01-01/z.JSON", "2024-01-02/b.json"]
            .into_iter()
            .map(PathBuf::from)
            .collect();

        assert_eq!(files, expected);
    }

    #[test]
    fn missing_root_is_empty() {
        let dir = FixtureDir::new();
        assert!(discover_files(&dir.join("nope"), &["json"]).is_empty());
    }
}
