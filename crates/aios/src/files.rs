//! File adapters - the large-file index, live filename search, open /
//! delete / create operations, size formatting and size parsing.

use crate::error::ActionError;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{info, warn};
use walkdir::WalkDir;

/// Search results are capped so a greedy keyword cannot flood the console.
const SEARCH_CAP: usize = 10;

/// One indexed large file.
#[derive(Debug, Clone, PartialEq)]
pub struct FileEntry {
    pub path: String,
    pub size_bytes: u64,
    pub human_size: String,
}

/// Point-in-time cache of files above the size floor, sorted descending by
/// size. Not live: a query against an index that was never populated
/// triggers one implicit rescan.
pub struct FileIndex {
    root: PathBuf,
    floor_bytes: u64,
    entries: Vec<FileEntry>,
    scanned: bool,
}

impl FileIndex {
    pub fn new(root: PathBuf, floor_mb: u64) -> Self {
        Self {
            root,
            floor_bytes: floor_mb * 1024 * 1024,
            entries: Vec::new(),
            scanned: false,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Full recursive scan, replacing the entire index. Permission-denied
    /// subtrees are skipped, not fatal. Returns the number of entries.
    pub fn scan(&mut self) -> usize {
        info!("Scanning {} for large files", self.root.display());
        let mut entries = Vec::new();
        for entry in WalkDir::new(&self.root).into_iter().filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(metadata) = entry.metadata() else {
                continue;
            };
            let size = metadata.len();
            if size > self.floor_bytes {
                entries.push(FileEntry {
                    path: entry.path().display().to_string(),
                    size_bytes: size,
                    human_size: format_size(size),
                });
            }
        }
        entries.sort_by(|a, b| b.size_bytes.cmp(&a.size_bytes));
        let count = entries.len();
        self.entries = entries;
        self.scanned = true;
        info!("Index rebuilt: {} large files", count);
        count
    }

    /// Entries at or above the threshold, capped at `limit` (-1 means
    /// unlimited). Pure cache read.
    pub fn large_files(&self, threshold_mb: f64, limit: i64) -> Vec<FileEntry> {
        let threshold_bytes = (threshold_mb * 1024.0 * 1024.0) as u64;
        let mut result = Vec::new();
        for entry in &self.entries {
            if entry.size_bytes >= threshold_bytes {
                result.push(entry.clone());
                if limit != -1 && result.len() as i64 >= limit {
                    break;
                }
            }
        }
        result
    }

    /// Query with the self-healing retry: an empty result from a
    /// never-populated index triggers exactly one scan.
    pub fn query(&mut self, threshold_mb: f64, limit: i64) -> Vec<FileEntry> {
        let hits = self.large_files(threshold_mb, limit);
        if hits.is_empty() && !self.scanned {
            self.scan();
            return self.large_files(threshold_mb, limit);
        }
        hits
    }
}

/// Human size with two decimals, 1024 steps.
pub fn format_size(bytes: u64) -> String {
    const SUFFIXES: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut value = bytes as f64;
    let mut i = 0;
    while value > 1024.0 && i < SUFFIXES.len() - 1 {
        value /= 1024.0;
        i += 1;
    }
    format!("{:.2} {}", value, SUFFIXES[i])
}

/// Pull a size in MB out of free-form text: "500M" -> 500, "1.5G" -> 1536.
/// The unit must follow the number (spaces allowed); a bare number means
/// megabytes. None when the text has no number at all.
pub fn parse_size_mb(input: &str) -> Option<f64> {
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;
    while i < chars.len() && !chars[i].is_ascii_digit() {
        i += 1;
    }
    if i == chars.len() {
        return None;
    }

    let mut number = String::new();
    while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
        number.push(chars[i]);
        i += 1;
    }
    let value: f64 = number.parse().ok()?;

    while i < chars.len() && chars[i] == ' ' {
        i += 1;
    }
    match chars.get(i).map(|c| c.to_ascii_uppercase()) {
        Some('G') => Some(value * 1024.0),
        _ => Some(value),
    }
}

/// Append ".txt" when the name carries no such suffix. Returns the final
/// name and whether it was changed.
pub fn ensure_txt_extension(name: &str) -> (String, bool) {
    if name.to_lowercase().ends_with(".txt") {
        (name.to_string(), false)
    } else {
        (format!("{name}.txt"), true)
    }
}

/// File operations under the scan root.
pub trait FileOps: Send + Sync {
    /// Case-insensitive filename substring search, capped at 10 hits.
    fn search(&self, keyword: &str) -> Vec<String>;
    /// Open with the desktop handler, detached.
    fn open(&self, path: &str) -> Result<(), ActionError>;
    /// Delete a regular file.
    fn delete(&self, path: &str) -> Result<(), ActionError>;
    /// Create a .txt file with the given content.
    fn create_txt(&self, name: &str, content: &str) -> Result<(), ActionError>;
}

/// FileOps over the real filesystem, rooted at the configured scan root.
pub struct DiskFiles {
    root: PathBuf,
}

impl DiskFiles {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }
}

impl FileOps for DiskFiles {
    fn search(&self, keyword: &str) -> Vec<String> {
        let needle = keyword.to_lowercase();
        let mut results = Vec::new();
        for entry in WalkDir::new(&self.root).into_iter().filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_lowercase();
            if name.contains(&needle) {
                results.push(entry.path().display().to_string());
                if results.len() >= SEARCH_CAP {
                    break;
                }
            }
        }
        results
    }

    fn open(&self, path: &str) -> Result<(), ActionError> {
        if !Path::new(path).exists() {
            return Err(ActionError::NotFound(path.to_string()));
        }
        Command::new("xdg-open")
            .arg(path)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                warn!("xdg-open failed for {}: {}", path, e);
                ActionError::Io(e)
            })?;
        Ok(())
    }

    fn delete(&self, path: &str) -> Result<(), ActionError> {
        let target = Path::new(path);
        if !target.is_file() {
            return Err(ActionError::NotFound(path.to_string()));
        }
        fs::remove_file(target).map_err(|e| {
            if e.kind() == std::io::ErrorKind::PermissionDenied {
                ActionError::Permission(format!("cannot delete {path}"))
            } else {
                ActionError::Io(e)
            }
        })
    }

    fn create_txt(&self, name: &str, content: &str) -> Result<(), ActionError> {
        if !name.to_lowercase().ends_with(".txt") {
            return Err(ActionError::Io(std::io::Error::other(
                "only .txt files are supported",
            )));
        }
        // Relative names land in the scan root; absolute paths are taken
        // as given.
        let path = if Path::new(name).is_absolute() {
            PathBuf::from(name)
        } else {
            self.root.join(name)
        };
        fs::write(&path, content).map_err(|e| {
            if e.kind() == std::io::ErrorKind::PermissionDenied {
                ActionError::Permission(format!("cannot create {}", path.display()))
            } else {
                ActionError::Io(e)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::tempdir;

    const MB: u64 = 1024 * 1024;

    fn file_of_size(dir: &Path, name: &str, size: u64) {
        let file = File::create(dir.join(name)).unwrap();
        file.set_len(size).unwrap();
    }

    #[test]
    fn scan_indexes_only_files_above_the_floor() {
        let dir = tempdir().unwrap();
        file_of_size(dir.path(), "small.bin", 5 * MB);
        file_of_size(dir.path(), "medium.bin", 15 * MB);
        file_of_size(dir.path(), "huge.bin", 200 * MB);

        let mut index = FileIndex::new(dir.path().to_path_buf(), 10);
        assert_eq!(index.scan(), 2);

        let all = index.large_files(0.0, -1);
        assert_eq!(all.len(), 2);
        // Sorted descending by size.
        assert!(all[0].path.ends_with("huge.bin"));
        assert_eq!(all[0].size_bytes, 200 * MB);
        assert!(all[1].path.ends_with("medium.bin"));
    }

    #[test]
    fn query_filters_by_threshold_and_limit() {
        let dir = tempdir().unwrap();
        file_of_size(dir.path(), "medium.bin", 15 * MB);
        file_of_size(dir.path(), "huge.bin", 200 * MB);

        let mut index = FileIndex::new(dir.path().to_path_buf(), 10);
        index.scan();

        let over_100 = index.query(100.0, -1);
        assert_eq!(over_100.len(), 1);
        assert!(over_100[0].path.ends_with("huge.bin"));

        let capped = index.query(1.0, 1);
        assert_eq!(capped.len(), 1);
    }

    #[test]
    fn unpopulated_index_self_heals_once() {
        let dir = tempdir().unwrap();
        file_of_size(dir.path(), "huge.bin", 200 * MB);

        let mut index = FileIndex::new(dir.path().to_path_buf(), 10);
        // Never scanned: the query triggers the implicit scan.
        let hits = index.query(100.0, -1);
        assert_eq!(hits.len(), 1);

        // Populated but empty result: no second rescan loop.
        let none = index.query(100_000.0, -1);
        assert!(none.is_empty());
    }

    #[test]
    fn human_sizes() {
        assert_eq!(format_size(512), "512.00 B");
        assert_eq!(format_size(200 * MB), "200.00 MB");
        assert_eq!(format_size(3 * 1024 * MB), "3.00 GB");
    }

    #[test]
    fn size_parsing() {
        assert_eq!(parse_size_mb("files bigger than 800M"), Some(800.0));
        assert_eq!(parse_size_mb("anything over 1.5G please"), Some(1536.0));
        assert_eq!(parse_size_mb("larger than 2 G"), Some(2048.0));
        // Bare number means MB, even with a 'g' elsewhere in the line.
        assert_eq!(parse_size_mb("bigger than 500"), Some(500.0));
        assert_eq!(parse_size_mb("find big files"), None);
    }

    #[test]
    fn txt_extension_is_forced() {
        assert_eq!(ensure_txt_extension("notes"), ("notes.txt".to_string(), true));
        assert_eq!(
            ensure_txt_extension("notes.txt"),
            ("notes.txt".to_string(), false)
        );
        assert_eq!(
            ensure_txt_extension("REPORT.TXT"),
            ("REPORT.TXT".to_string(), false)
        );
    }

    #[test]
    fn search_finds_by_substring_case_insensitive() {
        let dir = tempdir().unwrap();
        File::create(dir.path().join("My-Thesis.pdf")).unwrap();
        File::create(dir.path().join("unrelated.log")).unwrap();

        let files = DiskFiles::new(dir.path().to_path_buf());
        let hits = files.search("thesis");
        assert_eq!(hits.len(), 1);
        assert!(hits[0].ends_with("My-Thesis.pdf"));
        assert!(files.search("nothing-here").is_empty());
    }

    #[test]
    fn create_and_delete_roundtrip() {
        let dir = tempdir().unwrap();
        let files = DiskFiles::new(dir.path().to_path_buf());

        files.create_txt("log.txt", "hello").unwrap();
        let path = dir.path().join("log.txt");
        assert_eq!(fs::read_to_string(&path).unwrap(), "hello");

        files.delete(&path.display().to_string()).unwrap();
        assert!(!path.exists());

        // Deleting again: the target is gone.
        assert!(matches!(
            files.delete(&path.display().to_string()),
            Err(ActionError::NotFound(_))
        ));
    }

    #[test]
    fn create_rejects_non_txt() {
        let dir = tempdir().unwrap();
        let files = DiskFiles::new(dir.path().to_path_buf());
        assert!(files.create_txt("payload.sh", "#!/bin/sh").is_err());
    }
}
