//! On-disk cache of per-file summaries.
//!
//! The analyzer runs per file (typically on save) while the graph is built
//! per project. Each analyzed file is kept as its own JSON document under
//! `<workspace>/.lsp-analysis/files/`, named by a hash of its path, so a
//! full project summary can be reassembled at any time.

use crate::error::{Result, SummaryError};
use crate::summary::{file_from_value, FileSummary, ParsedSummary, ProjectSummary};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Current cache document version.
pub const SCHEMA_VERSION: u32 = 1;

/// A cached file summary with its metadata envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedSummary {
    pub schema_version: u32,
    pub original_path: String,
    /// RFC 3339 timestamp of the analysis.
    pub analyzed_at: String,
    pub data: Value,
}

/// A directory of cached file summaries.
#[derive(Debug, Clone)]
pub struct SummaryCache {
    root: PathBuf,
}

impl SummaryCache {
    /// Opens a cache rooted at `root`. The directory is created lazily.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the cache entry for a source file.
    pub fn entry_path(&self, original_path: &str) -> PathBuf {
        let digest = Sha256::digest(original_path.as_bytes());
        let name: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
        self.root.join(format!("{}.json", name))
    }

    /// Writes a file summary, replacing any previous entry for the same path.
    ///
    /// The document is written to a temporary file and renamed into place so
    /// a concurrent reader never sees a partial entry.
    pub fn store(&self, file: &FileSummary) -> Result<PathBuf> {
        if file.file_name.trim().is_empty() {
            return Err(SummaryError::malformed("<unnamed>", "missing file_name"));
        }
        fs::create_dir_all(&self.root)?;

        let target = self.entry_path(&file.file_name);
        let doc = CachedSummary {
            schema_version: SCHEMA_VERSION,
            original_path: file.file_name.clone(),
            analyzed_at: chrono::Utc::now().to_rfc3339(),
            data: serde_json::to_value(file)?,
        };

        let tmp = target.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(&doc)?)?;
        fs::rename(&tmp, &target)?;

        debug!("Cached summary for {} at {}", file.file_name, target.display());
        Ok(target)
    }

    /// Removes the entry for a source file. Missing entries are not an error.
    pub fn remove(&self, original_path: &str) -> Result<bool> {
        let path = self.entry_path(original_path);
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Reassembles a project summary from every cached entry.
    ///
    /// Files are ordered by their original path so that the same cache
    /// contents always produce the same summary. Unreadable entries are
    /// reported in [`ParsedSummary::rejected`].
    pub fn load_project(&self) -> Result<ParsedSummary> {
        let mut parsed = ParsedSummary::default();
        if !self.root.exists() {
            return Ok(parsed);
        }

        let mut entries: Vec<(String, FileSummary)> = Vec::new();
        for entry in WalkDir::new(&self.root).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| SummaryError::Io(e.into()))?;
            let path = entry.path();
            if !is_cache_entry(path) {
                continue;
            }

            match read_entry(path) {
                Ok(pair) => entries.push(pair),
                Err(e) => {
                    warn!("Skipping cache entry {}: {}", path.display(), e);
                    parsed.rejected.push(e);
                }
            }
        }

        entries.sort_by(|a, b| a.0.cmp(&b.0));
        parsed.summary = ProjectSummary {
            files: entries.into_iter().map(|(_, file)| file).collect(),
        };
        Ok(parsed)
    }
}

/// Returns true for finished cache documents (not temp files).
pub fn is_cache_entry(path: &Path) -> bool {
    path.is_file() && path.extension().and_then(|e| e.to_str()) == Some("json")
}

fn read_entry(path: &Path) -> Result<(String, FileSummary)> {
    let bytes = fs::read(path)?;
    let doc: CachedSummary = serde_json::from_slice(&bytes)
        .map_err(|e| SummaryError::malformed(path.display().to_string(), e.to_string()))?;

    if doc.schema_version != SCHEMA_VERSION {
        return Err(SummaryError::malformed(
            doc.original_path,
            format!("unsupported schema version {}", doc.schema_version),
        ));
    }

    let mut file = file_from_value(doc.data, 0)
        .map_err(|e| SummaryError::malformed(doc.original_path.clone(), e.to_string()))?;
    if file.file_name.is_empty() {
        file.file_name = doc.original_path.clone();
    }
    Ok((doc.original_path, file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summary::FunctionDecl;
    use tempfile::tempdir;

    #[test]
    fn test_store_and_load() {
        let dir = tempdir().unwrap();
        let cache = SummaryCache::new(dir.path().join("files"));

        cache
            .store(&FileSummary::new("z.py").with_function(FunctionDecl::new("last")))
            .unwrap();
        cache
            .store(&FileSummary::new("a.py").with_function(FunctionDecl::new("first")))
            .unwrap();

        let parsed = cache.load_project().unwrap();
        assert!(parsed.rejected.is_empty());
        let names: Vec<_> = parsed.summary.files.iter().map(|f| f.file_name.as_str()).collect();
        assert_eq!(names, vec!["a.py", "z.py"]);
    }

    #[test]
    fn test_store_replaces_entry() {
        let dir = tempdir().unwrap();
        let cache = SummaryCache::new(dir.path());

        cache.store(&FileSummary::new("a.py")).unwrap();
        cache
            .store(&FileSummary::new("a.py").with_function(FunctionDecl::new("f")))
            .unwrap();

        let parsed = cache.load_project().unwrap();
        assert_eq!(parsed.summary.files.len(), 1);
        assert_eq!(parsed.summary.files[0].functions.len(), 1);

        assert!(cache.remove("a.py").unwrap());
        assert!(!cache.remove("a.py").unwrap());
        assert!(cache.load_project().unwrap().summary.files.is_empty());
    }

    #[test]
    fn test_corrupt_entry_is_rejected() {
        let dir = tempdir().unwrap();
        let cache = SummaryCache::new(dir.path());
        cache.store(&FileSummary::new("a.py")).unwrap();
        fs::write(dir.path().join("junk.json"), "{ not json").unwrap();
        fs::write(dir.path().join("ignored.json.tmp"), "partial").unwrap();

        let parsed = cache.load_project().unwrap();
        assert_eq!(parsed.summary.files.len(), 1);
        assert_eq!(parsed.rejected.len(), 1);
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let dir = tempdir().unwrap();
        let cache = SummaryCache::new(dir.path().join("nope"));
        let parsed = cache.load_project().unwrap();
        assert!(parsed.summary.files.is_empty());
    }
}
