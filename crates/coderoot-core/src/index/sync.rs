//! Change detection between indexing runs
//!
//! The orchestrator talks to a [`ChangeDetector`] so incremental re-index
//! strategies can be swapped. The default implementation keeps a content
//! hash per file and reports anything added or modified since the last
//! baseline.

use crate::error::Result;
use crate::index::scanner::{scan_files, ScanOptions};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Detects which files changed since the last indexing run
#[async_trait]
pub trait ChangeDetector: Send + Sync {
    /// Record the current baseline for a root
    async fn initialize(&self, root: &Path) -> Result<()>;

    /// Relative paths added or modified since the baseline. Also advances
    /// the baseline to the current content.
    async fn changed_files(&self, root: &Path) -> Result<Vec<String>>;
}

/// Content-hash change detector
#[derive(Default)]
pub struct FileHashDetector {
    // root -> relative path -> content hash
    baselines: Mutex<HashMap<PathBuf, HashMap<String, String>>>,
}

impl FileHashDetector {
    pub fn new() -> Self {
        Self::default()
    }

    fn snapshot(root: &Path) -> Result<HashMap<String, String>> {
        let mut hashes = HashMap::new();
        for file in scan_files(root, &ScanOptions::default())? {
            let bytes = std::fs::read(&file.path)?;
            let digest = Sha256::digest(&bytes);
            hashes.insert(file.relative_path, format!("{:x}", digest));
        }
        Ok(hashes)
    }
}

#[async_trait]
impl ChangeDetector for FileHashDetector {
    async fn initialize(&self, root: &Path) -> Result<()> {
        let current = Self::snapshot(root)?;
        self.baselines
            .lock()
            .unwrap()
            .insert(root.to_path_buf(), current);
        Ok(())
    }

    async fn changed_files(&self, root: &Path) -> Result<Vec<String>> {
        let current = Self::snapshot(root)?;
        let mut baselines = self.baselines.lock().unwrap();
        let baseline = baselines.entry(root.to_path_buf()).or_default();

        let mut changed: Vec<String> = current
            .iter()
            .filter(|(path, hash)| baseline.get(*path) != Some(*hash))
            .map(|(path, _)| path.clone())
            .collect();
        changed.sort();

        *baseline = current;
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[tokio::test]
    async fn test_no_changes_after_initialize() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.rs"), "fn a() {}").unwrap();

        let detector = FileHashDetector::new();
        detector.initialize(dir.path()).await.unwrap();
        let changed = detector.changed_files(dir.path()).await.unwrap();
        assert!(changed.is_empty());
    }

    #[tokio::test]
    async fn test_added_and_modified_files_reported() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.rs"), "fn a() {}").unwrap();
        fs::write(dir.path().join("b.rs"), "fn b() {}").unwrap();

        let detector = FileHashDetector::new();
        detector.initialize(dir.path()).await.unwrap();

        fs::write(dir.path().join("a.rs"), "fn a() { todo!() }").unwrap();
        fs::write(dir.path().join("c.rs"), "fn c() {}").unwrap();

        let changed = detector.changed_files(dir.path()).await.unwrap();
        assert_eq!(changed, vec!["a.rs".to_string(), "c.rs".to_string()]);

        // Baseline advanced, nothing further to report.
        let changed = detector.changed_files(dir.path()).await.unwrap();
        assert!(changed.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_root_reports_everything() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.rs"), "fn a() {}").unwrap();

        let detector = FileHashDetector::new();
        let changed = detector.changed_files(dir.path()).await.unwrap();
        assert_eq!(changed, vec!["a.rs".to_string()]);
    }
}
