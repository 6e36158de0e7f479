//! File scanning for indexing

use crate::error::Result;
use glob::Pattern;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Directories to exclude from scanning
const EXCLUDE_DIRS: &[&str] = &[
    "node_modules",
    ".git",
    ".cache",
    "vendor",
    "dist",
    "build",
    "out",
    "__pycache__",
    ".venv",
    "venv",
    "target",
];

/// Extensions indexed by default
const DEFAULT_EXTENSIONS: &[&str] = &[
    "rs", "py", "js", "jsx", "mjs", "cjs", "ts", "tsx", "go", "java", "c", "h", "cc", "cpp",
    "hpp", "rb", "php", "swift", "kt", "scala", "md",
];

/// Scan result
#[derive(Debug, Clone)]
pub struct ScanResult {
    pub path: PathBuf,
    pub relative_path: String,
}

/// Scan options
#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub extensions: Vec<String>,
    pub ignore_patterns: Vec<String>,
    pub follow_symlinks: bool,
    pub exclude_dirs: Vec<String>,
    pub exclude_hidden: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            extensions: DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            ignore_patterns: Vec::new(),
            follow_symlinks: true,
            exclude_dirs: EXCLUDE_DIRS.iter().map(|s| s.to_string()).collect(),
            exclude_hidden: true,
        }
    }
}

impl ScanOptions {
    /// Add extra extensions on top of the defaults, without the leading dot
    pub fn with_extra_extensions(mut self, extra: &[String]) -> Self {
        for ext in extra {
            let ext = ext.trim_start_matches('.').to_lowercase();
            if !ext.is_empty() && !self.extensions.contains(&ext) {
                self.extensions.push(ext);
            }
        }
        self
    }

    /// Add glob patterns matched against the relative path; matches are skipped
    pub fn with_ignore_patterns(mut self, patterns: &[String]) -> Self {
        self.ignore_patterns.extend(patterns.iter().cloned());
        self
    }
}

/// Scan a directory for indexable files
pub fn scan_files(root: &Path, options: &ScanOptions) -> Result<Vec<ScanResult>> {
    let ignore: Vec<Pattern> = options
        .ignore_patterns
        .iter()
        .map(|p| Pattern::new(p))
        .collect::<std::result::Result<_, _>>()?;
    let mut results = Vec::new();

    let walker = WalkDir::new(root)
        .follow_links(options.follow_symlinks)
        .into_iter()
        .filter_entry(|e| !should_skip(e, options));

    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        if !has_allowed_extension(path, &options.extensions) {
            continue;
        }

        let relative = path
            .strip_prefix(root)
            .map(|p| p.to_string_lossy().to_string())
            .unwrap_or_else(|_| path.to_string_lossy().to_string());

        if ignore.iter().any(|p| p.matches(&relative)) {
            continue;
        }

        results.push(ScanResult {
            path: path.to_path_buf(),
            relative_path: relative,
        });
    }

    results.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    Ok(results)
}

fn has_allowed_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let e = e.to_lowercase();
            extensions.iter().any(|allowed| *allowed == e)
        })
        .unwrap_or(false)
}

fn should_skip(entry: &DirEntry, options: &ScanOptions) -> bool {
    let name = entry.file_name().to_string_lossy();

    if options.exclude_hidden && name.starts_with('.') && entry.depth() > 0 {
        return true;
    }

    if entry.file_type().is_dir() && options.exclude_dirs.iter().any(|d| name == *d) {
        return true;
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_default_options() {
        let opts = ScanOptions::default();
        assert!(opts.extensions.iter().any(|e| e == "rs"));
        assert!(opts.exclude_hidden);
    }

    #[test]
    fn test_scan_filters_extensions_and_dirs() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("main.rs"), "fn main() {}").unwrap();
        fs::write(dir.path().join("notes.txt"), "not code").unwrap();
        fs::create_dir_all(dir.path().join("node_modules/pkg")).unwrap();
        fs::write(dir.path().join("node_modules/pkg/index.js"), "x").unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/lib.rs"), "pub fn f() {}").unwrap();

        let results = scan_files(dir.path(), &ScanOptions::default()).unwrap();
        let paths: Vec<&str> = results.iter().map(|r| r.relative_path.as_str()).collect();
        assert_eq!(paths, vec!["main.rs", "src/lib.rs"]);
    }

    #[test]
    fn test_extra_extensions_and_ignore_patterns() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("schema.sql"), "select 1;").unwrap();
        fs::write(dir.path().join("gen.rs"), "fn g() {}").unwrap();
        fs::write(dir.path().join("lib.rs"), "fn l() {}").unwrap();

        let opts = ScanOptions::default()
            .with_extra_extensions(&[".sql".to_string()])
            .with_ignore_patterns(&["gen.*".to_string()]);
        let results = scan_files(dir.path(), &opts).unwrap();
        let paths: Vec<&str> = results.iter().map(|r| r.relative_path.as_str()).collect();
        assert_eq!(paths, vec!["lib.rs", "schema.sql"]);
    }

    #[test]
    fn test_hidden_files_skipped() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(".hidden.rs"), "fn h() {}").unwrap();
        fs::write(dir.path().join("seen.rs"), "fn s() {}").unwrap();

        let results = scan_files(dir.path(), &ScanOptions::default()).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].relative_path, "seen.rs");
    }
}
