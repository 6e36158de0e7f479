//! Indexing orchestrator
//!
//! Owns the lifecycle of codebase indexing jobs: validates the request,
//! acknowledges immediately, and runs the scan/chunk/embed/insert pipeline
//! in a background task. Background failures land in the state registry
//! as `indexfailed`, never as a panic or a lost error.

use crate::chunk::{compute_chunk_id, refiner, AstChunker, Chunk};
use crate::embed::EmbeddingProvider;
use crate::error::{CoderootError, Result};
use crate::index::scanner::{scan_files, ScanOptions};
use crate::index::state::{CodebaseState, IndexStats, IndexStatus, StateRegistry, StatusNote};
use crate::index::sync::{ChangeDetector, FileHashDetector};
use crate::search::{HybridOptions, SearchResult};
use crate::store::{Document, SqliteStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Hard ceiling on chunks stored per codebase
pub const MAX_TOTAL_CHUNKS: usize = 450_000;

/// Chunks embedded per provider call
pub const EMBED_BATCH_SIZE: usize = 32;

/// Options for starting an indexing run
#[derive(Debug, Clone, Default)]
pub struct IndexOptions {
    /// Re-index a codebase that is already indexed
    pub force: bool,
    /// Extra file extensions beyond the defaults
    pub extensions: Vec<String>,
    /// Glob patterns (relative paths) to skip
    pub ignore_patterns: Vec<String>,
}

/// Progress report delivered per embed batch. `current`/`total` count
/// files; `percentage` interpolates batch completion within the current
/// file's span.
#[derive(Debug, Clone)]
pub struct IndexProgress {
    pub phase: &'static str,
    pub current: usize,
    pub total: usize,
    pub percentage: f32,
}

pub type ProgressCallback = Arc<dyn Fn(IndexProgress) + Send + Sync>;

/// Outcome of a start request. Hitting the collection capacity limit is a
/// report, not an error: there is nothing retryable about it.
#[derive(Debug, Clone)]
pub enum StartOutcome {
    Started { collection: String },
    CollectionLimit { message: String },
}

/// Query parameters for searching one or all codebases
#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub limit: usize,
    /// Restrict results to these file extensions (no leading dot)
    pub extensions: Vec<String>,
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            limit: 10,
            extensions: Vec::new(),
        }
    }
}

/// Search results grouped per codebase
#[derive(Debug, Clone, serde::Serialize)]
pub struct CodebaseResults {
    pub path: PathBuf,
    pub results: Vec<SearchResult>,
}

/// Orchestrates indexing and search across codebases
#[derive(Clone)]
pub struct Indexer {
    store: Arc<SqliteStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    registry: Arc<StateRegistry>,
    detector: Arc<dyn ChangeDetector>,
    chunker: Arc<AstChunker>,
    chunk_ceiling: usize,
}

impl Indexer {
    pub fn new(
        store: Arc<SqliteStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        registry: Arc<StateRegistry>,
    ) -> Self {
        Self {
            store,
            embedder,
            registry,
            detector: Arc::new(FileHashDetector::new()),
            chunker: Arc::new(AstChunker::new()),
            chunk_ceiling: MAX_TOTAL_CHUNKS,
        }
    }

    pub fn with_change_detector(mut self, detector: Arc<dyn ChangeDetector>) -> Self {
        self.detector = detector;
        self
    }

    /// Override the per-codebase chunk ceiling
    pub fn with_chunk_ceiling(mut self, ceiling: usize) -> Self {
        self.chunk_ceiling = ceiling;
        self
    }

    /// Collection name for a canonical codebase path
    pub fn collection_name(path: &Path) -> String {
        let digest = blake3::hash(path.to_string_lossy().as_bytes());
        format!("code_{}", &digest.to_hex().as_str()[..16])
    }

    /// Start indexing a codebase. Returns as soon as the job is accepted;
    /// progress and completion are observable through [`Indexer::status`].
    pub async fn start(
        &self,
        path: &Path,
        options: IndexOptions,
        progress: Option<ProgressCallback>,
    ) -> Result<StartOutcome> {
        let canonical = path.canonicalize().map_err(|_| {
            CoderootError::Validation(format!("path does not exist: {}", path.display()))
        })?;
        if !canonical.is_dir() {
            return Err(CoderootError::Validation(format!(
                "not a directory: {}",
                canonical.display()
            )));
        }

        let collection = Self::collection_name(&canonical);
        let state = self.registry.get(&canonical);
        match state.status {
            IndexStatus::Indexing => {
                return Err(CoderootError::Validation(format!(
                    "{} is already being indexed",
                    canonical.display()
                )));
            }
            IndexStatus::Indexed if !options.force => {
                return Err(CoderootError::Validation(format!(
                    "{} is already indexed; pass force to re-index",
                    canonical.display()
                )));
            }
            IndexStatus::Indexed => {
                // Force re-index starts from a clean slate.
                self.store.drop_collection(&collection)?;
                self.registry.clear(&canonical);
            }
            _ => {}
        }

        // Capacity is checked before any resource is created, so a full
        // store rejects the request without side effects.
        if !self.store.has_collection(&collection)? {
            if let Err(e) = self.store.can_create_collection() {
                if e.is_collection_limit() {
                    info!(path = %canonical.display(), "collection capacity reached");
                    return Ok(StartOutcome::CollectionLimit {
                        message: e.to_string(),
                    });
                }
                return Err(e);
            }
        }

        let generation = self.registry.begin_indexing(&canonical)?;
        if let Err(e) = self
            .store
            .create_collection(&collection, self.embedder.dimension(), None)
        {
            self.registry.fail(&canonical, generation, &e.to_string());
            return Err(e);
        }

        info!(path = %canonical.display(), collection = %collection, "indexing started");
        let job = self.clone();
        let root = canonical.clone();
        let job_collection = collection.clone();
        tokio::spawn(async move {
            if let Err(e) = job
                .run_job(&root, &job_collection, generation, &options, progress)
                .await
            {
                error!(path = %root.display(), error = %e, "indexing failed");
                job.registry.fail(&root, generation, &e.to_string());
            }
        });

        Ok(StartOutcome::Started { collection })
    }

    async fn run_job(
        &self,
        root: &Path,
        collection: &str,
        generation: u64,
        options: &IndexOptions,
        progress: Option<ProgressCallback>,
    ) -> Result<()> {
        let scan_options = ScanOptions::default()
            .with_extra_extensions(&options.extensions)
            .with_ignore_patterns(&options.ignore_patterns);
        let files = scan_files(root, &scan_options)?;
        let total = files.len();
        debug!(path = %root.display(), files = total, "scan complete");

        // Baseline is recorded up front so change detection covers edits
        // made while this run is in flight.
        if let Err(e) = self.detector.initialize(root).await {
            warn!(path = %root.display(), error = %e, "failed to record change baseline");
        }

        let mut indexed_files = 0usize;
        let mut total_chunks = 0usize;
        let mut status_note = StatusNote::Ok;

        'files: for (index, file) in files.iter().enumerate() {
            let source = match std::fs::read_to_string(&file.path) {
                Ok(source) => source,
                Err(e) => {
                    warn!(file = %file.relative_path, error = %e, "skipping unreadable file");
                    continue;
                }
            };
            if source.trim().is_empty() {
                continue;
            }

            let language = file
                .path
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or("")
                .to_lowercase();
            let chunks = self
                .chunker
                .split(&source, &language, Some(&file.relative_path))?;
            let mut chunks = refiner::refine(
                chunks,
                refiner::CHUNK_MAX_CHARS,
                refiner::CHUNK_OVERLAP_CHARS,
            );

            let remaining = self.chunk_ceiling - total_chunks;
            let truncated = chunks.len() > remaining;
            if truncated {
                chunks.truncate(remaining);
                status_note = StatusNote::LimitReached;
            }

            self.insert_chunks(
                collection,
                &file.relative_path,
                &chunks,
                |batches_done, batch_total| {
                    let done = index as f32 + batches_done as f32 / batch_total as f32;
                    let percentage = (done / total as f32) * 100.0;
                    self.registry.update_progress(root, generation, percentage);
                    if let Some(callback) = &progress {
                        callback(IndexProgress {
                            phase: "indexing",
                            current: index + 1,
                            total,
                            percentage,
                        });
                    }
                },
            )
            .await?;
            total_chunks += chunks.len();
            indexed_files += 1;

            if truncated {
                warn!(path = %root.display(), limit = self.chunk_ceiling, "chunk limit reached");
                break 'files;
            }
        }

        let stats = IndexStats {
            indexed_files,
            total_chunks,
            status_note: Some(status_note),
        };
        info!(
            path = %root.display(),
            files = stats.indexed_files,
            chunks = stats.total_chunks,
            "indexing complete"
        );
        self.registry.complete(root, generation, stats);
        Ok(())
    }

    /// Embed and insert a file's chunks, reporting after every batch so
    /// large files surface progress before they finish.
    async fn insert_chunks(
        &self,
        collection: &str,
        relative_path: &str,
        chunks: &[Chunk],
        mut on_batch: impl FnMut(usize, usize),
    ) -> Result<()> {
        let file_extension = Path::new(relative_path)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        let batch_total = chunks.len().div_ceil(EMBED_BATCH_SIZE).max(1);
        for (batch_index, batch) in chunks.chunks(EMBED_BATCH_SIZE).enumerate() {
            let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
            let embeddings = self.embedder.embed_batch(&texts).await?;
            if embeddings.len() != batch.len() {
                return Err(CoderootError::Embedding(format!(
                    "expected {} embeddings, got {}",
                    batch.len(),
                    embeddings.len()
                )));
            }

            let documents: Vec<Document> = batch
                .iter()
                .zip(embeddings)
                .map(|(chunk, embedding)| {
                    let mut metadata = serde_json::Map::new();
                    metadata.insert(
                        "language".to_string(),
                        serde_json::Value::String(chunk.language.clone()),
                    );
                    Document {
                        id: compute_chunk_id(
                            relative_path,
                            chunk.start_line,
                            chunk.end_line,
                            &chunk.content,
                        ),
                        vector: embedding.vector,
                        content: chunk.content.clone(),
                        relative_path: relative_path.to_string(),
                        start_line: chunk.start_line,
                        end_line: chunk.end_line,
                        file_extension: file_extension.clone(),
                        is_definition: chunk.is_definition,
                        metadata,
                    }
                })
                .collect();
            self.store.insert(collection, &documents)?;
            on_batch(batch_index + 1, batch_total);
        }
        Ok(())
    }

    /// Current state for a codebase path
    pub fn status(&self, path: &Path) -> CodebaseState {
        let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        self.registry.get(&canonical)
    }

    /// States for every known codebase
    pub fn all_statuses(&self) -> Vec<CodebaseState> {
        self.registry.all()
    }

    /// Hybrid search over one indexed codebase
    pub async fn search(
        &self,
        path: &Path,
        query: &str,
        options: &SearchQuery,
    ) -> Result<Vec<SearchResult>> {
        let canonical = path.canonicalize().map_err(|_| {
            CoderootError::Validation(format!("path does not exist: {}", path.display()))
        })?;
        let state = self.registry.get(&canonical);
        if matches!(state.status, IndexStatus::NotFound) {
            return Err(CoderootError::Validation(format!(
                "{} is not indexed",
                canonical.display()
            )));
        }

        let collection = Self::collection_name(&canonical);
        let embedding = self.embedder.embed(query).await?;
        let hybrid = HybridOptions {
            limit: options.limit,
            filter: extension_filter(&options.extensions),
        };
        self.store
            .hybrid_search(&collection, &embedding.vector, Some(query), &hybrid)
    }

    /// Hybrid search across all indexed codebases. A failure in one
    /// codebase is logged and skipped rather than failing the whole call.
    pub async fn search_all(
        &self,
        query: &str,
        options: &SearchQuery,
    ) -> Result<Vec<CodebaseResults>> {
        let mut grouped = Vec::new();
        for state in self.registry.all() {
            if !matches!(state.status, IndexStatus::Indexed | IndexStatus::Indexing) {
                continue;
            }
            match self.search(&state.path, query, options).await {
                Ok(results) if !results.is_empty() => grouped.push(CodebaseResults {
                    path: state.path,
                    results,
                }),
                Ok(_) => {}
                Err(e) => {
                    warn!(path = %state.path.display(), error = %e, "search failed for codebase");
                }
            }
        }
        Ok(grouped)
    }

    /// Remove a codebase's collection and state
    pub async fn clear(&self, path: &Path) -> Result<bool> {
        let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        let collection = Self::collection_name(&canonical);
        let dropped = self.store.drop_collection(&collection)?;
        self.registry.clear(&canonical);
        info!(path = %canonical.display(), dropped, "index cleared");
        Ok(dropped)
    }
}

/// Build a `fileExtension in [..]` predicate, or `None` for no filter
fn extension_filter(extensions: &[String]) -> Option<String> {
    if extensions.is_empty() {
        return None;
    }
    let quoted: Vec<String> = extensions
        .iter()
        .map(|e| format!("'{}'", e.trim_start_matches('.').to_lowercase()))
        .collect();
    Some(format!("fileExtension in [{}]", quoted.join(", ")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_name_stable_and_prefixed() {
        let a = Indexer::collection_name(Path::new("/repo/a"));
        let b = Indexer::collection_name(Path::new("/repo/b"));
        assert!(a.starts_with("code_"));
        assert_ne!(a, b);
        assert_eq!(a, Indexer::collection_name(Path::new("/repo/a")));
    }

    #[test]
    fn test_extension_filter_rendering() {
        assert_eq!(extension_filter(&[]), None);
        let filter = extension_filter(&[".RS".to_string(), "go".to_string()]);
        assert_eq!(filter.as_deref(), Some("fileExtension in ['rs', 'go']"));
    }
}
