//! End-to-end indexing and search
//!
//! Drives the full pipeline with a deterministic embedder: scan a real
//! directory, chunk, embed, store, then search and assert on the state
//! machine around it.

use async_trait::async_trait;
use coderoot_core::{
    ChangeDetector, CoderootError, Embedding, EmbeddingProvider, IndexOptions, IndexStatus,
    Indexer, MemorySnapshotStore, SearchQuery, SnapshotStore, SqliteStore, StartOutcome,
    StateRegistry, StatusNote, MAX_COLLECTIONS,
};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const DIM: usize = 16;

/// Bag-of-words embedder: tokens hash into buckets, so texts sharing
/// words land near each other in cosine space. Deterministic, no network.
struct BagEmbedder;

fn bucket(token: &str) -> usize {
    let digest = blake3::hash(token.as_bytes());
    (digest.as_bytes()[0] as usize) % DIM
}

#[async_trait]
impl EmbeddingProvider for BagEmbedder {
    async fn embed(&self, text: &str) -> Result<Embedding, CoderootError> {
        let mut vector = vec![0.0f32; DIM];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            vector[bucket(&token.to_lowercase())] += 1.0;
        }
        Ok(Embedding::new(vector))
    }

    fn provider(&self) -> &str {
        "bag-of-words"
    }

    fn dimension(&self) -> usize {
        DIM
    }
}

fn indexer_with_store(store: Arc<SqliteStore>) -> Indexer {
    let snapshot: Arc<dyn SnapshotStore> = Arc::new(MemorySnapshotStore::default());
    let registry = Arc::new(StateRegistry::new(snapshot).unwrap());
    Indexer::new(store, Arc::new(BagEmbedder), registry)
}

fn indexer() -> Indexer {
    indexer_with_store(Arc::new(SqliteStore::open_in_memory().unwrap()))
}

async fn wait_until_terminal(indexer: &Indexer, path: &Path) -> IndexStatus {
    for _ in 0..200 {
        let status = indexer.status(path).status;
        if matches!(status, IndexStatus::Indexed | IndexStatus::IndexFailed) {
            return status;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    indexer.status(path).status
}

fn write_fixture(dir: &Path) {
    std::fs::write(
        dir.join("main.rs"),
        "fn parse_config(path: &str) -> Config {\n    Config::from_file(path)\n}\n",
    )
    .unwrap();
    std::fs::create_dir_all(dir.join("src")).unwrap();
    std::fs::write(
        dir.join("src/render.rs"),
        "fn render_template(name: &str) -> String {\n    templates::get(name).render()\n}\n",
    )
    .unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_index_then_search_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path());

    let indexer = indexer();
    let progress_log = Arc::new(Mutex::new(Vec::new()));
    let log = progress_log.clone();
    let outcome = indexer
        .start(
            dir.path(),
            IndexOptions::default(),
            Some(Arc::new(move |p| log.lock().unwrap().push(p.percentage))),
        )
        .await
        .unwrap();
    assert!(matches!(outcome, StartOutcome::Started { .. }));

    let status = wait_until_terminal(&indexer, dir.path()).await;
    assert_eq!(status, IndexStatus::Indexed);

    let state = indexer.status(dir.path());
    assert_eq!(state.progress_percentage, 100.0);
    assert_eq!(state.stats.indexed_files, 2);
    assert!(state.stats.total_chunks >= 2);
    assert_eq!(state.stats.status_note, Some(StatusNote::Ok));
    assert_eq!(
        progress_log.lock().unwrap().last().copied(),
        Some(100.0),
        "progress callback should reach 100"
    );

    let results = indexer
        .search(dir.path(), "parse config", &SearchQuery::default())
        .await
        .unwrap();
    assert!(!results.is_empty());
    let top = &results[0];
    assert_eq!(top.relative_path, "main.rs");
    assert_eq!(top.start_line, 1);
    assert_eq!(top.end_line, 3);
    assert!(top.content.contains("parse_config"));
    assert!(top.score > 0.0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_progress_reported_per_embed_batch() {
    let dir = tempfile::tempdir().unwrap();
    let mut source = String::new();
    for i in 0..40 {
        source.push_str(&format!("fn helper_{}() -> usize {{\n    {}\n}}\n\n", i, i));
    }
    std::fs::write(dir.path().join("helpers.rs"), source).unwrap();

    let indexer = indexer();
    let progress_log = Arc::new(Mutex::new(Vec::new()));
    let log = progress_log.clone();
    indexer
        .start(
            dir.path(),
            IndexOptions::default(),
            Some(Arc::new(move |p| log.lock().unwrap().push(p.percentage))),
        )
        .await
        .unwrap();
    assert_eq!(
        wait_until_terminal(&indexer, dir.path()).await,
        IndexStatus::Indexed
    );

    // 40 chunks in a single file spans two embed batches, so an
    // intermediate report arrives before the file finishes.
    let log = progress_log.lock().unwrap();
    assert!(log.len() >= 2);
    assert!(log[0] > 0.0 && log[0] < 100.0);
    assert_eq!(log.last().copied(), Some(100.0));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_collection_limit_reported_without_state_change() {
    let store = Arc::new(SqliteStore::open_in_memory().unwrap());
    for i in 0..MAX_COLLECTIONS {
        store
            .create_collection(&format!("repo{}", i), DIM, None)
            .unwrap();
    }
    let indexer = indexer_with_store(store);

    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path());
    let outcome = indexer
        .start(dir.path(), IndexOptions::default(), None)
        .await
        .unwrap();

    // A full store is an informational outcome, and the path's state is
    // untouched so nothing needs cleanup before a later retry.
    assert!(matches!(outcome, StartOutcome::CollectionLimit { .. }));
    assert_eq!(indexer.status(dir.path()).status, IndexStatus::NotFound);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_chunk_ceiling_marks_limit_reached() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path());

    let indexer = indexer().with_chunk_ceiling(1);
    indexer
        .start(dir.path(), IndexOptions::default(), None)
        .await
        .unwrap();
    assert_eq!(
        wait_until_terminal(&indexer, dir.path()).await,
        IndexStatus::Indexed
    );

    // Hitting the ceiling is successful-but-partial, not a failure.
    let state = indexer.status(dir.path());
    assert_eq!(state.stats.status_note, Some(StatusNote::LimitReached));
    assert_eq!(state.stats.total_chunks, 1);

    let results = indexer
        .search(dir.path(), "parse config", &SearchQuery::default())
        .await
        .unwrap();
    assert!(!results.is_empty());
}

struct RecordingDetector {
    initialized: Arc<AtomicBool>,
}

#[async_trait]
impl ChangeDetector for RecordingDetector {
    async fn initialize(&self, _root: &Path) -> Result<(), CoderootError> {
        self.initialized.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn changed_files(&self, _root: &Path) -> Result<Vec<String>, CoderootError> {
        Ok(Vec::new())
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_change_detector_initialized_before_first_insert() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path());

    let initialized = Arc::new(AtomicBool::new(false));
    let seen_uninitialized = Arc::new(AtomicBool::new(false));
    let indexer = indexer().with_change_detector(Arc::new(RecordingDetector {
        initialized: initialized.clone(),
    }));

    let init = initialized.clone();
    let violation = seen_uninitialized.clone();
    indexer
        .start(
            dir.path(),
            IndexOptions::default(),
            Some(Arc::new(move |_| {
                if !init.load(Ordering::SeqCst) {
                    violation.store(true, Ordering::SeqCst);
                }
            })),
        )
        .await
        .unwrap();
    assert_eq!(
        wait_until_terminal(&indexer, dir.path()).await,
        IndexStatus::Indexed
    );

    assert!(initialized.load(Ordering::SeqCst));
    assert!(!seen_uninitialized.load(Ordering::SeqCst));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_extension_filter_narrows_results() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path());
    std::fs::write(
        dir.path().join("parse.py"),
        "def parse_config(path):\n    return load(path)\n",
    )
    .unwrap();

    let indexer = indexer();
    indexer
        .start(dir.path(), IndexOptions::default(), None)
        .await
        .unwrap();
    assert_eq!(
        wait_until_terminal(&indexer, dir.path()).await,
        IndexStatus::Indexed
    );

    let query = SearchQuery {
        limit: 10,
        extensions: vec!["py".to_string()],
    };
    let results = indexer
        .search(dir.path(), "parse config", &query)
        .await
        .unwrap();
    assert!(!results.is_empty());
    assert!(results.iter().all(|r| r.file_extension == "py"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_reindex_requires_force() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path());

    let indexer = indexer();
    indexer
        .start(dir.path(), IndexOptions::default(), None)
        .await
        .unwrap();
    assert_eq!(
        wait_until_terminal(&indexer, dir.path()).await,
        IndexStatus::Indexed
    );

    let err = indexer
        .start(dir.path(), IndexOptions::default(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, CoderootError::Validation(_)));

    let outcome = indexer
        .start(
            dir.path(),
            IndexOptions {
                force: true,
                ..Default::default()
            },
            None,
        )
        .await
        .unwrap();
    assert!(matches!(outcome, StartOutcome::Started { .. }));
    assert_eq!(
        wait_until_terminal(&indexer, dir.path()).await,
        IndexStatus::Indexed
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_missing_path_rejected() {
    let indexer = indexer();
    let err = indexer
        .start(
            Path::new("/definitely/not/here"),
            IndexOptions::default(),
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CoderootError::Validation(_)));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_search_unindexed_path_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let indexer = indexer();
    let err = indexer
        .search(dir.path(), "anything", &SearchQuery::default())
        .await
        .unwrap_err();
    assert!(matches!(err, CoderootError::Validation(_)));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_clear_resets_state() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path());

    let indexer = indexer();
    indexer
        .start(dir.path(), IndexOptions::default(), None)
        .await
        .unwrap();
    assert_eq!(
        wait_until_terminal(&indexer, dir.path()).await,
        IndexStatus::Indexed
    );

    assert!(indexer.clear(dir.path()).await.unwrap());
    assert_eq!(indexer.status(dir.path()).status, IndexStatus::NotFound);
    assert!(indexer
        .search(dir.path(), "parse config", &SearchQuery::default())
        .await
        .is_err());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_search_all_groups_by_codebase() {
    let dir_a = tempfile::tempdir().unwrap();
    let dir_b = tempfile::tempdir().unwrap();
    write_fixture(dir_a.path());
    std::fs::write(
        dir_b.path().join("other.rs"),
        "fn parse_config_variant() {\n    unimplemented!()\n}\n",
    )
    .unwrap();

    let indexer = indexer();
    for dir in [dir_a.path(), dir_b.path()] {
        indexer
            .start(dir, IndexOptions::default(), None)
            .await
            .unwrap();
        assert_eq!(wait_until_terminal(&indexer, dir).await, IndexStatus::Indexed);
    }

    let grouped = indexer
        .search_all("parse config", &SearchQuery::default())
        .await
        .unwrap();
    assert_eq!(grouped.len(), 2);
    for group in &grouped {
        assert!(!group.results.is_empty());
    }
}
