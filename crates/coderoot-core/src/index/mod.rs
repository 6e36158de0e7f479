//! Indexing pipeline
//!
//! File scanning, change detection, state tracking, and the orchestrator
//! that ties them to the chunker, embedder, and store.

mod orchestrator;
mod scanner;
mod state;
mod sync;

pub use orchestrator::{
    CodebaseResults, IndexOptions, IndexProgress, Indexer, ProgressCallback, SearchQuery,
    StartOutcome, EMBED_BATCH_SIZE, MAX_TOTAL_CHUNKS,
};
pub use scanner::{scan_files, ScanOptions, ScanResult};
pub use state::{
    CodebaseState, IndexStats, IndexStatus, JsonSnapshotStore, MemorySnapshotStore, SnapshotStore,
    StateRegistry, StatusNote, SNAPSHOT_INTERVAL,
};
pub use sync::{ChangeDetector, FileHashDetector};
