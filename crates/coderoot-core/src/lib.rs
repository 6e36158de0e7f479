//! Coderoot Core Library
//!
//! Code indexing and retrieval engine for AI coding assistants.
//!
//! # Features
//! - AST-aware chunking via tree-sitter with text fallback
//! - Chunk refinement: size capping with line-boundary splits and overlap
//! - SQLite collection store with vector BLOBs and FTS5 lexical indexing
//! - Hybrid ranking fusing cosine similarity, BM25, and definition bonus
//! - Background indexing orchestration with durable state snapshots

pub mod chunk;
pub mod embed;
pub mod error;
pub mod index;
pub mod search;
pub mod store;

pub use chunk::{
    compute_chunk_id, validate_node_tables, AstChunker, Chunk, Language, TextSplitter,
    CHUNK_MAX_CHARS, CHUNK_OVERLAP_CHARS,
};
pub use embed::{Embedding, EmbeddingProvider, HttpEmbeddingProvider};
pub use error::{CoderootError, Result};
pub use index::{
    ChangeDetector, CodebaseResults, CodebaseState, FileHashDetector, IndexOptions, IndexProgress,
    IndexStats, IndexStatus, Indexer, JsonSnapshotStore, MemorySnapshotStore, ProgressCallback,
    SearchQuery, SnapshotStore, StartOutcome, StateRegistry, StatusNote, EMBED_BATCH_SIZE,
    MAX_TOTAL_CHUNKS,
};
pub use search::{
    cosine_similarity, fuse_scores, HybridOptions, SearchOptions, SearchResult, DEFINITION_BONUS,
    LEXICAL_WEIGHT, VECTOR_WEIGHT,
};
pub use store::{Document, SqliteStore, MAX_COLLECTIONS};

/// Default data directory name
pub const DATA_DIR_NAME: &str = "coderoot";
