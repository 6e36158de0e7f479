//! Collection store
//!
//! SQLite-backed persistence for chunk documents. Each collection owns a
//! document table (vector BLOB sized to the embedding dimension) and an
//! FTS5 lexical index over content, registered in a shared collections
//! table.

pub mod filter;
pub(crate) mod sqlite;

pub use filter::{compile_filter, parse_filter, FilterExpr, FilterValue};
pub use sqlite::{storage_name, SqliteStore, COLLECTION_PREFIX, MAX_COLLECTIONS};

use serde::{Deserialize, Serialize};

/// A persisted chunk document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Unique per collection; re-inserting the same id overwrites every field
    pub id: String,
    /// Embedding vector; width fixed by the collection dimension
    pub vector: Vec<f32>,
    pub content: String,
    pub relative_path: String,
    pub start_line: usize,
    pub end_line: usize,
    pub file_extension: String,
    pub is_definition: bool,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}
