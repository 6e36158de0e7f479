//! Coderoot MCP server binary
//!
//! Speaks MCP over stdio; logs go to stderr so the protocol stream stays
//! clean.

use anyhow::Result;
use coderoot_core::{
    validate_node_tables, HttpEmbeddingProvider, Indexer, JsonSnapshotStore, SnapshotStore,
    SqliteStore, StateRegistry,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    // Catch node-table typos against the compiled grammars before serving.
    validate_node_tables()?;

    // Database path: CODEROOT_DB env var, otherwise the default data dir.
    let db_path = std::env::var("CODEROOT_DB")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|_| SqliteStore::default_path());
    let store = Arc::new(SqliteStore::open(&db_path)?);

    let snapshot_path = db_path.with_file_name("index_state.json");
    let snapshot: Arc<dyn SnapshotStore> = Arc::new(JsonSnapshotStore::new(snapshot_path));
    let registry = Arc::new(StateRegistry::new(snapshot)?);

    let embedder = Arc::new(HttpEmbeddingProvider::from_env()?);
    let indexer = Indexer::new(store, embedder, registry);

    coderoot_mcp::start_server(indexer).await
}
