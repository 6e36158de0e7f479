//! Per-codebase indexing state
//!
//! One state record per canonical path, mutated only by the orchestrator.
//! The registry serializes concurrent start attempts, stamps each job with
//! a generation so a superseded job's writes are dropped, and persists
//! snapshots through an injectable store: always on terminal transitions,
//! throttled during progress.

use crate::error::{CoderootError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Minimum interval between durable snapshot writes during progress
pub const SNAPSHOT_INTERVAL: Duration = Duration::from_secs(2);

/// Indexing lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexStatus {
    NotFound,
    Indexing,
    Indexed,
    #[serde(rename = "indexfailed")]
    IndexFailed,
}

/// Qualifier on a successful terminal state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusNote {
    Ok,
    LimitReached,
}

/// Final counters for an indexing run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexStats {
    pub indexed_files: usize,
    pub total_chunks: usize,
    pub status_note: Option<StatusNote>,
}

/// State record for one codebase path
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodebaseState {
    pub path: PathBuf,
    pub status: IndexStatus,
    pub progress_percentage: f32,
    #[serde(default)]
    pub stats: IndexStats,
    pub error_message: Option<String>,
    pub last_attempted_percentage: Option<f32>,
    pub last_updated: DateTime<Utc>,
}

impl CodebaseState {
    fn not_found(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            status: IndexStatus::NotFound,
            progress_percentage: 0.0,
            stats: IndexStats::default(),
            error_message: None,
            last_attempted_percentage: None,
            last_updated: Utc::now(),
        }
    }
}

/// Durable persistence for the state registry
pub trait SnapshotStore: Send + Sync {
    fn load(&self) -> Result<Vec<CodebaseState>>;
    fn save(&self, states: &[CodebaseState]) -> Result<()>;
}

/// JSON-file snapshot persistence
pub struct JsonSnapshotStore {
    path: PathBuf,
}

impl JsonSnapshotStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl SnapshotStore for JsonSnapshotStore {
    fn load(&self) -> Result<Vec<CodebaseState>> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, states: &[CodebaseState]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(states)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// In-memory snapshot persistence for tests
#[derive(Default)]
pub struct MemorySnapshotStore {
    states: Mutex<Vec<CodebaseState>>,
}

impl SnapshotStore for MemorySnapshotStore {
    fn load(&self) -> Result<Vec<CodebaseState>> {
        Ok(self.states.lock().unwrap().clone())
    }

    fn save(&self, states: &[CodebaseState]) -> Result<()> {
        *self.states.lock().unwrap() = states.to_vec();
        Ok(())
    }
}

struct RegistryInner {
    states: HashMap<PathBuf, CodebaseState>,
    generations: HashMap<PathBuf, u64>,
    last_snapshot: Instant,
}

/// Shared state registry. All transitions go through here; the inner
/// mutex makes read-check-then-write atomic for concurrent job starts.
pub struct StateRegistry {
    inner: Mutex<RegistryInner>,
    snapshot: Arc<dyn SnapshotStore>,
}

impl StateRegistry {
    pub fn new(snapshot: Arc<dyn SnapshotStore>) -> Result<Self> {
        let states = snapshot
            .load()?
            .into_iter()
            .map(|s| (s.path.clone(), s))
            .collect();
        Ok(Self {
            inner: Mutex::new(RegistryInner {
                states,
                generations: HashMap::new(),
                last_snapshot: Instant::now(),
            }),
            snapshot,
        })
    }

    /// Current state for a path, `not_found` when never indexed
    pub fn get(&self, path: &Path) -> CodebaseState {
        let inner = self.inner.lock().unwrap();
        inner
            .states
            .get(path)
            .cloned()
            .unwrap_or_else(|| CodebaseState::not_found(path))
    }

    /// All known states
    pub fn all(&self) -> Vec<CodebaseState> {
        let inner = self.inner.lock().unwrap();
        inner.states.values().cloned().collect()
    }

    /// Atomically transition a path into `indexing`. Rejected when a job
    /// is already running for it. Returns the generation stamp for the
    /// new job; stale generations are ignored on later writes.
    pub fn begin_indexing(&self, path: &Path) -> Result<u64> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(existing) = inner.states.get(path) {
            if existing.status == IndexStatus::Indexing {
                return Err(CoderootError::Validation(format!(
                    "{} is already being indexed",
                    path.display()
                )));
            }
        }

        let generation = {
            let counter = inner.generations.entry(path.to_path_buf()).or_insert(0);
            *counter += 1;
            *counter
        };
        let state = CodebaseState {
            status: IndexStatus::Indexing,
            ..CodebaseState::not_found(path)
        };
        inner.states.insert(path.to_path_buf(), state);
        self.persist(&mut inner, true);
        Ok(generation)
    }

    /// Record progress for a running job. Snapshot writes are amortized
    /// to at most one per [`SNAPSHOT_INTERVAL`].
    pub fn update_progress(&self, path: &Path, generation: u64, percentage: f32) {
        let mut inner = self.inner.lock().unwrap();
        if !self.is_current(&inner, path, generation) {
            return;
        }
        if let Some(state) = inner.states.get_mut(path) {
            state.progress_percentage = percentage.clamp(0.0, 100.0);
            state.last_updated = Utc::now();
        }
        self.persist(&mut inner, false);
    }

    /// Terminal transition to `indexed`
    pub fn complete(&self, path: &Path, generation: u64, stats: IndexStats) {
        let mut inner = self.inner.lock().unwrap();
        if !self.is_current(&inner, path, generation) {
            return;
        }
        if let Some(state) = inner.states.get_mut(path) {
            state.status = IndexStatus::Indexed;
            state.progress_percentage = 100.0;
            state.stats = stats;
            state.error_message = None;
            state.last_attempted_percentage = None;
            state.last_updated = Utc::now();
        }
        self.persist(&mut inner, true);
    }

    /// Terminal transition to `indexfailed`, retaining last progress
    pub fn fail(&self, path: &Path, generation: u64, message: &str) {
        let mut inner = self.inner.lock().unwrap();
        if !self.is_current(&inner, path, generation) {
            return;
        }
        if let Some(state) = inner.states.get_mut(path) {
            state.status = IndexStatus::IndexFailed;
            state.last_attempted_percentage = Some(state.progress_percentage);
            state.error_message = Some(message.to_string());
            state.last_updated = Utc::now();
        }
        self.persist(&mut inner, true);
    }

    /// Remove a path's state entirely (clear / force re-index)
    pub fn clear(&self, path: &Path) {
        let mut inner = self.inner.lock().unwrap();
        inner.states.remove(path);
        self.persist(&mut inner, true);
    }

    fn is_current(&self, inner: &RegistryInner, path: &Path, generation: u64) -> bool {
        inner.generations.get(path).copied() == Some(generation)
    }

    fn persist(&self, inner: &mut RegistryInner, force: bool) {
        if !force && inner.last_snapshot.elapsed() < SNAPSHOT_INTERVAL {
            return;
        }
        let states: Vec<CodebaseState> = inner.states.values().cloned().collect();
        if let Err(e) = self.snapshot.save(&states) {
            tracing::warn!(error = %e, "failed to persist index state snapshot");
        }
        inner.last_snapshot = Instant::now();
    }
}
