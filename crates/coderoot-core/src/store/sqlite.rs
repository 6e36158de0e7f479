//! SQLite-backed collection store

use super::filter::compile_filter;
use super::Document;
use crate::error::{CoderootError, Result};
use chrono::Utc;
use rusqlite::{params, params_from_iter, Connection};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Prefix keeping storage identifiers clear of reserved names
pub const COLLECTION_PREFIX: &str = "c_";

/// Provider-imposed ceiling on the number of collections
pub const MAX_COLLECTIONS: usize = 100;

const REGISTRY_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS collections (
    name TEXT PRIMARY KEY,
    table_name TEXT NOT NULL,
    dimension INTEGER NOT NULL,
    description TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
"#;

/// Map a collection name to a storage-safe identifier: lowercase, any
/// character outside `[a-z0-9_]` replaced with `_`, prefixed. Callers are
/// responsible for not producing collisions.
pub fn storage_name(name: &str) -> String {
    let safe: String = name
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{}{}", COLLECTION_PREFIX, safe)
}

/// Collection store handle
pub struct SqliteStore {
    pub(crate) conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a store at the given path
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Self::init(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory store for tests
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Default store location under the user cache directory
    pub fn default_path() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("coderoot")
            .join("store.sqlite")
    }

    fn init(conn: &Connection) -> Result<()> {
        let _mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
        conn.execute_batch(REGISTRY_SCHEMA)?;
        Ok(())
    }

    /// Pre-flight capacity check. Fails with the distinguished collection
    /// limit condition when no further collection can be created.
    pub fn can_create_collection(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM collections", [], |row| row.get(0))?;
        if count as usize >= MAX_COLLECTIONS {
            return Err(CoderootError::CollectionLimit(format!(
                "store holds {} collections (maximum {})",
                count, MAX_COLLECTIONS
            )));
        }
        Ok(())
    }

    /// Create a collection. Idempotent: re-creating upserts the registered
    /// dimension and description without touching existing documents.
    pub fn create_collection(
        &self,
        name: &str,
        dimension: usize,
        description: Option<&str>,
    ) -> Result<()> {
        if dimension == 0 {
            return Err(CoderootError::Validation(
                "collection dimension must be positive".to_string(),
            ));
        }
        let table = storage_name(name);
        let now = Utc::now().to_rfc3339();

        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO collections (name, table_name, dimension, description, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)
             ON CONFLICT(name) DO UPDATE SET
                 dimension = excluded.dimension,
                 description = excluded.description,
                 updated_at = excluded.updated_at",
            params![name, table, dimension as i64, description, now],
        )?;

        conn.execute_batch(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {t} (
                id TEXT PRIMARY KEY,
                vector BLOB NOT NULL,
                content TEXT NOT NULL,
                relative_path TEXT NOT NULL,
                start_line INTEGER NOT NULL,
                end_line INTEGER NOT NULL,
                file_extension TEXT NOT NULL,
                is_definition INTEGER NOT NULL DEFAULT 0,
                metadata TEXT NOT NULL DEFAULT '{{}}'
            );
            CREATE INDEX IF NOT EXISTS idx_{t}_relative_path ON {t}(relative_path);
            CREATE VIRTUAL TABLE IF NOT EXISTS {t}_fts USING fts5(
                content,
                id UNINDEXED,
                tokenize='porter unicode61'
            );
            "#,
            t = table
        ))?;

        Ok(())
    }

    /// Drop a collection and all of its documents and indexes
    pub fn drop_collection(&self, name: &str) -> Result<bool> {
        let table = storage_name(name);
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(&format!(
            "DROP TABLE IF EXISTS {t}_fts; DROP TABLE IF EXISTS {t};",
            t = table
        ))?;
        let rows = conn.execute("DELETE FROM collections WHERE name = ?1", params![name])?;
        Ok(rows > 0)
    }

    pub fn has_collection(&self, name: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM collections WHERE name = ?1",
            params![name],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    pub fn list_collections(&self) -> Result<Vec<String>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT name FROM collections ORDER BY name")?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(names)
    }

    /// Registered vector dimension for a collection
    pub fn collection_dimension(&self, name: &str) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let result = conn.query_row(
            "SELECT dimension FROM collections WHERE name = ?1",
            params![name],
            |row| row.get::<_, i64>(0),
        );
        match result {
            Ok(dim) => Ok(dim as usize),
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                Err(CoderootError::CollectionNotFound(name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Bulk upsert keyed by document id. On conflict every column,
    /// including the vector, is overwritten.
    pub fn insert(&self, name: &str, documents: &[Document]) -> Result<()> {
        let dimension = self.collection_dimension(name)?;
        for doc in documents {
            if doc.vector.len() != dimension {
                return Err(CoderootError::Validation(format!(
                    "document {} vector has {} dimensions, collection {} expects {}",
                    doc.id,
                    doc.vector.len(),
                    name,
                    dimension
                )));
            }
        }

        let table = storage_name(name);
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        {
            let mut upsert = tx.prepare(&format!(
                "INSERT OR REPLACE INTO {t}
                 (id, vector, content, relative_path, start_line, end_line, file_extension, is_definition, metadata)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                t = table
            ))?;
            let mut fts_delete =
                tx.prepare(&format!("DELETE FROM {t}_fts WHERE id = ?1", t = table))?;
            let mut fts_insert = tx.prepare(&format!(
                "INSERT INTO {t}_fts (content, id) VALUES (?1, ?2)",
                t = table
            ))?;

            for doc in documents {
                let metadata = serde_json::to_string(&doc.metadata)?;
                upsert.execute(params![
                    doc.id,
                    embedding_to_bytes(&doc.vector),
                    doc.content,
                    doc.relative_path,
                    doc.start_line as i64,
                    doc.end_line as i64,
                    doc.file_extension,
                    doc.is_definition as i64,
                    metadata,
                ])?;
                fts_delete.execute(params![doc.id])?;
                fts_insert.execute(params![doc.content, doc.id])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Delete documents by id
    pub fn delete(&self, name: &str, ids: &[String]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let table = storage_name(name);
        let placeholders = vec!["?"; ids.len()].join(", ");

        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        tx.execute(
            &format!("DELETE FROM {t} WHERE id IN ({p})", t = table, p = placeholders),
            params_from_iter(ids.iter()),
        )?;
        tx.execute(
            &format!("DELETE FROM {t}_fts WHERE id IN ({p})", t = table, p = placeholders),
            params_from_iter(ids.iter()),
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Query documents by filter expression, projecting the requested
    /// fields. Vectors are never part of the projection.
    pub fn query(
        &self,
        name: &str,
        filter_expr: Option<&str>,
        fields: &[&str],
        limit: Option<usize>,
    ) -> Result<Vec<serde_json::Map<String, serde_json::Value>>> {
        const QUERYABLE: &[&str] = &[
            "id",
            "content",
            "relative_path",
            "start_line",
            "end_line",
            "file_extension",
            "is_definition",
            "metadata",
        ];

        let projection: Vec<&str> = if fields.is_empty() {
            QUERYABLE.to_vec()
        } else {
            for field in fields {
                if !QUERYABLE.contains(field) {
                    return Err(CoderootError::Validation(format!(
                        "unknown query field: {}",
                        field
                    )));
                }
            }
            fields.to_vec()
        };

        if !self.has_collection(name)? {
            return Err(CoderootError::CollectionNotFound(name.to_string()));
        }

        let table = storage_name(name);
        let mut sql = format!("SELECT {} FROM {}", projection.join(", "), table);
        let mut params_vec: Vec<rusqlite::types::Value> = Vec::new();

        if let Some((fragment, mut values)) = filter_expr.and_then(compile_filter) {
            sql.push_str(" WHERE ");
            sql.push_str(&fragment);
            params_vec.append(&mut values);
        }
        sql.push_str(" ORDER BY relative_path, start_line");
        if let Some(limit) = limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(params_vec.iter()), |row| {
                let mut map = serde_json::Map::new();
                for (i, field) in projection.iter().enumerate() {
                    let value = match *field {
                        "start_line" | "end_line" => {
                            serde_json::Value::from(row.get::<_, i64>(i)?)
                        }
                        "is_definition" => serde_json::Value::from(row.get::<_, i64>(i)? != 0),
                        "metadata" => {
                            let raw: String = row.get(i)?;
                            serde_json::from_str(&raw)
                                .unwrap_or(serde_json::Value::Object(Default::default()))
                        }
                        _ => serde_json::Value::from(row.get::<_, String>(i)?),
                    };
                    map.insert(field.to_string(), value);
                }
                Ok(map)
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rows)
    }
}

/// Encode an embedding as little-endian f32 bytes
pub(crate) fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(embedding.len() * 4);
    for value in embedding {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Decode little-endian f32 bytes back into an embedding
pub(crate) fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}
