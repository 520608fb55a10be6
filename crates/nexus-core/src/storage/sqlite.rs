//! SQLite-backed storage: an append-only event log (C5) and a schemaless
//! key-value store (C6), sharing one database file via a reader/writer
//! connection split so `Storage` stays `Send + Sync` behind `Arc`.

use chrono::{DateTime, Duration, Utc};
use directories::ProjectDirs;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::PathBuf;
use std::sync::Mutex;

use crate::events::{EventRecord, EventType};

#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("key not found: {0}")]
    NotFound(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("initialization error: {0}")]
    Init(String),
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// Append-only event log plus key-value store over one SQLite file.
///
/// All methods take `&self`; interior mutability comes from the
/// reader/writer connection pair, so `Storage` is `Send + Sync` and callers
/// hold it behind `Arc<Storage>` rather than `Arc<Mutex<Storage>>`.
pub struct Storage {
    writer: Mutex<Connection>,
    reader: Mutex<Connection>,
}

impl Storage {
    fn configure_connection(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA cache_size = -64000;
             PRAGMA temp_store = MEMORY;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )?;
        Ok(())
    }

    pub fn new(db_path: Option<PathBuf>) -> Result<Self> {
        let path = match db_path {
            Some(p) => p,
            None => {
                let proj_dirs = ProjectDirs::from("dev", "nexus", "memory")
                    .ok_or_else(|| StorageError::Init("could not determine project directories".to_string()))?;

                let data_dir = proj_dirs.data_dir();
                std::fs::create_dir_all(data_dir)?;
                #[cfg(unix)]
                {
                    use std::os::unix::fs::PermissionsExt;
                    let perms = std::fs::Permissions::from_mode(0o700);
                    let _ = std::fs::set_permissions(data_dir, perms);
                }
                data_dir.join("nexus.db")
            }
        };

        let writer_conn = Connection::open(&path)?;

        #[cfg(unix)]
        if path.exists() {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            let _ = std::fs::set_permissions(&path, perms);
        }

        Self::configure_connection(&writer_conn)?;
        super::migrations::apply_migrations(&writer_conn)?;

        let reader_conn = Connection::open(&path)?;
        Self::configure_connection(&reader_conn)?;

        Ok(Self {
            writer: Mutex::new(writer_conn),
            reader: Mutex::new(reader_conn),
        })
    }

    pub fn in_memory() -> Result<Self> {
        let writer_conn = Connection::open_in_memory()?;
        Self::configure_connection(&writer_conn)?;
        super::migrations::apply_migrations(&writer_conn)?;

        // A second in-memory connection would be a distinct empty database,
        // so the reader shares the writer's connection for this mode.
        let reader_conn = Connection::open(
            writer_conn
                .path()
                .ok_or_else(|| StorageError::Init("in-memory database has no path to reopen".to_string()))?,
        )?;
        Self::configure_connection(&reader_conn)?;

        Ok(Self {
            writer: Mutex::new(writer_conn),
            reader: Mutex::new(reader_conn),
        })
    }

    fn writer_lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.writer.lock().map_err(|_| StorageError::Init("writer lock poisoned".to_string()))
    }

    fn reader_lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.reader.lock().map_err(|_| StorageError::Init("reader lock poisoned".to_string()))
    }

    // -- Event log (C5) -----------------------------------------------

    pub fn append_event(&self, record: &EventRecord) -> Result<()> {
        let conn = self.writer_lock()?;
        conn.execute(
            "INSERT INTO event_log (id, event_type, timestamp, chunk_id, payload) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.id,
                record.event_type.as_str(),
                record.timestamp.to_rfc3339(),
                record.chunk_id,
                record.payload.to_string(),
            ],
        )?;
        Ok(())
    }

    pub fn events_since(&self, since: DateTime<Utc>, event_type: Option<EventType>) -> Result<Vec<EventRecord>> {
        let conn = self.reader_lock()?;
        let (sql, type_filter) = match event_type {
            Some(ty) => (
                "SELECT id, event_type, timestamp, chunk_id, payload FROM event_log \
                 WHERE timestamp >= ?1 AND event_type = ?2 ORDER BY timestamp ASC",
                Some(ty.as_str().to_string()),
            ),
            None => (
                "SELECT id, event_type, timestamp, chunk_id, payload FROM event_log \
                 WHERE timestamp >= ?1 ORDER BY timestamp ASC",
                None,
            ),
        };

        let mut stmt = conn.prepare(sql)?;
        let rows = if let Some(ty) = &type_filter {
            stmt.query_map(params![since.to_rfc3339(), ty], Self::row_to_event)?.collect::<std::result::Result<Vec<_>, _>>()?
        } else {
            stmt.query_map(params![since.to_rfc3339()], Self::row_to_event)?.collect::<std::result::Result<Vec<_>, _>>()?
        };
        rows.into_iter().collect()
    }

    fn row_to_event(row: &rusqlite::Row<'_>) -> rusqlite::Result<std::result::Result<EventRecord, StorageError>> {
        let event_type_str: String = row.get(1)?;
        let timestamp_str: String = row.get(2)?;
        let payload_str: String = row.get(4)?;
        Ok((|| {
            let event_type = EventType::parse(&event_type_str)
                .ok_or_else(|| StorageError::Init(format!("unknown event_type in row: {event_type_str}")))?;
            let timestamp = DateTime::parse_from_rfc3339(&timestamp_str)
                .map_err(|e| StorageError::Init(format!("invalid timestamp in row: {e}")))?
                .with_timezone(&Utc);
            let payload: serde_json::Value = serde_json::from_str(&payload_str)?;
            Ok(EventRecord {
                id: row.get(0)?,
                event_type,
                timestamp,
                chunk_id: row.get(3)?,
                payload,
            })
        })())
    }

    /// Deletes events older than `retention_days`. Matches the lifecycle
    /// scheduler's daily cleanup tick.
    pub fn cleanup_old_events(&self, retention_days: i64) -> Result<usize> {
        let cutoff = Utc::now() - Duration::days(retention_days);
        let conn = self.writer_lock()?;
        let deleted = conn.execute("DELETE FROM event_log WHERE timestamp < ?1", params![cutoff.to_rfc3339()])?;
        Ok(deleted)
    }

    // -- Key-value store (C6) ------------------------------------------

    pub fn kv_set(&self, key: &str, value: &serde_json::Value) -> Result<()> {
        let conn = self.writer_lock()?;
        conn.execute(
            "INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value.to_string(), Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    pub fn kv_get(&self, key: &str) -> Result<Option<serde_json::Value>> {
        let conn = self.reader_lock()?;
        let raw: Option<String> = conn
            .query_row("SELECT value FROM kv_store WHERE key = ?1", params![key], |row| row.get(0))
            .optional()?;
        raw.map(|s| serde_json::from_str(&s).map_err(StorageError::from)).transpose()
    }

    pub fn kv_delete(&self, key: &str) -> Result<bool> {
        let conn = self.writer_lock()?;
        let affected = conn.execute("DELETE FROM kv_store WHERE key = ?1", params![key])?;
        Ok(affected > 0)
    }

    /// Lists keys under a prefix (e.g. `"archived:"`, `"rehydratable:"`,
    /// `"observation:"`).
    pub fn kv_list_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let conn = self.reader_lock()?;
        let pattern = format!("{prefix}%");
        let mut stmt = conn.prepare("SELECT key FROM kv_store WHERE key LIKE ?1 ORDER BY key ASC")?;
        let keys = stmt.query_map(params![pattern], |row| row.get(0))?.collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_storage() -> Storage {
        Storage::in_memory().unwrap()
    }

    #[test]
    fn append_and_query_events() {
        let storage = test_storage();
        let record = EventRecord::new(EventType::Ingest, Some("chunk-1".to_string()), serde_json::json!({"ok": true}));
        storage.append_event(&record).unwrap();

        let events = storage.events_since(Utc::now() - Duration::minutes(1), None).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].chunk_id.as_deref(), Some("chunk-1"));
    }

    #[test]
    fn events_since_filters_by_type() {
        let storage = test_storage();
        storage.append_event(&EventRecord::new(EventType::Ingest, None, serde_json::json!({}))).unwrap();
        storage.append_event(&EventRecord::new(EventType::Demote, None, serde_json::json!({}))).unwrap();

        let demotions = storage.events_since(Utc::now() - Duration::minutes(1), Some(EventType::Demote)).unwrap();
        assert_eq!(demotions.len(), 1);
        assert_eq!(demotions[0].event_type, EventType::Demote);
    }

    #[test]
    fn cleanup_old_events_respects_retention_window() {
        let storage = test_storage();
        storage.append_event(&EventRecord::new(EventType::Query, None, serde_json::json!({}))).unwrap();

        let deleted = storage.cleanup_old_events(30).unwrap();
        assert_eq!(deleted, 0, "fresh event is within the retention window");
    }

    #[test]
    fn kv_round_trip() {
        let storage = test_storage();
        storage.kv_set("archived:chunk-1", &serde_json::json!({"summary": "..."})).unwrap();

        let value = storage.kv_get("archived:chunk-1").unwrap().unwrap();
        assert_eq!(value["summary"], "...");

        assert!(storage.kv_delete("archived:chunk-1").unwrap());
        assert!(storage.kv_get("archived:chunk-1").unwrap().is_none());
    }

    #[test]
    fn kv_list_prefix_filters_keys() {
        let storage = test_storage();
        storage.kv_set("archived:a", &serde_json::json!(1)).unwrap();
        storage.kv_set("archived:b", &serde_json::json!(2)).unwrap();
        storage.kv_set("rehydratable:c", &serde_json::json!(3)).unwrap();

        let archived = storage.kv_list_prefix("archived:").unwrap();
        assert_eq!(archived, vec!["archived:a".to_string(), "archived:b".to_string()]);
    }
}
