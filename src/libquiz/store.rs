use crate::libquiz::model::Document;
use log::{debug, error, info, warn};
use rusqlite::{params, Connection, DatabaseName, OptionalExtension};
use std::path::Path;
use std::time::Instant;
use thiserror::Error;

pub const STORAGE_KEY: &str = "quiz_sprint_v1_all";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("cannot serialize document: {0}")]
    Json(#[from] serde_json::Error),
}

/// Key/value persistence for the quiz document.
pub trait Store {
    /// Never fails: missing or unreadable data yields the default document.
    fn load(&self) -> Document;
    fn save(&mut self, document: &Document) -> Result<(), StoreError>;
}

/// Best-effort save. Failures are logged and otherwise ignored; the caller
/// keeps working with the in-memory document.
pub fn persist(store: &mut impl Store, document: &Document) {
    if let Err(err) = store.save(document) {
        warn!("[Store] Could not save document, continuing in memory: {}", err);
    }
}

pub struct SqliteStore {
    conn: Connection,
    key: String,
}

impl SqliteStore {
    pub fn create_or_open(src: &Path) -> Result<Self, StoreError> {
        let conn = if src.exists() {
            info!("[Store] Opening existing Database");
            open_db(src)?
        } else {
            info!("[Store] Creating new Database");
            create_db(src)?
        };
        Ok(Self::with_connection(conn))
    }

    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = init_db(Connection::open_in_memory()?)?;
        Ok(Self::with_connection(conn))
    }

    fn with_connection(conn: Connection) -> Self {
        Self {
            conn,
            key: STORAGE_KEY.to_string(),
        }
    }

    fn read_raw(&self) -> Result<Option<String>, StoreError> {
        let raw = self
            .conn
            .query_row(
                "SELECT value FROM KeyValue WHERE key = ?1",
                params![self.key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(raw)
    }

    pub fn write_raw(&mut self, value: &str) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO KeyValue(key, value) VALUES (?1, ?2) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![self.key, value],
        )?;
        Ok(())
    }

    pub fn close(self) -> Result<(), StoreError> {
        close_db(self.conn)
    }
}

impl Store for SqliteStore {
    fn load(&self) -> Document {
        let raw = match self.read_raw() {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!("[Store] No document stored under '{}'", self.key);
                return Document::default();
            }
            Err(err) => {
                warn!("[Store] Cannot read document: {}", err);
                return Document::default();
            }
        };
        match serde_json::from_str(&raw) {
            Ok(document) => document,
            Err(err) => {
                warn!("[Store] Malformed document, starting fresh: {}", err);
                Document::default()
            }
        }
    }

    fn save(&mut self, document: &Document) -> Result<(), StoreError> {
        let now = Instant::now();
        let json = serde_json::to_string(document)?;
        self.write_raw(&json)?;
        debug!(
            "[Store] Saved {} quizzes in {} ms.",
            document.quizzes.len(),
            now.elapsed().as_millis()
        );
        Ok(())
    }
}

fn create_db(dest: &Path) -> Result<Connection, StoreError> {
    let now = Instant::now();
    let db = init_db(Connection::open_in_memory()?)?;
    match db.backup(DatabaseName::Main, dest, None) {
        Ok(_) => {
            debug!(
                "[Store] Creating and Saving took {} ms.",
                now.elapsed().as_millis()
            );
            // keep writing to the file, not the in-memory copy
            drop(db);
            open_db(dest)
        }
        Err(err) => {
            warn!("[Store] Failed to create database file: {}", err);
            close_db(db)?;
            Err(err.into())
        }
    }
}

fn open_db(src: &Path) -> Result<Connection, StoreError> {
    let now = Instant::now();
    let db = init_db(Connection::open(src)?)?;
    debug!("[Store] Opening took {} ms.", now.elapsed().as_millis());
    Ok(db)
}

fn close_db(mut connection: Connection) -> Result<(), StoreError> {
    info!("[Store] Closing Database");
    for attempt in 1..=3 {
        match connection.close() {
            Ok(_) => return Ok(()),
            Err((conn, err)) => {
                if attempt == 3 {
                    error!("[Store] Cannot close connection! Giving up.");
                    return Err(err.into());
                }
                error!("[Store] Cannot close connection. Retrying {}/2...", attempt);
                connection = conn;
            }
        }
    }
    Ok(())
}

fn init_db(conn: Connection) -> Result<Connection, StoreError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS KeyValue (
              key TEXT NOT NULL PRIMARY KEY,
              value TEXT NOT NULL
            )",
        (),
    )?;
    debug!("[Store INIT] Table KeyValue ready");
    Ok(conn)
}
