/*!
 * SQLite-backed cache and session stores.
 *
 * A single database file holds both the translation cache and the resumable
 * session snapshot. Connection access is serialized through a mutex and all
 * queries run on the blocking thread pool.
 */

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use log::{debug, info};
use rusqlite::{Connection, OptionalExtension, params};

use crate::storage::{CacheStore, SessionStore};
use crate::translation::session::TranslationSession;

/// Default database filename
const DEFAULT_DB_FILENAME: &str = "subtrans.db";

/// Default database directory name under the user's data directory
const DEFAULT_DB_DIRNAME: &str = "subtrans";

/// Fixed slot key; the store holds at most one session.
const SESSION_SLOT: &str = "current";

/// Shared SQLite store implementing both storage capabilities.
#[derive(Clone)]
pub struct SqliteStore {
    db_path: PathBuf,
    connection: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (or create) the database at the default location.
    pub fn new_default() -> Result<Self> {
        let db_path = Self::default_database_path()?;
        Self::new(&db_path)
    }

    /// Open (or create) the database at the given path.
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path = db_path.as_ref().to_path_buf();

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create database directory: {:?}", parent))?;
        }

        info!("Opening database at: {:?}", db_path);

        let conn = Connection::open(&db_path)
            .with_context(|| format!("Failed to open database: {:?}", db_path))?;
        initialize_schema(&conn)?;

        Ok(Self {
            db_path,
            connection: Arc::new(Mutex::new(conn)),
        })
    }

    /// Create an in-memory database (for testing).
    pub fn new_in_memory() -> Result<Self> {
        debug!("Creating in-memory database");

        let conn = Connection::open_in_memory().context("Failed to create in-memory database")?;
        initialize_schema(&conn)?;

        Ok(Self {
            db_path: PathBuf::from(":memory:"),
            connection: Arc::new(Mutex::new(conn)),
        })
    }

    /// Default database path under the user's data directory.
    pub fn default_database_path() -> Result<PathBuf> {
        let base = dirs::data_dir().context("Could not determine user data directory")?;
        Ok(base.join(DEFAULT_DB_DIRNAME).join(DEFAULT_DB_FILENAME))
    }

    /// Path of the open database.
    pub fn path(&self) -> &Path {
        &self.db_path
    }

    async fn run_blocking<T, F>(&self, job: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let connection = self.connection.clone();
        tokio::task::spawn_blocking(move || {
            let conn = connection.lock().unwrap();
            job(&conn)
        })
        .await
        .context("Database task panicked")?
    }
}

fn initialize_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS translation_cache (
            key        TEXT PRIMARY KEY,
            value      TEXT NOT NULL,
            created_at INTEGER NOT NULL
        );
        CREATE TABLE IF NOT EXISTS sessions (
            slot       TEXT PRIMARY KEY,
            payload    TEXT NOT NULL,
            updated_at INTEGER NOT NULL
        );",
    )
    .context("Failed to initialize database schema")?;
    Ok(())
}

#[async_trait]
impl CacheStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let key = key.to_string();
        self.run_blocking(move |conn| {
            conn.query_row(
                "SELECT value FROM translation_cache WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .context("Cache lookup failed")
        })
        .await
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let key = key.to_string();
        let value = value.to_string();
        self.run_blocking(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO translation_cache (key, value, created_at) VALUES (?1, ?2, ?3)",
                params![key, value, Utc::now().timestamp()],
            )
            .context("Cache write failed")?;
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl SessionStore for SqliteStore {
    async fn save(&self, session: &TranslationSession) -> Result<()> {
        let payload = serde_json::to_string(session).context("Failed to serialize session")?;
        self.run_blocking(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO sessions (slot, payload, updated_at) VALUES (?1, ?2, ?3)",
                params![SESSION_SLOT, payload, Utc::now().timestamp()],
            )
            .context("Session write failed")?;
            Ok(())
        })
        .await
    }

    async fn load(&self) -> Result<Option<TranslationSession>> {
        let payload: Option<String> = self
            .run_blocking(move |conn| {
                conn.query_row(
                    "SELECT payload FROM sessions WHERE slot = ?1",
                    params![SESSION_SLOT],
                    |row| row.get(0),
                )
                .optional()
                .context("Session lookup failed")
            })
            .await?;

        match payload {
            Some(payload) => {
                let session = serde_json::from_str(&payload).context("Failed to deserialize session")?;
                Ok(Some(session))
            }
            None => Ok(None),
        }
    }

    async fn clear(&self) -> Result<()> {
        self.run_blocking(move |conn| {
            conn.execute("DELETE FROM sessions WHERE slot = ?1", params![SESSION_SLOT])
                .context("Session clear failed")?;
            Ok(())
        })
        .await
    }
}
