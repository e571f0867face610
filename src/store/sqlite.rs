//! SQLite-backed module repository.
//!
//! One file database in WAL mode behind a small connection pool. The
//! schema is evolved by the embedded migration scripts, applied in order
//! under `PRAGMA user_version` when the store is opened.

use std::path::Path;

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension};
use tracing::warn;

use crate::error::{Error, Result};
use crate::record::ModuleRecord;
use crate::store::{InsertOutcome, ModuleRepository};

const MIGRATIONS: &[&str] = &[include_str!("migrations/0001_create_module.sql")];

const POOL_SIZE: u32 = 10;

pub struct SqliteStore {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteStore {
    /// Open the database at `path`, creating it if needed, and bring the
    /// schema up to date.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let manager = SqliteConnectionManager::file(path.as_ref()).with_init(|conn| {
            conn.busy_timeout(std::time::Duration::from_secs(5))?;
            conn.query_row("PRAGMA journal_mode = WAL", [], |_row| Ok(()))?;
            conn.execute_batch("PRAGMA foreign_keys = ON;")
        });
        let pool = Pool::builder()
            .max_size(POOL_SIZE)
            .build(manager)
            .map_err(|e| Error::Storage(e.to_string()))?;

        let store = Self { pool };
        store.migrate()?;
        Ok(store)
    }

    fn migrate(&self) -> Result<()> {
        let conn = self.conn()?;
        let current: i64 = conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))
            .map_err(storage)?;

        for (index, script) in MIGRATIONS.iter().enumerate() {
            let target = (index + 1) as i64;
            if current >= target {
                continue;
            }
            conn.execute_batch(&format!(
                "BEGIN;\n{script}\nPRAGMA user_version = {target};\nCOMMIT;"
            ))
            .map_err(storage)?;
        }
        Ok(())
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>> {
        self.pool.get().map_err(|e| Error::Storage(e.to_string()))
    }

    fn blob_column(&self, column: &str, name: &str, version: &str) -> Result<Vec<u8>> {
        let conn = self.conn()?;
        let sql = format!("SELECT {column} FROM module WHERE name = ?1 AND version = ?2");
        let value: Option<Option<Vec<u8>>> = conn
            .query_row(&sql, params![name, version], |row| row.get(0))
            .optional()
            .map_err(storage)?;

        match value {
            Some(Some(bytes)) if !bytes.is_empty() => Ok(bytes),
            _ => Err(Error::NotFound),
        }
    }
}

impl ModuleRepository for SqliteStore {
    fn insert(&self, record: &ModuleRecord) -> Result<InsertOutcome> {
        if record.mod_file.is_empty() {
            return Err(Error::Storage(format!(
                "refusing to store {}@{} without a mod file",
                record.name, record.version
            )));
        }

        let conn = self.conn()?;
        let inserted = conn
            .execute(
                "INSERT INTO module (name, version, mod, info, zip_hash, zip) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6) \
                 ON CONFLICT (name, version) DO NOTHING",
                params![
                    record.name,
                    record.version,
                    record.mod_file,
                    record.info,
                    record.zip_hash,
                    record.zip
                ],
            )
            .map_err(storage)?;

        if inserted > 0 {
            return Ok(InsertOutcome::Inserted);
        }

        // The stored row wins, but a diverging archive hash is worth
        // surfacing in the logs.
        let stored: Option<String> = conn
            .query_row(
                "SELECT zip_hash FROM module WHERE name = ?1 AND version = ?2",
                params![record.name, record.version],
                |row| row.get(0),
            )
            .optional()
            .map_err(storage)?
            .flatten();
        if let Some(stored) = stored {
            if !stored.is_empty() && !record.zip_hash.is_empty() && stored != record.zip_hash {
                warn!(
                    module = %record.name,
                    version = %record.version,
                    stored = %stored,
                    incoming = %record.zip_hash,
                    "zip hash mismatch on duplicate insert"
                );
            }
        }

        Ok(InsertOutcome::AlreadyExists)
    }

    fn version_list(&self, name: &str) -> Result<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT version FROM module WHERE name = ?1")
            .map_err(storage)?;
        let rows = stmt
            .query_map(params![name], |row| row.get::<_, String>(0))
            .map_err(storage)?;

        let mut versions = Vec::new();
        for version in rows {
            versions.push(version.map_err(storage)?);
        }
        Ok(versions)
    }

    fn version_info(&self, name: &str, version: &str) -> Result<Vec<u8>> {
        self.blob_column("info", name, version)
    }

    fn mod_file(&self, name: &str, version: &str) -> Result<Vec<u8>> {
        self.blob_column("mod", name, version)
    }

    fn module_zip(&self, name: &str, version: &str) -> Result<Vec<u8>> {
        self.blob_column("zip", name, version)
    }

    fn exists(&self, name: &str, version: &str) -> Result<bool> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM module WHERE name = ?1 AND version = ?2)",
            params![name, version],
            |row| row.get(0),
        )
        .map_err(storage)
    }
}

fn storage(err: rusqlite::Error) -> Error {
    Error::Storage(err.to_string())
}
