//! Key-value state store over a single SQLite connection.

use std::sync::Mutex;

use chrono::{SecondsFormat, Utc};
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use log::debug;

use mindhaven_core::errors::{PersistenceError, Result};
use mindhaven_core::sync::StateStore;

use crate::errors::StorageError;
use crate::schema::offline_state;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

#[derive(Queryable, Identifiable, Insertable, Selectable, Debug, Clone)]
#[diesel(primary_key(key))]
#[diesel(table_name = crate::schema::offline_state)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
struct OfflineStateDB {
    key: String,
    value: String,
    updated_at: String,
}

/// Durable key-value backend for the persisted queue document.
///
/// Holds one mutex-guarded connection: all queue mutation happens on a single
/// logical thread, so a pool would only add interleaving risk.
pub struct SqliteStateStore {
    conn: Mutex<SqliteConnection>,
}

impl SqliteStateStore {
    /// Open (or create) the backing database and apply pending migrations.
    pub fn new(database_url: &str) -> Result<Self> {
        let mut conn = SqliteConnection::establish(database_url).map_err(|e| {
            PersistenceError::Read(format!("Failed to open {}: {}", database_url, e))
        })?;
        conn.run_pending_migrations(MIGRATIONS)
            .map_err(|e| PersistenceError::Write(format!("Failed to apply migrations: {}", e)))?;
        debug!("Opened offline state store at {}", database_url);
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn read_value(
        conn: &mut SqliteConnection,
        document_key: &str,
    ) -> std::result::Result<Option<String>, StorageError> {
        Ok(offline_state::table
            .find(document_key)
            .select(offline_state::value)
            .first::<String>(conn)
            .optional()?)
    }

    fn write_value(
        conn: &mut SqliteConnection,
        document_key: &str,
        document: &str,
    ) -> std::result::Result<(), StorageError> {
        let row = OfflineStateDB {
            key: document_key.to_string(),
            value: document.to_string(),
            updated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        };
        diesel::replace_into(offline_state::table)
            .values(&row)
            .execute(conn)?;
        Ok(())
    }
}

impl StateStore for SqliteStateStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self
            .conn
            .lock()
            .map_err(|_| PersistenceError::Read(StorageError::Poisoned.to_string()))?;
        Self::read_value(&mut conn, key).map_err(|e| PersistenceError::Read(e.to_string()).into())
    }

    fn save(&self, key: &str, value: &str) -> Result<()> {
        let mut conn = self
            .conn
            .lock()
            .map_err(|_| PersistenceError::Write(StorageError::Poisoned.to_string()))?;
        Self::write_value(&mut conn, key, value)
            .map_err(|e| PersistenceError::Write(e.to_string()).into())
    }
}
