// SPDX-FileCopyrightText: 2026 Staydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background thread.
//! Do NOT create additional Connection instances for writes.

use std::path::Path;

use staydesk_core::StaydeskError;
use tokio_rusqlite::Connection;
use tracing::debug;

use crate::migrations;

/// Handle to the single SQLite connection.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) the database, apply PRAGMAs and run pending migrations.
    pub async fn open(path: &str, wal_mode: bool) -> Result<Self, StaydeskError> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| StaydeskError::Storage {
                    source: Box::new(e),
                })?;
            }
        }

        let conn = Connection::open(path)
            .await
            .map_err(|e| StaydeskError::Storage {
                source: Box::new(e),
            })?;

        conn.call(move |conn| {
            if wal_mode {
                conn.pragma_update(None, "journal_mode", "WAL")?;
            }
            conn.pragma_update(None, "foreign_keys", "ON")?;
            conn.pragma_update(None, "busy_timeout", 5000)?;
            conn.pragma_update(None, "synchronous", "NORMAL")?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        let applied = conn
            .call(migrations::run_migrations)
            .await
            .map_err(|e: tokio_rusqlite::Error<refinery::Error>| StaydeskError::Storage {
                source: format!("migration failed: {e}").into(),
            })?;

        debug!(path, applied, wal_mode, "database opened");
        Ok(Self { conn })
    }

    /// The underlying connection. Every query goes through `call()` on it.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

/// Convert a tokio-rusqlite call error into a storage error.
pub fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> StaydeskError {
    StaydeskError::Storage {
        source: e.to_string().into(),
    }
}
