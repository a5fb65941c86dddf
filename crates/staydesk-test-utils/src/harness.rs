// SPDX-FileCopyrightText: 2026 Staydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Temp-database test environment.
//!
//! `TestHarness` opens a fresh SQLite database in a temp directory and pairs
//! it with a [`MockGateway`] and a [`MockRenderer`]. Tests build the engine
//! from these parts.

use std::sync::Arc;

use staydesk_config::model::StorageConfig;
use staydesk_config::StaydeskConfig;
use staydesk_core::{DirectoryStore, StaydeskError, StorageAdapter};
use staydesk_storage::SqliteStorage;

use crate::fixtures;
use crate::mock_gateway::MockGateway;
use crate::mock_renderer::MockRenderer;

/// Guest, property, and reservation ids seeded by [`TestHarness::seed_stay`].
pub const GUEST: &str = "g1";
pub const PROPERTY: &str = "p1";
pub const RESERVATION: &str = "r1";

pub struct TestHarness {
    /// SQLite storage adapter (temp DB, removed on drop).
    pub storage: Arc<SqliteStorage>,
    pub gateway: Arc<MockGateway>,
    pub renderer: Arc<MockRenderer>,
    /// Defaults with the storage path pointed at the temp database.
    pub config: StaydeskConfig,
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub async fn new() -> Result<Self, StaydeskError> {
        let temp_dir =
            tempfile::TempDir::new().map_err(|e| StaydeskError::Storage { source: e.into() })?;
        let storage_config = StorageConfig {
            database_path: temp_dir
                .path()
                .join("test.db")
                .to_string_lossy()
                .into_owned(),
            wal_mode: true,
        };
        let storage = SqliteStorage::new(storage_config.clone());
        storage.initialize().await?;

        Ok(Self {
            storage: Arc::new(storage),
            gateway: Arc::new(MockGateway::new()),
            renderer: Arc::new(MockRenderer::new()),
            config: StaydeskConfig {
                storage: storage_config,
                ..StaydeskConfig::default()
            },
            _temp_dir: temp_dir,
        })
    }

    /// Seed guest "Amel" with reservation `r1` at property "Villa X".
    pub async fn seed_stay(&self) -> Result<(), StaydeskError> {
        self.storage
            .upsert_guest(&fixtures::guest(GUEST, "Amel"))
            .await?;
        self.storage
            .upsert_property(&fixtures::property(PROPERTY, "Villa X"))
            .await?;
        self.storage
            .upsert_reservation(&fixtures::reservation(RESERVATION, GUEST, PROPERTY))
            .await?;
        Ok(())
    }
}
