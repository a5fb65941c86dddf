// SPDX-FileCopyrightText: 2026 Staydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `staydesk serve` and `staydesk sweep`.

use std::sync::Arc;

use chrono::Utc;
use staydesk_api::AppState;
use staydesk_config::StaydeskConfig;
use staydesk_core::{StaydeskError, StorageAdapter};
use staydesk_documents::HtmlRenderer;
use staydesk_engine::Engine;
use staydesk_storage::SqliteStorage;
use tracing::{info, warn};

use crate::shutdown;

struct Runtime {
    storage: Arc<SqliteStorage>,
    documents: Arc<HtmlRenderer>,
    engine: Arc<Engine>,
}

async fn build_runtime(config: &StaydeskConfig) -> Result<Runtime, StaydeskError> {
    let storage = Arc::new(SqliteStorage::new(config.storage.clone()));
    storage.initialize().await?;
    info!(path = %config.storage.database_path, "storage initialized");

    let gateway = staydesk_relay::gateway_from_config(&config.relay)?;
    let documents = Arc::new(HtmlRenderer::new(&config.documents));
    let engine = Arc::new(Engine::new(
        storage.clone(),
        gateway,
        documents.clone(),
        config,
    ));

    Ok(Runtime {
        storage,
        documents,
        engine,
    })
}

/// Run the sweeper, and the API when enabled, until a shutdown signal.
pub async fn run_serve(config: StaydeskConfig) -> Result<(), StaydeskError> {
    let runtime = build_runtime(&config).await?;
    let cancel = shutdown::install_signal_handler();

    let sweeper = runtime.engine.spawn_sweeper(cancel.clone());
    info!(
        interval_secs = config.engine.sweep_interval_secs,
        "sweeper started"
    );

    let served = if config.api.enabled {
        let state = AppState {
            engine: runtime.engine.clone(),
            storage: runtime.storage.clone(),
            documents: Some(runtime.documents.clone()),
        };
        let result = staydesk_api::start_server(&config.api, state, cancel.clone()).await;
        // A bind failure returns before any signal; stop the sweeper too.
        cancel.cancel();
        result
    } else {
        info!("API disabled; running sweeper only");
        cancel.cancelled().await;
        Ok(())
    };

    if let Err(e) = sweeper.await {
        warn!(error = %e, "sweeper task ended abnormally");
    }
    runtime.storage.close().await?;

    info!("staydesk serve shutdown complete");
    served
}

/// Dispatch everything currently due and print the sweep report as JSON.
pub async fn run_sweep_once(config: StaydeskConfig) -> Result<(), StaydeskError> {
    let runtime = build_runtime(&config).await?;
    let report = runtime.engine.scheduler().sweep(Utc::now()).await?;
    runtime.storage.close().await?;

    let json = serde_json::to_string_pretty(&report)
        .map_err(|e| StaydeskError::Internal(format!("failed to encode sweep report: {e}")))?;
    println!("{json}");
    Ok(())
}
