// SPDX-FileCopyrightText: 2026 Staydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notification engine for Staydesk.
//!
//! The [`Engine`] wires the pieces together:
//! - [`interpolate`] renders `{key}` placeholders against guest data
//! - [`trigger`] turns relative rules into absolute fire times
//! - [`scheduler`] owns the scheduled-message lifecycle and the sweep
//! - [`contract`] drives contracts through signing
//! - [`invite`] fans an invitation out across properties

pub mod context;
pub mod contract;
pub mod dispatcher;
pub mod fanout;
pub mod interpolate;
pub mod invite;
pub mod scheduler;
pub mod sweeper;
pub mod templates;
pub mod trigger;

use std::sync::Arc;
use std::time::Duration;

use staydesk_config::StaydeskConfig;
use staydesk_core::{DocumentRenderer, GatewayAdapter, StorageAdapter};
use tokio_util::sync::CancellationToken;

use crate::contract::ContractLifecycle;
use crate::dispatcher::Dispatcher;
use crate::invite::InvitationService;
use crate::scheduler::Scheduler;
use crate::templates::TemplateService;

/// Every engine service, sharing one storage backend and gateway.
pub struct Engine {
    scheduler: Arc<Scheduler>,
    contracts: ContractLifecycle,
    invitations: InvitationService,
    templates: TemplateService,
    sweep_interval: Duration,
}

impl Engine {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        gateway: Arc<dyn GatewayAdapter>,
        renderer: Arc<dyn DocumentRenderer>,
        config: &StaydeskConfig,
    ) -> Self {
        let dispatcher = Dispatcher::new(storage.clone(), gateway.clone(), config.render.clone());
        let scheduler = Arc::new(Scheduler::new(storage.clone(), dispatcher, &config.engine));
        let contracts = ContractLifecycle::new(
            storage.clone(),
            renderer,
            scheduler.clone(),
            config.render.clone(),
            config.documents.clone(),
        );
        let invitations = InvitationService::new(
            storage.clone(),
            gateway,
            config.invitations.clone(),
            config.engine.fanout_concurrency,
        );
        let templates = TemplateService::new(storage, config.render.clone());

        Self {
            scheduler,
            contracts,
            invitations,
            templates,
            sweep_interval: Duration::from_secs(config.engine.sweep_interval_secs),
        }
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn contracts(&self) -> &ContractLifecycle {
        &self.contracts
    }

    pub fn invitations(&self) -> &InvitationService {
        &self.invitations
    }

    pub fn templates(&self) -> &TemplateService {
        &self.templates
    }

    /// Spawn the periodic sweep. It stops when `cancel` fires.
    pub fn spawn_sweeper(&self, cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
        tokio::spawn(sweeper::run_sweeper(
            self.scheduler.clone(),
            self.sweep_interval,
            cancel,
        ))
    }
}
