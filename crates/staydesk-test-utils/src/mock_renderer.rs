// SPDX-FileCopyrightText: 2026 Staydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock document renderer with predictable handles.

use async_trait::async_trait;
use tokio::sync::Mutex;

use staydesk_core::traits::adapter::PluginAdapter;
use staydesk_core::traits::renderer::DocumentRenderer;
use staydesk_core::types::{AdapterType, ContractDocument, DocumentHandle, HealthStatus};
use staydesk_core::StaydeskError;

/// A rendered document as the mock saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    pub handle: DocumentHandle,
    pub document: ContractDocument,
    pub signature: Option<DocumentHandle>,
}

/// Hands out `{contract_id}-v{n}` handles, with `-signed` appended when a
/// signature is embedded.
#[derive(Default)]
pub struct MockRenderer {
    rendered: Mutex<Vec<RenderedDocument>>,
    fail_next: Mutex<bool>,
}

impl MockRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `render` call fail.
    pub async fn fail_next(&self) {
        *self.fail_next.lock().await = true;
    }

    pub async fn rendered(&self) -> Vec<RenderedDocument> {
        self.rendered.lock().await.clone()
    }
}

#[async_trait]
impl PluginAdapter for MockRenderer {
    fn name(&self) -> &str {
        "mock-renderer"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Renderer
    }

    async fn health_check(&self) -> Result<HealthStatus, StaydeskError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), StaydeskError> {
        Ok(())
    }
}

#[async_trait]
impl DocumentRenderer for MockRenderer {
    async fn render(
        &self,
        document: &ContractDocument,
        signature: Option<&DocumentHandle>,
    ) -> Result<DocumentHandle, StaydeskError> {
        {
            let mut fail = self.fail_next.lock().await;
            if *fail {
                *fail = false;
                return Err(StaydeskError::Renderer {
                    message: "mock renderer failure".into(),
                    source: None,
                });
            }
        }

        let mut rendered = self.rendered.lock().await;
        let version = rendered
            .iter()
            .filter(|r| r.document.contract_id == document.contract_id)
            .count()
            + 1;
        let suffix = if signature.is_some() { "-signed" } else { "" };
        let handle = DocumentHandle(format!("{}-v{version}{suffix}", document.contract_id));
        rendered.push(RenderedDocument {
            handle: handle.clone(),
            document: document.clone(),
            signature: signature.cloned(),
        });
        Ok(handle)
    }

    fn retrieval_url(&self, handle: &DocumentHandle) -> Result<String, StaydeskError> {
        Ok(format!("https://docs.test/{handle}"))
    }
}
