// SPDX-FileCopyrightText: 2026 Staydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Document renderer for signable contracts.

use async_trait::async_trait;

use crate::error::StaydeskError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ContractDocument, DocumentHandle};

#[async_trait]
pub trait DocumentRenderer: PluginAdapter {
    /// Render a document, optionally embedding a previously captured signature.
    async fn render(
        &self,
        document: &ContractDocument,
        signature: Option<&DocumentHandle>,
    ) -> Result<DocumentHandle, StaydeskError>;

    /// Public URL a client can fetch the rendered document from.
    fn retrieval_url(&self, handle: &DocumentHandle) -> Result<String, StaydeskError>;
}
