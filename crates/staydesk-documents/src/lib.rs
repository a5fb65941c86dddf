// SPDX-FileCopyrightText: 2026 Staydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Contract document rendering.
//!
//! [`HtmlRenderer`] writes each rendered contract as a standalone HTML file
//! named `{contract_id}-{uuid}.html` under the configured output directory.
//! Handles are the file names; they are never reused, so a regenerated
//! document does not overwrite the one it replaces.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use staydesk_config::model::DocumentsConfig;
use staydesk_core::types::{AdapterType, ContractDocument, DocumentHandle, HealthStatus};
use staydesk_core::{DocumentRenderer, PluginAdapter, StaydeskError};
use tracing::debug;

pub struct HtmlRenderer {
    output_dir: PathBuf,
    public_base_url: String,
}

impl HtmlRenderer {
    pub fn new(config: &DocumentsConfig) -> Self {
        Self {
            output_dir: PathBuf::from(&config.output_dir),
            public_base_url: config.public_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// On-disk location of a handle. Rejects anything that is not a plain
    /// file name.
    pub fn path_for(&self, handle: &DocumentHandle) -> Result<PathBuf, StaydeskError> {
        check_handle(handle)?;
        Ok(self.output_dir.join(&handle.0))
    }

    /// Read back a rendered document.
    pub async fn load(&self, handle: &DocumentHandle) -> Result<String, StaydeskError> {
        let path = self.path_for(handle)?;
        tokio::fs::read_to_string(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StaydeskError::not_found("document", handle.0.clone())
            } else {
                renderer_error(format!("failed to read {}", path.display()), e)
            }
        })
    }
}

pub fn check_handle(handle: &DocumentHandle) -> Result<(), StaydeskError> {
    let name = handle.0.as_str();
    let plain = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        && !name.starts_with('.');
    if plain {
        Ok(())
    } else {
        Err(StaydeskError::Validation(format!(
            "invalid document handle `{name}`"
        )))
    }
}

fn renderer_error(message: String, source: std::io::Error) -> StaydeskError {
    StaydeskError::Renderer {
        message,
        source: Some(Box::new(source)),
    }
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn to_html(document: &ContractDocument, signature_url: Option<&str>) -> String {
    let title = escape(&document.title);
    let paragraphs: String = document
        .body
        .split("\n\n")
        .filter(|p| !p.trim().is_empty())
        .map(|p| format!("<p>{}</p>\n", escape(p.trim()).replace('\n', "<br>")))
        .collect();
    let signature = match signature_url {
        Some(url) => format!(
            "<figure class=\"signature\"><img src=\"{}\" alt=\"Guest signature\"></figure>\n",
            escape(url)
        ),
        None => String::new(),
    };
    format!(
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>{title}</title></head>\n\
         <body>\n<h1>{title}</h1>\n{paragraphs}{signature}</body>\n</html>\n"
    )
}

#[async_trait]
impl PluginAdapter for HtmlRenderer {
    fn name(&self) -> &str {
        "html"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Renderer
    }

    async fn health_check(&self) -> Result<HealthStatus, StaydeskError> {
        Ok(match tokio::fs::metadata(&self.output_dir).await {
            Ok(meta) if meta.is_dir() => HealthStatus::Healthy,
            Ok(_) => HealthStatus::Unhealthy("output path is not a directory".into()),
            Err(_) => HealthStatus::Degraded("output directory not created yet".into()),
        })
    }

    async fn shutdown(&self) -> Result<(), StaydeskError> {
        Ok(())
    }
}

#[async_trait]
impl DocumentRenderer for HtmlRenderer {
    async fn render(
        &self,
        document: &ContractDocument,
        signature: Option<&DocumentHandle>,
    ) -> Result<DocumentHandle, StaydeskError> {
        let signature_url = signature.map(|s| self.retrieval_url(s)).transpose()?;
        let html = to_html(document, signature_url.as_deref());

        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|e| renderer_error(format!("failed to create {}", self.output_dir.display()), e))?;

        let handle = DocumentHandle(format!("{}-{}.html", document.contract_id, uuid::Uuid::new_v4()));
        let path = self.path_for(&handle)?;
        tokio::fs::write(&path, html)
            .await
            .map_err(|e| renderer_error(format!("failed to write {}", path.display()), e))?;
        debug!(contract_id = %document.contract_id, %handle, "document rendered");
        Ok(handle)
    }

    fn retrieval_url(&self, handle: &DocumentHandle) -> Result<String, StaydeskError> {
        check_handle(handle)?;
        Ok(format!("{}/{}", self.public_base_url, handle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn renderer(dir: &Path) -> HtmlRenderer {
        HtmlRenderer::new(&DocumentsConfig {
            output_dir: dir.join("docs").to_string_lossy().into_owned(),
            public_base_url: "https://files.test/documents/".into(),
            ..DocumentsConfig::default()
        })
    }

    fn document() -> ContractDocument {
        ContractDocument {
            contract_id: "c1".into(),
            title: "Rental <agreement>".into(),
            body: "Between Nadia & Amel.\n\nCheck-in 10/06/2024.".into(),
        }
    }

    #[tokio::test]
    async fn renders_escaped_html_to_a_new_file() {
        let dir = tempfile::tempdir().unwrap();
        let r = renderer(dir.path());
        let handle = r.render(&document(), None).await.unwrap();
        assert!(handle.0.starts_with("c1-") && handle.0.ends_with(".html"));

        let html = r.load(&handle).await.unwrap();
        assert!(html.contains("<h1>Rental &lt;agreement&gt;</h1>"));
        assert!(html.contains("<p>Between Nadia &amp; Amel.</p>"));
        assert!(html.contains("<p>Check-in 10/06/2024.</p>"));
        assert!(!html.contains("signature"));

        let second = r.render(&document(), None).await.unwrap();
        assert_ne!(handle, second);
    }

    #[tokio::test]
    async fn signed_render_embeds_signature_url() {
        let dir = tempfile::tempdir().unwrap();
        let r = renderer(dir.path());
        let sig = DocumentHandle("sig-c1.png".into());
        let handle = r.render(&document(), Some(&sig)).await.unwrap();
        let html = r.load(&handle).await.unwrap();
        assert!(html.contains("https://files.test/documents/sig-c1.png"));
    }

    #[test]
    fn retrieval_url_joins_base_and_handle() {
        let dir = tempfile::tempdir().unwrap();
        let url = renderer(dir.path())
            .retrieval_url(&DocumentHandle("c1-x.html".into()))
            .unwrap();
        assert_eq!(url, "https://files.test/documents/c1-x.html");
    }

    #[test]
    fn path_traversal_handles_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let r = renderer(dir.path());
        for bad in ["../etc/passwd", "a/b.html", "", ".hidden"] {
            assert!(r.path_for(&DocumentHandle(bad.into())).is_err(), "{bad}");
        }
    }

    #[tokio::test]
    async fn loading_unknown_handle_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = renderer(dir.path())
            .load(&DocumentHandle("nope.html".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, StaydeskError::NotFound { .. }));
    }
}
