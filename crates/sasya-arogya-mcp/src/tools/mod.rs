//! Insurance tools and the registry that serves them.

pub mod calculate_crop_premium;
pub mod generate_insurance_certificate;
pub mod get_insurance_companies;
pub mod handler;
pub mod recommend_insurance;
pub mod registry;

use std::sync::Arc;

use base64::Engine;
use serde_json::{json, Value};

use sasya_arogya::{InsuranceError, PdfRenderer, ReferenceData, ReferenceTables, Renderer};

use crate::types::ToolError;

pub use handler::ToolHandler;
pub use registry::{ToolDescriptor, ToolRegistry};

/// Collaborators injected into the tool handlers.
#[derive(Clone)]
pub struct ToolContext {
    pub reference: Arc<dyn ReferenceData>,
    pub renderer: Arc<dyn Renderer>,
}

impl ToolContext {
    pub fn new(reference: Arc<dyn ReferenceData>, renderer: Arc<dyn Renderer>) -> Self {
        Self {
            reference,
            renderer,
        }
    }

    /// Reference tables with the PDF renderer.
    pub fn with_tables(tables: ReferenceTables) -> Self {
        Self::new(Arc::new(tables), Arc::new(PdfRenderer::new()))
    }
}

/// Wire form of a rendered PDF.
pub fn document_payload(bytes: &[u8]) -> Value {
    json!({
        "mime_type": "application/pdf",
        "encoding": "base64",
        "size_bytes": bytes.len(),
        "data": base64::engine::general_purpose::STANDARD.encode(bytes),
    })
}

/// Render on the blocking pool.
pub(crate) async fn render_document(
    renderer: &Arc<dyn Renderer>,
    template_id: &'static str,
    fields: Value,
) -> Result<Vec<u8>, ToolError> {
    let renderer = Arc::clone(renderer);
    tokio::task::spawn_blocking(move || renderer.render(template_id, &fields))
        .await
        .map_err(|e| ToolError::Internal(format!("render task failed: {e}")))?
        .map_err(|e| match e {
            InsuranceError::Render(msg) => ToolError::Render(msg),
            other => ToolError::Render(other.to_string()),
        })
}
