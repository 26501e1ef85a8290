//! Tool `generate_insurance_certificate`: render a policy certificate PDF.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use sasya_arogya::{PolicyDetails, Renderer, CERTIFICATE_TEMPLATE};

use crate::protocol::{FieldType, Progress, Schema, ValidatedArguments};
use crate::types::ToolError;

use super::{document_payload, render_document, ToolContext, ToolDescriptor, ToolHandler};

pub const NAME: &str = "generate_insurance_certificate";

pub fn schema() -> Schema {
    Schema::new()
        .required("policy_id", FieldType::String, "Unique policy identifier")
        .required("farmer_name", FieldType::String, "Name of the farmer")
        .required("farmer_id", FieldType::String, "Farmer identification number")
        .required(
            "insurance_company_name",
            FieldType::String,
            "Name of the insurance company",
        )
        .required(
            "company_address",
            FieldType::String,
            "Address of the insurance company",
        )
        .required(
            "sum_insured_per_hectare",
            FieldType::Number,
            "Sum insured per hectare in rupees",
        )
        .required(
            "farmer_share_percent",
            FieldType::Number,
            "Farmer's share percentage",
        )
        .required(
            "actuarial_rate_percent",
            FieldType::Number,
            "Actuarial rate percentage",
        )
        .required("cut_off_date", FieldType::String, "Cut-off date for the policy")
        .required(
            "crop_details",
            FieldType::Object,
            "Crop name, area, premium split and total sum insured",
        )
        .required(
            "terms_and_conditions",
            FieldType::Array,
            "List of terms and conditions",
        )
}

pub fn descriptor(ctx: &ToolContext) -> ToolDescriptor {
    ToolDescriptor::new(
        NAME,
        "Generate an insurance certificate PDF for a farmer",
        schema(),
        GenerateInsuranceCertificate {
            renderer: Arc::clone(&ctx.renderer),
        },
    )
}

pub struct GenerateInsuranceCertificate {
    renderer: Arc<dyn Renderer>,
}

#[async_trait]
impl ToolHandler for GenerateInsuranceCertificate {
    async fn call(&self, args: ValidatedArguments, progress: Progress) -> Result<Value, ToolError> {
        // Typed pass checks the nested crop_details and terms shapes.
        let policy: PolicyDetails = args.into_params()?;
        let fields = serde_json::to_value(&policy)
            .map_err(|e| ToolError::Internal(e.to_string()))?;

        progress
            .emit(json!({ "stage": "rendering", "policy_id": policy.policy_id }))
            .await?;
        let pdf = render_document(&self.renderer, CERTIFICATE_TEMPLATE, fields).await?;

        Ok(json!({
            "policy_id": policy.policy_id,
            "message": format!(
                "Insurance certificate generated successfully. PDF size: {} bytes",
                pdf.len()
            ),
            "document": document_payload(&pdf),
        }))
    }
}
