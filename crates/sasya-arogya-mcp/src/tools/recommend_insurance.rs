//! Tool `recommend_insurance`: premium, insurer and disease cover advice for
//! a farmer, rendered as a PDF.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

use sasya_arogya::{
    insurer_for, policy_details, premium_for, recommend, ReferenceData, Renderer,
    RECOMMENDATION_TEMPLATE,
};

use crate::protocol::{FieldType, Progress, Schema, ValidatedArguments};
use crate::types::ToolError;

use super::calculate_crop_premium::premium_payload;
use super::{document_payload, render_document, ToolContext, ToolDescriptor, ToolHandler};

pub const NAME: &str = "recommend_insurance";

#[derive(Debug, Deserialize)]
struct RecommendParams {
    disease: String,
    farmer_name: String,
    state: String,
    area_hectare: f64,
    crop: String,
}

pub fn schema() -> Schema {
    Schema::new()
        .required(
            "disease",
            FieldType::String,
            "Name of the plant disease affecting the crop",
        )
        .required("farmer_name", FieldType::String, "Name of the farmer")
        .required("state", FieldType::String, "State where the farmer is located")
        .required(
            "area_hectare",
            FieldType::Number,
            "Area of cultivation in hectares",
        )
        .required("crop", FieldType::String, "Name of the crop being cultivated")
}

pub fn descriptor(ctx: &ToolContext) -> ToolDescriptor {
    ToolDescriptor::new(
        NAME,
        "Recommend insurance for a farmer based on crop, disease, and location",
        schema(),
        RecommendInsurance {
            reference: Arc::clone(&ctx.reference),
            renderer: Arc::clone(&ctx.renderer),
        },
    )
}

pub struct RecommendInsurance {
    reference: Arc<dyn ReferenceData>,
    renderer: Arc<dyn Renderer>,
}

#[async_trait]
impl ToolHandler for RecommendInsurance {
    async fn call(&self, args: ValidatedArguments, progress: Progress) -> Result<Value, ToolError> {
        let params: RecommendParams = args.into_params()?;

        let breakdown = premium_for(
            self.reference.as_ref(),
            &params.crop,
            params.area_hectare,
            &params.state,
        )?;
        progress
            .emit(json!({ "stage": "premium_calculated", "premium": premium_payload(&breakdown) }))
            .await?;

        let (insurer, gross_premium) =
            insurer_for(self.reference.as_ref(), &params.state, &breakdown)?;
        let policy = policy_details(
            &breakdown,
            insurer,
            gross_premium,
            &params.farmer_name,
            Utc::now(),
        )?;
        progress
            .emit(json!({
                "stage": "insurer_selected",
                "insurer": insurer,
                "gross_premium": gross_premium,
            }))
            .await?;

        let advice = recommend(&params.disease, &breakdown, &policy);
        let fields = json!({
            "farmer_name": policy.farmer_name,
            "disease": params.disease.trim(),
            "recommendation": advice.recommendation_text,
            "policy": policy,
            "coverage_plans": advice.coverage_plans,
        });
        progress
            .emit(json!({
                "stage": "recommendation_ready",
                "recommendation_text": advice.recommendation_text,
            }))
            .await?;

        let pdf = render_document(&self.renderer, RECOMMENDATION_TEMPLATE, fields).await?;

        Ok(json!({
            "recommendation_text": advice.recommendation_text,
            "coverage_plans": advice.coverage_plans,
            "policy": policy,
            "document": document_payload(&pdf),
        }))
    }
}
