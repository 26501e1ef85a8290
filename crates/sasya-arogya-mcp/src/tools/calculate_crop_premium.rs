//! Tool `calculate_crop_premium`: premium split for a crop, area and state.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use sasya_arogya::{premium_for, PremiumBreakdown, ReferenceData};

use crate::protocol::{FieldType, Progress, Schema, ValidatedArguments};
use crate::types::ToolError;

use super::{ToolContext, ToolDescriptor, ToolHandler};

pub const NAME: &str = "calculate_crop_premium";

#[derive(Debug, Deserialize)]
struct PremiumParams {
    crop: String,
    area_hectare: f64,
    state: String,
}

pub fn schema() -> Schema {
    Schema::new()
        .required("crop", FieldType::String, "Name of the crop")
        .required("area_hectare", FieldType::Number, "Area in hectares")
        .required("state", FieldType::String, "State where the crop is grown")
}

pub fn descriptor(ctx: &ToolContext) -> ToolDescriptor {
    ToolDescriptor::new(
        NAME,
        "Calculate insurance premium for a specific crop and area",
        schema(),
        CalculateCropPremium {
            reference: Arc::clone(&ctx.reference),
        },
    )
}

pub struct CalculateCropPremium {
    reference: Arc<dyn ReferenceData>,
}

/// Payload shared with `recommend_insurance`'s progress stages.
pub(crate) fn premium_payload(b: &PremiumBreakdown) -> Value {
    json!({
        "crop": b.crop,
        "state": b.state,
        "season": b.season.to_string(),
        "area_hectare": b.area_hectare,
        "sum_insured": b.sum_insured,
        "actuarial_rate_percent": b.actuarial_rate_percent,
        "farmer_share_percent": b.farmer_share_percent,
        "premium_per_hectare": b.premium_per_hectare,
        "total_premium": b.total_premium,
        "subsidy": b.subsidy,
        "farmer_contribution": b.farmer_contribution,
        "summary": format!(
            "Premium calculation for {} in {}: area {} ha, premium per hectare Rs {:.2}, \
             total premium Rs {:.2}, government subsidy Rs {:.2}, farmer contribution Rs {:.2}",
            b.crop,
            b.state,
            b.area_hectare,
            b.premium_per_hectare,
            b.total_premium,
            b.subsidy,
            b.farmer_contribution
        ),
    })
}

#[async_trait]
impl ToolHandler for CalculateCropPremium {
    async fn call(&self, args: ValidatedArguments, _progress: Progress) -> Result<Value, ToolError> {
        let params: PremiumParams = args.into_params()?;
        let breakdown = premium_for(
            self.reference.as_ref(),
            &params.crop,
            params.area_hectare,
            &params.state,
        )?;
        Ok(premium_payload(&breakdown))
    }
}
