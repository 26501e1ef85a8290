//! Tool `get_insurance_companies`: insurer directory, optionally by state.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use sasya_arogya::ReferenceData;

use crate::protocol::{FieldType, Progress, Schema, ValidatedArguments};
use crate::types::ToolError;

use super::{ToolContext, ToolDescriptor, ToolHandler};

pub const NAME: &str = "get_insurance_companies";

#[derive(Debug, Deserialize)]
struct CompaniesParams {
    #[serde(default)]
    state: Option<String>,
}

pub fn schema() -> Schema {
    Schema::new().optional(
        "state",
        FieldType::String,
        "State to filter companies (optional)",
    )
}

pub fn descriptor(ctx: &ToolContext) -> ToolDescriptor {
    ToolDescriptor::new(
        NAME,
        "Get list of available insurance companies",
        schema(),
        GetInsuranceCompanies {
            reference: Arc::clone(&ctx.reference),
        },
    )
}

pub struct GetInsuranceCompanies {
    reference: Arc<dyn ReferenceData>,
}

#[async_trait]
impl ToolHandler for GetInsuranceCompanies {
    async fn call(&self, args: ValidatedArguments, progress: Progress) -> Result<Value, ToolError> {
        let params: CompaniesParams = args.into_params()?;
        let companies: Vec<Value> = self
            .reference
            .companies(params.state.as_deref())
            .into_iter()
            .map(|c| json!(c))
            .collect();

        for company in &companies {
            progress.emit(company.clone()).await?;
        }

        Ok(json!({
            "state": params.state,
            "total": companies.len(),
            "companies": companies,
        }))
    }
}
