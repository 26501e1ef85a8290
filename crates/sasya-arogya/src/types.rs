//! Core data types for crop insurance reference data and premium results.

use serde::{Deserialize, Serialize};

/// Cropping season of a reference row. Determines the farmer's premium share.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Season {
    Kharif,
    Rabi,
    /// Annual commercial and horticultural crops.
    Horticulture,
    #[serde(other)]
    Other,
}

impl std::fmt::Display for Season {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Season::Kharif => write!(f, "Kharif"),
            Season::Rabi => write!(f, "Rabi"),
            Season::Horticulture => write!(f, "Horticulture"),
            Season::Other => write!(f, "Other"),
        }
    }
}

/// One row of the crop premium table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CropPremiumRow {
    pub crop: String,
    /// `None` marks a national row used when no state-specific row exists.
    #[serde(default)]
    pub state: Option<String>,
    pub season: Season,
    /// Sum insured per hectare (Rs/ha).
    pub scale_of_finance: f64,
    pub actuarial_rate_percent: f64,
}

/// One registered insurer from the company directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyRecord {
    pub name: String,
    pub address: String,
    pub state: String,
    /// Insurer-specific multiplier applied to the actuarial gross premium.
    pub rate_multiplier: f64,
}

/// Premium split for one crop, state, and area.
///
/// `farmer_contribution + subsidy == total_premium` and
/// `total_premium == premium_per_hectare * area_hectare`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PremiumBreakdown {
    pub crop: String,
    pub state: String,
    pub season: Season,
    pub area_hectare: f64,
    pub sum_insured: f64,
    pub actuarial_rate_percent: f64,
    pub farmer_share_percent: f64,
    pub premium_per_hectare: f64,
    pub total_premium: f64,
    pub subsidy: f64,
    pub farmer_contribution: f64,
}

/// Crop section of a policy certificate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CropDetails {
    pub name: String,
    pub area_hectare: f64,
    pub premium_paid_by_farmer: f64,
    pub premium_paid_by_govt: f64,
    pub total_sum_insured: f64,
}

/// Everything printed on an insurance certificate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyDetails {
    pub policy_id: String,
    pub farmer_name: String,
    pub farmer_id: String,
    pub insurance_company_name: String,
    pub company_address: String,
    pub sum_insured_per_hectare: f64,
    pub farmer_share_percent: f64,
    pub actuarial_rate_percent: f64,
    pub cut_off_date: String,
    pub crop_details: CropDetails,
    pub terms_and_conditions: Vec<String>,
}

/// Errors that can occur in the insurance library.
#[derive(thiserror::Error, Debug)]
pub enum InsuranceError {
    #[error("Reference data error: {0}")]
    ReferenceData(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Render error: {0}")]
    Render(String),
}

/// Convenience result type.
pub type InsuranceResult<T> = Result<T, InsuranceError>;
