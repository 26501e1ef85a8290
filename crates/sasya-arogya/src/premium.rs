//! Premium arithmetic, insurer selection, and policy details.

use chrono::{DateTime, Datelike, Duration, Utc};

use crate::reference::ReferenceData;
use crate::types::{
    CompanyRecord, CropDetails, CropPremiumRow, InsuranceError, InsuranceResult, PolicyDetails,
    PremiumBreakdown, Season,
};

/// Days between policy issue and the enrolment cut-off.
const CUT_OFF_DAYS: i64 = 45;

const TERMS_AND_CONDITIONS: &[&str] = &[
    "The policy is valid for one year from the date of issuance.",
    "Claims must be reported within 30 days of the incident.",
    "The insured must follow recommended agricultural practices.",
    "The insurer reserves the right to inspect the farm before claim settlement.",
];

/// Fraction of the sum insured paid by the farmer for a season.
pub fn farmer_share(season: Season) -> f64 {
    match season {
        Season::Kharif => 0.02,
        Season::Rabi => 0.015,
        Season::Horticulture => 0.05,
        Season::Other => 0.02,
    }
}

/// Split the premium for `area_hectare` hectares of the crop in `row`.
pub fn calculate_premium(
    row: &CropPremiumRow,
    state: &str,
    area_hectare: f64,
) -> InsuranceResult<PremiumBreakdown> {
    if !area_hectare.is_finite() || area_hectare <= 0.0 {
        return Err(InsuranceError::InvalidInput(format!(
            "area_hectare must be a positive number, got {area_hectare}"
        )));
    }

    let actuarial_rate = row.actuarial_rate_percent / 100.0;
    let share = farmer_share(row.season);
    let sum_insured = row.scale_of_finance * area_hectare;
    let premium_per_hectare = row.scale_of_finance * actuarial_rate;
    let total_premium = premium_per_hectare * area_hectare;
    let farmer_contribution = (sum_insured * share).min(total_premium);
    let subsidy = total_premium - farmer_contribution;

    Ok(PremiumBreakdown {
        crop: row.crop.clone(),
        state: state.to_string(),
        season: row.season,
        area_hectare,
        sum_insured,
        actuarial_rate_percent: row.actuarial_rate_percent,
        farmer_share_percent: share * 100.0,
        premium_per_hectare,
        total_premium,
        subsidy,
        farmer_contribution,
    })
}

/// Look up the crop row and compute its premium.
pub fn premium_for(
    reference: &dyn ReferenceData,
    crop: &str,
    area_hectare: f64,
    state: &str,
) -> InsuranceResult<PremiumBreakdown> {
    let row = reference
        .crop_premium(crop, state)
        .ok_or_else(|| InsuranceError::NotFound(format!("Crop '{crop}' not found for {state}")))?;
    calculate_premium(row, state, area_hectare)
}

/// Insurer offering the lowest gross premium, with that premium.
pub fn select_insurer<'a>(
    companies: &[&'a CompanyRecord],
    breakdown: &PremiumBreakdown,
) -> Option<(&'a CompanyRecord, f64)> {
    companies
        .iter()
        .map(|c| (*c, breakdown.total_premium * c.rate_multiplier))
        .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
}

/// Insurer for a state, falling back to the whole directory.
pub fn insurer_for<'a>(
    reference: &'a dyn ReferenceData,
    state: &str,
    breakdown: &PremiumBreakdown,
) -> InsuranceResult<(&'a CompanyRecord, f64)> {
    let local = reference.companies(Some(state));
    let candidates = if local.is_empty() {
        reference.companies(None)
    } else {
        local
    };
    select_insurer(&candidates, breakdown)
        .ok_or_else(|| InsuranceError::NotFound("No insurance companies available".to_string()))
}

/// Build the full policy for a farmer.
pub fn policy_details(
    breakdown: &PremiumBreakdown,
    insurer: &CompanyRecord,
    gross_premium: f64,
    farmer_name: &str,
    issued_at: DateTime<Utc>,
) -> InsuranceResult<PolicyDetails> {
    if farmer_name.trim().is_empty() {
        return Err(InsuranceError::InvalidInput(
            "farmer_name must not be empty".to_string(),
        ));
    }

    let farmer_pays = breakdown.farmer_contribution.min(gross_premium);
    let govt_pays = gross_premium - farmer_pays;
    let (policy_id, farmer_id) = generate_ids(issued_at.year());

    Ok(PolicyDetails {
        policy_id,
        farmer_name: title_case(farmer_name),
        farmer_id,
        insurance_company_name: insurer.name.clone(),
        company_address: insurer.address.clone(),
        sum_insured_per_hectare: breakdown.sum_insured / breakdown.area_hectare,
        farmer_share_percent: breakdown.farmer_share_percent,
        actuarial_rate_percent: breakdown.actuarial_rate_percent,
        cut_off_date: (issued_at + Duration::days(CUT_OFF_DAYS))
            .format("%d-%m-%Y")
            .to_string(),
        crop_details: CropDetails {
            name: breakdown.crop.clone(),
            area_hectare: breakdown.area_hectare,
            premium_paid_by_farmer: round2(farmer_pays),
            premium_paid_by_govt: round2(govt_pays),
            total_sum_insured: round2(breakdown.sum_insured),
        },
        terms_and_conditions: TERMS_AND_CONDITIONS.iter().map(|t| t.to_string()).collect(),
    })
}

fn generate_ids(year: i32) -> (String, String) {
    let n = uuid::Uuid::new_v4().as_u128();
    let policy = 1000 + (n % 9000);
    let farmer = 100_000_000 + ((n >> 64) % 900_000_000);
    (format!("PMFBY-{year}-AG{policy}K"), format!("FKID-{farmer}"))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn title_case(name: &str) -> String {
    name.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
