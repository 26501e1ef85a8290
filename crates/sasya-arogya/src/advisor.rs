//! Rule-based insurance advice for crop diseases.

use serde::{Deserialize, Serialize};

use crate::types::{PolicyDetails, PremiumBreakdown};

/// A coverage plan suggested for a disease.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoveragePlan {
    pub provider: String,
    pub coverage: String,
    pub premium: String,
}

/// Advice text plus the plans it was built from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub recommendation_text: String,
    pub coverage_plans: Vec<CoveragePlan>,
}

const DISEASE_PLANS: &[(&str, &[(&str, &str, &str)])] = &[
    (
        "powdery mildew",
        &[
            ("AgriShield", "Rs 50,000", "Rs 500/year"),
            ("CropCare", "Rs 75,000", "Rs 650/year"),
        ],
    ),
    ("leaf spot", &[("FarmSecure", "Rs 40,000", "Rs 400/year")]),
    ("rust", &[("GreenGuard", "Rs 60,000", "Rs 550/year")]),
];

static GENERAL_PLAN: (&str, &str, &str) = ("General AgriPlan", "Rs 30,000", "Rs 300/year");

/// Coverage plans for a disease; unknown diseases get the general plan.
pub fn plans_for(disease: &str) -> Vec<CoveragePlan> {
    let key = disease.trim().to_lowercase();
    let plans = DISEASE_PLANS
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, plans)| *plans)
        .unwrap_or(std::slice::from_ref(&GENERAL_PLAN));

    plans
        .iter()
        .map(|(provider, coverage, premium)| CoveragePlan {
            provider: provider.to_string(),
            coverage: coverage.to_string(),
            premium: premium.to_string(),
        })
        .collect()
}

/// Compose the advice for a farmer whose crop shows `disease`.
pub fn recommend(
    disease: &str,
    breakdown: &PremiumBreakdown,
    policy: &PolicyDetails,
) -> Recommendation {
    let plans = plans_for(disease);
    let mut text = format!(
        "{farmer}, your {crop} crop in {state} shows signs of {disease}. \
         Enrol {area} ha under PMFBY with {insurer} before {cut_off}. \
         Estimated premium Rs {total:.2}: you pay Rs {farmer_pays:.2}, \
         the government pays Rs {govt_pays:.2}.",
        farmer = policy.farmer_name,
        crop = breakdown.crop,
        state = breakdown.state,
        disease = disease.trim(),
        area = breakdown.area_hectare,
        insurer = policy.insurance_company_name,
        cut_off = policy.cut_off_date,
        total = policy.crop_details.premium_paid_by_farmer + policy.crop_details.premium_paid_by_govt,
        farmer_pays = policy.crop_details.premium_paid_by_farmer,
        govt_pays = policy.crop_details.premium_paid_by_govt,
    );

    text.push_str(" Additional disease cover:");
    for plan in &plans {
        text.push_str(&format!(
            " {} ({} cover, {});",
            plan.provider, plan.coverage, plan.premium
        ));
    }
    if text.ends_with(';') {
        text.pop();
        text.push('.');
    }

    Recommendation {
        recommendation_text: text,
        coverage_plans: plans,
    }
}
