//! In-memory reference tables: crop premium rows and the insurer directory.

use std::collections::HashMap;
use std::path::Path;

use crate::types::{CompanyRecord, CropPremiumRow, InsuranceError, InsuranceResult};

/// File name of the crop premium table inside a data directory.
pub const CROP_TABLE_FILE: &str = "crop_premiums.json";

/// File name of the insurer directory inside a data directory.
pub const COMPANY_TABLE_FILE: &str = "insurance_companies.json";

const BUILTIN_CROPS: &str = include_str!("../data/crop_premiums.json");
const BUILTIN_COMPANIES: &str = include_str!("../data/insurance_companies.json");

/// Read-only lookup over reference data.
pub trait ReferenceData: Send + Sync {
    /// Premium row for a crop in a state, falling back to the crop's national row.
    fn crop_premium(&self, crop: &str, state: &str) -> Option<&CropPremiumRow>;

    /// Insurers registered in `state`, or every insurer when `state` is `None`.
    fn companies(&self, state: Option<&str>) -> Vec<&CompanyRecord>;
}

/// Immutable index over both reference tables, built once at startup.
#[derive(Debug, Clone)]
pub struct ReferenceTables {
    crops: Vec<CropPremiumRow>,
    by_crop_state: HashMap<(String, String), usize>,
    by_crop: HashMap<String, usize>,
    companies: Vec<CompanyRecord>,
    by_state: HashMap<String, Vec<usize>>,
}

fn normalize(key: &str) -> String {
    key.trim().to_lowercase()
}

fn usable_number(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

impl ReferenceTables {
    /// Build the index. Rows with unusable numeric fields are skipped.
    pub fn new(crops: Vec<CropPremiumRow>, companies: Vec<CompanyRecord>) -> Self {
        let crops: Vec<CropPremiumRow> = crops
            .into_iter()
            .filter(|row| {
                let ok = usable_number(row.scale_of_finance)
                    && usable_number(row.actuarial_rate_percent);
                if !ok {
                    tracing::warn!("Skipping crop row with unusable numbers: {}", row.crop);
                }
                ok
            })
            .collect();

        let mut by_crop_state = HashMap::new();
        let mut by_crop = HashMap::new();
        for (idx, row) in crops.iter().enumerate() {
            let crop = normalize(&row.crop);
            match &row.state {
                Some(state) => {
                    by_crop_state.entry((crop, normalize(state))).or_insert(idx);
                }
                None => {
                    by_crop.entry(crop).or_insert(idx);
                }
            }
        }

        let companies: Vec<CompanyRecord> = companies
            .into_iter()
            .filter(|c| {
                let ok = usable_number(c.rate_multiplier);
                if !ok {
                    tracing::warn!("Skipping insurer with unusable rate multiplier: {}", c.name);
                }
                ok
            })
            .collect();

        let mut by_state: HashMap<String, Vec<usize>> = HashMap::new();
        for (idx, company) in companies.iter().enumerate() {
            by_state.entry(normalize(&company.state)).or_default().push(idx);
        }

        Self {
            crops,
            by_crop_state,
            by_crop,
            companies,
            by_state,
        }
    }

    /// Parse both tables from JSON text.
    pub fn from_json(crops_json: &str, companies_json: &str) -> InsuranceResult<Self> {
        let crops: Vec<CropPremiumRow> = serde_json::from_str(crops_json)
            .map_err(|e| InsuranceError::ReferenceData(format!("crop table: {e}")))?;
        let companies: Vec<CompanyRecord> = serde_json::from_str(companies_json)
            .map_err(|e| InsuranceError::ReferenceData(format!("company table: {e}")))?;
        Ok(Self::new(crops, companies))
    }

    /// Tables compiled into the binary.
    pub fn builtin() -> InsuranceResult<Self> {
        Self::from_json(BUILTIN_CROPS, BUILTIN_COMPANIES)
    }

    /// Load `crop_premiums.json` and `insurance_companies.json` from a directory.
    pub fn load_dir(dir: &Path) -> InsuranceResult<Self> {
        let read = |name: &str| {
            let path = dir.join(name);
            std::fs::read_to_string(&path).map_err(|e| {
                InsuranceError::ReferenceData(format!("Failed to read {}: {e}", path.display()))
            })
        };
        let tables = Self::from_json(&read(CROP_TABLE_FILE)?, &read(COMPANY_TABLE_FILE)?)?;
        tracing::info!(
            "Loaded reference data from {}: {} crop rows, {} insurers",
            dir.display(),
            tables.crop_count(),
            tables.company_count()
        );
        Ok(tables)
    }

    /// Whether `dir` contains both table files.
    pub fn dir_has_tables(dir: &Path) -> bool {
        dir.join(CROP_TABLE_FILE).is_file() && dir.join(COMPANY_TABLE_FILE).is_file()
    }

    pub fn crop_count(&self) -> usize {
        self.crops.len()
    }

    pub fn company_count(&self) -> usize {
        self.companies.len()
    }
}

impl ReferenceData for ReferenceTables {
    fn crop_premium(&self, crop: &str, state: &str) -> Option<&CropPremiumRow> {
        let crop = normalize(crop);
        self.by_crop_state
            .get(&(crop.clone(), normalize(state)))
            .or_else(|| self.by_crop.get(&crop))
            .map(|&idx| &self.crops[idx])
    }

    fn companies(&self, state: Option<&str>) -> Vec<&CompanyRecord> {
        match state {
            None => self.companies.iter().collect(),
            Some(state) => self
                .by_state
                .get(&normalize(state))
                .map(|ids| ids.iter().map(|&idx| &self.companies[idx]).collect())
                .unwrap_or_default(),
        }
    }
}
