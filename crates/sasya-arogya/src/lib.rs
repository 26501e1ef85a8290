//! Sasya Arogya crop insurance domain library: reference tables, premium
//! arithmetic, disease advisories, and certificate rendering.

pub mod advisor;
pub mod pdf;
pub mod premium;
pub mod reference;
pub mod render;
pub mod types;

pub use advisor::{plans_for, recommend, CoveragePlan, Recommendation};
pub use premium::{calculate_premium, farmer_share, insurer_for, policy_details, premium_for};
pub use reference::{ReferenceData, ReferenceTables};
pub use render::{PdfRenderer, Renderer, CERTIFICATE_TEMPLATE, RECOMMENDATION_TEMPLATE};
pub use types::*;
