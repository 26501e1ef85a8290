//! Document rendering: template ids, the `Renderer` seam, and the PDF renderer.

use serde_json::Value;

use crate::pdf::write_text_pdf;
use crate::types::{InsuranceError, InsuranceResult};

/// Template for `generate_insurance_certificate`.
pub const CERTIFICATE_TEMPLATE: &str = "insurance_certificate";

/// Template for `recommend_insurance`.
pub const RECOMMENDATION_TEMPLATE: &str = "insurance_recommendation";

/// Turns structured fields into a binary document.
pub trait Renderer: Send + Sync {
    fn render(&self, template_id: &str, fields: &Value) -> InsuranceResult<Vec<u8>>;
}

/// Renders fields as a plain text PDF, one `label: value` line per field.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfRenderer;

impl PdfRenderer {
    pub fn new() -> Self {
        Self
    }
}

fn template_title(template_id: &str) -> Option<&'static str> {
    match template_id {
        CERTIFICATE_TEMPLATE => Some("Pradhan Mantri Fasal Bima Yojana - Insurance Certificate"),
        RECOMMENDATION_TEMPLATE => Some("Sasya Arogya - Crop Insurance Recommendation"),
        _ => None,
    }
}

impl Renderer for PdfRenderer {
    fn render(&self, template_id: &str, fields: &Value) -> InsuranceResult<Vec<u8>> {
        let title = template_title(template_id)
            .ok_or_else(|| InsuranceError::Render(format!("Unknown template: {template_id}")))?;
        let Value::Object(map) = fields else {
            return Err(InsuranceError::Render(
                "Template fields must be an object".to_string(),
            ));
        };

        let mut lines = Vec::new();
        for (key, value) in map {
            layout_field(&mut lines, 0, key, value);
        }
        Ok(write_text_pdf(title, &lines))
    }
}

fn label(key: &str) -> String {
    key.split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if f.fract() != 0.0 => format!("{f:.2}"),
            _ => n.to_string(),
        },
        Value::Bool(b) => (if *b { "Yes" } else { "No" }).to_string(),
        Value::Null => "-".to_string(),
        other => other.to_string(),
    }
}

fn layout_field(lines: &mut Vec<String>, depth: usize, key: &str, value: &Value) {
    let indent = "    ".repeat(depth);
    match value {
        Value::Object(map) => {
            lines.push(format!("{indent}{}:", label(key)));
            for (k, v) in map {
                layout_field(lines, depth + 1, k, v);
            }
        }
        Value::Array(items) => {
            lines.push(format!("{indent}{}:", label(key)));
            for (i, item) in items.iter().enumerate() {
                match item {
                    Value::Object(_) | Value::Array(_) => {
                        layout_field(lines, depth + 1, &format!("item_{}", i + 1), item)
                    }
                    _ => lines.push(format!("{indent}    {}. {}", i + 1, scalar(item))),
                }
            }
        }
        _ => lines.push(format!("{indent}{}: {}", label(key), scalar(value))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_certificate() {
        let fields = json!({
            "policy_id": "PMFBY-2025-AG1234K",
            "farmer_name": "Ramesh (Senior)",
            "crop_details": { "name": "Wheat", "area_hectare": 2.5 },
            "terms_and_conditions": ["Valid for one year."]
        });
        let pdf = PdfRenderer::new().render(CERTIFICATE_TEMPLATE, &fields).unwrap();
        let text = String::from_utf8_lossy(&pdf);

        assert!(pdf.starts_with(b"%PDF-"));
        assert!(text.trim_end().ends_with("%%EOF"));
        assert!(text.contains("(Policy Id: PMFBY-2025-AG1234K) Tj"));
        assert!(text.contains("Ramesh") && text.contains("Senior"));
        assert!(text.contains("Area Hectare: 2.50"));
        assert!(text.contains("1. Valid for one year."));
    }

    #[test]
    fn test_unknown_template() {
        let err = PdfRenderer::new().render("invoice", &json!({})).unwrap_err();
        assert!(matches!(err, InsuranceError::Render(_)));
    }

    #[test]
    fn test_fields_must_be_object() {
        let err = PdfRenderer::new()
            .render(CERTIFICATE_TEMPLATE, &json!(["x"]))
            .unwrap_err();
        assert!(err.to_string().contains("must be an object"));
    }

    #[test]
    fn test_label() {
        assert_eq!(label("sum_insured_per_hectare"), "Sum Insured Per Hectare");
        assert_eq!(label("name"), "Name");
    }
}
