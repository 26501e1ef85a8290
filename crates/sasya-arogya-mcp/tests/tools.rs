//! The four insurance tools, driven through the dispatcher.

mod common;

use std::sync::Arc;

use base64::Engine;
use serde_json::{json, Value};

use sasya_arogya::{InsuranceError, InsuranceResult, PdfRenderer, ReferenceTables, Renderer};
use sasya_arogya_mcp::protocol::Dispatcher;
use sasya_arogya_mcp::tools::{ToolContext, ToolRegistry};
use sasya_arogya_mcp::types::*;

use common::{args, fixture_companies, fixture_crops, fixture_dispatcher, fixture_tables};

async fn success(dispatcher: &Dispatcher, name: &str, arguments: Value) -> Value {
    match dispatcher.call(ToolInvocation::new(name, args(arguments))).await {
        ToolOutcome::Success { payload } => payload,
        other => panic!("{name} failed: {other:?}"),
    }
}

async fn failure(dispatcher: &Dispatcher, name: &str, arguments: Value) -> Failure {
    match dispatcher.call(ToolInvocation::new(name, args(arguments))).await {
        ToolOutcome::Failure(failure) => failure,
        other => panic!("{name} unexpectedly succeeded: {other:?}"),
    }
}

fn dispatcher_with(ctx: ToolContext) -> Dispatcher {
    Dispatcher::new(Arc::new(ToolRegistry::with_builtin_tools(&ctx).unwrap()))
}

fn decode_document(document: &Value) -> Vec<u8> {
    assert_eq!(document["mime_type"], "application/pdf");
    assert_eq!(document["encoding"], "base64");
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(document["data"].as_str().unwrap())
        .unwrap();
    assert_eq!(document["size_bytes"], json!(bytes.len()));
    bytes
}

fn certificate_args() -> Value {
    json!({
        "policy_id": "PMFBY-2024-001",
        "farmer_name": "Ramesh Kumar",
        "farmer_id": "F12345",
        "insurance_company_name": "ABC Insurance Ltd",
        "company_address": "123 Main St, Bangalore",
        "sum_insured_per_hectare": 50000.0,
        "farmer_share_percent": 2.0,
        "actuarial_rate_percent": 3.5,
        "cut_off_date": "2024-12-31",
        "crop_details": {
            "name": "Wheat",
            "area_hectare": 2.5,
            "premium_paid_by_farmer": 2500.0,
            "premium_paid_by_govt": 7500.0,
            "total_sum_insured": 125000.0
        },
        "terms_and_conditions": [
            "This policy covers natural calamities and pest attacks",
            "Claims must be filed within 15 days of damage"
        ]
    })
}

struct BrokenRenderer;

impl Renderer for BrokenRenderer {
    fn render(&self, _template_id: &str, _fields: &Value) -> InsuranceResult<Vec<u8>> {
        Err(InsuranceError::Render("printer on fire".to_string()))
    }
}

// ═══════════════════════════════════════════════════════
// calculate_crop_premium
// ═══════════════════════════════════════════════════════

#[tokio::test]
async fn test_premium_identities_for_state_row() {
    let dispatcher = fixture_dispatcher();
    let p = success(
        &dispatcher,
        "calculate_crop_premium",
        json!({ "crop": "Wheat", "area_hectare": 2.5, "state": "Karnataka" }),
    )
    .await;

    let per_ha = p["premium_per_hectare"].as_f64().unwrap();
    let total = p["total_premium"].as_f64().unwrap();
    let subsidy = p["subsidy"].as_f64().unwrap();
    let farmer = p["farmer_contribution"].as_f64().unwrap();

    assert!((farmer + subsidy - total).abs() < 1e-6);
    assert!((total - per_ha * 2.5).abs() < 1e-6);
    assert!((per_ha - 2250.0).abs() < 1e-6);
    assert_eq!(p["season"], "Rabi");
    assert!(p["summary"].as_str().unwrap().contains("Wheat in Karnataka"));
}

#[tokio::test]
async fn test_premium_falls_back_to_national_row() {
    let dispatcher = fixture_dispatcher();
    let p = success(
        &dispatcher,
        "calculate_crop_premium",
        json!({ "crop": "wheat", "area_hectare": 1, "state": "Punjab" }),
    )
    .await;
    assert_eq!(p["sum_insured"].as_f64().unwrap(), 40000.0);
    assert_eq!(p["state"], "Punjab");
}

#[tokio::test]
async fn test_premium_rejects_non_positive_area() {
    let dispatcher = fixture_dispatcher();
    for area in [json!(0), json!(-2.5)] {
        let f = failure(
            &dispatcher,
            "calculate_crop_premium",
            json!({ "crop": "Wheat", "area_hectare": area, "state": "Karnataka" }),
        )
        .await;
        assert_eq!(f.kind, ErrorKind::InvalidArguments);
    }
}

#[tokio::test]
async fn test_premium_unknown_crop_is_not_found() {
    let dispatcher = fixture_dispatcher();
    let f = failure(
        &dispatcher,
        "calculate_crop_premium",
        json!({ "crop": "Saffron", "area_hectare": 1, "state": "Karnataka" }),
    )
    .await;
    assert_eq!(f.kind, ErrorKind::NotFound);
    assert!(f.message.contains("Saffron"));
}

// ═══════════════════════════════════════════════════════
// get_insurance_companies
// ═══════════════════════════════════════════════════════

#[tokio::test]
async fn test_companies_filtered_by_state() {
    let dispatcher = fixture_dispatcher();
    let p = success(&dispatcher, "get_insurance_companies", json!({ "state": "karnataka" })).await;
    let companies = p["companies"].as_array().unwrap();
    assert_eq!(p["total"], 2);
    assert!(companies.iter().all(|c| c["state"] == "Karnataka"));
    assert_eq!(companies[0]["name"], "Agriculture Insurance Company");
}

#[tokio::test]
async fn test_companies_without_filter_returns_directory() {
    let dispatcher = fixture_dispatcher();
    let p = success(&dispatcher, "get_insurance_companies", json!({})).await;
    assert_eq!(p["total"], json!(fixture_companies().len()));
    assert_eq!(p["state"], Value::Null);

    let empty = success(&dispatcher, "get_insurance_companies", json!({ "state": "Goa" })).await;
    assert_eq!(empty["total"], 0);
    assert_eq!(empty["companies"], json!([]));
}

#[tokio::test]
async fn test_companies_stream_one_event_per_record() {
    let dispatcher = fixture_dispatcher();
    let mut events = dispatcher.stream(ToolInvocation::new(
        "get_insurance_companies",
        args(json!({ "state": "Karnataka" })),
    ));
    let mut received = Vec::new();
    while let Some(event) = events.recv().await {
        received.push(event);
    }
    assert_eq!(received.len(), 3);
    assert_eq!(received[0].partial["name"], "Agriculture Insurance Company");
    assert_eq!(received[1].partial["name"], "Universal Sompo");
    assert!(received[2].done);
    assert_eq!(received[2].partial["total"], 2);
}

// ═══════════════════════════════════════════════════════
// generate_insurance_certificate
// ═══════════════════════════════════════════════════════

#[tokio::test]
async fn test_certificate_is_a_pdf_document() {
    let dispatcher = fixture_dispatcher();
    let p = success(&dispatcher, "generate_insurance_certificate", certificate_args()).await;
    let pdf = decode_document(&p["document"]);
    assert!(pdf.starts_with(b"%PDF-"));
    assert!(String::from_utf8_lossy(&pdf).contains("PMFBY-2024-001"));
    assert_eq!(p["policy_id"], "PMFBY-2024-001");
}

#[tokio::test]
async fn test_certificate_requires_nested_shapes() {
    let dispatcher = fixture_dispatcher();

    let mut missing = certificate_args();
    missing.as_object_mut().unwrap().remove("crop_details");
    let f = failure(&dispatcher, "generate_insurance_certificate", missing).await;
    assert_eq!(f.kind, ErrorKind::InvalidArguments);
    assert!(f.message.contains("crop_details"));

    let mut malformed = certificate_args();
    malformed["crop_details"] = json!({ "name": 42 });
    let f = failure(&dispatcher, "generate_insurance_certificate", malformed).await;
    assert_eq!(f.kind, ErrorKind::InvalidArguments);
}

#[tokio::test]
async fn test_certificate_render_failure() {
    let ctx = ToolContext::new(Arc::new(fixture_tables()), Arc::new(BrokenRenderer));
    let dispatcher = dispatcher_with(ctx);
    let f = failure(&dispatcher, "generate_insurance_certificate", certificate_args()).await;
    assert_eq!(f.kind, ErrorKind::RenderError);
    assert!(f.message.contains("printer on fire"));
}

// ═══════════════════════════════════════════════════════
// recommend_insurance
// ═══════════════════════════════════════════════════════

fn recommend_args() -> Value {
    json!({
        "disease": "Powdery Mildew",
        "farmer_name": "asha devi",
        "state": "Karnataka",
        "area_hectare": 2,
        "crop": "Wheat"
    })
}

#[tokio::test]
async fn test_recommendation_picks_cheapest_local_insurer() {
    let dispatcher = fixture_dispatcher();
    let p = success(&dispatcher, "recommend_insurance", recommend_args()).await;

    let text = p["recommendation_text"].as_str().unwrap();
    assert!(text.starts_with("Asha Devi, your Wheat crop in Karnataka"));
    assert!(text.contains("AgriShield"));
    assert_eq!(p["policy"]["insurance_company_name"], "Universal Sompo");
    assert_eq!(p["coverage_plans"].as_array().unwrap().len(), 2);
    assert!(decode_document(&p["document"]).starts_with(b"%PDF"));
}

#[tokio::test]
async fn test_recommendation_stream_stages() {
    let dispatcher = fixture_dispatcher();
    let mut events = dispatcher.stream(ToolInvocation::new("recommend_insurance", args(recommend_args())));
    let mut received = Vec::new();
    while let Some(event) = events.recv().await {
        received.push(event);
    }

    let stages: Vec<&str> = received
        .iter()
        .filter(|e| !e.done)
        .filter_map(|e| e.partial["stage"].as_str())
        .collect();
    assert_eq!(
        stages,
        vec!["premium_calculated", "insurer_selected", "recommendation_ready"]
    );
    let last = received.last().unwrap();
    assert!(last.done);
    assert_eq!(last.sequence, 3);
    assert!(last.partial["document"].is_object());
}

#[tokio::test]
async fn test_recommendation_sub_step_errors_keep_kind() {
    let dispatcher = fixture_dispatcher();
    let mut unknown_crop = recommend_args();
    unknown_crop["crop"] = json!("Saffron");
    assert_eq!(
        failure(&dispatcher, "recommend_insurance", unknown_crop).await.kind,
        ErrorKind::NotFound
    );

    let no_insurers = dispatcher_with(ToolContext::new(
        Arc::new(ReferenceTables::new(fixture_crops(), vec![])),
        Arc::new(PdfRenderer::new()),
    ));
    let f = failure(&no_insurers, "recommend_insurance", recommend_args()).await;
    assert_eq!(f.kind, ErrorKind::NotFound);

    let broken = dispatcher_with(ToolContext::new(
        Arc::new(fixture_tables()),
        Arc::new(BrokenRenderer),
    ));
    let f = failure(&broken, "recommend_insurance", recommend_args()).await;
    assert_eq!(f.kind, ErrorKind::RenderError);
}

#[tokio::test]
async fn test_recommendation_falls_back_to_directory() {
    let dispatcher = fixture_dispatcher();
    let mut far_away = recommend_args();
    far_away["state"] = json!("Punjab");
    let p = success(&dispatcher, "recommend_insurance", far_away).await;
    // Cheapest of the whole directory.
    assert_eq!(p["policy"]["insurance_company_name"], "Universal Sompo");
}
