//! # Integration Tests for olympus-api
//!
//! Drives the full router with `tower::ServiceExt::oneshot`: the case
//! lifecycle end to end, error status mapping, documents, templates,
//! health probes and the OpenAPI document.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use olympus_api::{AppConfig, AppState};
use olympus_store::MemoryCaseStore;

/// Helper: build the test app over a fresh memory store.
fn test_app() -> axum::Router {
    olympus_api::app(AppState::new())
}

/// Helper: read response body as string.
async fn body_string(response: axum::http::Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Helper: send one request, returning status and parsed JSON body.
async fn send(
    app: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
    actor: Option<&str>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(a) = actor {
        builder = builder.header("x-olympus-user", a);
    }
    let request = match body {
        Some(b) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&b).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let text = body_string(response).await;
    let value = if text.is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&text).unwrap_or(Value::String(text))
    };
    (status, value)
}

/// Helper: create a case with three explicit steps, returning its id.
async fn create_three_step_case(app: &axum::Router, number: &str) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/v1/cases",
        Some(json!({
            "number": number,
            "subject": "Licencia de obra menor",
            "steps": [
                {"title": "Registro de entrada"},
                {"title": "Informe técnico", "description": "Visita de inspección"},
                {"title": "Resolución"}
            ]
        })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["case"]["id"].as_str().unwrap().to_string()
}

// -- Health Probes ------------------------------------------------------------

#[tokio::test]
async fn test_liveness_probe() {
    let response = test_app()
        .oneshot(
            Request::builder()
                .uri("/health/liveness")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "ok");
}

#[tokio::test]
async fn test_readiness_probe() {
    let response = test_app()
        .oneshot(
            Request::builder()
                .uri("/health/readiness")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "ready");
}

#[tokio::test]
async fn test_unavailable_store_maps_to_503() {
    let store = Arc::new(MemoryCaseStore::new());
    let app = olympus_api::app(AppState::with_store(store.clone(), AppConfig::default()));
    let id = create_three_step_case(&app, "EXP-503").await;

    store.set_unavailable(true);
    let (status, body) = send(&app, "GET", "/health/readiness", None, None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body, Value::String("case store unreachable".into()));

    let (status, body) = send(&app, "POST", &format!("/v1/cases/{id}/start"), None, None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["code"], "SERVICE_UNAVAILABLE");
    assert!(!body["error"]["message"].as_str().unwrap().contains("switched off"));
}

// -- Case Lifecycle -----------------------------------------------------------

#[tokio::test]
async fn test_case_runs_to_closure() {
    let app = test_app();
    let id = create_three_step_case(&app, "EXP-001").await;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/v1/cases/{id}/start"),
        None,
        Some("tramitador-1"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "IN_PROGRESS");

    for n in 1..=3 {
        let (status, body) = send(
            &app,
            "POST",
            &format!("/v1/cases/{id}/steps/{n}/complete"),
            Some(json!({"comment": format!("paso {n}")})),
            Some("tramitador-1"),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["status"], "COMPLETED");
        assert_eq!(body["completed_by"], "tramitador-1");
    }

    let (status, body) = send(&app, "GET", &format!("/v1/cases/{id}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["case"]["status"], "CLOSED");
    assert!(body["case"]["closed_at"].is_string());

    let (_, history) = send(&app, "GET", &format!("/v1/cases/{id}/history"), None, None).await;
    let actions: Vec<&str> = history
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["action"].as_str().unwrap())
        .collect();
    assert_eq!(
        actions,
        vec![
            "case_started",
            "step_completed",
            "step_completed",
            "step_completed",
            "case_closed"
        ]
    );
    assert_eq!(history[1]["metadata"]["sequence"], 1);
    assert_eq!(history[1]["actor"], "tramitador-1");
}

#[tokio::test]
async fn test_create_from_default_template() {
    let app = test_app();
    let (status, body) = send(
        &app,
        "POST",
        "/v1/cases",
        Some(json!({"number": "EXP-100", "subject": "Ayuda al alquiler"})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["case"]["status"], "OPEN");
    let steps = body["steps"].as_array().unwrap();
    assert_eq!(steps.len(), 4);
    assert!(steps.iter().all(|s| s["status"] == "PENDING"));
    assert_eq!(steps[0]["title"], "Validar solicitud");
}

#[tokio::test]
async fn test_duplicate_number_is_409() {
    let app = test_app();
    create_three_step_case(&app, "EXP-200").await;
    let (status, body) = send(
        &app,
        "POST",
        "/v1/cases",
        Some(json!({"number": "EXP-200", "subject": "Otra"})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "DUPLICATE");
}

#[tokio::test]
async fn test_zero_steps_is_422() {
    let app = test_app();
    let (status, body) = send(
        &app,
        "POST",
        "/v1/cases",
        Some(json!({"number": "EXP-201", "subject": "Vacía", "steps": []})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_unknown_template_is_422() {
    let app = test_app();
    let (status, _) = send(
        &app,
        "POST",
        "/v1/cases",
        Some(json!({"number": "EXP-202", "subject": "X", "template": "no-existe"})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_malformed_json_is_400() {
    let app = test_app();
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v1/cases")
                .header("content-type", "application/json")
                .body(Body::from("{\"number\": "))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_complete_step_without_body() {
    let app = test_app();
    let id = create_three_step_case(&app, "EXP-210").await;
    let (status, _) = send(&app, "POST", &format!("/v1/cases/{id}/start"), None, None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        "POST",
        &format!("/v1/cases/{id}/steps/1/complete"),
        None,
        Some("tramitador-1"),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["status"], "COMPLETED");
    assert!(body["comment"].is_null());
}

#[tokio::test]
async fn test_complete_step_with_broken_body_is_400() {
    let app = test_app();
    let id = create_three_step_case(&app, "EXP-211").await;
    send(&app, "POST", &format!("/v1/cases/{id}/start"), None, None).await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/v1/cases/{id}/steps/1/complete"))
                .header("content-type", "application/json")
                .body(Body::from("{\"comment\": "))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let (_, steps) = send(&app, "GET", &format!("/v1/cases/{id}/steps"), None, None).await;
    assert_eq!(steps[0]["status"], "IN_PROGRESS");
}

#[tokio::test]
async fn test_unknown_case_is_404() {
    let app = test_app();
    let missing = uuid::Uuid::new_v4();
    for (method, uri) in [
        ("GET", format!("/v1/cases/{missing}")),
        ("POST", format!("/v1/cases/{missing}/start")),
        ("GET", format!("/v1/cases/{missing}/steps")),
        ("GET", format!("/v1/cases/{missing}/history")),
    ] {
        let (status, body) = send(&app, method, &uri, None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{method} {uri}");
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }
}

#[tokio::test]
async fn test_start_twice_is_invalid_transition() {
    let app = test_app();
    let id = create_three_step_case(&app, "EXP-300").await;
    send(&app, "POST", &format!("/v1/cases/{id}/start"), None, None).await;
    let (status, body) = send(&app, "POST", &format!("/v1/cases/{id}/start"), None, None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "INVALID_TRANSITION");
}

#[tokio::test]
async fn test_step_errors_have_distinct_codes() {
    let app = test_app();
    let id = create_three_step_case(&app, "EXP-301").await;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/v1/cases/{id}/steps/1/complete"),
        Some(json!({})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "INVALID_TRANSITION");

    send(&app, "POST", &format!("/v1/cases/{id}/start"), None, None).await;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/v1/cases/{id}/steps/2/complete"),
        Some(json!({})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "OUT_OF_ORDER");

    let (status, _) = send(
        &app,
        "POST",
        &format!("/v1/cases/{id}/steps/1/complete"),
        Some(json!({})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        "POST",
        &format!("/v1/cases/{id}/steps/1/complete"),
        Some(json!({})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "ALREADY_COMPLETED");

    let (status, _) = send(
        &app,
        "POST",
        &format!("/v1/cases/{id}/steps/9/complete"),
        Some(json!({})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Refused operations leave no trace in the history.
    let (_, history) = send(&app, "GET", &format!("/v1/cases/{id}/history"), None, None).await;
    assert_eq!(history.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_update_case_details() {
    let app = test_app();
    let id = create_three_step_case(&app, "EXP-400").await;

    let (status, body) = send(
        &app,
        "PATCH",
        &format!("/v1/cases/{id}"),
        Some(json!({"subject": "Licencia de obra mayor", "owner": "negociado-urbanismo"})),
        Some("jefa-de-servicio"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["subject"], "Licencia de obra mayor");
    assert_eq!(body["owner"], "negociado-urbanismo");
    assert_eq!(body["status"], "OPEN");

    let (_, history) = send(&app, "GET", &format!("/v1/cases/{id}/history"), None, None).await;
    assert_eq!(history[0]["action"], "case_updated");
    assert_eq!(history[0]["metadata"]["fields"], json!(["subject", "owner"]));

    let (status, _) = send(&app, "PATCH", &format!("/v1/cases/{id}"), Some(json!({})), None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_status_field_is_ignored_on_update() {
    let app = test_app();
    let id = create_three_step_case(&app, "EXP-401").await;
    let (status, body) = send(
        &app,
        "PATCH",
        &format!("/v1/cases/{id}"),
        Some(json!({"subject": "Nuevo asunto", "status": "CLOSED"})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "OPEN");
}

#[tokio::test]
async fn test_list_cases_filters_and_pages() {
    let app = test_app();
    let first = create_three_step_case(&app, "EXP-501").await;
    create_three_step_case(&app, "EXP-502").await;
    create_three_step_case(&app, "EXP-503").await;
    send(&app, "POST", &format!("/v1/cases/{first}/start"), None, None).await;

    let (status, body) = send(&app, "GET", "/v1/cases?status=open&limit=1", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);
    assert_eq!(body["items"].as_array().unwrap().len(), 1);
    assert_eq!(body["limit"], 1);

    let (_, body) = send(&app, "GET", "/v1/cases", None, None).await;
    assert_eq!(body["total"], 3);
    assert_eq!(body["limit"], 10);

    let (status, _) = send(&app, "GET", "/v1/cases?limit=500", None, None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = send(&app, "GET", "/v1/cases?status=ARCHIVED", None, None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

// -- Documents ----------------------------------------------------------------

#[tokio::test]
async fn test_attach_and_sign_document() {
    let app = test_app();
    let id = create_three_step_case(&app, "EXP-600").await;

    let (status, doc) = send(
        &app,
        "POST",
        &format!("/v1/cases/{id}/documents"),
        Some(json!({
            "name": "solicitud.pdf",
            "kind": "REQUEST",
            "content_base64": "aG9sYQ=="
        })),
        Some("registro-general"),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{doc}");
    assert_eq!(doc["kind"], "REQUEST");
    assert_eq!(doc["size_bytes"], 4);
    assert_eq!(doc["uploaded_by"], "registro-general");
    // SHA-256("hola")
    assert_eq!(
        doc["content_digest"],
        "b221d9dbb083a7f33428d7c2a3c3198ae925614d70210e28716ccaa7cd4ddb79"
    );
    let doc_id = doc["id"].as_str().unwrap();

    let (status, signed) = send(
        &app,
        "POST",
        &format!("/v1/documents/{doc_id}/sign"),
        Some(json!({"signer": "alcaldia"})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(signed["signature"]["signer"], "alcaldia");
    assert_eq!(signed["signature"]["hash"].as_str().unwrap().len(), 64);

    let (status, body) = send(
        &app,
        "POST",
        &format!("/v1/documents/{doc_id}/sign"),
        Some(json!({"signer": "alcaldia"})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "ALREADY_SIGNED");

    let (_, docs) = send(&app, "GET", &format!("/v1/cases/{id}/documents"), None, None).await;
    assert_eq!(docs.as_array().unwrap().len(), 1);

    let (_, history) = send(&app, "GET", &format!("/v1/cases/{id}/history"), None, None).await;
    assert_eq!(history[0]["action"], "document_attached");
    assert_eq!(history[1]["action"], "document_signed");
    assert_eq!(
        history[1]["metadata"]["signature_hash"],
        signed["signature"]["hash"]
    );
}

#[tokio::test]
async fn test_sign_unknown_document_is_404() {
    let app = test_app();
    let (status, _) = send(
        &app,
        "POST",
        &format!("/v1/documents/{}/sign", uuid::Uuid::new_v4()),
        Some(json!({"signer": "alcaldia"})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_base64_is_422() {
    let app = test_app();
    let id = create_three_step_case(&app, "EXP-601").await;
    let (status, _) = send(
        &app,
        "POST",
        &format!("/v1/cases/{id}/documents"),
        Some(json!({"name": "x.pdf", "content_base64": "@@@"})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

// -- Templates & OpenAPI ------------------------------------------------------

#[tokio::test]
async fn test_list_templates() {
    let (status, body) = send(&test_app(), "GET", "/v1/templates", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let templates = body.as_array().unwrap();
    assert_eq!(templates.len(), 1);
    assert_eq!(templates[0]["name"], "tramite-solicitud");
    assert_eq!(templates[0]["steps"][3]["sequence"], 4);
}

#[tokio::test]
async fn test_openapi_document_served() {
    let (status, body) = send(&test_app(), "GET", "/openapi.json", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/v1/cases/{id}/history"].is_object());
    assert_eq!(body["info"]["title"], "Olympus Case Workflow API");
}

#[tokio::test]
async fn test_blank_actor_header_is_422() {
    let app = test_app();
    let id = create_three_step_case(&app, "EXP-700").await;
    let (status, _) = send(
        &app,
        "POST",
        &format!("/v1/cases/{id}/start"),
        None,
        Some("   "),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}
