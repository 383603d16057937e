//! # OpenAPI Specification Assembly
//!
//! Assembles all utoipa-documented routes into a single OpenAPI document,
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

/// Assembled OpenAPI document for the entire API surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Olympus Case Workflow API",
        version = "0.1.0",
        description = "Case files (expedientes), their ordered steps, documents and append-only audit history.",
        license(name = "AGPL-3.0-or-later")
    ),
    paths(
        // Cases
        crate::routes::cases::create_case,
        crate::routes::cases::list_cases,
        crate::routes::cases::get_case,
        crate::routes::cases::update_case,
        crate::routes::cases::start_case,
        crate::routes::cases::list_steps,
        crate::routes::cases::complete_step,
        crate::routes::cases::get_history,
        // Documents
        crate::routes::documents::attach_document,
        crate::routes::documents::list_documents,
        crate::routes::documents::sign_document,
        // Templates
        crate::routes::templates::list_templates,
    ),
    components(schemas(
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
        crate::routes::cases::CaseResponse,
        crate::routes::cases::StepResponse,
        crate::routes::cases::AuditEntryResponse,
        crate::routes::cases::CaseFileResponse,
        crate::routes::cases::CaseListResponse,
        crate::routes::cases::StepInput,
        crate::routes::cases::CreateCaseRequest,
        crate::routes::cases::UpdateCaseRequest,
        crate::routes::cases::CompleteStepRequest,
        crate::routes::documents::DocumentResponse,
        crate::routes::documents::SignatureResponse,
        crate::routes::documents::AttachDocumentRequest,
        crate::routes::documents::SignDocumentRequest,
        crate::routes::templates::TemplateResponse,
        crate::routes::templates::TemplateStepResponse,
    )),
    tags(
        (name = "cases", description = "Case lifecycle, steps and history"),
        (name = "documents", description = "Case documents and signatures"),
        (name = "templates", description = "Workflow templates"),
    )
)]
pub struct ApiDoc;

/// Build the OpenAPI router.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

/// GET /openapi.json: Return the generated OpenAPI specification.
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
