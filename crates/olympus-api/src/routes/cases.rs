//! # Case API
//!
//! Case creation, listing, detail updates, the start transition, step
//! completion and the audit history of a case.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use olympus_core::{CaseId, CaseNumber, Timestamp, UserRef};
use olympus_state::{
    AuditEntry, Case, CaseDetailsUpdate, CaseFile, CaseStatus, StepDefinition, Step,
};
use olympus_store::{CaseQuery, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};
use olympus_workflow::{NewCase, StepSource, BUILTIN_TEMPLATE};

use crate::error::AppError;
use crate::extractors::{
    extract_optional_json, extract_validated_json, extract_validated_query, Actor, Validate,
};
use crate::routes::documents::DocumentResponse;
use crate::state::AppState;

fn at(ts: &Timestamp) -> DateTime<Utc> {
    *ts.as_datetime()
}

// ─── Response DTOs ──────────────────────────────────────────────────

/// A case as returned by the API.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CaseResponse {
    pub id: Uuid,
    pub number: String,
    pub subject: String,
    pub description: Option<String>,
    /// OPEN, IN_PROGRESS or CLOSED.
    pub status: String,
    pub owner: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub version: i64,
}

impl From<&Case> for CaseResponse {
    fn from(c: &Case) -> Self {
        Self {
            id: *c.id.as_uuid(),
            number: c.number.to_string(),
            subject: c.subject.clone(),
            description: c.description.clone(),
            status: c.status.as_str().to_string(),
            owner: c.owner.as_ref().map(ToString::to_string),
            created_at: at(&c.created_at),
            updated_at: at(&c.updated_at),
            closed_at: c.closed_at.as_ref().map(at),
            version: c.version,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StepResponse {
    pub id: Uuid,
    pub case_id: Uuid,
    pub sequence: u32,
    pub title: String,
    pub description: Option<String>,
    /// PENDING, IN_PROGRESS or COMPLETED.
    pub status: String,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub completed_by: Option<String>,
    pub comment: Option<String>,
}

impl From<&Step> for StepResponse {
    fn from(s: &Step) -> Self {
        Self {
            id: *s.id.as_uuid(),
            case_id: *s.case_id.as_uuid(),
            sequence: s.sequence,
            title: s.title.clone(),
            description: s.description.clone(),
            status: s.status.as_str().to_string(),
            started_at: s.started_at.as_ref().map(at),
            completed_at: s.completed_at.as_ref().map(at),
            completed_by: s.completed_by.as_ref().map(ToString::to_string),
            comment: s.comment.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AuditEntryResponse {
    pub id: Uuid,
    pub case_id: Uuid,
    /// Position within the case history, starting at 1.
    pub sequence: i64,
    /// e.g. "case_started", "step_completed", "case_closed".
    pub action: String,
    pub description: String,
    pub actor: Option<String>,
    #[schema(value_type = Object)]
    pub metadata: serde_json::Value,
    pub recorded_at: DateTime<Utc>,
}

impl From<&AuditEntry> for AuditEntryResponse {
    fn from(e: &AuditEntry) -> Self {
        Self {
            id: *e.id.as_uuid(),
            case_id: *e.case_id.as_uuid(),
            sequence: e.sequence,
            action: e.action.as_str().to_string(),
            description: e.description.clone(),
            actor: e.actor.as_ref().map(ToString::to_string),
            metadata: e.metadata.clone(),
            recorded_at: at(&e.recorded_at),
        }
    }
}

/// A case with its steps and documents.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CaseFileResponse {
    pub case: CaseResponse,
    pub steps: Vec<StepResponse>,
    pub documents: Vec<DocumentResponse>,
}

impl From<&CaseFile> for CaseFileResponse {
    fn from(f: &CaseFile) -> Self {
        Self {
            case: f.case().into(),
            steps: f.steps().iter().map(Into::into).collect(),
            documents: f.documents().iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CaseListResponse {
    pub items: Vec<CaseResponse>,
    /// Number of matching cases before paging.
    pub total: u64,
    pub skip: u32,
    pub limit: u32,
}

// ─── Request DTOs ───────────────────────────────────────────────────

/// One step of an explicit workflow.
#[derive(Debug, Deserialize, ToSchema)]
pub struct StepInput {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Request to open a case.
///
/// Steps come from `template` or from `steps`, not both. With neither, the
/// built-in `tramite-solicitud` template is used.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateCaseRequest {
    pub number: String,
    pub subject: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub template: Option<String>,
    #[serde(default)]
    pub steps: Option<Vec<StepInput>>,
}

impl Validate for CreateCaseRequest {
    fn validate(&self) -> Result<(), String> {
        if self.number.trim().is_empty() {
            return Err("number must not be empty".to_string());
        }
        if self.subject.trim().is_empty() {
            return Err("subject must not be empty".to_string());
        }
        if self.template.is_some() && self.steps.is_some() {
            return Err("give either template or steps, not both".to_string());
        }
        Ok(())
    }
}

/// Request to edit case details. Status cannot be set here.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateCaseRequest {
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub owner: Option<String>,
}

impl Validate for UpdateCaseRequest {
    fn validate(&self) -> Result<(), String> {
        if self.subject.is_none() && self.description.is_none() && self.owner.is_none() {
            return Err("at least one of subject, description or owner is required".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CompleteStepRequest {
    #[serde(default)]
    pub comment: Option<String>,
}

impl Validate for CompleteStepRequest {
    fn validate(&self) -> Result<(), String> {
        const MAX_COMMENT: usize = 4000;
        match &self.comment {
            Some(c) if c.chars().count() > MAX_COMMENT => {
                Err(format!("comment must not exceed {MAX_COMMENT} characters"))
            }
            _ => Ok(()),
        }
    }
}

/// Listing filter and page window.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListCasesParams {
    /// OPEN, IN_PROGRESS or CLOSED.
    pub status: Option<String>,
    /// Number of cases to skip (default 0).
    pub skip: Option<u32>,
    /// Page size, 1 to 100 (default 10).
    pub limit: Option<u32>,
}

impl Validate for ListCasesParams {
    fn validate(&self) -> Result<(), String> {
        match self.limit {
            Some(l) if l == 0 || l > MAX_PAGE_LIMIT => {
                Err(format!("limit must be between 1 and {MAX_PAGE_LIMIT}"))
            }
            _ => Ok(()),
        }
    }
}

// ─── Router ─────────────────────────────────────────────────────────

/// Build the cases router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/cases", post(create_case).get(list_cases))
        .route("/v1/cases/{id}", get(get_case).patch(update_case))
        .route("/v1/cases/{id}/start", post(start_case))
        .route("/v1/cases/{id}/steps", get(list_steps))
        .route("/v1/cases/{id}/steps/{sequence}/complete", post(complete_step))
        .route("/v1/cases/{id}/history", get(get_history))
}

// ─── Handlers ───────────────────────────────────────────────────────

/// POST /v1/cases: Open a case with all steps PENDING.
#[utoipa::path(
    post,
    path = "/v1/cases",
    request_body = CreateCaseRequest,
    responses(
        (status = 201, description = "Case created", body = CaseFileResponse),
        (status = 409, description = "Case number taken", body = crate::error::ErrorBody),
        (status = 422, description = "Validation error", body = crate::error::ErrorBody),
    ),
    tag = "cases"
)]
pub async fn create_case(
    State(state): State<AppState>,
    body: Result<Json<CreateCaseRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CaseFileResponse>), AppError> {
    let req = extract_validated_json(body)?;

    let workflow = match (req.template, req.steps) {
        (_, Some(steps)) => StepSource::Steps(
            steps
                .into_iter()
                .map(|s| StepDefinition::new(s.title, s.description))
                .collect(),
        ),
        (Some(name), None) => StepSource::Template(name),
        (None, None) => StepSource::Template(BUILTIN_TEMPLATE.to_string()),
    };
    let new = NewCase {
        number: CaseNumber::new(&req.number)?,
        subject: req.subject,
        description: req.description,
        owner: req.owner.as_deref().map(UserRef::new).transpose()?,
        workflow,
    };

    let file = state.service.create_case(new).await?;
    Ok((StatusCode::CREATED, Json((&file).into())))
}

/// GET /v1/cases: List cases, newest first.
#[utoipa::path(
    get,
    path = "/v1/cases",
    params(ListCasesParams),
    responses(
        (status = 200, description = "One page of cases", body = CaseListResponse),
        (status = 422, description = "Invalid filter", body = crate::error::ErrorBody),
    ),
    tag = "cases"
)]
pub async fn list_cases(
    State(state): State<AppState>,
    params: Result<Query<ListCasesParams>, QueryRejection>,
) -> Result<Json<CaseListResponse>, AppError> {
    let params = extract_validated_query(params)?;
    let status = params
        .status
        .as_deref()
        .map(|s| s.trim().to_ascii_uppercase().parse::<CaseStatus>())
        .transpose()?;
    let query = CaseQuery {
        status,
        skip: params.skip.unwrap_or(0),
        limit: params.limit.unwrap_or(DEFAULT_PAGE_LIMIT),
    };

    let page = state.service.list_cases(query).await?;
    Ok(Json(CaseListResponse {
        items: page.items.iter().map(Into::into).collect(),
        total: page.total,
        skip: query.skip,
        limit: query.limit,
    }))
}

/// GET /v1/cases/{id}: Case with steps and documents.
#[utoipa::path(
    get,
    path = "/v1/cases/{id}",
    params(("id" = Uuid, Path, description = "Case ID")),
    responses(
        (status = 200, description = "Case found", body = CaseFileResponse),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "cases"
)]
pub async fn get_case(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<CaseFileResponse>, AppError> {
    let file = state.service.get_case_file(CaseId::from_uuid(id)).await?;
    Ok(Json((&file).into()))
}

/// PATCH /v1/cases/{id}: Edit subject, description or owner.
#[utoipa::path(
    patch,
    path = "/v1/cases/{id}",
    params(("id" = Uuid, Path, description = "Case ID")),
    request_body = UpdateCaseRequest,
    responses(
        (status = 200, description = "Case updated", body = CaseResponse),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
        (status = 409, description = "Case is closed", body = crate::error::ErrorBody),
        (status = 422, description = "Validation error", body = crate::error::ErrorBody),
    ),
    tag = "cases"
)]
pub async fn update_case(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Actor(actor): Actor,
    body: Result<Json<UpdateCaseRequest>, JsonRejection>,
) -> Result<Json<CaseResponse>, AppError> {
    let req = extract_validated_json(body)?;
    let update = CaseDetailsUpdate {
        subject: req.subject,
        description: req.description,
        owner: req.owner.as_deref().map(UserRef::new).transpose()?,
    };
    let case = state
        .service
        .update_case(CaseId::from_uuid(id), update, actor)
        .await?;
    Ok(Json((&case).into()))
}

/// POST /v1/cases/{id}/start: OPEN → IN_PROGRESS.
#[utoipa::path(
    post,
    path = "/v1/cases/{id}/start",
    params(("id" = Uuid, Path, description = "Case ID")),
    responses(
        (status = 200, description = "Case started", body = CaseResponse),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
        (status = 409, description = "Case is not OPEN", body = crate::error::ErrorBody),
    ),
    tag = "cases"
)]
pub async fn start_case(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Actor(actor): Actor,
) -> Result<Json<CaseResponse>, AppError> {
    let case = state.service.start_case(CaseId::from_uuid(id), actor).await?;
    Ok(Json((&case).into()))
}

/// GET /v1/cases/{id}/steps: Steps in sequence order.
#[utoipa::path(
    get,
    path = "/v1/cases/{id}/steps",
    params(("id" = Uuid, Path, description = "Case ID")),
    responses(
        (status = 200, description = "Steps", body = [StepResponse]),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "cases"
)]
pub async fn list_steps(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<StepResponse>>, AppError> {
    let steps = state.service.list_steps(CaseId::from_uuid(id)).await?;
    Ok(Json(steps.iter().map(Into::into).collect()))
}

/// POST /v1/cases/{id}/steps/{sequence}/complete: Complete one step.
#[utoipa::path(
    post,
    path = "/v1/cases/{id}/steps/{sequence}/complete",
    params(
        ("id" = Uuid, Path, description = "Case ID"),
        ("sequence" = u32, Path, description = "Step number, starting at 1"),
    ),
    request_body(content = CompleteStepRequest, description = "Optional; may be omitted"),
    responses(
        (status = 200, description = "Step completed", body = StepResponse),
        (status = 404, description = "Case or step not found", body = crate::error::ErrorBody),
        (status = 409, description = "Already completed, out of order, or case not in progress", body = crate::error::ErrorBody),
    ),
    tag = "cases"
)]
pub async fn complete_step(
    State(state): State<AppState>,
    Path((id, sequence)): Path<(Uuid, u32)>,
    Actor(actor): Actor,
    body: Result<Json<CompleteStepRequest>, JsonRejection>,
) -> Result<Json<StepResponse>, AppError> {
    let req = extract_optional_json(body)?;
    let step = state
        .service
        .complete_step(CaseId::from_uuid(id), sequence, req.comment, actor)
        .await?;
    Ok(Json((&step).into()))
}

/// GET /v1/cases/{id}/history: Audit trail in recording order.
#[utoipa::path(
    get,
    path = "/v1/cases/{id}/history",
    params(("id" = Uuid, Path, description = "Case ID")),
    responses(
        (status = 200, description = "Audit entries", body = [AuditEntryResponse]),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "cases"
)]
pub async fn get_history(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<AuditEntryResponse>>, AppError> {
    let history = state.service.get_history(CaseId::from_uuid(id)).await?;
    Ok(Json(history.iter().map(Into::into).collect()))
}
