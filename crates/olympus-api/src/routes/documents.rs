//! # Document API
//!
//! Attach documents to a case, list them, and sign them. Uploaded content
//! arrives base64-encoded; only its SHA-256 digest and size are kept.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use olympus_core::{CaseId, DocumentId, UserRef};
use olympus_state::{Document, DocumentKind};
use olympus_workflow::NewDocument;

use crate::error::AppError;
use crate::extractors::{extract_validated_json, Actor, Validate};
use crate::state::AppState;

/// Largest accepted decoded document, in bytes.
pub const MAX_DOCUMENT_BYTES: usize = 8 * 1024 * 1024;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SignatureResponse {
    /// Hex SHA-256 over the canonical signing payload.
    pub hash: String,
    pub signer: String,
    pub signed_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DocumentResponse {
    pub id: Uuid,
    pub case_id: Uuid,
    pub name: String,
    /// REQUEST, REPORT, RESOLUTION, ATTACHMENT or OTHER.
    pub kind: String,
    /// Hex SHA-256 of the uploaded content, when content was given.
    pub content_digest: Option<String>,
    pub size_bytes: i64,
    pub uploaded_at: DateTime<Utc>,
    pub uploaded_by: Option<String>,
    pub signature: Option<SignatureResponse>,
}

impl From<&Document> for DocumentResponse {
    fn from(d: &Document) -> Self {
        Self {
            id: *d.id.as_uuid(),
            case_id: *d.case_id.as_uuid(),
            name: d.name.clone(),
            kind: d.kind.as_str().to_string(),
            content_digest: d.content_digest.clone(),
            size_bytes: d.size_bytes,
            uploaded_at: *d.uploaded_at.as_datetime(),
            uploaded_by: d.uploaded_by.as_ref().map(ToString::to_string),
            signature: d.signature.as_ref().map(|s| SignatureResponse {
                hash: s.hash.clone(),
                signer: s.signer.to_string(),
                signed_at: *s.signed_at.as_datetime(),
            }),
        }
    }
}

/// Request to attach a document to a case.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AttachDocumentRequest {
    pub name: String,
    /// Defaults to ATTACHMENT.
    #[serde(default)]
    pub kind: Option<String>,
    /// Standard base64 content. Omit to register a document without content.
    #[serde(default)]
    pub content_base64: Option<String>,
}

impl Validate for AttachDocumentRequest {
    fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("name must not be empty".to_string());
        }
        if let Some(content) = &self.content_base64 {
            // base64 expands by 4/3; reject early before decoding.
            if content.len() / 4 * 3 > MAX_DOCUMENT_BYTES + 3 {
                return Err(format!(
                    "content must not exceed {MAX_DOCUMENT_BYTES} bytes"
                ));
            }
        }
        Ok(())
    }
}

impl AttachDocumentRequest {
    fn into_new_document(self) -> Result<NewDocument, AppError> {
        let kind = match &self.kind {
            Some(k) => k.trim().to_ascii_uppercase().parse::<DocumentKind>()?,
            None => DocumentKind::default(),
        };
        let content = self
            .content_base64
            .as_deref()
            .map(|b64| {
                base64::engine::general_purpose::STANDARD
                    .decode(b64.trim())
                    .map_err(|e| AppError::Validation(format!("content_base64: {e}")))
            })
            .transpose()?;
        if content.as_ref().is_some_and(|c| c.len() > MAX_DOCUMENT_BYTES) {
            return Err(AppError::Validation(format!(
                "content must not exceed {MAX_DOCUMENT_BYTES} bytes"
            )));
        }
        Ok(NewDocument {
            name: self.name,
            kind,
            content,
        })
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SignDocumentRequest {
    pub signer: String,
}

impl Validate for SignDocumentRequest {
    fn validate(&self) -> Result<(), String> {
        if self.signer.trim().is_empty() {
            return Err("signer must not be empty".to_string());
        }
        Ok(())
    }
}

/// Build the documents router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/v1/cases/{id}/documents",
            post(attach_document).get(list_documents),
        )
        .route("/v1/documents/{id}/sign", post(sign_document))
}

/// POST /v1/cases/{id}/documents: Attach a document.
#[utoipa::path(
    post,
    path = "/v1/cases/{id}/documents",
    params(("id" = Uuid, Path, description = "Case ID")),
    request_body = AttachDocumentRequest,
    responses(
        (status = 201, description = "Document attached", body = DocumentResponse),
        (status = 404, description = "Case not found", body = crate::error::ErrorBody),
        (status = 409, description = "Case is closed", body = crate::error::ErrorBody),
        (status = 422, description = "Validation error", body = crate::error::ErrorBody),
    ),
    tag = "documents"
)]
pub async fn attach_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Actor(actor): Actor,
    body: Result<Json<AttachDocumentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<DocumentResponse>), AppError> {
    let new = extract_validated_json(body)?.into_new_document()?;
    let document = state
        .service
        .attach_document(CaseId::from_uuid(id), new, actor)
        .await?;
    Ok((StatusCode::CREATED, Json((&document).into())))
}

/// GET /v1/cases/{id}/documents: Documents of a case, oldest first.
#[utoipa::path(
    get,
    path = "/v1/cases/{id}/documents",
    params(("id" = Uuid, Path, description = "Case ID")),
    responses(
        (status = 200, description = "Documents", body = [DocumentResponse]),
        (status = 404, description = "Case not found", body = crate::error::ErrorBody),
    ),
    tag = "documents"
)]
pub async fn list_documents(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<DocumentResponse>>, AppError> {
    let documents = state.service.list_documents(CaseId::from_uuid(id)).await?;
    Ok(Json(documents.iter().map(Into::into).collect()))
}

/// POST /v1/documents/{id}/sign: Sign a document once.
#[utoipa::path(
    post,
    path = "/v1/documents/{id}/sign",
    params(("id" = Uuid, Path, description = "Document ID")),
    request_body = SignDocumentRequest,
    responses(
        (status = 200, description = "Document signed", body = DocumentResponse),
        (status = 404, description = "Document not found", body = crate::error::ErrorBody),
        (status = 409, description = "Already signed", body = crate::error::ErrorBody),
    ),
    tag = "documents"
)]
pub async fn sign_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Result<Json<SignDocumentRequest>, JsonRejection>,
) -> Result<Json<DocumentResponse>, AppError> {
    let req = extract_validated_json(body)?;
    let signer = UserRef::new(&req.signer)?;
    let document = state
        .service
        .sign_document(DocumentId::from_uuid(id), signer)
        .await?;
    Ok(Json((&document).into()))
}
