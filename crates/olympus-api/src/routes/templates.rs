//! # Workflow Template API
//!
//! Read-only view of the template catalog loaded at startup.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use olympus_state::WorkflowTemplate;

use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TemplateStepResponse {
    pub sequence: u32,
    pub title: String,
    pub description: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TemplateResponse {
    pub name: String,
    pub description: Option<String>,
    pub steps: Vec<TemplateStepResponse>,
}

impl From<&WorkflowTemplate> for TemplateResponse {
    fn from(t: &WorkflowTemplate) -> Self {
        Self {
            name: t.name.clone(),
            description: t.description.clone(),
            steps: t
                .steps
                .iter()
                .zip(1u32..)
                .map(|(s, sequence)| TemplateStepResponse {
                    sequence,
                    title: s.title.clone(),
                    description: s.description.clone(),
                })
                .collect(),
        }
    }
}

/// Build the templates router.
pub fn router() -> Router<AppState> {
    Router::new().route("/v1/templates", get(list_templates))
}

/// GET /v1/templates: Available workflow templates, sorted by name.
#[utoipa::path(
    get,
    path = "/v1/templates",
    responses(
        (status = 200, description = "Templates", body = [TemplateResponse]),
    ),
    tag = "templates"
)]
pub async fn list_templates(State(state): State<AppState>) -> Json<Vec<TemplateResponse>> {
    Json(
        state
            .service
            .templates()
            .list()
            .into_iter()
            .map(Into::into)
            .collect(),
    )
}
