//! Workflow templates: a named, ordered list of step definitions from which
//! a case's steps are created.

use serde::{Deserialize, Serialize};

use olympus_core::identity::bounded_text;
use olympus_core::ValidationError;

/// Maximum length of a step title.
pub const STEP_TITLE_MAX_LEN: usize = 255;

/// Definition of one step, before it belongs to a case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepDefinition {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl StepDefinition {
    pub fn new(title: impl Into<String>, description: Option<String>) -> Self {
        Self {
            title: title.into(),
            description,
        }
    }
}

/// A reusable workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowTemplate {
    /// Catalog key, e.g. `tramite-solicitud`.
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub steps: Vec<StepDefinition>,
}

impl WorkflowTemplate {
    /// Check the template can create a case: a name, at least one step, and
    /// a non-blank title on every step.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::InvalidWorkflow(
                "template name must not be empty".into(),
            ));
        }
        validate_steps(&self.steps)
    }
}

/// Reject empty step lists and blank or overlong titles.
pub fn validate_steps(steps: &[StepDefinition]) -> Result<(), ValidationError> {
    if steps.is_empty() {
        return Err(ValidationError::InvalidWorkflow(
            "a workflow needs at least one step".into(),
        ));
    }
    for (i, step) in steps.iter().enumerate() {
        bounded_text(&step.title, "step title", STEP_TITLE_MAX_LEN).map_err(|e| {
            ValidationError::InvalidWorkflow(format!("step {}: {e}", i + 1))
        })?;
    }
    Ok(())
}
