//! # Workflow Template Catalog
//!
//! Named workflows from which cases are created. The catalog always holds
//! the built-in `tramite-solicitud` template; more can be loaded from YAML:
//!
//! ```yaml
//! templates:
//!   - name: licencia-obra
//!     description: Licencia de obra menor
//!     steps:
//!       - title: Registro
//!       - title: Informe técnico
//!         description: Visita de inspección
//!       - title: Resolución
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use olympus_core::ValidationError;
use olympus_state::{StepDefinition, WorkflowTemplate};

/// Name of the built-in generic application workflow.
pub const BUILTIN_TEMPLATE: &str = "tramite-solicitud";

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("cannot read template file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot parse templates: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("template {name:?}: {source}")]
    Invalid {
        name: String,
        source: ValidationError,
    },
}

#[derive(Deserialize)]
struct TemplateFile {
    templates: Vec<WorkflowTemplate>,
}

/// Templates indexed by name.
#[derive(Debug, Clone)]
pub struct TemplateCatalog {
    templates: BTreeMap<String, WorkflowTemplate>,
}

impl Default for TemplateCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl TemplateCatalog {
    /// Catalog holding only the built-in template.
    pub fn builtin() -> Self {
        let mut templates = BTreeMap::new();
        let t = tramite_solicitud();
        templates.insert(t.name.clone(), t);
        Self { templates }
    }

    /// Add or replace a template after validating it.
    pub fn insert(&mut self, mut template: WorkflowTemplate) -> Result<(), TemplateError> {
        template.validate().map_err(|source| TemplateError::Invalid {
            name: template.name.clone(),
            source,
        })?;
        let name = template.name.trim().to_string();
        template.name = name.clone();
        if self.templates.contains_key(&name) {
            tracing::warn!(template = %name, "Replacing workflow template");
        }
        self.templates.insert(name, template);
        Ok(())
    }

    /// Parse a YAML document and add every template in it. All templates are
    /// validated before any is added. Returns the number added.
    pub fn load_yaml_str(&mut self, yaml: &str) -> Result<usize, TemplateError> {
        let file: TemplateFile = serde_yaml::from_str(yaml)?;
        for t in &file.templates {
            t.validate().map_err(|source| TemplateError::Invalid {
                name: t.name.clone(),
                source,
            })?;
        }
        let count = file.templates.len();
        for t in file.templates {
            self.insert(t)?;
        }
        Ok(count)
    }

    pub fn load_yaml_file(&mut self, path: &Path) -> Result<usize, TemplateError> {
        let yaml = std::fs::read_to_string(path).map_err(|source| TemplateError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let count = self.load_yaml_str(&yaml)?;
        tracing::info!(path = %path.display(), count, "Loaded workflow templates");
        Ok(count)
    }

    pub fn get(&self, name: &str) -> Option<&WorkflowTemplate> {
        self.templates.get(name.trim())
    }

    /// Templates sorted by name.
    pub fn list(&self) -> Vec<&WorkflowTemplate> {
        self.templates.values().collect()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

/// Generic application workflow: validate, evaluate, approve, notify.
pub fn tramite_solicitud() -> WorkflowTemplate {
    WorkflowTemplate {
        name: BUILTIN_TEMPLATE.into(),
        description: Some("Proceso de solicitud".into()),
        steps: vec![
            StepDefinition::new(
                "Validar solicitud",
                Some("Comprobar que la solicitud y su documentación están completas".into()),
            ),
            StepDefinition::new(
                "Evaluar",
                Some("Evaluar la solicitud según los criterios aplicables".into()),
            ),
            StepDefinition::new("Aprobar", Some("Resolución por funcionario competente".into())),
            StepDefinition::new("Notificar", Some("Notificar la resolución al solicitante".into())),
        ],
    }
}
