//! # Application State
//!
//! Shared state for the Axum application, passed to all route handlers
//! via the `State` extractor, and the environment configuration it is
//! built from.
//!
//! ## Environment
//!
//! | Variable              | Default        | Meaning                                  |
//! |-----------------------|----------------|------------------------------------------|
//! | `PORT`                | `8080`         | HTTP listen port                         |
//! | `DATABASE_URL`        | unset          | PostgreSQL URL; unset uses memory store  |
//! | `OLYMPUS_TEMPLATES`   | unset          | YAML file with extra workflow templates  |
//! | `OLYMPUS_STEP_ORDER`  | `strict`       | `strict` or `relaxed` step ordering      |
//! | `OLYMPUS_ENVIRONMENT` | `development`  | Deployment label, logged at startup      |

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use olympus_state::StepOrderPolicy;
use olympus_store::{CaseStore, MemoryCaseStore, PgCaseStore, StoreError};
use olympus_workflow::{CaseService, TemplateCatalog, TemplateError};

/// Startup failures. Each one stops the server before it binds.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {var}: {reason}")]
    InvalidVar { var: &'static str, reason: String },

    #[error(transparent)]
    Templates(#[from] TemplateError),

    #[error("cannot open case store: {0}")]
    Store(#[from] StoreError),
}

/// Application configuration.
#[derive(Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// PostgreSQL connection URL. `None` selects the in-memory store.
    pub database_url: Option<String>,
    /// Extra workflow templates loaded at startup.
    pub templates_path: Option<PathBuf>,
    pub step_order: StepOrderPolicy,
    pub environment: String,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field("database_url", &self.database_url.as_ref().map(|_| "[REDACTED]"))
            .field("templates_path", &self.templates_path)
            .field("step_order", &self.step_order)
            .field("environment", &self.environment)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            database_url: None,
            templates_path: None,
            step_order: StepOrderPolicy::Strict,
            environment: "development".to_string(),
        }
    }
}

impl AppConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup`. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let port = match get("PORT") {
            Some(p) => p.trim().parse().map_err(|_| ConfigError::InvalidVar {
                var: "PORT",
                reason: format!("{p:?} is not a port number"),
            })?,
            None => defaults.port,
        };
        let step_order = match get("OLYMPUS_STEP_ORDER") {
            Some(s) => s
                .parse()
                .map_err(|e: olympus_core::ValidationError| ConfigError::InvalidVar {
                    var: "OLYMPUS_STEP_ORDER",
                    reason: e.to_string(),
                })?,
            None => defaults.step_order,
        };

        Ok(Self {
            port,
            database_url: get("DATABASE_URL"),
            templates_path: get("OLYMPUS_TEMPLATES").map(PathBuf::from),
            step_order,
            environment: get("OLYMPUS_ENVIRONMENT").unwrap_or(defaults.environment),
        })
    }
}

/// Shared application state passed to all route handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub service: Arc<CaseService>,
    pub config: AppConfig,
}

impl AppState {
    /// State over an in-memory store with the built-in templates.
    pub fn new() -> Self {
        Self::with_store(Arc::new(MemoryCaseStore::new()), AppConfig::default())
    }

    /// State over the given store, with built-in templates only.
    pub fn with_store(store: Arc<dyn CaseStore>, config: AppConfig) -> Self {
        let service = CaseService::new(store, TemplateCatalog::builtin(), config.step_order);
        Self {
            service: Arc::new(service),
            config,
        }
    }

    /// Build the state described by `config`: load templates, then open
    /// PostgreSQL (running migrations) or fall back to the memory store.
    pub async fn bootstrap(config: AppConfig) -> Result<Self, ConfigError> {
        let mut templates = TemplateCatalog::builtin();
        if let Some(path) = &config.templates_path {
            templates.load_yaml_file(path)?;
        }

        let store: Arc<dyn CaseStore> = match &config.database_url {
            Some(url) => {
                let store = PgCaseStore::connect(url).await?;
                tracing::info!("Connected to PostgreSQL case store");
                Arc::new(store)
            }
            None => {
                tracing::warn!("DATABASE_URL not set; cases are kept in memory and lost on restart");
                Arc::new(MemoryCaseStore::new())
            }
        };

        let service = CaseService::new(store, templates, config.step_order);
        Ok(Self {
            service: Arc::new(service),
            config,
        })
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
