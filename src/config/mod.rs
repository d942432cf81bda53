//! Runtime settings, read from the process environment.
//!
//! Every key lives under the `ONBOARDING` prefix with `__` between levels, so
//! `ONBOARDING__PROCESSOR__CLIENT_ID` fills `processor.client_id`. A `.env`
//! file in the working directory is read first when present.
//!
//! ```no_run
//! use charity_onboarding::config::AppConfig;
//!
//! let config = AppConfig::load()?;
//! config.validate()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod error;
mod processor;
mod reconciliation;
mod server;

pub use error::{ConfigError, ValidationError};
pub use processor::ProcessorConfig;
pub use reconciliation::ReconciliationConfig;
pub use server::{Environment, ServerConfig};

use serde::Deserialize;

/// All runtime settings.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    /// Required: there is no usable default for credentials.
    pub processor: ProcessorConfig,

    #[serde(default)]
    pub reconciliation: ReconciliationConfig,
}

impl AppConfig {
    /// Reads `.env` (if any) and the `ONBOARDING__*` environment.
    ///
    /// Values are parsed into their typed sections but not validated; call
    /// [`AppConfig::validate`] before use.
    ///
    /// # Errors
    ///
    /// `ConfigError::LoadError` when a value has the wrong type or a required
    /// section is absent.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("ONBOARDING")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Checks each section, stopping at the first problem.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.processor.validate(&self.server.environment)?;
        self.reconciliation.validate()?;
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}
