//! Processor configuration

use secrecy::SecretString;
use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use super::server::Environment;

/// Card processor configuration
#[derive(Clone, Default, Deserialize)]
pub struct ProcessorConfig {
    /// Production API root
    #[serde(default)]
    pub base_url: String,

    /// Sandbox API root
    #[serde(default)]
    pub sandbox_base_url: String,

    /// Use the sandbox API
    #[serde(default)]
    pub sandbox: bool,

    /// OAuth client id
    #[serde(default)]
    pub client_id: String,

    /// OAuth client secret
    #[serde(default)]
    pub client_secret: String,

    /// Shared secret for webhook signatures
    #[serde(default)]
    pub webhook_secret: String,

    /// Onboarding template used when an application names none
    pub default_template_id: Option<String>,

    /// Renew access tokens this many minutes before expiry
    #[serde(default = "default_token_expiry_buffer")]
    pub token_expiry_buffer_minutes: u64,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl ProcessorConfig {
    /// API root selected by the sandbox switch
    pub fn active_base_url(&self) -> &str {
        if self.sandbox {
            &self.sandbox_base_url
        } else {
            &self.base_url
        }
    }

    pub fn client_secret(&self) -> SecretString {
        SecretString::new(self.client_secret.clone())
    }

    pub fn webhook_secret(&self) -> SecretString {
        SecretString::new(self.webhook_secret.clone())
    }

    pub fn token_expiry_buffer(&self) -> Duration {
        Duration::from_secs(self.token_expiry_buffer_minutes * 60)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Validate processor configuration
    pub fn validate(&self, environment: &Environment) -> Result<(), ValidationError> {
        let url = self.active_base_url();
        if url.is_empty() {
            return Err(ValidationError::MissingRequired(if self.sandbox {
                "PROCESSOR__SANDBOX_BASE_URL"
            } else {
                "PROCESSOR__BASE_URL"
            }));
        }
        if !url.starts_with("https://") && !url.starts_with("http://") {
            return Err(ValidationError::InvalidProcessorUrl(url.to_string()));
        }
        if self.client_id.is_empty() {
            return Err(ValidationError::MissingRequired("PROCESSOR__CLIENT_ID"));
        }
        if self.client_secret.is_empty() {
            return Err(ValidationError::MissingRequired("PROCESSOR__CLIENT_SECRET"));
        }
        if self.webhook_secret.is_empty() {
            return Err(ValidationError::MissingRequired("PROCESSOR__WEBHOOK_SECRET"));
        }
        if self.token_expiry_buffer_minutes > 60 {
            return Err(ValidationError::InvalidTokenBuffer);
        }
        if self.request_timeout_secs == 0 || self.request_timeout_secs > 300 {
            return Err(ValidationError::InvalidTimeout);
        }

        if *environment == Environment::Production {
            if self.sandbox {
                return Err(ValidationError::SandboxInProduction);
            }
            if !url.starts_with("https://") {
                return Err(ValidationError::ProcessorUrlMustBeHttps);
            }
        }

        Ok(())
    }
}

impl std::fmt::Debug for ProcessorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessorConfig")
            .field("base_url", &self.base_url)
            .field("sandbox_base_url", &self.sandbox_base_url)
            .field("sandbox", &self.sandbox)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("webhook_secret", &"[REDACTED]")
            .field("default_template_id", &self.default_template_id)
            .field("token_expiry_buffer_minutes", &self.token_expiry_buffer_minutes)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

fn default_token_expiry_buffer() -> u64 {
    5
}

fn default_request_timeout() -> u64 {
    30
}
