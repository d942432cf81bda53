//! HTTP processor client.
//!
//! Implements `ProcessorClient` against the processor's REST API using
//! OAuth2 client credentials.
//!
//! # Authentication
//!
//! - Token from `POST {base}/oauth/token`, cached until it enters the
//!   renewal buffer before expiry
//! - A 401 from an API call drops the cached token and retries once
//!
//! # Configuration
//!
//! ```ignore
//! let config = HttpProcessorConfig::new(base_url, client_id, client_secret)
//!     .with_request_timeout(Duration::from_secs(30));
//! let client = HttpProcessorClient::new(config)?;
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{multipart, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;

use crate::domain::foundation::{MerchantRef, Timestamp};
use crate::domain::onboarding::OnboardingStatus;
use crate::ports::{
    CreatedMerchant, DocumentUpload, MerchantApplication, MerchantStatusSnapshot,
    ProcessorClient, ProcessorError, ProcessorErrorCode, UploadedDocument,
};

use super::token_cache::{FetchedToken, TokenCache, DEFAULT_EXPIRY_BUFFER};
use super::wire_types::{
    CreateMerchantRequest, DocumentResponse, ErrorResponse, MerchantResponse, TokenResponse,
};

/// Processor API configuration.
#[derive(Clone)]
pub struct HttpProcessorConfig {
    /// API root, without trailing slash. Already resolved for sandbox.
    base_url: String,

    client_id: String,

    client_secret: SecretString,

    /// Applied to every request, token requests included.
    request_timeout: Duration,

    /// Tokens are renewed this long before they expire.
    token_expiry_buffer: Duration,
}

impl HttpProcessorConfig {
    pub fn new(
        base_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: SecretString,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client_id: client_id.into(),
            client_secret,
            request_timeout: Duration::from_secs(30),
            token_expiry_buffer: DEFAULT_EXPIRY_BUFFER,
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_token_expiry_buffer(mut self, buffer: Duration) -> Self {
        self.token_expiry_buffer = buffer;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl std::fmt::Debug for HttpProcessorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpProcessorConfig")
            .field("base_url", &self.base_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

/// `ProcessorClient` backed by the processor's REST API.
pub struct HttpProcessorClient {
    config: HttpProcessorConfig,
    http_client: reqwest::Client,
    tokens: TokenCache,
}

impl HttpProcessorClient {
    /// Builds the client. No network call is made until first use.
    pub fn new(config: HttpProcessorConfig) -> Result<Self, ProcessorError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ProcessorError::network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            tokens: TokenCache::new(config.token_expiry_buffer),
            config,
            http_client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    async fn fetch_token(&self) -> Result<FetchedToken, ProcessorError> {
        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.expose_secret().as_str()),
        ];

        let response = self
            .http_client
            .post(self.url("/oauth/token"))
            .form(&params)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = status.as_u16(), "Processor token request failed");
            let mut err = ProcessorError::from_http_status(status.as_u16(), ErrorResponse::describe(&body));
            if status.is_client_error() {
                err.code = ProcessorErrorCode::Authentication;
            }
            return Err(err);
        }

        let token: TokenResponse = decode(response).await?;
        Ok(FetchedToken {
            access_token: SecretString::new(token.access_token),
            expires_in: Duration::from_secs(token.expires_in),
        })
    }

    async fn access_token(&self) -> Result<SecretString, ProcessorError> {
        self.tokens.get_or_refresh(|| self.fetch_token()).await
    }

    /// Sends an authorized request, retrying once with a fresh token on 401.
    ///
    /// `build` is called per attempt because multipart bodies cannot be
    /// replayed.
    async fn send<F>(&self, operation: &'static str, build: F) -> Result<Response, ProcessorError>
    where
        F: Fn(&reqwest::Client) -> Result<RequestBuilder, ProcessorError>,
    {
        for attempt in 1..=2 {
            let token = self.access_token().await?;
            let response = build(&self.http_client)?
                .bearer_auth(token.expose_secret())
                .send()
                .await
                .map_err(|e| {
                    tracing::warn!(operation, error = %e, "Processor request failed");
                    transport_error(e)
                })?;

            let status = response.status();
            if status == StatusCode::UNAUTHORIZED && attempt == 1 {
                tracing::warn!(operation, "Processor rejected access token, refreshing");
                self.tokens.invalidate().await;
                continue;
            }

            if !status.is_success() {
                if status == StatusCode::UNAUTHORIZED {
                    self.tokens.invalidate().await;
                }
                let body = response.text().await.unwrap_or_default();
                let err = ProcessorError::from_http_status(status.as_u16(), ErrorResponse::describe(&body));
                tracing::warn!(operation, status = status.as_u16(), error = %err, "Processor returned an error");
                return Err(err);
            }

            return Ok(response);
        }

        Err(ProcessorError::new(
            ProcessorErrorCode::Authentication,
            "Access token rejected after refresh",
        ))
    }
}

#[async_trait]
impl ProcessorClient for HttpProcessorClient {
    async fn create_merchant(
        &self,
        application: MerchantApplication,
    ) -> Result<CreatedMerchant, ProcessorError> {
        let url = self.url("/v1/merchants");
        let body = CreateMerchantRequest::from(&application);

        let response = self
            .send("create_merchant", |client| Ok(client.post(&url).json(&body)))
            .await?;
        let merchant: MerchantResponse = decode(response).await?;

        let merchant_ref = MerchantRef::new(merchant.merchant_id)
            .map_err(|e| ProcessorError::invalid_response(e.to_string()))?;
        let status = OnboardingStatus::from_processor_vocabulary(&merchant.status);

        tracing::info!(
            merchant_ref = %merchant_ref,
            external_id = %application.external_id,
            "Processor merchant created"
        );

        Ok(CreatedMerchant {
            merchant_ref,
            status,
        })
    }

    async fn get_merchant_status(
        &self,
        merchant_ref: &MerchantRef,
    ) -> Result<MerchantStatusSnapshot, ProcessorError> {
        let url = self.url(&format!("/v1/merchants/{}", merchant_ref));
        let requested_at = Timestamp::now();

        let response = self
            .send("get_merchant_status", |client| Ok(client.get(&url)))
            .await?;
        let merchant: MerchantResponse = decode(response).await?;

        let status = OnboardingStatus::from_processor_vocabulary(&merchant.status).ok_or_else(|| {
            ProcessorError::invalid_response(format!(
                "Unknown merchant status '{}'",
                merchant.status
            ))
        })?;

        let observed_at = merchant
            .updated_at
            .as_ref()
            .and_then(|ts| ts.to_timestamp())
            .unwrap_or(requested_at);

        Ok(MerchantStatusSnapshot {
            status,
            reason: merchant.status_reason,
            observed_at,
        })
    }

    async fn upload_document(
        &self,
        merchant_ref: &MerchantRef,
        document: DocumentUpload,
    ) -> Result<UploadedDocument, ProcessorError> {
        let url = self.url(&format!("/v1/merchants/{}/documents", merchant_ref));

        let response = self
            .send("upload_document", |client| {
                let file = multipart::Part::bytes(document.bytes.clone())
                    .file_name(document.file_name.clone())
                    .mime_str(&document.mime_type)
                    .map_err(|e| {
                        ProcessorError::new(
                            ProcessorErrorCode::Rejected,
                            format!("Invalid mime type '{}': {}", document.mime_type, e),
                        )
                    })?;
                let form = multipart::Form::new()
                    .text("category", document.category.as_str())
                    .part("file", file);
                Ok(client.post(&url).multipart(form))
            })
            .await?;
        let uploaded: DocumentResponse = decode(response).await?;

        tracing::info!(
            merchant_ref = %merchant_ref,
            category = document.category.as_str(),
            document_id = %uploaded.document_id,
            "KYC document uploaded"
        );

        Ok(UploadedDocument {
            document_id: uploaded.document_id,
            status: uploaded.status,
        })
    }
}

fn transport_error(e: reqwest::Error) -> ProcessorError {
    if e.is_timeout() {
        ProcessorError::timeout(e.to_string())
    } else {
        ProcessorError::network(e.to_string())
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ProcessorError> {
    let bytes = response.bytes().await.map_err(transport_error)?;
    serde_json::from_slice(&bytes).map_err(|e| {
        ProcessorError::invalid_response(format!("Failed to parse processor response: {}", e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_trims_trailing_slash() {
        let config = HttpProcessorConfig::new(
            "https://sandbox.processor.test/",
            "client",
            SecretString::new("secret".to_string()),
        );
        assert_eq!(config.base_url(), "https://sandbox.processor.test");
    }

    #[test]
    fn config_debug_redacts_secret() {
        let config = HttpProcessorConfig::new(
            "https://processor.test",
            "client",
            SecretString::new("super_secret".to_string()),
        );
        let debug = format!("{:?}", config);
        assert!(!debug.contains("super_secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[tokio::test]
    async fn unreachable_processor_is_a_network_error() {
        let config = HttpProcessorConfig::new(
            "http://127.0.0.1:9",
            "client",
            SecretString::new("secret".to_string()),
        )
        .with_request_timeout(Duration::from_secs(2));
        let client = HttpProcessorClient::new(config).unwrap();

        let err = client
            .get_merchant_status(&MerchantRef::new("M1").unwrap())
            .await
            .unwrap_err();

        assert!(matches!(
            err.code,
            ProcessorErrorCode::Network | ProcessorErrorCode::Timeout
        ));
    }
}
