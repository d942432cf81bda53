//! Integration tests for the HTTP processor client.
//!
//! A small axum app stands in for the processor API so these tests cover the
//! real request path: OAuth token caching, the 401 refresh, JSON mapping and
//! multipart uploads.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::{Form, Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use secrecy::SecretString;
use serde_json::{json, Value};

use charity_onboarding::adapters::{HttpProcessorClient, HttpProcessorConfig};
use charity_onboarding::domain::foundation::{MerchantRef, Timestamp};
use charity_onboarding::domain::onboarding::OnboardingStatus;
use charity_onboarding::ports::{
    DocumentCategory, DocumentStatus, DocumentUpload, MerchantApplication, ProcessorClient,
    ProcessorErrorCode,
};

// =============================================================================
// Fake Processor
// =============================================================================

const CLIENT_ID: &str = "client-id";
const CLIENT_SECRET: &str = "client-secret";

type ApiResult = Result<Json<Value>, (StatusCode, Json<Value>)>;

struct FakeProcessor {
    token_requests: AtomicUsize,
    token_lifetime_secs: AtomicU64,
    reject_credentials: AtomicBool,
    revoked: Mutex<HashSet<String>>,
    created: Mutex<Option<Value>>,
    upload: Mutex<Option<(String, Vec<u8>)>>,
}

impl FakeProcessor {
    fn new(token_lifetime_secs: u64) -> Arc<Self> {
        Arc::new(Self {
            token_requests: AtomicUsize::new(0),
            token_lifetime_secs: AtomicU64::new(token_lifetime_secs),
            reject_credentials: AtomicBool::new(false),
            revoked: Mutex::new(HashSet::new()),
            created: Mutex::new(None),
            upload: Mutex::new(None),
        })
    }

    fn token_requests(&self) -> usize {
        self.token_requests.load(Ordering::SeqCst)
    }

    fn revoke(&self, token: &str) {
        self.revoked.lock().unwrap().insert(token.to_string());
    }

    fn authorize(&self, headers: &HeaderMap) -> Result<(), (StatusCode, Json<Value>)> {
        let token = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::to_string);

        match token {
            Some(token) if !self.revoked.lock().unwrap().contains(&token) => Ok(()),
            _ => Err(error(StatusCode::UNAUTHORIZED, "invalid_token")),
        }
    }
}

fn error(status: StatusCode, message: &str) -> (StatusCode, Json<Value>) {
    (status, Json(json!({ "error": "request_failed", "message": message })))
}

async fn issue_token(
    State(fake): State<Arc<FakeProcessor>>,
    Form(params): Form<HashMap<String, String>>,
) -> ApiResult {
    if fake.reject_credentials.load(Ordering::SeqCst)
        || params.get("client_id").map(String::as_str) != Some(CLIENT_ID)
        || params.get("client_secret").map(String::as_str) != Some(CLIENT_SECRET)
        || params.get("grant_type").map(String::as_str) != Some("client_credentials")
    {
        return Err(error(StatusCode::UNAUTHORIZED, "invalid_client"));
    }

    let n = fake.token_requests.fetch_add(1, Ordering::SeqCst) + 1;
    Ok(Json(json!({
        "access_token": format!("tok-{}", n),
        "expires_in": fake.token_lifetime_secs.load(Ordering::SeqCst),
        "token_type": "Bearer"
    })))
}

async fn create_merchant(
    State(fake): State<Arc<FakeProcessor>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> ApiResult {
    fake.authorize(&headers)?;
    *fake.created.lock().unwrap() = Some(body);
    Ok(Json(json!({ "merchantId": "M-77", "status": "created" })))
}

async fn get_merchant(
    State(fake): State<Arc<FakeProcessor>>,
    headers: HeaderMap,
    Path(merchant_id): Path<String>,
) -> ApiResult {
    fake.authorize(&headers)?;
    match merchant_id.as_str() {
        "M-missing" => Err(error(StatusCode::NOT_FOUND, "merchant not found")),
        "M-odd" => Ok(Json(json!({ "merchantId": merchant_id, "status": "teleported" }))),
        "M-undated" => Ok(Json(json!({ "merchantId": merchant_id, "status": "live" }))),
        _ => Ok(Json(json!({
            "merchantId": merchant_id,
            "status": "under_review",
            "statusReason": "documents received",
            "updatedAt": "2024-01-15T10:00:00Z"
        }))),
    }
}

async fn upload_document(
    State(fake): State<Arc<FakeProcessor>>,
    headers: HeaderMap,
    Path(_merchant_id): Path<String>,
    body: Bytes,
) -> ApiResult {
    fake.authorize(&headers)?;
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    *fake.upload.lock().unwrap() = Some((content_type, body.to_vec()));
    Ok(Json(json!({ "documentId": "doc_1", "status": "received" })))
}

async fn start(fake: Arc<FakeProcessor>) -> String {
    let app = Router::new()
        .route("/oauth/token", post(issue_token))
        .route("/v1/merchants", post(create_merchant))
        .route("/v1/merchants/:merchant_id", get(get_merchant))
        .route("/v1/merchants/:merchant_id/documents", post(upload_document))
        .with_state(fake);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn client_for(fake: Arc<FakeProcessor>) -> HttpProcessorClient {
    let base_url = start(fake).await;
    let config = HttpProcessorConfig::new(
        base_url,
        CLIENT_ID,
        SecretString::new(CLIENT_SECRET.to_string()),
    )
    .with_request_timeout(Duration::from_secs(5))
    .with_token_expiry_buffer(Duration::from_secs(300));
    HttpProcessorClient::new(config).unwrap()
}

fn merchant(id: &str) -> MerchantRef {
    MerchantRef::new(id).unwrap()
}

fn application() -> MerchantApplication {
    MerchantApplication {
        external_id: "org-42".to_string(),
        legal_name: "Harbour Food Bank".to_string(),
        registration_number: "CH-1234567".to_string(),
        contact_email: "finance@harbourfoodbank.org".to_string(),
        country: "GB".to_string(),
        template_id: Some("charity-standard".to_string()),
    }
}

// =============================================================================
// Token Tests
// =============================================================================

#[tokio::test]
async fn token_is_cached_outside_the_renewal_buffer() {
    let fake = FakeProcessor::new(3600);
    let client = client_for(fake.clone()).await;

    client.get_merchant_status(&merchant("M-1")).await.unwrap();
    client.get_merchant_status(&merchant("M-1")).await.unwrap();
    client.get_merchant_status(&merchant("M-2")).await.unwrap();

    assert_eq!(fake.token_requests(), 1);
}

#[tokio::test]
async fn token_shorter_than_the_buffer_is_renewed_at_half_life() {
    // One second lifetime against the five minute buffer.
    let fake = FakeProcessor::new(1);
    let client = client_for(fake.clone()).await;

    client.get_merchant_status(&merchant("M-1")).await.unwrap();
    client.get_merchant_status(&merchant("M-1")).await.unwrap();
    assert_eq!(fake.token_requests(), 1);

    tokio::time::sleep(Duration::from_millis(600)).await;
    client.get_merchant_status(&merchant("M-1")).await.unwrap();
    assert_eq!(fake.token_requests(), 2);
}

#[tokio::test]
async fn rejected_token_is_refreshed_and_request_retried() {
    let fake = FakeProcessor::new(3600);
    fake.revoke("tok-1");
    let client = client_for(fake.clone()).await;

    let snapshot = client.get_merchant_status(&merchant("M-1")).await.unwrap();

    assert_eq!(snapshot.status, OnboardingStatus::KycSubmitted);
    assert_eq!(fake.token_requests(), 2);
}

#[tokio::test]
async fn second_401_is_reported_as_authentication_error() {
    let fake = FakeProcessor::new(3600);
    fake.revoke("tok-1");
    fake.revoke("tok-2");
    let client = client_for(fake.clone()).await;

    let err = client
        .get_merchant_status(&merchant("M-1"))
        .await
        .unwrap_err();

    assert_eq!(err.code, ProcessorErrorCode::Authentication);
    assert_eq!(err.http_status, Some(401));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn bad_credentials_fail_with_authentication_error() {
    let fake = FakeProcessor::new(3600);
    fake.reject_credentials.store(true, Ordering::SeqCst);
    let client = client_for(fake.clone()).await;

    let err = client
        .get_merchant_status(&merchant("M-1"))
        .await
        .unwrap_err();

    assert_eq!(err.code, ProcessorErrorCode::Authentication);
    assert_eq!(err.message, "invalid_client");
}

// =============================================================================
// Merchant Tests
// =============================================================================

#[tokio::test]
async fn create_merchant_sends_camel_case_application() {
    let fake = FakeProcessor::new(3600);
    let client = client_for(fake.clone()).await;

    let created = client.create_merchant(application()).await.unwrap();

    assert_eq!(created.merchant_ref, merchant("M-77"));
    assert_eq!(created.status, Some(OnboardingStatus::Pending));

    let body = fake.created.lock().unwrap().clone().unwrap();
    assert_eq!(body["externalId"], "org-42");
    assert_eq!(body["legalName"], "Harbour Food Bank");
    assert_eq!(body["registrationNumber"], "CH-1234567");
    assert_eq!(body["templateId"], "charity-standard");
}

#[tokio::test]
async fn status_snapshot_uses_processor_update_time() {
    let fake = FakeProcessor::new(3600);
    let client = client_for(fake).await;

    let snapshot = client.get_merchant_status(&merchant("M-1")).await.unwrap();

    assert_eq!(snapshot.status, OnboardingStatus::KycSubmitted);
    assert_eq!(snapshot.reason.as_deref(), Some("documents received"));
    assert_eq!(
        Some(snapshot.observed_at),
        Timestamp::parse_rfc3339("2024-01-15T10:00:00Z")
    );
}

#[tokio::test]
async fn status_snapshot_without_update_time_uses_request_time() {
    let fake = FakeProcessor::new(3600);
    let client = client_for(fake).await;
    let before = Timestamp::now();

    let snapshot = client
        .get_merchant_status(&merchant("M-undated"))
        .await
        .unwrap();

    assert_eq!(snapshot.status, OnboardingStatus::Active);
    assert!(!snapshot.observed_at.is_before(&before));
}

#[tokio::test]
async fn unknown_merchant_maps_to_not_found() {
    let fake = FakeProcessor::new(3600);
    let client = client_for(fake).await;

    let err = client
        .get_merchant_status(&merchant("M-missing"))
        .await
        .unwrap_err();

    assert_eq!(err.code, ProcessorErrorCode::NotFound);
    assert_eq!(err.http_status, Some(404));
    assert_eq!(err.message, "merchant not found");
}

#[tokio::test]
async fn unknown_status_vocabulary_is_invalid_response() {
    let fake = FakeProcessor::new(3600);
    let client = client_for(fake).await;

    let err = client
        .get_merchant_status(&merchant("M-odd"))
        .await
        .unwrap_err();

    assert_eq!(err.code, ProcessorErrorCode::InvalidResponse);
}

// =============================================================================
// Document Tests
// =============================================================================

#[tokio::test]
async fn upload_document_sends_multipart_form() {
    let fake = FakeProcessor::new(3600);
    let client = client_for(fake.clone()).await;

    let uploaded = client
        .upload_document(
            &merchant("M-77"),
            DocumentUpload {
                category: DocumentCategory::RegistrationCertificate,
                file_name: "certificate.pdf".to_string(),
                bytes: b"%PDF-1.4 charity registration".to_vec(),
                mime_type: "application/pdf".to_string(),
            },
        )
        .await
        .unwrap();

    assert_eq!(uploaded.document_id, "doc_1");
    assert_eq!(uploaded.status, DocumentStatus::Received);

    let (content_type, body) = fake.upload.lock().unwrap().clone().unwrap();
    let body = String::from_utf8_lossy(&body);
    assert!(content_type.starts_with("multipart/form-data"));
    assert!(body.contains("name=\"category\""));
    assert!(body.contains("registration_certificate"));
    assert!(body.contains("filename=\"certificate.pdf\""));
    assert!(body.contains("%PDF-1.4 charity registration"));
}

#[tokio::test]
async fn invalid_mime_type_is_rejected_before_sending() {
    let fake = FakeProcessor::new(3600);
    let client = client_for(fake.clone()).await;

    let err = client
        .upload_document(
            &merchant("M-77"),
            DocumentUpload {
                category: DocumentCategory::BankStatement,
                file_name: "statement.pdf".to_string(),
                bytes: vec![1, 2, 3],
                mime_type: "not a mime".to_string(),
            },
        )
        .await
        .unwrap_err();

    assert_eq!(err.code, ProcessorErrorCode::Rejected);
    assert!(fake.upload.lock().unwrap().is_none());
}
