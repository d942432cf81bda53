//! Mock processor client for testing.
//!
//! Provides a configurable implementation of `ProcessorClient` for unit and
//! integration tests. Supports:
//! - Per-merchant status snapshots
//! - Error injection, globally or per merchant
//! - Call tracking

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::domain::foundation::{MerchantRef, Timestamp};
use crate::domain::onboarding::OnboardingStatus;
use crate::ports::{
    CreatedMerchant, DocumentStatus, DocumentUpload, MerchantApplication, MerchantStatusSnapshot,
    ProcessorClient, ProcessorError, ProcessorErrorCode, UploadedDocument,
};

/// Mock processor client.
///
/// # Example
///
/// ```ignore
/// let mock = MockProcessorClient::new();
/// mock.set_status(&merchant_ref, OnboardingStatus::Active);
/// mock.fail_for(&other_ref, ProcessorError::timeout("slow"));
/// ```
#[derive(Default, Clone)]
pub struct MockProcessorClient {
    inner: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    /// Status snapshots returned by `get_merchant_status`.
    statuses: HashMap<MerchantRef, MerchantStatusSnapshot>,

    /// Errors returned for a specific merchant on any call.
    merchant_errors: HashMap<MerchantRef, ProcessorError>,

    /// Errors returned by a method regardless of merchant.
    method_errors: HashMap<&'static str, ProcessorError>,

    /// Merchant ref handed out by the next `create_merchant`.
    next_merchant_ref: Option<MerchantRef>,

    created_count: u32,
    uploads: Vec<(MerchantRef, DocumentUpload)>,
    call_log: Vec<MethodCall>,
}

/// Recorded method call for assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodCall {
    pub method: &'static str,
    pub merchant_ref: Option<MerchantRef>,
}

impl MockProcessorClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report `status` for `merchant_ref`, observed now.
    pub fn set_status(&self, merchant_ref: &MerchantRef, status: OnboardingStatus) {
        self.set_snapshot(
            merchant_ref,
            MerchantStatusSnapshot {
                status,
                reason: None,
                observed_at: Timestamp::now(),
            },
        );
    }

    pub fn set_snapshot(&self, merchant_ref: &MerchantRef, snapshot: MerchantStatusSnapshot) {
        self.inner
            .lock()
            .unwrap()
            .statuses
            .insert(merchant_ref.clone(), snapshot);
    }

    /// Fail every call concerning `merchant_ref` with `error`.
    pub fn fail_for(&self, merchant_ref: &MerchantRef, error: ProcessorError) {
        self.inner
            .lock()
            .unwrap()
            .merchant_errors
            .insert(merchant_ref.clone(), error);
    }

    /// Fail every call to `method` ("create_merchant", "get_merchant_status",
    /// "upload_document").
    pub fn fail_method(&self, method: &'static str, error: ProcessorError) {
        self.inner.lock().unwrap().method_errors.insert(method, error);
    }

    pub fn set_next_merchant_ref(&self, merchant_ref: MerchantRef) {
        self.inner.lock().unwrap().next_merchant_ref = Some(merchant_ref);
    }

    pub fn calls(&self) -> Vec<MethodCall> {
        self.inner.lock().unwrap().call_log.clone()
    }

    /// Number of calls to `method`.
    pub fn call_count(&self, method: &str) -> usize {
        self.inner
            .lock()
            .unwrap()
            .call_log
            .iter()
            .filter(|c| c.method == method)
            .count()
    }

    pub fn uploads(&self) -> Vec<(MerchantRef, DocumentUpload)> {
        self.inner.lock().unwrap().uploads.clone()
    }

    fn record(
        &self,
        method: &'static str,
        merchant_ref: Option<&MerchantRef>,
    ) -> Result<(), ProcessorError> {
        let mut state = self.inner.lock().unwrap();
        state.call_log.push(MethodCall {
            method,
            merchant_ref: merchant_ref.cloned(),
        });
        if let Some(err) = merchant_ref.and_then(|r| state.merchant_errors.get(r)) {
            return Err(err.clone());
        }
        if let Some(err) = state.method_errors.get(method) {
            return Err(err.clone());
        }
        Ok(())
    }
}

#[async_trait]
impl ProcessorClient for MockProcessorClient {
    async fn create_merchant(
        &self,
        _application: MerchantApplication,
    ) -> Result<CreatedMerchant, ProcessorError> {
        self.record("create_merchant", None)?;

        let mut state = self.inner.lock().unwrap();
        state.created_count += 1;
        let merchant_ref = match state.next_merchant_ref.take() {
            Some(r) => r,
            None => MerchantRef::new(format!("mock_merchant_{}", state.created_count))
                .map_err(|e| ProcessorError::invalid_response(e.to_string()))?,
        };

        Ok(CreatedMerchant {
            merchant_ref,
            status: Some(OnboardingStatus::Pending),
        })
    }

    async fn get_merchant_status(
        &self,
        merchant_ref: &MerchantRef,
    ) -> Result<MerchantStatusSnapshot, ProcessorError> {
        self.record("get_merchant_status", Some(merchant_ref))?;

        self.inner
            .lock()
            .unwrap()
            .statuses
            .get(merchant_ref)
            .cloned()
            .ok_or_else(|| {
                ProcessorError::new(
                    ProcessorErrorCode::NotFound,
                    format!("Merchant {} not found", merchant_ref),
                )
            })
    }

    async fn upload_document(
        &self,
        merchant_ref: &MerchantRef,
        document: DocumentUpload,
    ) -> Result<UploadedDocument, ProcessorError> {
        self.record("upload_document", Some(merchant_ref))?;

        let mut state = self.inner.lock().unwrap();
        state.uploads.push((merchant_ref.clone(), document));
        Ok(UploadedDocument {
            document_id: format!("doc_{}", state.uploads.len()),
            status: DocumentStatus::Received,
        })
    }
}
