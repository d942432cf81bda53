//! ReconciliationScheduler - Background poll of in-flight merchants.
//!
//! Webhooks can be lost or arrive late. On a fixed interval this loop asks
//! the processor for the status of every organization still in flight and
//! feeds the answer through the status transition guard.
//!
//! ## Configuration
//!
//! | Setting | Default | Description |
//! |---------|---------|-------------|
//! | `interval` | 30 min | Time between cycles |
//! | `item_delay` | 1s | Pause between merchants, to stay under rate limits |
//! | `polled_statuses` | Pending, KycSubmitted, MerchantApproved | Statuses selected for polling |
//!
//! ## Failure Isolation
//!
//! A failure on one merchant is logged and counted; the rest of the batch
//! still runs. A selection failure aborts only the current cycle.
//!
//! ## Graceful Shutdown
//!
//! The shutdown signal interrupts both the wait between cycles and the pause
//! between merchants.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};

use crate::domain::foundation::MerchantRef;
use crate::domain::onboarding::{EventSource, OnboardingError, OnboardingStatus, StatusEvent};
use crate::ports::{OrganizationRepository, ProcessorClient, ProcessorErrorCode};

use super::apply_status_transition::{StatusTransitionGuard, TransitionOutcome};

/// Configuration for the ReconciliationScheduler.
#[derive(Debug, Clone)]
pub struct ReconciliationSchedulerConfig {
    /// Time between cycle starts.
    pub interval: Duration,

    /// Pause between two merchants in one cycle.
    pub item_delay: Duration,

    /// Organizations in these statuses are polled.
    pub polled_statuses: Vec<OnboardingStatus>,
}

impl Default for ReconciliationSchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30 * 60),
            item_delay: Duration::from_secs(1),
            polled_statuses: vec![
                OnboardingStatus::Pending,
                OnboardingStatus::KycSubmitted,
                OnboardingStatus::MerchantApproved,
            ],
        }
    }
}

impl ReconciliationSchedulerConfig {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_item_delay(mut self, delay: Duration) -> Self {
        self.item_delay = delay;
        self
    }

    pub fn with_polled_statuses(mut self, statuses: Vec<OnboardingStatus>) -> Self {
        self.polled_statuses = statuses;
        self
    }
}

/// Whether a cycle is in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerState {
    Idle,
    Running,
}

/// Counts for one reconciliation cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    /// Merchants selected for polling.
    pub selected: usize,
    pub applied: usize,
    pub unchanged: usize,
    pub rejected: usize,
    /// Merchant unknown locally or at the processor.
    pub not_found: usize,
    /// External, conflict or storage failures.
    pub failed: usize,
    /// Shutdown arrived before every selected merchant was processed.
    pub cancelled: bool,
}

impl CycleReport {
    /// Merchants actually processed, whatever the outcome.
    pub fn processed(&self) -> usize {
        self.applied + self.unchanged + self.rejected + self.not_found + self.failed
    }
}

/// Periodic pull channel into the status transition guard.
pub struct ReconciliationScheduler {
    processor: Arc<dyn ProcessorClient>,
    repository: Arc<dyn OrganizationRepository>,
    guard: Arc<StatusTransitionGuard>,
    config: ReconciliationSchedulerConfig,
    running: AtomicBool,
}

impl ReconciliationScheduler {
    pub fn new(
        processor: Arc<dyn ProcessorClient>,
        repository: Arc<dyn OrganizationRepository>,
        guard: Arc<StatusTransitionGuard>,
    ) -> Self {
        Self::with_config(
            processor,
            repository,
            guard,
            ReconciliationSchedulerConfig::default(),
        )
    }

    pub fn with_config(
        processor: Arc<dyn ProcessorClient>,
        repository: Arc<dyn OrganizationRepository>,
        guard: Arc<StatusTransitionGuard>,
        config: ReconciliationSchedulerConfig,
    ) -> Self {
        Self {
            processor,
            repository,
            guard,
            config,
            running: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> SchedulerState {
        if self.running.load(Ordering::SeqCst) {
            SchedulerState::Running
        } else {
            SchedulerState::Idle
        }
    }

    /// Runs cycles until the shutdown signal is `true` or its sender is dropped.
    ///
    /// The first cycle starts immediately. Errors are logged, never returned.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        if shutdown_requested(&shutdown) {
            return;
        }

        let mut cycle_shutdown = shutdown.clone();
        let mut interval = time::interval(self.config.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            interval_secs = self.config.interval.as_secs(),
            item_delay_ms = self.config.item_delay.as_millis() as u64,
            "Reconciliation scheduler started"
        );

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || shutdown_requested(&shutdown) {
                        break;
                    }
                }

                _ = interval.tick() => {
                    match self.run_cycle(&mut cycle_shutdown).await {
                        Ok(report) if report.cancelled => break,
                        Ok(_) => {}
                        Err(e) => {
                            tracing::error!(error = %e, "Reconciliation cycle aborted");
                        }
                    }
                }
            }
        }

        tracing::info!("Reconciliation scheduler stopped");
    }

    /// Runs one reconciliation cycle.
    ///
    /// # Errors
    ///
    /// Only selection failures are returned; per-merchant failures are
    /// counted in the report.
    pub async fn run_cycle(
        &self,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<CycleReport, OnboardingError> {
        self.running.store(true, Ordering::SeqCst);
        let started = Instant::now();
        let result = self.reconcile(shutdown).await;
        self.running.store(false, Ordering::SeqCst);

        if let Ok(report) = &result {
            tracing::info!(
                selected = report.selected,
                applied = report.applied,
                unchanged = report.unchanged,
                rejected = report.rejected,
                not_found = report.not_found,
                failed = report.failed,
                cancelled = report.cancelled,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Reconciliation cycle finished"
            );
        }
        result
    }

    async fn reconcile(
        &self,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<CycleReport, OnboardingError> {
        let merchants = self.select_merchants().await?;
        let mut report = CycleReport {
            selected: merchants.len(),
            ..CycleReport::default()
        };

        for (index, merchant_ref) in merchants.iter().enumerate() {
            let cancelled = if index == 0 {
                shutdown_requested(shutdown)
            } else {
                self.pause(shutdown).await
            };
            if cancelled {
                report.cancelled = true;
                break;
            }
            self.reconcile_one(merchant_ref, &mut report).await;
        }

        Ok(report)
    }

    async fn select_merchants(&self) -> Result<Vec<MerchantRef>, OnboardingError> {
        let mut merchants = Vec::new();
        for status in &self.config.polled_statuses {
            let organizations = self.repository.find_by_status(*status).await?;
            merchants.extend(organizations.into_iter().filter_map(|org| org.merchant_ref));
        }
        Ok(merchants)
    }

    /// Sleeps for the item delay. Returns true if shutdown was signalled.
    async fn pause(&self, shutdown: &mut watch::Receiver<bool>) -> bool {
        if shutdown_requested(shutdown) {
            return true;
        }
        tokio::select! {
            _ = time::sleep(self.config.item_delay) => false,
            changed = shutdown.changed() => changed.is_err() || shutdown_requested(shutdown),
        }
    }

    async fn reconcile_one(&self, merchant_ref: &MerchantRef, report: &mut CycleReport) {
        let snapshot = match self.processor.get_merchant_status(merchant_ref).await {
            Ok(snapshot) => snapshot,
            Err(e) if e.code == ProcessorErrorCode::NotFound => {
                tracing::warn!(merchant_ref = %merchant_ref, error = %e, "Merchant unknown to processor");
                report.not_found += 1;
                return;
            }
            Err(e) => {
                tracing::warn!(
                    merchant_ref = %merchant_ref,
                    error = %e,
                    retryable = e.is_retryable(),
                    "Merchant status poll failed"
                );
                report.failed += 1;
                return;
            }
        };

        let event = StatusEvent::new(
            merchant_ref.clone(),
            snapshot.status,
            snapshot.observed_at,
            EventSource::Poll,
        )
        .with_reason(snapshot.reason);

        match self.guard.apply(event).await {
            Ok(TransitionOutcome::Applied { .. }) => report.applied += 1,
            Ok(TransitionOutcome::NoOp { .. }) => report.unchanged += 1,
            Ok(TransitionOutcome::Rejected { .. }) => report.rejected += 1,
            Err(OnboardingError::NotFound(_)) => {
                tracing::warn!(merchant_ref = %merchant_ref, "Merchant no longer linked locally");
                report.not_found += 1;
            }
            Err(e) => {
                tracing::warn!(merchant_ref = %merchant_ref, error = %e, "Polled status not applied");
                report.failed += 1;
            }
        }
    }
}

fn shutdown_requested(shutdown: &watch::Receiver<bool>) -> bool {
    *shutdown.borrow()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryOrganizationRepository;
    use crate::adapters::notifier::TracingNotifier;
    use crate::adapters::processor::MockProcessorClient;
    use crate::domain::foundation::{DomainError, OrganizationId, Timestamp};
    use crate::domain::onboarding::{Organization, StatusChange};
    use crate::ports::ProcessorError;
    use async_trait::async_trait;

    fn merchant(n: usize) -> MerchantRef {
        MerchantRef::new(format!("M{}", n)).unwrap()
    }

    fn organization(n: usize, status: OnboardingStatus, linked: bool) -> Organization {
        let mut org = Organization::register(
            OrganizationId::new(),
            format!("Charity {}", n),
            Timestamp::now(),
        );
        if linked {
            org = org.with_merchant_ref(merchant(n));
        }
        org.status = status;
        org
    }

    fn scheduler(
        repo: &InMemoryOrganizationRepository,
        processor: &MockProcessorClient,
        config: ReconciliationSchedulerConfig,
    ) -> ReconciliationScheduler {
        let guard = Arc::new(StatusTransitionGuard::new(
            Arc::new(repo.clone()),
            Arc::new(TracingNotifier::new()),
        ));
        ReconciliationScheduler::with_config(
            Arc::new(processor.clone()),
            Arc::new(repo.clone()),
            guard,
            config,
        )
    }

    fn fast_config() -> ReconciliationSchedulerConfig {
        ReconciliationSchedulerConfig::default().with_item_delay(Duration::ZERO)
    }

    async fn status_of(repo: &InMemoryOrganizationRepository, n: usize) -> OnboardingStatus {
        repo.find_by_merchant_ref(&merchant(n))
            .await
            .unwrap()
            .unwrap()
            .status
    }

    #[tokio::test]
    async fn cycle_applies_polled_statuses() {
        let repo = InMemoryOrganizationRepository::with_organizations([organization(
            1,
            OnboardingStatus::KycSubmitted,
            true,
        )]);
        let processor = MockProcessorClient::new();
        processor.set_status(&merchant(1), OnboardingStatus::Active);
        let scheduler = scheduler(&repo, &processor, fast_config());
        let (_tx, mut rx) = watch::channel(false);

        let report = scheduler.run_cycle(&mut rx).await.unwrap();

        assert_eq!(report.selected, 1);
        assert_eq!(report.applied, 1);
        assert_eq!(status_of(&repo, 1).await, OnboardingStatus::Active);
        assert_eq!(scheduler.state(), SchedulerState::Idle);
    }

    #[tokio::test]
    async fn one_failure_does_not_stop_the_batch() {
        let organizations: Vec<_> = (1..=10)
            .map(|n| organization(n, OnboardingStatus::KycSubmitted, true))
            .collect();
        let repo = InMemoryOrganizationRepository::with_organizations(organizations);
        let processor = MockProcessorClient::new();
        for n in 1..=10 {
            processor.set_status(&merchant(n), OnboardingStatus::MerchantApproved);
        }
        processor.fail_for(&merchant(4), ProcessorError::timeout("deadline elapsed"));
        let scheduler = scheduler(&repo, &processor, fast_config());
        let (_tx, mut rx) = watch::channel(false);

        let report = scheduler.run_cycle(&mut rx).await.unwrap();

        assert_eq!(report.selected, 10);
        assert_eq!(report.applied, 9);
        assert_eq!(report.failed, 1);
        assert_eq!(status_of(&repo, 4).await, OnboardingStatus::KycSubmitted);
        for n in (1..=10).filter(|n| *n != 4) {
            assert_eq!(status_of(&repo, n).await, OnboardingStatus::MerchantApproved);
        }
    }

    #[tokio::test]
    async fn unlinked_and_settled_organizations_are_not_polled() {
        let repo = InMemoryOrganizationRepository::with_organizations([
            organization(1, OnboardingStatus::Pending, false),
            organization(2, OnboardingStatus::Active, true),
            organization(3, OnboardingStatus::Rejected, true),
            organization(4, OnboardingStatus::Pending, true),
        ]);
        let processor = MockProcessorClient::new();
        processor.set_status(&merchant(4), OnboardingStatus::Pending);
        let scheduler = scheduler(&repo, &processor, fast_config());
        let (_tx, mut rx) = watch::channel(false);

        let report = scheduler.run_cycle(&mut rx).await.unwrap();

        assert_eq!(report.selected, 1);
        assert_eq!(report.unchanged, 1);
        assert_eq!(processor.call_count("get_merchant_status"), 1);
        assert_eq!(processor.calls()[0].merchant_ref, Some(merchant(4)));
    }

    #[tokio::test]
    async fn stale_poll_does_not_undo_webhook_approval() {
        let repo = InMemoryOrganizationRepository::with_organizations([organization(
            1,
            OnboardingStatus::KycSubmitted,
            true,
        )]);
        let processor = MockProcessorClient::new();
        processor.set_status(&merchant(1), OnboardingStatus::KycSubmitted);
        let scheduler = scheduler(&repo, &processor, fast_config());

        // Webhook approval lands between the poll's snapshot and its apply.
        let org = repo.find_by_merchant_ref(&merchant(1)).await.unwrap().unwrap();
        repo.compare_and_swap_status(
            &org.id,
            0,
            StatusChange {
                status: OnboardingStatus::MerchantApproved,
                reason: None,
                observed_at: Some(Timestamp::now()),
            },
        )
        .await
        .unwrap();

        let (_tx, mut rx) = watch::channel(false);
        let report = scheduler.run_cycle(&mut rx).await.unwrap();

        assert_eq!(report.rejected, 1);
        assert_eq!(status_of(&repo, 1).await, OnboardingStatus::MerchantApproved);
    }

    #[tokio::test]
    async fn approval_reported_in_whole_seconds_is_applied() {
        use chrono::{TimeZone, Utc};
        use crate::ports::MerchantStatusSnapshot;

        let mut org = organization(1, OnboardingStatus::KycSubmitted, true);
        org.status_observed_at = Some(Timestamp::from_datetime(
            Utc.timestamp_millis_opt(1_700_000_000_700).unwrap(),
        ));
        let repo = InMemoryOrganizationRepository::with_organizations([org]);
        let processor = MockProcessorClient::new();
        processor.set_snapshot(
            &merchant(1),
            MerchantStatusSnapshot {
                status: OnboardingStatus::MerchantApproved,
                reason: None,
                observed_at: Timestamp::from_unix_secs(1_700_000_000).unwrap(),
            },
        );
        let scheduler = scheduler(&repo, &processor, fast_config());
        let (_tx, mut rx) = watch::channel(false);

        let first = scheduler.run_cycle(&mut rx).await.unwrap();
        let second = scheduler.run_cycle(&mut rx).await.unwrap();

        assert_eq!(first.applied, 1);
        assert_eq!(first.rejected, 0);
        assert_eq!(second.unchanged, 1);
        assert_eq!(status_of(&repo, 1).await, OnboardingStatus::MerchantApproved);
    }

    #[tokio::test]
    async fn processor_not_found_is_counted_separately() {
        let repo = InMemoryOrganizationRepository::with_organizations([organization(
            1,
            OnboardingStatus::Pending,
            true,
        )]);
        let processor = MockProcessorClient::new();
        let scheduler = scheduler(&repo, &processor, fast_config());
        let (_tx, mut rx) = watch::channel(false);

        let report = scheduler.run_cycle(&mut rx).await.unwrap();

        assert_eq!(report.not_found, 1);
        assert_eq!(report.failed, 0);
    }

    struct FailingRepository;

    #[async_trait]
    impl OrganizationRepository for FailingRepository {
        async fn insert(&self, _organization: &Organization) -> Result<(), DomainError> {
            Err(DomainError::database("connection refused"))
        }

        async fn find_by_id(
            &self,
            _id: &OrganizationId,
        ) -> Result<Option<Organization>, DomainError> {
            Err(DomainError::database("connection refused"))
        }

        async fn find_by_merchant_ref(
            &self,
            _merchant_ref: &MerchantRef,
        ) -> Result<Option<Organization>, DomainError> {
            Err(DomainError::database("connection refused"))
        }

        async fn find_by_status(
            &self,
            _status: OnboardingStatus,
        ) -> Result<Vec<Organization>, DomainError> {
            Err(DomainError::database("connection refused"))
        }

        async fn compare_and_swap_status(
            &self,
            _id: &OrganizationId,
            _expected_version: u64,
            _change: StatusChange,
        ) -> Result<bool, DomainError> {
            Err(DomainError::database("connection refused"))
        }

        async fn link_merchant_ref(
            &self,
            _id: &OrganizationId,
            _merchant_ref: &MerchantRef,
        ) -> Result<(), DomainError> {
            Err(DomainError::database("connection refused"))
        }
    }

    #[tokio::test]
    async fn selection_failure_aborts_only_the_cycle() {
        let repo: Arc<dyn OrganizationRepository> = Arc::new(FailingRepository);
        let guard = Arc::new(StatusTransitionGuard::new(
            Arc::clone(&repo),
            Arc::new(TracingNotifier::new()),
        ));
        let scheduler = ReconciliationScheduler::with_config(
            Arc::new(MockProcessorClient::new()),
            repo,
            guard,
            fast_config(),
        );
        let (_tx, mut rx) = watch::channel(false);

        let err = scheduler.run_cycle(&mut rx).await.unwrap_err();

        assert!(matches!(err, OnboardingError::Repository(_)));
        assert_eq!(scheduler.state(), SchedulerState::Idle);
    }

    #[tokio::test]
    async fn shutdown_interrupts_item_delay() {
        let organizations: Vec<_> = (1..=3)
            .map(|n| organization(n, OnboardingStatus::Pending, true))
            .collect();
        let repo = InMemoryOrganizationRepository::with_organizations(organizations);
        let processor = MockProcessorClient::new();
        for n in 1..=3 {
            processor.set_status(&merchant(n), OnboardingStatus::Pending);
        }
        let scheduler = Arc::new(scheduler(
            &repo,
            &processor,
            ReconciliationSchedulerConfig::default().with_item_delay(Duration::from_secs(3600)),
        ));
        let (tx, mut rx) = watch::channel(false);

        let handle = {
            let scheduler = Arc::clone(&scheduler);
            tokio::spawn(async move { scheduler.run_cycle(&mut rx).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        tx.send(true).unwrap();

        let report = tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("cycle should stop promptly")
            .unwrap()
            .unwrap();

        assert!(report.cancelled);
        assert_eq!(report.processed(), 1);
    }

    #[tokio::test]
    async fn run_starts_immediately_and_stops_on_shutdown() {
        let repo = InMemoryOrganizationRepository::with_organizations([organization(
            1,
            OnboardingStatus::Pending,
            true,
        )]);
        let processor = MockProcessorClient::new();
        processor.set_status(&merchant(1), OnboardingStatus::KycSubmitted);
        let scheduler = Arc::new(scheduler(
            &repo,
            &processor,
            fast_config().with_interval(Duration::from_secs(3600)),
        ));
        let (tx, rx) = watch::channel(false);

        let handle = {
            let scheduler = Arc::clone(&scheduler);
            tokio::spawn(async move { scheduler.run(rx).await })
        };
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(status_of(&repo, 1).await, OnboardingStatus::KycSubmitted);

        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("scheduler should stop promptly")
            .unwrap();
        assert_eq!(processor.call_count("get_merchant_status"), 1);
    }
}
