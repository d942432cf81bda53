//! Charity Onboarding server entry point.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use charity_onboarding::adapters::http::onboarding::{build_app, OnboardingAppState};
use charity_onboarding::adapters::{
    HttpProcessorClient, HttpProcessorConfig, InMemoryOrganizationRepository,
    InMemoryWebhookReceiptStore, TracingNotifier,
};
use charity_onboarding::application::{
    ReconciliationScheduler, ReconciliationSchedulerConfig, StatusTransitionGuard,
    WebhookIngestor,
};
use charity_onboarding::config::{AppConfig, ConfigError, ValidationError};
use charity_onboarding::domain::onboarding::ProcessorWebhookVerifier;
use charity_onboarding::ports::{
    OnboardingNotifier, OrganizationRepository, ProcessorClient, ProcessorError,
    WebhookReceiptStore,
};

/// How often expired webhook receipts are purged.
const RECEIPT_PRUNE_PERIOD: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Error)]
enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Invalid configuration: {0}")]
    Validation(#[from] ValidationError),

    #[error("Processor client: {0}")]
    Processor(#[from] ProcessorError),

    #[error("Server I/O: {0}")]
    Io(#[from] std::io::Error),
}

#[tokio::main]
async fn main() -> Result<(), StartupError> {
    let config = AppConfig::load()?;
    config.validate()?;

    init_tracing(&config);

    let repository: Arc<dyn OrganizationRepository> =
        Arc::new(InMemoryOrganizationRepository::new());
    let receipts: Arc<dyn WebhookReceiptStore> = Arc::new(InMemoryWebhookReceiptStore::new());
    let notifier: Arc<dyn OnboardingNotifier> = Arc::new(TracingNotifier::new());

    let processor_config = HttpProcessorConfig::new(
        config.processor.active_base_url(),
        config.processor.client_id.clone(),
        config.processor.client_secret(),
    )
    .with_request_timeout(config.processor.request_timeout())
    .with_token_expiry_buffer(config.processor.token_expiry_buffer());
    let processor: Arc<dyn ProcessorClient> =
        Arc::new(HttpProcessorClient::new(processor_config)?);

    let guard = Arc::new(StatusTransitionGuard::new(repository.clone(), notifier));

    let ingestor = Arc::new(
        WebhookIngestor::new(
            ProcessorWebhookVerifier::new(config.processor.webhook_secret()),
            guard.clone(),
            receipts,
        )
        .with_dedup_window(config.reconciliation.dedup_window()),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let scheduler = if config.reconciliation.enabled {
        let scheduler_config = ReconciliationSchedulerConfig::default()
            .with_interval(config.reconciliation.interval())
            .with_item_delay(config.reconciliation.item_delay());
        let scheduler = Arc::new(ReconciliationScheduler::with_config(
            processor,
            repository,
            guard,
            scheduler_config,
        ));
        Some(scheduler)
    } else {
        tracing::info!("Reconciliation disabled");
        None
    };

    let scheduler_task = scheduler.clone().map(|scheduler| {
        let shutdown = shutdown_rx.clone();
        tokio::spawn(async move { scheduler.run(shutdown).await })
    });

    let pruning_task = {
        let ingestor = Arc::clone(&ingestor);
        let shutdown = shutdown_rx.clone();
        tokio::spawn(async move {
            ingestor
                .run_receipt_pruning(RECEIPT_PRUNE_PERIOD, shutdown)
                .await
        })
    };

    let state = OnboardingAppState {
        webhook_ingestor: ingestor,
        scheduler,
    };
    let app = build_app(state, config.server.request_timeout());

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(
        %addr,
        environment = ?config.server.environment,
        sandbox = config.processor.sandbox,
        "Charity onboarding listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = shutdown_tx.send(true);
    if let Some(task) = scheduler_task {
        if let Err(e) = task.await {
            tracing::error!(error = %e, "Reconciliation task ended abnormally");
        }
    }
    if let Err(e) = pruning_task.await {
        tracing::error!(error = %e, "Receipt pruning task ended abnormally");
    }

    tracing::info!("Charity onboarding stopped");
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));

    if config.is_production() {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("Received terminate signal, shutting down"),
    }
}
