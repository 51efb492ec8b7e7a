//! Application startup and lifecycle management.

use crate::config::{EmailDelivery, InvoicingConfig, StoreBackend};
use crate::handlers;
use crate::services::notification::{
    EmailProvider, PreviewEmailProvider, ResendProvider, SmtpProvider,
};
use crate::services::{
    InvoiceMailer, InvoiceWorkflow, MemoryStore, MongoStore, PaymentService, Repositories,
};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::request_id_middleware;
use std::future::{Future, IntoFuture};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub repositories: Repositories,
    pub workflow: InvoiceWorkflow,
    pub payments: PaymentService,
}

impl AppState {
    pub fn new(
        repositories: Repositories,
        email_provider: Arc<dyn EmailProvider>,
        sender_address: impl Into<String>,
        public_origin: impl Into<String>,
    ) -> Self {
        let mailer = InvoiceMailer::new(
            email_provider,
            repositories.email_logs.clone(),
            sender_address,
        );
        let workflow = InvoiceWorkflow::new(&repositories, mailer, public_origin);
        let payments = PaymentService::new(repositories.invoices.clone(), workflow.clone());
        Self {
            repositories,
            workflow,
            payments,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics_endpoint))
        .route(
            "/api/profile",
            get(handlers::get_profile).put(handlers::put_profile),
        )
        .route(
            "/api/invoices",
            get(handlers::list_invoices).post(handlers::create_invoice),
        )
        .route("/api/invoices/:id", get(handlers::get_invoice))
        .route("/api/invoices/:id/pdf", get(handlers::invoice_pdf))
        .route("/api/invoices/:id/send", post(handlers::send_invoice))
        .route("/api/invoices/:id/viewed", post(handlers::mark_viewed))
        .route("/api/invoices/:id/paid", post(handlers::mark_paid))
        .route("/api/invoices/:id/emails", get(handlers::email_history))
        .route(
            "/api/income",
            get(handlers::list_income).post(handlers::record_income),
        )
        .route("/api/contracts/pdf", post(handlers::contract_pdf))
        .route(
            "/pay",
            get(handlers::payment_summary).post(handlers::submit_payment),
        )
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(request_id_middleware))
        .with_state(state)
}

async fn build_repositories(config: &InvoicingConfig) -> Result<Repositories, AppError> {
    match config.store.backend {
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; data is lost on restart");
            Ok(Repositories::from_store(MemoryStore::new()))
        }
        StoreBackend::Mongodb => {
            let mongo = config.store.mongodb.as_ref().ok_or_else(|| {
                AppError::ConfigError(anyhow::anyhow!("MongoDB settings are missing"))
            })?;
            let store = MongoStore::connect(&mongo.uri, &mongo.database)
                .await
                .map_err(|e| {
                    tracing::error!("Failed to connect to MongoDB: {}", e);
                    e
                })?;
            store.initialize_indexes().await.map_err(|e| {
                tracing::error!("Failed to initialize database indexes: {}", e);
                e
            })?;
            Ok(Repositories::from_store(store))
        }
    }
}

fn build_email_provider(config: &InvoicingConfig) -> Result<Arc<dyn EmailProvider>, AppError> {
    let email = &config.email;
    let provider: Arc<dyn EmailProvider> = match email.delivery {
        EmailDelivery::Resend => {
            let resend = email.resend.clone().ok_or_else(|| {
                AppError::ConfigError(anyhow::anyhow!("Resend settings are missing"))
            })?;
            Arc::new(ResendProvider::new(resend))
        }
        EmailDelivery::Smtp => {
            let smtp = email.smtp.as_ref().ok_or_else(|| {
                AppError::ConfigError(anyhow::anyhow!("SMTP settings are missing"))
            })?;
            Arc::new(
                SmtpProvider::new(smtp)
                    .map_err(|e| AppError::ConfigError(anyhow::Error::new(e)))?,
            )
        }
        EmailDelivery::Preview => {
            tracing::warn!("Email delivery is in preview mode; nothing will be sent");
            Arc::new(PreviewEmailProvider::new())
        }
    };
    tracing::info!(provider = provider.name(), "Email provider initialized");
    Ok(provider)
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    server: Box<dyn Future<Output = std::io::Result<()>> + Send + Unpin>,
    state: AppState,
}

impl Application {
    pub async fn build(config: InvoicingConfig) -> Result<Self, AppError> {
        let repositories = build_repositories(&config).await?;
        let email_provider = build_email_provider(&config)?;

        let state = AppState::new(
            repositories,
            email_provider,
            config.email.sender_address(),
            config.public_origin.clone(),
        );

        let app = build_router(state.clone());

        // Port 0 binds a random port for tests
        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Listening on {}", port);

        let server = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .into_future();

        Ok(Self {
            port,
            server: Box::new(server),
            state,
        })
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        self.server.await
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
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
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
