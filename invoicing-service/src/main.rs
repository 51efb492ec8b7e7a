use invoicing_service::config::InvoicingConfig;
use invoicing_service::services::init_metrics;
use invoicing_service::startup::Application;
use service_core::observability::init_tracing;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Tracing settings come from the config, so it has to load first
    let config = InvoicingConfig::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        std::io::Error::other(format!("Configuration error: {}", e))
    })?;

    init_tracing(
        "invoicing-service",
        &config.common.log_level,
        config.common.otlp_endpoint.as_deref(),
    );
    init_metrics();

    let application = Application::build(config).await.map_err(|e| {
        tracing::error!("Failed to build application: {}", e);
        std::io::Error::other(format!("Startup error: {}", e))
    })?;

    application.run_until_stopped().await
}
