use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cardsign_api::config::BridgeConfig;
use cardsign_api::router::build_app_router;
use cardsign_api::state::AppState;
use cardsign_pipeline::{InMemoryGuard, Orchestrator, PipelineSettings};
use cardsign_signature::SignatureClient;
use cardsign_workflow::WorkflowClient;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cardsign=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = BridgeConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = config.port,
        vault_routes = config.vault_routes.len(),
        "Loaded bridge configuration"
    );

    // --- Outbound clients (one pooled HTTP client for both services) ---
    let http = reqwest::Client::builder()
        .build()
        .expect("Failed to build outbound HTTP client");

    let workflow = Arc::new(WorkflowClient::new(
        http.clone(),
        config.workflow_endpoint.clone(),
        config.workflow_token.clone(),
    ));
    let signature = Arc::new(SignatureClient::new(
        http,
        config.signature_base_url.clone(),
        config.signature_token.clone(),
        config.signature_crypt_key.clone(),
    ));

    // --- Pipeline ---
    let orchestrator = Arc::new(Orchestrator::new(
        workflow,
        signature,
        Arc::new(InMemoryGuard::default()),
        PipelineSettings {
            trigger_field_id: config.trigger_field_id.clone(),
            link_field_id: config.link_field_id.clone(),
            destination_phase_id: config.destination_phase_id.clone(),
            template_id: config.template_id.clone(),
            link_base_url: config.link_base_url.clone(),
            vaults: config.vault_routes.clone(),
        },
    ));

    // --- Router ---
    let state = AppState { orchestrator };
    let app = build_app_router(state, config.request_timeout_secs);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting webhook server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server shuts
/// down cleanly whether stopped interactively or by a process manager.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
