use std::sync::Arc;

use relay_mcp::{
    build_app,
    config::Config,
    llm_client::{AnthropicClient, LanguageModel},
    logging, AppState,
};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_logging();

    let config = Config::from_env()?;

    let language_model: Option<Arc<dyn LanguageModel>> = match config.anthropic.clone() {
        Some(anthropic) => {
            info!(model = %anthropic.model, "language model configured");
            Some(Arc::new(AnthropicClient::new(anthropic)?))
        }
        None => {
            warn!("ANTHROPIC_API_KEY not set; ask_claude will report an error");
            None
        }
    };

    let bind_socket = config.bind_socket()?;
    let state = AppState::new(
        config.public_base_url.clone(),
        config.keepalive_interval,
        language_model,
    );
    let app = build_app(state.clone());
    let listener = tokio::net::TcpListener::bind(bind_socket).await?;

    info!(
        bind_addr = %config.bind_addr,
        bind_port = config.bind_port,
        public_base_url = %config.public_base_url,
        "server starting"
    );

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal(state))
        .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal(state: AppState) {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for ctrl_c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("ctrl_c received; shutting down"),
        _ = terminate => info!("SIGTERM received; shutting down"),
    }

    state.close().await;
}
