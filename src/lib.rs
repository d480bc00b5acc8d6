use std::{sync::Arc, time::Duration};

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tokio_util::sync::CancellationToken;

pub mod config;
pub mod domain;
pub mod errors;
pub mod http;
pub mod llm_client;
pub mod logging;
pub mod mcp;
pub mod session;

use domain::tools::ToolRegistry;
use llm_client::LanguageModel;
use session::SessionStore;

#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionStore>,
    pub registry: Arc<ToolRegistry>,
    pub language_model: Option<Arc<dyn LanguageModel>>,
    pub public_base_url: Arc<str>,
    pub keepalive_interval: Duration,
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(
        public_base_url: String,
        keepalive_interval: Duration,
        language_model: Option<Arc<dyn LanguageModel>>,
    ) -> Self {
        Self {
            sessions: Arc::new(SessionStore::new()),
            registry: Arc::new(ToolRegistry::new()),
            language_model,
            public_base_url: Arc::<str>::from(public_base_url),
            keepalive_interval,
            shutdown: CancellationToken::new(),
        }
    }

    /// Ends open keep-alive streams and drops all sessions.
    pub async fn close(&self) {
        self.shutdown.cancel();
        self.sessions.clear().await;
    }
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(http::handlers::root))
        .route("/health", get(http::handlers::health))
        .route(
            "/mcp",
            post(http::handlers::mcp_post)
                .get(http::handlers::mcp_get)
                .delete(http::handlers::mcp_delete),
        )
        .route(
            "/.well-known/oauth-authorization-server",
            get(http::discovery::oauth_authorization_server),
        )
        .route(
            "/.well-known/mcp.json",
            get(http::discovery::legacy_manifest),
        )
        .route("/register", post(http::discovery::register_client))
        .route("/token", post(http::discovery::issue_token))
        .route("/openapi.json", get(http::discovery::openapi_spec))
        .layer(middleware::from_fn(http::cors::cors_middleware))
        .layer(middleware::from_fn(logging::request_logging_middleware))
        .with_state(state)
}
