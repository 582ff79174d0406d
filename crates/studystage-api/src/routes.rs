//! Router setup with all API routes and middleware.

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use studystage_core::config::StudyConfig;
use studystage_core::error::StudyError;

use crate::handlers;
use crate::state::AppState;

/// Body limit for JSON endpoints.
const JSON_BODY_LIMIT: usize = 1024 * 1024;

/// Create the axum Router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    // Localhost origins on the API port and the next one (dev frontend).
    let port = state.config.general.port;
    let origins: Vec<HeaderValue> = [port, port.saturating_add(1)]
        .iter()
        .flat_map(|p| {
            [
                format!("http://127.0.0.1:{}", p),
                format!("http://localhost:{}", p),
            ]
        })
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect();
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    let upload_limit = state.config.general.upload_limit_bytes;

    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/documents",
            get(handlers::list_documents).post(handlers::add_document),
        )
        .route(
            "/documents/upload",
            post(handlers::upload_document).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/search", get(handlers::search))
        .route("/ask", post(handlers::ask))
        .route("/quiz", post(handlers::quiz))
        .route("/plan", post(handlers::plan))
        .route("/keywords", post(handlers::keywords))
        .layer(DefaultBodyLimit::max(JSON_BODY_LIMIT))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Bind `general.host:general.port` and serve until the process exits.
pub async fn start_server(config: &StudyConfig, state: AppState) -> Result<(), StudyError> {
    let addr = format!("{}:{}", config.general.host, config.general.port);
    let router = create_router(state);

    tracing::info!("Starting API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| StudyError::Api(format!("Failed to bind {}: {}", addr, e)))?;

    axum::serve(listener, router)
        .await
        .map_err(|e| StudyError::Api(format!("Server error: {}", e)))?;

    Ok(())
}
