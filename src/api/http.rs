//! HTTP server setup with Axum

use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::resource;
use super::state::AppState;
use crate::broadcast::GroupStats;

/// Create the Axum router with all endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    // CORS configuration - allow all origins for development
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers(Any);

    let path = state.config.path.clone();
    // BodyLimit enforces the configured size; axum's own 2 MiB cap must not undercut it
    let body_limit = DefaultBodyLimit::max(state.config.max_body_bytes);

    Router::new()
        // Push endpoint
        .route(
            &path,
            get(resource::open_channel)
                .post(resource::post_message)
                .delete(resource::close_channel)
                .layer(body_limit),
        )
        // Health check
        .route("/health", get(health_check))
        .route("/stats", get(stats))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

/// Response for GET /stats
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub connections: usize,
    pub relay_group: String,
    pub interceptors: Vec<&'static str>,
    pub groups: Vec<GroupStats>,
}

async fn stats(State(state): State<Arc<AppState>>) -> Json<StatsResponse> {
    Json(StatsResponse {
        connections: state.handler.connection_count(),
        relay_group: state.handler.relay_group().to_string(),
        interceptors: state.handler.interceptor_names(),
        groups: state.registry().stats(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use axum::body::Body;
    use axum::http::Request;
    use tower::util::ServiceExt;

    #[tokio::test]
    async fn test_health_check() {
        let state = Arc::new(AppState::from_config(Config::default()));
        let app = create_router(state);

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), 200);
    }

    #[tokio::test]
    async fn test_stats_lists_interceptors() {
        let state = Arc::new(AppState::from_config(Config::default()));
        let app = create_router(state);

        let response = app
            .oneshot(Request::builder().uri("/stats").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), 200);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["connections"], 0);
        assert_eq!(json["interceptors"][0], "suspend-tracker");
    }
}
