// HTTP + WebSocket routes

mod http;
mod ws;

use axum::{Router, routing::get};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::AppConfig;
use crate::upstream_repo::Upstream;

pub(crate) struct AppState<U> {
    pub(crate) upstream: Arc<U>,
    pub(crate) config: AppConfig,
}

// Manual impl: `U` itself need not be Clone.
impl<U> Clone for AppState<U> {
    fn clone(&self) -> Self {
        Self {
            upstream: self.upstream.clone(),
            config: self.config.clone(),
        }
    }
}

pub fn app<U: Upstream + 'static>(upstream: Arc<U>, config: AppConfig) -> Router {
    let state = AppState { upstream, config };
    Router::new()
        .route("/", get(|| async { "clusterview: inventory aggregation service" })) // GET /
        .route("/version", get(http::version_handler)) // GET /version
        .route("/api/resolve", get(http::resolve_handler::<U>)) // GET /api/resolve
        .route("/api/series", get(http::series_handler::<U>)) // GET /api/series
        .route("/ws/selection", get(ws::ws_selection::<U>)) // WS /ws/selection
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}
