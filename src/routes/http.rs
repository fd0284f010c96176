// GET handlers: version, resolve, series

use axum::{
    Json,
    extract::{Query, State, rejection::QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use super::AppState;
use crate::aggregator::{self, ResolveError};
use crate::models::Timeframe;
use crate::selection::{Selection, SelectionKind};
use crate::upstream_repo::Upstream;
use crate::version::{NAME, VERSION};

/// `?kind=node&id=c1:pve1[&timeframe=day]`
#[derive(Debug, Deserialize)]
pub(super) struct SelectionQuery {
    kind: SelectionKind,
    id: Option<String>,
    timeframe: Option<Timeframe>,
}

impl SelectionQuery {
    fn selection(&self) -> Selection {
        Selection::from_parts(self.kind, self.id.clone())
    }
}

/// JSON error body: `{"error": "..."}`.
pub(super) struct ApiError {
    status: StatusCode,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(serde_json::json!({ "error": self.message })),
        )
            .into_response()
    }
}

impl From<ResolveError> for ApiError {
    fn from(e: ResolveError) -> Self {
        let status = match &e {
            ResolveError::NotFound { .. } => StatusCode::NOT_FOUND,
            ResolveError::Upstream(_) => StatusCode::BAD_GATEWAY,
        };
        Self {
            status,
            message: e.to_string(),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(e: QueryRejection) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: e.body_text(),
        }
    }
}

/// GET /version: returns service name and version (from Cargo.toml at build time).
pub(super) async fn version_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": NAME,
        "version": VERSION,
    }))
}

/// GET /api/resolve: canonical payload for one selection.
pub(super) async fn resolve_handler<U: Upstream + 'static>(
    State(state): State<AppState<U>>,
    query: Result<Query<SelectionQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(query) = query?;
    let payload = aggregator::resolve(
        state.upstream.as_ref(),
        &state.config.resolution,
        &query.selection(),
    )
    .await?;
    Ok(Json(payload))
}

/// GET /api/series: normalized RRD points; `timeframe` defaults to the configured window.
pub(super) async fn series_handler<U: Upstream + 'static>(
    State(state): State<AppState<U>>,
    query: Result<Query<SelectionQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(query) = query?;
    let timeframe = query
        .timeframe
        .unwrap_or(state.config.resolution.default_timeframe);
    let points = aggregator::fetch_series(state.upstream.as_ref(), &query.selection(), timeframe)
        .await
        .inspect_err(|e| tracing::debug!(error = %e, operation = "fetch_series", "series unavailable"))?;
    Ok(Json(points))
}
