// Selection resolution: one branch per kind, each a fixed concurrent fan-out over upstream
// requests followed by synchronous assembly into a `CanonicalPayload`.
//
// Required requests propagate through `ResolveError`; optional ones collapse to `Absent`
// and the branch continues with defaults.

mod assemble;
mod backup;
mod cluster;
mod guest;
pub mod guest_config;
mod node;
mod root;
mod rrd;

pub use rrd::fetch_series;

use tracing::instrument;

use crate::config::ResolutionConfig;
use crate::models::CanonicalPayload;
use crate::selection::{GuestKey, NodeKey, Selection, StoreKey};
use crate::upstream_repo::{FetchError, Upstream};

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// The entity is missing from an authoritative list that was fetched successfully.
    #[error("{what} not found")]
    NotFound { what: String },
    #[error(transparent)]
    Upstream(#[from] FetchError),
}

impl ResolveError {
    pub(crate) fn not_found(what: impl Into<String>) -> Self {
        ResolveError::NotFound { what: what.into() }
    }
}

/// Marker for an optional source that failed; the failure itself is only logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Absent;

pub type Optional<T> = Result<T, Absent>;

/// Downgrades a failed optional request to `Absent`.
pub(crate) fn tolerate<T>(source: &'static str, result: Result<T, FetchError>) -> Optional<T> {
    result.map_err(|e| {
        tracing::debug!(error = %e, source, "optional source unavailable");
        Absent
    })
}

pub(crate) trait Coalesce<T> {
    /// The value, or `T::default()` when absent.
    fn coalesce(self) -> T
    where
        T: Default;

    fn present(self) -> Option<T>;
}

impl<T> Coalesce<T> for Optional<T> {
    fn coalesce(self) -> T
    where
        T: Default,
    {
        self.unwrap_or_default()
    }

    fn present(self) -> Option<T> {
        self.ok()
    }
}

/// Resolves a selection into its canonical payload.
#[instrument(
    skip(upstream, settings),
    fields(kind = %selection.kind(), operation = "resolve")
)]
pub async fn resolve<U: Upstream>(
    upstream: &U,
    settings: &ResolutionConfig,
    selection: &Selection,
) -> Result<CanonicalPayload, ResolveError> {
    let result = match selection {
        Selection::Root => root::resolve(upstream).await,
        Selection::Cluster(id) => cluster::resolve(upstream, id).await,
        Selection::Node(id) => node::resolve(upstream, &NodeKey::parse(id)).await,
        Selection::Guest(id) => guest::resolve(upstream, settings, &GuestKey::parse(id)).await,
        Selection::BackupServer(id) => backup::resolve_server(upstream, settings, id).await,
        Selection::BackupStore(id) => {
            backup::resolve_store(upstream, settings, &StoreKey::parse(id)).await
        }
    };
    if let Err(e) = &result {
        tracing::warn!(error = %e, selection = %selection, "resolution failed");
    }
    result
}
