// Root: the configured connections, grouped by type.

use std::collections::BTreeMap;

use serde_json::Value;

use super::ResolveError;
use super::assemble::PayloadBuilder;
use crate::envelope;
use crate::models::{CanonicalPayload, ConnectionSummary, Extension, HealthStatus, RootDetails};
use crate::upstream_repo::{Upstream, endpoints, fetch_list};

pub(super) async fn resolve<U: Upstream>(upstream: &U) -> Result<CanonicalPayload, ResolveError> {
    let items = fetch_list(upstream, endpoints::connections()).await?;
    let connections: Vec<ConnectionSummary> = items.iter().filter_map(summary).collect();

    let mut by_type: BTreeMap<String, usize> = BTreeMap::new();
    for c in &connections {
        let kind = c.connection_type.as_deref().unwrap_or("other");
        *by_type.entry(kind.to_string()).or_default() += 1;
    }

    let mut b = PayloadBuilder::new("Inventory");
    b.breadcrumb("Inventory")
        .kpi("Connections", connections.len().to_string());
    for (kind, count) in &by_type {
        b.kpi(kind, count.to_string());
    }

    Ok(b.finish(
        HealthStatus::Unknown,
        Extension::Root(RootDetails { connections }),
    ))
}

/// Entries without an id cannot be selected and are skipped.
fn summary(item: &Value) -> Option<ConnectionSummary> {
    let id = envelope::text(item, "id").filter(|s| !s.is_empty())?;
    Some(ConnectionSummary {
        name: envelope::text(item, "name").unwrap_or_else(|| id.clone()),
        connection_type: envelope::text(item, "type"),
        id,
    })
}
