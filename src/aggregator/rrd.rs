// Series fetch: RRD window for a selection, normalized into chart points.

use tracing::instrument;

use super::{Coalesce, ResolveError, tolerate};
use crate::models::upstream::parse_records;
use crate::models::{NodeRecord, SeriesPoint, SeriesSource, Timeframe};
use crate::selection::{GuestKey, NodeKey, Selection, StoreKey};
use crate::series;
use crate::upstream_repo::{Upstream, endpoints, fetch_list};

/// Root and cluster selections have no series of their own and yield an empty list.
#[instrument(
    skip(upstream),
    fields(kind = %selection.kind(), operation = "fetch_series")
)]
pub async fn fetch_series<U: Upstream>(
    upstream: &U,
    selection: &Selection,
    timeframe: Timeframe,
) -> Result<Vec<SeriesPoint>, ResolveError> {
    match selection {
        Selection::Root | Selection::Cluster(_) => Ok(Vec::new()),
        Selection::Node(id) => {
            let key = NodeKey::parse(id);
            let samples = fetch_list(upstream, endpoints::node_rrd(&key, timeframe)).await?;
            Ok(series::normalize(&samples, SeriesSource::Node, None))
        }
        Selection::Guest(id) => {
            let key = GuestKey::parse(id);
            let (samples, nodes) = tokio::join!(
                fetch_list(upstream, endpoints::guest_rrd(&key, timeframe)),
                fetch_list(upstream, endpoints::nodes(&key.connection)),
            );
            let samples = samples?;
            let nodes: Vec<NodeRecord> =
                parse_records(tolerate("nodes", nodes).coalesce(), "node");
            let hint = nodes
                .iter()
                .find(|n| n.node == key.node)
                .and_then(|n| n.maxmem);
            Ok(series::normalize(&samples, SeriesSource::Guest, hint))
        }
        Selection::BackupServer(server) => {
            let samples = fetch_list(upstream, endpoints::backup_rrd(server, timeframe)).await?;
            Ok(series::normalize(&samples, SeriesSource::Backup, None))
        }
        Selection::BackupStore(id) => {
            let key = StoreKey::parse(id);
            let samples = fetch_list(upstream, endpoints::store_rrd(&key, timeframe)).await?;
            Ok(series::normalize(&samples, SeriesSource::Backup, None))
        }
    }
}
