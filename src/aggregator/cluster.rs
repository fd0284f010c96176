// Cluster: node and guest rollups across one connection.

use serde_json::Value;

use super::assemble::{self, PayloadBuilder};
use super::{Coalesce, ResolveError, tolerate};
use crate::envelope;
use crate::models::upstream::parse_records;
use crate::models::{
    CanonicalPayload, ClusterDetails, Extension, Gauge, Metrics, NodeRecord, ResourceRecord,
};
use crate::upstream_repo::{Upstream, endpoints, fetch_list, fetch_value};

/// Name and quorum flag from the `type == "cluster"` entry of a cluster status list.
#[derive(Debug, Default, PartialEq)]
pub(super) struct ClusterIdentity {
    pub(super) name: Option<String>,
    pub(super) quorate: Option<bool>,
}

pub(super) fn cluster_identity(entries: &[Value]) -> ClusterIdentity {
    entries
        .iter()
        .find(|e| envelope::text(e, "type").as_deref() == Some("cluster"))
        .map(|e| ClusterIdentity {
            name: envelope::text(e, "name"),
            quorate: envelope::flag(e, "quorate"),
        })
        .unwrap_or_default()
}

/// Average of the online nodes' CPU percentages; capacity is their summed cores.
fn cluster_cpu(online: &[&NodeRecord]) -> Option<Gauge> {
    if online.is_empty() {
        return None;
    }
    let pct_sum: f64 = online
        .iter()
        .map(|n| f64::from(crate::numeric::cpu_percent(n.cpu)))
        .sum();
    let capacity: f64 = online.iter().filter_map(|n| n.maxcpu).sum();
    let used: f64 = online
        .iter()
        .filter_map(|n| Some(n.cpu? * n.maxcpu?))
        .sum();
    Some(Gauge {
        pct: (pct_sum / online.len() as f64).round() as u32,
        used,
        capacity,
    })
}

pub(super) async fn resolve<U: Upstream>(
    upstream: &U,
    connection: &str,
) -> Result<CanonicalPayload, ResolveError> {
    let (meta, nodes, resources, status) = tokio::join!(
        fetch_value(upstream, endpoints::connection(connection)),
        fetch_list(upstream, endpoints::nodes(connection)),
        fetch_list(upstream, endpoints::resources(connection)),
        fetch_list(upstream, endpoints::cluster_status(connection)),
    );
    let meta = tolerate("connection", meta).present();
    let nodes: Vec<NodeRecord> = parse_records(nodes?, "node");
    let resources: Vec<ResourceRecord> = parse_records(resources?, "resource");
    let identity = cluster_identity(&tolerate("cluster_status", status).coalesce());

    let mut node_rows: Vec<_> = nodes.iter().map(assemble::node_row).collect();
    node_rows.sort_by(|a, b| a.name.cmp(&b.name));
    let online: Vec<&NodeRecord> = nodes.iter().filter(|n| n.is_online()).collect();
    let guest_counts = assemble::guest_counts(&resources);

    let ram = assemble::summed_gauge(nodes.iter().map(|n| (n.mem, n.maxmem)));
    let storage = assemble::summed_gauge(nodes.iter().map(|n| (n.disk, n.maxdisk)));
    let cpu = cluster_cpu(&online);

    let display_name = meta
        .as_ref()
        .and_then(|m| envelope::text(m, "name"))
        .or_else(|| identity.name.clone())
        .unwrap_or_else(|| connection.to_string());

    let mut b = PayloadBuilder::new(display_name.clone());
    b.subtitle("Cluster")
        .breadcrumb("Inventory")
        .breadcrumb(display_name)
        .kpi("Nodes", assemble::ratio(online.len(), nodes.len()))
        .kpi(
            "Guests",
            assemble::ratio(guest_counts.running, guest_counts.total),
        )
        .kpi("CPU", assemble::pct_label(cpu.map_or(0, |g| g.pct)))
        .kpi("RAM", assemble::pct_label(ram.pct))
        .kpi("Storage", assemble::pct_label(storage.pct))
        .property_opt("Cluster name", identity.name.clone())
        .property(
            "Quorum",
            identity.quorate.map_or("unknown", assemble::yes_no),
        )
        .property("VMs", guest_counts.vms.to_string())
        .property("Containers", guest_counts.containers.to_string())
        .property_opt(
            "Connection type",
            meta.as_ref().and_then(|m| envelope::text(m, "type")),
        )
        .metrics(Metrics {
            cpu,
            ram: Some(ram),
            storage: Some(storage),
            swap: None,
        });

    let status = assemble::cluster_status(online.len(), nodes.len());
    Ok(b.finish(
        status,
        Extension::Cluster(ClusterDetails {
            cluster_name: identity.name,
            quorate: identity.quorate,
            nodes: node_rows,
            guest_counts,
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn identity_from_cluster_entry() {
        let entries = vec![
            json!({"type": "node", "name": "pve1", "online": 1}),
            json!({"type": "cluster", "name": "lab", "quorate": 1, "nodes": 2}),
        ];
        assert_eq!(
            cluster_identity(&entries),
            ClusterIdentity {
                name: Some("lab".into()),
                quorate: Some(true),
            }
        );
        assert_eq!(cluster_identity(&[]), ClusterIdentity::default());
    }

    #[test]
    fn cpu_average_over_online_nodes() {
        let nodes: Vec<NodeRecord> = parse_records(
            vec![
                json!({"node": "a", "status": "online", "cpu": 0.2, "maxcpu": 4}),
                json!({"node": "b", "status": "online", "cpu": 0.6, "maxcpu": 4}),
            ],
            "node",
        );
        let refs: Vec<&NodeRecord> = nodes.iter().collect();
        let g = cluster_cpu(&refs).unwrap();
        assert_eq!(g.pct, 40);
        assert_eq!(g.capacity, 8.0);
        assert!(cluster_cpu(&[]).is_none());
    }

    #[test]
    fn cpu_average_survives_absurd_readings() {
        let nodes: Vec<NodeRecord> = parse_records(
            vec![
                json!({"node": "a", "status": "online", "cpu": 1e30}),
                json!({"node": "b", "status": "online", "cpu": 1e30}),
            ],
            "node",
        );
        let refs: Vec<&NodeRecord> = nodes.iter().collect();
        let g = cluster_cpu(&refs).unwrap();
        assert_eq!(g.pct, u32::MAX);
    }
}
