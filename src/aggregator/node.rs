// Node: list record + extended status, with best-effort platform, subscription and update data.

use serde_json::Value;

use super::assemble::{self, PayloadBuilder};
use super::cluster::cluster_identity;
use super::{Coalesce, ResolveError, tolerate};
use crate::envelope;
use crate::models::upstream::parse_records;
use crate::models::{
    CanonicalPayload, Extension, Metrics, NodeDetails, NodeRecord, ResourceRecord,
    SubscriptionInfo,
};
use crate::numeric::{format_bytes, format_uptime};
use crate::selection::NodeKey;
use crate::upstream_repo::{Upstream, endpoints, fetch_list, fetch_value};

/// Second segment of `manager/8.2.4/abcdef`; the whole string when it has no slash.
pub(crate) fn platform_version(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    match raw.split('/').nth(1) {
        Some(v) if !v.is_empty() => Some(v.to_string()),
        Some(_) => None,
        None => Some(raw.to_string()),
    }
}

/// Numeric arrays become `"0.12, 0.34, 0.56"`; anything else is passed through as text.
pub(crate) fn load_average(value: &Value) -> Option<String> {
    match value {
        Value::Array(items) => {
            let parts: Vec<String> = items
                .iter()
                .map(|v| match envelope::as_f64(v) {
                    Some(n) => format!("{n:.2}"),
                    None => envelope::as_text(v).unwrap_or_default(),
                })
                .collect();
            (!parts.is_empty()).then(|| parts.join(", "))
        }
        other => envelope::as_text(other),
    }
}

fn nested_num(obj: &Value, outer: &str, inner: &str) -> Option<f64> {
    obj.get(outer).and_then(|o| envelope::num(o, inner))
}

fn nested_text(obj: &Value, outer: &str, inner: &str) -> Option<String> {
    obj.get(outer).and_then(|o| envelope::text(o, inner))
}

fn as_count(n: Option<f64>) -> Option<u32> {
    n.filter(|n| *n >= 0.0).map(|n| n as u32)
}

fn parse_subscription(value: &Value) -> SubscriptionInfo {
    SubscriptionInfo {
        status: envelope::text(value, "status").unwrap_or_else(|| "unknown".into()),
        level: envelope::text(value, "level"),
        product_name: envelope::text(value, "productname"),
        next_due_date: envelope::text(value, "nextduedate"),
    }
}

pub(super) async fn resolve<U: Upstream>(
    upstream: &U,
    key: &NodeKey,
) -> Result<CanonicalPayload, ResolveError> {
    let (nodes, status, resources, version, sub, updates) = tokio::join!(
        fetch_list(upstream, endpoints::nodes(&key.connection)),
        fetch_value(upstream, endpoints::node_status(key)),
        fetch_list(upstream, endpoints::resources(&key.connection)),
        fetch_value(upstream, endpoints::version(&key.connection)),
        fetch_value(upstream, endpoints::node_subscription(key)),
        fetch_list(upstream, endpoints::node_updates(key)),
    );
    let nodes: Vec<NodeRecord> = parse_records(nodes?, "node");
    let record = nodes
        .iter()
        .find(|n| n.node == key.node)
        .ok_or_else(|| ResolveError::not_found(format!("node {}", key.node)))?;

    let status = tolerate("node_status", status).coalesce();
    let resources: Vec<ResourceRecord> =
        parse_records(tolerate("resources", resources).coalesce(), "resource");
    let version = tolerate("version", version).present();
    let subscription = tolerate("subscription", sub).present().map(|v| parse_subscription(&v));
    let pending_updates = tolerate("updates", updates).present().map(|u| u.len());

    let cluster_name = if nodes.len() > 1 {
        let entries = fetch_list(upstream, endpoints::cluster_status(&key.connection)).await;
        cluster_identity(&tolerate("cluster_status", entries).coalesce()).name
    } else {
        None
    };

    let platform = envelope::text(&status, "pveversion")
        .and_then(|v| platform_version(&v))
        .or_else(|| version.as_ref().and_then(|v| envelope::text(v, "version")));
    let kernel = nested_text(&status, "current-kernel", "release")
        .or_else(|| envelope::text(&status, "kversion"));
    let load = status.get("loadavg").and_then(load_average);
    let io_delay_pct = envelope::num(&status, "wait").map(|w| w * 100.0);
    let ksm_shared = nested_num(&status, "ksm", "shared");
    let uptime = envelope::num(&status, "uptime").or(record.uptime);

    let cores = nested_num(&status, "cpuinfo", "cpus").or(record.maxcpu);
    let cpu = assemble::cpu_gauge(envelope::num(&status, "cpu").or(record.cpu), cores);
    let ram = match (
        nested_num(&status, "memory", "used"),
        nested_num(&status, "memory", "total"),
    ) {
        (Some(used), Some(total)) => assemble::gauge(Some(used), Some(total)),
        _ => assemble::gauge(record.mem, record.maxmem),
    };
    let storage = match (
        nested_num(&status, "rootfs", "used"),
        nested_num(&status, "rootfs", "total"),
    ) {
        (Some(used), Some(total)) => assemble::gauge(Some(used), Some(total)),
        _ => assemble::gauge(record.disk, record.maxdisk),
    };
    let swap = assemble::gauge(
        nested_num(&status, "swap", "used"),
        nested_num(&status, "swap", "total"),
    );

    let hosted: Vec<&ResourceRecord> = resources
        .iter()
        .filter(|r| r.is_guest() && r.node.as_deref() == Some(key.node.as_str()))
        .collect();
    let counts = assemble::guest_counts(hosted.iter().copied());
    let guests = assemble::guest_rows(hosted.iter().copied());

    let details = NodeDetails {
        connection: key.connection.clone(),
        node: key.node.clone(),
        cluster_name,
        cpu_model: nested_text(&status, "cpuinfo", "model"),
        cpu_sockets: as_count(nested_num(&status, "cpuinfo", "sockets")),
        cpu_cores: as_count(nested_num(&status, "cpuinfo", "cores")),
        cpu_threads: as_count(nested_num(&status, "cpuinfo", "cpus")),
        kernel,
        platform_version: platform,
        boot_mode: nested_text(&status, "boot-info", "mode"),
        secure_boot: status
            .get("boot-info")
            .and_then(|b| envelope::flag(b, "secureboot")),
        load_average: load,
        io_delay_pct,
        ksm_shared_bytes: ksm_shared,
        uptime: format_uptime(uptime),
        subscription,
        pending_updates,
        guests,
    };

    let mut b = PayloadBuilder::new(key.node.clone());
    b.subtitle("Node")
        .breadcrumb("Inventory")
        .breadcrumb(key.connection.clone());
    if let Some(name) = &details.cluster_name {
        b.breadcrumb(name.clone());
    }
    b.breadcrumb(key.node.clone())
        .kpi("CPU", assemble::pct_label(cpu.map_or(0, |g| g.pct)))
        .kpi("RAM", assemble::pct_label(ram.map_or(0, |g| g.pct)))
        .kpi("Storage", assemble::pct_label(storage.map_or(0, |g| g.pct)))
        .kpi("Uptime", details.uptime.clone())
        .kpi("Guests", assemble::ratio(counts.running, counts.total))
        .property(
            "Status",
            record.status.clone().unwrap_or_else(|| "unknown".into()),
        )
        .property_opt("IP", record.ip.clone())
        .property_opt("CPU model", details.cpu_model.clone())
        .property_opt("CPU topology", topology(&details))
        .property_opt("Kernel", details.kernel.clone())
        .property_opt("Version", details.platform_version.clone())
        .property_opt("Boot mode", boot_mode(&details))
        .property_opt("Load average", details.load_average.clone())
        .property_opt("IO delay", details.io_delay_pct.map(|p| format!("{p:.2}%")))
        .property_opt("KSM sharing", details.ksm_shared_bytes.map(|s| format_bytes(Some(s))))
        .property_opt(
            "Subscription",
            details.subscription.as_ref().map(|s| s.status.clone()),
        )
        .property_opt("Pending updates", details.pending_updates.map(|n| n.to_string()))
        .metrics(Metrics {
            cpu,
            ram,
            storage,
            swap,
        });

    Ok(b.finish(
        assemble::node_status(record.status.as_deref()),
        Extension::Node(details),
    ))
}

fn topology(d: &NodeDetails) -> Option<String> {
    let mut parts = Vec::new();
    if let Some(s) = d.cpu_sockets {
        parts.push(format!("{s} sockets"));
    }
    if let Some(c) = d.cpu_cores {
        parts.push(format!("{c} cores"));
    }
    if let Some(t) = d.cpu_threads {
        parts.push(format!("{t} threads"));
    }
    (!parts.is_empty()).then(|| parts.join(", "))
}

fn boot_mode(d: &NodeDetails) -> Option<String> {
    let mode = d.boot_mode.as_deref()?.to_ascii_uppercase();
    Some(match d.secure_boot {
        Some(true) => format!("{mode} (secure boot)"),
        _ => mode,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn platform_version_takes_second_segment() {
        assert_eq!(
            platform_version("pve-manager/8.2.4/faa83925c9641325").as_deref(),
            Some("8.2.4")
        );
        assert_eq!(platform_version("8.1").as_deref(), Some("8.1"));
        assert_eq!(platform_version("manager/"), None);
        assert_eq!(platform_version("  "), None);
    }

    #[test]
    fn load_average_joins_numbers() {
        assert_eq!(
            load_average(&json!(["0.5", 1.234, 2])).as_deref(),
            Some("0.50, 1.23, 2.00")
        );
        assert_eq!(load_average(&json!("0.1 0.2 0.3")).as_deref(), Some("0.1 0.2 0.3"));
        assert_eq!(load_average(&json!([])), None);
        assert_eq!(load_average(&json!(null)), None);
    }

    #[test]
    fn topology_and_boot_mode_labels() {
        let d = NodeDetails {
            cpu_sockets: Some(1),
            cpu_threads: Some(16),
            boot_mode: Some("efi".into()),
            secure_boot: Some(true),
            ..Default::default()
        };
        assert_eq!(topology(&d).as_deref(), Some("1 sockets, 16 threads"));
        assert_eq!(boot_mode(&d).as_deref(), Some("EFI (secure boot)"));
        assert_eq!(topology(&NodeDetails::default()), None);
    }
}
