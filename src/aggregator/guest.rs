// Guest: resource record + hosting node capacity + parsed configuration.

use super::assemble::{self, PayloadBuilder};
use super::{Coalesce, ResolveError, guest_config, tolerate};
use crate::config::ResolutionConfig;
use crate::models::upstream::parse_records;
use crate::models::{
    CanonicalPayload, Extension, GuestDetails, HostCapacity, Metrics, NodeRecord,
    ResourceRecord,
};
use crate::numeric::{format_bytes, format_rate, format_uptime};
use crate::selection::GuestKey;
use crate::upstream_repo::{Upstream, endpoints, fetch_list, fetch_value};

fn host_capacity(
    nodes: &[NodeRecord],
    node: &str,
    settings: &ResolutionConfig,
) -> HostCapacity {
    let host = nodes.iter().find(|n| n.node == node);
    let cpus = host.and_then(|h| h.maxcpu).filter(|c| *c > 0.0);
    let memory = host.and_then(|h| h.maxmem).filter(|m| *m > 0.0);
    match (cpus, memory) {
        (Some(c), Some(m)) => HostCapacity {
            cpus: c as u32,
            memory_bytes: m as u64,
            from_node: true,
        },
        _ => HostCapacity {
            cpus: cpus.map_or(settings.host_cpu_fallback, |c| c as u32),
            memory_bytes: memory.map_or(settings.host_memory_fallback_bytes, |m| m as u64),
            from_node: false,
        },
    }
}

fn type_label(key: &GuestKey) -> &'static str {
    if key.is_container() { "Container" } else { "VM" }
}

pub(super) async fn resolve<U: Upstream>(
    upstream: &U,
    settings: &ResolutionConfig,
    key: &GuestKey,
) -> Result<CanonicalPayload, ResolveError> {
    let (resources, nodes, config) = tokio::join!(
        fetch_list(upstream, endpoints::resources(&key.connection)),
        fetch_list(upstream, endpoints::nodes(&key.connection)),
        fetch_value(upstream, endpoints::guest_config(key)),
    );
    let resources: Vec<ResourceRecord> = parse_records(resources?, "resource");
    let record = resources
        .iter()
        .find(|r| r.matches_guest(&key.node, &key.guest_type, &key.vmid))
        .ok_or_else(|| {
            ResolveError::not_found(format!(
                "guest {}:{}:{}:{}",
                key.connection, key.node, key.guest_type, key.vmid
            ))
        })?;
    let nodes: Vec<NodeRecord> = parse_records(tolerate("nodes", nodes).coalesce(), "node");
    let config = tolerate("guest_config", config)
        .present()
        .map(|cfg| guest_config::parse(&cfg, key.is_container()));

    let host = host_capacity(&nodes, &key.node, settings);
    let name = record
        .name
        .clone()
        .unwrap_or_else(|| format!("{} {}", type_label(key), key.vmid));

    let cpu = assemble::cpu_gauge(record.cpu, record.maxcpu);
    let ram = assemble::gauge(record.mem, record.maxmem);
    let storage = assemble::gauge(record.disk, record.maxdisk);

    let mut b = PayloadBuilder::new(name.clone());
    b.subtitle(format!("{} {}", type_label(key), key.vmid))
        .breadcrumb("Inventory")
        .breadcrumb(key.connection.clone())
        .breadcrumb(key.node.clone())
        .breadcrumb(name.clone())
        .kpi(
            "Status",
            record.status.clone().unwrap_or_else(|| "unknown".into()),
        )
        .kpi("CPU", assemble::pct_label(cpu.map_or(0, |g| g.pct)))
        .kpi("RAM", assemble::pct_label(ram.map_or(0, |g| g.pct)))
        .kpi("Uptime", format_uptime(record.uptime))
        .property("Node", key.node.clone())
        .property("Type", type_label(key))
        .property("ID", key.vmid.clone())
        .property_opt(
            "Tags",
            (!record.tags.is_empty()).then(|| record.tags.join(", ")),
        )
        .property_opt("Template", record.template.then_some("yes"))
        .property_opt("vCPUs", record.maxcpu.map(|c| format!("{c}")))
        .property_opt("Memory", record.maxmem.map(|m| format_bytes(Some(m))))
        .property(
            "Host capacity",
            format!(
                "{} vCPU / {}",
                host.cpus,
                format_bytes(Some(host.memory_bytes as f64))
            ),
        );
    if let Some(cfg) = &config {
        b.property_opt("OS type", cfg.options.os_type.clone())
            .property("Disks", cfg.disks.len().to_string())
            .property("Network interfaces", cfg.networks.len().to_string());
        for nic in &cfg.networks {
            // NIC rate limits are configured in MB/s.
            let limit = nic.rate.map(|mb| format_rate(Some(mb * 1024.0 * 1024.0)));
            b.property_opt(&format!("{} rate limit", nic.id), limit);
        }
    }
    b.metrics(Metrics {
        cpu,
        ram,
        storage,
        swap: None,
    });

    Ok(b.finish(
        assemble::guest_status(record.status.as_deref()),
        Extension::Guest(GuestDetails {
            connection: key.connection.clone(),
            node: key.node.clone(),
            guest_type: key.guest_type.clone(),
            vmid: key.vmid.clone(),
            name,
            tags: record.tags.clone(),
            template: record.template,
            host_capacity: host,
            config,
        }),
    ))
}
