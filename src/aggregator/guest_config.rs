// Guest configuration parsing. Every field is optional: a value that doesn't parse is left
// unset rather than failing the whole block.

use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

use crate::envelope;
use crate::models::{
    CpuConfig, DiskDescriptor, GuestConfigDetails, GuestOptions, MemoryConfig, NetDescriptor,
    PendingChange,
};

static DISK_KEY: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^(?:(?:ide|sata|scsi|virtio|efidisk|tpmstate|unused|mp)\d+|rootfs)$").ok()
});
static NET_KEY: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"^net\d+$").ok());
static SMBIOS_UUID: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?i)uuid=([0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12})").ok()
});

const CPU_KEYS: &[&str] = &[
    "cores", "sockets", "vcpus", "cpu", "cpulimit", "cpuunits", "numa", "affinity",
];
const MEMORY_KEYS: &[&str] = &["memory", "balloon", "shares"];
/// NIC option keys; any other `key=value` names the model and carries the MAC.
const NET_OPTION_KEYS: &[&str] = &[
    "bridge", "tag", "firewall", "rate", "name", "hwaddr", "macaddr", "ip", "ip6", "gw", "gw6",
    "mtu", "queues", "link_down", "type", "trunks",
];

fn matches(re: &LazyLock<Option<Regex>>, key: &str) -> bool {
    re.as_ref().is_some_and(|re| re.is_match(key))
}

/// `a=1,b=2` pairs; bare segments are skipped.
fn pairs(raw: &str) -> impl Iterator<Item = (&str, &str)> {
    raw.split(',')
        .filter_map(|seg| seg.split_once('='))
        .map(|(k, v)| (k.trim(), v.trim()))
}

fn to_u32(n: Option<f64>) -> Option<u32> {
    n.filter(|n| *n >= 0.0 && *n <= f64::from(u32::MAX))
        .map(|n| n as u32)
}

fn to_u64(n: Option<f64>) -> Option<u64> {
    n.filter(|n| *n >= 0.0).map(|n| n as u64)
}

/// `storage:volume,size=32G,cache=writeback,iothread=1`.
pub fn parse_disk(id: &str, raw: &str) -> DiskDescriptor {
    let mut segments = raw.split(',');
    let head = segments.next().unwrap_or_default().trim();
    // A leading `file=` / `volume=` is the same as a bare volume.
    let head = head
        .strip_prefix("file=")
        .or_else(|| head.strip_prefix("volume="))
        .unwrap_or(head);
    let (storage, volume) = match head.split_once(':') {
        Some((s, v)) if !s.starts_with('/') => (Some(s.to_string()), v.to_string()),
        _ => (None, head.to_string()),
    };
    let mut disk = DiskDescriptor {
        id: id.to_string(),
        storage,
        volume,
        ..Default::default()
    };
    for (k, v) in segments.filter_map(|s| s.split_once('=')) {
        let v = v.trim();
        match k.trim() {
            "size" => disk.size = Some(v.to_string()),
            "format" => disk.format = Some(v.to_string()),
            "cache" => disk.cache = Some(v.to_string()),
            "iothread" => disk.iothread = envelope::parse_flag(v).unwrap_or(false),
            "media" => disk.media = Some(v.to_string()),
            "mp" => disk.mountpoint = Some(v.to_string()),
            _ => {}
        }
    }
    disk
}

/// `virtio=BC:24:11:00:00:01,bridge=vmbr0,tag=10,firewall=1` (VMs) or
/// `name=eth0,bridge=vmbr0,hwaddr=...,ip=dhcp,type=veth` (containers).
pub fn parse_net(id: &str, raw: &str) -> NetDescriptor {
    let mut net = NetDescriptor {
        id: id.to_string(),
        ..Default::default()
    };
    let mut fallback_model = None;
    for (k, v) in pairs(raw) {
        match k {
            "bridge" => net.bridge = Some(v.to_string()),
            "tag" => net.tag = v.parse().ok(),
            "firewall" => net.firewall = envelope::parse_flag(v).unwrap_or(false),
            "rate" => net.rate = v.parse().ok().filter(|r: &f64| r.is_finite()),
            "name" => net.name = Some(v.to_string()),
            "hwaddr" | "macaddr" => net.mac = Some(v.to_string()),
            "ip" => net.ip = Some(v.to_string()),
            "type" => fallback_model = Some(v.to_string()),
            k if NET_OPTION_KEYS.contains(&k) => {}
            model if net.model.is_none() => {
                net.model = Some(model.to_string());
                net.mac = Some(v.to_string());
            }
            _ => {}
        }
    }
    if net.model.is_none() {
        net.model = fallback_model;
    }
    net
}

/// `"0"`: none, `"1"`: the default set, otherwise a comma list.
pub fn parse_hotplug(raw: &str) -> Vec<String> {
    match raw.trim() {
        "" | "0" => Vec::new(),
        "1" => vec!["network".into(), "disk".into(), "usb".into()],
        list => list
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
    }
}

pub fn smbios_uuid(raw: &str) -> Option<String> {
    let re = SMBIOS_UUID.as_ref()?;
    re.captures(raw)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_ascii_lowercase())
}

/// `1`, `1,fstrim_cloned_disks=1` or `enabled=1,type=virtio`.
fn agent_enabled(raw: &str) -> bool {
    let first = raw.split(',').next().unwrap_or_default();
    envelope::parse_flag(first) == Some(true)
        || pairs(raw).any(|(k, v)| k == "enabled" && envelope::parse_flag(v) == Some(true))
}

fn confidential_computing(cfg: &Value) -> Option<String> {
    if let Some(sev) = envelope::text(cfg, "amd-sev") {
        return Some(
            pairs(&sev)
                .find(|(k, _)| *k == "type")
                .map(|(_, v)| v.to_string())
                .or_else(|| {
                    let first = sev.split(',').next().unwrap_or_default().trim();
                    (!first.is_empty() && !first.contains('=')).then(|| first.to_string())
                })
                .unwrap_or_else(|| "sev".into()),
        );
    }
    cfg.get("intel-tdx").map(|_| "tdx".to_string())
}

fn rtc_mode(cfg: &Value) -> Option<String> {
    envelope::flag(cfg, "localtime").map(|local| {
        let mode = if local { "localtime" } else { "utc" };
        mode.to_string()
    })
}

fn boot_order(cfg: &Value) -> Option<String> {
    let raw = envelope::text(cfg, "boot")?;
    let order = pairs(&raw)
        .find(|(k, _)| *k == "order")
        .map(|(_, v)| v.to_string());
    Some(order.unwrap_or(raw))
}

/// Pending changes as either `{key: value, delete: "a,b"}` or `[{key, value, pending, delete}]`.
pub fn pending_changes(cfg: &Value) -> Vec<PendingChange> {
    match cfg.get("pending") {
        Some(Value::Object(map)) => pending_from_map(cfg, map),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| {
                let key = envelope::text(item, "key")?;
                Some(PendingChange {
                    current: envelope::text(item, "value"),
                    pending: envelope::text(item, "pending"),
                    delete: envelope::flag(item, "delete").unwrap_or(false),
                    key,
                })
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn pending_from_map(cfg: &Value, map: &Map<String, Value>) -> Vec<PendingChange> {
    let mut changes: Vec<PendingChange> = map
        .iter()
        .filter(|(k, _)| k.as_str() != "delete")
        .map(|(k, v)| PendingChange {
            key: k.clone(),
            current: envelope::text(cfg, k),
            pending: envelope::as_text(v),
            delete: false,
        })
        .collect();
    if let Some(deleted) = map.get("delete").and_then(envelope::as_text) {
        changes.extend(
            deleted
                .split([',', ';'])
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(|k| PendingChange {
                    key: k.to_string(),
                    current: envelope::text(cfg, k),
                    pending: None,
                    delete: true,
                }),
        );
    }
    changes
}

fn cpu_config(cfg: &Value, pending: &[PendingChange]) -> CpuConfig {
    CpuConfig {
        sockets: to_u32(envelope::num(cfg, "sockets")),
        cores: to_u32(envelope::num(cfg, "cores")),
        vcpus: to_u32(envelope::num(cfg, "vcpus")),
        cpu_type: envelope::text(cfg, "cpu").map(|raw| {
            let first = raw.split(',').next().unwrap_or_default();
            first.strip_prefix("cputype=").unwrap_or(first).to_string()
        }),
        cpu_limit: envelope::num(cfg, "cpulimit"),
        cpu_units: to_u32(envelope::num(cfg, "cpuunits")),
        numa: envelope::flag(cfg, "numa"),
        affinity: envelope::text(cfg, "affinity"),
        pending: pending
            .iter()
            .filter(|p| CPU_KEYS.contains(&p.key.as_str()))
            .cloned()
            .collect(),
    }
}

fn memory_config(cfg: &Value, pending: &[PendingChange], is_container: bool) -> MemoryConfig {
    MemoryConfig {
        memory_mib: to_u64(envelope::num(cfg, "memory")),
        balloon_mib: to_u64(envelope::num(cfg, "balloon")),
        shares: to_u32(envelope::num(cfg, "shares")),
        swap_mib: if is_container {
            to_u64(envelope::num(cfg, "swap"))
        } else {
            None
        },
        pending: pending
            .iter()
            .filter(|p| MEMORY_KEYS.contains(&p.key.as_str()))
            .cloned()
            .collect(),
    }
}

fn options(cfg: &Value) -> GuestOptions {
    GuestOptions {
        on_boot: envelope::flag(cfg, "onboot"),
        protection: envelope::flag(cfg, "protection"),
        startup: envelope::text(cfg, "startup"),
        os_type: envelope::text(cfg, "ostype"),
        boot_order: boot_order(cfg),
        tablet: envelope::flag(cfg, "tablet"),
        hotplug: envelope::text(cfg, "hotplug")
            .map(|h| parse_hotplug(&h))
            .unwrap_or_default(),
        acpi: envelope::flag(cfg, "acpi"),
        kvm: envelope::flag(cfg, "kvm"),
        freeze: envelope::flag(cfg, "freeze"),
        rtc_mode: rtc_mode(cfg),
        smbios_uuid: envelope::text(cfg, "smbios1").and_then(|s| smbios_uuid(&s)),
        agent_enabled: envelope::text(cfg, "agent").is_some_and(|a| agent_enabled(&a)),
        spice_enhancements: envelope::text(cfg, "spice_enhancements"),
        vmstate_storage: envelope::text(cfg, "vmstatestorage"),
        confidential_computing: confidential_computing(cfg),
    }
}

/// Builds the configuration block from an (already unwrapped) guest config body.
pub fn parse(cfg: &Value, is_container: bool) -> GuestConfigDetails {
    let pending = pending_changes(cfg);
    let mut disks = Vec::new();
    let mut networks = Vec::new();
    if let Some(map) = cfg.as_object() {
        for (key, value) in map {
            let Some(raw) = envelope::as_text(value) else {
                continue;
            };
            if matches(&DISK_KEY, key) {
                disks.push(parse_disk(key, &raw));
            } else if matches(&NET_KEY, key) {
                networks.push(parse_net(key, &raw));
            }
        }
    }
    GuestConfigDetails {
        cpu: cpu_config(cfg, &pending),
        memory: memory_config(cfg, &pending, is_container),
        disks,
        networks,
        options: options(cfg),
    }
}
