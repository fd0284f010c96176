// Kind-specific extension blocks. Exactly one is carried per payload.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{GuestConfigDetails, SeriesPoint};
use crate::selection::SelectionKind;

/// Serializes externally tagged, e.g. `{"node": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Extension {
    Root(RootDetails),
    Cluster(ClusterDetails),
    Node(NodeDetails),
    Guest(GuestDetails),
    BackupServer(BackupServerDetails),
    BackupStore(BackupStoreDetails),
}

impl Extension {
    pub fn kind(&self) -> SelectionKind {
        match self {
            Extension::Root(_) => SelectionKind::Root,
            Extension::Cluster(_) => SelectionKind::Cluster,
            Extension::Node(_) => SelectionKind::Node,
            Extension::Guest(_) => SelectionKind::Guest,
            Extension::BackupServer(_) => SelectionKind::BackupServer,
            Extension::BackupStore(_) => SelectionKind::BackupStore,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionSummary {
    pub id: String,
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub connection_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RootDetails {
    pub connections: Vec<ConnectionSummary>,
}

/// One row of a per-node utilization table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRow {
    pub name: String,
    pub status: String,
    pub cpu_pct: u32,
    pub ram_pct: u32,
    pub storage_pct: u32,
    pub uptime: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
}

/// One row of a guest table (cluster-wide or per node).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestRow {
    pub vmid: String,
    pub name: String,
    pub guest_type: String,
    pub node: String,
    pub status: String,
    pub cpu_pct: u32,
    pub ram_pct: u32,
    pub tags: Vec<String>,
    pub template: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestCounts {
    pub running: usize,
    pub total: usize,
    pub vms: usize,
    pub containers: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_name: Option<String>,
    /// None when cluster health could not be fetched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quorate: Option<bool>,
    pub nodes: Vec<NodeRow>,
    pub guest_counts: GuestCounts,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionInfo {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_due_date: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDetails {
    pub connection: String,
    pub node: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_sockets: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_cores: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_threads: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kernel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boot_mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secure_boot: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_average: Option<String>,
    /// Percentage (upstream reports a 0..1 fraction).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub io_delay_pct: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ksm_shared_bytes: Option<f64>,
    pub uptime: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription: Option<SubscriptionInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_updates: Option<usize>,
    pub guests: Vec<GuestRow>,
}

/// Capacity of the node hosting a guest; `from_node` is false when defaults were used.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostCapacity {
    pub cpus: u32,
    pub memory_bytes: u64,
    pub from_node: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestDetails {
    pub connection: String,
    pub node: String,
    pub guest_type: String,
    pub vmid: String,
    pub name: String,
    pub tags: Vec<String>,
    pub template: bool,
    pub host_capacity: HostCapacity,
    /// None when the guest configuration could not be fetched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<GuestConfigDetails>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatastoreSummary {
    pub name: String,
    pub used: f64,
    pub total: f64,
    pub pct: u32,
    pub backups: u64,
    pub guests: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupServerDetails {
    pub server: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uptime: Option<String>,
    pub datastores: Vec<DatastoreSummary>,
    pub total_backups: u64,
    pub total_guests: u64,
    pub series: Vec<SeriesPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_time: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified: Option<String>,
    pub protected: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupStoreDetails {
    pub server: String,
    pub store: String,
    pub used: f64,
    pub total: f64,
    pub pct: u32,
    pub backups: Vec<BackupItem>,
    /// Statistics block forwarded as reported by the backup service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
    pub series: Vec<SeriesPoint>,
}
