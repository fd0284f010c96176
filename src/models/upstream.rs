// Upstream list records. Fields are lenient: numbers may arrive as strings, flags as 0/1.
// A record that still fails to decode is skipped by `parse_records`, never fatal.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::envelope;

fn lenient_f64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    let v = Option::<Value>::deserialize(d)?;
    Ok(v.as_ref().and_then(envelope::as_f64))
}

fn lenient_text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    let v = Option::<Value>::deserialize(d)?;
    Ok(v.as_ref().and_then(envelope::as_text))
}

fn lenient_flag<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    let v = Option::<Value>::deserialize(d)?;
    Ok(v.as_ref().and_then(envelope::as_flag).unwrap_or(false))
}

fn lenient_tags<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    let v = Option::<Value>::deserialize(d)?;
    Ok(match v {
        Some(Value::String(s)) => envelope::split_tags(&s),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(envelope::as_text)
            .flat_map(|t| envelope::split_tags(&t))
            .collect(),
        _ => Vec::new(),
    })
}

/// Entry of the per-connection node list.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NodeRecord {
    #[serde(default)]
    pub node: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub cpu: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub maxcpu: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub mem: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub maxmem: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub disk: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub maxdisk: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub uptime: Option<f64>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub ip: Option<String>,
}

impl NodeRecord {
    pub fn is_online(&self) -> bool {
        self.status.as_deref() == Some("online")
    }
}

/// Entry of the unified resource list (guests, nodes, storage...).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ResourceRecord {
    #[serde(default, deserialize_with = "lenient_text")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub node: Option<String>,
    #[serde(rename = "type", default, deserialize_with = "lenient_text")]
    pub resource_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub vmid: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub cpu: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub maxcpu: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub mem: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub maxmem: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub disk: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub maxdisk: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub uptime: Option<f64>,
    #[serde(default, deserialize_with = "lenient_tags")]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub template: bool,
}

impl ResourceRecord {
    /// VMs and containers; nodes, storage and pools are not guests.
    pub fn is_guest(&self) -> bool {
        matches!(self.resource_type.as_deref(), Some("qemu" | "lxc"))
    }

    pub fn is_running(&self) -> bool {
        self.status.as_deref() == Some("running")
    }

    pub fn matches_guest(&self, node: &str, guest_type: &str, vmid: &str) -> bool {
        self.node.as_deref() == Some(node)
            && self.resource_type.as_deref() == Some(guest_type)
            && self.vmid.as_deref() == Some(vmid)
    }
}

/// Entry of a backup server's datastore list.
///
/// Backends spell the name and the counters differently and some send several spellings
/// at once, so each spelling is its own field and the accessors take the first present.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DatastoreRecord {
    #[serde(default, deserialize_with = "lenient_text")]
    name: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    store: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub total: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub used: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub avail: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    backup_count: Option<f64>,
    #[serde(default, rename = "backup-count", deserialize_with = "lenient_f64")]
    backup_count_kebab: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    backups: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    vm_count: Option<f64>,
    #[serde(default, rename = "vm-count", deserialize_with = "lenient_f64")]
    vm_count_kebab: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    ct_count: Option<f64>,
    #[serde(default, rename = "ct-count", deserialize_with = "lenient_f64")]
    ct_count_kebab: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    guest_count: Option<f64>,
    #[serde(default, rename = "guest-count", deserialize_with = "lenient_f64")]
    guest_count_kebab: Option<f64>,
}

impl DatastoreRecord {
    /// `name`, else `store`, else empty.
    pub fn name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.store.as_deref())
            .unwrap_or_default()
    }

    /// Total from `total`, else `used + avail`.
    pub fn capacity(&self) -> Option<f64> {
        self.total.or(match (self.used, self.avail) {
            (Some(u), Some(a)) => Some(u + a),
            _ => None,
        })
    }

    pub fn backups(&self) -> u64 {
        let n = self
            .backup_count
            .or(self.backup_count_kebab)
            .or(self.backups)
            .unwrap_or(0.0);
        n.max(0.0) as u64
    }

    /// Explicit guest count when reported, else VMs + containers.
    pub fn guests(&self) -> u64 {
        let explicit = self.guest_count.or(self.guest_count_kebab);
        let n = explicit.unwrap_or_else(|| {
            self.vm_count.or(self.vm_count_kebab).unwrap_or(0.0)
                + self.ct_count.or(self.ct_count_kebab).unwrap_or(0.0)
        });
        n.max(0.0) as u64
    }
}

/// Decodes each list entry into `T`, dropping entries that don't fit.
pub fn parse_records<T: DeserializeOwned>(items: Vec<Value>, what: &'static str) -> Vec<T> {
    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<T>(item) {
            Ok(r) => Some(r),
            Err(e) => {
                tracing::debug!(error = %e, record = what, "skipping undecodable record");
                None
            }
        })
        .collect()
}
