// Payload assembly: builder, rollups and status classification shared by all branches.

use crate::models::{
    CanonicalPayload, Extension, Gauge, GuestCounts, GuestRow, HealthStatus, LabeledValue,
    Metrics, NodeRecord, NodeRow, ResourceRecord,
};
use crate::numeric::{cpu_percent, format_uptime, percent_of};

/// Accumulates the presentation fields of a payload; `finish` seals it.
#[derive(Debug, Default)]
pub(crate) struct PayloadBuilder {
    title: String,
    subtitle: Option<String>,
    breadcrumbs: Vec<String>,
    kpis: Vec<LabeledValue>,
    properties: Vec<LabeledValue>,
    metrics: Option<Metrics>,
}

impl PayloadBuilder {
    pub(crate) fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub(crate) fn subtitle(&mut self, subtitle: impl Into<String>) -> &mut Self {
        self.subtitle = Some(subtitle.into());
        self
    }

    pub(crate) fn breadcrumb(&mut self, crumb: impl Into<String>) -> &mut Self {
        self.breadcrumbs.push(crumb.into());
        self
    }

    pub(crate) fn kpi(&mut self, label: &str, value: impl Into<String>) -> &mut Self {
        self.kpis.push(LabeledValue::new(label, value));
        self
    }

    pub(crate) fn property(&mut self, label: &str, value: impl Into<String>) -> &mut Self {
        self.properties.push(LabeledValue::new(label, value));
        self
    }

    /// Adds the property only when a value is known.
    pub(crate) fn property_opt<V: Into<String>>(
        &mut self,
        label: &str,
        value: Option<V>,
    ) -> &mut Self {
        if let Some(v) = value {
            self.properties.push(LabeledValue::new(label, v));
        }
        self
    }

    pub(crate) fn metrics(&mut self, metrics: Metrics) -> &mut Self {
        self.metrics = Some(metrics);
        self
    }

    /// The payload kind is taken from the extension so the two can never disagree.
    pub(crate) fn finish(self, status: HealthStatus, extension: Extension) -> CanonicalPayload {
        CanonicalPayload {
            kind: extension.kind(),
            title: self.title,
            subtitle: self.subtitle,
            breadcrumbs: self.breadcrumbs,
            status,
            kpis: self.kpis,
            properties: self.properties,
            metrics: self.metrics,
            extension,
        }
    }
}

/// Used/capacity gauge; `None` when neither side is known.
pub(crate) fn gauge(used: Option<f64>, capacity: Option<f64>) -> Option<Gauge> {
    if used.is_none() && capacity.is_none() {
        return None;
    }
    Some(Gauge {
        pct: percent_of(used, capacity),
        used: used.unwrap_or(0.0),
        capacity: capacity.unwrap_or(0.0),
    })
}

/// CPU gauge from a 0..1 load fraction over `cores`.
pub(crate) fn cpu_gauge(fraction: Option<f64>, cores: Option<f64>) -> Option<Gauge> {
    let fraction = fraction?;
    let capacity = cores.unwrap_or(0.0);
    Some(Gauge {
        pct: cpu_percent(Some(fraction)),
        used: fraction * capacity,
        capacity,
    })
}

/// Sums used and capacity across entities, then derives the percentage from the sums.
pub(crate) fn summed_gauge<I>(pairs: I) -> Gauge
where
    I: IntoIterator<Item = (Option<f64>, Option<f64>)>,
{
    let (used, capacity) = pairs
        .into_iter()
        .fold((0.0, 0.0), |(u, c), (used, cap)| {
            (u + used.unwrap_or(0.0), c + cap.unwrap_or(0.0))
        });
    Gauge {
        pct: percent_of(Some(used), Some(capacity)),
        used,
        capacity,
    }
}

pub(crate) fn ratio(part: usize, whole: usize) -> String {
    format!("{part}/{whole}")
}

pub(crate) fn pct_label(pct: u32) -> String {
    format!("{pct}%")
}

pub(crate) fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}

pub(crate) fn node_status(status: Option<&str>) -> HealthStatus {
    match status {
        Some("online") => HealthStatus::Ok,
        Some("offline") => HealthStatus::Crit,
        _ => HealthStatus::Unknown,
    }
}

pub(crate) fn guest_status(status: Option<&str>) -> HealthStatus {
    match status {
        Some("running") => HealthStatus::Ok,
        Some("paused" | "suspended" | "prelaunch") => HealthStatus::Warn,
        Some("stopped") => HealthStatus::Crit,
        _ => HealthStatus::Unknown,
    }
}

/// All online: ok. Some online: warn. None online: crit. No nodes at all: unknown.
pub(crate) fn cluster_status(online: usize, total: usize) -> HealthStatus {
    match (online, total) {
        (_, 0) => HealthStatus::Unknown,
        (0, _) => HealthStatus::Crit,
        (o, t) if o >= t => HealthStatus::Ok,
        _ => HealthStatus::Warn,
    }
}

pub(crate) fn store_status(pct: u32) -> HealthStatus {
    match pct {
        90.. => HealthStatus::Crit,
        80..=89 => HealthStatus::Warn,
        _ => HealthStatus::Ok,
    }
}

pub(crate) fn node_row(record: &NodeRecord) -> NodeRow {
    NodeRow {
        name: record.node.clone(),
        status: record.status.clone().unwrap_or_else(|| "unknown".into()),
        cpu_pct: cpu_percent(record.cpu),
        ram_pct: percent_of(record.mem, record.maxmem),
        storage_pct: percent_of(record.disk, record.maxdisk),
        uptime: format_uptime(record.uptime),
        ip: record.ip.clone(),
    }
}

pub(crate) fn guest_row(record: &ResourceRecord) -> GuestRow {
    let vmid = record.vmid.clone().unwrap_or_default();
    GuestRow {
        name: record.name.clone().unwrap_or_else(|| vmid.clone()),
        vmid,
        guest_type: record.resource_type.clone().unwrap_or_default(),
        node: record.node.clone().unwrap_or_default(),
        status: record.status.clone().unwrap_or_else(|| "unknown".into()),
        cpu_pct: cpu_percent(record.cpu),
        ram_pct: percent_of(record.mem, record.maxmem),
        tags: record.tags.clone(),
        template: record.template,
    }
}

/// Guest rows sorted by numeric vmid (non-numeric ids last, by text).
pub(crate) fn guest_rows<'a, I>(records: I) -> Vec<GuestRow>
where
    I: IntoIterator<Item = &'a ResourceRecord>,
{
    let mut rows: Vec<GuestRow> = records.into_iter().map(guest_row).collect();
    rows.sort_by(|a, b| {
        let key = |r: &GuestRow| (r.vmid.parse::<u64>().unwrap_or(u64::MAX), r.vmid.clone());
        key(a).cmp(&key(b))
    });
    rows
}

/// Counts guests, skipping templates.
pub(crate) fn guest_counts<'a, I>(records: I) -> GuestCounts
where
    I: IntoIterator<Item = &'a ResourceRecord>,
{
    records
        .into_iter()
        .filter(|r| r.is_guest() && !r.template)
        .fold(GuestCounts::default(), |mut c, r| {
            c.total += 1;
            if r.is_running() {
                c.running += 1;
            }
            match r.resource_type.as_deref() {
                Some("qemu") => c.vms += 1,
                Some("lxc") => c.containers += 1,
                _ => {}
            }
            c
        })
}
