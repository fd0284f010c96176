// Backup servers and their datastores.

use serde_json::{Map, Value};

use super::assemble::{self, PayloadBuilder};
use super::{Coalesce, ResolveError, tolerate};
use crate::config::ResolutionConfig;
use crate::envelope;
use crate::models::upstream::parse_records;
use crate::models::{
    BackupItem, BackupServerDetails, BackupStoreDetails, CanonicalPayload, DatastoreRecord,
    DatastoreSummary, Extension, HealthStatus, Metrics, Pagination, SeriesSource,
};
use crate::numeric::{format_bytes, format_uptime, percent_of};
use crate::selection::StoreKey;
use crate::series;
use crate::upstream_repo::{Upstream, endpoints, fetch_list, fetch_value};

fn summary(record: &DatastoreRecord) -> DatastoreSummary {
    let total = record.capacity();
    DatastoreSummary {
        name: record.name().to_string(),
        used: record.used.unwrap_or(0.0),
        total: total.unwrap_or(0.0),
        pct: percent_of(record.used, total),
        backups: record.backups(),
        guests: record.guests(),
    }
}

fn display_name(meta: Option<&Value>, fallback: &str) -> String {
    meta.and_then(|m| envelope::text(m, "name"))
        .unwrap_or_else(|| fallback.to_string())
}

fn first_text(obj: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| envelope::text(obj, k))
}

fn backup_item(item: &Value) -> BackupItem {
    BackupItem {
        backup_type: first_text(item, &["backup-type", "backupType", "type"]),
        backup_id: first_text(item, &["backup-id", "backupId", "id"]),
        backup_time: ["backup-time", "backupTime", "time"]
            .iter()
            .find_map(|k| envelope::num(item, k))
            .map(|t| t as i64),
        size: envelope::num(item, "size"),
        owner: envelope::text(item, "owner"),
        verified: item
            .get("verification")
            .and_then(|v| envelope::text(v, "state"))
            .or_else(|| envelope::text(item, "verified")),
        protected: envelope::flag(item, "protected").unwrap_or(false),
    }
}

/// Listing body: a plain list, or an object with `items` plus pagination and `stats`.
fn backup_listing(body: Value) -> (Vec<BackupItem>, Option<Pagination>, Option<Map<String, Value>>) {
    let (pagination, stats) = match &body {
        Value::Object(map) => {
            let pagination = Pagination {
                page: envelope::num(&body, "page").map(|n| n as u64),
                limit: envelope::num(&body, "limit").map(|n| n as u64),
                total: envelope::num(&body, "total").map(|n| n as u64),
            };
            let pagination = (pagination != Pagination::default()).then_some(pagination);
            let stats = map.get("stats").and_then(Value::as_object).cloned();
            (pagination, stats)
        }
        _ => (None, None),
    };
    let items = envelope::as_list(body).iter().map(backup_item).collect();
    (items, pagination, stats)
}

pub(super) async fn resolve_server<U: Upstream>(
    upstream: &U,
    settings: &ResolutionConfig,
    server: &str,
) -> Result<CanonicalPayload, ResolveError> {
    let (meta, status, datastores, rrd) = tokio::join!(
        fetch_value(upstream, endpoints::connection(server)),
        fetch_value(upstream, endpoints::backup_status(server)),
        fetch_list(upstream, endpoints::backup_datastores(server)),
        fetch_list(upstream, endpoints::backup_rrd(server, settings.default_timeframe)),
    );
    let meta = tolerate("connection", meta).present();
    let status = tolerate("backup_status", status).present();
    let datastores: Vec<DatastoreRecord> =
        parse_records(tolerate("backup_datastores", datastores).coalesce(), "datastore");
    let samples = tolerate("backup_rrd", rrd).coalesce();

    let stores: Vec<DatastoreSummary> = datastores.iter().map(summary).collect();
    let total_backups: u64 = stores.iter().map(|s| s.backups).sum();
    let total_guests: u64 = stores.iter().map(|s| s.guests).sum();
    let storage = assemble::summed_gauge(datastores.iter().map(|d| (d.used, d.capacity())));

    let version = status.as_ref().and_then(|s| envelope::text(s, "version"));
    let uptime = status
        .as_ref()
        .and_then(|s| envelope::num(s, "uptime"))
        .map(|u| format_uptime(Some(u)));
    let cpu = status
        .as_ref()
        .and_then(|s| assemble::cpu_gauge(envelope::num(s, "cpu"), None));
    let ram = status.as_ref().and_then(|s| {
        let mem = s.get("memory")?;
        assemble::gauge(envelope::num(mem, "used"), envelope::num(mem, "total"))
    });

    let name = display_name(meta.as_ref(), server);
    let mut b = PayloadBuilder::new(name.clone());
    b.subtitle("Backup server")
        .breadcrumb("Inventory")
        .breadcrumb(name)
        .kpi("Datastores", stores.len().to_string())
        .kpi("Backups", total_backups.to_string())
        .kpi("Guests", total_guests.to_string())
        .kpi("Storage", assemble::pct_label(storage.pct))
        .property_opt("Version", version.clone())
        .property_opt("Uptime", uptime.clone())
        .property(
            "Used",
            format!(
                "{} of {}",
                format_bytes(Some(storage.used)),
                format_bytes(Some(storage.capacity))
            ),
        )
        .metrics(Metrics {
            cpu,
            ram,
            storage: Some(storage),
            swap: None,
        });

    let health = if status.is_some() {
        HealthStatus::Ok
    } else {
        HealthStatus::Unknown
    };
    Ok(b.finish(
        health,
        Extension::BackupServer(BackupServerDetails {
            server: server.to_string(),
            version,
            uptime,
            datastores: stores,
            total_backups,
            total_guests,
            series: series::normalize(&samples, SeriesSource::Backup, None),
        }),
    ))
}

pub(super) async fn resolve_store<U: Upstream>(
    upstream: &U,
    settings: &ResolutionConfig,
    key: &StoreKey,
) -> Result<CanonicalPayload, ResolveError> {
    let (meta, datastores, listing, rrd) = tokio::join!(
        fetch_value(upstream, endpoints::connection(&key.server)),
        fetch_list(upstream, endpoints::backup_datastores(&key.server)),
        fetch_value(
            upstream,
            endpoints::store_backups(key, settings.backup_page_size),
        ),
        fetch_list(upstream, endpoints::store_rrd(key, settings.default_timeframe)),
    );
    let datastores: Vec<DatastoreRecord> = parse_records(datastores?, "datastore");
    let record = datastores
        .iter()
        .find(|d| d.name() == key.store)
        .ok_or_else(|| {
            ResolveError::not_found(format!("datastore {} on {}", key.store, key.server))
        })?;
    let meta = tolerate("connection", meta).present();
    let (backups, pagination, stats) = backup_listing(tolerate("store_backups", listing).coalesce());
    let samples = tolerate("store_rrd", rrd).coalesce();

    let store = summary(record);
    let backup_total = pagination
        .and_then(|p| p.total)
        .unwrap_or_else(|| record.backups().max(backups.len() as u64));

    let server_name = display_name(meta.as_ref(), &key.server);
    let mut b = PayloadBuilder::new(key.store.clone());
    b.subtitle("Datastore")
        .breadcrumb("Inventory")
        .breadcrumb(server_name)
        .breadcrumb(key.store.clone())
        .kpi("Usage", assemble::pct_label(store.pct))
        .kpi(
            "Used",
            format!(
                "{} / {}",
                format_bytes(Some(store.used)),
                format_bytes(Some(store.total))
            ),
        )
        .kpi("Backups", backup_total.to_string())
        .property_opt("Available", record.avail.map(|a| format_bytes(Some(a))))
        .property("Guests", store.guests.to_string())
        .metrics(Metrics {
            storage: assemble::gauge(record.used, record.capacity()),
            ..Default::default()
        });

    Ok(b.finish(
        assemble::store_status(store.pct),
        Extension::BackupStore(BackupStoreDetails {
            server: key.server.clone(),
            store: key.store.clone(),
            used: store.used,
            total: store.total,
            pct: store.pct,
            backups,
            stats,
            pagination,
            series: series::normalize(&samples, SeriesSource::Backup, None),
        }),
    ))
}
