// Model serialization tests (JSON camelCase, selection wire form, extension tagging)

use clusterview::models::*;
use clusterview::selection::{Selection, SelectionKind};
use serde_json::json;

#[test]
fn test_selection_wire_form() {
    let node = Selection::Node("c1:pve1".into());
    assert_eq!(
        serde_json::to_value(&node).unwrap(),
        json!({"kind": "node", "id": "c1:pve1"})
    );
    let back: Selection =
        serde_json::from_value(json!({"kind": "backup-store", "id": "pbs:main"})).unwrap();
    assert_eq!(back, Selection::BackupStore("pbs:main".into()));
    let root: Selection = serde_json::from_value(json!({"kind": "root"})).unwrap();
    assert_eq!(root, Selection::Root);
    assert!(serde_json::from_value::<Selection>(json!({"kind": "pool", "id": "x"})).is_err());
}

#[test]
fn test_selection_from_query_parts() {
    let s = Selection::from_parts(SelectionKind::Guest, Some("c1:pve1:lxc:101".into()));
    assert_eq!(s.kind(), SelectionKind::Guest);
    assert_eq!(s.id(), "c1:pve1:lxc:101");
    assert_eq!(s.to_string(), "guest:c1:pve1:lxc:101");
    assert_eq!(Selection::from_parts(SelectionKind::Cluster, None).id(), "");
}

#[test]
fn test_series_point_skips_unknown_metrics() {
    let p = SeriesPoint {
        t: 1_000,
        cpu_pct: Some(73),
        ..Default::default()
    };
    let json = serde_json::to_value(&p).unwrap();
    assert_eq!(json, json!({"t": 1000, "cpuPct": 73}));
}

#[test]
fn test_payload_serialization_camel_case_and_tagged_extension() {
    let payload = CanonicalPayload {
        kind: SelectionKind::BackupStore,
        title: "main".into(),
        subtitle: None,
        breadcrumbs: vec!["Inventory".into(), "pbs".into(), "main".into()],
        status: HealthStatus::Warn,
        kpis: vec![LabeledValue::new("Usage", "85%")],
        properties: vec![],
        metrics: Some(Metrics {
            storage: Some(Gauge {
                pct: 85,
                used: 85.0,
                capacity: 100.0,
            }),
            ..Default::default()
        }),
        extension: Extension::BackupStore(BackupStoreDetails {
            server: "pbs".into(),
            store: "main".into(),
            used: 85.0,
            total: 100.0,
            pct: 85,
            backups: vec![],
            stats: None,
            pagination: None,
            series: vec![],
        }),
    };
    let json = serde_json::to_value(&payload).unwrap();
    assert_eq!(json["kind"], "backup-store");
    assert_eq!(json["status"], "warn");
    assert!(json.get("subtitle").is_none());
    assert!(json["metrics"].get("cpu").is_none());
    assert_eq!(json["extension"]["backupStore"]["pct"], 85);
    let back: CanonicalPayload = serde_json::from_value(json).unwrap();
    assert_eq!(back, payload);
}

#[test]
fn test_guest_config_serialization() {
    let cfg = GuestConfigDetails {
        disks: vec![DiskDescriptor {
            id: "scsi0".into(),
            storage: Some("local-lvm".into()),
            volume: "vm-100-disk-0".into(),
            iothread: true,
            ..Default::default()
        }],
        options: GuestOptions {
            agent_enabled: true,
            rtc_mode: Some("utc".into()),
            ..Default::default()
        },
        ..Default::default()
    };
    let json = serde_json::to_string(&cfg).unwrap();
    assert!(json.contains("\"agentEnabled\":true"));
    assert!(json.contains("\"rtcMode\""));
    assert!(json.contains("\"iothread\":true"));
}

#[test]
fn test_timeframe_wire_names() {
    assert_eq!(serde_json::to_value(Timeframe::Month).unwrap(), json!("month"));
    let tf: Timeframe = serde_json::from_value(json!("year")).unwrap();
    assert_eq!(tf.as_str(), "year");
    assert_eq!(Timeframe::default(), Timeframe::Hour);
}
