// RRD sample normalization: alias resolution, unit disambiguation, chronological order.

use serde_json::Value;

use crate::envelope;
use crate::models::{SeriesPoint, SeriesSource};

const TIME_ALIASES: &[&str] = &["time", "t", "timestamp"];
const CPU_ALIASES: &[&str] = &["cpu", "cpu_avg", "cpuutil", "cpuused"];
const MEM_USED_ALIASES: &[&str] = &["mem", "mem_avg", "memory", "memused", "memtotal"];
const MEM_CAPACITY_ALIASES: &[&str] = &["maxmem", "max_mem", "memtotal", "total"];
const NET_IN_ALIASES: &[&str] = &["netin", "net_in", "netin_avg"];
const NET_OUT_ALIASES: &[&str] = &["netout", "net_out", "netout_avg"];
const LOAD_ALIASES: &[&str] = &["loadavg", "load", "load_avg"];
const DISK_READ_ALIASES: &[&str] = &["diskread", "disk_read", "diskread_avg"];
const DISK_WRITE_ALIASES: &[&str] = &["diskwrite", "disk_write", "diskwrite_avg"];

/// Upper bound (inclusive) for values read as a 0..1 fraction rather than a percentage.
///
/// Upstream reports the same metric either way depending on source. A genuine 1.5%
/// and a 150% fraction are indistinguishable here; the threshold is kept as-is for
/// compatibility with what the platform emits.
pub const FRACTION_THRESHOLD: f64 = 1.5;

/// Timestamps at or above this are already milliseconds.
const MILLIS_CUTOFF: f64 = 1e12;

/// Reads `raw` as a percentage: values up to [`FRACTION_THRESHOLD`] are fractions.
pub fn disambiguate_fraction_or_percent(raw: f64) -> f64 {
    if raw <= FRACTION_THRESHOLD {
        raw * 100.0
    } else {
        raw
    }
}

fn clamp_pct(pct: f64) -> u32 {
    pct.clamp(0.0, 100.0).round() as u32
}

/// First alias present with a usable number.
fn first_of(sample: &Value, aliases: &[&str]) -> Option<f64> {
    aliases.iter().find_map(|k| envelope::num(sample, k))
}

fn timestamp_ms(sample: &Value) -> Option<i64> {
    let t = first_of(sample, TIME_ALIASES)?;
    let ms = if t.abs() >= MILLIS_CUTOFF { t } else { t * 1000.0 };
    Some(ms.round() as i64)
}

fn cpu_pct(sample: &Value) -> Option<u32> {
    first_of(sample, CPU_ALIASES).map(|raw| clamp_pct(disambiguate_fraction_or_percent(raw)))
}

fn ram_pct(sample: &Value, capacity_hint: Option<f64>) -> Option<u32> {
    let used = first_of(sample, MEM_USED_ALIASES)?;
    if used <= FRACTION_THRESHOLD {
        return Some(clamp_pct(disambiguate_fraction_or_percent(used)));
    }
    let capacity = first_of(sample, MEM_CAPACITY_ALIASES)
        .or(capacity_hint)
        .filter(|c| *c > 0.0)?;
    Some(clamp_pct(used / capacity * 100.0))
}

/// Normalizes one sample; `None` when it has no usable timestamp.
pub fn normalize_sample(
    sample: &Value,
    source: SeriesSource,
    capacity_hint: Option<f64>,
) -> Option<SeriesPoint> {
    let t = timestamp_ms(sample)?;
    let (load_avg, disk_read, disk_write) = match source {
        SeriesSource::Node => (first_of(sample, LOAD_ALIASES), None, None),
        SeriesSource::Guest => (
            None,
            first_of(sample, DISK_READ_ALIASES),
            first_of(sample, DISK_WRITE_ALIASES),
        ),
        SeriesSource::Backup => (None, None, None),
    };
    Some(SeriesPoint {
        t,
        cpu_pct: cpu_pct(sample),
        ram_pct: ram_pct(sample, capacity_hint),
        load_avg,
        net_in: first_of(sample, NET_IN_ALIASES),
        net_out: first_of(sample, NET_OUT_ALIASES),
        disk_read,
        disk_write,
    })
}

/// Normalizes a batch and sorts it by timestamp. Samples without a timestamp are dropped.
pub fn normalize(
    samples: &[Value],
    source: SeriesSource,
    capacity_hint: Option<f64>,
) -> Vec<SeriesPoint> {
    let mut points: Vec<SeriesPoint> = samples
        .iter()
        .filter_map(|s| normalize_sample(s, source, capacity_hint))
        .collect();
    points.sort_by_key(|p| p.t);
    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fraction_and_percent_cpu_agree() {
        let a = normalize_sample(&json!({"time": 1000, "cpu": 0.73}), SeriesSource::Node, None)
            .unwrap();
        let b =
            normalize_sample(&json!({"time": 1000, "cpu": 73}), SeriesSource::Node, None).unwrap();
        assert_eq!(a.t, 1_000_000);
        assert_eq!(a.cpu_pct, Some(73));
        assert_eq!(a, b);
    }

    #[test]
    fn cpu_fraction_range_maps_to_round_times_100() {
        for r in [0.0, 0.004, 0.5, 0.999, 1.0, 1.2, 1.5] {
            let p = normalize_sample(&json!({"t": 1, "cpu": r}), SeriesSource::Guest, None).unwrap();
            assert_eq!(p.cpu_pct, Some(((r * 100.0f64).round() as u32).min(100)));
        }
    }

    #[test]
    fn cpu_above_threshold_is_percent_clamped() {
        for (r, want) in [(1.6, 2), (42.4, 42), (99.5, 100), (250.0, 100)] {
            let p = normalize_sample(&json!({"t": 1, "cpu_avg": r}), SeriesSource::Node, None).unwrap();
            assert_eq!(p.cpu_pct, Some(want), "raw {r}");
        }
    }

    #[test]
    fn missing_metrics_stay_unset() {
        let p = normalize_sample(&json!({"timestamp": 5}), SeriesSource::Node, None).unwrap();
        assert_eq!(p.cpu_pct, None);
        assert_eq!(p.ram_pct, None);
        assert_eq!(p.net_in, None);
        assert_eq!(p.load_avg, None);
    }

    #[test]
    fn ram_uses_sample_capacity_then_hint() {
        let with_cap = json!({"t": 1, "mem": 512.0, "maxmem": 1024.0});
        let p = normalize_sample(&with_cap, SeriesSource::Guest, Some(4096.0)).unwrap();
        assert_eq!(p.ram_pct, Some(50));

        let hinted = json!({"t": 1, "memused": 1024.0});
        let p = normalize_sample(&hinted, SeriesSource::Guest, Some(4096.0)).unwrap();
        assert_eq!(p.ram_pct, Some(25));

        let p = normalize_sample(&hinted, SeriesSource::Guest, None).unwrap();
        assert_eq!(p.ram_pct, None);

        let p = normalize_sample(&hinted, SeriesSource::Guest, Some(0.0)).unwrap();
        assert_eq!(p.ram_pct, None);
    }

    #[test]
    fn ram_fraction_needs_no_capacity() {
        let p = normalize_sample(&json!({"t": 1, "mem_avg": 0.25}), SeriesSource::Node, None).unwrap();
        assert_eq!(p.ram_pct, Some(25));
    }

    #[test]
    fn source_specific_fields() {
        let s = json!({"t": 1, "loadavg": 0.7, "diskread": 10.0, "diskwrite": 20.0, "netin": 5});
        let node = normalize_sample(&s, SeriesSource::Node, None).unwrap();
        assert_eq!(node.load_avg, Some(0.7));
        assert_eq!(node.disk_read, None);
        let guest = normalize_sample(&s, SeriesSource::Guest, None).unwrap();
        assert_eq!(guest.load_avg, None);
        assert_eq!(guest.disk_read, Some(10.0));
        assert_eq!(guest.disk_write, Some(20.0));
        assert_eq!(guest.net_in, Some(5.0));
    }

    #[test]
    fn millisecond_timestamps_pass_through() {
        let p = normalize_sample(&json!({"time": 1_700_000_000_000i64}), SeriesSource::Backup, None)
            .unwrap();
        assert_eq!(p.t, 1_700_000_000_000);
    }

    #[test]
    fn normalize_drops_untimed_and_sorts() {
        let samples = vec![
            json!({"time": 30, "cpu": 0.3}),
            json!({"cpu": 0.9}),
            json!("garbage"),
            json!({"time": 10, "cpu": 0.1}),
            json!({"time": "20", "cpu": 0.2}),
        ];
        let out = normalize(&samples, SeriesSource::Node, None);
        assert!(out.len() <= samples.len());
        assert_eq!(out.iter().map(|p| p.t).collect::<Vec<_>>(), vec![10_000, 20_000, 30_000]);
        assert!(out.windows(2).all(|w| w[0].t <= w[1].t));
    }
}
