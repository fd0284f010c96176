// Numeric coercion and fixed-ladder formatting used in KPIs and properties.

const BYTE_UNITS: [&str; 6] = ["B", "KB", "MB", "GB", "TB", "PB"];
const RATE_UNITS: [&str; 4] = ["B/s", "KB/s", "MB/s", "GB/s"];

/// `round(used / capacity * 100)`; 0 when capacity is absent or not positive.
pub fn percent_of(used: Option<f64>, capacity: Option<f64>) -> u32 {
    let (Some(used), Some(capacity)) = (used, capacity) else {
        return 0;
    };
    if capacity.is_nan() || capacity <= 0.0 || !used.is_finite() {
        return 0;
    }
    // f64 -> u32 casts saturate, so negative ratios land on 0.
    (used / capacity * 100.0).round() as u32
}

/// CPU load reported as a 0..1 fraction, as a whole percentage.
pub fn cpu_percent(raw: Option<f64>) -> u32 {
    match raw {
        Some(r) if r.is_finite() => (r * 100.0).round() as u32,
        _ => 0,
    }
}

fn ladder(value: Option<f64>, units: &[&str]) -> String {
    let Some(mut v) = value.filter(|v| v.is_finite() && *v >= 0.0) else {
        return format!("0 {}", units[0]);
    };
    let mut idx = 0;
    while v >= 1024.0 && idx + 1 < units.len() {
        v /= 1024.0;
        idx += 1;
    }
    if idx == 0 {
        format!("{} {}", v.round() as u64, units[0])
    } else {
        format!("{:.2} {}", v, units[idx])
    }
}

pub fn format_bytes(bytes: Option<f64>) -> String {
    ladder(bytes, &BYTE_UNITS)
}

pub fn format_rate(bytes_per_sec: Option<f64>) -> String {
    ladder(bytes_per_sec, &RATE_UNITS)
}

/// `D days HH:MM:SS`.
pub fn format_uptime(secs: Option<f64>) -> String {
    let total = match secs {
        Some(s) if s.is_finite() && s > 0.0 => s as u64,
        _ => 0,
    };
    let days = total / 86_400;
    let hours = (total % 86_400) / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    format!("{days} days {hours:02}:{minutes:02}:{seconds:02}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_of_zero_or_missing_capacity_is_zero() {
        for used in [None, Some(0.0), Some(10.0), Some(-5.0), Some(f64::NAN)] {
            assert_eq!(percent_of(used, Some(0.0)), 0);
            assert_eq!(percent_of(used, Some(-1.0)), 0);
            assert_eq!(percent_of(used, None), 0);
        }
        assert_eq!(percent_of(Some(1.0), Some(f64::NAN)), 0);
    }

    #[test]
    fn percent_of_rounds() {
        assert_eq!(percent_of(Some(500.0), Some(1000.0)), 50);
        assert_eq!(percent_of(Some(1.0), Some(3.0)), 33);
        assert_eq!(percent_of(Some(2.0), Some(3.0)), 67);
    }

    #[test]
    fn cpu_percent_handles_missing_and_non_finite() {
        assert_eq!(cpu_percent(None), 0);
        assert_eq!(cpu_percent(Some(f64::INFINITY)), 0);
        assert_eq!(cpu_percent(Some(0.42)), 42);
        assert_eq!(cpu_percent(Some(0.005)), 1);
    }

    #[test]
    fn format_bytes_walks_ladder() {
        assert_eq!(format_bytes(Some(512.0)), "512 B");
        assert_eq!(format_bytes(Some(1536.0)), "1.50 KB");
        assert_eq!(format_bytes(Some(128.0 * 1024.0 * 1024.0 * 1024.0)), "128.00 GB");
        assert_eq!(format_bytes(Some(3.0 * 1024f64.powi(6))), "3072.00 PB");
        assert_eq!(format_bytes(None), "0 B");
        assert_eq!(format_bytes(Some(f64::NAN)), "0 B");
    }

    #[test]
    fn format_rate_caps_at_gigabytes() {
        assert_eq!(format_rate(Some(2048.0)), "2.00 KB/s");
        assert_eq!(format_rate(Some(2.0 * 1024f64.powi(4))), "2048.00 GB/s");
        assert_eq!(format_rate(None), "0 B/s");
    }

    #[test]
    fn format_uptime_days_and_clock() {
        let secs = 3.0 * 86_400.0 + 4.0 * 3600.0 + 5.0 * 60.0 + 6.0;
        assert_eq!(format_uptime(Some(secs)), "3 days 04:05:06");
        assert_eq!(format_uptime(None), "0 days 00:00:00");
        assert_eq!(format_uptime(Some(f64::NAN)), "0 days 00:00:00");
    }
}
