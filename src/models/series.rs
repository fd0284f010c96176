// Normalized time-series point. Absent metrics stay None (never zero).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesPoint {
    /// Milliseconds since the Unix epoch.
    pub t: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_pct: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ram_pct: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_avg: Option<f64>,
    /// Bytes/s.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub net_in: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub net_out: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk_read: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk_write: Option<f64>,
}

/// Which alias families apply to a sample source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesSource {
    Node,
    Guest,
    Backup,
}

/// RRD window requested from upstream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Timeframe {
    #[default]
    Hour,
    Day,
    Week,
    Month,
    Year,
}

impl Timeframe {
    pub fn as_str(self) -> &'static str {
        match self {
            Timeframe::Hour => "hour",
            Timeframe::Day => "day",
            Timeframe::Week => "week",
            Timeframe::Month => "month",
            Timeframe::Year => "year",
        }
    }
}
