// Canonical payload: the single output of a resolution.

use serde::{Deserialize, Serialize};

use super::Extension;
use crate::selection::SelectionKind;

/// Coarse health rollup shown next to the title.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Ok,
    Warn,
    Crit,
    Unknown,
}

/// A label/value pair, used for both KPIs and free-form properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabeledValue {
    pub label: String,
    pub value: String,
}

impl LabeledValue {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// Percentage plus the raw quantities it was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Gauge {
    pub pct: u32,
    pub used: f64,
    pub capacity: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<Gauge>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ram: Option<Gauge>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage: Option<Gauge>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub swap: Option<Gauge>,
}

/// Built once per selection, never mutated. `kind` always equals `extension.kind()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalPayload {
    pub kind: SelectionKind,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    pub breadcrumbs: Vec<String>,
    pub status: HealthStatus,
    pub kpis: Vec<LabeledValue>,
    pub properties: Vec<LabeledValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<Metrics>,
    pub extension: Extension,
}

impl CanonicalPayload {
    /// KPI value by label (e.g. `"Nodes"`).
    pub fn kpi(&self, label: &str) -> Option<&str> {
        self.kpis
            .iter()
            .find(|k| k.label == label)
            .map(|k| k.value.as_str())
    }

    pub fn property(&self, label: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|p| p.label == label)
            .map(|p| p.value.as_str())
    }
}
