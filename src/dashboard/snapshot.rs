//! Dashboard Snapshot
//!
//! Response payload of `GET /measurements/dashboard/<node>`. Every section
//! is optional; consumers decide what an absent section means.

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Combined dashboard payload for one node at one poll
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    #[serde(default, alias = "latestMeasurement")]
    pub latest_measurement: Option<Measurement>,
    #[serde(default, alias = "activeAlerts")]
    pub active_alerts: Option<Vec<Alert>>,
    #[serde(default, alias = "hourlyData")]
    pub hourly_data: Option<Vec<HourlyPoint>>,
    /// Node record echoed by the backend; not rendered
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<serde_json::Value>,
}

impl DashboardSnapshot {
    /// Hourly series, empty when the backend omitted it
    pub fn hourly(&self) -> &[HourlyPoint] {
        self.hourly_data.as_deref().unwrap_or(&[])
    }

    /// Number of active alerts, zero when the backend omitted them
    pub fn alert_count(&self) -> usize {
        self.active_alerts.as_ref().map_or(0, Vec::len)
    }
}

/// Latest scalar readings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    #[serde(default, rename = "temperatura", alias = "temperature")]
    pub temperature: Option<f64>,
    #[serde(default, rename = "humedad", alias = "humidity")]
    pub humidity: Option<f64>,
    #[serde(default)]
    pub co2: Option<f64>,
    #[serde(default, rename = "fecha_hora", alias = "timestamp", skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

/// One hourly average, in chronological order within the series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyPoint {
    #[serde(rename = "fecha_hora", alias = "timestamp")]
    pub timestamp: String,
    #[serde(rename = "temperatura", alias = "temperature")]
    pub temperature: f64,
    #[serde(rename = "humedad", alias = "humidity")]
    pub humidity: f64,
    pub co2: f64,
}

/// An active alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(rename = "tipo", alias = "type")]
    pub kind: String,
    #[serde(rename = "severidad", alias = "severity")]
    pub severity: String,
    #[serde(default, rename = "mensaje", alias = "message")]
    pub message: Option<String>,
    #[serde(rename = "fecha_creacion", alias = "created_at", alias = "createdAt")]
    pub created_at: String,
}

impl Alert {
    pub fn severity(&self) -> Severity {
        Severity::parse(&self.severity)
    }
}

/// Alert urgency, used for display only
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
    /// Anything the backend sends that is not recognised
    Other(String),
}

impl Severity {
    /// Case-insensitive parse; never fails
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "baja" | "low" => Severity::Low,
            "media" | "medium" => Severity::Medium,
            "alta" | "high" => Severity::High,
            "crítica" | "critica" | "critical" => Severity::Critical,
            _ => Severity::Other(raw.to_string()),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Low => f.write_str("low"),
            Severity::Medium => f.write_str("medium"),
            Severity::High => f.write_str("high"),
            Severity::Critical => f.write_str("critical"),
            Severity::Other(raw) => f.write_str(raw),
        }
    }
}

/// Parse a backend datetime
///
/// The backend emits ISO-8601 without offset (`2024-05-01T10:15:00.123`),
/// hour buckets with a space separator (`2024-05-01 10:00:00`), and
/// occasionally RFC 3339. Values with an offset are kept in their own
/// offset's wall-clock time.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}
