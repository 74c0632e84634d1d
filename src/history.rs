//! Historical Readings
//!
//! Raw measurements and min/avg/max statistics for a node over the last
//! day, week or month.

use crate::client::{ApiClient, ClientError};
use crate::dashboard::{format_co2, format_one_decimal, Measurement, Metric};
use crate::session::NodeId;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

/// Look-back window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Period {
    #[default]
    Day,
    Week,
    Month,
}

impl Period {
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Day => "day",
            Period::Week => "week",
            Period::Month => "month",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = HistoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "day" | "1d" => Ok(Period::Day),
            "week" | "7d" | "1w" => Ok(Period::Week),
            "month" | "30d" | "1m" => Ok(Period::Month),
            other => Err(HistoryError::InvalidPeriod(other.to_string())),
        }
    }
}

/// Min/avg/max of one quantity
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct MetricStats {
    #[serde(default, rename = "promedio", alias = "avg")]
    pub avg: f64,
    #[serde(default, rename = "minimo", alias = "min")]
    pub min: f64,
    #[serde(default, rename = "maximo", alias = "max")]
    pub max: f64,
}

/// Statistics block of a historical report
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Statistics {
    #[serde(default, rename = "temperatura", alias = "temperature")]
    pub temperature: MetricStats,
    #[serde(default, rename = "humedad", alias = "humidity")]
    pub humidity: MetricStats,
    #[serde(default)]
    pub co2: MetricStats,
    #[serde(default, rename = "total_mediciones", alias = "count")]
    pub count: u64,
}

impl Statistics {
    pub fn get(&self, metric: Metric) -> &MetricStats {
        match metric {
            Metric::Temperature => &self.temperature,
            Metric::Humidity => &self.humidity,
            Metric::Co2 => &self.co2,
        }
    }
}

/// Response of the historical endpoint
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoricalReport {
    #[serde(default)]
    pub measurements: Vec<Measurement>,
    #[serde(default)]
    pub statistics: Statistics,
    #[serde(default)]
    pub period: Option<String>,
}

impl HistoricalReport {
    /// One line per metric: `temperature  avg 21.4  min 18.0  max 25.1 °C`
    pub fn summary_lines(&self) -> Vec<String> {
        Metric::ALL
            .iter()
            .map(|&metric| {
                let stats = self.statistics.get(metric);
                let fmt = |v: f64| match metric {
                    Metric::Co2 => format_co2(v),
                    _ => format_one_decimal(v),
                };
                format!(
                    "{:<12} avg {:>7}  min {:>7}  max {:>7} {}",
                    metric.name(),
                    fmt(stats.avg),
                    fmt(stats.min),
                    fmt(stats.max),
                    metric.unit()
                )
            })
            .collect()
    }
}

/// Fetches historical reports through the authenticated client
pub struct HistoryClient {
    client: Arc<ApiClient>,
}

impl HistoryClient {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    pub async fn fetch(&self, node: &NodeId, period: Period) -> Result<HistoricalReport, HistoryError> {
        let endpoint = format!(
            "/measurements/historical/{}?period={}",
            node.path_segment(),
            period
        );
        tracing::debug!("Fetching {} history for node {}", period, node);
        Ok(self.client.get_json(&endpoint).await?)
    }
}

/// Errors fetching history
#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("Unknown period '{0}' (expected day, week or month)")]
    InvalidPeriod(String),

    #[error(transparent)]
    Client(#[from] ClientError),
}
