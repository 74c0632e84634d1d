//! Node Dashboard
//!
//! Polls one node's dashboard snapshot and fans it out to the renderers.
//!
//! ## Architecture
//!
//! - **snapshot**: decoded backend payload, every section optional
//! - **metrics**: latest readings as formatted text
//! - **charts**: hourly series, one live chart per metric
//! - **alerts**: active alert feed
//! - **refresh**: the recurring tick and its fault boundary

mod alerts;
mod charts;
mod metrics;
mod refresh;
mod snapshot;

pub use alerts::{AlertFeed, AlertView, EMPTY_ALERTS_MESSAGE};
pub use charts::{ChartRegistry, ChartRenderer, ChartSeries, ChartSpec, Rgb};
pub use metrics::{format_co2, format_one_decimal, render_readings};
pub use refresh::{FailureKind, RefreshCycle, RefreshHandle, TickError, TickOutcome, TickReport};
pub use snapshot::{parse_timestamp, Alert, DashboardSnapshot, HourlyPoint, Measurement, Severity};

use std::fmt;

/// The three quantities a node reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Metric {
    Temperature,
    Humidity,
    Co2,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::Temperature, Metric::Humidity, Metric::Co2];

    pub fn name(&self) -> &'static str {
        match self {
            Metric::Temperature => "temperature",
            Metric::Humidity => "humidity",
            Metric::Co2 => "co2",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            Metric::Temperature => "°C",
            Metric::Humidity => "%",
            Metric::Co2 => "ppm",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
