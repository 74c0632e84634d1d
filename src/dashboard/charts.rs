//! Chart Renderer
//!
//! Rebuilds the three hourly charts on every tick. The registry owns the
//! mounted chart handles; a slot's previous chart is destroyed before its
//! replacement is created, so there is never more than one live chart per
//! metric.

use super::{parse_timestamp, HourlyPoint, Metric};
use crate::render::{ChartBackend, RenderError};
use std::collections::HashMap;
use std::fmt;

/// Line tension used for all charts
const TENSION: f64 = 0.4;

/// Fill opacity under the line
const FILL_ALPHA: f64 = 0.1;

/// RGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    /// CSS `rgba()` string with the given alpha
    pub fn with_alpha(&self, alpha: f64) -> String {
        format!("rgba({}, {}, {}, {})", self.0, self.1, self.2, alpha)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgb({}, {}, {})", self.0, self.1, self.2)
    }
}

/// Everything a backend needs to draw one line chart
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    pub title: String,
    pub border_color: Rgb,
    pub background_color: String,
    pub tension: f64,
    pub responsive: bool,
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

impl ChartSpec {
    /// Line chart for `metric` with the per-metric style
    pub fn line(metric: Metric, labels: Vec<String>, values: Vec<f64>) -> Self {
        let (title, color) = match metric {
            Metric::Temperature => ("Temperature (°C)", Rgb(239, 68, 68)),
            Metric::Humidity => ("Humidity (%)", Rgb(59, 130, 246)),
            Metric::Co2 => ("CO2 (ppm)", Rgb(16, 185, 129)),
        };

        Self {
            title: title.to_string(),
            border_color: color,
            background_color: color.with_alpha(FILL_ALPHA),
            tension: TENSION,
            responsive: true,
            labels,
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Parallel arrays derived from the hourly series, input order kept
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChartSeries {
    pub labels: Vec<String>,
    pub temperature: Vec<f64>,
    pub humidity: Vec<f64>,
    pub co2: Vec<f64>,
}

impl ChartSeries {
    pub fn from_hourly(points: &[HourlyPoint]) -> Self {
        let mut series = Self {
            labels: Vec::with_capacity(points.len()),
            temperature: Vec::with_capacity(points.len()),
            humidity: Vec::with_capacity(points.len()),
            co2: Vec::with_capacity(points.len()),
        };

        for point in points {
            series.labels.push(time_label(&point.timestamp));
            series.temperature.push(point.temperature);
            series.humidity.push(point.humidity);
            series.co2.push(point.co2);
        }

        series
    }

    pub fn values(&self, metric: Metric) -> &[f64] {
        match metric {
            Metric::Temperature => &self.temperature,
            Metric::Humidity => &self.humidity,
            Metric::Co2 => &self.co2,
        }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// `HH:MM:SS` label; raw text when the timestamp cannot be parsed
fn time_label(raw: &str) -> String {
    parse_timestamp(raw)
        .map(|dt| dt.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| raw.to_string())
}

/// Live chart handles, at most one per metric
pub struct ChartRegistry<B: ChartBackend> {
    backend: B,
    mounted: HashMap<Metric, B::Handle>,
}

impl<B: ChartBackend> ChartRegistry<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            mounted: HashMap::new(),
        }
    }

    /// Destroy the slot's current chart, then mount a new one
    ///
    /// If creation fails the slot is left empty.
    pub fn replace(&mut self, metric: Metric, spec: &ChartSpec) -> Result<(), RenderError> {
        if let Some(old) = self.mounted.remove(&metric) {
            self.backend.destroy(old);
        }

        let handle = self.backend.create(metric, spec)?;
        self.mounted.insert(metric, handle);
        Ok(())
    }

    /// Destroy every mounted chart
    pub fn clear(&mut self) {
        for (_, handle) in self.mounted.drain() {
            self.backend.destroy(handle);
        }
    }

    pub fn is_mounted(&self, metric: Metric) -> bool {
        self.mounted.contains_key(&metric)
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}

impl<B: ChartBackend> Drop for ChartRegistry<B> {
    fn drop(&mut self) {
        self.clear();
    }
}

/// Rebuilds the three charts from an hourly series
pub struct ChartRenderer<B: ChartBackend> {
    registry: ChartRegistry<B>,
}

impl<B: ChartBackend> ChartRenderer<B> {
    pub fn new(backend: B) -> Self {
        Self {
            registry: ChartRegistry::new(backend),
        }
    }

    /// Redraw all charts. Every slot is attempted; the first failure is
    /// returned after the others have been drawn.
    pub fn render(&mut self, points: &[HourlyPoint]) -> Result<(), RenderError> {
        let series = ChartSeries::from_hourly(points);
        let mut first_error = None;

        for metric in Metric::ALL {
            let spec = ChartSpec::line(metric, series.labels.clone(), series.values(metric).to_vec());
            if let Err(e) = self.registry.replace(metric, &spec) {
                tracing::error!("Failed to draw {} chart: {}", metric, e);
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => {
                tracing::debug!("Charts redrawn with {} points", series.len());
                Ok(())
            }
        }
    }

    pub fn registry(&self) -> &ChartRegistry<B> {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ChartRegistry<B> {
        &mut self.registry
    }
}
