//! Terminal Renderer
//!
//! Draws the dashboard as plain text. Readings and alerts are buffered and
//! written as one frame per tick; charts are drawn as sparklines when they
//! are mounted.

use super::{ChartBackend, DashboardSurface, RenderError};
use crate::dashboard::{AlertFeed, ChartSpec, Metric, Severity, EMPTY_ALERTS_MESSAGE};
use std::collections::{BTreeMap, HashMap};
use std::io::{Stdout, Write};

const SPARK_LEVELS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Text dashboard
pub struct TerminalSurface<W: Write = Stdout> {
    out: W,
    title: String,
    readings: BTreeMap<Metric, String>,
    alert_count: usize,
    alerts: AlertFeed,
}

impl TerminalSurface<Stdout> {
    pub fn stdout(title: impl Into<String>) -> Self {
        Self::new(std::io::stdout(), title)
    }
}

impl<W: Write> TerminalSurface<W> {
    pub fn new(out: W, title: impl Into<String>) -> Self {
        Self {
            out,
            title: title.into(),
            readings: BTreeMap::new(),
            alert_count: 0,
            alerts: AlertFeed::Empty,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_frame(&mut self) -> std::io::Result<()> {
        writeln!(self.out, "── {} ──", self.title)?;

        for metric in Metric::ALL {
            let value = self.readings.get(&metric).map(String::as_str).unwrap_or("--");
            writeln!(self.out, "  {:<12} {:>8} {}", metric.name(), value, metric.unit())?;
        }

        writeln!(self.out, "  active alerts: {}", self.alert_count)?;
        match &self.alerts {
            AlertFeed::Empty => writeln!(self.out, "    {}", EMPTY_ALERTS_MESSAGE)?,
            AlertFeed::Items(items) => {
                for alert in items {
                    writeln!(
                        self.out,
                        "    [{}] {} - {} ({})",
                        severity_tag(&alert.severity),
                        alert.kind,
                        alert.message,
                        alert.created_at
                    )?;
                }
            }
        }

        self.out.flush()
    }
}

fn severity_tag(severity: &Severity) -> String {
    match severity {
        Severity::Other(raw) => raw.to_uppercase(),
        known => known.to_string().to_uppercase(),
    }
}

impl<W: Write> DashboardSurface for TerminalSurface<W> {
    fn set_reading(&mut self, metric: Metric, text: &str) {
        self.readings.insert(metric, text.to_string());
    }

    fn set_alert_count(&mut self, count: usize) {
        self.alert_count = count;
    }

    fn show_alerts(&mut self, feed: &AlertFeed) {
        self.alerts = feed.clone();
    }

    fn present(&mut self) {
        if let Err(e) = self.write_frame() {
            tracing::error!("Failed to write dashboard frame: {}", e);
        }
    }
}

/// Sparkline charts
pub struct TerminalCharts<W: Write = Stdout> {
    out: W,
    next_id: u64,
    mounted: HashMap<u64, Metric>,
}

impl TerminalCharts<Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> TerminalCharts<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            next_id: 0,
            mounted: HashMap::new(),
        }
    }

    /// Number of charts currently mounted
    pub fn mounted(&self) -> usize {
        self.mounted.len()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ChartBackend for TerminalCharts<W> {
    type Handle = u64;

    fn create(&mut self, slot: Metric, spec: &ChartSpec) -> Result<u64, RenderError> {
        let range = match (spec.labels.first(), spec.labels.last()) {
            (Some(first), Some(last)) => format!("{} → {}", first, last),
            _ => "no data".to_string(),
        };
        writeln!(
            self.out,
            "  {:<18} {} ({} points, {})",
            spec.title,
            sparkline(&spec.values),
            spec.len(),
            range
        )?;

        self.next_id += 1;
        self.mounted.insert(self.next_id, slot);
        Ok(self.next_id)
    }

    fn destroy(&mut self, handle: u64) {
        self.mounted.remove(&handle);
    }
}

/// One block character per value, scaled between the series min and max
pub fn sparkline(values: &[f64]) -> String {
    let finite = values.iter().copied().filter(|v| v.is_finite());
    let min = finite.clone().fold(f64::INFINITY, f64::min);
    let max = finite.fold(f64::NEG_INFINITY, f64::max);
    let span = max - min;

    values
        .iter()
        .map(|v| {
            if !v.is_finite() {
                ' '
            } else if span <= f64::EPSILON {
                SPARK_LEVELS[SPARK_LEVELS.len() / 2]
            } else {
                let idx = ((v - min) / span * (SPARK_LEVELS.len() - 1) as f64).round() as usize;
                SPARK_LEVELS[idx.min(SPARK_LEVELS.len() - 1)]
            }
        })
        .collect()
}
