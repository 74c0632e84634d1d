//! Rendering Capabilities
//!
//! The dashboard writes through these traits and never touches an output
//! device directly. [`terminal`] provides the stdout implementation.

pub mod terminal;

pub use terminal::{TerminalCharts, TerminalSurface};

use crate::dashboard::{AlertFeed, ChartSpec, Metric};
use thiserror::Error;

/// Fixed display targets of the dashboard
pub trait DashboardSurface {
    /// Replace the text of a reading target
    fn set_reading(&mut self, metric: Metric, text: &str);

    /// Replace the active alert counter
    fn set_alert_count(&mut self, count: usize);

    /// Replace the alert list
    fn show_alerts(&mut self, feed: &AlertFeed);

    /// Called once at the end of every tick that reached the renderers
    fn present(&mut self) {}
}

/// Opaque chart drawing capability
pub trait ChartBackend {
    /// A mounted chart instance
    type Handle;

    fn create(&mut self, slot: Metric, spec: &ChartSpec) -> Result<Self::Handle, RenderError>;

    fn destroy(&mut self, handle: Self::Handle);
}

/// Rendering failures
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Failed to draw {slot} chart: {message}")]
    Chart { slot: Metric, message: String },

    #[error("Output error: {0}")]
    Io(#[from] std::io::Error),
}
