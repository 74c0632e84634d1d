//! Alert Renderer
//!
//! Maps the active alerts to display blocks. Input order is kept; nothing is
//! filtered, sorted or deduplicated.

use super::{parse_timestamp, Alert, Severity};

/// Shown when there are no active alerts
pub const EMPTY_ALERTS_MESSAGE: &str = "No active alerts";

/// Display-ready alert feed
#[derive(Debug, Clone, PartialEq)]
pub enum AlertFeed {
    Empty,
    Items(Vec<AlertView>),
}

/// One rendered alert block
#[derive(Debug, Clone, PartialEq)]
pub struct AlertView {
    pub kind: String,
    pub message: String,
    pub created_at: String,
    pub severity: Severity,
    /// `severity-<lowercased severity>`
    pub style_class: String,
}

impl AlertFeed {
    pub fn from_alerts(alerts: Option<&[Alert]>) -> Self {
        match alerts {
            None | Some([]) => AlertFeed::Empty,
            Some(alerts) => AlertFeed::Items(alerts.iter().map(AlertView::from_alert).collect()),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            AlertFeed::Empty => 0,
            AlertFeed::Items(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AlertView {
    pub fn from_alert(alert: &Alert) -> Self {
        Self {
            kind: alert.kind.clone(),
            message: alert.message.clone().unwrap_or_default(),
            created_at: format_created_at(&alert.created_at),
            severity: alert.severity(),
            style_class: format!("severity-{}", alert.severity.to_lowercase()),
        }
    }
}

/// `01 May 2024, 10:16`; unparseable values are shown verbatim
pub fn format_created_at(raw: &str) -> String {
    parse_timestamp(raw)
        .map(|dt| dt.format("%d %b %Y, %H:%M").to_string())
        .unwrap_or_else(|| raw.to_string())
}
