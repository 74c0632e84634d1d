//! # Nodewatch
//!
//! Monitoring client for a sensor-telemetry backend. Polls one node's latest
//! readings, active alerts and hourly averages and keeps a live dashboard
//! of them.
//!
//! ## Features
//!
//! - **Authenticated client**: bearer token on every call, session ends on 401
//! - **Resilient refresh**: a failed tick is logged and the schedule goes on
//! - **Partial data**: every snapshot section is optional and degrades on its own
//! - **Chart lifecycle**: one live chart per metric, replaced every tick
//!
//! ## Modules
//!
//! - [`session`]: persisted token and user profile
//! - [`client`]: authenticated HTTP client
//! - [`dashboard`]: snapshot model, renderers and the refresh cycle
//! - [`render`]: rendering capabilities and the terminal renderer
//! - [`history`]: historical readings and statistics
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use nodewatch::*;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let session = Arc::new(FileSessionStore::new("session.json"));
//!     let client = ApiClient::new(ClientConfig::default(), session, Arc::new(ConsoleNavigator))?;
//!
//!     let cycle = RefreshCycle::new(
//!         Arc::new(client),
//!         TerminalSurface::stdout("Node dashboard"),
//!         TerminalCharts::stdout(),
//!     );
//!     let handle = cycle.spawn(Duration::from_secs(30));
//!
//!     tokio::signal::ctrl_c().await?;
//!     handle.shutdown().await?;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod dashboard;
pub mod history;
pub mod render;
pub mod session;

#[cfg(test)]
mod test_support;

// Re-export top-level types for convenience
pub use client::{ApiClient, ClientConfig, ClientError, ConsoleNavigator, Navigator, RequestOptions};

pub use config::{Config, ConfigError};

pub use dashboard::{
    AlertFeed, DashboardSnapshot, FailureKind, Metric, RefreshCycle, RefreshHandle, TickError, TickOutcome,
    TickReport,
};

pub use history::{HistoricalReport, HistoryClient, HistoryError, Period};

pub use render::{ChartBackend, DashboardSurface, RenderError, TerminalCharts, TerminalSurface};

pub use session::{FileSessionStore, MemorySessionStore, NodeId, SessionError, SessionStore, UserProfile};
