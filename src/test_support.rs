//! Shared test fixtures: fake backend, recording navigator, in-memory
//! rendering surface and chart backend.

use crate::client::Navigator;
use crate::dashboard::{AlertFeed, ChartSpec, Metric};
use crate::render::{ChartBackend, DashboardSurface, RenderError};
use std::collections::HashMap;
use std::sync::Mutex;

/// Serve `router` on an ephemeral port, returning its base URL
pub async fn spawn_backend(router: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Base URL of a port nothing listens on
pub async fn closed_port_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

#[derive(Default)]
pub struct RecordingNavigator {
    visits: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn visits(&self) -> Vec<String> {
        self.visits.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate_to_login(&self, login_url: &str) {
        self.visits.lock().unwrap().push(login_url.to_string());
    }
}

/// Surface that keeps what was written to it
#[derive(Debug, Default)]
pub struct MemorySurface {
    pub readings: HashMap<Metric, String>,
    pub alert_count: Option<usize>,
    pub alerts: Option<AlertFeed>,
    pub presents: usize,
}

impl DashboardSurface for MemorySurface {
    fn set_reading(&mut self, metric: Metric, text: &str) {
        self.readings.insert(metric, text.to_string());
    }

    fn set_alert_count(&mut self, count: usize) {
        self.alert_count = Some(count);
    }

    fn show_alerts(&mut self, feed: &AlertFeed) {
        self.alerts = Some(feed.clone());
    }

    fn present(&mut self) {
        self.presents += 1;
    }
}

/// Chart backend that tracks live instances
#[derive(Debug, Default)]
pub struct MemoryCharts {
    next_id: u64,
    pub live: HashMap<u64, (Metric, ChartSpec)>,
    pub created: usize,
    pub destroyed: usize,
    /// Slots whose creation fails
    pub fail_on: Vec<Metric>,
}

impl MemoryCharts {
    pub fn failing_on(slots: Vec<Metric>) -> Self {
        Self {
            fail_on: slots,
            ..Self::default()
        }
    }

    pub fn live_in(&self, slot: Metric) -> Vec<&ChartSpec> {
        self.live
            .values()
            .filter(|(s, _)| *s == slot)
            .map(|(_, spec)| spec)
            .collect()
    }
}

impl ChartBackend for MemoryCharts {
    type Handle = u64;

    fn create(&mut self, slot: Metric, spec: &ChartSpec) -> Result<u64, RenderError> {
        if self.fail_on.contains(&slot) {
            return Err(RenderError::Chart {
                slot,
                message: "canvas unavailable".to_string(),
            });
        }
        self.next_id += 1;
        self.created += 1;
        self.live.insert(self.next_id, (slot, spec.clone()));
        Ok(self.next_id)
    }

    fn destroy(&mut self, handle: u64) {
        if self.live.remove(&handle).is_some() {
            self.destroyed += 1;
        }
    }
}
