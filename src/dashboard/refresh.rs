//! Dashboard Refresh Cycle
//!
//! One tick reads the node from the session, fetches the dashboard snapshot
//! and hands it to the renderers. The tick is the fault boundary: whatever
//! goes wrong inside it is classified, logged and dropped, and the schedule
//! keeps running.

use super::{render_readings, AlertFeed, ChartRenderer, DashboardSnapshot};
use crate::client::{ApiClient, ClientError};
use crate::render::{ChartBackend, DashboardSurface, RenderError};
use crate::session::SessionError;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{broadcast, watch};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::MissedTickBehavior;
use tracing::Instrument;
use uuid::Uuid;

/// Capacity of the tick report channel
const REPORT_CAPACITY: usize = 64;

/// Polls one node's dashboard and renders it
pub struct RefreshCycle<S, B>
where
    S: DashboardSurface,
    B: ChartBackend,
{
    client: Arc<ApiClient>,
    surface: S,
    charts: ChartRenderer<B>,
    ticks: u64,
    deadline: Option<Duration>,
}

/// Result of one tick
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    Rendered {
        readings_updated: bool,
        alert_count: usize,
        chart_points: usize,
    },
    Failed {
        kind: FailureKind,
        message: String,
    },
}

/// Failure class of a tick, one per [`TickError`] variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    Session,
    Transport,
    Timeout,
    Unauthorized,
    Status,
    Decode,
    Render,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Session => "session",
            FailureKind::Transport => "transport",
            FailureKind::Timeout => "timeout",
            FailureKind::Unauthorized => "unauthorized",
            FailureKind::Status => "status",
            FailureKind::Decode => "decode",
            FailureKind::Render => "render",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TickOutcome {
    pub fn is_rendered(&self) -> bool {
        matches!(self, TickOutcome::Rendered { .. })
    }

    /// Failure class, if the tick failed
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            TickOutcome::Failed { kind, .. } => Some(*kind),
            TickOutcome::Rendered { .. } => None,
        }
    }
}

/// Published after every tick
#[derive(Debug, Clone)]
pub struct TickReport {
    /// 1-based tick counter
    pub tick: u64,
    pub id: Uuid,
    pub outcome: TickOutcome,
}

/// Why a tick did not complete
#[derive(Error, Debug)]
pub enum TickError {
    #[error("Session unavailable: {0}")]
    Session(#[from] SessionError),

    #[error("Request failed: {0}")]
    Transport(#[source] ClientError),

    #[error("Tick did not finish within {0:?}")]
    Timeout(Duration),

    #[error("Session expired, login required")]
    Unauthorized,

    #[error("Backend answered {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Invalid dashboard snapshot: {0}")]
    Decode(String),

    #[error("Render failed: {0}")]
    Render(#[from] RenderError),
}

impl TickError {
    pub fn kind(&self) -> FailureKind {
        match self {
            TickError::Session(_) => FailureKind::Session,
            TickError::Transport(_) => FailureKind::Transport,
            TickError::Timeout(_) => FailureKind::Timeout,
            TickError::Unauthorized => FailureKind::Unauthorized,
            TickError::Status { .. } => FailureKind::Status,
            TickError::Decode(_) => FailureKind::Decode,
            TickError::Render(_) => FailureKind::Render,
        }
    }
}

impl From<ClientError> for TickError {
    fn from(e: ClientError) -> Self {
        match e {
            ClientError::Session(e) => TickError::Session(e),
            ClientError::Unauthorized => TickError::Unauthorized,
            ClientError::Status { status, message } => TickError::Status { status, message },
            ClientError::Decode(e) => TickError::Decode(e.to_string()),
            other => TickError::Transport(other),
        }
    }
}

impl<S, B> RefreshCycle<S, B>
where
    S: DashboardSurface,
    B: ChartBackend,
{
    pub fn new(client: Arc<ApiClient>, surface: S, charts: B) -> Self {
        Self {
            client,
            surface,
            charts: ChartRenderer::new(charts),
            ticks: 0,
            deadline: None,
        }
    }

    /// Give up on a tick that has not finished after `limit`
    ///
    /// [`spawn`](Self::spawn) uses the refresh period when no deadline is set.
    pub fn with_deadline(mut self, limit: Duration) -> Self {
        self.deadline = Some(limit);
        self
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn charts(&self) -> &ChartRenderer<B> {
        &self.charts
    }

    /// Ticks run so far
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Run one refresh. Never fails; the outcome says what happened.
    pub async fn tick(&mut self) -> TickReport {
        self.ticks += 1;
        let id = Uuid::new_v4();
        let span = tracing::info_span!("tick", tick = self.ticks, id = %id);

        let deadline = self.deadline;
        let load = async {
            match deadline {
                Some(limit) => tokio::time::timeout(limit, self.load())
                    .await
                    .unwrap_or_else(|_| Err(TickError::Timeout(limit))),
                None => self.load().await,
            }
        };

        let outcome = match load.instrument(span.clone()).await {
            Ok(outcome) => {
                if let TickOutcome::Rendered {
                    alert_count,
                    chart_points,
                    ..
                } = &outcome
                {
                    span.in_scope(|| {
                        tracing::info!(
                            "Dashboard refreshed: {} alerts, {} hourly points",
                            alert_count,
                            chart_points
                        )
                    });
                }
                outcome
            }
            Err(e) => {
                span.in_scope(|| match &e {
                    TickError::Session(_) | TickError::Unauthorized | TickError::Status { .. } => {
                        tracing::warn!(kind = %e.kind(), "Dashboard refresh skipped: {}", e)
                    }
                    _ => tracing::error!(kind = %e.kind(), "Dashboard refresh failed: {}", e),
                });
                TickOutcome::Failed {
                    kind: e.kind(),
                    message: e.to_string(),
                }
            }
        };

        TickReport {
            tick: self.ticks,
            id,
            outcome,
        }
    }

    async fn load(&mut self) -> Result<TickOutcome, TickError> {
        let node_id = self.client.session().node_id()?;
        let endpoint = format!("/measurements/dashboard/{}", node_id.path_segment());

        let snapshot: DashboardSnapshot = self.client.get_json(&endpoint).await?;
        self.render(&snapshot)
    }

    /// Fan a snapshot out to the renderers
    ///
    /// Readings and alerts are written even if a chart fails to draw.
    pub fn render(&mut self, snapshot: &DashboardSnapshot) -> Result<TickOutcome, TickError> {
        render_readings(&mut self.surface, snapshot.latest_measurement.as_ref());

        let alert_count = snapshot.alert_count();
        self.surface.set_alert_count(alert_count);
        self.surface
            .show_alerts(&AlertFeed::from_alerts(snapshot.active_alerts.as_deref()));

        let charts = self.charts.render(snapshot.hourly());
        self.surface.present();
        charts?;

        Ok(TickOutcome::Rendered {
            readings_updated: snapshot.latest_measurement.is_some(),
            alert_count,
            chart_points: snapshot.hourly().len(),
        })
    }
}

impl<S, B> RefreshCycle<S, B>
where
    S: DashboardSurface + Send + 'static,
    B: ChartBackend + Send + 'static,
    B::Handle: Send,
{
    /// Start the recurring refresh task
    ///
    /// The first tick runs immediately, then one every `period`. Ticks never
    /// overlap: a tick is abandoned once it reaches its deadline (the period
    /// unless [`with_deadline`](Self::with_deadline) says otherwise), so a
    /// backend that never answers cannot hold up the schedule. The task runs
    /// until [`RefreshHandle::stop`] is called or the handle is dropped.
    pub fn spawn(mut self, period: Duration) -> RefreshHandle {
        self.deadline.get_or_insert(period);
        let (reports, _) = broadcast::channel(REPORT_CAPACITY);
        let (stop, mut stopped) = watch::channel(false);
        let tx = reports.clone();

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            tracing::info!("Refresh cycle started, every {:?}", period);

            loop {
                tokio::select! {
                    _ = interval.tick() => {}
                    _ = stopped.changed() => break,
                }

                let report = self.tick().await;
                // No subscribers is fine
                let _ = tx.send(report);
            }

            self.charts.registry_mut().clear();
            tracing::info!("Refresh cycle stopped after {} ticks", self.ticks);
        });

        RefreshHandle { reports, stop, task }
    }
}

/// Handle to a running refresh task
pub struct RefreshHandle {
    reports: broadcast::Sender<TickReport>,
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl RefreshHandle {
    /// Receive a report after every tick from now on
    pub fn subscribe(&self) -> broadcast::Receiver<TickReport> {
        self.reports.subscribe()
    }

    /// Ask the task to stop after the current tick
    pub fn stop(&self) {
        let _ = self.stop.send(true);
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop and wait for the task to exit
    pub async fn shutdown(self) -> Result<(), JoinError> {
        self.stop();
        self.task.await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientConfig;
    use crate::dashboard::{Metric, EMPTY_ALERTS_MESSAGE};
    use crate::session::{MemorySessionStore, SessionStore};
    use crate::test_support::{
        closed_port_url, spawn_backend, MemoryCharts, MemorySurface, RecordingNavigator,
    };
    use axum::extract::State;
    use axum::http::StatusCode;
    use axum::{routing::get, Router};
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};

    type Cycle = RefreshCycle<MemorySurface, MemoryCharts>;

    /// Backend that answers successive dashboard calls from a script
    fn scripted(responses: Vec<(StatusCode, String)>) -> Router {
        let calls = Arc::new(AtomicUsize::new(0));
        let responses = Arc::new(responses);

        let handler = move |State(calls): State<Arc<AtomicUsize>>| {
            let responses = responses.clone();
            async move {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                let (status, body) = responses[n.min(responses.len() - 1)].clone();
                axum::http::Response::builder()
                    .status(status)
                    .header("content-type", "application/json")
                    .body(axum::body::Body::from(body))
                    .unwrap()
            }
        };

        Router::new()
            .route("/api/measurements/dashboard/:node", get(handler))
            .with_state(calls)
    }

    fn ok(body: Value) -> (StatusCode, String) {
        (StatusCode::OK, body.to_string())
    }

    fn session() -> Arc<MemorySessionStore> {
        Arc::new(
            MemorySessionStore::new()
                .with_token("tok")
                .with_user(json!({"id": 1, "nodo_id": 7})),
        )
    }

    fn cycle(base: &str, session: Arc<MemorySessionStore>, navigator: Arc<RecordingNavigator>) -> Cycle {
        let client = ApiClient::new(
            ClientConfig {
                api_base: format!("{}/api", base),
                login_url: "/login".to_string(),
                request_timeout_ms: Some(5_000),
            },
            session,
            navigator,
        )
        .unwrap();
        RefreshCycle::new(Arc::new(client), MemorySurface::default(), MemoryCharts::default())
    }

    fn full_snapshot() -> Value {
        json!({
            "latest_measurement": {"temperatura": 23.456, "humedad": 48.04, "co2": 412.6},
            "active_alerts": [
                {"tipo": "CO2", "severidad": "Alta", "mensaje": "a", "fecha_creacion": "2024-05-01T10:00:00"},
                {"tipo": "Temperatura", "severidad": "Baja", "mensaje": "b", "fecha_creacion": "2024-05-01T08:00:00"},
                {"tipo": "Humedad", "severidad": "Crítica", "mensaje": "c", "fecha_creacion": "2024-05-01T09:00:00"}
            ],
            "hourly_data": [
                {"fecha_hora": "2024-05-01 08:00:00", "temperatura": 21.0, "humedad": 50.0, "co2": 400.0},
                {"fecha_hora": "2024-05-01 09:00:00", "temperatura": 22.0, "humedad": 49.0, "co2": 405.0}
            ]
        })
    }

    #[tokio::test]
    async fn test_empty_snapshot_scenario() {
        let base = spawn_backend(scripted(vec![ok(json!({
            "latest_measurement": {"temperatura": 22.34, "humedad": 55.6, "co2": 410},
            "active_alerts": [],
            "hourly_data": []
        }))]))
        .await;
        let mut cycle = cycle(&base, session(), Arc::new(RecordingNavigator::default()));

        let report = cycle.tick().await;
        assert_eq!(report.tick, 1);
        assert_eq!(
            report.outcome,
            TickOutcome::Rendered {
                readings_updated: true,
                alert_count: 0,
                chart_points: 0
            }
        );

        let surface = cycle.surface();
        assert_eq!(surface.readings[&Metric::Temperature], "22.3");
        assert_eq!(surface.readings[&Metric::Humidity], "55.6");
        assert_eq!(surface.readings[&Metric::Co2], "410");
        assert_eq!(surface.alert_count, Some(0));
        assert_eq!(surface.alerts, Some(AlertFeed::Empty));
        assert_eq!(EMPTY_ALERTS_MESSAGE, "No active alerts");

        let charts = cycle.charts().registry().backend();
        assert_eq!(charts.live.len(), 3);
        assert!(charts.live.values().all(|(_, spec)| spec.is_empty()));
    }

    #[tokio::test]
    async fn test_full_snapshot_renders_everything_in_order() {
        let base = spawn_backend(scripted(vec![ok(full_snapshot())])).await;
        let mut cycle = cycle(&base, session(), Arc::new(RecordingNavigator::default()));

        assert!(cycle.tick().await.outcome.is_rendered());

        let surface = cycle.surface();
        assert_eq!(surface.readings[&Metric::Temperature], "23.5");
        assert_eq!(surface.readings[&Metric::Co2], "413");
        assert_eq!(surface.alert_count, Some(3));
        match surface.alerts.as_ref().unwrap() {
            AlertFeed::Items(items) => {
                let kinds: Vec<_> = items.iter().map(|a| a.kind.as_str()).collect();
                assert_eq!(kinds, vec!["CO2", "Temperatura", "Humedad"]);
            }
            AlertFeed::Empty => panic!("expected alert items"),
        }

        let temp = cycle.charts().registry().backend().live_in(Metric::Temperature);
        assert_eq!(temp[0].labels, vec!["08:00:00", "09:00:00"]);
        assert_eq!(temp[0].values, vec![21.0, 22.0]);
    }

    #[tokio::test]
    async fn test_absent_sections_degrade() {
        let base = spawn_backend(scripted(vec![
            ok(full_snapshot()),
            ok(json!({"hourly_data": [
                {"fecha_hora": "2024-05-01 10:00:00", "temperatura": 30.0, "humedad": 30.0, "co2": 900.0}
            ]})),
        ]))
        .await;
        let mut cycle = cycle(&base, session(), Arc::new(RecordingNavigator::default()));

        cycle.tick().await;
        let second = cycle.tick().await;
        assert_eq!(
            second.outcome,
            TickOutcome::Rendered {
                readings_updated: false,
                alert_count: 0,
                chart_points: 1
            }
        );

        let surface = cycle.surface();
        assert_eq!(surface.readings[&Metric::Temperature], "23.5");
        assert_eq!(surface.readings[&Metric::Humidity], "48.0");
        assert_eq!(surface.readings[&Metric::Co2], "413");
        assert_eq!(surface.alert_count, Some(0));
        assert_eq!(surface.alerts, Some(AlertFeed::Empty));
    }

    #[tokio::test]
    async fn test_one_live_chart_per_slot_after_many_ticks() {
        let base = spawn_backend(scripted(vec![ok(full_snapshot())])).await;
        let mut cycle = cycle(&base, session(), Arc::new(RecordingNavigator::default()));

        for _ in 0..6 {
            cycle.tick().await;
        }

        assert_eq!(cycle.ticks(), 6);
        let backend = cycle.charts().registry().backend();
        for metric in Metric::ALL {
            assert_eq!(backend.live_in(metric).len(), 1);
        }
        assert_eq!(backend.created - backend.destroyed, 3);
    }

    #[tokio::test]
    async fn test_missing_profile_is_session_failure() {
        let base = spawn_backend(scripted(vec![ok(full_snapshot())])).await;
        let store = Arc::new(MemorySessionStore::new().with_token("tok"));
        let mut cycle = cycle(&base, store, Arc::new(RecordingNavigator::default()));

        let report = cycle.tick().await;
        assert_eq!(report.outcome.failure_kind(), Some(FailureKind::Session));
        assert_eq!(cycle.surface().presents, 0);
    }

    #[tokio::test]
    async fn test_unauthorized_ends_session_whatever_the_body() {
        let base = spawn_backend(scripted(vec![(
            StatusCode::UNAUTHORIZED,
            full_snapshot().to_string(),
        )]))
        .await;
        let store = session();
        let navigator = Arc::new(RecordingNavigator::default());
        let mut cycle = cycle(&base, store.clone(), navigator.clone());

        let report = cycle.tick().await;

        assert_eq!(report.outcome.failure_kind(), Some(FailureKind::Unauthorized));
        assert_eq!(store.token().unwrap(), None);
        assert_eq!(navigator.visits(), vec!["/login".to_string()]);
        assert!(cycle.surface().readings.is_empty());
    }

    #[tokio::test]
    async fn test_error_status_keeps_stale_values() {
        let base = spawn_backend(scripted(vec![
            ok(full_snapshot()),
            (StatusCode::NOT_FOUND, json!({"error": "Nodo no encontrado"}).to_string()),
            (StatusCode::OK, "<html>oops</html>".to_string()),
        ]))
        .await;
        let mut cycle = cycle(&base, session(), Arc::new(RecordingNavigator::default()));

        cycle.tick().await;
        let not_found = cycle.tick().await;
        let garbage = cycle.tick().await;

        assert_eq!(not_found.outcome.failure_kind(), Some(FailureKind::Status));
        assert_eq!(garbage.outcome.failure_kind(), Some(FailureKind::Decode));
        assert_eq!(cycle.surface().readings[&Metric::Temperature], "23.5");
        assert_eq!(cycle.surface().alert_count, Some(3));
        assert_eq!(cycle.surface().presents, 1);
    }

    #[tokio::test]
    async fn test_chart_failure_still_renders_readings() {
        let base = spawn_backend(scripted(vec![ok(full_snapshot())])).await;
        let client = ApiClient::new(
            ClientConfig {
                api_base: format!("{}/api", base),
                login_url: "/login".to_string(),
                request_timeout_ms: Some(5_000),
            },
            session(),
            Arc::new(RecordingNavigator::default()),
        )
        .unwrap();
        let charts = MemoryCharts::failing_on(vec![Metric::Co2]);
        let mut cycle = RefreshCycle::new(Arc::new(client), MemorySurface::default(), charts);

        let report = cycle.tick().await;

        assert_eq!(report.outcome.failure_kind(), Some(FailureKind::Render));
        assert_eq!(cycle.surface().readings[&Metric::Co2], "413");
        assert_eq!(cycle.surface().alert_count, Some(3));
        assert_eq!(cycle.surface().presents, 1);
    }

    #[tokio::test]
    async fn test_schedule_survives_transport_failures() {
        let base = closed_port_url().await;
        let cycle = cycle(&base, session(), Arc::new(RecordingNavigator::default()));

        let handle = cycle.spawn(Duration::from_millis(20));
        let mut reports = handle.subscribe();

        for expected in 1..=3 {
            let report = reports.recv().await.unwrap();
            assert_eq!(report.tick, expected);
            assert_eq!(report.outcome.failure_kind(), Some(FailureKind::Transport));
        }
        assert!(!handle.is_finished());

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_unanswered_request_does_not_stall_schedule() {
        async fn never_answers() -> &'static str {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            "{}"
        }

        let base = spawn_backend(
            Router::new().route("/api/measurements/dashboard/:node", get(never_answers)),
        )
        .await;
        let client = ApiClient::new(
            ClientConfig {
                api_base: format!("{}/api", base),
                login_url: "/login".to_string(),
                request_timeout_ms: None,
            },
            session(),
            Arc::new(RecordingNavigator::default()),
        )
        .unwrap();
        let cycle = RefreshCycle::new(Arc::new(client), MemorySurface::default(), MemoryCharts::default());

        let handle = cycle.spawn(Duration::from_millis(50));
        let mut reports = handle.subscribe();

        for expected in 1..=3 {
            let report = tokio::time::timeout(Duration::from_secs(5), reports.recv())
                .await
                .expect("schedule stalled")
                .unwrap();
            assert_eq!(report.tick, expected);
            assert_eq!(report.outcome.failure_kind(), Some(FailureKind::Timeout));
        }

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_unusable_token_is_session_failure() {
        let base = spawn_backend(scripted(vec![ok(full_snapshot())])).await;
        let store = Arc::new(
            MemorySessionStore::new()
                .with_token("bad\ntoken")
                .with_user(json!({"id": 1, "nodo_id": 7})),
        );
        let mut cycle = cycle(&base, store, Arc::new(RecordingNavigator::default()));

        let report = cycle.tick().await;
        assert_eq!(report.outcome.failure_kind(), Some(FailureKind::Session));
        assert_eq!(FailureKind::Session.to_string(), "session");
    }

    #[tokio::test(start_paused = true)]
    async fn test_schedule_fires_every_period_despite_failures() {
        let base = closed_port_url().await;
        let store = Arc::new(MemorySessionStore::new().with_user(json!("garbage")));
        let cycle = cycle(&base, store, Arc::new(RecordingNavigator::default()));

        let started = tokio::time::Instant::now();
        let handle = cycle.spawn(Duration::from_secs(30));
        let mut reports = handle.subscribe();

        let first = reports.recv().await.unwrap();
        assert_eq!(first.outcome.failure_kind(), Some(FailureKind::Session));
        assert!(started.elapsed() < Duration::from_secs(1));

        let mut last = first;
        for _ in 0..3 {
            last = reports.recv().await.unwrap();
            assert_eq!(last.outcome.failure_kind(), Some(FailureKind::Session));
        }
        assert_eq!(last.tick, 4);
        assert!(started.elapsed() >= Duration::from_secs(90));

        handle.shutdown().await.unwrap();
        assert!(reports.recv().await.is_err());
    }

    #[tokio::test]
    async fn test_render_can_be_driven_without_network() {
        let base = closed_port_url().await;
        let mut cycle = cycle(&base, session(), Arc::new(RecordingNavigator::default()));

        let snapshot: DashboardSnapshot = serde_json::from_value(full_snapshot()).unwrap();
        let outcome = cycle.render(&snapshot).unwrap();

        assert_eq!(
            outcome,
            TickOutcome::Rendered {
                readings_updated: true,
                alert_count: 3,
                chart_points: 2
            }
        );
    }
}
