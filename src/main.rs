//! Nodewatch Monitor
//!
//! Runs the node dashboard in the terminal until Ctrl-C.

use nodewatch::config::{init_logging, Config};
use nodewatch::*;
use std::path::PathBuf;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = match std::env::args().nth(1).map(PathBuf::from) {
        Some(path) => Config::load_with_env(&path)?,
        None => Config::load_default(),
    };
    init_logging(&config.logging);

    tracing::info!("Nodewatch monitor v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("API base: {}", config.api.base_url);
    tracing::info!("Session file: {}", config.session.file);

    let session = Arc::new(FileSessionStore::new(&config.session.file));
    let client = Arc::new(ApiClient::new(
        config.api.client_config(),
        session.clone(),
        Arc::new(ConsoleNavigator),
    )?);

    let title = match session.node_id() {
        Ok(node) => format!("Node {}", node),
        Err(e) => {
            tracing::warn!("No node available yet: {}", e);
            "Node dashboard".to_string()
        }
    };

    let cycle = RefreshCycle::new(
        client,
        TerminalSurface::stdout(title),
        TerminalCharts::stdout(),
    );
    let handle = cycle.spawn(config.refresh.interval());

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down...");
    handle.shutdown().await?;

    tracing::info!("Nodewatch shutdown complete");
    Ok(())
}
