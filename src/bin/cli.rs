//! Nodewatch CLI
//!
//! Command-line interface for one-off operations:
//! - Refresh the dashboard once
//! - Show historical statistics
//! - Inspect or refresh the stored profile
//! - Resolve an alert
//! - Store a token or sign out

use clap::{Parser, Subcommand};
use nodewatch::config::{generate_default_config, init_logging, Config};
use nodewatch::*;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "nodewatch-cli")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Monitor a sensor node's readings, charts and alerts")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: standard locations)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// API base URL (overrides config)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Session file (overrides config)
    #[arg(long, global = true)]
    pub session_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Refresh the dashboard once and print it
    Once,

    /// Show statistics for the signed-in user's node
    History {
        /// Period (day, week, month)
        #[arg(short, long, default_value = "day")]
        period: String,
    },

    /// Show the current user as seen by the backend
    Whoami {
        /// Store the returned profile as the session profile
        #[arg(long)]
        save: bool,
    },

    /// Change the status of an alert
    ResolveAlert {
        /// Alert ID
        id: i64,
        /// New status
        #[arg(short, long, default_value = "Resuelta")]
        status: String,
    },

    /// Store a bearer token obtained elsewhere
    Token {
        /// Bearer token
        token: String,
    },

    /// Remove the stored token
    Logout,

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };
    if let Some(url) = cli.api_url {
        config.api.base_url = url;
    }
    if let Some(file) = cli.session_file {
        config.session.file = file.to_string_lossy().to_string();
    }
    init_logging(&config.logging);

    let session = Arc::new(FileSessionStore::new(&config.session.file));
    let client = Arc::new(ApiClient::new(
        config.api.client_config(),
        session.clone(),
        Arc::new(ConsoleNavigator),
    )?);

    match cli.command {
        Commands::Once => {
            let mut cycle = RefreshCycle::new(
                client,
                TerminalSurface::stdout("Node dashboard"),
                TerminalCharts::stdout(),
            );
            let report = cycle.tick().await;
            if let TickOutcome::Failed { kind, message } = report.outcome {
                anyhow::bail!("Refresh failed ({}): {}", kind, message);
            }
        }

        Commands::History { period } => {
            let period: Period = period.parse()?;
            let node = session.node_id()?;
            let report = HistoryClient::new(client).fetch(&node, period).await?;

            println!("Node {} - last {} ({} measurements)", node, period, report.statistics.count);
            for line in report.summary_lines() {
                println!("  {}", line);
            }
        }

        Commands::Whoami { save } => {
            #[derive(serde::Deserialize)]
            struct MeResponse {
                user: UserProfile,
            }

            let me: MeResponse = client.get_json("/auth/me").await?;
            println!("{}", serde_json::to_string_pretty(&me.user)?);

            if save {
                session.save_profile(&me.user)?;
                match me.user.node_id() {
                    Ok(node) => println!("Profile saved (node {})", node),
                    Err(e) => println!("Profile saved, but {}", e),
                }
            }
        }

        Commands::ResolveAlert { id, status } => {
            let endpoint = format!("/alerts/{}/status", id);
            let body: serde_json::Value = client
                .send_json(&endpoint, RequestOptions::put(json!({ "estado": status })))
                .await?;
            println!("{}", serde_json::to_string_pretty(&body)?);
        }

        Commands::Token { token } => {
            session.set_token(token.trim())?;
            println!("Token stored in {}", session.path().display());
        }

        Commands::Logout => {
            session.clear_token()?;
            println!("Signed out ({})", session.path().display());
        }

        Commands::Config { output } => {
            let content = generate_default_config();
            match output {
                Some(path) => {
                    std::fs::write(&path, content)?;
                    println!("Config written to {}", path.display());
                }
                None => print!("{}", content),
            }
        }
    }

    Ok(())
}
