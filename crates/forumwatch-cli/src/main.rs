mod admin;
mod query;

use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use forumwatch_core::{AppConfig, MonitorFile};
use forumwatch_db::{Ledger, PoolConfig};
use forumwatch_monitor::Monitor;
use forumwatch_notify::{LogNotifier, Notifier, SlackNotifier};
use forumwatch_sources::SourceRegistry;

use crate::admin::{KeywordCommands, SourceCommands};

#[derive(Debug, Parser)]
#[command(name = "forumwatch")]
#[command(about = "Forum governance monitor")]
struct Cli {
    /// Log alerts instead of posting them to Slack; nothing is recorded as notified
    #[arg(long, global = true)]
    dry_run: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Poll every active source until interrupted (the default)
    Run,
    /// Run a single monitoring cycle and exit
    Once,
    /// Send a test notification
    Test,
    /// Scan past topics into the history ledger
    Scan {
        /// How many days back to scan
        #[arg(long, default_value_t = 7)]
        days: u64,

        /// Score only this pattern (backfill for a new keyword)
        #[arg(long, requires = "group")]
        keyword: Option<String>,

        /// Group the backfill keyword is reported under
        #[arg(long, requires = "keyword")]
        group: Option<String>,
    },
    /// Show ledger counts
    Stats,
    /// Manage keywords
    Keywords {
        #[command(subcommand)]
        command: KeywordCommands,
    },
    /// Manage sources
    Sources {
        #[command(subcommand)]
        command: SourceCommands,
    },
}

impl Commands {
    /// Whether the command can send notifications. Administration and
    /// reporting run without a webhook.
    fn delivers(&self) -> bool {
        matches!(
            self,
            Commands::Run | Commands::Once | Commands::Test | Commands::Scan { .. }
        )
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();
    let config = forumwatch_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let file = load_monitor_file(&config)?;
    let pool_config = PoolConfig::from_app_config(&config);
    let history_path = file.history_database_path.clone();
    let command = cli.command.unwrap_or(Commands::Run);
    let deliver = !cli.dry_run && command.delivers();
    let monitor = build_monitor(file, pool_config, deliver)
        .await?
        .with_dry_run(cli.dry_run);

    match command {
        Commands::Run => {
            let cancel = CancellationToken::new();
            tokio::spawn(shutdown_signal(cancel.clone()));
            monitor.run(cancel).await?;
        }
        Commands::Once => {
            let report = monitor.run_cycle().await?;
            query::print_report(&report);
        }
        Commands::Test => {
            let receipt = monitor.send_test().await?;
            println!("test notification sent ({receipt})");
        }
        Commands::Scan {
            days,
            keyword,
            group,
        } => {
            let history = Ledger::open(&history_path, pool_config).await?;
            let backfill = group.as_deref().zip(keyword.as_deref());
            let report = monitor.scan_history(days, backfill, &history).await?;
            query::print_report(&report);
        }
        Commands::Stats => query::run_stats(&monitor).await?,
        Commands::Keywords { command } => admin::run_keywords(&monitor, command).await?,
        Commands::Sources { command } => admin::run_sources(&monitor, command).await?,
    }

    Ok(())
}

/// Reads the monitor file and applies the environment overrides.
fn load_monitor_file(config: &AppConfig) -> anyhow::Result<MonitorFile> {
    let mut file = forumwatch_core::load_monitor_file(&config.config_path)?;
    if let Some(path) = &config.database_path {
        file.database_path.clone_from(path);
    }
    if let Some(url) = &config.slack_webhook_url {
        file.slack.webhook_url = Some(url.clone());
    }
    tracing::debug!(path = %config.config_path.display(), sources = file.sources.len(), "monitor file loaded");
    Ok(file)
}

async fn build_monitor(
    file: MonitorFile,
    pool_config: PoolConfig,
    deliver: bool,
) -> anyhow::Result<Monitor> {
    let ledger = Ledger::open(&file.database_path, pool_config).await?;
    let notifier: Arc<dyn Notifier> = if deliver {
        let timeout = Duration::from_secs(file.monitoring.timeout_secs);
        Arc::new(SlackNotifier::new(&file.slack, timeout)?)
    } else {
        tracing::debug!("alerts are logged, not delivered");
        Arc::new(LogNotifier)
    };
    Ok(Monitor::new(file, ledger, notifier, SourceRegistry::default())?)
}

async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, stopping after the current cycle");
    cancel.cancel();
}

#[cfg(test)]
mod tests;
