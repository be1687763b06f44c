#[macro_use]
mod macros;

mod app_system;
mod catalog_actor;
mod config;
mod dashboard;
mod domain;
mod error;
mod messages;
mod order_actor;
mod session_actor;
mod telegram;

#[cfg(test)]
mod mock_framework;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::app_system::{setup_tracing, ShopSystem};
use crate::config::AppConfig;
use crate::error::AppError;
use crate::order_actor::OrderLedger;
use crate::telegram::{run_poller, TelegramClient};

/// Medicine search and ordering bot with an order-status dashboard.
#[derive(Debug, Parser)]
#[command(name = "medisearch", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the Telegram bot and the dashboard (the default).
    Serve,
    /// Assign random stock levels to every entry of a catalog file.
    Restock {
        file: PathBuf,
        #[arg(long, default_value_t = 0)]
        min: u32,
        #[arg(long, default_value_t = 25)]
        max: u32,
    },
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    setup_tracing();
    let cli = Cli::parse();

    let result = match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve().await,
        Command::Restock { file, min, max } => restock(file, min, max),
    };

    if let Err(e) = &result {
        error!(error = %e, "Fatal error");
    }
    result
}

fn restock(file: PathBuf, min: u32, max: u32) -> Result<(), AppError> {
    let updated = catalog_actor::restock_file(&file, min, max)?;
    info!(file = %file.display(), entries = updated, min, max, "Catalog restocked");
    Ok(())
}

async fn serve() -> Result<(), AppError> {
    let config = AppConfig::load()?;
    info!(config = ?config, "Configuration loaded");

    let token = config.bot_token()?;
    let dashboard_addr = config.dashboard_socket_addr()?;
    let telegram = TelegramClient::new(&config.telegram_api_url, token, config.poll_timeout_secs)?;

    let ledger = OrderLedger::new(&config.orders_path);
    ledger.ensure_exists()?;
    ledger.migrate()?;

    let system = ShopSystem::new(&config);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let poller = tokio::spawn(run_poller(
        telegram,
        system.session_registry.clone(),
        shutdown_rx.clone(),
    ));
    let mut dashboard = tokio::spawn(dashboard::serve(dashboard_addr, ledger, shutdown_rx));

    info!("MediSearch running, press Ctrl-C to stop");
    let dashboard_result = tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                warn!(error = %e, "Could not listen for Ctrl-C, shutting down");
            }
            info!("Shutdown requested");
            let _ = shutdown_tx.send(true);
            flatten((&mut dashboard).await)
        }
        joined = &mut dashboard => {
            error!("Dashboard exited early, shutting down");
            let _ = shutdown_tx.send(true);
            flatten(joined)
        }
    };

    if let Err(e) = poller.await {
        error!(error = ?e, "Poller task failed");
    }
    if let Err(e) = system.shutdown().await {
        error!(error = %e, "Shutdown error");
    }
    dashboard_result
}

fn flatten(joined: Result<Result<(), AppError>, tokio::task::JoinError>) -> Result<(), AppError> {
    joined.unwrap_or_else(|e| {
        error!(error = ?e, "Dashboard task failed");
        Ok(())
    })
}
