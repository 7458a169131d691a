mod actor_framework;
mod app_system;
mod clients;
mod commands;
mod domain;
mod order_actor;
mod product_actor;
mod remote;
mod validation;
mod view;

#[cfg(test)]
mod mock_framework;

use crate::actor_framework::IdStrategy;
use crate::app_system::{setup_tracing, AdminConfig, PartialFailurePolicy};
use crate::commands::Command;
use clap::Parser;

/// Manage products and orders held by the inventory REST service.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    #[clap(subcommand)]
    command: Command,
    /// Overrides INVENTORY_API_BASE_URL.
    #[clap(short = 'u', long)]
    base_url: Option<String>,
    /// `compensate` or `report`; overrides INVENTORY_PARTIAL_FAILURE.
    #[clap(long)]
    partial_failure: Option<PartialFailurePolicy>,
    /// `sequential` or `timestamp`; overrides INVENTORY_ID_STRATEGY.
    #[clap(long)]
    id_strategy: Option<IdStrategy>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    setup_tracing();
    let args = Args::parse();

    let mut config = AdminConfig::from_env();
    if let Some(base_url) = args.base_url {
        config.base_url = base_url;
    }
    if let Some(policy) = args.partial_failure {
        config.partial_failure = policy;
    }
    if let Some(strategy) = args.id_strategy {
        config.id_strategy = strategy;
    }

    match args.command {
        Command::Products(cmd) => commands::products(&config, cmd).await,
        Command::Orders(cmd) => commands::orders(&config, cmd).await,
        Command::Demo => commands::demo(&config).await,
    }
}
