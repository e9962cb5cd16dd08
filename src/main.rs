// src/main.rs
mod cache;
mod cli;
mod config;
mod directory;
mod error;
mod ledger;
mod models;
mod notice;
mod session;
mod store;

use anyhow::Context;
use clap::Parser;

fn main() -> anyhow::Result<()> {
    env_logger::init();
    log::info!("Starting luxe-vault");

    let cli_args = cli::Cli::parse();

    if let Err(e) = cli::handle_cli_command(cli_args) {
        // Rejections were already shown to the user as a notice.
        log::error!("Command failed: {:#?}", e);
        if let error::AppError::Directory(_) = e {
            std::process::exit(1);
        }
        return Err(e).context("luxe-vault command failed");
    }

    log::info!("luxe-vault finished successfully.");
    Ok(())
}
