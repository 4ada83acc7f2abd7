mod api_client;
mod bot;
mod config;
mod error;
mod handlers;
mod utils;

use anyhow::Result;
use std::env;
use teloxide::prelude::*;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // .env first, so RUST_LOG can live there too
    dotenvy::dotenv().ok();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("debug,hyper=info,reqwest=info"));
    tracing_subscriber::fmt()
        .with_writer(std::io::stdout)
        .with_ansi(false)
        .with_env_filter(filter)
        .init();

    let config = match config::load_or_exit_code(|name| env::var(name).ok()) {
        Ok(config) => config,
        Err(code) => std::process::exit(code),
    };

    info!("Starting homework status bot...");

    let bot = Bot::new(&config.telegram_token);
    bot::start_bot(bot, config).await?;

    Ok(())
}
