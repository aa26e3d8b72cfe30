//! bankfront - a terminal front-end for the bank API.
//!
//! Each subcommand is one view of the front-end. All API calls share one
//! session: the credential is attached to every request and a 401 from any
//! call signs the user out and sends them back to the login view.

mod app;
mod cli;

use std::io;
use std::path::Path;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use app::App;
use bankfront_core::Config;
use cli::Cli;

/// Log file name prefix inside the cache directory
const LOG_FILE_PREFIX: &str = "bankfront.log";

/// Initialize the tracing subscriber for logging.
/// `RUST_LOG` wins over `-v`; the file layer is skipped if there is no cache dir.
fn init_tracing(verbose: u8, log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_ansi(false).with_writer(writer)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();
    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let config = Config::load()?;
    let log_dir = config
        .cache_dir()
        .ok()
        .filter(|dir| std::fs::create_dir_all(dir).is_ok());
    let _guard = init_tracing(cli.verbose, log_dir.as_deref());
    info!(api = %config.api_base_url(), "bankfront starting");

    let mut app = App::new(config, cli.ephemeral)?;
    let result = app.run(cli.command).await;
    app.report(&result);

    result
}
