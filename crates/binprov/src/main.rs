use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::App;
use crate::cmd::Ctx;
use crate::config::Settings;

mod cli;
mod cmd;
mod config;
mod table;

fn main() -> Result<()> {
    let app = App::parse();

    let settings = Settings::load(app.config.as_deref()).context("failed to read binprov config")?;
    init_tracing(app.verbose, &settings.log_level);
    tracing::debug!(?settings, "settings loaded");

    Ctx {
        settings,
        json: app.json,
    }
    .run(app.cmd)
}

/// `RUST_LOG` wins unless `-v` was given.
fn init_tracing(verbose: u8, default_level: &str) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
