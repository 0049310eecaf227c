mod app;
mod config;
mod constants;
mod error;
mod guard;
mod history;
mod interpolate;
mod logging;
mod network;
mod scheduler;
mod types;
mod ui;
mod util;

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use clap::Parser;

use crate::app::Dashboard;
use crate::config::{Cli, Config};
use crate::error::Result;
use crate::network::BackendClient;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_cli(Cli::parse())?;
    logging::init_logging(config.log_file.as_deref())?;
    tracing::info!(
        signatures = %config.signatures_url,
        plot = %config.plot_url,
        target = config.target,
        "starting petition monitor"
    );

    let client = BackendClient::new(&config)?;

    // SIGINT from outside the raw-mode terminal still has to restore it
    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&shutdown);
    if let Err(err) = ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed)) {
        tracing::warn!(error = %err, "could not install SIGINT handler");
    }

    // Install panic hook to restore terminal
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = crossterm::terminal::disable_raw_mode();
        let _ = crossterm::execute!(std::io::stdout(), crossterm::terminal::LeaveAlternateScreen);
        original_hook(panic_info);
    }));

    let res = ui::run(Dashboard::new(config.target), client, shutdown).await;
    if let Err(err) = &res {
        tracing::error!(error = %err, "dashboard exited with error");
    }
    res
}
