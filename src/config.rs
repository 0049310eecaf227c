use std::path::PathBuf;

use clap::Parser;
use reqwest::Url;

use crate::constants::DEFAULT_TARGET;
use crate::error::{AppError, Result};

/// Live terminal dashboard for a petition's signature count
#[derive(Parser, Debug)]
#[command(name = "petition_monitor")]
#[command(version, about = "Live terminal dashboard for a petition's signature count")]
pub struct Cli {
    /// Base URL of the signature backend
    #[arg(long, default_value = "http://127.0.0.1:5000")]
    pub server: String,

    /// Endpoint returning the latest count and rates
    #[arg(long, default_value = "/api/signatures")]
    pub signatures_path: String,

    /// Endpoint returning the chart series
    #[arg(long, default_value = "/api/plot")]
    pub plot_path: String,

    /// Signature goal used for the progress bar
    #[arg(long, default_value_t = DEFAULT_TARGET)]
    pub target: u64,

    /// Write logs to this file (logs are discarded otherwise)
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub signatures_url: Url,
    pub plot_url: Url,
    pub target: u64,
    pub log_file: Option<PathBuf>,
}

impl Config {
    pub fn from_cli(cli: Cli) -> Result<Self> {
        let base = Url::parse(&cli.server)
            .map_err(|e| AppError::config(format!("--server '{}': {e}", cli.server)))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(AppError::config(format!(
                "--server must be http or https, got '{}'",
                base.scheme()
            )));
        }
        if cli.target == 0 {
            return Err(AppError::config("--target must be greater than zero"));
        }

        Ok(Self {
            signatures_url: endpoint(&base, &cli.signatures_path)?,
            plot_url: endpoint(&base, &cli.plot_path)?,
            target: cli.target,
            log_file: cli.log_file,
        })
    }
}

fn endpoint(base: &Url, path: &str) -> Result<Url> {
    if !path.starts_with('/') {
        return Err(AppError::config(format!("endpoint path '{path}' must start with '/'")));
    }
    // Url::join would drop a path prefix on the base, so splice by hand.
    let joined = format!("{}{}", base.as_str().trim_end_matches('/'), path);
    Url::parse(&joined).map_err(|e| AppError::config(format!("endpoint '{joined}': {e}")))
}
