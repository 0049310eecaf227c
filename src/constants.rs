use std::time::Duration;

pub const TICK_RATE_MS: u64 = 1000; // interpolation tick
pub const MAX_SAMPLES: usize = 60;
pub const DEFAULT_TARGET: u64 = 1_000_000;

// Server refreshes its cache every 30s; we aim just after each refresh.
pub const FETCH_CADENCE_SECS: f64 = 30.0;
pub const MIN_FETCH_DELAY_SECS: f64 = 1.0;
pub const WATCHDOG_TIMEOUT_SECS: f64 = 40.0;
pub const WATCHDOG_RECHECK_SECS: f64 = 1.0;
pub const RETRY_DELAY: Duration = Duration::from_millis(5000);

pub const ERROR_LOADING_DATA: &str = "Error loading data";
pub const ERROR_LOADING_PLOT: &str = "Error loading plot";
pub const CANNOT_ESTIMATE: &str = "Cannot estimate (rate too low)";
