use std::time::Duration;

use crate::constants::{
    CANNOT_ESTIMATE, ERROR_LOADING_DATA, ERROR_LOADING_PLOT, RETRY_DELAY, WATCHDOG_RECHECK_SECS,
    WATCHDOG_TIMEOUT_SECS,
};
use crate::error::{AppError, Result};
use crate::guard::{FetchGuard, InitLatch};
use crate::history::{Sample, SampleHistory};
use crate::interpolate::{
    format_time_ago, interpolated_count, last_updated_text, progress_percentage, splice_time_ago,
};
use crate::scheduler::{next_fetch_delay, TimerKind, Timers};
use crate::types::{PlotSeries, SignatureReport};
use crate::util::{format_clock, format_completion, format_percentage, format_rate, format_thousands};

/// Request the event loop should start on the dashboard's behalf
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    FetchSample,
    FetchPlot,
}

/// Backend-supplied rates, latest only
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RateEstimate {
    pub per_minute: f64,
    pub per_hour: f64,
}

/// Text for every panel, rebuilt on each sample and each tick
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayState {
    pub count: String,
    pub per_minute: String,
    pub per_hour: String,
    pub completion: String,
    /// Bar fill, 0..=100
    pub progress: f64,
    pub progress_text: String,
    pub last_updated: String,
}

impl Default for DisplayState {
    fn default() -> Self {
        Self {
            count: "Loading...".to_string(),
            per_minute: "-".to_string(),
            per_hour: "-".to_string(),
            completion: "-".to_string(),
            progress: 0.0,
            progress_text: format_percentage(0.0),
            last_updated: "Waiting for data...".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum ChartState {
    #[default]
    Empty,
    Ready(PlotSeries),
    /// The last good series, if any, stays on screen under the error
    Failed {
        message: String,
        previous: Option<PlotSeries>,
    },
}

/// All session state. Owned by the event loop and handed to every handler
/// by `&mut`, so handlers never interleave.
pub struct Dashboard {
    target: u64,
    history: SampleHistory,
    rates: RateEstimate,
    sample_guard: FetchGuard,
    plot_guard: FetchGuard,
    sample_failing: bool,
    timers: Timers,
    init: InitLatch,
    pub display: DisplayState,
    pub chart: ChartState,
}

impl Dashboard {
    pub fn new(target: u64) -> Self {
        Self {
            target,
            history: SampleHistory::default(),
            rates: RateEstimate::default(),
            sample_guard: FetchGuard::default(),
            plot_guard: FetchGuard::default(),
            sample_failing: false,
            timers: Timers::default(),
            init: InitLatch::default(),
            display: DisplayState::default(),
            chart: ChartState::default(),
        }
    }

    /// First sample fetch and first plot fetch. Only the first call does anything.
    pub fn start(&mut self) -> Vec<Command> {
        if !self.init.try_fire() {
            tracing::warn!("dashboard already started, ignoring");
            return Vec::new();
        }
        [self.request_sample_fetch("startup"), self.request_plot_fetch()]
            .into_iter()
            .flatten()
            .collect()
    }

    pub fn request_sample_fetch(&mut self, reason: &str) -> Option<Command> {
        if !self.sample_guard.try_begin() {
            tracing::debug!(reason, "sample fetch already in progress, skipping");
            return None;
        }
        tracing::debug!(reason, "fetching signature data");
        Some(Command::FetchSample)
    }

    pub fn request_plot_fetch(&mut self) -> Option<Command> {
        if !self.plot_guard.try_begin() {
            tracing::debug!("plot fetch already in progress, skipping");
            return None;
        }
        Some(Command::FetchPlot)
    }

    pub fn on_sample_result(&mut self, now: f64, result: Result<SignatureReport>) -> Vec<Command> {
        self.sample_guard.finish();
        match result {
            Ok(report) => {
                self.apply_report(&report);
                self.sample_failing = false;
                self.timers.cancel(TimerKind::Retry);

                let delay = next_fetch_delay(now, report.server_fetch_time());
                self.timers.arm(TimerKind::ScheduledFetch, now, delay);
                self.timers
                    .arm(TimerKind::Watchdog, now, Duration::from_secs_f64(WATCHDOG_TIMEOUT_SECS));
                tracing::info!(
                    count = report.count,
                    "Data updated at {}, next data fetch in {:.1}s",
                    format_clock(report.timestamp),
                    delay.as_secs_f64()
                );

                self.request_plot_fetch().into_iter().collect()
            }
            Err(err) => {
                self.on_sample_error(now, &err);
                Vec::new()
            }
        }
    }

    fn apply_report(&mut self, report: &SignatureReport) {
        self.history.push(Sample {
            count: report.count,
            timestamp: report.server_fetch_time(),
        });
        self.rates = RateEstimate {
            per_minute: report.per_minute_rate,
            per_hour: report.per_hour_rate,
        };

        // the backend's own percentage is relative to its goal, not ours
        let progress = progress_percentage(report.count, self.target);
        self.display = DisplayState {
            count: format_thousands(report.count),
            per_minute: format_rate(report.per_minute_rate),
            per_hour: format_rate(report.per_hour_rate),
            completion: report
                .estimated_completion_date
                .as_deref()
                .map_or_else(|| CANNOT_ESTIMATE.to_string(), format_completion),
            progress,
            progress_text: format_percentage(progress),
            last_updated: last_updated_text(&format_clock(report.timestamp)),
        };
    }

    fn on_sample_error(&mut self, now: f64, err: &AppError) {
        tracing::error!(error = %err, "Error fetching signature data");
        self.sample_failing = true;
        self.display.count = ERROR_LOADING_DATA.to_string();
        self.timers.arm(TimerKind::Retry, now, RETRY_DELAY);
        tracing::info!("retrying in {}ms", RETRY_DELAY.as_millis());
    }

    pub fn on_plot_result(&mut self, result: Result<PlotSeries>) {
        self.plot_guard.finish();
        match result {
            Ok(series) => self.chart = ChartState::Ready(series),
            Err(err) => {
                tracing::error!(error = %err, "Error fetching plot data");
                let previous = match std::mem::take(&mut self.chart) {
                    ChartState::Ready(series) => Some(series),
                    ChartState::Failed { previous, .. } => previous,
                    ChartState::Empty => None,
                };
                self.chart = ChartState::Failed {
                    message: format!("{ERROR_LOADING_PLOT}: {err}"),
                    previous,
                };
            }
        }
    }

    /// Interpolation tick: projects the count forward, never fetches.
    pub fn on_tick(&mut self, now: f64) {
        let Some(latest) = self.history.latest() else {
            return;
        };
        let elapsed = now - latest.timestamp;
        let shown = interpolated_count(latest, self.rates.per_minute, elapsed);
        let progress = progress_percentage(shown, self.target);

        // a failed fetch keeps its message in the count panel until the next success
        if !self.sample_failing {
            self.display.count = format_thousands(shown);
        }
        self.display.progress = progress;
        self.display.progress_text = format_percentage(progress);
        self.display.last_updated = splice_time_ago(&self.display.last_updated, &format_time_ago(elapsed));
    }

    /// Fires every expired timer and returns the fetches they ask for.
    pub fn fire_due_timers(&mut self, now: f64) -> Vec<Command> {
        let mut commands = Vec::new();
        for timer in self.timers.take_due(now) {
            tracing::debug!(kind = %timer.kind, "timer fired");
            match timer.kind {
                TimerKind::ScheduledFetch => {
                    if self.sample_guard.is_in_flight() {
                        let delay = next_fetch_delay(now, self.last_server_fetch_time().unwrap_or(now));
                        tracing::debug!("fetch in progress, rescheduling in {:.1}s", delay.as_secs_f64());
                        self.timers.arm(TimerKind::ScheduledFetch, now, delay);
                    } else {
                        commands.extend(self.request_sample_fetch("schedule"));
                    }
                }
                TimerKind::Watchdog => {
                    if self.sample_guard.is_in_flight() {
                        self.timers
                            .arm(TimerKind::Watchdog, now, Duration::from_secs_f64(WATCHDOG_RECHECK_SECS));
                    } else {
                        tracing::info!("no update for {WATCHDOG_TIMEOUT_SECS}s, forcing refresh");
                        commands.extend(self.request_sample_fetch("watchdog"));
                    }
                }
                TimerKind::Retry => commands.extend(self.request_sample_fetch("retry")),
            }
        }
        commands
    }

    /// Server-side fetch time of the newest sample
    pub fn last_server_fetch_time(&self) -> Option<f64> {
        self.history.latest().map(|s| s.timestamp)
    }

    pub fn next_deadline(&self) -> Option<f64> {
        self.timers.next_deadline()
    }

    pub fn history(&self) -> &SampleHistory {
        &self.history
    }

    #[cfg(test)]
    pub fn rates(&self) -> RateEstimate {
        self.rates
    }

    pub fn target(&self) -> u64 {
        self.target
    }

    #[cfg(test)]
    pub fn timers(&self) -> &Timers {
        &self.timers
    }

    pub fn sample_in_flight(&self) -> bool {
        self.sample_guard.is_in_flight()
    }

    pub fn plot_in_flight(&self) -> bool {
        self.plot_guard.is_in_flight()
    }
}
