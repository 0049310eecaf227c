use std::{
    io,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use crossterm::{
    event::{Event, EventStream, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures::StreamExt;
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{
        canvas::{Canvas, Line as CanvasLine},
        Block, BorderType, Borders, Gauge, Paragraph,
    },
    Frame, Terminal,
};
use tokio::sync::mpsc::{self, UnboundedSender};

use crate::app::{ChartState, Command, Dashboard};
use crate::constants::TICK_RATE_MS;
use crate::error::Result;
use crate::network::BackendClient;
use crate::types::{PlotSeries, SignatureReport};
use crate::util::{format_thousands, unix_now};

const IDLE_WAKE: Duration = Duration::from_secs(3600);
const MIN_CHART_HEIGHT: u16 = 6;

/// Result of a spawned request, delivered back to the loop that owns the dashboard
enum FetchOutcome {
    Sample(Result<SignatureReport>),
    Plot(Result<PlotSeries>),
}

pub async fn run(dashboard: Dashboard, client: BackendClient, shutdown: Arc<AtomicBool>) -> Result<()> {
    // Initialize terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app_loop(&mut terminal, dashboard, client, shutdown).await;

    // Cleanup
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res
}

async fn run_app_loop<B: Backend>(
    terminal: &mut Terminal<B>,
    mut dash: Dashboard,
    client: BackendClient,
    shutdown: Arc<AtomicBool>,
) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut tick = tokio::time::interval(Duration::from_millis(TICK_RATE_MS));
    let mut events = EventStream::new();

    dispatch(dash.start(), &client, &tx);

    loop {
        terminal.draw(|f| render(f, &dash))?;

        if shutdown.load(Ordering::Relaxed) {
            tracing::info!("interrupted, shutting down");
            return Ok(());
        }

        let wake = dash
            .next_deadline()
            .map_or(IDLE_WAKE, |deadline| wake_after(deadline, unix_now()));

        tokio::select! {
            _ = tick.tick() => {
                dash.on_tick(unix_now());
            }
            _ = tokio::time::sleep(wake) => {
                let commands = dash.fire_due_timers(unix_now());
                dispatch(commands, &client, &tx);
            }
            Some(outcome) = rx.recv() => match outcome {
                FetchOutcome::Sample(result) => {
                    let commands = dash.on_sample_result(unix_now(), result);
                    dispatch(commands, &client, &tx);
                }
                FetchOutcome::Plot(result) => dash.on_plot_result(result),
            },
            event = events.next() => match event {
                Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                    KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return Ok(()),
                    KeyCode::Char('r') => dispatch(dash.request_sample_fetch("manual"), &client, &tx),
                    _ => {}
                },
                Some(Ok(_)) => {}
                Some(Err(err)) => return Err(err.into()),
                None => return Ok(()),
            },
        }
    }
}

/// Time to sleep until `deadline`, bounded to `0..=IDLE_WAKE`
fn wake_after(deadline: f64, now: f64) -> Duration {
    let secs = (deadline - now).min(IDLE_WAKE.as_secs_f64()).max(0.0);
    Duration::try_from_secs_f64(secs).unwrap_or(IDLE_WAKE)
}

/// Starts each requested fetch as its own task; results come back over `tx`.
fn dispatch(
    commands: impl IntoIterator<Item = Command>,
    client: &BackendClient,
    tx: &UnboundedSender<FetchOutcome>,
) {
    for command in commands {
        let client = client.clone();
        let tx = tx.clone();
        tokio::spawn(async move {
            let outcome = match command {
                Command::FetchSample => FetchOutcome::Sample(client.fetch_signatures().await),
                Command::FetchPlot => FetchOutcome::Plot(client.fetch_plot().await),
            };
            // receiver only goes away on shutdown
            let _ = tx.send(outcome);
        });
    }
}

pub fn render(f: &mut Frame, dash: &Dashboard) {
    // ============= whole screen layout ============
    let main_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4), // Stats Box
            Constraint::Length(3), // Progress Bar
            Constraint::Min(0),    // Chart
            Constraint::Length(1), // Bottom Status Bar
        ])
        .split(f.size());

    render_stats(f, dash, main_chunks[0]);
    render_progress(f, dash, main_chunks[1]);
    // small terminals simply go without the chart
    if main_chunks[2].height >= MIN_CHART_HEIGHT {
        render_chart(f, &dash.chart, main_chunks[2]);
    }
    render_status_bar(f, dash, main_chunks[3]);
}

fn render_stats(f: &mut Frame, dash: &Dashboard, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Petition Monitor ")
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(Color::Cyan));
    f.render_widget(block.clone(), area);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(25),
            Constraint::Percentage(20),
            Constraint::Percentage(20),
            Constraint::Percentage(35),
        ])
        .split(block.inner(area));

    let count_color = if dash.display.count.starts_with("Error") { Color::Red } else { Color::White };
    let fields = [
        ("Signatures", dash.display.count.as_str(), count_color),
        ("Per minute", dash.display.per_minute.as_str(), Color::Green),
        ("Per hour", dash.display.per_hour.as_str(), Color::Green),
        ("Reaching the goal", dash.display.completion.as_str(), Color::Yellow),
    ];
    for ((label, value, color), column) in fields.into_iter().zip(columns.iter()) {
        let text = vec![
            Line::from(Span::styled(format!(" {label}"), Style::default().fg(Color::DarkGray))),
            Line::from(Span::styled(
                format!(" {value}"),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            )),
        ];
        f.render_widget(Paragraph::new(text), *column);
    }
}

fn render_progress(f: &mut Frame, dash: &Dashboard, area: Rect) {
    let gauge = Gauge::default()
        .block(
            Block::default()
                .title(format!(" Progress to {} ", format_thousands(dash.target())))
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded),
        )
        .gauge_style(Style::default().fg(Color::Blue).bg(Color::Rgb(40, 40, 40)))
        .ratio((dash.display.progress / 100.0).clamp(0.0, 1.0))
        .label(dash.display.progress_text.clone());
    f.render_widget(gauge, area);
}

fn render_chart(f: &mut Frame, chart: &ChartState, area: Rect) {
    let block = Block::default().borders(Borders::ALL).border_type(BorderType::Rounded);
    match chart {
        ChartState::Empty => {
            let placeholder = Paragraph::new(" Loading plot...")
                .style(Style::default().fg(Color::DarkGray))
                .block(block.title(" Signatures "));
            f.render_widget(placeholder, area);
        }
        ChartState::Ready(series) => {
            let title = Span::styled(format!(" {} ", series.title), Style::default().fg(Color::Cyan));
            render_series(f, series, block.title(title), area);
        }
        ChartState::Failed { message, previous: Some(series) } => {
            let title = Span::styled(format!(" {message} "), Style::default().fg(Color::Red));
            render_series(f, series, block.title(title), area);
        }
        ChartState::Failed { message, previous: None } => {
            let error = Paragraph::new(format!(" {message}"))
                .style(Style::default().fg(Color::Red))
                .block(block.title(" Signatures "));
            f.render_widget(error, area);
        }
    }
}

/// Area chart: a filled column per interval plus a line joining the tops
fn render_series(f: &mut Frame, series: &PlotSeries, block: Block, area: Rect) {
    let inner = block.inner(area);
    f.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(inner);

    let points = series.points();
    let y_max = (series.max_value() * 1.1).max(1.0);
    let x_limit = (points.len().saturating_sub(1)).max(1) as f64;

    let canvas = Canvas::default()
        .block(
            Block::default()
                .title(format!("{} (max {})", series.y_label, format_thousands(series.max_value().round() as u64)))
                .title_style(Style::default().fg(Color::DarkGray)),
        )
        .marker(Marker::Braille)
        .x_bounds([0.0, x_limit])
        .y_bounds([0.0, y_max])
        .paint(|ctx| {
            for &(x, y) in &points {
                ctx.draw(&CanvasLine {
                    x1: x,
                    y1: 0.0,
                    x2: x,
                    y2: y,
                    color: Color::Rgb(30, 70, 110),
                });
            }
            for pair in points.windows(2) {
                ctx.draw(&CanvasLine {
                    x1: pair[0].0,
                    y1: pair[0].1,
                    x2: pair[1].0,
                    y2: pair[1].1,
                    color: Color::Cyan,
                });
            }
        });
    f.render_widget(canvas, rows[0]);

    let first = series.time_labels.first().map(String::as_str).unwrap_or("");
    let last = series.time_labels.last().map(String::as_str).unwrap_or("");
    let axis = Line::from(vec![
        Span::raw(first.to_string()),
        Span::styled(format!("  {}  ", series.x_label), Style::default().fg(Color::DarkGray)),
        Span::raw(last.to_string()),
    ]);
    f.render_widget(Paragraph::new(axis), rows[1]);
}

fn render_status_bar(f: &mut Frame, dash: &Dashboard, area: Rect) {
    let activity = if dash.sample_in_flight() || dash.plot_in_flight() {
        Span::styled(" fetching ", Style::default().fg(Color::Black).bg(Color::Yellow))
    } else {
        Span::raw("")
    };
    let status = Line::from(vec![
        Span::raw(" "),
        Span::raw(dash.display.last_updated.clone()),
        Span::raw(" "),
        activity,
        Span::styled(
            if dash.history().is_empty() {
                " | no samples yet".to_string()
            } else {
                format!(" | {} samples", dash.history().len())
            },
            Style::default().fg(Color::DarkGray),
        ),
        Span::raw(" | 'r' refresh | 'q' quit"),
    ]);
    f.render_widget(
        Paragraph::new(status).style(Style::default().bg(Color::Rgb(20, 20, 20))),
        area,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use ratatui::backend::TestBackend;

    fn screen(dash: &Dashboard, width: u16, height: u16) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(|f| render(f, dash)).unwrap();
        terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    fn report() -> SignatureReport {
        SignatureReport {
            count: 500_000,
            per_minute_rate: 120.0,
            per_hour_rate: 7_200.0,
            last_fetch_time: Some(1_700_000_000.0),
            timestamp: 1_700_000_000.0,
            estimated_completion_date: None,
            progress_percentage: 50.0,
        }
    }

    fn series() -> PlotSeries {
        PlotSeries {
            time_labels: vec!["10:00:00".into(), "10:05:00".into(), "10:10:00".into()],
            new_signatures: vec![500.0, 620.0, 580.0],
            title: "New Signatures Per 5 Minutes".into(),
            x_label: "Time (5-minute intervals)".into(),
            y_label: "Signatures Per 5 Minutes".into(),
        }
    }

    #[test]
    fn renders_loaded_dashboard() {
        let mut dash = Dashboard::new(1_000_000);
        dash.start();
        dash.on_sample_result(1_700_000_005.0, Ok(report()));
        dash.on_plot_result(Ok(series()));

        let text = screen(&dash, 100, 30);
        assert!(text.contains("500,000"));
        assert!(text.contains("7,200"));
        assert!(text.contains("Progress to 1,000,000"));
        assert!(text.contains("50.00%"));
        assert!(text.contains("New Signatures Per 5 Minutes"));
        assert!(text.contains("10:00:00"));
        assert!(text.contains("Last updated: "));
    }

    #[test]
    fn renders_fetch_errors() {
        let mut dash = Dashboard::new(1_000_000);
        dash.start();
        dash.on_sample_result(1_700_000_000.0, Err(AppError::api("No data yet")));
        dash.on_plot_result(Err(AppError::api("Not enough data to plot.")));

        let text = screen(&dash, 100, 30);
        assert!(text.contains("Error loading data"));
        assert!(text.contains("Error loading plot"));
    }

    #[test]
    fn wake_is_bounded() {
        assert_eq!(wake_after(105.0, 100.0), Duration::from_secs(5));
        assert_eq!(wake_after(90.0, 100.0), Duration::ZERO);
        assert_eq!(wake_after(1e300, 100.0), IDLE_WAKE);
        assert_eq!(wake_after(f64::NAN, 100.0), IDLE_WAKE);
    }

    #[test]
    fn tiny_terminal_skips_chart() {
        let mut dash = Dashboard::new(1_000_000);
        dash.start();
        dash.on_plot_result(Ok(series()));

        let text = screen(&dash, 60, 10);
        assert!(text.contains("Progress"));
        assert!(!text.contains("10:00:00"));
    }
}
