/// ES/SPY Tracker Dashboard
///
/// Continuously-looping terminal shell: live ES/SPY/ratio panels, a ratio
/// sparkline over the retained window, and a price calculator seeded by the
/// tracked ratio. All tracking state lives in the shared engine; this
/// binary only holds an `Arc` handle and renders snapshots.
use std::{
    io,
    sync::Arc,
    time::{Duration, Instant},
};

use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Sparkline},
};
use tokio::sync::mpsc;

use tracker_core::{
    Fetcher, REFRESH_INTERVAL, RatioTracker, RefreshEvent, TrackerSnapshot, calc, refresh_once,
    spawn_refresh_loop,
};

/// UI redraw cadence; snapshots are cheap so this just bounds CPU
const DRAW_INTERVAL: Duration = Duration::from_millis(250);

/// ES futures tick size, used as the calculator adjustment step
const ES_TICK: f64 = 0.25;

/// Adjustment step for the custom calculator ratio
const RATIO_STEP: f64 = 0.01;

/// Local UI state; nothing in here touches the tracking engine
struct App {
    /// ES price fed into the calculator panel
    calc_es_input: f64,
    /// Ratio override used instead of the tracked ratio when enabled
    custom_ratio: f64,
    use_custom_ratio: bool,
    /// Most recent transient fetch failure, if any
    last_error: Option<String>,
}

impl App {
    fn new() -> Self {
        Self {
            calc_es_input: 5300.0,
            custom_ratio: tracker_core::DEFAULT_RATIO,
            use_custom_ratio: false,
            last_error: None,
        }
    }

    fn ratio_in_use(&self, snapshot_ratio: f64) -> f64 {
        if self.use_custom_ratio {
            self.custom_ratio
        } else {
            snapshot_ratio
        }
    }
}

#[tokio::main]
async fn main() -> io::Result<()> {
    // Restore the terminal even if rendering panics
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture);
        original_hook(panic_info);
    }));

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Shared tracking engine plus the scheduled refresh loop
    let tracker = Arc::new(RatioTracker::new());
    let fetcher = Fetcher::new();
    let (event_tx, mut event_rx) = mpsc::channel::<RefreshEvent>(16);
    let refresh = spawn_refresh_loop(
        fetcher.clone(),
        Arc::clone(&tracker),
        REFRESH_INTERVAL,
        Some(event_tx.clone()),
    );

    let mut app = App::new();
    let mut last_draw = Instant::now() - DRAW_INTERVAL;

    let result = loop {
        // Drain refresh outcomes into the transient status message
        while let Ok(event) = event_rx.try_recv() {
            match event {
                RefreshEvent::Ingested(_) => app.last_error = None,
                RefreshEvent::Failed(error) => app.last_error = Some(error.to_string()),
            }
        }

        if last_draw.elapsed() >= DRAW_INTERVAL {
            let snapshot = tracker.snapshot();
            terminal.draw(|f| ui(f, &snapshot, &app))?;
            last_draw = Instant::now();
        }

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => break Ok(()),
                    KeyCode::Char('r') => {
                        // Manual refresh runs off the UI thread; its outcome
                        // arrives on the same event channel as the loop's
                        let tracker = Arc::clone(&tracker);
                        let fetcher = fetcher.clone();
                        let event_tx = event_tx.clone();
                        tokio::spawn(async move {
                            let event = match refresh_once(&fetcher, &tracker).await {
                                Ok(sample) => RefreshEvent::Ingested(sample),
                                Err(error) => RefreshEvent::Failed(error),
                            };
                            let _ = event_tx.send(event).await;
                        });
                    }
                    KeyCode::Char('c') => tracker.clear(),
                    KeyCode::Char('o') => app.use_custom_ratio = !app.use_custom_ratio,
                    KeyCode::Up => app.calc_es_input += ES_TICK,
                    KeyCode::Down => {
                        app.calc_es_input = (app.calc_es_input - ES_TICK).max(ES_TICK)
                    }
                    KeyCode::Right => app.custom_ratio += RATIO_STEP,
                    KeyCode::Left => {
                        app.custom_ratio = (app.custom_ratio - RATIO_STEP).max(RATIO_STEP)
                    }
                    _ => {}
                }
            }
        }
    };

    refresh.stop().await;

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

fn ui(f: &mut Frame, snapshot: &TrackerSnapshot, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // status bar
            Constraint::Length(5), // price panels
            Constraint::Min(6),    // ratio chart
            Constraint::Length(6), // calculator
        ])
        .split(f.area());

    render_status_bar(f, chunks[0], snapshot, app);
    render_prices(f, chunks[1], snapshot);
    render_ratio_chart(f, chunks[2], snapshot);
    render_calculator(f, chunks[3], snapshot, app);
}

fn render_status_bar(f: &mut Frame, area: Rect, snapshot: &TrackerSnapshot, app: &App) {
    let title = Span::styled(
        " ES-SPY TRACKER ",
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
    );

    let update = Span::styled(
        format!(" last update: {} ", snapshot.last_update),
        Style::default().fg(Color::Cyan),
    );

    let cadence = Span::styled(
        format!(" auto {}s ", REFRESH_INTERVAL.as_secs()),
        Style::default().fg(Color::DarkGray),
    );

    let status = match &app.last_error {
        Some(error) => Span::styled(
            format!(" {error} "),
            Style::default().fg(Color::Red),
        ),
        None => Span::styled(
            " [Q]uit [R]efresh [C]lear [O]verride ratio ",
            Style::default().fg(Color::DarkGray),
        ),
    };

    let line = Line::from(vec![title, update, cadence, status]);
    let paragraph = Paragraph::new(line)
        .block(Block::default().borders(Borders::ALL))
        .alignment(Alignment::Center);

    f.render_widget(paragraph, area);
}

fn render_prices(f: &mut Frame, area: Rect, snapshot: &TrackerSnapshot) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(33),
            Constraint::Percentage(34),
            Constraint::Percentage(33),
        ])
        .split(area);

    let latest = snapshot.latest();

    render_price_panel(
        f,
        columns[0],
        "ES Futures",
        latest.map(|s| format!("{:.2}", s.es)),
        snapshot.es_change_pct,
    );
    render_price_panel(
        f,
        columns[1],
        "SPY ETF",
        latest.map(|s| format!("{:.2}", s.spy)),
        snapshot.spy_change_pct,
    );
    render_price_panel(
        f,
        columns[2],
        "ES/SPY Ratio",
        latest.map(|s| format!("{:.4}", s.ratio())),
        snapshot.ratio_change_pct,
    );
}

fn render_price_panel(
    f: &mut Frame,
    area: Rect,
    label: &str,
    value: Option<String>,
    change_pct: f64,
) {
    let (value_text, change_line) = match value {
        Some(value) => {
            let color = if change_pct >= 0.0 {
                Color::Green
            } else {
                Color::Red
            };
            (
                value,
                Line::from(Span::styled(
                    format!("({change_pct:+.2}%)"),
                    Style::default().fg(color),
                )),
            )
        }
        None => (
            "--".to_string(),
            Line::from(Span::styled("--", Style::default().fg(Color::DarkGray))),
        ),
    };

    let lines = vec![
        Line::from(Span::styled(
            value_text,
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )),
        change_line,
    ];

    let paragraph = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(label))
        .alignment(Alignment::Center);

    f.render_widget(paragraph, area);
}

fn render_ratio_chart(f: &mut Frame, area: Rect, snapshot: &TrackerSnapshot) {
    let block = Block::default().borders(Borders::ALL).title(format!(
        "ES/SPY Ratio ({} of {} points)",
        snapshot.samples.len(),
        tracker_core::HISTORY_CAPACITY
    ));

    if snapshot.is_empty() {
        let waiting = Paragraph::new("No data yet - waiting for the first refresh")
            .block(block)
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center);
        f.render_widget(waiting, area);
        return;
    }

    // Sparklines render u64 bars; rescale the ratio window onto its own
    // min..max span so small moves stay visible
    let ratios: Vec<f64> = snapshot.samples.iter().map(|s| s.ratio()).collect();
    let min = ratios.iter().copied().fold(f64::INFINITY, f64::min);
    let max = ratios.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let span = (max - min).max(1e-9);
    let bars: Vec<u64> = ratios
        .iter()
        .map(|r| (((r - min) / span) * 100.0).round() as u64 + 1)
        .collect();

    let sparkline = Sparkline::default()
        .block(block)
        .data(&bars)
        .style(Style::default().fg(Color::Cyan));

    f.render_widget(sparkline, area);
}

fn render_calculator(f: &mut Frame, area: Rect, snapshot: &TrackerSnapshot, app: &App) {
    let ratio = app.ratio_in_use(snapshot.current_ratio);

    let ratio_source = if app.use_custom_ratio {
        format!("custom {:.4}  [←/→ adjust]", app.custom_ratio)
    } else {
        format!("market {:.4}", snapshot.current_ratio)
    };

    let mut lines = vec![
        Line::from(vec![
            Span::raw("Ratio in use: "),
            Span::styled(ratio_source, Style::default().fg(Color::Yellow)),
        ]),
        Line::from(vec![
            Span::raw("ES price: "),
            Span::styled(
                format!("{:.2}  [↑/↓ adjust]", app.calc_es_input),
                Style::default().fg(Color::White),
            ),
        ]),
    ];

    match calc::spy_from_es(app.calc_es_input, ratio) {
        Ok(spy_price) => {
            lines.push(Line::from(vec![
                Span::raw("Implied SPY: "),
                Span::styled(
                    format!("${spy_price:.2}"),
                    Style::default()
                        .fg(Color::Green)
                        .add_modifier(Modifier::BOLD),
                ),
            ]));
            // Show the reverse conversion so both directions are visible
            if let Ok(es_price) = calc::es_from_spy(spy_price, ratio) {
                lines.push(Line::from(vec![
                    Span::raw("Implied ES (round trip): "),
                    Span::styled(format!("${es_price:.2}"), Style::default().fg(Color::Green)),
                ]));
            }
        }
        Err(error) => {
            lines.push(Line::from(Span::styled(
                format!("Cannot calculate: {error}"),
                Style::default().fg(Color::Red),
            )));
        }
    }

    let paragraph =
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Calculator"));

    f.render_widget(paragraph, area);
}
