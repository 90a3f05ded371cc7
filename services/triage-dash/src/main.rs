// services/triage-dash/src/main.rs
//
// Terminal dashboard for mass-casualty triage operations
//
// Run with: cargo run --bin triage-dash -- --demo

use std::fs::OpenOptions;
use std::io::stdout;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use clap::Parser;
use crossterm::{
    event::{self, Event},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::prelude::*;
use tokio::sync::mpsc::{self, UnboundedSender};
use tracing::{error, info, warn};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use svckit::config::ObservabilityConfig;
use triage_dash::app::{App, AppEvent};
use triage_dash::config::{self, DashConfig};
use triage_dash::notify::Notification;
use triage_dash::scheduler::Poller;
use triage_dash::view::build_view;
use triage_dash::{api, ui, DemoGateway, Dispatcher, HttpGateway, StateStore, TriageGateway};

#[derive(Parser, Debug)]
#[command(name = "triage-dash")]
#[command(about = "Terminal dashboard for mass-casualty triage operations")]
#[command(version = "0.1.0")]
struct Args {
    #[arg(short, long, default_value = "config/triage-dash.yaml")]
    config: String,

    /// Run against an in-memory backend with simulated data
    #[arg(long, short)]
    demo: bool,

    /// Triage backend base URL (overrides api.base_url)
    #[arg(long)]
    api_url: Option<String>,

    /// Poll interval in seconds (overrides dashboard.poll_interval_secs)
    #[arg(long)]
    poll_secs: Option<u64>,

    /// Directory for exported snapshots
    #[arg(long)]
    export_dir: Option<PathBuf>,

    /// Serve /health, /metrics and /snapshot on this local port
    #[arg(long)]
    metrics_port: Option<u16>,
}

fn apply_overrides(config: &mut DashConfig, args: &Args) {
    if let Some(url) = &args.api_url {
        config.api.base_url = url.clone();
    }
    if let Some(secs) = args.poll_secs {
        config.dashboard.poll_interval_secs = secs;
    }
    if let Some(dir) = &args.export_dir {
        config.dashboard.export_dir = dir.clone();
    }
    if let Some(port) = args.metrics_port {
        config.observability.metrics_port = Some(port);
    }
}

// The TUI owns the terminal, so logs go to a file or nowhere.
fn init_tracing(observability: &ObservabilityConfig) -> Result<()> {
    let writer = match &observability.log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            BoxMakeWriter::new(Arc::new(file))
        }
        None => BoxMakeWriter::new(std::io::sink),
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            format!(
                "triage_dash={0},svckit={0},tower_http=info",
                observability.log_level
            )
            .into()
        }))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false),
        )
        .init();
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = config::load_config(&args.config)?;
    apply_overrides(&mut config, &args);
    init_tracing(&config.observability)?;

    let (gateway, backend): (Arc<dyn TriageGateway>, String) = if args.demo {
        info!("Starting triage-dash in DEMO mode");
        let gateway: Arc<dyn TriageGateway> = Arc::new(DemoGateway::seeded().live());
        (gateway, "in-memory demo".to_string())
    } else {
        let gateway = HttpGateway::new(&config.api)?;
        info!("Starting triage-dash against {}", gateway.base_url());
        let backend = gateway.base_url().to_string();
        let gateway: Arc<dyn TriageGateway> = Arc::new(gateway);
        (gateway, backend)
    };
    let store = Arc::new(StateStore::new(gateway));

    if let Some(port) = config.observability.metrics_port {
        let store = store.clone();
        tokio::spawn(async move {
            if let Err(e) = api::start_server(store, port).await {
                error!("Observability endpoint failed: {}", e);
            }
        });
    }

    let mut app = App::new(backend, args.demo, config.dashboard.notification_ttl());
    app.notify(if args.demo {
        Notification::info("Dashboard started in DEMO mode")
    } else {
        Notification::info(format!("Connecting to {}", config.api.base_url))
    });

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    // Run app
    let result = run_app(&mut terminal, store, &config, app).await;

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    if let Err(e) = &result {
        error!("Dashboard exited with error: {}", e);
    }
    info!("triage-dash stopped");
    result
}

/// Forward terminal events into the loop. Runs on its own thread because
/// crossterm's reader blocks.
fn spawn_input_reader(tx: UnboundedSender<AppEvent>) {
    std::thread::spawn(move || loop {
        match event::poll(Duration::from_millis(200)) {
            Ok(true) => match event::read() {
                Ok(event) => {
                    if tx.send(AppEvent::Input(event)).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!("Terminal read failed: {}", e);
                    break;
                }
            },
            Ok(false) => {
                if tx.is_closed() {
                    break;
                }
            }
            Err(e) => {
                warn!("Terminal poll failed: {}", e);
                break;
            }
        }
    });
}

async fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    store: Arc<StateStore>,
    config: &DashConfig,
    mut app: App,
) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    spawn_input_reader(tx.clone());

    let poller = Poller::spawn(store.clone(), config.dashboard.poll_interval(), tx.clone());
    let dispatcher = Dispatcher::new(
        store.clone(),
        config.dashboard.export_dir.clone(),
        config.dashboard.report_delay(),
    );

    let mut view = build_view(&store.snapshot().await, app.filter);
    let mut redraw = tokio::time::interval(Duration::from_millis(250));

    loop {
        terminal.draw(|frame| ui::draw(frame, &app, &view, Instant::now()))?;

        let event = tokio::select! {
            Some(event) = rx.recv() => event,
            _ = redraw.tick() => {
                app.notifier.prune(Instant::now());
                continue;
            }
        };

        match event {
            AppEvent::Input(Event::Key(key)) => {
                let filter = app.filter;
                if let Some(action) = app.handle_key(key, &view) {
                    app.pending_commands += 1;
                    let dispatcher = dispatcher.clone();
                    let tx = tx.clone();
                    tokio::spawn(async move {
                        let report = dispatcher.dispatch(action).await;
                        let _ = tx.send(AppEvent::Command(report));
                    });
                }
                if app.filter != filter {
                    view = build_view(&store.snapshot().await, app.filter);
                }
                app.clamp_selection(&view);
            }
            AppEvent::Input(_) => {}
            AppEvent::Refreshed(outcome) => {
                let snapshot = store.snapshot().await;
                app.apply_refresh(&outcome, snapshot.last_refreshed);
                view = build_view(&snapshot, app.filter);
                app.clamp_selection(&view);
            }
            AppEvent::Command(report) => {
                if let Some(deferred) = report.deferred.clone() {
                    let tx = tx.clone();
                    tokio::spawn(async move {
                        tokio::time::sleep(deferred.after).await;
                        let _ = tx.send(AppEvent::Notify(deferred.notification));
                    });
                }
                let snapshot = store.snapshot().await;
                app.apply_command(report, snapshot.last_refreshed);
                view = build_view(&snapshot, app.filter);
                app.clamp_selection(&view);
            }
            AppEvent::Notify(notification) => app.notify(notification),
        }

        if app.should_quit {
            break;
        }
    }

    poller.shutdown();
    Ok(())
}
