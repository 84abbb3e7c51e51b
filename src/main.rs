mod access;
mod cli;
mod commands;
mod config;
mod errors;
mod protocol;
mod reassembly;
mod router;
mod session;
mod socket;
#[cfg(test)]
mod tests;
mod types;
mod ui;
mod utils;

use clap::Parser;
use crossterm::{
    execute,
    style::Stylize,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use std::io::IsTerminal;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use access::AccessClient;
use cli::Cli;
use config::Config;
use session::{Selection, SessionState, StreamingSession};
use socket::{ConnectionEvent, WsConnector};
use types::{ClusterTarget, Scope, SignalLevel};
use ui::{App, AppEvent};
use utils::get_crossterm_color;

const LOG_CHANNEL: &str = "log";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Determine if we'll use TUI mode (needed to configure logging appropriately)
    let use_tui = !cli.no_tui && !cli.list && std::io::stdout().is_terminal();
    init_tracing(use_tui, cli.verbose);

    let config = Config::try_from(cli)?;
    let client = AccessClient::new(&config.backend_url, config.http_timeout)?;

    let token = CancellationToken::new();
    let ctrl_c_token = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c_token.cancel();
        }
    });

    let clusters = tokio::select! {
        result = discover(&client, &config) => result?,
        _ = token.cancelled() => anyhow::bail!("Interrupted"),
    };

    if config.list {
        print_clusters(&clusters);
        return Ok(());
    }

    let cluster = pick_cluster(&clusters, config.selection.cluster.as_deref())?;
    let selection = Selection::for_cluster(
        cluster,
        &config.selection.namespaces,
        &config.selection.pods,
        &config.selection.containers,
    );
    info!(
        "Streaming {} pod(s) from cluster {} ({})",
        selection.pods.len(),
        cluster.name,
        cluster.url
    );

    let cluster_name = cluster.name.clone();

    let (conn_tx, conn_rx) = mpsc::channel::<ConnectionEvent>(1024);
    let clusters: Arc<[ClusterTarget]> = clusters.into();
    let mut session = StreamingSession::new(WsConnector::new(conn_tx), clusters);
    session.select_cluster(&cluster_name)?;
    session.select_objects(selection.namespaces, selection.pods, selection.containers)?;

    if use_tui {
        run_tui_mode(config, session, conn_rx).await
    } else {
        run_stdout_mode(config, session, conn_rx, token).await
    }
}

fn init_tracing(use_tui: bool, verbose: bool) {
    let filter = if verbose { "debug" } else { "info" };
    let env_filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter))
    };

    if use_tui {
        // In TUI mode: write logs to a file to avoid corrupting the display
        match std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open("/tmp/kwirth-tail.log")
        {
            Ok(log_file) => tracing_subscriber::fmt()
                .with_env_filter(env_filter())
                .with_target(false)
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(log_file))
                .init(),
            Err(_) => {
                eprintln!("Warning: Could not open /tmp/kwirth-tail.log for logging");
                tracing_subscriber::fmt()
                    .with_env_filter(env_filter())
                    .with_writer(std::io::sink)
                    .init();
            }
        }
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter())
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }
}

async fn discover(client: &AccessClient, config: &Config) -> anyhow::Result<Vec<ClusterTarget>> {
    match client.get_version().await {
        Ok(version) => info!("Kwirth backend version {}", version),
        Err(e) => warn!("Could not read backend version: {}", e),
    }

    let clusters = if config.list {
        client.get_resources(&config.entity).await?
    } else {
        client
            .request_access(&config.entity, LOG_CHANNEL, &[Scope::View, Scope::Restart])
            .await?
    };
    debug!("Entity {} found in {} cluster(s)", config.entity_name(), clusters.len());
    Ok(clusters)
}

fn pick_cluster<'a>(
    clusters: &'a [ClusterTarget],
    wanted: Option<&str>,
) -> anyhow::Result<&'a ClusterTarget> {
    match (wanted, clusters) {
        (_, []) => anyhow::bail!("Entity was not found in any cluster"),
        (Some(name), _) => clusters
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| anyhow::anyhow!("Cluster '{}' not available for this entity", name)),
        (None, [only]) => Ok(only),
        (None, _) => {
            let names: Vec<&str> = clusters.iter().map(|c| c.name.as_str()).collect();
            anyhow::bail!(
                "Entity runs in several clusters ({}), choose one with --cluster",
                names.join(", ")
            )
        }
    }
}

fn print_clusters(clusters: &[ClusterTarget]) {
    for cluster in clusters {
        let title = cluster.title.as_deref().unwrap_or(&cluster.name);
        println!("{} {}", title.bold(), cluster.url.as_str().dark_grey());
        for pod in &cluster.data {
            println!(
                "  {}/{} [{}]",
                pod.namespace,
                pod.name.as_str().with(get_crossterm_color(&pod.name)),
                pod.containers.join(", ")
            );
        }
    }
}

fn print_new_output(session: &mut StreamingSession<WsConnector>, printed_signals: &mut usize) {
    for line in session.take_output() {
        let text = session.format_line(&line);
        match &line.source {
            Some(source) if text.len() > line.text.len() => {
                let (prefix, rest) = text.split_at(text.len() - line.text.len());
                println!("{}{}", prefix.with(get_crossterm_color(&source.pod)), rest);
            }
            _ => println!("{}", text),
        }
    }

    let signals = session.signals();
    for entry in signals.iter().skip(*printed_signals) {
        let level = format!("[{}]", entry.level);
        let level = match entry.level {
            SignalLevel::Info => level.cyan(),
            SignalLevel::Warning => level.yellow(),
            SignalLevel::Error => level.red(),
        };
        eprintln!("{} {}", level, entry.text);
    }
    *printed_signals = signals.len();
}

async fn run_stdout_mode(
    config: Config,
    mut session: StreamingSession<WsConnector>,
    mut conn_rx: mpsc::Receiver<ConnectionEvent>,
    token: CancellationToken,
) -> anyhow::Result<()> {
    session.capture_output();
    let mut printed_signals = session.signals().len();
    let mut restart_pending = config.restart;

    let started = session.start(config.options);
    print_new_output(&mut session, &mut printed_signals);
    started?;

    loop {
        tokio::select! {
            event = conn_rx.recv() => {
                let Some(event) = event else { break };
                session.on_connection_event(event);
                // Batch process queued socket events without blocking
                while let Ok(event) = conn_rx.try_recv() {
                    session.on_connection_event(event);
                }
                if restart_pending && session.instance().is_some() {
                    restart_pending = false;
                    if session.restart().is_ok() {
                        info!("Restart requested for selected pods");
                    }
                }
                print_new_output(&mut session, &mut printed_signals);
                if session.state() == SessionState::Stopped {
                    break;
                }
            }
            _ = token.cancelled() => {
                session.stop()?;
                print_new_output(&mut session, &mut printed_signals);
                break;
            }
        }
    }

    Ok(())
}

async fn run_tui_mode(
    config: Config,
    session: StreamingSession<WsConnector>,
    mut conn_rx: mpsc::Receiver<ConnectionEvent>,
) -> anyhow::Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let entity_name = config.entity_name().to_string();
    let mut app = App::new(session, config.options, entity_name, config.download_dir);
    let mut restart_pending = config.restart;
    app.play();

    // Create event channel
    let (event_tx, mut event_rx) = mpsc::channel::<AppEvent>(100);

    // Spawn keyboard event loop
    let event_tx_clone = event_tx.clone();
    tokio::spawn(async move {
        ui::events::event_loop(event_tx_clone).await;
    });

    // Convert socket events to app events
    let event_tx_clone = event_tx.clone();
    tokio::spawn(async move {
        while let Some(ev) = conn_rx.recv().await {
            if event_tx_clone.send(AppEvent::Connection(ev)).await.is_err() {
                break;
            }
        }
    });

    // Main TUI event loop with render throttling
    let mut should_quit = false;
    let mut render_interval = tokio::time::interval(std::time::Duration::from_millis(16)); // ~60 FPS
    render_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    while !should_quit {
        tokio::select! {
            _ = render_interval.tick() => {
                ui::renderer::render(&mut terminal, &mut app)?;
            }
            event = event_rx.recv() => {
                let Some(event) = event else { break };
                match event {
                    AppEvent::Key(key) => {
                        should_quit = !ui::events::handle_key_event(&mut app, key);
                        // Render immediately after keyboard input for responsiveness
                        ui::renderer::render(&mut terminal, &mut app)?;
                    }
                    AppEvent::Connection(ev) => {
                        app.on_connection_event(ev);
                        if restart_pending && app.session.instance().is_some() {
                            restart_pending = false;
                            app.restart();
                        }
                    }
                    AppEvent::Tick => {
                        app.update_notice();
                    }
                }
            }
        }
    }

    // Cleanup terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    Ok(())
}
