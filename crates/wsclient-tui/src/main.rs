use std::path::PathBuf;
use anyhow::Result;
use clap::Parser;
use wsclient_core::{Config, HttpSessionApi, SessionEvent, SessionHandle, WsConnector};
use tokio::sync::mpsc::UnboundedReceiver;

mod app;
mod handler;
mod logging;
mod tui;
mod ui;

use app::App;
use tui::{EventHandler, Tui};

#[derive(Parser)]
#[command(name = "wsclient")]
#[command(version, about = "Terminal chat client: log in, get a ticket, chat over a WebSocket")]
struct Cli {
    /// Base URL of the session API
    #[arg(long)]
    api_url: Option<String>,
    /// URL of the message relay socket
    #[arg(long)]
    ws_url: Option<String>,
    /// Where to write the log file
    #[arg(long)]
    log_file: Option<PathBuf>,
    /// Persist the effective URLs to the config file
    #[arg(long)]
    save_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_path = match cli.log_file {
        Some(path) => path,
        None => logging::default_log_path()?,
    };
    logging::init(&log_path)?;

    // Load config: file, then env, then flags
    let config = Config::load()
        .unwrap_or_else(|e| {
            tracing::warn!("ignoring config file: {:#}", e);
            Config::new()
        })
        .apply_env(|key| std::env::var(key).ok())
        .apply_overrides(cli.api_url, cli.ws_url);

    if cli.save_config {
        config.save()?;
    }
    tracing::info!(api_url = %config.api_url, ws_url = %config.ws_url, "starting");

    let api = HttpSessionApi::new(&config.api_url)?;
    let connector = WsConnector::new(&config.ws_url);
    let (session, session_events, session_task) = wsclient_core::spawn(api, connector);

    tui::install_panic_hook();
    let mut terminal = tui::init()?;

    let result = run(&mut terminal, session, session_events).await;

    tui::restore()?;
    session_task.abort();

    if let Err(ref e) = result {
        tracing::error!("exiting with error: {:#}", e);
    }
    result
}

async fn run(
    terminal: &mut Tui,
    session: SessionHandle,
    session_events: UnboundedReceiver<SessionEvent>,
) -> Result<()> {
    let mut app = App::new(session);
    let mut events = EventHandler::new(session_events);

    app.verify();

    while !app.should_quit {
        terminal.draw(|frame| ui::render(&app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(&mut app, event)?,
            None => break,
        }
    }

    Ok(())
}
