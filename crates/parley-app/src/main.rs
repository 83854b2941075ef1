//! Parley terminal client - composition root.
//!
//! Ties the Parley crates together into a single executable:
//! 1. Load configuration from TOML
//! 2. Open the SQLite-backed session store
//! 3. Connect the HTTP query backend
//! 4. Run the orchestrator with a terminal renderer for its event stream

mod cli;
mod http;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::UnboundedReceiver;

use parley_chat::{ChatError, ChatOrchestrator, SidebarState, UiEvent};
use parley_core::config::ParleyConfig;
use parley_store::{FileExportSink, SessionStore, SqliteStore};

use cli::CliArgs;
use http::HttpBackend;

/// Render orchestrator events to the terminal as they arrive.
async fn render_events(mut events: UnboundedReceiver<UiEvent>) {
    use std::io::Write;

    while let Some(event) = events.recv().await {
        match event {
            UiEvent::MessageAppended { .. } => {}
            UiEvent::TextTick { visible, .. } => {
                print!("\r{}", visible);
                let _ = std::io::stdout().flush();
            }
            UiEvent::MessageCompleted { .. } => {
                println!();
            }
            UiEvent::PanelChanged { state } => match state {
                SidebarState::Revealing => println!("--- results ---"),
                SidebarState::Open => println!("---------------"),
                SidebarState::AutoClosing => {}
                SidebarState::Closed => println!("--- panel closed ---"),
            },
            UiEvent::PanelRow { index, row } => {
                let cells: Vec<String> = row
                    .values()
                    .map(|v| match v {
                        serde_json::Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect();
                println!("{:>4}  {}", index + 1, cells.join(" | "));
            }
            UiEvent::SessionReset { session_id } => {
                println!("Session reset ({})", session_id);
            }
            UiEvent::CycleFinished { .. } => {
                print!("> ");
                let _ = std::io::stdout().flush();
            }
        }
    }
}

/// Dispatch one line of user input. Returns false when the client should exit.
fn handle_line(orchestrator: &Arc<ChatOrchestrator>, line: &str, export_dir: &PathBuf) -> bool {
    match line.trim() {
        "" => true,
        "/quit" | "/exit" => false,
        "/help" => {
            println!("Commands: /close /artifact /export /reset /quit");
            true
        }
        "/close" => {
            match orchestrator.close_panel() {
                Ok(true) => {}
                Ok(false) => println!("Panel is already closed"),
                Err(e) => println!("Error: {}", e),
            }
            true
        }
        "/artifact" => {
            match orchestrator.toggle_artifact() {
                Ok(artifact) => println!(
                    "Showing {} view",
                    if artifact { "artifact" } else { "table" }
                ),
                Err(e) => println!("Error: {}", e),
            }
            true
        }
        "/export" => {
            let sink = FileExportSink::new(export_dir.clone());
            match orchestrator.export_current(&sink) {
                Ok(()) => println!("Exported to {}", export_dir.display()),
                Err(e) => println!("Error: {}", e),
            }
            true
        }
        "/reset" => {
            if let Err(e) = orchestrator.reset() {
                println!("Error: {}", e);
            }
            true
        }
        query => {
            match orchestrator.submit(query) {
                Ok(_) => {}
                Err(ChatError::Busy) => println!("Still working on the previous question"),
                Err(e) => println!("Error: {}", e),
            }
            true
        }
    }
}

/// Expand ~ to home directory in a path string.
fn resolve_data_dir(data_dir: &str) -> PathBuf {
    if data_dir.starts_with("~/") || data_dir.starts_with("~\\") {
        #[cfg(target_os = "windows")]
        let home = std::env::var("USERPROFILE").unwrap_or_else(|_| ".".to_string());
        #[cfg(not(target_os = "windows"))]
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(&data_dir[2..])
    } else {
        PathBuf::from(data_dir)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config.
    let config_file = args.resolve_config_path();
    let mut config = ParleyConfig::load_or_default(&config_file);
    if let Some(dir) = args.resolve_data_dir() {
        config.general.data_dir = dir;
    }
    if let Some(level) = args.resolve_log_level() {
        config.general.log_level = level;
    }

    // Tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.general.log_level)),
        )
        .init();

    tracing::info!("Starting Parley v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(path = %config_file.display(), "Configuration loaded");

    // Storage.
    let data_dir = resolve_data_dir(&config.general.data_dir);
    std::fs::create_dir_all(&data_dir)?;

    let db_path = data_dir.join("parley.db");
    let store = SqliteStore::new(&db_path)?;
    tracing::info!(path = %db_path.display(), "SQLite database opened");

    let sessions = SessionStore::new(
        Arc::new(store),
        config.session.history_cap,
        config.session.greeting.clone(),
    );

    // Backend.
    let backend_url = args.resolve_backend_url(&config.backend.url);
    let backend = Arc::new(HttpBackend::new(
        backend_url.clone(),
        config.backend.timeout_secs,
    )?);
    tracing::info!(url = %backend_url, "Query backend configured");

    // Orchestrator plus its terminal renderer.
    let (orchestrator, events) = ChatOrchestrator::new(config.chat.clone(), backend, sessions);
    tokio::spawn(render_events(events));

    let export_dir = data_dir.join("exports");

    // Show the restored history before accepting input.
    for message in orchestrator.history() {
        println!("[{}] {}", message.role.as_str(), message.text);
    }
    println!("Type a question, or /help for commands.");
    print!("> ");
    {
        use std::io::Write;
        let _ = std::io::stdout().flush();
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if !handle_line(&orchestrator, &line, &export_dir) {
            break;
        }
    }

    tracing::info!("Shutting down");
    Ok(())
}
