//! Glass binary: runs the relay and renders the live feed to the terminal.
//!
//! Starts the relay service with structured logging and shuts down
//! gracefully on SIGTERM/SIGINT.

use std::io::Write;

use chrono::Local;
use glass_server::{load_config, logging, render_feed, RelayService};
use glass_store::Snapshot;
use tokio::sync::watch;

fn resolve_config_path() -> (Option<String>, &'static str) {
    if let Some(path) = std::env::args()
        .nth(1)
        .filter(|value| !value.trim().is_empty())
    {
        return (Some(path), "cli-arg");
    }

    if let Ok(path) = std::env::var("GLASS_CONFIG_PATH") {
        if !path.trim().is_empty() {
            return (Some(path), "env-var");
        }
    }

    (None, "default")
}

#[tokio::main]
async fn main() {
    let (resolved_config_path, config_source) = resolve_config_path();
    let selected_config_path = resolved_config_path.as_deref().or(Some("glass.toml"));

    let config = match load_config(selected_config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    logging::init_logging(&config.logging);

    tracing::info!(
        source = config_source,
        path = selected_config_path.unwrap_or("<none>"),
        "resolved startup configuration path"
    );

    let service = RelayService::start(&config).await;
    let renderer = tokio::spawn(render_loop(service.subscribe()));

    shutdown_signal().await;

    service.stop().await;
    renderer.abort();
}

/// Redraws the feed on stdout each time it changes.
async fn render_loop(mut snapshots: watch::Receiver<Snapshot>) {
    while snapshots.changed().await.is_ok() {
        let lines = render_feed(&snapshots.borrow_and_update(), &Local);

        let mut out = std::io::stdout().lock();
        // Clear the screen and home the cursor before redrawing.
        let mut frame = String::from("\x1b[2J\x1b[H");
        for line in lines {
            frame.push_str(&line);
            frame.push('\n');
        }
        if let Err(e) = out.write_all(frame.as_bytes()).and_then(|()| out.flush()) {
            tracing::warn!(error = %e, "failed to render feed");
        }
    }
}

/// Waits for a SIGINT (Ctrl+C) or SIGTERM signal for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { tracing::info!("received SIGINT, initiating graceful shutdown"); }
        () = terminate => { tracing::info!("received SIGTERM, initiating graceful shutdown"); }
    }
}
