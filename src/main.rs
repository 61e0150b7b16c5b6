//! global-chords-daemon: background daemon for global media hotkeys
//!
//! This daemon provides:
//! - Polling-based global hotkey detection with chord sequences
//! - Media action events for configured hotkeys
//! - IPC server for registering bindings and receiving events (Unix)

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::broadcast;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use global_chords::actions::register_configured;
use global_chords::config::Config;
use global_chords::events::HotkeyEvent;
use global_chords::keys::{KeyState, SimulatedKeyboard};
use global_chords::lifecycle::ShutdownSignal;
use global_chords::HotkeyEngine;

/// Key-state source for this platform, plus the keyboard handle when simulated
#[cfg(windows)]
fn key_source() -> (
    Arc<dyn KeyState + Send + Sync>,
    Option<Arc<SimulatedKeyboard>>,
) {
    (Arc::new(global_chords::keys::AsyncKeyState), None)
}

#[cfg(not(windows))]
fn key_source() -> (
    Arc<dyn KeyState + Send + Sync>,
    Option<Arc<SimulatedKeyboard>>,
) {
    let keyboard = Arc::new(SimulatedKeyboard::new());
    (keyboard.clone(), Some(keyboard))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "global-chords-daemon starting"
    );

    // Load configuration
    let config = Config::load()?;
    config.ensure_dirs()?;
    info!(
        ?config.socket_path,
        ?config.config_path,
        hotkeys = config.hotkeys.len(),
        "configuration loaded"
    );

    let shutdown = ShutdownSignal::new();

    // Engine callbacks -> subscribers
    let (event_tx, _event_rx) = broadcast::channel::<HotkeyEvent>(64);

    let (source, keyboard) = key_source();
    if keyboard.is_some() {
        warn!("no hardware key-state source on this platform; keys come from IPC key_down/key_up");
    }
    let engine = Arc::new(HotkeyEngine::with_source(source, config.engine));

    let registered = register_configured(&engine, &config.hotkeys, &event_tx);
    info!(registered, "configured hotkeys registered");

    if let Err(e) = engine.start() {
        error!(?e, "failed to start hotkey polling");
    }

    #[cfg(unix)]
    let server = {
        use global_chords::ipc::{Server, ServerContext};

        let context = Arc::new(ServerContext::new(
            Arc::clone(&engine),
            keyboard.clone(),
            event_tx.clone(),
        ));
        let server = Arc::new(Server::new(&config.socket_path, context)?);
        let running = Arc::clone(&server);
        tokio::spawn(async move {
            if let Err(e) = running.run().await {
                error!(?e, "IPC server error");
            }
        });
        server
    };
    #[cfg(not(unix))]
    drop(keyboard);

    let mut log_rx = event_tx.subscribe();

    info!("daemon initialized, entering main loop");

    // Main event loop
    tokio::select! {
        // Log hotkey events
        _ = async {
            loop {
                match log_rx.recv().await {
                    Ok(event) => info!(action = ?event.action(), %event, "hotkey event"),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(skipped = n, "hotkey event receiver lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        } => {
            info!("hotkey event handler exited");
        }

        // Wait for shutdown signal
        _ = shutdown.wait() => {
            info!("shutdown signal received");
        }
    }

    // Cleanup
    info!("shutting down...");

    let stopping = Arc::clone(&engine);
    if let Err(e) = tokio::task::spawn_blocking(move || stopping.stop()).await {
        error!(?e, "failed to stop hotkey polling");
    }

    #[cfg(unix)]
    server.shutdown().await;

    info!("global-chords-daemon stopped");

    Ok(())
}
