//! Unix domain socket server for IPC
//!
//! Provides request-response access to the hotkey engine and pushes
//! hotkey events to subscribed clients.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use serde::Serialize;
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::unix::OwnedWriteHalf;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::actions::bind_action;
use crate::engine::HotkeyEngine;
use crate::events::HotkeyEvent;
use crate::keys::{Key, KeyState, SimulatedKeyboard};

use super::protocol::{DaemonStatus, Request, Response};

const MAX_MESSAGE_LEN: usize = 1024 * 1024;

type SharedWriter = Arc<Mutex<OwnedWriteHalf>>;

/// Event push task for one subscribed client, stopped with its connection
struct Forwarder(JoinHandle<()>);

impl Drop for Forwarder {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// What request handlers operate on
pub struct ServerContext {
    pub engine: Arc<HotkeyEngine>,
    /// Present when the engine polls a simulated keyboard
    pub keyboard: Option<Arc<SimulatedKeyboard>>,
    pub events: broadcast::Sender<HotkeyEvent>,
    start_time: Instant,
}

impl ServerContext {
    pub fn new(
        engine: Arc<HotkeyEngine>,
        keyboard: Option<Arc<SimulatedKeyboard>>,
        events: broadcast::Sender<HotkeyEvent>,
    ) -> Self {
        Self {
            engine,
            keyboard,
            events,
            start_time: Instant::now(),
        }
    }

    pub fn status(&self) -> DaemonStatus {
        DaemonStatus {
            version: env!("CARGO_PKG_VERSION").to_string(),
            polling: self.engine.is_running(),
            bindings: self.engine.registry().len(),
            key_injection: self.keyboard.is_some(),
            uptime_secs: self.start_time.elapsed().as_secs(),
        }
    }

    fn set_key(&self, name: &str, down: bool) -> Response {
        let Some(keyboard) = &self.keyboard else {
            return Response::error(
                "key_injection_disabled",
                "this daemon reads the hardware keyboard",
            );
        };
        let Some(key) = Key::from_name(name) else {
            return Response::error("unknown_key", format!("unknown key \"{}\"", name));
        };

        if down {
            keyboard.press(key);
        } else {
            keyboard.release(key);
        }
        Response::KeyState {
            key: key.name().to_string(),
            down: keyboard.is_down(key),
        }
    }
}

/// IPC Server handling client connections
pub struct Server {
    socket_path: PathBuf,
    listener: Option<UnixListener>,
    context: Arc<ServerContext>,
    shutdown_tx: broadcast::Sender<()>,
}

impl Server {
    /// Create a new IPC server
    pub fn new(socket_path: &Path, context: Arc<ServerContext>) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent).context("failed to create socket directory")?;
        }

        // Remove stale socket if it exists
        if socket_path.exists() {
            std::fs::remove_file(socket_path).context("failed to remove stale socket")?;
        }

        let listener = UnixListener::bind(socket_path).context("failed to bind Unix socket")?;

        // Owner-only access
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(socket_path, std::fs::Permissions::from_mode(0o600))?;
        }

        let (shutdown_tx, _) = broadcast::channel(1);

        info!(?socket_path, "IPC server listening");

        Ok(Self {
            socket_path: socket_path.to_owned(),
            listener: Some(listener),
            context,
            shutdown_tx,
        })
    }

    /// Run the server, accepting connections
    pub async fn run(&self) -> Result<()> {
        let listener = self.listener.as_ref().context("server not initialized")?;

        loop {
            match listener.accept().await {
                Ok((stream, _addr)) => {
                    debug!("client connected");
                    let context = Arc::clone(&self.context);
                    let mut shutdown_rx = self.shutdown_tx.subscribe();

                    tokio::spawn(async move {
                        tokio::select! {
                            result = Self::handle_client(stream, context) => {
                                if let Err(e) = result {
                                    warn!(?e, "client handler error");
                                }
                            }
                            _ = shutdown_rx.recv() => {
                                debug!("client handler shutting down");
                            }
                        }
                    });
                }
                Err(e) => {
                    error!(?e, "accept error");
                }
            }
        }
    }

    /// Handle a single client connection
    async fn handle_client(stream: UnixStream, context: Arc<ServerContext>) -> Result<()> {
        let (mut reader, writer) = stream.into_split();
        let writer: SharedWriter = Arc::new(Mutex::new(writer));
        let mut forwarder: Option<Forwarder> = None;
        let mut len_buf = [0u8; 4];

        loop {
            // Read message length (4-byte little-endian)
            match reader.read_exact(&mut len_buf).await {
                Ok(_) => {}
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    debug!("client disconnected");
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            }

            let len = u32::from_le_bytes(len_buf) as usize;
            if len > MAX_MESSAGE_LEN {
                warn!(len, "message too large, disconnecting");
                return Ok(());
            }

            let mut msg_buf = vec![0u8; len];
            reader.read_exact(&mut msg_buf).await?;

            let (response, subscribe) = match serde_json::from_slice::<Request>(&msg_buf) {
                Ok(request) => {
                    debug!(?request, "received request");
                    Self::process_request(request, &context).await
                }
                Err(e) => {
                    warn!(error = %e, "malformed request");
                    (Response::error("bad_request", e), false)
                }
            };

            if subscribe && forwarder.is_none() {
                // Subscribe before confirming so no event slips in between.
                let events = context.events.subscribe();
                send_message(&mut *writer.lock().await, &response).await?;
                let task = tokio::spawn(forward_events(events, Arc::clone(&writer)));
                forwarder = Some(Forwarder(task));
                debug!("client subscribed to notifications");
                continue;
            }

            send_message(&mut *writer.lock().await, &response).await?;
        }
    }

    /// Process a request and return a response
    /// Returns (Response, should_subscribe)
    pub(crate) async fn process_request(
        request: Request,
        context: &Arc<ServerContext>,
    ) -> (Response, bool) {
        let response = match request {
            Request::Ping => Response::Pong,

            Request::GetStatus => Response::Status(context.status()),

            Request::ListBindings => Response::Bindings {
                bindings: context.engine.bindings(),
            },

            Request::Register {
                binding,
                action,
                actuate_on_partial_release,
            } => match binding.resolve() {
                Ok(binding) => {
                    let registration = bind_action(
                        binding.clone(),
                        action,
                        actuate_on_partial_release,
                        context.events.clone(),
                    );
                    match context.engine.register(registration) {
                        Ok(id) => {
                            info!(%id, %binding, %action, "binding registered via IPC");
                            Response::Registered { id, binding }
                        }
                        Err(e) => Response::error(e.code(), e),
                    }
                }
                Err(e) => Response::error(e.code(), e),
            },

            Request::Remove { binding } => match binding.resolve() {
                Ok(binding) => match context.engine.remove(&binding) {
                    Ok(id) => {
                        info!(%id, %binding, "binding removed via IPC");
                        Response::Removed { id }
                    }
                    Err(e) => Response::error(e.code(), e),
                },
                Err(e) => Response::error(e.code(), e),
            },

            // Stopping joins the polling thread, so keep it off the runtime.
            Request::Clear => {
                let engine = Arc::clone(&context.engine);
                match tokio::task::spawn_blocking(move || engine.clear_bindings()).await {
                    Ok(removed) => Response::Cleared { removed },
                    Err(e) => Response::error("internal", e),
                }
            }

            Request::StartPolling => match context.engine.start() {
                Ok(()) => Response::Polling { active: true },
                Err(e) => Response::error(e.code(), e),
            },

            Request::StopPolling => {
                let engine = Arc::clone(&context.engine);
                match tokio::task::spawn_blocking(move || engine.stop()).await {
                    Ok(()) => Response::Polling { active: false },
                    Err(e) => Response::error("internal", e),
                }
            }

            Request::RestartPolling => {
                let engine = Arc::clone(&context.engine);
                match tokio::task::spawn_blocking(move || engine.restart()).await {
                    Ok(Ok(())) => Response::Polling { active: true },
                    Ok(Err(e)) => Response::error(e.code(), e),
                    Err(e) => Response::error("internal", e),
                }
            }

            Request::KeyDown { key } => context.set_key(&key, true),

            Request::KeyUp { key } => context.set_key(&key, false),

            Request::Subscribe => return (Response::Subscribed, true),
        };

        (response, false)
    }

    /// Gracefully shutdown the server
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());

        // Remove socket file
        if self.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.socket_path) {
                warn!(?e, "failed to remove socket file");
            }
        }

        info!("IPC server shutdown complete");
    }
}

/// Push hotkey events to one subscribed client until it goes away
async fn forward_events(mut events: broadcast::Receiver<HotkeyEvent>, writer: SharedWriter) {
    loop {
        match events.recv().await {
            Ok(event) => {
                let message = Response::Event { event };
                if let Err(e) = send_message(&mut *writer.lock().await, &message).await {
                    debug!(?e, "subscriber gone");
                    break;
                }
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!(skipped = n, "subscriber lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

/// Send a length-prefixed JSON message
async fn send_message<W, T>(writer: &mut W, msg: &T) -> Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let msg_bytes = serde_json::to_vec(msg)?;
    let msg_len = (msg_bytes.len() as u32).to_le_bytes();

    writer.write_all(&msg_len).await?;
    writer.write_all(&msg_bytes).await?;

    Ok(())
}
