//! IPC message protocol definitions
//!
//! All messages are JSON-encoded, prefixed with a 4-byte little-endian length.

use serde::{Deserialize, Serialize};

use crate::actions::MediaAction;
use crate::binding::{Binding, BindingSpec};
use crate::engine::{BindingId, BindingSnapshot};
use crate::events::HotkeyEvent;

/// Requests from a client to the daemon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Ping to check connectivity
    Ping,

    /// Request current daemon status
    GetStatus,

    /// List registered bindings with their progress
    ListBindings,

    /// Bind a hotkey to a media action
    Register {
        binding: BindingSpec,
        action: MediaAction,
        #[serde(default = "default_partial_release")]
        actuate_on_partial_release: bool,
    },

    /// Remove a binding
    Remove { binding: BindingSpec },

    /// Stop polling and drop every binding
    Clear,

    StartPolling,
    StopPolling,
    RestartPolling,

    /// Hold a key on the simulated keyboard
    KeyDown { key: String },

    /// Release a key on the simulated keyboard
    KeyUp { key: String },

    /// Subscribe to hotkey event notifications
    Subscribe,
}

fn default_partial_release() -> bool {
    true
}

/// Responses from daemon to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Pong response to ping
    Pong,

    /// Current daemon status
    Status(DaemonStatus),

    Bindings { bindings: Vec<BindingSnapshot> },

    Registered { id: BindingId, binding: Binding },

    Removed { id: BindingId },

    Cleared { removed: usize },

    /// Polling state after a lifecycle request
    Polling { active: bool },

    /// Simulated key state after a key request
    KeyState { key: String, down: bool },

    /// Subscription confirmed
    Subscribed,

    /// Pushed to subscribed clients
    Event { event: HotkeyEvent },

    /// Error response
    Error { code: String, message: String },
}

impl Response {
    pub fn error(code: &str, message: impl std::fmt::Display) -> Self {
        Self::Error {
            code: code.to_string(),
            message: message.to_string(),
        }
    }
}

/// Full daemon status snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaemonStatus {
    /// Daemon version
    pub version: String,

    /// Whether the polling loop is running
    pub polling: bool,

    /// Number of registered bindings
    pub bindings: usize,

    /// Whether key_down/key_up requests are honored
    pub key_injection: bool,

    /// Uptime in seconds
    pub uptime_secs: u64,
}

impl Default for DaemonStatus {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            polling: false,
            bindings: 0,
            key_injection: false,
            uptime_secs: 0,
        }
    }
}
