//! Events published when a bound hotkey actuates
//!
//! The media client subscribes to these; the engine itself only knows
//! about callbacks.

use serde::{Deserialize, Serialize};

use crate::actions::MediaAction;

/// A hotkey was pressed or released
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HotkeyEvent {
    /// The binding's final chord was pressed
    Pressed {
        action: MediaAction,
        /// Binding in its textual form
        binding: String,
    },

    /// The binding's final chord was released
    Released { action: MediaAction, binding: String },
}

impl HotkeyEvent {
    pub fn action(&self) -> MediaAction {
        match self {
            HotkeyEvent::Pressed { action, .. } | HotkeyEvent::Released { action, .. } => *action,
        }
    }
}

impl std::fmt::Display for HotkeyEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HotkeyEvent::Pressed { action, binding } => {
                write!(f, "PRESSED {} ({})", action, binding)
            }
            HotkeyEvent::Released { action, binding } => {
                write!(f, "RELEASED {} ({})", action, binding)
            }
        }
    }
}
