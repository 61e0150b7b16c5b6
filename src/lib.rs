//! global-chords: global hotkey chord engine for media transport controls
//!
//! Bindings such as `"control+alt+p"` or `"control+k, n"` are parsed into
//! chord sequences and matched by polling key state on a background thread.
//! Press and release callbacks fire on the rising and falling edge of the
//! final chord.
//!
//! The daemon binary wires configured hotkeys to [`actions::MediaAction`]s
//! and exposes the engine over a Unix socket.

pub mod actions;
pub mod binding;
pub mod config;
pub mod engine;
pub mod events;
#[cfg(unix)]
pub mod ipc;
pub mod keys;
pub mod lifecycle;

pub use binding::{parse_binding, Binding, BindingError, BindingSpec, Chord};
pub use engine::{BindingId, EngineConfig, EngineError, HotkeyEngine, Registration, RegistryError};
pub use keys::{Key, KeyState, SimulatedKeyboard};
