//! Hotkey engine
//!
//! - `matcher`: pure chord checks against key state
//! - `progress`: per-binding sequence state machine
//! - `registry`: registered bindings shared with the polling thread
//! - `poller`: the polling loop and its lifecycle

pub mod matcher;
mod poller;
mod progress;
mod registry;

pub use poller::{EngineConfig, EngineError, HotkeyEngine};
pub use progress::{Progress, ProgressError, Stage, Transition};
pub use registry::{
    BindingId, BindingRegistry, BindingSnapshot, Callback, Phase, Registration, RegistryError,
};
