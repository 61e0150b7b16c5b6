//! Key names, virtual key codes, and key-state sources
//!
//! The name table is static; key state is an injected capability so the
//! engine can run against real hardware or a simulated keyboard.

mod state;
mod table;
#[cfg(windows)]
mod win32;

pub use state::{KeySnapshot, KeyState, SimulatedKeyboard};
pub use table::{all_keys, resolve, reverse_lookup, Key, ModifierFamily, VirtualKey};
#[cfg(windows)]
pub use win32::AsyncKeyState;
