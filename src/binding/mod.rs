//! Hotkey bindings: chords, sequences, and the textual grammar

mod parser;
mod spec;

pub use parser::{parse_binding, Binding, BindingError, Chord};
pub use spec::{retrofit_legacy, BindingSpec};
