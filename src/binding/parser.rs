//! Binding grammar
//!
//! ```text
//! binding := chord ("," chord)*
//! chord   := keyname ("+" keyname)*
//! keyname := [a-z0-9_]+        (case-insensitive)
//! ```

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::keys::Key;

/// Errors produced while turning user input into a [`Binding`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BindingError {
    #[error("invalid binding {spec:?}: {reason}")]
    InvalidSyntax { spec: String, reason: String },

    #[error("unknown key name {name:?}")]
    UnknownKey { name: String },

    #[error(
        "hotkeys are no longer given as a list; {legacy:?} should now be written as \"{suggested}\""
    )]
    DeprecatedSyntax {
        legacy: Vec<String>,
        suggested: String,
    },
}

impl BindingError {
    fn invalid(spec: &str, reason: impl Into<String>) -> Self {
        Self::InvalidSyntax {
            spec: spec.to_string(),
            reason: reason.into(),
        }
    }

    /// Stable identifier for IPC error responses
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidSyntax { .. } => "invalid_syntax",
            Self::UnknownKey { .. } => "unknown_key",
            Self::DeprecatedSyntax { .. } => "deprecated_syntax",
        }
    }
}

/// Keys that must all be held at once
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Chord {
    keys: BTreeSet<Key>,
}

impl Chord {
    /// Build a chord from already-resolved keys; `None` when empty
    pub fn new(keys: impl IntoIterator<Item = Key>) -> Option<Self> {
        let keys: BTreeSet<Key> = keys.into_iter().collect();
        (!keys.is_empty()).then_some(Self { keys })
    }

    pub fn keys(&self) -> impl Iterator<Item = Key> + '_ {
        self.keys.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn contains(&self, key: Key) -> bool {
        self.keys.contains(&key)
    }

    /// Whether `key` is logically part of this chord (see [`Key::covers`])
    pub fn covers(&self, key: Key) -> bool {
        self.keys.iter().any(|k| k.covers(key))
    }
}

impl fmt::Display for Chord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, key) in self.keys.iter().enumerate() {
            if i > 0 {
                f.write_str("+")?;
            }
            f.write_str(key.name())?;
        }
        Ok(())
    }
}

/// An ordered, non-empty sequence of chords
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Binding {
    chords: Vec<Chord>,
}

impl Binding {
    /// Build a binding from chords; `None` when there are none
    pub fn new(chords: Vec<Chord>) -> Option<Self> {
        (!chords.is_empty()).then_some(Self { chords })
    }

    pub fn chords(&self) -> &[Chord] {
        &self.chords
    }

    /// Number of chords
    pub fn len(&self) -> usize {
        self.chords.len()
    }

    /// True when more than one chord must be pressed in order
    pub fn is_sequence(&self) -> bool {
        self.chords.len() > 1
    }
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, chord) in self.chords.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{chord}")?;
        }
        Ok(())
    }
}

impl FromStr for Binding {
    type Err = BindingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_binding(s)
    }
}

impl Serialize for Binding {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Binding {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        parse_binding(&text).map_err(serde::de::Error::custom)
    }
}

/// Parse a textual binding such as `"control+alt+p"` or `"control+a, b"`
pub fn parse_binding(spec: &str) -> Result<Binding, BindingError> {
    if spec.trim().is_empty() {
        return Err(BindingError::invalid(spec, "binding is empty"));
    }

    let chords = spec
        .split(',')
        .enumerate()
        .map(|(index, chord)| parse_chord(spec, index, chord.split('+')))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Binding { chords })
}

/// Resolve one chord's key names. `spec` is only used in error messages.
pub(super) fn parse_chord<'a>(
    spec: &str,
    index: usize,
    names: impl IntoIterator<Item = &'a str>,
) -> Result<Chord, BindingError> {
    let mut keys = BTreeSet::new();

    for raw in names {
        let name = raw.trim().to_ascii_lowercase();
        if name.is_empty() {
            return Err(BindingError::invalid(
                spec,
                format!("chord {} has an empty key name", index + 1),
            ));
        }
        if !name
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_')
        {
            return Err(BindingError::invalid(
                spec,
                format!("key name {name:?} may only contain letters, digits and '_'"),
            ));
        }

        let key = Key::from_name(&name).ok_or(BindingError::UnknownKey { name })?;
        keys.insert(key);
    }

    if keys.is_empty() {
        return Err(BindingError::invalid(
            spec,
            format!("chord {} has no keys", index + 1),
        ));
    }

    Ok(Chord { keys })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(name: &str) -> Key {
        Key::from_name(name).unwrap()
    }

    #[test]
    fn test_parse_single_chord() {
        let binding = parse_binding("control+alt+shift+p").unwrap();
        assert_eq!(binding.len(), 1);
        assert!(!binding.is_sequence());

        let chord = &binding.chords()[0];
        assert_eq!(chord.len(), 4);
        for name in ["control", "alt", "shift", "p"] {
            assert!(chord.contains(key(name)), "missing {name}");
        }
    }

    #[test]
    fn test_parse_sequence() {
        let binding = parse_binding("control+a, b").unwrap();
        assert!(binding.is_sequence());
        assert_eq!(binding.chords()[0], Chord::new([key("control"), key("a")]).unwrap());
        assert_eq!(binding.chords()[1], Chord::new([key("b")]).unwrap());
    }

    #[test]
    fn test_parse_ignores_case_and_whitespace() {
        let a = parse_binding(" Control + ALT+p ").unwrap();
        let b = parse_binding("control+alt+p").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_key_order_within_chord_is_irrelevant() {
        assert_eq!(
            parse_binding("p+alt+control").unwrap(),
            parse_binding("control+alt+p").unwrap()
        );
        assert_ne!(
            parse_binding("a,b").unwrap(),
            parse_binding("b,a").unwrap()
        );
    }

    #[test]
    fn test_format_round_trip() {
        for spec in ["control+alt+shift+p", "control+a,b", "f5", "window+left,window+right"] {
            let binding = parse_binding(spec).unwrap();
            let formatted = binding.to_string();
            assert_eq!(parse_binding(&formatted).unwrap(), binding, "{spec}");
        }
        assert_eq!(parse_binding("P+Alt+CONTROL").unwrap().to_string(), "control+alt+p");
    }

    #[test]
    fn test_empty_spec() {
        let err = parse_binding("   ").unwrap_err();
        assert!(matches!(err, BindingError::InvalidSyntax { .. }));
        assert_eq!(err.code(), "invalid_syntax");
    }

    #[test]
    fn test_empty_chord() {
        for spec in ["control+a,", ",b", "control++a", "a,,b"] {
            let err = parse_binding(spec).unwrap_err();
            assert!(matches!(err, BindingError::InvalidSyntax { .. }), "{spec}: {err}");
        }
    }

    #[test]
    fn test_bad_characters() {
        let err = parse_binding("control+left window").unwrap_err();
        assert!(matches!(err, BindingError::InvalidSyntax { .. }));
        let err = parse_binding("control+;").unwrap_err();
        assert!(matches!(err, BindingError::InvalidSyntax { .. }));
    }

    #[test]
    fn test_unknown_key() {
        let err = parse_binding("control+hyper").unwrap_err();
        assert_eq!(
            err,
            BindingError::UnknownKey {
                name: "hyper".to_string()
            }
        );
        assert_eq!(err.code(), "unknown_key");
    }

    #[test]
    fn test_serde_uses_text_form() {
        let binding = parse_binding("control+a,b").unwrap();
        let json = serde_json::to_string(&binding).unwrap();
        assert_eq!(json, r#""control+a,b""#);

        let back: Binding = serde_json::from_str(&json).unwrap();
        assert_eq!(back, binding);
        assert!(serde_json::from_str::<Binding>(r#""control+nope""#).is_err());
    }
}
