//! Binding specifications as they appear in config files and IPC requests
//!
//! The textual form is canonical. A pre-split list of chords is still
//! accepted; the old flat list of modifiers plus key is refused with a
//! message naming its replacement.

use serde::{Deserialize, Serialize};

use super::parser::{parse_binding, parse_chord, Binding, BindingError};

/// A binding as supplied by the user, before validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BindingSpec {
    /// `"control+a, b"`
    Text(String),
    /// `[["control", "a"], ["b"]]`
    Chords(Vec<Vec<String>>),
    /// `["control", "alt", "p"]`, no longer accepted
    Flat(Vec<String>),
}

impl BindingSpec {
    /// Validate and resolve into a [`Binding`]
    pub fn resolve(&self) -> Result<Binding, BindingError> {
        match self {
            Self::Text(text) => parse_binding(text),
            Self::Chords(chords) => {
                let display = chords
                    .iter()
                    .map(|chord| chord.join("+"))
                    .collect::<Vec<_>>()
                    .join(",");
                let chords = chords
                    .iter()
                    .enumerate()
                    .map(|(index, names)| {
                        parse_chord(&display, index, names.iter().map(String::as_str))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Binding::new(chords).ok_or_else(|| BindingError::InvalidSyntax {
                    spec: display,
                    reason: "binding is empty".to_string(),
                })
            }
            Self::Flat(keys) => Err(BindingError::DeprecatedSyntax {
                legacy: keys.clone(),
                suggested: retrofit_legacy(keys),
            }),
        }
    }

    /// True for an empty text spec, which config files use for "no hotkey"
    pub fn is_unset(&self) -> bool {
        matches!(self, Self::Text(text) if text.trim().is_empty())
    }
}

impl From<&str> for BindingSpec {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<&Binding> for BindingSpec {
    fn from(binding: &Binding) -> Self {
        Self::Text(binding.to_string())
    }
}

/// Convert a legacy flat key list to the string form.
///
/// Never applied implicitly; callers migrating old settings opt in.
pub fn retrofit_legacy<S: AsRef<str>>(keys: &[S]) -> String {
    keys.iter()
        .map(|k| k.as_ref().trim().to_ascii_lowercase())
        .collect::<Vec<_>>()
        .join("+")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_form() {
        let spec: BindingSpec = serde_json::from_str(r#""control+alt+p""#).unwrap();
        assert_eq!(spec, BindingSpec::from("control+alt+p"));
        assert_eq!(spec.resolve().unwrap().to_string(), "control+alt+p");
    }

    #[test]
    fn test_pre_split_form_is_accepted() {
        let spec: BindingSpec = serde_json::from_str(r#"[["control","a"],["b"]]"#).unwrap();
        assert!(matches!(spec, BindingSpec::Chords(_)));
        assert_eq!(spec.resolve().unwrap(), parse_binding("control+a,b").unwrap());
    }

    #[test]
    fn test_pre_split_form_validates_keys() {
        let spec = BindingSpec::Chords(vec![vec!["control".into(), "hyper".into()]]);
        assert!(matches!(spec.resolve(), Err(BindingError::UnknownKey { .. })));

        let spec = BindingSpec::Chords(vec![vec!["a".into()], vec![]]);
        assert!(matches!(spec.resolve(), Err(BindingError::InvalidSyntax { .. })));

        let spec = BindingSpec::Chords(vec![]);
        assert!(matches!(spec.resolve(), Err(BindingError::InvalidSyntax { .. })));
    }

    #[test]
    fn test_flat_form_is_deprecated() {
        let spec: BindingSpec = serde_json::from_str(r#"["Control","alt","p"]"#).unwrap();
        let err = spec.resolve().unwrap_err();
        assert_eq!(err.code(), "deprecated_syntax");
        match err {
            BindingError::DeprecatedSyntax { suggested, .. } => {
                assert_eq!(suggested, "control+alt+p");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_deprecated_message_names_replacement() {
        let err = BindingSpec::Flat(vec!["control".into(), "p".into()])
            .resolve()
            .unwrap_err();
        assert!(err.to_string().contains("\"control+p\""));
    }

    #[test]
    fn test_retrofit_is_explicit() {
        let legacy = ["control", " shift", "F5"];
        let text = retrofit_legacy(&legacy);
        assert_eq!(text, "control+shift+f5");
        assert!(parse_binding(&text).is_ok());
    }

    #[test]
    fn test_unset() {
        assert!(BindingSpec::from("").is_unset());
        assert!(!BindingSpec::from("p").is_unset());
    }
}
