//! Static key name table
//!
//! Maps the canonical lowercase key names used in binding strings to
//! Windows virtual key codes, and back. The generic `window` key has no
//! code of its own; it stands for either physical Windows key.

use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

/// A platform virtual key code (Windows VK numbering)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VirtualKey(pub u16);

impl fmt::Display for VirtualKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02X}", self.0)
    }
}

/// Modifier families; a generic modifier covers both of its sided keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModifierFamily {
    Control,
    Shift,
    Alt,
    Window,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Either,
    Left,
    Right,
}

#[derive(Debug, Clone, Copy)]
struct Modifier {
    family: ModifierFamily,
    side: Side,
}

struct KeyEntry {
    name: &'static str,
    codes: &'static [VirtualKey],
    modifier: Option<Modifier>,
}

macro_rules! key_table {
    (@modifier) => { None };
    (@modifier $family:ident $side:ident) => {
        Some(Modifier { family: ModifierFamily::$family, side: Side::$side })
    };
    ($( $name:literal => [$($code:literal),+] $($family:ident $side:ident)? ;)*) => {
        const KEY_TABLE: &[KeyEntry] = &[
            $(KeyEntry {
                name: $name,
                codes: &[$(VirtualKey($code)),+],
                modifier: key_table!(@modifier $($family $side)?),
            },)*
        ];
    };
}

// Modifiers come first so formatted chords read "control+alt+p".
key_table! {
    "control" => [0x11] Control Either;
    "alt" => [0x12] Alt Either;
    "shift" => [0x10] Shift Either;
    "window" => [0x5B, 0x5C] Window Either;
    "left_control" => [0xA2] Control Left;
    "right_control" => [0xA3] Control Right;
    "left_alt" => [0xA4] Alt Left;
    "right_alt" => [0xA5] Alt Right;
    "left_shift" => [0xA0] Shift Left;
    "right_shift" => [0xA1] Shift Right;
    "left_window" => [0x5B] Window Left;
    "right_window" => [0x5C] Window Right;

    "a" => [0x41]; "b" => [0x42]; "c" => [0x43]; "d" => [0x44];
    "e" => [0x45]; "f" => [0x46]; "g" => [0x47]; "h" => [0x48];
    "i" => [0x49]; "j" => [0x4A]; "k" => [0x4B]; "l" => [0x4C];
    "m" => [0x4D]; "n" => [0x4E]; "o" => [0x4F]; "p" => [0x50];
    "q" => [0x51]; "r" => [0x52]; "s" => [0x53]; "t" => [0x54];
    "u" => [0x55]; "v" => [0x56]; "w" => [0x57]; "x" => [0x58];
    "y" => [0x59]; "z" => [0x5A];

    "0" => [0x30]; "1" => [0x31]; "2" => [0x32]; "3" => [0x33];
    "4" => [0x34]; "5" => [0x35]; "6" => [0x36]; "7" => [0x37];
    "8" => [0x38]; "9" => [0x39];

    "f1" => [0x70]; "f2" => [0x71]; "f3" => [0x72]; "f4" => [0x73];
    "f5" => [0x74]; "f6" => [0x75]; "f7" => [0x76]; "f8" => [0x77];
    "f9" => [0x78]; "f10" => [0x79]; "f11" => [0x7A]; "f12" => [0x7B];
    "f13" => [0x7C]; "f14" => [0x7D]; "f15" => [0x7E]; "f16" => [0x7F];
    "f17" => [0x80]; "f18" => [0x81]; "f19" => [0x82]; "f20" => [0x83];
    "f21" => [0x84]; "f22" => [0x85]; "f23" => [0x86]; "f24" => [0x87];

    "backspace" => [0x08];
    "tab" => [0x09];
    "clear" => [0x0C];
    "enter" => [0x0D];
    "pause" => [0x13];
    "caps_lock" => [0x14];
    "escape" => [0x1B];
    "space" => [0x20];
    "page_up" => [0x21];
    "page_down" => [0x22];
    "end" => [0x23];
    "home" => [0x24];
    "left" => [0x25];
    "up" => [0x26];
    "right" => [0x27];
    "down" => [0x28];
    "select" => [0x29];
    "print" => [0x2A];
    "execute" => [0x2B];
    "print_screen" => [0x2C];
    "insert" => [0x2D];
    "delete" => [0x2E];
    "help" => [0x2F];
    "apps" => [0x5D];
    "sleep" => [0x5F];

    "numpad_0" => [0x60]; "numpad_1" => [0x61]; "numpad_2" => [0x62];
    "numpad_3" => [0x63]; "numpad_4" => [0x64]; "numpad_5" => [0x65];
    "numpad_6" => [0x66]; "numpad_7" => [0x67]; "numpad_8" => [0x68];
    "numpad_9" => [0x69];
    "multiply_key" => [0x6A];
    "add_key" => [0x6B];
    "separator_key" => [0x6C];
    "subtract_key" => [0x6D];
    "decimal_key" => [0x6E];
    "divide_key" => [0x6F];
    "num_lock" => [0x90];
    "scroll_lock" => [0x91];

    "browser_back" => [0xA6];
    "browser_forward" => [0xA7];
    "browser_refresh" => [0xA8];
    "browser_stop" => [0xA9];
    "browser_search" => [0xAA];
    "browser_favorites" => [0xAB];
    "browser_home" => [0xAC];
    "volume_mute" => [0xAD];
    "volume_down" => [0xAE];
    "volume_up" => [0xAF];
    "next_track" => [0xB0];
    "previous_track" => [0xB1];
    "stop_media" => [0xB2];
    "play_pause_media" => [0xB3];
    "start_mail" => [0xB4];
    "select_media" => [0xB5];
    "start_application_1" => [0xB6];
    "start_application_2" => [0xB7];

    "semicolon" => [0xBA];
    "equals" => [0xBB];
    "comma" => [0xBC];
    "minus" => [0xBD];
    "period" => [0xBE];
    "slash" => [0xBF];
    "backtick" => [0xC0];
    "open_bracket" => [0xDB];
    "backslash" => [0xDC];
    "close_bracket" => [0xDD];
    "quote" => [0xDE];
}

/// A key from the static table
///
/// Ordering follows table order, which puts modifiers ahead of
/// everything else.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key(u16);

impl Key {
    /// Resolve a key name, ignoring ASCII case
    pub fn from_name(name: &str) -> Option<Key> {
        let lowered = name.to_ascii_lowercase();
        by_name().get(lowered.as_str()).copied()
    }

    fn entry(self) -> &'static KeyEntry {
        &KEY_TABLE[usize::from(self.0)]
    }

    /// Canonical lowercase name
    pub fn name(self) -> &'static str {
        self.entry().name
    }

    /// Virtual key codes this key stands for; the key is down when any is down
    pub fn codes(self) -> &'static [VirtualKey] {
        self.entry().codes
    }

    pub fn is_modifier(self) -> bool {
        self.entry().modifier.is_some()
    }

    pub fn family(self) -> Option<ModifierFamily> {
        self.entry().modifier.map(|m| m.family)
    }

    /// True for `control`, `shift`, `alt` and `window`
    pub fn is_generic_modifier(self) -> bool {
        matches!(self.entry().modifier, Some(m) if m.side == Side::Either)
    }

    /// The generic modifier of this key's family, if it has one
    pub fn generic(self) -> Option<Key> {
        let family = self.family()?;
        all_keys().find(|k| k.is_generic_modifier() && k.family() == Some(family))
    }

    /// Whether holding `other` counts as holding this key.
    ///
    /// A key covers itself. Within a modifier family the generic key and
    /// a sided key cover each other; the two sides never do.
    pub fn covers(self, other: Key) -> bool {
        if self == other {
            return true;
        }
        match (self.family(), other.family()) {
            (Some(a), Some(b)) if a == b => {
                self.is_generic_modifier() || other.is_generic_modifier()
            }
            _ => false,
        }
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({})", self.name())
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Every key in the table, in table order
pub fn all_keys() -> impl Iterator<Item = Key> {
    (0..KEY_TABLE.len()).map(|i| Key(i as u16))
}

/// Resolve a key name to a table key
pub fn resolve(name: &str) -> Option<Key> {
    Key::from_name(name)
}

/// Find the key whose only code is `code`
pub fn reverse_lookup(code: VirtualKey) -> Option<Key> {
    by_code().get(&code).copied()
}

fn by_name() -> &'static HashMap<&'static str, Key> {
    static INDEX: OnceLock<HashMap<&'static str, Key>> = OnceLock::new();
    INDEX.get_or_init(|| all_keys().map(|k| (k.name(), k)).collect())
}

fn by_code() -> &'static HashMap<VirtualKey, Key> {
    static INDEX: OnceLock<HashMap<VirtualKey, Key>> = OnceLock::new();
    INDEX.get_or_init(|| {
        let mut index = HashMap::new();
        for key in all_keys() {
            if let [code] = key.codes() {
                index.entry(*code).or_insert(key);
            }
        }
        index
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn key(name: &str) -> Key {
        Key::from_name(name).unwrap()
    }

    #[test]
    fn test_resolve_is_case_insensitive() {
        assert_eq!(resolve("Control"), resolve("control"));
        assert_eq!(key("F5").codes(), &[VirtualKey(0x74)]);
        assert_eq!(key("P").name(), "p");
    }

    #[test]
    fn test_unknown_name() {
        assert!(resolve("hyper").is_none());
        assert!(resolve("").is_none());
    }

    #[test]
    fn test_window_maps_to_both_keys() {
        assert_eq!(key("window").codes(), &[VirtualKey(0x5B), VirtualKey(0x5C)]);
        assert_eq!(key("left_window").codes(), &[VirtualKey(0x5B)]);
        assert_eq!(key("right_window").codes(), &[VirtualKey(0x5C)]);
    }

    #[test]
    fn test_reverse_lookup() {
        assert_eq!(reverse_lookup(VirtualKey(0x11)), Some(key("control")));
        assert_eq!(reverse_lookup(VirtualKey(0x5B)), Some(key("left_window")));
        assert_eq!(reverse_lookup(VirtualKey(0x41)), Some(key("a")));
        assert_eq!(reverse_lookup(VirtualKey(0xFF)), None);
    }

    #[test]
    fn test_names_are_unique_and_grammatical() {
        let mut seen = HashSet::new();
        for k in all_keys() {
            assert!(seen.insert(k.name()), "duplicate name {}", k.name());
            assert!(k
                .name()
                .bytes()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_'));
        }
    }

    #[test]
    fn test_modifier_families() {
        assert!(key("control").is_generic_modifier());
        assert!(!key("left_control").is_generic_modifier());
        assert!(!key("p").is_modifier());
        assert_eq!(key("right_alt").generic(), Some(key("alt")));
        assert_eq!(key("p").generic(), None);
    }

    #[test]
    fn test_covers() {
        assert!(key("window").covers(key("left_window")));
        assert!(key("left_window").covers(key("window")));
        assert!(!key("left_window").covers(key("right_window")));
        assert!(!key("control").covers(key("shift")));
        assert!(key("p").covers(key("p")));
        assert!(!key("p").covers(key("q")));
    }

    #[test]
    fn test_modifiers_sort_first() {
        assert!(key("shift") < key("a"));
        assert!(key("control") < key("alt"));
    }
}
