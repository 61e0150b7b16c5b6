//! Key-state sources
//!
//! The engine never talks to the OS directly. It polls a [`KeyState`]
//! implementation once per tick and evaluates every binding against the
//! resulting [`KeySnapshot`].

use std::collections::HashSet;

use parking_lot::RwLock;
use tracing::trace;

use super::table::{all_keys, Key, VirtualKey};

/// Point-in-time query of physical key state, independent of window focus
pub trait KeyState {
    /// Whether the key with this virtual code is currently held
    fn is_key_down(&self, code: VirtualKey) -> bool;

    /// Whether any of the codes behind `key` is held
    fn is_down(&self, key: Key) -> bool {
        key.codes().iter().any(|&code| self.is_key_down(code))
    }
}

impl<F> KeyState for F
where
    F: Fn(VirtualKey) -> bool,
{
    fn is_key_down(&self, code: VirtualKey) -> bool {
        self(code)
    }
}

/// Key state sampled once, so every binding in a tick sees the same keyboard
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeySnapshot {
    down: HashSet<VirtualKey>,
}

impl KeySnapshot {
    /// Query every trackable code from `source`
    pub fn capture<S: KeyState + ?Sized>(source: &S) -> Self {
        let mut queried = HashSet::new();
        let mut down = HashSet::new();
        for code in all_keys().flat_map(|k| k.codes().iter().copied()) {
            if queried.insert(code) && source.is_key_down(code) {
                down.insert(code);
            }
        }
        if !down.is_empty() {
            trace!(count = down.len(), "keys down");
        }
        Self { down }
    }

    pub fn is_empty(&self) -> bool {
        self.down.is_empty()
    }
}

impl KeyState for KeySnapshot {
    fn is_key_down(&self, code: VirtualKey) -> bool {
        self.down.contains(&code)
    }
}

/// In-memory keyboard driven by calls instead of hardware
///
/// Pressing a sided modifier also holds its generic code, the way the OS
/// reports `VK_CONTROL` while `VK_LCONTROL` is down.
#[derive(Debug, Default)]
pub struct SimulatedKeyboard {
    down: RwLock<HashSet<VirtualKey>>,
}

impl SimulatedKeyboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold `key`. `window` presses the left Windows key.
    pub fn press(&self, key: Key) {
        let mut down = self.down.write();
        if let Some(&code) = key.codes().first() {
            down.insert(code);
        }
        if let Some(generic) = key.generic() {
            if generic != key && generic.codes().len() == 1 {
                down.insert(generic.codes()[0]);
            }
        }
    }

    /// Let go of `key`
    pub fn release(&self, key: Key) {
        let mut down = self.down.write();
        for code in key.codes() {
            down.remove(code);
        }

        let Some(generic) = key.generic() else {
            return;
        };
        if generic == key {
            // Releasing the generic modifier lets go of both sides too.
            for sided in all_keys().filter(|k| k.family() == key.family()) {
                for code in sided.codes() {
                    down.remove(code);
                }
            }
        } else if generic.codes().len() == 1 {
            let sibling_held = all_keys()
                .filter(|k| k.family() == key.family() && !k.is_generic_modifier() && *k != key)
                .any(|k| k.codes().iter().any(|c| down.contains(c)));
            if !sibling_held {
                for code in generic.codes() {
                    down.remove(code);
                }
            }
        }
    }

    pub fn press_all(&self, keys: &[Key]) {
        for &key in keys {
            self.press(key);
        }
    }

    pub fn release_all(&self) {
        self.down.write().clear();
    }

    /// Names of the keys whose codes are all held
    pub fn held(&self) -> Vec<Key> {
        let down = self.down.read();
        all_keys()
            .filter(|k| k.codes().len() == 1 && down.contains(&k.codes()[0]))
            .collect()
    }
}

impl KeyState for SimulatedKeyboard {
    fn is_key_down(&self, code: VirtualKey) -> bool {
        self.down.read().contains(&code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(name: &str) -> Key {
        Key::from_name(name).unwrap()
    }

    #[test]
    fn test_press_and_release() {
        let keyboard = SimulatedKeyboard::new();
        keyboard.press(key("p"));
        assert!(keyboard.is_down(key("p")));
        keyboard.release(key("p"));
        assert!(!keyboard.is_down(key("p")));
    }

    #[test]
    fn test_sided_modifier_holds_generic() {
        let keyboard = SimulatedKeyboard::new();
        keyboard.press(key("left_control"));
        assert!(keyboard.is_down(key("control")));
        assert!(!keyboard.is_down(key("right_control")));

        keyboard.press(key("right_control"));
        keyboard.release(key("left_control"));
        assert!(keyboard.is_down(key("control")));

        keyboard.release(key("right_control"));
        assert!(!keyboard.is_down(key("control")));
    }

    #[test]
    fn test_window_either_side() {
        let keyboard = SimulatedKeyboard::new();
        keyboard.press(key("right_window"));
        assert!(keyboard.is_down(key("window")));
        assert!(!keyboard.is_down(key("left_window")));

        keyboard.release(key("window"));
        assert!(!keyboard.is_down(key("right_window")));
    }

    #[test]
    fn test_release_generic_releases_sides() {
        let keyboard = SimulatedKeyboard::new();
        keyboard.press(key("left_shift"));
        keyboard.release(key("shift"));
        assert!(!keyboard.is_down(key("left_shift")));
        assert!(keyboard.held().is_empty());
    }

    #[test]
    fn test_snapshot_is_stable() {
        let keyboard = SimulatedKeyboard::new();
        keyboard.press_all(&[key("control"), key("a")]);
        let snapshot = KeySnapshot::capture(&keyboard);
        keyboard.release_all();

        assert!(snapshot.is_down(key("control")));
        assert!(snapshot.is_down(key("a")));
        assert!(!snapshot.is_down(key("b")));
        assert!(KeySnapshot::capture(&keyboard).is_empty());
    }

    #[test]
    fn test_closure_source() {
        let only_p = |code: VirtualKey| code == VirtualKey(0x50);
        assert!(only_p.is_down(key("p")));
        assert!(!only_p.is_down(key("q")));
        assert!(KeySnapshot::capture(&only_p).is_down(key("p")));
    }
}
