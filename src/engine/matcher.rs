//! Chord matching against a key-state source
//!
//! Pure functions. A key counts as part of a chord when the chord covers it
//! (see [`Chord::covers`]), so a chord holding `window` accepts either
//! physical Windows key, and a chord holding `left_control` tolerates the
//! generic `control` code the OS reports alongside it.

use crate::binding::Chord;
use crate::keys::{all_keys, Key, KeyState};

/// Every key in the chord is down
pub fn all_pressed<K: KeyState + ?Sized>(chord: &Chord, keys: &K) -> bool {
    chord.keys().all(|k| keys.is_down(k))
}

/// At least one key in the chord is down
pub fn any_pressed<K: KeyState + ?Sized>(chord: &Chord, keys: &K) -> bool {
    chord.keys().any(|k| keys.is_down(k))
}

/// Every key in the chord is up
pub fn all_released<K: KeyState + ?Sized>(chord: &Chord, keys: &K) -> bool {
    !any_pressed(chord, keys)
}

/// A modifier outside the chord is held
pub fn disallowed_modifier_pressed<K: KeyState + ?Sized>(chord: &Chord, keys: &K) -> bool {
    foreign_keys(chord, true).any(|k| keys.is_down(k))
}

/// A non-modifier key outside the chord is held
pub fn disallowed_non_modifier_pressed<K: KeyState + ?Sized>(chord: &Chord, keys: &K) -> bool {
    foreign_keys(chord, false).any(|k| keys.is_down(k))
}

/// Any trackable key outside the chord is held
pub fn foreign_key_pressed<K: KeyState + ?Sized>(chord: &Chord, keys: &K) -> bool {
    disallowed_modifier_pressed(chord, keys) || disallowed_non_modifier_pressed(chord, keys)
}

/// The chord is held and no extra modifier interferes
pub fn is_matched<K: KeyState + ?Sized>(chord: &Chord, keys: &K) -> bool {
    all_pressed(chord, keys) && !disallowed_modifier_pressed(chord, keys)
}

fn foreign_keys(chord: &Chord, modifiers: bool) -> impl Iterator<Item = Key> + '_ {
    all_keys().filter(move |k| k.is_modifier() == modifiers && !chord.covers(*k))
}
