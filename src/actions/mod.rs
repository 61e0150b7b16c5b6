//! Media transport actions and their hotkey wiring
//!
//! Each configured hotkey maps to one [`MediaAction`]. Actuating the hotkey
//! publishes a [`HotkeyEvent`] for the media client to act on.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::binding::Binding;
use crate::config::HotkeyConfig;
use crate::engine::{HotkeyEngine, Registration};
use crate::events::HotkeyEvent;

/// Transport controls a hotkey can trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaAction {
    PlayPause,
    Play,
    Pause,
    NextTrack,
    PreviousTrack,
    VolumeUp,
    VolumeDown,
    MuteUnmute,
    Mute,
    Unmute,
    SeekForward,
    SeekBackward,
    SaveTrack,
    RemoveTrack,
    ToggleShuffle,
    ToggleRepeat,
}

impl MediaAction {
    /// Human-readable label for settings screens
    pub fn display_name(&self) -> &'static str {
        match self {
            MediaAction::PlayPause => "Play/Pause",
            MediaAction::Play => "Play",
            MediaAction::Pause => "Pause",
            MediaAction::NextTrack => "Next Track",
            MediaAction::PreviousTrack => "Previous Track",
            MediaAction::VolumeUp => "Volume Up",
            MediaAction::VolumeDown => "Volume Down",
            MediaAction::MuteUnmute => "Mute/Unmute",
            MediaAction::Mute => "Mute",
            MediaAction::Unmute => "Unmute",
            MediaAction::SeekForward => "Seek Forward",
            MediaAction::SeekBackward => "Seek Backward",
            MediaAction::SaveTrack => "Save Track",
            MediaAction::RemoveTrack => "Remove Track",
            MediaAction::ToggleShuffle => "Toggle Shuffle",
            MediaAction::ToggleRepeat => "Toggle Repeat",
        }
    }
}

impl std::fmt::Display for MediaAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Registration that publishes press and release events for `action`
pub fn bind_action(
    binding: Binding,
    action: MediaAction,
    actuate_on_partial_release: bool,
    events: broadcast::Sender<HotkeyEvent>,
) -> Registration {
    let text = binding.to_string();
    let (press_tx, press_text) = (events.clone(), text.clone());
    let (release_tx, release_text) = (events, text);

    Registration::new(binding)
        .on_press(move |_| {
            // No subscribers is fine; the event is simply dropped.
            let _ = press_tx.send(HotkeyEvent::Pressed {
                action,
                binding: press_text.clone(),
            });
            Ok(())
        })
        .on_release(move |_| {
            let _ = release_tx.send(HotkeyEvent::Released {
                action,
                binding: release_text.clone(),
            });
            Ok(())
        })
        .actuate_on_partial_release(actuate_on_partial_release)
}

/// Register every configured hotkey, skipping disabled, unset and invalid ones.
///
/// Returns how many were registered.
pub fn register_configured(
    engine: &HotkeyEngine,
    hotkeys: &[HotkeyConfig],
    events: &broadcast::Sender<HotkeyEvent>,
) -> usize {
    let mut registered = 0;

    for hotkey in hotkeys {
        if !hotkey.enabled {
            debug!(action = %hotkey.action, "hotkey disabled");
            continue;
        }
        if hotkey.is_unset() {
            continue;
        }

        let binding = match hotkey.binding.resolve() {
            Ok(binding) => binding,
            Err(e) => {
                warn!(action = %hotkey.action, error = %e, "skipping invalid hotkey");
                continue;
            }
        };

        let registration = bind_action(
            binding,
            hotkey.action,
            hotkey.actuate_on_partial_release,
            events.clone(),
        );
        match engine.register(registration) {
            Ok(id) => {
                info!(%id, action = %hotkey.action, "hotkey registered");
                registered += 1;
            }
            Err(e) => {
                warn!(action = %hotkey.action, error = %e, "hotkey not registered");
            }
        }
    }

    registered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::{parse_binding, BindingSpec};
    use crate::keys::{Key, SimulatedKeyboard};
    use std::sync::Arc;

    fn hotkey(action: MediaAction, binding: BindingSpec) -> HotkeyConfig {
        HotkeyConfig {
            action,
            binding,
            actuate_on_partial_release: true,
            enabled: true,
        }
    }

    #[test]
    fn test_display_names() {
        assert_eq!(MediaAction::PlayPause.display_name(), "Play/Pause");
        assert_eq!(MediaAction::SeekBackward.to_string(), "Seek Backward");
    }

    #[test]
    fn test_action_serialization() {
        let json = serde_json::to_string(&MediaAction::PreviousTrack).unwrap();
        assert_eq!(json, r#""previous_track""#);
    }

    #[test]
    fn test_bind_action_publishes_events() {
        let keyboard = Arc::new(SimulatedKeyboard::new());
        let engine = HotkeyEngine::with_source(keyboard.clone(), Default::default());
        let (tx, mut rx) = broadcast::channel(8);

        let binding = parse_binding("control+alt+p").unwrap();
        engine
            .register(bind_action(binding, MediaAction::PlayPause, true, tx))
            .unwrap();

        for name in ["control", "alt", "p"] {
            keyboard.press(Key::from_name(name).unwrap());
        }
        engine.tick();
        keyboard.release_all();
        engine.tick();

        assert_eq!(
            rx.try_recv().unwrap(),
            HotkeyEvent::Pressed {
                action: MediaAction::PlayPause,
                binding: "control+alt+p".to_string()
            }
        );
        assert!(matches!(rx.try_recv().unwrap(), HotkeyEvent::Released { .. }));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_register_configured_skips_bad_entries() {
        let engine = HotkeyEngine::new(SimulatedKeyboard::new());
        let (tx, _rx) = broadcast::channel(8);
        let hotkeys = vec![
            hotkey(MediaAction::PlayPause, BindingSpec::from("control+alt+p")),
            hotkey(MediaAction::Play, BindingSpec::from("")),
            hotkey(MediaAction::Pause, BindingSpec::from("control+nope")),
            hotkey(
                MediaAction::Mute,
                BindingSpec::Flat(vec!["control".into(), "m".into()]),
            ),
            hotkey(MediaAction::NextTrack, BindingSpec::from("p+alt+control")),
            hotkey(
                MediaAction::VolumeUp,
                BindingSpec::Chords(vec![vec!["control".into(), "up".into()]]),
            ),
        ];

        assert_eq!(register_configured(&engine, &hotkeys, &tx), 2);
        assert_eq!(engine.bindings().len(), 2);
    }

    #[test]
    fn test_register_configured_skips_disabled() {
        let engine = HotkeyEngine::new(SimulatedKeyboard::new());
        let (tx, _rx) = broadcast::channel(8);
        let mut shuffle = hotkey(MediaAction::ToggleShuffle, BindingSpec::from("control+s"));
        shuffle.enabled = false;
        let hotkeys = vec![
            shuffle,
            hotkey(MediaAction::ToggleRepeat, BindingSpec::from("control+r")),
        ];

        assert_eq!(register_configured(&engine, &hotkeys, &tx), 1);
        assert!(!engine.is_registered(&parse_binding("control+s").unwrap()));
        assert!(engine.is_registered(&parse_binding("control+r").unwrap()));
    }
}
