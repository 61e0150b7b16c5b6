//! Live key state on Windows via `GetAsyncKeyState`

use windows::Win32::UI::Input::KeyboardAndMouse::GetAsyncKeyState;

use super::state::KeyState;
use super::table::VirtualKey;

/// Reads the physical keyboard regardless of which window has focus
#[derive(Debug, Default, Clone, Copy)]
pub struct AsyncKeyState;

impl KeyState for AsyncKeyState {
    fn is_key_down(&self, code: VirtualKey) -> bool {
        // Most significant bit set: the key is down right now.
        unsafe { GetAsyncKeyState(i32::from(code.0)) < 0 }
    }
}
