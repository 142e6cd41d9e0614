//! Android `KEYCODE_*` constants for the keys this client injects.
//!
//! Values are the integer constants from `android.view.KeyEvent`.

pub const KEYCODE_HOME: u32 = 3;
pub const KEYCODE_BACK: u32 = 4;
pub const KEYCODE_DPAD_UP: u32 = 19;
pub const KEYCODE_DPAD_DOWN: u32 = 20;
pub const KEYCODE_DPAD_LEFT: u32 = 21;
pub const KEYCODE_DPAD_RIGHT: u32 = 22;
pub const KEYCODE_DPAD_CENTER: u32 = 23;
pub const KEYCODE_VOLUME_UP: u32 = 24;
pub const KEYCODE_VOLUME_DOWN: u32 = 25;
pub const KEYCODE_POWER: u32 = 26;
pub const KEYCODE_SEARCH: u32 = 84;
pub const KEYCODE_MEDIA_PLAY_PAUSE: u32 = 85;
pub const KEYCODE_VOLUME_MUTE: u32 = 164;

/// Human-readable name for logging; falls back to the raw number.
pub fn name(keycode: u32) -> &'static str {
    match keycode {
        KEYCODE_HOME => "HOME",
        KEYCODE_BACK => "BACK",
        KEYCODE_DPAD_UP => "DPAD_UP",
        KEYCODE_DPAD_DOWN => "DPAD_DOWN",
        KEYCODE_DPAD_LEFT => "DPAD_LEFT",
        KEYCODE_DPAD_RIGHT => "DPAD_RIGHT",
        KEYCODE_DPAD_CENTER => "DPAD_CENTER",
        KEYCODE_VOLUME_UP => "VOLUME_UP",
        KEYCODE_VOLUME_DOWN => "VOLUME_DOWN",
        KEYCODE_POWER => "POWER",
        KEYCODE_SEARCH => "SEARCH",
        KEYCODE_MEDIA_PLAY_PAUSE => "MEDIA_PLAY_PAUSE",
        KEYCODE_VOLUME_MUTE => "VOLUME_MUTE",
        _ => "UNKNOWN",
    }
}
