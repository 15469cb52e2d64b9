//! Synthesized keyboard input through `SendInput`.

use super::explorer::{self, launch_and_find};
use super::types::ExplorerWindow;
use crate::tiers::{KeystrokeSession, TierContext, WindowOpener};
use crate::{AutomationError, FolderPath, WindowRect};
use tracing::debug;
use windows::Win32::UI::Input::KeyboardAndMouse::{
    SendInput, INPUT, INPUT_0, INPUT_KEYBOARD, KEYBDINPUT, KEYBD_EVENT_FLAGS, KEYEVENTF_KEYUP,
    KEYEVENTF_UNICODE, VIRTUAL_KEY, VK_CONTROL, VK_RETURN,
};

const VK_T: VIRTUAL_KEY = VIRTUAL_KEY(0x54);
const VK_L: VIRTUAL_KEY = VIRTUAL_KEY(0x4C);

fn key_input(vk: VIRTUAL_KEY, scan: u16, flags: KEYBD_EVENT_FLAGS) -> INPUT {
    INPUT {
        r#type: INPUT_KEYBOARD,
        Anonymous: INPUT_0 {
            ki: KEYBDINPUT {
                wVk: vk,
                wScan: scan,
                dwFlags: flags,
                time: 0,
                dwExtraInfo: 0,
            },
        },
    }
}

fn send(inputs: &[INPUT]) -> Result<(), AutomationError> {
    let sent = unsafe { SendInput(inputs, std::mem::size_of::<INPUT>() as i32) };
    if sent as usize != inputs.len() {
        return Err(AutomationError::PlatformError(format!(
            "SendInput delivered {sent} of {} events",
            inputs.len()
        )));
    }
    Ok(())
}

fn send_combo(modifier: VIRTUAL_KEY, key: VIRTUAL_KEY) -> Result<(), AutomationError> {
    send(&[
        key_input(modifier, 0, KEYBD_EVENT_FLAGS(0)),
        key_input(key, 0, KEYBD_EVENT_FLAGS(0)),
        key_input(key, 0, KEYEVENTF_KEYUP),
        key_input(modifier, 0, KEYEVENTF_KEYUP),
    ])
}

fn press(key: VIRTUAL_KEY) -> Result<(), AutomationError> {
    send(&[
        key_input(key, 0, KEYBD_EVENT_FLAGS(0)),
        key_input(key, 0, KEYEVENTF_KEYUP),
    ])
}

/// Each UTF-16 unit as a Unicode key down/up pair, so the keyboard layout
/// does not matter.
fn type_unicode(text: &str) -> Result<(), AutomationError> {
    let inputs: Vec<INPUT> = text
        .encode_utf16()
        .flat_map(|unit| {
            [
                key_input(VIRTUAL_KEY(0), unit, KEYEVENTF_UNICODE),
                key_input(VIRTUAL_KEY(0), unit, KEYEVENTF_UNICODE | KEYEVENTF_KEYUP),
            ]
        })
        .collect();
    if inputs.is_empty() {
        return Ok(());
    }
    send(&inputs)
}

/// Launches the first folder and brings its window to the foreground.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeystrokeWindowOpener;

impl WindowOpener for KeystrokeWindowOpener {
    type Session = InputSession;

    fn open(&self, first: &FolderPath, ctx: &TierContext) -> Result<InputSession, AutomationError> {
        let window = launch_and_find(first, ctx)?;
        if let Err(e) = explorer::bring_to_foreground(window) {
            debug!("Initial foreground request refused: {e}");
        }
        Ok(InputSession { window })
    }
}

pub struct InputSession {
    window: ExplorerWindow,
}

impl KeystrokeSession for InputSession {
    fn is_foreground(&self) -> bool {
        explorer::is_foreground(self.window)
    }

    fn bring_to_foreground(&self) -> Result<(), AutomationError> {
        explorer::bring_to_foreground(self.window)
    }

    fn send_new_tab(&self) -> Result<(), AutomationError> {
        send_combo(VK_CONTROL, VK_T)
    }

    fn focus_address(&self) -> Result<(), AutomationError> {
        send_combo(VK_CONTROL, VK_L)
    }

    fn type_text(&self, text: &str) -> Result<(), AutomationError> {
        type_unicode(text)
    }

    fn press_enter(&self) -> Result<(), AutomationError> {
        press(VK_RETURN)
    }

    fn apply_rect(&self, rect: WindowRect) -> Result<(), AutomationError> {
        explorer::move_window(self.window, rect)
    }
}
