use crate::automation::pause;
use crate::core::backend::Keystroke;
use rustautogui::RustAutoGui;
use std::time::Duration;
use windows::Win32::UI::Input::KeyboardAndMouse::{
    SendInput, INPUT, INPUT_0, INPUT_KEYBOARD, KEYBDINPUT, KEYBD_EVENT_FLAGS, KEYEVENTF_KEYUP,
    VIRTUAL_KEY, VK_CONTROL, VK_RETURN,
};

/// Send a keystroke to whichever window has keyboard focus
pub fn send_keystroke(keys: Keystroke) -> Result<(), String> {
    let sequence: Vec<INPUT> = match keys {
        Keystroke::Enter => vec![key_event(VK_RETURN, false), key_event(VK_RETURN, true)],
        Keystroke::Ctrl(letter) => {
            if !letter.is_ascii_alphabetic() {
                return Err(format!("Unsupported shortcut key '{}'", letter));
            }
            let key = VIRTUAL_KEY(letter.to_ascii_uppercase() as u16);
            vec![
                key_event(VK_CONTROL, false),
                key_event(key, false),
                key_event(key, true),
                key_event(VK_CONTROL, true),
            ]
        }
    };

    let sent = unsafe { SendInput(&sequence, std::mem::size_of::<INPUT>() as i32) };
    if sent as usize == sequence.len() {
        Ok(())
    } else {
        Err(format!("SendInput delivered {} of {} events", sent, sequence.len()))
    }
}

fn key_event(key: VIRTUAL_KEY, key_up: bool) -> INPUT {
    INPUT {
        r#type: INPUT_KEYBOARD,
        Anonymous: INPUT_0 {
            ki: KEYBDINPUT {
                wVk: key,
                wScan: 0,
                dwFlags: if key_up { KEYEVENTF_KEYUP } else { KEYBD_EVENT_FLAGS(0) },
                time: 0,
                dwExtraInfo: 0,
            },
        },
    }
}

/// Physical left click at screen coordinates, retried once if the move or click fails
pub fn click_at_screen(gui: &mut RustAutoGui, x: u32, y: u32) -> bool {
    for attempt in 0..2 {
        if gui.move_mouse_to_pos(x, y, 0.0).is_err() {
            if attempt == 0 {
                pause(Duration::from_millis(50));
                continue;
            }
            return false;
        }

        // Short sleep to stabilize cursor
        pause(Duration::from_millis(20));

        if gui.left_click().is_ok() {
            return true;
        }
        if attempt == 0 {
            pause(Duration::from_millis(50));
        }
    }
    false
}
