use crate::automation::pause;
use crate::core::backend::{Rect, TargetWindow};
use std::time::{Duration, Instant};
use windows::{
    core::PCSTR,
    Win32::Foundation::{HWND, RECT},
    Win32::UI::WindowsAndMessaging::{
        FindWindowA, GetWindowRect, IsIconic, IsWindow, SetForegroundWindow, ShowWindow, SW_RESTORE,
    },
};

const WINDOW_POLL: Duration = Duration::from_millis(250);

/// Find a top-level window by class name and title
pub fn find_target_window(target: &TargetWindow) -> Option<HWND> {
    let class = nul_terminated(&target.class_name);
    let title = nul_terminated(&target.title);
    unsafe {
        let hwnd = FindWindowA(PCSTR(class.as_ptr()), PCSTR(title.as_ptr()));

        if hwnd.0 != 0 && IsWindow(hwnd).as_bool() {
            Some(hwnd)
        } else {
            None
        }
    }
}

/// Poll for the target window until it shows up or `timeout` elapses
pub fn wait_for_window(target: &TargetWindow, timeout: Duration) -> Option<HWND> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(hwnd) = find_target_window(target) {
            return Some(hwnd);
        }
        if Instant::now() >= deadline {
            return None;
        }
        pause(WINDOW_POLL);
    }
}

/// Check if window handle is valid
pub fn is_window_valid(hwnd: HWND) -> bool {
    unsafe { IsWindow(hwnd).as_bool() }
}

pub fn get_window_rect(hwnd: HWND) -> Option<Rect> {
    unsafe {
        let mut rect = RECT::default();
        if GetWindowRect(hwnd, &mut rect).is_ok() {
            Some(from_win_rect(rect))
        } else {
            None
        }
    }
}

/// Restore a minimized window and bring it to the foreground so input reaches it
pub fn bring_to_front(hwnd: HWND) -> bool {
    unsafe {
        if IsIconic(hwnd).as_bool() {
            let _ = ShowWindow(hwnd, SW_RESTORE);
        }
        SetForegroundWindow(hwnd).as_bool()
    }
}

pub fn from_win_rect(rect: RECT) -> Rect {
    Rect {
        left: rect.left,
        top: rect.top,
        right: rect.right,
        bottom: rect.bottom,
    }
}

fn nul_terminated(text: &str) -> Vec<u8> {
    let mut bytes = text.as_bytes().to_vec();
    bytes.push(0);
    bytes
}
