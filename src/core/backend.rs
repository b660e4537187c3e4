//! The UI automation boundary.
//!
//! Everything above this trait is platform independent. Handles returned by a
//! backend may go stale after any repaint, so callers re-resolve the window
//! before each control operation instead of keeping them around.

use crate::error::{BridgeError, Result};
use image::RgbImage;
use std::path::Path;
use std::time::Duration;

/// Top-level window the bridge drives, matched by title and window class
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetWindow {
    pub title: String,
    pub class_name: String,
}

impl Default for TargetWindow {
    fn default() -> Self {
        Self {
            title: "Bezi".to_string(),
            class_name: "Tauri Window".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlType {
    Any,
    Button,
    Edit,
    Text,
}

/// Screen-space bounding box of a control
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    #[cfg(test)]
    pub fn new(left: i32, top: i32, width: i32, height: i32) -> Self {
        Self {
            left,
            top,
            right: left + width,
            bottom: top + height,
        }
    }

    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }

    #[cfg(any(windows, test))]
    pub fn center(&self) -> (i32, i32) {
        (self.left + self.width() / 2, self.top + self.height() / 2)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keystroke {
    Enter,
    /// Ctrl plus an ASCII letter
    Ctrl(char),
}

pub trait UiBackend {
    type Window: Clone;
    type Control: Clone;

    /// Attach to an already running instance within `timeout`
    fn connect(&mut self, target: &TargetWindow, timeout: Duration) -> Result<Self::Window>;

    /// Start the executable and resolve its window like [`UiBackend::connect`]
    fn launch(
        &mut self,
        exe: &Path,
        target: &TargetWindow,
        timeout: Duration,
    ) -> Result<Self::Window>;

    /// Descendants in tree order, filtered by control type
    fn descendants(
        &mut self,
        window: &Self::Window,
        kind: ControlType,
    ) -> Result<Vec<Self::Control>>;

    fn rect(&mut self, control: &Self::Control) -> Result<Rect>;

    fn automation_id(&mut self, control: &Self::Control) -> Result<String>;

    /// Rendered pixels of the control as RGB
    fn capture(&mut self, control: &Self::Control) -> Result<RgbImage>;

    fn text(&mut self, control: &Self::Control) -> Result<String>;

    fn set_text(&mut self, control: &Self::Control, text: &str) -> Result<()>;

    fn focus(&mut self, window: &Self::Window) -> Result<()>;

    fn send_keys(&mut self, window: &Self::Window, keys: Keystroke) -> Result<()>;

    /// Click the named button if it shows up within `timeout`. `Ok(false)` when it never did.
    fn click_button(
        &mut self,
        window: &Self::Window,
        name: &str,
        timeout: Duration,
    ) -> Result<bool>;
}

/// Backend for platforms without UI Automation; every call fails at connect time
#[cfg_attr(windows, allow(dead_code))]
#[derive(Debug, Default)]
pub struct UnsupportedBackend;

impl UiBackend for UnsupportedBackend {
    type Window = ();
    type Control = ();

    fn connect(&mut self, _target: &TargetWindow, _timeout: Duration) -> Result<()> {
        Err(BridgeError::UnsupportedPlatform)
    }

    fn launch(&mut self, _exe: &Path, _target: &TargetWindow, _timeout: Duration) -> Result<()> {
        Err(BridgeError::UnsupportedPlatform)
    }

    fn descendants(&mut self, _window: &(), _kind: ControlType) -> Result<Vec<()>> {
        Err(BridgeError::UnsupportedPlatform)
    }

    fn rect(&mut self, _control: &()) -> Result<Rect> {
        Err(BridgeError::UnsupportedPlatform)
    }

    fn automation_id(&mut self, _control: &()) -> Result<String> {
        Err(BridgeError::UnsupportedPlatform)
    }

    fn capture(&mut self, _control: &()) -> Result<RgbImage> {
        Err(BridgeError::UnsupportedPlatform)
    }

    fn text(&mut self, _control: &()) -> Result<String> {
        Err(BridgeError::UnsupportedPlatform)
    }

    fn set_text(&mut self, _control: &(), _text: &str) -> Result<()> {
        Err(BridgeError::UnsupportedPlatform)
    }

    fn focus(&mut self, _window: &()) -> Result<()> {
        Err(BridgeError::UnsupportedPlatform)
    }

    fn send_keys(&mut self, _window: &(), _keys: Keystroke) -> Result<()> {
        Err(BridgeError::UnsupportedPlatform)
    }

    fn click_button(&mut self, _window: &(), _name: &str, _timeout: Duration) -> Result<bool> {
        Err(BridgeError::UnsupportedPlatform)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_dimensions() {
        let rect = Rect::new(100, 50, 56, 56);
        assert_eq!(rect.width(), 56);
        assert_eq!(rect.height(), 56);
        assert_eq!(rect.center(), (128, 78));
    }

    #[test]
    fn unsupported_backend_fails_on_connect() {
        let mut backend = UnsupportedBackend;
        assert!(matches!(
            backend.connect(&TargetWindow::default(), Duration::ZERO),
            Err(BridgeError::UnsupportedPlatform)
        ));
    }
}
