//! Windows UI Automation backend.
//!
//! Elements are looked up through `IUIAutomation` on every call; nothing is
//! cached between calls because the app re-creates its controls on repaint.

use crate::automation::pause;
use crate::core::backend::{ControlType, Keystroke, Rect, TargetWindow, UiBackend};
use crate::core::input::{click_at_screen, send_keystroke};
use crate::core::screen_capture::capture_screen_rect;
use crate::core::window::{
    bring_to_front, from_win_rect, get_window_rect, is_window_valid, wait_for_window,
};
use crate::error::{BridgeError, Result};
use image::RgbImage;
use rustautogui::RustAutoGui;
use std::path::Path;
use std::process::{Child, Command};
use std::time::{Duration, Instant};
use tracing::{debug, info};
use windows::core::{ComInterface, BSTR};
use windows::Win32::Foundation::HWND;
use windows::Win32::System::Com::{
    CoCreateInstance, CoInitializeEx, CoUninitialize, CLSCTX_ALL, COINIT_APARTMENTTHREADED,
};
use windows::Win32::UI::Accessibility::{
    CUIAutomation, IUIAutomation, IUIAutomationElement, IUIAutomationValuePattern,
    TreeScope_Descendants, UIA_ButtonControlTypeId, UIA_EditControlTypeId, UIA_TextControlTypeId,
    UIA_ValuePatternId,
};

const BUTTON_POLL: Duration = Duration::from_millis(250);

#[derive(Clone)]
pub struct UiaWindow {
    hwnd: HWND,
    element: IUIAutomationElement,
}

/// COM stays initialized for as long as this lives; declared last so it drops last.
/// Only a successful `CoInitializeEx` (including `S_FALSE`) is balanced on drop.
struct ComApartment {
    owns_init: bool,
}

impl ComApartment {
    fn enter() -> Self {
        let result = unsafe { CoInitializeEx(None, COINIT_APARTMENTTHREADED) };
        if let Err(e) = &result {
            debug!("thread already in another COM apartment: {}", e);
        }
        ComApartment {
            owns_init: result.is_ok(),
        }
    }
}

impl Drop for ComApartment {
    fn drop(&mut self) {
        if self.owns_init {
            unsafe { CoUninitialize() };
        }
    }
}

pub struct UiaBackend {
    automation: IUIAutomation,
    gui: Option<RustAutoGui>,
    launched: Option<Child>,
    _com: ComApartment,
}

impl UiaBackend {
    /// Initialize COM on the calling thread and create the automation root
    pub fn new() -> Result<Self> {
        let com = ComApartment::enter();
        let automation: IUIAutomation =
            unsafe { CoCreateInstance(&CUIAutomation, None, CLSCTX_ALL)? };
        Ok(Self {
            automation,
            gui: None,
            launched: None,
            _com: com,
        })
    }

    fn window_for(&self, hwnd: HWND) -> Result<UiaWindow> {
        let element = unsafe { self.automation.ElementFromHandle(hwnd)? };
        if let Some(rect) = get_window_rect(hwnd) {
            debug!(width = rect.width(), height = rect.height(), "attached to window");
        }
        Ok(UiaWindow { hwnd, element })
    }

    fn launched_is_alive(&mut self) -> bool {
        match self.launched.as_mut() {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }

    fn gui(&mut self) -> Result<&mut RustAutoGui> {
        if self.gui.is_none() {
            let gui = RustAutoGui::new(false).map_err(|e| {
                BridgeError::Backend(format!("Failed to initialize RustAutoGui: {}", e))
            })?;
            self.gui = Some(gui);
        }
        self.gui
            .as_mut()
            .ok_or_else(|| BridgeError::Backend("RustAutoGui unavailable".to_string()))
    }

    fn find_button(
        &mut self,
        window: &UiaWindow,
        name: &str,
    ) -> Result<Option<IUIAutomationElement>> {
        for button in self.descendants(window, ControlType::Button)? {
            if unsafe { button.CurrentName()? }.to_string() == name {
                return Ok(Some(button));
            }
        }
        Ok(None)
    }
}

fn matches_kind(element: &IUIAutomationElement, kind: ControlType) -> Result<bool> {
    let wanted = match kind {
        ControlType::Any => return Ok(true),
        ControlType::Button => UIA_ButtonControlTypeId,
        ControlType::Edit => UIA_EditControlTypeId,
        ControlType::Text => UIA_TextControlTypeId,
    };
    Ok(unsafe { element.CurrentControlType()? } == wanted)
}

impl UiBackend for UiaBackend {
    type Window = UiaWindow;
    type Control = IUIAutomationElement;

    fn connect(&mut self, target: &TargetWindow, timeout: Duration) -> Result<UiaWindow> {
        let hwnd = wait_for_window(target, timeout).ok_or_else(|| BridgeError::WindowNotFound {
            title: target.title.clone(),
            class: target.class_name.clone(),
        })?;
        self.window_for(hwnd)
    }

    fn launch(
        &mut self,
        exe: &Path,
        target: &TargetWindow,
        timeout: Duration,
    ) -> Result<UiaWindow> {
        if self.launched_is_alive() {
            debug!("launched instance still starting, not spawning another");
        } else {
            let child = Command::new(exe).spawn().map_err(|e| BridgeError::Launch {
                path: exe.to_path_buf(),
                reason: e.to_string(),
            })?;
            info!(pid = child.id(), exe = %exe.display(), "launched target app");
            self.launched = Some(child);
        }
        self.connect(target, timeout)
    }

    fn descendants(
        &mut self,
        window: &UiaWindow,
        kind: ControlType,
    ) -> Result<Vec<IUIAutomationElement>> {
        if !is_window_valid(window.hwnd) {
            return Err(BridgeError::Backend("stale window handle".to_string()));
        }
        unsafe {
            let condition = self.automation.CreateTrueCondition()?;
            let found = window.element.FindAll(TreeScope_Descendants, &condition)?;
            let mut controls = Vec::new();
            for i in 0..found.Length()? {
                let element = found.GetElement(i)?;
                if matches_kind(&element, kind)? {
                    controls.push(element);
                }
            }
            Ok(controls)
        }
    }

    fn rect(&mut self, control: &IUIAutomationElement) -> Result<Rect> {
        Ok(from_win_rect(unsafe { control.CurrentBoundingRectangle()? }))
    }

    fn automation_id(&mut self, control: &IUIAutomationElement) -> Result<String> {
        Ok(unsafe { control.CurrentAutomationId()? }.to_string())
    }

    fn capture(&mut self, control: &IUIAutomationElement) -> Result<RgbImage> {
        let rect = self.rect(control)?;
        capture_screen_rect(rect).map_err(BridgeError::Backend)
    }

    fn text(&mut self, control: &IUIAutomationElement) -> Result<String> {
        Ok(unsafe { control.CurrentName()? }.to_string())
    }

    fn set_text(&mut self, control: &IUIAutomationElement, text: &str) -> Result<()> {
        unsafe {
            let _ = control.SetFocus();
            let pattern = control
                .GetCurrentPattern(UIA_ValuePatternId)?
                .cast::<IUIAutomationValuePattern>()?;
            pattern.SetValue(&BSTR::from(text))?;
        }
        Ok(())
    }

    fn focus(&mut self, window: &UiaWindow) -> Result<()> {
        if !bring_to_front(window.hwnd) {
            debug!("SetForegroundWindow refused, falling back to UIA focus");
        }
        unsafe { window.element.SetFocus()? };
        Ok(())
    }

    fn send_keys(&mut self, window: &UiaWindow, keys: Keystroke) -> Result<()> {
        self.focus(window)?;
        send_keystroke(keys).map_err(BridgeError::Backend)
    }

    fn click_button(&mut self, window: &UiaWindow, name: &str, timeout: Duration) -> Result<bool> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(button) = self.find_button(window, name)? {
                let (x, y) = self.rect(&button)?.center();
                if x < 0 || y < 0 {
                    return Err(BridgeError::Backend(format!("'{}' is off screen", name)));
                }
                let gui = self.gui()?;
                return Ok(click_at_screen(gui, x as u32, y as u32));
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            pause(BUTTON_POLL);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use windows::Win32::System::Com::COINIT_MULTITHREADED;

    #[test]
    fn apartment_of_another_mode_is_left_alone() {
        thread::spawn(|| {
            unsafe { CoInitializeEx(None, COINIT_MULTITHREADED) }.unwrap();
            let apartment = ComApartment::enter();
            assert!(!apartment.owns_init);
            drop(apartment);
            unsafe { CoUninitialize() };
        })
        .join()
        .unwrap();
    }

    #[test]
    fn fresh_thread_owns_its_apartment() {
        thread::spawn(|| {
            let apartment = ComApartment::enter();
            assert!(apartment.owns_init);
        })
        .join()
        .unwrap();
    }
}
