//! UI Automation driver for one Explorer window.

use super::explorer::{self, launch_and_find};
use super::types::ExplorerWindow;
use super::utils::create_ui_automation_with_com_init;
use crate::tiers::{ExplorerConnector, ExplorerSession, LocationReading, TierContext};
use crate::{AutomationError, FolderPath, WindowRect};
use tracing::debug;
use uiautomation::controls::ControlType;
use uiautomation::patterns;
use uiautomation::{UIAutomation, UIElement};
use windows::Win32::Foundation::{HWND, LPARAM, WPARAM};
use windows::Win32::UI::Input::KeyboardAndMouse::VK_RETURN;
use windows::Win32::UI::WindowsAndMessaging::{PostMessageW, WM_KEYDOWN, WM_KEYUP};

const NEW_TAB_BUTTON_ID: &str = "AddButton";
const ADDRESS_BOX_ID: &str = "PART_AutoSuggestBox";
const ADDRESS_EDIT_ID: &str = "TextBox";
const BREADCRUMB_ID: &str = "PART_BreadcrumbBar";

/// Explorer's tree is shallow but the address bar sits a dozen levels down.
const SEARCH_DEPTH: u32 = 30;
const FIND_TIMEOUT_MS: u64 = 1000;
/// Polled repeatedly by the tier, so kept short.
const QUICK_FIND_TIMEOUT_MS: u64 = 200;

/// Launches explorer.exe for the first folder and attaches to its window.
#[derive(Debug, Default, Clone, Copy)]
pub struct UiaConnector;

impl ExplorerConnector for UiaConnector {
    type Session = UiaSession;

    fn connect(&self, first: &FolderPath, ctx: &TierContext) -> Result<UiaSession, AutomationError> {
        let automation = create_ui_automation_with_com_init()?;
        let window = launch_and_find(first, ctx)?;
        let element = automation.element_from_handle(window.hwnd().into())?;
        if let Err(e) = element.set_focus() {
            debug!("Could not focus Explorer window: {e}");
        }
        debug!("Connected via UIA: hwnd={:#x}", window.raw());
        Ok(UiaSession {
            automation,
            window,
            element,
        })
    }
}

pub struct UiaSession {
    automation: UIAutomation,
    window: ExplorerWindow,
    element: UIElement,
}

impl UiaSession {
    fn find_in(
        &self,
        root: &UIElement,
        automation_id: &str,
        control_type: Option<ControlType>,
        timeout_ms: u64,
    ) -> Result<UIElement, AutomationError> {
        let id = automation_id.to_string();
        let mut matcher = self
            .automation
            .create_matcher()
            .from_ref(root)
            .depth(SEARCH_DEPTH)
            .filter_fn(Box::new(move |e: &UIElement| {
                Ok(e.get_automation_id().map(|v| v == id).unwrap_or(false))
            }))
            .timeout(timeout_ms);
        if let Some(control_type) = control_type {
            matcher = matcher.control_type(control_type);
        }
        matcher.find_first().map_err(|e| {
            AutomationError::ElementNotFound(format!("AutomationId: '{automation_id}', Err: {e}"))
        })
    }

    fn address_edit(&self, timeout_ms: u64) -> Result<UIElement, AutomationError> {
        let suggest_box = self.find_in(&self.element, ADDRESS_BOX_ID, None, timeout_ms)?;
        self.find_in(&suggest_box, ADDRESS_EDIT_ID, Some(ControlType::Edit), timeout_ms)
    }

    fn value_of(element: &UIElement) -> Result<String, AutomationError> {
        Ok(element.get_pattern::<patterns::UIValuePattern>()?.get_value()?)
    }
}

impl ExplorerSession for UiaSession {
    fn tab_count(&self) -> Result<usize, AutomationError> {
        let tabs = self
            .automation
            .create_matcher()
            .from_ref(&self.element)
            .depth(SEARCH_DEPTH)
            .control_type(ControlType::TabItem)
            .timeout(QUICK_FIND_TIMEOUT_MS)
            .find_all()
            .map_err(|e| AutomationError::ElementNotFound(format!("TabItem: {e}")))?;
        Ok(tabs.len())
    }

    fn invoke_new_tab(&self) -> Result<(), AutomationError> {
        let button = self.find_in(
            &self.element,
            NEW_TAB_BUTTON_ID,
            Some(ControlType::Button),
            FIND_TIMEOUT_MS,
        )?;
        let invoke = button
            .get_pattern::<patterns::UIInvokePattern>()
            .map_err(|e| {
                AutomationError::UnsupportedOperation(format!(
                    "New-tab button does not support InvokePattern: {e}"
                ))
            })?;
        Ok(invoke.invoke()?)
    }

    fn press_new_tab_keys(&self) -> Result<(), AutomationError> {
        self.element
            .send_keys("{Ctrl}t", 10)
            .map_err(|e| AutomationError::PlatformError(format!("Failed to press Ctrl+T: {e:?}")))
    }

    fn focus_address(&self) -> Result<(), AutomationError> {
        self.element
            .send_keys("{Ctrl}l", 10)
            .map_err(|e| AutomationError::PlatformError(format!("Failed to press Ctrl+L: {e:?}")))
    }

    fn set_address(&self, value: &str) -> Result<(), AutomationError> {
        let edit = self.address_edit(FIND_TIMEOUT_MS)?;
        let pattern = edit
            .get_pattern::<patterns::UIValuePattern>()
            .map_err(|e| {
                AutomationError::UnsupportedOperation(format!(
                    "Address bar does not support ValuePattern: {e}"
                ))
            })?;
        Ok(pattern.set_value(value)?)
    }

    fn type_address(&self, value: &str) -> Result<(), AutomationError> {
        // Ctrl+L already selected the old text when the edit is not reachable
        let target = match self.address_edit(FIND_TIMEOUT_MS) {
            Ok(edit) => {
                edit.send_keys("{Ctrl}a", 10)?;
                edit
            }
            Err(_) => self.element.clone(),
        };
        target
            .send_text(value, 10)
            .map_err(|e| AutomationError::PlatformError(format!("Failed to type path: {e:?}")))
    }

    fn address_text(&self) -> Result<String, AutomationError> {
        Self::value_of(&self.address_edit(FIND_TIMEOUT_MS)?)
    }

    fn submit_address(&self) -> Result<(), AutomationError> {
        let edit = match self.address_edit(FIND_TIMEOUT_MS) {
            Ok(edit) => edit,
            Err(_) => return Ok(self.element.send_keys("{Enter}", 10)?),
        };

        let hwnd: HWND = match edit.get_native_window_handle() {
            Ok(handle) => handle.into(),
            Err(_) => HWND::default(),
        };
        if hwnd.is_invalid() {
            debug!("Address edit has no native handle, sending Enter");
            return Ok(edit.send_keys("{Enter}", 10)?);
        }

        unsafe {
            let wparam = WPARAM(VK_RETURN.0 as usize);
            PostMessageW(Some(hwnd), WM_KEYDOWN, wparam, LPARAM(0))
                .and_then(|_| PostMessageW(Some(hwnd), WM_KEYUP, wparam, LPARAM(0)))
        }
        .map_err(|e| AutomationError::PlatformError(format!("PostMessageW failed: {e}")))
    }

    fn read_location(&self) -> LocationReading {
        let edit = self.address_edit(QUICK_FIND_TIMEOUT_MS).ok();
        if let Some(edit) = &edit {
            match edit.has_keyboard_focus() {
                Ok(true) => return LocationReading::Pending,
                Ok(false) => {
                    if let Ok(value) = Self::value_of(edit) {
                        if !value.trim().is_empty() {
                            return LocationReading::Location(value);
                        }
                    }
                }
                Err(e) => debug!("Could not read address focus: {e}"),
            }
        }

        let breadcrumb = self
            .find_in(&self.element, BREADCRUMB_ID, None, QUICK_FIND_TIMEOUT_MS)
            .and_then(|bar| Ok(bar.get_name()?));
        match breadcrumb {
            Ok(name) => breadcrumb_reading(&name),
            Err(_) if edit.is_some() => LocationReading::Pending,
            Err(_) => LocationReading::Unobservable,
        }
    }

    fn apply_rect(&self, rect: WindowRect) -> Result<(), AutomationError> {
        explorer::move_window(self.window, rect)
    }
}

/// A breadcrumb that is present but shows no full path (Home, a library, a
/// tab still loading) has not reached a folder yet.
fn breadcrumb_reading(name: &str) -> LocationReading {
    match breadcrumb_path(name) {
        Some(path) => LocationReading::Location(path),
        None => {
            debug!("Breadcrumb shows '{}', not a full path", name);
            LocationReading::Pending
        }
    }
}

/// The breadcrumb's accessible name is a localized label such as
/// `Address: C:\Users`; only a drive or UNC path after it is usable.
fn breadcrumb_path(name: &str) -> Option<String> {
    let looks_absolute = |s: &str| {
        let b = s.as_bytes();
        s.starts_with("\\\\") || (b.len() >= 3 && b[1] == b':' && (b[2] == b'\\' || b[2] == b'/'))
    };
    let name = name.trim();
    if looks_absolute(name) {
        return Some(name.to_string());
    }
    name.split_once(": ")
        .map(|(_, rest)| rest.trim())
        .filter(|rest| looks_absolute(rest))
        .map(str::to_string)
}
