//! Handle newtypes and error conversions for the Windows drivers

use crate::AutomationError;
use std::ffi::c_void;
use windows::Win32::Foundation::HWND;

/// Top-level Explorer window (`CabinetWClass`).
///
/// Stored as the raw handle value so it can cross threads; the window itself
/// belongs to explorer.exe and is never closed by us.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExplorerWindow(pub(crate) isize);

impl ExplorerWindow {
    pub(crate) fn from_hwnd(hwnd: HWND) -> Self {
        Self(hwnd.0 as isize)
    }

    pub(crate) fn hwnd(self) -> HWND {
        HWND(self.0 as *mut c_void)
    }

    pub fn raw(self) -> isize {
        self.0
    }
}

impl From<uiautomation::Error> for AutomationError {
    fn from(error: uiautomation::Error) -> Self {
        AutomationError::PlatformError(format!("UIAutomation error: {error}"))
    }
}
