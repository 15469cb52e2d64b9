//! Explorer window discovery, launch and placement.

use super::types::ExplorerWindow;
use super::utils::class_name;
use crate::tiers::{FolderLauncher, TierContext};
use crate::wait::{CompletionDetector, WaitOutcome};
use crate::{AutomationError, FolderPath, WindowRect};
use std::collections::HashSet;
use std::process::Command;
use std::time::Duration;
use tracing::{debug, warn};
use windows::core::BOOL;
use windows::Win32::Foundation::{HWND, LPARAM, RECT};
use windows::Win32::UI::WindowsAndMessaging::{
    EnumWindows, GetForegroundWindow, GetWindowRect, MoveWindow, SetForegroundWindow, ShowWindow,
    SW_RESTORE,
};

pub const EXPLORER_WINDOW_CLASS: &str = "CabinetWClass";

/// How long a separate-window launch waits for its window before giving up
/// on placement.
const SEPARATE_WINDOW_TIMEOUT: Duration = Duration::from_secs(5);
const SEPARATE_WINDOW_POLL: Duration = Duration::from_millis(200);

pub(crate) fn is_explorer_window(hwnd: HWND) -> bool {
    class_name(hwnd) == EXPLORER_WINDOW_CLASS
}

unsafe extern "system" fn collect_explorer_window(hwnd: HWND, lparam: LPARAM) -> BOOL {
    let found = &mut *(lparam.0 as *mut Vec<ExplorerWindow>);
    if is_explorer_window(hwnd) {
        found.push(ExplorerWindow::from_hwnd(hwnd));
    }
    true.into()
}

/// Every top-level Explorer window, in Z order.
pub fn explorer_windows() -> Result<Vec<ExplorerWindow>, AutomationError> {
    let mut found: Vec<ExplorerWindow> = Vec::new();
    unsafe {
        EnumWindows(
            Some(collect_explorer_window),
            LPARAM(&mut found as *mut Vec<ExplorerWindow> as isize),
        )
    }
    .map_err(|e| AutomationError::PlatformError(format!("EnumWindows failed: {e}")))?;
    Ok(found)
}

fn snapshot() -> HashSet<ExplorerWindow> {
    explorer_windows()
        .map(|windows| windows.into_iter().collect())
        .unwrap_or_default()
}

pub(crate) fn spawn_explorer(folder: &FolderPath) -> Result<(), AutomationError> {
    Command::new("explorer.exe")
        .arg(folder.as_str())
        .spawn()
        .map(|_| ())
        .map_err(|e| AutomationError::PlatformError(format!("Failed to start explorer.exe: {e}")))
}

fn wait_for_new_window(
    before: &HashSet<ExplorerWindow>,
    detector: &CompletionDetector,
) -> WaitOutcome<ExplorerWindow> {
    detector.wait_for(|| {
        explorer_windows()
            .ok()?
            .into_iter()
            .find(|window| !before.contains(window))
    })
}

/// Open `first` in a new Explorer window and return that window once it
/// exists.
pub(crate) fn launch_and_find(
    first: &FolderPath,
    ctx: &TierContext,
) -> Result<ExplorerWindow, AutomationError> {
    let before = snapshot();
    debug!("Existing Explorer windows: {}", before.len());

    spawn_explorer(first)?;
    debug!("Launched explorer.exe {}", first);

    let timeout = ctx.options().window_timeout();
    match wait_for_new_window(&before, &ctx.detector(timeout)) {
        WaitOutcome::Settled(window) => {
            debug!("New Explorer window found: hwnd={:#x}", window.raw());
            Ok(window)
        }
        WaitOutcome::TimedOut { waited } => Err(AutomationError::Timeout(format!(
            "no new Explorer window after {waited:?}"
        ))),
        WaitOutcome::Cancelled => Err(AutomationError::Internal(
            "cancelled while waiting for Explorer window".to_string(),
        )),
    }
}

pub fn move_window(window: ExplorerWindow, rect: WindowRect) -> Result<(), AutomationError> {
    unsafe { MoveWindow(window.hwnd(), rect.x, rect.y, rect.width, rect.height, true) }
        .map_err(|e| AutomationError::PlatformError(format!("MoveWindow failed: {e}")))?;
    debug!("Applied window rect {} to hwnd={:#x}", rect, window.raw());
    Ok(())
}

pub fn window_rect(window: ExplorerWindow) -> Result<WindowRect, AutomationError> {
    let mut rect = RECT::default();
    unsafe { GetWindowRect(window.hwnd(), &mut rect) }
        .map_err(|e| AutomationError::PlatformError(format!("GetWindowRect failed: {e}")))?;
    Ok(WindowRect::from_edges(rect.left, rect.top, rect.right, rect.bottom))
}

pub fn is_foreground(window: ExplorerWindow) -> bool {
    unsafe { GetForegroundWindow() } == window.hwnd()
}

pub fn bring_to_foreground(window: ExplorerWindow) -> Result<(), AutomationError> {
    unsafe {
        let _ = ShowWindow(window.hwnd(), SW_RESTORE);
        if !SetForegroundWindow(window.hwnd()).as_bool() {
            return Err(AutomationError::PlatformError(
                "SetForegroundWindow refused".to_string(),
            ));
        }
    }
    Ok(())
}

/// Bounds of the foreground Explorer window, else of the first one found.
pub fn frontmost_explorer_rect() -> Result<Option<WindowRect>, AutomationError> {
    let foreground = unsafe { GetForegroundWindow() };
    let window = if !foreground.is_invalid() && is_explorer_window(foreground) {
        ExplorerWindow::from_hwnd(foreground)
    } else {
        match explorer_windows()?.first() {
            Some(window) => *window,
            None => {
                debug!("No Explorer window found");
                return Ok(None);
            }
        }
    };
    window_rect(window).map(Some)
}

/// One `explorer.exe <path>` per folder. With a rectangle, the new window is
/// looked up afterwards and moved; failing to find it only costs placement.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExplorerLauncher;

impl FolderLauncher for ExplorerLauncher {
    fn launch(&self, folder: &FolderPath, rect: Option<WindowRect>) -> Result<(), AutomationError> {
        let Some(rect) = rect else {
            return spawn_explorer(folder);
        };

        let before = snapshot();
        spawn_explorer(folder)?;
        let detector = CompletionDetector::new(SEPARATE_WINDOW_POLL, SEPARATE_WINDOW_TIMEOUT);
        match wait_for_new_window(&before, &detector) {
            WaitOutcome::Settled(window) => {
                if let Err(e) = move_window(window, rect) {
                    warn!("Could not place window for {}: {}", folder, e);
                }
            }
            _ => warn!("Window for {} not found, leaving it where it opened", folder),
        }
        Ok(())
    }
}
