//! Per-platform tier lists and drivers.
//!
//! Windows ranks UI Automation, then raw keystrokes, then separate windows.
//! macOS ranks scripted Finder tabs, then separate windows. Anything else has
//! no file manager to drive.

use crate::tiers::{FolderLauncher, Tier};
use crate::{AutomationError, WindowRect};
use std::sync::Arc;

#[cfg(target_os = "windows")]
pub mod windows;

#[cfg(target_os = "macos")]
pub mod macos;

/// This platform's tiers, highest ranked first.
#[cfg(target_os = "windows")]
pub fn create_tiers() -> Result<Vec<Box<dyn Tier>>, AutomationError> {
    use crate::tiers::{KeystrokeInputTier, SeparateWindowsTier, UiAutomationTier};
    Ok(vec![
        Box::new(UiAutomationTier::new(windows::UiaConnector)),
        Box::new(KeystrokeInputTier::new(windows::KeystrokeWindowOpener)),
        Box::new(SeparateWindowsTier::new(windows::ExplorerLauncher)),
    ])
}

#[cfg(target_os = "macos")]
pub fn create_tiers() -> Result<Vec<Box<dyn Tier>>, AutomationError> {
    use crate::tiers::{ScriptedUiTier, SeparateWindowsTier};
    Ok(vec![
        Box::new(ScriptedUiTier::new(macos::OsaScriptRunner)),
        Box::new(SeparateWindowsTier::new(macos::FinderLauncher)),
    ])
}

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
pub fn create_tiers() -> Result<Vec<Box<dyn Tier>>, AutomationError> {
    Err(unsupported())
}

/// Launcher for single-folder opens.
pub fn default_launcher() -> Result<Arc<dyn FolderLauncher>, AutomationError> {
    #[cfg(target_os = "windows")]
    {
        Ok(Arc::new(windows::ExplorerLauncher))
    }

    #[cfg(target_os = "macos")]
    {
        Ok(Arc::new(macos::FinderLauncher))
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        Err(unsupported())
    }
}

/// Position and size of the front file-manager window, to reuse as the
/// placement of the next open. `None` when no such window is open.
pub fn frontmost_window_rect() -> Result<Option<WindowRect>, AutomationError> {
    #[cfg(target_os = "windows")]
    {
        windows::frontmost_explorer_rect()
    }

    #[cfg(target_os = "macos")]
    {
        macos::frontmost_finder_rect()
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        Err(unsupported())
    }
}

#[allow(dead_code)]
fn unsupported() -> AutomationError {
    AutomationError::UnsupportedPlatform(format!(
        "no file manager automation for {}",
        std::env::consts::OS
    ))
}
