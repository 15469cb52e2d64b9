//! Finder windows opened and measured through AppleScript.

use super::osascript::{spawn_detached, OsaScriptRunner};
use crate::script;
use crate::tiers::{FolderLauncher, ScriptRunner};
use crate::{AutomationError, FolderPath, WindowRect};
use std::time::Duration;
use tracing::debug;

const BOUNDS_TIMEOUT: Duration = Duration::from_secs(5);

/// AppleScript error for "no such object", returned when no Finder window
/// is open.
const NO_SUCH_OBJECT: &str = "-1728";

/// Opens each folder in a new Finder window. `open` would reuse a window
/// already showing the folder, so a script is used instead.
#[derive(Debug, Default, Clone, Copy)]
pub struct FinderLauncher;

impl FolderLauncher for FinderLauncher {
    fn launch(&self, folder: &FolderPath, rect: Option<WindowRect>) -> Result<(), AutomationError> {
        spawn_detached(&script::open_window(folder.as_str(), rect))?;
        debug!("Requested Finder window for {}", folder);
        Ok(())
    }
}

/// Bounds of the front Finder window, `None` if Finder has no window open.
pub fn frontmost_finder_rect() -> Result<Option<WindowRect>, AutomationError> {
    match OsaScriptRunner.run(script::FRONT_WINDOW_BOUNDS, BOUNDS_TIMEOUT) {
        Ok(output) => script::parse_bounds(&output).map(Some),
        Err(AutomationError::PlatformError(message)) if message.contains(NO_SUCH_OBJECT) => {
            debug!("No Finder window found");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}
