//! macOS drivers: Finder through AppleScript.

pub mod finder;
pub mod health;
pub mod osascript;

pub use finder::{frontmost_finder_rect, FinderLauncher};
pub use osascript::OsaScriptRunner;
