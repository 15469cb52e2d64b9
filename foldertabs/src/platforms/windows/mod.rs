//! Windows drivers: Explorer through UI Automation and `SendInput`.

pub mod explorer;
pub mod health;
pub mod input;
pub mod types;
pub mod uia;
pub mod utils;

pub use explorer::{frontmost_explorer_rect, ExplorerLauncher, EXPLORER_WINDOW_CLASS};
pub use input::{InputSession, KeystrokeWindowOpener};
pub use types::ExplorerWindow;
pub use uia::{UiaConnector, UiaSession};
