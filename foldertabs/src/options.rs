//! Tunables for one open request.
//!
//! Every wait in the engine is bounded by one of these values. The defaults
//! are hand-tuned against Explorer on Windows 11 and Finder on macOS 14.

use crate::AutomationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Position and size of a target window, in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl WindowRect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Build from `left, top, right, bottom` edges, the form both
    /// `GetWindowRect` and Finder's `bounds` property use.
    pub fn from_edges(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self::new(left, top, right - left, bottom - top)
    }

    /// `(left, top, right, bottom)`
    pub fn edges(&self) -> (i32, i32, i32, i32) {
        (self.x, self.y, self.x + self.width, self.y + self.height)
    }
}

impl fmt::Display for WindowRect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{}", self.x, self.y, self.width, self.height)
    }
}

impl FromStr for WindowRect {
    type Err = AutomationError;

    /// Parses `x,y,width,height`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<i32> = s
            .split(',')
            .map(|p| p.trim().parse::<i32>())
            .collect::<Result<_, _>>()
            .map_err(|e| AutomationError::InvalidArgument(format!("window rect '{s}': {e}")))?;

        match parts.as_slice() {
            [x, y, w, h] if *w > 0 && *h > 0 => Ok(Self::new(*x, *y, *w, *h)),
            [_, _, _, _] => Err(AutomationError::InvalidArgument(format!(
                "window rect '{s}': width and height must be positive"
            ))),
            _ => Err(AutomationError::InvalidArgument(format!(
                "window rect '{s}': expected x,y,width,height"
            ))),
        }
    }
}

/// Configuration for one open request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenOptions {
    /// Move/resize the tab window (or every separate window) here.
    pub window_rect: Option<WindowRect>,
    /// Interval between completion polls. Clamped to the detector minimum.
    pub poll_interval_ms: u64,
    /// How long to wait for a freshly launched window to appear.
    pub window_timeout_ms: u64,
    /// How long to wait for a new tab to show up after requesting one.
    pub tab_timeout_ms: u64,
    /// How long to wait for a tab to settle on its new location.
    pub navigation_timeout_ms: u64,
    /// Upper bound on a single `osascript` run.
    pub script_timeout_ms: u64,
    /// Set-location attempts per tab before the index is marked failed.
    pub max_verify_attempts: u32,
    /// Fixed delay used only where nothing can be observed (raw input tier,
    /// between separate windows, uncountable tabs).
    pub settle_ms: u64,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            window_rect: None,
            poll_interval_ms: 100,
            window_timeout_ms: 10_000,
            tab_timeout_ms: 3_000,
            navigation_timeout_ms: 30_000,
            script_timeout_ms: 30_000,
            max_verify_attempts: 3,
            settle_ms: 300,
        }
    }
}

impl OpenOptions {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn window_timeout(&self) -> Duration {
        Duration::from_millis(self.window_timeout_ms)
    }

    pub fn tab_timeout(&self) -> Duration {
        Duration::from_millis(self.tab_timeout_ms)
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    pub fn script_timeout(&self) -> Duration {
        Duration::from_millis(self.script_timeout_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    /// Never fewer than one attempt, whatever the config says.
    pub fn verify_attempts(&self) -> u32 {
        self.max_verify_attempts.max(1)
    }
}
