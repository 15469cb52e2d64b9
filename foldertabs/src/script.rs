//! AppleScript statements for Finder and System Events.
//!
//! Each builder returns one self-contained statement group suitable for a
//! single `osascript -e` call. Paths are interpolated only through
//! [`escape`].

use crate::{AutomationError, WindowRect};

/// Window id of the front Finder window, as text.
pub const FRONT_WINDOW_ID: &str = r#"tell application "Finder" to return id of front Finder window"#;

/// `Cmd+T` delivered to Finder through System Events. Needs accessibility
/// permission for the calling process.
pub const NEW_TAB_KEYSTROKE: &str = r#"tell application "System Events"
  tell process "Finder"
    keystroke "t" using command down
  end tell
end tell"#;

/// POSIX path of the folder the front Finder window displays.
pub const FRONT_TARGET_PATH: &str =
    r#"tell application "Finder" to return POSIX path of (target of front Finder window as alias)"#;

/// `{left, top, right, bottom}` of the front Finder window.
pub const FRONT_WINDOW_BOUNDS: &str =
    r#"tell application "Finder" to get bounds of front Finder window"#;

/// Substrings of the accessibility-denied message in the languages macOS
/// ships it in.
const PERMISSION_KEYWORDS: &[&str] = &["assistive", "アクセシビリティ", "辅助功能", "보조"];

/// -1719: invalid index / not allowed assistive access,
/// -25211: AX API disabled, -1743: not authorized to send Apple events.
const PERMISSION_ERROR_CODES: &[&str] = &["-1719", "-25211", "-1743"];

/// Make `text` safe inside an AppleScript string literal.
///
/// Line breaks would end the statement, so they are dropped rather than
/// escaped.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\r' | '\n' => {}
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            _ => out.push(c),
        }
    }
    out
}

/// A new Finder window showing `path`, optionally moved to `rect`.
pub fn open_window(path: &str, rect: Option<WindowRect>) -> String {
    let mut script = format!(
        "tell application \"Finder\"\n  activate\n  make new Finder window to POSIX file \"{}\" as alias\n",
        escape(path)
    );
    if let Some(rect) = rect {
        script.push_str(&set_bounds_line(rect));
    }
    script.push_str("end tell");
    script
}

pub fn set_target(path: &str) -> String {
    format!(
        "tell application \"Finder\" to set target of front Finder window to POSIX file \"{}\" as alias",
        escape(path)
    )
}

pub fn set_front_bounds(rect: WindowRect) -> String {
    format!("tell application \"Finder\"\n{}end tell", set_bounds_line(rect))
}

fn set_bounds_line(rect: WindowRect) -> String {
    let (left, top, right, bottom) = rect.edges();
    format!("  set bounds of front Finder window to {{{left}, {top}, {right}, {bottom}}}\n")
}

/// Parse the `left, top, right, bottom` list `osascript` prints for
/// [`FRONT_WINDOW_BOUNDS`].
pub fn parse_bounds(output: &str) -> Result<WindowRect, AutomationError> {
    let edges = output
        .trim()
        .trim_matches(|c| c == '{' || c == '}')
        .split(',')
        .map(|part| part.trim().parse::<i32>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| AutomationError::InvalidArgument(format!("bounds '{}': {e}", output.trim())))?;

    match edges.as_slice() {
        [left, top, right, bottom] if right > left && bottom > top => {
            Ok(WindowRect::from_edges(*left, *top, *right, *bottom))
        }
        _ => Err(AutomationError::InvalidArgument(format!(
            "bounds '{}' is not a non-empty rectangle",
            output.trim()
        ))),
    }
}

/// True when `stderr` from `osascript` says the process lacks accessibility
/// or automation permission.
pub fn is_permission_error(stderr: &str) -> bool {
    let lowered = stderr.to_lowercase();
    PERMISSION_KEYWORDS.iter().any(|kw| lowered.contains(kw))
        || PERMISSION_ERROR_CODES.iter().any(|code| stderr.contains(code))
}
