use thiserror::Error;

/// Low-level failure of a single automation call (COM, window enumeration,
/// `osascript`, process spawn). Drivers return these; tiers convert them into
/// per-path [`FailureReason`](crate::FailureReason)s or a tier-level
/// `Unavailable` so none of them escape the engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AutomationError {
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Operation timed out: {0}")]
    Timeout(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Platform-specific error: {0}")]
    PlatformError(String),

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Caller input was malformed; surfaced before any automation is attempted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("no folders to open")]
    EmptyRequest,

    #[error("not a directory: {}", .paths.join(", "))]
    NotADirectory { paths: Vec<String> },
}

/// Errors returned by [`TabOpener::open_paths_as_tabs`](crate::TabOpener::open_paths_as_tabs).
///
/// Per-path problems are not errors: they are reported inside the
/// [`OpenOutcome`](crate::OpenOutcome).
#[derive(Error, Debug)]
pub enum OpenError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("another open request is already in flight")]
    Busy,

    #[error("every tier reported unavailable: {}", .reasons.join("; "))]
    AllTiersExhausted { reasons: Vec<String> },

    #[error("open worker failed: {0}")]
    Worker(String),

    #[error(transparent)]
    Automation(#[from] AutomationError),
}
