//! Post-navigation check that a tab shows the folder it was asked to show.

use crate::paths::{expand_user, strip_quotes, PathRules};
use crate::FolderPath;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Result of comparing an observed location against the requested one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    Match,
    Mismatch { expected: String, observed: String },
}

impl Verification {
    pub fn is_match(&self) -> bool {
        matches!(self, Verification::Match)
    }
}

/// Diagnostic record for one tab index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationRecord {
    pub index: usize,
    pub expected: String,
    /// Last location read back from the file browser, if any could be read.
    pub observed: Option<String>,
    pub matched: bool,
    /// Set-location attempts beyond the first.
    pub retries: u32,
}

/// Compares paths by filesystem equivalence rather than string equality.
///
/// Both sides go through the same pipeline: quote stripping, `~` expansion,
/// separator tidying and case folding. When both sides exist locally their
/// canonical forms are compared as well, so a symlinked prefix (`/tmp` vs
/// `/private/tmp` on macOS) is not a mismatch.
#[derive(Debug, Clone, Copy, Default)]
pub struct Verifier {
    rules: PathRules,
}

impl Verifier {
    pub fn new(rules: PathRules) -> Self {
        Self { rules }
    }

    pub fn verify(&self, expected: &FolderPath, observed: &str) -> Verification {
        if self.equivalent(expected.as_str(), observed) {
            Verification::Match
        } else {
            Verification::Mismatch {
                expected: expected.to_string(),
                observed: observed.to_string(),
            }
        }
    }

    pub fn equivalent(&self, a: &str, b: &str) -> bool {
        let a = self.prepare(a);
        let b = self.prepare(b);
        if self.rules.normalize(&a) == self.rules.normalize(&b) {
            return true;
        }

        match (canonical(&a), canonical(&b)) {
            (Some(ca), Some(cb)) => self.rules.normalize(&ca) == self.rules.normalize(&cb),
            _ => false,
        }
    }

    fn prepare(&self, raw: &str) -> String {
        expand_user(strip_quotes(raw.trim()).trim())
    }
}

fn canonical(path: &str) -> Option<String> {
    if path.starts_with("\\\\") || path.starts_with("//") {
        return None;
    }
    let resolved = std::fs::canonicalize(Path::new(path)).ok()?;
    let text = resolved.to_string_lossy().into_owned();
    // canonicalize yields verbatim `\\?\C:\...` paths on Windows
    Some(match text.strip_prefix(r"\\?\") {
        Some(rest) if !rest.starts_with("UNC") => rest.to_string(),
        _ => text,
    })
}
