//! Request validation: turning caller-supplied strings into an [`OpenRequest`].
//!
//! Every tier tracks "tab N shows path N" purely by creation order, so a
//! request must never contain the same folder twice. Deduplication happens
//! here, on normalized paths, before anything touches the OS.

use crate::ValidationError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// How a [`FolderPath`] was classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathKind {
    /// A local directory; verified to exist at validation time.
    Local,
    /// A UNC-style share. Not probed: the remote host may demand credentials
    /// that only the file browser itself can supply.
    NetworkShare,
}

/// One absolute folder location of a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderPath {
    path: String,
    kind: PathKind,
}

impl FolderPath {
    pub(crate) fn new(path: impl Into<String>, kind: PathKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.path
    }

    pub fn as_path(&self) -> &Path {
        Path::new(&self.path)
    }

    pub fn kind(&self) -> PathKind {
        self.kind
    }

    pub fn is_network_share(&self) -> bool {
        self.kind == PathKind::NetworkShare
    }
}

impl fmt::Display for FolderPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

/// Ordered, deduplicated, non-empty list of folders for one open action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OpenRequest {
    folders: Vec<FolderPath>,
}

impl OpenRequest {
    /// Callers outside the crate go through [`Validator`], which upholds the
    /// dedup invariant.
    pub(crate) fn from_folders(folders: Vec<FolderPath>) -> Result<Self, ValidationError> {
        if folders.is_empty() {
            return Err(ValidationError::EmptyRequest);
        }
        Ok(Self { folders })
    }

    pub fn first(&self) -> &FolderPath {
        &self.folders[0]
    }

    pub fn folders(&self) -> &[FolderPath] {
        &self.folders
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FolderPath> {
        self.folders.iter()
    }

    pub fn len(&self) -> usize {
        self.folders.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.folders.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&FolderPath> {
        self.folders.get(index)
    }
}

/// Platform conventions used when comparing paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathRules {
    /// Fold case before comparing.
    pub case_insensitive: bool,
    /// `\` is the separator and `/` is accepted as an alias.
    pub backslash_separators: bool,
}

impl PathRules {
    pub const WINDOWS: PathRules = PathRules {
        case_insensitive: true,
        backslash_separators: true,
    };

    /// APFS and HFS+ volumes are case-insensitive by default.
    pub const MACOS: PathRules = PathRules {
        case_insensitive: true,
        backslash_separators: false,
    };

    pub const POSIX: PathRules = PathRules {
        case_insensitive: false,
        backslash_separators: false,
    };

    pub fn native() -> Self {
        if cfg!(target_os = "windows") {
            Self::WINDOWS
        } else if cfg!(target_os = "macos") {
            Self::MACOS
        } else {
            Self::POSIX
        }
    }

    fn separator(&self) -> char {
        if self.backslash_separators {
            '\\'
        } else {
            '/'
        }
    }

    /// UNC-style prefix, in either separator flavor.
    pub fn is_network_share(&self, raw: &str) -> bool {
        raw.starts_with("\\\\") || raw.starts_with("//")
    }

    /// Unify separators, collapse repeats and drop trailing separators.
    /// Case is preserved; this is the form handed to the file browser.
    pub fn tidy(&self, raw: &str) -> String {
        let sep = self.separator();
        let unified = if self.backslash_separators {
            raw.replace('/', "\\")
        } else {
            raw.to_string()
        };

        // both UNC prefixes are two ASCII bytes
        let prefix_len = if self.is_network_share(&unified) { 2 } else { 0 };
        let mut out = String::with_capacity(unified.len());
        out.push_str(&unified[..prefix_len]);

        let mut prev_sep = false;
        for ch in unified[prefix_len..].chars() {
            if ch == sep {
                if prev_sep {
                    continue;
                }
                prev_sep = true;
            } else {
                prev_sep = false;
            }
            out.push(ch);
        }

        while out.len() > prefix_len + 1 && out.ends_with(sep) && !is_drive_root(&out) {
            out.pop();
        }
        out
    }

    /// Comparison key: [`tidy`](Self::tidy) plus case folding where the
    /// platform ignores case.
    pub fn normalize(&self, raw: &str) -> String {
        let tidy = self.tidy(raw);
        if self.case_insensitive {
            tidy.to_lowercase()
        } else {
            tidy
        }
    }
}

impl Default for PathRules {
    fn default() -> Self {
        Self::native()
    }
}

fn is_drive_root(s: &str) -> bool {
    let b = s.as_bytes();
    b.len() == 3 && b[0].is_ascii_alphabetic() && b[1] == b':'
}

/// Strip one level of matching surrounding quotes, a common artifact of
/// pasting a path copied from a shell or from "Copy as path".
pub fn strip_quotes(text: &str) -> &str {
    for quote in ['"', '\''] {
        if text.len() >= 2 && text.starts_with(quote) && text.ends_with(quote) {
            return &text[1..text.len() - 1];
        }
    }
    text
}

/// Expand a leading `~` to the current user's home directory.
pub fn expand_user(raw: &str) -> String {
    let rest = if raw == "~" {
        Some("")
    } else {
        raw.strip_prefix("~/").or_else(|| raw.strip_prefix("~\\"))
    };

    match (rest, dirs::home_dir()) {
        (Some(""), Some(home)) => home.to_string_lossy().into_owned(),
        (Some(rest), Some(home)) => home.join(rest).to_string_lossy().into_owned(),
        _ => raw.to_string(),
    }
}

/// Builds [`OpenRequest`]s from raw caller input.
#[derive(Debug, Clone, Copy, Default)]
pub struct Validator {
    rules: PathRules,
}

impl Validator {
    pub fn new(rules: PathRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> PathRules {
        self.rules
    }

    /// Split input into accepted folders and rejected raw entries, without
    /// failing. Duplicates are dropped (first occurrence wins) and blank
    /// entries are ignored.
    pub fn partition<S: AsRef<str>>(&self, raw: &[S]) -> (Vec<FolderPath>, Vec<String>) {
        let mut seen = HashSet::new();
        let mut accepted = Vec::new();
        let mut rejected = Vec::new();

        for entry in raw {
            let entry = entry.as_ref();
            let cleaned = strip_quotes(entry.trim()).trim();
            if cleaned.is_empty() {
                continue;
            }

            let folder = self.classify(cleaned);
            if !seen.insert(self.rules.normalize(folder.as_str())) {
                debug!("Dropping duplicate path: {}", entry);
                continue;
            }

            match folder.kind() {
                PathKind::NetworkShare => {
                    debug!("Network share passed through unchecked: {}", folder);
                    accepted.push(folder);
                }
                PathKind::Local if folder.as_path().is_dir() => accepted.push(folder),
                PathKind::Local => {
                    debug!("Not a directory: {} (from '{}')", folder, entry);
                    rejected.push(entry.to_string());
                }
            }
        }

        (accepted, rejected)
    }

    /// Strict validation: any missing local directory fails the whole request.
    pub fn validate<S: AsRef<str>>(&self, raw: &[S]) -> Result<OpenRequest, ValidationError> {
        let (accepted, rejected) = self.partition(raw);
        if !rejected.is_empty() {
            return Err(ValidationError::NotADirectory { paths: rejected });
        }
        OpenRequest::from_folders(accepted)
    }

    fn classify(&self, cleaned: &str) -> FolderPath {
        if self.rules.is_network_share(cleaned) {
            return FolderPath::new(self.rules.tidy(cleaned), PathKind::NetworkShare);
        }

        let expanded = PathBuf::from(expand_user(cleaned));
        let absolute = if expanded.is_absolute() {
            expanded
        } else {
            match std::env::current_dir() {
                Ok(cwd) => cwd.join(expanded),
                Err(_) => expanded,
            }
        };
        FolderPath::new(
            self.rules.tidy(&absolute.to_string_lossy()),
            PathKind::Local,
        )
    }
}

/// Validate with the native platform rules.
pub fn validate<S: AsRef<str>>(raw: &[S]) -> Result<OpenRequest, ValidationError> {
    Validator::default().validate(raw)
}
