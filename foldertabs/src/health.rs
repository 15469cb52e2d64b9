//! Diagnostics for the automation channels the tiers depend on.
//!
//! Purely informational: the escalation controller never consults it, it
//! finds out by trying. `foldertabs doctor` prints it so a user can see why
//! folders keep opening as separate windows.

use crate::TierKind;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Overall health of the automation stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// The top-ranked tier should work.
    Healthy,
    /// Tabs are still possible through a lower tier.
    Degraded,
    /// Only separate windows will open.
    Unhealthy,
}

impl HealthStatus {
    /// Process exit code for `foldertabs doctor`.
    pub fn exit_code(&self) -> i32 {
        match self {
            HealthStatus::Healthy => 0,
            HealthStatus::Degraded => 1,
            HealthStatus::Unhealthy => 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckResult {
    pub status: HealthStatus,

    /// UI Automation client creatable / `osascript` runnable.
    pub api_available: bool,

    /// Explorer windows enumerable / Finder answers Apple events.
    pub file_manager_reachable: bool,

    /// Desktop reachable through UIA / System Events GUI scripting enabled.
    pub input_permitted: bool,

    /// Tier the controller is expected to settle on, judging by the above.
    pub expected_tier: Option<TierKind>,

    pub check_duration_ms: u64,

    /// "windows", "macos", ...
    pub platform: String,

    pub error_message: Option<String>,

    pub diagnostics: HashMap<String, serde_json::Value>,
}

impl Default for HealthCheckResult {
    fn default() -> Self {
        Self {
            status: HealthStatus::Unhealthy,
            api_available: false,
            file_manager_reachable: false,
            input_permitted: false,
            expected_tier: None,
            check_duration_ms: 0,
            platform: std::env::consts::OS.to_string(),
            error_message: Some("Health check not performed".to_string()),
            diagnostics: HashMap::new(),
        }
    }
}

impl HealthCheckResult {
    pub fn healthy(platform: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Healthy,
            api_available: true,
            file_manager_reachable: true,
            input_permitted: true,
            error_message: None,
            platform: platform.into(),
            ..Default::default()
        }
    }

    pub fn unhealthy(platform: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            platform: platform.into(),
            error_message: Some(error.into()),
            ..Default::default()
        }
    }

    /// Recompute `status` from the component flags.
    pub fn update_status(&mut self) {
        self.status = if self.api_available && self.file_manager_reachable && self.input_permitted
        {
            HealthStatus::Healthy
        } else if self.api_available {
            HealthStatus::Degraded
        } else {
            HealthStatus::Unhealthy
        };
    }

    pub fn add_diagnostic(&mut self, key: impl Into<String>, value: impl Serialize) {
        if let Ok(json_value) = serde_json::to_value(value) {
            self.diagnostics.insert(key.into(), json_value);
        }
    }
}

#[async_trait]
pub trait PlatformHealthCheck: Send + Sync {
    async fn check_health(&self) -> HealthCheckResult;

    /// Just whether the richest channel is there at all.
    async fn quick_check(&self) -> bool {
        self.check_health().await.api_available
    }
}

pub fn get_platform_health_checker() -> Box<dyn PlatformHealthCheck> {
    #[cfg(target_os = "windows")]
    {
        Box::new(crate::platforms::windows::health::WindowsHealthChecker::new())
    }

    #[cfg(target_os = "macos")]
    {
        Box::new(crate::platforms::macos::health::MacOSHealthChecker::new())
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        Box::new(UnsupportedPlatformHealthChecker)
    }
}

pub async fn check_automation_health() -> HealthCheckResult {
    get_platform_health_checker().check_health().await
}

/// Neither Explorer nor Finder exists here.
#[allow(dead_code)]
struct UnsupportedPlatformHealthChecker;

#[async_trait]
impl PlatformHealthCheck for UnsupportedPlatformHealthChecker {
    async fn check_health(&self) -> HealthCheckResult {
        let mut result = HealthCheckResult::unhealthy(
            std::env::consts::OS,
            "no supported file manager on this platform",
        );
        result.add_diagnostic("supported_platforms", ["windows", "macos"]);
        result
    }
}
