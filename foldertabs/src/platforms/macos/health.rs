//! macOS health check: osascript, Finder and GUI scripting permission

use super::osascript::OsaScriptRunner;
use crate::health::{HealthCheckResult, PlatformHealthCheck};
use crate::tiers::ScriptRunner;
use crate::TierKind;
use async_trait::async_trait;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

const PROBE_OSASCRIPT: &str = "return 1";
const PROBE_FINDER: &str = r#"tell application "Finder" to count Finder windows"#;
const PROBE_UI_SCRIPTING: &str = r#"tell application "System Events" to return UI elements enabled"#;

pub struct MacOSHealthChecker;

impl Default for MacOSHealthChecker {
    fn default() -> Self {
        Self::new()
    }
}

impl MacOSHealthChecker {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PlatformHealthCheck for MacOSHealthChecker {
    async fn check_health(&self) -> HealthCheckResult {
        let start = Instant::now();
        let mut result = match tokio::task::spawn_blocking(perform_sync_health_check).await {
            Ok(result) => result,
            Err(e) => HealthCheckResult::unhealthy(
                "macos",
                format!("Failed to spawn health check task: {e}"),
            ),
        };
        result.check_duration_ms = start.elapsed().as_millis() as u64;
        result
    }
}

fn perform_sync_health_check() -> HealthCheckResult {
    let runner = OsaScriptRunner;
    let mut result = HealthCheckResult {
        platform: "macos".to_string(),
        expected_tier: Some(TierKind::SeparateWindows),
        error_message: None,
        ..Default::default()
    };

    if let Err(e) = runner.run(PROBE_OSASCRIPT, PROBE_TIMEOUT) {
        warn!("osascript not usable: {}", e);
        result.error_message = Some(e.to_string());
        result.update_status();
        return result;
    }
    result.api_available = true;

    match runner.run(PROBE_FINDER, PROBE_TIMEOUT) {
        Ok(count) => {
            result.file_manager_reachable = true;
            result.add_diagnostic("finder_windows", count.parse::<u32>().unwrap_or(0));
        }
        Err(e) => {
            warn!("Finder did not answer: {}", e);
            result.error_message = Some(e.to_string());
        }
    }

    match runner.run(PROBE_UI_SCRIPTING, PROBE_TIMEOUT) {
        Ok(enabled) => {
            debug!("UI elements enabled: {}", enabled);
            result.input_permitted = enabled == "true";
            if !result.input_permitted {
                result.error_message = Some(
                    "Accessibility permission is required to open tabs (System Settings > Privacy & Security > Accessibility)"
                        .to_string(),
                );
            }
        }
        Err(e) => {
            warn!("System Events did not answer: {}", e);
            result.error_message = Some(e.to_string());
        }
    }

    if result.file_manager_reachable && result.input_permitted {
        result.expected_tier = Some(TierKind::ScriptedUi);
    }
    result.update_status();
    result
}
