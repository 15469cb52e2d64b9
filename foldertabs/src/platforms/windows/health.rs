//! Windows health check: COM, UI Automation and Explorer reachability

use super::explorer::explorer_windows;
use super::utils::create_ui_automation_with_com_init;
use crate::health::{HealthCheckResult, PlatformHealthCheck};
use crate::TierKind;
use async_trait::async_trait;
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

const CHECK_TIMEOUT: Duration = Duration::from_secs(5);

pub struct WindowsHealthChecker;

impl Default for WindowsHealthChecker {
    fn default() -> Self {
        Self::new()
    }
}

impl WindowsHealthChecker {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PlatformHealthCheck for WindowsHealthChecker {
    async fn check_health(&self) -> HealthCheckResult {
        let start = Instant::now();

        // COM calls block; keep them off the runtime and bounded
        let check = tokio::task::spawn_blocking(perform_sync_health_check);
        let mut result = match tokio::time::timeout(CHECK_TIMEOUT, check).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                error!("Failed to spawn UIAutomation health check task: {}", e);
                HealthCheckResult::unhealthy(
                    "windows",
                    format!("Failed to spawn health check task: {e}"),
                )
            }
            Err(_) => {
                error!("UIAutomation health check timed out after {:?}", CHECK_TIMEOUT);
                HealthCheckResult::unhealthy(
                    "windows",
                    "Health check timed out - UIAutomation may be unresponsive",
                )
            }
        };
        result.check_duration_ms = start.elapsed().as_millis() as u64;
        result
    }
}

fn perform_sync_health_check() -> HealthCheckResult {
    let mut result = HealthCheckResult {
        platform: "windows".to_string(),
        expected_tier: Some(TierKind::SeparateWindows),
        ..Default::default()
    };

    match explorer_windows() {
        Ok(windows) => {
            result.file_manager_reachable = true;
            result.add_diagnostic("explorer_windows", windows.len());
            result.expected_tier = Some(TierKind::KeystrokeInput);
        }
        Err(e) => {
            warn!("Explorer window enumeration failed: {}", e);
            result.error_message = Some(e.to_string());
        }
    }

    let automation = match create_ui_automation_with_com_init() {
        Ok(automation) => {
            debug!("UIAutomation instance created successfully");
            result.api_available = true;
            automation
        }
        Err(e) => {
            error!("Failed to create UIAutomation instance: {}", e);
            result.error_message = Some(format!("UIAutomation creation failed: {e}"));
            result.update_status();
            return result;
        }
    };

    match automation.get_root_element() {
        Ok(root) => {
            result.input_permitted = true;
            result.add_diagnostic("desktop_name", root.get_name().unwrap_or_default());
            if result.file_manager_reachable {
                result.expected_tier = Some(TierKind::UiAutomation);
                result.error_message = None;
            }
        }
        Err(e) => {
            error!("Failed to get desktop root element: {}", e);
            result.error_message = Some(format!(
                "Cannot access desktop: {e}. This typically indicates a locked or disconnected session."
            ));
        }
    }

    result.update_status();
    result
}
