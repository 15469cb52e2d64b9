//! Running AppleScript through the `osascript` binary.

use crate::script::is_permission_error;
use crate::tiers::ScriptRunner;
use crate::wait::{CompletionDetector, WaitOutcome};
use crate::AutomationError;
use std::io::Read;
use std::process::{Command, Output, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, warn};

const EXIT_POLL: Duration = Duration::from_millis(25);

/// Runs each script as `osascript -e <script>`, bounded by the given timeout.
/// An overrunning `osascript` is killed; Finder itself is left alone.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsaScriptRunner;

impl ScriptRunner for OsaScriptRunner {
    fn run(&self, script: &str, timeout: Duration) -> Result<String, AutomationError> {
        let output = run_bounded(Command::new("osascript").arg("-e").arg(script), timeout)?;
        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if output.status.success() {
            return Ok(stdout);
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        debug!("osascript failed ({}): {}", output.status, stderr);
        if is_permission_error(&stderr) {
            Err(AutomationError::PermissionDenied(stderr))
        } else {
            Err(AutomationError::PlatformError(format!("AppleScript error: {stderr}")))
        }
    }
}

/// Runs `command` to completion or kills it after `timeout`. Both pipes are
/// drained while it runs, so output larger than the pipe buffer cannot stall
/// the child.
fn run_bounded(command: &mut Command, timeout: Duration) -> Result<Output, AutomationError> {
    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| AutomationError::PlatformError(format!("Failed to run osascript: {e}")))?;

    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let status = match CompletionDetector::new(EXIT_POLL, timeout)
        .wait_for(|| child.try_wait().ok().flatten())
    {
        WaitOutcome::Settled(status) => status,
        other => {
            warn!("osascript still running ({:?}), killing it", other);
            let _ = child.kill();
            let _ = child.wait();
            return Err(AutomationError::Timeout(format!(
                "osascript did not finish within {timeout:?}"
            )));
        }
    };

    Ok(Output {
        status,
        stdout: stdout.join().unwrap_or_default(),
        stderr: stderr.join().unwrap_or_default(),
    })
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            if let Err(e) = pipe.read_to_end(&mut buf) {
                debug!("osascript pipe closed early: {e}");
            }
        }
        buf
    })
}

/// Start `osascript` without waiting for it. The child is reaped on a
/// background thread.
pub(crate) fn spawn_detached(script: &str) -> Result<(), AutomationError> {
    let mut child = Command::new("osascript")
        .arg("-e")
        .arg(script)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| AutomationError::PlatformError(format!("Failed to run osascript: {e}")))?;
    thread::spawn(move || {
        let _ = child.wait();
    });
    Ok(())
}
