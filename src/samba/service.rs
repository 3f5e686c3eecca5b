//! Service control for the Samba daemon.
//!
//! Wraps the systemctl invocations behind a trait so the rest of the crate
//! never shells out directly, and tests can substitute a mock.

use std::io;
use std::process::Command;

use tracing::debug;

/// Outcome of a service command that actually ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceStatus {
    /// Whether the command exited zero
    pub success: bool,
    /// Trimmed stderr from the command, empty on clean exits
    pub detail: String,
}

impl ServiceStatus {
    /// A successful, silent outcome
    pub fn ok() -> Self {
        Self {
            success: true,
            detail: String::new(),
        }
    }

    /// A failed outcome with the given detail
    pub fn failed(detail: impl Into<String>) -> Self {
        Self {
            success: false,
            detail: detail.into(),
        }
    }
}

/// Trait for controlling system services.
///
/// The real implementation shells out to systemctl. An `Err` means the
/// command could not be run at all; `Ok` carries the exit outcome. Callers
/// decide whether a failure is fatal.
pub trait ServiceManager: Send + Sync {
    /// Restart the given unit
    fn restart(&self, unit: &str) -> io::Result<ServiceStatus>;

    /// Stop the given unit
    fn stop(&self, unit: &str) -> io::Result<ServiceStatus>;
}

/// Service manager backed by systemctl.
#[derive(Debug, Clone, Default)]
pub struct SystemctlManager;

impl SystemctlManager {
    /// Create a new systemctl-backed service manager
    pub fn new() -> Self {
        Self
    }

    fn run(&self, action: &str, unit: &str) -> io::Result<ServiceStatus> {
        debug!(action, unit, "Running systemctl");

        let output = Command::new("systemctl").arg(action).arg(unit).output()?;

        if output.status.success() {
            Ok(ServiceStatus::ok())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Ok(ServiceStatus::failed(stderr.trim()))
        }
    }
}

impl ServiceManager for SystemctlManager {
    fn restart(&self, unit: &str) -> io::Result<ServiceStatus> {
        self.run("restart", unit)
    }

    fn stop(&self, unit: &str) -> io::Result<ServiceStatus> {
        self.run("stop", unit)
    }
}
