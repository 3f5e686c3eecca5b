//! Mock service manager for testing.
//!
//! Records every service command instead of running it, with configurable
//! outcomes for exercising the failure paths without a real systemd.

use std::io;
use std::sync::{Arc, Mutex};

use super::{ServiceManager, ServiceStatus};

/// A recorded service command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceCall {
    /// The systemctl verb ("restart" or "stop")
    pub action: String,
    /// The unit the command targeted
    pub unit: String,
}

/// How the mock responds to commands.
#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Every command exits zero
    Succeed,
    /// Every command runs but exits non-zero with this stderr detail
    ExitFailure(String),
    /// Commands cannot be spawned at all (missing binary)
    SpawnError,
}

/// Mock service manager that records calls instead of touching systemd.
#[derive(Debug, Clone)]
pub struct MockServiceManager {
    behavior: MockBehavior,
    calls: Arc<Mutex<Vec<ServiceCall>>>,
}

impl MockServiceManager {
    /// Create a mock where every command succeeds
    pub fn new() -> Self {
        Self::with_behavior(MockBehavior::Succeed)
    }

    /// Create a mock with the given behavior
    pub fn with_behavior(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// The commands issued so far, in order
    pub fn calls(&self) -> Vec<ServiceCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, action: &str, unit: &str) -> io::Result<ServiceStatus> {
        self.calls.lock().unwrap().push(ServiceCall {
            action: action.to_string(),
            unit: unit.to_string(),
        });

        match &self.behavior {
            MockBehavior::Succeed => Ok(ServiceStatus::ok()),
            MockBehavior::ExitFailure(detail) => Ok(ServiceStatus::failed(detail.clone())),
            MockBehavior::SpawnError => Err(io::Error::new(
                io::ErrorKind::NotFound,
                "systemctl not found",
            )),
        }
    }
}

impl Default for MockServiceManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceManager for MockServiceManager {
    fn restart(&self, unit: &str) -> io::Result<ServiceStatus> {
        self.record("restart", unit)
    }

    fn stop(&self, unit: &str) -> io::Result<ServiceStatus> {
        self.record("stop", unit)
    }
}
