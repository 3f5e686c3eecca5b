//! Plugin lifecycle adapter.
//!
//! Binds the shared directory, the Samba configurator, and the HTTP service
//! to a host's load/unload hooks. The hooks are the fault boundary: every
//! startup error is caught and logged here so a misconfigured NAS never
//! takes the host process down.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::config::Config;
use crate::samba::{SambaConfigurator, ServiceManager, SystemctlManager};
use crate::server::{start_server, ServerHandle};
use crate::storage::SharedDir;

/// Lifecycle interface a plugin host drives.
///
/// Hooks are synchronous and must never panic or propagate errors: a plugin
/// that fails to come up logs the fault and stays inert.
pub trait Plugin: Send {
    /// Stable name used in logs and host registries
    fn name(&self) -> &'static str;

    /// Called once when the host loads the plugin
    fn on_load(&mut self);

    /// Called when the host unloads the plugin
    fn on_unload(&mut self);
}

/// The NAS plugin: one shared folder, exported over Samba and HTTP.
pub struct NasPlugin {
    config: Config,
    shared: SharedDir,
    samba: SambaConfigurator,
    server: Option<ServerHandle>,
}

impl NasPlugin {
    /// Create the plugin with the real systemctl-backed service manager
    pub fn new(config: Config) -> Self {
        Self::with_service_manager(config, Arc::new(SystemctlManager::new()))
    }

    /// Create the plugin with an injected service manager
    pub fn with_service_manager(config: Config, service: Arc<dyn ServiceManager>) -> Self {
        let shared = SharedDir::new(&config.shared_dir);
        let samba = SambaConfigurator::new(&config, service);
        Self {
            config,
            shared,
            samba,
            server: None,
        }
    }

    /// Whether the HTTP service is currently up
    pub fn is_running(&self) -> bool {
        self.server
            .as_ref()
            .map(|server| server.is_running())
            .unwrap_or(false)
    }

    /// Address of the running HTTP service, if any
    pub fn server_addr(&self) -> Option<SocketAddr> {
        self.server.as_ref().map(|server| server.addr())
    }

    /// The full startup sequence. Each step depends on the previous one,
    /// so the first failure aborts the rest.
    fn try_load(&mut self) -> anyhow::Result<()> {
        self.shared.ensure()?;
        self.samba.apply()?;

        let handle = start_server(&self.config, self.shared.clone())?;
        info!(url = %handle.url(), "File service ready");
        self.server = Some(handle);
        Ok(())
    }
}

impl Plugin for NasPlugin {
    fn name(&self) -> &'static str {
        "cubby"
    }

    fn on_load(&mut self) {
        info!(plugin = self.name(), "Plugin loaded");

        if !self.config.enabled {
            info!(plugin = self.name(), "Disabled in config, skipping setup");
            return;
        }
        if self.server.is_some() {
            warn!(
                plugin = self.name(),
                "Already running, ignoring duplicate load"
            );
            return;
        }

        if let Err(e) = self.try_load() {
            error!(plugin = self.name(), error = %e, "Error during initialization");
        }
    }

    fn on_unload(&mut self) {
        info!(plugin = self.name(), "Plugin unloaded");

        if self.config.enabled {
            self.samba.teardown();
        }
        if let Some(mut server) = self.server.take() {
            server.stop();
        }
    }
}
