//! Samba share configuration
//!
//! This module generates the smb.conf for the single exported share, writes it
//! to the system config path, and bounces the Samba service so the new config
//! takes effect. Service control goes through the [`ServiceManager`] trait so
//! tests can observe commands without a real systemd around.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{error, info};

use crate::config::Config;

pub mod mock;
mod service;

pub use service::{ServiceManager, ServiceStatus, SystemctlManager};

/// Template for the generated smb.conf.
///
/// One guest-accessible share, wide open on the local network. Samba option
/// names and values follow what stock smbd accepts.
const SMB_CONF_TEMPLATE: &str = "\
[global]
    workgroup = {{ workgroup }}
    server string = {{ server_string }}
    netbios name = {{ netbios_name }}
    security = user
    map to guest = Bad User
    dns proxy = no

[{{ share_name }}]
    path = {{ shared_dir }}
    browsable = yes
    writable = yes
    guest ok = yes
    read only = no
    create mask = {{ create_mask }}
";

/// Samba configuration errors
#[derive(Error, Debug)]
pub enum SambaError {
    #[error("Failed to render smb.conf: {0}")]
    RenderFailed(#[from] minijinja::Error),

    #[error("Failed to write Samba config to {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to run service command for {unit}: {source}")]
    ServiceCommandFailed {
        unit: String,
        #[source]
        source: io::Error,
    },
}

/// Result type for Samba operations
pub type SambaResult<T> = Result<T, SambaError>;

/// The values that feed the generated smb.conf.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShareDefinition {
    /// Windows workgroup the server joins
    pub workgroup: String,
    /// Human-readable server description
    pub server_string: String,
    /// NetBIOS name the box advertises
    pub netbios_name: String,
    /// Name of the exported share section
    pub share_name: String,
    /// Directory the share exports
    pub shared_dir: PathBuf,
    /// Permission mask for files created through the share
    pub create_mask: String,
}

impl ShareDefinition {
    /// Build a share definition from the application config
    pub fn from_config(config: &Config) -> Self {
        Self {
            workgroup: config.workgroup.clone(),
            server_string: config.server_string.clone(),
            netbios_name: config.netbios_name.clone(),
            share_name: config.share_name.clone(),
            shared_dir: config.shared_dir.clone(),
            create_mask: config.create_mask.clone(),
        }
    }

    /// Render the smb.conf contents for this share
    pub fn render(&self) -> SambaResult<String> {
        let env = minijinja::Environment::new();
        let rendered = env.render_str(SMB_CONF_TEMPLATE, self)?;
        Ok(rendered)
    }

    /// Render and write the smb.conf to the given path.
    ///
    /// Creates the parent directory if it doesn't exist.
    pub fn write_to(&self, path: &Path) -> SambaResult<()> {
        let contents = self.render()?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| SambaError::WriteFailed {
                    path: path.to_path_buf(),
                    source: e,
                })?;
            }
        }

        std::fs::write(path, contents).map_err(|e| SambaError::WriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

        info!(path = %path.display(), share = %self.share_name, "Samba configuration written");
        Ok(())
    }
}

/// Applies the share definition to the system.
///
/// Owns the policy around service control: a config file that can't be
/// written is a hard error, a service that runs its command but exits
/// non-zero is logged and otherwise ignored, so a broken smbd never takes
/// the HTTP side down with it.
pub struct SambaConfigurator {
    definition: ShareDefinition,
    conf_path: PathBuf,
    unit: String,
    service: Arc<dyn ServiceManager>,
}

impl SambaConfigurator {
    /// Create a configurator from the application config and a service manager
    pub fn new(config: &Config, service: Arc<dyn ServiceManager>) -> Self {
        Self {
            definition: ShareDefinition::from_config(config),
            conf_path: config.smb_conf_path.clone(),
            unit: config.smb_service.clone(),
            service,
        }
    }

    /// The share definition this configurator applies
    pub fn definition(&self) -> &ShareDefinition {
        &self.definition
    }

    /// Write the smb.conf and restart the Samba service.
    ///
    /// A restart that runs but exits non-zero is logged, not returned; a
    /// restart command that can't run at all is a hard error.
    pub fn apply(&self) -> SambaResult<()> {
        self.definition.write_to(&self.conf_path)?;

        match self.service.restart(&self.unit) {
            Ok(status) if status.success => {
                info!(unit = %self.unit, "Samba service restarted");
            }
            Ok(status) => {
                error!(unit = %self.unit, detail = %status.detail, "Samba restart exited with failure");
            }
            Err(e) => {
                return Err(SambaError::ServiceCommandFailed {
                    unit: self.unit.clone(),
                    source: e,
                });
            }
        }

        Ok(())
    }

    /// Stop the Samba service.
    ///
    /// Failures are logged, not returned, so teardown always completes.
    pub fn teardown(&self) {
        match self.service.stop(&self.unit) {
            Ok(status) if status.success => {
                info!(unit = %self.unit, "Samba service stopped");
            }
            Ok(status) => {
                error!(unit = %self.unit, detail = %status.detail, "Samba stop exited with failure");
            }
            Err(e) => {
                error!(unit = %self.unit, error = %e, "Could not run Samba stop command");
            }
        }
    }
}
