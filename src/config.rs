//! Configuration management for cubby
//!
//! Handles loading and saving configuration from ~/.config/cubby/config.toml

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration file name
const CONFIG_FILE: &str = "config.toml";

/// Application name for config directory
const APP_NAME: &str = "cubby";

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("Could not determine config directory")]
    NoConfigDir,
}

/// Result type for config operations
pub type ConfigResult<T> = Result<T, ConfigError>;

fn default_enabled() -> bool {
    true
}

fn default_shared_dir() -> PathBuf {
    PathBuf::from("/root/nas_shared")
}

fn default_bind_addr() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    8000
}

fn default_max_upload_bytes() -> usize {
    512 * 1024 * 1024
}

fn default_shutdown_grace_secs() -> u64 {
    5
}

fn default_smb_conf_path() -> PathBuf {
    PathBuf::from("/etc/samba/smb.conf")
}

fn default_smb_service() -> String {
    "smbd".to_string()
}

fn default_workgroup() -> String {
    "WORKGROUP".to_string()
}

fn default_server_string() -> String {
    "Cubby NAS Server".to_string()
}

fn default_netbios_name() -> String {
    "Cubby".to_string()
}

fn default_share_name() -> String {
    "nas_shared".to_string()
}

fn default_create_mask() -> String {
    "0755".to_string()
}

/// Application configuration
///
/// Every field has a default, so an empty (or missing) config file yields a
/// fully working setup: one guest-accessible share under /root/nas_shared,
/// served over SMB and HTTP on port 8000.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Whether the plugin should do anything at all
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Directory holding the shared files
    #[serde(default = "default_shared_dir")]
    pub shared_dir: PathBuf,

    /// Address the HTTP server binds to
    #[serde(default = "default_bind_addr")]
    pub bind_addr: IpAddr,

    /// Port the HTTP server listens on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Upper bound on upload request bodies, in bytes
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,

    /// How long to wait for in-flight requests when stopping the server
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,

    /// Where the generated Samba configuration is written
    #[serde(default = "default_smb_conf_path")]
    pub smb_conf_path: PathBuf,

    /// systemd unit to restart after rewriting the Samba config
    #[serde(default = "default_smb_service")]
    pub smb_service: String,

    /// Windows workgroup advertised by the share
    #[serde(default = "default_workgroup")]
    pub workgroup: String,

    /// Human-readable server description
    #[serde(default = "default_server_string")]
    pub server_string: String,

    /// NetBIOS name the box shows up as
    #[serde(default = "default_netbios_name")]
    pub netbios_name: String,

    /// Name of the exported share
    #[serde(default = "default_share_name")]
    pub share_name: String,

    /// Permission mask for files created through the share
    #[serde(default = "default_create_mask")]
    pub create_mask: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            shared_dir: default_shared_dir(),
            bind_addr: default_bind_addr(),
            port: default_port(),
            max_upload_bytes: default_max_upload_bytes(),
            shutdown_grace_secs: default_shutdown_grace_secs(),
            smb_conf_path: default_smb_conf_path(),
            smb_service: default_smb_service(),
            workgroup: default_workgroup(),
            server_string: default_server_string(),
            netbios_name: default_netbios_name(),
            share_name: default_share_name(),
            create_mask: default_create_mask(),
        }
    }
}

impl Config {
    /// Create a configuration with all defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the config file path
    ///
    /// Returns ~/.config/cubby/config.toml on Linux/macOS
    pub fn config_path() -> ConfigResult<PathBuf> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Get the config directory path
    ///
    /// Returns ~/.config/cubby on Linux/macOS
    pub fn config_dir() -> ConfigResult<PathBuf> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join(APP_NAME))
    }

    /// Load configuration from the default location
    ///
    /// Returns default config if the file doesn't exist
    pub fn load() -> ConfigResult<Self> {
        let path = Self::config_path()?;

        if !path.exists() {
            return Ok(Self::default());
        }

        Self::load_from(&path)
    }

    /// Load configuration from an explicit path
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to the default location
    ///
    /// Creates the config directory if it doesn't exist
    pub fn save(&self) -> ConfigResult<()> {
        let path = Self::config_path()?;
        let dir = Self::config_dir()?;

        if !dir.exists() {
            fs::create_dir_all(&dir)?;
        }

        let contents = toml::to_string_pretty(self)?;
        fs::write(&path, contents)?;
        Ok(())
    }

    /// Socket address the HTTP server binds to
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }
}

/// Format the configuration for display
pub fn format_config(config: &Config) -> String {
    let mut lines = Vec::new();

    lines.push("Current configuration:".to_string());
    lines.push(String::new());
    lines.push(format!("  enabled = {}", config.enabled));
    lines.push(format!("  shared_dir = {:?}", config.shared_dir));
    lines.push(format!("  bind_addr = \"{}\"", config.bind_addr));
    lines.push(format!("  port = {}", config.port));
    lines.push(format!("  max_upload_bytes = {}", config.max_upload_bytes));
    lines.push(format!(
        "  shutdown_grace_secs = {}",
        config.shutdown_grace_secs
    ));
    lines.push(format!("  smb_conf_path = {:?}", config.smb_conf_path));
    lines.push(format!("  smb_service = \"{}\"", config.smb_service));
    lines.push(format!("  workgroup = \"{}\"", config.workgroup));
    lines.push(format!("  server_string = \"{}\"", config.server_string));
    lines.push(format!("  netbios_name = \"{}\"", config.netbios_name));
    lines.push(format!("  share_name = \"{}\"", config.share_name));
    lines.push(format!("  create_mask = \"{}\"", config.create_mask));

    lines.join("\n")
}
