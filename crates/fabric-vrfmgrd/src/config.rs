//! Configuration file support for vrfmgrd
//!
//! Loads and validates vrfmgrd configuration from TOML files.
//! Default location: /etc/fabric/vrfmgrd.toml

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use fabric_common::{sysctl::PROC_SYS, FabricError, FabricResult};
use fabric_identity::encode_srv6_endpoint;
use serde::{Deserialize, Serialize};

/// Default configuration file path
pub const DEFAULT_CONFIG_PATH: &str = "/etc/fabric/vrfmgrd.toml";

/// Per-interface sysctl configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SysctlConfig {
    /// Apply sysctls to new VRF links
    #[serde(default = "default_sysctl_enabled")]
    pub enabled: bool,

    /// Root of the sysctl tree
    #[serde(default = "default_sysctl_root")]
    pub root: PathBuf,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default level, overridden by RUST_LOG
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of text
    #[serde(default)]
    pub json: bool,
}

/// SRv6 configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Srv6Config {
    /// Site prefix used when encoding endpoints, e.g. "2607:ed40:ff00::/48"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_prefix: Option<String>,
}

/// Complete vrfmgrd configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VrfMgrConfig {
    #[serde(default)]
    pub sysctl: SysctlConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub srv6: Srv6Config,
}

fn default_sysctl_enabled() -> bool {
    true
}

fn default_sysctl_root() -> PathBuf {
    PathBuf::from(PROC_SYS)
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for SysctlConfig {
    fn default() -> Self {
        Self {
            enabled: default_sysctl_enabled(),
            root: default_sysctl_root(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl VrfMgrConfig {
    /// Load configuration from file, falling back to defaults if file not found
    pub fn load_or_default(path: impl AsRef<Path>) -> FabricResult<Self> {
        let path = path.as_ref();

        match fs::read_to_string(path) {
            Ok(content) => Self::from_toml(&content).map_err(|e| {
                FabricError::config(format!(
                    "Failed to parse config file {}: {}",
                    path.display(),
                    e
                ))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(FabricError::config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))),
        }
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Serialize configuration to TOML
    pub fn to_toml(&self) -> FabricResult<String> {
        toml::to_string_pretty(self)
            .map_err(|e| FabricError::config(format!("Failed to serialize config: {}", e)))
    }

    /// Validate configuration
    pub fn validate(&self) -> FabricResult<()> {
        if tracing::Level::from_str(&self.logging.level).is_err() {
            return Err(FabricError::config(format!(
                "logging.level must be one of trace, debug, info, warn, error (got {:?})",
                self.logging.level
            )));
        }

        if !self.sysctl.root.is_absolute() {
            return Err(FabricError::config(format!(
                "sysctl.root must be an absolute path (got {})",
                self.sysctl.root.display()
            )));
        }

        if let Some(prefix) = &self.srv6.site_prefix {
            encode_srv6_endpoint(prefix, "0", "0").map_err(|e| {
                FabricError::config(format!("srv6.site_prefix is not usable: {}", e))
            })?;
        }

        Ok(())
    }
}
