//! Per-interface kernel parameter tuning.
//!
//! Every VRF link created by the lifecycle manager gets the same fixed set
//! of parameters: reverse-path filtering off, forwarding on for both
//! families, proxy ARP and proxy NDP on.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, instrument};

use crate::error::{FabricError, FabricResult};

/// Default mount point of the sysctl tree.
pub const PROC_SYS: &str = "/proc/sys";

/// Key templates (`{}` is the interface name) and values, applied in order.
pub const INTERFACE_SETTINGS: [(&str, &str); 5] = [
    ("net.ipv4.conf.{}.rp_filter", "0"),
    ("net.ipv4.conf.{}.forwarding", "1"),
    ("net.ipv6.conf.{}.forwarding", "1"),
    ("net.ipv4.conf.{}.proxy_arp", "1"),
    ("net.ipv6.conf.{}.proxy_ndp", "1"),
];

/// Returns the dotted keys and values for one interface, in apply order.
pub fn interface_settings(iface: &str) -> Vec<(String, &'static str)> {
    INTERFACE_SETTINGS
        .iter()
        .map(|(template, value)| (template.replace("{}", iface), *value))
        .collect()
}

/// Sysctl configurator invoked once per created VRF link.
pub trait SysctlConfigurator {
    /// Applies [`INTERFACE_SETTINGS`] to `iface`, stopping at the first failure.
    fn configure_interface_sysctls(&self, iface: &str) -> FabricResult<()>;
}

impl<T: SysctlConfigurator + ?Sized> SysctlConfigurator for &T {
    fn configure_interface_sysctls(&self, iface: &str) -> FabricResult<()> {
        (**self).configure_interface_sysctls(iface)
    }
}

/// Writes sysctls through the `/proc/sys` file tree.
#[derive(Debug, Clone)]
pub struct ProcSysctl {
    root: PathBuf,
}

impl ProcSysctl {
    /// Creates a configurator rooted at `/proc/sys`.
    pub fn new() -> Self {
        Self::with_root(PROC_SYS)
    }

    /// Creates a configurator rooted at an arbitrary directory.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a dotted key to its file under the root.
    ///
    /// Only the separators are translated; an interface name is a single
    /// path component and never contains dots in this system.
    pub fn key_path(&self, key: &str) -> PathBuf {
        key.split('.').fold(self.root.clone(), |path, part| path.join(part))
    }

    /// Writes a single key.
    pub fn set(&self, key: &str, value: &str) -> FabricResult<()> {
        let path = self.key_path(key);
        fs::write(&path, value).map_err(|source| FabricError::Sysctl {
            key: key.to_string(),
            source,
        })?;
        debug!(key = %key, value = %value, "Set sysctl");
        Ok(())
    }
}

impl Default for ProcSysctl {
    fn default() -> Self {
        Self::new()
    }
}

impl SysctlConfigurator for ProcSysctl {
    #[instrument(skip(self))]
    fn configure_interface_sysctls(&self, iface: &str) -> FabricResult<()> {
        for (key, value) in interface_settings(iface) {
            self.set(&key, value)?;
        }
        Ok(())
    }
}

/// Configurator that does nothing, for hosts where sysctls are managed elsewhere.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSysctl;

impl SysctlConfigurator for NoopSysctl {
    fn configure_interface_sysctls(&self, iface: &str) -> FabricResult<()> {
        debug!(iface = %iface, "Sysctl configuration disabled");
        Ok(())
    }
}
