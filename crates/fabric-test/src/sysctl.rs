//! Sysctl configurator that records instead of writing

use fabric_common::{FabricError, FabricResult, SysctlConfigurator};
use parking_lot::Mutex;
use std::io;

/// Records every configured interface; can be told to fail
#[derive(Debug, Default)]
pub struct RecordingSysctl {
    configured: Mutex<Vec<String>>,
    fail: Mutex<bool>,
}

impl RecordingSysctl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every later call with a permission error
    pub fn fail(&self) {
        *self.fail.lock() = true;
    }

    /// Interfaces configured so far, in call order
    pub fn configured(&self) -> Vec<String> {
        self.configured.lock().clone()
    }
}

impl SysctlConfigurator for RecordingSysctl {
    fn configure_interface_sysctls(&self, iface: &str) -> FabricResult<()> {
        self.configured.lock().push(iface.to_string());
        if *self.fail.lock() {
            return Err(FabricError::Sysctl {
                key: format!("net.ipv4.conf.{}.rp_filter", iface),
                source: io::Error::from(io::ErrorKind::PermissionDenied),
            });
        }
        Ok(())
    }
}
