//! VRF Manager - per-tenant VRF lifecycle on the local host
//!
//! Every operation reads the live kernel state first and mutates it in
//! place; nothing is cached between calls.

use fabric_common::{
    FabricError, FabricResult, IpFamily, LinkKind, NetlinkOps, SysctlConfigurator,
};
use fabric_identity::{vrf_interface_name, AttachmentId, VpcId};
use parking_lot::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::allocator;
use crate::types::VrfInfo;

/// VRF Manager
///
/// Creates, flushes and removes tenant VRF devices through an injected
/// kernel capability. A failed step is not rolled back; the error is
/// returned and whatever was applied stays applied.
pub struct VrfMgr<K, S> {
    kernel: K,
    sysctl: S,

    /// Apply per-interface sysctls to new VRF links
    configure_sysctls: bool,

    /// Serializes allocate -> create within this process
    alloc_lock: Mutex<()>,
}

impl<K: NetlinkOps, S: SysctlConfigurator> VrfMgr<K, S> {
    /// Create a new VrfMgr instance
    pub fn new(kernel: K, sysctl: S) -> Self {
        Self {
            kernel,
            sysctl,
            configure_sysctls: true,
            alloc_lock: Mutex::new(()),
        }
    }

    /// Enable or disable sysctl configuration of new VRF links
    pub fn with_sysctls(mut self, enabled: bool) -> Self {
        self.configure_sysctls = enabled;
        self
    }

    /// Kernel capability in use
    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    /// Sysctl configurator in use
    pub fn sysctl(&self) -> &S {
        &self.sysctl
    }

    /// Create the VRF for a (VPC, attachment) pair.
    ///
    /// Picks the smallest free table ID, purges any stale routes left in
    /// that table, creates the VRF link bound to it, tunes the interface
    /// and brings it up. If the VRF already exists, only the last two
    /// steps are re-applied and the existing binding is returned.
    #[instrument(skip(self))]
    pub fn add(&self, vpc: &str, attachment: &str) -> FabricResult<VrfInfo> {
        let name = vrf_interface_name(vpc, attachment);
        let _guard = self.alloc_lock.lock();

        match allocator::table_id_for_name(&self.kernel, &name) {
            Ok(table_id) => {
                info!(vrf = %name, table_id, "VRF already exists, re-applying link settings");
                self.check_table_owner(&name, table_id)?;
                self.bring_up(&name)?;
                return Ok(VrfInfo::new(name, table_id));
            }
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e),
        }

        let table_id = allocator::find_next_available_table_id(&self.kernel)?;

        self.flush(table_id)?;
        self.kernel.create_vrf(&name, table_id)?;
        self.check_table_owner(&name, table_id)?;
        self.bring_up(&name)?;

        info!(vrf = %name, table_id, "Created VRF");
        Ok(VrfInfo::new(name, table_id))
    }

    /// [`VrfMgr::add`] for typed identifiers
    pub fn add_ids(&self, vpc: VpcId, attachment: AttachmentId) -> FabricResult<VrfInfo> {
        self.add(&vpc.to_base62(), &attachment.to_base62())
    }

    /// Remove the VRF for a (VPC, attachment) pair.
    ///
    /// Routes in its table are purged before the link is deleted. Fails
    /// with [`FabricError::NotFound`] if no such VRF exists.
    #[instrument(skip(self))]
    pub fn delete(&self, vpc: &str, attachment: &str) -> FabricResult<()> {
        let name = vrf_interface_name(vpc, attachment);
        let table_id = allocator::table_id_for_name(&self.kernel, &name)?;

        self.flush(table_id)?;
        self.kernel.delete_link(&name)?;

        info!(vrf = %name, table_id, "Deleted VRF");
        Ok(())
    }

    /// [`VrfMgr::delete`] for typed identifiers
    pub fn delete_ids(&self, vpc: VpcId, attachment: AttachmentId) -> FabricResult<()> {
        self.delete(&vpc.to_base62(), &attachment.to_base62())
    }

    /// Delete every IPv4 then IPv6 route in `table_id`, stopping at the
    /// first failure.
    #[instrument(skip(self))]
    pub fn flush(&self, table_id: u32) -> FabricResult<()> {
        for family in IpFamily::ALL {
            let routes = self.kernel.list_routes(family, table_id)?;
            if routes.is_empty() {
                continue;
            }

            debug!(%family, table_id, count = routes.len(), "Flushing routes");
            for route in &routes {
                self.kernel.delete_route(route)?;
            }
        }
        Ok(())
    }

    /// All live VRFs
    pub fn list_vrfs(&self) -> FabricResult<Vec<VrfInfo>> {
        allocator::list_vrfs(&self.kernel)
    }

    /// Table ID of the VRF for a (VPC, attachment) pair
    pub fn table_id_for(&self, vpc: &str, attachment: &str) -> FabricResult<u32> {
        allocator::table_id_for_vpc(&self.kernel, vpc, attachment)
    }

    fn bring_up(&self, name: &str) -> FabricResult<()> {
        if self.configure_sysctls {
            self.sysctl.configure_interface_sysctls(name)?;
        }
        self.kernel.set_link_up(name)
    }

    /// Another process may have bound a VRF to the same table between our
    /// scan and our create. The link with the lower index was created first
    /// and keeps the table; a later one is removed again. If the removal
    /// fails, that error is returned instead of the conflict, since the
    /// link is still there.
    fn check_table_owner(&self, name: &str, table_id: u32) -> FabricResult<()> {
        let bound: Vec<_> = self
            .kernel
            .list_links(Some(LinkKind::Vrf))?
            .into_iter()
            .filter(|link| link.is_vrf() && link.vrf_table == Some(table_id))
            .collect();

        let Some(ours) = bound.iter().find(|link| link.name == name) else {
            return Ok(());
        };

        let Some(owner) = bound
            .iter()
            .filter(|link| link.name != name && link.index < ours.index)
            .min_by_key(|link| link.index)
        else {
            return Ok(());
        };

        warn!(
            vrf = %name,
            owner = %owner.name,
            table_id,
            "Table ID taken by a concurrent VRF creation, removing new link"
        );
        self.kernel.delete_link(name)?;

        Err(FabricError::TableIdConflict {
            name: name.to_string(),
            table_id,
        })
    }
}
