//! VRF routing table ID allocation
//!
//! Table IDs are not tracked anywhere but in the kernel: the set of live VRF
//! links is read back on every call and the smallest unused ID is handed out.

use std::collections::BTreeSet;

use fabric_common::{FabricError, FabricResult, LinkKind, NetlinkOps};
use fabric_identity::vrf_interface_name;
use tracing::{debug, warn};

use crate::types::{VrfInfo, MAX_TABLE_ID, MIN_TABLE_ID};

/// Lists every VRF link with the table it is bound to.
pub fn list_vrfs<K: NetlinkOps + ?Sized>(kernel: &K) -> FabricResult<Vec<VrfInfo>> {
    let links = kernel.list_links(Some(LinkKind::Vrf))?;

    let vrfs = links
        .into_iter()
        .filter(|link| link.is_vrf())
        .filter_map(|link| match link.vrf_table {
            Some(table_id) => Some(VrfInfo::new(link.name, table_id)),
            None => {
                warn!(link = %link.name, "VRF link reports no table id, ignoring");
                None
            }
        })
        .collect();

    Ok(vrfs)
}

/// Returns the smallest ID in [`MIN_TABLE_ID`, `MAX_TABLE_ID`] not in `used`.
///
/// Walks the sorted set and stops at the first gap, so the cost grows with
/// the number of used IDs rather than with the size of the ID space.
pub fn next_free_table_id(used: &BTreeSet<u32>) -> Option<u32> {
    first_gap(used, MIN_TABLE_ID, MAX_TABLE_ID)
}

fn first_gap(used: &BTreeSet<u32>, min: u32, max: u32) -> Option<u32> {
    let mut candidate = min;

    for &id in used.range(min..=max) {
        if id != candidate {
            break;
        }
        if candidate == max {
            return None;
        }
        candidate += 1;
    }

    Some(candidate)
}

/// Picks the smallest routing table ID no live VRF is bound to.
pub fn find_next_available_table_id<K: NetlinkOps + ?Sized>(kernel: &K) -> FabricResult<u32> {
    let used: BTreeSet<u32> = list_vrfs(kernel)?
        .into_iter()
        .map(|vrf| vrf.table_id)
        .collect();

    let table_id = next_free_table_id(&used).ok_or(FabricError::ExhaustedIdSpace)?;
    debug!(table_id, in_use = used.len(), "Selected free routing table");
    Ok(table_id)
}

/// Returns the table ID of the VRF link called `name`.
pub fn table_id_for_name<K: NetlinkOps + ?Sized>(kernel: &K, name: &str) -> FabricResult<u32> {
    list_vrfs(kernel)?
        .into_iter()
        .find(|vrf| vrf.name == name)
        .map(|vrf| vrf.table_id)
        .ok_or_else(|| FabricError::not_found(name))
}

/// Returns the table ID of the VRF belonging to a (VPC, attachment) pair.
pub fn table_id_for_vpc<K: NetlinkOps + ?Sized>(
    kernel: &K,
    vpc_field: &str,
    attachment_field: &str,
) -> FabricResult<u32> {
    table_id_for_name(kernel, &vrf_interface_name(vpc_field, attachment_field))
}
