//! Test fixtures for VRF lifecycle tests

use std::net::IpAddr;

use fabric_common::{IpFamily, Route};
use fabric_identity::{vrf_interface_name, AttachmentId, VpcId};
use ipnet::IpNet;

/// Base-62 VPC field of VPC 0x4d2
pub const SAMPLE_VPC: &str = "0000000jU";

/// Base-62 attachment field of attachment 0x2a
pub const SAMPLE_ATTACHMENT: &str = "00G";

/// VRF name of ([`SAMPLE_VPC`], [`SAMPLE_ATTACHMENT`])
pub const SAMPLE_VRF: &str = "G0000000jU00GV";

/// A (VPC, attachment) pair as base-62 name fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tenant {
    pub vpc: String,
    pub attachment: String,
}

impl Tenant {
    /// Build a tenant from raw ids
    pub fn new(vpc: u64, attachment: u16) -> Self {
        Self {
            vpc: VpcId::truncate(vpc).to_base62(),
            attachment: AttachmentId::new(attachment).to_base62(),
        }
    }

    /// Name of this tenant's VRF link
    pub fn vrf_name(&self) -> String {
        vrf_interface_name(&self.vpc, &self.attachment)
    }
}

/// `count` distinct tenants of one VPC
pub fn tenants(vpc: u64, count: u16) -> Vec<Tenant> {
    (1..=count).map(|att| Tenant::new(vpc, att)).collect()
}

fn route_for(family: IpFamily, table: u32, cidr: &str) -> Route {
    let net: IpNet = cidr
        .parse()
        .unwrap_or_else(|e| panic!("bad fixture prefix {}: {}", cidr, e));
    assert_eq!(
        IpFamily::of(&net.addr()),
        family,
        "fixture prefix {} has the wrong family",
        cidr
    );
    Route::new(family, table, Some(net.network()), net.prefix_len())
}

/// IPv4 unicast route in `table`
pub fn route_v4(table: u32, cidr: &str) -> Route {
    route_for(IpFamily::V4, table, cidr)
}

/// IPv6 unicast route in `table`
pub fn route_v6(table: u32, cidr: &str) -> Route {
    route_for(IpFamily::V6, table, cidr)
}

/// Default route in `table` through `gateway`, in the gateway's family
pub fn default_route(table: u32, gateway: IpAddr) -> Route {
    let mut route = Route::new(IpFamily::of(&gateway), table, None, 0);
    route.gateway = Some(gateway);
    route
}
