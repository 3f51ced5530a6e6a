//! Kernel link/route capability.
//!
//! The lifecycle manager never talks to the kernel directly. It is handed a
//! [`NetlinkOps`] implementation: [`crate::RtNetlink`] on a Linux host, or a
//! deterministic in-memory fake in tests.

use std::fmt;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use crate::error::FabricResult;

/// Link kind string the kernel reports for VRF devices.
pub const VRF_KIND: &str = "vrf";

/// Address family of a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IpFamily {
    V4,
    V6,
}

impl IpFamily {
    /// Both families, in flush order.
    pub const ALL: [IpFamily; 2] = [IpFamily::V4, IpFamily::V6];

    /// Returns the family of an address.
    pub fn of(addr: &IpAddr) -> Self {
        match addr {
            IpAddr::V4(_) => IpFamily::V4,
            IpAddr::V6(_) => IpFamily::V6,
        }
    }
}

impl fmt::Display for IpFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IpFamily::V4 => write!(f, "ipv4"),
            IpFamily::V6 => write!(f, "ipv6"),
        }
    }
}

/// Link kind filter for [`NetlinkOps::list_links`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LinkKind {
    /// VRF master device.
    Vrf,
    /// Any other `IFLA_INFO_KIND` value (e.g. "veth", "bridge").
    Other(String),
}

impl LinkKind {
    /// Returns the kernel kind string.
    pub fn as_str(&self) -> &str {
        match self {
            LinkKind::Vrf => VRF_KIND,
            LinkKind::Other(kind) => kind,
        }
    }

    /// Builds a kind from the kernel kind string.
    pub fn from_kernel(kind: &str) -> Self {
        if kind == VRF_KIND {
            LinkKind::Vrf
        } else {
            LinkKind::Other(kind.to_string())
        }
    }
}

/// A network link as observed in the kernel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    /// Interface index.
    pub index: u32,
    /// Interface name.
    pub name: String,
    /// Link kind, if the kernel reported one.
    pub kind: Option<LinkKind>,
    /// Routing table id, for VRF links.
    pub vrf_table: Option<u32>,
    /// Administrative state.
    pub up: bool,
}

impl Link {
    /// Returns true if this link is a VRF device.
    pub fn is_vrf(&self) -> bool {
        self.kind == Some(LinkKind::Vrf)
    }
}

/// A route entry as observed in the kernel.
///
/// Carries enough of the kernel message to address the same route again on
/// deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    /// Address family.
    pub family: IpFamily,
    /// Routing table id.
    pub table: u32,
    /// Destination network address (`None` for a default route).
    pub destination: Option<IpAddr>,
    /// Destination prefix length.
    pub destination_prefix_len: u8,
    /// Next-hop gateway.
    pub gateway: Option<IpAddr>,
    /// Output interface index.
    pub output_interface: Option<u32>,
    /// Route metric.
    pub priority: Option<u32>,
    /// Raw `rtm_protocol`.
    pub protocol: u8,
    /// Raw `rtm_scope`.
    pub scope: u8,
    /// Raw `rtm_type`.
    pub kind: u8,
}

impl Route {
    /// Creates a unicast route with only the addressing fields set.
    pub fn new(family: IpFamily, table: u32, destination: Option<IpAddr>, prefix_len: u8) -> Self {
        Self {
            family,
            table,
            destination,
            destination_prefix_len: prefix_len,
            gateway: None,
            output_interface: None,
            priority: None,
            protocol: 0,
            scope: 0,
            kind: 1,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.destination {
            Some(dst) => write!(f, "{}/{}", dst, self.destination_prefix_len)?,
            None => write!(f, "default")?,
        }
        if let Some(gw) = self.gateway {
            write!(f, " via {}", gw)?;
        }
        write!(f, " table {}", self.table)
    }
}

/// Kernel link/route query-and-mutate surface.
///
/// All calls are synchronous and complete or fail immediately. Query
/// failures surface as [`crate::FabricError::PlatformQuery`], mutation
/// failures as [`crate::FabricError::PlatformMutation`].
pub trait NetlinkOps {
    /// Lists links, optionally restricted to one kind.
    fn list_links(&self, kind: Option<LinkKind>) -> FabricResult<Vec<Link>>;

    /// Creates a VRF device bound to `table_id`.
    fn create_vrf(&self, name: &str, table_id: u32) -> FabricResult<()>;

    /// Deletes a link by name.
    fn delete_link(&self, name: &str) -> FabricResult<()>;

    /// Lists routes of one family whose table equals `table_id`.
    fn list_routes(&self, family: IpFamily, table_id: u32) -> FabricResult<Vec<Route>>;

    /// Deletes a single route.
    fn delete_route(&self, route: &Route) -> FabricResult<()>;

    /// Sets a link administratively up.
    fn set_link_up(&self, name: &str) -> FabricResult<()>;
}

impl<T: NetlinkOps + ?Sized> NetlinkOps for &T {
    fn list_links(&self, kind: Option<LinkKind>) -> FabricResult<Vec<Link>> {
        (**self).list_links(kind)
    }

    fn create_vrf(&self, name: &str, table_id: u32) -> FabricResult<()> {
        (**self).create_vrf(name, table_id)
    }

    fn delete_link(&self, name: &str) -> FabricResult<()> {
        (**self).delete_link(name)
    }

    fn list_routes(&self, family: IpFamily, table_id: u32) -> FabricResult<Vec<Route>> {
        (**self).list_routes(family, table_id)
    }

    fn delete_route(&self, route: &Route) -> FabricResult<()> {
        (**self).delete_route(route)
    }

    fn set_link_up(&self, name: &str) -> FabricResult<()> {
        (**self).set_link_up(name)
    }
}
