//! Common infrastructure for the tenant VRF fabric.
//!
//! This crate provides the pieces shared by the identity codec and the VRF
//! manager daemon:
//!
//! - [`error`]: Error taxonomy for fabric operations
//! - [`netlink`]: The kernel link/route capability trait and its value types
//! - [`rtnetlink`]: A NETLINK_ROUTE implementation of that capability
//! - [`sysctl`]: Per-interface sysctl configuration
//!
//! # Architecture
//!
//! The VRF manager is written against two injected collaborators:
//!
//! 1. [`NetlinkOps`] to enumerate and mutate links and routes
//! 2. [`SysctlConfigurator`] to tune each newly created VRF link
//!
//! Production wires in [`RtNetlink`] and [`ProcSysctl`]; tests use the
//! in-memory fakes from `fabric-test`.
//!
//! # Example
//!
//! ```ignore
//! use fabric_common::{IpFamily, NetlinkOps, RtNetlink};
//!
//! let kernel = RtNetlink::new()?;
//! for route in kernel.list_routes(IpFamily::V6, 1)? {
//!     println!("{}", route);
//! }
//! ```

pub mod error;
pub mod netlink;
pub mod rtnetlink;
pub mod sysctl;

// Re-export commonly used items at crate root
pub use error::{FabricError, FabricResult};
pub use netlink::{IpFamily, Link, LinkKind, NetlinkOps, Route, VRF_KIND};
pub use rtnetlink::RtNetlink;
pub use sysctl::{NoopSysctl, ProcSysctl, SysctlConfigurator};
