//! Tenant VRF manager
//!
//! Allocates routing tables and manages the lifecycle of per-tenant VRF
//! devices, one per (VPC, attachment) pair.

pub mod allocator;
mod config;
mod types;
mod vrf_mgr;

pub use allocator::{
    find_next_available_table_id, list_vrfs, next_free_table_id, table_id_for_name,
    table_id_for_vpc,
};
pub use config::*;
pub use types::*;
pub use vrf_mgr::VrfMgr;
