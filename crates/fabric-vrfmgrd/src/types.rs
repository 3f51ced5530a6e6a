//! Type definitions for vrfmgrd

use serde::{Deserialize, Serialize};

/// A live VRF: its link name and the routing table it is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VrfInfo {
    /// VRF interface name
    pub name: String,
    /// Routing table ID
    pub table_id: u32,
}

impl VrfInfo {
    /// Create a new VrfInfo
    pub fn new(name: impl Into<String>, table_id: u32) -> Self {
        Self {
            name: name.into(),
            table_id,
        }
    }
}

/// Smallest assignable routing table ID (0 is reserved)
pub const MIN_TABLE_ID: u32 = 1;

/// Largest assignable routing table ID (u32::MAX is reserved)
pub const MAX_TABLE_ID: u32 = u32::MAX - 1;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vrf_info_new() {
        let info = VrfInfo::new("G0000000jU00GV", 7);
        assert_eq!(info.name, "G0000000jU00GV");
        assert_eq!(info.table_id, 7);
    }

    #[test]
    fn test_vrf_info_json() {
        let info = VrfInfo::new("G0000000jU00GV", 7);
        assert_eq!(
            serde_json::to_string(&info).unwrap(),
            r#"{"name":"G0000000jU00GV","table_id":7}"#
        );
    }

    #[test]
    fn test_table_id_range() {
        assert_eq!(MIN_TABLE_ID, 1);
        assert_eq!(MAX_TABLE_ID, 4_294_967_294);
    }
}
