//! Verification helpers for VRF lifecycle tests
//!
//! Provides checks over [`FakeKernel`] state and its call log

use std::collections::BTreeMap;

use thiserror::Error;

use crate::fake_kernel::{FakeKernel, KernelCall};

/// Verification error types
#[derive(Error, Debug)]
pub enum VerificationError {
    #[error("Expected VRF '{name}' not found")]
    VrfNotFound { name: String },

    #[error("VRF '{name}' is bound to table {actual}, expected {expected}")]
    TableMismatch {
        name: String,
        expected: u32,
        actual: u32,
    },

    #[error("VRF '{name}' is administratively down")]
    LinkDown { name: String },

    #[error("VRF '{name}' still exists")]
    VrfPresent { name: String },

    #[error("Table {table_id} still holds {count} routes")]
    TableNotEmpty { table_id: u32, count: usize },

    #[error("Table {table_id} is shared by VRFs {names:?}")]
    DuplicateTableId { table_id: u32, names: Vec<String> },

    #[error("Expected {first} to happen before {second}")]
    CallOrder { first: String, second: String },
}

/// Result type for verification operations
pub type VerifyResult<T> = Result<T, VerificationError>;

/// Kernel state verification helper
pub struct KernelVerifier<'a> {
    kernel: &'a FakeKernel,
}

impl<'a> KernelVerifier<'a> {
    /// Create a new verifier
    pub fn new(kernel: &'a FakeKernel) -> Self {
        Self { kernel }
    }

    /// Verify that a VRF exists, is bound to `table_id` and is up
    pub fn assert_vrf(&self, name: &str, table_id: u32) -> VerifyResult<()> {
        let link = self
            .kernel
            .link(name)
            .filter(|link| link.is_vrf())
            .ok_or_else(|| VerificationError::VrfNotFound {
                name: name.to_string(),
            })?;

        let actual = link.vrf_table.unwrap_or(0);
        if actual != table_id {
            return Err(VerificationError::TableMismatch {
                name: name.to_string(),
                expected: table_id,
                actual,
            });
        }
        if !link.up {
            return Err(VerificationError::LinkDown {
                name: name.to_string(),
            });
        }
        Ok(())
    }

    /// Verify that no link called `name` exists
    pub fn assert_vrf_absent(&self, name: &str) -> VerifyResult<()> {
        match self.kernel.link(name) {
            Some(_) => Err(VerificationError::VrfPresent {
                name: name.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Verify that a table holds no routes of either family
    pub fn assert_table_empty(&self, table_id: u32) -> VerifyResult<()> {
        let count = self.kernel.routes_in_table(table_id).len();
        if count > 0 {
            return Err(VerificationError::TableNotEmpty { table_id, count });
        }
        Ok(())
    }

    /// Verify that no two VRF links share a table ID
    pub fn assert_unique_table_ids(&self) -> VerifyResult<()> {
        let mut by_table: BTreeMap<u32, Vec<String>> = BTreeMap::new();
        for link in self.kernel.links().into_iter().filter(|l| l.is_vrf()) {
            if let Some(table_id) = link.vrf_table {
                by_table.entry(table_id).or_default().push(link.name);
            }
        }

        match by_table.into_iter().find(|(_, names)| names.len() > 1) {
            Some((table_id, names)) => Err(VerificationError::DuplicateTableId { table_id, names }),
            None => Ok(()),
        }
    }

    /// Verify that every route delete for `table_id` precedes creation of `name`
    pub fn assert_flushed_before_create(&self, name: &str, table_id: u32) -> VerifyResult<()> {
        let calls = self.kernel.calls();
        let create = calls.iter().position(|call| {
            matches!(call, KernelCall::CreateVrf { name: n, .. } if n == name)
        });
        let Some(create) = create else {
            return Err(VerificationError::VrfNotFound {
                name: name.to_string(),
            });
        };

        let late_delete = calls[create..].iter().any(|call| {
            matches!(call, KernelCall::DeleteRoute(route) if route.table == table_id)
        });
        if late_delete {
            return Err(VerificationError::CallOrder {
                first: format!("flush of table {}", table_id),
                second: format!("creation of {}", name),
            });
        }

        match self.kernel.routes_at_create(name) {
            Some(0) | None => Ok(()),
            Some(count) => Err(VerificationError::TableNotEmpty { table_id, count }),
        }
    }
}
