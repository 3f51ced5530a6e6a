//! Test infrastructure for the tenant VRF fabric
//!
//! Provides:
//! - An in-memory kernel with call recording and failure injection
//! - A recording sysctl configurator
//! - Tenant and route fixtures
//! - Kernel state verification helpers

mod fake_kernel;
pub mod fixtures;
mod sysctl;
mod verification;

pub use fake_kernel::{FailOp, FakeKernel, KernelCall};
pub use fixtures::*;
pub use sysctl::RecordingSysctl;
pub use verification::*;
