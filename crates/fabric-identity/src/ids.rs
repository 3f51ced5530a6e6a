//! VPC and attachment identifiers.

use std::fmt;
use std::str::FromStr;

use fabric_common::{FabricError, FabricResult};
use serde::{Deserialize, Serialize};

use crate::base62;

/// Largest VPC identifier (48 bits).
pub const VPC_MAX: u64 = 0xFFFF_FFFF_FFFF;

/// Width of the VPC field in an interface name.
pub const VPC_FIELD_WIDTH: usize = 9;

/// Width of the attachment field in an interface name.
pub const ATTACHMENT_FIELD_WIDTH: usize = 3;

fn check_hex(value: &str) -> Result<(), String> {
    if value.is_empty() {
        return Err("empty value".to_string());
    }
    if !value.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err("not a hexadecimal number".to_string());
    }
    Ok(())
}

/// Tenant (VPC) identifier, 48 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct VpcId(u64);

impl VpcId {
    /// Creates a VPC id, rejecting values wider than 48 bits.
    pub fn new(value: u64) -> FabricResult<Self> {
        if value > VPC_MAX {
            return Err(FabricError::InvalidVpcValue {
                value: format!("{:x}", value),
                message: "exceeds 48 bits".to_string(),
            });
        }
        Ok(Self(value))
    }

    /// Creates a VPC id from the low 48 bits of `value`.
    pub const fn truncate(value: u64) -> Self {
        Self(value & VPC_MAX)
    }

    /// Parses a hexadecimal VPC id (no `0x` prefix, up to 48 bits).
    pub fn from_hex(value: &str) -> FabricResult<Self> {
        let invalid = |message: String| FabricError::InvalidVpcValue {
            value: value.to_string(),
            message,
        };

        check_hex(value).map_err(invalid)?;
        let parsed =
            u64::from_str_radix(value, 16).map_err(|_| invalid("exceeds 48 bits".to_string()))?;
        if parsed > VPC_MAX {
            return Err(invalid("exceeds 48 bits".to_string()));
        }
        Ok(Self(parsed))
    }

    /// Parses a base-62 VPC name fragment.
    pub fn from_base62(value: &str) -> FabricResult<Self> {
        let parsed = base62::decode(value)?;
        u64::try_from(parsed)
            .ok()
            .filter(|v| *v <= VPC_MAX)
            .map(Self)
            .ok_or_else(|| FabricError::InvalidVpcValue {
                value: value.to_string(),
                message: "exceeds 48 bits".to_string(),
            })
    }

    /// Returns the raw value.
    pub const fn get(&self) -> u64 {
        self.0
    }

    /// 12-digit zero-padded lower-case hex.
    pub fn to_hex(&self) -> String {
        format!("{:012x}", self.0)
    }

    /// 9-character zero-padded base-62 name fragment.
    pub fn to_base62(&self) -> String {
        base62::encode_padded(u128::from(self.0), VPC_FIELD_WIDTH)
    }
}

impl fmt::Display for VpcId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:012x}", self.0)
    }
}

impl FromStr for VpcId {
    type Err = FabricError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl TryFrom<u64> for VpcId {
    type Error = FabricError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<VpcId> for u64 {
    fn from(id: VpcId) -> Self {
        id.0
    }
}

/// Attachment identifier, 16 bits, scoped within a VPC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttachmentId(u16);

impl AttachmentId {
    /// Creates an attachment id.
    pub const fn new(value: u16) -> Self {
        Self(value)
    }

    /// Parses a hexadecimal attachment id (no `0x` prefix, up to 16 bits).
    pub fn from_hex(value: &str) -> FabricResult<Self> {
        let invalid = |message: String| FabricError::InvalidAttachmentValue {
            value: value.to_string(),
            message,
        };

        check_hex(value).map_err(invalid)?;
        u16::from_str_radix(value, 16)
            .map(Self)
            .map_err(|_| invalid("exceeds 16 bits".to_string()))
    }

    /// Parses a base-62 attachment name fragment.
    pub fn from_base62(value: &str) -> FabricResult<Self> {
        let parsed = base62::decode(value)?;
        u16::try_from(parsed)
            .map(Self)
            .map_err(|_| FabricError::InvalidAttachmentValue {
                value: value.to_string(),
                message: "exceeds 16 bits".to_string(),
            })
    }

    /// Returns the raw value.
    pub const fn get(&self) -> u16 {
        self.0
    }

    /// 4-digit zero-padded lower-case hex.
    pub fn to_hex(&self) -> String {
        format!("{:04x}", self.0)
    }

    /// 3-character zero-padded base-62 name fragment.
    pub fn to_base62(&self) -> String {
        base62::encode_padded(u128::from(self.0), ATTACHMENT_FIELD_WIDTH)
    }
}

impl fmt::Display for AttachmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04x}", self.0)
    }
}

impl FromStr for AttachmentId {
    type Err = FabricError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}
