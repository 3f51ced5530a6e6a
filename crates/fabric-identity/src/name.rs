//! Kernel interface names derived from (VPC, attachment).
//!
//! Layout: `G<vpc:9><attachment:3><role>`, 14 characters for normalized
//! fields. The role character is the only difference between the VRF,
//! host and guest interfaces of one attachment.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::ids::{AttachmentId, VpcId, ATTACHMENT_FIELD_WIDTH, VPC_FIELD_WIDTH};
use fabric_common::FabricResult;

/// Leading character of every fabric interface name.
pub const INTERFACE_PREFIX: char = 'G';

/// Length of a name built from normalized fields.
pub const INTERFACE_NAME_LEN: usize = 1 + VPC_FIELD_WIDTH + ATTACHMENT_FIELD_WIDTH + 1;

/// Matches names produced from normalized base-62 fields.
static INTERFACE_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^G([0-9a-zA-Z]{9})([0-9a-zA-Z]{3})([VHG])$").expect("Invalid regex pattern")
});

/// Interface role, encoded as the trailing character of the name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// VRF master device.
    Vrf,
    /// Host side of the attachment veth pair.
    Host,
    /// Guest side of the attachment veth pair.
    Guest,
}

impl Role {
    /// All roles.
    pub const ALL: [Role; 3] = [Role::Vrf, Role::Host, Role::Guest];

    /// Returns the discriminator character.
    pub const fn as_char(&self) -> char {
        match self {
            Role::Vrf => 'V',
            Role::Host => 'H',
            Role::Guest => 'G',
        }
    }

    /// Parses a discriminator character.
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'V' => Some(Role::Vrf),
            'H' => Some(Role::Host),
            'G' => Some(Role::Guest),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Vrf => write!(f, "vrf"),
            Role::Host => write!(f, "host"),
            Role::Guest => write!(f, "guest"),
        }
    }
}

/// Formats an interface name from pre-rendered fields.
///
/// Fields shorter than their width are left-padded with `0`; longer fields
/// are kept whole, which breaks the fixed length. Callers are expected to
/// pass width-normalized fields such as [`VpcId::to_base62`] and
/// [`AttachmentId::to_base62`].
pub fn name_for(role: Role, vpc_field: &str, attachment_field: &str) -> String {
    format!(
        "{}{:0>vw$}{:0>aw$}{}",
        INTERFACE_PREFIX,
        vpc_field,
        attachment_field,
        role.as_char(),
        vw = VPC_FIELD_WIDTH,
        aw = ATTACHMENT_FIELD_WIDTH,
    )
}

/// Name of the VRF device.
pub fn vrf_interface_name(vpc_field: &str, attachment_field: &str) -> String {
    name_for(Role::Vrf, vpc_field, attachment_field)
}

/// Name of the host-side interface.
pub fn host_interface_name(vpc_field: &str, attachment_field: &str) -> String {
    name_for(Role::Host, vpc_field, attachment_field)
}

/// Name of the guest-side interface.
pub fn guest_interface_name(vpc_field: &str, attachment_field: &str) -> String {
    name_for(Role::Guest, vpc_field, attachment_field)
}

/// Formats an interface name from typed ids.
pub fn interface_name(role: Role, vpc: VpcId, attachment: AttachmentId) -> String {
    name_for(role, &vpc.to_base62(), &attachment.to_base62())
}

/// Fields recovered from a well-formed interface name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedName {
    /// Interface role.
    pub role: Role,
    /// Raw 9-character VPC field.
    pub vpc_field: String,
    /// Raw 3-character attachment field.
    pub attachment_field: String,
}

impl ParsedName {
    /// Decodes the VPC field.
    pub fn vpc(&self) -> FabricResult<VpcId> {
        VpcId::from_base62(&self.vpc_field)
    }

    /// Decodes the attachment field.
    pub fn attachment(&self) -> FabricResult<AttachmentId> {
        AttachmentId::from_base62(&self.attachment_field)
    }
}

/// Splits a fabric interface name back into its fields.
///
/// Returns `None` for names that do not follow the layout (e.g. `eth0`).
pub fn parse_interface_name(name: &str) -> Option<ParsedName> {
    let caps = INTERFACE_NAME_RE.captures(name)?;
    let role = caps[3].chars().next().and_then(Role::from_char)?;
    Some(ParsedName {
        role,
        vpc_field: caps[1].to_string(),
        attachment_field: caps[2].to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const VPC: &str = "0000000jU"; // 1234 dec
    const ATTACHMENT: &str = "00G"; // 42 dec

    #[test]
    fn test_vrf_name() {
        assert_eq!(vrf_interface_name(VPC, ATTACHMENT), "G0000000jU00GV");
        assert_eq!(name_for(Role::Vrf, VPC, ATTACHMENT), "G0000000jU00GV");
    }

    #[test]
    fn test_host_name() {
        assert_eq!(host_interface_name(VPC, ATTACHMENT), "G0000000jU00GH");
    }

    #[test]
    fn test_guest_name() {
        assert_eq!(guest_interface_name(VPC, ATTACHMENT), "G0000000jU00GG");
    }

    #[test]
    fn test_roles_differ_only_in_last_char() {
        let names: Vec<String> = Role::ALL
            .iter()
            .map(|role| name_for(*role, VPC, ATTACHMENT))
            .collect();

        for name in &names {
            assert_eq!(name.len(), INTERFACE_NAME_LEN);
            assert_eq!(&name[..13], "G0000000jU00G");
        }
        assert_eq!(
            names.iter().map(|n| n.chars().last().unwrap()).collect::<String>(),
            "VHG"
        );
    }

    #[test]
    fn test_name_is_deterministic() {
        assert_eq!(
            name_for(Role::Host, VPC, ATTACHMENT),
            name_for(Role::Host, VPC, ATTACHMENT)
        );
    }

    #[test]
    fn test_short_fields_are_zero_padded() {
        assert_eq!(name_for(Role::Vrf, "jU", "G"), "G0000000jU00GV");
    }

    #[test]
    fn test_typed_interface_name() {
        let vpc = VpcId::from_hex("4d2").unwrap();
        let att = AttachmentId::from_hex("2a").unwrap();
        assert_eq!(interface_name(Role::Vrf, vpc, att), "G0000000jU00GV");
    }

    #[test]
    fn test_parse_interface_name() {
        let parsed = parse_interface_name("G0000000jU00GH").unwrap();
        assert_eq!(parsed.role, Role::Host);
        assert_eq!(parsed.vpc_field, VPC);
        assert_eq!(parsed.attachment_field, ATTACHMENT);
        assert_eq!(parsed.vpc().unwrap().get(), 1234);
        assert_eq!(parsed.attachment().unwrap().get(), 42);
    }

    #[test]
    fn test_parse_interface_name_rejects() {
        assert_eq!(parse_interface_name("eth0"), None);
        assert_eq!(parse_interface_name("G0000000jU00GX"), None);
        assert_eq!(parse_interface_name("X0000000jU00GV"), None);
        assert_eq!(parse_interface_name("G000000jU00GV"), None);
    }
}
