//! SRv6 endpoint addresses carrying a (VPC, attachment) pair.
//!
//! The low 64 bits of the endpoint are `vpc << 16 | attachment`; the upper
//! 64 bits come from the site prefix. A site prefix longer than /64 would
//! overlap the identity bits and is rejected.

use std::net::{IpAddr, Ipv6Addr};

use fabric_common::{FabricError, FabricResult};
use ipnet::IpNet;
use tracing::debug;

use crate::ids::{AttachmentId, VpcId};

/// Longest site prefix that leaves room for the identity bits.
pub const MAX_SITE_PREFIX_LEN: u8 = 64;

const LOW_64: u128 = 0xFFFF_FFFF_FFFF_FFFF;

/// Writes the identity bits into the low half of `site`.
pub fn encode_endpoint(site: Ipv6Addr, vpc: VpcId, attachment: AttachmentId) -> Ipv6Addr {
    let low = (vpc.get() << 16) | u64::from(attachment.get());
    Ipv6Addr::from((u128::from(site) & !LOW_64) | u128::from(low))
}

/// Extracts the identity bits from an endpoint.
pub fn decode_endpoint(endpoint: Ipv6Addr) -> (VpcId, AttachmentId) {
    let bits = u128::from(endpoint);
    let vpc = VpcId::truncate((bits >> 16) as u64);
    let attachment = AttachmentId::new((bits & 0xFFFF) as u16);
    (vpc, attachment)
}

/// Encodes an SRv6 endpoint from a site prefix and hex ids.
///
/// `site_prefix` is CIDR notation, e.g. `2607:ed40:ff00::/48`. The address
/// part is used as written, so host bits inside the prefix are kept.
pub fn encode_srv6_endpoint(
    site_prefix: &str,
    vpc_hex: &str,
    attachment_hex: &str,
) -> FabricResult<Ipv6Addr> {
    let net: IpNet = site_prefix.parse().map_err(|e| FabricError::InvalidPrefix {
        prefix: site_prefix.to_string(),
        message: format!("{}", e),
    })?;

    let net = match net {
        IpNet::V6(net) => net,
        IpNet::V4(_) => {
            return Err(FabricError::InvalidAddressFamily {
                value: site_prefix.to_string(),
            })
        }
    };

    if net.prefix_len() > MAX_SITE_PREFIX_LEN {
        return Err(FabricError::InvalidPrefixLength {
            prefix: site_prefix.to_string(),
            len: net.prefix_len(),
        });
    }

    let vpc = VpcId::from_hex(vpc_hex)?;
    let attachment = AttachmentId::from_hex(attachment_hex)?;

    let endpoint = encode_endpoint(net.addr(), vpc, attachment);
    debug!(%endpoint, %vpc, %attachment, "Encoded SRv6 endpoint");
    Ok(endpoint)
}

/// Decodes an SRv6 endpoint into 12-digit VPC hex and 4-digit attachment hex.
///
/// Every IPv6 address decodes, so this is the exact inverse of
/// [`encode_srv6_endpoint`]; only IPv4 is rejected.
pub fn decode_srv6_endpoint(endpoint: IpAddr) -> FabricResult<(String, String)> {
    let v6 = match endpoint {
        IpAddr::V6(v6) => v6,
        IpAddr::V4(_) => {
            return Err(FabricError::InvalidAddressFamily {
                value: endpoint.to_string(),
            })
        }
    };

    let (vpc, attachment) = decode_endpoint(v6);
    Ok((vpc.to_hex(), attachment.to_hex()))
}
