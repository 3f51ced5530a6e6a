//! Address parsing helpers.

use std::net::{IpAddr, Ipv6Addr};

use fabric_common::{FabricError, FabricResult};
use ipnet::IpNet;

/// Parses a textual IPv4 or IPv6 address.
pub fn parse_ip(value: &str) -> FabricResult<IpAddr> {
    value
        .trim()
        .parse()
        .map_err(|_| FabricError::InvalidAddress {
            value: value.to_string(),
        })
}

/// Parses an ordered list of SRv6 hops into a segment list.
///
/// The result is in reverse input order: the last hop given becomes the
/// first segment. Every hop must be IPv6; IPv4-mapped addresses count as
/// IPv4. An empty input is an error.
pub fn parse_segment_list<S: AsRef<str>>(hops: &[S]) -> FabricResult<Vec<Ipv6Addr>> {
    let mut segments = Vec::with_capacity(hops.len());

    for hop in hops {
        let hop = hop.as_ref();
        match parse_ip(hop)? {
            IpAddr::V6(v6) if v6.to_ipv4_mapped().is_none() => segments.push(v6),
            _ => {
                return Err(FabricError::InvalidAddressFamily {
                    value: hop.to_string(),
                })
            }
        }
    }

    if segments.is_empty() {
        return Err(FabricError::EmptyInput { what: "segments" });
    }

    segments.reverse();
    Ok(segments)
}

/// Parses a comma-separated hop list, e.g. `"fd00::1, fd00::2"`.
pub fn parse_segment_csv(input: &str) -> FabricResult<Vec<Ipv6Addr>> {
    let hops: Vec<&str> = input
        .split(',')
        .map(str::trim)
        .filter(|hop| !hop.is_empty())
        .collect();
    parse_segment_list(&hops)
}

/// True if the network is a single host (/32 for IPv4, /128 for IPv6).
pub fn is_host(net: &IpNet) -> bool {
    net.prefix_len() == net.max_prefix_len()
}
