//! Identity codec for the tenant VRF fabric.
//!
//! Maps a (VPC, attachment) pair to deterministic kernel interface names and
//! to SRv6 endpoint addresses, and parses SRv6 segment lists. Everything in
//! this crate is pure; nothing touches the kernel.
//!
//! # Example
//!
//! ```
//! use fabric_identity::{decode_srv6_endpoint, encode_srv6_endpoint, vrf_interface_name};
//!
//! assert_eq!(vrf_interface_name("0000000jU", "00G"), "G0000000jU00GV");
//!
//! let endpoint = encode_srv6_endpoint("2607:ed40:ff00::/48", "4d2", "2a").unwrap();
//! let (vpc, attachment) = decode_srv6_endpoint(endpoint.into()).unwrap();
//! assert_eq!((vpc.as_str(), attachment.as_str()), ("0000000004d2", "002a"));
//! ```

pub mod base62;
pub mod cni;
pub mod ids;
pub mod ip;
pub mod name;
pub mod srv6;

pub use ids::{AttachmentId, VpcId, ATTACHMENT_FIELD_WIDTH, VPC_FIELD_WIDTH, VPC_MAX};
pub use ip::{is_host, parse_ip, parse_segment_csv, parse_segment_list};
pub use name::{
    guest_interface_name, host_interface_name, interface_name, name_for, parse_interface_name,
    vrf_interface_name, ParsedName, Role, INTERFACE_NAME_LEN, INTERFACE_PREFIX,
};
pub use srv6::{
    decode_endpoint, decode_srv6_endpoint, encode_endpoint, encode_srv6_endpoint,
    MAX_SITE_PREFIX_LEN,
};
