//! JSON shapes shared with the container network plugin.
//!
//! Optional fields are omitted from the output when unset or empty.

use serde::{Deserialize, Serialize};

/// Where a tenant network terminates, optionally through a gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Termination {
    /// Terminated network in CIDR notation.
    pub network: String,
    /// Next-hop gateway address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub via: Option<String>,
}

/// IP address management block of a plugin configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ipam {
    /// IPAM plugin type, serialized as `type`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Routes to install in the guest.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub routes: Vec<Route>,
    /// Addresses to assign to the guest interface.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub addresses: Vec<Address>,
}

/// A route entry of an IPAM block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    /// Destination network in CIDR notation.
    pub dst: String,
    /// Gateway address; the interface route is used when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gw: Option<String>,
}

/// An address entry of an IPAM block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    /// Address with prefix length, e.g. `10.0.0.2/24`.
    pub address: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_termination_omits_via() {
        let t = Termination {
            network: "10.1.0.0/16".to_string(),
            via: None,
        };
        assert_eq!(serde_json::to_value(&t).unwrap(), json!({"network": "10.1.0.0/16"}));

        let t = Termination {
            via: Some("10.0.0.1".to_string()),
            ..t
        };
        assert_eq!(
            serde_json::to_value(&t).unwrap(),
            json!({"network": "10.1.0.0/16", "via": "10.0.0.1"})
        );
    }

    #[test]
    fn test_ipam_shape() {
        let ipam = Ipam {
            kind: "static".to_string(),
            routes: vec![Route {
                dst: "0.0.0.0/0".to_string(),
                gw: Some("10.0.0.1".to_string()),
            }],
            addresses: vec![Address {
                address: "10.0.0.2/24".to_string(),
            }],
        };
        assert_eq!(
            serde_json::to_value(&ipam).unwrap(),
            json!({
                "type": "static",
                "routes": [{"dst": "0.0.0.0/0", "gw": "10.0.0.1"}],
                "addresses": [{"address": "10.0.0.2/24"}]
            })
        );
    }

    #[test]
    fn test_ipam_omits_empty_lists() {
        let ipam: Ipam = serde_json::from_str(r#"{"type": "static"}"#).unwrap();
        assert!(ipam.routes.is_empty());
        assert!(ipam.addresses.is_empty());
        assert_eq!(serde_json::to_string(&ipam).unwrap(), r#"{"type":"static"}"#);
    }

    #[test]
    fn test_route_without_gateway() {
        let route: Route = serde_json::from_str(r#"{"dst": "fd00::/64"}"#).unwrap();
        assert_eq!(route.gw, None);
        assert_eq!(serde_json::to_string(&route).unwrap(), r#"{"dst":"fd00::/64"}"#);
    }
}
