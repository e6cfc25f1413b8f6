//! Route entry types.
//!
//! A route table's runtime record owns an ordered list of [`RouteSpec`]
//! entries, reconciled entry-by-entry rather than as one atomic object.
//! Each entry carries a destination and exactly one next hop.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Error type for next-hop validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NextHopError {
    #[error("route to {0} has no next hop set")]
    Missing(String),

    #[error("route to {0} has {1} next hops set (exactly one required)")]
    Multiple(String, usize),
}

/// The single next hop of a route entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextHop<'a> {
    /// An internet/VPN gateway.
    Gateway(&'a str),
    /// A compute instance performing forwarding.
    Instance(&'a str),
    /// A network interface.
    Interface(&'a str),
    /// A peering connection to another network.
    Peering(&'a str),
}

impl NextHop<'_> {
    /// Returns the next hop's resource identifier.
    pub fn id(&self) -> &str {
        match self {
            NextHop::Gateway(id)
            | NextHop::Instance(id)
            | NextHop::Interface(id)
            | NextHop::Peering(id) => id,
        }
    }
}

/// A single routing entry: destination plus exactly one next hop.
///
/// Next hops are stored as four optional fields because that is how the
/// entry arrives from declared configuration; [`RouteSpec::next_hop`]
/// enforces the exactly-one invariant before any provider call is built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteSpec {
    /// Destination CIDR block.
    pub destination: String,
    /// Gateway next hop.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway_id: Option<String>,
    /// Instance next hop.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<String>,
    /// Network interface next hop.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interface_id: Option<String>,
    /// Peering connection next hop.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peering_id: Option<String>,
}

impl RouteSpec {
    /// Creates a route to the given destination with no next hop yet.
    pub fn to(destination: impl Into<String>) -> Self {
        Self {
            destination: destination.into(),
            ..Self::default()
        }
    }

    /// Sets a gateway next hop.
    pub fn via_gateway(mut self, id: impl Into<String>) -> Self {
        self.gateway_id = Some(id.into());
        self
    }

    /// Sets an instance next hop.
    pub fn via_instance(mut self, id: impl Into<String>) -> Self {
        self.instance_id = Some(id.into());
        self
    }

    /// Sets a network interface next hop.
    pub fn via_interface(mut self, id: impl Into<String>) -> Self {
        self.interface_id = Some(id.into());
        self
    }

    /// Sets a peering connection next hop.
    pub fn via_peering(mut self, id: impl Into<String>) -> Self {
        self.peering_id = Some(id.into());
        self
    }

    /// Returns the route's single next hop.
    ///
    /// Fails if zero or more than one next-hop field is populated.
    pub fn next_hop(&self) -> Result<NextHop<'_>, NextHopError> {
        let mut hops: Vec<NextHop<'_>> = Vec::with_capacity(1);
        if let Some(id) = self.gateway_id.as_deref() {
            hops.push(NextHop::Gateway(id));
        }
        if let Some(id) = self.instance_id.as_deref() {
            hops.push(NextHop::Instance(id));
        }
        if let Some(id) = self.interface_id.as_deref() {
            hops.push(NextHop::Interface(id));
        }
        if let Some(id) = self.peering_id.as_deref() {
            hops.push(NextHop::Peering(id));
        }

        match hops.len() {
            0 => Err(NextHopError::Missing(self.destination.clone())),
            1 => Ok(hops[0]),
            n => Err(NextHopError::Multiple(self.destination.clone(), n)),
        }
    }
}

impl fmt::Display for RouteSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.next_hop() {
            Ok(hop) => write!(f, "{} via {}", self.destination, hop.id()),
            Err(_) => write!(f, "{} (unresolved next hop)", self.destination),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_single_next_hop() {
        let route = RouteSpec::to("0.0.0.0/0").via_gateway("igw-1");
        assert_eq!(route.next_hop().unwrap(), NextHop::Gateway("igw-1"));
        assert_eq!(route.next_hop().unwrap().id(), "igw-1");
    }

    #[test]
    fn test_missing_next_hop() {
        let route = RouteSpec::to("10.0.0.0/16");
        assert_eq!(
            route.next_hop(),
            Err(NextHopError::Missing("10.0.0.0/16".to_string()))
        );
    }

    #[test]
    fn test_multiple_next_hops() {
        let route = RouteSpec::to("10.0.0.0/16")
            .via_gateway("igw-1")
            .via_peering("pcx-1");
        assert_eq!(
            route.next_hop(),
            Err(NextHopError::Multiple("10.0.0.0/16".to_string(), 2))
        );
    }

    #[test]
    fn test_each_next_hop_kind() {
        assert_eq!(
            RouteSpec::to("d").via_instance("i-1").next_hop().unwrap(),
            NextHop::Instance("i-1")
        );
        assert_eq!(
            RouteSpec::to("d").via_interface("eni-1").next_hop().unwrap(),
            NextHop::Interface("eni-1")
        );
        assert_eq!(
            RouteSpec::to("d").via_peering("pcx-1").next_hop().unwrap(),
            NextHop::Peering("pcx-1")
        );
    }

    #[test]
    fn test_display() {
        let route = RouteSpec::to("0.0.0.0/0").via_gateway("igw-1");
        assert_eq!(route.to_string(), "0.0.0.0/0 via igw-1");

        let bad = RouteSpec::to("0.0.0.0/0");
        assert_eq!(bad.to_string(), "0.0.0.0/0 (unresolved next hop)");
    }

    #[test]
    fn test_serde_omits_empty_hops() {
        let route = RouteSpec::to("0.0.0.0/0").via_gateway("igw-1");
        let json = serde_json::to_string(&route).unwrap();
        assert!(json.contains("gateway_id"));
        assert!(!json.contains("instance_id"));

        let back: RouteSpec = serde_json::from_str(&json).unwrap();
        assert_eq!(route, back);
    }
}
