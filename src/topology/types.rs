//! Topology type definitions.
//!
//! Router roles are explicit data: a router carries an `is_border` flag and
//! each of its interfaces carries the relationship of the neighbor behind it.

use crate::intent::{Asn, Relationship};
use ipnet::Ipv6Net;
use std::net::Ipv4Addr;

/// What lies behind an interface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterfaceKind {
    /// Neighbor in the same AS
    IntraAs,
    /// Neighbor in another AS, with its role seen from this router
    InterAs { relationship: Relationship },
}

impl InterfaceKind {
    pub fn is_inter_as(&self) -> bool {
        matches!(self, Self::InterAs { .. })
    }

    pub fn relationship(&self) -> Option<Relationship> {
        match self {
            Self::InterAs { relationship } => Some(*relationship),
            Self::IntraAs => None,
        }
    }
}

/// One physical interface, created by a link
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interface {
    pub name: String,
    /// Own address with the link prefix length, e.g. `2001:db8:1::1/64`
    pub address: Ipv6Net,
    pub subnet: Ipv6Net,
    /// Index of the link in the intent document
    pub link_index: usize,
    pub neighbor: String,
    pub neighbor_asn: Asn,
    pub neighbor_address: Ipv6Net,
    pub kind: InterfaceKind,
    pub ospf_cost: Option<u32>,
}

/// A router with everything derived from the topology
#[derive(Debug, Clone)]
pub struct RouterNode {
    pub name: String,
    pub asn: Asn,
    pub loopback: Ipv6Net,
    /// 32-bit id used by BGP and OSPFv3
    pub router_id: Ipv4Addr,
    /// Interfaces in link declaration order
    pub interfaces: Vec<Interface>,
    /// Has at least one inter_as link
    pub is_border: bool,
    /// Member of its AS's iBGP mesh
    pub speaks_bgp: bool,
    /// Other mesh members of the same AS, in membership order
    pub ibgp_peers: Vec<String>,
}

impl RouterNode {
    /// Interfaces facing another AS
    pub fn external_interfaces(&self) -> impl Iterator<Item = &Interface> {
        self.interfaces.iter().filter(|i| i.kind.is_inter_as())
    }

    /// Interfaces facing the own AS
    pub fn internal_interfaces(&self) -> impl Iterator<Item = &Interface> {
        self.interfaces.iter().filter(|i| !i.kind.is_inter_as())
    }
}

/// One iBGP session of the full mesh. `routers[0]` precedes `routers[1]` in
/// the AS membership list.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct IbgpSession {
    pub asn: Asn,
    pub routers: [String; 2],
}
