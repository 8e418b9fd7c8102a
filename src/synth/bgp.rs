//! BGP stanza synthesis.
//!
//! iBGP sessions follow the full mesh computed by the topology builder and
//! run between loopbacks without any filtering. Every inter_as interface of
//! a speaker yields one eBGP session whose route-maps come from the
//! relationship of the neighbor.

use super::igp::LOOPBACK_INTERFACE;
use super::route_map::{
    inbound_route_map, local_community_lists, neighbor_community_lists, outbound_route_map, CommunityList,
    PrefixList, RouteMap, SELF_PREFIX_LIST,
};
use crate::intent::{Asn, Relationship};
use crate::topology::{RouterNode, Topology};
use ipnet::Ipv6Net;
use log::debug;
use std::collections::{BTreeMap, BTreeSet};
use std::net::{Ipv4Addr, Ipv6Addr};

/// Type of a BGP session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionType {
    /// Full-mesh session inside the AS
    Internal,
    /// Session across an inter_as link, with the neighbor's role
    External { relationship: Relationship },
}

impl SessionType {
    pub fn is_ebgp(&self) -> bool {
        matches!(self, Self::External { .. })
    }

    pub fn is_ibgp(&self) -> bool {
        !self.is_ebgp()
    }

    pub fn relationship(&self) -> Option<Relationship> {
        match self {
            Self::External { relationship } => Some(*relationship),
            Self::Internal => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BgpNeighbor {
    pub address: Ipv6Addr,
    pub remote_as: Asn,
    /// Name of the router on the other side
    pub peer: String,
    pub session: SessionType,
    pub update_source: Option<String>,
    pub next_hop_self: bool,
    pub send_community: bool,
    pub route_map_in: Option<String>,
    pub route_map_out: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BgpStanza {
    pub asn: Asn,
    pub router_id: Ipv4Addr,
    /// iBGP neighbors in membership order, then eBGP neighbors in link order
    pub neighbors: Vec<BgpNeighbor>,
    /// Originated prefixes, sorted
    pub networks: Vec<Ipv6Net>,
    pub community_lists: Vec<CommunityList>,
    pub prefix_list: PrefixList,
    /// Sorted by name, each map once even if several neighbors use it
    pub route_maps: Vec<RouteMap>,
}

impl BgpStanza {
    pub fn neighbor(&self, peer: &str) -> Option<&BgpNeighbor> {
        self.neighbors.iter().find(|n| n.peer == peer)
    }

    pub fn route_map(&self, name: &str) -> Option<&RouteMap> {
        self.route_maps.iter().find(|rm| rm.name == name)
    }
}

/// Build the BGP stanza of `router`, or `None` if it does not speak BGP
pub fn synthesize_bgp(topology: &Topology, router: &RouterNode) -> Option<BgpStanza> {
    if !router.speaks_bgp {
        return None;
    }

    let mut neighbors = Vec::new();
    for peer_name in &router.ibgp_peers {
        let Some(peer) = topology.router(peer_name) else {
            continue;
        };
        neighbors.push(BgpNeighbor {
            address: peer.loopback.addr(),
            remote_as: router.asn,
            peer: peer.name.clone(),
            session: SessionType::Internal,
            update_source: Some(LOOPBACK_INTERFACE.to_string()),
            next_hop_self: false,
            send_community: true,
            route_map_in: None,
            route_map_out: None,
        });
    }

    let mut route_maps: BTreeMap<String, RouteMap> = BTreeMap::new();
    let mut neighbor_lists: BTreeSet<CommunityList> = BTreeSet::new();

    for iface in router.external_interfaces() {
        let Some(relationship) = iface.kind.relationship() else {
            continue;
        };
        let rm_in = inbound_route_map(router.asn, relationship, iface.neighbor_asn);
        let rm_out = outbound_route_map(router.asn, relationship);
        neighbors.push(BgpNeighbor {
            address: iface.neighbor_address.addr(),
            remote_as: iface.neighbor_asn,
            peer: iface.neighbor.clone(),
            session: SessionType::External { relationship },
            update_source: None,
            next_hop_self: true,
            send_community: true,
            route_map_in: Some(rm_in.name.clone()),
            route_map_out: Some(rm_out.name.clone()),
        });
        neighbor_lists.extend(neighbor_community_lists(relationship, iface.neighbor_asn));
        route_maps.entry(rm_in.name.clone()).or_insert(rm_in);
        route_maps.entry(rm_out.name.clone()).or_insert(rm_out);
    }

    let networks = originated_networks(topology, router);
    let mut community_lists = local_community_lists(router.asn);
    community_lists.extend(neighbor_lists);

    debug!(
        "{}: {} BGP neighbors, {} networks, {} route-maps",
        router.name,
        neighbors.len(),
        networks.len(),
        route_maps.len()
    );

    Some(BgpStanza {
        asn: router.asn,
        router_id: router.router_id,
        neighbors,
        prefix_list: PrefixList { name: SELF_PREFIX_LIST.to_string(), prefixes: networks.clone() },
        networks,
        community_lists,
        route_maps: route_maps.into_values().collect(),
    })
}

/// Own loopback and own inter_as subnets. Border routers also announce
/// every loopback and intra_as subnet of their AS.
fn originated_networks(topology: &Topology, router: &RouterNode) -> Vec<Ipv6Net> {
    let mut networks: BTreeSet<Ipv6Net> = BTreeSet::new();
    networks.insert(router.loopback.trunc());
    networks.extend(router.external_interfaces().map(|i| i.subnet));

    if router.is_border {
        networks.extend(topology.as_routers(router.asn).map(|r| r.loopback.trunc()));
        networks.extend(topology.intra_as_subnets(router.asn));
    }
    networks.into_iter().collect()
}
