//! Topology construction.
//!
//! Reads the intent and the finished [`AddressPlan`] and produces an
//! immutable [`Topology`]. Nothing in here allocates addresses.

use super::types::{IbgpSession, Interface, InterfaceKind, RouterNode};
use crate::error::{CompileError, Result};
use crate::intent::{Asn, LinkKind, MeshMembers, NetworkIntent};
use crate::ip::AddressPlan;
use itertools::Itertools;
use log::{info, warn};
use std::collections::{BTreeMap, BTreeSet};
use std::net::Ipv4Addr;

/// Base of the router-ids derived for routers without an explicit one
const DERIVED_ROUTER_ID_BASE: u32 = 0x0a00_0000;

/// Immutable network model shared by all synthesis steps
#[derive(Debug, Clone)]
pub struct Topology {
    pub routers: BTreeMap<String, RouterNode>,
    /// Undirected adjacency implied by the links
    pub adjacency: BTreeMap<String, BTreeSet<String>>,
    /// Full-mesh iBGP sessions per AS
    pub ibgp_sessions: BTreeMap<Asn, Vec<IbgpSession>>,
    /// Routers per AS in membership order
    pub members: BTreeMap<Asn, Vec<String>>,
}

impl Topology {
    /// Build the topology model
    ///
    /// # Errors
    /// * `OrphanRouter` if a declared router has no link
    /// * `MalformedIntent` if two routers share a router-id
    pub fn build(intent: &NetworkIntent, plan: &AddressPlan) -> Result<Topology> {
        let iface_names = intent.interface_names()?;
        let mut interfaces: BTreeMap<&str, Vec<Interface>> = BTreeMap::new();
        let mut adjacency: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

        for (index, (link, addressing)) in intent.links.iter().zip(&plan.links).enumerate() {
            for side in 0..2 {
                let local = &link.endpoints[side];
                let remote = &link.endpoints[1 - side];
                let kind = match (link.kind, link.relationship) {
                    (LinkKind::InterAs, Some(rel)) => InterfaceKind::InterAs {
                        // the literal describes endpoints[1] as seen from endpoints[0]
                        relationship: if side == 0 { rel } else { rel.inverse() },
                    },
                    (LinkKind::InterAs, None) => {
                        return Err(CompileError::malformed(format!(
                            "{} is inter_as and must declare a relationship",
                            link.label(index)
                        )));
                    }
                    (LinkKind::IntraAs, _) => InterfaceKind::IntraAs,
                };
                let neighbor_asn = intent
                    .routers
                    .get(remote)
                    .map(|r| r.asn)
                    .ok_or_else(|| CompileError::referential(format!("{} names undefined router {}", link.label(index), remote)))?;

                interfaces.entry(local.as_str()).or_default().push(Interface {
                    name: iface_names[index][side].clone(),
                    address: addressing.endpoints[side],
                    subnet: addressing.subnet,
                    link_index: index,
                    neighbor: remote.clone(),
                    neighbor_asn,
                    neighbor_address: addressing.endpoints[1 - side],
                    kind,
                    ospf_cost: link.ospf_cost,
                });
                adjacency.entry(local.clone()).or_default().insert(remote.clone());
            }
        }

        let mut routers = BTreeMap::new();
        let mut members = BTreeMap::new();
        let mut router_ids: BTreeMap<Ipv4Addr, &str> = BTreeMap::new();
        let mut position: u32 = 0;

        for (asn, as_def) in &intent.ases {
            members.insert(*asn, as_def.routers.clone());
            for name in &as_def.routers {
                position += 1;
                let ifaces = interfaces.remove(name.as_str()).unwrap_or_default();
                if ifaces.is_empty() {
                    return Err(CompileError::OrphanRouter { router: name.clone() });
                }
                let definition = intent
                    .routers
                    .get(name)
                    .ok_or_else(|| CompileError::referential(format!("AS {} lists undefined router {}", asn, name)))?;
                let loopback = plan
                    .loopback(name)
                    .ok_or_else(|| CompileError::referential(format!("router {} has no loopback", name)))?;
                let router_id = definition
                    .router_id
                    .unwrap_or_else(|| Ipv4Addr::from(DERIVED_ROUTER_ID_BASE | (position & 0x00ff_ffff)));
                if let Some(other) = router_ids.insert(router_id, name.as_str()) {
                    return Err(CompileError::malformed(format!(
                        "routers {} and {} share router-id {}",
                        other, name, router_id
                    )));
                }

                let is_border = ifaces.iter().any(|i| i.kind.is_inter_as());
                routers.insert(
                    name.clone(),
                    RouterNode {
                        name: name.clone(),
                        asn: *asn,
                        loopback,
                        router_id,
                        interfaces: ifaces,
                        is_border,
                        speaks_bgp: false,
                        ibgp_peers: Vec::new(),
                    },
                );
            }
        }

        let mut topology = Topology { routers, adjacency, ibgp_sessions: BTreeMap::new(), members };
        if intent.bgp.required {
            topology.build_ibgp_mesh(intent.bgp.ibgp.members);
        }

        info!(
            "Topology: {} routers, {} adjacencies, {} border routers, {} iBGP sessions",
            topology.routers.len(),
            topology.adjacency.values().map(BTreeSet::len).sum::<usize>() / 2,
            topology.routers.values().filter(|r| r.is_border).count(),
            topology.ibgp_sessions.values().map(Vec::len).sum::<usize>()
        );
        Ok(topology)
    }

    /// Mark BGP speakers and enumerate the full mesh of every AS
    fn build_ibgp_mesh(&mut self, membership: MeshMembers) {
        for (asn, names) in &self.members {
            let has_border = names.iter().any(|n| self.routers.get(n).map_or(false, |r| r.is_border));
            let speakers: Vec<String> = names
                .iter()
                .filter(|n| {
                    let border = self.routers.get(n.as_str()).map_or(false, |r| r.is_border);
                    match membership {
                        MeshMembers::BorderOnly => border,
                        MeshMembers::All => has_border,
                    }
                })
                .cloned()
                .collect();

            if speakers.is_empty() {
                warn!("AS {} has no BGP speakers and gets no BGP configuration", asn);
                continue;
            }

            let sessions: Vec<IbgpSession> = speakers
                .iter()
                .tuple_combinations()
                .map(|(a, b)| IbgpSession { asn: *asn, routers: [a.clone(), b.clone()] })
                .collect();

            for name in &speakers {
                if let Some(router) = self.routers.get_mut(name) {
                    router.speaks_bgp = true;
                    router.ibgp_peers = speakers.iter().filter(|p| *p != name).cloned().collect();
                }
            }
            self.ibgp_sessions.insert(*asn, sessions);
        }
    }

    pub fn router(&self, name: &str) -> Option<&RouterNode> {
        self.routers.get(name)
    }

    pub fn is_border(&self, name: &str) -> bool {
        self.routers.get(name).map_or(false, |r| r.is_border)
    }

    /// Routers of an AS in membership order
    pub fn as_routers(&self, asn: Asn) -> impl Iterator<Item = &RouterNode> {
        self.members
            .get(&asn)
            .into_iter()
            .flatten()
            .filter_map(move |name| self.routers.get(name))
    }

    /// Subnets of all intra_as links of an AS, sorted
    pub fn intra_as_subnets(&self, asn: Asn) -> BTreeSet<ipnet::Ipv6Net> {
        self.as_routers(asn)
            .flat_map(|r| r.internal_interfaces().map(|i| i.subnet))
            .collect()
    }

    /// Router names in a stable order, for per-router work
    pub fn router_names(&self) -> Vec<&str> {
        self.routers.keys().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ip::Allocator;
    use crate::intent::Relationship;

    fn build(json: &str) -> Result<Topology> {
        let intent: NetworkIntent = serde_json::from_str(json).unwrap();
        let plan = Allocator::new(&intent)?.allocate(&intent)?;
        Topology::build(&intent, &plan)
    }

    const TWO_AS: &str = r#"{
        "ases": {
            "65001": { "igp": "ospfv3", "loopback_pool": "2001:db8:65:1::/64", "routers": ["A1", "A2", "A3", "A4"] },
            "65002": { "igp": "ripng", "loopback_pool": "2001:db8:65:2::/64", "routers": ["B1"] }
        },
        "routers": { "A1": { "as": 65001 }, "A2": { "as": 65001 }, "A3": { "as": 65001 }, "A4": { "as": 65001 }, "B1": { "as": 65002 } },
        "links": [
            { "endpoints": ["A1", "A2"], "type": "intra_as" },
            { "endpoints": ["A2", "A3"], "type": "intra_as" },
            { "endpoints": ["A3", "A4"], "type": "intra_as" },
            { "endpoints": ["A1", "B1"], "type": "inter_as", "relationship": "customer" },
            { "endpoints": ["B1", "A3"], "type": "inter_as", "relationship": "provider" },
            { "endpoints": ["B1", "A4"], "type": "inter_as", "relationship": "peer" }
        ],
        "bgp": { "required": true, "ibgp": { "mode": "full_mesh" } }
    }"#;

    #[test]
    fn test_border_classification() {
        let topo = build(TWO_AS).unwrap();
        for router in topo.routers.values() {
            let has_inter_as = router.interfaces.iter().any(|i| i.kind.is_inter_as());
            assert_eq!(router.is_border, has_inter_as, "{}", router.name);
        }
        assert!(topo.is_border("A1"));
        assert!(!topo.is_border("A2"));
        assert!(topo.is_border("B1"));
    }

    #[test]
    fn test_full_mesh_over_border_routers() {
        let topo = build(TWO_AS).unwrap();
        let sessions = &topo.ibgp_sessions[&65001];
        // A1, A3, A4 are border routers
        assert_eq!(sessions.len(), 3 * 2 / 2);
        for (a, b) in [("A1", "A3"), ("A1", "A4"), ("A3", "A4")] {
            assert!(topo.router(a).unwrap().ibgp_peers.contains(&b.to_string()));
            assert!(topo.router(b).unwrap().ibgp_peers.contains(&a.to_string()));
        }
        assert!(!topo.router("A2").unwrap().speaks_bgp);
        // a single speaker has an empty mesh
        assert!(topo.ibgp_sessions[&65002].is_empty());
        assert!(topo.router("B1").unwrap().speaks_bgp);
    }

    #[test]
    fn test_full_mesh_over_all_routers() {
        let doc = TWO_AS.replace(r#""mode": "full_mesh""#, r#""mode": "full_mesh", "members": "all""#);
        let topo = build(&doc).unwrap();
        let n = 4;
        assert_eq!(topo.ibgp_sessions[&65001].len(), n * (n - 1) / 2);
        assert!(topo.router("A2").unwrap().speaks_bgp);
        assert_eq!(topo.router("A2").unwrap().ibgp_peers, vec!["A1", "A3", "A4"]);
    }

    #[test]
    fn test_no_bgp_when_not_required() {
        let doc = TWO_AS.replace(r#""required": true"#, r#""required": false"#);
        let topo = build(&doc).unwrap();
        assert!(topo.ibgp_sessions.is_empty());
        assert!(topo.routers.values().all(|r| !r.speaks_bgp));
    }

    #[test]
    fn test_relationship_seen_from_each_end() {
        let topo = build(TWO_AS).unwrap();
        let rel_of = |router: &str, neighbor: &str| {
            topo.router(router)
                .unwrap()
                .interfaces
                .iter()
                .find(|i| i.neighbor == neighbor)
                .and_then(|i| i.kind.relationship())
        };
        assert_eq!(rel_of("A1", "B1"), Some(Relationship::Customer));
        assert_eq!(rel_of("B1", "A1"), Some(Relationship::Provider));
        assert_eq!(rel_of("B1", "A3"), Some(Relationship::Provider));
        assert_eq!(rel_of("A3", "B1"), Some(Relationship::Customer));
        assert_eq!(rel_of("B1", "A4"), Some(Relationship::Peer));
        assert_eq!(rel_of("A4", "B1"), Some(Relationship::Peer));
    }

    #[test]
    fn test_adjacency_is_symmetric() {
        let topo = build(TWO_AS).unwrap();
        for (router, neighbors) in &topo.adjacency {
            for n in neighbors {
                assert!(topo.adjacency[n].contains(router));
            }
        }
        assert_eq!(topo.adjacency["B1"].len(), 3);
    }

    #[test]
    fn test_orphan_router() {
        let doc = TWO_AS.replace(
            r#""routers": ["A1", "A2", "A3", "A4"]"#,
            r#""routers": ["A1", "A2", "A3", "A4", "A5"]"#,
        )
        .replace(r#""A4": { "as": 65001 },"#, r#""A4": { "as": 65001 }, "A5": { "as": 65001 },"#);
        match build(&doc) {
            Err(CompileError::OrphanRouter { router }) => assert_eq!(router, "A5"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_derived_router_ids_are_unique() {
        let topo = build(TWO_AS).unwrap();
        let ids: BTreeSet<_> = topo.routers.values().map(|r| r.router_id).collect();
        assert_eq!(ids.len(), topo.routers.len());
        assert_eq!(topo.router("A1").unwrap().router_id, Ipv4Addr::new(10, 0, 0, 1));
        assert_eq!(topo.router("B1").unwrap().router_id, Ipv4Addr::new(10, 0, 0, 5));
    }

    #[test]
    fn test_default_interface_names() {
        let topo = build(TWO_AS).unwrap();
        let names: Vec<&str> = topo.router("B1").unwrap().interfaces.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["GigabitEthernet1/0", "GigabitEthernet2/0", "GigabitEthernet3/0"]);
    }
}
