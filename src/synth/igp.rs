//! Interior routing stanza, one per router.

use crate::error::{CompileError, Result};
use crate::intent::{AsDefinition, Asn};
use crate::topology::RouterNode;
use ipnet::Ipv6Net;
use itertools::Itertools;
use log::debug;
use std::fmt;
use std::net::Ipv4Addr;

pub const DEFAULT_OSPF_PROCESS_ID: u16 = 1;
pub const DEFAULT_OSPF_AREA: u32 = 0;
pub const DEFAULT_RIP_PROCESS_NAME: &str = "RIPNG";

/// Name of the loopback interface on every router
pub const LOOPBACK_INTERFACE: &str = "Loopback0";

/// Closed set of interior protocols
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgpProtocol {
    RipNg,
    Ospfv3,
}

impl IgpProtocol {
    /// Resolve the selector of an AS. Matching ignores ASCII case.
    pub fn lookup(asn: Asn, selector: &str) -> Result<Self> {
        match selector.to_ascii_lowercase().as_str() {
            "ripng" => Ok(Self::RipNg),
            "ospfv3" => Ok(Self::Ospfv3),
            _ => Err(CompileError::UnsupportedIgp { asn, protocol: selector.to_string() }),
        }
    }
}

impl fmt::Display for IgpProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RipNg => write!(f, "ripng"),
            Self::Ospfv3 => write!(f, "ospfv3"),
        }
    }
}

/// Process-level settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IgpProcess {
    RipNg {
        name: String,
        /// Border routers push their inter_as subnets into RIPng
        redistribute_connected: bool,
    },
    Ospfv3 {
        process_id: u16,
        area: u32,
        router_id: Ipv4Addr,
        /// Interfaces that carry the subnet but never form adjacencies
        passive_interfaces: Vec<String>,
    },
}

/// An interface the IGP runs on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IgpInterface {
    pub name: String,
    pub cost: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IgpStanza {
    pub protocol: IgpProtocol,
    pub process: IgpProcess,
    /// Loopback first, then links in declaration order
    pub interfaces: Vec<IgpInterface>,
    /// Loopback plus every directly connected link subnet
    pub networks: Vec<Ipv6Net>,
}

impl IgpStanza {
    pub fn interface(&self, name: &str) -> Option<&IgpInterface> {
        self.interfaces.iter().find(|i| i.name == name)
    }
}

/// Build the IGP stanza of `router` under the protocol of its AS
pub fn synthesize_igp(as_def: &AsDefinition, router: &RouterNode) -> Result<IgpStanza> {
    let protocol = IgpProtocol::lookup(router.asn, &as_def.igp)?;

    let mut networks = vec![router.loopback.trunc()];
    networks.extend(router.interfaces.iter().map(|i| i.subnet));

    let loopback = IgpInterface { name: LOOPBACK_INTERFACE.to_string(), cost: None };

    let (process, interfaces) = match protocol {
        IgpProtocol::Ospfv3 => {
            let mut interfaces = vec![loopback];
            interfaces.extend(
                router
                    .interfaces
                    .iter()
                    .map(|i| IgpInterface { name: i.name.clone(), cost: i.ospf_cost }),
            );
            let process = IgpProcess::Ospfv3 {
                process_id: as_def.ospf_process_id.unwrap_or(DEFAULT_OSPF_PROCESS_ID),
                area: as_def.ospf_area.unwrap_or(DEFAULT_OSPF_AREA),
                router_id: router.router_id,
                passive_interfaces: router.external_interfaces().map(|i| i.name.clone()).collect(),
            };
            (process, interfaces)
        }
        IgpProtocol::RipNg => {
            let mut interfaces = vec![loopback];
            interfaces.extend(
                router
                    .internal_interfaces()
                    .map(|i| IgpInterface { name: i.name.clone(), cost: None }),
            );
            let process = IgpProcess::RipNg {
                name: as_def
                    .rip_process_name
                    .clone()
                    .unwrap_or_else(|| DEFAULT_RIP_PROCESS_NAME.to_string()),
                redistribute_connected: router.is_border,
            };
            (process, interfaces)
        }
    };

    debug!("{}: {} covers {}", router.name, protocol, networks.iter().join(", "));
    Ok(IgpStanza { protocol, process, interfaces, networks })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::Relationship;
    use crate::topology::{Interface, InterfaceKind};

    fn as_def(igp: &str) -> AsDefinition {
        AsDefinition {
            igp: igp.to_string(),
            loopback_pool: "2001:db8:ff::/64".to_string(),
            routers: vec!["R1".to_string()],
            ospf_process_id: None,
            ospf_area: None,
            rip_process_name: None,
        }
    }

    fn iface(name: &str, subnet: &str, kind: InterfaceKind) -> Interface {
        let subnet: Ipv6Net = subnet.parse().unwrap();
        Interface {
            name: name.to_string(),
            address: subnet,
            subnet,
            link_index: 0,
            neighbor: "X".to_string(),
            neighbor_asn: 1,
            neighbor_address: subnet,
            kind,
            ospf_cost: Some(10),
        }
    }

    fn border_router() -> RouterNode {
        RouterNode {
            name: "R1".to_string(),
            asn: 1,
            loopback: "2001:db8:ff::1/128".parse().unwrap(),
            router_id: Ipv4Addr::new(10, 0, 0, 1),
            interfaces: vec![
                iface("GigabitEthernet1/0", "2001:db8:1::/64", InterfaceKind::IntraAs),
                iface(
                    "GigabitEthernet2/0",
                    "2001:db8:1:1::/64",
                    InterfaceKind::InterAs { relationship: Relationship::Peer },
                ),
            ],
            is_border: true,
            speaks_bgp: true,
            ibgp_peers: vec![],
        }
    }

    #[test]
    fn test_lookup() {
        assert_eq!(IgpProtocol::lookup(1, "ripng").unwrap(), IgpProtocol::RipNg);
        assert_eq!(IgpProtocol::lookup(1, "OSPFv3").unwrap(), IgpProtocol::Ospfv3);
        match IgpProtocol::lookup(7, "isis") {
            Err(CompileError::UnsupportedIgp { asn, protocol }) => {
                assert_eq!(asn, 7);
                assert_eq!(protocol, "isis");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_networks_cover_loopback_and_links() {
        let stanza = synthesize_igp(&as_def("ripng"), &border_router()).unwrap();
        let networks: Vec<String> = stanza.networks.iter().map(|n| n.to_string()).collect();
        assert_eq!(networks, vec!["2001:db8:ff::1/128", "2001:db8:1::/64", "2001:db8:1:1::/64"]);
    }

    #[test]
    fn test_ripng_runs_on_internal_interfaces_only() {
        let stanza = synthesize_igp(&as_def("ripng"), &border_router()).unwrap();
        assert!(stanza.interface(LOOPBACK_INTERFACE).is_some());
        assert!(stanza.interface("GigabitEthernet1/0").is_some());
        assert!(stanza.interface("GigabitEthernet2/0").is_none());
        assert_eq!(
            stanza.process,
            IgpProcess::RipNg { name: "RIPNG".to_string(), redistribute_connected: true }
        );
    }

    #[test]
    fn test_ospfv3_marks_inter_as_passive() {
        let mut def = as_def("ospfv3");
        def.ospf_area = Some(5);
        let stanza = synthesize_igp(&def, &border_router()).unwrap();
        assert_eq!(stanza.interfaces.len(), 3);
        assert_eq!(stanza.interface("GigabitEthernet1/0").unwrap().cost, Some(10));
        match stanza.process {
            IgpProcess::Ospfv3 { process_id, area, router_id, passive_interfaces } => {
                assert_eq!(process_id, 1);
                assert_eq!(area, 5);
                assert_eq!(router_id, Ipv4Addr::new(10, 0, 0, 1));
                assert_eq!(passive_interfaces, vec!["GigabitEthernet2/0"]);
            }
            other => panic!("unexpected process: {other:?}"),
        }
    }

    #[test]
    fn test_internal_router_does_not_redistribute() {
        let mut router = border_router();
        router.interfaces.pop();
        router.is_border = false;
        let stanza = synthesize_igp(&as_def("ripng"), &router).unwrap();
        assert!(matches!(stanza.process, IgpProcess::RipNg { redistribute_connected: false, .. }));
    }
}
