//! Per-router configuration synthesis.
//!
//! Runs after allocation and topology construction, against immutable
//! inputs only, so routers can be synthesized in any order or in parallel.

pub mod bgp;
pub mod igp;
pub mod policy;
pub mod route_map;

use crate::error::{CompileError, Result};
use crate::intent::{Asn, NetworkIntent};
use crate::topology::Topology;
use bgp::{synthesize_bgp, BgpStanza};
use igp::{synthesize_igp, IgpStanza, LOOPBACK_INTERFACE};
use ipnet::Ipv6Net;
use std::net::Ipv4Addr;

/// Interface section of a configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceConfig {
    pub name: String,
    pub description: Option<String>,
    pub address: Ipv6Net,
}

/// Everything needed to render one router
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterConfiguration {
    pub hostname: String,
    pub asn: Asn,
    pub router_id: Ipv4Addr,
    pub is_border: bool,
    /// Loopback first, then links in declaration order
    pub interfaces: Vec<InterfaceConfig>,
    pub igp: IgpStanza,
    pub bgp: Option<BgpStanza>,
}

impl RouterConfiguration {
    pub fn loopback(&self) -> Option<&InterfaceConfig> {
        self.interfaces.iter().find(|i| i.name == LOOPBACK_INTERFACE)
    }
}

/// Synthesize the configuration of router `name`
pub fn synthesize_router(intent: &NetworkIntent, topology: &Topology, name: &str) -> Result<RouterConfiguration> {
    let router = topology
        .router(name)
        .ok_or_else(|| CompileError::referential(format!("unknown router {}", name)))?;
    let as_def = intent
        .ases
        .get(&router.asn)
        .ok_or_else(|| CompileError::referential(format!("router {} belongs to undefined AS {}", name, router.asn)))?;

    let mut interfaces = vec![InterfaceConfig {
        name: LOOPBACK_INTERFACE.to_string(),
        description: None,
        address: router.loopback,
    }];
    interfaces.extend(router.interfaces.iter().map(|i| InterfaceConfig {
        name: i.name.clone(),
        description: Some(match i.kind.relationship() {
            Some(rel) => format!("to {} (AS {}, {})", i.neighbor, i.neighbor_asn, rel),
            None => format!("to {}", i.neighbor),
        }),
        address: i.address,
    }));

    Ok(RouterConfiguration {
        hostname: router.name.clone(),
        asn: router.asn,
        router_id: router.router_id,
        is_border: router.is_border,
        interfaces,
        igp: synthesize_igp(as_def, router)?,
        bgp: synthesize_bgp(topology, router),
    })
}
