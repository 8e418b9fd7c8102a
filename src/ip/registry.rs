//! Address registry.
//!
//! Tracks every address region declared by the intent and every individual
//! address handed out, together with its owner, so that overlaps are
//! reported instead of silently producing duplicate addressing.

use crate::error::{CompileError, Result};
use crate::utils::overlaps;
use ipnet::Ipv6Net;
use log::debug;
use std::collections::BTreeMap;
use std::net::Ipv6Addr;

/// Kind of a claimed address region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionKind {
    /// Loopback pool of one AS
    LoopbackPool,
    /// The process-wide link-subnet space
    LinkSpace,
    /// A single /64 assigned to a link
    LinkSubnet,
}

impl RegionKind {
    /// Link subnets are carved out of the link space, every other pairing of
    /// overlapping regions is a collision.
    fn may_overlap(self, other: RegionKind) -> bool {
        matches!(
            (self, other),
            (RegionKind::LinkSubnet, RegionKind::LinkSpace) | (RegionKind::LinkSpace, RegionKind::LinkSubnet)
        )
    }
}

#[derive(Debug, Clone)]
struct Region {
    net: Ipv6Net,
    kind: RegionKind,
    owner: String,
}

/// Registry of claimed regions and assigned addresses
#[derive(Debug, Default)]
pub struct AddressRegistry {
    regions: Vec<Region>,
    /// address -> owner
    assigned: BTreeMap<Ipv6Addr, String>,
}

impl AddressRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim a region, failing if it overlaps an incompatible region
    pub fn claim_region(&mut self, net: Ipv6Net, kind: RegionKind, owner: &str) -> Result<()> {
        if let Some(existing) = self
            .regions
            .iter()
            .find(|r| !kind.may_overlap(r.kind) && overlaps(&r.net, &net))
        {
            return Err(CompileError::AddressSpaceCollision {
                first: format!("{} {}", existing.owner, existing.net),
                second: format!("{} {}", owner, net),
            });
        }
        debug!("Claimed {:?} {} for {}", kind, net, owner);
        self.regions.push(Region { net, kind, owner: owner.to_string() });
        Ok(())
    }

    /// Whether a /64 candidate is already taken by a link subnet
    pub fn is_link_subnet_claimed(&self, net: &Ipv6Net) -> bool {
        self.regions
            .iter()
            .any(|r| r.kind == RegionKind::LinkSubnet && overlaps(&r.net, net))
    }

    /// Record a single assigned address
    pub fn register_address(&mut self, addr: Ipv6Addr, owner: &str) -> Result<()> {
        if let Some(existing) = self.assigned.get(&addr) {
            return Err(CompileError::AddressSpaceCollision {
                first: format!("{} {}", existing, addr),
                second: format!("{} {}", owner, addr),
            });
        }
        self.assigned.insert(addr, owner.to_string());
        Ok(())
    }

    /// Number of assigned addresses
    pub fn assigned_count(&self) -> usize {
        self.assigned.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn net(s: &str) -> Ipv6Net {
        s.parse().unwrap()
    }

    #[test]
    fn test_overlapping_pools_collide() {
        let mut registry = AddressRegistry::new();
        registry
            .claim_region(net("2001:db8:1::/64"), RegionKind::LoopbackPool, "AS 1")
            .unwrap();
        let err = registry
            .claim_region(net("2001:db8:1::/96"), RegionKind::LoopbackPool, "AS 2")
            .unwrap_err();
        match err {
            CompileError::AddressSpaceCollision { first, second } => {
                assert!(first.contains("AS 1"));
                assert!(second.contains("AS 2"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_link_subnet_inside_link_space() {
        let mut registry = AddressRegistry::new();
        registry
            .claim_region(net("fd00::/48"), RegionKind::LinkSpace, "link subnet space")
            .unwrap();
        registry
            .claim_region(net("fd00:0:0:5::/64"), RegionKind::LinkSubnet, "link #0")
            .unwrap();
        assert!(registry.is_link_subnet_claimed(&net("fd00:0:0:5::/64")));
        assert!(!registry.is_link_subnet_claimed(&net("fd00:0:0:6::/64")));

        assert!(registry
            .claim_region(net("fd00:0:0:5::/64"), RegionKind::LinkSubnet, "link #1")
            .is_err());
    }

    #[test]
    fn test_link_subnet_inside_loopback_pool() {
        let mut registry = AddressRegistry::new();
        registry
            .claim_region(net("2001:db8::/48"), RegionKind::LoopbackPool, "AS 1")
            .unwrap();
        assert!(registry
            .claim_region(net("2001:db8:0:1::/64"), RegionKind::LinkSubnet, "link #0")
            .is_err());
    }

    #[test]
    fn test_duplicate_address() {
        let mut registry = AddressRegistry::new();
        let addr: Ipv6Addr = "2001:db8::1".parse().unwrap();
        registry.register_address(addr, "R1 Loopback0").unwrap();
        match registry.register_address(addr, "R2 Loopback0") {
            Err(CompileError::AddressSpaceCollision { first, second }) => {
                assert_eq!(first, "R1 Loopback0 2001:db8::1");
                assert_eq!(second, "R2 Loopback0 2001:db8::1");
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(registry.assigned_count(), 1);
    }
}
