//! IP address allocation logic.
//!
//! Allocation order is a pure function of declaration order:
//! - ASes are processed by ascending ASN, each handing out loopbacks in the
//!   order of its membership list;
//! - links are processed in document order, explicit subnets first, then
//!   every remaining link takes the next free /64 of the link space.

use super::pool::{LinkSubnetSpace, LoopbackPool};
use super::registry::{AddressRegistry, RegionKind};
use crate::error::{CompileError, Result};
use crate::intent::{Asn, NetworkIntent, LINK_PREFIX_LEN};
use crate::utils::{host_prefix, nth_address};
use ipnet::Ipv6Net;
use log::{debug, info};
use std::collections::BTreeMap;

/// Addressing of one link. `endpoints[i]` carries the host bits and the /64
/// length, e.g. `2001:db8:1::1/64`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkAddressing {
    pub subnet: Ipv6Net,
    pub endpoints: [Ipv6Net; 2],
}

/// Immutable result of the allocation phase
#[derive(Debug, Clone)]
pub struct AddressPlan {
    /// router -> /128 loopback
    pub loopbacks: BTreeMap<String, Ipv6Net>,
    /// one entry per link, in document order
    pub links: Vec<LinkAddressing>,
}

impl AddressPlan {
    pub fn loopback(&self, router: &str) -> Option<Ipv6Net> {
        self.loopbacks.get(router).copied()
    }
}

/// Owner of the allocation cursors. Build it with [`Allocator::new`], then
/// consume it with [`Allocator::allocate`].
#[derive(Debug)]
pub struct Allocator {
    registry: AddressRegistry,
    loopback_pools: BTreeMap<Asn, LoopbackPool>,
    link_space: LinkSubnetSpace,
}

impl Allocator {
    /// Claim every pool the intent declares, rejecting overlaps between
    /// loopback pools and with the link space.
    pub fn new(intent: &NetworkIntent) -> Result<Self> {
        let mut registry = AddressRegistry::new();
        let mut loopback_pools = BTreeMap::new();

        for (asn, as_def) in &intent.ases {
            let pool = as_def.loopback_pool(*asn)?;
            registry.claim_region(pool, RegionKind::LoopbackPool, &format!("loopback pool of AS {}", asn))?;
            loopback_pools.insert(*asn, LoopbackPool::new(*asn, pool));
        }

        let space = intent.meta.link_pool()?;
        registry.claim_region(space, RegionKind::LinkSpace, "link subnet space")?;

        Ok(Allocator { registry, loopback_pools, link_space: LinkSubnetSpace::new(space) })
    }

    /// Run the allocation phase and hand back the immutable plan
    pub fn allocate(mut self, intent: &NetworkIntent) -> Result<AddressPlan> {
        let loopbacks = self.allocate_loopbacks(intent)?;
        let links = self.allocate_links(intent)?;
        info!(
            "Allocated {} loopbacks and {} link subnets ({} addresses)",
            loopbacks.len(),
            links.len(),
            self.registry.assigned_count()
        );
        Ok(AddressPlan { loopbacks, links })
    }

    fn allocate_loopbacks(&mut self, intent: &NetworkIntent) -> Result<BTreeMap<String, Ipv6Net>> {
        let mut loopbacks = BTreeMap::new();

        for (asn, as_def) in &intent.ases {
            let pool = self
                .loopback_pools
                .get_mut(asn)
                .ok_or_else(|| CompileError::referential(format!("no loopback pool for AS {}", asn)))?;
            pool.ensure_capacity(as_def.routers.len())?;

            for router in &as_def.routers {
                let loopback = pool.next_loopback()?;
                self.registry
                    .register_address(loopback.addr(), &format!("{} Loopback0", router))?;
                debug!("AS {}: {} -> {} (pool {})", asn, router, loopback, pool.prefix());
                loopbacks.insert(router.clone(), loopback);
            }
        }

        Ok(loopbacks)
    }

    fn allocate_links(&mut self, intent: &NetworkIntent) -> Result<Vec<LinkAddressing>> {
        // pass 1: explicit subnets
        let mut subnets: Vec<Option<Ipv6Net>> = Vec::with_capacity(intent.links.len());
        for (index, link) in intent.links.iter().enumerate() {
            let explicit = link.explicit_subnet(index)?;
            if let Some(subnet) = explicit {
                self.registry
                    .claim_region(subnet, RegionKind::LinkSubnet, &link.label(index))?;
            }
            subnets.push(explicit);
        }

        let needed = subnets.iter().filter(|s| s.is_none()).count() as u128;
        let space = self.link_space.prefix();
        let taken_in_space = subnets
            .iter()
            .flatten()
            .filter(|s| space.contains(&s.network()))
            .count() as u128;
        let available = self.link_space.subnet_count().saturating_sub(taken_in_space);
        if needed > available {
            return Err(CompileError::PoolExhausted {
                owner: "link subnet space".to_string(),
                pool: space.to_string(),
                needed,
                available,
            });
        }

        // pass 2: sequential subnets, then endpoint addresses
        let mut links = Vec::with_capacity(intent.links.len());
        for (index, (link, explicit)) in intent.links.iter().zip(subnets).enumerate() {
            let subnet = match explicit {
                Some(subnet) => subnet,
                None => {
                    let subnet = self.link_space.next_free(&self.registry).ok_or_else(|| {
                        CompileError::PoolExhausted {
                            owner: "link subnet space".to_string(),
                            pool: space.to_string(),
                            needed,
                            available,
                        }
                    })?;
                    self.registry
                        .claim_region(subnet, RegionKind::LinkSubnet, &link.label(index))?;
                    subnet
                }
            };

            let mut endpoints = [subnet; 2];
            for (side, router) in link.endpoints.iter().enumerate() {
                let host = side as u128 + 1;
                let addr = nth_address(&subnet, host).ok_or_else(|| {
                    CompileError::malformed(format!("{} subnet {} has no host {}", link.label(index), subnet, host))
                })?;
                self.registry
                    .register_address(addr, &format!("{} on {}", router, link.label(index)))?;
                endpoints[side] = host_prefix(addr, LINK_PREFIX_LEN);
            }
            debug!("{}: {} ({}, {})", link.label(index), subnet, endpoints[0], endpoints[1]);
            links.push(LinkAddressing { subnet, endpoints });
        }

        Ok(links)
    }
}
