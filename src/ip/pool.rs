//! Address pools.
//!
//! A [`LoopbackPool`] hands out /128 loopbacks of one AS, first-free from
//! host id 1. The [`LinkSubnetSpace`] hands out consecutive /64 link subnets
//! from the process-wide link space, skipping subnets the intent already
//! claimed explicitly.

use super::registry::AddressRegistry;
use crate::error::{CompileError, Result};
use crate::intent::{Asn, LINK_PREFIX_LEN, LOOPBACK_PREFIX_LEN};
use crate::utils::{nth_address, pool_capacity};
use ipnet::Ipv6Net;

/// Sequential loopback allocator for one AS
#[derive(Debug)]
pub struct LoopbackPool {
    asn: Asn,
    pool: Ipv6Net,
    next_host: u128,
}

impl LoopbackPool {
    pub fn new(asn: Asn, pool: Ipv6Net) -> Self {
        LoopbackPool { asn, pool, next_host: 1 }
    }

    pub fn prefix(&self) -> Ipv6Net {
        self.pool
    }

    /// Fail up front if the pool cannot hold `count` routers
    pub fn ensure_capacity(&self, count: usize) -> Result<()> {
        let available = pool_capacity(&self.pool);
        let needed = count as u128;
        if needed > available {
            return Err(CompileError::PoolExhausted {
                owner: format!("AS {}", self.asn),
                pool: self.pool.to_string(),
                needed,
                available,
            });
        }
        Ok(())
    }

    /// Next free loopback as a /128
    pub fn next_loopback(&mut self) -> Result<Ipv6Net> {
        let addr = nth_address(&self.pool, self.next_host).ok_or_else(|| CompileError::PoolExhausted {
            owner: format!("AS {}", self.asn),
            pool: self.pool.to_string(),
            needed: self.next_host,
            available: pool_capacity(&self.pool),
        })?;
        self.next_host += 1;
        // a /128 around a single address is always valid
        Ok(Ipv6Net::new(addr, LOOPBACK_PREFIX_LEN).unwrap_or_else(|_| Ipv6Net::from(addr)))
    }
}

/// Sequential /64 allocator over the link-subnet space
#[derive(Debug)]
pub struct LinkSubnetSpace {
    space: Ipv6Net,
    next_index: u128,
}

impl LinkSubnetSpace {
    pub fn new(space: Ipv6Net) -> Self {
        LinkSubnetSpace { space, next_index: 0 }
    }

    pub fn prefix(&self) -> Ipv6Net {
        self.space
    }

    /// Total number of /64 subnets in the space
    pub fn subnet_count(&self) -> u128 {
        let bits = u32::from(LINK_PREFIX_LEN - self.space.prefix_len().min(LINK_PREFIX_LEN));
        1u128 << bits
    }

    /// The `index`-th /64 of the space
    fn subnet_at(&self, index: u128) -> Option<Ipv6Net> {
        if index >= self.subnet_count() {
            return None;
        }
        let base = u128::from(self.space.network());
        let addr = base.checked_add(index << (128 - u32::from(LINK_PREFIX_LEN)))?;
        Ipv6Net::new(addr.into(), LINK_PREFIX_LEN).ok()
    }

    /// Next /64 not yet claimed in `registry`, or `None` when the space is
    /// used up
    pub fn next_free(&mut self, registry: &AddressRegistry) -> Option<Ipv6Net> {
        while let Some(candidate) = self.subnet_at(self.next_index) {
            self.next_index += 1;
            if !registry.is_link_subnet_claimed(&candidate) {
                return Some(candidate);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ip::registry::RegionKind;

    #[test]
    fn test_loopbacks_are_sequential() {
        let mut pool = LoopbackPool::new(111, "2001:db8:111::/96".parse().unwrap());
        pool.ensure_capacity(3).unwrap();
        let got: Vec<String> = (0..3).map(|_| pool.next_loopback().unwrap().to_string()).collect();
        assert_eq!(got, vec!["2001:db8:111::1/128", "2001:db8:111::2/128", "2001:db8:111::3/128"]);
    }

    #[test]
    fn test_loopback_pool_exhausted() {
        let pool = LoopbackPool::new(7, "2001:db8::/127".parse().unwrap());
        assert!(pool.ensure_capacity(1).is_ok());
        match pool.ensure_capacity(2) {
            Err(CompileError::PoolExhausted { owner, needed, available, .. }) => {
                assert_eq!(owner, "AS 7");
                assert_eq!(needed, 2);
                assert_eq!(available, 1);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_link_space_skips_claimed() {
        let mut registry = AddressRegistry::new();
        registry
            .claim_region("2001:db8:1::/64".parse().unwrap(), RegionKind::LinkSubnet, "link #3")
            .unwrap();

        let mut space = LinkSubnetSpace::new("2001:db8:1::/62".parse().unwrap());
        assert_eq!(space.subnet_count(), 4);
        assert_eq!(space.next_free(&registry).unwrap().to_string(), "2001:db8:1:1::/64");
        assert_eq!(space.next_free(&registry).unwrap().to_string(), "2001:db8:1:2::/64");
        assert_eq!(space.next_free(&registry).unwrap().to_string(), "2001:db8:1:3::/64");
        assert_eq!(space.next_free(&registry), None);
    }

    #[test]
    fn test_link_space_of_single_subnet() {
        let registry = AddressRegistry::new();
        let mut space = LinkSubnetSpace::new("2001:db8:1::/64".parse().unwrap());
        assert_eq!(space.subnet_count(), 1);
        assert_eq!(space.next_free(&registry).unwrap().to_string(), "2001:db8:1::/64");
        assert_eq!(space.next_free(&registry), None);
    }
}
