//! IPv6 prefix helpers shared by validation and allocation

use crate::error::{CompileError, Result};
use ipnet::Ipv6Net;
use std::net::Ipv6Addr;

/// Parse a CIDR string, rejecting prefixes with host bits set.
///
/// `what` names the document field for the error message.
pub fn parse_prefix(s: &str, what: &str) -> Result<Ipv6Net> {
    let net: Ipv6Net = s
        .trim()
        .parse()
        .map_err(|_| CompileError::malformed(format!("{} '{}' is not an IPv6 CIDR block", what, s)))?;
    if net != net.trunc() {
        return Err(CompileError::malformed(format!(
            "{} '{}' has host bits set (did you mean {}?)",
            what,
            s,
            net.trunc()
        )));
    }
    Ok(net)
}

/// Number of host identifiers a pool can hand out. The network address
/// itself (host id 0) is never allocated.
pub fn pool_capacity(pool: &Ipv6Net) -> u128 {
    let host_bits = 128 - u32::from(pool.prefix_len());
    if host_bits >= 128 {
        u128::MAX
    } else {
        (1u128 << host_bits) - 1
    }
}

/// Address with host identifier `host` inside `net`, or `None` if the host
/// identifier does not fit.
pub fn nth_address(net: &Ipv6Net, host: u128) -> Option<Ipv6Addr> {
    if host > pool_capacity(net) {
        return None;
    }
    let base = u128::from(net.network());
    base.checked_add(host).map(Ipv6Addr::from)
}

/// Whether two prefixes share at least one address
pub fn overlaps(a: &Ipv6Net, b: &Ipv6Net) -> bool {
    a.contains(&b.network()) || b.contains(&a.network())
}

/// `addr/len` as a prefix that keeps the host bits, e.g. `2001:db8:1::1/64`
pub fn host_prefix(addr: Ipv6Addr, prefix_len: u8) -> Ipv6Net {
    // prefix_len always comes from a parsed prefix, so it is <= 128
    Ipv6Net::new(addr, prefix_len).unwrap_or_else(|_| Ipv6Net::from(addr))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_prefix() {
        let net = parse_prefix("2001:db8:111::/96", "pool").unwrap();
        assert_eq!(net.prefix_len(), 96);

        assert!(matches!(
            parse_prefix("2001:db8:111::5/96", "pool"),
            Err(CompileError::MalformedIntent(_))
        ));
        assert!(matches!(parse_prefix("10.0.0.0/8", "pool"), Err(CompileError::MalformedIntent(_))));
        assert!(matches!(parse_prefix("garbage", "pool"), Err(CompileError::MalformedIntent(_))));
    }

    #[test]
    fn test_pool_capacity() {
        assert_eq!(pool_capacity(&"2001:db8::/126".parse().unwrap()), 3);
        assert_eq!(pool_capacity(&"2001:db8::1/128".parse().unwrap()), 0);
        assert_eq!(pool_capacity(&"::/0".parse().unwrap()), u128::MAX);
    }

    #[test]
    fn test_nth_address() {
        let net: Ipv6Net = "2001:db8:111::/96".parse().unwrap();
        assert_eq!(nth_address(&net, 1), Some("2001:db8:111::1".parse().unwrap()));
        assert_eq!(nth_address(&net, 3), Some("2001:db8:111::3".parse().unwrap()));

        let tiny: Ipv6Net = "2001:db8::/127".parse().unwrap();
        assert_eq!(nth_address(&tiny, 1), Some("2001:db8::1".parse().unwrap()));
        assert_eq!(nth_address(&tiny, 2), None);
    }

    #[test]
    fn test_overlaps() {
        let a: Ipv6Net = "2001:db8::/48".parse().unwrap();
        let b: Ipv6Net = "2001:db8:0:5::/64".parse().unwrap();
        let c: Ipv6Net = "2001:db8:1::/48".parse().unwrap();
        assert!(overlaps(&a, &b));
        assert!(overlaps(&b, &a));
        assert!(!overlaps(&a, &c));
    }

    #[test]
    fn test_host_prefix_keeps_host_bits() {
        let p = host_prefix("2001:db8:1::2".parse().unwrap(), 64);
        assert_eq!(p.to_string(), "2001:db8:1::2/64");
    }
}
