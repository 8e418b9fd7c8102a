//! Commercial routing policy ("no free transit").
//!
//! Every route carries a community recording how it entered the AS:
//! originated locally (SELF), learned from a customer (CLIENT), a peer
//! (PEER) or a provider (PROVIDER). Whether a route may be advertised to or
//! accepted from a neighbor is a pure table lookup on that origin class and
//! the neighbor's relationship.

use crate::intent::{Asn, Relationship};
use std::fmt;

/// Origin class of a route, encoded as a community suffix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CommunityRole {
    SelfOrigin,
    Client,
    Peer,
    Provider,
}

impl CommunityRole {
    pub fn all() -> [CommunityRole; 4] {
        [Self::SelfOrigin, Self::Client, Self::Peer, Self::Provider]
    }

    /// Numeric suffix after `ASN:`
    pub fn suffix(self) -> u16 {
        match self {
            Self::SelfOrigin => 50,
            Self::Client => 100,
            Self::Peer => 200,
            Self::Provider => 300,
        }
    }

    /// Tag given to routes learned from a neighbor of relationship `rel`
    pub fn learned_from(rel: Relationship) -> Self {
        match rel {
            Relationship::Customer => Self::Client,
            Relationship::Peer => Self::Peer,
            Relationship::Provider => Self::Provider,
        }
    }

    /// Upper-case label used in community-list names
    pub fn label(self) -> &'static str {
        match self {
            Self::SelfOrigin => "SELF",
            Self::Client => "CLIENT",
            Self::Peer => "PEER",
            Self::Provider => "PROVIDER",
        }
    }

    fn row(self) -> usize {
        match self {
            Self::SelfOrigin => 0,
            Self::Client => 1,
            Self::Peer => 2,
            Self::Provider => 3,
        }
    }
}

fn column(rel: Relationship) -> usize {
    match rel {
        Relationship::Customer => 0,
        Relationship::Peer => 1,
        Relationship::Provider => 2,
    }
}

/// A standard community `ASN:suffix` scoped to the tagging AS
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommunityTag {
    pub asn: Asn,
    pub role: CommunityRole,
}

impl CommunityTag {
    pub fn new(asn: Asn, role: CommunityRole) -> Self {
        CommunityTag { asn, role }
    }
}

impl fmt::Display for CommunityTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.asn, self.role.suffix())
    }
}

/// Outbound table: origin class (row) x neighbor relationship (column).
/// Columns are customer, peer, provider.
const ADVERTISE: [[bool; 3]; 4] = [
    // SELF
    [true, true, true],
    // CLIENT
    [true, true, true],
    // PEER
    [true, false, false],
    // PROVIDER
    [true, false, false],
];

/// Inbound table: class tagged by the neighbor's AS (row) x neighbor
/// relationship (column).
const ACCEPT: [[bool; 3]; 4] = [
    // neighbor's SELF
    [true, true, true],
    // neighbor's CLIENT
    [true, true, true],
    // neighbor's PEER
    [true, false, false],
    // neighbor's PROVIDER
    [true, false, false],
];

/// May a route of origin class `origin` be advertised to a neighbor of
/// relationship `to`?
pub fn may_advertise(origin: CommunityRole, to: Relationship) -> bool {
    ADVERTISE[origin.row()][column(to)]
}

/// May a route the neighbor tagged with `class` be accepted from a neighbor
/// of relationship `from`?
pub fn may_accept(class: CommunityRole, from: Relationship) -> bool {
    ACCEPT[class.row()][column(from)]
}

/// Origin classes advertised to `to`, in table order
pub fn advertised_classes(to: Relationship) -> Vec<CommunityRole> {
    CommunityRole::all().into_iter().filter(|c| may_advertise(*c, to)).collect()
}

/// Neighbor classes accepted from `from`, in table order
pub fn accepted_classes(from: Relationship) -> Vec<CommunityRole> {
    CommunityRole::all().into_iter().filter(|c| may_accept(*c, from)).collect()
}

/// Local preference set on routes learned from a neighbor
pub fn local_preference(from: Relationship) -> u32 {
    match from {
        Relationship::Customer => 200,
        Relationship::Peer => 150,
        Relationship::Provider => 50,
    }
}
