//! Route-maps, community-lists and prefix-lists.
//!
//! The outbound and inbound maps are generated from the lookup tables in
//! [`super::policy`]; nothing in here decides on its own which origin class
//! may cross which boundary.

use super::policy::{accepted_classes, advertised_classes, local_preference, CommunityRole, CommunityTag};
use crate::intent::{Asn, Relationship};
use ipnet::Ipv6Net;

/// Name of the prefix-list holding self-originated prefixes
pub const SELF_PREFIX_LIST: &str = "PL-SELF";

/// Sequence number of the final deny entry
const FINAL_DENY_SEQ: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchingPolicy {
    Permit,
    Deny,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteMapMatch {
    Ipv6PrefixList(String),
    Community(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteMapSet {
    /// `set community X additive`
    CommunityAdditive(CommunityTag),
    LocalPreference(u32),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMapEntry {
    pub seq: u32,
    pub policy: MatchingPolicy,
    pub matches: Vec<RouteMapMatch>,
    pub actions: Vec<RouteMapSet>,
}

impl RouteMapEntry {
    pub fn new(seq: u32, policy: MatchingPolicy) -> Self {
        Self { seq, policy, matches: vec![], actions: vec![] }
    }

    pub fn add_match(mut self, m: RouteMapMatch) -> Self {
        self.matches.push(m);
        self
    }

    pub fn add_action(mut self, action: RouteMapSet) -> Self {
        self.actions.push(action);
        self
    }

    /// Whether this entry lets through routes of the given local origin class
    /// (entries without match statements match everything)
    fn permits_class(&self, class: CommunityRole) -> bool {
        self.policy == MatchingPolicy::Permit
            && (self.matches.is_empty()
                || self.matches.iter().any(|m| match m {
                    RouteMapMatch::Ipv6PrefixList(name) => {
                        class == CommunityRole::SelfOrigin && name == SELF_PREFIX_LIST
                    }
                    RouteMapMatch::Community(name) => *name == community_list_name(class),
                }))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMap {
    pub name: String,
    pub entries: Vec<RouteMapEntry>,
}

impl RouteMap {
    pub fn new(name: &str) -> Self {
        Self { name: name.to_owned(), entries: Vec::new() }
    }

    pub fn add_entry(&mut self, entry: RouteMapEntry) {
        self.entries.push(entry);
        self.entries.sort_by_key(|e| e.seq);
    }

    /// Whether routes carrying the local community of `class` leave through
    /// this map. Only meaningful for outbound maps.
    pub fn permits_class(&self, class: CommunityRole) -> bool {
        self.entries.iter().any(|e| e.permits_class(class))
    }
}

/// `ip community-list standard <name> permit <tag>`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct CommunityList {
    pub name: String,
    pub tag: CommunityTag,
}

/// Prefix-list with one permit entry per prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixList {
    pub name: String,
    pub prefixes: Vec<Ipv6Net>,
}

/// Name of the local community-list for an origin class
pub fn community_list_name(class: CommunityRole) -> String {
    format!("COMM-{}", class.label())
}

/// Name of the community-list matching a class tagged by a neighbor AS
pub fn neighbor_community_list_name(neighbor_asn: Asn, class: CommunityRole) -> String {
    format!("NBR{}-{}", neighbor_asn, class.label())
}

fn relationship_label(rel: Relationship) -> &'static str {
    match rel {
        Relationship::Customer => "CUSTOMER",
        Relationship::Peer => "PEER",
        Relationship::Provider => "PROVIDER",
    }
}

pub fn outbound_route_map_name(to: Relationship) -> String {
    format!("RM-OUT-{}", relationship_label(to))
}

pub fn inbound_route_map_name(from: Relationship, neighbor_asn: Asn) -> String {
    match from {
        // customers are trusted with everything, one map serves all of them
        Relationship::Customer => format!("RM-IN-{}", relationship_label(from)),
        _ => format!("RM-IN-{}-AS{}", relationship_label(from), neighbor_asn),
    }
}

/// Community-lists for the local AS, one per origin class
pub fn local_community_lists(local_asn: Asn) -> Vec<CommunityList> {
    CommunityRole::all()
        .into_iter()
        .map(|class| CommunityList {
            name: community_list_name(class),
            tag: CommunityTag::new(local_asn, class),
        })
        .collect()
}

/// Community-lists used to filter what a neighbor AS sends, or nothing when
/// everything is accepted from that neighbor
pub fn neighbor_community_lists(from: Relationship, neighbor_asn: Asn) -> Vec<CommunityList> {
    let accepted = accepted_classes(from);
    if accepted.len() == CommunityRole::all().len() {
        return Vec::new();
    }
    accepted
        .into_iter()
        .map(|class| CommunityList {
            name: neighbor_community_list_name(neighbor_asn, class),
            tag: CommunityTag::new(neighbor_asn, class),
        })
        .collect()
}

/// Outbound map towards a neighbor of relationship `to`.
///
/// Self-originated prefixes are tagged SELF on the way out; every other
/// permitted class is matched on the local community set when the route
/// came in. If the table permits every class, the map ends in a catch-all
/// permit, otherwise in an explicit deny.
pub fn outbound_route_map(local_asn: Asn, to: Relationship) -> RouteMap {
    let mut map = RouteMap::new(&outbound_route_map_name(to));
    let classes = advertised_classes(to);
    let mut seq = 10;

    if classes.contains(&CommunityRole::SelfOrigin) {
        map.add_entry(
            RouteMapEntry::new(seq, MatchingPolicy::Permit)
                .add_match(RouteMapMatch::Ipv6PrefixList(SELF_PREFIX_LIST.to_string()))
                .add_action(RouteMapSet::CommunityAdditive(CommunityTag::new(
                    local_asn,
                    CommunityRole::SelfOrigin,
                ))),
        );
        seq += 10;
    }

    if classes.len() == CommunityRole::all().len() {
        map.add_entry(RouteMapEntry::new(seq, MatchingPolicy::Permit));
        return map;
    }

    for class in classes.into_iter().filter(|c| *c != CommunityRole::SelfOrigin) {
        map.add_entry(
            RouteMapEntry::new(seq, MatchingPolicy::Permit)
                .add_match(RouteMapMatch::Community(community_list_name(class))),
        );
        seq += 10;
    }
    map.add_entry(RouteMapEntry::new(FINAL_DENY_SEQ, MatchingPolicy::Deny));
    map
}

/// Inbound map from a neighbor of relationship `from` in AS `neighbor_asn`.
///
/// Accepted routes are tagged with the local community for the relationship
/// and get the relationship's local preference.
pub fn inbound_route_map(local_asn: Asn, from: Relationship, neighbor_asn: Asn) -> RouteMap {
    let mut map = RouteMap::new(&inbound_route_map_name(from, neighbor_asn));
    let tag = RouteMapSet::CommunityAdditive(CommunityTag::new(local_asn, CommunityRole::learned_from(from)));
    let pref = RouteMapSet::LocalPreference(local_preference(from));

    let lists = neighbor_community_lists(from, neighbor_asn);
    if lists.is_empty() {
        map.add_entry(
            RouteMapEntry::new(10, MatchingPolicy::Permit)
                .add_action(tag)
                .add_action(pref),
        );
        return map;
    }

    for (i, list) in lists.into_iter().enumerate() {
        map.add_entry(
            RouteMapEntry::new(10 * (i as u32 + 1), MatchingPolicy::Permit)
                .add_match(RouteMapMatch::Community(list.name))
                .add_action(tag.clone())
                .add_action(pref.clone()),
        );
    }
    map.add_entry(RouteMapEntry::new(FINAL_DENY_SEQ, MatchingPolicy::Deny));
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outbound_to_peer_never_permits_transit() {
        for to in [Relationship::Peer, Relationship::Provider] {
            let map = outbound_route_map(65001, to);
            assert!(map.permits_class(CommunityRole::SelfOrigin));
            assert!(map.permits_class(CommunityRole::Client));
            assert!(!map.permits_class(CommunityRole::Peer), "{}", map.name);
            assert!(!map.permits_class(CommunityRole::Provider), "{}", map.name);
            let last = map.entries.last().unwrap();
            assert_eq!(last.policy, MatchingPolicy::Deny);
        }
    }

    #[test]
    fn test_outbound_to_customer_permits_all() {
        let map = outbound_route_map(65001, Relationship::Customer);
        assert_eq!(map.name, "RM-OUT-CUSTOMER");
        for class in CommunityRole::all() {
            assert!(map.permits_class(class));
        }
        assert_eq!(map.entries.len(), 2);
        assert_eq!(
            map.entries[0].actions,
            vec![RouteMapSet::CommunityAdditive(CommunityTag::new(65001, CommunityRole::SelfOrigin))]
        );
        assert!(map.entries[1].matches.is_empty());
    }

    #[test]
    fn test_inbound_from_customer_accepts_all_and_tags_client() {
        let map = inbound_route_map(65001, Relationship::Customer, 65002);
        assert_eq!(map.name, "RM-IN-CUSTOMER");
        assert_eq!(map.entries.len(), 1);
        assert!(map.entries[0].matches.is_empty());
        assert!(map.entries[0]
            .actions
            .contains(&RouteMapSet::CommunityAdditive(CommunityTag::new(65001, CommunityRole::Client))));
        assert!(map.entries[0].actions.contains(&RouteMapSet::LocalPreference(200)));
    }

    #[test]
    fn test_inbound_from_peer_matches_neighbor_communities() {
        let map = inbound_route_map(65001, Relationship::Peer, 65003);
        assert_eq!(map.name, "RM-IN-PEER-AS65003");
        let matched: Vec<&RouteMapMatch> = map.entries.iter().flat_map(|e| e.matches.iter()).collect();
        assert_eq!(
            matched,
            vec![
                &RouteMapMatch::Community("NBR65003-SELF".to_string()),
                &RouteMapMatch::Community("NBR65003-CLIENT".to_string()),
            ]
        );
        assert_eq!(map.entries.last().unwrap().policy, MatchingPolicy::Deny);

        let lists = neighbor_community_lists(Relationship::Peer, 65003);
        assert_eq!(lists[0].tag.to_string(), "65003:50");
        assert_eq!(lists[1].tag.to_string(), "65003:100");
        assert!(neighbor_community_lists(Relationship::Customer, 65003).is_empty());
    }

    #[test]
    fn test_local_community_lists() {
        let lists = local_community_lists(111);
        let rendered: Vec<String> = lists.iter().map(|l| format!("{} {}", l.name, l.tag)).collect();
        assert_eq!(
            rendered,
            vec!["COMM-SELF 111:50", "COMM-CLIENT 111:100", "COMM-PEER 111:200", "COMM-PROVIDER 111:300"]
        );
    }
}
