use crate::error::{CompileError, Result};
use crate::utils::ip_utils::parse_prefix;
use ipnet::Ipv6Net;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::net::Ipv4Addr;

/// Autonomous system number
pub type Asn = u32;

/// Link prefix length mandated by the addressing policy
pub const LINK_PREFIX_LEN: u8 = 64;
/// Loopback prefix length mandated by the addressing policy
pub const LOOPBACK_PREFIX_LEN: u8 = 128;
/// Largest interface cost OSPFv3 accepts
pub const MAX_OSPF_COST: u32 = 65535;
/// Link-subnet space used when the document does not declare one
pub const DEFAULT_LINK_POOL: &str = "fd00::/48";

/// Root intent document. Immutable once loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NetworkIntent {
    #[serde(default)]
    pub meta: AddressingPolicy,
    pub ases: BTreeMap<Asn, AsDefinition>,
    pub routers: BTreeMap<String, RouterDefinition>,
    pub links: Vec<LinkDefinition>,
    #[serde(default)]
    pub bgp: BgpPolicy,
}

/// Global addressing rules
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddressingPolicy {
    #[serde(default = "default_link_prefix_length")]
    pub link_prefix_length: u8,
    #[serde(default = "default_loopback_prefix_length")]
    pub loopback_prefix_length: u8,
    /// Process-wide space from which link subnets are carved
    #[serde(default = "default_link_pool")]
    pub link_pool: String,
}

fn default_link_prefix_length() -> u8 {
    LINK_PREFIX_LEN
}

fn default_loopback_prefix_length() -> u8 {
    LOOPBACK_PREFIX_LEN
}

fn default_link_pool() -> String {
    DEFAULT_LINK_POOL.to_string()
}

impl Default for AddressingPolicy {
    fn default() -> Self {
        Self {
            link_prefix_length: LINK_PREFIX_LEN,
            loopback_prefix_length: LOOPBACK_PREFIX_LEN,
            link_pool: default_link_pool(),
        }
    }
}

impl AddressingPolicy {
    /// Parsed link-subnet space
    pub fn link_pool(&self) -> Result<Ipv6Net> {
        parse_prefix(&self.link_pool, "meta.link_pool")
    }
}

/// One autonomous system
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AsDefinition {
    /// IGP selector, resolved by [`crate::synth::igp::IgpProtocol::lookup`]
    pub igp: String,
    pub loopback_pool: String,
    /// Ordered membership list; loopbacks are handed out in this order
    pub routers: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ospf_process_id: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ospf_area: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rip_process_name: Option<String>,
}

impl AsDefinition {
    pub fn loopback_pool(&self, asn: Asn) -> Result<Ipv6Net> {
        parse_prefix(&self.loopback_pool, &format!("loopback_pool of AS {}", asn))
    }
}

/// One router
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouterDefinition {
    #[serde(rename = "as")]
    pub asn: Asn,
    /// 32-bit router-id for BGP and OSPFv3
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub router_id: Option<Ipv4Addr>,
}

/// Whether a link stays inside an AS or crosses a boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkKind {
    IntraAs,
    InterAs,
}

/// Commercial relationship of a neighbor, as seen from the local router
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Relationship {
    #[serde(alias = "client")]
    Customer,
    Peer,
    Provider,
}

impl Relationship {
    /// The relationship as seen from the other end of the link
    pub fn inverse(self) -> Self {
        match self {
            Self::Customer => Self::Provider,
            Self::Peer => Self::Peer,
            Self::Provider => Self::Customer,
        }
    }

    pub fn all() -> [Relationship; 3] {
        [Self::Customer, Self::Peer, Self::Provider]
    }
}

impl fmt::Display for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Customer => write!(f, "customer"),
            Self::Peer => write!(f, "peer"),
            Self::Provider => write!(f, "provider"),
        }
    }
}

/// A point-to-point link. The relationship literal is the role of
/// `endpoints[1]` seen from `endpoints[0]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LinkDefinition {
    pub endpoints: [String; 2],
    #[serde(rename = "type")]
    pub kind: LinkKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship: Option<Relationship>,
    /// Explicit /64, claimed before sequential allocation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subnet: Option<String>,
    /// Interface names on the two endpoints, in endpoint order
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interfaces: Option<[String; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ospf_cost: Option<u32>,
}

impl LinkDefinition {
    /// Human readable identifier used in error messages
    pub fn label(&self, index: usize) -> String {
        format!("link #{} ({} - {})", index, self.endpoints[0], self.endpoints[1])
    }

    pub fn explicit_subnet(&self, index: usize) -> Result<Option<Ipv6Net>> {
        self.subnet
            .as_deref()
            .map(|s| parse_prefix(s, &format!("subnet of {}", self.label(index))))
            .transpose()
    }
}

/// Global BGP flags
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BgpPolicy {
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub ibgp: IbgpPolicy,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IbgpPolicy {
    #[serde(default)]
    pub mode: IbgpMode,
    #[serde(default)]
    pub members: MeshMembers,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IbgpMode {
    #[default]
    FullMesh,
}

/// Which routers of a BGP-enabled AS join the iBGP mesh
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeshMembers {
    /// Only border routers speak BGP
    #[default]
    BorderOnly,
    /// Every router of an AS with at least one border router speaks BGP
    All,
}

impl NetworkIntent {
    /// Structural validation. Referential checks live in
    /// [`crate::utils::validation::validate_references`].
    pub fn validate(&self) -> Result<()> {
        if self.meta.link_prefix_length != LINK_PREFIX_LEN {
            return Err(CompileError::malformed(format!(
                "meta.link_prefix_length must be {}, got {}",
                LINK_PREFIX_LEN, self.meta.link_prefix_length
            )));
        }
        if self.meta.loopback_prefix_length != LOOPBACK_PREFIX_LEN {
            return Err(CompileError::malformed(format!(
                "meta.loopback_prefix_length must be {}, got {}",
                LOOPBACK_PREFIX_LEN, self.meta.loopback_prefix_length
            )));
        }
        let link_pool = self.meta.link_pool()?;
        if link_pool.prefix_len() > LINK_PREFIX_LEN {
            return Err(CompileError::malformed(format!(
                "meta.link_pool {} is smaller than a /{}",
                link_pool, LINK_PREFIX_LEN
            )));
        }

        let token_re = config_token_regex();
        for (asn, as_def) in &self.ases {
            as_def.loopback_pool(*asn)?;
            if as_def.ospf_process_id == Some(0) {
                return Err(CompileError::malformed(format!(
                    "AS {} ospf_process_id must be between 1 and {}",
                    asn,
                    u16::MAX
                )));
            }
            if let Some(name) = &as_def.rip_process_name {
                if !token_re.is_match(name) {
                    return Err(CompileError::malformed(format!(
                        "AS {} rip_process_name '{}' must match {}",
                        asn,
                        name.escape_debug(),
                        token_re.as_str()
                    )));
                }
            }
            if as_def.routers.is_empty() {
                return Err(CompileError::malformed(format!(
                    "AS {} must define a non-empty routers list",
                    asn
                )));
            }
            if self.bgp.required && *asn > u16::MAX as u32 {
                return Err(CompileError::malformed(format!(
                    "AS {} does not fit a standard community (16-bit ASN required when bgp.required)",
                    asn
                )));
            }
        }

        let id_re = router_id_regex();
        for name in self.routers.keys() {
            if !id_re.is_match(name) {
                return Err(CompileError::malformed(format!(
                    "router identifier '{}' must match {}",
                    name,
                    id_re.as_str()
                )));
            }
        }

        for (index, link) in self.links.iter().enumerate() {
            if link.endpoints[0] == link.endpoints[1] {
                return Err(CompileError::malformed(format!(
                    "{} connects a router to itself",
                    link.label(index)
                )));
            }
            match (link.kind, link.relationship) {
                (LinkKind::InterAs, None) => {
                    return Err(CompileError::malformed(format!(
                        "{} is inter_as and must declare a relationship",
                        link.label(index)
                    )));
                }
                (LinkKind::IntraAs, Some(rel)) => {
                    return Err(CompileError::malformed(format!(
                        "{} is intra_as but declares relationship '{}'",
                        link.label(index),
                        rel
                    )));
                }
                _ => {}
            }
            if let Some(cost) = link.ospf_cost {
                if !(1..=MAX_OSPF_COST).contains(&cost) {
                    return Err(CompileError::malformed(format!(
                        "{} ospf_cost must be between 1 and {}, got {}",
                        link.label(index),
                        MAX_OSPF_COST,
                        cost
                    )));
                }
            }
            if let Some(subnet) = link.explicit_subnet(index)? {
                if subnet.prefix_len() != LINK_PREFIX_LEN {
                    return Err(CompileError::malformed(format!(
                        "{} subnet must be /{}, got /{}",
                        link.label(index),
                        LINK_PREFIX_LEN,
                        subnet.prefix_len()
                    )));
                }
            }
        }

        self.interface_names()?;
        Ok(())
    }

    /// Interface names for every link endpoint, in link order. Undeclared
    /// names default to `GigabitEthernet<k>/0`, k counting the router's links
    /// in declaration order.
    pub fn interface_names(&self) -> Result<Vec<[String; 2]>> {
        let token_re = config_token_regex();
        let mut counters: BTreeMap<&str, usize> = BTreeMap::new();
        let mut used: BTreeSet<(String, String)> = BTreeSet::new();
        let mut names = Vec::with_capacity(self.links.len());

        for (index, link) in self.links.iter().enumerate() {
            let mut pair: [String; 2] = Default::default();
            for side in 0..2 {
                let router = link.endpoints[side].as_str();
                let counter = counters.entry(router).or_insert(0);
                *counter += 1;
                let name = match &link.interfaces {
                    Some(explicit) => explicit[side].clone(),
                    None => format!("GigabitEthernet{}/0", counter),
                };
                if name.trim().is_empty() || name.eq_ignore_ascii_case("Loopback0") {
                    return Err(CompileError::malformed(format!(
                        "{} uses reserved interface name '{}' on {}",
                        link.label(index),
                        name,
                        router
                    )));
                }
                if !token_re.is_match(&name) {
                    return Err(CompileError::malformed(format!(
                        "{} interface name '{}' on {} must match {}",
                        link.label(index),
                        name.escape_debug(),
                        router,
                        token_re.as_str()
                    )));
                }
                if !used.insert((router.to_string(), name.clone())) {
                    return Err(CompileError::malformed(format!(
                        "interface {} of router {} is used by more than one link",
                        name, router
                    )));
                }
                pair[side] = name;
            }
            names.push(pair);
        }

        Ok(names)
    }
}

/// Router identifiers double as artifact file names.
pub fn router_id_regex() -> Regex {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.\-]*$").expect("static regex is valid")
}

/// Names copied verbatim into command text: interface names and the RIPng
/// process name. One token, no whitespace.
pub fn config_token_regex() -> Regex {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_./:\-]*$").expect("static regex is valid")
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = r#"{
        "ases": {
            "65001": { "igp": "ospfv3", "loopback_pool": "2001:db8:1::/64", "routers": ["A1", "A2"] },
            "65002": { "igp": "ripng", "loopback_pool": "2001:db8:2::/64", "routers": ["B1"] }
        },
        "routers": { "A1": { "as": 65001 }, "A2": { "as": 65001 }, "B1": { "as": 65002 } },
        "links": [
            { "endpoints": ["A1", "A2"], "type": "intra_as" },
            { "endpoints": ["A1", "B1"], "type": "inter_as", "relationship": "peer" }
        ]
    }"#;

    fn intent(doc: &str) -> NetworkIntent {
        serde_json::from_str(doc).unwrap()
    }

    fn assert_malformed(doc: &str, needle: &str) {
        match intent(doc).validate() {
            Err(CompileError::MalformedIntent(msg)) => assert!(msg.contains(needle), "{msg}"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_base_document_is_valid() {
        intent(BASE).validate().unwrap();
    }

    #[test]
    fn test_interface_name_with_newline() {
        let doc = BASE.replace(
            r#""type": "intra_as" }"#,
            r#""type": "intra_as", "interfaces": ["Gi1/0\nreload", "Gi1/0"] }"#,
        );
        assert_malformed(&doc, "interface name");
    }

    #[test]
    fn test_interface_name_with_space() {
        let doc = BASE.replace(
            r#""type": "intra_as" }"#,
            r#""type": "intra_as", "interfaces": ["Gi1/0 shutdown", "Gi1/0"] }"#,
        );
        assert_malformed(&doc, "interface name");
    }

    #[test]
    fn test_explicit_interface_names_accepted() {
        let doc = BASE.replace(
            r#""type": "intra_as" }"#,
            r#""type": "intra_as", "interfaces": ["Ethernet0/1.100", "Serial1/0:0"] }"#,
        );
        let names = intent(&doc).interface_names().unwrap();
        assert_eq!(names[0], ["Ethernet0/1.100".to_string(), "Serial1/0:0".to_string()]);
        // A1's second link keeps counting from its first
        assert_eq!(names[1][0], "GigabitEthernet2/0");
    }

    #[test]
    fn test_empty_rip_process_name() {
        let doc = BASE.replace(r#""igp": "ripng","#, r#""igp": "ripng", "rip_process_name": "","#);
        assert_malformed(&doc, "rip_process_name");
    }

    #[test]
    fn test_rip_process_name_with_newline() {
        let doc = BASE.replace(r#""igp": "ripng","#, r#""igp": "ripng", "rip_process_name": "CORE\nreload","#);
        assert_malformed(&doc, "rip_process_name");
    }

    #[test]
    fn test_ospf_process_id_zero() {
        let doc = BASE.replace(r#""igp": "ospfv3","#, r#""igp": "ospfv3", "ospf_process_id": 0,"#);
        assert_malformed(&doc, "ospf_process_id");
    }

    #[test]
    fn test_ospf_process_id_out_of_range_is_rejected_by_parser() {
        let doc = BASE.replace(r#""igp": "ospfv3","#, r#""igp": "ospfv3", "ospf_process_id": 70000,"#);
        assert!(serde_json::from_str::<NetworkIntent>(&doc).is_err());
    }

    #[test]
    fn test_ospf_cost_bounds() {
        for cost in [0u32, 65536, 70000] {
            let doc = BASE.replace(
                r#""type": "intra_as" }"#,
                &format!(r#""type": "intra_as", "ospf_cost": {} }}"#, cost),
            );
            assert_malformed(&doc, "ospf_cost");
        }
        for cost in [1u32, 65535] {
            let doc = BASE.replace(
                r#""type": "intra_as" }"#,
                &format!(r#""type": "intra_as", "ospf_cost": {} }}"#, cost),
            );
            intent(&doc).validate().unwrap();
        }
    }
}
