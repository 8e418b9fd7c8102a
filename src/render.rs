//! Cisco IOS-style command text.
//!
//! Rendering is a pure function of a [`RouterConfiguration`]. Sections come
//! in a fixed order: preamble, interfaces, IGP, BGP, policy objects. Every
//! section ends with a `!` line.

use crate::synth::bgp::{BgpNeighbor, BgpStanza};
use crate::synth::igp::{IgpProcess, IgpStanza};
use crate::synth::route_map::{MatchingPolicy, RouteMap, RouteMapMatch, RouteMapSet};
use crate::synth::RouterConfiguration;
use itertools::Itertools;

/// Gap between prefix-list sequence numbers
const PREFIX_LIST_SEQ_STEP: usize = 10;

/// Render the full configuration text of one router
pub fn render(config: &RouterConfiguration) -> String {
    let mut lines: Vec<String> = Vec::new();

    render_preamble(config, &mut lines);
    render_interfaces(config, &mut lines);
    render_igp(&config.igp, &mut lines);
    if let Some(bgp) = &config.bgp {
        render_bgp(bgp, &mut lines);
        render_policy(bgp, &mut lines);
    }
    lines.push("end".to_string());

    let mut text = lines.iter().join("\n");
    text.push('\n');
    text
}

fn render_preamble(config: &RouterConfiguration, lines: &mut Vec<String>) {
    lines.push("!".to_string());
    lines.push(format!("hostname {}", config.hostname));
    lines.push("!".to_string());
    lines.push("no ip domain-lookup".to_string());
    lines.push("ipv6 unicast-routing".to_string());
    lines.push("ip bgp-community new-format".to_string());
    lines.push("!".to_string());
}

fn render_interfaces(config: &RouterConfiguration, lines: &mut Vec<String>) {
    for iface in &config.interfaces {
        lines.push(format!("interface {}", iface.name));
        if let Some(description) = &iface.description {
            lines.push(format!(" description {}", description));
        }
        lines.push(" no ip address".to_string());
        if iface.description.is_some() {
            lines.push(" ipv6 enable".to_string());
        }
        lines.push(format!(" ipv6 address {}", iface.address));
        lines.extend(igp_interface_lines(&config.igp, &iface.name));
        lines.push(" no shutdown".to_string());
        lines.push("exit".to_string());
        lines.push("!".to_string());
    }
}

fn igp_interface_lines(igp: &IgpStanza, name: &str) -> Vec<String> {
    let Some(iface) = igp.interface(name) else {
        return Vec::new();
    };
    match &igp.process {
        IgpProcess::RipNg { name: process, .. } => vec![format!(" ipv6 rip {} enable", process)],
        IgpProcess::Ospfv3 { process_id, area, .. } => {
            let mut out = vec![format!(" ipv6 ospf {} area {}", process_id, area)];
            if let Some(cost) = iface.cost {
                out.push(format!(" ipv6 ospf cost {}", cost));
            }
            out
        }
    }
}

fn render_igp(igp: &IgpStanza, lines: &mut Vec<String>) {
    match &igp.process {
        IgpProcess::RipNg { name, redistribute_connected } => {
            lines.push(format!("ipv6 router rip {}", name));
            if *redistribute_connected {
                lines.push(" redistribute connected".to_string());
            }
        }
        IgpProcess::Ospfv3 { process_id, router_id, passive_interfaces, .. } => {
            lines.push(format!("ipv6 router ospf {}", process_id));
            lines.push(format!(" router-id {}", router_id));
            for iface in passive_interfaces {
                lines.push(format!(" passive-interface {}", iface));
            }
        }
    }
    lines.push("exit".to_string());
    lines.push("!".to_string());
}

fn render_bgp(bgp: &BgpStanza, lines: &mut Vec<String>) {
    lines.push(format!("router bgp {}", bgp.asn));
    lines.push(format!(" bgp router-id {}", bgp.router_id));
    lines.push(" bgp log-neighbor-changes".to_string());
    lines.push(" no bgp default ipv4-unicast".to_string());

    for n in &bgp.neighbors {
        lines.push(format!(" neighbor {} remote-as {}", n.address, n.remote_as));
        lines.push(format!(" neighbor {} description {}", n.address, neighbor_description(n)));
        if let Some(source) = &n.update_source {
            lines.push(format!(" neighbor {} update-source {}", n.address, source));
        }
    }

    lines.push(" !".to_string());
    lines.push(" address-family ipv6 unicast".to_string());
    for network in &bgp.networks {
        lines.push(format!("  network {}", network));
    }
    for n in &bgp.neighbors {
        lines.push(format!("  neighbor {} activate", n.address));
        if n.send_community {
            lines.push(format!("  neighbor {} send-community", n.address));
        }
        if n.next_hop_self {
            lines.push(format!("  neighbor {} next-hop-self", n.address));
        }
        if let Some(rm) = &n.route_map_in {
            lines.push(format!("  neighbor {} route-map {} in", n.address, rm));
        }
        if let Some(rm) = &n.route_map_out {
            lines.push(format!("  neighbor {} route-map {} out", n.address, rm));
        }
    }
    lines.push(" exit-address-family".to_string());
    lines.push("exit".to_string());
    lines.push("!".to_string());
}

fn neighbor_description(n: &BgpNeighbor) -> String {
    match n.session.relationship() {
        Some(rel) => format!("eBGP {} ({})", n.peer, rel),
        None => format!("iBGP {}", n.peer),
    }
}

fn render_policy(bgp: &BgpStanza, lines: &mut Vec<String>) {
    for list in &bgp.community_lists {
        lines.push(format!("ip community-list standard {} permit {}", list.name, list.tag));
    }
    lines.push("!".to_string());

    for (i, prefix) in bgp.prefix_list.prefixes.iter().enumerate() {
        lines.push(format!(
            "ipv6 prefix-list {} seq {} permit {}",
            bgp.prefix_list.name,
            (i + 1) * PREFIX_LIST_SEQ_STEP,
            prefix
        ));
    }
    lines.push("!".to_string());

    for rm in &bgp.route_maps {
        render_route_map(rm, lines);
    }
}

fn render_route_map(rm: &RouteMap, lines: &mut Vec<String>) {
    for entry in &rm.entries {
        let policy = match entry.policy {
            MatchingPolicy::Permit => "permit",
            MatchingPolicy::Deny => "deny",
        };
        lines.push(format!("route-map {} {} {}", rm.name, policy, entry.seq));
        for m in &entry.matches {
            lines.push(match m {
                RouteMapMatch::Ipv6PrefixList(name) => format!(" match ipv6 address prefix-list {}", name),
                RouteMapMatch::Community(name) => format!(" match community {}", name),
            });
        }
        for action in &entry.actions {
            lines.push(match action {
                RouteMapSet::CommunityAdditive(tag) => format!(" set community {} additive", tag),
                RouteMapSet::LocalPreference(pref) => format!(" set local-preference {}", pref),
            });
        }
        lines.push("!".to_string());
    }
}
