//! # v6netc - Intent-to-configuration compiler for multi-AS IPv6 networks
//!
//! This library compiles a declarative description of an IPv6 network
//! (autonomous systems, routers, links and their commercial relationships)
//! into complete per-router configuration text in Cisco IOS style.
//!
//! ## Overview
//!
//! Operators describe what the network should do rather than writing device
//! commands. From one intent document the compiler derives:
//!
//! - **Addressing**: loopbacks from per-AS pools, /64 link subnets with host
//!   ids 1 and 2 for the two endpoints
//! - **Topology**: adjacency, border router classification, iBGP full mesh
//! - **IGP**: RIPng or OSPFv3 per AS
//! - **BGP**: eBGP sessions, community tagging and route-maps enforcing the
//!   "no free transit" model
//!
//! Every run is a full regeneration; identical intent yields byte-identical
//! artifacts.
//!
//! ## Architecture
//!
//! - `intent`: document types and structural validation
//! - `intent_loader`: JSON / YAML loading
//! - `ip`: pools, address registry and the allocator
//! - `topology`: interfaces, adjacency, roles and iBGP sessions
//! - `synth`: IGP and BGP synthesis, routing policy tables
//! - `render`: configuration text
//! - `orchestrator`: the compile pipeline and the artifact writer
//! - `utils`: prefix helpers and referential validation
//! - `error`: the [`CompileError`] taxonomy
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::path::Path;
//! use v6netc::orchestrator;
//!
//! let summary = orchestrator::compile_to_dir(Path::new("network.json"), Path::new("configs"))?;
//!
//! // configs/ now contains one <router>.cfg per router and manifest.json
//! println!("{} routers", summary.routers);
//! # Ok::<(), v6netc::CompileError>(())
//! ```
//!
//! ## Intent Format
//!
//! ```json
//! {
//!   "meta": { "link_prefix_length": 64, "loopback_prefix_length": 128 },
//!   "ases": {
//!     "65001": { "igp": "ospfv3", "loopback_pool": "2001:db8:1::/64", "routers": ["R1"] },
//!     "65002": { "igp": "ripng", "loopback_pool": "2001:db8:2::/64", "routers": ["R2"] }
//!   },
//!   "routers": { "R1": { "as": 65001 }, "R2": { "as": 65002 } },
//!   "links": [
//!     { "endpoints": ["R2", "R1"], "type": "inter_as", "relationship": "customer" }
//!   ],
//!   "bgp": { "required": true, "ibgp": { "mode": "full_mesh" } }
//! }
//! ```
//!
//! The relationship of an inter_as link is the role of the second endpoint
//! as seen from the first: above, R1 is a customer of R2.
//!
//! ## Error Handling
//!
//! The library returns [`CompileError`] (via `thiserror`); the binary reports
//! it with `color_eyre` and exits with [`CompileError::exit_code`].

pub mod error;
pub mod intent;
pub mod intent_loader;
pub mod ip;
pub mod orchestrator;
pub mod render;
pub mod synth;
pub mod topology;
pub mod utils;

pub use error::{CompileError, Result};
