//! Referential validation of the intent document.
//!
//! Structural checks (types, prefix lengths, literals) happen in
//! [`NetworkIntent::validate`]; this module checks that every name the
//! document uses refers to something the document defines.

use crate::error::{CompileError, Result};
use crate::intent::{LinkKind, NetworkIntent};
use std::collections::BTreeSet;

/// Validate cross references between ASes, routers and links
///
/// Checks for:
/// - Routers owned by an AS that does not exist
/// - Routers missing from (or listed twice in) their AS membership list
/// - Membership entries naming unknown routers or routers of another AS
/// - Link endpoints naming unknown routers
/// - inter_as links inside one AS, intra_as links across two
///
/// # Returns
/// * `Ok(())` if every reference resolves
/// * `Err(CompileError::ReferentialError)` naming the first dangling reference
pub fn validate_references(intent: &NetworkIntent) -> Result<()> {
    for (name, router) in &intent.routers {
        let as_def = intent.ases.get(&router.asn).ok_or_else(|| {
            CompileError::referential(format!("router {} belongs to undefined AS {}", name, router.asn))
        })?;
        if !as_def.routers.iter().any(|member| member == name) {
            return Err(CompileError::referential(format!(
                "router {} is not listed in the routers of AS {}",
                name, router.asn
            )));
        }
    }

    for (asn, as_def) in &intent.ases {
        let mut seen = BTreeSet::new();
        for member in &as_def.routers {
            if !seen.insert(member.as_str()) {
                return Err(CompileError::referential(format!(
                    "router {} is listed twice in AS {}",
                    member, asn
                )));
            }
            match intent.routers.get(member) {
                None => {
                    return Err(CompileError::referential(format!(
                        "AS {} lists undefined router {}",
                        asn, member
                    )));
                }
                Some(router) if router.asn != *asn => {
                    return Err(CompileError::referential(format!(
                        "AS {} lists router {} which belongs to AS {}",
                        asn, member, router.asn
                    )));
                }
                Some(_) => {}
            }
        }
    }

    for (index, link) in intent.links.iter().enumerate() {
        let mut asns = [0; 2];
        for (side, endpoint) in link.endpoints.iter().enumerate() {
            let router = intent.routers.get(endpoint).ok_or_else(|| {
                CompileError::referential(format!(
                    "{} names undefined router {}",
                    link.label(index),
                    endpoint
                ))
            })?;
            asns[side] = router.asn;
        }

        match link.kind {
            LinkKind::InterAs if asns[0] == asns[1] => {
                return Err(CompileError::referential(format!(
                    "{} is inter_as but both endpoints are in AS {}",
                    link.label(index),
                    asns[0]
                )));
            }
            LinkKind::IntraAs if asns[0] != asns[1] => {
                return Err(CompileError::referential(format!(
                    "{} is intra_as but connects AS {} and AS {}",
                    link.label(index),
                    asns[0],
                    asns[1]
                )));
            }
            _ => {}
        }
    }

    Ok(())
}
