//! Compilation orchestrator.
//!
//! Coordinates the pipeline from a loaded intent to the artifacts on disk:
//!
//! 1. allocation, sequential, inside a consumed [`Allocator`];
//! 2. topology construction;
//! 3. per-router synthesis and rendering, in parallel over an immutable
//!    model, collected into ordered maps;
//! 4. artifact writing, only once every router has been rendered.

use crate::error::{CompileError, Result};
use crate::intent::{Asn, NetworkIntent};
use crate::intent_loader::load_intent;
use crate::ip::{AddressPlan, Allocator};
use crate::render::render;
use crate::synth::{synthesize_router, RouterConfiguration};
use crate::topology::Topology;
use ipnet::Ipv6Net;
use log::{debug, info, warn};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};

/// File name of the artifact index
pub const MANIFEST_FILE: &str = "manifest.json";

/// Extension of per-router artifacts
pub const ARTIFACT_EXTENSION: &str = "cfg";

/// Output of the in-memory phases
#[derive(Debug, Clone)]
pub struct CompiledNetwork {
    pub plan: AddressPlan,
    pub topology: Topology,
    /// router -> configuration
    pub configs: BTreeMap<String, RouterConfiguration>,
}

/// One manifest record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestEntry {
    pub artifact: String,
    pub asn: Asn,
    pub loopback: Ipv6Net,
    pub router_id: Ipv4Addr,
    pub is_border: bool,
    pub igp: String,
    pub bgp: bool,
}

/// What a successful run produced
#[derive(Debug, Clone)]
pub struct CompileSummary {
    pub routers: usize,
    pub artifacts: Vec<PathBuf>,
}

/// Run allocation, topology construction and synthesis
pub fn compile(intent: &NetworkIntent) -> Result<CompiledNetwork> {
    info!("Allocating addresses");
    let plan = Allocator::new(intent)?.allocate(intent)?;

    info!("Building topology");
    let topology = Topology::build(intent, &plan)?;

    info!("Synthesizing {} router configurations", topology.routers.len());
    let configs = topology
        .router_names()
        .par_iter()
        .map(|name| synthesize_router(intent, &topology, name).map(|config| (name.to_string(), config)))
        .collect::<Result<BTreeMap<_, _>>>()?;

    Ok(CompiledNetwork { plan, topology, configs })
}

/// Render every configuration to text, keyed by router
pub fn render_all(compiled: &CompiledNetwork) -> BTreeMap<String, String> {
    compiled
        .configs
        .par_iter()
        .map(|(name, config)| (name.clone(), render(config)))
        .collect()
}

pub fn artifact_name(router: &str) -> String {
    format!("{}.{}", router, ARTIFACT_EXTENSION)
}

pub fn build_manifest(compiled: &CompiledNetwork) -> BTreeMap<String, ManifestEntry> {
    compiled
        .configs
        .iter()
        .filter_map(|(name, config)| {
            let loopback = config.loopback()?;
            Some((
                name.clone(),
                ManifestEntry {
                    artifact: artifact_name(name),
                    asn: config.asn,
                    loopback: loopback.address,
                    router_id: config.router_id,
                    is_border: config.is_border,
                    igp: config.igp.protocol.to_string(),
                    bgp: config.bgp.is_some(),
                },
            ))
        })
        .collect()
}

/// Write every artifact plus the manifest into `out_dir`.
///
/// All files are first staged as hidden temporaries, then renamed into
/// place. A failure while staging removes the temporaries and leaves any
/// previous output untouched.
pub fn write_artifacts(
    out_dir: &Path,
    rendered: &BTreeMap<String, String>,
    manifest: &BTreeMap<String, ManifestEntry>,
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(out_dir).map_err(|source| CompileError::WriteFailure {
        router: "(output directory)".to_string(),
        path: out_dir.to_path_buf(),
        source,
    })?;

    let manifest_json = serde_json::to_string_pretty(manifest).map_err(|e| CompileError::WriteFailure {
        router: "(manifest)".to_string(),
        path: out_dir.join(MANIFEST_FILE),
        source: e.into(),
    })?;

    let mut files: Vec<(String, String, &str)> = rendered
        .iter()
        .map(|(router, text)| (router.clone(), artifact_name(router), text.as_str()))
        .collect();
    let manifest_text = manifest_json + "\n";
    files.push(("(manifest)".to_string(), MANIFEST_FILE.to_string(), manifest_text.as_str()));

    let mut staged: Vec<(String, PathBuf, PathBuf)> = Vec::with_capacity(files.len());
    for (owner, file_name, content) in files {
        let temp = out_dir.join(format!(".{}.tmp", file_name));
        let target = out_dir.join(&file_name);
        if let Err(source) = fs::write(&temp, content) {
            discard(&staged);
            let _ = fs::remove_file(&temp);
            return Err(CompileError::WriteFailure { router: owner, path: temp, source });
        }
        staged.push((owner, temp, target));
    }

    let mut written = Vec::with_capacity(staged.len());
    for (index, (owner, temp, target)) in staged.iter().enumerate() {
        if let Err(source) = fs::rename(temp, target) {
            discard(&staged[index..]);
            return Err(CompileError::WriteFailure {
                router: owner.clone(),
                path: target.clone(),
                source,
            });
        }
        debug!("Wrote {:?}", target);
        written.push(target.clone());
    }

    remove_stale_artifacts(out_dir, rendered);
    Ok(written)
}

/// Delete `<router>.cfg` files left by earlier runs for routers that are no
/// longer in the intent, so the directory matches the manifest.
fn remove_stale_artifacts(out_dir: &Path, rendered: &BTreeMap<String, String>) {
    let entries = match fs::read_dir(out_dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Failed to scan {:?} for stale artifacts: {}", out_dir, e);
            return;
        }
    };

    for entry in entries.filter_map(|e| e.ok()) {
        let path = entry.path();
        if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some(ARTIFACT_EXTENSION) {
            continue;
        }
        let Some(router) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        if rendered.contains_key(router) {
            continue;
        }
        match fs::remove_file(&path) {
            Ok(()) => info!("Removed stale artifact {:?}", path),
            Err(e) => warn!("Failed to remove stale artifact {:?}: {}", path, e),
        }
    }
}

fn discard(staged: &[(String, PathBuf, PathBuf)]) {
    for (_, temp, _) in staged {
        if let Err(e) = fs::remove_file(temp) {
            warn!("Failed to remove temporary file {:?}: {}", temp, e);
        }
    }
}

/// Load `intent_path`, compile it and write the artifacts to `out_dir`
pub fn compile_to_dir(intent_path: &Path, out_dir: &Path) -> Result<CompileSummary> {
    let intent = load_intent(intent_path)?;
    let compiled = compile(&intent)?;
    let rendered = render_all(&compiled);
    let manifest = build_manifest(&compiled);

    info!("Writing {} artifacts to {:?}", rendered.len(), out_dir);
    let artifacts = write_artifacts(out_dir, &rendered, &manifest)?;

    Ok(CompileSummary { routers: rendered.len(), artifacts })
}

/// Run the full pipeline without touching the filesystem
pub fn check(intent_path: &Path) -> Result<CompileSummary> {
    let intent = load_intent(intent_path)?;
    let compiled = compile(&intent)?;
    let rendered = render_all(&compiled);
    Ok(CompileSummary { routers: rendered.len(), artifacts: Vec::new() })
}
