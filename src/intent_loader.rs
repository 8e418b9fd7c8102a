use crate::error::{CompileError, Result};
use crate::intent::NetworkIntent;
use crate::synth::igp::IgpProtocol;
use crate::utils::validate_references;
use log::{debug, info};
use std::fs;
use std::path::Path;

/// Serialization of an intent document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentFormat {
    Json,
    Yaml,
}

impl IntentFormat {
    /// `.yaml` / `.yml` select YAML, everything else is read as JSON
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase).as_deref() {
            Some("yaml") | Some("yml") => Self::Yaml,
            _ => Self::Json,
        }
    }
}

/// Load, parse and validate an intent document
pub fn load_intent(path: &Path) -> Result<NetworkIntent> {
    info!("Loading intent from: {:?}", path);

    let content = fs::read_to_string(path).map_err(|source| CompileError::IntentUnreadable {
        path: path.to_path_buf(),
        source,
    })?;

    parse_intent(&content, IntentFormat::from_path(path))
}

/// Parse and validate an intent document held in memory
pub fn parse_intent(content: &str, format: IntentFormat) -> Result<NetworkIntent> {
    let intent: NetworkIntent = match format {
        IntentFormat::Json => serde_json::from_str(content).map_err(|e| CompileError::malformed(e.to_string()))?,
        IntentFormat::Yaml => serde_yaml::from_str(content).map_err(|e| CompileError::malformed(e.to_string()))?,
    };

    intent.validate()?;
    validate_references(&intent)?;
    for (asn, as_def) in &intent.ases {
        IgpProtocol::lookup(*asn, &as_def.igp)?;
    }

    debug!(
        "Intent: {} ASes, {} routers, {} links",
        intent.ases.len(),
        intent.routers.len(),
        intent.links.len()
    );
    Ok(intent)
}
