//! Buildpack order normalization.
//!
//! An order reaches kp either as a structured document (`--order <path>`) or as
//! repeated `--buildpack id[@version],...` selectors. Both are decoded here
//! into `Vec<OrderEntry>` so nothing downstream branches on the input form.

use std::io::Read;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::{BuildpackRef, KpError, KpResult, OrderEntry};

fn max_order_bytes() -> u64 {
    std::env::var("KP_MAX_ORDER_BYTES")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(1 << 20) // 1 MiB default
}

/// The two accepted spellings of a buildpack order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderInput {
    File(PathBuf),
    Selectors(Vec<String>),
}

impl OrderInput {
    /// Pick the input form from raw flag values. `Ok(None)` means the user
    /// gave neither; giving both is rejected outright.
    pub fn from_flags(order: Option<&Path>, buildpacks: &[String]) -> KpResult<Option<Self>> {
        let order = order.filter(|p| !p.as_os_str().is_empty());
        match (order, buildpacks.is_empty()) {
            (Some(_), false) => Err(KpError::ConflictingInput { first: "order", second: "buildpack" }),
            (Some(path), true) => Ok(Some(OrderInput::File(path.to_path_buf()))),
            (None, false) => Ok(Some(OrderInput::Selectors(buildpacks.to_vec()))),
            (None, true) => Ok(None),
        }
    }

    pub fn resolve(&self) -> KpResult<Vec<OrderEntry>> {
        match self {
            OrderInput::File(path) => read_order_file(path),
            OrderInput::Selectors(selectors) => parse_selectors(selectors),
        }
    }
}

/// Validate and resolve order flags in one step.
pub fn normalize(order: Option<&Path>, buildpacks: &[String]) -> KpResult<Option<Vec<OrderEntry>>> {
    OrderInput::from_flags(order, buildpacks)?
        .map(|input| input.resolve())
        .transpose()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OrderDocument {
    List(Vec<OrderEntry>),
    Wrapped { order: Vec<OrderEntry> },
}

pub fn read_order_file(path: &Path) -> KpResult<Vec<OrderEntry>> {
    let invalid = |reason: String| KpError::InvalidOrderFile { path: path.display().to_string(), reason };
    let file = std::fs::File::open(path).map_err(|e| invalid(e.to_string()))?;
    let raw = read_capped(file, max_order_bytes()).map_err(invalid)?;
    let entries = parse_order_document(&raw).map_err(invalid)?;
    debug!(path = %path.display(), groups = entries.len(), "order file loaded");
    Ok(entries)
}

/// Read at most `max` bytes. Pipes and devices report no length up front,
/// so the cap is enforced on what is actually read.
fn read_capped<R: Read>(reader: R, max: u64) -> Result<String, String> {
    let mut buf = Vec::new();
    reader.take(max.saturating_add(1)).read_to_end(&mut buf).map_err(|e| e.to_string())?;
    if buf.len() as u64 > max {
        return Err(format!("file too large (>{} bytes)", max));
    }
    String::from_utf8(buf).map_err(|e| e.to_string())
}

/// Parse a YAML (or JSON) order document: either a bare list of groups or a
/// mapping with an `order` key.
pub fn parse_order_document(raw: &str) -> Result<Vec<OrderEntry>, String> {
    let doc: OrderDocument = serde_yaml::from_str(raw)
        .map_err(|_| "expected a list of {group: [...]} entries or a mapping with an `order` key".to_string())?;
    let entries = match doc {
        OrderDocument::List(entries) => entries,
        OrderDocument::Wrapped { order } => order,
    };
    for (i, entry) in entries.iter().enumerate() {
        if entry.group.is_empty() {
            return Err(format!("group {} has no buildpacks", i + 1));
        }
        if entry.group.iter().any(|bp| bp.id.trim().is_empty()) {
            return Err(format!("group {} has a buildpack without an id", i + 1));
        }
    }
    Ok(entries)
}

/// One group per selector, one buildpack per comma-separated token.
pub fn parse_selectors<S: AsRef<str>>(selectors: &[S]) -> KpResult<Vec<OrderEntry>> {
    selectors.iter().map(|s| parse_selector(s.as_ref())).collect()
}

pub fn parse_selector(selector: &str) -> KpResult<OrderEntry> {
    let group = selector
        .split(',')
        .map(|token| parse_token(selector, token))
        .collect::<KpResult<Vec<_>>>()?;
    Ok(OrderEntry { group })
}

fn parse_token(selector: &str, token: &str) -> KpResult<BuildpackRef> {
    let err = |reason: &str| KpError::InvalidSelectorSyntax { selector: selector.to_string(), reason: reason.to_string() };
    let token = token.trim();
    if token.is_empty() {
        return Err(err("empty buildpack token"));
    }
    match token.rsplit_once('@') {
        Some((id, version)) => {
            if id.is_empty() {
                return Err(err("missing buildpack id before '@'"));
            }
            if version.is_empty() {
                return Err(err("missing version after '@'"));
            }
            Ok(BuildpackRef::new(id, Some(version)))
        }
        None => Ok(BuildpackRef::new(token, None)),
    }
}
