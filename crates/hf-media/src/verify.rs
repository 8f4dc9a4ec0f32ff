//! Whole-artifact verification of a published master playlist.

use std::path::Path;

use hf_core::{Error, Result};

use crate::alignment::{check_alignment, AlignmentReport};
use crate::hls::{parse_master_playlist, parse_media_playlist, MasterPlaylist, MediaPlaylist};
use crate::paths::{check_references, UnresolvedReference};

/// Result of [`verify_master`].
#[derive(Debug, Clone)]
pub struct VerifyReport {
    pub master: MasterPlaylist,
    pub variants: Vec<MediaPlaylist>,
    pub unresolved: Vec<UnresolvedReference>,
    /// Alignment across the variants that could be read.
    pub alignment: std::result::Result<AlignmentReport, String>,
}

impl VerifyReport {
    pub fn is_ok(&self) -> bool {
        self.unresolved.is_empty() && self.alignment.is_ok()
    }

    /// Turn a failed report into the matching error: unresolved references
    /// first, then misalignment.
    pub fn into_result(self) -> Result<Self> {
        if let Some(bad) = self.unresolved.first() {
            return Err(bad.clone().into());
        }
        if let Err(msg) = &self.alignment {
            return Err(Error::Alignment(msg.clone()));
        }
        Ok(self)
    }
}

/// Parse `master`, resolve every reference below it, and compare segment
/// boundaries across its variants.
///
/// Parse failures of the master itself are errors; unreadable variants show
/// up as unresolved references instead.
pub fn verify_master(master_path: &Path, tolerance: f64) -> Result<VerifyReport> {
    let text = std::fs::read_to_string(master_path).map_err(|e| {
        Error::Input(format!("cannot read {}: {e}", master_path.display()))
    })?;
    let master = parse_master_playlist(&text)?;
    let unresolved = check_references(master_path)?;

    let dir = master_path.parent().unwrap_or_else(|| Path::new("."));
    let mut variants = Vec::with_capacity(master.variants.len());
    for variant in &master.variants {
        let path = dir.join(&variant.uri);
        if !path.is_file() {
            continue;
        }
        let body = std::fs::read_to_string(&path)?;
        variants.push(parse_media_playlist(&body)?);
    }

    let alignment = check_alignment(&variants, tolerance).map_err(|e| match e {
        Error::Alignment(msg) => msg,
        other => other.to_string(),
    });

    Ok(VerifyReport {
        master,
        variants,
        unresolved,
        alignment,
    })
}
