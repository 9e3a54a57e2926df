use std::path::Path;

use anyhow::{Context, Result};
use image::GrayImage;
use imageproc::template_matching::{MatchTemplateMethod, match_template};

/// Minimum peak normalized cross-correlation score for a candidate to be kept.
pub const MATCH_THRESHOLD: f32 = 0.9;

/// Reference sub-image, decoded once at startup and shared read-only by every
/// match call.
pub struct Reference {
    gray: GrayImage,
}

impl Reference {
    /// Decode failure here is fatal to the whole run; there is nothing to
    /// search with.
    pub fn load(path: &str) -> Result<Self> {
        let img = image::open(path).with_context(|| format!("failed to load reference image {path}"))?;
        Ok(Self {
            gray: img.to_luma8(),
        })
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.gray.dimensions()
    }
}

/// Score a downloaded candidate against the reference and decide its fate:
/// at or above the threshold the file stays on disk and `true` is returned,
/// below it the file is deleted. Undecodable or too-small candidates count
/// as rejects. Never aborts the run.
pub fn matches(reference: &Reference, candidate: &Path) -> bool {
    let img = match image::open(candidate) {
        Ok(img) => img,
        Err(e) => {
            tracing::warn!("unable to decode {}: {e}", candidate.display());
            discard(candidate);
            return false;
        }
    };

    let gray = img.to_luma8();

    // The reference is expected to be a crop of the candidate; a candidate
    // smaller than the reference cannot contain it.
    let (rw, rh) = reference.gray.dimensions();
    if rw > gray.width() || rh > gray.height() {
        tracing::debug!(
            "candidate {} ({}x{}) smaller than reference ({rw}x{rh})",
            candidate.display(),
            gray.width(),
            gray.height(),
        );
        discard(candidate);
        return false;
    }

    let scores = match_template(
        &gray,
        &reference.gray,
        MatchTemplateMethod::CrossCorrelationNormalized,
    );

    // Peak score over all placements of the reference within the candidate.
    let best = scores
        .pixels()
        .map(|p| p.0[0])
        .fold(f32::NEG_INFINITY, f32::max);

    if best >= MATCH_THRESHOLD {
        tracing::info!("found an image! saved as {}", candidate.display());
        true
    } else {
        tracing::debug!("score {best:.4} below threshold for {}", candidate.display());
        discard(candidate);
        false
    }
}

fn discard(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        tracing::warn!("failed to remove {}: {e}", path.display());
    }
}
