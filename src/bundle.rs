// src/bundle.rs

//! Bundle transformation: manifest merge plus archive rewrite

use crate::archive::{self, RewriteSummary};
use crate::error::{Error, Result};
use crate::manifest::{Manifest, ManifestDelta, MergeOptions};
use std::path::Path;
use tracing::info;

/// Read and parse the manifest of a bundle archive
pub fn read_bundle_manifest(bundle: &Path) -> Result<Manifest> {
    let raw = archive::read_manifest(bundle)?;
    Manifest::parse(&raw).map_err(|source| Error::Manifest {
        bundle: bundle.to_path_buf(),
        source,
    })
}

/// Apply `delta` to the manifest of `source` and write the result to
/// `destination`
///
/// Every other entry of the bundle is carried over unchanged. Nothing is
/// written to `destination` unless the whole transformation succeeds.
pub fn transform_bundle(
    source: &Path,
    destination: &Path,
    delta: ManifestDelta,
    options: &MergeOptions,
) -> Result<RewriteSummary> {
    let mut manifest = read_bundle_manifest(source)?;

    let overrides = delta.overrides.len();
    let referred = delta.referred_packages.len();
    delta
        .apply(manifest.main_mut(), options)
        .map_err(|source_err| Error::Header {
            bundle: source.to_path_buf(),
            source: source_err,
        })?;

    let bytes = manifest.to_bytes().map_err(|source_err| Error::Manifest {
        bundle: source.to_path_buf(),
        source: source_err,
    })?;
    let summary = archive::rewrite_archive(source, &bytes, destination)?;

    info!(
        "Transformed bundle {} ({} headers, {} referred packages, policy {})",
        source.display(),
        overrides,
        referred,
        options.import_policy
    );
    Ok(summary)
}
