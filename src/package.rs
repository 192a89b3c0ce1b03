// src/package.rs

//! Resolving the resources of a deployment package
//!
//! Bundles are resolved first, in declaration order, followed by processed
//! resources. Deployment-level headers are appended to every bundle.

use crate::config::PackagingConfig;
use crate::error::{Error, Result};
use crate::resource::{ArtifactResolver, PackageEntry, ResolveContext};
use crate::workdir::WorkingDir;
use std::collections::HashSet;
use tracing::info;

/// Resolve every resource named by `config`
///
/// Bundles with header changes or referred packages are rewritten into
/// `working_dir`; all others are used in place.
pub fn prepare(
    config: &PackagingConfig,
    resolver: &dyn ArtifactResolver,
    working_dir: &WorkingDir,
) -> Result<Vec<PackageEntry>> {
    let merge = config.merge_options();
    let ctx = ResolveContext {
        base_dir: config.base_dir(),
        working_dir,
        resolver,
        merge: &merge,
    };

    let bundles = config.resources.iter().filter(|r| r.is_bundle());
    let processed = config.resources.iter().filter(|r| !r.is_bundle());

    let mut seen = HashSet::new();
    let mut entries = Vec::with_capacity(config.resources.len());
    for spec in bundles.chain(processed) {
        let entry = spec.with_headers(&config.headers).resolve(&ctx)?;
        if !seen.insert(entry.resource_id.clone()) {
            return Err(Error::DuplicateResource(entry.resource_id));
        }
        entries.push(entry);
    }

    info!(
        "Prepared {} resources in {}",
        entries.len(),
        working_dir.path().display()
    );
    Ok(entries)
}
