// src/lib.rs

//! Deploypack: OSGi deployment package tooling
//!
//! Prepares bundles for inclusion in an OSGi deployment package by adding
//! manifest headers and merging referred packages into `Import-Package`,
//! rewriting each bundle archive without disturbing its other entries.
//!
//! # Architecture
//!
//! - `header`: quote-aware tokenizer and the OSGi clause grammar
//! - `manifest`: JAR manifest codec and the header/import merger
//! - `archive`: ZIP rewriting with atomic output
//! - `bundle`: the per-bundle pipeline (read, merge, rewrite)
//! - `resource`, `package`, `config`: resolving the resources named by a
//!   packaging configuration

pub mod archive;
pub mod bundle;
pub mod config;
mod error;
pub mod header;
pub mod manifest;
pub mod package;
pub mod resource;
pub mod workdir;

pub use archive::{rewrite_archive, ArchiveError, RewriteSummary};
pub use bundle::{read_bundle_manifest, transform_bundle};
pub use config::{ConfigError, PackagingConfig};
pub use error::{Error, Result};
pub use header::{ClauseGrammarError, Header, HeaderError, Parameters, QuotedTokenizer, TokenizeError};
pub use manifest::{
    HeaderOverride, ImportPolicy, Manifest, ManifestDelta, ManifestError, MergeOptions,
    IMPORT_PACKAGE, MANIFEST_PATH,
};
pub use resource::{
    ArtifactCoordinates, ArtifactResolver, BundleResourceSpec, EntryKind, LocalRepository,
    PackageEntry, ProcessedResourceSpec, ResolveContext, ResolveError, ResourceSpec,
};
pub use workdir::WorkingDir;
