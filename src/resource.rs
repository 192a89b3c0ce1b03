// src/resource.rs

//! Deployment package resources
//!
//! A deployment package holds two kinds of resources: bundles, which are
//! resolved from artifact coordinates and may have their manifest rewritten,
//! and processed resources, which are plain files handed to a resource
//! processor on the target. Both resolve to a [`PackageEntry`]: the path the
//! resource takes inside the package and the file providing its content.

use crate::bundle;
use crate::error::{Error, Result};
use crate::manifest::{HeaderOverride, ManifestDelta, MergeOptions};
use crate::workdir::WorkingDir;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("artifact {coordinates} not found at {}", .path.display())]
    ArtifactNotFound {
        coordinates: String,
        path: PathBuf,
    },

    #[error("resource file not found: {}", .0.display())]
    ResourceNotFound(PathBuf),

    #[error("cannot determine the local artifact repository (no home directory)")]
    NoRepository,
}

/// Default packaging type of an artifact
pub const DEFAULT_EXTENSION: &str = "jar";

fn default_extension() -> String {
    DEFAULT_EXTENSION.to_string()
}

/// Coordinates identifying a bundle artifact
///
/// Written in configuration as separate `group_id`, `artifact_id`,
/// `version`, `classifier` and `extension` keys, and displayed as
/// `group:artifact:version[:classifier]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "CoordinateFields")]
pub struct ArtifactCoordinates {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classifier: Option<String>,
    pub extension: String,
}

/// Unvalidated coordinate keys as they appear in a config file
#[derive(Deserialize)]
struct CoordinateFields {
    group_id: String,
    artifact_id: String,
    version: String,
    #[serde(default)]
    classifier: Option<String>,
    #[serde(default = "default_extension")]
    extension: String,
}

impl TryFrom<CoordinateFields> for ArtifactCoordinates {
    type Error = String;

    fn try_from(fields: CoordinateFields) -> std::result::Result<Self, Self::Error> {
        let required = [
            ("group_id", &fields.group_id),
            ("artifact_id", &fields.artifact_id),
            ("version", &fields.version),
            ("extension", &fields.extension),
        ];
        if let Some((key, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(format!("artifact coordinate {} is empty", key));
        }

        Ok(Self {
            group_id: fields.group_id,
            artifact_id: fields.artifact_id,
            version: fields.version,
            classifier: fields.classifier.filter(|c| !c.trim().is_empty()),
            extension: fields.extension,
        })
    }
}

impl ArtifactCoordinates {
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version: version.into(),
            classifier: None,
            extension: default_extension(),
        }
    }

    pub fn with_classifier(mut self, classifier: impl Into<String>) -> Self {
        self.classifier = Some(classifier.into());
        self
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    /// File name in the repository, e.g. `core-1.0.0-sources.jar`
    pub fn file_name(&self) -> String {
        match &self.classifier {
            Some(classifier) => format!(
                "{}-{}-{}.{}",
                self.artifact_id, self.version, classifier, self.extension
            ),
            None => format!("{}-{}.{}", self.artifact_id, self.version, self.extension),
        }
    }
}

impl fmt::Display for ArtifactCoordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group_id, self.artifact_id, self.version)?;
        if let Some(classifier) = &self.classifier {
            write!(f, ":{}", classifier)?;
        }
        Ok(())
    }
}

impl FromStr for ArtifactCoordinates {
    type Err = String;

    /// Parse `group:artifact:version[:classifier]`; the extension is `jar`
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').map(str::trim).collect();
        if parts.iter().any(|p| p.is_empty()) {
            return Err(format!("empty component in artifact coordinates: {}", s));
        }
        match parts.as_slice() {
            [group, artifact, version] => Ok(Self::new(*group, *artifact, *version)),
            [group, artifact, version, classifier] => {
                Ok(Self::new(*group, *artifact, *version).with_classifier(*classifier))
            }
            _ => Err(format!(
                "expected group:artifact:version[:classifier], got: {}",
                s
            )),
        }
    }
}

/// Maps artifact coordinates to files; supplied by the surrounding build
pub trait ArtifactResolver {
    fn resolve_artifact(&self, coordinates: &ArtifactCoordinates) -> std::result::Result<PathBuf, ResolveError>;
}

/// Resolver over an on-disk repository in the standard layout
/// (`group/as/path/artifact/version/file`)
#[derive(Debug, Clone)]
pub struct LocalRepository {
    root: PathBuf,
}

impl LocalRepository {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `~/.m2/repository`
    pub fn default_location() -> std::result::Result<Self, ResolveError> {
        let home = dirs::home_dir().ok_or(ResolveError::NoRepository)?;
        Ok(Self::new(home.join(".m2").join("repository")))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn artifact_path(&self, coordinates: &ArtifactCoordinates) -> PathBuf {
        let mut path = self.root.clone();
        for segment in coordinates.group_id.split('.') {
            path.push(segment);
        }
        path.push(&coordinates.artifact_id);
        path.push(&coordinates.version);
        path.push(coordinates.file_name());
        path
    }
}

impl ArtifactResolver for LocalRepository {
    fn resolve_artifact(&self, coordinates: &ArtifactCoordinates) -> std::result::Result<PathBuf, ResolveError> {
        let path = self.artifact_path(coordinates);
        if !path.is_file() {
            return Err(ResolveError::ArtifactNotFound {
                coordinates: coordinates.to_string(),
                path,
            });
        }
        debug!("Resolved {} to {}", coordinates, path.display());
        Ok(path)
    }
}

/// A bundle to include, with the manifest changes to apply to it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleResourceSpec {
    #[serde(flatten)]
    pub coordinates: ArtifactCoordinates,
    /// Directory inside the deployment package
    #[serde(default)]
    pub target_path: Option<String>,
    /// Applied in order; later entries for the same name win
    #[serde(default)]
    pub headers: Vec<HeaderOverride>,
    #[serde(default)]
    pub referred_packages: BTreeSet<String>,
    /// Bundle is a resource processor customizer
    #[serde(default)]
    pub customizer: bool,
    /// Bundle is listed but absent from a fix pack
    #[serde(default)]
    pub missing: bool,
}

impl BundleResourceSpec {
    pub fn new(coordinates: ArtifactCoordinates) -> Self {
        Self {
            coordinates,
            target_path: None,
            headers: Vec::new(),
            referred_packages: BTreeSet::new(),
            customizer: false,
            missing: false,
        }
    }

    pub fn delta(&self) -> ManifestDelta {
        ManifestDelta {
            overrides: self.headers.clone(),
            referred_packages: self.referred_packages.clone(),
        }
    }

    fn resolve(&self, ctx: &ResolveContext<'_>) -> Result<PackageEntry> {
        let resolved = ctx.resolver.resolve_artifact(&self.coordinates)?;
        let file_name = resolved
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.coordinates.file_name());

        let delta = self.delta();
        let (file, rewritten) = if delta.is_empty() {
            (resolved, false)
        } else {
            let destination = ctx
                .working_dir
                .allocate(&file_name)
                .map_err(|source| Error::WorkingDir {
                    path: ctx.working_dir.path().to_path_buf(),
                    source,
                })?;
            bundle::transform_bundle(&resolved, &destination, delta, ctx.merge)?;
            (destination, true)
        };

        Ok(PackageEntry {
            resource_id: resource_id(self.target_path.as_deref(), &file_name),
            file,
            kind: EntryKind::Bundle {
                customizer: self.customizer,
                missing: self.missing,
                rewritten,
            },
        })
    }
}

/// A plain file handed to a resource processor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedResourceSpec {
    /// Relative paths are resolved against the base directory
    pub file_path: PathBuf,
    #[serde(default)]
    pub target_path: Option<String>,
    #[serde(default)]
    pub processor: Option<String>,
}

impl ProcessedResourceSpec {
    fn resolve(&self, ctx: &ResolveContext<'_>) -> Result<PackageEntry> {
        let file = ctx.base_dir.join(&self.file_path);
        if !file.is_file() {
            return Err(ResolveError::ResourceNotFound(file).into());
        }
        let file_name = file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(PackageEntry {
            resource_id: resource_id(self.target_path.as_deref(), &file_name),
            file,
            kind: EntryKind::Processed {
                processor: self.processor.clone(),
            },
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ResourceSpec {
    Bundle(BundleResourceSpec),
    Processed(ProcessedResourceSpec),
}

impl ResourceSpec {
    pub fn is_bundle(&self) -> bool {
        matches!(self, Self::Bundle(_))
    }

    /// Copy of this spec with deployment-level headers appended
    ///
    /// Appended headers come after the bundle's own, so they win for the
    /// same header name. Processed resources are returned unchanged.
    pub fn with_headers(&self, headers: &[HeaderOverride]) -> Self {
        match self {
            Self::Bundle(spec) => {
                let mut spec = spec.clone();
                spec.headers.extend(headers.iter().cloned());
                Self::Bundle(spec)
            }
            Self::Processed(_) => self.clone(),
        }
    }

    pub fn resolve(&self, ctx: &ResolveContext<'_>) -> Result<PackageEntry> {
        let entry = match self {
            Self::Bundle(spec) => spec.resolve(ctx)?,
            Self::Processed(spec) => spec.resolve(ctx)?,
        };
        info!("Resource {} -> {}", entry.resource_id, entry.file.display());
        Ok(entry)
    }
}

/// Collaborators and settings needed to resolve resources
pub struct ResolveContext<'a> {
    pub base_dir: &'a Path,
    pub working_dir: &'a WorkingDir,
    pub resolver: &'a dyn ArtifactResolver,
    pub merge: &'a MergeOptions,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryKind {
    Bundle {
        customizer: bool,
        missing: bool,
        /// The file is a rewritten copy in the working directory
        rewritten: bool,
    },
    Processed {
        processor: Option<String>,
    },
}

/// A resolved resource ready to be added to a deployment package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageEntry {
    /// Path of the resource inside the deployment package
    pub resource_id: String,
    pub file: PathBuf,
    pub kind: EntryKind,
}

fn resource_id(target_path: Option<&str>, file_name: &str) -> String {
    match target_path.map(|t| t.trim_end_matches('/')) {
        Some(target) if !target.is_empty() => format!("{}/{}", target, file_name),
        _ => file_name.to_string(),
    }
}
