// src/config.rs

//! Packaging configuration (`deploypack.toml`)
//!
//! ```toml
//! base_dir = "."
//! working_dir = "target/dp-work"
//! import_policy = "insert-if-absent"
//!
//! [[headers]]
//! name = "Bundle-Vendor"
//! value = "Acme"
//!
//! [[resources]]
//! type = "bundle"
//! group_id = "org.example"
//! artifact_id = "core"
//! version = "1.0.0"
//! target_path = "bundles"
//! referred_packages = ["org.example.api"]
//!
//! [[resources]]
//! type = "processed"
//! file_path = "conf/app.cfg"
//! processor = "org.osgi.deployment.rpautoconf"
//! ```

use crate::header::RESOLUTION_DIRECTIVE;
use crate::manifest::{HeaderOverride, ImportPolicy, MergeOptions};
use crate::resource::ResourceSpec;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

fn default_allowed_directives() -> Vec<String> {
    vec![RESOLUTION_DIRECTIVE.to_string()]
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackagingConfig {
    /// Base for relative processed-resource paths
    #[serde(default)]
    pub base_dir: Option<PathBuf>,

    /// A temporary directory is used when absent
    #[serde(default)]
    pub working_dir: Option<PathBuf>,

    /// Defaults to `~/.m2/repository`
    #[serde(default)]
    pub local_repository: Option<PathBuf>,

    #[serde(default)]
    pub import_policy: ImportPolicy,

    /// Directives kept when `Import-Package` is rewritten
    #[serde(default = "default_allowed_directives")]
    pub allowed_directives: Vec<String>,

    /// Headers added to every bundle, after the bundle's own headers
    #[serde(default)]
    pub headers: Vec<HeaderOverride>,

    #[serde(default)]
    pub resources: Vec<ResourceSpec>,
}

impl Default for PackagingConfig {
    fn default() -> Self {
        Self {
            base_dir: None,
            working_dir: None,
            local_repository: None,
            import_policy: ImportPolicy::default(),
            allowed_directives: default_allowed_directives(),
            headers: Vec::new(),
            resources: Vec::new(),
        }
    }
}

impl PackagingConfig {
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Load a config file; relative paths in it are taken relative to the
    /// file's directory
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml(&text)?;

        let root = path.parent().unwrap_or(Path::new(""));
        config.base_dir = Some(root.join(config.base_dir.as_deref().unwrap_or(Path::new(""))));
        config.working_dir = config.working_dir.map(|dir| root.join(dir));
        config.local_repository = config.local_repository.map(|repo| root.join(repo));

        debug!(
            "Loaded {} with {} resources and {} deployment headers",
            path.display(),
            config.resources.len(),
            config.headers.len()
        );
        Ok(config)
    }

    pub fn base_dir(&self) -> &Path {
        self.base_dir.as_deref().unwrap_or(Path::new("."))
    }

    pub fn merge_options(&self) -> MergeOptions {
        MergeOptions {
            import_policy: self.import_policy,
            allowed_directives: self.allowed_directives.clone(),
        }
    }
}
