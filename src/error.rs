// src/error.rs

//! Crate-level error type

use crate::archive::ArchiveError;
use crate::config::ConfigError;
use crate::header::HeaderError;
use crate::manifest::ManifestError;
use crate::resource::ResolveError;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid header in bundle {}: {source}", .bundle.display())]
    Header {
        bundle: PathBuf,
        #[source]
        source: HeaderError,
    },

    #[error("invalid manifest in bundle {}: {source}", .bundle.display())]
    Manifest {
        bundle: PathBuf,
        #[source]
        source: ManifestError,
    },

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("duplicate resource id in deployment package: {0}")]
    DuplicateResource(String),

    #[error("cannot allocate a file in working directory {}: {source}", .path.display())]
    WorkingDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
