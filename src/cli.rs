// src/cli.rs

//! Command-line definitions

use clap::{Parser, Subcommand};
use deploypack::HeaderOverride;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "deploypack")]
#[command(author, version, about = "Prepare OSGi bundles for deployment packages", long_about = None)]
pub struct Cli {
    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Add headers and imports to one bundle's manifest
    Rewrite {
        /// Source bundle (jar)
        bundle: PathBuf,

        /// Output bundle path
        #[arg(short, long)]
        output: PathBuf,

        /// Header to set, as "Name: value" (repeatable, later wins)
        #[arg(short = 'H', long = "header", value_name = "NAME: VALUE")]
        headers: Vec<HeaderOverride>,

        /// Package to add to Import-Package (repeatable)
        #[arg(short, long = "import", value_name = "PACKAGE")]
        imports: Vec<String>,

        /// Keep existing Import-Package clauses for referred packages
        #[arg(long)]
        insert_if_absent: bool,
    },

    /// Resolve all resources named in a packaging config
    Prepare {
        /// Path to deploypack.toml
        config: PathBuf,
    },

    /// Show the Import-Package clauses of a bundle
    Imports {
        /// Bundle (jar) to inspect
        bundle: PathBuf,
    },
}
