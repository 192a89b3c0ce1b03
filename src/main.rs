// src/main.rs

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use deploypack::{
    EntryKind, Header, ImportPolicy, LocalRepository, ManifestDelta, MergeOptions,
    PackagingConfig, WorkingDir, IMPORT_PACKAGE,
};
use std::path::Path;
use tracing::info;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing subscriber for logging
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Rewrite {
            bundle,
            output,
            headers,
            imports,
            insert_if_absent,
        } => {
            let policy = if insert_if_absent {
                ImportPolicy::InsertIfAbsent
            } else {
                ImportPolicy::Overwrite
            };
            let delta = ManifestDelta {
                overrides: headers,
                referred_packages: imports.into_iter().collect(),
            };
            let summary = deploypack::transform_bundle(
                &bundle,
                &output,
                delta,
                &MergeOptions::default().with_policy(policy),
            )
            .with_context(|| format!("Failed to rewrite {}", bundle.display()))?;
            println!(
                "Wrote {} ({} entries + manifest)",
                output.display(),
                summary.copied_entries
            );
            Ok(())
        }
        Commands::Prepare { config } => cmd_prepare(&config),
        Commands::Imports { bundle } => cmd_imports(&bundle),
    }
}

fn cmd_prepare(config_path: &Path) -> Result<()> {
    let config = PackagingConfig::load(config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;

    let repository = match &config.local_repository {
        Some(root) => LocalRepository::new(root),
        None => LocalRepository::default_location()?,
    };
    info!("Using artifact repository {}", repository.root().display());

    let working_dir = match &config.working_dir {
        Some(path) => WorkingDir::new(path)
            .with_context(|| format!("Failed to create working directory {}", path.display()))?,
        None => WorkingDir::temporary()?,
    };

    let entries = deploypack::package::prepare(&config, &repository, &working_dir)?;
    for entry in &entries {
        let marker = match &entry.kind {
            EntryKind::Bundle { rewritten: true, .. } => "bundle*",
            EntryKind::Bundle { .. } => "bundle",
            EntryKind::Processed { .. } => "resource",
        };
        println!("{:<9} {}  {}", marker, entry.resource_id, entry.file.display());
    }
    Ok(())
}

fn cmd_imports(bundle: &Path) -> Result<()> {
    let manifest = deploypack::read_bundle_manifest(bundle)?;
    let Some(value) = manifest.main().get(IMPORT_PACKAGE) else {
        println!("{} has no Import-Package header", bundle.display());
        return Ok(());
    };

    let imports = Header::parse(value)
        .with_context(|| format!("Invalid Import-Package in {}", bundle.display()))?;
    for (name, params) in imports.iter() {
        let params = params.borrow();
        if params.is_empty() {
            println!("{}", name);
        } else {
            let rendered: Vec<String> = params.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
            println!("{}  {}", name, rendered.join("; "));
        }
    }
    Ok(())
}
