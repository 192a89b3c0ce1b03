// build.rs

use clap::{Arg, ArgAction, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

/// Common argument: bundle path
fn bundle_arg(help: &'static str) -> Arg {
    Arg::new("bundle").required(true).value_name("BUNDLE").help(help)
}

fn build_cli() -> Command {
    Command::new("deploypack")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Deploypack Contributors")
        .about("Prepare OSGi bundles for deployment packages")
        .subcommand_required(true)
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::SetTrue)
                .global(true)
                .help("Enable debug logging (overridden by RUST_LOG)"),
        )
        .subcommand(
            Command::new("rewrite")
                .about("Add headers and imports to one bundle's manifest")
                .arg(bundle_arg("Source bundle (jar)"))
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .required(true)
                        .help("Output bundle path"),
                )
                .arg(
                    Arg::new("header")
                        .short('H')
                        .long("header")
                        .value_name("NAME: VALUE")
                        .action(ArgAction::Append)
                        .help("Header to set, as \"Name: value\" (repeatable, later wins)"),
                )
                .arg(
                    Arg::new("import")
                        .short('i')
                        .long("import")
                        .value_name("PACKAGE")
                        .action(ArgAction::Append)
                        .help("Package to add to Import-Package (repeatable)"),
                )
                .arg(
                    Arg::new("insert_if_absent")
                        .long("insert-if-absent")
                        .action(ArgAction::SetTrue)
                        .help("Keep existing Import-Package clauses for referred packages"),
                ),
        )
        .subcommand(
            Command::new("prepare")
                .about("Resolve all resources named in a packaging config")
                .arg(
                    Arg::new("config")
                        .required(true)
                        .help("Path to deploypack.toml"),
                ),
        )
        .subcommand(
            Command::new("imports")
                .about("Show the Import-Package clauses of a bundle")
                .arg(bundle_arg("Bundle (jar) to inspect")),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Create man directory - use CARGO_MANIFEST_DIR which is always set by cargo
    let manifest_dir = match env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(e) => {
            println!("cargo:warning=CARGO_MANIFEST_DIR not set: {}", e);
            return;
        }
    };
    let man_dir = manifest_dir.join("man");

    if let Err(e) = fs::create_dir_all(&man_dir) {
        println!("cargo:warning=Failed to create man directory: {}", e);
        return;
    }

    let man = Man::new(build_cli());
    let mut buffer = Vec::new();

    if let Err(e) = man.render(&mut buffer) {
        println!("cargo:warning=Failed to render man page: {}", e);
        return;
    }

    let man_path = man_dir.join("deploypack.1");
    if let Err(e) = fs::write(&man_path, buffer) {
        println!("cargo:warning=Failed to write man page: {}", e);
    }
}
