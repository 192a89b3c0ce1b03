// tests/common/mod.rs

//! Shared test utilities and helpers for integration tests.

#![allow(dead_code)]

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

pub const BUNDLE_MANIFEST: &str = "Manifest-Version: 1.0\r\n\
Bundle-ManifestVersion: 2\r\n\
Bundle-SymbolicName: org.example.core\r\n\
Bundle-Version: 1.0.0\r\n\
Import-Package: org.osgi.framework;version=\"[1.5,2)\",org.slf4j;resolu\r\n tion:=optional;version=1.7\r\n\
\r\n";

/// Write a bundle with a manifest, a stored entry, a directory and a
/// deflated class file.
pub fn write_bundle(path: &Path, manifest: &str) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    let mut writer = ZipWriter::new(File::create(path).unwrap());
    writer
        .start_file("META-INF/MANIFEST.MF", SimpleFileOptions::default())
        .unwrap();
    writer.write_all(manifest.as_bytes()).unwrap();

    writer
        .start_file(
            "a.txt",
            SimpleFileOptions::default().compression_method(CompressionMethod::Stored),
        )
        .unwrap();
    writer.write_all(b"plain text entry").unwrap();

    writer.add_directory("b/", SimpleFileOptions::default()).unwrap();
    writer
        .start_file("b/c.txt", SimpleFileOptions::default())
        .unwrap();
    writer.write_all(&sample_payload()).unwrap();
    writer.finish().unwrap();
}

/// Compressible payload large enough to span several deflate blocks
pub fn sample_payload() -> Vec<u8> {
    (0..64 * 1024u32).map(|i| (i % 251) as u8).collect()
}

pub fn read_entry(archive: &Path, name: &str) -> Vec<u8> {
    let mut zip = ZipArchive::new(File::open(archive).unwrap()).unwrap();
    let mut entry = zip.by_name(name).unwrap();
    let mut content = Vec::new();
    entry.read_to_end(&mut content).unwrap();
    content
}
