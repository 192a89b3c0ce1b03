// src/archive.rs

//! Bundle archive rewriting
//!
//! A bundle is a ZIP (JAR) archive. Rewriting replaces its manifest and
//! copies every other entry by decompressing and recompressing it. Raw
//! compressed blocks are never copied: compressors differ between tools and a
//! copied block can disagree with the compressed size recorded for it.
//!
//! Output is staged in a temporary file next to the destination and renamed
//! into place only after the archive has been completely written and synced,
//! so a failed rewrite never leaves a partial archive at the destination.

use crate::manifest::MANIFEST_PATH;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("{} has no META-INF/MANIFEST.MF entry", .archive.display())]
    MissingManifest { archive: PathBuf },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid archive {}: {source}", .path.display())]
    Zip {
        path: PathBuf,
        #[source]
        source: ZipError,
    },
}

impl ArchiveError {
    fn io(path: &Path) -> impl FnOnce(io::Error) -> Self + '_ {
        move |source| Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    fn zip(path: &Path) -> impl FnOnce(ZipError) -> Self + '_ {
        move |source| Self::Zip {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Outcome of a successful rewrite
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewriteSummary {
    /// Entries copied from the source, excluding the manifest
    pub copied_entries: usize,
    pub manifest_bytes: usize,
}

fn open_archive(path: &Path) -> Result<ZipArchive<File>, ArchiveError> {
    let file = File::open(path).map_err(ArchiveError::io(path))?;
    ZipArchive::new(file).map_err(ArchiveError::zip(path))
}

/// Upper bound on the buffer reserved up front for a manifest
const MANIFEST_RESERVE_LIMIT: usize = 64 * 1024;

// The declared size comes from the archive and is not trusted
fn initial_capacity(declared: u64) -> usize {
    usize::try_from(declared)
        .unwrap_or(usize::MAX)
        .min(MANIFEST_RESERVE_LIMIT)
}

/// Read the raw manifest entry of an archive
pub fn read_manifest(archive: &Path) -> Result<Vec<u8>, ArchiveError> {
    let mut zip = open_archive(archive)?;
    let mut entry = match zip.by_name(MANIFEST_PATH) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) => {
            return Err(ArchiveError::MissingManifest {
                archive: archive.to_path_buf(),
            });
        }
        Err(e) => return Err(ArchiveError::zip(archive)(e)),
    };

    let mut content = Vec::with_capacity(initial_capacity(entry.size()));
    entry
        .read_to_end(&mut content)
        .map_err(ArchiveError::io(archive))?;
    Ok(content)
}

/// Names of all entries, in archive order
pub fn entry_names(archive: &Path) -> Result<Vec<String>, ArchiveError> {
    let mut zip = open_archive(archive)?;
    (0..zip.len())
        .map(|index| {
            zip.by_index_raw(index)
                .map(|entry| entry.name().to_string())
                .map_err(ArchiveError::zip(archive))
        })
        .collect()
}

/// Write `destination` as a copy of `source` with its manifest replaced
///
/// The new manifest is the first entry. All other entries follow in source
/// order with identical names and content. The source is only read.
pub fn rewrite_archive(
    source: &Path,
    manifest: &[u8],
    destination: &Path,
) -> Result<RewriteSummary, ArchiveError> {
    let mut zip = open_archive(source)?;
    if !zip.file_names().any(|name| name == MANIFEST_PATH) {
        return Err(ArchiveError::MissingManifest {
            archive: source.to_path_buf(),
        });
    }

    let staging_dir = match destination.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut staged = tempfile::Builder::new()
        .prefix(".deploypack-")
        .suffix(".tmp")
        .tempfile_in(staging_dir)
        .map_err(ArchiveError::io(staging_dir))?;

    let copied_entries = {
        let mut writer = ZipWriter::new(staged.as_file_mut());

        writer
            .start_file(MANIFEST_PATH, SimpleFileOptions::default())
            .map_err(ArchiveError::zip(destination))?;
        writer
            .write_all(manifest)
            .map_err(ArchiveError::io(destination))?;

        let mut copied = 0;
        for index in 0..zip.len() {
            let mut entry = zip.by_index(index).map_err(ArchiveError::zip(source))?;
            let name = entry.name().to_string();
            if name == MANIFEST_PATH {
                continue;
            }

            let method = match entry.compression() {
                CompressionMethod::Stored => CompressionMethod::Stored,
                _ => CompressionMethod::Deflated,
            };
            let mut options = SimpleFileOptions::default()
                .compression_method(method)
                .large_file(entry.size() >= u64::from(u32::MAX));
            if let Some(mode) = entry.unix_mode() {
                options = options.unix_permissions(mode);
            }

            if entry.is_dir() {
                writer
                    .add_directory(name.as_str(), options)
                    .map_err(ArchiveError::zip(destination))?;
            } else {
                writer
                    .start_file(name.as_str(), options)
                    .map_err(ArchiveError::zip(destination))?;
                let bytes = io::copy(&mut entry, &mut writer).map_err(ArchiveError::io(source))?;
                debug!("Copied {} ({} bytes)", name, bytes);
            }
            copied += 1;
        }

        writer.finish().map_err(ArchiveError::zip(destination))?;
        copied
    };

    staged
        .as_file()
        .sync_all()
        .map_err(ArchiveError::io(destination))?;
    staged.persist(destination).map_err(|e| ArchiveError::Io {
        path: destination.to_path_buf(),
        source: e.error,
    })?;

    info!(
        "Rewrote {} -> {} ({} entries)",
        source.display(),
        destination.display(),
        copied_entries + 1
    );
    Ok(RewriteSummary {
        copied_entries,
        manifest_bytes: manifest.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
        let file = File::create(path).unwrap();
        let mut writer = ZipWriter::new(file);
        for (name, content) in entries {
            if name.ends_with('/') {
                writer.add_directory(*name, SimpleFileOptions::default()).unwrap();
            } else {
                writer.start_file(*name, SimpleFileOptions::default()).unwrap();
                writer.write_all(content).unwrap();
            }
        }
        writer.finish().unwrap();
    }

    fn read_entry(path: &Path, name: &str) -> Vec<u8> {
        let mut zip = ZipArchive::new(File::open(path).unwrap()).unwrap();
        let mut entry = zip.by_name(name).unwrap();
        let mut content = Vec::new();
        entry.read_to_end(&mut content).unwrap();
        content
    }

    #[test]
    fn test_rewrite_replaces_manifest_only() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("source.jar");
        let output = dir.path().join("output.jar");
        write_zip(
            &source,
            &[
                ("META-INF/MANIFEST.MF", b"Manifest-Version: 1.0\r\n\r\n"),
                ("a.txt", b"alpha"),
                ("b/", b""),
                ("b/c.txt", b"see"),
            ],
        );

        let summary = rewrite_archive(&source, b"NEW", &output).unwrap();
        assert_eq!(summary.copied_entries, 3);
        assert_eq!(summary.manifest_bytes, 3);

        let names = entry_names(&output).unwrap();
        assert_eq!(names[0], MANIFEST_PATH);
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(sorted, vec!["META-INF/MANIFEST.MF", "a.txt", "b/", "b/c.txt"]);

        assert_eq!(read_entry(&output, MANIFEST_PATH), b"NEW");
        assert_eq!(read_entry(&output, "a.txt"), b"alpha");
        assert_eq!(read_entry(&output, "b/c.txt"), b"see");
        // Source untouched
        assert_eq!(read_entry(&source, MANIFEST_PATH), b"Manifest-Version: 1.0\r\n\r\n");
    }

    #[test]
    fn test_manifest_moved_to_front() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("source.jar");
        let output = dir.path().join("output.jar");
        write_zip(
            &source,
            &[("z.txt", b"z"), ("META-INF/MANIFEST.MF", b"old"), ("y.txt", b"y")],
        );

        rewrite_archive(&source, b"new", &output).unwrap();
        assert_eq!(
            entry_names(&output).unwrap(),
            vec!["META-INF/MANIFEST.MF", "z.txt", "y.txt"]
        );
    }

    #[test]
    fn test_missing_manifest() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("plain.zip");
        let output = dir.path().join("output.jar");
        write_zip(&source, &[("meta-inf/manifest.mf", b"lowercase"), ("a.txt", b"a")]);

        let err = rewrite_archive(&source, b"M", &output).unwrap_err();
        assert!(matches!(err, ArchiveError::MissingManifest { .. }));
        assert!(!output.exists());

        let err = read_manifest(&source).unwrap_err();
        assert!(matches!(err, ArchiveError::MissingManifest { .. }));
    }

    #[test]
    fn test_failed_rewrite_leaves_no_output() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("broken.jar");
        std::fs::write(&source, b"this is not a zip archive").unwrap();
        let output = dir.path().join("output.jar");

        let err = rewrite_archive(&source, b"M", &output).unwrap_err();
        assert!(matches!(err, ArchiveError::Zip { .. }));
        assert!(!output.exists());

        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(leftovers.len(), 1);
    }

    #[test]
    fn test_existing_output_replaced() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("source.jar");
        let output = dir.path().join("output.jar");
        write_zip(&source, &[("META-INF/MANIFEST.MF", b"old"), ("a.txt", b"a")]);
        std::fs::write(&output, b"stale").unwrap();

        rewrite_archive(&source, b"fresh", &output).unwrap();
        assert_eq!(read_entry(&output, MANIFEST_PATH), b"fresh");
    }

    #[test]
    fn test_declared_size_does_not_drive_allocation() {
        assert_eq!(initial_capacity(0), 0);
        assert_eq!(initial_capacity(512), 512);
        assert_eq!(initial_capacity(u64::from(u32::MAX)), MANIFEST_RESERVE_LIMIT);
        assert_eq!(initial_capacity(u64::MAX), MANIFEST_RESERVE_LIMIT);
    }

    #[test]
    fn test_read_manifest() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("source.jar");
        write_zip(&source, &[("META-INF/MANIFEST.MF", b"content")]);
        assert_eq!(read_manifest(&source).unwrap(), b"content");
    }

    #[test]
    fn test_missing_source_is_io_error() {
        let dir = TempDir::new().unwrap();
        let err = read_manifest(&dir.path().join("absent.jar")).unwrap_err();
        assert!(matches!(err, ArchiveError::Io { .. }));
    }
}
