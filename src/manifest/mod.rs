// src/manifest/mod.rs

//! JAR manifest (`META-INF/MANIFEST.MF`) reading and writing
//!
//! A manifest is a main section followed by zero or more named sections.
//! Each header is a `Name: value` line; values longer than 72 bytes are
//! folded onto continuation lines that begin with a single space. Sections
//! are separated by blank lines and every non-main section begins with a
//! `Name:` header.

pub mod merge;

pub use merge::{HeaderOverride, ImportPolicy, ManifestDelta, MergeOptions};

use thiserror::Error;

/// Fixed, case-sensitive path of the manifest inside a bundle archive
pub const MANIFEST_PATH: &str = "META-INF/MANIFEST.MF";

pub const MANIFEST_VERSION: &str = "Manifest-Version";
pub const IMPORT_PACKAGE: &str = "Import-Package";

/// Maximum line length in bytes, excluding the line terminator
const MAX_LINE_BYTES: usize = 72;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ManifestError {
    #[error("manifest is not valid UTF-8")]
    InvalidUtf8,

    #[error("malformed manifest header at line {line}: {text}")]
    MalformedHeader { line: usize, text: String },

    #[error("continuation line {line} has no header to continue")]
    DanglingContinuation { line: usize },

    #[error("section starting at line {line} does not begin with a Name header")]
    MissingSectionName { line: usize },

    #[error("value of header {name} contains a line break")]
    InvalidValue { name: String },
}

/// Ordered headers of one manifest section
///
/// Names compare ASCII case-insensitively. Replacing a header keeps its
/// original position and spelling.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes {
    entries: Vec<(String, String)>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.position(name).map(|i| self.entries[i].1.as_str())
    }

    /// Set a header value, returning the value it replaced
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let name = name.into();
        let value = value.into();
        match self.position(&name) {
            Some(i) => Some(std::mem::replace(&mut self.entries[i].1, value)),
            None => {
                self.entries.push((name, value));
                None
            }
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.position(name).map(|i| self.entries.remove(i).1)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(k, _)| k.eq_ignore_ascii_case(name))
    }
}

/// A named per-entry section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub name: String,
    pub attributes: Attributes,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    main: Attributes,
    sections: Vec<Section>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse manifest bytes
    ///
    /// Accepts CRLF, LF or CR line endings and a final line without a
    /// terminator.
    pub fn parse(bytes: &[u8]) -> Result<Self, ManifestError> {
        let text = std::str::from_utf8(bytes).map_err(|_| ManifestError::InvalidUtf8)?;
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);

        let mut parser = SectionParser::default();
        for (index, line) in split_lines(text).into_iter().enumerate() {
            let line_no = index + 1;

            if let Some(rest) = line.strip_prefix(' ') {
                let (_, value) = parser
                    .pending
                    .as_mut()
                    .ok_or(ManifestError::DanglingContinuation { line: line_no })?;
                value.push_str(rest);
                continue;
            }

            parser.flush_pending()?;

            if line.is_empty() {
                parser.end_section();
                continue;
            }

            let (name, value) = line
                .split_once(':')
                .filter(|(name, _)| is_valid_name(name))
                .ok_or_else(|| ManifestError::MalformedHeader {
                    line: line_no,
                    text: line.to_string(),
                })?;
            let value = value.strip_prefix(' ').unwrap_or(value);
            parser.pending = Some((name.to_string(), value.to_string()));
            parser.pending_line = line_no;
        }
        parser.flush_pending()?;
        parser.end_section();

        Ok(Self {
            main: parser.main,
            sections: parser.sections,
        })
    }

    /// Serialize with CRLF line endings and 72-byte line folding
    ///
    /// `Manifest-Version` is always written first in the main section.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ManifestError> {
        let mut out = String::new();

        if let Some(version) = self.main.get(MANIFEST_VERSION) {
            write_header(&mut out, MANIFEST_VERSION, version)?;
        }
        for (name, value) in self.main.iter() {
            if !name.eq_ignore_ascii_case(MANIFEST_VERSION) {
                write_header(&mut out, name, value)?;
            }
        }
        out.push_str("\r\n");

        for section in &self.sections {
            write_header(&mut out, "Name", &section.name)?;
            for (name, value) in section.attributes.iter() {
                write_header(&mut out, name, value)?;
            }
            out.push_str("\r\n");
        }

        Ok(out.into_bytes())
    }

    pub fn main(&self) -> &Attributes {
        &self.main
    }

    pub fn main_mut(&mut self) -> &mut Attributes {
        &mut self.main
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.name == name)
    }
}

#[derive(Default)]
struct SectionParser {
    main: Attributes,
    main_done: bool,
    sections: Vec<Section>,
    current: Attributes,
    current_name: Option<String>,
    pending: Option<(String, String)>,
    pending_line: usize,
}

impl SectionParser {
    fn flush_pending(&mut self) -> Result<(), ManifestError> {
        let Some((name, value)) = self.pending.take() else {
            return Ok(());
        };
        if !self.main_done {
            self.main.insert(name, value);
        } else if self.current_name.is_none() {
            if !name.eq_ignore_ascii_case("Name") {
                return Err(ManifestError::MissingSectionName {
                    line: self.pending_line,
                });
            }
            self.current_name = Some(value);
        } else {
            self.current.insert(name, value);
        }
        Ok(())
    }

    fn end_section(&mut self) {
        if !self.main_done {
            self.main_done = true;
        } else if let Some(name) = self.current_name.take() {
            self.sections.push(Section {
                name,
                attributes: std::mem::take(&mut self.current),
            });
        }
    }
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn split_lines(text: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut rest = text;
    while !rest.is_empty() {
        match rest.find(['\r', '\n']) {
            Some(i) => {
                lines.push(&rest[..i]);
                let skip = if rest[i..].starts_with("\r\n") { 2 } else { 1 };
                rest = &rest[i + skip..];
            }
            None => {
                lines.push(rest);
                break;
            }
        }
    }
    lines
}

fn write_header(out: &mut String, name: &str, value: &str) -> Result<(), ManifestError> {
    if value.contains(['\r', '\n']) {
        return Err(ManifestError::InvalidValue {
            name: name.to_string(),
        });
    }

    let line = format!("{name}: {value}");
    let mut rest = line.as_str();
    let mut limit = MAX_LINE_BYTES;
    while rest.len() > limit {
        let mut cut = limit;
        while !rest.is_char_boundary(cut) {
            cut -= 1;
        }
        out.push_str(&rest[..cut]);
        out.push_str("\r\n ");
        rest = &rest[cut..];
        // Continuation lines spend one byte on the leading space
        limit = MAX_LINE_BYTES - 1;
    }
    out.push_str(rest);
    out.push_str("\r\n");
    Ok(())
}
