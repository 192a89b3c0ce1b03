// src/manifest/merge.rs

//! Applying extra headers and referred packages to a bundle manifest

use super::{Attributes, IMPORT_PACKAGE};
use crate::header::{Header, HeaderError, RESOLUTION_DIRECTIVE};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// What to do when a referred package is already imported
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImportPolicy {
    /// Replace the existing clause with a bare one, dropping its version
    /// range and other attributes
    #[default]
    Overwrite,
    /// Keep the existing clause untouched
    InsertIfAbsent,
}

impl fmt::Display for ImportPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Overwrite => write!(f, "overwrite"),
            Self::InsertIfAbsent => write!(f, "insert-if-absent"),
        }
    }
}

/// Options controlling how `Import-Package` is rewritten
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOptions {
    pub import_policy: ImportPolicy,
    /// Directive keys (with trailing `:`) that survive re-serialization
    pub allowed_directives: Vec<String>,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            import_policy: ImportPolicy::default(),
            allowed_directives: vec![RESOLUTION_DIRECTIVE.to_string()],
        }
    }
}

impl MergeOptions {
    pub fn with_policy(mut self, policy: ImportPolicy) -> Self {
        self.import_policy = policy;
        self
    }
}

/// A header set on a bundle manifest, replacing any previous value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderOverride {
    pub name: String,
    pub value: String,
}

impl HeaderOverride {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl FromStr for HeaderOverride {
    type Err = String;

    /// Parse `Name: value` (the space after the colon is optional)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, value) = s
            .split_once(':')
            .ok_or_else(|| format!("expected 'Name: value', got: {}", s))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(format!("empty header name in: {}", s));
        }
        Ok(Self::new(name, value.trim()))
    }
}

impl fmt::Display for HeaderOverride {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.value)
    }
}

/// Everything to change in one bundle's manifest
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestDelta {
    /// Applied in order; later entries for the same name win
    pub overrides: Vec<HeaderOverride>,
    pub referred_packages: BTreeSet<String>,
}

impl ManifestDelta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_override(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.overrides.push(HeaderOverride::new(name, value));
        self
    }

    pub fn with_referred_package(mut self, package: impl Into<String>) -> Self {
        self.referred_packages.insert(package.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.overrides.is_empty() && self.referred_packages.is_empty()
    }

    /// Apply to a manifest's main attributes, consuming the delta
    pub fn apply(self, attributes: &mut Attributes, options: &MergeOptions) -> Result<(), HeaderError> {
        apply(attributes, &self.overrides, &self.referred_packages, options)
    }
}

/// Set header overrides, then merge referred packages into `Import-Package`
///
/// The existing `Import-Package` value is always re-serialized, so
/// directives outside `options.allowed_directives` are dropped even when no
/// package is added. An absent `Import-Package` stays absent unless at least
/// one package is referred. On error `attributes` is left unchanged.
pub fn apply(
    attributes: &mut Attributes,
    overrides: &[HeaderOverride],
    referred_packages: &BTreeSet<String>,
    options: &MergeOptions,
) -> Result<(), HeaderError> {
    let mut merged = attributes.clone();
    for header in overrides {
        if let Some(previous) = merged.insert(&header.name, &header.value) {
            debug!("Replaced header {} (was: {})", header.name, previous);
        }
    }

    merge_imports(&mut merged, referred_packages, options)?;
    *attributes = merged;
    Ok(())
}

fn merge_imports(
    attributes: &mut Attributes,
    referred_packages: &BTreeSet<String>,
    options: &MergeOptions,
) -> Result<(), HeaderError> {
    let mut imports = Header::parse(attributes.get(IMPORT_PACKAGE).unwrap_or(""))?;

    for package in referred_packages {
        match options.import_policy {
            ImportPolicy::Overwrite => {
                if imports.insert_empty(package.as_str()).is_some() {
                    debug!("Referred package {} replaces existing import clause", package);
                }
            }
            ImportPolicy::InsertIfAbsent => {
                if !imports.contains(package) {
                    imports.insert_empty(package.as_str());
                }
            }
        }
    }

    if !imports.is_empty() {
        let allowed: Vec<&str> = options.allowed_directives.iter().map(String::as_str).collect();
        attributes.insert(IMPORT_PACKAGE, imports.serialize(&allowed));
        debug!("Import-Package now has {} clauses", imports.len());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::ClauseGrammarError;

    fn packages(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn imports_of(attrs: &Attributes) -> Header {
        Header::parse(attrs.get(IMPORT_PACKAGE).unwrap()).unwrap()
    }

    #[test]
    fn test_overrides_last_writer_wins() {
        let mut attrs = Attributes::new();
        attrs.insert("Bundle-Vendor", "Original");
        let overrides = vec![
            HeaderOverride::new("Bundle-Vendor", "First"),
            HeaderOverride::new("X-Extra", "1"),
            HeaderOverride::new("bundle-vendor", "Second"),
        ];
        apply(&mut attrs, &overrides, &BTreeSet::new(), &MergeOptions::default()).unwrap();
        assert_eq!(attrs.get("Bundle-Vendor"), Some("Second"));
        assert_eq!(attrs.get("X-Extra"), Some("1"));
        assert!(!attrs.contains(IMPORT_PACKAGE));
    }

    #[test]
    fn test_overrides_idempotent() {
        let overrides = vec![
            HeaderOverride::new("A", "1"),
            HeaderOverride::new("B", "2"),
            HeaderOverride::new("A", "3"),
        ];
        let mut base = Attributes::new();
        base.insert("Import-Package", "p1;version=1.0");

        let mut once = base.clone();
        apply(&mut once, &overrides, &BTreeSet::new(), &MergeOptions::default()).unwrap();
        let mut twice = once.clone();
        apply(&mut twice, &overrides, &BTreeSet::new(), &MergeOptions::default()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_referred_package_added() {
        let mut attrs = Attributes::new();
        attrs.insert(IMPORT_PACKAGE, "p1;version=1.0");
        apply(&mut attrs, &[], &packages(&["p2"]), &MergeOptions::default()).unwrap();

        let imports = imports_of(&attrs);
        assert_eq!(imports.len(), 2);
        assert_eq!(imports.get("p1").unwrap().borrow().get("version"), Some("1.0"));
        assert!(imports.get("p2").unwrap().borrow().is_empty());
    }

    #[test]
    fn test_referred_package_overwrites_constraints() {
        let mut attrs = Attributes::new();
        attrs.insert(IMPORT_PACKAGE, "p1;version=1.0");
        apply(&mut attrs, &[], &packages(&["p1"]), &MergeOptions::default()).unwrap();
        assert_eq!(attrs.get(IMPORT_PACKAGE), Some("p1"));
    }

    #[test]
    fn test_insert_if_absent_keeps_constraints() {
        let mut attrs = Attributes::new();
        attrs.insert(IMPORT_PACKAGE, "p1;version=1.0");
        let options = MergeOptions::default().with_policy(ImportPolicy::InsertIfAbsent);
        apply(&mut attrs, &[], &packages(&["p1", "p3"]), &options).unwrap();
        assert_eq!(attrs.get(IMPORT_PACKAGE), Some("p1;version=1.0, p3"));
    }

    #[test]
    fn test_absent_imports_stay_absent() {
        let mut attrs = Attributes::new();
        apply(&mut attrs, &[], &BTreeSet::new(), &MergeOptions::default()).unwrap();
        assert!(!attrs.contains(IMPORT_PACKAGE));
    }

    #[test]
    fn test_imports_created_from_referred() {
        let mut attrs = Attributes::new();
        apply(&mut attrs, &[], &packages(&["b.pkg", "a.pkg"]), &MergeOptions::default()).unwrap();
        assert_eq!(attrs.get(IMPORT_PACKAGE), Some("a.pkg, b.pkg"));
    }

    #[test]
    fn test_unknown_directives_dropped() {
        let mut attrs = Attributes::new();
        attrs.insert(
            IMPORT_PACKAGE,
            "p1;resolution:=optional;x-custom:=yes;version=\"[1,2)\"",
        );
        apply(&mut attrs, &[], &BTreeSet::new(), &MergeOptions::default()).unwrap();
        assert_eq!(
            attrs.get(IMPORT_PACKAGE),
            Some("p1;resolution:=optional;version=\"[1,2)\"")
        );
    }

    #[test]
    fn test_widened_allow_list() {
        let mut attrs = Attributes::new();
        attrs.insert(IMPORT_PACKAGE, "p1;x-custom:=yes");
        let mut options = MergeOptions::default();
        options.allowed_directives.push("x-custom:".to_string());
        apply(&mut attrs, &[], &BTreeSet::new(), &options).unwrap();
        assert_eq!(attrs.get(IMPORT_PACKAGE), Some("p1;x-custom:=yes"));
    }

    #[test]
    fn test_override_feeds_import_merge() {
        let mut attrs = Attributes::new();
        let overrides = vec![HeaderOverride::new(IMPORT_PACKAGE, "org.base")];
        apply(&mut attrs, &overrides, &packages(&["org.extra"]), &MergeOptions::default()).unwrap();
        assert_eq!(attrs.get(IMPORT_PACKAGE), Some("org.base, org.extra"));
    }

    #[test]
    fn test_malformed_imports_propagate() {
        let mut attrs = Attributes::new();
        attrs.insert(IMPORT_PACKAGE, "p1;version=1.0;p2");
        let err = apply(&mut attrs, &[], &packages(&["p3"]), &MergeOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            HeaderError::Grammar(ClauseGrammarError::NameAfterParameter { .. })
        ));
        assert_eq!(attrs.get(IMPORT_PACKAGE), Some("p1;version=1.0;p2"));
    }

    #[test]
    fn test_failed_merge_leaves_attributes_untouched() {
        let mut attrs = Attributes::new();
        attrs.insert("Bundle-Vendor", "Original");
        attrs.insert(IMPORT_PACKAGE, "p1;version=1.0;p2");
        let before = attrs.clone();

        let overrides = vec![HeaderOverride::new("Bundle-Vendor", "Acme")];
        assert!(apply(&mut attrs, &overrides, &packages(&["p3"]), &MergeOptions::default()).is_err());
        assert_eq!(attrs, before);

        // A malformed Import-Package supplied as an override is rejected too
        let mut attrs = Attributes::new();
        let overrides = vec![HeaderOverride::new(IMPORT_PACKAGE, "=broken")];
        assert!(apply(&mut attrs, &overrides, &BTreeSet::new(), &MergeOptions::default()).is_err());
        assert!(attrs.is_empty());
    }

    #[test]
    fn test_delta_apply() {
        let mut attrs = Attributes::new();
        ManifestDelta::new()
            .with_override("Bundle-Vendor", "Acme")
            .with_referred_package("org.api")
            .apply(&mut attrs, &MergeOptions::default())
            .unwrap();
        assert_eq!(attrs.get("Bundle-Vendor"), Some("Acme"));
        assert_eq!(attrs.get(IMPORT_PACKAGE), Some("org.api"));
    }

    #[test]
    fn test_header_override_from_str() {
        let header: HeaderOverride = "Bundle-Vendor: Acme: Corp".parse().unwrap();
        assert_eq!(header, HeaderOverride::new("Bundle-Vendor", "Acme: Corp"));
        let header: HeaderOverride = "X-Flag:yes".parse().unwrap();
        assert_eq!(header.value, "yes");
        assert!("no-colon".parse::<HeaderOverride>().is_err());
        assert!(": value".parse::<HeaderOverride>().is_err());
    }
}
