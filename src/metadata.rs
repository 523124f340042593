//! Metadata block synthesis.
//!
//! Every capsule carries exactly one metadata block, always serialized as
//! the first entry under the reserved name [`METADATA_ENTRY_NAME`]. The
//! block is assembled functionally: an optional caller-supplied manifest
//! file forms the base record, ordered override rules are applied on top,
//! and the resulting immutable [`Metadata`] is serialized to canonical JSON
//! (keys sorted by the underlying `BTreeMap`) so the bytes are the same on
//! every build.

use crate::error::{CapsuleError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Reserved entry name under which the metadata block is stored
pub const METADATA_ENTRY_NAME: &str = "capsule.json";

/// Key carrying the container format version
pub const FORMAT_VERSION_KEY: &str = "format-version";

/// Key identifying the tool that created the capsule
pub const CREATED_BY_KEY: &str = "created-by";

/// Key declaring the capsule's main entry point
pub const MAIN_ENTRY_KEY: &str = "main-entry";

/// Canonical value of the format-version field, set unconditionally
pub const FORMAT_VERSION_VALUE: &str = "1.0";

/// Default creator tag, injected only when the caller's manifest has none
pub const DEFAULT_CREATED_BY: &str = "capsule-pack";

/// Immutable metadata record, final once built
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata {
    fields: BTreeMap<String, String>,
}

impl Metadata {
    /// Look up one field
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// Number of fields in the record
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Serialize to the wire form stored in the capsule. Key order comes
    /// from the sorted map, so identical records produce identical bytes.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(self).map_err(CapsuleError::from)
    }

    /// Parse a record from its wire form
    pub fn from_json(data: &[u8]) -> Result<Self> {
        serde_json::from_slice(data).map_err(CapsuleError::from)
    }
}

/// Builds the metadata block from ordered sources.
///
/// Override rules, applied in this order:
/// 1. the caller's manifest file (if any) supplies the base fields;
/// 2. `format-version` is set unconditionally to its canonical value;
/// 3. `created-by` defaults to [`DEFAULT_CREATED_BY`] only when the base
///    record has no such field (the caller's value wins);
/// 4. a supplied main entry always overwrites any `main-entry` field.
#[derive(Debug, Default)]
pub struct MetadataBuilder {
    base: BTreeMap<String, String>,
    main_entry: Option<String>,
}

impl MetadataBuilder {
    /// Start from an empty base record
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a caller-supplied manifest file: a JSON object of string
    /// key/value pairs. A missing or malformed file is fatal.
    pub fn from_manifest_file(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)
            .map_err(|_| CapsuleError::ManifestNotFound(path.to_path_buf()))?;
        let base: BTreeMap<String, String> = serde_json::from_slice(&data)
            .map_err(|err| CapsuleError::ManifestParseFailed(err.to_string()))?;
        Ok(Self {
            base,
            main_entry: None,
        })
    }

    /// Declare the main entry point, overwriting any caller-supplied value
    pub fn main_entry(mut self, main_entry: Option<&str>) -> Self {
        self.main_entry = main_entry.map(str::to_string);
        self
    }

    /// Apply the override rules and produce the final record
    pub fn build(self) -> Metadata {
        let mut fields = self.base;

        fields.insert(
            FORMAT_VERSION_KEY.to_string(),
            FORMAT_VERSION_VALUE.to_string(),
        );
        fields
            .entry(CREATED_BY_KEY.to_string())
            .or_insert_with(|| DEFAULT_CREATED_BY.to_string());
        if let Some(main_entry) = self.main_entry {
            fields.insert(MAIN_ENTRY_KEY.to_string(), main_entry);
        }

        Metadata { fields }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_base_gets_required_fields() {
        let metadata = MetadataBuilder::new().build();

        assert_eq!(metadata.get(FORMAT_VERSION_KEY), Some(FORMAT_VERSION_VALUE));
        assert_eq!(metadata.get(CREATED_BY_KEY), Some(DEFAULT_CREATED_BY));
        assert_eq!(metadata.get(MAIN_ENTRY_KEY), None);
        assert_eq!(metadata.len(), 2);
    }

    #[test]
    fn test_caller_supplied_creator_wins() {
        let mut manifest = NamedTempFile::new().unwrap();
        manifest
            .write_all(br#"{"created-by": "custom-build 2.0", "vendor": "acme"}"#)
            .unwrap();

        let metadata = MetadataBuilder::from_manifest_file(manifest.path())
            .unwrap()
            .build();

        assert_eq!(metadata.get(CREATED_BY_KEY), Some("custom-build 2.0"));
        assert_eq!(metadata.get("vendor"), Some("acme"));
        // format-version is set unconditionally
        assert_eq!(metadata.get(FORMAT_VERSION_KEY), Some(FORMAT_VERSION_VALUE));
    }

    #[test]
    fn test_format_version_overwritten_even_if_supplied() {
        let mut manifest = NamedTempFile::new().unwrap();
        manifest
            .write_all(br#"{"format-version": "99.7"}"#)
            .unwrap();

        let metadata = MetadataBuilder::from_manifest_file(manifest.path())
            .unwrap()
            .build();

        assert_eq!(metadata.get(FORMAT_VERSION_KEY), Some(FORMAT_VERSION_VALUE));
    }

    #[test]
    fn test_main_entry_always_overwrites() {
        let mut manifest = NamedTempFile::new().unwrap();
        manifest
            .write_all(br#"{"main-entry": "OldMain"}"#)
            .unwrap();

        let metadata = MetadataBuilder::from_manifest_file(manifest.path())
            .unwrap()
            .main_entry(Some("App"))
            .build();

        assert_eq!(metadata.get(MAIN_ENTRY_KEY), Some("App"));
    }

    #[test]
    fn test_missing_manifest_file_is_fatal() {
        let result = MetadataBuilder::from_manifest_file(Path::new("/no/such/manifest.json"));
        assert!(matches!(result, Err(CapsuleError::ManifestNotFound(_))));
    }

    #[test]
    fn test_malformed_manifest_file_is_fatal() {
        let mut manifest = NamedTempFile::new().unwrap();
        manifest.write_all(b"this is not json").unwrap();

        let result = MetadataBuilder::from_manifest_file(manifest.path());
        assert!(matches!(
            result,
            Err(CapsuleError::ManifestParseFailed(_))
        ));
    }

    #[test]
    fn test_serialization_is_deterministic() {
        let build = || {
            MetadataBuilder::new()
                .main_entry(Some("App"))
                .build()
                .to_json()
                .unwrap()
        };
        assert_eq!(build(), build());
    }

    #[test]
    fn test_json_roundtrip() {
        let metadata = MetadataBuilder::new().main_entry(Some("App")).build();

        let json = metadata.to_json().unwrap();
        let parsed = Metadata::from_json(&json).unwrap();

        assert_eq!(parsed, metadata);
    }
}
