//! Registry document loading
//!
//! A registry document supplies the friendly-name allow-list and property
//! definitions. JSON is the default format; a `.toml` extension selects
//! TOML.
//!
//! # Example Document
//! ```json
//! {
//!   "friendlyNames": ["RICOH R Development Kit"],
//!   "properties": {
//!     "WhiteBalance": {"code": "0x5005", "type": "UINT16"},
//!     "ExposureIndex": ["0x500F", "UINT16"]
//!   }
//! }
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Parsed registry document
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryDocument {
    /// Replaces the allow-list; a missing key clears it
    #[serde(default)]
    pub friendly_names: Option<Vec<String>>,
    /// Property definitions keyed by name
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyEntry>,
}

/// One property definition, in either accepted shape
///
/// Anything else is kept as `Malformed` so one bad entry never fails the
/// whole document.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PropertyEntry {
    Table {
        code: PropertyCode,
        #[serde(rename = "type")]
        data_type: String,
    },
    Pair(PropertyCode, String),
    Malformed(serde::de::IgnoredAny),
}

/// Property code given as a number or as `0x`-prefixed / decimal text
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PropertyCode {
    Number(u64),
    Text(String),
}

impl PropertyCode {
    pub fn to_u16(&self) -> std::result::Result<u16, String> {
        let value = match self {
            PropertyCode::Number(n) => *n,
            PropertyCode::Text(s) => {
                let s = s.trim();
                let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
                    Some(hex) => u64::from_str_radix(hex, 16),
                    None => s.parse::<u64>(),
                };
                parsed.map_err(|_| format!("invalid property code '{}'", s))?
            }
        };

        u16::try_from(value).map_err(|_| format!("property code {:#x} exceeds 16 bits", value))
    }
}

impl RegistryDocument {
    /// Read and parse a document, picking the format from the extension
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read registry file: {}", path.display()))?;

        let is_toml = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

        if is_toml {
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse registry file: {}", path.display()))
        } else {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse registry file: {}", path.display()))
        }
    }
}

/// Get the default registry document path
pub fn default_registry_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        config_dir.join("mtp-bridge").join("registry.json")
    } else {
        PathBuf::from(".config/mtp-bridge/registry.json")
    }
}

/// Registry document next to the running executable (`<exe>.json`)
pub fn executable_registry_path() -> Option<PathBuf> {
    std::env::current_exe()
        .ok()
        .map(|exe| exe.with_extension("json"))
}

/// Resolve which registry document to load
///
/// An explicit path always wins (with `~` expanded). Otherwise the first
/// existing candidate among the executable-adjacent and the user config
/// locations is used; `None` means the built-in registry stays active.
pub fn resolve_registry_path(explicit: Option<&str>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(PathBuf::from(shellexpand::tilde(path).as_ref()));
    }

    executable_registry_path()
        .into_iter()
        .chain(std::iter::once(default_registry_path()))
        .find(|p| p.exists())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_property_code_forms() {
        assert_eq!(PropertyCode::Text("0x5005".into()).to_u16(), Ok(0x5005));
        assert_eq!(PropertyCode::Text("0XD00A".into()).to_u16(), Ok(0xD00A));
        assert_eq!(PropertyCode::Text("20485".into()).to_u16(), Ok(20485));
        assert_eq!(PropertyCode::Number(0x5010).to_u16(), Ok(0x5010));
        assert!(PropertyCode::Text("0xZZ".into()).to_u16().is_err());
        assert!(PropertyCode::Number(0x10000).to_u16().is_err());
    }

    #[test]
    fn test_parse_json_document() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"{{"friendlyNames": ["Cam"], "properties": {{"Iso": {{"code": "0x500F", "type": "UINT16"}}}}}}"#
        )
        .unwrap();

        let document = RegistryDocument::from_path(file.path()).unwrap();
        assert_eq!(document.friendly_names, Some(vec!["Cam".to_string()]));
        assert!(matches!(
            document.properties.get("Iso"),
            Some(PropertyEntry::Table { .. })
        ));
    }

    #[test]
    fn test_parse_toml_document() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
friendlyNames = ["Cam"]

[properties]
WhiteBalance = {{ code = 0x5005, type = "UINT16" }}
Iso = ["0x500F", "UINT16"]
"#
        )
        .unwrap();

        let document = RegistryDocument::from_path(file.path()).unwrap();
        assert_eq!(document.properties.len(), 2);
        assert!(matches!(
            document.properties.get("Iso"),
            Some(PropertyEntry::Pair(..))
        ));
    }

    #[test]
    fn test_unparseable_document_is_error() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, "{{ not json").unwrap();
        assert!(RegistryDocument::from_path(file.path()).is_err());
    }

    #[test]
    fn test_explicit_path_expands_tilde() {
        let resolved = resolve_registry_path(Some("/tmp/registry.toml")).unwrap();
        assert_eq!(resolved, PathBuf::from("/tmp/registry.toml"));

        let resolved = resolve_registry_path(Some("~/registry.json")).unwrap();
        assert!(resolved.ends_with("registry.json"));
    }
}
