//! Property registry
//!
//! Maps human-readable property names to their property code and data
//! type, and holds the friendly-name allow-list that selects supported
//! devices. A registry is an immutable snapshot: loading a document
//! produces a new registry instead of mutating the active one.

use crate::config::{PropertyEntry, RegistryDocument};
use crate::error::{BridgeError, Result};
use protocol::DataType;
use protocol::codes::property;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, error, warn};

/// Friendly name of the device supported out of the box
pub const DEFAULT_FRIENDLY_NAME: &str = "RICOH R Development Kit";

/// A named device property
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyDescriptor {
    pub name: String,
    pub code: u16,
    /// Authoritative type for both encode and decode of this property
    pub data_type: DataType,
}

impl PropertyDescriptor {
    pub fn new(name: &str, code: u16, data_type: DataType) -> Self {
        Self {
            name: name.to_string(),
            code,
            data_type,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registry {
    friendly_names: Vec<String>,
    properties: BTreeMap<String, PropertyDescriptor>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(
            vec![DEFAULT_FRIENDLY_NAME.to_string()],
            vec![
                PropertyDescriptor::new("WhiteBalance", property::WHITE_BALANCE, DataType::UInt16),
                PropertyDescriptor::new(
                    "ExposureBiasCompensation",
                    property::EXPOSURE_BIAS_COMPENSATION,
                    DataType::Int16,
                ),
            ],
        )
    }
}

impl Registry {
    /// Build a registry from an allow-list and a set of descriptors
    ///
    /// Later descriptors overwrite earlier ones with the same name.
    pub fn new(friendly_names: Vec<String>, properties: Vec<PropertyDescriptor>) -> Self {
        Self {
            friendly_names,
            properties: properties
                .into_iter()
                .map(|p| (p.name.clone(), p))
                .collect(),
        }
    }

    /// Load a registry document on top of this registry
    ///
    /// Any failure to read or parse the document is logged and this
    /// registry is returned unchanged.
    pub fn load(&self, path: &Path) -> Registry {
        match RegistryDocument::from_path(path) {
            Ok(document) => {
                let registry = self.merged(document);
                debug!(
                    "Loaded registry from {}: {} friendly names, {} properties",
                    path.display(),
                    registry.friendly_names.len(),
                    registry.properties.len()
                );
                registry
            }
            Err(e) => {
                error!("Failed to load registry {}: {:#}", path.display(), e);
                self.clone()
            }
        }
    }

    /// Apply a parsed document, returning the new snapshot
    ///
    /// The document's allow-list always replaces the current one; a
    /// document without one leaves no device allowed. Its property entries are merged by name; malformed entries are
    /// skipped.
    pub fn merged(&self, document: RegistryDocument) -> Registry {
        let mut next = self.clone();

        next.friendly_names = document.friendly_names.unwrap_or_default();

        for (name, entry) in document.properties {
            match entry.resolve(&name) {
                Ok(descriptor) => {
                    next.properties.insert(name, descriptor);
                }
                Err(reason) => warn!("Skipping property entry '{}': {}", name, reason),
            }
        }

        next
    }

    /// Resolve a property name
    pub fn lookup(&self, name: &str) -> Result<&PropertyDescriptor> {
        self.properties
            .get(name)
            .ok_or_else(|| BridgeError::UnknownProperty(name.to_string()))
    }

    /// Supported property names, sorted
    pub fn property_names(&self) -> Vec<&str> {
        self.properties.keys().map(String::as_str).collect()
    }

    pub fn friendly_names(&self) -> &[String] {
        &self.friendly_names
    }

    /// Whether a device with this friendly name is supported
    pub fn allows(&self, friendly_name: &str) -> bool {
        self.friendly_names.iter().any(|n| n == friendly_name)
    }
}

impl PropertyEntry {
    fn resolve(&self, name: &str) -> std::result::Result<PropertyDescriptor, String> {
        let (code, type_name) = match self {
            PropertyEntry::Table { code, data_type } => (code, data_type),
            PropertyEntry::Pair(code, data_type) => (code, data_type),
            PropertyEntry::Malformed(_) => return Err("expected {code, type}".to_string()),
        };

        let code = code.to_u16()?;
        let data_type = type_name
            .parse::<DataType>()
            .map_err(|e| e.to_string())?;

        Ok(PropertyDescriptor::new(name, code, data_type))
    }
}
