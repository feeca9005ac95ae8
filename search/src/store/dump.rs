//! JSON directory dumps.
//!
//! A dump is the input format of the binary and a convenient way to describe
//! fixtures:
//!
//! ```json
//! {
//!   "suffix": "ou=system",
//!   "indexed_attributes": ["cn", "sn"],
//!   "entries": [
//!     {
//!       "dn": "ou=system",
//!       "attributes": { "objectClass": ["organizationalUnit"], "ou": ["system"] }
//!     }
//!   ]
//! }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::StoreError;

/// A serialized directory: suffix, user-indexed attributes and entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryDump {
    /// Name of the context entry.
    pub suffix: String,
    /// Attribute names (or OIDs) to maintain user indices on.
    #[serde(default)]
    pub indexed_attributes: Vec<String>,
    /// Entries in any order; parents are loaded before children.
    #[serde(default)]
    pub entries: Vec<DumpEntry>,
}

/// One entry of a dump.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DumpEntry {
    /// The entry's name.
    pub dn: String,
    /// Attribute name -> raw values.
    #[serde(default)]
    pub attributes: BTreeMap<String, Vec<String>>,
}

impl DirectoryDump {
    /// Decode a dump from JSON.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidDump` if the JSON does not describe a dump.
    pub fn from_json(json: &str) -> Result<Self, StoreError> {
        serde_json::from_str(json).map_err(|e| StoreError::InvalidDump(e.to_string()))
    }
}
