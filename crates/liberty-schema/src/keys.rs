use serde::{Deserialize, Serialize};

/// A signing key as configured under `[keys.<name>]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEntry {
    /// Key identifier (e.g. `0x05534365803788CE`).
    pub keyid: String,
    /// Where the public key can be read from (file path or URL).
    pub keyurl: String,
}

/// A key as handed to the installer for signature verification.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyRecord {
    /// Key identifier.
    pub keyid: String,
    /// Public key location.
    pub keyurl: String,
}

impl From<&KeyEntry> for KeyRecord {
    fn from(entry: &KeyEntry) -> Self {
        Self {
            keyid: entry.keyid.clone(),
            keyurl: entry.keyurl.clone(),
        }
    }
}
