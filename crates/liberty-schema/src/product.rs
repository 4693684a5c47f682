//! Runtime product metadata from `lib/versions/*.properties`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// `productId` of an Open Liberty runtime.
pub const OPEN_LIBERTY_PRODUCT_ID: &str = "io.openliberty";

const KEY_PRODUCT_ID: &str = "com.ibm.websphere.productId";
const KEY_PRODUCT_VERSION: &str = "com.ibm.websphere.productVersion";
const KEY_PRODUCT_EDITION: &str = "com.ibm.websphere.productEdition";
const KEY_INSTALL_TYPE: &str = "com.ibm.websphere.productInstallType";

/// Edition and version attributes of one installed product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductProperties {
    /// Product identifier (e.g. `io.openliberty`).
    pub id: String,
    /// Product version (e.g. `24.0.0.1`).
    pub version: String,
    /// Edition, when the properties file declares one.
    pub edition: Option<String>,
    /// Install type, when the properties file declares one.
    pub install_type: Option<String>,
}

impl ProductProperties {
    /// Build from a parsed properties table.
    ///
    /// Returns `None` unless both the product id and version are present.
    pub fn from_table(table: &BTreeMap<String, String>) -> Option<Self> {
        Some(Self {
            id: table.get(KEY_PRODUCT_ID)?.clone(),
            version: table.get(KEY_PRODUCT_VERSION)?.clone(),
            edition: table.get(KEY_PRODUCT_EDITION).cloned(),
            install_type: table.get(KEY_INSTALL_TYPE).cloned(),
        })
    }

    /// Parse the text of a properties file.
    pub fn parse(text: &str) -> Option<Self> {
        Self::from_table(&parse_properties(text))
    }

    /// Whether this entry describes Open Liberty itself.
    pub fn is_open_liberty(&self) -> bool {
        self.id == OPEN_LIBERTY_PRODUCT_ID
    }
}

/// The Open Liberty version among a runtime's product entries, if any.
pub fn open_liberty_version(properties: &[ProductProperties]) -> Option<&str> {
    properties
        .iter()
        .find(|p| p.is_open_liberty())
        .map(|p| p.version.as_str())
}

/// Minimal `key=value` properties reader.
///
/// Handles `#`/`!` comments, `=` or `:` separators and surrounding
/// whitespace. Line continuations and escapes are not used by product files.
pub fn parse_properties(text: &str) -> BTreeMap<String, String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with('!'))
        .filter_map(|line| {
            let split = line.find(['=', ':'])?;
            let (key, value) = line.split_at(split);
            Some((key.trim().to_string(), value[1..].trim().to_string()))
        })
        .collect()
}
