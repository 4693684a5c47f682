//! JSON feature catalog (`features.json`).
//!
//! A catalog is published next to a runtime release (and by the prepare
//! step for user features) and describes every installable feature: its
//! names, where its archive lives and what it requires.

use serde::{Deserialize, Serialize};

use crate::coordinate::Coordinate;

/// One installable feature as described by a catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureDescriptor {
    /// OSGi subsystem symbolic name (e.g. `com.ibm.websphere.appserver.servlet-4.0`).
    pub symbolic_name: String,
    /// Short name used in server configuration (e.g. `servlet-4.0`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_name: Option<String>,
    /// Group id of the archive, defaults to the catalog's group.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    /// Artifact id of the archive, defaults to the symbolic name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_id: Option<String>,
    /// Archive version, defaults to the catalog's version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Names of features this one depends on.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requires: Vec<String>,
    /// Platforms this feature belongs to (e.g. `javaee-8.0`).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub platforms: Vec<String>,
}

impl FeatureDescriptor {
    /// Whether `name` is this feature's short or symbolic name (case-insensitive).
    pub fn matches(&self, name: &str) -> bool {
        self.symbolic_name.eq_ignore_ascii_case(name)
            || self
                .short_name
                .as_deref()
                .is_some_and(|short| short.eq_ignore_ascii_case(name))
    }

    /// The name to show to users: the short name when there is one.
    pub fn display_name(&self) -> &str {
        self.short_name.as_deref().unwrap_or(&self.symbolic_name)
    }

    /// Archive coordinate, filling gaps from the catalog's own coordinate.
    pub fn archive_coordinate(&self, catalog: &Coordinate) -> Coordinate {
        Coordinate::new(
            self.group_id.as_deref().unwrap_or(&catalog.group_id),
            self.artifact_id.as_deref().unwrap_or(&self.symbolic_name),
            "esa",
            self.version.as_deref().unwrap_or(&catalog.version),
        )
    }
}

/// A parsed `features.json` document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureCatalog {
    features: Vec<FeatureDescriptor>,
}

impl FeatureCatalog {
    /// Wrap a list of descriptors.
    pub fn new(features: Vec<FeatureDescriptor>) -> Self {
        Self { features }
    }

    /// Parse a catalog from JSON text.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error if the text is not a JSON array of
    /// feature descriptors.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Serialize the catalog as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// All descriptors, in document order.
    pub fn features(&self) -> &[FeatureDescriptor] {
        &self.features
    }

    /// Number of descriptors.
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Whether the catalog lists nothing.
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Exact lookup by short or symbolic name.
    pub fn find(&self, name: &str) -> Option<&FeatureDescriptor> {
        self.features.iter().find(|f| f.matches(name))
    }

    /// Versioned features whose short name is `<base>-<version>`.
    pub fn versions_of(&self, base: &str) -> Vec<&FeatureDescriptor> {
        self.features
            .iter()
            .filter(|f| {
                f.short_name
                    .as_deref()
                    .and_then(split_versioned)
                    .is_some_and(|(b, _)| b.eq_ignore_ascii_case(base))
            })
            .collect()
    }
}

/// Split `servlet-4.0` into `("servlet", "4.0")`.
///
/// Returns `None` for versionless names such as `servlet`.
pub fn split_versioned(name: &str) -> Option<(&str, &str)> {
    let (base, version) = name.rsplit_once('-')?;
    let numeric = !version.is_empty()
        && version.starts_with(|c: char| c.is_ascii_digit())
        && version.chars().all(|c| c.is_ascii_digit() || c == '.');
    numeric.then_some((base, version))
}
