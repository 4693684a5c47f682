use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::ESA_EXTENSION;

/// A single entry of the `features` section.
///
/// Entries ending in `.esa` are archive files installed as-is; everything
/// else is a symbolic feature name such as `servlet-4.0`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FeatureSpec {
    /// Short-form or symbolic feature name.
    Name(String),
    /// Path to a feature archive on disk.
    Esa(PathBuf),
}

impl FeatureSpec {
    /// Classify a configured entry.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.ends_with(ESA_EXTENSION) {
            Self::Esa(PathBuf::from(raw))
        } else {
            Self::Name(raw.to_string())
        }
    }

    /// Whether this entry refers to an archive file.
    pub fn is_esa(&self) -> bool {
        matches!(self, Self::Esa(_))
    }

    /// The archive path, for `Esa` entries.
    pub fn esa_path(&self) -> Option<&Path> {
        match self {
            Self::Esa(path) => Some(path),
            Self::Name(_) => None,
        }
    }
}

impl From<String> for FeatureSpec {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<&str> for FeatureSpec {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

impl From<FeatureSpec> for String {
    fn from(spec: FeatureSpec) -> Self {
        spec.to_string()
    }
}

impl fmt::Display for FeatureSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => f.write_str(name),
            Self::Esa(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Signature verification policy applied while installing features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerifyPolicy {
    /// Fail on invalid signatures; unsigned user features only warn.
    #[default]
    Enforce,
    /// Verify, but only warn about any failure.
    Warn,
    /// Do not verify signatures.
    Skip,
    /// Every feature must carry a valid signature.
    All,
}

impl VerifyPolicy {
    /// The configuration spelling of this policy.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Enforce => "enforce",
            Self::Warn => "warn",
            Self::Skip => "skip",
            Self::All => "all",
        }
    }
}

impl fmt::Display for VerifyPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VerifyPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "enforce" => Ok(Self::Enforce),
            "warn" => Ok(Self::Warn),
            "skip" => Ok(Self::Skip),
            "all" => Ok(Self::All),
            other => Err(format!(
                "Unknown verify option '{other}': expected enforce, warn, skip or all"
            )),
        }
    }
}

/// The `[features]` section of a project manifest.
///
/// Its mere presence is the license-acceptance gate: a project without it
/// never installs features through the feature utility.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeaturesConfig {
    /// Passed to the legacy installer as `--acceptLicense`.
    #[serde(default)]
    pub accept_license: bool,
    /// Optional local feature repository to install from.
    #[serde(default)]
    pub from: Option<String>,
    /// Install location for user features (`usr`, `core` or a path).
    #[serde(default)]
    pub to: Option<String>,
    /// Signature verification policy.
    #[serde(default)]
    pub verify: VerifyPolicy,
    /// Declared features, in configuration order.
    #[serde(default, rename = "feature")]
    pub features: Vec<FeatureSpec>,
}

/// Features and platforms gathered from one or more sources.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeaturesPlatforms {
    features: BTreeSet<String>,
    platforms: BTreeSet<String>,
}

impl FeaturesPlatforms {
    /// Build from explicit feature and platform sets.
    pub fn new(features: BTreeSet<String>, platforms: BTreeSet<String>) -> Self {
        Self {
            features,
            platforms,
        }
    }

    /// Nothing to install, no platforms.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The feature names.
    pub fn features(&self) -> &BTreeSet<String> {
        &self.features
    }

    /// The platform identifiers.
    pub fn platforms(&self) -> &BTreeSet<String> {
        &self.platforms
    }

    /// Whether neither features nor platforms are present.
    pub fn is_empty(&self) -> bool {
        self.features.is_empty() && self.platforms.is_empty()
    }

    /// Split into `(features, platforms)`.
    pub fn into_parts(self) -> (BTreeSet<String>, BTreeSet<String>) {
        (self.features, self.platforms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_spec_classification() {
        assert_eq!(
            FeatureSpec::parse("servlet-4.0"),
            FeatureSpec::Name("servlet-4.0".to_string())
        );
        let esa = FeatureSpec::parse("  local/custom-1.0.esa ");
        assert!(esa.is_esa());
        assert_eq!(esa.esa_path(), Some(Path::new("local/custom-1.0.esa")));
        assert_eq!(esa.to_string(), "local/custom-1.0.esa");
    }

    #[test]
    fn test_verify_policy_parse() {
        assert_eq!("WARN".parse::<VerifyPolicy>(), Ok(VerifyPolicy::Warn));
        assert_eq!("all".parse::<VerifyPolicy>(), Ok(VerifyPolicy::All));
        assert!("sometimes".parse::<VerifyPolicy>().is_err());
        assert_eq!(VerifyPolicy::default(), VerifyPolicy::Enforce);
    }

    #[test]
    fn test_features_config_from_toml() {
        let config: FeaturesConfig = toml::from_str(
            r#"
accept_license = true
verify = "skip"
feature = ["servlet-4.0", "ext/x.esa"]
"#,
        )
        .unwrap();

        assert!(config.accept_license);
        assert_eq!(config.verify, VerifyPolicy::Skip);
        assert_eq!(config.features.len(), 2);
        assert!(config.features[1].is_esa());
        assert_eq!(config.to, None);
    }

    #[test]
    fn test_features_platforms_empty() {
        let fp = FeaturesPlatforms::empty();
        assert!(fp.is_empty());
        let (features, platforms) = fp.into_parts();
        assert!(features.is_empty() && platforms.is_empty());
    }
}
