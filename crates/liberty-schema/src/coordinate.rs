use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Packaging type assumed when a coordinate string does not name one.
pub const DEFAULT_TYPE: &str = "jar";

/// A repository coordinate: group, artifact, packaging type and version.
///
/// Any of the fields may still carry `${property}` placeholders; they are
/// only substituted right before the coordinate is handed to a fetcher.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coordinate {
    /// Group id (e.g. `io.openliberty.features`).
    pub group_id: String,
    /// Artifact id (e.g. `features`).
    pub artifact_id: String,
    /// Packaging type (e.g. `esa`, `json`, `pom`).
    #[serde(rename = "type", default = "default_type")]
    pub kind: String,
    /// Version (e.g. `24.0.0.1`).
    pub version: String,
}

fn default_type() -> String {
    DEFAULT_TYPE.to_string()
}

/// Errors raised while parsing a coordinate string.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum CoordinateError {
    /// The string does not have the `group:artifact[:type]:version` shape.
    #[error("Malformed coordinate '{0}': expected group:artifact[:type]:version")]
    Malformed(String),

    /// One of the segments is empty.
    #[error("Empty {field} in coordinate '{coordinate}'")]
    EmptySegment {
        /// Name of the empty segment.
        field: &'static str,
        /// The offending coordinate string.
        coordinate: String,
    },
}

impl Coordinate {
    /// Build a coordinate from its four parts.
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        kind: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            kind: kind.into(),
            version: version.into(),
        }
    }

    /// Parse `group:artifact:version` or `group:artifact:type:version`.
    ///
    /// The three-part form takes `default_kind` as its packaging type.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinateError::Malformed`] if the string does not split
    /// into three or four segments, or [`CoordinateError::EmptySegment`] if
    /// any segment is blank.
    pub fn parse(s: &str, default_kind: &str) -> Result<Self, CoordinateError> {
        let parts: Vec<&str> = s.trim().split(':').collect();
        let coordinate = match parts.as_slice() {
            [group, artifact, version] => Self::new(*group, *artifact, default_kind, *version),
            [group, artifact, kind, version] => Self::new(*group, *artifact, *kind, *version),
            _ => return Err(CoordinateError::Malformed(s.to_string())),
        };

        for (field, value) in [
            ("groupId", &coordinate.group_id),
            ("artifactId", &coordinate.artifact_id),
            ("type", &coordinate.kind),
            ("version", &coordinate.version),
        ] {
            if value.is_empty() {
                return Err(CoordinateError::EmptySegment {
                    field,
                    coordinate: s.to_string(),
                });
            }
        }

        Ok(coordinate)
    }

    /// Same coordinate with a different packaging type.
    pub fn with_kind(&self, kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            ..self.clone()
        }
    }

    /// The `group:artifact:version` form used in BOM listings.
    pub fn gav(&self) -> String {
        format!("{}:{}:{}", self.group_id, self.artifact_id, self.version)
    }

    /// Whether any field still carries a `${...}` placeholder.
    pub fn has_placeholders(&self) -> bool {
        [&self.group_id, &self.artifact_id, &self.kind, &self.version]
            .iter()
            .any(|field| field.contains("${"))
    }

    /// File name inside a repository: `artifact-version.type`.
    pub fn file_name(&self) -> String {
        format!("{}-{}.{}", self.artifact_id, self.version, self.kind)
    }

    /// Relative path inside a Maven-layout repository, `/`-separated.
    pub fn repository_path(&self) -> String {
        format!(
            "{}/{}/{}/{}",
            self.group_id.replace('.', "/"),
            self.artifact_id,
            self.version,
            self.file_name()
        )
    }

    /// Relative path inside a Maven-layout repository on the local disk.
    pub fn local_path(&self) -> PathBuf {
        self.repository_path().split('/').collect()
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.group_id, self.artifact_id, self.kind, self.version
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_three_part() {
        let c = Coordinate::parse("com.example:features-bom:1.0", "pom").unwrap();
        assert_eq!(c, Coordinate::new("com.example", "features-bom", "pom", "1.0"));
        assert_eq!(c.gav(), "com.example:features-bom:1.0");
    }

    #[test]
    fn test_parse_four_part() {
        let c = Coordinate::parse("io.openliberty.features:features:json:24.0.0.1", "jar").unwrap();
        assert_eq!(c.kind, "json");
        assert_eq!(c.to_string(), "io.openliberty.features:features:json:24.0.0.1");
    }

    #[test]
    fn test_parse_rejects_bad_shapes() {
        assert!(matches!(
            Coordinate::parse("just-a-name", "jar"),
            Err(CoordinateError::Malformed(_))
        ));
        assert!(matches!(
            Coordinate::parse("g::1.0", "jar"),
            Err(CoordinateError::EmptySegment { field: "artifactId", .. })
        ));
    }

    #[test]
    fn test_repository_path() {
        let c = Coordinate::new("io.openliberty.features", "servlet-4.0", "esa", "24.0.0.1");
        assert_eq!(
            c.repository_path(),
            "io/openliberty/features/servlet-4.0/24.0.0.1/servlet-4.0-24.0.0.1.esa"
        );
        assert!(c.local_path().ends_with("servlet-4.0-24.0.0.1.esa"));
    }

    #[test]
    fn test_placeholders_detected() {
        assert!(Coordinate::new("g", "a", "esa", "${liberty.version}").has_placeholders());
        assert!(!Coordinate::new("g", "a", "esa", "1.0").has_placeholders());
    }
}
