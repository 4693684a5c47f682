//! Coordinate resolution against the project's repositories.

use liberty_schema::Coordinate;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::ExecutionError;
use crate::io::repository::ArtifactFetcher;
use crate::properties::{substitute, substitute_coordinate};
use crate::reporter::Reporter;

/// Turns coordinates into local files, substituting `${...}` on request.
#[derive(Clone)]
pub struct CoordinateResolver {
    fetcher: Arc<dyn ArtifactFetcher>,
    properties: Arc<BTreeMap<String, String>>,
    reporter: Arc<dyn Reporter>,
}

impl std::fmt::Debug for CoordinateResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoordinateResolver")
            .field("properties", &self.properties.len())
            .finish_non_exhaustive()
    }
}

impl CoordinateResolver {
    pub fn new(
        fetcher: Arc<dyn ArtifactFetcher>,
        properties: BTreeMap<String, String>,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        Self {
            fetcher,
            properties: Arc::new(properties),
            reporter,
        }
    }

    /// Same properties and reporter, different artifact source.
    pub fn with_fetcher(&self, fetcher: Arc<dyn ArtifactFetcher>) -> Self {
        Self {
            fetcher,
            properties: Arc::clone(&self.properties),
            reporter: Arc::clone(&self.reporter),
        }
    }

    /// Extend the property table; existing keys are kept.
    pub fn with_extra_properties(&self, extra: impl IntoIterator<Item = (String, String)>) -> Self {
        let mut properties = (*self.properties).clone();
        for (key, value) in extra {
            properties.entry(key).or_insert(value);
        }
        Self {
            fetcher: Arc::clone(&self.fetcher),
            properties: Arc::new(properties),
            reporter: Arc::clone(&self.reporter),
        }
    }

    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }

    /// Fetch `group:artifact:type:version` as given.
    pub async fn resolve(
        &self,
        group_id: &str,
        artifact_id: &str,
        kind: &str,
        version: &str,
    ) -> Result<PathBuf, ExecutionError> {
        self.resolve_coordinate(&Coordinate::new(group_id, artifact_id, kind, version))
            .await
    }

    pub async fn resolve_coordinate(&self, coordinate: &Coordinate) -> Result<PathBuf, ExecutionError> {
        self.reporter.debug(&format!("Resolving artifact {coordinate}"));
        match self.fetcher.fetch(coordinate).await {
            Ok(path) => {
                if self.reporter.is_debug_enabled() {
                    self.reporter
                        .debug(&format!("Resolved {coordinate} to {}", path.display()));
                }
                Ok(path)
            }
            Err(e) => {
                self.reporter
                    .debug_with(&format!("Could not resolve {coordinate}"), &e);
                Err(ExecutionError::fetch(coordinate, e))
            }
        }
    }

    /// Substitute `${...}` in group, artifact and version, then fetch.
    pub async fn resolve_with_substitution(
        &self,
        group_id: &str,
        artifact_id: &str,
        kind: &str,
        version: &str,
    ) -> Result<PathBuf, ExecutionError> {
        let coordinate = self.substitute(&Coordinate::new(group_id, artifact_id, kind, version))?;
        self.resolve_coordinate(&coordinate).await
    }

    /// Substitute placeholders in a coordinate without fetching it.
    pub fn substitute(&self, coordinate: &Coordinate) -> Result<Coordinate, ExecutionError> {
        Ok(substitute_coordinate(coordinate, &self.properties)?)
    }

    /// Substitute placeholders in a single value.
    pub fn substitute_value(&self, value: &str) -> Result<String, ExecutionError> {
        Ok(substitute(value, &self.properties)?)
    }

    /// Fetch a signature artifact.
    ///
    /// Signatures are ordinary artifacts; `esa` is the archive being
    /// verified and only appears in diagnostics.
    pub async fn resolve_signature(
        &self,
        esa: &Path,
        group_id: &str,
        artifact_id: &str,
        kind: &str,
        version: &str,
    ) -> Result<PathBuf, ExecutionError> {
        self.reporter
            .debug(&format!("Resolving signature for {}", esa.display()));
        self.resolve(group_id, artifact_id, kind, version).await
    }
}
