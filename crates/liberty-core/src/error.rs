//! Domain-specific errors for feature resolution and installation

use std::path::PathBuf;
use thiserror::Error;

use crate::strategy::Scenario;

/// Failure to retrieve an artifact from a repository.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Artifact {0} not found in any repository")]
    NotFound(String),

    #[error("Repository is offline and {0} is not in the local repository")]
    Offline(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status} fetching {url}")]
    Status { url: String, status: u16 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Checksum mismatch for {url}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        url: String,
        expected: String,
        actual: String,
    },
}

impl FetchError {
    /// Whether the artifact simply does not exist (as opposed to a transport failure).
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::Offline(_))
    }
}

/// A `${property}` reference with no value in the project property table.
#[derive(Error, Debug, PartialEq, Eq)]
#[error("Unresolved property '${{{property}}}' in '{value}'")]
pub struct SubstitutionError {
    pub property: String,
    pub value: String,
}

/// Signature verification failures.
#[derive(Error, Debug)]
pub enum SignatureError {
    #[error("No signature is published for feature {0}")]
    Missing(String),

    #[error("Signature of feature {0} does not match any configured key")]
    Invalid(String),

    #[error("Malformed signature for feature {feature}: {reason}")]
    Malformed { feature: String, reason: String },

    #[error("Could not load key {keyid} from {keyurl}: {reason}")]
    Key {
        keyid: String,
        keyurl: String,
        reason: String,
    },
}

/// Any failure while resolving artifacts, running an installer or touching
/// the filesystem. Always fatal for the current invocation.
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Failed to resolve {coordinate}: {source}")]
    Fetch {
        coordinate: String,
        #[source]
        source: FetchError,
    },

    #[error(transparent)]
    Substitution(#[from] SubstitutionError),

    #[error("Invalid coordinate: {0}")]
    Coordinate(#[from] liberty_schema::CoordinateError),

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid feature catalog {coordinate}: {source}")]
    Catalog {
        coordinate: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Feature '{0}' is not available in any feature catalog")]
    UnknownFeature(String),

    #[error("Invalid feature archive {path}: {reason}")]
    Archive { path: PathBuf, reason: String },

    #[error(transparent)]
    Signature(#[from] SignatureError),

    #[error("Could not find product properties in {0}")]
    NoProductProperties(PathBuf),

    #[error("No container engine (docker or podman) found on PATH")]
    NoContainerEngine,

    #[error("Failed to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}")]
    Installer { program: String, status: String },

    #[error("Feature preparation requires a runtime version")]
    MissingRuntimeVersion,
}

impl ExecutionError {
    /// Wrap a fetch failure with the coordinate that was being resolved.
    pub fn fetch(coordinate: impl std::fmt::Display, source: FetchError) -> Self {
        Self::Fetch {
            coordinate: coordinate.to_string(),
            source,
        }
    }

    /// Wrap an IO failure with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Problems with the project configuration, detected before any resolution.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("The install directory {0} does not exist")]
    MissingInstallDirectory(PathBuf),

    #[error("No local repository configured and the home directory cannot be resolved")]
    NoLocalRepository,
}

/// Outcome of trying to open an install session.
#[derive(Error, Debug)]
pub enum SessionError {
    /// A recognised condition that selects a strategy instead of failing.
    #[error("{0}")]
    Scenario(Scenario),

    #[error(transparent)]
    Execution(#[from] ExecutionError),
}

/// Top-level error of an invocation.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),
}
