//! Project manifest (`liberty.toml`) parsing.
//!
//! The manifest declares the runtime installation, the server, the
//! `[features]` section, signing keys, dependencies and repositories.
//! Relative paths are resolved against the directory holding the manifest.

use liberty_schema::{FeaturesConfig, KeyEntry};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::paths::{absolutize, try_local_repository};

/// Default manifest file name.
pub const MANIFEST_FILE: &str = "liberty.toml";

/// Top-level manifest as written on disk.
#[derive(Debug, Clone, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub project: ProjectSection,
    pub server: ServerSection,
    /// Absent section == license not accepted.
    #[serde(default)]
    pub features: Option<FeaturesConfig>,
    #[serde(default)]
    pub keys: BTreeMap<String, KeyEntry>,
    #[serde(default)]
    pub dependencies: Vec<Dependency>,
    #[serde(default)]
    pub dependency_management: Option<Vec<Dependency>>,
    #[serde(default)]
    pub repository: RepositorySection,
}

/// The `[project]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectSection {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_build_dir")]
    pub build_dir: PathBuf,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl Default for ProjectSection {
    fn default() -> Self {
        Self {
            name: None,
            build_dir: default_build_dir(),
            properties: BTreeMap::new(),
        }
    }
}

fn default_build_dir() -> PathBuf {
    PathBuf::from("target")
}

/// The `[server]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSection {
    pub install_dir: PathBuf,
    #[serde(default)]
    pub user_dir: Option<PathBuf>,
    #[serde(default = "default_server_name")]
    pub server_name: String,
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    #[serde(default)]
    pub skip: bool,
}

fn default_server_name() -> String {
    "defaultServer".to_string()
}

/// A `[[dependencies]]` or `[[dependency_management]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Dependency {
    pub group_id: String,
    pub artifact_id: String,
    #[serde(default)]
    pub version: String,
    #[serde(rename = "type", default = "default_dependency_type")]
    pub kind: String,
}

fn default_dependency_type() -> String {
    "jar".to_string()
}

impl Dependency {
    pub fn new(group_id: &str, artifact_id: &str, version: &str, kind: &str) -> Self {
        Self {
            group_id: group_id.to_string(),
            artifact_id: artifact_id.to_string(),
            version: version.to_string(),
            kind: kind.to_string(),
        }
    }
}

/// The `[repository]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RepositorySection {
    #[serde(default)]
    pub local: Option<PathBuf>,
    #[serde(default)]
    pub remotes: Vec<String>,
    #[serde(default)]
    pub offline: bool,
}

/// A manifest with every path made absolute and every default applied.
#[derive(Debug, Clone)]
pub struct Project {
    pub name: Option<String>,
    pub base_dir: PathBuf,
    pub build_dir: PathBuf,
    pub properties: BTreeMap<String, String>,
    pub install_dir: PathBuf,
    pub user_dir: PathBuf,
    pub server_name: String,
    pub output_dir: PathBuf,
    pub skip: bool,
    pub features: Option<FeaturesConfig>,
    pub keys: BTreeMap<String, KeyEntry>,
    pub dependencies: Vec<Dependency>,
    pub dependency_management: Option<Vec<Dependency>>,
    pub repository: RepositorySection,
}

impl Project {
    /// Load and resolve a manifest file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let manifest: Manifest = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        let base_dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        Ok(Self::from_manifest(manifest, &base_dir))
    }

    /// Apply defaults and make paths absolute relative to `base_dir`.
    pub fn from_manifest(manifest: Manifest, base_dir: &Path) -> Self {
        let install_dir = absolutize(base_dir, &manifest.server.install_dir);
        let user_dir = manifest
            .server
            .user_dir
            .map_or_else(|| install_dir.join("usr"), |p| absolutize(base_dir, &p));
        let output_dir = manifest
            .server
            .output_dir
            .map_or_else(|| user_dir.join("servers"), |p| absolutize(base_dir, &p));

        let mut repository = manifest.repository;
        repository.local = repository.local.map(|p| absolutize(base_dir, &p));

        Self {
            name: manifest.project.name,
            base_dir: base_dir.to_path_buf(),
            build_dir: absolutize(base_dir, &manifest.project.build_dir),
            properties: manifest.project.properties,
            install_dir,
            user_dir,
            server_name: manifest.server.server_name,
            output_dir,
            skip: manifest.server.skip,
            features: manifest.features,
            keys: manifest.keys,
            dependencies: manifest.dependencies,
            dependency_management: manifest.dependency_management,
            repository,
        }
    }

    /// `<user>/servers/<server name>`
    pub fn server_dir(&self) -> PathBuf {
        self.user_dir.join("servers").join(&self.server_name)
    }

    /// Property table used for `${...}` substitution.
    ///
    /// Declared properties win over the built-in `project.*` entries.
    pub fn property_table(&self) -> BTreeMap<String, String> {
        let mut table = BTreeMap::new();
        if let Some(name) = &self.name {
            table.insert("project.name".to_string(), name.clone());
        }
        table.insert(
            "project.build.directory".to_string(),
            self.build_dir.display().to_string(),
        );
        table.insert(
            "project.basedir".to_string(),
            self.base_dir.display().to_string(),
        );
        table.extend(self.properties.clone());
        table
    }

    /// Root of the local repository, from the manifest or the environment.
    pub fn local_repository(&self) -> Result<PathBuf, ConfigError> {
        self.repository
            .local
            .clone()
            .or_else(try_local_repository)
            .ok_or(ConfigError::NoLocalRepository)
    }

    /// Fail early if the runtime installation is missing.
    pub fn check_install_dir(&self) -> Result<(), ConfigError> {
        if self.install_dir.is_dir() {
            Ok(())
        } else {
            Err(ConfigError::MissingInstallDirectory(self.install_dir.clone()))
        }
    }
}
