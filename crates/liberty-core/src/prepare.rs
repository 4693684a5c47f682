//! Feature preparation: pre-fetching user features listed by BOMs.
//!
//! A features BOM is a POM whose dependencies are feature archives. Preparing
//! it downloads every archive into the local repository and publishes a
//! `features.json` catalog describing them next to the BOM, at
//! `<group>:features:json:<version>`, where an install picks it up as an
//! additional catalog.

use liberty_schema::{Coordinate, FeatureCatalog, FEATURES_JSON_ARTIFACT_ID};
use regex::Regex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use crate::error::ExecutionError;
use crate::inventory::is_features_bom;
use crate::io::esa;
use crate::io::repository::ArtifactPublisher;
use crate::project::Dependency;
use crate::reporter::Reporter;
use crate::resolver::CoordinateResolver;

static COMMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());
static DEPENDENCY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<dependency>(.*?)</dependency>").unwrap());
static PROPERTIES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<properties>(.*?)</properties>").unwrap());
static ELEMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<([A-Za-z0-9_.\-]+)>([^<]*)</([A-Za-z0-9_.\-]+)>").unwrap());

/// Every features BOM in dependency management, as `group:artifact:version`.
///
/// Placeholders are kept; they are substituted when the BOM is fetched.
pub fn list_dependency_boms(dependency_management: Option<&[Dependency]>, reporter: &dyn Reporter) -> Vec<String> {
    let boms: Vec<String> = dependency_management
        .unwrap_or_default()
        .iter()
        .filter(|d| is_features_bom(d))
        .map(|d| format!("{}:{}:{}", d.group_id, d.artifact_id, d.version))
        .collect();
    for bom in &boms {
        reporter.debug(&format!("Found features BOM {bom}"));
    }
    boms
}

/// The parts of a POM that preparation reads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pom {
    pub properties: BTreeMap<String, String>,
    pub dependencies: Vec<Dependency>,
}

impl Pom {
    pub fn parse(text: &str) -> Self {
        let text = COMMENT.replace_all(text, "");

        let properties = PROPERTIES
            .captures(&text)
            .and_then(|c| c.get(1))
            .map(|body| elements(body.as_str()))
            .unwrap_or_default();

        let dependencies = DEPENDENCY
            .captures_iter(&text)
            .filter_map(|c| c.get(1))
            .filter_map(|body| {
                let fields = elements(body.as_str());
                Some(Dependency::new(
                    fields.get("groupId")?,
                    fields.get("artifactId")?,
                    fields.get("version").map_or("", String::as_str),
                    fields.get("type").map_or("jar", String::as_str),
                ))
            })
            .collect();

        Self {
            properties,
            dependencies,
        }
    }
}

/// `<name>value</name>` pairs directly in `body`.
fn elements(body: &str) -> BTreeMap<String, String> {
    ELEMENT
        .captures_iter(body)
        .filter_map(|c| {
            let (open, value, close) = (c.get(1)?, c.get(2)?, c.get(3)?);
            (open.as_str() == close.as_str())
                .then(|| (open.as_str().to_string(), value.as_str().trim().to_string()))
        })
        .collect()
}

/// One prepared BOM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedBom {
    pub bom: Coordinate,
    pub catalog: Coordinate,
    pub catalog_path: PathBuf,
    pub features: Vec<String>,
}

/// Downloads BOM-listed features for one runtime version.
pub struct PrepareSession {
    install_dir: PathBuf,
    runtime_version: String,
    work_dir: PathBuf,
    resolver: CoordinateResolver,
    publisher: Arc<dyn ArtifactPublisher>,
    reporter: Arc<dyn Reporter>,
}

impl std::fmt::Debug for PrepareSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrepareSession")
            .field("install_dir", &self.install_dir)
            .field("runtime_version", &self.runtime_version)
            .field("work_dir", &self.work_dir)
            .finish_non_exhaustive()
    }
}

impl PrepareSession {
    /// `work_dir` holds generated catalogs before they are published.
    pub fn open(
        install_dir: PathBuf,
        runtime_version: &str,
        work_dir: PathBuf,
        resolver: CoordinateResolver,
        publisher: Arc<dyn ArtifactPublisher>,
        reporter: Arc<dyn Reporter>,
    ) -> Result<Self, ExecutionError> {
        let runtime_version = runtime_version.trim();
        if runtime_version.is_empty() {
            return Err(ExecutionError::MissingRuntimeVersion);
        }
        reporter.debug(&format!(
            "Preparing features for runtime {runtime_version} at {}",
            install_dir.display()
        ));
        Ok(Self {
            install_dir,
            runtime_version: runtime_version.to_string(),
            work_dir,
            resolver,
            publisher,
            reporter,
        })
    }

    pub fn install_dir(&self) -> &Path {
        &self.install_dir
    }

    pub fn runtime_version(&self) -> &str {
        &self.runtime_version
    }

    /// Prepare every BOM, in order. The first failure aborts.
    pub async fn prepare(&self, boms: &[String]) -> Result<Vec<PreparedBom>, ExecutionError> {
        let mut prepared = Vec::with_capacity(boms.len());
        for bom in boms {
            prepared.push(self.prepare_bom(bom).await?);
        }
        Ok(prepared)
    }

    async fn prepare_bom(&self, bom: &str) -> Result<PreparedBom, ExecutionError> {
        let bom = self.resolver.substitute(&Coordinate::parse(bom, "pom")?)?;
        self.reporter.info(&format!("Preparing features from {}", bom.gav()));

        let artifacts = self.download_artifacts_from_bom(&bom).await?;
        let mut descriptors = Vec::with_capacity(artifacts.len());
        for (coordinate, path) in &artifacts {
            let manifest = esa::read_manifest(path)?;
            descriptors.push(manifest.to_descriptor(
                &coordinate.group_id,
                &coordinate.artifact_id,
                &coordinate.version,
            ));
        }
        let features = descriptors
            .iter()
            .map(|d| d.display_name().to_string())
            .collect();

        let catalog = Coordinate::new(
            bom.group_id.clone(),
            FEATURES_JSON_ARTIFACT_ID,
            "json",
            bom.version.clone(),
        );
        let json = FeatureCatalog::new(descriptors)
            .to_json()
            .map_err(|source| ExecutionError::Catalog {
                coordinate: catalog.to_string(),
                source,
            })?;

        std::fs::create_dir_all(&self.work_dir).map_err(|e| ExecutionError::io(&self.work_dir, e))?;
        let scratch = self.work_dir.join(catalog.file_name());
        std::fs::write(&scratch, json).map_err(|e| ExecutionError::io(&scratch, e))?;
        let catalog_path = self
            .publisher
            .publish(&catalog, &scratch)
            .map_err(|e| ExecutionError::fetch(&catalog, e))?;
        self.reporter
            .info(&format!("Published feature catalog {catalog}"));

        Ok(PreparedBom {
            bom,
            catalog,
            catalog_path,
            features,
        })
    }

    /// Fetch a BOM and every feature archive it lists.
    ///
    /// Dependency coordinates are substituted against the project properties,
    /// then the BOM's own `<properties>` and `project.*` values.
    pub async fn download_artifacts_from_bom(
        &self,
        bom: &Coordinate,
    ) -> Result<Vec<(Coordinate, PathBuf)>, ExecutionError> {
        let pom_path = self.resolver.resolve_coordinate(&bom.with_kind("pom")).await?;
        let text = std::fs::read_to_string(&pom_path).map_err(|e| ExecutionError::io(&pom_path, e))?;
        let pom = Pom::parse(&text);

        let resolver = self.resolver.with_extra_properties(
            pom.properties
                .into_iter()
                .chain([
                    ("project.groupId".to_string(), bom.group_id.clone()),
                    ("project.artifactId".to_string(), bom.artifact_id.clone()),
                    ("project.version".to_string(), bom.version.clone()),
                ]),
        );

        let mut downloaded = Vec::new();
        for dependency in pom.dependencies.iter().filter(|d| d.kind == "esa") {
            let coordinate = resolver.substitute(&Coordinate::new(
                dependency.group_id.clone(),
                dependency.artifact_id.clone(),
                dependency.kind.clone(),
                dependency.version.clone(),
            ))?;
            let path = resolver.resolve_coordinate(&coordinate).await?;
            self.reporter.debug(&format!("Downloaded {coordinate}"));
            downloaded.push((coordinate, path));
        }
        Ok(downloaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::esa::write_test_esa;
    use crate::io::repository::{ArtifactFetcher, LocalRepository};
    use crate::reporter::NullReporter;
    use std::fs;

    const BOM: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<project>
  <groupId>com.example</groupId>
  <artifactId>features-bom</artifactId>
  <version>1.0</version>
  <packaging>pom</packaging>
  <properties>
    <acme.version>2.1</acme.version>
  </properties>
  <dependencyManagement>
    <dependencies>
      <dependency>
        <groupId>com.example</groupId>
        <artifactId>acme</artifactId>
        <version>${acme.version}</version>
        <type>esa</type>
      </dependency>
      <dependency>
        <groupId>${project.groupId}</groupId>
        <artifactId>tools</artifactId>
        <version>${project.version}</version>
        <type>esa</type>
      </dependency>
      <!-- <dependency><groupId>x</groupId><artifactId>ignored</artifactId><type>esa</type></dependency> -->
      <dependency>
        <groupId>com.example</groupId>
        <artifactId>helper</artifactId>
        <version>1.0</version>
      </dependency>
    </dependencies>
  </dependencyManagement>
</project>"#;

    #[test]
    fn test_list_dependency_boms() {
        let dm = [
            Dependency::new("com.example", "features-bom", "1.0", "pom"),
            Dependency::new("com.example", "lib", "1.0", "jar"),
        ];
        assert_eq!(
            list_dependency_boms(Some(&dm), &NullReporter),
            ["com.example:features-bom:1.0"]
        );
        assert!(list_dependency_boms(None, &NullReporter).is_empty());
    }

    #[test]
    fn test_listing_keeps_placeholders() {
        let dm = [Dependency::new("com.example", "features-bom", "${bom.version}", "pom")];
        assert_eq!(
            list_dependency_boms(Some(&dm), &NullReporter),
            ["com.example:features-bom:${bom.version}"]
        );
    }

    #[test]
    fn test_parse_pom() {
        let pom = Pom::parse(BOM);
        assert_eq!(pom.properties["acme.version"], "2.1");
        assert_eq!(pom.dependencies.len(), 3);
        assert_eq!(
            pom.dependencies[0],
            Dependency::new("com.example", "acme", "${acme.version}", "esa")
        );
        assert_eq!(pom.dependencies[2].kind, "jar");
    }

    fn seed(root: &Path) -> LocalRepository {
        let repo = LocalRepository::new(root.join("repo"));
        let scratch = root.join("scratch");
        fs::create_dir_all(&scratch).unwrap();

        let bom = scratch.join("bom.pom");
        fs::write(&bom, BOM).unwrap();
        repo.publish(&Coordinate::new("com.example", "features-bom", "pom", "1.0"), &bom)
            .unwrap();

        for (artifact, version, symbolic) in [
            ("acme", "2.1", "com.example.acme-2.1"),
            ("tools", "1.0", "com.example.tools-1.0"),
        ] {
            let esa = scratch.join(format!("{artifact}.esa"));
            let manifest = format!(
                "Subsystem-SymbolicName: {symbolic}\nIBM-ShortName: {artifact}-{version}\n"
            );
            write_test_esa(&esa, &manifest, &[]);
            repo.publish(&Coordinate::new("com.example", artifact, "esa", version), &esa)
                .unwrap();
        }
        repo
    }

    fn session(root: &Path, repo: LocalRepository) -> PrepareSession {
        let repo = Arc::new(repo);
        let properties = BTreeMap::from([("bom.version".to_string(), "1.0".to_string())]);
        let resolver = CoordinateResolver::new(repo.clone(), properties, Arc::new(NullReporter));
        PrepareSession::open(
            root.join("wlp"),
            "24.0.0.1",
            root.join("work"),
            resolver,
            repo,
            Arc::new(NullReporter),
        )
        .unwrap()
    }

    #[test]
    fn test_open_requires_version() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Arc::new(LocalRepository::new(dir.path()));
        let resolver = CoordinateResolver::new(repo.clone(), BTreeMap::new(), Arc::new(NullReporter));
        let err = PrepareSession::open(
            dir.path().to_path_buf(),
            " ",
            dir.path().join("work"),
            resolver,
            repo,
            Arc::new(NullReporter),
        )
        .unwrap_err();
        assert!(matches!(err, ExecutionError::MissingRuntimeVersion));
    }

    #[tokio::test]
    async fn test_download_artifacts_from_bom() {
        let dir = tempfile::tempdir().unwrap();
        let session = session(dir.path(), seed(dir.path()));

        let bom = Coordinate::new("com.example", "features-bom", "pom", "1.0");
        let artifacts = session.download_artifacts_from_bom(&bom).await.unwrap();
        let coordinates: Vec<String> = artifacts.iter().map(|(c, _)| c.to_string()).collect();
        assert_eq!(
            coordinates,
            ["com.example:acme:esa:2.1", "com.example:tools:esa:1.0"]
        );
    }

    #[tokio::test]
    async fn test_prepare_publishes_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let repo = seed(dir.path());
        let local = repo.clone();
        let session = session(dir.path(), repo);

        let prepared = session
            .prepare(&["com.example:features-bom:${bom.version}".to_string()])
            .await
            .unwrap();
        assert_eq!(prepared.len(), 1);
        assert_eq!(prepared[0].features, ["acme-2.1", "tools-1.0"]);

        let catalog_path = local
            .fetch(&Coordinate::new("com.example", "features", "json", "1.0"))
            .await
            .unwrap();
        let catalog = FeatureCatalog::from_json(&fs::read_to_string(catalog_path).unwrap()).unwrap();
        let acme = catalog.find("acme-2.1").unwrap();
        assert_eq!(
            acme.archive_coordinate(&prepared[0].catalog),
            Coordinate::new("com.example", "acme", "esa", "2.1")
        );
    }

    #[tokio::test]
    async fn test_missing_bom_fails() {
        let dir = tempfile::tempdir().unwrap();
        let session = session(dir.path(), LocalRepository::new(dir.path().join("empty")));
        let err = session
            .prepare(&["com.example:features-bom:1.0".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutionError::Fetch { .. }));
    }
}
