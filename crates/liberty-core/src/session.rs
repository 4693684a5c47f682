//! Install sessions.
//!
//! An [`InstallSession`] is everything needed to install features through
//! the feature utility path: the runtime's feature catalog, any user feature
//! catalogs, the key ring and the verify policy. Opening one either succeeds,
//! fails with a recognised [`Scenario`], or fails outright.

use liberty_schema::catalog::split_versioned;
use liberty_schema::{
    Coordinate, FeatureCatalog, FeatureDescriptor, FeaturesPlatforms, KeyRecord, ProductProperties,
    VerifyPolicy, FEATURES_JSON_ARTIFACT_ID, OPEN_LIBERTY_FEATURES_GROUP,
};
use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::container::{ContainerEngine, ContainerInstall};
use crate::error::{ExecutionError, SessionError};
use crate::io::esa;
use crate::paths::{feature_manifests_dir, feature_target_dir};
use crate::reporter::Reporter;
use crate::resolver::CoordinateResolver;
use crate::signature::{KeyRing, SignatureVerifier};
use crate::strategy::Scenario;

const USER_FEATURE_PREFIX: &str = "usr:";

/// Inputs for opening a session.
#[derive(Debug, Clone, Default)]
pub struct SessionRequest {
    pub install_dir: PathBuf,
    pub output_dir: PathBuf,
    pub server_dir: PathBuf,
    /// Whether the project has a `[features]` section.
    pub features_configured: bool,
    pub esas: Vec<PathBuf>,
    pub properties: Vec<ProductProperties>,
    pub runtime_version: Option<String>,
    pub container: Option<String>,
    pub additional_jsons: Vec<Coordinate>,
    pub to: Option<String>,
    pub verify: VerifyPolicy,
    pub keys: Vec<KeyRecord>,
}

/// A feature catalog together with the coordinate it was published under.
#[derive(Debug, Clone)]
pub struct LoadedCatalog {
    pub coordinate: Coordinate,
    pub catalog: FeatureCatalog,
    /// User feature catalogs install into the `to` location.
    pub user: bool,
}

#[derive(Debug)]
enum Target {
    Local { catalogs: Vec<LoadedCatalog> },
    Container { name: String, engine: ContainerEngine },
}

/// A feature selected for installation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedFeature {
    pub descriptor: FeatureDescriptor,
    pub archive: Coordinate,
    pub user: bool,
}

/// What an install did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallReport {
    pub installed: Vec<String>,
    pub already_present: Vec<String>,
}

impl InstallReport {
    pub fn is_empty(&self) -> bool {
        self.installed.is_empty() && self.already_present.is_empty()
    }
}

pub struct InstallSession {
    request: SessionRequest,
    target: Target,
    verifier: SignatureVerifier,
    resolver: CoordinateResolver,
    reporter: Arc<dyn Reporter>,
}

impl std::fmt::Debug for InstallSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstallSession")
            .field("request", &self.request)
            .field("target", &self.target)
            .field("verify", &self.verifier.policy())
            .finish_non_exhaustive()
    }
}

impl InstallSession {
    /// Open a session.
    ///
    /// # Errors
    ///
    /// [`SessionError::Scenario`] when the feature utility cannot be used for
    /// a recognised reason, [`SessionError::Execution`] for anything else.
    pub async fn open(
        request: SessionRequest,
        resolver: CoordinateResolver,
        reporter: Arc<dyn Reporter>,
    ) -> Result<Self, SessionError> {
        if !request.features_configured {
            return Err(SessionError::Scenario(Scenario::LicenseNotAccepted));
        }
        reporter.info(&format!("Feature signature verify option: {}", request.verify));

        let target = match &request.container {
            Some(name) => Target::Container {
                name: name.clone(),
                engine: ContainerEngine::detect()?,
            },
            None => {
                let version = request
                    .runtime_version
                    .clone()
                    .ok_or(SessionError::Scenario(Scenario::NotOpenLiberty))?;
                let mut catalogs = vec![runtime_catalog(&resolver, &version).await?];
                for json in &request.additional_jsons {
                    catalogs.push(additional_catalog(&resolver, json).await?);
                }
                Target::Local { catalogs }
            }
        };

        let ring = if request.verify == VerifyPolicy::Skip || request.container.is_some() {
            KeyRing::default()
        } else {
            KeyRing::load(&request.keys, &reqwest::Client::new(), reporter.as_ref())
                .await
                .map_err(ExecutionError::from)?
        };
        let verifier = SignatureVerifier::new(request.verify, ring);

        Ok(Self {
            request,
            target,
            verifier,
            resolver,
            reporter,
        })
    }

    pub fn request(&self) -> &SessionRequest {
        &self.request
    }

    pub fn container(&self) -> Option<&str> {
        self.request.container.as_deref()
    }

    pub fn verify_policy(&self) -> VerifyPolicy {
        self.verifier.policy()
    }

    /// Loaded catalogs; empty when targeting a container.
    pub fn catalogs(&self) -> &[LoadedCatalog] {
        match &self.target {
            Target::Local { catalogs } => catalogs.as_slice(),
            Target::Container { .. } => &[],
        }
    }

    /// Where user features are extracted to.
    pub fn user_feature_root(&self) -> PathBuf {
        feature_target_dir(&self.request.install_dir, self.request.to.as_deref())
    }

    /// Install `requested` plus the session's archive files.
    pub async fn install(&self, requested: &FeaturesPlatforms) -> Result<InstallReport, ExecutionError> {
        match &self.target {
            Target::Container { name, engine } => self.install_in_container(name, engine, requested).await,
            Target::Local { .. } => self.install_local(requested).await,
        }
    }

    async fn install_in_container(
        &self,
        name: &str,
        engine: &ContainerEngine,
        requested: &FeaturesPlatforms,
    ) -> Result<InstallReport, ExecutionError> {
        for esa in &self.request.esas {
            self.reporter.warn(&format!(
                "Feature archive {} cannot be installed into a container and is ignored",
                esa.display()
            ));
        }
        let features: Vec<String> = requested.features().iter().cloned().collect();
        if features.is_empty() {
            return Ok(InstallReport::default());
        }

        let request = ContainerInstall {
            features: features.clone(),
            to: self.request.to.as_deref(),
            verify: self.verifier.policy(),
        };
        engine.install_features(name, &request, self.reporter.as_ref()).await?;
        Ok(InstallReport {
            installed: features,
            already_present: Vec::new(),
        })
    }

    async fn install_local(&self, requested: &FeaturesPlatforms) -> Result<InstallReport, ExecutionError> {
        let plan = self.plan(requested)?;
        let user_root = self.user_feature_root();
        let mut present = installed_features(&[self.request.install_dir.as_path(), user_root.as_path()]);
        let mut report = InstallReport::default();

        for feature in plan {
            let name = feature.descriptor.display_name().to_string();
            if present.contains(&feature.descriptor.symbolic_name.to_lowercase()) {
                self.reporter.debug(&format!("Feature {name} is already installed"));
                report.already_present.push(name);
                continue;
            }

            let archive = self.resolver.resolve_coordinate(&feature.archive).await?;
            self.verifier
                .verify_artifact(
                    &self.resolver,
                    &archive,
                    &feature.archive,
                    &name,
                    self.reporter.as_ref(),
                )
                .await?;

            let root = if feature.user {
                user_root.as_path()
            } else {
                self.request.install_dir.as_path()
            };
            let extracted = esa::extract(&archive, root)?;
            self.reporter.info(&format!(
                "Installed feature {name} ({} files) into {}",
                extracted.files,
                root.display()
            ));
            present.insert(feature.descriptor.symbolic_name.to_lowercase());
            report.installed.push(name);
        }

        for path in &self.request.esas {
            let manifest = esa::read_manifest(path)?;
            let name = manifest
                .short_name
                .clone()
                .unwrap_or_else(|| manifest.symbolic_name.clone());
            if present.contains(&manifest.symbolic_name.to_lowercase()) {
                report.already_present.push(name);
                continue;
            }
            self.verifier.verify_file(path, &name, self.reporter.as_ref())?;
            esa::extract(path, &user_root)?;
            self.reporter
                .info(&format!("Installed feature {name} from {}", path.display()));
            present.insert(manifest.symbolic_name.to_lowercase());
            report.installed.push(name);
        }

        if report.installed.is_empty() {
            self.reporter.info("All requested features are already installed");
        }
        Ok(report)
    }

    /// Resolve requested names against the catalogs and expand requirements.
    ///
    /// Dependencies come before the features that require them.
    pub fn plan(&self, requested: &FeaturesPlatforms) -> Result<Vec<PlannedFeature>, ExecutionError> {
        let platforms: BTreeSet<String> = requested
            .platforms()
            .iter()
            .map(|p| p.to_lowercase())
            .collect();
        let mut planned = Vec::new();
        let mut seen = HashSet::new();

        for name in requested.features() {
            self.plan_feature(strip_user_prefix(name), &platforms, &mut seen, &mut planned)?;
        }
        Ok(planned)
    }

    fn plan_feature(
        &self,
        name: &str,
        platforms: &BTreeSet<String>,
        seen: &mut HashSet<String>,
        planned: &mut Vec<PlannedFeature>,
    ) -> Result<(), ExecutionError> {
        let (catalog, descriptor) = self
            .lookup(name, platforms)
            .ok_or_else(|| ExecutionError::UnknownFeature(name.to_string()))?;
        if !seen.insert(descriptor.symbolic_name.to_lowercase()) {
            return Ok(());
        }
        for required in &descriptor.requires {
            self.plan_feature(strip_user_prefix(required), platforms, seen, planned)?;
        }
        planned.push(PlannedFeature {
            descriptor: descriptor.clone(),
            archive: descriptor.archive_coordinate(&catalog.coordinate),
            user: catalog.user,
        });
        Ok(())
    }

    /// Exact name match first; a versionless name picks the highest version
    /// on one of `platforms`, or the highest version overall.
    fn lookup(
        &self,
        name: &str,
        platforms: &BTreeSet<String>,
    ) -> Option<(&LoadedCatalog, &FeatureDescriptor)> {
        let catalogs = self.catalogs();
        if let Some(hit) = catalogs
            .iter()
            .find_map(|c| c.catalog.find(name).map(|f| (c, f)))
        {
            return Some(hit);
        }
        if split_versioned(name).is_some() {
            return None;
        }

        let candidates: Vec<(&LoadedCatalog, &FeatureDescriptor)> = catalogs
            .iter()
            .flat_map(|c| c.catalog.versions_of(name).into_iter().map(move |f| (c, f)))
            .collect();
        let on_platform: Vec<_> = candidates
            .iter()
            .copied()
            .filter(|(_, f)| {
                f.platforms
                    .iter()
                    .any(|p| platforms.contains(&p.to_lowercase()))
            })
            .collect();
        let pool = if on_platform.is_empty() {
            candidates
        } else {
            on_platform
        };
        pool.into_iter()
            .max_by(|a, b| version_key(a.1).cmp(&version_key(b.1)))
    }
}

async fn runtime_catalog(resolver: &CoordinateResolver, version: &str) -> Result<LoadedCatalog, SessionError> {
    let coordinate = Coordinate::new(
        OPEN_LIBERTY_FEATURES_GROUP,
        FEATURES_JSON_ARTIFACT_ID,
        "json",
        version,
    );
    let path = match resolver.resolve_coordinate(&coordinate).await {
        Ok(path) => path,
        Err(ExecutionError::Fetch { source, .. }) if source.is_missing() => {
            return Err(SessionError::Scenario(Scenario::CatalogUnavailable {
                coordinate: coordinate.to_string(),
            }));
        }
        Err(e) => return Err(e.into()),
    };
    Ok(LoadedCatalog {
        catalog: read_catalog(&path, &coordinate)?,
        coordinate,
        user: false,
    })
}

async fn additional_catalog(resolver: &CoordinateResolver, json: &Coordinate) -> Result<LoadedCatalog, ExecutionError> {
    let coordinate = resolver.substitute(json)?;
    let path = resolver.resolve_coordinate(&coordinate).await?;
    Ok(LoadedCatalog {
        catalog: read_catalog(&path, &coordinate)?,
        coordinate,
        user: true,
    })
}

fn read_catalog(path: &Path, coordinate: &Coordinate) -> Result<FeatureCatalog, ExecutionError> {
    let text = std::fs::read_to_string(path).map_err(|e| ExecutionError::io(path, e))?;
    FeatureCatalog::from_json(&text).map_err(|source| ExecutionError::Catalog {
        coordinate: coordinate.to_string(),
        source,
    })
}

fn strip_user_prefix(name: &str) -> &str {
    name.strip_prefix(USER_FEATURE_PREFIX).unwrap_or(name)
}

fn version_key(feature: &FeatureDescriptor) -> Vec<u64> {
    feature
        .short_name
        .as_deref()
        .and_then(split_versioned)
        .map(|(_, v)| v.split('.').map(|p| p.parse().unwrap_or(0)).collect())
        .unwrap_or_default()
}

/// Lowercased symbolic names of features with a manifest under any root.
pub fn installed_features(roots: &[&Path]) -> HashSet<String> {
    let mut names = HashSet::new();
    for root in roots {
        let dir = feature_manifests_dir(root);
        for entry in walkdir::WalkDir::new(&dir)
            .max_depth(1)
            .into_iter()
            .flatten()
        {
            let path = entry.path();
            if entry.file_type().is_file() && path.extension().is_some_and(|e| e == "mf") {
                if let Some(stem) = path.file_stem() {
                    names.insert(stem.to_string_lossy().to_lowercase());
                }
            }
        }
    }
    names
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::io::esa::write_test_esa;
    use crate::io::repository::{ArtifactPublisher, LocalRepository};
    use crate::reporter::{MemoryReporter, NullReporter};
    use std::collections::BTreeMap;
    use std::fs;

    pub(crate) const RUNTIME_CATALOG: &str = r#"[
  {"symbolicName": "com.ibm.websphere.appserver.servlet-4.0", "shortName": "servlet-4.0", "platforms": ["javaee-8.0"]},
  {"symbolicName": "com.ibm.websphere.appserver.servlet-6.0", "shortName": "servlet-6.0", "platforms": ["jakartaee-10.0"]},
  {"symbolicName": "com.ibm.websphere.appserver.jsp-2.3", "shortName": "jsp-2.3", "requires": ["servlet-4.0"]}
]"#;

    pub(crate) fn manifest(symbolic: &str, short: &str) -> String {
        format!("Subsystem-SymbolicName: {symbolic}; visibility:=public\nIBM-ShortName: {short}\n")
    }

    /// A local repository holding the runtime catalog and its archives.
    pub(crate) fn seeded_repository(root: &Path, version: &str) -> LocalRepository {
        let repo = LocalRepository::new(root.join("repo"));
        let scratch = root.join("scratch");
        fs::create_dir_all(&scratch).unwrap();

        let catalog = scratch.join("features.json");
        fs::write(&catalog, RUNTIME_CATALOG).unwrap();
        repo.publish(
            &Coordinate::new(OPEN_LIBERTY_FEATURES_GROUP, "features", "json", version),
            &catalog,
        )
        .unwrap();

        for (symbolic, short) in [
            ("com.ibm.websphere.appserver.servlet-4.0", "servlet-4.0"),
            ("com.ibm.websphere.appserver.servlet-6.0", "servlet-6.0"),
            ("com.ibm.websphere.appserver.jsp-2.3", "jsp-2.3"),
        ] {
            let esa = scratch.join(format!("{short}.esa"));
            let jar = format!("lib/{short}.jar");
            write_test_esa(&esa, &manifest(symbolic, short), &[(jar.as_str(), "jar")]);
            repo.publish(
                &Coordinate::new(OPEN_LIBERTY_FEATURES_GROUP, symbolic, "esa", version),
                &esa,
            )
            .unwrap();
        }
        repo
    }

    fn request(root: &Path) -> SessionRequest {
        SessionRequest {
            install_dir: root.join("wlp"),
            features_configured: true,
            runtime_version: Some("24.0.0.1".to_string()),
            verify: VerifyPolicy::Skip,
            ..SessionRequest::default()
        }
    }

    fn resolver(repo: LocalRepository) -> CoordinateResolver {
        CoordinateResolver::new(Arc::new(repo), BTreeMap::new(), Arc::new(NullReporter))
    }

    fn features(names: &[&str], platforms: &[&str]) -> FeaturesPlatforms {
        FeaturesPlatforms::new(
            names.iter().map(|s| s.to_string()).collect(),
            platforms.iter().map(|s| s.to_string()).collect(),
        )
    }

    #[tokio::test]
    async fn test_open_without_features_section() {
        let dir = tempfile::tempdir().unwrap();
        let mut req = request(dir.path());
        req.features_configured = false;
        let err = InstallSession::open(req, resolver(LocalRepository::new(dir.path())), Arc::new(NullReporter))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Scenario(Scenario::LicenseNotAccepted)));
    }

    #[tokio::test]
    async fn test_open_without_runtime_version() {
        let dir = tempfile::tempdir().unwrap();
        let mut req = request(dir.path());
        req.runtime_version = None;
        let err = InstallSession::open(req, resolver(LocalRepository::new(dir.path())), Arc::new(NullReporter))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Scenario(Scenario::NotOpenLiberty)));
    }

    #[tokio::test]
    async fn test_open_with_missing_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let err = InstallSession::open(
            request(dir.path()),
            resolver(LocalRepository::new(dir.path())),
            Arc::new(NullReporter),
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            SessionError::Scenario(Scenario::CatalogUnavailable { ref coordinate })
                if coordinate == "io.openliberty.features:features:json:24.0.0.1"
        ));
    }

    #[tokio::test]
    async fn test_missing_additional_catalog_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let repo = seeded_repository(dir.path(), "24.0.0.1");
        let mut req = request(dir.path());
        req.additional_jsons = vec![Coordinate::new("com.example", "features", "json", "1.0")];

        let err = InstallSession::open(req, resolver(repo), Arc::new(NullReporter))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Execution(ExecutionError::Fetch { .. })));
    }

    #[tokio::test]
    async fn test_open_logs_verify_option() {
        let dir = tempfile::tempdir().unwrap();
        let repo = seeded_repository(dir.path(), "24.0.0.1");
        let reporter = Arc::new(MemoryReporter::default());
        InstallSession::open(request(dir.path()), resolver(repo), reporter.clone())
            .await
            .unwrap();
        assert!(reporter.contains("info", "Feature signature verify option: skip"));
    }

    #[tokio::test]
    async fn test_plan_expands_requirements_and_platforms() {
        let dir = tempfile::tempdir().unwrap();
        let repo = seeded_repository(dir.path(), "24.0.0.1");
        let session = InstallSession::open(request(dir.path()), resolver(repo), Arc::new(NullReporter))
            .await
            .unwrap();

        let plan = session.plan(&features(&["JSP-2.3"], &[])).unwrap();
        let names: Vec<_> = plan.iter().map(|p| p.descriptor.display_name()).collect();
        assert_eq!(names, ["servlet-4.0", "jsp-2.3"]);

        let on_platform = session.plan(&features(&["servlet"], &["JavaEE-8.0"])).unwrap();
        assert_eq!(on_platform[0].descriptor.display_name(), "servlet-4.0");
        let highest = session.plan(&features(&["servlet"], &[])).unwrap();
        assert_eq!(highest[0].descriptor.display_name(), "servlet-6.0");

        assert!(matches!(
            session.plan(&features(&["mpHealth-4.0"], &[])),
            Err(ExecutionError::UnknownFeature(_))
        ));
    }

    #[tokio::test]
    async fn test_install_extracts_and_skips_present() {
        let dir = tempfile::tempdir().unwrap();
        let repo = seeded_repository(dir.path(), "24.0.0.1");
        let session = InstallSession::open(request(dir.path()), resolver(repo), Arc::new(NullReporter))
            .await
            .unwrap();

        let first = session.install(&features(&["jsp-2.3"], &[])).await.unwrap();
        assert_eq!(first.installed, ["servlet-4.0", "jsp-2.3"]);
        let wlp = dir.path().join("wlp");
        assert!(wlp.join("lib/jsp-2.3.jar").exists());
        assert!(wlp
            .join("lib/features/com.ibm.websphere.appserver.servlet-4.0.mf")
            .exists());

        let second = session.install(&features(&["jsp-2.3"], &[])).await.unwrap();
        assert!(second.installed.is_empty());
        assert_eq!(second.already_present.len(), 2);
    }

    #[tokio::test]
    async fn test_install_local_archive_into_user_root() {
        let dir = tempfile::tempdir().unwrap();
        let repo = seeded_repository(dir.path(), "24.0.0.1");
        let esa = dir.path().join("local/acme.esa");
        write_test_esa(
            &esa,
            &manifest("com.acme.feature-1.0", "acme-1.0"),
            &[("lib/acme.jar", "jar")],
        );

        let mut req = request(dir.path());
        req.esas = vec![esa];
        let session = InstallSession::open(req, resolver(repo), Arc::new(NullReporter))
            .await
            .unwrap();

        let report = session.install(&FeaturesPlatforms::empty()).await.unwrap();
        assert_eq!(report.installed, ["acme-1.0"]);
        assert!(dir.path().join("wlp/usr/extension/lib/acme.jar").exists());
    }

    #[test]
    fn test_installed_features_reads_manifests() {
        let dir = tempfile::tempdir().unwrap();
        let features = feature_manifests_dir(dir.path());
        fs::create_dir_all(&features).unwrap();
        fs::write(features.join("Com.Example.X-1.0.mf"), "").unwrap();
        fs::write(features.join("notes.txt"), "").unwrap();

        let missing = dir.path().join("missing");
        let found = installed_features(&[dir.path(), missing.as_path()]);
        assert_eq!(found, HashSet::from(["com.example.x-1.0".to_string()]));
    }
}
