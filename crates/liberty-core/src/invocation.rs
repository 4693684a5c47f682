//! One run of a feature goal against one project.
//!
//! [`Invocation`] owns everything scoped to a single run: the project, the
//! injected artifact source and server feature reader, and the lazily opened
//! install and prepare sessions. Nothing outlives it.

use liberty_schema::product::open_liberty_version;
use liberty_schema::{Coordinate, FeatureSpec, FeaturesPlatforms, ProductProperties};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{ConfigError, Error, ExecutionError, SessionError};
use crate::inventory::{
    additional_json_list, aggregate, dependency_features, plugin_listed_entries, plugin_listed_esas,
    plugin_listed_features,
};
use crate::io::repository::{ArtifactFetcher, ArtifactPublisher, FetcherChain, LocalRepository, Repository};
use crate::keys::build_key_map;
use crate::legacy::LegacyInstaller;
use crate::paths::{absolutize, versions_dir};
use crate::prepare::{list_dependency_boms, PrepareSession, PreparedBom};
use crate::project::Project;
use crate::reporter::Reporter;
use crate::resolver::CoordinateResolver;
use crate::server::{FeatureResolver, ServerConfigScanner};
use crate::session::{InstallReport, InstallSession, SessionRequest};
use crate::strategy::Strategy;

const PREPARE_WORK_DIR: &str = "liberty-prepare";

/// What `install_features` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    /// Nothing was attempted; the message says why.
    Skipped(String),
    /// The feature set was empty.
    NothingToInstall,
    /// Installed through the feature utility session.
    Installed(InstallReport),
    /// Handed to the runtime's bundled installer.
    Legacy { features: Vec<String> },
}

/// A single install-feature or prepare-feature run.
pub struct Invocation {
    project: Project,
    fetcher: Arc<dyn ArtifactFetcher>,
    resolver: CoordinateResolver,
    features: Arc<dyn FeatureResolver>,
    publisher: Arc<dyn ArtifactPublisher>,
    reporter: Arc<dyn Reporter>,
    strategy: Option<Strategy>,
    prepare: Option<PrepareSession>,
}

impl std::fmt::Debug for Invocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Invocation")
            .field("project", &self.project)
            .field("strategy", &self.strategy)
            .finish_non_exhaustive()
    }
}

impl Invocation {
    pub fn new(
        project: Project,
        fetcher: Arc<dyn ArtifactFetcher>,
        features: Arc<dyn FeatureResolver>,
        publisher: Arc<dyn ArtifactPublisher>,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        let resolver = CoordinateResolver::new(
            Arc::clone(&fetcher),
            project.property_table(),
            Arc::clone(&reporter),
        );
        Self {
            project,
            fetcher,
            resolver,
            features,
            publisher,
            reporter,
            strategy: None,
            prepare: None,
        }
    }

    /// Wire up the project's repositories and the server configuration scanner.
    pub fn from_project(project: Project, reporter: Arc<dyn Reporter>) -> Result<Self, ConfigError> {
        let repository = Arc::new(Repository::from_urls(
            project.local_repository()?,
            &project.repository.remotes,
            project.repository.offline,
            &reporter,
        ));
        let scanner = Arc::new(ServerConfigScanner::new(
            project.install_dir.clone(),
            project.user_dir.clone(),
            Arc::clone(&reporter),
        ));
        Ok(Self::new(project, repository.clone(), scanner, repository, reporter))
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    /// The selected strategy, once [`Self::ensure_session`] has run.
    pub fn strategy(&self) -> Option<&Strategy> {
        self.strategy.as_ref()
    }

    /// Checks made before any resolution. Returns `false` when the goal is
    /// configured to be skipped.
    pub fn initialize(&self, container: Option<&str>) -> Result<bool, ConfigError> {
        if self.project.skip {
            self.reporter.info("Skipping install-feature goal.");
            return Ok(false);
        }
        if container.is_none() {
            self.project.check_install_dir()?;
        }
        Ok(true)
    }

    /// The strategy for this invocation, selecting it on first use.
    pub async fn ensure_session(&mut self, container: Option<&str>) -> Result<&Strategy, ExecutionError> {
        let strategy = match self.strategy.take() {
            Some(strategy) => strategy,
            None => self.select_strategy(container).await?,
        };
        Ok(&*self.strategy.insert(strategy))
    }

    async fn select_strategy(&self, container: Option<&str>) -> Result<Strategy, ExecutionError> {
        let config = self.project.features.as_ref();
        let esas: Vec<PathBuf> = config
            .map(plugin_listed_esas)
            .unwrap_or_default()
            .iter()
            .map(|p| absolutize(&self.project.base_dir, p))
            .collect();

        let properties = match (config, container) {
            (Some(_), None) => load_product_properties(&self.project.install_dir)?,
            _ => Vec::new(),
        };
        let runtime_version = open_liberty_version(&properties).map(str::to_string);

        let additional_jsons = self
            .additional_json_list()
            .unwrap_or_default();
        let has_additional_jsons = !additional_jsons.is_empty();

        let request = SessionRequest {
            install_dir: self.project.install_dir.clone(),
            output_dir: self.project.output_dir.clone(),
            server_dir: self.project.server_dir(),
            features_configured: config.is_some(),
            esas,
            properties,
            runtime_version,
            container: container.map(str::to_string),
            additional_jsons,
            to: config.and_then(|c| c.to.clone()),
            verify: config.map(|c| c.verify).unwrap_or_default(),
            keys: build_key_map(&self.project.keys),
        };

        match InstallSession::open(request, self.session_resolver(), Arc::clone(&self.reporter)).await {
            Ok(session) => Ok(Strategy::UseUtility(Box::new(session))),
            Err(SessionError::Scenario(scenario)) => {
                self.reporter.debug(&format!("Feature utility unavailable: {scenario}"));
                Ok(Strategy::from_open_result(
                    Err(scenario),
                    config.is_some(),
                    has_additional_jsons,
                ))
            }
            Err(SessionError::Execution(e)) => Err(e),
        }
    }

    /// The resolver, looking in the `from` repository first when one is set.
    fn session_resolver(&self) -> CoordinateResolver {
        let Some(from) = self
            .project
            .features
            .as_ref()
            .and_then(|c| c.from.as_deref())
            .filter(|f| !f.trim().is_empty())
        else {
            return self.resolver.clone();
        };
        let from = absolutize(&self.project.base_dir, Path::new(from));
        self.reporter
            .debug(&format!("Installing features from {}", from.display()));
        self.resolver.with_fetcher(Arc::new(FetcherChain::new(vec![
            Arc::new(LocalRepository::new(from)) as Arc<dyn ArtifactFetcher>,
            Arc::clone(&self.fetcher),
        ])))
    }

    /// Features to install.
    ///
    /// Without a `[features]` section nothing is consulted and the result is
    /// empty. When the feature utility is unavailable the result is exactly
    /// the configured entries.
    pub async fn compute_features(&mut self, container: Option<&str>) -> Result<FeaturesPlatforms, ExecutionError> {
        let Some(config) = self.project.features.clone() else {
            self.reporter
                .debug("No features section is configured; not computing features");
            return Ok(FeaturesPlatforms::empty());
        };

        if self.ensure_session(container).await?.session().is_none() {
            return Ok(FeaturesPlatforms::new(
                plugin_listed_entries(&config),
                Default::default(),
            ));
        }

        let plugin = plugin_listed_features(&config);
        let dependencies = dependency_features(&self.project.dependencies);
        let server_dir = self.project.server_dir();
        let server = if server_dir.is_dir() {
            Some(self.features.server_features(&server_dir)?)
        } else {
            self.reporter.debug(&format!(
                "Server directory {} does not exist; not scanning server features",
                server_dir.display()
            ));
            None
        };

        let result = aggregate(&plugin, &dependencies, server);
        if self.reporter.is_debug_enabled() {
            self.reporter.debug(&format!(
                "Features to install: {:?}, platforms: {:?}",
                result.features(),
                result.platforms()
            ));
        }
        Ok(result)
    }

    /// Run the install-feature goal.
    pub async fn install_features(&mut self, container: Option<&str>) -> Result<InstallOutcome, Error> {
        if !self.initialize(container)? {
            return Ok(InstallOutcome::Skipped("Skipping install-feature goal.".to_string()));
        }
        self.ensure_session(container).await?;
        let features = self.compute_features(container).await?;

        match self.strategy.as_ref() {
            None => Ok(InstallOutcome::NothingToInstall),
            Some(Strategy::Skip { reason, scenario }) => {
                self.reporter.debug(&scenario.to_string());
                self.reporter.info(&reason.to_string());
                Ok(InstallOutcome::Skipped(reason.to_string()))
            }
            Some(Strategy::UseUtility(session)) => {
                if features.features().is_empty() && session.request().esas.is_empty() {
                    self.reporter.info("No features to install");
                    return Ok(InstallOutcome::NothingToInstall);
                }
                Ok(InstallOutcome::Installed(session.install(&features).await?))
            }
            Some(Strategy::UseLegacyInstaller { scenario }) => {
                self.reporter
                    .info(&format!("{scenario}; installing features with installUtility"));
                let (names, _) = features.into_parts();
                // installUtility runs from the install dir; archives must not be manifest-relative.
                let names: Vec<String> = names
                    .into_iter()
                    .map(|name| match FeatureSpec::parse(&name).esa_path() {
                        Some(esa) => absolutize(&self.project.base_dir, esa).display().to_string(),
                        None => name,
                    })
                    .collect();
                let config = self.project.features.as_ref();
                let from = config
                    .and_then(|c| c.from.as_deref())
                    .map(|f| absolutize(&self.project.base_dir, Path::new(f)));
                LegacyInstaller::new(&self.project.install_dir)
                    .install(
                        &names,
                        config.is_some_and(|c| c.accept_license),
                        from.as_deref(),
                        config.and_then(|c| c.to.as_deref()),
                        self.reporter.as_ref(),
                    )
                    .await?;
                Ok(InstallOutcome::Legacy { features: names })
            }
        }
    }

    /// Features BOMs declared in dependency management.
    pub fn list_dependency_boms(&self) -> Vec<String> {
        list_dependency_boms(self.project.dependency_management.as_deref(), self.reporter.as_ref())
    }

    /// Catalog coordinates for every declared features BOM.
    pub fn additional_json_list(&self) -> Option<Vec<Coordinate>> {
        additional_json_list(self.project.dependency_management.as_deref(), self.reporter.as_ref())
    }

    /// Run the prepare-feature goal.
    ///
    /// Without an explicit `runtime_version` the installed runtime's Open
    /// Liberty version is used.
    pub async fn prepare(&mut self, runtime_version: Option<&str>) -> Result<Vec<PreparedBom>, Error> {
        let boms = self.list_dependency_boms();
        if boms.is_empty() {
            self.reporter
                .info("No features BOM is declared in dependency management; nothing to prepare");
            return Ok(Vec::new());
        }

        let session = match self.prepare.take() {
            Some(session) => session,
            None => self.open_prepare_session(runtime_version)?,
        };
        let session = &*self.prepare.insert(session);
        Ok(session.prepare(&boms).await?)
    }

    fn open_prepare_session(&self, runtime_version: Option<&str>) -> Result<PrepareSession, Error> {
        let version = match runtime_version {
            Some(version) => version.to_string(),
            None => {
                self.project.check_install_dir()?;
                let properties = load_product_properties(&self.project.install_dir)?;
                open_liberty_version(&properties)
                    .map(str::to_string)
                    .ok_or(ExecutionError::MissingRuntimeVersion)?
            }
        };
        Ok(PrepareSession::open(
            self.project.install_dir.clone(),
            &version,
            self.project.build_dir.join(PREPARE_WORK_DIR),
            self.resolver.clone(),
            Arc::clone(&self.publisher),
            Arc::clone(&self.reporter),
        )?)
    }
}

/// Product entries from `<install>/lib/versions/*.properties`, by file name.
pub fn load_product_properties(install_dir: &Path) -> Result<Vec<ProductProperties>, ExecutionError> {
    let dir = versions_dir(install_dir);
    let entries = std::fs::read_dir(&dir).map_err(|_| ExecutionError::NoProductProperties(dir.clone()))?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "properties"))
        .collect();
    files.sort();

    let mut properties = Vec::new();
    for file in files {
        let text = std::fs::read_to_string(&file).map_err(|e| ExecutionError::io(&file, e))?;
        if let Some(product) = ProductProperties::parse(&text) {
            properties.push(product);
        }
    }
    if properties.is_empty() {
        return Err(ExecutionError::NoProductProperties(dir));
    }
    Ok(properties)
}
