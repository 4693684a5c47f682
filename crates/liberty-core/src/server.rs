//! Features already configured on an existing server.
//!
//! A server's configuration is `server.xml` plus every `*.xml` under
//! `configDropins/defaults` and `configDropins/overrides`, each of which may
//! pull in further files with `<include location="..."/>`. Every `<feature>`
//! and `<platform>` inside a `<featureManager>` block contributes.

use liberty_schema::FeaturesPlatforms;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use crate::error::ExecutionError;
use crate::properties::substitute;
use crate::reporter::Reporter;

static COMMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());
static FEATURE_MANAGER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<featureManager\b[^>]*>(.*?)</featureManager>").unwrap());
static FEATURE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<feature\b[^>]*>(.*?)</feature>").unwrap());
static PLATFORM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<platform\b[^>]*>(.*?)</platform>").unwrap());
static INCLUDE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<include\b([^>]*)>").unwrap());
static LOCATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\blocation\s*=\s*["']([^"']*)["']"#).unwrap());

/// Reads the features an existing server is configured with.
pub trait FeatureResolver: Send + Sync {
    /// Features and platforms configured for the server in `server_dir`.
    fn server_features(&self, server_dir: &Path) -> Result<FeaturesPlatforms, ExecutionError>;
}

/// [`FeatureResolver`] over a server's XML configuration files.
pub struct ServerConfigScanner {
    install_dir: PathBuf,
    user_dir: PathBuf,
    reporter: std::sync::Arc<dyn Reporter>,
}

impl ServerConfigScanner {
    pub fn new(install_dir: PathBuf, user_dir: PathBuf, reporter: std::sync::Arc<dyn Reporter>) -> Self {
        Self {
            install_dir,
            user_dir,
            reporter,
        }
    }

    /// Location variables available to `<include>`: the built-in directories
    /// plus the server's `bootstrap.properties`.
    fn variables(&self, server_dir: &Path) -> Result<BTreeMap<String, String>, ExecutionError> {
        let mut vars = BTreeMap::from([
            ("wlp.install.dir".to_string(), self.install_dir.display().to_string()),
            ("wlp.user.dir".to_string(), self.user_dir.display().to_string()),
            (
                "shared.config.dir".to_string(),
                self.user_dir.join("shared").join("config").display().to_string(),
            ),
            ("server.config.dir".to_string(), server_dir.display().to_string()),
        ]);

        let bootstrap = server_dir.join("bootstrap.properties");
        if bootstrap.is_file() {
            let text = std::fs::read_to_string(&bootstrap).map_err(|e| ExecutionError::io(&bootstrap, e))?;
            vars.extend(liberty_schema::product::parse_properties(&text));
        }
        Ok(vars)
    }

    fn scan_file(
        &self,
        file: &Path,
        vars: &BTreeMap<String, String>,
        visited: &mut HashSet<PathBuf>,
        result: &mut (BTreeSet<String>, BTreeSet<String>),
    ) -> Result<(), ExecutionError> {
        if !visited.insert(file.to_path_buf()) {
            return Ok(());
        }
        self.reporter.debug(&format!("Scanning {}", file.display()));

        let raw = std::fs::read_to_string(file).map_err(|e| ExecutionError::io(file, e))?;
        let text = COMMENT.replace_all(&raw, "");

        for block in FEATURE_MANAGER.captures_iter(&text) {
            let Some(body) = block.get(1) else { continue };
            collect_values(&FEATURE, body.as_str(), &mut result.0);
            collect_values(&PLATFORM, body.as_str(), &mut result.1);
        }

        let base = file.parent().unwrap_or_else(|| Path::new("."));
        for include in INCLUDE.captures_iter(&text) {
            let Some(location) = include
                .get(1)
                .and_then(|attrs| LOCATION.captures(attrs.as_str()))
                .and_then(|c| c.get(1))
            else {
                continue;
            };
            let location = match substitute(location.as_str(), vars) {
                Ok(location) => location,
                Err(e) => {
                    self.reporter
                        .debug_with(&format!("Ignoring include in {}", file.display()), &e);
                    continue;
                }
            };
            if location.starts_with("http://") || location.starts_with("https://") {
                self.reporter
                    .debug(&format!("Ignoring remote include {location}"));
                continue;
            }

            let path = base.join(&location);
            if path.is_dir() {
                for child in xml_files(&path)? {
                    self.scan_file(&child, vars, visited, result)?;
                }
            } else if path.is_file() {
                self.scan_file(&path, vars, visited, result)?;
            } else {
                self.reporter
                    .debug(&format!("Included file {} does not exist", path.display()));
            }
        }
        Ok(())
    }
}

impl FeatureResolver for ServerConfigScanner {
    fn server_features(&self, server_dir: &Path) -> Result<FeaturesPlatforms, ExecutionError> {
        let vars = self.variables(server_dir)?;
        let mut visited = HashSet::new();
        let mut result = (BTreeSet::new(), BTreeSet::new());

        let dropins = server_dir.join("configDropins");
        let mut files = xml_files(&dropins.join("defaults"))?;
        let server_xml = server_dir.join("server.xml");
        if server_xml.is_file() {
            files.push(server_xml);
        }
        files.extend(xml_files(&dropins.join("overrides"))?);

        for file in files {
            self.scan_file(&file, &vars, &mut visited, &mut result)?;
        }

        let (features, platforms) = result;
        Ok(FeaturesPlatforms::new(features, platforms))
    }
}

/// Trimmed, lowercased text of every match of `pattern` in `body`.
fn collect_values(pattern: &Regex, body: &str, into: &mut BTreeSet<String>) {
    for m in pattern.captures_iter(body) {
        if let Some(value) = m.get(1) {
            let value = value.as_str().trim();
            if !value.is_empty() {
                into.insert(value.to_lowercase());
            }
        }
    }
}

/// `*.xml` files directly in `dir`, sorted by name; empty if `dir` is missing.
fn xml_files(dir: &Path) -> Result<Vec<PathBuf>, ExecutionError> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .map_err(|e| ExecutionError::io(dir, e))?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "xml"))
        .collect();
    files.sort();
    Ok(files)
}
