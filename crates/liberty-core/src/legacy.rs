//! The runtime's bundled `installUtility`, used when the feature utility
//! cannot serve the project.

use std::path::{Path, PathBuf};
use tokio::process::Command;

use crate::error::ExecutionError;
use crate::reporter::Reporter;

#[derive(Debug, Clone)]
pub struct LegacyInstaller {
    install_dir: PathBuf,
}

impl LegacyInstaller {
    pub fn new(install_dir: impl Into<PathBuf>) -> Self {
        Self {
            install_dir: install_dir.into(),
        }
    }

    /// `<install>/bin/installUtility` (`.bat` on Windows).
    pub fn program(&self) -> PathBuf {
        let name = if cfg!(windows) {
            "installUtility.bat"
        } else {
            "installUtility"
        };
        self.install_dir.join("bin").join(name)
    }

    /// `install [--acceptLicense] [--from=<dir>] [--to=<to>] <features...>`
    pub fn args(features: &[String], accept_license: bool, from: Option<&Path>, to: Option<&str>) -> Vec<String> {
        let mut args = vec!["install".to_string()];
        if accept_license {
            args.push("--acceptLicense".to_string());
        }
        if let Some(from) = from {
            args.push(format!("--from={}", from.display()));
        }
        if let Some(to) = to.filter(|to| !to.trim().is_empty()) {
            args.push(format!("--to={to}"));
        }
        args.extend(features.iter().cloned());
        args
    }

    pub async fn install(
        &self,
        features: &[String],
        accept_license: bool,
        from: Option<&Path>,
        to: Option<&str>,
        reporter: &dyn Reporter,
    ) -> Result<(), ExecutionError> {
        if features.is_empty() {
            reporter.debug("No features to install with installUtility");
            return Ok(());
        }
        let program = self.program();
        reporter.info(&format!(
            "Installing features with installUtility: {}",
            features.join(", ")
        ));

        let mut cmd = Command::new(&program);
        cmd.args(Self::args(features, accept_license, from, to))
            .current_dir(&self.install_dir);
        crate::tool::run(cmd, &program, reporter).await
    }
}
