//! Installing features into a running container.

use liberty_schema::VerifyPolicy;
use std::path::{Path, PathBuf};
use tokio::process::Command;

use crate::error::ExecutionError;
use crate::reporter::Reporter;

const ENGINES: [&str; 2] = ["docker", "podman"];

/// A container engine CLI found on `PATH`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerEngine {
    program: PathBuf,
}

impl ContainerEngine {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// `docker`, or `podman` if docker is not installed.
    pub fn detect() -> Result<Self, ExecutionError> {
        ENGINES
            .iter()
            .find_map(|name| which::which(name).ok())
            .map(Self::new)
            .ok_or(ExecutionError::NoContainerEngine)
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Run the feature utility inside `container`.
    pub async fn install_features(
        &self,
        container: &str,
        request: &ContainerInstall<'_>,
        reporter: &dyn Reporter,
    ) -> Result<(), ExecutionError> {
        let args = request.args(container);
        reporter.info(&format!(
            "Installing features into container {container}: {}",
            request.features.join(", ")
        ));
        let mut cmd = Command::new(&self.program);
        cmd.args(&args);
        crate::tool::run(cmd, &self.program, reporter).await
    }
}

/// What to install into a container.
#[derive(Debug, Clone)]
pub struct ContainerInstall<'a> {
    pub features: Vec<String>,
    pub to: Option<&'a str>,
    pub verify: VerifyPolicy,
}

impl ContainerInstall<'_> {
    /// Arguments for `<engine> exec <container> featureUtility installFeature`.
    pub fn args(&self, container: &str) -> Vec<String> {
        let mut args = vec![
            "exec".to_string(),
            container.to_string(),
            "featureUtility".to_string(),
            "installFeature".to_string(),
        ];
        args.extend(self.features.iter().cloned());
        args.push("--acceptLicense".to_string());
        if let Some(to) = self.to.filter(|to| !to.trim().is_empty()) {
            args.push(format!("--to={to}"));
        }
        args.push(format!("--verify={}", self.verify));
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_args() {
        let request = ContainerInstall {
            features: vec!["servlet-4.0".to_string(), "x".to_string()],
            to: Some("usr"),
            verify: VerifyPolicy::Warn,
        };
        assert_eq!(
            request.args("liberty-dev"),
            [
                "exec",
                "liberty-dev",
                "featureUtility",
                "installFeature",
                "servlet-4.0",
                "x",
                "--acceptLicense",
                "--to=usr",
                "--verify=warn"
            ]
        );
    }

    #[test]
    fn test_install_args_without_target() {
        let request = ContainerInstall {
            features: vec!["jsp-2.3".to_string()],
            to: None,
            verify: VerifyPolicy::Enforce,
        };
        assert!(!request.args("c").iter().any(|a| a.starts_with("--to")));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_engine_runs_exec() {
        let dir = tempfile::tempdir().unwrap();
        let engine_path = dir.path().join("docker");
        let log = dir.path().join("args.txt");
        crate::tool::tests::write_script(&engine_path, &format!("echo \"$@\" > {}", log.display()));

        let request = ContainerInstall {
            features: vec!["servlet-4.0".to_string()],
            to: None,
            verify: VerifyPolicy::Skip,
        };
        ContainerEngine::new(&engine_path)
            .install_features("dev", &request, &crate::reporter::NullReporter)
            .await
            .unwrap();

        assert_eq!(
            std::fs::read_to_string(&log).unwrap().trim(),
            "exec dev featureUtility installFeature servlet-4.0 --acceptLicense --verify=skip"
        );
    }
}
