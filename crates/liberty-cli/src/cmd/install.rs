//! install-feature command

use anyhow::{Context, Result};
use liberty_core::InstallOutcome;
use std::path::Path;

use crate::ui::Theme;

pub async fn install_feature(manifest: &Path, container: Option<&str>) -> Result<()> {
    let mut invocation = super::open(manifest)?;
    let outcome = invocation
        .install_features(container)
        .await
        .context("install-feature failed")?;

    let theme = Theme::default();
    match outcome {
        InstallOutcome::Skipped(reason) => {
            println!("{}", theme.line(theme.icons.skipped, theme.warning, &reason));
        }
        InstallOutcome::NothingToInstall => {
            println!("{}", theme.secondary("Nothing to install"));
        }
        InstallOutcome::Installed(report) => {
            for name in &report.installed {
                println!("{}", theme.line(theme.icons.installed, theme.success, name));
            }
            for name in &report.already_present {
                println!("{}", theme.line(theme.icons.present, theme.secondary, name));
            }
            println!(
                "{}",
                theme.header(&format!(
                    "{} installed, {} already present",
                    report.installed.len(),
                    report.already_present.len()
                ))
            );
        }
        InstallOutcome::Legacy { features } => {
            for name in &features {
                println!("{}", theme.line(theme.icons.installed, theme.success, name));
            }
            println!("{}", theme.secondary("Installed with installUtility"));
        }
    }
    Ok(())
}
