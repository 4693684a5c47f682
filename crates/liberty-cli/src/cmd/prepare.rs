//! prepare-feature command

use anyhow::{Context, Result};
use std::path::Path;

use crate::ui::Theme;

pub async fn prepare_feature(manifest: &Path, runtime_version: Option<&str>) -> Result<()> {
    let mut invocation = super::open(manifest)?;
    let prepared = invocation
        .prepare(runtime_version)
        .await
        .context("prepare-feature failed")?;

    let theme = Theme::default();
    for bom in &prepared {
        println!(
            "{} {}",
            theme.header(&bom.bom.to_string()),
            theme.secondary(&bom.catalog_path.display().to_string())
        );
        for feature in &bom.features {
            println!("{}", theme.line(theme.icons.installed, theme.success, feature));
        }
    }
    Ok(())
}
