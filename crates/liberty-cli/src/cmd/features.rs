//! features command

use anyhow::{Context, Result};
use std::path::Path;

/// Print the computed features, then `platform <name>` lines.
///
/// Output is unstyled so it can be piped.
pub async fn features(manifest: &Path, container: Option<&str>) -> Result<()> {
    let mut invocation = super::open(manifest)?;
    if !invocation.initialize(container)? {
        return Ok(());
    }
    let computed = invocation
        .compute_features(container)
        .await
        .context("Failed to compute features")?;

    for feature in computed.features() {
        println!("{feature}");
    }
    for platform in computed.platforms() {
        println!("platform {platform}");
    }
    Ok(())
}
