//! boms command

use anyhow::Result;
use std::path::Path;

pub fn boms(manifest: &Path) -> Result<()> {
    let invocation = super::open(manifest)?;
    for bom in invocation.list_dependency_boms() {
        println!("{bom}");
    }
    Ok(())
}
