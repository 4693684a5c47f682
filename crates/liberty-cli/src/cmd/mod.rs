//! Subcommand implementations.

pub mod boms;
pub mod features;
pub mod install;
pub mod prepare;

use anyhow::{Context, Result};
use liberty_core::{Invocation, Project, TracingReporter};
use std::path::Path;
use std::sync::Arc;

/// Load the manifest and wire an invocation against it.
pub(crate) fn open(manifest: &Path) -> Result<Invocation> {
    let project = Project::load(manifest)
        .with_context(|| format!("Failed to load project manifest {}", manifest.display()))?;
    Invocation::from_project(project, Arc::new(TracingReporter)).context("Failed to configure repositories")
}
