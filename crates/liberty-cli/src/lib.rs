//! liberty - feature tooling for Liberty runtimes
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
//!
//! Installs the features a project needs into a Liberty runtime (or a
//! running container) and prepares catalogs for user-feature BOMs.
//!
//! Every subcommand reads the project manifest (`liberty.toml` by default)
//! and runs one [`liberty_core::Invocation`] against it.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod cmd;
pub mod ui;

#[derive(Debug, Parser)]
#[command(name = "liberty", version, about = "Install and prepare Liberty runtime features")]
pub struct Cli {
    /// Project manifest
    #[arg(short, long, global = true, default_value = liberty_core::project::MANIFEST_FILE, env = "LIBERTY_MANIFEST")]
    pub manifest: PathBuf,

    /// Show debug output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Install the features the project and its server need
    InstallFeature {
        /// Install into this running container instead of the local runtime
        #[arg(long)]
        container: Option<String>,
    },
    /// Download BOM-listed user features and publish their catalogs
    PrepareFeature {
        /// Runtime version to prepare for (defaults to the installed runtime)
        #[arg(long)]
        runtime_version: Option<String>,
    },
    /// Print the features that would be installed
    Features {
        /// Resolve as if installing into this container
        #[arg(long)]
        container: Option<String>,
    },
    /// List features BOMs declared in dependency management
    Boms,
}
