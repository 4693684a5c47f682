pub mod container;
pub mod error;
pub mod inventory;
pub mod invocation;
pub mod io;
pub mod keys;
pub mod legacy;
pub mod paths;
pub mod prepare;
pub mod project;
pub mod properties;
pub mod resolver;
pub mod server;
pub mod session;
pub mod signature;
pub mod strategy;
mod tool;

pub mod reporter;

pub use error::{ConfigError, Error, ExecutionError, FetchError, SessionError};
pub use invocation::{InstallOutcome, Invocation};
pub use io::repository::{ArtifactFetcher, ArtifactPublisher, LocalRepository, Repository};
pub use project::Project;
pub use reporter::{NullReporter, Reporter, TracingReporter};
pub use resolver::CoordinateResolver;
pub use server::{FeatureResolver, ServerConfigScanner};
pub use strategy::{Decision, Scenario, SkipReason, Strategy};

/// User Agent string for repository requests
pub const USER_AGENT: &str = concat!("liberty-core/", env!("CARGO_PKG_VERSION"));
