//! Shared types and wire formats for Liberty feature resolution.
//!
//! Everything in here is plain data: coordinates, feature declarations,
//! the verification policy, key entries, product metadata and the JSON
//! feature catalog. The engine in `liberty-core` consumes these types.

pub mod catalog;
/// Maven-style artifact coordinates.
pub mod coordinate;
/// The `[features]` section and computed feature sets.
pub mod feature;
/// Signing key declarations.
pub mod keys;
pub mod product;

// Re-exports
pub use catalog::{FeatureCatalog, FeatureDescriptor};
pub use coordinate::{Coordinate, CoordinateError};
pub use feature::{FeatureSpec, FeaturesConfig, FeaturesPlatforms, VerifyPolicy};
pub use keys::{KeyEntry, KeyRecord};
pub use product::ProductProperties;

/// Group id of the runtime's own feature catalog and features.
pub const OPEN_LIBERTY_FEATURES_GROUP: &str = "io.openliberty.features";

/// Artifact id under which a feature catalog JSON is published.
pub const FEATURES_JSON_ARTIFACT_ID: &str = "features";

/// Artifact id of a Bill-of-Materials listing user features.
pub const FEATURES_BOM_ARTIFACT_ID: &str = "features-bom";

/// File extension of a packaged feature archive.
pub const ESA_EXTENSION: &str = ".esa";
