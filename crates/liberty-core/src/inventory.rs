//! Feature inventory: what the project asks to have installed.
//!
//! Features come from three places: the `[features]` section, project
//! dependencies of type `esa`, and the configuration of an existing server.
//! The result is always a set; overlapping sources collapse.

use liberty_schema::{
    Coordinate, FeatureSpec, FeaturesConfig, FeaturesPlatforms, FEATURES_BOM_ARTIFACT_ID,
    FEATURES_JSON_ARTIFACT_ID,
};
use std::collections::{BTreeSet, HashSet};
use std::path::PathBuf;

use crate::project::Dependency;
use crate::reporter::Reporter;

const ESA_TYPE: &str = "esa";
const POM_TYPE: &str = "pom";
const JSON_TYPE: &str = "json";

/// Feature names listed in the `[features]` section, without archive files.
pub fn plugin_listed_features(config: &FeaturesConfig) -> BTreeSet<String> {
    config
        .features
        .iter()
        .filter_map(|spec| match spec {
            FeatureSpec::Name(name) if !name.is_empty() => Some(name.clone()),
            _ => None,
        })
        .collect()
}

/// Archive files listed in the `[features]` section, in configuration order.
pub fn plugin_listed_esas(config: &FeaturesConfig) -> Vec<PathBuf> {
    config
        .features
        .iter()
        .filter_map(|spec| spec.esa_path().map(PathBuf::from))
        .collect()
}

/// Every entry of the `[features]` section, names and archives alike.
pub fn plugin_listed_entries(config: &FeaturesConfig) -> BTreeSet<String> {
    config.features.iter().map(ToString::to_string).collect()
}

/// Artifact ids of project dependencies packaged as features.
pub fn dependency_features(dependencies: &[Dependency]) -> BTreeSet<String> {
    dependencies
        .iter()
        .filter(|d| d.kind == ESA_TYPE)
        .map(|d| d.artifact_id.clone())
        .collect()
}

/// Whether a dependency-management entry is a user feature BOM.
pub fn is_features_bom(dependency: &Dependency) -> bool {
    dependency.kind == POM_TYPE && dependency.artifact_id == FEATURES_BOM_ARTIFACT_ID
}

/// Feature catalogs published next to each declared features BOM.
///
/// `None` when the project has no dependency management at all. The
/// catalog shares the BOM's group and version; placeholders are kept and
/// substituted when the catalog is fetched.
pub fn additional_json_list(
    dependency_management: Option<&[Dependency]>,
    reporter: &dyn Reporter,
) -> Option<Vec<Coordinate>> {
    let Some(entries) = dependency_management else {
        reporter.debug("Dependency management is not provided");
        return None;
    };

    let jsons: Vec<Coordinate> = entries
        .iter()
        .filter(|d| is_features_bom(d))
        .map(|d| {
            Coordinate::new(
                d.group_id.clone(),
                FEATURES_JSON_ARTIFACT_ID,
                JSON_TYPE,
                d.version.clone(),
            )
        })
        .collect();

    for json in &jsons {
        reporter.debug(&format!("Additional feature catalog: {json}"));
    }
    Some(jsons)
}

/// Union of plugin-listed, dependency and server features.
///
/// Names are compared case-insensitively; the first spelling seen wins, in
/// the order plugin, dependencies, server. Platforms come from the server
/// scan only.
pub fn aggregate(
    plugin_listed: &BTreeSet<String>,
    dependencies: &BTreeSet<String>,
    server: Option<FeaturesPlatforms>,
) -> FeaturesPlatforms {
    let (scanned, platforms) = server.map(FeaturesPlatforms::into_parts).unwrap_or_default();

    let mut seen = HashSet::new();
    let features = plugin_listed
        .iter()
        .chain(dependencies)
        .chain(&scanned)
        .filter(|name| seen.insert(name.to_lowercase()))
        .cloned()
        .collect();

    FeaturesPlatforms::new(features, platforms)
}
