//! Feature archive (ESA) handling.
//!
//! An ESA is a zip archive with an OSGi subsystem manifest at
//! `OSGI-INF/SUBSYSTEM.MF`; every other entry is laid out relative to the
//! install root the feature is extracted into.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

use liberty_schema::FeatureDescriptor;

use crate::error::ExecutionError;
use crate::paths::feature_manifests_dir;

/// Path of the subsystem manifest inside an archive.
pub const SUBSYSTEM_MANIFEST: &str = "OSGI-INF/SUBSYSTEM.MF";

const FEATURE_TYPE: &str = "osgi.subsystem.feature";

/// The parts of a subsystem manifest the installer cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubsystemManifest {
    pub symbolic_name: String,
    pub short_name: Option<String>,
    pub version: Option<String>,
    pub requires: Vec<String>,
    pub platforms: Vec<String>,
    pub raw: String,
}

impl SubsystemManifest {
    /// Parse manifest text. Returns `None` without a symbolic name.
    pub fn parse(text: &str) -> Option<Self> {
        let headers = parse_headers(text);

        let symbolic_name = headers
            .get("Subsystem-SymbolicName")
            .and_then(|v| v.split(';').next())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())?;

        let requires = headers
            .get("Subsystem-Content")
            .map(|content| {
                split_clauses(content)
                    .into_iter()
                    .filter(|clause| clause.contains(FEATURE_TYPE))
                    .filter_map(|clause| clause.split(';').next().map(|n| n.trim().to_string()))
                    .filter(|n| !n.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let platforms = headers
            .get("WLP-Platform")
            .map(|v| {
                v.split(',')
                    .map(|p| p.trim().to_string())
                    .filter(|p| !p.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Some(Self {
            symbolic_name,
            short_name: headers.get("IBM-ShortName").cloned(),
            version: headers.get("Subsystem-Version").cloned(),
            requires,
            platforms,
            raw: text.to_string(),
        })
    }

    /// Catalog entry for this feature, published under the given coordinates.
    pub fn to_descriptor(&self, group_id: &str, artifact_id: &str, version: &str) -> FeatureDescriptor {
        FeatureDescriptor {
            symbolic_name: self.symbolic_name.clone(),
            short_name: self.short_name.clone(),
            group_id: Some(group_id.to_string()),
            artifact_id: Some(artifact_id.to_string()),
            version: Some(version.to_string()),
            requires: self.requires.clone(),
            platforms: self.platforms.clone(),
        }
    }
}

/// Manifest headers, with continuation lines (leading space) folded in.
fn parse_headers(text: &str) -> BTreeMap<String, String> {
    let mut headers = BTreeMap::new();
    let mut current: Option<(String, String)> = None;

    for line in text.lines() {
        if let Some(rest) = line.strip_prefix(' ') {
            if let Some((_, value)) = current.as_mut() {
                value.push_str(rest);
            }
            continue;
        }
        if let Some((key, value)) = current.take() {
            headers.insert(key, value.trim().to_string());
        }
        if let Some((key, value)) = line.split_once(':') {
            current = Some((key.trim().to_string(), value.to_string()));
        }
    }
    if let Some((key, value)) = current {
        headers.insert(key, value.trim().to_string());
    }
    headers
}

/// Split a header value on commas that are not inside double quotes.
fn split_clauses(value: &str) -> Vec<&str> {
    let mut clauses = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;
    for (i, c) in value.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                clauses.push(value[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    clauses.push(value[start..].trim());
    clauses.retain(|c| !c.is_empty());
    clauses
}

fn open_archive(esa: &Path) -> Result<zip::ZipArchive<File>, ExecutionError> {
    let file = File::open(esa).map_err(|e| ExecutionError::io(esa, e))?;
    zip::ZipArchive::new(file).map_err(|e| ExecutionError::Archive {
        path: esa.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Read the subsystem manifest of an archive.
pub fn read_manifest(esa: &Path) -> Result<SubsystemManifest, ExecutionError> {
    let mut archive = open_archive(esa)?;
    let mut entry = archive
        .by_name(SUBSYSTEM_MANIFEST)
        .map_err(|e| ExecutionError::Archive {
            path: esa.to_path_buf(),
            reason: format!("{SUBSYSTEM_MANIFEST}: {e}"),
        })?;

    let mut text = String::new();
    entry
        .read_to_string(&mut text)
        .map_err(|e| ExecutionError::io(esa, e))?;

    SubsystemManifest::parse(&text).ok_or_else(|| ExecutionError::Archive {
        path: esa.to_path_buf(),
        reason: "subsystem manifest has no Subsystem-SymbolicName".to_string(),
    })
}

/// What an extraction produced.
#[derive(Debug, Clone)]
pub struct Extracted {
    pub manifest: SubsystemManifest,
    pub files: usize,
    pub manifest_path: PathBuf,
}

/// Extract an archive below `target_root` and record its manifest in
/// `<target_root>/lib/features/<symbolic name>.mf`.
///
/// Entries under `OSGI-INF/` and `META-INF/` are archive metadata and are
/// not copied. Entries that would escape `target_root` are rejected.
pub fn extract(esa: &Path, target_root: &Path) -> Result<Extracted, ExecutionError> {
    let manifest = read_manifest(esa)?;
    let mut archive = open_archive(esa)?;
    let mut files = 0;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(|e| ExecutionError::Archive {
            path: esa.to_path_buf(),
            reason: e.to_string(),
        })?;

        let Some(relative) = entry.enclosed_name() else {
            return Err(ExecutionError::Archive {
                path: esa.to_path_buf(),
                reason: format!("entry '{}' escapes the install root", entry.name()),
            });
        };
        if relative.starts_with("OSGI-INF") || relative.starts_with("META-INF") {
            continue;
        }

        let out = target_root.join(&relative);
        if entry.is_dir() {
            fs::create_dir_all(&out).map_err(|e| ExecutionError::io(&out, e))?;
            continue;
        }
        if let Some(parent) = out.parent() {
            fs::create_dir_all(parent).map_err(|e| ExecutionError::io(parent, e))?;
        }
        let mut dest = File::create(&out).map_err(|e| ExecutionError::io(&out, e))?;
        std::io::copy(&mut entry, &mut dest).map_err(|e| ExecutionError::io(&out, e))?;
        files += 1;
    }

    let manifests = feature_manifests_dir(target_root);
    fs::create_dir_all(&manifests).map_err(|e| ExecutionError::io(&manifests, e))?;
    let manifest_path = manifests.join(format!("{}.mf", manifest.symbolic_name));
    fs::write(&manifest_path, &manifest.raw).map_err(|e| ExecutionError::io(&manifest_path, e))?;

    Ok(Extracted {
        manifest,
        files,
        manifest_path,
    })
}

/// Build an ESA in memory; shared by tests across the crate.
#[cfg(test)]
pub(crate) fn write_test_esa(path: &Path, manifest: &str, entries: &[(&str, &str)]) {
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    let mut zip = zip::ZipWriter::new(File::create(path).unwrap());
    zip.start_file(SUBSYSTEM_MANIFEST, SimpleFileOptions::default())
        .unwrap();
    zip.write_all(manifest.as_bytes()).unwrap();
    for (name, body) in entries {
        zip.start_file(*name, SimpleFileOptions::default()).unwrap();
        zip.write_all(body.as_bytes()).unwrap();
    }
    zip.finish().unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = "Manifest-Version: 1.0\n\
Subsystem-SymbolicName: com.example.feature.x-1.0; visibility:=public\n\
IBM-ShortName: x-1.0\n\
Subsystem-Version: 1.0.0\n\
WLP-Platform: javaee-8.0, jakartaee-9.1\n\
Subsystem-Content: com.example.x.bundle;version=\"[1,2)\",\n \
com.ibm.websphere.appserver.servlet-4.0;type=\"osgi.subsystem.feature\",\n \
com.ibm.websphere.appserver.jndi-1.0;type=\"osgi.subsystem.feature\"\n";

    #[test]
    fn test_parse_manifest() {
        let m = SubsystemManifest::parse(MANIFEST).unwrap();
        assert_eq!(m.symbolic_name, "com.example.feature.x-1.0");
        assert_eq!(m.short_name.as_deref(), Some("x-1.0"));
        assert_eq!(m.version.as_deref(), Some("1.0.0"));
        assert_eq!(
            m.requires,
            [
                "com.ibm.websphere.appserver.servlet-4.0",
                "com.ibm.websphere.appserver.jndi-1.0"
            ]
        );
        assert_eq!(m.platforms, ["javaee-8.0", "jakartaee-9.1"]);
    }

    #[test]
    fn test_parse_manifest_without_name() {
        assert!(SubsystemManifest::parse("IBM-ShortName: x-1.0\n").is_none());
    }

    #[test]
    fn test_split_clauses_respects_quotes() {
        assert_eq!(
            split_clauses("a;version=\"[1,2)\", b , ,c"),
            ["a;version=\"[1,2)\"", "b", "c"]
        );
    }

    #[test]
    fn test_extract() {
        let dir = tempfile::tempdir().unwrap();
        let esa = dir.path().join("x.esa");
        write_test_esa(
            &esa,
            MANIFEST,
            &[
                ("lib/com.example.x.bundle_1.0.jar", "jar"),
                ("META-INF/MANIFEST.MF", "ignored"),
            ],
        );

        let root = dir.path().join("wlp/usr/extension");
        let extracted = extract(&esa, &root).unwrap();

        assert_eq!(extracted.files, 1);
        assert!(root.join("lib/com.example.x.bundle_1.0.jar").exists());
        assert!(!root.join("META-INF").exists());
        assert_eq!(
            extracted.manifest_path,
            root.join("lib/features/com.example.feature.x-1.0.mf")
        );
        assert_eq!(fs::read_to_string(&extracted.manifest_path).unwrap(), MANIFEST);
    }

    #[test]
    fn test_read_manifest_rejects_non_zip() {
        let dir = tempfile::tempdir().unwrap();
        let esa = dir.path().join("bad.esa");
        fs::write(&esa, b"not a zip").unwrap();
        assert!(matches!(read_manifest(&esa), Err(ExecutionError::Archive { .. })));
    }
}
