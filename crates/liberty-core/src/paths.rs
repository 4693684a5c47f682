use dirs::home_dir;
use std::path::{Path, PathBuf};

/// Returns the local repository root, or None if the user's home cannot be resolved.
///
/// `LIBERTY_REPO_LOCAL` overrides the default `~/.m2/repository`.
pub fn try_local_repository() -> Option<PathBuf> {
    if let Ok(val) = std::env::var("LIBERTY_REPO_LOCAL") {
        return Some(PathBuf::from(val));
    }
    home_dir().map(|h| h.join(".m2").join("repository"))
}

/// Runtime product metadata: `<install>/lib/versions`
pub fn versions_dir(install_dir: &Path) -> PathBuf {
    install_dir.join("lib").join("versions")
}

/// Installed feature manifests below an install root: `<root>/lib/features`
pub fn feature_manifests_dir(root: &Path) -> PathBuf {
    root.join("lib").join("features")
}

/// Default user feature location: `<install>/usr/extension`
pub fn user_extension_dir(install_dir: &Path) -> PathBuf {
    install_dir.join("usr").join("extension")
}

/// Where features go for a given `to` setting.
///
/// `usr` (or nothing) means the user extension directory, `core` the install
/// root itself, and anything else is a directory relative to the install root.
pub fn feature_target_dir(install_dir: &Path, to: Option<&str>) -> PathBuf {
    match to.map(str::trim) {
        None | Some("" | "usr") => user_extension_dir(install_dir),
        Some("core") => install_dir.to_path_buf(),
        Some(other) => install_dir.join(other),
    }
}

/// Resolve `path` against `base` unless it is already absolute.
pub fn absolutize(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
