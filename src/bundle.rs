use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Directory name prefixes that mark a support bundle.
pub const BUNDLE_PREFIXES: [&str; 2] = ["floodlight-support--", "bsn-support--"];
/// Default location cases are uploaded to.
pub const DEFAULT_SUPPORT_ROOT: &str = "/home/bsn/support";

fn is_bundle_dir(name: &str) -> bool {
    BUNDLE_PREFIXES.iter().any(|p| name.starts_with(p))
}

/// Expand a leading `~/` or `~user/` against the current home directory, the
/// way a shell would have before handing us the path.
pub fn expand_user_path(input: &str) -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_default();
    if let Some(rest) = input.strip_prefix("~/") {
        return Path::new(&home).join(rest);
    }
    if let Some(rest) = input.strip_prefix('~') {
        if let Some(parent) = Path::new(&home).parent() {
            return parent.join(rest);
        }
    }
    PathBuf::from(input)
}

/// Candidate case directories under the support root: any directory whose
/// name contains the case number (uploads arrive as `00011705`,
/// `case00011705` and similar).
pub fn case_directories(support_root: &Path, case_num: &str) -> Vec<PathBuf> {
    let mut found = Vec::new();
    for entry in WalkDir::new(support_root).max_depth(1).into_iter().filter_map(Result::ok) {
        let p = entry.path();
        if p == support_root || !p.is_dir() {
            continue;
        }
        if let Some(name) = p.file_name().and_then(|n| n.to_str())
            && name.contains(case_num)
        {
            found.push(p.to_path_buf());
        }
    }
    found.sort();
    found
}

/// Check that `dir` holds at least one support bundle directory.
pub fn validate_bundle_dir(dir: &Path) -> Result<PathBuf> {
    if !dir.is_dir() {
        bail!("the directory {} is not found, please double check the path", dir.display());
    }
    let has_bundle = std::fs::read_dir(dir)
        .with_context(|| format!("cannot list {}", dir.display()))?
        .filter_map(Result::ok)
        .any(|e| {
            e.path().is_dir()
                && e.file_name().to_str().map(is_bundle_dir).unwrap_or(false)
        });
    if !has_bundle {
        bail!("the path {} exists but there are no support bundles", dir.display());
    }
    Ok(dir.to_path_buf())
}

/// Controller directories of every bundle under `location`, plus the bundle
/// count. Only directories with a `cli/` subdirectory qualify; customers
/// sometimes leave extra directories behind inside the bundle tree.
pub fn controller_directories(location: &Path) -> (Vec<PathBuf>, usize) {
    let mut bundle_dirs = Vec::new();
    for entry in WalkDir::new(location).max_depth(1).into_iter().filter_map(Result::ok) {
        let p = entry.path();
        if p != location
            && p.is_dir()
            && p.file_name().and_then(|n| n.to_str()).map(is_bundle_dir).unwrap_or(false)
        {
            bundle_dirs.push(p.to_path_buf());
        }
    }
    bundle_dirs.sort();
    let mut controllers = Vec::new();
    for bundle in &bundle_dirs {
        for entry in WalkDir::new(bundle).max_depth(1).into_iter().filter_map(Result::ok) {
            let p = entry.path();
            if p != bundle.as_path() && p.is_dir() && p.join("cli").exists() {
                controllers.push(p.to_path_buf());
            }
        }
    }
    controllers.sort();
    (controllers, bundle_dirs.len())
}
