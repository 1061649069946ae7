//! Watched-name discovery.
//!
//! The rewrite only applies to requests whose first segment names a package
//! the project declares. `include` entries are either literal package names
//! or paths to `package.json`-style manifests whose dependency sections are
//! unioned in; `exclude` entries are removed afterwards.

use crate::error::Error;
use serde_json::Value;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

/// Manifest sections whose keys (or array items) are package names.
pub const DEPENDENCY_SECTIONS: &[&str] = &[
    "dependencies",
    "devDependencies",
    "bundledDependencies",
    "bundleDependencies",
];

/// Names gathered from `include`/`exclude`, plus the non-fatal errors hit on the way.
#[derive(Debug, Default)]
pub struct WatchedNames {
    /// Package names eligible for rewriting, sorted.
    pub names: BTreeSet<String>,
    /// Manifests that could not be read or parsed.
    pub errors: Vec<Error>,
}

/// Whether an `include` entry refers to a manifest file rather than a package name.
#[must_use]
pub fn is_manifest_entry(entry: &str) -> bool {
    entry.ends_with(".json")
}

/// Compute the watched names for `include` minus `exclude`.
///
/// Manifest paths are resolved against `cwd`. A manifest that cannot be read
/// contributes nothing and is reported in [`WatchedNames::errors`].
#[must_use]
pub fn watched_names(cwd: &Path, include: &[String], exclude: &[String]) -> WatchedNames {
    let mut result = WatchedNames::default();

    for entry in include {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        if is_manifest_entry(entry) {
            match read_manifest_names(&cwd.join(entry)) {
                Ok(names) => result.names.extend(names),
                Err(e) => result.errors.push(e),
            }
        } else {
            result.names.insert(entry.to_string());
        }
    }

    for name in exclude {
        result.names.remove(name.trim());
    }

    result
}

/// Read the dependency names declared by one manifest.
///
/// # Errors
/// Returns an error if the file is missing, unreadable, or not JSON.
pub fn read_manifest_names(path: &Path) -> Result<BTreeSet<String>, Error> {
    if !path.is_file() {
        return Err(Error::ManifestNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = fs::read_to_string(path).map_err(|source| Error::ManifestRead {
        path: path.to_path_buf(),
        source,
    })?;

    let manifest: Value = serde_json::from_str(&content).map_err(|source| Error::ManifestParse {
        path: path.to_path_buf(),
        source,
    })?;

    let mut names = BTreeSet::new();
    let Some(root) = manifest.as_object() else {
        // Valid JSON but no sections to read
        return Ok(names);
    };

    for section in DEPENDENCY_SECTIONS {
        match root.get(*section) {
            Some(Value::Object(deps)) => names.extend(deps.keys().cloned()),
            Some(Value::Array(items)) => {
                names.extend(items.iter().filter_map(Value::as_str).map(str::to_string));
            }
            _ => {}
        }
    }

    Ok(names)
}
