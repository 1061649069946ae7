//! Filesystem-backed resolution host.
//!
//! A deliberately small resolver: relative paths with extension and index
//! probing, and `node_modules` lookups honouring `module`/`main`. Enough to
//! drive the rewrite over a real project tree.
//!
//! ## Specifier Types
//!
//! - Directory strategy: `./utils`, `../lib/foo`, `/abs/path`
//! - Module strategy: `lodash`, `lodash/map`, `@scope/pkg/sub`, `~lodash/map`

use super::pipeline::ResolveStrategies;
use super::request::{strip_loaders, Candidate, Outcome, ResolveError, Resolved, Strategy};
use futures::future::BoxFuture;
use std::path::{Path, PathBuf};

/// Extensions probed when a request names a file without one.
const EXTENSIONS: &[&str] = &[".ts", ".tsx", ".js", ".jsx", ".mjs", ".cjs", ".json"];

/// Index files probed when a request names a directory.
const INDEX_FILES: &[&str] = &["index.ts", "index.tsx", "index.js", "index.jsx", "index.mjs"];

/// Resolves candidates against the real filesystem.
#[derive(Debug, Clone, Default)]
pub struct FsHost {
    /// Directory at which the `node_modules` walk stops.
    root: Option<PathBuf>,
}

impl FsHost {
    /// Create a host that walks up to the filesystem root.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop `node_modules` lookups at `root`.
    #[must_use]
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    /// Resolve synchronously.
    pub fn resolve_sync(&self, strategy: Strategy, candidate: &Candidate) -> Outcome {
        let request = strip_loaders(&candidate.request);
        let found = match strategy {
            Strategy::Directory => self.resolve_directory(request, &candidate.base_path)?,
            Strategy::Module => self.resolve_module(request, &candidate.base_path)?,
        };
        Ok(Some(Resolved::new(found, candidate.query.clone())))
    }

    fn resolve_directory(&self, request: &str, base: &Path) -> Result<PathBuf, ResolveError> {
        let target = base.join(request);
        resolve_file_or_directory(&target, request, base)
    }

    fn resolve_module(&self, request: &str, base: &Path) -> Result<PathBuf, ResolveError> {
        let specifier = request.strip_prefix('~').unwrap_or(request);
        let (pkg_name, subpath) = parse_bare_specifier(specifier);
        if pkg_name.is_empty() {
            return Err(ResolveError::new(request, base, "Empty module name"));
        }

        let mut current = Some(base);
        while let Some(dir) = current {
            let pkg_dir = dir.join("node_modules").join(pkg_name);
            if pkg_dir.is_dir() {
                let found = match subpath {
                    Some(sub) => resolve_file_or_directory(&pkg_dir.join(sub), request, base),
                    None => resolve_package_entry(&pkg_dir, request, base),
                };
                if found.is_ok() {
                    return found;
                }
            }

            if self.root.as_deref() == Some(dir) {
                break;
            }
            current = dir.parent();
        }

        Err(ResolveError::new(
            request,
            base,
            format!("Cannot find package '{pkg_name}' in node_modules"),
        ))
    }
}

impl ResolveStrategies for FsHost {
    fn attempt<'a>(
        &'a self,
        strategy: Strategy,
        candidate: &'a Candidate,
    ) -> BoxFuture<'a, Outcome> {
        let outcome = self.resolve_sync(strategy, candidate);
        Box::pin(async move { outcome })
    }
}

/// Split a bare specifier into package name and subpath.
fn parse_bare_specifier(specifier: &str) -> (&str, Option<&str>) {
    let split_at = if specifier.starts_with('@') {
        // @scope/pkg[/subpath]
        specifier.match_indices('/').nth(1).map(|(idx, _)| idx)
    } else {
        specifier.find('/')
    };

    match split_at {
        Some(idx) => {
            let sub = &specifier[idx + 1..];
            (&specifier[..idx], (!sub.is_empty()).then_some(sub))
        }
        None => (specifier, None),
    }
}

/// Resolve a package directory's entry point from `module`, `main`, then index files.
fn resolve_package_entry(
    pkg_dir: &Path,
    request: &str,
    base: &Path,
) -> Result<PathBuf, ResolveError> {
    let pkg_json = pkg_dir.join("package.json");
    if let Ok(content) = std::fs::read_to_string(&pkg_json) {
        let json: serde_json::Value = serde_json::from_str(&content)
            .map_err(|e| ResolveError::new(request, &pkg_json, e.to_string()))?;

        for field in ["module", "main"] {
            if let Some(entry) = json.get(field).and_then(|v| v.as_str()) {
                if let Ok(found) = resolve_file_or_directory(&pkg_dir.join(entry), request, base) {
                    return Ok(found);
                }
            }
        }
    }

    resolve_file_or_directory(pkg_dir, request, base)
}

/// Resolve a path that might be a file, a file without extension, or a directory.
fn resolve_file_or_directory(
    target: &Path,
    request: &str,
    base: &Path,
) -> Result<PathBuf, ResolveError> {
    let canonical = |path: &Path| {
        dunce::canonicalize(path).map_err(|e| ResolveError::new(request, base, e.to_string()))
    };

    if target.is_file() {
        return canonical(target);
    }

    for ext in EXTENSIONS {
        let with_ext = PathBuf::from(format!("{}{}", target.display(), ext));
        if with_ext.is_file() {
            return canonical(&with_ext);
        }
    }

    if target.is_dir() {
        for index in INDEX_FILES {
            let index_path = target.join(index);
            if index_path.is_file() {
                return canonical(&index_path);
            }
        }
    }

    Err(ResolveError::new(request, base, "File not found"))
}
