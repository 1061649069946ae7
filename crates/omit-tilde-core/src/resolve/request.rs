use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Resolution strategy a host can be asked to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Treat the request as a path relative to the candidate's directory.
    Directory,
    /// Treat the request as a package lookup.
    Module,
}

impl Strategy {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Directory => "directory",
            Self::Module => "module",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A pending resolution request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Directory the request is made from.
    pub base_path: PathBuf,
    /// Request text as written, possibly with a `loader!` chain.
    pub request: String,
    /// Query suffix, carried through rewrites untouched.
    pub query: Option<String>,
    /// Set on candidates re-issued as module lookups.
    pub module: bool,
}

impl Candidate {
    /// Create a candidate without a query.
    pub fn new(base_path: impl Into<PathBuf>, request: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into(),
            request: request.into(),
            query: None,
            module: false,
        }
    }

    /// Create a candidate from a specifier as it appears in source,
    /// splitting a `?query` suffix off the request.
    pub fn from_specifier(base_path: impl Into<PathBuf>, specifier: &str) -> Self {
        match specifier.split_once('?') {
            Some((request, query)) => {
                Self::new(base_path, request).with_query(format!("?{query}"))
            }
            None => Self::new(base_path, specifier),
        }
    }

    /// Set the query suffix.
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    /// The request without any loader chain.
    #[must_use]
    pub fn stripped_request(&self) -> &str {
        strip_loaders(&self.request)
    }

    /// A copy of this candidate re-targeted as a module lookup for `request`.
    ///
    /// The base path and query are kept.
    #[must_use]
    pub fn amended(&self, request: impl Into<String>) -> Self {
        Self {
            base_path: self.base_path.clone(),
            request: request.into(),
            query: self.query.clone(),
            module: true,
        }
    }
}

/// Keep only the part of a request after the last `!`.
#[must_use]
pub fn strip_loaders(request: &str) -> &str {
    match request.rfind('!') {
        Some(idx) => &request[idx + 1..],
        None => request,
    }
}

/// A successfully resolved request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    /// Resolved file.
    pub path: PathBuf,
    /// Query carried over from the candidate.
    pub query: Option<String>,
}

impl Resolved {
    pub fn new(path: impl Into<PathBuf>, query: Option<String>) -> Self {
        Self {
            path: path.into(),
            query,
        }
    }
}

/// Error reported by a host strategy. Passed through unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Cannot resolve '{specifier}' from '{from}': {message}")]
pub struct ResolveError {
    pub specifier: String,
    pub from: String,
    pub message: String,
}

impl ResolveError {
    pub fn new(specifier: impl Into<String>, from: &Path, message: impl Into<String>) -> Self {
        Self {
            specifier: specifier.into(),
            from: from.display().to_string(),
            message: message.into(),
        }
    }
}

/// What a strategy produced: an error, nothing, or a resolved file.
pub type Outcome = Result<Option<Resolved>, ResolveError>;

/// Whether an outcome counts as a successful resolution.
#[must_use]
pub fn is_success(outcome: &Outcome) -> bool {
    matches!(outcome, Ok(Some(_)))
}

/// Result of a directory-stage interceptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interception {
    /// Continue with the rest of the stage.
    NotHandled,
    /// Complete the stage with this outcome.
    Handled(Outcome),
}
