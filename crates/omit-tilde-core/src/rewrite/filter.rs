//! Eligibility filter.
//!
//! A request is a rewrite candidate when, after dropping any loader chain, it
//! is a single leading `./` segment naming a watched package, e.g.
//! `./lodash/map` with `lodash` watched. `../lodash`, `lodash`, `./.cache`
//! and `./~x` are never candidates.

use super::guard::RecursionKey;
use super::RewriteConfig;
use crate::config::Pattern;
use crate::error::Error;
use crate::resolve::{strip_loaders, Candidate};
use std::fmt;

/// A compiled string condition.
#[derive(Debug, Clone)]
enum Condition {
    Prefix(String),
    Regex(regex_lite::Regex),
    /// An invalid regex; never matches.
    Never,
}

impl Condition {
    fn is_match(&self, s: &str) -> bool {
        match self {
            Self::Prefix(prefix) => s.starts_with(prefix.as_str()),
            Self::Regex(re) => re.is_match(s),
            Self::Never => false,
        }
    }
}

/// Restricts rewriting by requesting directory and raw request text.
///
/// Each side passes when it has no conditions; otherwise any one condition
/// must match. Both sides must pass.
#[derive(Debug, Clone, Default)]
pub struct Matcher {
    path: Vec<Condition>,
    request: Vec<Condition>,
}

impl Matcher {
    /// Compile path and request patterns.
    ///
    /// Returns `None` when both lists are empty. Invalid regexes are reported
    /// and compiled to conditions that never match.
    #[must_use]
    pub fn compile(path: &[Pattern], request: &[Pattern]) -> (Option<Self>, Vec<Error>) {
        if path.is_empty() && request.is_empty() {
            return (None, Vec::new());
        }

        let mut errors = Vec::new();
        let mut compile_all = |patterns: &[Pattern]| -> Vec<Condition> {
            patterns
                .iter()
                .map(|pattern| match pattern {
                    Pattern::Prefix(prefix) => Condition::Prefix(prefix.clone()),
                    Pattern::Regex { regex } => match regex_lite::Regex::new(regex) {
                        Ok(re) => Condition::Regex(re),
                        Err(e) => {
                            errors.push(Error::InvalidPattern {
                                pattern: regex.clone(),
                                message: e.to_string(),
                            });
                            Condition::Never
                        }
                    },
                })
                .collect()
        };

        let matcher = Self {
            path: compile_all(path),
            request: compile_all(request),
        };
        (Some(matcher), errors)
    }

    /// Whether `base_path` and `request` both pass.
    #[must_use]
    pub fn matches(&self, base_path: &str, request: &str) -> bool {
        passes(&self.path, base_path) && passes(&self.request, request)
    }
}

fn passes(conditions: &[Condition], s: &str) -> bool {
    conditions.is_empty() || conditions.iter().any(|c| c.is_match(s))
}

/// An eligible request, ready to be re-issued as a module lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewrite {
    /// Identity used by the recursion guard.
    pub key: RecursionKey,
    /// Watched package the request names.
    pub name: String,
    /// Loader-free request as written, e.g. `./lodash/map`.
    pub relative_request: String,
    /// Request for the module attempt, e.g. `lodash/map`.
    pub module_request: String,
}

/// Why a request is not a rewrite candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// Does not start with exactly one `./` or `.\`.
    NotRelative,
    /// Normalizes to nothing, or to something hidden, aliased or absolute.
    NotSingleSegment,
    /// The path or request patterns did not match.
    Unmatched,
    /// The first segment is not a watched name.
    NotWatched(String),
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotRelative => f.write_str("not relative"),
            Self::NotSingleSegment => f.write_str("not a single leading segment"),
            Self::Unmatched => f.write_str("excluded by matcher"),
            Self::NotWatched(name) => write!(f, "'{name}' is not watched"),
        }
    }
}

/// Normalize the part of a relative request after its leading `./`.
///
/// Separators are unified to `/`, empty and `.` segments dropped, and `..`
/// collapsed where possible. Returns `None` when the remainder starts with a
/// separator, normalizes to nothing, or its first segment starts with `.`
/// or `~`.
#[must_use]
pub fn normalize_relative(rest: &str) -> Option<String> {
    if rest.starts_with(is_separator) {
        return None;
    }

    let mut segments: Vec<&str> = Vec::new();
    for segment in rest.split(is_separator) {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.last().is_some_and(|last| *last != "..") {
                    segments.pop();
                } else {
                    segments.push("..");
                }
            }
            other => segments.push(other),
        }
    }

    let first = segments.first()?;
    if first.starts_with('.') || first.starts_with('~') {
        return None;
    }
    Some(segments.join("/"))
}

fn is_separator(c: char) -> bool {
    c == '/' || c == '\\'
}

/// Check a candidate against the config without tracing.
pub fn check(candidate: &Candidate, config: &RewriteConfig) -> Result<Rewrite, Rejection> {
    let stripped = strip_loaders(&candidate.request);
    let rest = stripped
        .strip_prefix("./")
        .or_else(|| stripped.strip_prefix(".\\"))
        .ok_or(Rejection::NotRelative)?;

    let normalized = normalize_relative(rest).ok_or(Rejection::NotSingleSegment)?;

    if let Some(matcher) = &config.matcher {
        if !matcher.matches(&candidate.base_path.to_string_lossy(), &candidate.request) {
            return Err(Rejection::Unmatched);
        }
    }

    let name = normalized.split('/').next().unwrap_or_default();
    if !config.watched_names.contains(name) {
        return Err(Rejection::NotWatched(name.to_string()));
    }

    Ok(Rewrite {
        key: RecursionKey::new(candidate.base_path.clone(), normalized.clone()),
        name: name.to_string(),
        relative_request: stripped.to_string(),
        module_request: rest.to_string(),
    })
}

/// Check a candidate, tracing the decision when the config is verbose.
#[must_use]
pub fn evaluate(candidate: &Candidate, config: &RewriteConfig) -> Option<Rewrite> {
    let result = check(candidate, config);
    if config.verbose {
        match &result {
            Ok(rewrite) => tracing::info!(
                base_path = %candidate.base_path.display(),
                request = %candidate.request,
                name = %rewrite.name,
                rewritten = %rewrite.module_request,
                "rewrite candidate"
            ),
            Err(reason) => tracing::info!(
                base_path = %candidate.base_path.display(),
                request = %candidate.request,
                reason = %reason,
                "not a rewrite candidate"
            ),
        }
    }
    result.ok()
}

/// Whether a candidate should be rewritten.
#[must_use]
pub fn is_eligible(candidate: &Candidate, config: &RewriteConfig) -> bool {
    evaluate(candidate, config).is_some()
}
