//! Plugin options.
//!
//! Options arrive as loosely-typed JSON (a config file or a host's plugin
//! options object). Anything that is not a well-formed options object is
//! coerced to the defaults instead of failing the build.

use crate::error::Error;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;
use std::str::FromStr;

/// Manifest consulted when no `include` is given.
pub const DEFAULT_MANIFEST: &str = "package.json";

/// Options for [`crate::OmitTildePlugin`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Options {
    /// Package names and/or manifest paths (ending in `.json`) whose
    /// dependency names become rewrite candidates.
    #[serde(deserialize_with = "one_or_many")]
    pub include: Vec<String>,

    /// Package names removed from the included set.
    #[serde(deserialize_with = "one_or_many")]
    pub exclude: Vec<String>,

    /// Patterns the raw request text must match (any of).
    #[serde(deserialize_with = "one_or_many")]
    pub test: Vec<Pattern>,

    /// Patterns the requesting directory must match (any of).
    #[serde(deserialize_with = "one_or_many")]
    pub path_test: Vec<Pattern>,

    /// Only advise; keep the original resolution outcome.
    pub deprecate: bool,

    /// Trace every eligibility decision.
    pub verbose: bool,

    /// How the original and rewritten attempts are combined.
    pub policy: Policy,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            include: vec![DEFAULT_MANIFEST.to_string()],
            exclude: Vec::new(),
            test: Vec::new(),
            path_test: Vec::new(),
            deprecate: false,
            verbose: false,
            policy: Policy::default(),
        }
    }
}

impl Options {
    /// Build options from an arbitrary JSON value.
    ///
    /// Non-object values and objects with ill-typed fields yield the defaults.
    #[must_use]
    pub fn from_value(value: serde_json::Value) -> Self {
        if !value.is_object() {
            tracing::debug!(
                kind = json_type_name(&value),
                "options are not an object, using defaults"
            );
            return Self::default();
        }
        serde_json::from_value(value).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "invalid options, using defaults");
            Self::default()
        })
    }

    /// Load options from a JSON file.
    ///
    /// Unlike [`Options::from_value`], a file that is not valid JSON is an
    /// error: the caller asked for that file explicitly.
    pub fn from_file(path: &Path) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path)?;
        let value: serde_json::Value =
            serde_json::from_str(&content).map_err(|source| Error::OptionsParse {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self::from_value(value))
    }

    /// Replace the include list.
    #[must_use]
    pub fn with_include(mut self, include: Vec<String>) -> Self {
        self.include = include;
        self
    }

    /// Replace the exclude list.
    #[must_use]
    pub fn with_exclude(mut self, exclude: Vec<String>) -> Self {
        self.exclude = exclude;
        self
    }

    /// Replace the request patterns.
    #[must_use]
    pub fn with_test(mut self, test: Vec<Pattern>) -> Self {
        self.test = test;
        self
    }

    /// Replace the directory patterns.
    #[must_use]
    pub fn with_path_test(mut self, path_test: Vec<Pattern>) -> Self {
        self.path_test = path_test;
        self
    }

    /// Set deprecate mode.
    #[must_use]
    pub fn with_deprecate(mut self, deprecate: bool) -> Self {
        self.deprecate = deprecate;
        self
    }

    /// Set verbose tracing of filter decisions.
    #[must_use]
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Set the reconciliation policy.
    #[must_use]
    pub fn with_policy(mut self, policy: Policy) -> Self {
        self.policy = policy;
        self
    }
}

/// A string condition.
///
/// A plain string matches by prefix; `{ "regex": "..." }` matches by regex search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Pattern {
    Prefix(String),
    Regex { regex: String },
}

impl Pattern {
    /// Parse a command-line pattern: `/body/` is a regex, anything else a prefix.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.strip_prefix('/').and_then(|rest| rest.strip_suffix('/')) {
            Some(body) if !body.is_empty() => Self::Regex {
                regex: body.to_string(),
            },
            _ => Self::Prefix(s.to_string()),
        }
    }
}

/// How the reconciler combines the directory and module attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Policy {
    /// Resolve as a directory first; only rewrite when that fails.
    #[default]
    DirectoryFirst,
    /// Skip the directory attempt for eligible requests.
    RelativeFirst,
}

impl Policy {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DirectoryFirst => "directory-first",
            Self::RelativeFirst => "relative-first",
        }
    }
}

impl FromStr for Policy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "directory-first" => Ok(Self::DirectoryFirst),
            "relative-first" => Ok(Self::RelativeFirst),
            other => Err(Error::other(format!("unknown policy: {other}"))),
        }
    }
}

/// Accept either a single value or an array of values.
fn one_or_many<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany<T> {
        Many(Vec<T>),
        One(T),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::Many(v) => v,
        OneOrMany::One(v) => vec![v],
    })
}

fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_include_package_json() {
        let opts = Options::default();
        assert_eq!(opts.include, vec!["package.json"]);
        assert!(!opts.deprecate);
        assert_eq!(opts.policy, Policy::DirectoryFirst);
    }

    #[test]
    fn test_non_object_coerced_to_defaults() {
        assert_eq!(Options::from_value(json!(null)), Options::default());
        assert_eq!(Options::from_value(json!("lodash")), Options::default());
        assert_eq!(Options::from_value(json!([1, 2])), Options::default());
    }

    #[test]
    fn test_ill_typed_field_coerced_to_defaults() {
        let opts = Options::from_value(json!({ "deprecate": "yes" }));
        assert_eq!(opts, Options::default());
    }

    #[test]
    fn test_from_value_camel_case_and_single_values() {
        let opts = Options::from_value(json!({
            "include": "lodash",
            "exclude": ["react"],
            "test": { "regex": "\\.js$" },
            "pathTest": "/app/src",
            "deprecate": true,
            "verbose": true,
            "policy": "relative-first"
        }));

        assert_eq!(opts.include, vec!["lodash"]);
        assert_eq!(opts.exclude, vec!["react"]);
        assert_eq!(
            opts.test,
            vec![Pattern::Regex {
                regex: "\\.js$".to_string()
            }]
        );
        assert_eq!(opts.path_test, vec![Pattern::Prefix("/app/src".to_string())]);
        assert!(opts.deprecate);
        assert!(opts.verbose);
        assert_eq!(opts.policy, Policy::RelativeFirst);
    }

    #[test]
    fn test_missing_fields_keep_defaults() {
        let opts = Options::from_value(json!({ "deprecate": true }));
        assert_eq!(opts.include, vec!["package.json"]);
        assert!(opts.deprecate);
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("omit-tilde.json");
        std::fs::write(&path, r#"{"include": ["lodash", "rxjs"]}"#).unwrap();
        let opts = Options::from_file(&path).unwrap();
        assert_eq!(opts.include, vec!["lodash", "rxjs"]);

        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            Options::from_file(&path),
            Err(Error::OptionsParse { .. })
        ));
    }

    #[test]
    fn test_pattern_parse() {
        assert_eq!(Pattern::parse("src/"), Pattern::Prefix("src/".to_string()));
        assert_eq!(
            Pattern::parse("/^\\.\\/lib/"),
            Pattern::Regex {
                regex: "^\\.\\/lib".to_string()
            }
        );
        assert_eq!(Pattern::parse("//"), Pattern::Prefix("//".to_string()));
    }

    #[test]
    fn test_policy_round_trip_names() {
        for policy in [Policy::DirectoryFirst, Policy::RelativeFirst] {
            assert_eq!(policy.as_str().parse::<Policy>().unwrap(), policy);
        }
        assert!("sideways".parse::<Policy>().is_err());
    }
}
