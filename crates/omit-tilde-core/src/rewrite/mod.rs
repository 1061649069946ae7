//! The directory-to-module rewrite.
//!
//! [`filter`] gates, [`guard`] brackets, [`reconcile`] executes.

pub mod filter;
pub mod guard;
pub mod reconcile;

pub use filter::{check, evaluate, is_eligible, normalize_relative, Matcher, Rejection, Rewrite};
pub use guard::{RecursionGuard, RecursionKey};
pub use reconcile::{advisory_text, Rewriter};

use crate::config::Policy;
use std::collections::BTreeSet;

/// Immutable per-build rewrite configuration.
#[derive(Debug, Clone, Default)]
pub struct RewriteConfig {
    /// Package names whose relative spelling gets rewritten.
    pub watched_names: BTreeSet<String>,
    /// Optional restriction on where rewriting applies.
    pub matcher: Option<Matcher>,
    /// Advise only; keep the original outcome.
    pub deprecate: bool,
    /// Trace filter decisions.
    pub verbose: bool,
    /// How attempts are combined.
    pub policy: Policy,
}

impl RewriteConfig {
    /// Create a config watching `names`, with every other setting at its default.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            watched_names: names.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Set the matcher.
    #[must_use]
    pub fn with_matcher(mut self, matcher: Option<Matcher>) -> Self {
        self.matcher = matcher;
        self
    }

    /// Set deprecate mode.
    #[must_use]
    pub fn with_deprecate(mut self, deprecate: bool) -> Self {
        self.deprecate = deprecate;
        self
    }

    /// Set verbose tracing.
    #[must_use]
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Set the policy.
    #[must_use]
    pub fn with_policy(mut self, policy: Policy) -> Self {
        self.policy = policy;
        self
    }
}
