//! The omit-tilde resolver plugin.
//!
//! Registers build hooks on every pipeline, and a directory-stage
//! interceptor only when there is at least one watched name.

use crate::config::Options;
use crate::diagnostics::{prefixed, AdvisorySink};
use crate::manifest;
use crate::resolve::{
    BuildHooks, Candidate, DirectoryInterceptor, Interception, ResolvePipeline, ResolveStrategies,
    ResolverPlugin,
};
use crate::rewrite::{Matcher, RewriteConfig, Rewriter};
use crate::version::PACKAGE_NAME;
use futures::future::BoxFuture;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Advisory recorded when there is nothing to rewrite.
pub const NO_DEPENDENCIES: &str = "No dependencies found, plugin will not run";

/// Rewrites `./<dependency>/...` requests into module lookups.
#[derive(Debug)]
pub struct OmitTildePlugin {
    rewriter: Rewriter,
    sink: Arc<AdvisorySink>,
    /// Configuration advisories, re-recorded at the start of every build.
    startup: Vec<String>,
}

impl OmitTildePlugin {
    /// Build the plugin from options, resolving manifest paths against `cwd`.
    ///
    /// Unreadable manifests and invalid patterns do not fail construction;
    /// they become advisories.
    #[must_use]
    pub fn new(options: Options, cwd: &Path) -> Self {
        let watched = manifest::watched_names(cwd, &options.include, &options.exclude);
        let (matcher, pattern_errors) = Matcher::compile(&options.path_test, &options.test);

        let startup: Vec<String> = watched
            .errors
            .iter()
            .chain(pattern_errors.iter())
            .map(|e| prefixed(&e.to_string()))
            .collect();

        let config = RewriteConfig {
            watched_names: watched.names,
            matcher,
            deprecate: options.deprecate,
            verbose: options.verbose,
            policy: options.policy,
        };
        Self::with_advisories(config, startup)
    }

    /// Build the plugin from an already computed configuration.
    #[must_use]
    pub fn from_config(config: RewriteConfig) -> Self {
        Self::with_advisories(config, Vec::new())
    }

    fn with_advisories(config: RewriteConfig, mut startup: Vec<String>) -> Self {
        if config.watched_names.is_empty() {
            startup.push(prefixed(NO_DEPENDENCIES));
        }

        debug!(
            names = config.watched_names.len(),
            policy = config.policy.as_str(),
            deprecate = config.deprecate,
            advisories = startup.len(),
            "configured"
        );

        let sink = Arc::new(AdvisorySink::new());
        for message in &startup {
            sink.record(message.as_str());
        }

        Self {
            rewriter: Rewriter::new(config, sink.clone()),
            sink,
            startup,
        }
    }

    /// Whether the directory interceptor will be registered.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.rewriter.config().watched_names.is_empty()
    }

    /// The watched package names.
    #[must_use]
    pub fn watched_names(&self) -> &BTreeSet<String> {
        &self.rewriter.config().watched_names
    }

    /// Advisories produced while configuring.
    #[must_use]
    pub fn startup_advisories(&self) -> &[String] {
        &self.startup
    }

    #[must_use]
    pub fn rewriter(&self) -> &Rewriter {
        &self.rewriter
    }

    #[must_use]
    pub fn sink(&self) -> &AdvisorySink {
        &self.sink
    }
}

impl BuildHooks for OmitTildePlugin {
    fn build_start(&self) {
        self.rewriter.reset();
        self.sink.reset();
        for message in &self.startup {
            self.sink.record(message.as_str());
        }
    }

    fn after_compile(&self, warnings: &mut Vec<String>) {
        self.sink.flush_to(warnings);
    }
}

impl DirectoryInterceptor for OmitTildePlugin {
    fn name(&self) -> &str {
        PACKAGE_NAME
    }

    fn intercept<'a>(
        &'a self,
        candidate: &'a Candidate,
        resolver: &'a dyn ResolveStrategies,
    ) -> BoxFuture<'a, Interception> {
        Box::pin(self.rewriter.reconcile(candidate, resolver))
    }
}

impl ResolverPlugin for OmitTildePlugin {
    fn name(&self) -> &str {
        PACKAGE_NAME
    }

    fn apply(self: Arc<Self>, pipeline: &mut ResolvePipeline) {
        pipeline.on_build(self.clone());
        if self.is_active() {
            pipeline.on_directory(self);
        } else {
            debug!("no watched names, directory interceptor not registered");
        }
    }
}
