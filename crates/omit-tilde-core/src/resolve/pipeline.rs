//! Resolution pipeline with a pluggable directory stage.
//!
//! Mirrors how a bundler's resolver is extended: plugins register build
//! hooks and interceptors on the directory stage, and interceptors may issue
//! sub-resolutions through the pipeline itself.
//!
//! ## Example
//!
//! ```ignore
//! use omit_tilde_core::{Candidate, FsHost, OmitTildePlugin, Options, ResolvePipeline};
//! use std::sync::Arc;
//!
//! let mut pipeline = ResolvePipeline::new(Arc::new(FsHost::new()));
//! let plugin = Arc::new(OmitTildePlugin::new(Options::default(), &cwd));
//! pipeline.apply(plugin);
//!
//! pipeline.build_start();
//! let outcome = pipeline.resolve(&Candidate::new(&src_dir, "./lodash/map")).await;
//! let warnings = pipeline.after_compile();
//! ```

use super::request::{Candidate, Interception, Outcome, Strategy};
use futures::future::BoxFuture;
use std::sync::Arc;

/// The host's resolution capability.
///
/// Implementations complete asynchronously with the host's own error and
/// result; callers must not assume any particular completion time.
pub trait ResolveStrategies: Send + Sync {
    /// Resolve `candidate` under `strategy`.
    fn attempt<'a>(&'a self, strategy: Strategy, candidate: &'a Candidate)
        -> BoxFuture<'a, Outcome>;
}

/// An interceptor on the directory stage.
pub trait DirectoryInterceptor: Send + Sync {
    /// Name for debugging.
    fn name(&self) -> &str;

    /// Inspect a directory-stage candidate.
    ///
    /// `resolver` is the pipeline the interceptor is registered on, so
    /// sub-resolutions re-enter the directory stage.
    fn intercept<'a>(
        &'a self,
        candidate: &'a Candidate,
        resolver: &'a dyn ResolveStrategies,
    ) -> BoxFuture<'a, Interception>;
}

/// Build lifecycle hooks.
pub trait BuildHooks: Send + Sync {
    /// Called when a build cycle starts.
    fn build_start(&self) {}

    /// Called when a build cycle completes; push diagnostics into `warnings`.
    fn after_compile(&self, _warnings: &mut Vec<String>) {}
}

/// A plugin that registers itself on a pipeline.
pub trait ResolverPlugin: Send + Sync {
    /// Plugin name for debugging.
    fn name(&self) -> &str;

    /// Register hooks and interceptors.
    fn apply(self: Arc<Self>, pipeline: &mut ResolvePipeline);
}

/// Pick the strategy a host would use for a fresh candidate.
///
/// Relative and absolute paths go to the directory stage; everything else
/// (bare names, `~name`) is a module lookup.
#[must_use]
pub fn natural_strategy(candidate: &Candidate) -> Strategy {
    if candidate.module {
        return Strategy::Module;
    }
    let request = candidate.stripped_request();
    let is_path = request == "."
        || request == ".."
        || request.starts_with("./")
        || request.starts_with("../")
        || request.starts_with(".\\")
        || request.starts_with("..\\")
        || request.starts_with('/')
        || std::path::Path::new(request).is_absolute();
    if is_path {
        Strategy::Directory
    } else {
        Strategy::Module
    }
}

/// A resolver with a directory stage that plugins can intercept.
pub struct ResolvePipeline {
    base: Arc<dyn ResolveStrategies>,
    interceptors: Vec<Arc<dyn DirectoryInterceptor>>,
    hooks: Vec<Arc<dyn BuildHooks>>,
}

impl ResolvePipeline {
    /// Create a pipeline on top of the host's base strategies.
    pub fn new(base: Arc<dyn ResolveStrategies>) -> Self {
        Self {
            base,
            interceptors: Vec::new(),
            hooks: Vec::new(),
        }
    }

    /// Let a plugin register itself.
    pub fn apply<P: ResolverPlugin + 'static>(&mut self, plugin: Arc<P>) {
        plugin.apply(self);
    }

    /// Register a directory-stage interceptor. Interceptors run in registration order.
    pub fn on_directory(&mut self, interceptor: Arc<dyn DirectoryInterceptor>) {
        self.interceptors.push(interceptor);
    }

    /// Register build lifecycle hooks.
    pub fn on_build(&mut self, hooks: Arc<dyn BuildHooks>) {
        self.hooks.push(hooks);
    }

    /// Whether any directory interceptor is registered.
    pub fn has_interceptors(&self) -> bool {
        !self.interceptors.is_empty()
    }

    /// Names of the registered interceptors, in order.
    pub fn interceptor_names(&self) -> Vec<&str> {
        self.interceptors.iter().map(|i| i.name()).collect()
    }

    /// Start a build cycle.
    pub fn build_start(&self) {
        for hooks in &self.hooks {
            hooks.build_start();
        }
    }

    /// Complete a build cycle and collect the warnings hooks produced.
    pub fn after_compile(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        for hooks in &self.hooks {
            hooks.after_compile(&mut warnings);
        }
        warnings
    }

    /// Resolve a fresh request with the strategy its form implies.
    pub fn resolve<'a>(&'a self, candidate: &'a Candidate) -> BoxFuture<'a, Outcome> {
        self.attempt(natural_strategy(candidate), candidate)
    }
}

impl ResolveStrategies for ResolvePipeline {
    fn attempt<'a>(
        &'a self,
        strategy: Strategy,
        candidate: &'a Candidate,
    ) -> BoxFuture<'a, Outcome> {
        Box::pin(async move {
            if strategy == Strategy::Directory {
                for interceptor in &self.interceptors {
                    if let Interception::Handled(outcome) =
                        interceptor.intercept(candidate, self).await
                    {
                        return outcome;
                    }
                }
            }
            self.base.attempt(strategy, candidate).await
        })
    }
}
