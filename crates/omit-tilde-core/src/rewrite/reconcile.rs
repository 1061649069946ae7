//! Rewrite reconciler.
//!
//! Re-issues an eligible request as a module lookup and decides which
//! outcome the directory stage completes with.
//!
//! | policy            | deprecate | directory attempt | final outcome                     |
//! |-------------------|-----------|-------------------|-----------------------------------|
//! | `DirectoryFirst`  | any       | succeeds          | directory outcome, no rewrite     |
//! | `DirectoryFirst`  | `false`   | fails             | module outcome                    |
//! | `DirectoryFirst`  | `true`    | fails             | directory outcome                 |
//! | `RelativeFirst`   | `false`   | not issued        | module outcome                    |
//! | `RelativeFirst`   | `true`    | not issued        | not handled                       |
//!
//! A successful module attempt records one advisory per distinct
//! (directory, old request, new request).

use super::filter::{evaluate, Rewrite};
use super::guard::{RecursionGuard, RecursionKey};
use super::RewriteConfig;
use crate::config::Policy;
use crate::diagnostics::{prefixed, AdvisorySink};
use crate::resolve::{is_success, Candidate, Interception, Outcome, ResolveStrategies, Strategy};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Format the advisory for one rewrite.
#[must_use]
pub fn advisory_text(directory: &Path, old_request: &str, new_request: &str) -> String {
    prefixed(&format!(
        "files should use ~ to refer to modules:\n  in directory: \"{}\"\n  change \"{old_request}\" -> \"~{new_request}\"",
        directory.display()
    ))
}

/// Runs the rewrite for one plugin instance.
#[derive(Debug)]
pub struct Rewriter {
    config: RewriteConfig,
    guard: RecursionGuard,
    sink: Arc<AdvisorySink>,
}

impl Rewriter {
    /// Create a rewriter recording advisories into `sink`.
    #[must_use]
    pub fn new(config: RewriteConfig, sink: Arc<AdvisorySink>) -> Self {
        Self {
            config,
            guard: RecursionGuard::new(),
            sink,
        }
    }

    #[must_use]
    pub fn config(&self) -> &RewriteConfig {
        &self.config
    }

    #[must_use]
    pub fn guard(&self) -> &RecursionGuard {
        &self.guard
    }

    /// Forget in-flight keys from a previous build.
    pub fn reset(&self) {
        self.guard.reset();
    }

    /// Decide how the directory stage completes for `candidate`.
    ///
    /// Ineligible and re-entrant candidates are [`Interception::NotHandled`].
    /// Errors from `strategies` are passed through as-is.
    pub async fn reconcile(
        &self,
        candidate: &Candidate,
        strategies: &dyn ResolveStrategies,
    ) -> Interception {
        let Some(rewrite) = evaluate(candidate, &self.config) else {
            return Interception::NotHandled;
        };

        if !self.guard.try_enter(&rewrite.key) {
            debug!(request = %candidate.request, "rewrite already in flight, skipping");
            return Interception::NotHandled;
        }
        // Leaves on completion and when the future is dropped mid-attempt.
        let _held = Held {
            guard: &self.guard,
            key: &rewrite.key,
        };

        match self.config.policy {
            Policy::DirectoryFirst => {
                let original = strategies.attempt(Strategy::Directory, candidate).await;
                if is_success(&original) {
                    Interception::Handled(original)
                } else {
                    self.rewrite(candidate, &rewrite, Some(original), strategies)
                        .await
                }
            }
            Policy::RelativeFirst => self.rewrite(candidate, &rewrite, None, strategies).await,
        }
    }

    async fn rewrite(
        &self,
        candidate: &Candidate,
        rewrite: &Rewrite,
        original: Option<Outcome>,
        strategies: &dyn ResolveStrategies,
    ) -> Interception {
        let amended = candidate.amended(rewrite.module_request.as_str());
        let alternate = strategies.attempt(Strategy::Module, &amended).await;
        debug!(
            request = %candidate.request,
            rewritten = %amended.request,
            resolved = is_success(&alternate),
            "module attempt finished"
        );

        if is_success(&alternate) {
            self.sink.record(advisory_text(
                &candidate.base_path,
                &rewrite.relative_request,
                &amended.request,
            ));
        }

        if !self.config.deprecate {
            return Interception::Handled(alternate);
        }
        match original {
            Some(outcome) => Interception::Handled(outcome),
            None => Interception::NotHandled,
        }
    }
}

/// Releases a guard key when dropped.
struct Held<'a> {
    guard: &'a RecursionGuard,
    key: &'a RecursionKey,
}

impl Drop for Held<'_> {
    fn drop(&mut self) {
        self.guard.leave(self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::{ResolveError, Resolved};
    use futures::future::BoxFuture;
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::sync::Mutex;

    /// Host answering from a fixed table; unknown requests fail.
    #[derive(Default)]
    struct Scripted {
        answers: HashMap<(Strategy, String), PathBuf>,
        calls: Mutex<Vec<(Strategy, Candidate)>>,
    }

    impl Scripted {
        fn answer(mut self, strategy: Strategy, request: &str, path: &str) -> Self {
            self.answers
                .insert((strategy, request.to_string()), PathBuf::from(path));
            self
        }

        fn calls(&self) -> Vec<(Strategy, Candidate)> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl ResolveStrategies for Scripted {
        fn attempt<'a>(
            &'a self,
            strategy: Strategy,
            candidate: &'a Candidate,
        ) -> BoxFuture<'a, Outcome> {
            self.calls.lock().unwrap().push((strategy, candidate.clone()));
            let outcome = match self.answers.get(&(strategy, candidate.request.clone())) {
                Some(path) => Ok(Some(Resolved::new(path.clone(), candidate.query.clone()))),
                None => Err(ResolveError::new(
                    candidate.request.clone(),
                    &candidate.base_path,
                    "File not found",
                )),
            };
            Box::pin(async move { outcome })
        }
    }

    fn rewriter(config: RewriteConfig) -> (Rewriter, Arc<AdvisorySink>) {
        let sink = Arc::new(AdvisorySink::new());
        (Rewriter::new(config, sink.clone()), sink)
    }

    fn lodash_map() -> Candidate {
        Candidate::new("/app/src", "./lodash/map")
    }

    fn warnings(sink: &AdvisorySink) -> Vec<String> {
        let mut out = Vec::new();
        sink.flush_to(&mut out);
        out
    }

    #[tokio::test]
    async fn test_directory_failure_rewrites_to_module() {
        let (rewriter, sink) = rewriter(RewriteConfig::new(["lodash"]));
        let host = Scripted::default().answer(Strategy::Module, "lodash/map", "/nm/lodash/map.js");

        let result = rewriter.reconcile(&lodash_map(), &host).await;

        assert_eq!(
            result,
            Interception::Handled(Ok(Some(Resolved::new("/nm/lodash/map.js", None))))
        );
        let calls = host.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].0, Strategy::Directory);
        assert_eq!(calls[0].1.request, "./lodash/map");
        assert_eq!(calls[1].0, Strategy::Module);
        assert_eq!(calls[1].1.request, "lodash/map");
        assert!(calls[1].1.module);

        let warnings = warnings(&sink);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("in directory: \"/app/src\""));
        assert!(warnings[0].contains("\"./lodash/map\" -> \"~lodash/map\""));
    }

    #[tokio::test]
    async fn test_directory_success_wins() {
        let (rewriter, sink) = rewriter(RewriteConfig::new(["lodash"]));
        let host = Scripted::default()
            .answer(Strategy::Directory, "./lodash/map", "/app/src/lodash/map.js")
            .answer(Strategy::Module, "lodash/map", "/nm/lodash/map.js");

        let result = rewriter.reconcile(&lodash_map(), &host).await;

        assert_eq!(
            result,
            Interception::Handled(Ok(Some(Resolved::new("/app/src/lodash/map.js", None))))
        );
        assert_eq!(host.calls().len(), 1);
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn test_deprecate_keeps_original_failure_but_advises() {
        let (rewriter, sink) = rewriter(RewriteConfig::new(["lodash"]).with_deprecate(true));
        let host = Scripted::default().answer(Strategy::Module, "lodash/map", "/nm/lodash/map.js");

        let result = rewriter.reconcile(&lodash_map(), &host).await;

        let Interception::Handled(Err(err)) = &result else {
            panic!("expected the original failure, got {result:?}");
        };
        assert_eq!(err.specifier, "./lodash/map");
        assert_eq!(sink.len(), 1);
    }

    #[tokio::test]
    async fn test_module_failure_is_propagated_without_advisory() {
        let (rewriter, sink) = rewriter(RewriteConfig::new(["lodash"]));
        let host = Scripted::default();

        let result = rewriter.reconcile(&lodash_map(), &host).await;

        let Interception::Handled(Err(err)) = &result else {
            panic!("expected the module failure, got {result:?}");
        };
        assert_eq!(err.specifier, "lodash/map");
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn test_relative_first_skips_directory_attempt() {
        let config = RewriteConfig::new(["lodash"]).with_policy(Policy::RelativeFirst);
        let (rewriter, sink) = rewriter(config);
        let host = Scripted::default()
            .answer(Strategy::Directory, "./lodash/map", "/app/src/lodash/map.js")
            .answer(Strategy::Module, "lodash/map", "/nm/lodash/map.js");

        let result = rewriter.reconcile(&lodash_map(), &host).await;

        assert_eq!(
            result,
            Interception::Handled(Ok(Some(Resolved::new("/nm/lodash/map.js", None))))
        );
        let calls = host.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, Strategy::Module);
        assert_eq!(sink.len(), 1);
    }

    #[tokio::test]
    async fn test_relative_first_deprecate_is_not_handled() {
        let config = RewriteConfig::new(["lodash"])
            .with_policy(Policy::RelativeFirst)
            .with_deprecate(true);
        let (rewriter, sink) = rewriter(config);
        let host = Scripted::default().answer(Strategy::Module, "lodash/map", "/nm/lodash/map.js");

        let result = rewriter.reconcile(&lodash_map(), &host).await;

        assert_eq!(result, Interception::NotHandled);
        assert_eq!(sink.len(), 1);
    }

    #[tokio::test]
    async fn test_ineligible_request_is_untouched() {
        let (rewriter, sink) = rewriter(RewriteConfig::new(["lodash"]));
        let host = Scripted::default();

        let result = rewriter
            .reconcile(&Candidate::new("/app/src", "../lodash/map"), &host)
            .await;

        assert_eq!(result, Interception::NotHandled);
        assert!(host.calls().is_empty());
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn test_query_preserved_on_amended_candidate() {
        let (rewriter, _sink) = rewriter(RewriteConfig::new(["lodash"]));
        let host = Scripted::default().answer(Strategy::Module, "lodash/map", "/nm/lodash/map.js");
        let candidate = lodash_map().with_query("?raw");

        let result = rewriter.reconcile(&candidate, &host).await;

        let Interception::Handled(Ok(Some(resolved))) = &result else {
            panic!("expected a resolution, got {result:?}");
        };
        assert_eq!(resolved.query.as_deref(), Some("?raw"));
        assert_eq!(host.calls()[1].1.query.as_deref(), Some("?raw"));
    }

    #[tokio::test]
    async fn test_same_advisory_recorded_once_per_cycle() {
        let (rewriter, sink) = rewriter(RewriteConfig::new(["lodash"]));
        let host = Scripted::default().answer(Strategy::Module, "lodash/map", "/nm/lodash/map.js");

        for _ in 0..3 {
            rewriter.reconcile(&lodash_map(), &host).await;
            while !rewriter.guard().is_empty() {
                tokio::task::yield_now().await;
            }
        }
        assert_eq!(host.calls().len(), 6);
        assert_eq!(sink.len(), 1);
    }

    /// Host whose directory attempt re-enters the rewriter for the same candidate.
    struct Reentrant {
        rewriter: Rewriter,
        nested: Mutex<Vec<Interception>>,
        module_calls: Mutex<usize>,
    }

    impl ResolveStrategies for Reentrant {
        fn attempt<'a>(
            &'a self,
            strategy: Strategy,
            candidate: &'a Candidate,
        ) -> BoxFuture<'a, Outcome> {
            Box::pin(async move {
                match strategy {
                    Strategy::Directory => {
                        let nested = self.rewriter.reconcile(candidate, self).await;
                        self.nested.lock().unwrap().push(nested);
                        Err(ResolveError::new(
                            candidate.request.clone(),
                            &candidate.base_path,
                            "File not found",
                        ))
                    }
                    Strategy::Module => {
                        *self.module_calls.lock().unwrap() += 1;
                        Ok(Some(Resolved::new("/nm/lodash/map.js", None)))
                    }
                }
            })
        }
    }

    #[tokio::test]
    async fn test_reentrant_attempt_is_short_circuited() {
        let sink = Arc::new(AdvisorySink::new());
        let host = Reentrant {
            rewriter: Rewriter::new(RewriteConfig::new(["lodash"]), sink.clone()),
            nested: Mutex::new(Vec::new()),
            module_calls: Mutex::new(0),
        };

        let result = host.rewriter.reconcile(&lodash_map(), &host).await;

        assert!(matches!(result, Interception::Handled(Ok(Some(_)))));
        assert_eq!(
            host.nested.lock().unwrap().as_slice(),
            &[Interception::NotHandled]
        );
        assert_eq!(*host.module_calls.lock().unwrap(), 1);
        assert_eq!(sink.len(), 1);
    }

    #[tokio::test]
    async fn test_guard_released_after_tick() {
        let (rewriter, _sink) = rewriter(RewriteConfig::new(["lodash"]));
        let host = Scripted::default().answer(Strategy::Module, "lodash/map", "/nm/lodash/map.js");

        rewriter.reconcile(&lodash_map(), &host).await;
        assert!(!rewriter.guard().is_empty());

        // Same tick: a second independent call is still short-circuited.
        assert_eq!(
            rewriter.reconcile(&lodash_map(), &host).await,
            Interception::NotHandled
        );

        for _ in 0..16 {
            tokio::task::yield_now().await;
        }
        assert!(rewriter.guard().is_empty());
        assert!(matches!(
            rewriter.reconcile(&lodash_map(), &host).await,
            Interception::Handled(Ok(Some(_)))
        ));
    }

    /// Host whose attempts never complete.
    struct Stalled;

    impl ResolveStrategies for Stalled {
        fn attempt<'a>(&'a self, _: Strategy, _: &'a Candidate) -> BoxFuture<'a, Outcome> {
            Box::pin(futures::future::pending())
        }
    }

    #[tokio::test]
    async fn test_dropped_reconcile_releases_key() {
        let (rewriter, sink) = rewriter(RewriteConfig::new(["lodash"]));
        let candidate = lodash_map();

        let mut pending = Box::pin(rewriter.reconcile(&candidate, &Stalled));
        assert!(futures::poll!(&mut pending).is_pending());
        assert_eq!(rewriter.guard().len(), 1);

        drop(pending);
        while !rewriter.guard().is_empty() {
            tokio::task::yield_now().await;
        }

        let host = Scripted::default().answer(Strategy::Module, "lodash/map", "/nm/lodash/map.js");
        assert!(matches!(
            rewriter.reconcile(&candidate, &host).await,
            Interception::Handled(Ok(Some(_)))
        ));
        assert_eq!(sink.len(), 1);
    }
}
