#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::return_self_not_must_use)]

//! Rewrite relative requests that name a watched package into module lookups.
//!
//! A request such as `./lodash/map` inside a project that depends on `lodash`
//! is re-resolved as `lodash/map` through the host's module strategy. The
//! pieces are:
//!
//! - [`rewrite::filter`] decides whether a request is a rewrite candidate
//! - [`rewrite::guard`] keeps the same request from being rewritten re-entrantly
//! - [`rewrite::reconcile`] issues the module attempt and picks the final outcome
//! - [`diagnostics`] collects deduplicated advisories per build
//!
//! [`plugin::OmitTildePlugin`] wires them into a [`resolve::ResolvePipeline`].

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod imports;
pub mod manifest;
pub mod plugin;
pub mod resolve;
pub mod rewrite;
pub mod version;

pub use config::{Options, Pattern, Policy};
pub use diagnostics::AdvisorySink;
pub use error::Error;
pub use imports::{scan_imports, ImportSpec};
pub use plugin::OmitTildePlugin;
pub use resolve::{
    BuildHooks, Candidate, DirectoryInterceptor, FsHost, Interception, Outcome, ResolveError,
    ResolvePipeline, ResolveStrategies, Resolved, ResolverPlugin, Strategy,
};
pub use rewrite::{Matcher, RecursionGuard, RecursionKey, RewriteConfig, Rewriter};
pub use version::VERSION;
