//! Host-side resolution plumbing.
//!
//! The rewrite logic never probes the filesystem itself. It talks to the
//! host through [`ResolveStrategies`] and is registered on the directory
//! stage of a [`ResolvePipeline`]. [`FsHost`] is a small filesystem-backed
//! host used by the CLI and tests.

mod fs_host;
mod pipeline;
mod request;

pub use fs_host::FsHost;
pub use pipeline::{
    natural_strategy, BuildHooks, DirectoryInterceptor, ResolvePipeline, ResolveStrategies,
    ResolverPlugin,
};
pub use request::{
    is_success, strip_loaders, Candidate, Interception, Outcome, ResolveError, Resolved, Strategy,
};
