//! # waymark-std
//!
//! The engine of the Waymark route resolver.
//!
//! This crate provides:
//! - **Matching**: [`RouteMatcher`] walks a route tree lazily, parents first
//! - **Resolution**: [`Resolver`] offers candidates to route behaviours,
//!   follows redirects and reports failures
//! - **Navigation**: [`Navigator`] resolves full view chains, runs lifecycle
//!   hooks and commits to an [`Outlet`]
//! - **URL generation**: [`UrlGenerator`] by route name or component key
//! - **Handler wrappers**: Logging, Tracing, Timeout (see [`hooks`])
//! - **Testing doubles**: see [`testing`]

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

// Re-export core types
pub use waymark_core;

// Modules
pub mod hooks;
pub mod matcher;
pub mod navigator;
pub mod resolver;
pub mod testing;
pub mod urls;

pub use matcher::{MatchCandidate, RouteMatcher};
pub use navigator::{Navigation, Navigator, NoopOutlet, Outlet, OutletUpdate, ViewLink};
pub use resolver::{
    DEFAULT_MAX_REDIRECTS, Outcome, ResolveRequest, Resolved, Resolver, ResolverBuilder,
    ResolverOptions,
};
pub use urls::UrlGenerator;
