//! # waymark - Hierarchical URL Route Resolver
//!
//! `waymark` maps pathnames onto a tree of routes. Routes are tried
//! depth-first in registration order; each matching route's behaviour
//! decides whether to accept the path (with a view or a command) or to fall
//! through to the next candidate.
//!
//! ## Quick Start
//!
//! ```rust
//! use waymark::prelude::*;
//!
//! async fn profile(context: Context<String>, _: Commands) -> HandlerResult<String> {
//!     let id = context.params.get_str("id").unwrap_or_default();
//!     Ok(Resolution::View(format!("profile {id}")))
//! }
//!
//! # futures::executor::block_on(async {
//! let resolver = Resolver::new(vec![
//!     RouteDescriptor::new("/users").children(vec![
//!         RouteDescriptor::new("/:id").handler(profile).name("user"),
//!     ]),
//! ])
//! .unwrap();
//!
//! let resolved = resolver.resolve("/users/42").await.unwrap();
//! assert!(matches!(resolved.outcome(), Outcome::View(view) if view == "profile 42"));
//!
//! let params = Params::new().with("id", "7");
//! assert_eq!(resolver.url_for_name("user", &params).unwrap(), "/users/7");
//! # });
//! ```
//!
//! ## Navigation
//!
//! A [`Navigator`] keeps the displayed location. It resolves the full chain
//! of nested views for a pathname and runs the [`View`] lifecycle hooks
//! (`on_before_leave`, `on_before_enter`, `on_after_enter`,
//! `on_after_leave`) of the views that change. The latest navigation wins:
//! an overtaken one settles as [`Navigation::Superseded`].
//!
//! ## Crates
//!
//! - `waymark-core`: patterns, routes, commands, views, errors
//! - `waymark-std`: matcher, resolver, navigator, handler wrappers, testing doubles

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

// Patterns, parameters and URLs
pub use waymark_core::{
    CompiledPattern, Key, KeyName, MAX_PATTERN_LENGTH, ParamValue, Params, PathMatch,
    PathTemplate, compile, decode_param, encode_segment, join_paths, url_for_path, with_base,
};

// Routes, handlers and context
pub use waymark_core::{
    ChainLink, ChildrenProducer, Context, Continuation, DynRouteHandler, HandlerResult, Location,
    Route, RouteDescriptor, RouteHandler, RouteKind, registry_revision,
};

// Commands and views
pub use waymark_core::{
    Command, Commands, ComponentCommand, HookResult, PreventCommand, RedirectCommand, Resolution,
    View, ViewFactory,
};

// Errors
pub use waymark_core::{
    BoxError, ErrorContext, PatternError, ResolveError, UrlError, ValidationError,
};

// Engines
pub use waymark_std::{
    DEFAULT_MAX_REDIRECTS, MatchCandidate, Navigation, Navigator, NoopOutlet, Outcome, Outlet,
    OutletUpdate, ResolveRequest, Resolved, Resolver, ResolverBuilder, ResolverOptions,
    RouteMatcher, UrlGenerator, ViewLink,
};

/// Handler wrappers.
pub mod hooks {
    pub use waymark_std::hooks::{LoggingHandler, TracingHandler};
    #[cfg(feature = "timeout")]
    pub use waymark_std::hooks::{TimeoutError, TimeoutHandler};
}

/// Test doubles for views, factories and outlets.
pub mod testing {
    pub use waymark_std::testing::{
        Journal, OutletRecord, RecordingOutlet, StaticViewFactory, TestView, Verdict,
    };
}

/// Commonly used items.
pub mod prelude {
    pub use crate::{
        BoxError, Commands, Context, HandlerResult, HookResult, Location, Navigation, Navigator,
        Outcome, Params, Resolution, ResolveError, Resolver, RouteDescriptor, View,
    };
}
