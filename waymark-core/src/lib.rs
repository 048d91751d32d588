//! # waymark-core
//!
//! Core types for the Waymark hierarchical route resolver.
//!
//! This crate has minimal dependencies and holds everything that describes
//! routes and their results, without the engine that walks them
//! (`waymark-std`).
//!
//! # Building Blocks
//!
//! ## Patterns ([`compile`], [`CompiledPattern`])
//!
//! Path patterns such as `/users/:id(\d+)` compile to anchored expressions
//! matched in exact or prefix mode. Compiled patterns are cached
//! process-wide. [`url_for_path`] is the inverse: it fills a pattern with
//! [`Params`].
//!
//! ## Routes ([`RouteDescriptor`], [`Route`])
//!
//! Descriptors declare a pattern plus at least one behaviour: a handler,
//! children (static or deferred), a component key or a redirect target.
//! Validated routes form a tree that can be mutated while resolutions are
//! in flight.
//!
//! ## Handlers ([`RouteHandler`])
//!
//! Handlers receive a [`Context`] and a [`Commands`] factory and return a
//! [`Resolution`]: fall through (`Pass`, `Skip`), accept with a view, or
//! accept with a command (redirect, prevent, component).
//!
//! ## Views ([`View`])
//!
//! Views take part in navigation through `before`/`after` lifecycle hooks
//! that receive the resolved [`Location`].
//!
//! # Error Types
//!
//! - [`PatternError`] - Pattern compilation errors
//! - [`ValidationError`] - Rejected route descriptors
//! - [`ResolveError`] - Resolution failures
//! - [`UrlError`] - URL generation failures

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

mod command;
mod context;
mod error;
mod handler;
mod location;
mod params;
mod pattern;
mod route;
mod url;
mod view;

// Re-exports
pub use command::{
    Command, Commands, ComponentCommand, HandlerResult, PreventCommand, RedirectCommand,
    Resolution,
};
pub use context::{ChainLink, Context, Continuation};
pub use error::{BoxError, ErrorContext, PatternError, ResolveError, UrlError, ValidationError};
pub use handler::{ChildrenProducer, DynRouteHandler, RouteHandler, ViewFactory};
pub use location::{Location, with_base};
pub use params::{ParamValue, Params, decode_param};
pub use pattern::{CompiledPattern, Key, KeyName, MAX_PATTERN_LENGTH, PathMatch, compile};
pub use route::{Route, RouteDescriptor, RouteKind, registry_revision};
pub use url::{PathTemplate, encode_segment, join_paths, url_for_path};
pub use view::{HookResult, View};
