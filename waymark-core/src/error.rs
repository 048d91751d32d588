//! Error types for Waymark.
//!
//! This module provides a structured error hierarchy using `thiserror`:
//!
//! - [`PatternError`] - A path pattern could not be compiled
//! - [`ValidationError`] - A route descriptor was rejected at registration
//! - [`ResolveError`] - Resolution of a pathname failed
//! - [`UrlError`] - A URL could not be generated from a pattern or route name

use crate::params::Params;
use thiserror::Error;

/// A boxed error type for dynamic error handling.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised while compiling a path pattern.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PatternError {
    /// The pattern exceeds the accepted length.
    #[error("pattern length {len} exceeds maximum of {max} bytes")]
    TooLong {
        /// Length of the offending pattern.
        len: usize,
        /// Maximum accepted length.
        max: usize,
    },

    /// The generated expression was rejected, usually because of an
    /// invalid custom parameter constraint.
    #[error("invalid pattern `{pattern}`: {message}")]
    Regex {
        /// The source pattern.
        pattern: String,
        /// Description from the regex engine.
        message: String,
    },
}

/// Errors raised when route descriptors are registered.
///
/// Registration is all-or-nothing: when any descriptor in a batch is
/// rejected, none of the batch is attached.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The route declares no handler, children, component or redirect.
    #[error(
        "route `{path}` must declare at least one of: handler, children, component, redirect"
    )]
    NoBehavior {
        /// Pattern of the rejected route.
        path: String,
    },

    /// The route pattern does not compile.
    #[error("route `{path}` has an invalid pattern")]
    Pattern {
        /// Pattern of the rejected route.
        path: String,
        /// Underlying compilation failure.
        #[source]
        source: PatternError,
    },
}

/// Snapshot of the resolution state at the point a failure happened.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorContext {
    /// Requested pathname.
    pub pathname: String,
    /// Query string of the request, including the leading `?` when present.
    pub search: String,
    /// Fragment of the request, including the leading `#` when present.
    pub hash: String,
    /// Parameters accumulated up to the failing step.
    pub params: Params,
    /// Pattern of the deepest route that was attempted.
    pub route_path: Option<String>,
    /// Matched segments of the chain, outermost first.
    pub chain: Vec<String>,
}

impl ErrorContext {
    /// Creates an empty context for the given pathname.
    pub fn new(pathname: impl Into<String>) -> Self {
        Self {
            pathname: pathname.into(),
            ..Self::default()
        }
    }
}

/// Errors produced while resolving a pathname.
#[derive(Error, Debug)]
pub enum ResolveError {
    /// No route accepted the pathname.
    #[error("{}", not_found_message(.context))]
    NotFound {
        /// State of the resolution when it ran out of candidates.
        context: Box<ErrorContext>,
    },

    /// A handler, a deferred children producer or a redirect expansion failed.
    #[error("{message}")]
    Handler {
        /// Human-readable description citing the failing route.
        message: String,
        /// State of the resolution at the failing step.
        context: Box<ErrorContext>,
        /// The original failure.
        #[source]
        source: BoxError,
    },

    /// Redirects kept chaining past the configured bound.
    #[error("too many redirects when rendering {from} ({count} redirects)")]
    RedirectLoop {
        /// Pathname that produced the redirect over the bound.
        from: String,
        /// Number of redirects followed.
        count: usize,
        /// State of the resolution when the loop was detected.
        context: Box<ErrorContext>,
    },

    /// A component command was issued but no view factory is configured.
    #[error("no view factory configured to create component `{component}`")]
    NoViewFactory {
        /// Component key that could not be instantiated.
        component: String,
        /// State of the resolution at the failing step.
        context: Box<ErrorContext>,
    },
}

impl ResolveError {
    /// Creates a not-found error for the given context.
    pub fn not_found(context: ErrorContext) -> Self {
        Self::NotFound {
            context: Box::new(context),
        }
    }

    /// Wraps a handler failure, citing the route recorded in `context`.
    pub fn handler(context: ErrorContext, source: BoxError) -> Self {
        let message = format!(
            "Path '{}' is not properly resolved due to an error. \
             Resolution had failed on route: '{}'",
            context.pathname,
            context.route_path.as_deref().unwrap_or_default(),
        );
        Self::Handler {
            message,
            context: Box::new(context),
            source,
        }
    }

    /// HTTP-like status code: 404 for not found, 500 otherwise.
    pub fn code(&self) -> u16 {
        match self {
            Self::NotFound { .. } => 404,
            _ => 500,
        }
    }

    /// Returns the resolution state captured with the error.
    pub fn context(&self) -> &ErrorContext {
        match self {
            Self::NotFound { context }
            | Self::Handler { context, .. }
            | Self::RedirectLoop { context, .. }
            | Self::NoViewFactory { context, .. } => context,
        }
    }

    /// Returns `true` for [`ResolveError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

fn not_found_message(context: &ErrorContext) -> String {
    match &context.route_path {
        Some(route) => format!(
            "Page not found ({}), furthest matched route: '{}'",
            context.pathname, route
        ),
        None => format!("Page not found ({})", context.pathname),
    }
}

/// Errors raised when generating a URL.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UrlError {
    /// A required parameter was not supplied.
    #[error("expected `{name}` to be defined")]
    MissingParam {
        /// Parameter name.
        name: String,
    },

    /// A list was supplied for a parameter that does not repeat.
    #[error("expected `{name}` to not repeat, but received a list")]
    NotRepeatable {
        /// Parameter name.
        name: String,
    },

    /// An empty list was supplied for a required repeating parameter.
    #[error("expected `{name}` to not be empty")]
    EmptyRepeat {
        /// Parameter name.
        name: String,
    },

    /// A supplied value does not satisfy the parameter constraint.
    #[error("expected `{name}` to match `{pattern}`, but received `{value}`")]
    ConstraintMismatch {
        /// Parameter name.
        name: String,
        /// Constraint expression.
        pattern: String,
        /// Encoded value that was rejected.
        value: String,
    },

    /// No route is registered under the requested name or component key.
    #[error("route `{0}` not found")]
    UnknownName(String),

    /// Several routes share the requested name or component key.
    #[error("duplicate route with name `{0}`; set unique route names")]
    DuplicateName(String),

    /// The pattern itself does not compile.
    #[error(transparent)]
    Pattern(#[from] PatternError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_cites_furthest_route() {
        let mut context = ErrorContext::new("/users/7/edit");
        context.route_path = Some("/users/:id".to_string());
        let err = ResolveError::not_found(context);

        assert_eq!(err.code(), 404);
        assert!(err.is_not_found());
        assert_eq!(
            err.to_string(),
            "Page not found (/users/7/edit), furthest matched route: '/users/:id'"
        );
    }

    #[test]
    fn handler_errors_are_500() {
        let mut context = ErrorContext::new("/boom");
        context.route_path = Some("/boom".to_string());
        let err = ResolveError::handler(context, "exploded".into());

        assert_eq!(err.code(), 500);
        assert_eq!(err.context().pathname, "/boom");
        assert!(err.to_string().contains("Resolution had failed on route: '/boom'"));
        assert_eq!(
            std::error::Error::source(&err).map(ToString::to_string),
            Some("exploded".to_string())
        );
    }
}
