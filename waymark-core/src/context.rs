//! Per-step resolution context.
//!
//! Every route offered to a handler gets a [`Context`]: the request data
//! (pathname, search, hash), the matched route and its consumed path, the
//! accumulated parameters, and the chain of routes matched so far.
//!
//! A context also carries the continuation of the resolution it belongs to,
//! so a handler can resolve the rest of the chain with [`Context::next`].

use crate::command::{Commands, Resolution};
use crate::error::{ErrorContext, ResolveError};
use crate::params::Params;
use crate::pattern::Key;
use crate::route::Route;
use futures::future::BoxFuture;
use std::fmt;
use std::sync::Arc;

/// Continues a resolution from inside a handler.
pub trait Continuation<V>: Send + Sync + 'static {
    /// Resolves the next candidate.
    ///
    /// With `resume` unset the search is confined to the subtree of
    /// `parent`; a candidate outside it is held back for the caller and
    /// [`Resolution::Pass`] is returned.
    fn next(
        self: Arc<Self>,
        resume: bool,
        parent: Option<Arc<Route<V>>>,
    ) -> BoxFuture<'static, Result<Resolution<V>, ResolveError>>;
}

/// A matched route and the path segment it consumed.
pub struct ChainLink<V> {
    /// The matched route.
    pub route: Arc<Route<V>>,
    /// Portion of the pathname the route consumed.
    pub path: String,
}

impl<V> Clone for ChainLink<V> {
    fn clone(&self) -> Self {
        Self {
            route: self.route.clone(),
            path: self.path.clone(),
        }
    }
}

impl<V> fmt::Debug for ChainLink<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainLink")
            .field("route", &self.route.path())
            .field("path", &self.path)
            .finish()
    }
}

/// Context handed to a route handler.
pub struct Context<V> {
    /// Full requested pathname, including any base URL.
    pub pathname: String,
    /// Query string, including the leading `?` when present.
    pub search: String,
    /// Fragment, including the leading `#` when present.
    pub hash: String,
    /// Effective base URL, empty when none is configured.
    pub base_url: String,
    /// The route being offered.
    pub route: Arc<Route<V>>,
    /// Portion of the remaining pathname this route consumed.
    pub path: String,
    /// Keys of the chain, outermost first.
    pub keys: Vec<Key>,
    /// Parameters accumulated along the chain.
    pub params: Params,
    /// Routes matched so far, ending with [`Context::route`].
    pub chain: Vec<ChainLink<V>>,
    /// Pathname of the navigation that redirected here.
    pub redirect_from: Option<String>,
    continuation: Option<Arc<dyn Continuation<V>>>,
}

impl<V> Context<V> {
    /// Creates a context for `route` with no continuation.
    pub fn new(pathname: impl Into<String>, route: Arc<Route<V>>) -> Self {
        Self {
            pathname: pathname.into(),
            search: String::new(),
            hash: String::new(),
            base_url: String::new(),
            route,
            path: String::new(),
            keys: Vec::new(),
            params: Params::new(),
            chain: Vec::new(),
            redirect_from: None,
            continuation: None,
        }
    }

    /// Attaches the continuation used by [`Context::next`].
    pub fn with_continuation(mut self, continuation: Arc<dyn Continuation<V>>) -> Self {
        self.continuation = Some(continuation);
        self
    }

    /// Command factory bound to this step.
    pub fn commands(&self) -> Commands {
        Commands::new(self.pathname.clone(), self.params.clone())
    }

    /// Snapshot used in error reports.
    pub fn error_context(&self) -> ErrorContext {
        ErrorContext {
            pathname: self.pathname.clone(),
            search: self.search.clone(),
            hash: self.hash.clone(),
            params: self.params.clone(),
            route_path: (!self.route.is_synthetic()).then(|| self.route.path().to_string()),
            chain: self.chain.iter().map(|link| link.path.clone()).collect(),
        }
    }
}

impl<V: Send + 'static> Context<V> {
    /// Resolves the rest of this route's subtree.
    ///
    /// Returns [`Resolution::Pass`] when nothing below this route accepts.
    pub fn next(&self) -> BoxFuture<'static, Result<Resolution<V>, ResolveError>> {
        self.continue_with(false)
    }

    /// Resumes the resolution past this route's subtree, like the top-level
    /// search would.
    pub fn resume(&self) -> BoxFuture<'static, Result<Resolution<V>, ResolveError>> {
        self.continue_with(true)
    }

    fn continue_with(
        &self,
        resume: bool,
    ) -> BoxFuture<'static, Result<Resolution<V>, ResolveError>> {
        match &self.continuation {
            Some(continuation) => continuation
                .clone()
                .next(resume, Some(self.route.clone())),
            None => Box::pin(async { Ok(Resolution::Pass) }),
        }
    }
}

impl<V> Clone for Context<V> {
    fn clone(&self) -> Self {
        Self {
            pathname: self.pathname.clone(),
            search: self.search.clone(),
            hash: self.hash.clone(),
            base_url: self.base_url.clone(),
            route: self.route.clone(),
            path: self.path.clone(),
            keys: self.keys.clone(),
            params: self.params.clone(),
            chain: self.chain.clone(),
            redirect_from: self.redirect_from.clone(),
            continuation: self.continuation.clone(),
        }
    }
}

impl<V> fmt::Debug for Context<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("pathname", &self.pathname)
            .field("route", &self.route.path())
            .field("path", &self.path)
            .field("params", &self.params)
            .field("chain", &self.chain)
            .finish_non_exhaustive()
    }
}
