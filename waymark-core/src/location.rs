//! The resolved location handed to lifecycle hooks and returned by
//! navigations.

use crate::context::Context;
use crate::error::UrlError;
use crate::params::Params;
use crate::route::Route;
use crate::url::{join_paths, url_for_path};
use std::fmt;
use std::sync::Arc;

/// A resolved location.
pub struct Location<V> {
    /// Effective base URL, empty when none is configured.
    pub base_url: String,
    /// Full pathname, including the base URL.
    pub pathname: String,
    /// Query string, including the leading `?` when present.
    pub search: String,
    /// Fragment, including the leading `#` when present.
    pub hash: String,
    /// Parameters of the matched chain.
    pub params: Params,
    /// Pathname of the navigation that redirected here.
    pub redirect_from: Option<String>,
    /// Matched routes, outermost first.
    pub routes: Vec<Arc<Route<V>>>,
    /// Route a lifecycle hook is invoked for; the leaf route otherwise.
    pub route: Option<Arc<Route<V>>>,
}

impl<V> Location<V> {
    /// Builds the location of an accepted step.
    pub fn from_context(context: &Context<V>) -> Self {
        let routes: Vec<_> = context.chain.iter().map(|link| link.route.clone()).collect();
        Self {
            base_url: context.base_url.clone(),
            pathname: context.pathname.clone(),
            search: context.search.clone(),
            hash: context.hash.clone(),
            params: context.params.clone(),
            redirect_from: context.redirect_from.clone(),
            route: routes.last().cloned(),
            routes,
        }
    }

    /// A copy pointing at `route`.
    pub fn for_route(&self, route: &Arc<Route<V>>) -> Self {
        let mut location = self.clone();
        location.route = Some(route.clone());
        location
    }

    /// Patterns of the matched routes, joined.
    pub fn matched_pattern(&self) -> String {
        join_paths(self.routes.iter().map(|route| route.path()))
    }

    /// Regenerates the URL of the matched chain, with `overrides` replacing
    /// the current parameters.
    pub fn url(&self, overrides: &Params) -> Result<String, UrlError> {
        let mut params = self.params.clone();
        params.merge(overrides);
        let path = url_for_path(&self.matched_pattern(), &params)?;
        Ok(with_base(&self.base_url, &path))
    }
}

/// Prefixes `path` with `base`. An empty result becomes `/`.
pub fn with_base(base: &str, path: &str) -> String {
    let joined = if base.is_empty() {
        path.to_string()
    } else {
        format!("{}{}", base, path.strip_prefix('/').unwrap_or(path))
    };
    if joined.is_empty() {
        "/".to_string()
    } else {
        joined
    }
}

impl<V> Default for Location<V> {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            pathname: String::new(),
            search: String::new(),
            hash: String::new(),
            params: Params::new(),
            redirect_from: None,
            routes: Vec::new(),
            route: None,
        }
    }
}

impl<V> Clone for Location<V> {
    fn clone(&self) -> Self {
        Self {
            base_url: self.base_url.clone(),
            pathname: self.pathname.clone(),
            search: self.search.clone(),
            hash: self.hash.clone(),
            params: self.params.clone(),
            redirect_from: self.redirect_from.clone(),
            routes: self.routes.clone(),
            route: self.route.clone(),
        }
    }
}

impl<V> fmt::Debug for Location<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Location")
            .field("pathname", &self.pathname)
            .field("search", &self.search)
            .field("hash", &self.hash)
            .field("params", &self.params)
            .field("redirect_from", &self.redirect_from)
            .field(
                "routes",
                &self.routes.iter().map(|r| r.path()).collect::<Vec<_>>(),
            )
            .finish()
    }
}
