//! # Tree Matcher
//!
//! Lazily walks a route tree in depth-first pre-order, producing every
//! `(route, consumed path, parameters)` candidate that matches a pathname.
//!
//! # Order
//!
//! A route is offered before its children; siblings are tried in
//! registration order. A route's children are only visited when the route
//! itself matched. An exact route that only matches a prefix of the pathname
//! is still offered as a transit candidate, so its children can be loaded
//! and linked, but it must not be invoked.
//!
//! # Remainders
//!
//! After a route consumes `path`, its children are matched against the rest
//! of the pathname, dropping one separating `/`. Once any ancestor pattern
//! starts with `/`, descendants may omit or repeat the leading `/`.
//!
//! # Skipping
//!
//! [`RouteMatcher::next`] takes an optional route to skip: when the walk
//! reaches it, that route's subtree is abandoned.

use std::sync::Arc;
use waymark_core::{Key, Params, PathMatch, Route, compile};

/// A route that matched, with what it consumed.
pub struct MatchCandidate<V> {
    /// The matched route.
    pub route: Arc<Route<V>>,
    /// Consumed portion of the remaining pathname.
    pub path: String,
    /// Keys of the chain, outermost first.
    pub keys: Vec<Key>,
    /// Parameters accumulated along the chain.
    pub params: Params,
    /// The route matched only as a passage to its children.
    pub transit: bool,
}

impl<V> Clone for MatchCandidate<V> {
    fn clone(&self) -> Self {
        Self {
            route: self.route.clone(),
            path: self.path.clone(),
            keys: self.keys.clone(),
            params: self.params.clone(),
            transit: self.transit,
        }
    }
}

impl<V> std::fmt::Debug for MatchCandidate<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatchCandidate")
            .field("route", &self.route.path())
            .field("path", &self.path)
            .field("params", &self.params)
            .field("transit", &self.transit)
            .finish()
    }
}

enum State {
    Untried,
    Matched(PathMatch),
    Failed,
}

/// Lazy depth-first matcher over a route subtree.
pub struct RouteMatcher<V> {
    route: Arc<Route<V>>,
    pathname: String,
    ignore_leading_slash: bool,
    parent_keys: Vec<Key>,
    parent_params: Params,
    state: State,
    children: Option<Arc<[Arc<Route<V>>]>>,
    child_index: usize,
    child: Option<Box<RouteMatcher<V>>>,
}

impl<V> RouteMatcher<V> {
    /// Creates a matcher for `pathname` rooted at `route`.
    pub fn new(route: Arc<Route<V>>, pathname: impl Into<String>, ignore_leading_slash: bool) -> Self {
        Self::with_parent(route, pathname.into(), ignore_leading_slash, Vec::new(), Params::new())
    }

    fn with_parent(
        route: Arc<Route<V>>,
        pathname: String,
        ignore_leading_slash: bool,
        parent_keys: Vec<Key>,
        parent_params: Params,
    ) -> Self {
        Self {
            route,
            pathname,
            ignore_leading_slash,
            parent_keys,
            parent_params,
            state: State::Untried,
            children: None,
            child_index: 0,
            child: None,
        }
    }

    /// Produces the next candidate, or `None` once the subtree is exhausted.
    pub fn next(&mut self, skip: Option<&Arc<Route<V>>>) -> Option<MatchCandidate<V>> {
        if skip.is_some_and(|skip| Arc::ptr_eq(skip, &self.route)) {
            return None;
        }

        if matches!(self.state, State::Untried) {
            let (state, offered) = self.attempt();
            self.state = state;
            if let State::Matched(m) = &self.state {
                return Some(MatchCandidate {
                    route: self.route.clone(),
                    path: m.path.clone(),
                    keys: m.keys.clone(),
                    params: m.params.clone(),
                    transit: !offered,
                });
            }
        }

        let State::Matched(matched) = &self.state else {
            return None;
        };
        let children = self
            .children
            .get_or_insert_with(|| self.route.children())
            .clone();

        loop {
            if self.child.is_none() {
                let route = children.get(self.child_index)?.clone();
                route.set_parent(&self.route);
                self.child_index += 1;

                let mut consumed = matched.path.len();
                if consumed > 0 && self.pathname[consumed..].starts_with('/') {
                    consumed += 1;
                }
                let ignore = self.ignore_leading_slash || self.route.path().starts_with('/');
                self.child = Some(Box::new(RouteMatcher::with_parent(
                    route,
                    self.pathname[consumed..].to_string(),
                    ignore,
                    matched.keys.clone(),
                    matched.params.clone(),
                )));
            }

            if let Some(child) = self.child.as_mut() {
                if let Some(candidate) = child.next(skip) {
                    return Some(candidate);
                }
            }
            self.child = None;
        }
    }

    /// Matches this node. Returns the new state and whether the node itself
    /// is offered as a candidate.
    fn attempt(&self) -> (State, bool) {
        let path = self.route.path();
        let source = if self.ignore_leading_slash {
            path.strip_prefix('/').unwrap_or(path)
        } else {
            path
        };
        let exact = self.route.is_exact();

        if let Some(m) = self.match_with(source, exact) {
            return (State::Matched(m), true);
        }
        // An exact route with children still lets its subtree be searched.
        if exact && self.route.has_children() {
            if let Some(m) = self.match_with(source, false) {
                return (State::Matched(m), false);
            }
        }
        (State::Failed, false)
    }

    fn match_with(&self, source: &str, exact: bool) -> Option<PathMatch> {
        match compile(source, exact) {
            Ok(compiled) => {
                compiled.match_path(&self.pathname, &self.parent_keys, &self.parent_params)
            }
            Err(_err) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(route = %source, error = %_err, "route pattern does not compile");
                None
            }
        }
    }
}
