//! # Route Registry
//!
//! Routes are declared as [`RouteDescriptor`]s and validated into shared
//! [`Route`] nodes. A node owns its children behind a copy-on-write snapshot,
//! so a resolution in flight keeps walking the list it started with while
//! the registry is mutated.
//!
//! # Behaviour
//!
//! Every route declares at least one of handler, children, component or
//! redirect. The effective [`RouteKind`] is resolved once at validation with
//! the precedence handler, redirect, component; a route with only children
//! is a [`RouteKind::Layout`].
//!
//! # Mutation
//!
//! `set_routes`, `add_routes` and `remove_routes` operate on any node.
//! Validation is all-or-nothing: if any descriptor of a batch is rejected,
//! nothing is attached.

use crate::command::{Commands, HandlerResult};
use crate::context::Context;
use crate::error::{BoxError, ValidationError};
use crate::handler::{ChildrenProducer, DynRouteHandler, RouteHandler};
use crate::pattern::compile;
use crate::url::join_paths;
use parking_lot::RwLock;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

static REVISION: AtomicU64 = AtomicU64::new(0);

/// Counter bumped by every registry mutation, process-wide.
///
/// Caches derived from the route tree compare it to detect staleness.
pub fn registry_revision() -> u64 {
    REVISION.load(Ordering::Acquire)
}

fn bump_revision() {
    REVISION.fetch_add(1, Ordering::AcqRel);
}

// ============================================================================
// Descriptors
// ============================================================================

enum DescriptorChildren<V> {
    None,
    Static(Vec<RouteDescriptor<V>>),
    Deferred(Arc<dyn ChildrenProducer<V>>),
}

/// Declarative description of a route.
///
/// ```rust
/// use waymark_core::RouteDescriptor;
///
/// let users: RouteDescriptor<()> = RouteDescriptor::new("/users").children(vec![
///     RouteDescriptor::new("/").component("user-list"),
///     RouteDescriptor::new("/:id").component("user-profile").name("user"),
/// ]);
/// ```
pub struct RouteDescriptor<V> {
    path: String,
    name: Option<String>,
    exact: Option<bool>,
    handler: Option<Arc<dyn DynRouteHandler<V>>>,
    redirect: Option<String>,
    component: Option<String>,
    children: DescriptorChildren<V>,
}

impl<V: 'static> RouteDescriptor<V> {
    /// Creates a descriptor for `path` with no behaviour yet.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: None,
            exact: None,
            handler: None,
            redirect: None,
            component: None,
            children: DescriptorChildren::None,
        }
    }

    /// Sets the name used for URL generation.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Forces exact (`true`) or prefix (`false`) matching.
    pub fn exact(mut self, exact: bool) -> Self {
        self.exact = Some(exact);
        self
    }

    /// Sets an async closure as handler.
    pub fn handler<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(Context<V>, Commands) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult<V>> + Send + 'static,
    {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// Sets a [`RouteHandler`] implementation as handler.
    pub fn handler_with<H: RouteHandler<V>>(mut self, handler: H) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// Redirects to `target`, a pattern filled with the matched parameters.
    pub fn redirect(mut self, target: impl Into<String>) -> Self {
        self.redirect = Some(target.into());
        self
    }

    /// Renders the view registered under `component`.
    pub fn component(mut self, component: impl Into<String>) -> Self {
        self.component = Some(component.into());
        self
    }

    /// Declares static children.
    pub fn children(mut self, children: Vec<RouteDescriptor<V>>) -> Self {
        self.children = DescriptorChildren::Static(children);
        self
    }

    /// Declares children produced the first time resolution reaches this route.
    pub fn lazy_children<F, Fut>(mut self, producer: F) -> Self
    where
        F: Fn(Context<V>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Vec<RouteDescriptor<V>>, BoxError>> + Send + 'static,
    {
        self.children = DescriptorChildren::Deferred(Arc::new(producer));
        self
    }

    /// The pattern of this descriptor.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Validates this descriptor and its static children into a route tree.
    pub fn build(self) -> Result<Arc<Route<V>>, ValidationError> {
        let has_children = !matches!(self.children, DescriptorChildren::None);
        if self.handler.is_none()
            && !has_children
            && self.component.is_none()
            && self.redirect.is_none()
        {
            return Err(ValidationError::NoBehavior { path: self.path });
        }

        let exact = self
            .exact
            .unwrap_or(!has_children && self.handler.is_none());
        compile(&self.path, exact).map_err(|source| ValidationError::Pattern {
            path: self.path.clone(),
            source,
        })?;

        let ambiguous = self.redirect.is_some() && self.component.is_some();
        #[cfg(feature = "tracing")]
        if ambiguous {
            tracing::warn!(
                route = %self.path,
                "route declares both redirect and component; redirect takes precedence"
            );
        }

        let kind = match (self.handler, self.redirect, &self.component) {
            (Some(handler), _, _) => RouteKind::Handler(handler),
            (None, Some(target), _) => RouteKind::Redirect(target),
            (None, None, Some(component)) => RouteKind::Component(component.clone()),
            (None, None, None) => RouteKind::Layout,
        };

        let children = match self.children {
            DescriptorChildren::None => Children::Loaded(Arc::from(Vec::new())),
            DescriptorChildren::Static(children) => Children::Loaded(build_all(children)?.into()),
            DescriptorChildren::Deferred(producer) => Children::Deferred(producer),
        };

        let route = Arc::new(Route {
            path: self.path,
            name: self.name,
            exact,
            component: self.component,
            kind,
            ambiguous,
            synthetic: false,
            children: RwLock::new(children),
            parent: RwLock::new(Weak::new()),
        });
        route.adopt_children();
        Ok(route)
    }
}

fn build_all<V: 'static>(
    descriptors: Vec<RouteDescriptor<V>>,
) -> Result<Vec<Arc<Route<V>>>, ValidationError> {
    descriptors.into_iter().map(RouteDescriptor::build).collect()
}

impl<V> fmt::Debug for RouteDescriptor<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteDescriptor")
            .field("path", &self.path)
            .field("name", &self.name)
            .field("exact", &self.exact)
            .field("redirect", &self.redirect)
            .field("component", &self.component)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Routes
// ============================================================================

/// Effective behaviour of a route.
pub enum RouteKind<V> {
    /// A custom handler decides.
    Handler(Arc<dyn DynRouteHandler<V>>),
    /// Accepts with a redirect to the given pattern.
    Redirect(String),
    /// Accepts with the view registered under the given component key.
    Component(String),
    /// Only groups children; always passes.
    Layout,
}

impl<V> RouteKind<V> {
    fn label(&self) -> &'static str {
        match self {
            Self::Handler(_) => "handler",
            Self::Redirect(_) => "redirect",
            Self::Component(_) => "component",
            Self::Layout => "layout",
        }
    }
}

enum Children<V> {
    Loaded(Arc<[Arc<Route<V>>]>),
    Deferred(Arc<dyn ChildrenProducer<V>>),
}

/// A validated route node.
pub struct Route<V> {
    path: String,
    name: Option<String>,
    exact: bool,
    component: Option<String>,
    kind: RouteKind<V>,
    ambiguous: bool,
    synthetic: bool,
    children: RwLock<Children<V>>,
    parent: RwLock<Weak<Route<V>>>,
}

impl<V: 'static> Route<V> {
    /// Creates the synthetic root holding top-level routes.
    ///
    /// The root has an empty pattern and never appears in a chain.
    pub fn root(routes: Vec<RouteDescriptor<V>>) -> Result<Arc<Self>, ValidationError> {
        let children = build_all(routes)?;
        let root = Arc::new(Route {
            path: String::new(),
            name: None,
            exact: false,
            component: None,
            kind: RouteKind::Layout,
            ambiguous: false,
            synthetic: true,
            children: RwLock::new(Children::Loaded(children.into())),
            parent: RwLock::new(Weak::new()),
        });
        root.adopt_children();
        Ok(root)
    }

    /// Replaces all children. Returns the effective list.
    pub fn set_routes(
        self: &Arc<Self>,
        routes: Vec<RouteDescriptor<V>>,
    ) -> Result<Vec<Arc<Route<V>>>, ValidationError> {
        let built = build_all(routes)?;
        *self.children.write() = Children::Loaded(built.into());
        self.adopt_children();
        bump_revision();
        Ok(self.get_routes())
    }

    /// Appends children after the existing ones. Returns the effective list.
    pub fn add_routes(
        self: &Arc<Self>,
        routes: Vec<RouteDescriptor<V>>,
    ) -> Result<Vec<Arc<Route<V>>>, ValidationError> {
        let built = build_all(routes)?;
        {
            let mut children = self.children.write();
            let mut merged = match &*children {
                Children::Loaded(existing) => existing.to_vec(),
                Children::Deferred(_) => Vec::new(),
            };
            merged.extend(built);
            *children = Children::Loaded(merged.into());
        }
        self.adopt_children();
        bump_revision();
        Ok(self.get_routes())
    }

    /// Loads deferred children through the producer, once.
    pub async fn load_children(self: &Arc<Self>, context: Context<V>) -> Result<(), BoxError> {
        let producer = match &*self.children.read() {
            Children::Deferred(producer) => producer.clone(),
            Children::Loaded(_) => return Ok(()),
        };
        let descriptors = producer.produce(context).await?;
        let built = build_all(descriptors)?;
        {
            let mut children = self.children.write();
            if matches!(&*children, Children::Loaded(_)) {
                return Ok(());
            }
            *children = Children::Loaded(built.into());
        }
        self.adopt_children();
        bump_revision();
        Ok(())
    }

    fn adopt_children(self: &Arc<Self>) {
        if let Children::Loaded(children) = &*self.children.read() {
            for child in children.iter() {
                child.set_parent(self);
            }
        }
    }
}

impl<V> Route<V> {
    /// The pattern source.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The name used for URL generation.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The declared component key, even when a redirect takes precedence.
    pub fn component(&self) -> Option<&str> {
        self.component.as_deref()
    }

    /// The effective behaviour.
    pub fn kind(&self) -> &RouteKind<V> {
        &self.kind
    }

    /// Whether the route matches in exact mode.
    pub fn is_exact(&self) -> bool {
        self.exact
    }

    /// Whether the descriptor declared both redirect and component.
    pub fn is_ambiguous(&self) -> bool {
        self.ambiguous
    }

    /// Whether this is a resolver root.
    pub fn is_synthetic(&self) -> bool {
        self.synthetic
    }

    /// The parent node, if attached.
    pub fn parent(&self) -> Option<Arc<Route<V>>> {
        self.parent.read().upgrade()
    }

    /// Points this node at `parent`.
    pub fn set_parent(&self, parent: &Arc<Route<V>>) {
        *self.parent.write() = Arc::downgrade(parent);
    }

    /// Snapshot of the loaded children. Empty while children are deferred.
    pub fn children(&self) -> Arc<[Arc<Route<V>>]> {
        match &*self.children.read() {
            Children::Loaded(children) => children.clone(),
            Children::Deferred(_) => Arc::from(Vec::new()),
        }
    }

    /// Returns the current children.
    pub fn get_routes(&self) -> Vec<Arc<Route<V>>> {
        self.children().to_vec()
    }

    /// Whether the route has children, loaded or deferred.
    pub fn has_children(&self) -> bool {
        match &*self.children.read() {
            Children::Loaded(children) => !children.is_empty(),
            Children::Deferred(_) => true,
        }
    }

    /// Whether children are still waiting for their producer.
    pub fn has_pending_children(&self) -> bool {
        matches!(&*self.children.read(), Children::Deferred(_))
    }

    /// Removes children by identity. Unknown routes are ignored.
    /// Returns the effective list.
    pub fn remove_routes(&self, routes: &[Arc<Route<V>>]) -> Vec<Arc<Route<V>>> {
        let mut children = self.children.write();
        if let Children::Loaded(existing) = &*children {
            let kept: Vec<_> = existing
                .iter()
                .filter(|child| !routes.iter().any(|r| Arc::ptr_eq(r, child)))
                .cloned()
                .collect();
            if kept.len() != existing.len() {
                *children = Children::Loaded(kept.into());
                bump_revision();
            }
        }
        match &*children {
            Children::Loaded(children) => children.to_vec(),
            Children::Deferred(_) => Vec::new(),
        }
    }

    /// Whether `ancestor` is a strict ancestor of this route.
    pub fn is_descendant_of(&self, ancestor: &Route<V>) -> bool {
        let mut current = self.parent();
        while let Some(route) = current {
            if std::ptr::eq(Arc::as_ptr(&route), ancestor) {
                return true;
            }
            current = route.parent();
        }
        false
    }

    /// Patterns from the outermost ancestor down to this route, joined.
    pub fn full_path(&self) -> String {
        let mut patterns = vec![self.path.clone()];
        let mut current = self.parent();
        while let Some(route) = current {
            patterns.push(route.path.clone());
            current = route.parent();
        }
        join_paths(patterns.iter().rev().map(String::as_str))
    }
}

impl<V> fmt::Debug for Route<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("path", &self.path)
            .field("name", &self.name)
            .field("kind", &self.kind.label())
            .field("exact", &self.exact)
            .finish_non_exhaustive()
    }
}
