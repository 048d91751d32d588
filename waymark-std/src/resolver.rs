//! # Resolution Chain
//!
//! Drives the [`RouteMatcher`] over a route tree, offering each candidate to
//! its route's behaviour until one accepts.
//!
//! # Flow
//!
//! 1. The matcher yields the next candidate; the chain of matched routes is
//!    trimmed back to the candidate's parent and extended with it.
//! 2. Deferred children of the candidate are loaded.
//! 3. The route's behaviour runs: a handler decides, a redirect or component
//!    route accepts with the matching command, a layout passes.
//! 4. `Pass` continues with the next candidate, `Skip` additionally skips
//!    the candidate's subtree. Anything else is accepted.
//!
//! When candidates run out, resolution fails with
//! [`ResolveError::NotFound`]. A failing handler produces
//! [`ResolveError::Handler`]; both may be turned into a view by the
//! configured error handler.
//!
//! # Nested resolution
//!
//! Handlers can call [`Context::next`] to resolve their own subtree first. A
//! candidate found outside that subtree is held back for the outer search.
//!
//! # Redirects
//!
//! [`Resolver::resolve`] follows accepted redirects by resolving the target
//! path again, up to [`ResolverOptions::max_redirects`] times.

use crate::matcher::{MatchCandidate, RouteMatcher};
use crate::urls::UrlGenerator;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use waymark_core::{
    BoxError, ChainLink, Command, Context, Continuation, ErrorContext, Location, Params,
    RedirectCommand, Resolution, ResolveError, Route, RouteDescriptor, RouteKind, UrlError,
    ValidationError, ViewFactory, url_for_path, with_base,
};

/// Default bound on chained redirects.
pub const DEFAULT_MAX_REDIRECTS: usize = 256;

// ============================================================================
// Configuration
// ============================================================================

/// Resolver settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverOptions {
    /// Base URL stripped from incoming pathnames and prefixed to generated
    /// URLs. Only the part up to the last `/` is used.
    pub base_url: Option<String>,
    /// Maximum number of chained redirects.
    pub max_redirects: usize,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            base_url: None,
            max_redirects: DEFAULT_MAX_REDIRECTS,
        }
    }
}

impl ResolverOptions {
    /// Sets the base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Sets the redirect bound.
    pub fn with_max_redirects(mut self, max_redirects: usize) -> Self {
        self.max_redirects = max_redirects;
        self
    }

    /// The base URL actually applied: everything up to and including the
    /// last `/`, always absolute. Empty when no base is configured.
    pub fn effective_base(&self) -> String {
        let Some(base) = self.base_url.as_deref().filter(|base| !base.is_empty()) else {
            return String::new();
        };
        let base = match base.rfind('/') {
            Some(index) => &base[..=index],
            None => "",
        };
        if base.starts_with('/') {
            base.to_string()
        } else {
            format!("/{base}")
        }
    }
}

type ErrorHandler<V> = Arc<dyn Fn(&ResolveError) -> V + Send + Sync>;

/// Builder for [`Resolver`].
pub struct ResolverBuilder<V> {
    routes: Vec<RouteDescriptor<V>>,
    options: ResolverOptions,
    view_factory: Option<Arc<dyn ViewFactory<V>>>,
    error_handler: Option<ErrorHandler<V>>,
}

impl<V: Send + 'static> ResolverBuilder<V> {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self {
            routes: Vec::new(),
            options: ResolverOptions::default(),
            view_factory: None,
            error_handler: None,
        }
    }

    /// Adds a top-level route.
    pub fn route(mut self, route: RouteDescriptor<V>) -> Self {
        self.routes.push(route);
        self
    }

    /// Adds top-level routes.
    pub fn routes(mut self, routes: impl IntoIterator<Item = RouteDescriptor<V>>) -> Self {
        self.routes.extend(routes);
        self
    }

    /// Replaces all options.
    pub fn options(mut self, options: ResolverOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the base URL.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.options.base_url = Some(base_url.into());
        self
    }

    /// Sets the redirect bound.
    pub fn max_redirects(mut self, max_redirects: usize) -> Self {
        self.options.max_redirects = max_redirects;
        self
    }

    /// Sets the factory that turns component keys into views.
    pub fn view_factory(mut self, factory: impl ViewFactory<V>) -> Self {
        self.view_factory = Some(Arc::new(factory));
        self
    }

    /// Turns resolution failures into a view instead of an error.
    pub fn error_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&ResolveError) -> V + Send + Sync + 'static,
    {
        self.error_handler = Some(Arc::new(handler));
        self
    }

    /// Validates the routes and builds the resolver.
    pub fn build(self) -> Result<Resolver<V>, ValidationError> {
        let root = Route::root(self.routes)?;
        let base = self.options.effective_base();
        Ok(Resolver {
            shared: Arc::new(Shared {
                urls: UrlGenerator::new(root.clone(), base.clone()),
                root,
                base,
                options: self.options,
                view_factory: self.view_factory,
                error_handler: self.error_handler,
            }),
        })
    }
}

impl<V: Send + 'static> Default for ResolverBuilder<V> {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Requests and results
// ============================================================================

/// A pathname to resolve.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolveRequest {
    /// Pathname, including any base URL.
    pub pathname: String,
    /// Query string, including the leading `?` when present.
    pub search: String,
    /// Fragment, including the leading `#` when present.
    pub hash: String,
    /// Pathname of the navigation that redirected here.
    pub redirect_from: Option<String>,
    /// Number of redirects followed so far.
    pub redirect_count: usize,
}

impl ResolveRequest {
    /// Creates a request for `pathname`.
    pub fn new(pathname: impl Into<String>) -> Self {
        Self {
            pathname: pathname.into(),
            ..Self::default()
        }
    }

    /// Splits a URL path with optional `?query` and `#fragment`.
    pub fn parse(url: &str) -> Self {
        let (rest, hash) = match url.find('#') {
            Some(index) => (&url[..index], &url[index..]),
            None => (url, ""),
        };
        let (pathname, search) = match rest.find('?') {
            Some(index) => (&rest[..index], &rest[index..]),
            None => (rest, ""),
        };
        Self {
            pathname: pathname.to_string(),
            search: search.to_string(),
            hash: hash.to_string(),
            ..Self::default()
        }
    }

    /// Sets the query string.
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = search.into();
        self
    }

    /// Sets the fragment.
    pub fn with_hash(mut self, hash: impl Into<String>) -> Self {
        self.hash = hash.into();
        self
    }
}

impl From<&str> for ResolveRequest {
    fn from(url: &str) -> Self {
        Self::parse(url)
    }
}

impl From<String> for ResolveRequest {
    fn from(url: String) -> Self {
        Self::parse(&url)
    }
}

/// What the accepting route produced.
#[derive(Debug)]
pub enum Outcome<V> {
    /// A view, returned by a handler or created from a component key.
    View(V),
    /// A redirect that was not followed.
    Redirect(RedirectCommand),
    /// The navigation must be cancelled.
    Prevent,
}

/// An accepted resolution.
pub struct Resolved<V> {
    context: Context<V>,
    outcome: Outcome<V>,
    component: Option<String>,
    recovered: bool,
    redirect_count: usize,
    chain: Option<Arc<Chain<V>>>,
}

impl<V: Send + 'static> Resolved<V> {
    /// Context of the accepting step.
    pub fn context(&self) -> &Context<V> {
        &self.context
    }

    /// What the accepting route produced.
    pub fn outcome(&self) -> &Outcome<V> {
        &self.outcome
    }

    /// Consumes the result.
    pub fn into_parts(self) -> (Context<V>, Outcome<V>) {
        (self.context, self.outcome)
    }

    /// Component key the view was created from, if any.
    pub fn component(&self) -> Option<&str> {
        self.component.as_deref()
    }

    /// Whether the view was produced by the error handler.
    pub fn is_recovered(&self) -> bool {
        self.recovered
    }

    /// Number of redirects followed to get here.
    pub fn redirect_count(&self) -> usize {
        self.redirect_count
    }

    /// The resolved location.
    pub fn location(&self) -> Location<V> {
        Location::from_context(&self.context)
    }

    /// Continues the same resolution within `parent`'s subtree.
    ///
    /// Returns `None` when no further candidate below `parent` accepts.
    pub async fn continue_within(
        &self,
        parent: &Arc<Route<V>>,
    ) -> Result<Option<Resolved<V>>, ResolveError> {
        let Some(chain) = &self.chain else {
            return Ok(None);
        };
        match chain
            .clone()
            .advance(false, Some(parent.clone()), Fallthrough::Pass)
            .await?
        {
            Resolution::Pass | Resolution::Skip => Ok(None),
            accepted => chain.finalize(accepted).map(Some),
        }
    }
}

impl<V> fmt::Debug for Resolved<V>
where
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolved")
            .field("context", &self.context)
            .field("outcome", &self.outcome)
            .field("component", &self.component)
            .field("recovered", &self.recovered)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Resolver
// ============================================================================

struct Shared<V> {
    root: Arc<Route<V>>,
    base: String,
    options: ResolverOptions,
    view_factory: Option<Arc<dyn ViewFactory<V>>>,
    error_handler: Option<ErrorHandler<V>>,
    urls: UrlGenerator<V>,
}

/// Resolves pathnames against a route tree.
pub struct Resolver<V> {
    shared: Arc<Shared<V>>,
}

impl<V> Clone for Resolver<V> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<V: Send + 'static> Resolver<V> {
    /// Creates a resolver with default options.
    pub fn new(routes: Vec<RouteDescriptor<V>>) -> Result<Self, ValidationError> {
        Self::builder().routes(routes).build()
    }

    /// Starts a [`ResolverBuilder`].
    pub fn builder() -> ResolverBuilder<V> {
        ResolverBuilder::new()
    }

    /// The synthetic root holding the top-level routes.
    pub fn root(&self) -> &Arc<Route<V>> {
        &self.shared.root
    }

    /// Effective options.
    pub fn options(&self) -> &ResolverOptions {
        &self.shared.options
    }

    /// Effective base URL, empty when none is configured.
    pub fn base_url(&self) -> &str {
        &self.shared.base
    }

    /// Replaces the top-level routes.
    pub fn set_routes(
        &self,
        routes: Vec<RouteDescriptor<V>>,
    ) -> Result<Vec<Arc<Route<V>>>, ValidationError> {
        self.shared.root.set_routes(routes)
    }

    /// Appends top-level routes.
    pub fn add_routes(
        &self,
        routes: Vec<RouteDescriptor<V>>,
    ) -> Result<Vec<Arc<Route<V>>>, ValidationError> {
        self.shared.root.add_routes(routes)
    }

    /// Removes top-level routes by identity.
    pub fn remove_routes(&self, routes: &[Arc<Route<V>>]) -> Vec<Arc<Route<V>>> {
        self.shared.root.remove_routes(routes)
    }

    /// Current top-level routes.
    pub fn get_routes(&self) -> Vec<Arc<Route<V>>> {
        self.shared.root.get_routes()
    }

    /// URL of the route registered under `name` (or component key).
    pub fn url_for_name(&self, name: &str, params: &Params) -> Result<String, UrlError> {
        self.shared.urls.url_for_name(name, params)
    }

    /// Like [`Resolver::url_for_name`], with leftover parameters as query.
    pub fn url_for_name_with_query(
        &self,
        name: &str,
        params: &Params,
    ) -> Result<String, UrlError> {
        self.shared.urls.url_for_name_with_query(name, params)
    }

    /// Fills `pattern` with `params`, prefixing the base URL.
    pub fn url_for_path(&self, pattern: &str, params: &Params) -> Result<String, UrlError> {
        self.shared.urls.url_for_path(pattern, params)
    }

    /// Resolves a request, following accepted redirects.
    pub async fn resolve(
        &self,
        request: impl Into<ResolveRequest>,
    ) -> Result<Resolved<V>, ResolveError> {
        let mut request = request.into();
        loop {
            let resolved = self.resolve_once(request.clone()).await?;
            let Outcome::Redirect(command) = resolved.outcome() else {
                return Ok(resolved);
            };
            request = self.redirect_request(
                command,
                resolved.redirect_count(),
                resolved.context().error_context(),
            )?;
        }
    }

    /// Resolves a request without following redirects.
    pub async fn resolve_once(
        &self,
        request: impl Into<ResolveRequest>,
    ) -> Result<Resolved<V>, ResolveError> {
        let chain = Chain::start(self.shared.clone(), request.into());
        let result = match chain
            .clone()
            .advance(true, Some(self.shared.root.clone()), Fallthrough::Pass)
            .await
        {
            Ok(resolution) => chain.finalize(resolution),
            Err(err) => Err(err),
        };
        result.or_else(|err| self.recover(&chain, err))
    }

    /// Builds the request that follows `command`, counting the redirect.
    pub fn redirect_request(
        &self,
        command: &RedirectCommand,
        redirect_count: usize,
        context: ErrorContext,
    ) -> Result<ResolveRequest, ResolveError> {
        let count = redirect_count + 1;
        if count > self.shared.options.max_redirects {
            return Err(ResolveError::RedirectLoop {
                from: command.from.clone(),
                count,
                context: Box::new(context),
            });
        }

        let path = url_for_path(&command.pathname, &command.params)
            .map_err(|err| ResolveError::handler(context, Box::new(err)))?;

        #[cfg(feature = "tracing")]
        tracing::debug!(from = %command.from, to = %path, count, "following redirect");

        Ok(ResolveRequest {
            pathname: with_base(&self.shared.base, &path),
            redirect_from: Some(command.from.clone()),
            redirect_count: count,
            ..ResolveRequest::default()
        })
    }

    fn recover(&self, chain: &Arc<Chain<V>>, err: ResolveError) -> Result<Resolved<V>, ResolveError> {
        let Some(handler) = &self.shared.error_handler else {
            return Err(err);
        };

        #[cfg(feature = "tracing")]
        tracing::debug!(code = err.code(), error = %err, "rendering resolution error");

        Ok(Resolved {
            context: chain.current_context(),
            outcome: Outcome::View(handler(&err)),
            component: None,
            recovered: true,
            redirect_count: chain.request.redirect_count,
            chain: None,
        })
    }
}

// ============================================================================
// Chain
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fallthrough {
    Pass,
    Skip,
}

struct Step<V> {
    candidate: MatchCandidate<V>,
    links: Vec<ChainLink<V>>,
}

struct ChainState<V> {
    matcher: Option<RouteMatcher<V>>,
    last: Option<Arc<Route<V>>>,
    held: Option<Option<MatchCandidate<V>>>,
    current: Option<Step<V>>,
}

/// One resolution in flight.
struct Chain<V> {
    shared: Arc<Shared<V>>,
    request: ResolveRequest,
    state: Mutex<ChainState<V>>,
}

impl<V: Send + 'static> Chain<V> {
    fn start(shared: Arc<Shared<V>>, request: ResolveRequest) -> Arc<Self> {
        let matcher = relative_pathname(&shared.base, &request.pathname).map(|pathname| {
            RouteMatcher::new(shared.root.clone(), pathname, !shared.base.is_empty())
        });
        Arc::new(Self {
            shared,
            request,
            state: Mutex::new(ChainState {
                matcher,
                last: None,
                held: None,
                current: None,
            }),
        })
    }

    fn advance(
        self: Arc<Self>,
        resume: bool,
        parent: Option<Arc<Route<V>>>,
        fallthrough: Fallthrough,
    ) -> BoxFuture<'static, Result<Resolution<V>, ResolveError>> {
        Box::pin(async move {
            let Some((context, transit)) = self.step(resume, parent.as_deref(), fallthrough)?
            else {
                return Ok(Resolution::Pass);
            };
            let resolution = self.invoke(&context, transit).await?;
            match resolution {
                Resolution::Pass => self.advance(resume, parent, Fallthrough::Pass).await,
                Resolution::Skip => self.advance(resume, parent, Fallthrough::Skip).await,
                accepted => Ok(accepted),
            }
        })
    }

    /// Moves to the next candidate. `None` means the candidate lies outside
    /// `parent` and was held back.
    fn step(
        self: &Arc<Self>,
        resume: bool,
        parent: Option<&Route<V>>,
        fallthrough: Fallthrough,
    ) -> Result<Option<(Context<V>, bool)>, ResolveError> {
        let mut state = self.state.lock();
        let next = match state.held.take() {
            Some(held) => held,
            None => {
                let skip = match fallthrough {
                    Fallthrough::Skip => state.last.clone(),
                    Fallthrough::Pass => None,
                };
                state
                    .matcher
                    .as_mut()
                    .and_then(|matcher| matcher.next(skip.as_ref()))
            }
        };
        if let Some(candidate) = &next {
            state.last = Some(candidate.route.clone());
        }

        if !resume {
            let inside = match (&next, parent) {
                (Some(candidate), Some(parent)) => candidate.route.is_descendant_of(parent),
                _ => false,
            };
            if !inside {
                state.held = Some(next);
                return Ok(None);
            }
        }

        let Some(candidate) = next else {
            let context = match &state.current {
                Some(step) => self.context_for(step).error_context(),
                None => self.base_context().error_context(),
            };
            return Err(ResolveError::not_found(context));
        };

        #[cfg(feature = "tracing")]
        tracing::debug!(
            route = %candidate.route.path(),
            path = %candidate.path,
            "offering route candidate"
        );

        let transit = candidate.transit;
        let mut links = state
            .current
            .as_ref()
            .map(|step| step.links.clone())
            .unwrap_or_default();
        extend_links(&mut links, &candidate);
        let step = Step { candidate, links };
        let context = self.context_for(&step);
        state.current = Some(step);
        Ok(Some((context, transit)))
    }

    /// Runs a candidate. Transit candidates only load their children.
    async fn invoke(
        &self,
        context: &Context<V>,
        transit: bool,
    ) -> Result<Resolution<V>, ResolveError> {
        let route = context.route.clone();
        if route.has_pending_children() {
            route
                .load_children(context.clone())
                .await
                .map_err(|err| self.failure(context, err))?;
        }
        if transit {
            return Ok(Resolution::Pass);
        }

        let commands = context.commands();
        match route.kind() {
            RouteKind::Handler(handler) => handler
                .call_dyn(context.clone(), commands)
                .await
                .map_err(|err| self.failure(context, err)),
            RouteKind::Redirect(target) => Ok(commands.redirect(target.clone()).into()),
            RouteKind::Component(component) => Ok(commands.component(component.clone()).into()),
            RouteKind::Layout => Ok(Resolution::Pass),
        }
    }

    fn failure(&self, context: &Context<V>, err: BoxError) -> ResolveError {
        match err.downcast::<ResolveError>() {
            Ok(err) => *err,
            Err(err) => {
                let err = ResolveError::handler(context.error_context(), err);
                #[cfg(feature = "tracing")]
                tracing::warn!(error = %err, "route handler failed");
                err
            }
        }
    }

    fn finalize(self: &Arc<Self>, resolution: Resolution<V>) -> Result<Resolved<V>, ResolveError> {
        let context = self.current_context();
        let (outcome, component) = match resolution {
            Resolution::View(view) => (Outcome::View(view), None),
            Resolution::Command(Command::Redirect(command)) => (Outcome::Redirect(command), None),
            Resolution::Command(Command::Prevent) => (Outcome::Prevent, None),
            Resolution::Command(Command::Component(command)) => {
                let view = self.create_view(&command.component, &context)?;
                (Outcome::View(view), Some(command.component))
            }
            Resolution::Pass | Resolution::Skip => {
                return Err(ResolveError::not_found(context.error_context()));
            }
        };
        Ok(Resolved {
            context,
            outcome,
            component,
            recovered: false,
            redirect_count: self.request.redirect_count,
            chain: Some(self.clone()),
        })
    }

    fn create_view(&self, component: &str, context: &Context<V>) -> Result<V, ResolveError> {
        let Some(factory) = &self.shared.view_factory else {
            return Err(ResolveError::NoViewFactory {
                component: component.to_string(),
                context: Box::new(context.error_context()),
            });
        };
        factory
            .create(component, context)
            .map_err(|err| self.failure(context, err))
    }

    fn current_context(self: &Arc<Self>) -> Context<V> {
        match &self.state.lock().current {
            Some(step) => self.context_for(step),
            None => self.base_context(),
        }
    }

    fn base_context(self: &Arc<Self>) -> Context<V> {
        let mut context = Context::new(self.request.pathname.clone(), self.shared.root.clone())
            .with_continuation(self.clone());
        context.search = self.request.search.clone();
        context.hash = self.request.hash.clone();
        context.base_url = self.shared.base.clone();
        context.redirect_from = self.request.redirect_from.clone();
        context
    }

    fn context_for(self: &Arc<Self>, step: &Step<V>) -> Context<V> {
        let mut context = self.base_context();
        context.route = step.candidate.route.clone();
        context.path = step.candidate.path.clone();
        context.keys = step.candidate.keys.clone();
        context.params = step.candidate.params.clone();
        context.chain = step.links.clone();
        context
    }
}

impl<V: Send + 'static> Continuation<V> for Chain<V> {
    fn next(
        self: Arc<Self>,
        resume: bool,
        parent: Option<Arc<Route<V>>>,
    ) -> BoxFuture<'static, Result<Resolution<V>, ResolveError>> {
        self.advance(resume, parent, Fallthrough::Pass)
    }
}

/// Trims `links` back to the candidate's parent and appends the candidate.
fn extend_links<V>(links: &mut Vec<ChainLink<V>>, candidate: &MatchCandidate<V>) {
    if candidate.route.is_synthetic() {
        return;
    }
    if let Some(parent) = candidate.route.parent() {
        while links
            .last()
            .is_some_and(|link| !Arc::ptr_eq(&link.route, &parent))
        {
            links.pop();
        }
    }
    links.push(ChainLink {
        route: candidate.route.clone(),
        path: candidate.path.clone(),
    });
}

/// Strips the base URL from `pathname`. `None` if it lies outside the base.
fn relative_pathname(base: &str, pathname: &str) -> Option<String> {
    if base.is_empty() || !pathname.starts_with('/') {
        return Some(pathname.to_string());
    }
    pathname.strip_prefix(base).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use waymark_core::HandlerResult;

    fn text(value: &str) -> HandlerResult<String> {
        Ok(Resolution::View(value.to_string()))
    }

    fn pass() -> HandlerResult<String> {
        Ok(Resolution::Pass)
    }

    fn view_of(resolved: &Resolved<String>) -> &str {
        match resolved.outcome() {
            Outcome::View(view) => view,
            other => panic!("expected a view, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn first_accepting_handler_wins() {
        let resolver = Resolver::new(vec![
            RouteDescriptor::new("/a").handler(|_, _| async { pass() }),
            RouteDescriptor::new("/a").handler(|_, _| async { text("second") }),
            RouteDescriptor::new("/a").handler(|_, _| async { text("third") }),
        ])
        .unwrap();

        let resolved = resolver.resolve("/a").await.unwrap();
        assert_eq!(view_of(&resolved), "second");
    }

    #[tokio::test]
    async fn not_found_when_nothing_accepts() {
        let resolver = Resolver::new(vec![
            RouteDescriptor::new("/a").handler(|_, _| async { pass() }),
        ])
        .unwrap();

        let err = resolver.resolve("/b").await.unwrap_err();
        assert_eq!(err.code(), 404);
        assert_eq!(err.context().pathname, "/b");
    }

    #[tokio::test]
    async fn handler_errors_cite_the_route() {
        let resolver = Resolver::new(vec![
            RouteDescriptor::new("/boom")
                .handler(|_, _| async { Err::<Resolution<String>, BoxError>("kaboom".into()) }),
        ])
        .unwrap();

        let err = resolver.resolve("/boom").await.unwrap_err();
        assert_eq!(err.code(), 500);
        assert_eq!(err.context().route_path.as_deref(), Some("/boom"));
        assert!(err.to_string().contains("'/boom'"));
    }

    #[tokio::test]
    async fn skip_bypasses_subtree() {
        let resolver = Resolver::new(vec![
            RouteDescriptor::new("/a")
                .handler(|_, _| async { Ok(Resolution::Skip) })
                .children(vec![
                    RouteDescriptor::new("/b").handler(|_, _| async { text("child") }),
                ]),
            RouteDescriptor::new("/a/b").handler(|_, _| async { text("sibling") }),
        ])
        .unwrap();

        let resolved = resolver.resolve("/a/b").await.unwrap();
        assert_eq!(view_of(&resolved), "sibling");
    }

    #[tokio::test]
    async fn next_resolves_own_subtree_first() {
        let resolver = Resolver::new(vec![
            RouteDescriptor::new("/a")
                .handler(|ctx: Context<String>, _| async move {
                    match ctx.next().await? {
                        Resolution::View(inner) => text(&format!("wrapped({inner})")),
                        _ => text("empty"),
                    }
                })
                .children(vec![
                    RouteDescriptor::new("/b").handler(|_, _| async { text("b") }),
                ]),
        ])
        .unwrap();

        assert_eq!(view_of(&resolver.resolve("/a/b").await.unwrap()), "wrapped(b)");
        assert_eq!(view_of(&resolver.resolve("/a/c").await.unwrap()), "empty");
    }

    #[tokio::test]
    async fn follows_redirects_with_params() {
        let resolver = Resolver::new(vec![
            RouteDescriptor::new("/old/:id").redirect("/new/:id"),
            RouteDescriptor::new("/new/:id").handler(|ctx: Context<String>, _| async move {
                text(ctx.params.get_str("id").unwrap_or_default())
            }),
        ])
        .unwrap();

        let resolved = resolver.resolve("/old/7").await.unwrap();
        assert_eq!(view_of(&resolved), "7");
        assert_eq!(resolved.context().redirect_from.as_deref(), Some("/old/7"));
        assert_eq!(resolved.redirect_count(), 1);
    }

    #[tokio::test]
    async fn redirect_loops_are_bounded() {
        let resolver = Resolver::<String>::builder()
            .routes(vec![
                RouteDescriptor::new("/ping").redirect("/pong"),
                RouteDescriptor::new("/pong").redirect("/ping"),
            ])
            .max_redirects(5)
            .build()
            .unwrap();

        let err = resolver.resolve("/ping").await.unwrap_err();
        assert!(matches!(err, ResolveError::RedirectLoop { count: 6, .. }));
        assert_eq!(err.code(), 500);
    }

    #[tokio::test]
    async fn components_need_a_factory() {
        let resolver = Resolver::<String>::new(vec![RouteDescriptor::new("/").component("home")])
            .unwrap();
        let err = resolver.resolve("/").await.unwrap_err();
        assert!(matches!(err, ResolveError::NoViewFactory { .. }));

        let resolver = Resolver::builder()
            .route(RouteDescriptor::new("/").component("home"))
            .view_factory(|component: &str, _: &Context<String>| -> Result<String, BoxError> {
                Ok(format!("<{component}>"))
            })
            .build()
            .unwrap();
        let resolved = resolver.resolve("/").await.unwrap();
        assert_eq!(view_of(&resolved), "<home>");
        assert_eq!(resolved.component(), Some("home"));
    }

    #[tokio::test]
    async fn error_handler_renders_failures() {
        let resolver = Resolver::builder()
            .route(RouteDescriptor::new("/").component("home"))
            .view_factory(|c: &str, _: &Context<String>| -> Result<String, BoxError> {
                Ok(c.to_string())
            })
            .error_handler(|err: &ResolveError| format!("error {}", err.code()))
            .build()
            .unwrap();

        let resolved = resolver.resolve("/missing").await.unwrap();
        assert!(resolved.is_recovered());
        assert_eq!(view_of(&resolved), "error 404");
    }

    #[tokio::test]
    async fn base_url_is_stripped() {
        let resolver = Resolver::builder()
            .route(RouteDescriptor::new("/users/:id").handler(|ctx: Context<String>, _| async move {
                text(&format!("{}@{}", ctx.params.get_str("id").unwrap_or_default(), ctx.pathname))
            }))
            .base_url("/app/")
            .build()
            .unwrap();

        let resolved = resolver.resolve("/app/users/3").await.unwrap();
        assert_eq!(view_of(&resolved), "3@/app/users/3");
        assert!(resolver.resolve("/users/3").await.unwrap_err().is_not_found());
        assert_eq!(
            resolver.url_for_path("/users/:id", &Params::new().with("id", "4")).unwrap(),
            "/app/users/4"
        );
    }

    #[tokio::test]
    async fn deferred_children_load_on_demand() {
        let resolver = Resolver::new(vec![RouteDescriptor::new("/lazy").lazy_children(
            |_ctx: Context<String>| async {
                Ok::<_, BoxError>(vec![
                    RouteDescriptor::new("/leaf").handler(|_, _| async { text("loaded") }),
                ])
            },
        )])
        .unwrap();
        let lazy = resolver.get_routes()[0].clone();
        assert!(lazy.has_pending_children());

        let resolved = resolver.resolve("/lazy/leaf").await.unwrap();
        assert_eq!(view_of(&resolved), "loaded");
        assert!(!lazy.has_pending_children());
        assert_eq!(lazy.get_routes().len(), 1);
    }

    #[tokio::test]
    async fn exact_parent_loads_deferred_children() {
        let resolver = Resolver::new(vec![
            RouteDescriptor::new("/docs")
                .exact(true)
                .component("docs")
                .lazy_children(|_ctx: Context<String>| async {
                    Ok::<_, BoxError>(vec![
                        RouteDescriptor::new("/intro").handler(|_, _| async { text("intro") }),
                    ])
                }),
        ])
        .unwrap();

        let resolved = resolver.resolve("/docs/intro").await.unwrap();
        assert_eq!(view_of(&resolved), "intro");
        let paths: Vec<_> = resolved.context().chain.iter().map(|l| l.path.as_str()).collect();
        assert_eq!(paths, vec!["/docs", "intro"]);
        assert!(!resolver.get_routes()[0].has_pending_children());
    }

    #[tokio::test]
    async fn chain_lists_matched_routes() {
        let resolver = Resolver::new(vec![RouteDescriptor::new("/org/:org").children(vec![
            RouteDescriptor::new("/team/:team").handler(|_, _| async { text("team") }),
        ])])
        .unwrap();

        let resolved = resolver.resolve("/org/acme/team/core?tab=1#top").await.unwrap();
        let context = resolved.context();
        let paths: Vec<_> = context.chain.iter().map(|l| l.path.as_str()).collect();
        assert_eq!(paths, vec!["/org/acme", "team/core"]);
        assert_eq!(context.search, "?tab=1");
        assert_eq!(context.hash, "#top");
        assert_eq!(context.params.get_str("org"), Some("acme"));
        assert_eq!(resolved.location().matched_pattern(), "/org/:org/team/:team");
    }

    #[test]
    fn effective_base_keeps_directory() {
        let base = |b: &str| ResolverOptions::default().with_base_url(b).effective_base();
        assert_eq!(base("/app/"), "/app/");
        assert_eq!(base("/app/index.html"), "/app/");
        assert_eq!(base("/app"), "/");
        assert_eq!(ResolverOptions::default().effective_base(), "");
    }
}
