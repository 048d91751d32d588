//! # Navigator
//!
//! Turns resolutions into committed locations. A navigation resolves the
//! full chain of views for a pathname, runs the lifecycle hooks of the views
//! that change, and hands the new chain to an [`Outlet`].
//!
//! # Full chains
//!
//! When the accepted route consumed only part of the pathname, resolution
//! continues inside that route's subtree, then inside its ancestors', until
//! the matched links cover the whole pathname. Every accepted view is
//! attached to its link, so layouts and their nested pages form one chain.
//!
//! # Lifecycle
//!
//! Only the part of the chains after the first differing link takes part:
//!
//! 1. `on_before_leave` on outgoing views, innermost first
//! 2. `on_before_enter` on incoming views, outermost first
//! 3. commit to the outlet
//! 4. `on_after_enter` on incoming views, then `on_after_leave` on outgoing
//!    views
//!
//! A prevent from a `before` hook keeps the previous location. A redirect
//! from `on_before_enter` restarts the navigation at the target. When the
//! new chain is identical to the displayed one, the displayed views are
//! kept, all `before` hooks run and nothing is re-mounted.
//!
//! # Concurrency
//!
//! The latest navigation wins. Each navigation takes a generation number
//! that is checked before every hook and before the commit; a navigation
//! overtaken by a newer one settles as [`Navigation::Superseded`].

use crate::resolver::{Outcome, ResolveRequest, Resolved, Resolver};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use waymark_core::{
    BoxError, ChainLink, Commands, ErrorContext, HookResult, Location, ResolveError, Route,
    View, join_paths, with_base,
};

#[cfg(feature = "tracing")]
use tracing::Instrument;

// ============================================================================
// Outlet
// ============================================================================

/// A matched route together with the view rendered for it, if any.
pub struct ViewLink<V> {
    /// The matched route.
    pub route: Arc<Route<V>>,
    /// Portion of the pathname the route consumed.
    pub path: String,
    /// View accepted for this route. Layout routes have none.
    pub view: Option<Arc<V>>,
    /// Component key the view was created from.
    pub component: Option<String>,
}

impl<V> ViewLink<V> {
    fn reusable(&self, other: &Self) -> bool {
        match (&self.view, &other.view) {
            (None, None) => true,
            (Some(_), Some(_)) => self.component.is_some() && self.component == other.component,
            _ => false,
        }
    }

    fn same_step(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.route, &other.route) && self.path == other.path && self.reusable(other)
    }
}

impl<V> Clone for ViewLink<V> {
    fn clone(&self) -> Self {
        Self {
            route: self.route.clone(),
            path: self.path.clone(),
            view: self.view.clone(),
            component: self.component.clone(),
        }
    }
}

impl<V> fmt::Debug for ViewLink<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewLink")
            .field("route", &self.route.path())
            .field("path", &self.path)
            .field("has_view", &self.view.is_some())
            .field("component", &self.component)
            .finish()
    }
}

/// What an [`Outlet`] receives on commit.
pub struct OutletUpdate<'a, V> {
    /// The committed location.
    pub location: &'a Location<V>,
    /// The full committed chain, outermost first.
    pub views: &'a [ViewLink<V>],
    /// Links of the new chain that were not displayed before.
    pub entering: &'a [ViewLink<V>],
    /// Links of the previous chain that are no longer displayed.
    pub leaving: &'a [ViewLink<V>],
}

/// The output region that displays committed view chains.
pub trait Outlet<V>: Send + Sync + 'static {
    /// Mounts the committed chain.
    fn commit(&self, update: OutletUpdate<'_, V>);
}

/// An outlet that displays nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopOutlet;

impl<V> Outlet<V> for NoopOutlet {
    fn commit(&self, _update: OutletUpdate<'_, V>) {}
}

// ============================================================================
// Navigation
// ============================================================================

/// How a navigation settled.
pub enum Navigation<V> {
    /// The new location is displayed.
    Committed(Location<V>),
    /// A handler or hook prevented the navigation; the previous location
    /// is still displayed.
    Prevented(Location<V>),
    /// A newer navigation took over before this one could commit.
    Superseded,
}

impl<V> Navigation<V> {
    /// The committed or retained location. `None` when superseded.
    pub fn location(&self) -> Option<&Location<V>> {
        match self {
            Self::Committed(location) | Self::Prevented(location) => Some(location),
            Self::Superseded => None,
        }
    }

    /// Returns `true` for [`Navigation::Committed`].
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed(_))
    }
}

impl<V> fmt::Debug for Navigation<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Committed(location) => f.debug_tuple("Committed").field(location).finish(),
            Self::Prevented(location) => f.debug_tuple("Prevented").field(location).finish(),
            Self::Superseded => f.write_str("Superseded"),
        }
    }
}

struct Snapshot<V> {
    location: Location<V>,
    views: Vec<ViewLink<V>>,
}

enum Attempt<V> {
    Resolved {
        location: Location<V>,
        links: Vec<ViewLink<V>>,
        redirect_count: usize,
    },
    Prevented,
}

enum Transition<V> {
    Done(Navigation<V>),
    Redirect(ResolveRequest),
}

// ============================================================================
// Navigator
// ============================================================================

/// Drives navigations over a [`Resolver`] and keeps the displayed location.
pub struct Navigator<V> {
    resolver: Resolver<V>,
    outlet: Arc<dyn Outlet<V>>,
    generation: AtomicU64,
    current: Mutex<Snapshot<V>>,
}

impl<V: View> Navigator<V> {
    /// Creates a navigator that displays nothing.
    pub fn new(resolver: Resolver<V>) -> Self {
        Self {
            resolver,
            outlet: Arc::new(NoopOutlet),
            generation: AtomicU64::new(0),
            current: Mutex::new(Snapshot {
                location: Location::default(),
                views: Vec::new(),
            }),
        }
    }

    /// Sets the outlet committed chains are handed to.
    pub fn with_outlet(mut self, outlet: impl Outlet<V>) -> Self {
        self.outlet = Arc::new(outlet);
        self
    }

    /// The underlying resolver.
    pub fn resolver(&self) -> &Resolver<V> {
        &self.resolver
    }

    /// The displayed location.
    pub fn location(&self) -> Location<V> {
        self.current.lock().location.clone()
    }

    /// The displayed chain, outermost first.
    pub fn views(&self) -> Vec<ViewLink<V>> {
        self.current.lock().views.clone()
    }

    /// Navigates to `request`.
    ///
    /// Failures leave the displayed location untouched.
    pub async fn navigate(
        &self,
        request: impl Into<ResolveRequest>,
    ) -> Result<Navigation<V>, ResolveError> {
        let request = request.into();
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;

        #[cfg(feature = "tracing")]
        let span = tracing::info_span!("navigate", pathname = %request.pathname, generation);
        let run = self.run(request, generation);
        #[cfg(feature = "tracing")]
        let run = run.instrument(span);
        run.await
    }

    async fn run(
        &self,
        mut request: ResolveRequest,
        generation: u64,
    ) -> Result<Navigation<V>, ResolveError> {
        loop {
            let attempt = self.resolve_chain(request).await?;
            if !self.is_current(generation) {
                return Ok(self.superseded());
            }
            let (location, links, redirect_count) = match attempt {
                Attempt::Resolved {
                    location,
                    links,
                    redirect_count,
                } => (location, links, redirect_count),
                Attempt::Prevented => return Ok(self.prevented()),
            };
            match self
                .transition(location, links, redirect_count, generation)
                .await?
            {
                Transition::Done(navigation) => return Ok(navigation),
                Transition::Redirect(next) => request = next,
            }
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::Acquire) == generation
    }

    fn superseded(&self) -> Navigation<V> {
        #[cfg(feature = "tracing")]
        tracing::debug!("navigation superseded by a newer one");
        Navigation::Superseded
    }

    fn prevented(&self) -> Navigation<V> {
        #[cfg(feature = "tracing")]
        tracing::debug!("navigation prevented");
        Navigation::Prevented(self.location())
    }

    // ========================================================================
    // Resolution
    // ========================================================================

    /// Resolves every view of the chain for `request`, following redirects.
    async fn resolve_chain(&self, mut request: ResolveRequest) -> Result<Attempt<V>, ResolveError> {
        'request: loop {
            let mut resolved = self.resolver.resolve_once(request.clone()).await?;
            let mut accepted: Vec<ViewLink<V>> = Vec::new();
            loop {
                match resolved.outcome() {
                    Outcome::Redirect(command) => {
                        request = self.resolver.redirect_request(
                            command,
                            resolved.redirect_count(),
                            resolved.context().error_context(),
                        )?;
                        continue 'request;
                    }
                    Outcome::Prevent => return Ok(Attempt::Prevented),
                    Outcome::View(_) => {}
                }

                let redirect_count = resolved.redirect_count();
                if resolved.is_recovered() {
                    let (context, outcome) = resolved.into_parts();
                    let view = match outcome {
                        Outcome::View(view) => Some(Arc::new(view)),
                        _ => None,
                    };
                    let link = ViewLink {
                        route: context.route.clone(),
                        path: context.path.clone(),
                        view,
                        component: None,
                    };
                    return Ok(Attempt::Resolved {
                        location: Location::from_context(&context),
                        links: vec![link],
                        redirect_count,
                    });
                }

                let next = self.find_next(&resolved).await?;
                let component = resolved.component().map(str::to_string);
                let (context, outcome) = resolved.into_parts();
                if let Outcome::View(view) = outcome {
                    accepted.push(ViewLink {
                        route: context.route.clone(),
                        path: context.path.clone(),
                        view: Some(Arc::new(view)),
                        component,
                    });
                }

                match next {
                    Some(next) => resolved = next,
                    None => {
                        return Ok(Attempt::Resolved {
                            location: Location::from_context(&context),
                            links: attach(&context.chain, &accepted),
                            redirect_count,
                        });
                    }
                }
            }
        }
    }

    /// Looks for the next accepting route below the accepted one, climbing
    /// to ancestors while the pathname is not fully matched.
    async fn find_next(&self, resolved: &Resolved<V>) -> Result<Option<Resolved<V>>, ResolveError> {
        let context = resolved.context();
        let matched = join_paths(context.chain.iter().map(|link| link.path.as_str()));
        let is_found = with_base(&context.base_url, &matched) == context.pathname;

        let mut parent = context.route.clone();
        loop {
            if let Some(next) = resolved.continue_within(&parent).await? {
                return Ok(Some(next));
            }
            if is_found {
                return Ok(None);
            }
            match parent.parent() {
                Some(ancestor) => parent = ancestor,
                None => return Err(ResolveError::not_found(context.error_context())),
            }
        }
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    async fn transition(
        &self,
        location: Location<V>,
        mut links: Vec<ViewLink<V>>,
        redirect_count: usize,
        generation: u64,
    ) -> Result<Transition<V>, ResolveError> {
        let old = self.views();
        let diverged = old
            .iter()
            .zip(&links)
            .take_while(|(old, new)| old.same_step(new))
            .count();
        let skip_attach = !old.is_empty() && old.len() == links.len() && diverged == links.len();

        if skip_attach {
            links = old.clone();
        } else {
            for (new, old) in links.iter_mut().zip(&old).take(diverged) {
                new.view = old.view.clone();
                new.component = old.component.clone();
            }
        }
        let changed_from = if skip_attach { 0 } else { diverged };
        let commands = Commands::new(location.pathname.clone(), location.params.clone());

        for link in old[changed_from..].iter().rev() {
            let Some(view) = &link.view else {
                continue;
            };
            if !self.is_current(generation) {
                return Ok(Transition::Done(self.superseded()));
            }
            let verdict = view
                .on_before_leave(&location, &commands)
                .await
                .map_err(|err| hook_failure(&location, &link.route, err))?;
            match verdict {
                HookResult::Next => {}
                HookResult::Prevent => return Ok(Transition::Done(self.prevented())),
                HookResult::Redirect(_command) => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(
                        route = %link.route.path(),
                        target = %_command.pathname,
                        "ignoring redirect from before-leave hook"
                    );
                }
            }
        }

        for link in &links[changed_from..] {
            let Some(view) = &link.view else {
                continue;
            };
            if !self.is_current(generation) {
                return Ok(Transition::Done(self.superseded()));
            }
            let hook_location = location.for_route(&link.route);
            let verdict = view
                .on_before_enter(&hook_location, &commands)
                .await
                .map_err(|err| hook_failure(&location, &link.route, err))?;
            match verdict {
                HookResult::Next => {}
                HookResult::Prevent => return Ok(Transition::Done(self.prevented())),
                HookResult::Redirect(command) => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(
                        route = %link.route.path(),
                        target = %command.pathname,
                        "redirect from before-enter hook"
                    );
                    let request = self.resolver.redirect_request(
                        &command,
                        redirect_count,
                        location_error_context(&location, &link.route),
                    )?;
                    return Ok(Transition::Redirect(request));
                }
            }
        }

        {
            let mut current = self.current.lock();
            if !self.is_current(generation) {
                drop(current);
                return Ok(Transition::Done(self.superseded()));
            }
            current.location = location.clone();
            current.views = links.clone();
        }

        if skip_attach {
            #[cfg(feature = "tracing")]
            tracing::debug!(pathname = %location.pathname, "chain unchanged; views kept");
            return Ok(Transition::Done(Navigation::Committed(location)));
        }

        self.outlet.commit(OutletUpdate {
            location: &location,
            views: &links,
            entering: &links[diverged..],
            leaving: &old[diverged..],
        });

        for link in &links[diverged..] {
            if let Some(view) = &link.view {
                view.on_after_enter(&location.for_route(&link.route)).await;
            }
        }
        for link in old[diverged..].iter().rev() {
            if let Some(view) = &link.view {
                view.on_after_leave(&location).await;
            }
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(pathname = %location.pathname, links = links.len(), "navigation committed");
        Ok(Transition::Done(Navigation::Committed(location)))
    }
}

impl<V> fmt::Debug for Navigator<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Navigator")
            .field("generation", &self.generation.load(Ordering::Relaxed))
            .field("location", &self.current.lock().location)
            .finish_non_exhaustive()
    }
}

/// Builds the view chain of `chain` from the accepted links.
fn attach<V>(chain: &[ChainLink<V>], accepted: &[ViewLink<V>]) -> Vec<ViewLink<V>> {
    chain
        .iter()
        .map(|link| {
            let found = accepted
                .iter()
                .rev()
                .find(|view| Arc::ptr_eq(&view.route, &link.route));
            ViewLink {
                route: link.route.clone(),
                path: link.path.clone(),
                view: found.and_then(|view| view.view.clone()),
                component: found.and_then(|view| view.component.clone()),
            }
        })
        .collect()
}

fn location_error_context<V>(location: &Location<V>, route: &Route<V>) -> ErrorContext {
    ErrorContext {
        pathname: location.pathname.clone(),
        search: location.search.clone(),
        hash: location.hash.clone(),
        params: location.params.clone(),
        route_path: Some(route.path().to_string()),
        chain: location
            .routes
            .iter()
            .map(|route| route.path().to_string())
            .collect(),
    }
}

fn hook_failure<V>(location: &Location<V>, route: &Route<V>, err: BoxError) -> ResolveError {
    ResolveError::handler(location_error_context(location, route), err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Journal, RecordingOutlet, StaticViewFactory, TestView};
    use futures::channel::oneshot;
    use waymark_core::{Resolution, RouteDescriptor};

    fn routes() -> Vec<RouteDescriptor<TestView>> {
        vec![
            RouteDescriptor::new("/").component("home"),
            RouteDescriptor::new("/users").component("users").children(vec![
                RouteDescriptor::new("/").component("user-list"),
                RouteDescriptor::new("/:id").component("user"),
            ]),
        ]
    }

    fn navigator(factory: StaticViewFactory, outlet: &RecordingOutlet) -> Navigator<TestView> {
        let resolver = Resolver::builder()
            .routes(routes())
            .view_factory(factory)
            .build()
            .unwrap();
        Navigator::new(resolver).with_outlet(outlet.clone())
    }

    fn names(navigator: &Navigator<TestView>) -> Vec<String> {
        navigator
            .views()
            .iter()
            .filter_map(|link| link.view.as_ref().map(|view| view.name().to_string()))
            .collect()
    }

    #[tokio::test]
    async fn resolves_nested_views() {
        let journal = Journal::new();
        let outlet = RecordingOutlet::new();
        let nav = navigator(StaticViewFactory::new(&journal), &outlet);

        let navigation = nav.navigate("/users/7").await.unwrap();
        assert!(navigation.is_committed());
        assert_eq!(names(&nav), vec!["users", "user"]);
        assert_eq!(nav.location().params.get_str("id"), Some("7"));
        assert_eq!(
            journal.take(),
            vec![
                "before-enter:users",
                "before-enter:user",
                "after-enter:users",
                "after-enter:user",
            ]
        );
        assert_eq!(outlet.last().unwrap().routes, vec!["/users", "/:id"]);
    }

    #[tokio::test]
    async fn only_changed_links_run_hooks() {
        let journal = Journal::new();
        let outlet = RecordingOutlet::new();
        let nav = navigator(StaticViewFactory::new(&journal), &outlet);
        nav.navigate("/users/7").await.unwrap();
        journal.take();

        nav.navigate("/users/8").await.unwrap();
        assert_eq!(
            journal.take(),
            vec![
                "before-leave:user",
                "before-enter:user",
                "after-enter:user",
                "after-leave:user",
            ]
        );
        let record = outlet.last().unwrap();
        assert_eq!((record.entering, record.leaving), (1, 1));
        assert_eq!(nav.views()[1].view.as_ref().unwrap().params().get_str("id"), Some("8"));
    }

    #[tokio::test]
    async fn identical_chain_keeps_views() {
        let journal = Journal::new();
        let outlet = RecordingOutlet::new();
        let nav = navigator(StaticViewFactory::new(&journal), &outlet);
        nav.navigate("/users/7").await.unwrap();
        let before = nav.views();
        journal.take();

        assert!(nav.navigate("/users/7").await.unwrap().is_committed());
        assert_eq!(
            journal.take(),
            vec![
                "before-leave:user",
                "before-leave:users",
                "before-enter:users",
                "before-enter:user",
            ]
        );
        assert_eq!(outlet.records().len(), 1);
        let after = nav.views();
        assert!(Arc::ptr_eq(
            before[1].view.as_ref().unwrap(),
            after[1].view.as_ref().unwrap()
        ));
    }

    #[tokio::test]
    async fn before_leave_can_prevent() {
        let journal = Journal::new();
        let factory = StaticViewFactory::new(&journal)
            .with_view("user", TestView::new("user", &journal).prevent_leave());
        let outlet = RecordingOutlet::new();
        let nav = navigator(factory, &outlet);
        nav.navigate("/users/7").await.unwrap();
        journal.take();

        let navigation = nav.navigate("/").await.unwrap();
        assert!(matches!(&navigation, Navigation::Prevented(location) if location.pathname == "/users/7"));
        assert_eq!(nav.location().pathname, "/users/7");
        assert_eq!(journal.take(), vec!["before-leave:user"]);
        assert_eq!(outlet.records().len(), 1);
    }

    #[tokio::test]
    async fn before_enter_can_redirect() {
        let journal = Journal::new();
        let factory = StaticViewFactory::new(&journal)
            .with_view("user-list", TestView::new("user-list", &journal).redirect_on_enter("/"));
        let outlet = RecordingOutlet::new();
        let nav = navigator(factory, &outlet);

        let navigation = nav.navigate("/users").await.unwrap();
        let location = navigation.location().unwrap();
        assert_eq!(location.pathname, "/");
        assert_eq!(location.redirect_from.as_deref(), Some("/users"));
        assert_eq!(names(&nav), vec!["home"]);
    }

    #[tokio::test]
    async fn failures_keep_the_displayed_location() {
        let journal = Journal::new();
        let outlet = RecordingOutlet::new();
        let nav = navigator(StaticViewFactory::new(&journal), &outlet);
        nav.navigate("/").await.unwrap();

        let err = nav.navigate("/nowhere").await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(nav.location().pathname, "/");
    }

    #[tokio::test]
    async fn newer_navigation_supersedes() {
        let journal = Journal::new();
        let (tx, rx) = oneshot::channel::<()>();
        let gate = Arc::new(Mutex::new(Some(rx)));
        let slow_journal = journal.clone();
        let resolver = Resolver::builder()
            .route(RouteDescriptor::<TestView>::new("/slow").handler(move |_, _| {
                let gate = gate.lock().take();
                let view = TestView::new("slow", &slow_journal);
                async move {
                    if let Some(gate) = gate {
                        let _ = gate.await;
                    }
                    Ok::<_, BoxError>(Resolution::View(view))
                }
            }))
            .route(RouteDescriptor::new("/fast").component("fast"))
            .view_factory(StaticViewFactory::new(&journal))
            .build()
            .unwrap();
        let nav = Navigator::new(resolver);

        let (slow, fast) = futures::join!(nav.navigate("/slow"), async {
            let fast = nav.navigate("/fast").await;
            let _ = tx.send(());
            fast
        });

        assert!(matches!(slow.unwrap(), Navigation::Superseded));
        assert!(fast.unwrap().is_committed());
        assert_eq!(nav.location().pathname, "/fast");
        assert_eq!(names(&nav), vec!["fast"]);
    }
}
