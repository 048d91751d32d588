//! # Route Handlers
//!
//! A route handler is invoked when its route matches during resolution. It
//! receives the step [`Context`] and a [`Commands`] factory, and returns a
//! [`Resolution`]:
//!
//! - `Pass` / `Skip` to keep searching (into or past this subtree)
//! - a view or a command to accept the route
//!
//! Handlers may also call [`Context::next`] to resolve the rest of the chain
//! first and wrap or replace its result.
//!
//! # Static vs Dynamic Dispatch
//!
//! [`RouteHandler`] uses return-position `impl Future` for static dispatch.
//! Routes store handlers as [`DynRouteHandler`] trait objects; every
//! `RouteHandler` is a `DynRouteHandler` through a blanket implementation.
//! Async closures of the shape `Fn(Context<V>, Commands) -> Future` are
//! handlers as well.

use crate::command::{Commands, HandlerResult};
use crate::context::Context;
use crate::error::BoxError;
use crate::route::RouteDescriptor;
use futures::future::BoxFuture;
use std::future::Future;

/// A function invoked when a route matches.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a route handler for views of type `{V}`",
    label = "missing `RouteHandler` implementation",
    note = "Handlers take `(Context<{V}>, Commands)` and return `Result<Resolution<{V}>, BoxError>`."
)]
pub trait RouteHandler<V>: Send + Sync + 'static {
    /// Handles the matched step.
    fn call(
        &self,
        context: Context<V>,
        commands: Commands,
    ) -> impl Future<Output = HandlerResult<V>> + Send;
}

/// Dynamic object-safe version of [`RouteHandler`].
pub trait DynRouteHandler<V>: Send + Sync + 'static {
    /// Handles the matched step (dynamic dispatch version).
    fn call_dyn(&self, context: Context<V>, commands: Commands)
    -> BoxFuture<'_, HandlerResult<V>>;
}

impl<V: 'static, T: RouteHandler<V>> DynRouteHandler<V> for T {
    fn call_dyn(
        &self,
        context: Context<V>,
        commands: Commands,
    ) -> BoxFuture<'_, HandlerResult<V>> {
        Box::pin(self.call(context, commands))
    }
}

impl<V, F, Fut> RouteHandler<V> for F
where
    F: Fn(Context<V>, Commands) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult<V>> + Send,
{
    fn call(
        &self,
        context: Context<V>,
        commands: Commands,
    ) -> impl Future<Output = HandlerResult<V>> + Send {
        (self)(context, commands)
    }
}

// ============================================================================
// Deferred children
// ============================================================================

/// Produces the children of a route the first time resolution reaches it.
pub trait ChildrenProducer<V>: Send + Sync + 'static {
    /// Loads the child descriptors.
    fn produce(&self, context: Context<V>)
    -> BoxFuture<'static, Result<Vec<RouteDescriptor<V>>, BoxError>>;
}

impl<V, F, Fut> ChildrenProducer<V> for F
where
    F: Fn(Context<V>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Vec<RouteDescriptor<V>>, BoxError>> + Send + 'static,
{
    fn produce(
        &self,
        context: Context<V>,
    ) -> BoxFuture<'static, Result<Vec<RouteDescriptor<V>>, BoxError>> {
        Box::pin((self)(context))
    }
}

// ============================================================================
// View factories
// ============================================================================

/// Instantiates views for component commands.
///
/// The step context is passed so the factory can hand route parameters to
/// the view it creates.
pub trait ViewFactory<V>: Send + Sync + 'static {
    /// Creates the view registered under `component`.
    fn create(&self, component: &str, context: &Context<V>) -> Result<V, BoxError>;
}

impl<V, F> ViewFactory<V> for F
where
    F: Fn(&str, &Context<V>) -> Result<V, BoxError> + Send + Sync + 'static,
{
    fn create(&self, component: &str, context: &Context<V>) -> Result<V, BoxError> {
        (self)(component, context)
    }
}
