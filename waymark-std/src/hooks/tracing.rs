//! Tracing Handler - Spans around individual routes.

use waymark_core::{Commands, Context, HandlerResult, RouteHandler};

#[cfg(feature = "tracing")]
use tracing::Instrument;

/// A handler wrapper that runs the inner handler inside a `tracing` span.
///
/// Nested resolutions started with [`Context::next`] from the inner handler
/// are recorded inside the same span.
pub struct TracingHandler<H> {
    inner: H,
    name: &'static str,
}

impl<H> TracingHandler<H> {
    /// Wraps `inner` in a span named after `name`.
    pub const fn new(inner: H, name: &'static str) -> Self {
        Self { inner, name }
    }

    /// The span's `handler` field.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The wrapped handler.
    pub fn inner(&self) -> &H {
        &self.inner
    }
}

impl<H: Clone> Clone for TracingHandler<H> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            name: self.name,
        }
    }
}

impl<V, H> RouteHandler<V> for TracingHandler<H>
where
    V: 'static,
    H: RouteHandler<V>,
{
    #[cfg(feature = "tracing")]
    async fn call(&self, context: Context<V>, commands: Commands) -> HandlerResult<V> {
        let span = tracing::info_span!(
            "route_handler",
            handler = %self.name,
            route = %context.route.path(),
            pathname = %context.pathname,
        );
        async move { self.inner.call(context, commands).await }
            .instrument(span)
            .await
    }

    #[cfg(not(feature = "tracing"))]
    async fn call(&self, context: Context<V>, commands: Commands) -> HandlerResult<V> {
        self.inner.call(context, commands).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use waymark_core::{BoxError, Resolution, Route, RouteDescriptor};

    #[derive(Clone, Copy)]
    struct Skipper;

    impl RouteHandler<()> for Skipper {
        async fn call(&self, _context: Context<()>, _commands: Commands) -> HandlerResult<()> {
            Ok::<_, BoxError>(Resolution::Skip)
        }
    }

    #[tokio::test]
    async fn runs_inner_handler() {
        let handler = TracingHandler::new(Skipper, "skipper").clone();
        let root = Route::<()>::root(vec![RouteDescriptor::new("/a").component("a")]).unwrap();
        let ctx = Context::new("/a", root.get_routes()[0].clone());
        let commands = ctx.commands();

        let resolution = handler.call(ctx, commands).await.unwrap();
        assert!(matches!(resolution, Resolution::Skip));
    }
}
