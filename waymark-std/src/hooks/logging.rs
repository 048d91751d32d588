//! Logging Handler - Observability for individual routes.

#[cfg(feature = "tracing")]
use super::outcome_label;
use waymark_core::{Commands, Context, HandlerResult, RouteHandler};

/// A handler wrapper that logs each invocation of the inner handler.
///
/// Logs the matched route, the consumed path and how the handler decided.
/// It uses `tracing` when the feature is enabled and is a plain
/// pass-through otherwise.
///
/// # Example
///
/// ```rust
/// use waymark_core::{Commands, Context, HandlerResult, Resolution, RouteDescriptor};
/// use waymark_std::hooks::LoggingHandler;
///
/// async fn users(_: Context<()>, _: Commands) -> HandlerResult<()> {
///     Ok(Resolution::Pass)
/// }
///
/// let route = RouteDescriptor::new("/users").handler_with(LoggingHandler::named(users, "users"));
/// ```
pub struct LoggingHandler<H> {
    inner: H,
    name: &'static str,
}

impl<H> LoggingHandler<H> {
    /// Wraps `inner` with the default name.
    pub fn new(inner: H) -> Self {
        Self {
            inner,
            name: "route",
        }
    }

    /// Wraps `inner`; `name` identifies the handler in log records.
    pub fn named(inner: H, name: &'static str) -> Self {
        Self { inner, name }
    }

    /// The name used in log records.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The wrapped handler.
    pub fn inner(&self) -> &H {
        &self.inner
    }
}

impl<V, H> RouteHandler<V> for LoggingHandler<H>
where
    V: 'static,
    H: RouteHandler<V>,
{
    async fn call(&self, context: Context<V>, commands: Commands) -> HandlerResult<V> {
        #[cfg(feature = "tracing")]
        tracing::debug!(
            name = %self.name,
            route = %context.route.path(),
            path = %context.path,
            "invoking route handler"
        );

        let result = self.inner.call(context, commands).await;

        #[cfg(feature = "tracing")]
        match &result {
            Ok(resolution) => {
                tracing::debug!(name = %self.name, outcome = outcome_label(resolution), "route handler returned")
            }
            Err(err) => tracing::warn!(name = %self.name, error = %err, "route handler failed"),
        }

        result
    }
}
