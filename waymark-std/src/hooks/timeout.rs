//! Timeout Handler - Time-limited route handlers.
//!
//! **Note**: This module requires the `tokio` runtime (feature `timeout`).

use std::time::Duration;
use thiserror::Error;
use waymark_core::{BoxError, Commands, Context, HandlerResult, RouteHandler};

/// A handler wrapper that fails when the inner handler takes too long.
///
/// The failure surfaces from resolution as a handler error (code 500)
/// whose source is a [`TimeoutError`].
///
/// # Example
///
/// ```rust,ignore
/// use std::time::Duration;
/// use waymark_std::hooks::TimeoutHandler;
///
/// let route = RouteDescriptor::new("/report")
///     .handler_with(TimeoutHandler::new(SlowReport, Duration::from_secs(5)));
/// ```
pub struct TimeoutHandler<H> {
    inner: H,
    duration: Duration,
}

impl<H> TimeoutHandler<H> {
    /// Wraps `inner` with a deadline of `duration`.
    pub fn new(inner: H, duration: Duration) -> Self {
        Self { inner, duration }
    }

    /// Wraps `inner` with a deadline in milliseconds.
    pub fn millis(inner: H, millis: u64) -> Self {
        Self::new(inner, Duration::from_millis(millis))
    }

    /// The configured deadline.
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// The wrapped handler.
    pub fn inner(&self) -> &H {
        &self.inner
    }
}

/// Error returned when a handler exceeds its deadline.
#[derive(Debug, Clone, Error)]
#[error("route handler timed out after {duration:?}")]
pub struct TimeoutError {
    duration: Duration,
}

impl TimeoutError {
    /// Creates a timeout error for `duration`.
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }

    /// The deadline that was exceeded.
    pub fn duration(&self) -> Duration {
        self.duration
    }
}

impl<V, H> RouteHandler<V> for TimeoutHandler<H>
where
    V: 'static,
    H: RouteHandler<V>,
{
    async fn call(&self, context: Context<V>, commands: Commands) -> HandlerResult<V> {
        match tokio::time::timeout(self.duration, self.inner.call(context, commands)).await {
            Ok(result) => result,
            Err(_) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(duration = ?self.duration, "route handler timed out");
                Err(Box::new(TimeoutError::new(self.duration)) as BoxError)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use waymark_core::{Resolution, Route, RouteDescriptor};

    struct Sleepy(Duration);

    impl RouteHandler<()> for Sleepy {
        async fn call(&self, _context: Context<()>, _commands: Commands) -> HandlerResult<()> {
            tokio::time::sleep(self.0).await;
            Ok(Resolution::View(()))
        }
    }

    fn context() -> Context<()> {
        let root = Route::<()>::root(vec![RouteDescriptor::new("/a").component("a")]).unwrap();
        Context::new("/a", root.get_routes()[0].clone())
    }

    #[test]
    fn error_display() {
        let error = TimeoutError::new(Duration::from_millis(10));
        assert!(error.to_string().contains("10ms"));
        assert_eq!(error.duration(), Duration::from_millis(10));
    }

    #[tokio::test]
    async fn slow_handlers_fail() {
        let handler = TimeoutHandler::millis(Sleepy(Duration::from_millis(50)), 10);
        let ctx = context();
        let commands = ctx.commands();

        let err = handler.call(ctx, commands).await.unwrap_err();
        assert!(err.downcast_ref::<TimeoutError>().is_some());
    }

    #[tokio::test]
    async fn fast_handlers_pass() {
        let handler = TimeoutHandler::millis(Sleepy(Duration::ZERO), 100);
        assert_eq!(handler.duration(), Duration::from_millis(100));
        let ctx = context();
        let commands = ctx.commands();

        assert!(matches!(
            handler.call(ctx, commands).await.unwrap(),
            Resolution::View(())
        ));
    }
}
