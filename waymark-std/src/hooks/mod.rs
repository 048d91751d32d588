//! Wrappers that add behaviour around a single route handler.
//!
//! Each wrapper is itself a [`RouteHandler`](waymark_core::RouteHandler) and
//! can be passed to
//! [`RouteDescriptor::handler_with`](waymark_core::RouteDescriptor::handler_with).

pub mod logging;
#[cfg(feature = "timeout")]
pub mod timeout;
pub mod tracing;

pub use logging::LoggingHandler;
#[cfg(feature = "timeout")]
pub use timeout::{TimeoutError, TimeoutHandler};
pub use self::tracing::TracingHandler;

#[cfg(feature = "tracing")]
use waymark_core::Resolution;

/// Short label of a resolution, used in log fields.
#[cfg(feature = "tracing")]
pub(crate) fn outcome_label<V>(resolution: &Resolution<V>) -> &'static str {
    match resolution {
        Resolution::Pass => "pass",
        Resolution::Skip => "skip",
        Resolution::View(_) => "view",
        Resolution::Command(_) => "command",
    }
}
