#![cfg(feature = "timeout")]

mod common;

use common::{resolve_text, string_resolver, text};
use std::time::Duration;
use waymark::hooks::{TimeoutError, TimeoutHandler};
use waymark::{Commands, Context, HandlerResult, RouteDescriptor};

async fn slow(_: Context<String>, _: Commands) -> HandlerResult<String> {
    tokio::time::sleep(Duration::from_millis(50)).await;
    text("slow")
}

async fn quick(_: Context<String>, _: Commands) -> HandlerResult<String> {
    text("quick")
}

#[tokio::test]
async fn deadline_failures_surface_as_handler_errors() {
    let resolver = string_resolver(vec![
        RouteDescriptor::new("/slow").handler_with(TimeoutHandler::millis(slow, 10)),
        RouteDescriptor::new("/quick").handler_with(TimeoutHandler::millis(quick, 1_000)),
    ]);

    let err = resolver.resolve("/slow").await.unwrap_err();
    assert_eq!(err.code(), 500);
    let source = std::error::Error::source(&err).expect("handler error has a source");
    let timeout = source.downcast_ref::<TimeoutError>().expect("source is a timeout");
    assert_eq!(timeout.duration(), Duration::from_millis(10));

    assert_eq!(resolve_text(&resolver, "/quick").await, "quick");
}
