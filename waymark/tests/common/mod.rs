#![allow(dead_code)]

use waymark::testing::{Journal, StaticViewFactory, TestView};
use waymark::{
    BoxError, Context, HandlerResult, Outcome, Resolution, Resolved, Resolver, RouteDescriptor,
};

// ============================================================================
// Handlers
// ============================================================================

pub fn text(value: impl Into<String>) -> HandlerResult<String> {
    Ok(Resolution::View(value.into()))
}

pub fn pass() -> HandlerResult<String> {
    Ok(Resolution::Pass)
}

/// Renders the pattern of the route it is attached to.
pub async fn echo_route(context: Context<String>, _: waymark::Commands) -> HandlerResult<String> {
    text(context.route.path())
}

/// Renders the `id` parameter.
pub async fn echo_id(context: Context<String>, _: waymark::Commands) -> HandlerResult<String> {
    text(context.params.get_str("id").unwrap_or_default())
}

/// Renders component keys as `<key>`.
pub fn tag_factory(component: &str, _: &Context<String>) -> Result<String, BoxError> {
    Ok(format!("<{component}>"))
}

// ============================================================================
// Fixtures
// ============================================================================

pub fn string_resolver(routes: Vec<RouteDescriptor<String>>) -> Resolver<String> {
    Resolver::builder()
        .routes(routes)
        .view_factory(tag_factory)
        .build()
        .expect("routes are valid")
}

pub fn view_resolver(
    routes: Vec<RouteDescriptor<TestView>>,
    journal: &Journal,
) -> Resolver<TestView> {
    Resolver::builder()
        .routes(routes)
        .view_factory(StaticViewFactory::new(journal))
        .build()
        .expect("routes are valid")
}

pub fn view_of(resolved: &Resolved<String>) -> &str {
    match resolved.outcome() {
        Outcome::View(view) => view,
        other => panic!("expected a view, got {other:?}"),
    }
}

pub async fn resolve_text(resolver: &Resolver<String>, path: &str) -> String {
    let resolved = resolver.resolve(path).await.expect("path resolves");
    view_of(&resolved).to_string()
}
