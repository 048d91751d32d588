mod common;

use common::view_resolver;
use futures::channel::oneshot;
use parking_lot::Mutex;
use std::sync::Arc;
use waymark::testing::{Journal, RecordingOutlet, StaticViewFactory, TestView};
use waymark::{BoxError, Navigation, Navigator, Resolution, Resolver, RouteDescriptor};

fn admin_routes() -> Vec<RouteDescriptor<TestView>> {
    vec![
        RouteDescriptor::new("/").component("home"),
        RouteDescriptor::new("/admin").children(vec![
            RouteDescriptor::new("/users").component("users"),
            RouteDescriptor::new("/settings").component("settings"),
        ]),
        RouteDescriptor::new("/legacy").redirect("/admin/users"),
    ]
}

#[tokio::test]
async fn lifecycle_runs_in_order() {
    let journal = Journal::new();
    let outlet = RecordingOutlet::new().with_journal(&journal);
    let navigator = Navigator::new(view_resolver(admin_routes(), &journal)).with_outlet(outlet.clone());

    navigator.navigate("/admin/users").await.unwrap();
    assert_eq!(
        journal.take(),
        vec!["before-enter:users", "commit:/admin/users", "after-enter:users"]
    );

    navigator.navigate("/admin/settings").await.unwrap();
    assert_eq!(
        journal.take(),
        vec![
            "before-leave:users",
            "before-enter:settings",
            "commit:/admin/settings",
            "after-enter:settings",
            "after-leave:users",
        ]
    );
    let record = outlet.last().unwrap();
    assert_eq!(record.routes, vec!["/admin", "/settings"]);
    assert_eq!((record.entering, record.leaving), (1, 1));
}

#[tokio::test]
async fn prevented_leave_keeps_pathname() {
    let journal = Journal::new();
    let factory = StaticViewFactory::new(&journal)
        .with_view("users", TestView::new("users", &journal).prevent_leave());
    let resolver = Resolver::builder()
        .routes(admin_routes())
        .view_factory(factory)
        .build()
        .unwrap();
    let navigator = Navigator::new(resolver);

    navigator.navigate("/admin/users").await.unwrap();
    let navigation = navigator.navigate("/").await.unwrap();

    assert!(matches!(navigation, Navigation::Prevented(_)));
    assert_eq!(navigator.location().pathname, "/admin/users");
}

#[tokio::test]
async fn prevented_enter_keeps_pathname() {
    let journal = Journal::new();
    let factory = StaticViewFactory::new(&journal)
        .with_view("settings", TestView::new("settings", &journal).prevent_enter());
    let resolver = Resolver::builder()
        .routes(admin_routes())
        .view_factory(factory)
        .build()
        .unwrap();
    let navigator = Navigator::new(resolver);

    navigator.navigate("/").await.unwrap();
    let navigation = navigator.navigate("/admin/settings").await.unwrap();

    assert_eq!(navigation.location().unwrap().pathname, "/");
    assert_eq!(navigator.location().pathname, "/");
}

#[tokio::test]
async fn redirect_routes_are_followed() {
    let journal = Journal::new();
    let navigator = Navigator::new(view_resolver(admin_routes(), &journal));

    let navigation = navigator.navigate("/legacy").await.unwrap();
    let location = navigation.location().unwrap();
    assert_eq!(location.pathname, "/admin/users");
    assert_eq!(location.redirect_from.as_deref(), Some("/legacy"));
    assert_eq!(location.matched_pattern(), "/admin/users");
}

#[tokio::test]
async fn last_navigation_wins() {
    let journal = Journal::new();
    let (release, gate) = oneshot::channel::<()>();
    let gate = Arc::new(Mutex::new(Some(gate)));
    let slow = journal.clone();
    let resolver = Resolver::builder()
        .route(RouteDescriptor::<TestView>::new("/slow").handler(move |_, _| {
            let gate = gate.lock().take();
            let view = TestView::new("slow", &slow);
            async move {
                if let Some(gate) = gate {
                    let _ = gate.await;
                }
                Ok::<_, BoxError>(Resolution::View(view))
            }
        }))
        .routes(admin_routes())
        .view_factory(StaticViewFactory::new(&journal))
        .build()
        .unwrap();
    let outlet = RecordingOutlet::new();
    let navigator = Navigator::new(resolver).with_outlet(outlet.clone());

    let (first, second) = futures::join!(navigator.navigate("/slow"), async {
        let second = navigator.navigate("/admin/users").await;
        let _ = release.send(());
        second
    });

    assert!(matches!(first.unwrap(), Navigation::Superseded));
    assert!(second.unwrap().is_committed());
    assert_eq!(navigator.location().pathname, "/admin/users");
    assert_eq!(outlet.records().len(), 1);
    assert!(!journal.entries().iter().any(|entry| entry.ends_with(":slow")));
}

#[tokio::test]
async fn base_url_applies_to_navigation() {
    let journal = Journal::new();
    let resolver = Resolver::builder()
        .routes(admin_routes())
        .view_factory(StaticViewFactory::new(&journal))
        .base_url("/app/")
        .build()
        .unwrap();
    let navigator = Navigator::new(resolver);

    let navigation = navigator.navigate("/app/admin/users").await.unwrap();
    assert!(navigation.is_committed());
    assert_eq!(navigator.location().base_url, "/app/");

    let err = navigator.navigate("/admin/users").await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(navigator.location().pathname, "/app/admin/users");
}
