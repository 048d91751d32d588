//! Testing utilities for Waymark.
//!
//! This module provides doubles that make navigation tests easy to write.
//!
//! # Features
//!
//! - [`Journal`]: A shared, ordered log of events
//! - [`TestView`]: A view with scripted lifecycle verdicts that journals every hook
//! - [`StaticViewFactory`]: A view factory creating [`TestView`]s from component keys
//! - [`RecordingOutlet`]: An outlet that records every commit

use crate::navigator::{Outlet, OutletUpdate};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use waymark_core::{
    BoxError, Commands, Context, HookResult, Location, Params, View, ViewFactory,
};

// ============================================================================
// Journal
// ============================================================================

/// A shared, ordered event log. Clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct Journal {
    entries: Arc<Mutex<Vec<String>>>,
}

impl Journal {
    /// Creates an empty journal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry.
    pub fn record(&self, entry: impl Into<String>) {
        self.entries.lock().push(entry.into());
    }

    /// All entries in recording order.
    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().clone()
    }

    /// Removes and returns all entries.
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.entries.lock())
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns `true` if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

// ============================================================================
// Test View
// ============================================================================

/// Scripted answer of a [`TestView`] `before` hook.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Verdict {
    /// Continue.
    #[default]
    Next,
    /// Prevent the navigation.
    Prevent,
    /// Redirect to the given pattern, filled with the location parameters.
    Redirect(String),
}

impl Verdict {
    fn apply(&self, commands: &Commands) -> HookResult {
        match self {
            Self::Next => HookResult::Next,
            Self::Prevent => commands.prevent().into(),
            Self::Redirect(target) => commands.redirect(target.clone()).into(),
        }
    }
}

/// A view that records its lifecycle hooks into a [`Journal`].
///
/// Hooks are journaled as `"<hook>:<name>"`, for example
/// `"before-enter:user"`.
#[derive(Debug, Clone)]
pub struct TestView {
    name: String,
    params: Params,
    journal: Journal,
    leave: Verdict,
    enter: Verdict,
}

impl TestView {
    /// Creates a view named `name` writing to `journal`.
    pub fn new(name: impl Into<String>, journal: &Journal) -> Self {
        Self {
            name: name.into(),
            params: Params::new(),
            journal: journal.clone(),
            leave: Verdict::Next,
            enter: Verdict::Next,
        }
    }

    /// Makes `on_before_leave` prevent the navigation.
    pub fn prevent_leave(mut self) -> Self {
        self.leave = Verdict::Prevent;
        self
    }

    /// Makes `on_before_enter` prevent the navigation.
    pub fn prevent_enter(mut self) -> Self {
        self.enter = Verdict::Prevent;
        self
    }

    /// Makes `on_before_enter` redirect to `target`.
    pub fn redirect_on_enter(mut self, target: impl Into<String>) -> Self {
        self.enter = Verdict::Redirect(target.into());
        self
    }

    /// Sets the parameters the view was created with.
    pub fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    /// The view name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parameters handed to the view when it was created.
    pub fn params(&self) -> &Params {
        &self.params
    }

    fn record(&self, hook: &str) {
        self.journal.record(format!("{hook}:{}", self.name));
    }
}

impl PartialEq for TestView {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.params == other.params
    }
}

impl View for TestView {
    async fn on_before_leave(
        &self,
        _location: &Location<Self>,
        commands: &Commands,
    ) -> Result<HookResult, BoxError> {
        self.record("before-leave");
        Ok(self.leave.apply(commands))
    }

    async fn on_before_enter(
        &self,
        _location: &Location<Self>,
        commands: &Commands,
    ) -> Result<HookResult, BoxError> {
        self.record("before-enter");
        Ok(self.enter.apply(commands))
    }

    async fn on_after_enter(&self, _location: &Location<Self>) {
        self.record("after-enter");
    }

    async fn on_after_leave(&self, _location: &Location<Self>) {
        self.record("after-leave");
    }
}

// ============================================================================
// View Factory
// ============================================================================

/// Creates [`TestView`]s from component keys.
///
/// Unknown keys produce a view named after the key; keys registered with
/// [`StaticViewFactory::with_view`] clone the registered template. Created
/// views receive the step parameters.
#[derive(Debug, Clone)]
pub struct StaticViewFactory {
    journal: Journal,
    templates: Arc<Mutex<HashMap<String, TestView>>>,
}

impl StaticViewFactory {
    /// Creates a factory whose views write to `journal`.
    pub fn new(journal: &Journal) -> Self {
        Self {
            journal: journal.clone(),
            templates: Arc::default(),
        }
    }

    /// Registers the template cloned for `component`.
    pub fn with_view(self, component: impl Into<String>, view: TestView) -> Self {
        self.templates.lock().insert(component.into(), view);
        self
    }
}

impl ViewFactory<TestView> for StaticViewFactory {
    fn create(&self, component: &str, context: &Context<TestView>) -> Result<TestView, BoxError> {
        let view = match self.templates.lock().get(component) {
            Some(template) => template.clone(),
            None => TestView::new(component, &self.journal),
        };
        Ok(view.with_params(context.params.clone()))
    }
}

// ============================================================================
// Recording Outlet
// ============================================================================

/// One commit seen by a [`RecordingOutlet`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutletRecord {
    /// Pathname of the committed location.
    pub pathname: String,
    /// Patterns of the committed chain, outermost first.
    pub routes: Vec<String>,
    /// Number of links whose view was mounted.
    pub entering: usize,
    /// Number of links whose view was unmounted.
    pub leaving: usize,
}

/// An outlet that records every commit and journals it as
/// `"commit:<pathname>"` when given a journal.
#[derive(Debug, Clone, Default)]
pub struct RecordingOutlet {
    records: Arc<Mutex<Vec<OutletRecord>>>,
    journal: Option<Journal>,
}

impl RecordingOutlet {
    /// Creates an outlet with an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Also journals commits into `journal`.
    pub fn with_journal(mut self, journal: &Journal) -> Self {
        self.journal = Some(journal.clone());
        self
    }

    /// All commits so far.
    pub fn records(&self) -> Vec<OutletRecord> {
        self.records.lock().clone()
    }

    /// The most recent commit.
    pub fn last(&self) -> Option<OutletRecord> {
        self.records.lock().last().cloned()
    }
}

impl<V> Outlet<V> for RecordingOutlet {
    fn commit(&self, update: OutletUpdate<'_, V>) {
        if let Some(journal) = &self.journal {
            journal.record(format!("commit:{}", update.location.pathname));
        }
        self.records.lock().push(OutletRecord {
            pathname: update.location.pathname.clone(),
            routes: update
                .views
                .iter()
                .map(|link| link.route.path().to_string())
                .collect(),
            entering: update.entering.len(),
            leaving: update.leaving.len(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use waymark_core::{Route, RouteDescriptor};

    #[test]
    fn journal_clones_share_entries() {
        let journal = Journal::new();
        let other = journal.clone();
        other.record("a");
        journal.record("b");
        assert_eq!(journal.entries(), vec!["a", "b"]);
        assert_eq!(other.take().len(), 2);
        assert!(journal.is_empty());
    }

    #[tokio::test]
    async fn test_view_scripts_verdicts() {
        let journal = Journal::new();
        let view = TestView::new("page", &journal).redirect_on_enter("/login");
        let commands = Commands::new("/page", Params::new());
        let location = Location::default();

        let enter = view.on_before_enter(&location, &commands).await.unwrap();
        assert!(matches!(enter, HookResult::Redirect(cmd) if cmd.pathname == "/login"));
        let leave = view.on_before_leave(&location, &commands).await.unwrap();
        assert_eq!(leave, HookResult::Next);
        assert_eq!(journal.entries(), vec!["before-enter:page", "before-leave:page"]);
    }

    #[test]
    fn factory_uses_templates_and_params() {
        let journal = Journal::new();
        let factory = StaticViewFactory::new(&journal)
            .with_view("guarded", TestView::new("guard", &journal).prevent_leave());
        let root = Route::<TestView>::root(vec![RouteDescriptor::new("/x").component("x")]).unwrap();
        let mut context = Context::new("/x", root.get_routes()[0].clone());
        context.params = Params::new().with("id", "3");

        let plain = factory.create("plain", &context).unwrap();
        assert_eq!(plain.name(), "plain");
        assert_eq!(plain.params().get_str("id"), Some("3"));
        assert_eq!(factory.create("guarded", &context).unwrap().name(), "guard");
    }
}
