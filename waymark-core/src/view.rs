//! # Views and Lifecycle Hooks
//!
//! A view is whatever a route renders. Views take part in navigation through
//! four optional hooks, all defaulting to no-ops:
//!
//! | Hook               | Runs on                          | Can veto |
//! |--------------------|----------------------------------|----------|
//! | `on_before_leave`  | outgoing views, innermost first  | prevent  |
//! | `on_before_enter`  | incoming views, outermost first  | prevent, redirect |
//! | `on_after_enter`   | incoming views, after commit     | no       |
//! | `on_after_leave`   | outgoing views, after commit     | no       |
//!
//! A redirect returned from `on_before_leave` is ignored.

use crate::command::{Commands, PreventCommand, RedirectCommand};
use crate::error::BoxError;
use crate::location::Location;
use std::future::Future;

/// Verdict of a `before` lifecycle hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookResult {
    /// Let the navigation continue.
    Next,
    /// Cancel the navigation; the current location stays in place.
    Prevent,
    /// Start a new navigation towards another path.
    Redirect(RedirectCommand),
}

impl From<PreventCommand> for HookResult {
    fn from(_: PreventCommand) -> Self {
        Self::Prevent
    }
}

impl From<RedirectCommand> for HookResult {
    fn from(command: RedirectCommand) -> Self {
        Self::Redirect(command)
    }
}

/// A rendered route.
pub trait View: Send + Sync + Sized + 'static {
    /// Called before this view is removed. The location is the incoming one.
    fn on_before_leave(
        &self,
        _location: &Location<Self>,
        _commands: &Commands,
    ) -> impl Future<Output = Result<HookResult, BoxError>> + Send {
        async { Ok(HookResult::Next) }
    }

    /// Called before this view is attached. The location's `route` is the
    /// route this view renders.
    fn on_before_enter(
        &self,
        _location: &Location<Self>,
        _commands: &Commands,
    ) -> impl Future<Output = Result<HookResult, BoxError>> + Send {
        async { Ok(HookResult::Next) }
    }

    /// Called after the new location is committed.
    fn on_after_enter(&self, _location: &Location<Self>) -> impl Future<Output = ()> + Send {
        async {}
    }

    /// Called after this view was removed by a committed navigation.
    fn on_after_leave(&self, _location: &Location<Self>) -> impl Future<Output = ()> + Send {
        async {}
    }
}

impl View for () {}
