//! # Command Objects
//!
//! Handlers and lifecycle hooks steer resolution by returning commands
//! instead of views. A [`Commands`] value is handed to every handler and
//! hook; it stamps each command with the pathname and parameters of the
//! step that issued it.
//!
//! ```rust
//! use waymark_core::{Commands, Params, Resolution};
//!
//! let commands = Commands::new("/old/7", Params::new().with("id", "7"));
//! let resolution: Resolution<()> = commands.redirect("/new/:id").into();
//! assert!(resolution.is_accepted());
//! ```

use crate::error::BoxError;
use crate::params::Params;

/// Result type returned by route handlers.
pub type HandlerResult<V> = Result<Resolution<V>, BoxError>;

/// Re-run resolution against another path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectCommand {
    /// Target pattern; expanded with [`RedirectCommand::params`].
    pub pathname: String,
    /// Pathname that issued the redirect.
    pub from: String,
    /// Parameters of the issuing step.
    pub params: Params,
}

/// Cancel the navigation in progress.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PreventCommand;

/// Instantiate the view registered under a component key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentCommand {
    /// Component key.
    pub component: String,
}

/// Any command a handler can return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// See [`RedirectCommand`].
    Redirect(RedirectCommand),
    /// See [`PreventCommand`].
    Prevent,
    /// See [`ComponentCommand`].
    Component(ComponentCommand),
}

/// Outcome of a single route handler.
#[derive(Debug)]
pub enum Resolution<V> {
    /// Not handled here; continue with this route's children.
    Pass,
    /// Not handled here; skip this route's subtree entirely.
    Skip,
    /// Accepted with a view.
    View(V),
    /// Accepted with a command.
    Command(Command),
}

impl<V> Resolution<V> {
    /// Returns `true` if this resolution stops the search.
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::View(_) | Self::Command(_))
    }
}

impl<V> From<Command> for Resolution<V> {
    fn from(command: Command) -> Self {
        Self::Command(command)
    }
}

impl<V> From<RedirectCommand> for Resolution<V> {
    fn from(command: RedirectCommand) -> Self {
        Self::Command(Command::Redirect(command))
    }
}

impl<V> From<PreventCommand> for Resolution<V> {
    fn from(_: PreventCommand) -> Self {
        Self::Command(Command::Prevent)
    }
}

impl<V> From<ComponentCommand> for Resolution<V> {
    fn from(command: ComponentCommand) -> Self {
        Self::Command(Command::Component(command))
    }
}

/// Factory for commands, bound to the step that issues them.
#[derive(Debug, Clone, Default)]
pub struct Commands {
    from: String,
    params: Params,
}

impl Commands {
    /// Creates a factory for a step at `from` with `params`.
    pub fn new(from: impl Into<String>, params: Params) -> Self {
        Self {
            from: from.into(),
            params,
        }
    }

    /// Redirects to `pathname`, a pattern filled with the current parameters.
    pub fn redirect(&self, pathname: impl Into<String>) -> RedirectCommand {
        RedirectCommand {
            pathname: pathname.into(),
            from: self.from.clone(),
            params: self.params.clone(),
        }
    }

    /// Cancels the navigation.
    pub fn prevent(&self) -> PreventCommand {
        PreventCommand
    }

    /// Requests the view registered under `component`.
    pub fn component(&self, component: impl Into<String>) -> ComponentCommand {
        ComponentCommand {
            component: component.into(),
        }
    }
}
