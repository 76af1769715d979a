//! Capability interfaces the host implements.
//!
//! The filter never talks to players, consoles or economies directly. It
//! holds an opaque [`MessageAuthor`] per message and a [`MessageSink`] for
//! server-wide output, and calls into them when an action fires. Every
//! targeted primitive defaults to [`CapabilityError::Unsupported`], so a host
//! only implements what its platform can actually do.

use crate::error::{CapabilityError, CapabilityResult};
use std::fmt;

/// Stable identity of a message author (a player UUID, `"console"`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AuthorId(String);

impl AuthorId {
    pub fn new(id: impl Into<String>) -> Self {
        AuthorId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AuthorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AuthorId {
    fn from(id: &str) -> Self {
        AuthorId(id.to_string())
    }
}

/// Whoever sent the message being filtered.
///
/// Implementations must be cheap to call and must not block: any identity
/// lookup is done by the caller before evaluation starts.
pub trait MessageAuthor: Send + Sync {
    fn id(&self) -> AuthorId;

    fn name(&self) -> String;

    fn has_permission(&self, _permission: &str) -> bool {
        false
    }

    /// Deliver a private message to the author.
    fn send_message(&self, _message: &str) -> CapabilityResult {
        Err(CapabilityError::Unsupported("message"))
    }

    /// Disconnect the author with a reason.
    fn kick(&self, _message: &str) -> CapabilityResult {
        Err(CapabilityError::Unsupported("kick"))
    }

    /// Apply lethal damage, showing `message`.
    fn kill(&self, _message: &str) -> CapabilityResult {
        Err(CapabilityError::Unsupported("kill"))
    }

    /// Withdraw `amount` of currency, showing `message`.
    fn fine(&self, _amount: f64, _message: &str) -> CapabilityResult {
        Err(CapabilityError::Unsupported("fine"))
    }

    /// Run `command` as if the author had typed it.
    fn execute_command(&self, _command: &str) -> CapabilityResult {
        Err(CapabilityError::Unsupported("command"))
    }
}

impl fmt::Debug for dyn MessageAuthor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageAuthor").field("id", &self.id()).field("name", &self.name()).finish()
    }
}

/// Server-wide message delivery.
pub trait MessageSink: Send + Sync {
    fn console(&self, message: &str);

    fn broadcast(&self, message: &str);

    /// Send to everyone holding `permission`.
    fn notify(&self, permission: &str, message: &str);
}

/// Sink that only writes to the `tracing` log. Used until a host installs
/// its own.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl MessageSink for LogSink {
    fn console(&self, message: &str) {
        tracing::info!(target: "chatwarden::console", "{message}");
    }

    fn broadcast(&self, message: &str) {
        tracing::info!(target: "chatwarden::broadcast", "{message}");
    }

    fn notify(&self, permission: &str, message: &str) {
        tracing::info!(target: "chatwarden::notify", permission, "{message}");
    }
}
