//! Enforcement through the author's own capabilities.
//!
//! Each action resolves its message at execution time: an explicit parameter
//! if the rule gave one, otherwise the configured default template for that
//! action. Both pass through the tag resolver.

use super::registry::{ActionGroup, ActionRegistry};
use super::{Action, split_amount};
use crate::api::Services;
use crate::context::FilterContext;
use crate::error::{ActionError, ActionResult};
use std::sync::Arc;

pub(super) fn register(registry: &mut ActionRegistry) {
    let group = ActionGroup::Targeted;
    registry.register(group.clone(), "warn", |p| Ok(Arc::new(Targeted::new(Capability::Warn, p))));
    registry.register(group.clone(), "kick", |p| Ok(Arc::new(Targeted::new(Capability::Kick, p))));
    registry.register(group.clone(), "kill", |p| Ok(Arc::new(Targeted::new(Capability::Kill, p))));
    registry.register(group.clone(), "fine", |p| {
        let (amount, message) = split_amount(p)?;
        if amount < 0.0 {
            return Err(ActionError::InvalidParameter("fine amount must not be negative".to_string()));
        }
        Ok(Arc::new(Targeted::new(Capability::Fine(amount), message)))
    });
    registry.register(group, "cmd", |p| {
        let command = p.trim().trim_start_matches('/');
        if command.is_empty() {
            return Err(ActionError::InvalidParameter("expected a command".to_string()));
        }
        Ok(Arc::new(Command { command: command.to_string() }))
    });
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Capability {
    Warn,
    Kick,
    Kill,
    Fine(f64),
}

impl Capability {
    /// Key of the default message template.
    fn template_key(self) -> &'static str {
        match self {
            Capability::Warn => "warn",
            Capability::Kick => "kick",
            Capability::Kill => "kill",
            Capability::Fine(_) => "fine",
        }
    }
}

#[derive(Debug)]
struct Targeted {
    capability: Capability,
    /// `None` falls back to the template for `capability`.
    message: Option<String>,
}

impl Targeted {
    fn new(capability: Capability, params: &str) -> Self {
        let params = params.trim();
        Targeted { capability, message: (!params.is_empty()).then(|| params.to_string()) }
    }
}

impl Action for Targeted {
    fn execute(&self, ctx: &mut FilterContext, services: &Services) -> ActionResult {
        let template = match &self.message {
            Some(message) => message.clone(),
            None => services.template(self.capability.template_key()),
        };
        let message = services.tags().replace_tags(&template, ctx);
        let author = ctx.author().clone();

        match self.capability {
            Capability::Warn => author.send_message(&message)?,
            Capability::Kick => author.kick(&message)?,
            Capability::Kill => author.kill(&message)?,
            Capability::Fine(amount) => author.fine(amount, &message)?,
        }

        ctx.add_log_message(format!("{} {}: {}", self.capability.template_key(), author.name(), message));
        Ok(())
    }
}

/// Run a command as the author.
#[derive(Debug)]
struct Command {
    command: String,
}

impl Action for Command {
    fn execute(&self, ctx: &mut FilterContext, services: &Services) -> ActionResult {
        let command = services.tags().replace_tags(&self.command, ctx);
        ctx.author().execute_command(&command)?;
        ctx.add_log_message(format!("{} ran /{}", ctx.author().name(), command));
        Ok(())
    }
}
