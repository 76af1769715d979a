//! Text edits and chain control. These work for every author.

use super::registry::{ActionGroup, ActionRegistry};
use super::{Action, split_amount};
use crate::api::Services;
use crate::context::FilterContext;
use crate::error::{ActionError, ActionResult};
use crate::message::ColoredString;
use std::sync::Arc;

pub(super) fn register(registry: &mut ActionRegistry) {
    let group = ActionGroup::Core;
    registry.register(group.clone(), "replace", |p| Ok(Arc::new(Replace { text: p.to_string() })));
    registry.register(group.clone(), "rewrite", |p| Ok(Arc::new(Rewrite { text: p.to_string() })));
    registry.register(group.clone(), "upper", |_| Ok(Arc::new(ChangeCase { upper: true })));
    registry.register(group.clone(), "lower", |_| Ok(Arc::new(ChangeCase { upper: false })));
    registry.register(group.clone(), "deny", |_| Ok(Arc::new(Deny)));
    registry.register(group.clone(), "abort", |_| Ok(Arc::new(Abort)));
    registry.register(group.clone(), "log", |_| Ok(Arc::new(Log)));
    registry.register(group.clone(), "console", |p| Ok(Arc::new(Console { message: required(p, "a message")? })));
    registry.register(group.clone(), "broadcast", |p| Ok(Arc::new(Broadcast { message: required(p, "a message")? })));
    registry.register(group.clone(), "notify", |p| {
        let (permission, message) = p.trim().split_once(char::is_whitespace).unwrap_or((p.trim(), ""));
        if permission.is_empty() || message.trim().is_empty() {
            return Err(ActionError::InvalidParameter("expected '<permission> <message>'".to_string()));
        }
        Ok(Arc::new(Notify { permission: permission.to_string(), message: message.trim().to_string() }))
    });
    registry.register(group, "points", |p| {
        let (amount, rest) = split_amount(p)?;
        if !rest.is_empty() {
            return Err(ActionError::InvalidParameter(format!("unexpected text after amount: '{rest}'")));
        }
        Ok(Arc::new(Points { amount }))
    });
}

fn required(params: &str, what: &str) -> Result<String, ActionError> {
    let params = params.trim();
    if params.is_empty() {
        return Err(ActionError::InvalidParameter(format!("expected {what}")));
    }
    Ok(params.to_string())
}

/// Replace every match of the rule's pattern with `text`.
#[derive(Debug)]
struct Replace {
    text: String,
}

impl Action for Replace {
    fn execute(&self, ctx: &mut FilterContext, services: &Services) -> ActionResult {
        let Some(pattern) = ctx.pattern() else {
            return Ok(());
        };
        let with = services.tags().replace_tags(&self.text, ctx);
        ctx.modified_mut().replace_matches(&pattern, |_| with.clone());
        Ok(())
    }
}

/// Replace the whole message.
#[derive(Debug)]
struct Rewrite {
    text: String,
}

impl Action for Rewrite {
    fn execute(&self, ctx: &mut FilterContext, services: &Services) -> ActionResult {
        let text = services.tags().replace_tags(&self.text, ctx);
        ctx.set_modified(ColoredString::new(&text));
        Ok(())
    }
}

#[derive(Debug)]
struct ChangeCase {
    upper: bool,
}

impl Action for ChangeCase {
    fn execute(&self, ctx: &mut FilterContext, _services: &Services) -> ActionResult {
        let Some(pattern) = ctx.pattern() else {
            return Ok(());
        };
        let upper = self.upper;
        ctx.modified_mut().replace_matches(&pattern, |m| if upper { m.to_uppercase() } else { m.to_lowercase() });
        Ok(())
    }
}

#[derive(Debug)]
struct Deny;

impl Action for Deny {
    fn execute(&self, ctx: &mut FilterContext, _services: &Services) -> ActionResult {
        ctx.cancel();
        Ok(())
    }
}

#[derive(Debug)]
struct Abort;

impl Action for Abort {
    fn execute(&self, ctx: &mut FilterContext, _services: &Services) -> ActionResult {
        ctx.halt();
        Ok(())
    }
}

#[derive(Debug)]
struct Log;

impl Action for Log {
    fn execute(&self, ctx: &mut FilterContext, _services: &Services) -> ActionResult {
        ctx.set_logging();
        Ok(())
    }
}

#[derive(Debug)]
struct Console {
    message: String,
}

impl Action for Console {
    fn execute(&self, ctx: &mut FilterContext, services: &Services) -> ActionResult {
        services.sink().console(&services.tags().replace_tags(&self.message, ctx));
        Ok(())
    }
}

#[derive(Debug)]
struct Broadcast {
    message: String,
}

impl Action for Broadcast {
    fn execute(&self, ctx: &mut FilterContext, services: &Services) -> ActionResult {
        services.sink().broadcast(&services.tags().replace_tags(&self.message, ctx));
        Ok(())
    }
}

#[derive(Debug)]
struct Notify {
    permission: String,
    message: String,
}

impl Action for Notify {
    fn execute(&self, ctx: &mut FilterContext, services: &Services) -> ActionResult {
        services.sink().notify(&self.permission, &services.tags().replace_tags(&self.message, ctx));
        Ok(())
    }
}

/// Add (or, with a negative amount, remove) escalation points.
#[derive(Debug)]
struct Points {
    amount: f64,
}

impl Action for Points {
    fn execute(&self, ctx: &mut FilterContext, services: &Services) -> ActionResult {
        let points = services.points();
        if !points.is_enabled() {
            return Ok(());
        }
        let total = points.add_points(ctx, self.amount, services);
        ctx.add_log_message(format!("points {:+} for {} (now {:.2})", self.amount, ctx.author().name(), total));
        Ok(())
    }
}
