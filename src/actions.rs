//! Actions: what a matched rule does.
//!
//! An [`Action`] is built once, at parse time, from a `(token, parameters)`
//! pair and then shared by every evaluation of the chain it belongs to. It
//! must therefore be immutable: everything that varies per message lives in
//! the [`FilterContext`], and everything environmental (points, tags, message
//! templates, the console) is reached through [`Services`] at execution time.
//!
//! ## Groups
//!
//! Tokens are registered in groups so deployments can pick a vocabulary:
//!
//! - `common.rs`: text edits and chain control (`replace`, `deny`, `abort`,
//!   `points`, ...). Work on any author.
//! - `targeted.rs`: enforcement through the author's capabilities (`warn`,
//!   `kick`, `kill`, `fine`, `cmd`).
//! - host groups: anything registered by the embedding application. A later
//!   registration of the same token wins.

#[path = "actions/common.rs"]
mod common;
#[path = "actions/registry.rs"]
mod registry;
#[path = "actions/targeted.rs"]
mod targeted;

use crate::api::Services;
use crate::context::FilterContext;
use crate::error::{ActionError, ActionResult};
use std::fmt;

pub use registry::{ActionBuilder, ActionGroup, ActionRegistry};

/// A named, parameterized behavior invoked when a rule matches.
pub trait Action: Send + Sync + fmt::Debug {
    fn execute(&self, ctx: &mut FilterContext, services: &Services) -> ActionResult;
}

/// How an isolated action run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ActionStatus {
    Done,
    Unsupported,
    Failed,
}

/// Run one action, containing any error it reports.
///
/// A broken or unsupported action must not stop the actions and rules after
/// it, so errors end here: unsupported capabilities at `debug`, real
/// failures at `warn`.
pub(crate) fn run_isolated(action: &dyn Action, ctx: &mut FilterContext, services: &Services) -> ActionStatus {
    match action.execute(ctx, services) {
        Ok(()) => ActionStatus::Done,
        Err(err) if err.is_unsupported() => {
            tracing::debug!(action = ?action, author = %ctx.author().name(), "{err}");
            ActionStatus::Unsupported
        }
        Err(err) => {
            tracing::warn!(
                action = ?action,
                author = %ctx.author().name(),
                chain = ctx.chain_name().unwrap_or("-"),
                error = %err,
                "action failed, continuing"
            );
            ActionStatus::Failed
        }
    }
}

/// Split `"<amount> <rest>"`, requiring a finite number up front.
pub(crate) fn split_amount(params: &str) -> Result<(f64, &str), ActionError> {
    let params = params.trim();
    let (head, rest) = params.split_once(char::is_whitespace).unwrap_or((params, ""));
    let amount: f64 =
        head.parse().map_err(|_| ActionError::InvalidParameter(format!("expected a number, found '{head}'")))?;
    if !amount.is_finite() {
        return Err(ActionError::InvalidParameter(format!("'{head}' is not a finite number")));
    }
    Ok((amount, rest.trim()))
}
