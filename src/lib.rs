//! Rule-chain message filtering with point-based escalation.
//!
//! A chain is compiled once from rule source text and then evaluated against
//! every incoming message. Each rule pairs a pattern with an ordered list of
//! actions; matching rules mutate a per-message [`FilterContext`], and some
//! actions feed an author's decaying point score, which fires threshold
//! actions as the score rises and falls.
//!
//! ```text
//! rule source ── parse_chain ──▶ RuleChain (immutable, shared)
//!                                  │
//! text + author ─▶ FilterContext ──┼─ execute (engine)
//!                                  │    └─ actions ─▶ PointManager ─▶ thresholds
//!                                  ▼
//!                            FilterOutcome
//! ```

extern crate self as chatwarden;

#[macro_use]
mod macros;
mod actions;
mod api;
mod author;
mod config;
mod context;
mod engine;
mod error;
mod message;
mod points;
mod tags;

#[cfg(test)]
mod testing;

pub use actions::{Action, ActionBuilder, ActionGroup, ActionRegistry};
pub use api::{
    COLOR_PERMISSION, FilterKind, FilterOutcome, FilterService, FilterServiceBuilder, MUTE_BYPASS_PERMISSION,
    MessageTemplates, SPAM_BYPASS_PERMISSION, Services, ServicesBuilder,
};
pub use author::{AuthorId, LogSink, MessageAuthor, MessageSink};
pub use config::{CommandConfig, FilterConfig, FilterToggles, LeakConfig, PointsConfig, ThresholdConfig};
pub use context::{ContextFlags, FilterContext};
pub use engine::{ActionInvocation, EvalMetrics, Matcher, Rule, RuleChain, execute, parse_chain, parse_lines};
pub use error::{
    ActionError, ActionResult, CapabilityError, CapabilityResult, ConfigError, FilterError, ParseError, ParseResult,
};
pub use message::{COLOR_CHAR, ColoredString};
pub use points::{LeakRate, PointManager, Threshold, Thresholds};
pub use tags::{TagFn, TagResolver};
