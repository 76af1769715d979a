//! Rule compilation and evaluation engine.
//!
//! ## How the parts work together
//!
//! ```text
//! source lines ──┐
//!                │  parse_lines                  (parser.rs)
//!                │    - drop comments / blanks
//!                │    - join `\` continuations (keep first line number)
//!                │    - compile pattern, build every action via registry
//!                └───────────────┬──────────────
//!                                v
//!                       RuleChain (rule.rs)      immutable, Arc-shared
//!                                │
//! FilterContext ─────────────────┼─ execute       (executor.rs)
//!                                │    - match against the *current* text
//!                                │    - run actions in order, isolated
//!                                │    - stop on halt
//!                                v
//!                       EvalMetrics (metrics.rs)
//! ```
//!
//! Parsing is eager and all-or-nothing: every pattern is compiled and every
//! action token resolved before a chain exists, so evaluation never meets an
//! unknown token or a bad regex. Evaluation itself never fails; a failing
//! action is logged and skipped.
//!
//! ## Responsibilities by module
//!
//! - `rule.rs`: `RuleChain`, `Rule`, `Matcher`, `ActionInvocation`.
//! - `parser.rs`: the rule source grammar.
//! - `executor.rs`: evaluates a chain against one context.
//! - `metrics.rs`: counters and timing for one evaluation.

#[path = "engine/executor.rs"]
mod executor;
#[path = "engine/metrics.rs"]
mod metrics;
#[path = "engine/parser.rs"]
mod parser;
#[path = "engine/rule.rs"]
mod rule;

pub use executor::execute;
pub use metrics::EvalMetrics;
pub use parser::{parse_chain, parse_lines};
pub use rule::{ActionInvocation, Matcher, Rule, RuleChain};
