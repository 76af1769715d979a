//! Chain evaluation.
//!
//! ```text
//! for rule in chain (source order):
//!     halted?            -> stop
//!     author exempt?     -> next rule
//!     matcher(current)?  -> run actions in order, each isolated
//! ```
//!
//! Matching always reads the *modified* message, so a rule sees the edits of
//! every rule before it. That is what lets a chain redact in stages.

use super::metrics::EvalMetrics;
use super::rule::RuleChain;
use crate::actions::{ActionStatus, run_isolated};
use crate::api::Services;
use crate::context::FilterContext;
use std::time::Instant;

/// Evaluate `chain` against `ctx`.
///
/// Never fails: outcomes are recorded on the context, and failing actions
/// are logged and skipped without affecting the rest of the chain.
pub fn execute(chain: &RuleChain, ctx: &mut FilterContext, services: &Services) -> EvalMetrics {
    let started = Instant::now();
    let mut metrics = EvalMetrics::default();
    ctx.enter_chain(chain.name());

    for rule in chain.rules() {
        if ctx.is_halted() {
            tracing::trace!(chain = chain.name(), line = rule.line(), "chain halted");
            break;
        }
        metrics.rules_evaluated += 1;

        if rule.is_exempt(ctx.author().as_ref()) {
            metrics.rules_exempted += 1;
            continue;
        }
        if !rule.matcher().matches(ctx.modified().plain()) {
            continue;
        }

        metrics.rules_matched += 1;
        tracing::debug!(chain = chain.name(), line = rule.line(), author = %ctx.author().name(), "rule matched");

        ctx.enter_rule(rule.line(), rule.matcher().shared_regex());
        for invocation in rule.actions() {
            metrics.actions_executed += 1;
            match run_isolated(invocation.action(), ctx, services) {
                ActionStatus::Done => {}
                ActionStatus::Unsupported => metrics.actions_unsupported += 1,
                ActionStatus::Failed => metrics.actions_failed += 1,
            }
        }
        ctx.leave_rule();
    }

    metrics.duration = started.elapsed();
    tracing::trace!(chain = chain.name(), ?metrics, "chain evaluated");
    metrics
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::{Action, ActionGroup, ActionRegistry};
    use crate::engine::parse_chain;
    use crate::error::{ActionError, ActionResult};
    use crate::testing::RecordingAuthor;
    use std::sync::Arc;

    #[derive(Debug)]
    struct Broken;

    impl Action for Broken {
        fn execute(&self, _ctx: &mut FilterContext, _services: &Services) -> ActionResult {
            Err(ActionError::Failed("backend unavailable".to_string()))
        }
    }

    /// Keeps the pattern handle every invocation sees.
    #[derive(Debug, Default)]
    struct SeenPatterns(parking_lot::Mutex<Vec<Arc<regex::Regex>>>);

    impl Action for SeenPatterns {
        fn execute(&self, ctx: &mut FilterContext, _services: &Services) -> ActionResult {
            self.0.lock().extend(ctx.pattern());
            Ok(())
        }
    }

    fn chain(source: &str) -> RuleChain {
        let mut registry = ActionRegistry::with_defaults();
        registry.register(ActionGroup::Host("test".into()), "broken", |_| Ok(Arc::new(Broken)));
        parse_chain("chat", source, &registry).unwrap()
    }

    fn evaluate(source: &str, text: &str) -> (FilterContext, EvalMetrics) {
        let mut ctx = FilterContext::new(text, RecordingAuthor::arc("steve"));
        let metrics = execute(&chain(source), &mut ctx, &Services::default());
        (ctx, metrics)
    }

    #[test]
    fn empty_chain_leaves_message_untouched() {
        let (ctx, metrics) = evaluate("# nothing here\n\n", "§cHello, world!");
        assert_eq!(ctx.modified().raw(), "§cHello, world!");
        assert!(!ctx.message_changed());
        assert_eq!(metrics.rules_evaluated, 0);
        assert_eq!(ctx.chain_name(), Some("chat"));
    }

    #[test]
    fn later_rules_see_earlier_edits() {
        let (ctx, metrics) = evaluate("/foo/ then replace bar\n/bar/ then deny\n", "foo fighters");
        assert_eq!(ctx.modified().plain(), "bar fighters");
        assert!(ctx.is_cancelled());
        assert_eq!(ctx.matched_lines(), [1, 2]);
        assert_eq!(metrics.rules_matched, 2);
    }

    #[test]
    fn rules_fire_in_source_order() {
        let (ctx, _) = evaluate("/a/ then replace b\n/b/ then replace c\n/c/ then replace d\n", "a");
        assert_eq!(ctx.modified().plain(), "d");

        let (ctx, _) = evaluate("/c/ then replace d\n/b/ then replace c\n/a/ then replace b\n", "a");
        assert_eq!(ctx.modified().plain(), "b");
    }

    #[test]
    fn abort_skips_remaining_rules() {
        let (ctx, metrics) = evaluate("/x/ then log then abort then replace y\n/./ then deny\n", "x");
        assert!(ctx.is_logging());
        assert!(ctx.is_halted());
        assert!(!ctx.is_cancelled());
        // The aborting rule still finishes its own actions.
        assert_eq!(ctx.modified().plain(), "y");
        assert_eq!(metrics.rules_evaluated, 1);
    }

    #[test]
    fn failing_action_does_not_stop_the_chain() {
        let (ctx, metrics) = evaluate("/x/ then broken then replace y\n/y/ then deny\n", "x");
        assert_eq!(ctx.modified().plain(), "y");
        assert!(ctx.is_cancelled());
        assert_eq!(metrics.actions_failed, 1);
        assert_eq!(metrics.actions_executed, 3);
    }

    #[test]
    fn unsupported_capability_is_counted_separately() {
        let mut ctx = FilterContext::new("x", Arc::new(RecordingAuthor::new("console").unsupported("kick")));
        let metrics = execute(&chain("/x/ then kick bye then deny\n"), &mut ctx, &Services::default());
        assert_eq!(metrics.actions_unsupported, 1);
        assert_eq!(metrics.actions_failed, 0);
        assert!(ctx.is_cancelled());
    }

    #[test]
    fn negated_rules_fire_on_non_matching_text() {
        let (ctx, _) = evaluate("!/^\\// then log\n", "hello");
        assert!(ctx.is_logging());
        let (ctx, _) = evaluate("!/^\\// then log\n", "/help");
        assert!(!ctx.is_logging());
    }

    #[test]
    fn case_insensitive_flag_applies() {
        let (ctx, _) = evaluate("/spam/i then replace ****\n", "This is SPAM.");
        assert_eq!(ctx.modified().plain(), "This is ****.");
        let (ctx, _) = evaluate("/spam/ then replace ****\n", "This is SPAM.");
        assert_eq!(ctx.modified().plain(), "This is SPAM.");
    }

    #[test]
    fn exempt_authors_skip_rule() {
        let rules = chain("/x/ then deny unless chat.trusted\n");
        let author = Arc::new(RecordingAuthor::new("mod").with_permission("chat.trusted"));
        let mut ctx = FilterContext::new("x", author);
        let metrics = execute(&rules, &mut ctx, &Services::default());
        assert!(!ctx.is_cancelled());
        assert_eq!(metrics.rules_exempted, 1);
    }

    #[test]
    fn matched_rule_without_actions_is_recorded() {
        let (ctx, metrics) = evaluate("/quiet/\n", "be quiet");
        assert_eq!(ctx.matched_lines(), [1]);
        assert_eq!(metrics.actions_executed, 0);
        assert!(!ctx.message_changed());
    }

    #[test]
    fn actions_share_the_compiled_pattern() {
        let seen = Arc::new(SeenPatterns::default());
        let mut registry = ActionRegistry::with_defaults();
        let action = seen.clone();
        registry.register(ActionGroup::Host("test".into()), "seen", move |_| Ok(action.clone() as Arc<dyn Action>));
        let rules = parse_chain("chat", "/x/ then seen then seen\n/y/ then seen\n", &registry).unwrap();

        let mut ctx = FilterContext::new("x y", RecordingAuthor::arc("steve"));
        execute(&rules, &mut ctx, &Services::default());

        let seen = seen.0.lock();
        assert_eq!(seen.len(), 3);
        assert!(Arc::ptr_eq(&seen[0], rules.rules()[0].matcher().shared_regex()));
        assert!(Arc::ptr_eq(&seen[1], &seen[0]));
        assert!(Arc::ptr_eq(&seen[2], rules.rules()[1].matcher().shared_regex()));
        assert!(ctx.pattern().is_none());
    }
}
