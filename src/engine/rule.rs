//! Compiled rule structures.
//!
//! ## Invariants
//!
//! - A `RuleChain` is never mutated after parsing. Reloading builds a new
//!   chain and swaps the `Arc` held by the service; evaluations already
//!   running keep the chain they started with.
//! - `Rule::line` is the first physical source line of the rule, even when
//!   the rule was joined from continuation lines.

use crate::actions::Action;
use crate::author::MessageAuthor;
use regex::Regex;
use std::fmt;
use std::sync::Arc;

/// Compiled match predicate of one rule.
#[derive(Debug, Clone)]
pub struct Matcher {
    regex: Arc<Regex>,
    negated: bool,
    case_insensitive: bool,
    source: String,
}

impl Matcher {
    pub(crate) fn new(regex: Regex, negated: bool, case_insensitive: bool, source: String) -> Self {
        Matcher { regex: Arc::new(regex), negated, case_insensitive, source }
    }

    /// Does the rule apply to `text`, honoring negation?
    pub fn matches(&self, text: &str) -> bool {
        self.regex.is_match(text) != self.negated
    }

    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    pub(crate) fn shared_regex(&self) -> &Arc<Regex> {
        &self.regex
    }

    pub fn is_negated(&self) -> bool {
        self.negated
    }

    pub fn is_case_insensitive(&self) -> bool {
        self.case_insensitive
    }

    /// Pattern as written in the source, without delimiters or flags.
    pub fn source(&self) -> &str {
        &self.source
    }
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bang = if self.negated { "!" } else { "" };
        let flags = if self.case_insensitive { "i" } else { "" };
        write!(f, "{bang}/{}/{flags}", self.source)
    }
}

/// A token and parameter string bound to the action built from them.
#[derive(Debug, Clone)]
pub struct ActionInvocation {
    token: String,
    params: String,
    action: Arc<dyn Action>,
}

impl ActionInvocation {
    pub(crate) fn new(token: String, params: String, action: Arc<dyn Action>) -> Self {
        ActionInvocation { token, params, action }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn params(&self) -> &str {
        &self.params
    }

    pub fn action(&self) -> &dyn Action {
        self.action.as_ref()
    }
}

/// One logical source line: a matcher and the actions it triggers.
#[derive(Debug, Clone)]
pub struct Rule {
    line: usize,
    matcher: Matcher,
    actions: Vec<ActionInvocation>,
    /// Authors holding any of these permissions skip the rule.
    exemptions: Vec<String>,
}

impl Rule {
    pub(crate) fn new(line: usize, matcher: Matcher, actions: Vec<ActionInvocation>, exemptions: Vec<String>) -> Self {
        Rule { line, matcher, actions, exemptions }
    }

    pub fn line(&self) -> usize {
        self.line
    }

    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    pub fn actions(&self) -> &[ActionInvocation] {
        &self.actions
    }

    pub fn exemptions(&self) -> &[String] {
        &self.exemptions
    }

    pub fn is_exempt(&self, author: &dyn MessageAuthor) -> bool {
        self.exemptions.iter().any(|p| author.has_permission(p))
    }
}

/// Named, ordered, immutable sequence of rules.
#[derive(Debug, Clone)]
pub struct RuleChain {
    name: String,
    rules: Vec<Rule>,
}

impl RuleChain {
    pub(crate) fn new(name: &str, rules: Vec<Rule>) -> Self {
        RuleChain { name: name.to_string(), rules }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
