//! Token → action constructor table.

use super::{Action, common, targeted};
use crate::error::ActionError;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Builds an action from its parameter string.
///
/// Builders must be pure: the same parameters always produce an equivalent
/// action, which is what makes caching the result in a compiled chain safe.
pub type ActionBuilder = Box<dyn Fn(&str) -> Result<Arc<dyn Action>, ActionError> + Send + Sync>;

/// Capability domain a token was registered under.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ActionGroup {
    Core,
    Targeted,
    Host(String),
}

struct Entry {
    group: ActionGroup,
    builder: ActionBuilder,
}

#[derive(Default)]
pub struct ActionRegistry {
    entries: HashMap<String, Entry>,
}

impl ActionRegistry {
    /// A registry with no tokens.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the core and targeted groups installed.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        common::register(&mut registry);
        targeted::register(&mut registry);
        registry
    }

    /// Register `token` under `group`. Tokens are case-insensitive.
    ///
    /// Re-registering an existing token replaces its builder; the group it
    /// previously belonged to is returned.
    pub fn register<F>(&mut self, group: ActionGroup, token: &str, builder: F) -> Option<ActionGroup>
    where
        F: Fn(&str) -> Result<Arc<dyn Action>, ActionError> + Send + Sync + 'static,
    {
        let token = token.to_ascii_lowercase();
        let previous = self.entries.insert(token.clone(), Entry { group: group.clone(), builder: Box::new(builder) });
        if let Some(previous) = &previous {
            tracing::debug!(token, from = ?previous.group, to = ?group, "action token overridden");
        }
        previous.map(|e| e.group)
    }

    /// Build the action for `token` with `params`.
    pub fn construct(&self, token: &str, params: &str) -> Result<Arc<dyn Action>, ActionError> {
        let entry =
            self.entries.get(&token.to_ascii_lowercase()).ok_or_else(|| ActionError::UnknownToken(token.to_string()))?;
        (entry.builder)(params)
    }

    /// Build from a single `"<token> <params>"` string, as used by threshold
    /// configuration.
    pub fn construct_line(&self, line: &str) -> Result<Arc<dyn Action>, ActionError> {
        let line = line.trim();
        let (token, params) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        self.construct(token, params.trim())
    }

    pub fn contains(&self, token: &str) -> bool {
        self.entries.contains_key(&token.to_ascii_lowercase())
    }

    pub fn group_of(&self, token: &str) -> Option<&ActionGroup> {
        self.entries.get(&token.to_ascii_lowercase()).map(|e| &e.group)
    }

    /// Tokens registered under `group`, sorted.
    pub fn tokens(&self, group: &ActionGroup) -> Vec<&str> {
        let mut tokens: Vec<&str> =
            self.entries.iter().filter(|(_, e)| &e.group == group).map(|(t, _)| t.as_str()).collect();
        tokens.sort_unstable();
        tokens
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tokens: Vec<&String> = self.entries.keys().collect();
        tokens.sort_unstable();
        f.debug_struct("ActionRegistry").field("tokens", &tokens).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Services;
    use crate::context::FilterContext;
    use crate::error::ActionResult;

    #[derive(Debug)]
    struct Marker(&'static str);

    impl Action for Marker {
        fn execute(&self, ctx: &mut FilterContext, _services: &Services) -> ActionResult {
            ctx.add_log_message(self.0);
            Ok(())
        }
    }

    #[test]
    fn defaults_cover_both_groups() {
        let registry = ActionRegistry::with_defaults();
        assert_eq!(
            registry.tokens(&ActionGroup::Core),
            vec!["abort", "broadcast", "console", "deny", "log", "lower", "notify", "points", "replace", "rewrite", "upper"]
        );
        assert_eq!(registry.tokens(&ActionGroup::Targeted), vec!["cmd", "fine", "kick", "kill", "warn"]);
    }

    #[test]
    fn unknown_token_is_an_error() {
        let registry = ActionRegistry::with_defaults();
        assert_eq!(registry.construct("explode", "").unwrap_err(), ActionError::UnknownToken("explode".to_string()));
    }

    #[test]
    fn tokens_are_case_insensitive() {
        let registry = ActionRegistry::with_defaults();
        assert!(registry.construct("DENY", "").is_ok());
        assert!(registry.contains("Replace"));
    }

    #[test]
    fn last_registration_wins() {
        let mut registry = ActionRegistry::with_defaults();
        let previous = registry.register(ActionGroup::Host("proxy".into()), "kick", |_| Ok(Arc::new(Marker("host"))));
        assert_eq!(previous, Some(ActionGroup::Targeted));
        assert_eq!(registry.group_of("kick"), Some(&ActionGroup::Host("proxy".into())));

        let action = registry.construct("kick", "bye").unwrap();
        assert_eq!(format!("{action:?}"), "Marker(\"host\")");
    }

    #[test]
    fn construct_line_splits_token_and_params() {
        let registry = ActionRegistry::with_defaults();
        assert!(registry.construct_line("warn  Careful now ").is_ok());
        assert!(matches!(registry.construct_line("points many"), Err(ActionError::InvalidParameter(_))));
    }
}
