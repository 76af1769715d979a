//! TOML configuration.
//!
//! ```toml
//! rule_directory = "rules"
//! decolor = true
//! spam_filter = true
//!
//! [filters]
//! chat = true
//! command = true
//! console = false
//!
//! [commands]
//! as_chat = ["tell", "msg"]   # run through the chat chain, mute and spam filter
//! whitelist = []              # if non-empty, only these commands are filtered
//! blacklist = ["login"]       # never filtered
//! spam_filter = true
//!
//! [messages]
//! warn = "Watch your language, %player%."
//! kick = "You have been kicked for your language."
//!
//! [points]
//! enabled = true
//! leak = { points = 1.0, interval_secs = 30 }
//!
//! [[points.thresholds]]
//! name = "warning"
//! points = 10
//! ascending = ["warn You are at 10 points, slow down."]
//! descending = ["warn You are back under 10 points."]
//! ```
//!
//! Every field has a default, so an empty file is a valid configuration.
//! Values are checked by [`FilterConfig::validate`] at load time; action
//! lines in thresholds are checked when the service builds them, against the
//! registry in use.

use crate::error::{ConfigError, FilterError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Directory holding `<chain>.txt` rule files.
    pub rule_directory: PathBuf,
    /// Strip color codes from messages of authors without the color permission.
    pub decolor: bool,
    /// Cancel a chat message identical to the author's previous one.
    pub spam_filter: bool,
    pub filters: FilterToggles,
    pub commands: CommandConfig,
    /// Default messages for targeted actions, keyed by action token.
    pub messages: BTreeMap<String, String>,
    pub points: PointsConfig,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            rule_directory: PathBuf::from("rules"),
            decolor: false,
            spam_filter: false,
            filters: FilterToggles::default(),
            commands: CommandConfig::default(),
            messages: BTreeMap::new(),
            points: PointsConfig::default(),
        }
    }
}

/// Which message sources are filtered at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterToggles {
    pub chat: bool,
    pub command: bool,
    pub console: bool,
}

impl Default for FilterToggles {
    fn default() -> Self {
        Self { chat: true, command: false, console: false }
    }
}

/// How command messages are routed. Names are matched without the leading
/// `/`, ignoring ASCII case.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandConfig {
    /// Commands treated as chat, e.g. `tell`.
    pub as_chat: Vec<String>,
    pub whitelist: Vec<String>,
    pub blacklist: Vec<String>,
    /// Spam filter for the `as_chat` commands.
    pub spam_filter: bool,
}

impl CommandConfig {
    pub fn is_chat(&self, command: &str) -> bool {
        listed(&self.as_chat, command)
    }

    /// Whether a command outside `as_chat` goes through the command chain.
    pub fn is_filtered(&self, command: &str) -> bool {
        (self.whitelist.is_empty() || listed(&self.whitelist, command)) && !listed(&self.blacklist, command)
    }
}

fn listed(names: &[String], command: &str) -> bool {
    names.iter().any(|name| name.trim_start_matches('/').eq_ignore_ascii_case(command))
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PointsConfig {
    pub enabled: bool,
    pub leak: LeakConfig,
    pub thresholds: Vec<ThresholdConfig>,
}

/// `points` leaked every `interval_secs` seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeakConfig {
    pub points: f64,
    pub interval_secs: u64,
}

impl Default for LeakConfig {
    fn default() -> Self {
        Self { points: 1.0, interval_secs: 30 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdConfig {
    pub name: String,
    pub points: f64,
    /// Action lines (`"<token> <params>"`) run when the score rises past `points`.
    #[serde(default)]
    pub ascending: Vec<String>,
    /// Action lines run when the score falls back below `points`.
    #[serde(default)]
    pub descending: Vec<String>,
}

impl FilterConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: FilterConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, FilterError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|source| FilterError::Io { path: path.display().to_string(), source })?;
        let config = Self::from_toml_str(&source)?;
        tracing::debug!(path = %path.display(), thresholds = config.points.thresholds.len(), "configuration loaded");
        Ok(config)
    }

    /// Reject values that would make scoring meaningless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let leak = &self.points.leak;
        if !leak.points.is_finite() || leak.points < 0.0 {
            return Err(ConfigError::Invalid(format!("leak.points must be zero or positive, found {}", leak.points)));
        }
        if leak.interval_secs == 0 {
            return Err(ConfigError::Invalid("leak.interval_secs must be positive".to_string()));
        }

        let commands = &self.commands;
        for name in commands.as_chat.iter().chain(&commands.whitelist).chain(&commands.blacklist) {
            let name = name.trim_start_matches('/');
            if name.is_empty() || name.contains(char::is_whitespace) {
                return Err(ConfigError::Invalid(format!("'{name}' is not a command name")));
            }
        }

        let mut seen: Vec<f64> = Vec::with_capacity(self.points.thresholds.len());
        for threshold in &self.points.thresholds {
            if threshold.name.trim().is_empty() {
                return Err(ConfigError::Invalid("threshold without a name".to_string()));
            }
            if !threshold.points.is_finite() || threshold.points <= 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "threshold '{}' must have a positive point value, found {}",
                    threshold.name, threshold.points
                )));
            }
            if seen.contains(&threshold.points) {
                return Err(ConfigError::Invalid(format!(
                    "threshold '{}' repeats the value {}",
                    threshold.name, threshold.points
                )));
            }
            seen.push(threshold.points);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = FilterConfig::from_toml_str("").unwrap();
        assert_eq!(config, FilterConfig::default());
        assert!(config.filters.chat);
        assert!(!config.points.enabled);
        assert_eq!(config.points.leak, LeakConfig { points: 1.0, interval_secs: 30 });
    }

    #[test]
    fn full_document_parses() {
        let config = FilterConfig::from_toml_str(
            r#"
            rule_directory = "/srv/filter/rules"
            decolor = true
            spam_filter = true

            [filters]
            command = true

            [commands]
            as_chat = ["tell"]

            [messages]
            warn = "Careful, %player%."

            [points]
            enabled = true
            leak = { points = 2.5, interval_secs = 10 }

            [[points.thresholds]]
            name = "warning"
            points = 10
            ascending = ["warn Slow down."]

            [[points.thresholds]]
            name = "kick"
            points = 20
            ascending = ["kick Too much."]
            descending = ["warn Welcome back."]
            "#,
        )
        .unwrap();

        assert_eq!(config.rule_directory, PathBuf::from("/srv/filter/rules"));
        assert!(config.decolor && config.spam_filter);
        assert_eq!(config.commands.as_chat, vec!["tell"]);
        assert!(!config.commands.spam_filter);
        assert_eq!(config.filters, FilterToggles { chat: true, command: true, console: false });
        assert_eq!(config.messages.get("warn").map(String::as_str), Some("Careful, %player%."));
        assert_eq!(config.points.leak.points, 2.5);
        assert_eq!(config.points.thresholds.len(), 2);
        assert_eq!(config.points.thresholds[1].descending, vec!["warn Welcome back."]);
        assert!(config.points.thresholds[0].descending.is_empty());
    }

    #[test]
    fn rejects_bad_leak_settings() {
        let err = FilterConfig::from_toml_str("[points.leak]\npoints = -1.0\n").unwrap_err();
        assert!(err.to_string().contains("leak.points"));

        let err = FilterConfig::from_toml_str("[points.leak]\ninterval_secs = 0\n").unwrap_err();
        assert!(err.to_string().contains("interval_secs"));
    }

    #[test]
    fn rejects_bad_thresholds() {
        let zero = "[[points.thresholds]]\nname = \"z\"\npoints = 0\n";
        assert!(matches!(FilterConfig::from_toml_str(zero), Err(ConfigError::Invalid(_))));

        let twice = "[[points.thresholds]]\nname = \"a\"\npoints = 5\n[[points.thresholds]]\nname = \"b\"\npoints = 5\n";
        assert!(matches!(FilterConfig::from_toml_str(twice), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn command_lists_match_without_slash_or_case() {
        let config = FilterConfig::from_toml_str(
            r#"
            [commands]
            as_chat = ["/tell", "msg"]
            blacklist = ["login"]
            "#,
        )
        .unwrap();
        let commands = &config.commands;
        assert!(commands.is_chat("TELL") && commands.is_chat("msg"));
        assert!(commands.is_filtered("me"));
        assert!(!commands.is_filtered("Login"));

        let only = CommandConfig { whitelist: vec!["me".to_string()], ..Default::default() };
        assert!(only.is_filtered("me"));
        assert!(!only.is_filtered("give"));
    }

    #[test]
    fn rejects_blank_command_names() {
        let err = FilterConfig::from_toml_str("[commands]\nblacklist = [\"/\"]\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        let err = FilterConfig::from_toml_str("[commands]\nas_chat = [\"tell me\"]\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn syntax_errors_are_toml_errors() {
        assert!(matches!(FilterConfig::from_toml_str("decolor = maybe"), Err(ConfigError::Toml(_))));
    }
}
