//! Public service facade.
//!
//! [`FilterService`] ties the pieces together for a host: it owns the action
//! registry, the active chains (one per name, swapped wholesale on reload)
//! and the shared [`Services`] every action sees at execution time.
//!
//! # Example
//! ```
//! use chatwarden::{FilterService, LogSink, MessageAuthor, AuthorId};
//! use std::sync::Arc;
//!
//! struct Player;
//!
//! impl MessageAuthor for Player {
//!     fn id(&self) -> AuthorId {
//!         AuthorId::from("player-1")
//!     }
//!     fn name(&self) -> String {
//!         "Player".to_string()
//!     }
//! }
//!
//! let service = FilterService::builder().sink(Arc::new(LogSink)).build().unwrap();
//! service.load_chain("chat", "/darn/i then replace ****").unwrap();
//!
//! let outcome = service.evaluate("chat", "Darn it", Arc::new(Player));
//! assert_eq!(outcome.display_text, "**** it");
//! assert!(outcome.modified && !outcome.cancelled);
//! ```

use crate::actions::{Action, ActionGroup, ActionRegistry};
use crate::author::{AuthorId, LogSink, MessageAuthor, MessageSink};
use crate::config::FilterConfig;
use crate::context::FilterContext;
use crate::engine::{self, EvalMetrics, RuleChain};
use crate::error::{ActionError, FilterError};
use crate::message::ColoredString;
use crate::points::{LeakRate, PointManager, Thresholds};
use crate::tags::TagResolver;
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::runtime::Handle;

/// Permission that keeps color codes when `decolor` is on.
pub const COLOR_PERMISSION: &str = "chatwarden.color";
/// Permission to talk while the global mute is on.
pub const MUTE_BYPASS_PERMISSION: &str = "chatwarden.bypass.mute";
/// Permission to repeat a message past the spam filter.
pub const SPAM_BYPASS_PERMISSION: &str = "chatwarden.bypass.spam";

// --- Services ---

/// Default messages for targeted actions, keyed by action token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageTemplates {
    entries: BTreeMap<String, String>,
}

impl MessageTemplates {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: &str, message: impl Into<String>) {
        self.entries.insert(key.to_ascii_lowercase(), message.into());
    }

    /// Overlay configured messages on top of the current ones.
    pub fn merge(&mut self, overrides: &BTreeMap<String, String>) {
        for (key, message) in overrides {
            self.set(key, message.clone());
        }
    }
}

impl Default for MessageTemplates {
    fn default() -> Self {
        let entries = [
            ("warn", "You have been warned."),
            ("kick", "You have been kicked for your language."),
            ("kill", "You have been struck down for your language."),
            ("fine", "You have been fined for your language."),
            ("spam", "Repeated message blocked by spam filter."),
        ];
        Self { entries: entries.into_iter().map(|(k, v)| (k.to_string(), v.to_string())).collect() }
    }
}

/// Everything an action may reach at execution time.
pub struct Services {
    points: PointManager,
    tags: TagResolver,
    templates: RwLock<MessageTemplates>,
    sink: Arc<dyn MessageSink>,
}

impl Services {
    pub fn builder() -> ServicesBuilder {
        ServicesBuilder::default()
    }

    pub fn points(&self) -> &PointManager {
        &self.points
    }

    pub fn tags(&self) -> &TagResolver {
        &self.tags
    }

    pub fn sink(&self) -> &dyn MessageSink {
        self.sink.as_ref()
    }

    /// Default message for `key`; empty when none is configured.
    pub fn template(&self, key: &str) -> String {
        self.templates.read().get(key).unwrap_or_default().to_string()
    }

    pub fn templates(&self) -> MessageTemplates {
        self.templates.read().clone()
    }

    pub fn set_templates(&self, templates: MessageTemplates) {
        *self.templates.write() = templates;
    }
}

impl Default for Services {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl fmt::Debug for Services {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Services")
            .field("points", &self.points)
            .field("tags", &self.tags)
            .field("templates", &*self.templates.read())
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
pub struct ServicesBuilder {
    sink: Option<Arc<dyn MessageSink>>,
    tags: TagResolver,
    templates: MessageTemplates,
}

impl ServicesBuilder {
    pub fn sink(mut self, sink: Arc<dyn MessageSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn tag<F>(mut self, name: &str, f: F) -> Self
    where
        F: Fn(&FilterContext) -> String + Send + Sync + 'static,
    {
        self.tags.register(name, f);
        self
    }

    pub fn templates(mut self, templates: MessageTemplates) -> Self {
        self.templates = templates;
        self
    }

    pub fn build(self) -> Services {
        Services {
            points: PointManager::new(),
            tags: self.tags,
            templates: RwLock::new(self.templates),
            sink: self.sink.unwrap_or_else(|| Arc::new(LogSink)),
        }
    }
}

// --- Outcome ---

/// Message source a host hands to [`FilterService::filter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterKind {
    Chat,
    Command,
    Console,
}

impl FilterKind {
    pub const ALL: [FilterKind; 3] = [FilterKind::Chat, FilterKind::Command, FilterKind::Console];

    /// Chain name and rule file stem for this kind.
    pub fn name(self) -> &'static str {
        match self {
            FilterKind::Chat => "chat",
            FilterKind::Command => "command",
            FilterKind::Console => "console",
        }
    }

    /// Authors holding this permission are not filtered for this kind.
    pub fn bypass_permission(self) -> String {
        format!("chatwarden.bypass.{}", self.name())
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What the host should do with a message after filtering.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterOutcome {
    /// Final message with color codes.
    pub modified_text: String,
    /// Final message without color codes.
    pub display_text: String,
    pub cancelled: bool,
    pub logged: bool,
    /// The text differs from what the host passed in.
    pub modified: bool,
    /// Source lines of every rule that matched, in firing order.
    pub matched_lines: Vec<usize>,
    pub log_messages: Vec<String>,
    pub metrics: EvalMetrics,
}

impl FilterOutcome {
    fn pass_through(text: &str) -> Self {
        let message = ColoredString::new(text);
        FilterOutcome { modified_text: message.raw(), display_text: message.plain().to_string(), ..Default::default() }
    }

    fn blocked(text: &str) -> Self {
        FilterOutcome { cancelled: true, ..Self::pass_through(text) }
    }

    fn from_context(ctx: FilterContext, metrics: EvalMetrics) -> Self {
        FilterOutcome {
            modified_text: ctx.modified().raw(),
            display_text: ctx.modified().plain().to_string(),
            cancelled: ctx.is_cancelled(),
            logged: ctx.is_logging(),
            modified: ctx.message_changed(),
            matched_lines: ctx.matched_lines().to_vec(),
            log_messages: ctx.log_messages().to_vec(),
            metrics,
        }
    }
}

// --- Service ---

/// Filter facade owned by the host.
pub struct FilterService {
    registry: RwLock<ActionRegistry>,
    services: Arc<Services>,
    chains: RwLock<HashMap<String, Arc<RuleChain>>>,
    config: RwLock<FilterConfig>,
    runtime: Option<Handle>,
    muted: AtomicBool,
    /// Last chat-like message per author, for the spam filter.
    last_messages: Mutex<HashMap<AuthorId, String>>,
}

impl FilterService {
    pub fn builder() -> FilterServiceBuilder {
        FilterServiceBuilder::default()
    }

    pub fn services(&self) -> &Arc<Services> {
        &self.services
    }

    pub fn config(&self) -> FilterConfig {
        self.config.read().clone()
    }

    /// Register a host action. Chains already loaded keep the actions they
    /// were compiled with until they are reloaded.
    pub fn register_action<F>(&self, group: ActionGroup, token: &str, builder: F) -> Option<ActionGroup>
    where
        F: Fn(&str) -> Result<Arc<dyn Action>, ActionError> + Send + Sync + 'static,
    {
        self.registry.write().register(group, token, builder)
    }

    /// Compile `source` and make it the active chain called `name`.
    ///
    /// On a parse error the chain previously loaded under `name`, if any,
    /// stays active.
    pub fn load_chain(&self, name: &str, source: &str) -> Result<Arc<RuleChain>, FilterError> {
        let parsed = engine::parse_chain(name, source, &self.registry.read());
        let chain = match parsed {
            Ok(chain) => Arc::new(chain),
            Err(source) => {
                let kept = self.chains.read().contains_key(name);
                tracing::error!(
                    chain = name,
                    line = source.line(),
                    error = %source,
                    kept_previous = kept,
                    "chain failed to load"
                );
                return Err(FilterError::Parse { chain: name.to_string(), source });
            }
        };
        self.chains.write().insert(name.to_string(), chain.clone());
        tracing::info!(chain = name, rules = chain.rule_count(), "chain loaded");
        Ok(chain)
    }

    pub fn load_chain_file(&self, name: &str, path: impl AsRef<Path>) -> Result<Arc<RuleChain>, FilterError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|source| FilterError::Io { path: path.display().to_string(), source })?;
        self.load_chain(name, &source)
    }

    /// Load `<rule_directory>/<kind>.txt` for every enabled filter kind.
    ///
    /// A missing or broken file is logged and skipped. Returns the names of
    /// the chains that loaded.
    pub fn load_rule_directory(&self) -> Vec<String> {
        let config = self.config();
        let mut loaded = Vec::new();
        for kind in FilterKind::ALL {
            if !is_enabled(&config, kind) {
                continue;
            }
            let path = config.rule_directory.join(format!("{}.txt", kind.name()));
            if !path.is_file() {
                tracing::debug!(path = %path.display(), "no rule file for filter");
                continue;
            }
            match self.load_chain_file(kind.name(), &path) {
                Ok(_) => loaded.push(kind.name().to_string()),
                Err(err) => tracing::warn!(path = %path.display(), error = %err, "skipping rule file"),
            }
        }
        loaded
    }

    pub fn chain(&self, name: &str) -> Option<Arc<RuleChain>> {
        self.chains.read().get(name).cloned()
    }

    pub fn unload_chain(&self, name: &str) -> bool {
        self.chains.write().remove(name).is_some()
    }

    pub fn chain_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.chains.read().keys().cloned().collect();
        names.sort_unstable();
        names
    }

    /// Run the chain called `name` over `text`.
    ///
    /// An unknown chain passes the message through untouched.
    pub fn evaluate(&self, name: &str, text: &str, author: Arc<dyn MessageAuthor>) -> FilterOutcome {
        let Some(chain) = self.chain(name) else {
            tracing::warn!(chain = name, "no such chain, message passed through");
            return FilterOutcome::pass_through(text);
        };

        let mut ctx = FilterContext::new(text, author);
        let metrics = engine::execute(&chain, &mut ctx, &self.services);
        if ctx.is_logging() {
            emit_log(&ctx);
        }
        FilterOutcome::from_context(ctx, metrics)
    }

    /// Filter a message from one of the host's sources.
    ///
    /// Disabled kinds and authors with the kind's bypass permission pass
    /// through. Chat, and commands listed in `commands.as_chat`, are
    /// cancelled outright while the global mute is on or when the spam filter
    /// sees a repeat; they run through the `chat` chain. Other commands run
    /// through the `command` chain if the white and black lists allow them,
    /// and are cancelled when the rules leave nothing of them. With `decolor`
    /// on, color codes are stripped first unless the author holds
    /// [`COLOR_PERMISSION`].
    pub fn filter(&self, kind: FilterKind, text: &str, author: Arc<dyn MessageAuthor>) -> FilterOutcome {
        let config = self.config.read();
        if !is_enabled(&config, kind) || author.has_permission(&kind.bypass_permission()) {
            return FilterOutcome::pass_through(text);
        }
        let Some(route) = route(&config, kind, text) else {
            tracing::trace!(command = command_name(text), "command not filtered");
            return FilterOutcome::pass_through(text);
        };
        let decolor = config.decolor && !author.has_permission(COLOR_PERMISSION);
        drop(config);

        if let Route::Chat { spam_filter } = route {
            if self.is_muted() && !author.has_permission(MUTE_BYPASS_PERMISSION) {
                tracing::debug!(author = %author.name(), "message dropped by global mute");
                return FilterOutcome::blocked(text);
            }
            if spam_filter && !author.has_permission(SPAM_BYPASS_PERMISSION) && self.is_repeat(&author.id(), text) {
                tracing::debug!(author = %author.name(), "repeated message dropped");
                if let Err(err) = author.send_message(&self.services.template("spam")) {
                    tracing::debug!(author = %author.name(), error = %err, "spam notice not delivered");
                }
                return FilterOutcome::blocked(text);
            }
        }

        let chain = match route {
            Route::Chat { .. } => FilterKind::Chat,
            Route::Chain(kind) => kind,
        };
        let input = ColoredString::new(text);
        let mut outcome = if decolor && input.has_codes() {
            let mut outcome = self.evaluate(chain.name(), &input.decolor().raw(), author);
            outcome.modified = true;
            outcome
        } else {
            self.evaluate(chain.name(), text, author)
        };
        if kind == FilterKind::Command && outcome.modified && outcome.display_text.trim().is_empty() {
            outcome.cancelled = true;
        }
        outcome
    }

    /// Turn the global chat mute on or off.
    pub fn set_global_mute(&self, muted: bool) {
        if self.muted.swap(muted, Ordering::AcqRel) != muted {
            tracing::info!(muted, "global mute changed");
        }
    }

    pub fn is_muted(&self) -> bool {
        self.muted.load(Ordering::Acquire)
    }

    /// Record `text` as the author's last message; true if it repeats it.
    fn is_repeat(&self, author: &AuthorId, text: &str) -> bool {
        let mut last = self.last_messages.lock();
        if last.get(author).is_some_and(|previous| previous == text) {
            return true;
        }
        last.insert(author.clone(), text.to_string());
        false
    }

    /// Apply a configuration: point scoring, then templates.
    ///
    /// Thresholds are built before anything changes, and scoring is the only
    /// step that can still fail, so a rejected configuration leaves the
    /// running state as it was.
    pub fn apply_config(&self, config: FilterConfig) -> Result<(), FilterError> {
        config.validate()?;

        let thresholds = if config.points.enabled {
            Some(Thresholds::from_config(&config.points.thresholds, &self.registry.read())?)
        } else {
            None
        };

        match thresholds {
            Some(thresholds) => {
                let leak = LeakRate::from(&config.points.leak);
                self.services.points().enable(&self.services, leak, thresholds, self.runtime.as_ref())?;
            }
            None => self.services.points().disable(),
        }

        let mut templates = MessageTemplates::default();
        templates.merge(&config.messages);
        self.services.set_templates(templates);

        *self.config.write() = config;
        Ok(())
    }

    /// Forget an author's last message, and their score if it has leaked to
    /// zero. Returns whether the score was dropped.
    pub fn release_author(&self, author: &AuthorId) -> bool {
        self.last_messages.lock().remove(author);
        self.services.points().release(author)
    }
}

impl fmt::Debug for FilterService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterService")
            .field("chains", &self.chain_names())
            .field("registry", &*self.registry.read())
            .field("services", &self.services)
            .finish_non_exhaustive()
    }
}

fn is_enabled(config: &FilterConfig, kind: FilterKind) -> bool {
    match kind {
        FilterKind::Chat => config.filters.chat,
        FilterKind::Command => config.filters.command,
        FilterKind::Console => config.filters.console,
    }
}

/// Where a message goes once its kind is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    /// The `chat` chain, behind the global mute and optionally the spam filter.
    Chat { spam_filter: bool },
    Chain(FilterKind),
}

fn route(config: &FilterConfig, kind: FilterKind, text: &str) -> Option<Route> {
    match kind {
        FilterKind::Chat => Some(Route::Chat { spam_filter: config.spam_filter }),
        FilterKind::Command => {
            let command = command_name(text);
            if config.commands.is_chat(command) {
                Some(Route::Chat { spam_filter: config.commands.spam_filter })
            } else if config.commands.is_filtered(command) {
                Some(Route::Chain(FilterKind::Command))
            } else {
                None
            }
        }
        FilterKind::Console => Some(Route::Chain(FilterKind::Console)),
    }
}

/// `"/tell bob hi"` → `"tell"`.
fn command_name(text: &str) -> &str {
    text.trim_start().trim_start_matches('/').split_whitespace().next().unwrap_or_default()
}

fn emit_log(ctx: &FilterContext) {
    let chain = ctx.chain_name().unwrap_or("-");
    let author = ctx.author().name();
    tracing::info!(
        target: "chatwarden::log",
        chain,
        author = %author,
        original = %ctx.original().raw(),
        modified = %ctx.modified().raw(),
        lines = ?ctx.matched_lines(),
        "filtered"
    );
    for message in ctx.log_messages() {
        tracing::info!(target: "chatwarden::log", chain, author = %author, "{message}");
    }
}

// --- Builder ---

pub struct FilterServiceBuilder {
    registry: ActionRegistry,
    services: ServicesBuilder,
    runtime: Option<Handle>,
    config: Option<FilterConfig>,
}

impl Default for FilterServiceBuilder {
    fn default() -> Self {
        Self {
            registry: ActionRegistry::with_defaults(),
            services: ServicesBuilder::default(),
            runtime: None,
            config: None,
        }
    }
}

impl FilterServiceBuilder {
    /// Replace the default action registry.
    pub fn registry(mut self, registry: ActionRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn action<F>(mut self, group: ActionGroup, token: &str, builder: F) -> Self
    where
        F: Fn(&str) -> Result<Arc<dyn Action>, ActionError> + Send + Sync + 'static,
    {
        self.registry.register(group, token, builder);
        self
    }

    pub fn sink(mut self, sink: Arc<dyn MessageSink>) -> Self {
        self.services = self.services.sink(sink);
        self
    }

    pub fn tag<F>(mut self, name: &str, f: F) -> Self
    where
        F: Fn(&FilterContext) -> String + Send + Sync + 'static,
    {
        self.services = self.services.tag(name, f);
        self
    }

    /// Runtime for the leak task; defaults to the ambient one.
    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn config(mut self, config: FilterConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn build(self) -> Result<FilterService, FilterError> {
        let service = FilterService {
            registry: RwLock::new(self.registry),
            services: Arc::new(self.services.build()),
            chains: RwLock::new(HashMap::new()),
            config: RwLock::new(FilterConfig::default()),
            runtime: self.runtime,
            muted: AtomicBool::new(false),
            last_messages: Mutex::new(HashMap::new()),
        };
        if let Some(config) = self.config {
            service.apply_config(config)?;
        }
        Ok(service)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PointsConfig, ThresholdConfig};
    use crate::testing::RecordingAuthor;

    fn service() -> FilterService {
        FilterService::builder().build().unwrap()
    }

    fn scoring_config(thresholds: Vec<ThresholdConfig>) -> FilterConfig {
        FilterConfig { points: PointsConfig { enabled: true, thresholds, ..Default::default() }, ..Default::default() }
    }

    #[tokio::test(start_paused = true)]
    async fn spam_scores_and_warns_once() {
        let config = scoring_config(vec![ThresholdConfig {
            name: "spam".to_string(),
            points: 5.0,
            ascending: vec!["warn".to_string()],
            descending: Vec::new(),
        }]);
        let service = FilterService::builder().config(config).build().unwrap();
        service.load_chain("chat", r#""spam"i then replace **** then points 5"#).unwrap();

        let author = Arc::new(RecordingAuthor::new("steve"));
        let outcome = service.evaluate("chat", "This is SPAM.", author.clone());

        assert_eq!(outcome.display_text, "This is ****.");
        assert!(outcome.modified);
        assert_eq!(service.services().points().points(&author.id()), 5.0);
        assert_eq!(author.calls(), vec![format!("message:{}", service.services().template("warn"))]);
    }

    #[test]
    fn failed_reload_keeps_previous_chain() {
        let service = service();
        service.load_chain("chat", "/a/ then deny").unwrap();

        let err = service.load_chain("chat", "/a/ then deny\n/b/ then explode").unwrap_err();
        assert!(matches!(err, FilterError::Parse { source: crate::ParseError::UnknownAction { line: 2, .. }, .. }));

        let outcome = service.evaluate("chat", "a", RecordingAuthor::arc("steve"));
        assert!(outcome.cancelled);
    }

    #[test]
    fn in_flight_chain_survives_reload() {
        let service = service();
        let before = service.load_chain("chat", "/a/ then deny").unwrap();
        service.load_chain("chat", "/a/ then log").unwrap();
        assert_eq!(before.rules()[0].actions()[0].token(), "deny");
        assert_eq!(service.chain("chat").unwrap().rules()[0].actions()[0].token(), "log");
    }

    #[test]
    fn unknown_chain_passes_through() {
        let outcome = service().evaluate("nope", "§ahello", RecordingAuthor::arc("steve"));
        assert_eq!(outcome.modified_text, "§ahello");
        assert_eq!(outcome.display_text, "hello");
        assert!(!outcome.cancelled && !outcome.modified);
    }

    #[test]
    fn filter_honors_toggles_and_bypass() {
        let service = service();
        service.load_chain("chat", "/x/ then deny").unwrap();
        service.load_chain("command", "/x/ then deny").unwrap();

        assert!(service.filter(FilterKind::Chat, "x", RecordingAuthor::arc("steve")).cancelled);
        // Command filtering is off by default.
        assert!(!service.filter(FilterKind::Command, "x", RecordingAuthor::arc("steve")).cancelled);

        let admin = Arc::new(RecordingAuthor::new("admin").with_permission("chatwarden.bypass.chat"));
        assert!(!service.filter(FilterKind::Chat, "x", admin).cancelled);
    }

    #[test]
    fn decolor_strips_codes_without_permission() {
        let service = service();
        service.apply_config(FilterConfig { decolor: true, ..Default::default() }).unwrap();
        service.load_chain("chat", "/nothing/ then deny").unwrap();

        let outcome = service.filter(FilterKind::Chat, "§cred §ltext", RecordingAuthor::arc("steve"));
        assert_eq!(outcome.modified_text, "red text");
        assert!(outcome.modified);

        let artist = Arc::new(RecordingAuthor::new("artist").with_permission(COLOR_PERMISSION));
        let outcome = service.filter(FilterKind::Chat, "§cred §ltext", artist);
        assert_eq!(outcome.modified_text, "§cred §ltext");
        assert!(!outcome.modified);
    }

    #[test]
    fn host_actions_and_templates() {
        let service = FilterService::builder().tag("server", |_| "lobby".to_string()).build().unwrap();
        let mut config = FilterConfig::default();
        config.messages.insert("kick".to_string(), "Bye from %server%".to_string());
        service.apply_config(config).unwrap();
        service.load_chain("chat", "/leave/ then kick").unwrap();

        let author = Arc::new(RecordingAuthor::new("steve"));
        let outcome = service.evaluate("chat", "leave", author.clone());
        assert_eq!(author.calls(), vec!["kick:Bye from lobby"]);
        assert_eq!(outcome.log_messages, vec!["kick steve: Bye from lobby"]);
        // Untouched templates keep their defaults.
        assert_eq!(service.services().template("warn"), MessageTemplates::default().get("warn").unwrap());
    }

    #[test]
    fn bad_threshold_config_changes_nothing() {
        let service = service();
        let config = scoring_config(vec![ThresholdConfig {
            name: "broken".to_string(),
            points: 5.0,
            ascending: vec!["explode".to_string()],
            descending: Vec::new(),
        }]);
        let err = service.apply_config(config).unwrap_err();
        assert!(matches!(err, FilterError::Config(crate::ConfigError::ThresholdAction { .. })));
        assert!(!service.services().points().is_enabled());
        assert!(!service.config().points.enabled);
    }

    #[test]
    fn missing_runtime_leaves_previous_config() {
        let service = service();
        let mut config = scoring_config(Vec::new());
        config.messages.insert("warn".to_string(), "Custom warning".to_string());

        let err = service.apply_config(config).unwrap_err();
        assert!(matches!(err, FilterError::Config(crate::ConfigError::NoRuntime)));
        assert_eq!(service.services().templates(), MessageTemplates::default());
        assert!(!service.services().points().is_enabled());
        assert!(!service.config().points.enabled);
    }

    #[test]
    fn global_mute_silences_chat() {
        let service = service();
        service.load_chain("chat", "/x/ then replace y").unwrap();
        service.set_global_mute(true);

        let author = RecordingAuthor::arc("steve");
        let outcome = service.filter(FilterKind::Chat, "x marks the spot", author);
        assert!(outcome.cancelled);
        assert_eq!(outcome.display_text, "x marks the spot");
        assert_eq!(outcome.metrics.rules_evaluated, 0);

        let moderator = Arc::new(RecordingAuthor::new("mod").with_permission(MUTE_BYPASS_PERMISSION));
        let outcome = service.filter(FilterKind::Chat, "x marks the spot", moderator);
        assert!(!outcome.cancelled);
        assert_eq!(outcome.display_text, "y marks the spot");

        service.set_global_mute(false);
        assert!(!service.filter(FilterKind::Chat, "hello", RecordingAuthor::arc("steve")).cancelled);
    }

    #[test]
    fn spam_filter_drops_repeats() {
        let service = service();
        service.apply_config(FilterConfig { spam_filter: true, ..Default::default() }).unwrap();
        let author = Arc::new(RecordingAuthor::new("steve"));

        assert!(!service.filter(FilterKind::Chat, "hi", author.clone()).cancelled);
        assert!(service.filter(FilterKind::Chat, "hi", author.clone()).cancelled);
        assert_eq!(author.calls(), vec!["message:Repeated message blocked by spam filter."]);
        assert!(!service.filter(FilterKind::Chat, "hello", author.clone()).cancelled);
        assert!(!service.filter(FilterKind::Chat, "hi", author.clone()).cancelled);

        // Each author has their own last message.
        assert!(!service.filter(FilterKind::Chat, "hi", RecordingAuthor::arc("alex")).cancelled);

        let chatty = Arc::new(RecordingAuthor::new("chatty").with_permission(SPAM_BYPASS_PERMISSION));
        assert!(!service.filter(FilterKind::Chat, "hi", chatty.clone()).cancelled);
        assert!(!service.filter(FilterKind::Chat, "hi", chatty).cancelled);

        service.release_author(&author.id());
        assert!(!service.filter(FilterKind::Chat, "hi", author).cancelled);
    }

    #[test]
    fn commands_are_routed_by_configured_lists() {
        let service = service();
        let mut config = FilterConfig::default();
        config.filters.command = true;
        config.commands.as_chat = vec!["tell".to_string()];
        config.commands.blacklist = vec!["login".to_string()];
        service.apply_config(config.clone()).unwrap();
        service.load_chain("chat", "/darn/ then replace ****").unwrap();
        service.load_chain("command", "/darn/ then deny").unwrap();

        let steve = || RecordingAuthor::arc("steve");
        let outcome = service.filter(FilterKind::Command, "/tell bob darn", steve());
        assert_eq!(outcome.display_text, "/tell bob ****");
        assert!(!outcome.cancelled);
        assert!(service.filter(FilterKind::Command, "/me darn", steve()).cancelled);
        let outcome = service.filter(FilterKind::Command, "/LOGIN darn", steve());
        assert!(!outcome.cancelled && !outcome.modified);

        service.set_global_mute(true);
        assert!(service.filter(FilterKind::Command, "/tell bob hi", steve()).cancelled);
        assert!(!service.filter(FilterKind::Command, "/give bob cake", steve()).cancelled);
        service.set_global_mute(false);

        config.commands.whitelist = vec!["me".to_string()];
        service.apply_config(config).unwrap();
        assert!(!service.filter(FilterKind::Command, "/give darn", steve()).cancelled);
        assert!(service.filter(FilterKind::Command, "/me darn", steve()).cancelled);
    }

    #[test]
    fn emptied_command_is_cancelled() {
        let service = service();
        let mut config = FilterConfig::default();
        config.filters.command = true;
        service.apply_config(config).unwrap();
        service.load_chain("command", "/secret/ then rewrite").unwrap();

        let outcome = service.filter(FilterKind::Command, "/say secret", RecordingAuthor::arc("steve"));
        assert!(outcome.modified);
        assert!(outcome.cancelled);
        assert!(!service.filter(FilterKind::Command, "/say hello", RecordingAuthor::arc("steve")).cancelled);
    }

    #[test]
    fn rule_directory_loads_enabled_kinds() {
        let dir = std::env::temp_dir().join(format!("chatwarden-rules-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("chat.txt"), "/x/ then deny\n").unwrap();
        std::fs::write(dir.join("console.txt"), "/x/ then deny\n").unwrap();

        let service = service();
        service.apply_config(FilterConfig { rule_directory: dir.clone(), ..Default::default() }).unwrap();
        assert_eq!(service.load_rule_directory(), vec!["chat"]);
        assert_eq!(service.chain_names(), vec!["chat"]);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
