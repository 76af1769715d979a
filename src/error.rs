//! Error types.
//!
//! Parse errors are fatal to loading one chain and always carry the 1-based
//! source line the offending logical rule started on. Action errors never
//! escape an evaluation: the engine logs them and moves on to the next action.

use thiserror::Error;

pub type ParseResult<T> = Result<T, ParseError>;
pub type ActionResult = Result<(), ActionError>;
pub type CapabilityResult = Result<(), CapabilityError>;

/// Failure to compile rule source into a [`RuleChain`](crate::RuleChain).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("line {line}: unknown action '{token}'")]
    UnknownAction { line: usize, token: String },

    #[error("line {line}: invalid parameters for '{token}': {message}")]
    InvalidParameter { line: usize, token: String, message: String },

    #[error("line {line}: invalid pattern: {message}")]
    InvalidPattern { line: usize, message: String },

    #[error("line {line}: {message}")]
    Malformed { line: usize, message: String },
}

impl ParseError {
    /// Source line of the logical rule that failed.
    pub fn line(&self) -> usize {
        match self {
            ParseError::UnknownAction { line, .. }
            | ParseError::InvalidParameter { line, .. }
            | ParseError::InvalidPattern { line, .. }
            | ParseError::Malformed { line, .. } => *line,
        }
    }

    pub(crate) fn malformed(line: usize, message: impl Into<String>) -> Self {
        ParseError::Malformed { line, message: message.into() }
    }

    /// Attach a line number to an action construction error.
    pub(crate) fn from_action(line: usize, token: &str, err: ActionError) -> Self {
        match err {
            ActionError::UnknownToken(token) => ParseError::UnknownAction { line, token },
            other => ParseError::InvalidParameter { line, token: token.to_string(), message: other.to_string() },
        }
    }
}

/// Outcome of a targeted capability the host could not honor.
///
/// `Unsupported` means the deployment has no such primitive (a console author
/// cannot be kicked); it is not a failure and is only logged at debug level.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CapabilityError {
    #[error("capability '{0}' is not supported here")]
    Unsupported(&'static str),

    #[error("capability failed: {0}")]
    Failed(String),
}

/// Errors from building or running an action.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ActionError {
    #[error("unknown action '{0}'")]
    UnknownToken(String),

    #[error("{0}")]
    InvalidParameter(String),

    #[error(transparent)]
    Capability(#[from] CapabilityError),

    #[error("{0}")]
    Failed(String),
}

impl ActionError {
    pub fn is_unsupported(&self) -> bool {
        matches!(self, ActionError::Capability(CapabilityError::Unsupported(_)))
    }
}

/// Configuration rejected at load time.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid configuration file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("threshold '{threshold}': {source}")]
    ThresholdAction {
        threshold: String,
        #[source]
        source: ActionError,
    },

    #[error("point leaking needs a tokio runtime, none is available")]
    NoRuntime,
}

/// Errors surfaced by the [`FilterService`](crate::FilterService) facade.
#[derive(Error, Debug)]
pub enum FilterError {
    #[error("failed to read rules from {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("chain '{chain}' {source}")]
    Parse {
        chain: String,
        #[source]
        source: ParseError,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}
