use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Library-level error type with user-friendly reporting.
///
/// `NlqueryError` is what the CLI and embedding code see when something fails
/// outside the streaming protocol (configuration, backend construction, store
/// connection). Failures that happen while a question is being answered never
/// surface as `NlqueryError`; the engine turns them into stream events.
///
/// # Exit Code Mapping
///
/// | Exit Code | Error Type |
/// |-----------|------------|
/// | 2 | Configuration errors |
/// | 1 | Everything else |
#[derive(Error, Debug)]
pub enum NlqueryError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("LLM backend error: {0}")]
    Llm(#[from] LlmError),

    #[error("Data store error: {0}")]
    Store(#[from] StoreError),

    #[error("Workflow error: {0}")]
    Workflow(#[from] WorkflowError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl NlqueryError {
    /// Process exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 2,
            Self::Llm(LlmError::Misconfiguration(_) | LlmError::Unsupported(_)) => 2,
            _ => 1,
        }
    }

    /// Render the error with context and suggestions for terminal output.
    #[must_use]
    pub fn display_for_user(&self) -> String {
        let mut out = format!("Error: {}", self.user_message());
        if let Some(context) = self.context() {
            out.push_str(&format!("\n\nContext: {context}"));
        }
        let suggestions = self.suggestions();
        if !suggestions.is_empty() {
            out.push_str("\n\nSuggestions:");
            for suggestion in suggestions {
                out.push_str(&format!("\n  - {suggestion}"));
            }
        }
        out
    }
}

/// Trait for providing user-friendly error reporting with context and suggestions
pub trait UserFriendlyError {
    /// Get a user-friendly error message
    fn user_message(&self) -> String;

    /// Get contextual information about the error
    fn context(&self) -> Option<String>;

    /// Get suggested actions to resolve the error
    fn suggestions(&self) -> Vec<String>;

    /// Get the error category for grouping similar errors
    fn category(&self) -> ErrorCategory;
}

/// Categories of errors for better organization and handling
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    LlmIntegration,
    DataStore,
    Workflow,
    ResourceLimits,
    FileSystem,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration => write!(f, "Configuration"),
            Self::LlmIntegration => write!(f, "LLM Integration"),
            Self::DataStore => write!(f, "Data Store"),
            Self::Workflow => write!(f, "Workflow"),
            Self::ResourceLimits => write!(f, "Resource Limits"),
            Self::FileSystem => write!(f, "File System"),
        }
    }
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration file: {0}")]
    InvalidFile(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found: {path}")]
    NotFound { path: String },
}

impl UserFriendlyError for ConfigError {
    fn user_message(&self) -> String {
        match self {
            Self::InvalidFile(msg) => format!("Configuration file is invalid: {msg}"),
            Self::MissingRequired(key) => format!("Required setting '{key}' is missing"),
            Self::InvalidValue { key, value } => {
                format!("Setting '{key}' has an invalid value: {value}")
            }
            Self::NotFound { path } => format!("Configuration file '{path}' does not exist"),
        }
    }

    fn context(&self) -> Option<String> {
        Some(
            "Configuration is read from .nlquery/config.toml (searched upward from the \
             working directory) or from the path passed with --config."
                .to_string(),
        )
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::InvalidFile(_) => vec![
                "Check the TOML syntax of the configuration file".to_string(),
                "Run 'nlquery config' to see the effective configuration".to_string(),
            ],
            Self::MissingRequired(key) => vec![format!("Add '{key}' to the configuration file")],
            Self::InvalidValue { key, .. } => {
                vec![format!("Correct the value of '{key}' in the configuration file")]
            }
            Self::NotFound { .. } => vec![
                "Check the path passed with --config".to_string(),
                "Omit --config to use discovery".to_string(),
            ],
        }
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Configuration
    }
}

/// Errors raised by LLM backends.
///
/// Every variant is an upstream failure from the point of view of the
/// workflow: none of them is retried by the query repair loop.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LlmError {
    /// Transport-level failure (HTTP connectivity, malformed response)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Provider authentication failure (401, 403, missing API key)
    #[error("Provider authentication error: {0}")]
    ProviderAuth(String),

    /// Provider quota/rate limit exceeded (429)
    #[error("Provider quota exceeded: {0}")]
    ProviderQuota(String),

    /// Provider service outage (5xx errors)
    #[error("Provider outage: {0}")]
    ProviderOutage(String),

    /// Invocation timed out
    #[error("Timeout after {duration:?}")]
    Timeout { duration: Duration },

    /// Budget limit exceeded
    #[error("Budget exceeded: attempted {attempted} calls, limit is {limit}")]
    BudgetExceeded { limit: u32, attempted: u32 },

    /// Configuration error
    #[error("Misconfiguration: {0}")]
    Misconfiguration(String),

    /// Unsupported feature or provider
    #[error("Unsupported: {0}")]
    Unsupported(String),
}

impl UserFriendlyError for LlmError {
    fn user_message(&self) -> String {
        match self {
            Self::Transport(msg) => format!("LLM transport error: {msg}"),
            Self::ProviderAuth(msg) => format!("LLM provider authentication failed: {msg}"),
            Self::ProviderQuota(msg) => format!("LLM provider quota exceeded: {msg}"),
            Self::ProviderOutage(msg) => format!("LLM provider service outage: {msg}"),
            Self::Timeout { duration } => {
                format!("LLM invocation timed out after {duration:?}")
            }
            Self::BudgetExceeded { limit, attempted } => {
                format!("LLM budget exceeded: attempted {attempted} calls, limit is {limit}")
            }
            Self::Misconfiguration(msg) => format!("LLM configuration error: {msg}"),
            Self::Unsupported(msg) => format!("LLM feature not supported: {msg}"),
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::Transport(_) => {
                Some("Transport errors occur when the LLM provider cannot be reached.".to_string())
            }
            Self::ProviderAuth(_) => Some(
                "Authentication errors indicate missing or invalid API keys.".to_string(),
            ),
            Self::ProviderQuota(_) | Self::BudgetExceeded { .. } => Some(
                "Quota errors occur when rate limits or usage limits are exceeded.".to_string(),
            ),
            Self::ProviderOutage(_) => {
                Some("Provider outages are temporary service disruptions.".to_string())
            }
            Self::Timeout { .. } => Some(
                "Timeouts occur when a completion takes longer than the configured limit."
                    .to_string(),
            ),
            Self::Misconfiguration(_) | Self::Unsupported(_) => {
                Some("The [llm] section of the configuration is incomplete or invalid.".to_string())
            }
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Transport(_) | Self::ProviderOutage(_) => vec![
                "Verify network connectivity".to_string(),
                "Wait a few minutes and try again".to_string(),
            ],
            Self::ProviderAuth(_) => vec![
                "Check that the API key environment variable is set".to_string(),
                "Verify the API key is valid and not expired".to_string(),
            ],
            Self::ProviderQuota(_) => vec![
                "Wait a few minutes and try again".to_string(),
                "Check your provider's usage dashboard".to_string(),
            ],
            Self::Timeout { .. } => {
                vec!["Increase [llm.openai] timeout_secs in the configuration".to_string()]
            }
            Self::BudgetExceeded { .. } => vec![
                "Raise the call budget with NLQUERY_LLM_BUDGET or [llm.openai] budget".to_string(),
            ],
            Self::Misconfiguration(_) | Self::Unsupported(_) => vec![
                "Check the [llm] section in .nlquery/config.toml".to_string(),
            ],
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::ProviderAuth(_) | Self::Misconfiguration(_) | Self::Unsupported(_) => {
                ErrorCategory::Configuration
            }
            Self::ProviderQuota(_) | Self::BudgetExceeded { .. } => ErrorCategory::ResourceLimits,
            Self::Transport(_) | Self::ProviderOutage(_) | Self::Timeout { .. } => {
                ErrorCategory::LlmIntegration
            }
        }
    }
}

/// Errors raised by a data store.
///
/// `Query` carries the store's own message; the workflow records that text
/// verbatim so the repair prompt can see it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The store could not be opened or a connection could not be acquired
    #[error("{0}")]
    Connection(String),

    /// The store rejected or failed to execute a statement
    #[error("{0}")]
    Query(String),

    /// A returned value could not be converted
    #[error("failed to decode column '{column}': {reason}")]
    Decode { column: String, reason: String },
}

impl UserFriendlyError for StoreError {
    fn user_message(&self) -> String {
        match self {
            Self::Connection(msg) => format!("Could not open the database: {msg}"),
            Self::Query(msg) => format!("Query failed: {msg}"),
            Self::Decode { column, reason } => {
                format!("Could not read column '{column}': {reason}")
            }
        }
    }

    fn context(&self) -> Option<String> {
        None
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Connection(_) => vec![
                "Check [database] path in the configuration".to_string(),
                "Set NLQUERY_DATABASE_PATH to the database file".to_string(),
            ],
            _ => Vec::new(),
        }
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::DataStore
    }
}

/// Faults that abort a workflow run.
///
/// These are never shown to a subscriber verbatim; the engine logs them and
/// emits a generic error event instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    /// The completion service failed while a node required its output
    #[error("completion failed during {node}: {source}")]
    Upstream {
        node: &'static str,
        #[source]
        source: LlmError,
    },

    /// The subscriber went away before the run finished
    #[error("subscriber disconnected")]
    Cancelled,

    /// The question was empty
    #[error("no user message provided")]
    InvalidQuestion,
}

impl WorkflowError {
    /// Message safe to stream to a subscriber.
    #[must_use]
    pub const fn public_message(&self) -> &'static str {
        match self {
            Self::InvalidQuestion => "No user message provided",
            Self::Upstream { .. } | Self::Cancelled => {
                "An internal error occurred. Please try again."
            }
        }
    }
}

impl UserFriendlyError for WorkflowError {
    fn user_message(&self) -> String {
        self.public_message().to_string()
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::Upstream { source, .. } => source.context(),
            _ => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Upstream { source, .. } => source.suggestions(),
            Self::InvalidQuestion => vec!["Pass a non-empty question".to_string()],
            Self::Cancelled => Vec::new(),
        }
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Workflow
    }
}

impl UserFriendlyError for NlqueryError {
    fn user_message(&self) -> String {
        match self {
            Self::Config(err) => err.user_message(),
            Self::Llm(err) => err.user_message(),
            Self::Store(err) => err.user_message(),
            Self::Workflow(err) => err.user_message(),
            Self::Io(err) => format!("File system operation failed: {err}"),
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::Config(err) => err.context(),
            Self::Llm(err) => err.context(),
            Self::Store(err) => err.context(),
            Self::Workflow(err) => err.context(),
            Self::Io(_) => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Config(err) => err.suggestions(),
            Self::Llm(err) => err.suggestions(),
            Self::Store(err) => err.suggestions(),
            Self::Workflow(err) => err.suggestions(),
            Self::Io(_) => vec!["Check file permissions and paths".to_string()],
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Config(err) => err.category(),
            Self::Llm(err) => err.category(),
            Self::Store(err) => err.category(),
            Self::Workflow(err) => err.category(),
            Self::Io(_) => ErrorCategory::FileSystem,
        }
    }
}
