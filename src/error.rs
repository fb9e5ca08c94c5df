use thiserror::Error;

pub type Result<T> = std::result::Result<T, FilterError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    #[error("Expected insertions must be greater than 0")]
    InvalidCapacity,

    #[error("False positive rate must be between 0 and 1, got {rate}")]
    InvalidErrorRate { rate: f64 },

    #[error("Filter key cannot be empty")]
    EmptyKey,

    #[error("No bit store supplied for the filter")]
    MissingStore,

    #[error("Bit store unavailable: {0}")]
    StoreUnavailable(String),

    /// The bits were written; only the TTL refresh on the key failed.
    #[error("Failed to refresh expiry on '{key}': {reason}")]
    ExpiryRefreshFailed { key: String, reason: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(
        "Failed to parse environment variable {var_name}: value '{value}' - {error}"
    )]
    EnvParseError {
        var_name: String,
        value: String,
        error: String,
    },
}

impl FilterError {
    /// True for failures that happened while talking to the store, as
    /// opposed to errors rejected at construction time.
    pub fn is_runtime(&self) -> bool {
        matches!(
            self,
            FilterError::StoreUnavailable(_)
                | FilterError::ExpiryRefreshFailed { .. }
        )
    }
}

