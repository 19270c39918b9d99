use std::path::PathBuf;

use thiserror::Error;

/// Convenient alias for fallible results returned throughout the crate.
pub type Result<T> = std::result::Result<T, ToolError>;

/// Error type covering every fatal condition of a run, plus the transport
/// failures the dispatch loop reports per item.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Wrapper for IO failures such as reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Raised when the configuration file does not exist.
    #[error("config file `{}` not found", .0.display())]
    ConfigNotFound(PathBuf),

    /// Raised when the configuration file is not valid YAML.
    #[error("failed to parse config file `{}`: {source}", .path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// Raised when the configuration document is not a mapping.
    #[error("config file `{}` must contain a mapping of keys", .0.display())]
    ConfigNotMapping(PathBuf),

    /// Raised when one or more required keys are absent or empty.
    #[error("missing required configuration key(s): {}", .0.join(", "))]
    MissingConfigKeys(Vec<String>),

    /// Raised when a configuration value has the wrong type.
    #[error("the `{key}` key must be {expected} in the config file")]
    InvalidConfigValue { key: String, expected: &'static str },

    /// Raised when `num_ids` is present but not a positive integer.
    #[error("`num_ids` must be a positive integer if provided")]
    InvalidNumIds,

    /// Raised when a `${VAR}` reference points at an unset or empty variable.
    #[error("environment variable {0} not set")]
    EnvVarNotSet(String),

    /// Raised when the HTTP client cannot be constructed.
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// Raised when the auth endpoint answers with a failure status.
    #[error("failed to exchange API token for bearer token ({0})")]
    TokenExchangeRejected(u16),

    /// Raised when the auth endpoint succeeds without an access token.
    #[error("bearer token missing from API response")]
    MissingAccessToken,

    /// Raised when the token exchange fails in transit or returns garbage.
    #[error("error exchanging API token for bearer token: {0}")]
    TokenExchange(String),

    /// Raised when the custom field catalog endpoint answers with a failure status.
    #[error("failed to fetch custom fields for tenant {tenant} ({status})")]
    CatalogRejected { tenant: String, status: u16 },

    /// Raised when the custom field catalog cannot be fetched or decoded.
    #[error("error fetching custom field IDs: {0}")]
    CatalogFetch(String),

    /// Raised when the input table cannot be loaded.
    #[error("error processing CSV file '{}': {source}", .path.display())]
    Table {
        path: PathBuf,
        #[source]
        source: TableError,
    },

    /// Raised when a requested column holds a value that is not text.
    #[error("failed to cast field `{field}` to string: {cause}")]
    FieldCoercion { field: String, cause: String },

    /// Raised when a single request fails before a response arrives.
    #[error("transport error: {0}")]
    Transport(String),

    /// Raised when the tracing subscriber fails to initialise.
    #[error("failed to initialise logging: {0}")]
    Logging(String),
}

/// Failures while reading and shaping the input table.
#[derive(Debug, Error)]
pub enum TableError {
    #[error("{0}")]
    Csv(#[from] csv::Error),

    /// Every required column absent from the header row.
    #[error("missing required column(s): {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("row {row} has {found} fields but the header has {expected}")]
    RowTooWide {
        row: usize,
        expected: usize,
        found: usize,
    },
}
