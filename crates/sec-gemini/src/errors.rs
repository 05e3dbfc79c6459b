use reqwest::StatusCode;
use thiserror::Error;

/// Failures while assembling the client configuration. All of these are fatal
/// and happen before any network activity.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{env_var} environment variable not set")]
    MissingCredential { env_var: String },

    #[error("Invalid host '{host}': {source}")]
    InvalidHost {
        host: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Configuration error: {0}")]
    Other(#[from] config::ConfigError),
}

/// Failure of a single analysis round trip.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Authentication rejected ({status}): {body}")]
    Authentication { status: StatusCode, body: String },

    #[error("Request failed ({status}): {body}")]
    Status { status: StatusCode, body: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(#[source] serde_json::Error),

    #[error("Analysis cancelled")]
    Cancelled,
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Unknown tool '{0}'")]
    ToolNotFound(String),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Failed to render prompt: {0}")]
    Prompt(#[from] tera::Error),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),
}

pub type ToolResult<T> = Result<T, ToolError>;
