//! Error types for OpenAPI tool generation.

use thiserror::Error;

/// Result type for OpenAPI operations.
pub type Result<T> = std::result::Result<T, OpenApiError>;

/// Errors that can occur during OpenAPI tool generation and execution.
#[derive(Error, Debug)]
pub enum OpenApiError {
    /// Structurally invalid OpenAPI document
    #[error("Invalid OpenAPI document: {0}")]
    InvalidSpec(String),

    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// URL parsing error
    #[error("Invalid URL: {0}")]
    UrlError(#[from] url::ParseError),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// YAML parsing error
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Invalid parameter value
    #[error("Invalid parameter value for '{0}': {1}")]
    InvalidParameter(String, String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl OpenApiError {
    /// A short hint telling the operator how to fix a load failure.
    pub fn remediation(&self) -> &'static str {
        match self {
            OpenApiError::IoError(e) => match e.kind() {
                std::io::ErrorKind::NotFound => {
                    "Check that the document path exists and is spelled correctly."
                }
                std::io::ErrorKind::PermissionDenied => {
                    "Check the file permissions of the document."
                }
                _ => "Check that the document file is readable.",
            },
            OpenApiError::YamlError(_) => {
                "Fix the YAML syntax (indentation, quoting) and reload the document."
            }
            OpenApiError::JsonError(_) => {
                "Fix the JSON syntax (trailing commas, unbalanced braces) and reload the document."
            }
            OpenApiError::InvalidSpec(_) => {
                "Validate the document against the OpenAPI 3.0 schema; required fields such as `openapi`, `info` and `paths` must be present."
            }
            OpenApiError::HttpError(e) if e.is_timeout() => {
                "The server did not answer in time; retry or raise the timeout."
            }
            OpenApiError::HttpError(e) if e.is_connect() => {
                "Check network connectivity and that the URL host is reachable."
            }
            OpenApiError::HttpError(_) => "Check the URL and the server's response.",
            OpenApiError::UrlError(_) => "Use an absolute http(s) URL.",
            OpenApiError::InvalidParameter(..) => {
                "Check the argument against the tool's input schema."
            }
            OpenApiError::Other(_) => "See the error message for details.",
        }
    }
}

impl From<OpenApiError> for opentool_core::Error {
    fn from(err: OpenApiError) -> Self {
        opentool_core::Error::Other(anyhow::Error::new(err))
    }
}

impl From<opentool_core::Error> for OpenApiError {
    fn from(err: opentool_core::Error) -> Self {
        OpenApiError::Other(err.to_string())
    }
}
