use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures where a tool or resource could not produce any result.
///
/// Bad arguments and upstream error statuses are not errors; they come back
/// as flagged `ToolResponse`s.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("Tool '{tool}' execution failed: {source}")]
    ToolFailed {
        tool: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Tool '{0}' was cancelled before the request completed")]
    Cancelled(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Helper for wrapping a failure raised while a tool was running
    pub fn tool_failed(tool: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        Error::ToolFailed {
            tool: tool.into(),
            source: source.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_tool_failed_keeps_source() {
        let err = Error::tool_failed("getPet", anyhow::anyhow!("connection refused"));
        assert_eq!(
            err.to_string(),
            "Tool 'getPet' execution failed: connection refused"
        );
        assert!(err.source().is_some());
    }
}
