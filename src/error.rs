use std::path::PathBuf;
use thiserror::Error;

/// Failure reported by the Bitbucket backend or the HTTP transport in front of it.
#[derive(Debug, Clone, Error)]
pub enum BitbucketError {
    #[error("Bitbucket API Error: {message} ({})", status_text(.status))]
    Api { message: String, status: Option<u16> },

    #[error("failed to decode Bitbucket response from {url}: {reason}")]
    Decode { url: String, reason: String },
}

impl BitbucketError {
    pub fn api(message: impl Into<String>, status: Option<u16>) -> Self {
        Self::Api {
            message: message.into(),
            status,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => *status,
            Self::Decode { .. } => None,
        }
    }
}

fn status_text(status: &Option<u16>) -> String {
    status.map_or_else(|| "unknown".to_string(), |s| s.to_string())
}

/// Failure raised by an operation or prompt handler.
#[derive(Debug, Error)]
pub enum OperationError {
    #[error(transparent)]
    Backend(#[from] BitbucketError),

    #[error("invalid arguments: {0}")]
    InvalidArguments(#[source] serde_json::Error),

    #[error("failed to serialize result: {0}")]
    Serialize(#[source] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Unknown tool: {0}")]
    UnknownOperation(String),

    #[error("Unknown prompt: {0}")]
    UnknownPrompt(String),
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("operation '{0}' is registered more than once")]
    DuplicateOperation(String),

    #[error("prompt '{0}' is registered more than once")]
    DuplicatePrompt(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("BITBUCKET_TOKEN environment variable is required (or set `token` in {0})")]
    MissingToken(String),

    #[error("failed to read config file: {path}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write config file: {path}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to create directory: {path}")]
    DirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("failed to determine config directory; pass --config")]
    ConfigDirNotFound,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_embeds_status() {
        let err = BitbucketError::api("Pull request 7 does not exist", Some(404));
        assert_eq!(
            err.to_string(),
            "Bitbucket API Error: Pull request 7 does not exist (404)"
        );
    }

    #[test]
    fn api_error_without_status_says_unknown() {
        let err = BitbucketError::api("connection refused", None);
        assert_eq!(
            err.to_string(),
            "Bitbucket API Error: connection refused (unknown)"
        );
    }

    #[test]
    fn operation_error_is_transparent_over_backend() {
        let err: OperationError = BitbucketError::api("boom", Some(500)).into();
        assert_eq!(err.to_string(), "Bitbucket API Error: boom (500)");
    }
}
