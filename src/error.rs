use std::process::ExitStatus;

pub type ProviderResult<T> = Result<T, ProviderError>;

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },

    #[error("{operation} failed for '{id}' (HTTP {status}): {body} [request: {request}]")]
    Api {
        operation: String,
        id: String,
        status: u16,
        request: String,
        body: String,
    },

    #[error("{operation} failed for '{id}': {message} [request: {request}]")]
    Transport {
        operation: String,
        id: String,
        request: String,
        message: String,
    },

    #[error("invalid configuration: {0}")]
    Validation(String),

    #[error(
        "deleting service '{service_id}' of app '{app_id}' failed, \
         the app was left in place: {source}"
    )]
    PartialDeletion {
        app_id: String,
        service_id: String,
        #[source]
        source: Box<ProviderError>,
    },

    #[error("{kind} field '{field}' cannot change in place, the resource must be replaced")]
    ForceNew {
        kind: &'static str,
        field: &'static str,
    },

    #[error("operation cancelled: {0}")]
    Cancelled(String),

    #[error("command failed: {command}")]
    CommandFailed { command: String, status: ExitStatus },

    #[error("command not found: {0}")]
    CommandNotFound(String),

    #[error("environment variable missing: {0}")]
    EnvMissing(String),

    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

impl ProviderError {
    /// Whether the remote reported the resource as missing.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}
