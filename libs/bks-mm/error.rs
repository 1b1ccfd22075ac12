use thiserror::Error;

/// Errors from the Auth component (C1).
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("network error while authorizing: {0}")]
    Network(#[from] reqwest::Error),

    #[error("identity provider rejected refresh token: status {status} body {body}")]
    Rejected { status: u16, body: String },

    #[error("exhausted {attempts} authorization attempts")]
    Exhausted { attempts: u32 },

    #[error("malformed token response: {0}")]
    MalformedResponse(String),
}

/// Errors from the broker REST client (C2).
#[derive(Error, Debug)]
pub enum RestError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("access token expired or rejected (401)")]
    Unauthorized,

    #[error("broker rejected request: status {status} body {body}")]
    Business { status: u16, body: String },

    #[error("malformed response body: {0}")]
    MalformedResponse(String),
}

impl RestError {
    /// Per the redesign flag in SPEC_FULL.md §9: only 5xx and network
    /// failures are worth retrying. 401 triggers re-auth upstream; other
    /// 4xx responses are a business-level rejection, not a transient fault.
    pub fn is_retryable(&self) -> bool {
        match self {
            RestError::Network(_) => true,
            RestError::Unauthorized => false,
            RestError::Business { status, .. } => *status >= 500,
            RestError::MalformedResponse(_) => false,
        }
    }
}

/// Errors surfaced by the two WebSocket feeds (C2).
#[derive(Error, Debug)]
pub enum WsError {
    #[error("websocket error: {0}")]
    Transport(#[from] hypersockets::HyperSocketError),

    #[error("malformed message: {0}")]
    MalformedMessage(String),
}

/// Configuration load/validation errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    FileError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("missing required environment variable: {0}")]
    EnvVarMissing(String),

    #[error("invalid configuration: {0}")]
    ValidationError(String),
}

/// Fatal conditions that terminate the supervisor. The CLI binary maps
/// these to the process exit codes named in the external-interfaces
/// contract: `Auth` -> 1, everything else -> 2.
#[derive(Error, Debug)]
pub enum FatalError {
    #[error("authorization failed: {0}")]
    Auth(#[from] AuthError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("supervised task failed: {0}")]
    TaskFailed(String),
}

impl FatalError {
    pub fn exit_code(&self) -> i32 {
        match self {
            FatalError::Auth(_) => 1,
            FatalError::Config(_) | FatalError::TaskFailed(_) => 2,
        }
    }
}
