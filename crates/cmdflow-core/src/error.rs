use thiserror::Error;

#[derive(Debug, Error)]
pub enum CmdflowError {
    #[error("not initialized: run 'cmdflow init'")]
    NotInitialized,

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("invalid time window '{0}': expected <n>s, <n>m, <n>h, <n>d or <n>w")]
    InvalidWindow(String),

    #[error("malformed record for '{command}': {reason}")]
    MalformedRecord { command: String, reason: String },

    #[error("execution store error: {0}")]
    Store(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CmdflowError>;
