use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file not found at {path:?}")]
    NotFound { path: PathBuf },

    #[error("failed to read config from {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config from {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("missing required field 'model.model' in configuration")]
    MissingModel,

    #[error("missing required field 'model.endpoint' in configuration")]
    MissingEndpoint,

    #[error("server '{server}' needs either 'command' or 'url'")]
    MissingTransport { server: String },

    #[error("server '{server}' sets both 'command' and 'url'")]
    ConflictingTransport { server: String },

    #[error("server '{server}' is declared more than once")]
    DuplicateServer { server: String },

    #[error("'agent.max_steps' must be at least 1")]
    ZeroMaxSteps,
}
