use std::io;

use retrophoto_core::config::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] retrophoto_core::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Cannot read photo {path}: {source}")]
    ReadPhoto {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("Cannot infer image type of {0}; pass --content-type")]
    UnknownContentType(String),
    #[error("Sync incomplete: {0}")]
    SyncIncomplete(String),
}

impl CliError {
    /// Follow-up advice printed under the error message
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::Core(error) if error.is_storage_unavailable() => {
                Some("check that --db-path points to a writable location")
            }
            Self::Config(ConfigError::MissingVar(_)) => {
                Some("set it in the environment or in a .env file")
            }
            Self::SyncIncomplete(_) => Some("run `retrophoto sync` again once the network is back"),
            _ => None,
        }
    }
}
