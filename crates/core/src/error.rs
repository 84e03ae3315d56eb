use std::path::PathBuf;

use thiserror::Error;

use crate::types::MacroId;

#[derive(Debug, Error)]
pub enum ChicoError {
    /// Rejected editor input (empty name, missing selection, bad numbers).
    #[error("invalid macro: {0}")]
    Validation(String),

    /// No window is targeted, or the targeted window is gone.
    #[error("target unavailable: {0}")]
    TargetUnavailable(String),

    #[error("no macro {0}")]
    UnknownMacro(MacroId),

    #[error("failed to access profile {}: {source}", .path.display())]
    ProfileIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed profile {}: {source}", .path.display())]
    ProfileFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T, E = ChicoError> = std::result::Result<T, E>;
