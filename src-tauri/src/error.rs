//! Error type shared by the shell

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ShellError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid preference record: {0}")]
    Json(#[from] serde_json::Error),

    #[error("window is no longer available")]
    WindowGone,

    #[error("script execution failed: {0}")]
    Script(String),

    #[error("readiness probe got no reply within {0:?}")]
    ProbeTimeout(Duration),

    #[error("resolution {width}x{height} is outside the allowed range")]
    InvalidResolution { width: u32, height: u32 },

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error(transparent)]
    Tauri(#[from] tauri::Error),
}

impl From<ShellError> for String {
    fn from(e: ShellError) -> Self {
        e.to_string()
    }
}
