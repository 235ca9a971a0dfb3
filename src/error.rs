use thiserror::Error;

/// Errors surfaced by the dashboard library
#[derive(Debug, Error)]
pub enum DashboardError {
    /// The dataset could not be read or typed
    #[error("Load error: {0}")]
    Load(String),

    /// A registry entry is not internally consistent
    #[error("Malformed chart spec '{title}': {reason}")]
    MalformedSpec { title: String, reason: String },

    /// Configuration file unreadable or invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// Writing dashboard output failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DashboardError>;
