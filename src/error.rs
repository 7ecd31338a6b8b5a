use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures surfaced by the branch-apply pipeline.
#[derive(Debug, Error)]
pub enum Error {
    /// Network or remote API failure.
    #[error("{0}")]
    Transport(String),

    /// Malformed remote API response.
    #[error("unreadable API response: {0}")]
    Parse(String),

    /// Archive unreadable or destination unwritable.
    #[error("{0}")]
    Extraction(String),

    /// A build step exited non-zero or could not be started.
    #[error("Error running {step}: {output}")]
    Build { step: String, output: String },

    #[error("{0}")]
    Validation(String),
}

impl Error {
    pub fn transport(err: impl std::fmt::Display) -> Self {
        Self::Transport(err.to_string())
    }

    pub fn extraction(context: &str, err: impl std::fmt::Display) -> Self {
        Self::Extraction(format!("{context}: {err}"))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}
