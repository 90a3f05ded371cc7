use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DashError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl DashError {
    /// Message suitable for a user-facing notification.
    pub fn user_message(&self) -> String {
        match self {
            DashError::Network(msg)
            | DashError::Validation(msg)
            | DashError::Config(msg)
            | DashError::Io(msg) => msg.clone(),
        }
    }

    pub fn is_network(&self) -> bool {
        matches!(self, DashError::Network(_))
    }
}

impl From<std::io::Error> for DashError {
    fn from(err: std::io::Error) -> Self {
        DashError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for DashError {
    fn from(err: serde_json::Error) -> Self {
        DashError::Io(err.to_string())
    }
}

impl From<anyhow::Error> for DashError {
    fn from(err: anyhow::Error) -> Self {
        DashError::Config(err.to_string())
    }
}
