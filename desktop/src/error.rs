// ============================================================================
// Error Types
// ============================================================================

/// Environment-level failures. Window operations themselves never error;
/// they degrade to no-ops.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum DesktopError {
    #[error("Mount container is not attached")]
    ContainerMissing,

    #[error("App not found: {0}")]
    UnknownApp(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<anyhow::Error> for DesktopError {
    fn from(e: anyhow::Error) -> Self {
        DesktopError::Config(e.to_string())
    }
}

/// Failure reported by an application's content initialization
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum AppError {
    #[error("Content init failed: {0}")]
    InitFailed(String),
}
