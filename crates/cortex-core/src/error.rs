#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Invalid package name format")]
    InvalidInput,

    #[error(
        "No credentials found: set ANTHROPIC_API_KEY or OPENAI_API_KEY before running install"
    )]
    MissingCredentials,

    #[error("Planner failed: {0}")]
    PlannerFailed(String),

    #[error("Timeout waiting for sudo password")]
    ElevationTimeout,

    #[error("Command failed: {0}")]
    CommandFailed(String),

    #[error("cancelled by user")]
    Cancelled,

    #[error("an operation is already in progress")]
    OperationInProgress,

    #[error("sampler error: {0}")]
    SamplerError(String),

    #[error("audit write error: {0}")]
    AuditWriteError(String),
}
