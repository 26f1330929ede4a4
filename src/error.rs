use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Retry throttled: try again in {remaining_ms} ms")]
    RetryThrottled { remaining_ms: u64 },
    #[error("No pool selected")]
    NoSelection,
    #[error("Invalid command template: {0}")]
    InvalidTemplate(String),
    #[error("Wallet address is empty")]
    MissingAddress,
    #[error("Miner executable not found: {0}")]
    ExecutableNotFound(String),
    #[error("Mining is not supported on this platform")]
    UnsupportedPlatform,
    #[error("Failed to launch miner: {0}")]
    LaunchFailed(String),
    #[error("Miner process error: {0}")]
    ProcessRuntime(String),
    #[error("Network failure: {0}")]
    NetworkFailure(String),
    #[error("Config error: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// Presentation layers receive errors as plain strings
impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
