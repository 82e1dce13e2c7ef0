//! Blueprint-level error types.

use rf_core::RfError;
use thiserror::Error;

pub type BlueprintResult<T> = Result<T, BlueprintError>;

#[derive(Error, Debug)]
pub enum BlueprintError {
    #[error("{0}")]
    Core(#[from] RfError),

    #[error("Invalid blueprint configuration: {reason}")]
    InvalidConfiguration { reason: String },

    #[error("Blueprint contains a cycle")]
    CycleDetected,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_errors_pass_their_message_through() {
        let err = BlueprintError::from(RfError::MergeConflict {
            key: "PixelType".to_string(),
        });
        assert!(err.to_string().contains("PixelType"));
    }
}
