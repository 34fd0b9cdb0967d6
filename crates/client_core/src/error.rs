use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("validation transport failed: {0}")]
    Transport(String),
    #[error("validation response could not be decoded: {0}")]
    Decode(String),
    #[error("validation request timed out after {0:?}")]
    Timeout(Duration),
}

impl From<reqwest::Error> for ValidationError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ValidationError::Decode(err.to_string())
        } else {
            ValidationError::Transport(err.to_string())
        }
    }
}
