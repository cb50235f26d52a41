// Detection Errors

use crate::services::providers::ProviderError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DetectError {
    #[error("text too short for analysis: {chars} characters, need at least {min}")]
    InputTooShort { chars: usize, min: usize },

    /// Only surfaced when the configuration marks the remote classifier as required.
    #[error("external classifier unavailable: {0}")]
    ExternalUnavailable(#[source] ProviderError),
}
