use std::io;

use stockpile_core::envelope::ErrorEnvelope;
use stockpile_core::resolve::ResolutionError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] stockpile_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Request timed out")]
    Timeout,
    #[error("Network error: {0}")]
    Network(String),
    #[error("Server rejected request: {}: {}", .0.error.code, .0.error.message)]
    Api(ErrorEnvelope),
    #[error("Invalid product ID: {0}")]
    InvalidId(String),
    #[error("No fields to update; pass at least one of --name, --sku, --quantity, --price-cents")]
    NoFields,
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
    #[error("Configuration error: {0}")]
    Config(String),
}

impl CliError {
    /// True for failures worth queueing for a later retry: the request
    /// never reached the server
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout | Self::Network(_))
    }
}
