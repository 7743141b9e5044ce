//! Error types for card_price_check

use thiserror::Error;

/// Unified error type for card price check operations
#[derive(Debug, Error)]
pub enum PriceCheckError {
    /// Upload is not a supported raster image or exceeds the size ceiling
    #[error("invalid image: {0}")]
    InvalidImage(String),
    /// The vision model answered, but no card identification could be parsed
    /// from its reply
    #[error("could not parse card identification: {0}")]
    IdentificationParse(String),
    /// The vision API itself failed (network, auth, rate limit, server error)
    #[error("card identification unavailable: {0}")]
    IdentificationUnavailable(String),
    /// HTTP request failed (network error, timeout, etc.)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP error status code from the card database
    #[error("HTTP error: {0}")]
    HttpStatus(reqwest::StatusCode),
    /// Failed to parse a JSON response
    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),
    /// Card id unknown to the card database
    #[error("card not found: {0}")]
    CardNotFound(String),
}

/// Result alias for card price check operations
pub type Result<T> = std::result::Result<T, PriceCheckError>;
