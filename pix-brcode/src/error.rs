//! Error types for PIX payload and key handling

use thiserror::Error;

/// Result type alias for PIX operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while validating keys or building payloads
#[derive(Debug, Error)]
pub enum Error {
    /// Key is blank after trimming
    #[error("PIX key is required")]
    EmptyKey,

    /// Key matches none of the recognized formats, or is too long
    #[error("Invalid PIX key format: {0}")]
    InvalidKeyFormat(String),

    /// 11-digit key that could be either a CPF or a phone number
    #[error("Ambiguous PIX key (CPF or phone?): {0}")]
    AmbiguousKey(String),

    /// Negative or non-finite amount
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Amount expression could not be evaluated
    #[error("Invalid expression: {0}")]
    InvalidExpression(String),

    /// Payload text is not a well-formed BR Code
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// Trailing CRC does not match the payload contents
    #[error("Checksum mismatch: expected {expected}, found {found}")]
    ChecksumMismatch { expected: String, found: String },

    /// Recipient configuration is missing or unusable
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing error
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// I/O error while reading configuration
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// QR rendering failed
    #[cfg(feature = "qrcode")]
    #[error("QR generation failed: {0}")]
    QrCode(String),
}
