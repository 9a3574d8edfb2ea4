//! Error types for emberchain

use std::fmt;

#[derive(Debug, Clone)]
pub enum ChainError {
    MalformedRecord(String),
    CryptoError(String),
    TransactionInvalid(String),
    SignatureInvalid(String),
    WalkFailed(Box<ChainError>),
    IntegrityFailure(String),
    MiningExhausted,
    SerializationError(String),
    IoError(String),
}

impl fmt::Display for ChainError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ChainError::MalformedRecord(msg) => write!(f, "Malformed record: {}", msg),
            ChainError::CryptoError(msg) => write!(f, "Cryptographic error: {}", msg),
            ChainError::TransactionInvalid(msg) => write!(f, "Invalid transaction: {}", msg),
            ChainError::SignatureInvalid(msg) => write!(f, "Signature invalid: {}", msg),
            ChainError::WalkFailed(cause) => write!(f, "Chain walk failed: {}", cause),
            ChainError::IntegrityFailure(msg) => write!(f, "Integrity check failed: {}", msg),
            ChainError::MiningExhausted => {
                write!(f, "Exhausted the nonce space without meeting the difficulty target")
            }
            ChainError::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
            ChainError::IoError(msg) => write!(f, "IO error: {}", msg),
        }
    }
}

impl std::error::Error for ChainError {}

impl From<std::io::Error> for ChainError {
    fn from(err: std::io::Error) -> Self {
        ChainError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for ChainError {
    fn from(err: serde_json::Error) -> Self {
        ChainError::SerializationError(err.to_string())
    }
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, ChainError>;
