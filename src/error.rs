//! Unified error types for the wallet core
//!
//! All errors flow through this module so callers can tell issuer
//! rejections apart from local validation failures.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Main error type for all wallet operations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletError {
    pub code: ErrorCode,
    pub message: String,
    pub details: Option<String>,
}

impl WalletError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    // Convenience constructors
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, msg)
    }

    pub fn invalid_amount(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidAmount, msg)
    }

    pub fn invalid_preference(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidPreference, msg)
    }

    pub fn invalid_token(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidToken, msg)
    }

    pub fn invalid_mint_url(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidMintUrl, msg)
    }

    pub fn insufficient_funds(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InsufficientFunds, msg)
    }

    pub fn missing_key(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::MissingKey, msg)
    }

    /// Issuer rejected the request
    pub fn mint_error(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::MintError, msg)
    }

    pub fn network_error(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::NetworkError, msg)
    }

    pub fn parse_error(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ParseError, msg)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, msg)
    }

    /// True when the issuer answered with an error shape
    pub fn is_protocol(&self) -> bool {
        self.code == ErrorCode::MintError
    }

    /// True for failures raised before any request reaches the issuer
    pub fn is_local(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::InvalidInput
                | ErrorCode::InvalidAmount
                | ErrorCode::InvalidPreference
                | ErrorCode::InvalidToken
                | ErrorCode::InvalidMintUrl
                | ErrorCode::InsufficientFunds
                | ErrorCode::MissingKey
        )
    }
}

impl fmt::Display for WalletError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)?;
        if let Some(ref details) = self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for WalletError {}

/// Error codes for categorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    // Local validation errors
    InvalidInput,
    InvalidAmount,
    InvalidPreference,
    InvalidToken,
    InvalidMintUrl,
    InsufficientFunds,
    MissingKey,

    // Issuer errors
    MintError,

    // Transport errors
    NetworkError,
    Timeout,

    // Crypto errors
    CryptoError,
    HashToCurveExhausted,

    // Parse errors
    ParseError,
    JsonError,
    HexError,

    // Internal
    Internal,
}

/// Result type alias for wallet operations
pub type WalletResult<T> = Result<T, WalletError>;

// Conversions from common error types

impl From<serde_json::Error> for WalletError {
    fn from(e: serde_json::Error) -> Self {
        WalletError::new(ErrorCode::JsonError, e.to_string())
    }
}

impl From<hex::FromHexError> for WalletError {
    fn from(e: hex::FromHexError) -> Self {
        WalletError::new(ErrorCode::HexError, e.to_string())
    }
}

impl From<base64::DecodeError> for WalletError {
    fn from(e: base64::DecodeError) -> Self {
        WalletError::new(ErrorCode::ParseError, format!("Base64 error: {}", e))
    }
}

impl From<url::ParseError> for WalletError {
    fn from(e: url::ParseError) -> Self {
        WalletError::new(ErrorCode::InvalidMintUrl, e.to_string())
    }
}

impl From<reqwest::Error> for WalletError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            WalletError::new(ErrorCode::Timeout, "Request timed out")
        } else if e.is_connect() {
            WalletError::new(ErrorCode::NetworkError, "Connection failed")
        } else {
            WalletError::new(ErrorCode::NetworkError, e.to_string())
        }
    }
}

impl From<secp256k1::Error> for WalletError {
    fn from(e: secp256k1::Error) -> Self {
        WalletError::new(ErrorCode::CryptoError, format!("Secp256k1 error: {}", e))
    }
}

impl From<crate::crypto::DhkeError> for WalletError {
    fn from(e: crate::crypto::DhkeError) -> Self {
        use crate::crypto::DhkeError;

        let code = match &e {
            DhkeError::HashToCurveExhausted(_) => ErrorCode::HashToCurveExhausted,
            DhkeError::MissingKey { .. } => ErrorCode::MissingKey,
            DhkeError::SignatureCountMismatch { .. } => ErrorCode::MintError,
            _ => ErrorCode::CryptoError,
        };
        WalletError::new(code, e.to_string())
    }
}
