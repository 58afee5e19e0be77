//! Cryptographic primitives for the wallet core
//!
//! This module provides the blind Diffie-Hellman key exchange used for
//! token issuance:
//! - secp256k1 group operations (point parsing, scalar multiplication, addition)
//! - Hash-to-curve mapping of secrets
//! - Message blinding, signature unblinding and proof construction

pub mod dhke;
pub mod hash_to_curve;
pub mod curve;

pub use dhke::*;
pub use hash_to_curve::*;

use thiserror::Error;

/// Errors raised by the curve and blinding primitives
#[derive(Error, Debug)]
pub enum DhkeError {
    #[error("Invalid curve point: {0}")]
    InvalidPoint(String),

    #[error("Invalid scalar: {0}")]
    InvalidScalar(String),

    #[error("Point operation produced the point at infinity")]
    PointAtInfinity,

    #[error("Hash-to-curve found no valid point after {0} attempts")]
    HashToCurveExhausted(u32),

    #[error("No public key for amount {amount} in keyset {keyset_id}")]
    MissingKey { amount: u64, keyset_id: String },

    #[error("Received {signatures} signatures for {outputs} blinded outputs")]
    SignatureCountMismatch { signatures: usize, outputs: usize },
}

/// Result type for curve and blinding operations
pub type DhkeResult<T> = Result<T, DhkeError>;
