//! Hash-to-curve
//!
//! Deterministically maps a secret to a secp256k1 point. The SHA-256 digest
//! of the secret is tried as the x-coordinate of an even-parity compressed
//! point; when no such point exists the digest is hashed again.

use super::curve::{sha256, COMPRESSED_POINT_SIZE};
use super::{DhkeError, DhkeResult};
use secp256k1::PublicKey;

/// Retry budget for [`hash_to_curve`]. Each attempt succeeds with
/// probability about 1/2, so exhausting this is a broken hash, not bad luck.
pub const MAX_HASH_TO_CURVE_ATTEMPTS: u32 = 1 << 16;

/// Map `message` to a curve point
pub fn hash_to_curve(message: &[u8]) -> DhkeResult<PublicKey> {
    hash_to_curve_bounded(message, MAX_HASH_TO_CURVE_ATTEMPTS)
}

/// Same as [`hash_to_curve`] with an explicit attempt budget
pub fn hash_to_curve_bounded(message: &[u8], max_attempts: u32) -> DhkeResult<PublicKey> {
    let mut digest = sha256(message);

    for _ in 0..max_attempts {
        let mut candidate = [0u8; COMPRESSED_POINT_SIZE];
        candidate[0] = 0x02;
        candidate[1..].copy_from_slice(&digest);

        if let Ok(point) = PublicKey::from_slice(&candidate) {
            return Ok(point);
        }
        digest = sha256(&digest);
    }

    Err(DhkeError::HashToCurveExhausted(max_attempts))
}
