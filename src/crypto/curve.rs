//! secp256k1 group adapter
//!
//! Thin layer over the `secp256k1` crate exposing exactly the group
//! operations the blind signature scheme needs:
//! - Compressed point (de)serialization
//! - Scalar multiplication by the generator and by arbitrary points
//! - Point addition and subtraction
//! - SHA-256
//! - Uniformly random scalars from the OS RNG

use super::{DhkeError, DhkeResult};
use rand::rngs::OsRng;
use secp256k1::{All, PublicKey, Scalar, Secp256k1, SecretKey};
use sha2::{Digest, Sha256};
use std::sync::LazyLock;

/// Shared context; construction precomputes tables so it is built once
pub(crate) static SECP: LazyLock<Secp256k1<All>> = LazyLock::new(Secp256k1::new);

/// Size of a compressed SEC1 point
pub const COMPRESSED_POINT_SIZE: usize = 33;

/// Parse a compressed (or uncompressed) SEC1 point
pub fn point_from_bytes(bytes: &[u8]) -> DhkeResult<PublicKey> {
    PublicKey::from_slice(bytes).map_err(|e| DhkeError::InvalidPoint(e.to_string()))
}

/// Parse a hex encoded SEC1 point
pub fn point_from_hex(hex_str: &str) -> DhkeResult<PublicKey> {
    let bytes = hex::decode(hex_str.trim())
        .map_err(|e| DhkeError::InvalidPoint(format!("invalid hex: {}", e)))?;
    point_from_bytes(&bytes)
}

/// Compressed hex encoding used on the wire
pub fn point_to_hex(point: &PublicKey) -> String {
    hex::encode(point.serialize())
}

/// Parse a 32-byte big-endian scalar in `[1, n)`
pub fn scalar_from_bytes(bytes: &[u8]) -> DhkeResult<SecretKey> {
    SecretKey::from_slice(bytes).map_err(|e| DhkeError::InvalidScalar(e.to_string()))
}

/// Parse a hex scalar, left-padding short inputs to 32 bytes
pub fn scalar_from_hex(hex_str: &str) -> DhkeResult<SecretKey> {
    let trimmed = hex_str.trim().trim_start_matches("0x");
    if trimmed.len() > 64 {
        return Err(DhkeError::InvalidScalar(format!(
            "scalar must be at most 32 bytes, got {} hex chars",
            trimmed.len()
        )));
    }
    let padded = format!("{:0>64}", trimmed);
    let bytes = hex::decode(&padded)
        .map_err(|e| DhkeError::InvalidScalar(format!("invalid hex: {}", e)))?;
    scalar_from_bytes(&bytes)
}

/// Draw a fresh scalar from the operating system RNG
pub fn random_scalar() -> SecretKey {
    SecretKey::new(&mut OsRng)
}

/// `k·G`
pub fn base_mul(k: &SecretKey) -> PublicKey {
    PublicKey::from_secret_key(&SECP, k)
}

/// `k·P`
pub fn mul(point: &PublicKey, k: &SecretKey) -> DhkeResult<PublicKey> {
    point
        .mul_tweak(&SECP, &Scalar::from(*k))
        .map_err(|e| DhkeError::InvalidScalar(e.to_string()))
}

/// `P + Q`
pub fn add(p: &PublicKey, q: &PublicKey) -> DhkeResult<PublicKey> {
    p.combine(q).map_err(|_| DhkeError::PointAtInfinity)
}

/// `P - Q`
pub fn sub(p: &PublicKey, q: &PublicKey) -> DhkeResult<PublicKey> {
    add(p, &q.negate(&SECP))
}

/// SHA-256 digest
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}
