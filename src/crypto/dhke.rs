//! Blind Diffie-Hellman key exchange
//!
//! Wallet side of the blind signature round:
//!
//! ```text
//! wallet:  Y  = hash_to_curve(secret)
//!          B_ = Y + r·G                 (blind_message)
//! issuer:  C_ = k·B_                    (sign_blinded)
//! wallet:  C  = C_ - r·A = k·Y          (unblind_signature, A = k·G)
//! ```
//!
//! Secrets are 32 random bytes carried as standard base64 text; that text
//! is what gets hashed to the curve and what the issuer later sees in a
//! proof.

use super::curve::{add, base_mul, mul, random_scalar, sub};
use super::hash_to_curve::hash_to_curve;
use super::{DhkeError, DhkeResult};
use crate::types::{BlindedMessage, BlindedSignature, KeysetId, MintKeys, Proof};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use rand::rngs::OsRng;
use rand::RngCore;
use secp256k1::{PublicKey, SecretKey};
use std::fmt;
use zeroize::Zeroize;

/// Length of freshly generated secrets in bytes
pub const SECRET_SIZE: usize = 32;

/// Transport encoding of a raw secret
pub fn encode_secret(secret: &[u8]) -> String {
    BASE64.encode(secret)
}

/// Blind `secret` with `r`, drawing a fresh `r` when none is supplied.
///
/// Returns `(B_, r)`. The scalar must be kept until the issuer's signature
/// arrives; without it the signature cannot be unblinded.
pub fn blind_message(secret: &[u8], r: Option<SecretKey>) -> DhkeResult<(PublicKey, SecretKey)> {
    let encoded = encode_secret(secret);
    let y = hash_to_curve(encoded.as_bytes())?;
    let r = r.unwrap_or_else(random_scalar);
    let blinded = add(&y, &base_mul(&r))?;
    Ok((blinded, r))
}

/// `C = C_ - r·A`
pub fn unblind_signature(c_: &PublicKey, r: &SecretKey, a: &PublicKey) -> DhkeResult<PublicKey> {
    let ra = mul(a, r)?;
    sub(c_, &ra)
}

/// Issuer signing step `C_ = k·B_`
pub fn sign_blinded(k: &SecretKey, blinded: &PublicKey) -> DhkeResult<PublicKey> {
    mul(blinded, k)
}

/// Issuer check `C == k·hash_to_curve(secret)`
pub fn verify_signature(k: &SecretKey, c: &PublicKey, secret: &str) -> DhkeResult<bool> {
    let y = hash_to_curve(secret.as_bytes())?;
    Ok(mul(&y, k)? == *c)
}

/// One output of a blind signature round: the blinded point plus everything
/// needed to turn its signature into a proof
pub struct BlindedOutput {
    pub amount: u64,
    pub secret: String,
    pub r: SecretKey,
    pub blinded: PublicKey,
}

impl BlindedOutput {
    /// New output with a random secret and a random blinding factor
    pub fn random(amount: u64) -> DhkeResult<Self> {
        let mut bytes = [0u8; SECRET_SIZE];
        OsRng.fill_bytes(&mut bytes);
        let output = Self::from_secret_bytes(amount, &bytes, None);
        bytes.zeroize();
        output
    }

    pub fn from_secret_bytes(amount: u64, secret: &[u8], r: Option<SecretKey>) -> DhkeResult<Self> {
        let (blinded, r) = blind_message(secret, r)?;
        Ok(Self {
            amount,
            secret: encode_secret(secret),
            r,
            blinded,
        })
    }

    /// Wire form sent to the issuer
    pub fn message(&self) -> BlindedMessage {
        BlindedMessage {
            amount: self.amount,
            blinded: self.blinded,
        }
    }
}

impl fmt::Debug for BlindedOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlindedOutput")
            .field("amount", &self.amount)
            .field("blinded", &self.blinded)
            .finish_non_exhaustive()
    }
}

impl Drop for BlindedOutput {
    fn drop(&mut self) {
        self.secret.zeroize();
        self.r.non_secure_erase();
    }
}

/// Unblind issuer signatures into proofs.
///
/// Signature `i` is paired with output `i`. The public key is looked up by
/// the signature's keyset id and amount; a missing key is an error. Fewer
/// signatures than outputs is accepted (fee change fills a prefix of the
/// blank outputs), more is not.
pub fn construct_proofs<'k, F>(
    signatures: &[BlindedSignature],
    outputs: &[BlindedOutput],
    mut keys_for: F,
) -> DhkeResult<Vec<Proof>>
where
    F: FnMut(&KeysetId) -> Option<&'k MintKeys>,
{
    if signatures.len() > outputs.len() {
        return Err(DhkeError::SignatureCountMismatch {
            signatures: signatures.len(),
            outputs: outputs.len(),
        });
    }

    signatures
        .iter()
        .zip(outputs)
        .map(|(signature, output)| {
            let missing = || DhkeError::MissingKey {
                amount: signature.amount,
                keyset_id: signature.id.to_string(),
            };
            let a = keys_for(&signature.id)
                .and_then(|keys| keys.amount_key(signature.amount))
                .ok_or_else(missing)?;
            let c = unblind_signature(&signature.c, &output.r, a)?;

            Ok(Proof {
                id: signature.id.clone(),
                amount: signature.amount,
                secret: output.secret.clone(),
                c,
            })
        })
        .collect()
}
