//! Shared types for the wallet core
//!
//! All data structures that cross module boundaries are defined here
//! for consistent serialization. Curve points serialize as compressed
//! SEC1 hex strings and amounts as JSON integers.

use crate::error::{WalletError, WalletResult};
use secp256k1::PublicKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// =============================================================================
// Keysets
// =============================================================================

/// Identifier of one issuer keyset
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeysetId(pub String);

impl KeysetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Form usable in a URL path segment
    pub fn url_safe(&self) -> String {
        self.0.replace('/', "_").replace('+', "-")
    }
}

impl fmt::Display for KeysetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for KeysetId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Issuer public keys of one keyset, keyed by denomination
///
/// Iteration order is ascending by amount, which keyset id derivation
/// relies on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MintKeys(pub BTreeMap<u64, PublicKey>);

impl MintKeys {
    pub fn new(keys: BTreeMap<u64, PublicKey>) -> Self {
        Self(keys)
    }

    /// Public key for a single denomination
    pub fn amount_key(&self, amount: u64) -> Option<&PublicKey> {
        self.0.get(&amount)
    }

    pub fn amounts(&self) -> impl Iterator<Item = u64> + '_ {
        self.0.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&u64, &PublicKey)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// =============================================================================
// Blind signature round
// =============================================================================

/// Blinded message sent to the issuer for signing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlindedMessage {
    pub amount: u64,
    /// Blinded secret `B_`
    #[serde(rename = "B_")]
    pub blinded: PublicKey,
}

/// Issuer signature on a [`BlindedMessage`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlindedSignature {
    pub id: KeysetId,
    pub amount: u64,
    /// Blinded signature `C_`
    #[serde(rename = "C_")]
    pub c: PublicKey,
}

/// Spendable unit of value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof {
    pub id: KeysetId,
    pub amount: u64,
    pub secret: String,
    /// Unblinded signature `C`
    #[serde(rename = "C")]
    pub c: PublicKey,
}

impl Proof {
    /// Checks the local invariants: single power-of-two denomination, non-empty secret
    pub fn validate(&self) -> WalletResult<()> {
        if !self.amount.is_power_of_two() {
            return Err(WalletError::invalid_amount(format!(
                "Proof amount {} is not a power of two",
                self.amount
            )));
        }
        if self.secret.is_empty() {
            return Err(WalletError::invalid_token("Proof has an empty secret"));
        }
        Ok(())
    }
}

/// Sum of proof amounts, failing on overflow
pub fn sum_proofs(proofs: &[Proof]) -> WalletResult<u64> {
    proofs.iter().try_fold(0u64, |acc, p| {
        acc.checked_add(p.amount)
            .ok_or_else(|| WalletError::invalid_amount("Proof amounts overflow u64"))
    })
}

/// Explicit denomination request: `count` outputs of `amount` each
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmountPreference {
    pub amount: u64,
    pub count: u64,
}

impl AmountPreference {
    pub fn new(amount: u64, count: u64) -> Self {
        Self { amount, count }
    }
}

// =============================================================================
// Tokens
// =============================================================================

/// Proofs issued by one mint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenEntry {
    pub mint: String,
    pub proofs: Vec<Proof>,
}

impl TokenEntry {
    pub fn new(mint: impl Into<String>, proofs: Vec<Proof>) -> Self {
        Self {
            mint: mint.into(),
            proofs,
        }
    }

    pub fn amount(&self) -> WalletResult<u64> {
        sum_proofs(&self.proofs)
    }

    /// Checks the entry names a mint and every proof is well formed
    pub fn validate(&self) -> WalletResult<()> {
        if self.mint.trim().is_empty() {
            return Err(WalletError::invalid_token("Token entry has no mint URL"));
        }
        if self.proofs.is_empty() {
            return Err(WalletError::invalid_token("Token entry has no proofs"));
        }
        for proof in &self.proofs {
            proof.validate()?;
        }
        self.amount().map(|_| ())
    }
}

/// Transport envelope grouping proofs by issuing mint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub token: Vec<TokenEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
}

impl Token {
    pub fn new(entries: Vec<TokenEntry>) -> Self {
        Self {
            token: entries,
            memo: None,
        }
    }

    pub fn with_memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = Some(memo.into());
        self
    }

    pub fn total_amount(&self) -> WalletResult<u64> {
        self.token.iter().try_fold(0u64, |acc, entry| {
            acc.checked_add(entry.amount()?)
                .ok_or_else(|| WalletError::invalid_amount("Token amount overflows u64"))
        })
    }

    /// Merge entries sharing a mint, drop empty entries, and stably sort
    /// each entry's proofs by keyset id
    pub fn cleaned(&self) -> Token {
        let mut merged: Vec<TokenEntry> = Vec::new();

        for entry in &self.token {
            if entry.proofs.is_empty() {
                continue;
            }
            match merged.iter_mut().find(|e| e.mint == entry.mint) {
                Some(existing) => existing.proofs.extend(entry.proofs.iter().cloned()),
                None => merged.push(entry.clone()),
            }
        }

        for entry in &mut merged {
            entry.proofs.sort_by(|a, b| a.id.cmp(&b.id));
        }

        Token {
            token: merged,
            memo: self.memo.clone(),
        }
    }

    /// Checks every entry
    pub fn validate(&self) -> WalletResult<()> {
        if self.token.is_empty() {
            return Err(WalletError::invalid_token("Token has no entries"));
        }
        self.token.iter().try_for_each(TokenEntry::validate)
    }
}
