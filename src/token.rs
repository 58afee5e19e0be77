//! Token text encoding
//!
//! `cashuA` followed by URL-safe base64 of the token JSON. Decoding is
//! lenient: the prefix is optional, either base64 alphabet is accepted with
//! or without padding, and the older `{ proofs, mints }` layout is converted
//! on the fly.

use crate::error::{WalletError, WalletResult};
use crate::types::{KeysetId, Proof, Token, TokenEntry};
use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, URL_SAFE_NO_PAD};
use base64::engine::DecodePaddingMode;
use base64::Engine as _;
use serde::Deserialize;

/// Version prefix of serialized tokens
pub const TOKEN_PREFIX: &str = "cashuA";

const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Serialize a token to its text form
pub fn encode_token(token: &Token) -> WalletResult<String> {
    let json = serde_json::to_vec(token)?;
    Ok(format!("{}{}", TOKEN_PREFIX, URL_SAFE_NO_PAD.encode(json)))
}

/// Parse a token from text
pub fn decode_token(text: &str) -> WalletResult<Token> {
    let text = text.trim();
    let body = match text.strip_prefix(TOKEN_PREFIX) {
        Some(body) => body,
        None if text.starts_with("cashu") => {
            return Err(WalletError::invalid_token(format!(
                "Unsupported token version: {}",
                text.chars().take(6).collect::<String>()
            )));
        }
        None => text,
    };

    if body.is_empty() {
        return Err(WalletError::invalid_token("Token is empty"));
    }

    let normalized = body.replace('-', "+").replace('_', "/");
    let json = LENIENT
        .decode(normalized.as_bytes())
        .map_err(|e| WalletError::invalid_token(format!("Token is not valid base64: {}", e)))?;

    let wire: WireToken = serde_json::from_slice(&json)
        .map_err(|e| WalletError::invalid_token(format!("Token JSON not recognized: {}", e)))?;
    Ok(wire.into_token())
}

/// Mint entry of the older layout: URL plus the keyset ids it issued
#[derive(Deserialize)]
struct LegacyMint {
    url: String,
    ids: Vec<KeysetId>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireToken {
    Current(Token),
    Legacy {
        proofs: Vec<Proof>,
        #[serde(default)]
        mints: Vec<LegacyMint>,
    },
}

impl WireToken {
    fn into_token(self) -> Token {
        match self {
            WireToken::Current(token) => token,
            WireToken::Legacy { proofs, mints } => {
                // Each proof goes to the first mint listing its keyset id
                let mut entries: Vec<TokenEntry> = mints
                    .iter()
                    .map(|m| TokenEntry::new(m.url.clone(), Vec::new()))
                    .collect();
                let mut unassigned = Vec::new();

                for proof in proofs {
                    match mints.iter().position(|m| m.ids.contains(&proof.id)) {
                        Some(idx) => entries[idx].proofs.push(proof),
                        None => unassigned.push(proof),
                    }
                }
                if !unassigned.is_empty() {
                    entries.push(TokenEntry::new(String::new(), unassigned));
                }

                Token::new(entries.into_iter().filter(|e| !e.proofs.is_empty()).collect())
            }
        }
    }
}
