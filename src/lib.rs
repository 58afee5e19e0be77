//! Cashu Wallet Core Library
//!
//! Client-side engine of a Chaumian ecash wallet built on blind
//! Diffie-Hellman signatures over secp256k1.
//!
//! # Architecture
//!
//! This crate provides:
//! - **crypto**: Hash-to-curve, message blinding and signature unblinding
//! - **wallet**: Denomination splitting, keyset cache, mint/send/receive/melt flows
//! - **mint**: Issuer connector trait, request/response bodies, HTTP transport
//! - **token**: `cashuA` token text encoding
//! - **utils**: Logging with redaction, mint endpoint configuration
//!
//! The wallet holds no proofs. Callers pass proofs into each flow and
//! persist what comes back, including `new_keys` when the issuer rotated
//! its keyset.
//!
//! # Security
//!
//! Blinding factors and secrets of pending outputs are wiped on drop with
//! `zeroize`. Secrets and preimages never appear in log output.
//!
//! # Example
//!
//! ```rust,ignore
//! use cashu_wallet_core::{HttpMintConnector, MintConfig, Wallet};
//!
//! let config = MintConfig::new("https://mint.example.com").validated()?;
//! let mut wallet = Wallet::new(HttpMintConnector::new(&config)?, &config.mint_url);
//!
//! let quote = wallet.request_mint(64).await?;
//! // pay quote.pr, then
//! let minted = wallet.request_tokens(64, &quote.hash, None).await?;
//! let sent = wallet.send(21, &minted.proofs, None).await?;
//! ```

pub mod crypto;
pub mod error;
pub mod mint;
pub mod token;
pub mod types;
pub mod utils;
pub mod wallet;

// Re-export key types for convenience
pub use error::{ErrorCode, WalletError, WalletResult};
pub use types::*;

pub use crypto::{blind_message, hash_to_curve, unblind_signature, BlindedOutput};
pub use mint::{HttpMintConnector, MintConnector};
pub use token::{decode_token, encode_token};
pub use utils::MintConfig;
pub use wallet::{
    derive_keyset_id, split_amount, FailedEntry, KeysetCache, KeysetState, MeltResult, MintedProofs,
    ReceiveResult, SendResult, Wallet,
};
