//! Issuer connector
//!
//! The wallet never talks HTTP itself. Everything it needs from a mint goes
//! through [`MintConnector`], one typed request and one typed response per
//! call. Issuer error payloads are resolved into [`WalletError`] before they
//! reach the wallet.

pub mod http;

pub use http::HttpMintConnector;

use crate::error::{ErrorCode, WalletError, WalletResult};
use crate::types::{BlindedMessage, BlindedSignature, KeysetId, MintKeys, Proof};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// =============================================================================
// Request / response bodies
// =============================================================================

/// Lightning invoice to pay in order to mint `amount`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestMintResponse {
    pub pr: String,
    pub hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MintRequest {
    pub outputs: Vec<BlindedMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostMintResponse {
    pub promises: Vec<BlindedSignature>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitRequest {
    pub proofs: Vec<Proof>,
    pub outputs: Vec<BlindedMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitResponse {
    pub promises: Vec<BlindedSignature>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeltRequest {
    pub pr: String,
    pub proofs: Vec<Proof>,
    pub outputs: Vec<BlindedMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeltResponse {
    pub paid: bool,
    #[serde(default)]
    pub preimage: Option<String>,
    #[serde(default)]
    pub change: Option<Vec<BlindedSignature>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckFeesRequest {
    pub pr: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckFeesResponse {
    pub fee: u64,
}

/// Secret of a proof whose state is being queried
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProofSecret {
    pub secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckSpendableRequest {
    pub proofs: Vec<ProofSecret>,
}

impl CheckSpendableRequest {
    pub fn for_proofs(proofs: &[Proof]) -> Self {
        Self {
            proofs: proofs
                .iter()
                .map(|p| ProofSecret {
                    secret: p.secret.clone(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckSpendableResponse {
    pub spendable: Vec<bool>,
}

// =============================================================================
// Response resolution
// =============================================================================

/// Error payload returned by an issuer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub detail: Option<String>,
}

impl MintErrorBody {
    pub fn message(&self) -> String {
        self.error
            .clone()
            .or_else(|| self.detail.clone())
            .unwrap_or_else(|| "Unknown mint error".to_string())
    }
}

impl From<MintErrorBody> for WalletError {
    fn from(body: MintErrorBody) -> Self {
        let err = WalletError::mint_error(body.message());
        match body.code {
            Some(code) => err.with_details(format!("code {}", code)),
            None => err,
        }
    }
}

/// Issuer reply resolved to either the expected body or an error payload
#[derive(Debug, Clone, PartialEq)]
pub enum MintResponse<T> {
    Success(T),
    Error(MintErrorBody),
}

impl<T: DeserializeOwned> MintResponse<T> {
    /// A body carrying a non-null `error` or `detail` field is an error
    /// payload; anything else must parse as `T`.
    pub fn from_value(value: Value) -> WalletResult<Self> {
        let is_error = ["error", "detail"]
            .iter()
            .any(|field| value.get(field).map_or(false, |v| !v.is_null()));

        if is_error {
            let body: MintErrorBody = serde_json::from_value(value)
                .map_err(|e| WalletError::parse_error(format!("Malformed mint error body: {}", e)))?;
            return Ok(MintResponse::Error(body));
        }

        serde_json::from_value(value)
            .map(MintResponse::Success)
            .map_err(|e| {
                WalletError::new(ErrorCode::ParseError, format!("Unexpected mint response: {}", e))
            })
    }

    pub fn parse(body: &str) -> WalletResult<Self> {
        let value: Value = serde_json::from_str(body)?;
        Self::from_value(value)
    }
}

impl<T> MintResponse<T> {
    pub fn into_result(self) -> WalletResult<T> {
        match self {
            MintResponse::Success(body) => Ok(body),
            MintResponse::Error(body) => Err(body.into()),
        }
    }
}

// =============================================================================
// Connector
// =============================================================================

/// Transport to one or more issuers
///
/// `mint_url` is passed on every call; a wallet receiving a token from a
/// foreign mint uses the same connector to reach it.
#[allow(async_fn_in_trait)]
pub trait MintConnector {
    /// Current keyset, or the keyset named by `keyset_id`
    async fn get_keys(&self, mint_url: &str, keyset_id: Option<&KeysetId>) -> WalletResult<MintKeys>;

    async fn request_mint(&self, mint_url: &str, amount: u64) -> WalletResult<RequestMintResponse>;

    async fn mint(&self, mint_url: &str, request: &MintRequest, hash: &str) -> WalletResult<PostMintResponse>;

    async fn split(&self, mint_url: &str, request: &SplitRequest) -> WalletResult<SplitResponse>;

    async fn melt(&self, mint_url: &str, request: &MeltRequest) -> WalletResult<MeltResponse>;

    async fn check_fees(&self, mint_url: &str, request: &CheckFeesRequest) -> WalletResult<CheckFeesResponse>;

    async fn check(&self, mint_url: &str, request: &CheckSpendableRequest) -> WalletResult<CheckSpendableResponse>;
}
