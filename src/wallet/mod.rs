//! Wallet Module
//!
//! Orchestrates the issuer round trips: minting proofs for a paid invoice,
//! splitting proofs to send an exact amount, receiving tokens, and melting
//! proofs to pay a Lightning invoice. Every round that returns signatures
//! ends with a keyset rotation check whose result is handed back to the
//! caller as `new_keys`.

pub mod keyset;
pub mod outputs;
pub mod split;

#[cfg(test)]
pub(crate) mod testing;

pub use keyset::*;
pub use outputs::*;
pub use split::*;

use crate::error::{WalletError, WalletResult};
use crate::mint::{
    CheckFeesRequest, CheckSpendableRequest, MeltRequest, MintConnector, MintRequest, RequestMintResponse,
    SplitRequest,
};
use crate::token::decode_token;
use crate::types::{sum_proofs, AmountPreference, BlindedSignature, KeysetId, MintKeys, Proof, Token, TokenEntry};
use crate::{log_debug, log_error, log_info, log_warn};

const MODULE: &str = "wallet";

/// Proofs minted for a paid invoice
#[derive(Debug, Clone)]
pub struct MintedProofs {
    pub proofs: Vec<Proof>,
    pub new_keys: Option<MintKeys>,
}

/// Outcome of [`Wallet::send`]
#[derive(Debug, Clone)]
pub struct SendResult {
    /// Change from the split followed by the proofs that were not selected
    pub keep: Vec<Proof>,
    /// Proofs summing exactly to the requested amount
    pub send: Vec<Proof>,
    pub new_keys: Option<MintKeys>,
}

/// Token entry that could not be redeemed, with the reason
#[derive(Debug, Clone)]
pub struct FailedEntry {
    pub entry: TokenEntry,
    pub error: WalletError,
}

/// Outcome of [`Wallet::receive`]
#[derive(Debug, Clone)]
pub struct ReceiveResult {
    /// Fresh proofs, grouped by the mint that issued them
    pub received: Token,
    pub failed: Vec<FailedEntry>,
    pub new_keys: Option<MintKeys>,
}

impl ReceiveResult {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn proofs(&self) -> impl Iterator<Item = &Proof> {
        self.received.token.iter().flat_map(|e| e.proofs.iter())
    }
}

/// Outcome of [`Wallet::pay_invoice`]
#[derive(Debug, Clone)]
pub struct MeltResult {
    pub is_paid: bool,
    pub preimage: Option<String>,
    /// Fee overpayment returned through the blank outputs
    pub change: Vec<Proof>,
    pub new_keys: Option<MintKeys>,
}

fn same_mint(a: &str, b: &str) -> bool {
    a.trim().trim_end_matches('/') == b.trim().trim_end_matches('/')
}

/// Keyset ids of a signature batch, first appearance order
fn distinct_ids(signatures: &[BlindedSignature]) -> Vec<KeysetId> {
    let mut ids: Vec<KeysetId> = Vec::new();
    for signature in signatures {
        if !ids.contains(&signature.id) {
            ids.push(signature.id.clone());
        }
    }
    ids
}

fn check_signature_count(signatures: &[BlindedSignature], outputs: &BlindedOutputs) -> WalletResult<()> {
    if signatures.len() != outputs.len() {
        log_error!(
            MODULE,
            "Signature count mismatch",
            signatures = signatures.len(),
            outputs = outputs.len()
        );
        return Err(WalletError::mint_error(format!(
            "Mint returned {} signatures for {} outputs",
            signatures.len(),
            outputs.len()
        )));
    }
    Ok(())
}

/// Wallet bound to one issuer
///
/// Holds no proofs; callers pass proofs in and persist what comes back.
pub struct Wallet<C: MintConnector> {
    client: C,
    mint_url: String,
    keysets: KeysetCache,
}

impl<C: MintConnector> Wallet<C> {
    pub fn new(client: C, mint_url: impl Into<String>) -> Self {
        Self {
            client,
            mint_url: mint_url.into(),
            keysets: KeysetCache::new(),
        }
    }

    /// Wallet seeded with keys persisted from an earlier session
    pub fn with_keys(client: C, mint_url: impl Into<String>, keys: MintKeys) -> Self {
        Self {
            client,
            mint_url: mint_url.into(),
            keysets: KeysetCache::with_keys(keys),
        }
    }

    pub fn mint_url(&self) -> &str {
        &self.mint_url
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn keyset_id(&self) -> Option<&KeysetId> {
        self.keysets.current_id()
    }

    pub fn keys(&self) -> Option<&MintKeys> {
        self.keysets.current_keys()
    }

    pub fn keysets(&self) -> &KeysetCache {
        &self.keysets
    }

    /// Fetch the issuer's current keys unless already cached
    pub async fn load_keys(&mut self) -> WalletResult<KeysetId> {
        let id = self.keysets.ensure_ready(&self.client, &self.mint_url).await?;
        Ok(id.clone())
    }

    // -------------------------------------------------------------------------
    // Mint
    // -------------------------------------------------------------------------

    /// Ask the issuer for an invoice worth `amount`
    pub async fn request_mint(&self, amount: u64) -> WalletResult<RequestMintResponse> {
        if amount == 0 {
            return Err(WalletError::invalid_amount("Mint amount must be positive"));
        }
        self.client.request_mint(&self.mint_url, amount).await
    }

    /// Mint proofs for `amount` once the invoice tracked by `hash` is paid.
    ///
    /// An unpaid invoice comes back as the issuer's rejection; polling is up
    /// to the caller.
    pub async fn request_tokens(
        &mut self,
        amount: u64,
        hash: &str,
        preference: Option<&[AmountPreference]>,
    ) -> WalletResult<MintedProofs> {
        if amount == 0 {
            return Err(WalletError::invalid_amount("Mint amount must be positive"));
        }

        let outputs = BlindedOutputs::random(amount, preference)?;
        self.check_denominations(&outputs).await?;

        let request = MintRequest {
            outputs: outputs.messages(),
        };
        log_info!(MODULE, "Minting", amount = amount, outputs = outputs.len());
        let response = self.client.mint(&self.mint_url, &request, hash).await?;
        check_signature_count(&response.promises, &outputs)?;

        let proofs = self.unblind(&response.promises, outputs).await?;
        let new_keys = self.rotation_check(&response.promises).await;

        Ok(MintedProofs { proofs, new_keys })
    }

    // -------------------------------------------------------------------------
    // Send
    // -------------------------------------------------------------------------

    /// Split `proofs` so that exactly `amount` can be handed over.
    ///
    /// Proofs are taken in order until they cover `amount`; the rest are
    /// returned untouched in `keep`. An exact cover without a preference
    /// needs no issuer round.
    pub async fn send(
        &mut self,
        amount: u64,
        proofs: &[Proof],
        preference: Option<&[AmountPreference]>,
    ) -> WalletResult<SendResult> {
        if amount == 0 {
            return Err(WalletError::invalid_amount("Send amount must be positive"));
        }

        let total = sum_proofs(proofs)?;
        if amount > total {
            return Err(WalletError::insufficient_funds("Not enough funds available")
                .with_details(format!("Requested: {}, Available: {}", amount, total)));
        }

        let mut selected = Vec::new();
        let mut unselected = Vec::new();
        let mut covered = 0u64;
        for proof in proofs {
            if covered < amount {
                covered += proof.amount;
                selected.push(proof.clone());
            } else {
                unselected.push(proof.clone());
            }
        }

        if covered == amount && preference.is_none() {
            log_debug!(MODULE, "Exact proofs selected, no split needed", amount = amount);
            return Ok(SendResult {
                keep: unselected,
                send: selected,
                new_keys: None,
            });
        }

        let keep_amount = covered - amount;
        let outputs = BlindedOutputs::random(keep_amount, None)?
            .chain(BlindedOutputs::random(amount, preference)?);
        self.check_denominations(&outputs).await?;

        log_info!(
            MODULE,
            "Splitting proofs for send",
            amount = amount,
            keep = keep_amount,
            inputs = selected.len(),
            outputs = outputs.len()
        );
        let request = SplitRequest {
            proofs: selected,
            outputs: outputs.messages(),
        };
        let response = self.client.split(&self.mint_url, &request).await?;
        check_signature_count(&response.promises, &outputs)?;

        let fresh = self.unblind(&response.promises, outputs).await?;
        let new_keys = self.rotation_check(&response.promises).await;

        let mut keep = Vec::new();
        let mut send = Vec::new();
        let mut kept = 0u64;
        for proof in fresh {
            if kept < keep_amount {
                kept += proof.amount;
                keep.push(proof);
            } else {
                send.push(proof);
            }
        }
        keep.extend(unselected);

        Ok(SendResult { keep, send, new_keys })
    }

    // -------------------------------------------------------------------------
    // Receive
    // -------------------------------------------------------------------------

    /// Redeem every entry of `token` at its own mint.
    ///
    /// Entries that fail are returned in `failed`; the call itself never
    /// fails, so value from the mints that answered is not lost.
    pub async fn receive(&mut self, token: &Token, preference: Option<&[AmountPreference]>) -> ReceiveResult {
        let cleaned = token.cleaned();
        let mut received = Vec::new();
        let mut failed = Vec::new();
        let mut own_ids: Vec<KeysetId> = Vec::new();

        for entry in cleaned.token {
            match self.receive_entry(&entry, preference).await {
                Ok((proofs, ids)) => {
                    for id in ids {
                        if !own_ids.contains(&id) {
                            own_ids.push(id);
                        }
                    }
                    received.push(TokenEntry::new(entry.mint.clone(), proofs));
                }
                Err(error) => {
                    log_warn!(MODULE, "Token entry not received", mint = entry.mint, error = error);
                    failed.push(FailedEntry { entry, error });
                }
            }
        }

        let new_keys = if own_ids.is_empty() {
            None
        } else {
            self.rotation_check_ids(&own_ids).await
        };

        log_info!(MODULE, "Token received", entries = received.len(), failed = failed.len());
        ReceiveResult {
            received: Token {
                token: received,
                memo: cleaned.memo,
            },
            failed,
            new_keys,
        }
    }

    /// Decode a serialized token and [`receive`](Self::receive) it
    pub async fn receive_encoded(
        &mut self,
        encoded: &str,
        preference: Option<&[AmountPreference]>,
    ) -> WalletResult<ReceiveResult> {
        let token = decode_token(encoded)?;
        Ok(self.receive(&token, preference).await)
    }

    /// Split one entry at its mint. Returns the new proofs and, for our own
    /// mint, the keyset ids that signed them.
    async fn receive_entry(
        &mut self,
        entry: &TokenEntry,
        preference: Option<&[AmountPreference]>,
    ) -> WalletResult<(Vec<Proof>, Vec<KeysetId>)> {
        entry.validate()?;
        let amount = entry.amount()?;

        let preference = match preference {
            Some(p) => p.to_vec(),
            None => default_preference(amount),
        };
        let outputs = BlindedOutputs::random(amount, Some(&preference))?;
        let request = SplitRequest {
            proofs: entry.proofs.clone(),
            outputs: outputs.messages(),
        };

        let own = same_mint(&entry.mint, &self.mint_url);
        let target = if own {
            self.check_denominations(&outputs).await?;
            self.mint_url.clone()
        } else {
            entry.mint.clone()
        };

        log_debug!(MODULE, "Receiving token entry", mint = target, amount = amount);
        let response = self.client.split(&target, &request).await?;
        check_signature_count(&response.promises, &outputs)?;

        if own {
            let proofs = self.unblind(&response.promises, outputs).await?;
            return Ok((proofs, distinct_ids(&response.promises)));
        }

        // Keys of other mints are fetched per call and not kept
        let mut foreign = KeysetCache::new();
        for id in distinct_ids(&response.promises) {
            foreign.keys_for(&self.client, &target, &id).await?;
        }
        let proofs = outputs.into_proofs(&response.promises, |id| foreign.lookup(id))?;
        Ok((proofs, Vec::new()))
    }

    // -------------------------------------------------------------------------
    // Melt
    // -------------------------------------------------------------------------

    /// Fee reserve the issuer asks for to pay `invoice`
    pub async fn fee_estimate(&self, invoice: &str) -> WalletResult<u64> {
        let request = CheckFeesRequest {
            pr: invoice.to_string(),
        };
        Ok(self.client.check_fees(&self.mint_url, &request).await?.fee)
    }

    /// Pay `invoice` with `proofs`.
    ///
    /// Without an explicit `fee_reserve` the issuer is asked for one first.
    /// Blank outputs let the issuer return unused fee reserve as change.
    pub async fn pay_invoice(
        &mut self,
        invoice: &str,
        proofs: &[Proof],
        fee_reserve: Option<u64>,
    ) -> WalletResult<MeltResult> {
        if invoice.trim().is_empty() {
            return Err(WalletError::invalid_input("Invoice is empty"));
        }
        if proofs.is_empty() {
            return Err(WalletError::invalid_input("No proofs to pay with"));
        }
        proofs.iter().try_for_each(Proof::validate)?;
        let amount = sum_proofs(proofs)?;

        let fee_reserve = match fee_reserve {
            Some(fee) => fee,
            None => self.fee_estimate(invoice).await?,
        };
        let blanks = BlindedOutputs::blank(fee_reserve)?;

        log_info!(
            MODULE,
            "Paying invoice",
            invoice = invoice,
            amount = amount,
            fee_reserve = fee_reserve,
            blanks = blanks.len()
        );
        let request = MeltRequest {
            pr: invoice.to_string(),
            proofs: proofs.to_vec(),
            outputs: blanks.messages(),
        };
        let response = self.client.melt(&self.mint_url, &request).await?;

        let signatures = response.change.unwrap_or_default();
        if signatures.len() > blanks.len() {
            log_error!(MODULE, "Too much melt change", signatures = signatures.len(), blanks = blanks.len());
            return Err(WalletError::mint_error(format!(
                "Mint returned {} change signatures for {} blank outputs",
                signatures.len(),
                blanks.len()
            )));
        }

        let (change, new_keys) = if signatures.is_empty() {
            (Vec::new(), None)
        } else {
            let change = self.unblind(&signatures, blanks).await?;
            (change, self.rotation_check(&signatures).await)
        };

        if !response.paid {
            log_warn!(MODULE, "Invoice not paid", invoice = invoice);
        }

        Ok(MeltResult {
            is_paid: response.paid,
            preimage: response.preimage,
            change,
            new_keys,
        })
    }

    /// Pay `invoice` with the proofs of `token` that were issued by this
    /// wallet's mint
    pub async fn pay_invoice_with_token(
        &mut self,
        invoice: &str,
        token: &Token,
        fee_reserve: Option<u64>,
    ) -> WalletResult<MeltResult> {
        let proofs: Vec<Proof> = token
            .cleaned()
            .token
            .into_iter()
            .filter(|entry| same_mint(&entry.mint, &self.mint_url))
            .flat_map(|entry| entry.proofs)
            .collect();

        if proofs.is_empty() {
            return Err(WalletError::invalid_token(format!(
                "Token holds no proofs from {}",
                self.mint_url
            )));
        }
        self.pay_invoice(invoice, &proofs, fee_reserve).await
    }

    // -------------------------------------------------------------------------
    // State
    // -------------------------------------------------------------------------

    /// Proofs among `proofs` that the issuer no longer considers spendable
    pub async fn check_proofs_spent(&self, proofs: &[Proof]) -> WalletResult<Vec<Proof>> {
        if proofs.is_empty() {
            return Ok(Vec::new());
        }

        let request = CheckSpendableRequest::for_proofs(proofs);
        let response = self.client.check(&self.mint_url, &request).await?;
        if response.spendable.len() != proofs.len() {
            return Err(WalletError::mint_error(format!(
                "Mint returned {} states for {} proofs",
                response.spendable.len(),
                proofs.len()
            )));
        }

        Ok(proofs
            .iter()
            .zip(response.spendable)
            .filter(|(_, spendable)| !spendable)
            .map(|(proof, _)| proof.clone())
            .collect())
    }

    // -------------------------------------------------------------------------
    // Helpers
    // -------------------------------------------------------------------------

    /// Every output denomination must have a key in the current keyset
    async fn check_denominations(&mut self, outputs: &BlindedOutputs) -> WalletResult<()> {
        self.keysets.ensure_ready(&self.client, &self.mint_url).await?;
        let keys = self
            .keysets
            .current_keys()
            .ok_or_else(|| WalletError::internal("Keyset cache not ready"))?;

        match outputs.as_slice().iter().find(|o| keys.amount_key(o.amount).is_none()) {
            Some(output) => Err(WalletError::missing_key(format!(
                "Mint has no key for amount {}",
                output.amount
            ))),
            None => Ok(()),
        }
    }

    /// Unblind signatures from our own mint, fetching any keyset they name
    /// that is not cached yet
    async fn unblind(&mut self, signatures: &[BlindedSignature], outputs: BlindedOutputs) -> WalletResult<Vec<Proof>> {
        for id in distinct_ids(signatures) {
            self.keysets.keys_for(&self.client, &self.mint_url, &id).await?;
        }
        let keysets = &self.keysets;
        outputs.into_proofs(signatures, |id| keysets.lookup(id))
    }

    async fn rotation_check(&mut self, signatures: &[BlindedSignature]) -> Option<MintKeys> {
        self.rotation_check_ids(&distinct_ids(signatures)).await
    }

    /// A failed check after a successful round is logged, never raised: the
    /// proofs already exist and must reach the caller
    async fn rotation_check_ids(&mut self, ids: &[KeysetId]) -> Option<MintKeys> {
        match self.keysets.detect_rotation(&self.client, &self.mint_url, ids).await {
            Ok(Some(keys)) => {
                log_info!(MODULE, "New mint keys", keyset_id = derive_keyset_id(&keys));
                Some(keys)
            }
            Ok(None) => None,
            Err(error) => {
                log_warn!(MODULE, "Keyset rotation check failed", error = error);
                None
            }
        }
    }
}
