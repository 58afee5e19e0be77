//! Blinded output batches
//!
//! One batch is the local half of a signing round: an ordered list of
//! [`BlindedOutput`] records. Signature `i` from the issuer belongs to
//! record `i`, so a batch is never reordered once built.

use super::split::split_amount;
use crate::crypto::{construct_proofs, BlindedOutput};
use crate::error::{WalletError, WalletResult};
use crate::types::{AmountPreference, BlindedMessage, BlindedSignature, KeysetId, MintKeys, Proof};

/// Number of blank outputs needed to return up to `fee_reserve` as change
///
/// `max(ceil(log2(fee_reserve)), 1)`
pub fn blank_output_count(fee_reserve: u64) -> usize {
    if fee_reserve <= 1 {
        1
    } else {
        (u64::BITS - (fee_reserve - 1).leading_zeros()) as usize
    }
}

#[derive(Debug, Default)]
pub struct BlindedOutputs {
    outputs: Vec<BlindedOutput>,
}

impl BlindedOutputs {
    /// Fresh outputs covering `amount`, split per `preference`
    pub fn random(amount: u64, preference: Option<&[AmountPreference]>) -> WalletResult<Self> {
        let outputs = split_amount(amount, preference)?
            .into_iter()
            .map(BlindedOutput::random)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { outputs })
    }

    /// Zero-amount outputs the issuer may fill with fee change
    pub fn blank(fee_reserve: u64) -> WalletResult<Self> {
        let outputs = (0..blank_output_count(fee_reserve))
            .map(|_| BlindedOutput::random(0))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { outputs })
    }

    /// Append `other` after the records already in the batch
    pub fn chain(mut self, other: BlindedOutputs) -> Self {
        self.outputs.extend(other.outputs);
        self
    }

    pub fn messages(&self) -> Vec<BlindedMessage> {
        self.outputs.iter().map(BlindedOutput::message).collect()
    }

    pub fn amount(&self) -> u64 {
        self.outputs.iter().map(|o| o.amount).sum()
    }

    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    pub fn as_slice(&self) -> &[BlindedOutput] {
        &self.outputs
    }

    /// Unblind `signatures` against this batch
    pub fn into_proofs<'k, F>(self, signatures: &[BlindedSignature], keys_for: F) -> WalletResult<Vec<Proof>>
    where
        F: FnMut(&KeysetId) -> Option<&'k MintKeys>,
    {
        construct_proofs(signatures, &self.outputs, keys_for).map_err(WalletError::from)
    }
}
